// Shared prompt fragments.
// Each service that needs LLM calls defines its own prompts.rs alongside it;
// only cross-cutting pieces live here.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Renders a list for prompt embedding, or a marker when empty.
pub fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "None listed".to_string()
    } else {
        items.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_or_none() {
        assert_eq!(join_or_none(&[]), "None listed");
        assert_eq!(join_or_none(&["a".to_string(), "b".to_string()]), "a, b");
    }
}
