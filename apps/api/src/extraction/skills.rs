//! Fixed technology vocabulary and word-boundary matching against it.

/// Maximum number of skills kept on a listing.
pub const MAX_SKILLS: usize = 15;

/// Canonical skill tokens, in the order results are reported.
pub const SKILL_VOCABULARY: &[&str] = &[
    "Java", "Python", "JavaScript", "TypeScript", "React", "Angular", "Vue",
    "Spring", "Spring Boot", "Node.js", "Express", ".NET", "C#", "C++",
    "SQL", "NoSQL", "MongoDB", "PostgreSQL", "MySQL", "Oracle", "Redis",
    "AWS", "Azure", "GCP", "Cloud", "Docker", "Kubernetes", "Jenkins",
    "CI/CD", "DevOps", "Microservices", "REST", "RESTful", "API", "GraphQL",
    "Git", "GitHub", "GitLab", "Agile", "Scrum", "JIRA", "Kafka", "RabbitMQ",
    "HTML", "CSS", "SASS", "Bootstrap", "Material UI", "Tailwind",
    "JPA", "Hibernate", "Maven", "Gradle", "JUnit", "Jest", "Selenium",
    "Machine Learning", "AI", "TensorFlow", "PyTorch", "Pandas", "NumPy",
    "Rust", "Go",
];

/// Returns every vocabulary skill present in `text`, in vocabulary order.
pub fn find_vocabulary_skills(text: &str) -> Vec<&'static str> {
    let haystack = text.to_lowercase();
    let mut found: Vec<&'static str> = Vec::new();
    for &skill in SKILL_VOCABULARY {
        if !found.contains(&skill) && contains_token(&haystack, &skill.to_lowercase()) {
            found.push(skill);
        }
    }
    found
}

/// Vocabulary skills in `text`, capped at [`MAX_SKILLS`].
pub fn extract_skills(text: &str) -> Vec<String> {
    find_vocabulary_skills(text)
        .into_iter()
        .take(MAX_SKILLS)
        .map(String::from)
        .collect()
}

/// Whole-token containment: the match may not touch a letter, digit or
/// underscore on either side. Both arguments are expected lowercased.
///
/// Unlike `\b`, this also works for tokens that start or end with
/// punctuation (`c++`, `.net`, `c#`).
pub fn contains_token(haystack: &str, token: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    haystack.match_indices(token).any(|(start, matched)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + matched.len()..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
