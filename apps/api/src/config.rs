use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::llm_client::{LlmProvider, RetryPolicy};
use crate::models::profile::parse_skill_list;

/// One configured AI tier. `api_key` is `None` when the key variable is unset;
/// such a tier is skipped at startup.
#[derive(Debug, Clone)]
pub struct LlmTierConfig {
    pub provider: LlmProvider,
    pub api_key: Option<String>,
    pub model: Option<String>,
    /// Overrides the provider's public endpoint (gateways, proxies).
    pub endpoint: Option<String>,
}

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or a value does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Redis-backed analysis cache when set, in-process cache otherwise.
    pub redis_url: Option<String>,
    pub port: u16,
    pub rust_log: String,

    /// AI tiers in failover order.
    pub llm_tiers: Vec<LlmTierConfig>,
    pub llm_retry: RetryPolicy,

    pub analysis_cache_ttl: Duration,
    pub cache_sweep_interval: Duration,
    pub record_delay: Duration,
    pub pipeline_concurrency: usize,

    pub job_log_path: PathBuf,
    pub resume_file_path: Option<PathBuf>,
    pub user_skills: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let tier_names = optional_env("LLM_TIERS").unwrap_or_else(|| "groq,openai".to_string());

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: optional_env("REDIS_URL"),
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            llm_tiers: parse_tiers(&tier_names, optional_env)?,
            llm_retry: RetryPolicy {
                max_retries: parse_env("LLM_MAX_RETRIES", 3)?,
                base_backoff: Duration::from_millis(parse_env("LLM_BACKOFF_MS", 1000)?),
            },
            analysis_cache_ttl: hours(
                "ANALYSIS_CACHE_TTL_HOURS",
                parse_env("ANALYSIS_CACHE_TTL_HOURS", 24)?,
            )?,
            cache_sweep_interval: Duration::from_secs(
                parse_env::<u64>("CACHE_SWEEP_INTERVAL_SECS", 3600)?.max(1),
            ),
            record_delay: Duration::from_millis(parse_env("PIPELINE_RECORD_DELAY_MS", 500)?),
            pipeline_concurrency: parse_env::<usize>("PIPELINE_CONCURRENCY", 1)?.max(1),
            job_log_path: optional_env("JOB_LOG_PATH")
                .unwrap_or_else(|| "jobs_log.csv".to_string())
                .into(),
            resume_file_path: optional_env("RESUME_FILE_PATH").map(PathBuf::from),
            user_skills: optional_env("USER_SKILLS")
                .map(|s| parse_skill_list(&s))
                .unwrap_or_default(),
        })
    }
}

/// Resolves a comma-separated tier list. `lookup` reads `<PREFIX>_API_KEY`,
/// `<PREFIX>_MODEL` and `<PREFIX>_ENDPOINT` for each named provider.
fn parse_tiers(
    names: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Vec<LlmTierConfig>> {
    let mut tiers: Vec<LlmTierConfig> = Vec::new();
    for name in names.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        let provider = LlmProvider::from_str(name).map_err(|e| anyhow!("LLM_TIERS: {e}"))?;
        if tiers.iter().any(|t| t.provider == provider) {
            continue;
        }
        let prefix = provider.env_prefix();
        tiers.push(LlmTierConfig {
            provider,
            api_key: lookup(&format!("{prefix}_API_KEY")),
            model: lookup(&format!("{prefix}_MODEL")),
            endpoint: lookup(&format!("{prefix}_ENDPOINT")),
        });
    }
    Ok(tiers)
}

fn hours(key: &str, hours: u64) -> Result<Duration> {
    hours
        .checked_mul(3600)
        .map(Duration::from_secs)
        .with_context(|| format!("{key} is too large ({hours} hours)"))
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset and blank both read as `None`.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Config {
            database_url: "postgres://localhost/jobscout_test".to_string(),
            redis_url: None,
            port: 0,
            rust_log: "debug".to_string(),
            llm_tiers: Vec::new(),
            llm_retry: RetryPolicy {
                max_retries: 0,
                base_backoff: Duration::ZERO,
            },
            analysis_cache_ttl: Duration::from_secs(3600),
            cache_sweep_interval: Duration::from_secs(3600),
            record_delay: Duration::ZERO,
            pipeline_concurrency: 1,
            job_log_path: "jobs_log.csv".into(),
            resume_file_path: None,
            user_skills: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_cache_ttl_hours_overflow_is_an_error() {
        assert_eq!(hours("ANALYSIS_CACHE_TTL_HOURS", 24).unwrap(), Duration::from_secs(86_400));
        assert!(hours("ANALYSIS_CACHE_TTL_HOURS", u64::MAX).is_err());
    }

    #[test]
    fn test_tiers_keep_order_and_read_keys() {
        let env: HashMap<&str, &str> = [
            ("GROQ_API_KEY", "gsk-test"),
            ("ANTHROPIC_API_KEY", "sk-ant-test"),
            ("ANTHROPIC_MODEL", "claude-haiku-4-5"),
        ]
        .into_iter()
        .collect();
        let lookup = |k: &str| env.get(k).map(|v| v.to_string());

        let tiers = parse_tiers("groq, anthropic ,openai,groq", lookup).unwrap();
        let providers: Vec<LlmProvider> = tiers.iter().map(|t| t.provider).collect();
        assert_eq!(
            providers,
            vec![LlmProvider::Groq, LlmProvider::Anthropic, LlmProvider::OpenAi]
        );
        assert_eq!(tiers[0].api_key.as_deref(), Some("gsk-test"));
        assert_eq!(tiers[1].model.as_deref(), Some("claude-haiku-4-5"));
        assert!(tiers[2].api_key.is_none());
        assert!(tiers.iter().all(|t| t.endpoint.is_none()));
    }

    #[test]
    fn test_unknown_tier_is_an_error() {
        assert!(parse_tiers("groq,mistral", |_| None).is_err());
        assert!(parse_tiers("", |_| None).unwrap().is_empty());
    }
}
