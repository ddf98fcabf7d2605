use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Runtime settings, read from the environment (after `.env` loading in the
/// binary).
#[derive(Debug, Clone)]
pub struct Settings {
    pub db_path: PathBuf,
    pub db_pool_size: usize,
    pub db_timeout: Duration,
    /// Where snapshots and rendered reports are written.
    pub data_dir: PathBuf,
    pub llm: LlmSettings,
    pub chart_timeout: Duration,
    pub prompt_file: Option<PathBuf>,
    pub graph_prompt_file: Option<PathBuf>,
    /// `(username, password)` pairs accepted by the authenticator.
    pub users: Vec<(String, String)>,
}

#[derive(Clone)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Unset or blank values
    /// take their defaults; unparsable numbers are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let db_path = match get("ANALYTICS_DB_PATH") {
            Some(path) => PathBuf::from(path),
            None => default_db_path()?,
        };
        let data_dir = get("ANALYTICS_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join("client_analytics_data"));

        Ok(Self {
            db_path,
            db_pool_size: parse_or(get("ANALYTICS_DB_POOL_SIZE"), "ANALYTICS_DB_POOL_SIZE", 3)?,
            db_timeout: secs_or(get("ANALYTICS_DB_TIMEOUT_SECS"), "ANALYTICS_DB_TIMEOUT_SECS", 10)?,
            data_dir,
            llm: LlmSettings {
                api_key: get("ANTHROPIC_API_KEY"),
                base_url: get("ANTHROPIC_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
                model: get("ANALYTICS_LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                timeout: secs_or(get("ANALYTICS_LLM_TIMEOUT_SECS"), "ANALYTICS_LLM_TIMEOUT_SECS", 30)?,
            },
            chart_timeout: secs_or(
                get("ANALYTICS_CHART_TIMEOUT_SECS"),
                "ANALYTICS_CHART_TIMEOUT_SECS",
                10,
            )?,
            prompt_file: get("PROMPT_FILE_PATH").map(PathBuf::from),
            graph_prompt_file: get("GRAPH_PROMPT_FILE_PATH").map(PathBuf::from),
            users: match get("ANALYTICS_USERS") {
                Some(raw) => parse_users(&raw)?,
                None => Vec::new(),
            },
        })
    }
}

fn default_db_path() -> Result<PathBuf> {
    let dir = dirs::home_dir()
        .ok_or_else(|| Error::Config("cannot determine home directory".into()))?
        .join(".client-analytics");
    Ok(dir.join("analytics.db"))
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, key: &str, default: T) -> Result<T> {
    match value {
        None => Ok(default),
        Some(v) => v
            .parse()
            .map_err(|_| Error::Config(format!("{key} must be a number, got {v:?}"))),
    }
}

fn secs_or(value: Option<String>, key: &str, default: u64) -> Result<Duration> {
    let secs: u64 = parse_or(value, key, default)?;
    if secs == 0 {
        return Err(Error::Config(format!("{key} must be greater than zero")));
    }
    Ok(Duration::from_secs(secs))
}

/// Parse `user:password,user2:password2`.
pub fn parse_users(raw: &str) -> Result<Vec<(String, String)>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (user, password) = entry
                .split_once(':')
                .ok_or_else(|| Error::Config(format!("expected user:password, got {entry:?}")))?;
            let user = user.trim();
            if user.is_empty() || password.is_empty() {
                return Err(Error::Config(format!("incomplete credentials entry {entry:?}")));
            }
            Ok((user.to_string(), password.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(move |k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let s = settings(&[("ANALYTICS_DB_PATH", "/tmp/a.db")]).unwrap();
        assert_eq!(s.db_path, PathBuf::from("/tmp/a.db"));
        assert_eq!(s.db_pool_size, 3);
        assert_eq!(s.db_timeout, Duration::from_secs(10));
        assert_eq!(s.llm.model, DEFAULT_MODEL);
        assert_eq!(s.llm.timeout, Duration::from_secs(30));
        assert_eq!(s.chart_timeout, Duration::from_secs(10));
        assert!(s.data_dir.ends_with("client_analytics_data"));
        assert!(s.users.is_empty());
        assert!(s.prompt_file.is_none());
    }

    #[test]
    fn test_overrides() {
        let s = settings(&[
            ("ANALYTICS_DB_PATH", "/tmp/a.db"),
            ("ANALYTICS_DB_POOL_SIZE", "5"),
            ("ANTHROPIC_BASE_URL", "http://localhost:9000/"),
            ("ANALYTICS_LLM_MODEL", "claude-test"),
            ("PROMPT_FILE_PATH", "/etc/prompt.txt"),
            ("ANALYTICS_USERS", "alice:s3cret, bob:hunter2"),
        ])
        .unwrap();
        assert_eq!(s.db_pool_size, 5);
        assert_eq!(s.llm.base_url, "http://localhost:9000");
        assert_eq!(s.llm.model, "claude-test");
        assert_eq!(s.prompt_file, Some(PathBuf::from("/etc/prompt.txt")));
        assert_eq!(s.users.len(), 2);
        assert_eq!(s.users[1], ("bob".to_string(), "hunter2".to_string()));
    }

    #[test]
    fn test_invalid_numbers_are_config_errors() {
        let err = settings(&[("ANALYTICS_DB_PATH", "/tmp/a.db"), ("ANALYTICS_DB_POOL_SIZE", "many")])
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        let err = settings(&[("ANALYTICS_DB_PATH", "/tmp/a.db"), ("ANALYTICS_LLM_TIMEOUT_SECS", "0")])
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_parse_users_rejects_malformed() {
        assert!(parse_users("alice").is_err());
        assert!(parse_users(":pw").is_err());
        assert!(parse_users(" , ").unwrap().is_empty());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let s = settings(&[("ANALYTICS_DB_PATH", "/tmp/a.db"), ("ANTHROPIC_API_KEY", "sk-live")]).unwrap();
        let dbg = format!("{:?}", s.llm);
        assert!(!dbg.contains("sk-live"));
    }
}
