// src/config.rs
use crate::utils::error::AppError;
use crate::utils::retry::RetryPolicy;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

// SEC asks for a descriptive User-Agent with a contact address.
const DEFAULT_USER_AGENT: &str = "sec-risk-analyzer admin@example.com";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4-1106-preview";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct EdgarSettings {
    pub user_agent: String,
    pub max_requests_per_window: u32,
    pub window: Duration,
    /// Random delay range (ms) added before every request.
    pub jitter_ms: (u64, u64),
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone)]
pub struct ExtractionSettings {
    pub min_section_chars: usize,
    pub min_words: usize,
    pub max_chars: usize,
    pub similarity_threshold: f64,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            min_section_chars: 1000,
            min_words: 50,
            max_chars: 1000,
            similarity_threshold: 0.70,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_input_chars: usize,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub max_filings: usize,
    pub debug: bool,
    pub edgar: EdgarSettings,
    pub extraction: ExtractionSettings,
    pub openai: OpenAiSettings,
}

/// Values given on the command line; they win over the environment.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub data_dir: Option<PathBuf>,
    pub max_filings: Option<usize>,
    pub min_section_size: Option<usize>,
    pub min_words: Option<usize>,
    pub debug: bool,
}

impl Settings {
    /// Builds settings from CLI overrides, the process environment and `.env`.
    pub fn load(overrides: CliOverrides) -> Result<Self, AppError> {
        Self::from_lookup(overrides, |key| dotenv::var(key).ok())
    }

    pub fn from_lookup<F>(overrides: CliOverrides, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ExtractionSettings::default();

        let user_agent = match lookup("SEC_USER_AGENT").filter(|ua| !ua.trim().is_empty()) {
            Some(ua) => ua,
            None => {
                tracing::warn!(
                    "SEC_USER_AGENT not set; using placeholder '{}'. EDGAR may reject requests.",
                    DEFAULT_USER_AGENT
                );
                DEFAULT_USER_AGENT.to_string()
            }
        };

        let data_dir = match overrides.data_dir {
            Some(dir) => dir,
            None => lookup("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data")),
        };

        let extraction = ExtractionSettings {
            min_section_chars: pick(
                overrides.min_section_size,
                &lookup,
                "MIN_SECTION_SIZE",
                defaults.min_section_chars,
            )?,
            min_words: pick(overrides.min_words, &lookup, "MIN_RISK_WORDS", defaults.min_words)?,
            max_chars: parse_var(&lookup, "MAX_RISK_CHARS", defaults.max_chars)?,
            similarity_threshold: parse_var(
                &lookup,
                "SIMILARITY_THRESHOLD",
                defaults.similarity_threshold,
            )?,
        };
        if !(0.0..=1.0).contains(&extraction.similarity_threshold) {
            return Err(AppError::Config(format!(
                "SIMILARITY_THRESHOLD must be within [0, 1], got {}",
                extraction.similarity_threshold
            )));
        }

        let edgar = EdgarSettings {
            user_agent,
            max_requests_per_window: parse_var(&lookup, "SEC_MAX_REQUESTS_PER_WINDOW", 10)?,
            window: Duration::from_secs(1),
            jitter_ms: (100, 300),
            retry: RetryPolicy::default(),
        };

        let openai = OpenAiSettings {
            api_key: lookup("OPENAI_API_KEY").filter(|key| !key.trim().is_empty()),
            model: lookup("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            base_url: lookup("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            temperature: 0.2,
            max_input_chars: parse_var(&lookup, "OPENAI_MAX_INPUT_CHARS", 100_000)?,
            retry: RetryPolicy::default(),
        };

        Ok(Self {
            data_dir,
            max_filings: pick(overrides.max_filings, &lookup, "MAX_FILINGS", 5)?.max(2),
            debug: overrides.debug,
            edgar,
            extraction,
            openai,
        })
    }
}

fn pick<T, F>(cli: Option<T>, lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match cli {
        Some(value) => Ok(value),
        None => parse_var(lookup, key, default),
    }
}

fn parse_var<T, F>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("Invalid value for {}: '{}'", key, raw))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(CliOverrides::default(), |_| None).unwrap();
        assert_eq!(settings.extraction.min_words, 50);
        assert_eq!(settings.extraction.max_chars, 1000);
        assert_eq!(settings.extraction.min_section_chars, 1000);
        assert_eq!(settings.extraction.similarity_threshold, 0.70);
        assert_eq!(settings.edgar.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(settings.edgar.max_requests_per_window, 10);
        assert!(settings.openai.api_key.is_none());
        assert_eq!(settings.data_dir, PathBuf::from("./data"));
    }

    #[test]
    fn test_cli_wins_over_env() {
        let vars = env(&[("MIN_RISK_WORDS", "80"), ("DATA_DIR", "/tmp/env")]);
        let overrides = CliOverrides {
            min_words: Some(30),
            data_dir: Some(PathBuf::from("/tmp/cli")),
            ..Default::default()
        };
        let settings = Settings::from_lookup(overrides, |k| vars.get(k).cloned()).unwrap();
        assert_eq!(settings.extraction.min_words, 30);
        assert_eq!(settings.data_dir, PathBuf::from("/tmp/cli"));
    }

    #[test]
    fn test_env_values_and_trailing_slash() {
        let vars = env(&[
            ("SEC_USER_AGENT", "Acme Research ops@acme.test"),
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_BASE_URL", "http://localhost:8080/v1/"),
            ("SIMILARITY_THRESHOLD", "0.8"),
        ]);
        let settings =
            Settings::from_lookup(CliOverrides::default(), |k| vars.get(k).cloned()).unwrap();
        assert_eq!(settings.edgar.user_agent, "Acme Research ops@acme.test");
        assert_eq!(settings.openai.api_key.as_deref(), Some("sk-test"));
        assert_eq!(settings.openai.base_url, "http://localhost:8080/v1");
        assert_eq!(settings.extraction.similarity_threshold, 0.8);
    }

    #[test]
    fn test_invalid_number_is_config_error() {
        let vars = env(&[("MAX_RISK_CHARS", "lots")]);
        let err = Settings::from_lookup(CliOverrides::default(), |k| vars.get(k).cloned())
            .unwrap_err();
        assert!(matches!(err, AppError::Config(msg) if msg.contains("MAX_RISK_CHARS")));
    }

    #[test]
    fn test_threshold_out_of_range() {
        let vars = env(&[("SIMILARITY_THRESHOLD", "1.5")]);
        assert!(Settings::from_lookup(CliOverrides::default(), |k| vars.get(k).cloned()).is_err());
    }
}
