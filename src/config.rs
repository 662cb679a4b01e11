use crate::error::ConfigError;
use std::{path::PathBuf, str::FromStr, time::Duration};

pub const DEFAULT_CATEGORIES: &str = "NEWS,AI_NEWS,REVIEW,GUIDE,COMPARISON,ROUNDUP";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextProviderKind {
    OpenAi,
    Anthropic,
    Gemini,
}

impl FromStr for TextProviderKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(TextProviderKind::OpenAi),
            "anthropic" | "claude" => Ok(TextProviderKind::Anthropic),
            "gemini" | "google" => Ok(TextProviderKind::Gemini),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EmbeddingProviderKind {
    OpenAi,
    Gemini,
}

impl FromStr for EmbeddingProviderKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(EmbeddingProviderKind::OpenAi),
            "gemini" | "google" => Ok(EmbeddingProviderKind::Gemini),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,

    pub text_provider: TextProviderKind,
    pub embedding_provider: EmbeddingProviderKind,

    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub openai_model: String,
    pub anthropic_model: String,
    pub gemini_model: String,
    pub openai_embedding_model: String,
    pub gemini_embedding_model: String,

    /// Cover images are skipped when unset
    pub unsplash_access_key: Option<String>,

    /// Categories evaluated for quota, in tie-break order
    pub categories: Vec<String>,
    pub daily_target: i32,
    pub per_category_cap: usize,
    pub max_articles_per_run: usize,
    pub generation_delay: Duration,

    /// Applies to generation, embedding and fact-check calls alike
    pub provider_timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,

    pub publish_immediately: bool,
    pub seo_via_llm: bool,

    /// Worker schedule, clokwerk `at` syntax
    pub generation_time: String,
    pub sweep_interval_minutes: u32,

    pub log_level: log::LevelFilter,
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the process environment (and `.env`, if the
    /// caller loaded it).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let config = Self {
            database_url: get("DATABASE_URL"),

            text_provider: parse_or(&lookup, "TEXT_PROVIDER", TextProviderKind::OpenAi)?,
            embedding_provider: parse_or(
                &lookup,
                "EMBEDDING_PROVIDER",
                EmbeddingProviderKind::OpenAi,
            )?,

            openai_api_key: get("OPENAI_API_KEY"),
            anthropic_api_key: get("ANTHROPIC_API_KEY"),
            gemini_api_key: get("GEMINI_API_KEY"),
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            anthropic_model: get("ANTHROPIC_MODEL")
                .unwrap_or_else(|| "claude-3-5-sonnet-latest".to_string()),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| "gemini-1.5-flash".to_string()),
            openai_embedding_model: get("OPENAI_EMBEDDING_MODEL")
                .unwrap_or_else(|| "text-embedding-3-small".to_string()),
            gemini_embedding_model: get("GEMINI_EMBEDDING_MODEL")
                .unwrap_or_else(|| "text-embedding-004".to_string()),

            unsplash_access_key: get("UNSPLASH_ACCESS_KEY"),

            categories: split_list(
                &get("CATEGORIES").unwrap_or_else(|| DEFAULT_CATEGORIES.to_string()),
            ),
            daily_target: parse_or(&lookup, "DAILY_TARGET", 5)?,
            per_category_cap: parse_or(&lookup, "PER_CATEGORY_CAP", 2)?,
            max_articles_per_run: parse_or(&lookup, "MAX_ARTICLES_PER_RUN", 5)?,
            generation_delay: Duration::from_millis(parse_or(
                &lookup,
                "GENERATION_DELAY_MS",
                2000,
            )?),

            provider_timeout: Duration::from_secs(parse_or(
                &lookup,
                "PROVIDER_TIMEOUT_SECS",
                60,
            )?),
            max_retries: parse_or(&lookup, "MAX_RETRIES", 1)?,
            retry_backoff: Duration::from_millis(parse_or(&lookup, "RETRY_BACKOFF_MS", 5000)?),

            publish_immediately: parse_or(&lookup, "PUBLISH_IMMEDIATELY", false)?,
            seo_via_llm: parse_or(&lookup, "SEO_VIA_LLM", false)?,

            generation_time: get("GENERATION_TIME").unwrap_or_else(|| "06:00".to_string()),
            sweep_interval_minutes: parse_or(&lookup, "SWEEP_INTERVAL_MINUTES", 5)?,

            log_level: parse_or(&lookup, "LOG_LEVEL", log::LevelFilter::Info)?,
            log_file: get("LOG_FILE").map(PathBuf::from),
        };
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.daily_target <= 0 {
            return Err(ConfigError::Invalid {
                var: "DAILY_TARGET",
                value: self.daily_target.to_string(),
            });
        }

        if self.per_category_cap == 0 {
            return Err(ConfigError::Invalid {
                var: "PER_CATEGORY_CAP",
                value: "0".to_string(),
            });
        }

        if self.categories.is_empty() {
            return Err(ConfigError::Invalid {
                var: "CATEGORIES",
                value: String::new(),
            });
        }

        if self.sweep_interval_minutes == 0 {
            return Err(ConfigError::Invalid {
                var: "SWEEP_INTERVAL_MINUTES",
                value: "0".to_string(),
            });
        }

        let text_key = match self.text_provider {
            TextProviderKind::OpenAi => ("OPENAI_API_KEY", &self.openai_api_key),
            TextProviderKind::Anthropic => ("ANTHROPIC_API_KEY", &self.anthropic_api_key),
            TextProviderKind::Gemini => ("GEMINI_API_KEY", &self.gemini_api_key),
        };
        let embedding_key = match self.embedding_provider {
            EmbeddingProviderKind::OpenAi => ("OPENAI_API_KEY", &self.openai_api_key),
            EmbeddingProviderKind::Gemini => ("GEMINI_API_KEY", &self.gemini_api_key),
        };
        for (var, key) in [text_key, embedding_key].iter() {
            if key.is_none() {
                return Err(ConfigError::Missing(*var));
            }
        }

        Ok(())
    }

    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or(ConfigError::Missing("DATABASE_URL"))
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var).filter(|v| !v.trim().is_empty()) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|var| map.get(var).cloned())
    }

    #[test]
    fn defaults_with_openai_key() {
        let config = load(&[("OPENAI_API_KEY", "sk-test")]).unwrap();
        assert_eq!(config.text_provider, TextProviderKind::OpenAi);
        assert_eq!(config.daily_target, 5);
        assert_eq!(config.per_category_cap, 2);
        assert_eq!(config.categories.len(), 6);
        assert_eq!(config.categories[0], "NEWS");
        assert_eq!(config.generation_delay, Duration::from_millis(2000));
        assert_eq!(config.log_level, log::LevelFilter::Info);
        assert!(config.unsplash_access_key.is_none());
        assert!(config.require_database_url().is_err());
    }

    #[test]
    fn selected_provider_needs_its_key() {
        let err = load(&[("TEXT_PROVIDER", "anthropic"), ("OPENAI_API_KEY", "sk")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("ANTHROPIC_API_KEY")));

        let config = load(&[
            ("TEXT_PROVIDER", "claude"),
            ("EMBEDDING_PROVIDER", "gemini"),
            ("ANTHROPIC_API_KEY", "a"),
            ("GEMINI_API_KEY", "g"),
        ])
        .unwrap();
        assert_eq!(config.text_provider, TextProviderKind::Anthropic);
        assert_eq!(config.embedding_provider, EmbeddingProviderKind::Gemini);
    }

    #[test]
    fn rejects_bad_numbers_and_targets() {
        let err = load(&[("OPENAI_API_KEY", "sk"), ("DAILY_TARGET", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "DAILY_TARGET", .. }));

        let err = load(&[("OPENAI_API_KEY", "sk"), ("PER_CATEGORY_CAP", "lots")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "PER_CATEGORY_CAP", .. }));

        let err = load(&[("OPENAI_API_KEY", "sk"), ("TEXT_PROVIDER", "markov")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "TEXT_PROVIDER", .. }));
    }

    #[test]
    fn category_list_is_trimmed() {
        let config = load(&[
            ("OPENAI_API_KEY", "sk"),
            ("CATEGORIES", " NEWS , Gadgets,, REVIEW "),
        ])
        .unwrap();
        assert_eq!(config.categories, vec!["NEWS", "Gadgets", "REVIEW"]);
    }
}
