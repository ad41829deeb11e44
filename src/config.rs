// src/config.rs
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
pub const DEFAULT_STATIC_DIR: &str = "static";
pub const DEFAULT_VISION_BASE_URL: &str = "https://vision.googleapis.com";
pub const DEFAULT_SPOONACULAR_BASE_URL: &str = "https://api.spoonacular.com";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
}

/// Settings loaded once at startup and handed to the clients that need them.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub vision_api_key: String,
    pub spoonacular_api_key: String,
    pub bind_addr: String,
    /// Absolute base used for chart links. Falls back to the request's Host header.
    pub public_base_url: Option<String>,
    pub static_dir: PathBuf,
    pub vision_base_url: String,
    pub spoonacular_base_url: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests don't touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let vision_api_key = non_empty("GOOGLE_VISION_API_KEY")
            .ok_or(ConfigError::MissingVar("GOOGLE_VISION_API_KEY"))?;
        let spoonacular_api_key = non_empty("SPOONACULAR_API_KEY")
            .ok_or(ConfigError::MissingVar("SPOONACULAR_API_KEY"))?;

        Ok(Self {
            vision_api_key,
            spoonacular_api_key,
            bind_addr: non_empty("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            public_base_url: non_empty("PUBLIC_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string()),
            static_dir: PathBuf::from(
                non_empty("STATIC_DIR").unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string()),
            ),
            vision_base_url: non_empty("VISION_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_VISION_BASE_URL.to_string()),
            spoonacular_base_url: non_empty("SPOONACULAR_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_SPOONACULAR_BASE_URL.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_applied_when_only_keys_set() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("GOOGLE_VISION_API_KEY", "vision-key"),
            ("SPOONACULAR_API_KEY", "spoon-key"),
        ]))
        .unwrap();

        assert_eq!(config.vision_api_key, "vision-key");
        assert_eq!(config.spoonacular_api_key, "spoon-key");
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.static_dir, PathBuf::from("static"));
        assert_eq!(config.public_base_url, None);
        assert_eq!(config.vision_base_url, DEFAULT_VISION_BASE_URL);
        assert_eq!(config.spoonacular_base_url, DEFAULT_SPOONACULAR_BASE_URL);
    }

    #[test]
    fn test_missing_keys_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[("SPOONACULAR_API_KEY", "spoon-key")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingVar("GOOGLE_VISION_API_KEY"));

        let err = AppConfig::from_lookup(lookup_from(&[
            ("GOOGLE_VISION_API_KEY", "vision-key"),
            ("SPOONACULAR_API_KEY", "  "),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::MissingVar("SPOONACULAR_API_KEY"));
    }

    #[test]
    fn test_public_base_url_trailing_slash_trimmed() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("GOOGLE_VISION_API_KEY", "v"),
            ("SPOONACULAR_API_KEY", "s"),
            ("PUBLIC_BASE_URL", "https://food.example.com/"),
            ("STATIC_DIR", "/tmp/charts"),
        ]))
        .unwrap();

        assert_eq!(config.public_base_url.as_deref(), Some("https://food.example.com"));
        assert_eq!(config.static_dir, PathBuf::from("/tmp/charts"));
    }
}
