//! Runtime configuration read from the environment.
//!
//! Nothing here is required: without Supabase credentials the app runs
//! offline, and without a Gemini key every generated text falls back to a
//! canned line.

use std::fmt;
use std::path::PathBuf;

use crate::util::non_blank;

pub const ENV_SUPABASE_URL: &str = "SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "SUPABASE_ANON_KEY";
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_GEMINI_MODELS: &str = "GEMINI_MODELS";
pub const ENV_DB_PATH: &str = "CABANA_DB_PATH";

/// Models tried in order until one answers.
pub const DEFAULT_GEMINI_MODELS: [&str; 2] = ["gemini-2.5-flash", "gemini-2.5-pro"];

/// Remote store credentials. The key is public (anon) but still kept out of
/// logs.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteCredentials {
    url: String,
    anon_key: String,
}

impl RemoteCredentials {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn anon_key(&self) -> &str {
        &self.anon_key
    }
}

impl fmt::Debug for RemoteCredentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("RemoteCredentials")
            .field("url", &self.url)
            .field("anon_key", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct GeminiConfig {
    pub api_key: String,
    pub models: Vec<String>,
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("models", &self.models)
            .finish()
    }
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_models: Vec<String>,
    pub db_path: Option<PathBuf>,
}

impl AppConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary lookup (used by tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let gemini_models = non_blank(lookup(ENV_GEMINI_MODELS))
            .map(|raw| {
                raw.split(',')
                    .filter_map(|model| non_blank(Some(model.to_string())))
                    .collect::<Vec<_>>()
            })
            .filter(|models| !models.is_empty())
            .unwrap_or_else(|| {
                DEFAULT_GEMINI_MODELS
                    .iter()
                    .map(ToString::to_string)
                    .collect()
            });

        Self {
            supabase_url: non_blank(lookup(ENV_SUPABASE_URL)),
            supabase_anon_key: non_blank(lookup(ENV_SUPABASE_ANON_KEY)),
            gemini_api_key: non_blank(lookup(ENV_GEMINI_API_KEY)),
            gemini_models,
            db_path: non_blank(lookup(ENV_DB_PATH)).map(PathBuf::from),
        }
    }

    /// Both URL and key are needed; anything less means offline.
    ///
    /// The URL is not validated here: a malformed one is a bootstrap error,
    /// not a missing configuration.
    pub fn remote_credentials(&self) -> Option<RemoteCredentials> {
        match (&self.supabase_url, &self.supabase_anon_key) {
            (Some(url), Some(anon_key)) => Some(RemoteCredentials::new(url, anon_key)),
            (Some(_), None) | (None, Some(_)) => {
                tracing::warn!(
                    "Only one of {ENV_SUPABASE_URL} and {ENV_SUPABASE_ANON_KEY} is set; running offline"
                );
                None
            }
            (None, None) => None,
        }
    }

    pub fn gemini(&self) -> Option<GeminiConfig> {
        self.gemini_api_key.as_ref().map(|api_key| GeminiConfig {
            api_key: api_key.clone(),
            models: self.gemini_models.clone(),
        })
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");
        formatter
            .debug_struct("AppConfig")
            .field("supabase_url", &self.supabase_url)
            .field("supabase_anon_key", &redacted(&self.supabase_anon_key))
            .field("gemini_api_key", &redacted(&self.gemini_api_key))
            .field("gemini_models", &self.gemini_models)
            .field("db_path", &self.db_path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        AppConfig::from_lookup(|name| values.get(name).cloned())
    }

    #[test]
    fn empty_environment_is_offline_with_default_models() {
        let config = config_from(&[]);
        assert_eq!(config.remote_credentials(), None);
        assert_eq!(config.gemini(), None);
        assert_eq!(config.gemini_models, vec!["gemini-2.5-flash", "gemini-2.5-pro"]);
        assert_eq!(config.db_path, None);
    }

    #[test]
    fn credentials_need_both_values() {
        let config = config_from(&[(ENV_SUPABASE_URL, "https://abc.supabase.co")]);
        assert_eq!(config.remote_credentials(), None);

        let config = config_from(&[
            (ENV_SUPABASE_URL, " https://abc.supabase.co "),
            (ENV_SUPABASE_ANON_KEY, "anon"),
        ]);
        let credentials = config.remote_credentials().unwrap();
        assert_eq!(credentials.url(), "https://abc.supabase.co");
        assert_eq!(credentials.anon_key(), "anon");
    }

    #[test]
    fn blank_values_count_as_missing() {
        let config = config_from(&[
            (ENV_SUPABASE_URL, "   "),
            (ENV_SUPABASE_ANON_KEY, "anon"),
            (ENV_GEMINI_API_KEY, ""),
        ]);
        assert_eq!(config.remote_credentials(), None);
        assert_eq!(config.gemini(), None);
    }

    #[test]
    fn model_list_is_parsed_in_order() {
        let config = config_from(&[
            (ENV_GEMINI_API_KEY, "key"),
            (ENV_GEMINI_MODELS, "gemini-2.5-pro, ,gemini-2.0-flash"),
        ]);
        assert_eq!(
            config.gemini().unwrap().models,
            vec!["gemini-2.5-pro", "gemini-2.0-flash"]
        );

        let config = config_from(&[(ENV_GEMINI_MODELS, " , ")]);
        assert_eq!(config.gemini_models.len(), 2);
    }

    #[test]
    fn debug_output_redacts_keys() {
        let credentials = RemoteCredentials::new("https://abc.supabase.co", "anon-secret");
        assert!(!format!("{credentials:?}").contains("anon-secret"));

        let config = config_from(&[
            (ENV_GEMINI_API_KEY, "gemini-secret"),
            (ENV_SUPABASE_ANON_KEY, "anon-secret"),
        ]);
        assert!(!format!("{:?}", config.gemini().unwrap()).contains("gemini-secret"));
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("gemini-secret"));
        assert!(!rendered.contains("anon-secret"));
    }
}
