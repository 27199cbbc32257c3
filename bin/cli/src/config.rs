//! Centralized application configuration.
//!
//! Loaded via the `config` crate from `PHOTOMESH__`-prefixed environment
//! variables, e.g. `PHOTOMESH__MESHY__POLL_INTERVAL_SECS=10`. The Meshy API
//! key is also accepted from the bare `MESHY_API_KEY` variable; the prefixed
//! form wins when both are set.

use photomesh_generation::{ApiKey, MeshyConfig, PollPolicy};
use photomesh_inference::GradioConfig;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Prefix of every configuration variable.
pub const ENV_PREFIX: &str = "PHOTOMESH";

/// Unprefixed variable accepted for the Meshy key.
pub const MESHY_API_KEY_VAR: &str = "MESHY_API_KEY";

/// Application configuration composed from library configs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub meshy: MeshySettings,

    #[serde(default)]
    pub gradio: GradioConfig,

    #[serde(default)]
    pub colmap: ColmapSettings,

    #[serde(default)]
    pub server: ServerSettings,
}

/// Text-to-3D service settings.
#[derive(Clone, Deserialize)]
pub struct MeshySettings {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_meshy_base_url")]
    pub base_url: String,

    /// Sleep between status fetches, in seconds.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Maximum status fetches per task. Unbounded when unset.
    #[serde(default)]
    pub max_poll_attempts: Option<u32>,

    /// Maximum wait per task, in seconds. Zero disables the deadline.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,

    #[serde(default = "default_meshy_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_meshy_base_url() -> String {
    MeshyConfig::DEFAULT_BASE_URL.to_string()
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_poll_timeout_secs() -> u64 {
    1800
}

fn default_meshy_request_timeout_secs() -> u64 {
    60
}

impl Default for MeshySettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_meshy_base_url(),
            poll_interval_secs: default_poll_interval_secs(),
            max_poll_attempts: None,
            poll_timeout_secs: default_poll_timeout_secs(),
            request_timeout_secs: default_meshy_request_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for MeshySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshySettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("max_poll_attempts", &self.max_poll_attempts)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl MeshySettings {
    /// Returns the configured key, if one is set and non-blank.
    #[must_use]
    pub fn api_key(&self) -> Option<ApiKey> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(ApiKey::new)
    }

    /// Client configuration for the given key.
    #[must_use]
    pub fn client_config(&self, api_key: ApiKey) -> MeshyConfig {
        MeshyConfig::new(api_key)
            .with_base_url(self.base_url.clone())
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs))
    }

    #[must_use]
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::default()
            .with_interval(Duration::from_secs(self.poll_interval_secs))
            .with_max_attempts(self.max_poll_attempts)
            .with_timeout(
                (self.poll_timeout_secs > 0).then(|| Duration::from_secs(self.poll_timeout_secs)),
            )
    }
}

/// External photogrammetry tool settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ColmapSettings {
    /// Program name or path.
    #[serde(default = "default_colmap_program")]
    pub program: String,
}

fn default_colmap_program() -> String {
    "colmap".to_string()
}

impl Default for ColmapSettings {
    fn default() -> Self {
        Self {
            program: default_colmap_program(),
        }
    }
}

/// Local HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed into its setting.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_vars(std::env::vars().collect())
    }

    /// Loads configuration from an explicit set of variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed into its setting.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(key) = vars.get(MESHY_API_KEY_VAR) {
            builder = builder.set_default("meshy.api_key", key.as_str())?;
        }
        builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(vars)),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_without_variables() {
        let config = AppConfig::from_vars(HashMap::new()).expect("config");
        assert_eq!(config.meshy.base_url, "https://api.meshy.ai");
        assert_eq!(config.meshy.poll_interval_secs, 5);
        assert!(config.meshy.api_key().is_none());
        assert_eq!(config.gradio.space, "tencent/Hunyuan3D-2");
        assert_eq!(config.colmap.program, "colmap");
        assert_eq!(config.server.bind, "127.0.0.1:5000");
    }

    #[test]
    fn prefixed_variables_override_defaults() {
        let config = AppConfig::from_vars(vars(&[
            ("PHOTOMESH__MESHY__POLL_INTERVAL_SECS", "10"),
            ("PHOTOMESH__MESHY__MAX_POLL_ATTEMPTS", "3"),
            ("PHOTOMESH__GRADIO__SPACE", "http://127.0.0.1:7860"),
            ("PHOTOMESH__COLMAP__PROGRAM", "/opt/colmap/bin/colmap"),
        ]))
        .expect("config");

        let policy = config.meshy.poll_policy();
        assert_eq!(policy.interval, Duration::from_secs(10));
        assert_eq!(policy.max_attempts, Some(3));
        assert!(config.gradio.is_direct_url());
        assert_eq!(config.colmap.program, "/opt/colmap/bin/colmap");
    }

    #[test]
    fn bare_meshy_key_is_accepted() {
        let config = AppConfig::from_vars(vars(&[("MESHY_API_KEY", "msy_bare")])).expect("config");
        assert_eq!(
            config.meshy.api_key().map(|k| k.expose().to_string()),
            Some("msy_bare".to_string())
        );
    }

    #[test]
    fn prefixed_meshy_key_wins() {
        let config = AppConfig::from_vars(vars(&[
            ("MESHY_API_KEY", "msy_bare"),
            ("PHOTOMESH__MESHY__API_KEY", "msy_prefixed"),
        ]))
        .expect("config");
        assert_eq!(
            config.meshy.api_key().map(|k| k.expose().to_string()),
            Some("msy_prefixed".to_string())
        );
    }

    #[test]
    fn zero_timeout_disables_deadline() {
        let settings = MeshySettings {
            poll_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(settings.poll_policy().timeout, None);
    }

    #[test]
    fn debug_output_redacts_key() {
        let settings = MeshySettings {
            api_key: Some("msy_secret".to_string()),
            ..Default::default()
        };
        assert!(!format!("{settings:?}").contains("msy_secret"));
    }
}
