use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}, time::Duration};

use crate::{
    location::{PresetLocation, builtin_presets, find_preset},
    model::Units,
    retry::{DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_ATTEMPTS, RetryPolicy},
    source::openweather::{DEFAULT_ENDPOINT, DEFAULT_TIMEOUT},
};

/// Checked first, then [`FALLBACK_API_KEY_ENV`], then the config file.
pub const API_KEY_ENV: &str = "NOWCAST_API_KEY";
pub const FALLBACK_API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

pub const DEFAULT_RELOAD_AFTER_MS: u64 = 2000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: DEFAULT_MAX_ATTEMPTS, base_delay_ms: DEFAULT_BASE_DELAY_MS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartupConfig {
    /// Re-issue the startup load if it is still pending after this long. 0 disables.
    pub reload_after_ms: u64,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self { reload_after_ms: DEFAULT_RELOAD_AFTER_MS }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// units = "metric"
/// default_location = "Tokyo"
///
/// [retry]
/// max_attempts = 3
/// base_delay_ms = 1000
///
/// [[presets]]
/// name = "Paris"
/// lat = 48.8566
/// lon = 2.3522
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub units: Units,
    pub endpoint: Option<String>,
    pub default_location: Option<String>,
    pub timeout_secs: Option<u64>,
    pub retry: RetryConfig,
    pub startup: StartupConfig,

    /// Replaces the built-in presets when non-empty.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub presets: Vec<PresetLocation>,
}

impl Config {
    /// Load config from disk and apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        let cfg = Self::load_from(&path)?;
        Ok(cfg.with_env_overrides(|name| std::env::var(name).ok()))
    }

    /// Load from `path`, or return an empty default if it doesn't exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;
        self.save_to(&path)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "nowcast", "nowcast")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Replace the API key with the first non-empty environment value, if any.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let from_env = [API_KEY_ENV, FALLBACK_API_KEY_ENV]
            .into_iter()
            .filter_map(|name| lookup(name))
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty());

        if let Some(key) = from_env {
            self.api_key = Some(key);
        }
        self
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout_secs.map(Duration::from_secs).unwrap_or(DEFAULT_TIMEOUT)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry.max_attempts, self.retry.base_delay_ms)
    }

    pub fn reload_after(&self) -> Option<Duration> {
        match self.startup.reload_after_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    pub fn presets(&self) -> Vec<PresetLocation> {
        if self.presets.is_empty() { builtin_presets() } else { self.presets.clone() }
    }

    /// The configured default location, or the first preset.
    pub fn default_location(&self) -> Result<PresetLocation> {
        let presets = self.presets();

        match &self.default_location {
            Some(name) => find_preset(&presets, name).cloned().ok_or_else(|| {
                let known: Vec<&str> = presets.iter().map(|p| p.name.as_str()).collect();
                anyhow!("Unknown default location '{name}'. Known locations: {}.", known.join(", "))
            }),
            None => presets
                .into_iter()
                .next()
                .ok_or_else(|| anyhow!("No preset locations configured")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::{LONDON, TOKYO};

    fn env<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| pairs.iter().find(|(k, _)| *k == name).map(|(_, v)| v.to_string())
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();

        assert_eq!(cfg.api_key(), None);
        assert_eq!(cfg.units, Units::Metric);
        assert_eq!(cfg.endpoint(), DEFAULT_ENDPOINT);
        assert_eq!(cfg.retry_policy(), RetryPolicy::default());
        assert_eq!(cfg.reload_after(), Some(Duration::from_millis(2000)));
        assert_eq!(cfg.presets().len(), 4);
        assert_eq!(cfg.default_location().unwrap().coordinate, LONDON);
    }

    #[test]
    fn primary_env_var_wins() {
        let cfg = Config { api_key: Some("FILE_KEY".into()), ..Config::default() }
            .with_env_overrides(env(&[(API_KEY_ENV, "PRIMARY"), (FALLBACK_API_KEY_ENV, "FALLBACK")]));

        assert_eq!(cfg.api_key(), Some("PRIMARY"));
    }

    #[test]
    fn fallback_env_var_used_when_primary_blank() {
        let cfg = Config::default()
            .with_env_overrides(env(&[(API_KEY_ENV, "  "), (FALLBACK_API_KEY_ENV, "FALLBACK")]));

        assert_eq!(cfg.api_key(), Some("FALLBACK"));
    }

    #[test]
    fn file_key_kept_without_env() {
        let cfg = Config { api_key: Some("FILE_KEY".into()), ..Config::default() }
            .with_env_overrides(env(&[]));

        assert_eq!(cfg.api_key(), Some("FILE_KEY"));
    }

    #[test]
    fn parses_full_file() {
        let cfg: Config = toml::from_str(
            r#"
            api_key = "KEY"
            units = "imperial"
            default_location = "paris"
            timeout_secs = 3

            [retry]
            max_attempts = 5

            [startup]
            reload_after_ms = 0

            [[presets]]
            name = "Paris"
            lat = 48.8566
            lon = 2.3522
            "#,
        )
        .unwrap();

        assert_eq!(cfg.units, Units::Imperial);
        assert_eq!(cfg.timeout(), Duration::from_secs(3));
        assert_eq!(cfg.retry.max_attempts, 5);
        assert_eq!(cfg.retry.base_delay_ms, DEFAULT_BASE_DELAY_MS);
        assert_eq!(cfg.reload_after(), None);
        assert_eq!(cfg.presets().len(), 1);
        assert_eq!(cfg.default_location().unwrap().name, "Paris");
    }

    #[test]
    fn unknown_default_location_errors() {
        let cfg = Config { default_location: Some("Atlantis".into()), ..Config::default() };
        let err = cfg.default_location().unwrap_err();

        assert!(err.to_string().contains("Unknown default location"));
        assert!(err.to_string().contains("Tokyo"));
    }

    #[test]
    fn save_then_load_keeps_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config { default_location: Some("Tokyo".into()), ..Config::default() };
        cfg.set_api_key("SAVED".into());
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.api_key(), Some("SAVED"));
        assert_eq!(loaded.default_location().unwrap().coordinate, TOKYO);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert!(cfg.api_key.is_none());
    }
}
