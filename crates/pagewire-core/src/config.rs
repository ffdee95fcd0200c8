//! Configuration management for Pagewire.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides. The loaded value is threaded explicitly
//! into the browser engine and the extractor; nothing here is process-global.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration.
///
/// This is loaded from `~/.config/pagewire/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Browser launch settings
    pub browser: BrowserConfig,
    /// Extraction session settings
    pub extraction: ExtractionConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML or fail validation
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(&config_path)?;
            Self::from_toml_str(&contents)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `PAGEWIRE_CHROME_PATH`: Chrome/Chromium executable
    /// - `PAGEWIRE_HEADLESS`: Override headless mode (true/false)
    /// - `PAGEWIRE_SCROLL_DELAY_MS`: Override the default scroll delay
    /// - `PAGEWIRE_SESSION_TIMEOUT_SECS`: Override the session deadline
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in production).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("PAGEWIRE_CHROME_PATH") {
            if !path.is_empty() {
                tracing::debug!("Override browser.chrome_path from env: {}", path);
                self.browser.chrome_path = Some(PathBuf::from(path));
            }
        }

        if let Some(val) = lookup("PAGEWIRE_HEADLESS") {
            if let Ok(headless) = val.parse() {
                self.browser.headless = headless;
                tracing::debug!("Override browser.headless from env: {}", headless);
            }
        }

        if let Some(val) = lookup("PAGEWIRE_SCROLL_DELAY_MS") {
            if let Ok(delay) = val.parse() {
                self.extraction.default_scroll_delay_ms = delay;
                tracing::debug!("Override extraction.default_scroll_delay_ms from env: {}", delay);
            }
        }

        if let Some(val) = lookup("PAGEWIRE_SESSION_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                self.extraction.session_timeout_secs = secs;
                tracing::debug!("Override extraction.session_timeout_secs from env: {}", secs);
            }
        }
    }

    /// Validate every section.
    pub fn validate(&self) -> ConfigResult<()> {
        self.browser.validate()?;
        self.extraction.validate()
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let config_path = Self::config_path()?;
        let config_dir = config_path
            .parent()
            .ok_or_else(|| ConfigError::invalid("config_path", "no parent directory"))?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/pagewire/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "pagewire", "pagewire").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// Browser launch settings.
///
/// Each boolean maps to the Chrome switch of the same name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct BrowserConfig {
    /// Chrome/Chromium executable; auto-detected when unset
    pub chrome_path: Option<PathBuf>,
    /// Run browser in headless mode
    pub headless: bool,
    /// Pass `--disable-gpu`
    pub disable_gpu: bool,
    /// Pass `--no-sandbox`
    pub no_sandbox: bool,
    /// Pass `--disable-dev-shm-usage`
    pub disable_dev_shm_usage: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Fixed user agent; the browser default is used when unset
    pub user_agent: Option<String>,
    /// Pick user agent and viewport from a desktop pool at launch
    pub randomize_fingerprint: bool,
    /// Additional raw Chrome arguments
    pub extra_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: true,
            disable_gpu: true,
            no_sandbox: true,
            disable_dev_shm_usage: true,
            window_width: 1920,
            window_height: 1080,
            user_agent: None,
            randomize_fingerprint: false,
            extra_args: Vec::new(),
        }
    }
}

impl BrowserConfig {
    /// Validate launch settings.
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(path) = &self.chrome_path {
            if !path.exists() {
                return Err(ConfigError::invalid(
                    "browser.chrome_path",
                    format!("{} does not exist", path.display()),
                ));
            }
        }

        if self.window_width == 0 || self.window_height == 0 {
            return Err(ConfigError::invalid(
                "browser.window_size",
                format!(
                    "must be greater than zero, got {}x{}",
                    self.window_width, self.window_height
                ),
            ));
        }

        Ok(())
    }

    /// Chrome switches implied by the boolean flags and `extra_args`.
    ///
    /// Headless mode and window size are applied by the launcher itself.
    #[must_use]
    pub fn launch_flags(&self) -> Vec<String> {
        let mut flags = Vec::new();
        if self.disable_gpu {
            flags.push("--disable-gpu".to_string());
        }
        if self.no_sandbox {
            flags.push("--no-sandbox".to_string());
        }
        if self.disable_dev_shm_usage {
            flags.push("--disable-dev-shm-usage".to_string());
        }
        flags.extend(self.extra_args.iter().cloned());
        flags
    }
}

/// Extraction session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Scroll delay used when a request does not pick one
    pub default_scroll_delay_ms: u64,
    /// How long to wait for the content container to become visible
    pub element_timeout_secs: u64,
    /// How long the driver waits for the next page before finishing (0 = forever)
    pub idle_timeout_secs: u64,
    /// Deadline for a whole session (0 = none)
    pub session_timeout_secs: u64,
    /// Grace period for in-flight decode tasks at teardown
    pub teardown_grace_ms: u64,
    /// Maximum per-exchange errors kept for one session
    pub error_capacity: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            default_scroll_delay_ms: 2000,
            element_timeout_secs: 30,
            idle_timeout_secs: 30,
            session_timeout_secs: 180,
            teardown_grace_ms: 5000,
            error_capacity: 64,
        }
    }
}

impl ExtractionConfig {
    /// Validate session settings.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.element_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "extraction.element_timeout_secs",
                "must be greater than zero",
            ));
        }
        if self.error_capacity == 0 {
            return Err(ConfigError::invalid(
                "extraction.error_capacity",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Scroll delay used when a request does not pick one.
    #[must_use]
    pub fn default_scroll_delay(&self) -> Duration {
        Duration::from_millis(self.default_scroll_delay_ms)
    }

    /// Bounded wait for the content container.
    #[must_use]
    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout_secs)
    }

    /// Idle wait between pages, `None` when disabled.
    #[must_use]
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }

    /// Session deadline, `None` when disabled.
    #[must_use]
    pub fn session_timeout(&self) -> Option<Duration> {
        (self.session_timeout_secs > 0).then(|| Duration::from_secs(self.session_timeout_secs))
    }

    /// Teardown grace period.
    #[must_use]
    pub fn teardown_grace(&self) -> Duration {
        Duration::from_millis(self.teardown_grace_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.browser.headless);
        assert!(config.browser.no_sandbox);
        assert_eq!(config.browser.window_width, 1920);
        assert_eq!(config.extraction.default_scroll_delay_ms, 2000);
        assert_eq!(config.extraction.error_capacity, 64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("[browser]"));
        assert!(toml_str.contains("[extraction]"));

        let parsed = AppConfig::from_toml_str(&toml_str).expect("parse serialized config");
        assert_eq!(parsed.extraction.idle_timeout_secs, config.extraction.idle_timeout_secs);
    }

    #[test]
    fn test_config_save_load() {
        let tmp = TempDir::new().expect("create temp dir");
        let config_path = tmp.path().join("config.toml");

        let mut config = AppConfig::default();
        config.browser.headless = false;
        config.extraction.session_timeout_secs = 60;

        let contents = toml::to_string_pretty(&config).expect("serialize config");
        fs::write(&config_path, contents).expect("write config file");

        let loaded_contents = fs::read_to_string(&config_path).expect("read config file");
        let loaded = AppConfig::from_toml_str(&loaded_contents).expect("parse loaded config");

        assert!(!loaded.browser.headless);
        assert_eq!(loaded.extraction.session_timeout_secs, 60);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("PAGEWIRE_HEADLESS", "false"),
            ("PAGEWIRE_SCROLL_DELAY_MS", "750"),
            ("PAGEWIRE_SESSION_TIMEOUT_SECS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env(|key| env.get(key).map(|v| (*v).to_string()));

        assert!(!config.browser.headless);
        assert_eq!(config.extraction.default_scroll_delay_ms, 750);
        // Unparseable values leave the default in place
        assert_eq!(config.extraction.session_timeout_secs, 180);
        assert!(config.browser.chrome_path.is_none());
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[browser]
headless = false
extra_args = ["--lang=en-US"]
"#;

        let config = AppConfig::from_toml_str(toml_str).expect("parse partial config");
        assert!(!config.browser.headless);
        assert_eq!(config.browser.extra_args, vec!["--lang=en-US".to_string()]);
        // These should be defaults
        assert_eq!(config.extraction.element_timeout_secs, 30);
        assert!(config.browser.disable_gpu);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.browser.window_width = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));

        let mut config = AppConfig::default();
        config.browser.chrome_path = Some(PathBuf::from("/definitely/not/chrome"));
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.extraction.error_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_launch_flags() {
        let mut config = BrowserConfig::default();
        config.no_sandbox = false;
        config.extra_args.push("--mute-audio".to_string());

        let flags = config.launch_flags();
        assert!(flags.contains(&"--disable-gpu".to_string()));
        assert!(!flags.contains(&"--no-sandbox".to_string()));
        assert_eq!(flags.last().map(String::as_str), Some("--mute-audio"));
    }

    #[test]
    fn test_duration_helpers() {
        let mut config = ExtractionConfig::default();
        assert_eq!(config.idle_timeout(), Some(Duration::from_secs(30)));
        config.idle_timeout_secs = 0;
        config.session_timeout_secs = 0;
        assert!(config.idle_timeout().is_none());
        assert!(config.session_timeout().is_none());
    }
}
