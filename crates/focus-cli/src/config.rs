//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use focus_client::{ClientError, DEFAULT_TIMEOUT, HttpSessionApi};
use focus_core::EngineConfig;
use serde::{Deserialize, Serialize};

/// Bound on a single remote call made while a session is hosted.
const DEFAULT_REMOTE_TIMEOUT_MS: u64 = 15_000;

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub notifier: NotifierKind,
}

/// Remote session API settings. The remote is used only when both the base
/// URL and the token are set.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: Option<String>,
    pub token: Option<String>,
    /// `0` waits on the remote indefinitely.
    pub timeout_ms: Option<u64>,
}

/// How system notifications are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifierKind {
    /// `[focus] title: body` on stderr.
    #[default]
    Terminal,
    /// `notify-send`.
    Desktop,
    Off,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            token: None,
            timeout_ms: Some(DEFAULT_REMOTE_TIMEOUT_MS),
        }
    }
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("remote", &self.remote)
            .field("engine", &self.engine)
            .field("notifier", &self.notifier)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("focus.db"),
            remote: RemoteConfig::default(),
            engine: EngineConfig::default(),
            notifier: NotifierKind::default(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    ///
    /// Later layers win: defaults, the user config file, `config_path`, then
    /// `FOCUS_*` environment variables (`__` separates nested keys, e.g.
    /// `FOCUS_REMOTE__TOKEN`).
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("FOCUS_").split("__"));

        figment.extract()
    }

    pub fn remote_timeout(&self) -> Option<Duration> {
        self.remote
            .timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// Builds the remote client, or `None` when the remote is not configured.
    pub fn session_api(&self) -> Result<Option<HttpSessionApi>, ClientError> {
        let (Some(base_url), Some(token)) = (&self.remote.base_url, &self.remote.token) else {
            return Ok(None);
        };
        let transport_timeout = self.remote_timeout().unwrap_or(DEFAULT_TIMEOUT);
        HttpSessionApi::new(base_url, token.clone(), transport_timeout).map(Some)
    }
}

/// Returns the platform-specific config directory for focus.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("focus"))
}

/// Returns the platform-specific data directory for focus.
///
/// On Linux: `~/.local/share/focus`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("focus"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_data_path_ends_with_focus() {
        let path = dirs_data_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "focus");
    }

    #[test]
    fn test_default_config_uses_data_dir_for_db() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.database_path, data_dir.join("focus.db"));
        assert_eq!(config.notifier, NotifierKind::Terminal);
        assert_eq!(config.remote_timeout(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            database_path = "/tmp/focus-test.db"
            notifier = "off"

            [remote]
            base_url = "http://localhost:5000"
            token = "secret-token"

            [engine]
            idle_timeout_ms = 60000
            "#,
        )
        .unwrap();

        let config = Config::load_from(Some(&path)).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/focus-test.db"));
        assert_eq!(config.notifier, NotifierKind::Off);
        assert_eq!(config.engine.idle_timeout_ms, 60_000);
        assert_eq!(config.engine.critical_streak, 3);
        assert!(config.session_api().unwrap().is_some());
    }

    #[test]
    fn test_remote_requires_url_and_token() {
        let mut config = Config::default();
        config.remote.base_url = Some("http://localhost:5000".into());
        assert!(config.session_api().unwrap().is_none());
    }

    #[test]
    fn test_zero_timeout_is_unbounded() {
        let mut config = Config::default();
        config.remote.timeout_ms = Some(0);
        assert_eq!(config.remote_timeout(), None);
    }

    #[test]
    fn test_debug_redacts_token() {
        let mut config = Config::default();
        config.remote.token = Some("secret-token".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("[REDACTED]"));
    }
}
