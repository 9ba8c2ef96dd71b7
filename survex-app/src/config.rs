use std::fs::read_to_string;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use survex_experiment::ExperimentConfig;
use survex_submit::SheetsConfig;
use tracing::{info, warn};

pub const DEFAULT_PORT: u16 = 8501;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub title: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            title: "Video survey".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub max_sessions: usize,
    pub idle_timeout_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: 1024,
            idle_timeout_secs: 2 * 60 * 60,
            sweep_interval_secs: 60,
        }
    }
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

/// Full service configuration.
///
/// Layered as: built-in defaults, then the optional TOML file, then
/// environment variables, then command-line flags (applied by the binary).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub experiment: ExperimentConfig,
    pub sheets: SheetsConfig,
    pub session: SessionConfig,
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                info!("No config file given, using defaults");
                Self::default()
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = toml::from_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Overrides settings from `lookup`, normally the process environment.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(port) = lookup("SURVEX_PORT") {
            match port.trim().parse() {
                Ok(port) => self.server.port = port,
                Err(e) => warn!("Ignoring invalid SURVEX_PORT '{}': {}", port, e),
            }
        }
        if let Some(dir) = lookup("SURVEX_VIDEO_DIR") {
            self.experiment.video_dir = PathBuf::from(dir);
        }
        if let Some(id) = lookup("SURVEX_SPREADSHEET_ID").filter(|s| !s.trim().is_empty()) {
            self.sheets.spreadsheet_id = Some(id);
        }
        if let Some(path) = lookup("SURVEX_TOKEN_PATH") {
            self.sheets.token_path = PathBuf::from(path);
        }
        if let Some(id) = lookup("GOOGLE_CLIENT_ID") {
            self.sheets.client_id = Some(id);
        }
        if let Some(secret) = lookup("GOOGLE_CLIENT_SECRET") {
            self.sheets.client_secret = Some(secret);
        }
        if let Some(uri) = lookup("GOOGLE_TOKEN_URI") {
            self.sheets.token_uri = uri;
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn toml_sections_override_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            port = 9000

            [experiment]
            video_dir = "/srv/clips"

            [sheets]
            spreadsheet_id = "abc"
            range = "Responses!A1"

            [session]
            max_sessions = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.bind_address(), "127.0.0.1:9000");
        assert_eq!(config.experiment.video_dir, PathBuf::from("/srv/clips"));
        assert_eq!(config.sheets.spreadsheet_id.as_deref(), Some("abc"));
        assert_eq!(config.sheets.range, "Responses!A1");
        assert_eq!(config.session.max_sessions, 10);
        assert_eq!(config.session.idle_timeout_secs, 7200);
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            ("SURVEX_PORT", "8080"),
            ("SURVEX_VIDEO_DIR", "clips"),
            ("SURVEX_SPREADSHEET_ID", "sheet-9"),
            ("GOOGLE_CLIENT_ID", "client"),
            ("GOOGLE_CLIENT_SECRET", "secret"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.experiment.video_dir, PathBuf::from("clips"));
        assert_eq!(config.sheets.spreadsheet_id.as_deref(), Some("sheet-9"));
        assert_eq!(config.sheets.client_id.as_deref(), Some("client"));
        assert_eq!(config.sheets.client_secret.as_deref(), Some("secret"));
    }

    #[test]
    fn invalid_port_and_blank_sheet_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_env(|k| match k {
            "SURVEX_PORT" => Some("eighty".into()),
            "SURVEX_SPREADSHEET_ID" => Some("  ".into()),
            _ => None,
        });
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert!(config.sheets.spreadsheet_id.is_none());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::from_file(&dir.path().join("nope.toml")).is_err());
    }
}
