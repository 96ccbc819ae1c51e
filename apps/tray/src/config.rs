//! Tray configuration.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/glazetray/tray.toml`
//! - Windows: `%APPDATA%/glazetray/tray.toml`

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use glazetray_protocol::commands::DEFAULT_EVENTS;
use glazetray_protocol::constants::DEFAULT_ENDPOINT;

/// Tray configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrayConfig {
    /// Window manager IPC endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Events that trigger a workspace re-resolution.
    #[serde(default = "default_events")]
    pub events: Vec<String>,

    /// Directory holding `<name>.ico` icon files.
    #[serde(default = "default_icon_dir")]
    pub icon_dir: PathBuf,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.into()
}

fn default_events() -> Vec<String> {
    DEFAULT_EVENTS.iter().map(|e| e.to_string()).collect()
}

fn default_icon_dir() -> PathBuf {
    PathBuf::from("icons")
}

impl Default for TrayConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            events: default_events(),
            icon_dir: default_icon_dir(),
        }
    }
}

impl TrayConfig {
    /// Loads configuration from disk, or creates a default if not found.
    pub fn load() -> anyhow::Result<Self> {
        let path = config_path()?;

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: TrayConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = TrayConfig::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Saves the current configuration to disk.
    pub fn save(&self) -> anyhow::Result<()> {
        let path = config_path()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("glazetray")
            .join("tray.toml"))
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata).join("glazetray").join("tray.toml"))
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        Ok(PathBuf::from("/tmp/glazetray/tray.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = TrayConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.events, vec!["focus_changed".to_string()]);
        assert_eq!(config.icon_dir, PathBuf::from("icons"));
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = TrayConfig {
            endpoint: "ws://localhost:7000".into(),
            events: vec!["focus_changed".into(), "workspace_activated".into()],
            icon_dir: PathBuf::from("/usr/share/glazetray/icons"),
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: TrayConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.endpoint, config.endpoint);
        assert_eq!(parsed.events, config.events);
        assert_eq!(parsed.icon_dir, config.icon_dir);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let parsed: TrayConfig = toml::from_str("endpoint = \"ws://localhost:9999\"").unwrap();
        assert_eq!(parsed.endpoint, "ws://localhost:9999");
        assert_eq!(parsed.events, vec!["focus_changed".to_string()]);
        assert_eq!(parsed.icon_dir, PathBuf::from("icons"));
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let parsed: TrayConfig = toml::from_str("").unwrap();
        assert_eq!(parsed.endpoint, TrayConfig::default().endpoint);
    }
}
