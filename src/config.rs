use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::notification::Notification;
use crate::roster::RobotRecord;

/// Address the backend serves the console from by default.
pub const DEFAULT_ORIGIN: &str = "http://127.0.0.1:4242";

/// Fleet configuration, loaded from TOML.
///
/// ```toml
/// origin = "https://field.local:4244"
///
/// [[turtles]]
/// id = 1
/// battery = 66
/// home = "Yellow home"
/// role = "INACTIVE"
/// team = "Magenta"
///
/// [[notifications]]
/// type = "success"
/// message = "Console ready"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetConfig {
    /// Page origin the state endpoint is derived from.
    pub origin: Option<String>,
    #[serde(default)]
    pub turtles: Vec<RobotRecord>,
    /// Shown in order once the session starts.
    #[serde(default)]
    pub notifications: Vec<Notification>,
}

impl Default for FleetConfig {
    fn default() -> Self {
        let turtle = |id, battery| RobotRecord {
            id,
            enabled: false,
            battery,
            home: "Yellow home".to_string(),
            role: "INACTIVE".to_string(),
            team: "Magenta".to_string(),
        };
        Self {
            origin: None,
            turtles: vec![
                turtle(1, 66),
                turtle(2, 42),
                turtle(3, 42),
                turtle(4, 100),
                turtle(5, 4),
                turtle(6, 0),
            ],
            notifications: Vec::new(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}: {}", .0.display(), .1)]
    ReadFailed(PathBuf, #[source] std::io::Error),

    #[error("failed to parse config {}: {}", .0.display(), .1)]
    ParseFailed(PathBuf, #[source] toml::de::Error),
}

impl FleetConfig {
    /// Load config from a TOML file path. Returns None if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))?;
        tracing::debug!(
            path = %path.display(),
            turtles = config.turtles.len(),
            "loaded fleet config"
        );
        Ok(Some(config))
    }

    /// Load from `path`, falling back to the built-in fleet when absent.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        Ok(Self::load(path)?.unwrap_or_default())
    }

    /// Resolve the page origin: explicit override, then file, then default.
    pub fn resolve_origin(&self, cli_origin: Option<&str>) -> String {
        cli_origin
            .or(self.origin.as_deref())
            .unwrap_or(DEFAULT_ORIGIN)
            .to_string()
    }
}

/// `<config dir>/turtle-console/fleet.toml`, or a relative `fleet.toml` when
/// the platform has no config directory.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("turtle-console"))
        .unwrap_or_default()
        .join("fleet.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::NotificationType;

    #[test]
    fn parse_full_config() {
        let toml = r#"
            origin = "https://field.local:4244"

            [[turtles]]
            id = 7
            battery = 90
            home = "Blue home"
            role = "GOALKEEPER"
            team = "Cyan"

            [[turtles]]
            id = 8
            enabled = true
            battery = 10
            home = "Blue home"
            role = "INACTIVE"
            team = "Cyan"

            [[notifications]]
            type = "error"
            message = "Pants on fire"
        "#;
        let config: FleetConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.origin.as_deref(), Some("https://field.local:4244"));
        assert_eq!(config.turtles.len(), 2);
        assert!(!config.turtles[0].enabled);
        assert!(config.turtles[1].enabled);
        assert_eq!(config.notifications.len(), 1);
        assert_eq!(config.notifications[0].notification_type(), NotificationType::Error);
        assert_eq!(config.notifications[0].message(), "Pants on fire");
    }

    #[test]
    fn parse_empty_config() {
        let config: FleetConfig = toml::from_str("").unwrap();
        assert!(config.turtles.is_empty());
        assert!(config.notifications.is_empty());
        assert!(config.origin.is_none());
    }

    #[test]
    fn default_fleet_has_six_disabled_turtles() {
        let config = FleetConfig::default();
        let ids: Vec<u32> = config.turtles.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
        let batteries: Vec<u8> = config.turtles.iter().map(|t| t.battery).collect();
        assert_eq!(batteries, vec![66, 42, 42, 100, 4, 0]);
        assert!(config.turtles.iter().all(|t| !t.enabled));
        assert!(config.notifications.is_empty());
    }

    #[test]
    fn missing_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(FleetConfig::load(&path).unwrap().is_none());
        assert_eq!(FleetConfig::load_or_default(&path).unwrap(), FleetConfig::default());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fleet.toml");
        std::fs::write(
            &path,
            "[[turtles]]\nid = 3\nbattery = 5\nhome = \"h\"\nrole = \"r\"\nteam = \"t\"\n",
        )
        .unwrap();
        let config = FleetConfig::load(&path).unwrap().unwrap();
        assert_eq!(config.turtles[0].id, 3);
    }

    #[test]
    fn parse_error_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "turtles = 5").unwrap();
        let err = FleetConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseFailed(..)));
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn origin_resolution_order() {
        let mut config = FleetConfig::default();
        assert_eq!(config.resolve_origin(None), DEFAULT_ORIGIN);
        config.origin = Some("https://file:1".into());
        assert_eq!(config.resolve_origin(None), "https://file:1");
        assert_eq!(config.resolve_origin(Some("http://cli:2")), "http://cli:2");
    }

    #[test]
    fn default_config_path_ends_with_fleet_toml() {
        assert!(default_config_path().ends_with("fleet.toml"));
    }
}
