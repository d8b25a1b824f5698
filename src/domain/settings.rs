use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_false")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            console_logging_enabled: default_true(),
            file_logging_enabled: default_false(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            ansi_colors: default_true(),
            rotation: default_rotation(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "motor_controller".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Advertised Bluetooth name of the motor driver board.
    #[serde(default = "default_device_name")]
    pub device_name: String,

    /// How long a discovery scan runs before giving up.
    #[serde(default = "default_scan_duration_secs")]
    pub scan_duration_secs: u64,

    /// RFCOMM channel the peripheral listens on.
    #[serde(default = "default_rfcomm_channel")]
    pub rfcomm_channel: u8,

    /// Local socket name for the presence control channel.
    #[serde(default = "default_control_socket_name")]
    pub control_socket_name: String,

    #[serde(default)]
    pub log_settings: LogSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            scan_duration_secs: default_scan_duration_secs(),
            rfcomm_channel: default_rfcomm_channel(),
            control_socket_name: default_control_socket_name(),
            log_settings: LogSettings::default(),
        }
    }
}

fn default_device_name() -> String {
    crate::infrastructure::bluetooth::protocol::DEVICE_NAME.to_string()
}
fn default_scan_duration_secs() -> u64 {
    crate::infrastructure::bluetooth::protocol::SCAN_DURATION_SECS
}
fn default_rfcomm_channel() -> u8 {
    crate::infrastructure::bluetooth::protocol::RFCOMM_CHANNEL
}
fn default_control_socket_name() -> String {
    "@esp32_motor_control".to_string()
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::get_settings_path()?;
        match Self::load_from_file(&settings_path) {
            Ok(settings) => Ok(Self {
                settings,
                settings_path,
            }),
            Err(_) => {
                // First run (or unreadable file): start from defaults and
                // write them out so the user has something to edit.
                let service = Self {
                    settings: Settings::default(),
                    settings_path,
                };
                let _ = service.save();
                Ok(service)
            }
        }
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("MotorController");
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &PathBuf) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::bluetooth::protocol;

    #[test]
    fn test_defaults_match_deployment_constants() {
        let settings = Settings::default();
        assert_eq!(settings.device_name, protocol::DEVICE_NAME);
        assert_eq!(settings.scan_duration_secs, protocol::SCAN_DURATION_SECS);
        assert_eq!(settings.rfcomm_channel, protocol::RFCOMM_CHANNEL);
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.device_name, protocol::DEVICE_NAME);
        assert!(settings.log_settings.console_logging_enabled);
    }
}
