//! Appliance configuration, a TOML file under the user config dir.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("no config directory available on this system")]
    NoConfigDir,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub display: DisplayConfig,
    pub touch: TouchConfig,
    pub weather: WeatherConfig,
    pub calendar: CalendarConfig,
    pub clock: ClockConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub device: PathBuf,
    pub width: u32,
    pub height: u32,
    pub bpp: u8,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from("/dev/fb0"),
            width: 480,
            height: 800,
            bpp: 16,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TouchConfig {
    pub device: PathBuf,
    pub raw_max_x: u32,
    pub raw_max_y: u32,
    pub swap_axes: bool,
    pub invert_x: bool,
    pub invert_y: bool,
}

impl Default for TouchConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from("/dev/input/event0"),
            raw_max_x: 4095,
            raw_max_y: 4095,
            swap_axes: false,
            invert_x: false,
            invert_y: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub city: String,
    pub units: String,
    pub api_key: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            city: "Chicago,IL".into(),
            units: "imperial".into(),
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    pub calendar_id: String,
    pub client_id: String,
    pub client_secret: String,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            calendar_id: "primary".into(),
            client_id: String::new(),
            client_secret: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Fallback when the system timezone cannot be detected.
    pub utc_offset_hours: Option<i8>,
}

impl Config {
    /// Resolved config path: an explicit override, else
    /// `~/.config/glance/config.toml`.
    pub fn path(overridden: Option<&Path>) -> Result<PathBuf, ConfigError> {
        match overridden {
            Some(path) => Ok(path.to_path_buf()),
            None => Ok(base_dir()?.join("config.toml")),
        }
    }

    /// Loads the config, falling back to defaults when the file does not
    /// exist yet. A file that exists but does not parse is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                log::info!("no config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

pub fn base_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir().map(|dir| dir.join("glance")).ok_or(ConfigError::NoConfigDir)
}

pub fn token_path() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("token.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_common_devices() {
        let config = Config::default();
        assert_eq!(config.display.device, PathBuf::from("/dev/fb0"));
        assert_eq!(config.display.width, 480);
        assert_eq!(config.display.bpp, 16);
        assert_eq!(config.weather.city, "Chicago,IL");
        assert_eq!(config.weather.units, "imperial");
        assert_eq!(config.calendar.calendar_id, "primary");
        assert!(config.clock.utc_offset_hours.is_none());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [weather]
            api_key = "abc123"
            city = "Berlin,DE"

            [display]
            width = 1080
            height = 1920
            bpp = 32
            "#,
        )
        .unwrap();
        assert_eq!(config.weather.api_key, "abc123");
        assert_eq!(config.weather.city, "Berlin,DE");
        assert_eq!(config.weather.units, "imperial");
        assert_eq!(config.display.width, 1080);
        assert_eq!(config.display.bpp, 32);
        assert_eq!(config.touch.raw_max_x, 4095);
    }

    #[test]
    fn unknown_offset_survives_roundtrip() {
        let mut config = Config::default();
        config.clock.utc_offset_hours = Some(-6);
        let text = toml::to_string(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.clock.utc_offset_hours, Some(-6));
    }
}
