use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::atomic_io::write_text_atomic;
use crate::hotkey::HotkeyMode;

pub const SETTINGS_FILE: &str = "rally_settings.json";
pub const HOTKEY_MODE_ENV_VAR: &str = "RALLY_HOTKEY_MODE";
pub const DEFAULT_SAME_GROUP_DISTANCE: u32 = 30;
pub const MAX_SAME_GROUP_DISTANCE: u32 = 2000;

/// What holding shift does when a rally control is used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftKeyMode {
    #[default]
    AssignSlot,
    QueueOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RallySettings {
    pub hotkey_mode: HotkeyMode,
    pub shift_key_mode: ShiftKeyMode,
    pub same_group_distance: u32,
    pub jumping_selects_nearby: bool,
}

impl Default for RallySettings {
    fn default() -> Self {
        Self {
            hotkey_mode: HotkeyMode::FirstSlotOnly,
            shift_key_mode: ShiftKeyMode::AssignSlot,
            same_group_distance: DEFAULT_SAME_GROUP_DISTANCE,
            jumping_selects_nearby: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse settings {path} at {location}: {message}")]
    Parse {
        path: PathBuf,
        location: String,
        message: String,
    },
    #[error("failed to encode settings: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to write settings {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RallySettings {
    pub fn restore_default(&mut self) {
        *self = Self::default();
    }

    pub fn clamped(mut self) -> Self {
        self.same_group_distance = self.same_group_distance.min(MAX_SAME_GROUP_DISTANCE);
        self
    }

    /// Missing file means defaults. Fields absent from the file keep their
    /// defaults too.
    pub fn load_or_default(path: &Path) -> Result<Self, SettingsError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(SettingsError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::parse_json(&raw)
            .map(Self::clamped)
            .map_err(|(location, message)| SettingsError::Parse {
                path: path.to_path_buf(),
                location,
                message,
            })
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self).map_err(SettingsError::Encode)?;
        write_text_atomic(path, &json).map_err(|source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies an environment override of the hotkey mode. Unknown values are
    /// ignored with a warning.
    pub fn with_env_overrides(mut self, hotkey_mode: Option<&str>) -> Self {
        if let Some(raw) = hotkey_mode {
            match HotkeyMode::parse_token(raw) {
                Some(mode) => self.hotkey_mode = mode,
                None => tracing::warn!(
                    var = HOTKEY_MODE_ENV_VAR,
                    value = raw,
                    "settings_env_override_ignored"
                ),
            }
        }
        self
    }

    fn parse_json(raw: &str) -> Result<Self, (String, String)> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        serde_path_to_error::deserialize::<_, Self>(&mut deserializer).map_err(|error| {
            let location = error.path().to_string();
            (location, error.into_inner().to_string())
        })
    }
}
