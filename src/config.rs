//! Persisted plugin settings
//!
//! The settings live in a flat TOML table at `~/.config/nova/qalculate.toml`:
//!
//! ```toml
//! angle_unit = "radians"
//! parsing_mode = "conventional"
//! precision = 16
//! units_in_global_query = false
//! functions_in_global_query = false
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::engine::{AngleUnit, ParsingMode};
use crate::error::QalcResult;

pub const DEFAULT_PRECISION: u32 = 16;
pub const MIN_PRECISION: u32 = 1;
pub const MAX_PRECISION: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub angle_unit: AngleUnit,
    pub parsing_mode: ParsingMode,
    /// Significant digits of printed results
    pub precision: u32,
    pub units_in_global_query: bool,
    pub functions_in_global_query: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            angle_unit: AngleUnit::Radians,
            parsing_mode: ParsingMode::Conventional,
            precision: DEFAULT_PRECISION,
            units_in_global_query: false,
            functions_in_global_query: false,
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|h| h.join(".config"))
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
            })
            .join("nova")
            .join("qalculate.toml")
    }

    /// Parse settings from TOML text, clamping out of range values
    pub fn from_toml(content: &str) -> QalcResult<Self> {
        let mut settings: Settings = toml::from_str(content)?;
        settings.validate();
        Ok(settings)
    }

    /// Validate and clamp values to acceptable ranges
    pub fn validate(&mut self) {
        self.precision = clamp_precision(self.precision);
    }
}

pub fn clamp_precision(precision: u32) -> u32 {
    precision.clamp(MIN_PRECISION, MAX_PRECISION)
}

/// Where the plugin keeps its settings.
///
/// Every setting change saves the whole table, so a store only needs to
/// read and write snapshots.
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> QalcResult<Settings>;
    fn save(&self, settings: &Settings) -> QalcResult<()>;
}

/// Settings stored in a TOML file
#[derive(Debug, Clone)]
pub struct TomlSettingsStore {
    path: PathBuf,
}

impl TomlSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default location in the user's config directory
    pub fn user() -> Self {
        Self::new(Settings::config_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for TomlSettingsStore {
    /// Missing file means defaults; a file that does not parse is an error.
    fn load(&self) -> QalcResult<Settings> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "no settings file, using defaults");
            return Ok(Settings::default());
        }
        let content = fs::read_to_string(&self.path)?;
        Settings::from_toml(&content)
    }

    fn save(&self, settings: &Settings) -> QalcResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(settings)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

/// Settings kept in memory only, for hosts that persist on their own
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: Mutex<Settings>,
}

impl MemorySettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Mutex::new(settings),
        }
    }

    /// The last saved snapshot
    pub fn snapshot(&self) -> Settings {
        self.settings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> QalcResult<Settings> {
        Ok(self.snapshot())
    }

    fn save(&self, settings: &Settings) -> QalcResult<()> {
        *self
            .settings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = settings.clone();
        Ok(())
    }
}
