//! Launcher-facing plugin.
//!
//! The launcher talks to extensions through the small traits below. A
//! [`Plugin`] is created either synchronously with [`Plugin::new`], or in the
//! background with [`Plugin::spawn`], in which case the host waits on the
//! returned [`PendingPlugin`] before sending queries.

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;

use serde::de::{DeserializeOwned, IntoDeserializer};
use serde::Serialize;

use crate::config::{clamp_precision, Settings, SettingsStore, MAX_PRECISION, MIN_PRECISION};
use crate::core::adapter::QueryAdapter;
use crate::core::item::{RankItem, ResultItem};
use crate::core::query::Query;
use crate::engine::{AngleUnit, BuiltinCalculator, Calculator, ParsingMode};
use crate::error::{QalcError, QalcResult};

pub const PLUGIN_ID: &str = "qalculate";
pub const DEFAULT_TRIGGER: &str = "=";
pub const SYNOPSIS: &str = "<math expression>";

/// Identity of an extension
pub trait Extension {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn description(&self) -> &str;
}

/// Handles queries that start with the extension's trigger
pub trait TriggerQueryHandler: Extension {
    fn default_trigger(&self) -> &str;
    fn synopsis(&self) -> &str;
    fn handle_trigger_query(&self, query: &Query) -> Vec<ResultItem>;
}

/// Handles every query the user types, alongside other extensions
pub trait GlobalQueryHandler: Extension {
    fn handle_global_query(&self, query: &Query) -> Vec<RankItem>;
}

/// Exposes settings to the launcher's settings page
pub trait Configurable {
    fn config_widget(&self) -> ConfigWidget;
    fn apply_setting(&self, change: SettingChange) -> QalcResult<()>;
}

/// Settings page description, rendered by the frontend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigWidget {
    pub fields: Vec<ConfigField>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConfigField {
    Choice {
        key: String,
        label: String,
        options: Vec<String>,
        selected: usize,
    },
    SpinBox {
        key: String,
        label: String,
        min: u32,
        max: u32,
        value: u32,
    },
    Toggle {
        key: String,
        label: String,
        checked: bool,
    },
}

impl ConfigField {
    pub fn key(&self) -> &str {
        match self {
            ConfigField::Choice { key, .. }
            | ConfigField::SpinBox { key, .. }
            | ConfigField::Toggle { key, .. } => key,
        }
    }
}

pub const KEY_ANGLE_UNIT: &str = "angle_unit";
pub const KEY_PARSING_MODE: &str = "parsing_mode";
pub const KEY_PRECISION: &str = "precision";
pub const KEY_UNITS_IN_GLOBAL_QUERY: &str = "units_in_global_query";
pub const KEY_FUNCTIONS_IN_GLOBAL_QUERY: &str = "functions_in_global_query";

/// A setting the user changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingChange {
    AngleUnit(AngleUnit),
    ParsingMode(ParsingMode),
    Precision(u32),
    UnitsInGlobalQuery(bool),
    FunctionsInGlobalQuery(bool),
}

impl SettingChange {
    /// A choice field switched to the option at `index`
    pub fn choice(key: &str, index: usize) -> Option<Self> {
        match key {
            KEY_ANGLE_UNIT => AngleUnit::ALL.get(index).copied().map(SettingChange::AngleUnit),
            KEY_PARSING_MODE => ParsingMode::ALL.get(index).copied().map(SettingChange::ParsingMode),
            _ => None,
        }
    }

    /// Parse a `key = value` pair as written in the settings file
    pub fn parse(key: &str, value: &str) -> QalcResult<Self> {
        let value = value.trim();
        match key {
            KEY_ANGLE_UNIT => parse_enum(key, value).map(SettingChange::AngleUnit),
            KEY_PARSING_MODE => parse_enum(key, value).map(SettingChange::ParsingMode),
            KEY_PRECISION => value
                .parse()
                .map(SettingChange::Precision)
                .map_err(|e| QalcError::Config(format!("{}: {}", key, e))),
            KEY_UNITS_IN_GLOBAL_QUERY => parse_bool(key, value).map(SettingChange::UnitsInGlobalQuery),
            KEY_FUNCTIONS_IN_GLOBAL_QUERY => {
                parse_bool(key, value).map(SettingChange::FunctionsInGlobalQuery)
            }
            _ => Err(QalcError::Config(format!("unknown setting \"{}\"", key))),
        }
    }
}

fn parse_enum<T: DeserializeOwned>(key: &str, value: &str) -> QalcResult<T> {
    let de: serde::de::value::StrDeserializer<'_, serde::de::value::Error> =
        value.into_deserializer();
    T::deserialize(de).map_err(|e| QalcError::Config(format!("{}: {}", key, e)))
}

fn parse_bool(key: &str, value: &str) -> QalcResult<bool> {
    match value {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(QalcError::Config(format!("{}: expected a boolean, got \"{}\"", key, value))),
    }
}

/// The calculator extension
pub struct Plugin<C: Calculator = BuiltinCalculator> {
    adapter: QueryAdapter<C>,
    store: Arc<dyn SettingsStore>,
}

impl Plugin<BuiltinCalculator> {
    /// Initialize with the built-in calculator
    pub fn new(store: Arc<dyn SettingsStore>) -> QalcResult<Self> {
        Self::with_calculator(BuiltinCalculator::new(), store)
    }

    /// Initialize with the built-in calculator on a background thread
    pub fn spawn(store: Arc<dyn SettingsStore>) -> PendingPlugin<BuiltinCalculator> {
        Self::spawn_with(BuiltinCalculator::new, store)
    }
}

impl<C: Calculator + 'static> Plugin<C> {
    /// Load definitions into `calculator` and apply the stored settings
    pub fn with_calculator(mut calculator: C, store: Arc<dyn SettingsStore>) -> QalcResult<Self> {
        let settings = store
            .load()
            .map_err(|e| QalcError::Initialization(format!("failed to load settings: {}", e)))?;

        // Missing data only costs features, so keep going
        if let Err(e) = calculator.load_exchange_rates() {
            tracing::warn!("Failed to load exchange rates: {}", e);
        }
        if let Err(e) = calculator.load_global_definitions() {
            tracing::warn!("Failed to load global definitions: {}", e);
        }
        if let Err(e) = calculator.load_local_definitions() {
            tracing::warn!("Failed to load local definitions: {}", e);
        }

        tracing::info!(
            precision = settings.precision,
            angle_unit = settings.angle_unit.label(),
            parsing_mode = settings.parsing_mode.label(),
            "Calculator plugin initialized"
        );

        Ok(Self {
            adapter: QueryAdapter::new(calculator, &settings),
            store,
        })
    }

    /// Build the calculator and initialize on a background thread
    pub fn spawn_with<F>(make_calculator: F, store: Arc<dyn SettingsStore>) -> PendingPlugin<C>
    where
        F: FnOnce() -> C + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name("qalc-init".to_string())
            .spawn(move || {
                let plugin = Self::with_calculator(make_calculator(), store);
                // the host may have dropped the pending plugin
                let _ = sender.send(plugin);
            });

        if let Err(e) = spawned {
            tracing::warn!("Failed to spawn initialization thread: {}", e);
        }
        PendingPlugin { receiver }
    }

    pub fn adapter(&self) -> &QueryAdapter<C> {
        &self.adapter
    }

    pub fn settings(&self) -> Settings {
        self.adapter.settings()
    }
}

impl<C: Calculator> Extension for Plugin<C> {
    fn id(&self) -> &str {
        PLUGIN_ID
    }

    fn name(&self) -> &str {
        "Qalculate!"
    }

    fn description(&self) -> &str {
        "Evaluate math expressions and convert units"
    }
}

impl<C: Calculator> TriggerQueryHandler for Plugin<C> {
    fn default_trigger(&self) -> &str {
        DEFAULT_TRIGGER
    }

    fn synopsis(&self) -> &str {
        SYNOPSIS
    }

    fn handle_trigger_query(&self, query: &Query) -> Vec<ResultItem> {
        self.adapter.handle_trigger_query(query)
    }
}

impl<C: Calculator> GlobalQueryHandler for Plugin<C> {
    fn handle_global_query(&self, query: &Query) -> Vec<RankItem> {
        self.adapter.handle_global_query(query)
    }
}

impl<C: Calculator> Configurable for Plugin<C> {
    fn config_widget(&self) -> ConfigWidget {
        let settings = self.adapter.settings();
        let position = |found: Option<usize>| found.unwrap_or(0);

        ConfigWidget {
            fields: vec![
                ConfigField::Choice {
                    key: KEY_ANGLE_UNIT.to_string(),
                    label: "Angle unit".to_string(),
                    options: AngleUnit::ALL.iter().map(|u| u.label().to_string()).collect(),
                    selected: position(AngleUnit::ALL.iter().position(|u| *u == settings.angle_unit)),
                },
                ConfigField::Choice {
                    key: KEY_PARSING_MODE.to_string(),
                    label: "Parsing mode".to_string(),
                    options: ParsingMode::ALL.iter().map(|m| m.label().to_string()).collect(),
                    selected: position(
                        ParsingMode::ALL.iter().position(|m| *m == settings.parsing_mode),
                    ),
                },
                ConfigField::SpinBox {
                    key: KEY_PRECISION.to_string(),
                    label: "Precision".to_string(),
                    min: MIN_PRECISION,
                    max: MAX_PRECISION,
                    value: settings.precision,
                },
                ConfigField::Toggle {
                    key: KEY_UNITS_IN_GLOBAL_QUERY.to_string(),
                    label: "Units in global query".to_string(),
                    checked: settings.units_in_global_query,
                },
                ConfigField::Toggle {
                    key: KEY_FUNCTIONS_IN_GLOBAL_QUERY.to_string(),
                    label: "Functions in global query".to_string(),
                    checked: settings.functions_in_global_query,
                },
            ],
        }
    }

    /// Apply `change` to the live configuration and persist it
    ///
    /// Blocks while a calculation is running. A failed save is returned, but
    /// the live configuration keeps the new value.
    fn apply_setting(&self, change: SettingChange) -> QalcResult<()> {
        match change {
            SettingChange::AngleUnit(unit) => self.adapter.set_angle_unit(unit),
            SettingChange::ParsingMode(mode) => self.adapter.set_parsing_mode(mode),
            SettingChange::Precision(precision) => {
                self.adapter.set_precision(clamp_precision(precision))
            }
            SettingChange::UnitsInGlobalQuery(enabled) => {
                self.adapter.set_units_in_global_query(enabled)
            }
            SettingChange::FunctionsInGlobalQuery(enabled) => {
                self.adapter.set_functions_in_global_query(enabled)
            }
        }

        let settings = self.adapter.settings();
        self.store.save(&settings).map_err(|e| {
            tracing::warn!("Failed to save settings: {}", e);
            e
        })
    }
}

/// A plugin still initializing on a background thread
pub struct PendingPlugin<C: Calculator> {
    receiver: Receiver<QalcResult<Plugin<C>>>,
}

impl<C: Calculator> PendingPlugin<C> {
    /// Block until initialization finished
    pub fn wait(self) -> QalcResult<Plugin<C>> {
        self.receiver.recv().map_err(|_| {
            QalcError::Initialization("initialization thread exited without a result".to_string())
        })?
    }

    /// The initialized plugin, if initialization finished
    pub fn try_ready(&self) -> Option<QalcResult<Plugin<C>>> {
        match self.receiver.try_recv() {
            Ok(plugin) => Some(plugin),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(QalcError::Initialization(
                "initialization thread exited without a result".to_string(),
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MemorySettingsStore, TomlSettingsStore};
    use std::time::Duration;
    use tempfile::TempDir;

    fn offline() -> BuiltinCalculator {
        BuiltinCalculator::with_data_dir(None)
    }

    fn plugin(store: Arc<dyn SettingsStore>) -> Plugin {
        Plugin::with_calculator(offline(), store).unwrap()
    }

    struct FailingStore;

    impl SettingsStore for FailingStore {
        fn load(&self) -> QalcResult<Settings> {
            Ok(Settings::default())
        }

        fn save(&self, _: &Settings) -> QalcResult<()> {
            Err(QalcError::Config("read-only".to_string()))
        }
    }

    #[test]
    fn test_metadata() {
        let plugin = plugin(Arc::new(MemorySettingsStore::default()));
        assert_eq!(plugin.id(), "qalculate");
        assert_eq!(plugin.default_trigger(), "=");
        assert_eq!(plugin.synopsis(), "<math expression>");
    }

    #[test]
    fn test_queries_through_plugin() {
        let plugin = plugin(Arc::new(MemorySettingsStore::default()));
        let items = plugin.handle_trigger_query(&Query::with_trigger("=", "2+2"));
        assert_eq!(items[0].text, "4");
        let ranked = plugin.handle_global_query(&Query::new("6*7"));
        assert_eq!(ranked[0].item.text, "42");
    }

    #[test]
    fn test_settings_loaded_from_store() {
        let settings = Settings {
            precision: 8,
            functions_in_global_query: true,
            ..Settings::default()
        };
        let plugin = plugin(Arc::new(MemorySettingsStore::new(settings.clone())));
        assert_eq!(plugin.settings(), settings);
    }

    #[test]
    fn test_apply_setting_persists() {
        let store = Arc::new(MemorySettingsStore::default());
        let plugin = plugin(store.clone());

        plugin.apply_setting(SettingChange::Precision(5)).unwrap();
        plugin.apply_setting(SettingChange::AngleUnit(AngleUnit::Degrees)).unwrap();
        plugin.apply_setting(SettingChange::UnitsInGlobalQuery(true)).unwrap();

        let saved = store.snapshot();
        assert_eq!(saved.precision, 5);
        assert_eq!(saved.angle_unit, AngleUnit::Degrees);
        assert!(saved.units_in_global_query);
        assert_eq!(plugin.adapter().precision(), 5);
    }

    #[test]
    fn test_precision_is_clamped() {
        let store = Arc::new(MemorySettingsStore::default());
        let plugin = plugin(store.clone());
        plugin.apply_setting(SettingChange::Precision(0)).unwrap();
        assert_eq!(store.snapshot().precision, MIN_PRECISION);
        plugin.apply_setting(SettingChange::Precision(1000)).unwrap();
        assert_eq!(store.snapshot().precision, MAX_PRECISION);
    }

    #[test]
    fn test_failed_save_keeps_live_value() {
        let plugin = plugin(Arc::new(FailingStore));
        let result = plugin.apply_setting(SettingChange::ParsingMode(ParsingMode::Rpn));
        assert!(matches!(result, Err(QalcError::Config(_))));
        assert_eq!(plugin.adapter().parsing_mode(), ParsingMode::Rpn);
    }

    #[test]
    fn test_settings_survive_restart() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nova").join("qalculate.toml");

        let first = plugin(Arc::new(TomlSettingsStore::new(&path)));
        first
            .apply_setting(SettingChange::ParsingMode(ParsingMode::Chain))
            .unwrap();

        let second = plugin(Arc::new(TomlSettingsStore::new(&path)));
        assert_eq!(second.settings().parsing_mode, ParsingMode::Chain);
        let items = second.handle_trigger_query(&Query::with_trigger("=", "1+2*3"));
        assert_eq!(items[0].text, "9");
    }

    #[test]
    fn test_config_widget_reflects_settings() {
        let plugin = plugin(Arc::new(MemorySettingsStore::default()));
        plugin
            .apply_setting(SettingChange::AngleUnit(AngleUnit::Gradians))
            .unwrap();

        let widget = plugin.config_widget();
        assert_eq!(widget.fields.len(), 5);
        match &widget.fields[0] {
            ConfigField::Choice { key, selected, options, .. } => {
                assert_eq!(key, KEY_ANGLE_UNIT);
                assert_eq!(*selected, 2);
                assert_eq!(options.len(), 3);
            }
            other => panic!("unexpected field {:?}", other),
        }
        match &widget.fields[2] {
            ConfigField::SpinBox { value, min, max, .. } => {
                assert_eq!((*value, *min, *max), (16, 1, 100));
            }
            other => panic!("unexpected field {:?}", other),
        }
    }

    #[test]
    fn test_setting_change_from_widget_and_text() {
        assert_eq!(
            SettingChange::choice(KEY_PARSING_MODE, 4),
            Some(SettingChange::ParsingMode(ParsingMode::ALL[4]))
        );
        assert_eq!(SettingChange::choice(KEY_ANGLE_UNIT, 9), None);
        assert_eq!(SettingChange::choice(KEY_PRECISION, 0), None);

        assert_eq!(
            SettingChange::parse("angle_unit", "degrees").unwrap(),
            SettingChange::AngleUnit(AngleUnit::Degrees)
        );
        assert_eq!(
            SettingChange::parse("parsing_mode", "implicit-first").unwrap(),
            SettingChange::ParsingMode(ParsingMode::ImplicitFirst)
        );
        assert_eq!(
            SettingChange::parse("precision", " 20 ").unwrap(),
            SettingChange::Precision(20)
        );
        assert_eq!(
            SettingChange::parse("units_in_global_query", "on").unwrap(),
            SettingChange::UnitsInGlobalQuery(true)
        );
        assert!(SettingChange::parse("angle_unit", "turns").is_err());
        assert!(SettingChange::parse("colour", "red").is_err());
    }

    #[test]
    fn test_spawn_signals_when_ready() {
        let pending = Plugin::spawn_with(offline, Arc::new(MemorySettingsStore::default()));
        let plugin = loop {
            if let Some(result) = pending.try_ready() {
                break result.unwrap();
            }
            std::thread::sleep(Duration::from_millis(1));
        };
        assert_eq!(plugin.handle_trigger_query(&Query::with_trigger("=", "3!"))[0].text, "6");

        let plugin = Plugin::spawn_with(offline, Arc::new(MemorySettingsStore::default()))
            .wait()
            .unwrap();
        assert_eq!(plugin.settings(), Settings::default());
    }

    #[test]
    fn test_initialization_fails_on_bad_settings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("qalculate.toml");
        std::fs::write(&path, "precision = \"many\"").unwrap();
        let result = Plugin::with_calculator(offline(), Arc::new(TomlSettingsStore::new(&path)));
        assert!(matches!(result, Err(QalcError::Initialization(_))));
    }

    #[test]
    fn test_data_files_loaded_at_startup() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("rates.toml"),
            "base = \"USD\"\n[rates]\nEUR = 0.5\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("definitions.toml"), "[variables]\nanswer = 42\n").unwrap();

        let calculator = BuiltinCalculator::with_data_dir(Some(dir.path().to_path_buf()));
        let plugin = Plugin::with_calculator(calculator, Arc::new(MemorySettingsStore::default())).unwrap();

        let items = plugin.handle_trigger_query(&Query::with_trigger("=", "10 USD to EUR"));
        assert_eq!(items[0].text, "5 EUR");
        let items = plugin.handle_trigger_query(&Query::with_trigger("=", "answer / 2"));
        assert_eq!(items[0].text, "21");
    }

    #[test]
    fn test_broken_rates_file_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("rates.toml"), "base = \"USD\"\n[rates]\nGBP = 0.8\n").unwrap();

        let calculator = BuiltinCalculator::with_data_dir(Some(dir.path().to_path_buf()));
        let plugin = Plugin::with_calculator(calculator, Arc::new(MemorySettingsStore::default())).unwrap();
        assert_eq!(plugin.handle_trigger_query(&Query::with_trigger("=", "2+2"))[0].text, "4");
    }
}
