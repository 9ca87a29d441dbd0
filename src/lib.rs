//! Nova Qalculate - calculator query handler for the Nova launcher.
//!
//! Evaluates math expressions and unit conversions typed into the launcher
//! and turns the results into list items.
//!
//! # Architecture
//!
//! - [`engine`] - Calculation engine trait and the built-in calculator
//! - [`core`] - Queries, result items and the query adapter
//! - [`plugin`] - Launcher extension contract and plugin lifecycle
//! - [`config`] - Persisted settings
//! - [`executor`] - Running item actions
//! - [`platform`] - Clipboard and URL opener
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use nova_qalculate::{Plugin, Query, TomlSettingsStore, TriggerQueryHandler};
//!
//! let plugin = Plugin::new(Arc::new(TomlSettingsStore::user())).unwrap();
//! for item in plugin.handle_trigger_query(&Query::with_trigger("=", "10 km to mi")) {
//!     println!("{} ({})", item.text, item.subtext);
//! }
//! ```

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod core;
pub mod engine;
pub mod executor;
pub mod platform;
pub mod plugin;

mod error;

// Re-export commonly used types for convenience
pub use config::{MemorySettingsStore, Settings, SettingsStore, TomlSettingsStore};
pub use crate::core::{Outcome, QueryAdapter, Query, RankItem, ResultItem};
pub use engine::{BuiltinCalculator, Calculator, MathStructure};
pub use error::{QalcError, QalcResult};
pub use plugin::{
    Configurable, Extension, GlobalQueryHandler, PendingPlugin, Plugin, SettingChange,
    TriggerQueryHandler,
};
