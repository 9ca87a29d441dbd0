//! Command line front end for the calculator plugin.
//!
//! Drives the same [`Plugin`] a launcher would: `eval` sends a query,
//! `config` reads and changes the persisted settings.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Settings, SettingsStore, TomlSettingsStore};
use crate::core::item::ResultItem;
use crate::core::query::Query;
use crate::plugin::{
    Configurable, GlobalQueryHandler, Plugin, SettingChange, TriggerQueryHandler, DEFAULT_TRIGGER,
};

#[derive(Parser)]
#[command(name = "nova-qalc")]
#[command(about = "Evaluate math expressions like the launcher's calculator", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file (default: <config dir>/nova/qalculate.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate an expression
    Eval {
        /// Expression; several words are joined with spaces
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        expression: Vec<String>,

        /// Evaluate as a global query (settings decide units and functions)
        #[arg(long)]
        global: bool,

        /// Print result items as JSON
        #[arg(long)]
        json: bool,

        /// Copy the result to the clipboard
        #[arg(long)]
        copy: bool,
    },

    /// Show or change settings
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the current settings
    Show,

    /// Change one setting (e.g. `precision 20`, `angle_unit degrees`)
    Set { key: String, value: String },

    /// Print the settings file location
    Path,
}

/// Parse arguments and run the requested command
pub fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing();

    let store = Arc::new(match cli.config {
        Some(path) => TomlSettingsStore::new(path),
        None => TomlSettingsStore::user(),
    });

    match cli.command {
        Commands::Eval {
            expression,
            global,
            json,
            copy,
        } => eval(store, &expression.join(" "), global, json, copy),
        Commands::Config { action } => {
            config(store, action)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nova_qalculate=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn eval(
    store: Arc<TomlSettingsStore>,
    expression: &str,
    global: bool,
    json: bool,
    copy: bool,
) -> anyhow::Result<ExitCode> {
    let plugin = Plugin::new(store).context("failed to initialize calculator")?;

    let query = if global {
        Query::new(expression)
    } else {
        Query::with_trigger(DEFAULT_TRIGGER, expression)
    };

    // Ctrl+C invalidates the query, which aborts the calculation
    let cancel = query.cancel_handle();
    ctrlc::set_handler(move || cancel.cancel()).context("failed to set Ctrl+C handler")?;

    let items: Vec<ResultItem> = if global {
        plugin
            .handle_global_query(&query)
            .into_iter()
            .map(|ranked| ranked.item)
            .collect()
    } else {
        plugin.handle_trigger_query(&query)
    };

    if !query.is_valid() {
        eprintln!("Cancelled.");
        return Ok(ExitCode::from(130));
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        for item in &items {
            println!("{}", item.text);
            println!("  {}", item.subtext);
        }
    }

    let succeeded = items.iter().any(|item| item.id != "qalc-err");
    if copy && succeeded {
        copy_result(&items[0])?;
    }

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(feature = "desktop")]
fn copy_result(item: &ResultItem) -> anyhow::Result<()> {
    let action = item.default_action().context("result has no action")?;
    crate::executor::execute(action, &crate::platform::DesktopActions::new())?;
    Ok(())
}

#[cfg(not(feature = "desktop"))]
fn copy_result(_item: &ResultItem) -> anyhow::Result<()> {
    anyhow::bail!("clipboard support requires the `desktop` feature")
}

fn config(store: Arc<TomlSettingsStore>, action: ConfigCommands) -> anyhow::Result<()> {
    match action {
        ConfigCommands::Show => {
            let settings: Settings = store.load()?;
            print!("{}", toml::to_string_pretty(&settings)?);
        }
        ConfigCommands::Set { key, value } => {
            let change = SettingChange::parse(&key, &value)?;
            let plugin = Plugin::new(store.clone()).context("failed to initialize calculator")?;
            plugin.apply_setting(change)?;
            println!("Saved to {}", store.path().display());
        }
        ConfigCommands::Path => {
            println!("{}", store.path().display());
        }
    }
    Ok(())
}
