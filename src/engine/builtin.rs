//! The calculator shipped with the plugin.
//!
//! Each calculation runs on its own worker thread. The handle and the worker
//! share only the abort flag; the outcome comes back through the join handle.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use serde::Deserialize;

use super::eval::{Definitions, Evaluator, Value, ABORTED};
use super::number::Number;
use super::options::{EvaluationOptions, ParseOptions};
use super::parser::parse;
use super::structure::MathStructure;
use super::units::DEFAULT_BASE_CURRENCY;
use super::{Calculator, Message};
use crate::config::{clamp_precision, DEFAULT_PRECISION};
use crate::error::{QalcError, QalcResult};

const RATES_FILE: &str = "rates.toml";
const DEFINITIONS_FILE: &str = "definitions.toml";
/// Parsing and evaluation recurse once per nesting level
const WORKER_STACK_SIZE: usize = 8 * 1024 * 1024;

type Job = JoinHandle<Result<Value, String>>;

pub struct BuiltinCalculator {
    definitions: Arc<Definitions>,
    /// Currencies from the rates file, per one EUR
    currencies: Vec<(String, f64)>,
    data_dir: Option<PathBuf>,
    precision: u32,
    abort: Arc<AtomicBool>,
    worker: Option<Job>,
    /// Precision the running calculation was started with
    worker_precision: u32,
    messages: Vec<Message>,
    result: Option<MathStructure>,
}

impl BuiltinCalculator {
    /// A calculator with the built-in constants and units, reading user
    /// definitions and exchange rates from `<config>/nova/qalculate/`
    pub fn new() -> Self {
        Self::with_data_dir(dirs::config_dir().map(|dir| dir.join("nova").join("qalculate")))
    }

    pub fn with_data_dir(data_dir: Option<PathBuf>) -> Self {
        Self {
            definitions: Arc::new(Definitions::builtin()),
            currencies: Vec::new(),
            data_dir,
            precision: DEFAULT_PRECISION,
            abort: Arc::new(AtomicBool::new(false)),
            worker: None,
            worker_precision: DEFAULT_PRECISION,
            messages: Vec::new(),
            result: None,
        }
    }

    pub fn definitions(&self) -> &Definitions {
        &self.definitions
    }

    /// Load `[rates]` from a TOML file; a missing file is not an error
    ///
    /// Returns whether the file existed.
    pub fn load_exchange_rates_from(&mut self, path: &Path) -> QalcResult<bool> {
        let Some(content) = read_optional(path)? else {
            tracing::debug!("No exchange rates at {}", path.display());
            return Ok(false);
        };
        let file: RatesFile = toml::from_str(&content).map_err(|e| definitions_error(path, e))?;
        let base = file.base.to_uppercase();

        // rates are "units of CODE per one base"; the table counts per EUR
        let per_eur = if base == DEFAULT_BASE_CURRENCY {
            1.0
        } else {
            match file.rates.get(DEFAULT_BASE_CURRENCY) {
                Some(rate) if *rate > 0.0 => *rate,
                _ => {
                    return Err(QalcError::Definitions {
                        path: path.to_path_buf(),
                        message: format!("no {} rate for base {}", DEFAULT_BASE_CURRENCY, base),
                    })
                }
            }
        };

        let mut currencies = Vec::with_capacity(file.rates.len() + 1);
        if base != DEFAULT_BASE_CURRENCY {
            currencies.push((base, 1.0 / per_eur));
        }
        for (code, rate) in &file.rates {
            if code.to_uppercase() != DEFAULT_BASE_CURRENCY {
                currencies.push((code.clone(), rate / per_eur));
            }
        }

        tracing::info!("Loaded {} exchange rates from {}", file.rates.len(), path.display());
        self.currencies = currencies;
        self.apply_currencies();
        Ok(true)
    }

    /// Put the loaded exchange rates into the unit table
    fn apply_currencies(&mut self) {
        let definitions = Arc::make_mut(&mut self.definitions);
        for (code, per_eur) in &self.currencies {
            definitions.units.insert_currency(code, *per_eur);
        }
    }

    /// Load `[variables]` from a TOML file; a missing file is not an error
    pub fn load_definitions_from(&mut self, path: &Path) -> QalcResult<bool> {
        let Some(content) = read_optional(path)? else {
            tracing::debug!("No local definitions at {}", path.display());
            return Ok(false);
        };
        let file: DefinitionsFile =
            toml::from_str(&content).map_err(|e| definitions_error(path, e))?;

        let mut variables = HashMap::with_capacity(file.variables.len());
        for (name, value) in file.variables {
            let number = match value {
                toml::Value::Integer(i) => Number::from_integer(i),
                toml::Value::Float(f) if f.is_finite() => {
                    Number::parse_decimal(&f.to_string()).unwrap_or(Number::Approx(f))
                }
                other => {
                    return Err(QalcError::Definitions {
                        path: path.to_path_buf(),
                        message: format!("\"{}\" is not a number: {}", name, other),
                    })
                }
            };
            variables.insert(name, number);
        }

        tracing::info!("Loaded {} local definitions from {}", variables.len(), path.display());
        Arc::make_mut(&mut self.definitions).variables.extend(variables);
        Ok(true)
    }

    fn data_file(&self, name: &str) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join(name))
    }

    /// Wait for the running calculation and keep its outcome
    fn collect(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        match worker.join() {
            Ok(Ok(value)) => self.result = Some(MathStructure::new(value, self.worker_precision)),
            Ok(Err(message)) => {
                if message == ABORTED {
                    tracing::debug!("Calculation aborted");
                }
                self.messages.push(Message::error(message));
            }
            Err(_) => {
                tracing::warn!("Calculation worker panicked");
                self.messages.push(Message::error("Calculation failed."));
            }
        }
    }
}

impl Default for BuiltinCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BuiltinCalculator {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            self.abort.store(true, Ordering::Relaxed);
            let _ = worker.join();
        }
    }
}

impl Calculator for BuiltinCalculator {
    fn load_exchange_rates(&mut self) -> QalcResult<()> {
        if let Some(path) = self.data_file(RATES_FILE) {
            self.load_exchange_rates_from(&path)?;
        }
        Ok(())
    }

    fn load_global_definitions(&mut self) -> QalcResult<()> {
        // exchange rates are loaded first and survive the reset
        self.definitions = Arc::new(Definitions::builtin());
        self.apply_currencies();
        tracing::debug!(
            "Loaded {} built-in units and {} currencies",
            self.definitions.units.len(),
            self.currencies.len()
        );
        Ok(())
    }

    fn load_local_definitions(&mut self) -> QalcResult<()> {
        if let Some(path) = self.data_file(DEFINITIONS_FILE) {
            self.load_definitions_from(&path)?;
        }
        Ok(())
    }

    fn precision(&self) -> u32 {
        self.precision
    }

    fn set_precision(&mut self, precision: u32) {
        self.precision = clamp_precision(precision);
    }

    fn unlocalize_expression(&self, expression: &str, options: &ParseOptions) -> String {
        let mut out = String::with_capacity(expression.len());
        for c in expression.chars() {
            match c {
                '−' | '–' => out.push('-'),
                '×' | '·' | '⋅' | '∙' => out.push('*'),
                '÷' | '∕' => out.push('/'),
                ',' if options.decimal_comma => out.push('.'),
                ';' if options.decimal_comma => out.push(','),
                c => out.push(c),
            }
        }
        out
    }

    fn start_control(&mut self) {
        self.abort.store(false, Ordering::Relaxed);
        self.messages.clear();
        self.result = None;
    }

    fn stop_control(&mut self) {
        self.collect();
        self.abort.store(false, Ordering::Relaxed);
    }

    fn calculate(&mut self, expression: &str, eo: &EvaluationOptions) {
        if self.worker.is_some() {
            self.abort.store(true, Ordering::Relaxed);
            self.collect();
            self.abort.store(false, Ordering::Relaxed);
        }
        self.messages.clear();
        self.result = None;

        let expression = expression.to_string();
        let options = eo.parse_options.clone();
        let definitions = Arc::clone(&self.definitions);
        let abort = Arc::clone(&self.abort);

        let spawned = thread::Builder::new()
            .name("qalc-worker".to_string())
            .stack_size(WORKER_STACK_SIZE)
            .spawn(move || {
                let expr = parse(&expression, options.parsing_mode)?;
                Evaluator::new(&definitions, &options, &abort).evaluate(&expr)
            });

        match spawned {
            Ok(worker) => {
                self.worker = Some(worker);
                self.worker_precision = self.precision;
            }
            Err(e) => {
                tracing::warn!("Failed to spawn calculation worker: {}", e);
                self.messages.push(Message::error("Calculation failed."));
            }
        }
    }

    fn busy(&self) -> bool {
        self.worker.as_ref().is_some_and(|worker| !worker.is_finished())
    }

    fn abort(&mut self) {
        self.abort.store(true, Ordering::Relaxed);
    }

    fn take_messages(&mut self) -> Vec<Message> {
        self.collect();
        std::mem::take(&mut self.messages)
    }

    fn take_result(&mut self) -> Option<MathStructure> {
        self.collect();
        self.result.take()
    }
}

#[derive(Debug, Deserialize)]
struct RatesFile {
    #[serde(default = "default_base")]
    base: String,
    #[serde(default)]
    rates: HashMap<String, f64>,
}

fn default_base() -> String {
    DEFAULT_BASE_CURRENCY.to_string()
}

#[derive(Debug, Deserialize)]
struct DefinitionsFile {
    #[serde(default)]
    variables: HashMap<String, toml::Value>,
}

fn read_optional(path: &Path) -> QalcResult<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn definitions_error(path: &Path, e: toml::de::Error) -> QalcError {
    QalcError::Definitions {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}
