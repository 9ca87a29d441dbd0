//! Calculation engine.
//!
//! The adapter drives an engine through the [`Calculator`] trait: submit an
//! expression, poll [`Calculator::busy`], then drain messages or take the
//! result. [`BuiltinCalculator`] is the engine shipped with the plugin.

mod builtin;
mod eval;
mod format;
mod functions;
mod lexer;
mod number;
mod options;
mod parser;
mod structure;
mod units;

pub use builtin::BuiltinCalculator;
pub use eval::{Definitions, Value};
pub use number::{ArithmeticError, Number};
pub use options::{AngleUnit, EvaluationOptions, NumeralStyle, ParseOptions, ParsingMode, PrintOptions};
pub use structure::MathStructure;
pub use units::{Category, Unit, UnitTable};

use crate::error::QalcResult;

/// A message the engine recorded during a calculation
///
/// The built-in engine only records errors; any message means the
/// calculation produced no usable result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
}

impl Message {
    pub fn error(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// A calculation engine handle
///
/// Handles are not reentrant: callers serialize access, and a calculation
/// must be collected before the next one starts.
pub trait Calculator: Send {
    fn load_exchange_rates(&mut self) -> QalcResult<()> {
        Ok(())
    }

    fn load_global_definitions(&mut self) -> QalcResult<()> {
        Ok(())
    }

    fn load_local_definitions(&mut self) -> QalcResult<()> {
        Ok(())
    }

    fn precision(&self) -> u32;

    fn set_precision(&mut self, precision: u32);

    /// Rewrite locale and typography specific input into plain syntax
    fn unlocalize_expression(&self, expression: &str, options: &ParseOptions) -> String;

    /// Reset abort state and pending output before a calculation
    fn start_control(&mut self);

    fn stop_control(&mut self);

    /// Start calculating `expression` without waiting for the result
    fn calculate(&mut self, expression: &str, eo: &EvaluationOptions);

    fn busy(&self) -> bool;

    /// Ask the running calculation to stop
    fn abort(&mut self);

    /// Messages recorded since the last drain, oldest first
    fn take_messages(&mut self) -> Vec<Message>;

    fn take_result(&mut self) -> Option<MathStructure>;
}
