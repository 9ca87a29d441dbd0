use std::fmt;
use std::sync::Arc;

use super::eval::Value;
use super::format::{format_number, Formatted};
use super::number::Number;
use super::options::PrintOptions;
use super::units::Unit;

/// A calculation result
///
/// Call [`MathStructure::format`] before [`MathStructure::print`] so that
/// [`MathStructure::is_approximate`] also accounts for rounding done while
/// printing.
#[derive(Debug, Clone, PartialEq)]
pub struct MathStructure {
    value: Value,
    /// Calculator precision when the result was computed
    precision: u32,
    formatted: Option<Formatted>,
}

impl MathStructure {
    pub fn new(value: Value, precision: u32) -> Self {
        Self {
            value,
            precision,
            formatted: None,
        }
    }

    pub fn number(&self) -> &Number {
        &self.value.number
    }

    pub fn unit(&self) -> Option<&Arc<Unit>> {
        self.value.unit.as_ref()
    }

    /// Prepare the structure for printing with `po`
    pub fn format(&mut self, po: &PrintOptions) {
        self.formatted = Some(self.render(po));
    }

    pub fn print(&self, po: &PrintOptions) -> String {
        match &self.formatted {
            Some(formatted) => formatted.text.clone(),
            None => self.render(po).text,
        }
    }

    /// The value came from a float, or formatting had to round it
    pub fn is_approximate(&self) -> bool {
        !self.value.number.is_exact() || self.formatted.as_ref().is_some_and(|f| f.approximate)
    }

    fn render(&self, po: &PrintOptions) -> Formatted {
        let precision = po.precision.unwrap_or(self.precision);
        let mut formatted = format_number(&self.value.number, precision, po);
        if let Some(unit) = &self.value.unit {
            formatted.text.push(' ');
            formatted.text.push_str(&unit.symbol);
        }
        formatted
    }
}

impl fmt::Display for MathStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.print(&PrintOptions::default()))
    }
}
