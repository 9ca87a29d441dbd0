//! Parse, evaluation and print options handed to a [`super::Calculator`]

use serde::{Deserialize, Serialize};

/// Unit of angles passed to and returned by trigonometric functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AngleUnit {
    #[default]
    Radians,
    Degrees,
    Gradians,
}

impl AngleUnit {
    pub const ALL: [AngleUnit; 3] = [AngleUnit::Radians, AngleUnit::Degrees, AngleUnit::Gradians];

    pub fn label(self) -> &'static str {
        match self {
            AngleUnit::Radians => "Radians",
            AngleUnit::Degrees => "Degrees",
            AngleUnit::Gradians => "Gradians",
        }
    }

    /// Factor converting a value in this unit to radians
    pub fn to_radians_factor(self) -> f64 {
        match self {
            AngleUnit::Radians => 1.0,
            AngleUnit::Degrees => std::f64::consts::PI / 180.0,
            AngleUnit::Gradians => std::f64::consts::PI / 200.0,
        }
    }
}

/// How operator precedence and implicit multiplication are read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParsingMode {
    /// Implicit multiplication first, unless separated by whitespace
    Adaptive,
    /// Implicit multiplication binds tighter than `*` and `/`
    ImplicitFirst,
    /// Implicit and explicit multiplication share one precedence
    #[default]
    Conventional,
    /// Left to right, no operator precedence
    Chain,
    /// Reverse Polish notation
    Rpn,
}

impl ParsingMode {
    pub const ALL: [ParsingMode; 5] = [
        ParsingMode::Adaptive,
        ParsingMode::ImplicitFirst,
        ParsingMode::Conventional,
        ParsingMode::Chain,
        ParsingMode::Rpn,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ParsingMode::Adaptive => "Adaptive",
            ParsingMode::ImplicitFirst => "Implicit multiplication first",
            ParsingMode::Conventional => "Conventional",
            ParsingMode::Chain => "Chain",
            ParsingMode::Rpn => "RPN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    pub angle_unit: AngleUnit,
    pub parsing_mode: ParsingMode,
    pub functions_enabled: bool,
    pub units_enabled: bool,
    pub unknowns_enabled: bool,
    /// Read `,` as decimal separator and `;` as argument separator
    pub decimal_comma: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            angle_unit: AngleUnit::Radians,
            parsing_mode: ParsingMode::Conventional,
            functions_enabled: true,
            units_enabled: true,
            unknowns_enabled: false,
            decimal_comma: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationOptions {
    pub parse_options: ParseOptions,
}

impl EvaluationOptions {
    /// Same options with every kind of identifier recognized
    pub fn with_everything_enabled(&self) -> Self {
        let mut eo = self.clone();
        eo.parse_options.functions_enabled = true;
        eo.parse_options.units_enabled = true;
        eo.parse_options.unknowns_enabled = true;
        eo
    }
}

/// How numbers are laid out when printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumeralStyle {
    /// Positional notation, scientific for very large or small magnitudes
    #[default]
    Normal,
    /// Always scientific notation
    Scientific,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintOptions {
    pub numeral_style: NumeralStyle,
    /// Significant digits; `None` uses the calculator precision
    pub precision: Option<u32>,
    /// Mark repeating decimals with a trailing ellipsis instead of rounding
    pub indicate_infinite_series: bool,
    pub lower_case_e: bool,
    pub use_unicode_signs: bool,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            numeral_style: NumeralStyle::Normal,
            precision: None,
            indicate_infinite_series: false,
            lower_case_e: false,
            use_unicode_signs: false,
        }
    }
}
