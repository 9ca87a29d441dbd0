//! Unit table for quantities and conversions ("10 km to mi", "32 f to c")

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use super::number::Number;

/// Unit categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Length,
    Mass,
    Volume,
    Temperature,
    Area,
    Speed,
    Time,
    Data,
    Currency,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Length => "length",
            Category::Mass => "mass",
            Category::Volume => "volume",
            Category::Temperature => "temperature",
            Category::Area => "area",
            Category::Speed => "speed",
            Category::Time => "time",
            Category::Data => "data",
            Category::Currency => "currency",
        };
        f.write_str(name)
    }
}

/// A unit: `base = value * factor + offset`, in its category's base unit
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub name: String,
    pub symbol: String,
    pub category: Category,
    pub factor: Number,
    pub offset: Number,
}

impl Unit {
    pub fn to_base(&self, value: Number) -> Number {
        value.mul(self.factor.clone()).add(self.offset.clone())
    }

    pub fn from_base(&self, value: Number) -> Number {
        // factors are never zero, so the division cannot fail
        value
            .sub(self.offset.clone())
            .div(self.factor.clone())
            .unwrap_or(Number::Approx(f64::NAN))
    }
}

/// Convert a value between units of the same category
pub fn convert(value: Number, from: &Unit, to: &Unit) -> Option<Number> {
    if from.category != to.category {
        return None;
    }
    if from.name == to.name {
        return Some(value);
    }
    Some(to.from_base(from.to_base(value)))
}

/// Name and alias lookup over a set of units
#[derive(Debug, Clone, Default)]
pub struct UnitTable {
    units: Vec<Arc<Unit>>,
    aliases: HashMap<String, usize>,
}

impl UnitTable {
    /// The built-in units, without currencies other than the base currency
    pub fn builtin() -> Self {
        BUILTIN_UNITS.clone()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Find a unit by alias: exact spelling first, then lowercase
    pub fn lookup(&self, name: &str) -> Option<Arc<Unit>> {
        self.aliases
            .get(name)
            .or_else(|| self.aliases.get(&name.to_lowercase()))
            .map(|idx| Arc::clone(&self.units[*idx]))
    }

    /// Add or replace a unit and register its aliases
    pub fn insert(&mut self, unit: Unit, aliases: &[&str]) {
        let idx = match self.units.iter().position(|u| u.name == unit.name) {
            Some(idx) => {
                self.units[idx] = Arc::new(unit);
                idx
            }
            None => {
                self.units.push(Arc::new(unit));
                self.units.len() - 1
            }
        };
        let unit = Arc::clone(&self.units[idx]);
        for alias in aliases
            .iter()
            .copied()
            .chain([unit.name.as_str(), unit.symbol.as_str()])
        {
            self.aliases.insert(alias.to_string(), idx);
        }
    }

    /// Register a currency worth `1 / rate` of the base currency
    pub fn insert_currency(&mut self, code: &str, rate: f64) {
        let code = code.to_uppercase();
        let factor = match Number::one().div(Number::Approx(rate)) {
            Ok(factor) if rate.is_finite() => factor,
            _ => return,
        };
        let lower = code.to_lowercase();
        self.insert(
            Unit {
                name: code.clone(),
                symbol: code.clone(),
                category: Category::Currency,
                factor,
                offset: Number::zero(),
            },
            &[lower.as_str()],
        );
    }
}

/// (canonical name, display symbol, category, factor to base, aliases)
type UnitDef = (
    &'static str,
    &'static str,
    Category,
    &'static str,
    &'static [&'static str],
);

const UNIT_DEFS: &[UnitDef] = &[
    // Length (base: meter)
    ("meter", "m", Category::Length, "1", &["meters", "metre", "metres"]),
    ("kilometer", "km", Category::Length, "1000", &["kilometers", "kilometre", "kilometres"]),
    ("centimeter", "cm", Category::Length, "0.01", &["centimeters", "centimetre"]),
    ("millimeter", "mm", Category::Length, "0.001", &["millimeters", "millimetre"]),
    ("mile", "mi", Category::Length, "1609.344", &["miles"]),
    ("yard", "yd", Category::Length, "0.9144", &["yards"]),
    ("foot", "ft", Category::Length, "0.3048", &["feet"]),
    ("inch", "in", Category::Length, "0.0254", &["inches"]),
    ("nautical_mile", "nmi", Category::Length, "1852", &["nm"]),
    // Mass (base: gram)
    ("kilogram", "kg", Category::Mass, "1000", &["kilograms", "kilo", "kilos"]),
    ("gram", "g", Category::Mass, "1", &["grams"]),
    ("milligram", "mg", Category::Mass, "0.001", &["milligrams"]),
    ("pound", "lb", Category::Mass, "453.59237", &["lbs", "pounds"]),
    ("ounce", "oz", Category::Mass, "28.349523125", &["ounces"]),
    ("metric_ton", "t", Category::Mass, "1000000", &["ton", "tons", "tonne", "tonnes"]),
    ("stone", "st", Category::Mass, "6350.29318", &["stones"]),
    // Volume (base: liter)
    ("liter", "L", Category::Volume, "1", &["l", "liters", "litre", "litres"]),
    ("milliliter", "mL", Category::Volume, "0.001", &["ml", "milliliters", "millilitre"]),
    ("gallon", "gal", Category::Volume, "3.785411784", &["gallons"]),
    ("quart", "qt", Category::Volume, "0.946352946", &["quarts"]),
    ("pint", "pt", Category::Volume, "0.473176473", &["pints"]),
    ("cup", "cup", Category::Volume, "0.2365882365", &["cups"]),
    ("fluid_ounce", "floz", Category::Volume, "0.0295735295625", &[]),
    ("tablespoon", "tbsp", Category::Volume, "0.01478676478125", &["tablespoons"]),
    ("teaspoon", "tsp", Category::Volume, "0.00492892159375", &["teaspoons"]),
    // Area (base: square meter)
    ("square_meter", "m²", Category::Area, "1", &["sqm", "m2"]),
    ("square_foot", "ft²", Category::Area, "0.09290304", &["sqft", "ft2"]),
    ("square_kilometer", "km²", Category::Area, "1000000", &["sqkm", "km2"]),
    ("square_mile", "mi²", Category::Area, "2589988.110336", &["sqmi", "mi2"]),
    ("acre", "acre", Category::Area, "4046.8564224", &["acres"]),
    ("hectare", "ha", Category::Area, "10000", &["hectares"]),
    // Speed (base: m/s)
    ("meters_per_second", "m/s", Category::Speed, "1", &["mps"]),
    ("kilometers_per_hour", "km/h", Category::Speed, "5/18", &["kph", "kmh"]),
    ("miles_per_hour", "mph", Category::Speed, "0.44704", &[]),
    ("knot", "knot", Category::Speed, "463/900", &["knots", "kn"]),
    // Time (base: second)
    ("second", "s", Category::Time, "1", &["sec", "seconds"]),
    ("minute", "min", Category::Time, "60", &["minutes"]),
    ("hour", "h", Category::Time, "3600", &["hr", "hours"]),
    ("day", "d", Category::Time, "86400", &["days"]),
    ("week", "week", Category::Time, "604800", &["weeks"]),
    ("month", "month", Category::Time, "2629746", &["months"]),
    ("year", "yr", Category::Time, "31556952", &["years"]),
    // Data (base: byte)
    ("byte", "B", Category::Data, "1", &["b", "bytes"]),
    ("kilobyte", "KB", Category::Data, "1000", &["kb", "kilobytes"]),
    ("megabyte", "MB", Category::Data, "1000000", &["mb", "megabytes"]),
    ("gigabyte", "GB", Category::Data, "1000000000", &["gb", "gigabytes"]),
    ("terabyte", "TB", Category::Data, "1000000000000", &["tb", "terabytes"]),
    ("kibibyte", "KiB", Category::Data, "1024", &["kib"]),
    ("mebibyte", "MiB", Category::Data, "1048576", &["mib"]),
    ("gibibyte", "GiB", Category::Data, "1073741824", &["gib"]),
    ("tebibyte", "TiB", Category::Data, "1099511627776", &["tib"]),
];

/// A decimal literal or a ratio of two of them
fn parse_factor(text: &str) -> Option<Number> {
    match text.split_once('/') {
        Some((numer, denom)) => Number::parse_decimal(numer)?
            .div(Number::parse_decimal(denom)?)
            .ok(),
        None => Number::parse_decimal(text),
    }
}

/// Base currency of exchange rates until a rates file says otherwise
pub const DEFAULT_BASE_CURRENCY: &str = "EUR";

static BUILTIN_UNITS: Lazy<UnitTable> = Lazy::new(|| {
    let mut table = UnitTable::default();

    for (name, symbol, category, factor, aliases) in UNIT_DEFS {
        let Some(factor) = parse_factor(factor) else {
            continue;
        };
        table.insert(
            Unit {
                name: name.to_string(),
                symbol: symbol.to_string(),
                category: *category,
                factor,
                offset: Number::zero(),
            },
            aliases,
        );
    }

    // Temperature (base: kelvin), affine
    table.insert(
        Unit {
            name: "kelvin".to_string(),
            symbol: "K".to_string(),
            category: Category::Temperature,
            factor: Number::one(),
            offset: Number::zero(),
        },
        &["k"],
    );
    table.insert(
        Unit {
            name: "celsius".to_string(),
            symbol: "°C".to_string(),
            category: Category::Temperature,
            factor: Number::one(),
            offset: Number::from_ratio(27315, 100),
        },
        &["c", "°c", "degc"],
    );
    table.insert(
        Unit {
            name: "fahrenheit".to_string(),
            symbol: "°F".to_string(),
            category: Category::Temperature,
            factor: Number::from_ratio(5, 9),
            offset: Number::from_ratio(45967, 180),
        },
        &["f", "°f", "degf"],
    );

    table.insert(
        Unit {
            name: DEFAULT_BASE_CURRENCY.to_string(),
            symbol: DEFAULT_BASE_CURRENCY.to_string(),
            category: Category::Currency,
            factor: Number::one(),
            offset: Number::zero(),
        },
        &["eur", "€"],
    );

    table
});
