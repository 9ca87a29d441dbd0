//! Evaluation of parsed expressions into values with optional units

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::functions::{self, FunctionLibrary};
use super::number::{ArithmeticError, Number};
use super::options::ParseOptions;
use super::parser::{BinOp, Expr};
use super::units::{self, Unit, UnitTable};

pub const ABORTED: &str = "Calculation was aborted.";

/// Variables and units known to the calculator
#[derive(Debug, Clone)]
pub struct Definitions {
    pub variables: HashMap<String, Number>,
    pub units: UnitTable,
}

impl Definitions {
    /// Constants and units every calculator starts with
    pub fn builtin() -> Self {
        let mut variables = HashMap::new();
        let pi = Number::Approx(std::f64::consts::PI);
        variables.insert("pi".to_string(), pi.clone());
        variables.insert("π".to_string(), pi);
        variables.insert("e".to_string(), Number::Approx(std::f64::consts::E));
        variables.insert("tau".to_string(), Number::Approx(std::f64::consts::TAU));
        variables.insert(
            "phi".to_string(),
            Number::Approx((1.0 + 5f64.sqrt()) / 2.0),
        );

        Self {
            variables,
            units: UnitTable::builtin(),
        }
    }
}

impl Default for Definitions {
    fn default() -> Self {
        Self::builtin()
    }
}

/// A number, possibly carrying a unit
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub number: Number,
    pub unit: Option<Arc<Unit>>,
}

impl Value {
    pub fn scalar(number: Number) -> Self {
        Self { number, unit: None }
    }

    fn with_unit(number: Number, unit: Option<Arc<Unit>>) -> Self {
        Self { number, unit }
    }
}

pub struct Evaluator<'a> {
    definitions: &'a Definitions,
    options: &'a ParseOptions,
    abort: &'a AtomicBool,
    functions: FunctionLibrary,
}

impl<'a> Evaluator<'a> {
    pub fn new(definitions: &'a Definitions, options: &'a ParseOptions, abort: &'a AtomicBool) -> Self {
        Self {
            definitions,
            options,
            abort,
            functions: FunctionLibrary::new(options.angle_unit),
        }
    }

    fn aborted(&self) -> bool {
        self.abort.load(Ordering::Relaxed)
    }

    pub fn evaluate(&self, expr: &Expr) -> Result<Value, String> {
        if self.aborted() {
            return Err(ABORTED.to_string());
        }

        let value = match expr {
            Expr::Number(n) => Value::scalar(n.clone()),
            Expr::Ident(name) => self.resolve(name)?,
            Expr::Neg(inner) => {
                let value = self.evaluate(inner)?;
                Value::with_unit(value.number.neg(), value.unit)
            }
            Expr::Binary(op, lhs, rhs) => {
                let lhs = self.evaluate(lhs)?;
                let rhs = self.evaluate(rhs)?;
                self.binary(*op, lhs, rhs)?
            }
            Expr::Factorial(inner) => {
                let value = self.evaluate(inner)?;
                if value.unit.is_some() {
                    return Err("Factorial of a quantity with a unit is not defined.".to_string());
                }
                let number = value
                    .number
                    .factorial(|| !self.aborted())
                    .map_err(|e| e.to_string())?
                    .ok_or_else(|| ABORTED.to_string())?;
                Value::scalar(number)
            }
            Expr::Call(name, args) => self.call(name, args)?,
            Expr::Convert(inner, target) => {
                let value = self.evaluate(inner)?;
                self.convert(value, target)?
            }
        };

        if value.number.is_finite() {
            Ok(value)
        } else {
            Err(ArithmeticError::NotFinite.to_string())
        }
    }

    fn lookup_unit(&self, name: &str) -> Option<Arc<Unit>> {
        if self.options.units_enabled {
            self.definitions.units.lookup(name)
        } else {
            None
        }
    }

    /// Variables first, then units
    fn resolve_value(&self, name: &str) -> Option<Value> {
        if let Some(number) = self.definitions.variables.get(name) {
            return Some(Value::scalar(number.clone()));
        }
        self.lookup_unit(name)
            .map(|unit| Value::with_unit(Number::one(), Some(unit)))
    }

    fn resolve(&self, name: &str) -> Result<Value, String> {
        if let Some(value) = self.resolve_value(name) {
            return Ok(value);
        }
        if self.options.functions_enabled && functions::arity(name).is_some() {
            return Err(format!("Function \"{}\" needs arguments.", name));
        }
        Err(self.unknown(name))
    }

    fn unknown(&self, name: &str) -> String {
        if self.options.unknowns_enabled {
            format!("Unknown variable \"{}\" cannot be evaluated numerically.", name)
        } else {
            format!("\"{}\" is not a valid variable, function, or unit.", name)
        }
    }

    fn call(&self, name: &str, args: &[Expr]) -> Result<Value, String> {
        let arity = functions::arity(name).filter(|_| self.options.functions_enabled);

        let Some(arity) = arity else {
            // "pi(2)" and "km(3)" read as implicit multiplication
            return match (self.resolve_value(name), args) {
                (Some(value), [arg]) => {
                    let arg = self.evaluate(arg)?;
                    self.binary(BinOp::Mul, value, arg)
                }
                _ => Err(self.unknown(name)),
            };
        };

        if args.len() != arity {
            return Err(format!(
                "{}() expects {} argument{}, got {}.",
                name,
                arity,
                if arity == 1 { "" } else { "s" },
                args.len()
            ));
        }

        let mut numbers = Vec::with_capacity(args.len());
        let mut unit = None;
        for arg in args {
            let value = self.evaluate(arg)?;
            if value.unit.is_some() {
                if !functions::preserves_unit(name) {
                    return Err(format!("{}() does not accept units.", name));
                }
                unit = value.unit;
            }
            numbers.push(value.number);
        }

        let number = self.functions.call(name, numbers)?;
        Ok(Value::with_unit(number, unit))
    }

    fn convert(&self, value: Value, target: &str) -> Result<Value, String> {
        let Some(to) = self.lookup_unit(target) else {
            return Err(self.unknown(target));
        };
        let Some(from) = value.unit else {
            return Err(format!("Cannot convert a plain number to {}.", to.symbol));
        };
        let number = units::convert(value.number, &from, &to)
            .ok_or_else(|| incompatible(Some(&*from), Some(&*to)))?;
        Ok(Value::with_unit(number, Some(to)))
    }

    fn binary(&self, op: BinOp, lhs: Value, rhs: Value) -> Result<Value, String> {
        let arithmetic = |e: ArithmeticError| e.to_string();

        match op {
            BinOp::Add | BinOp::Sub => {
                let (unit, rhs_number) = same_unit(&lhs, rhs)?;
                let number = if op == BinOp::Add {
                    lhs.number.add(rhs_number)
                } else {
                    lhs.number.sub(rhs_number)
                };
                Ok(Value::with_unit(number, unit))
            }
            BinOp::Mul => {
                let unit = match (lhs.unit, rhs.unit) {
                    (Some(_), Some(_)) => {
                        return Err("Products of units are not supported.".to_string())
                    }
                    (a, b) => a.or(b),
                };
                Ok(Value::with_unit(lhs.number.mul(rhs.number), unit))
            }
            BinOp::Div | BinOp::Rem => {
                let unit = lhs.unit.clone();
                let (result_unit, rhs_number) = match (lhs.unit.is_some(), rhs.unit.is_some()) {
                    (_, false) => (unit, rhs.number),
                    (true, true) => {
                        let (_, converted) = same_unit(&lhs, rhs)?;
                        // km / m is a plain ratio, km % m stays a length
                        (if op == BinOp::Div { None } else { unit }, converted)
                    }
                    (false, true) => {
                        return Err("Inverse units are not supported.".to_string())
                    }
                };
                let number = if op == BinOp::Div {
                    lhs.number.div(rhs_number)
                } else {
                    lhs.number.rem(rhs_number)
                }
                .map_err(arithmetic)?;
                Ok(Value::with_unit(number, result_unit))
            }
            BinOp::Pow => {
                if rhs.unit.is_some() {
                    return Err("Exponents cannot have units.".to_string());
                }
                if lhs.unit.is_some() && rhs.number != Number::one() {
                    return Err("Powers of units are not supported.".to_string());
                }
                let number = lhs.number.pow(rhs.number).map_err(arithmetic)?;
                Ok(Value::with_unit(number, lhs.unit))
            }
        }
    }
}

/// Bring `rhs` into the unit of `lhs` for addition-like operations
fn same_unit(lhs: &Value, rhs: Value) -> Result<(Option<Arc<Unit>>, Number), String> {
    match (&lhs.unit, &rhs.unit) {
        (None, None) => Ok((None, rhs.number)),
        (Some(to), Some(from)) => units::convert(rhs.number, from, to)
            .map(|number| (Some(Arc::clone(to)), number))
            .ok_or_else(|| incompatible(Some(&**to), Some(&**from))),
        (a, b) => Err(incompatible(a.as_deref(), b.as_deref())),
    }
}

fn incompatible(a: Option<&Unit>, b: Option<&Unit>) -> String {
    let describe = |u: Option<&Unit>| match u {
        Some(unit) => format!("{} ({})", unit.symbol, unit.category),
        None => "a plain number".to_string(),
    };
    format!("Incompatible units: {} and {}.", describe(a), describe(b))
}
