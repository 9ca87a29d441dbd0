//! Function library.
//!
//! Functions with exact results on rationals (roots of perfect powers,
//! rounding, abs, min/max) are computed here; everything transcendental goes
//! through a `meval` context whose trigonometry honours the angle unit.

use meval::{Context, ContextProvider};

use super::number::{ArithmeticError, Number};
use super::options::AngleUnit;

/// (name, number of arguments)
const FUNCTIONS: &[(&str, usize)] = &[
    ("sqrt", 1),
    ("cbrt", 1),
    ("abs", 1),
    ("floor", 1),
    ("ceil", 1),
    ("round", 1),
    ("sgn", 1),
    ("signum", 1),
    ("exp", 1),
    ("ln", 1),
    ("log", 1),
    ("log2", 1),
    ("sin", 1),
    ("cos", 1),
    ("tan", 1),
    ("asin", 1),
    ("acos", 1),
    ("atan", 1),
    ("sinh", 1),
    ("cosh", 1),
    ("tanh", 1),
    ("asinh", 1),
    ("acosh", 1),
    ("atanh", 1),
    ("atan2", 2),
    ("max", 2),
    ("min", 2),
];

/// Number of arguments of a known function
pub fn arity(name: &str) -> Option<usize> {
    FUNCTIONS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, arity)| *arity)
}

/// Functions that keep the unit of their single argument
pub fn preserves_unit(name: &str) -> bool {
    matches!(name, "abs" | "floor" | "ceil" | "round")
}

pub struct FunctionLibrary {
    context: Context<'static>,
}

impl FunctionLibrary {
    pub fn new(angle_unit: AngleUnit) -> Self {
        let to_rad = angle_unit.to_radians_factor();
        let from_rad = 1.0 / to_rad;

        let mut context = Context::new();
        context
            .func("sin", move |x| (x * to_rad).sin())
            .func("cos", move |x| (x * to_rad).cos())
            .func("tan", move |x| (x * to_rad).tan())
            .func("asin", move |x| x.asin() * from_rad)
            .func("acos", move |x| x.acos() * from_rad)
            .func("atan", move |x| x.atan() * from_rad)
            .func2("atan2", move |y, x| y.atan2(x) * from_rad)
            .func("log", f64::log10)
            .func("log2", f64::log2);

        Self { context }
    }

    /// Call `name` with already evaluated arguments; the caller checks arity
    pub fn call(&self, name: &str, args: Vec<Number>) -> Result<Number, String> {
        let mut args = args.into_iter();
        let mut arg = || args.next().unwrap_or_else(Number::zero);

        let result = match name {
            "sqrt" => arg().sqrt(),
            "cbrt" => arg().cbrt(),
            "abs" => arg().abs(),
            "floor" => arg().floor(),
            "ceil" => arg().ceil(),
            "round" => arg().round(),
            "sgn" | "signum" => arg().signum(),
            "max" | "min" => {
                let (a, b) = (arg(), arg());
                let a_wins = match a.cmp_value(&b) {
                    Some(ordering) => (ordering.is_ge()) == (name == "max"),
                    None => return Err(ArithmeticError::NotFinite.to_string()),
                };
                if a_wins {
                    a
                } else {
                    b
                }
            }
            _ => {
                let floats: Vec<f64> = args_to_f64(&mut arg, arity(name).unwrap_or(0));
                let value = self
                    .context
                    .eval_func(name, &floats)
                    .map_err(|_| format!("Could not evaluate {}().", name))?;
                Number::Approx(value)
            }
        };

        if result.is_finite() {
            Ok(result)
        } else {
            Err(ArithmeticError::NotFinite.to_string())
        }
    }
}

fn args_to_f64(arg: &mut impl FnMut() -> Number, count: usize) -> Vec<f64> {
    (0..count).map(|_| arg().to_f64()).collect()
}
