//! Number formatting for display

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

use super::number::{pow10, Number};
use super::options::{NumeralStyle, PrintOptions};

/// Digits an `f64` can meaningfully show
const MAX_FLOAT_DIGITS: u32 = 17;
/// Smallest decimal exponent printed without scientific notation
const MIN_POSITIONAL_EXP: i32 = -5;

/// A printed number and whether printing lost information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formatted {
    pub text: String,
    pub approximate: bool,
}

/// Format a number with `precision` significant digits
///
/// Exact integers and terminating decimals that fit are printed in full.
/// Everything else is rounded and reported as approximate, except repeating
/// decimals when `indicate_infinite_series` is set, which end in "…".
pub fn format_number(number: &Number, precision: u32, po: &PrintOptions) -> Formatted {
    let precision = precision.max(1);
    match number {
        Number::Exact(r) => format_exact(r, precision, po),
        Number::Approx(f) => Formatted {
            text: format_float(*f, precision.min(MAX_FLOAT_DIGITS), po),
            approximate: true,
        },
    }
}

fn format_exact(r: &BigRational, precision: u32, po: &PrintOptions) -> Formatted {
    let negative = r.is_negative();
    let magnitude = r.abs();

    if magnitude.is_zero() {
        return exact("0".to_string());
    }

    if magnitude.is_integer() && po.numeral_style == NumeralStyle::Normal {
        let digits = magnitude.to_integer().to_string();
        if digits.len() <= precision as usize {
            return exact(sign(negative, po) + &digits);
        }
    }

    let rounded = significant_digits(&magnitude, precision, true);
    if rounded.exact {
        return exact(layout(negative, &rounded.digits, rounded.exp, precision, po));
    }

    if po.indicate_infinite_series && !terminates(&magnitude) {
        let truncated = significant_digits(&magnitude, precision, false);
        if positional(truncated.exp, precision, po) {
            let text = layout(negative, &truncated.digits, truncated.exp, precision, po);
            return exact(text + "…");
        }
    }

    Formatted {
        text: layout(negative, &rounded.digits, rounded.exp, precision, po),
        approximate: true,
    }
}

fn format_float(value: f64, precision: u32, po: &PrintOptions) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    // `{:e}` rounds correctly and gives us the digits and the exponent
    let scientific = format!("{:.*e}", precision as usize - 1, value.abs());
    let (mantissa, exp) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let exp = exp.parse().unwrap_or(0);
    layout(value < 0.0, &digits, exp, precision, po)
}

fn exact(text: String) -> Formatted {
    Formatted {
        text,
        approximate: false,
    }
}

struct Digits {
    /// Significant digits without a decimal point
    digits: String,
    /// Decimal exponent of the first digit
    exp: i32,
    /// Nothing was lost
    exact: bool,
}

/// First `precision` significant digits of a positive rational
fn significant_digits(value: &BigRational, precision: u32, round: bool) -> Digits {
    let mut exp = decimal_exponent(value);
    let scaled = value * pow10(precision as i32 - 1 - exp);
    let exact = scaled.is_integer();
    let mut integer = if round { scaled.round() } else { scaled.floor() }.to_integer();

    // 9.99.. rounded up to 10.0..
    let limit = BigInt::from(10u32).pow(precision);
    if integer >= limit {
        integer /= 10u32;
        exp += 1;
    }

    Digits {
        digits: integer.to_string(),
        exp,
        exact,
    }
}

/// floor(log10(value)) for a positive rational
fn decimal_exponent(value: &BigRational) -> i32 {
    let numer_len = value.numer().to_string().len() as i32;
    let denom_len = value.denom().to_string().len() as i32;
    let mut exp = numer_len - denom_len;
    while exp > i32::MIN / 2 && *value < pow10(exp) {
        exp -= 1;
    }
    while *value >= pow10(exp + 1) {
        exp += 1;
    }
    exp
}

/// A reduced fraction terminates in base 10 iff its denominator is 2^a 5^b
fn terminates(value: &BigRational) -> bool {
    let mut denom = value.denom().clone();
    for factor in [2u32, 5] {
        let factor = BigInt::from(factor);
        while (&denom % &factor).is_zero() {
            denom /= &factor;
        }
    }
    denom.is_one()
}

fn positional(exp: i32, precision: u32, po: &PrintOptions) -> bool {
    po.numeral_style == NumeralStyle::Normal && exp >= MIN_POSITIONAL_EXP && exp < precision as i32
}

fn sign(negative: bool, po: &PrintOptions) -> String {
    match (negative, po.use_unicode_signs) {
        (false, _) => String::new(),
        (true, true) => "−".to_string(),
        (true, false) => "-".to_string(),
    }
}

/// Place the decimal point, or switch to scientific notation
fn layout(negative: bool, digits: &str, exp: i32, precision: u32, po: &PrintOptions) -> String {
    let digits = match digits.trim_end_matches('0') {
        "" => "0",
        trimmed => trimmed,
    };
    let mut out = sign(negative, po);

    if positional(exp, precision, po) {
        if exp >= 0 {
            let int_len = exp as usize + 1;
            if digits.len() <= int_len {
                out.push_str(digits);
                out.extend(std::iter::repeat('0').take(int_len - digits.len()));
            } else {
                out.push_str(&digits[..int_len]);
                out.push('.');
                out.push_str(&digits[int_len..]);
            }
        } else {
            out.push_str("0.");
            out.extend(std::iter::repeat('0').take((-exp - 1) as usize));
            out.push_str(digits);
        }
        return out;
    }

    out.push_str(&digits[..1]);
    if digits.len() > 1 {
        out.push('.');
        out.push_str(&digits[1..]);
    }
    out.push(if po.lower_case_e { 'e' } else { 'E' });
    if exp < 0 {
        out.push_str(&sign(true, po));
    }
    out.push_str(&exp.unsigned_abs().to_string());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn po() -> PrintOptions {
        PrintOptions::default()
    }

    fn fmt(number: Number) -> Formatted {
        format_number(&number, 16, &po())
    }

    #[test]
    fn test_format_whole_numbers() {
        assert_eq!(fmt(Number::from_integer(4)).text, "4");
        assert_eq!(fmt(Number::from_integer(100)).text, "100");
        assert_eq!(fmt(Number::from_integer(-42)).text, "-42");
        assert!(!fmt(Number::from_integer(4)).approximate);
    }

    #[test]
    fn test_format_decimals() {
        assert_eq!(fmt(Number::from_ratio(1, 2)).text, "0.5");
        assert_eq!(fmt(Number::from_ratio(6, 5)).text, "1.2");
        assert_eq!(fmt(Number::from_ratio(-1, 8)).text, "-0.125");
        assert!(!fmt(Number::from_ratio(1, 8)).approximate);
    }

    #[test]
    fn test_repeating_decimals() {
        let third = Number::from_ratio(1, 3);
        let rounded = fmt(third.clone());
        assert_eq!(rounded.text, "0.3333333333333333");
        assert!(rounded.approximate);

        let po = PrintOptions {
            indicate_infinite_series: true,
            ..po()
        };
        let series = format_number(&third, 16, &po);
        assert_eq!(series.text, "0.3333333333333333…");
        assert!(!series.approximate);

        let two_thirds = format_number(&Number::from_ratio(2, 3), 4, &PrintOptions::default());
        assert_eq!(two_thirds.text, "0.6667");
    }

    #[test]
    fn test_precision_rounds_floats() {
        let pi = Number::Approx(std::f64::consts::PI);
        assert_eq!(format_number(&pi, 5, &po()).text, "3.1416");
        assert_eq!(format_number(&pi, 40, &po()).text, "3.1415926535897931");
        assert!(fmt(pi).approximate);
        assert_eq!(fmt(Number::Approx(1.0)).text, "1");
    }

    #[test]
    fn test_scientific_notation() {
        let big = Number::Exact(pow10(20) * BigRational::from_integer(BigInt::from(3)));
        let formatted = fmt(big);
        assert_eq!(formatted.text, "3E20");
        assert!(!formatted.approximate);

        let po = PrintOptions {
            lower_case_e: true,
            use_unicode_signs: true,
            ..po()
        };
        assert_eq!(format_number(&Number::Approx(-1.5e-9), 16, &po).text, "−1.5e−9");
        assert_eq!(format_number(&Number::Approx(0.00012), 16, &po).text, "0.00012");

        let po = PrintOptions {
            numeral_style: NumeralStyle::Scientific,
            ..PrintOptions::default()
        };
        assert_eq!(format_number(&Number::from_integer(1234), 16, &po).text, "1.234E3");
    }

    #[test]
    fn test_large_integers_round() {
        let big: BigInt = "123456789012345678901".parse().unwrap();
        let formatted = fmt(Number::Exact(BigRational::from_integer(big)));
        assert_eq!(formatted.text, "1.234567890123457E20");
        assert!(formatted.approximate);
    }

    #[test]
    fn test_rounding_carries_into_next_digit() {
        let value = Number::from_ratio(99999, 10000);
        assert_eq!(format_number(&value, 3, &po()).text, "10");
    }
}
