// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Numeric parsing honoring the input data's decimal point and digit
//! grouping characters.
//!
//! Survey instruments export numbers in whatever convention their firmware
//! locale uses. Rather than touching the process locale, the expected
//! symbols travel in a [`NumericFormat`] value that is passed to every
//! parsing site. Grouping characters are stripped before parsing and the
//! configured decimal point is mapped to `'.'`.
//!

use crate::config::config;

/// Decimal point and grouping characters of the input data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericFormat {
    /// Decimal point character, usually `'.'` or `','`.
    pub decimal_point: char,
    /// Digit grouping (thousands) character, if the data uses one.
    pub group: Option<char>,
}

impl Default for NumericFormat {
    fn default() -> Self {
        NumericFormat {
            decimal_point: config().decimal_point(),
            group: config().decimal_group(),
        }
    }
}

impl NumericFormat {
    /// Plain format: `'.'` decimal point, no grouping. Used wherever the
    /// input is program-internal (selection expressions, schema values
    /// declared in the schema file itself are still user data and use the
    /// run's format).
    pub fn plain() -> Self {
        NumericFormat {
            decimal_point: '.',
            group: None,
        }
    }
}

/// Why a numeric parse failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumDefect {
    /// Not a number at all (empty, stray characters, bare sign, ...).
    Malformed,
    /// A number, but outside the representable range.
    Overflow,
}

// Character-class pre-scan. Rejecting anything unexpected up front keeps
// surprises like "inf", "nan" or hex prefixes out of the float parser.
fn is_allowed_num(c: char, fmt: &NumericFormat, int_only: bool) -> bool {
    if c.is_ascii_digit() || c == '+' || c == '-' {
        return true;
    }
    if int_only {
        return false;
    }
    c == fmt.decimal_point || Some(c) == fmt.group || c == 'e' || c == 'E'
}

/// Parse a double from `s` using the given input format.
///
/// Grouping characters are stripped, the format's decimal point is mapped
/// to `'.'`, then the standard float parser runs. Non-finite results count
/// as overflow.
pub fn parse_double(s: &str, fmt: &NumericFormat) -> Result<f64, NumDefect> {
    if s.is_empty() {
        return Err(NumDefect::Malformed);
    }
    if !s.chars().all(|c| is_allowed_num(c, fmt, false)) {
        return Err(NumDefect::Malformed);
    }

    let mut cooked = String::with_capacity(s.len());
    for c in s.chars() {
        if Some(c) == fmt.group {
            continue;
        }
        if c == fmt.decimal_point {
            cooked.push('.');
        } else {
            cooked.push(c);
        }
    }

    let value: f64 = cooked.parse().map_err(|_| NumDefect::Malformed)?;
    if !value.is_finite() {
        return Err(NumDefect::Overflow);
    }
    Ok(value)
}

/// Parse a signed 32-bit integer (base 10) from `s`.
pub fn parse_int(s: &str) -> Result<i32, NumDefect> {
    if s.is_empty() {
        return Err(NumDefect::Malformed);
    }
    if !s
        .chars()
        .all(|c| is_allowed_num(c, &NumericFormat::plain(), true))
    {
        return Err(NumDefect::Malformed);
    }

    // parse wide first so that range defects are reported as overflow, not
    // as malformed input
    match s.parse::<i64>() {
        Ok(wide) => i32::try_from(wide).map_err(|_| NumDefect::Overflow),
        Err(e) => match e.kind() {
            std::num::IntErrorKind::PosOverflow | std::num::IntErrorKind::NegOverflow => {
                Err(NumDefect::Overflow)
            }
            _ => Err(NumDefect::Malformed),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TOLERANCE: f64 = 1.0E-9;

    #[test]
    fn test_plain_double() {
        let fmt = NumericFormat::plain();
        assert_relative_eq!(parse_double("1.5", &fmt).unwrap(), 1.5, epsilon = TOLERANCE);
        assert_relative_eq!(
            parse_double("-0.25", &fmt).unwrap(),
            -0.25,
            epsilon = TOLERANCE
        );
        assert_relative_eq!(
            parse_double("1e3", &fmt).unwrap(),
            1000.0,
            epsilon = TOLERANCE
        );
    }

    #[test]
    fn test_comma_decimal_point() {
        let fmt = NumericFormat {
            decimal_point: ',',
            group: Some('.'),
        };
        assert_relative_eq!(
            parse_double("1.234,5", &fmt).unwrap(),
            1234.5,
            epsilon = TOLERANCE
        );
        // grouping chars vanish wherever they occur
        assert_relative_eq!(
            parse_double("12.34.5", &fmt).unwrap(),
            12345.0,
            epsilon = TOLERANCE
        );
    }

    #[test]
    fn test_double_rejects_garbage() {
        let fmt = NumericFormat::plain();
        assert_eq!(parse_double("", &fmt), Err(NumDefect::Malformed));
        assert_eq!(parse_double("abc", &fmt), Err(NumDefect::Malformed));
        assert_eq!(parse_double("1.2.3", &fmt), Err(NumDefect::Malformed));
        assert_eq!(parse_double("nan", &fmt), Err(NumDefect::Malformed));
        assert_eq!(parse_double("inf", &fmt), Err(NumDefect::Malformed));
        assert_eq!(parse_double("-", &fmt), Err(NumDefect::Malformed));
    }

    #[test]
    fn test_double_overflow() {
        let fmt = NumericFormat::plain();
        assert_eq!(parse_double("1e999", &fmt), Err(NumDefect::Overflow));
        assert_eq!(parse_double("-1e999", &fmt), Err(NumDefect::Overflow));
    }

    #[test]
    fn test_int() {
        assert_eq!(parse_int("42"), Ok(42));
        assert_eq!(parse_int("-7"), Ok(-7));
        assert_eq!(parse_int("+13"), Ok(13));
        assert_eq!(parse_int(""), Err(NumDefect::Malformed));
        assert_eq!(parse_int("1.5"), Err(NumDefect::Malformed));
        assert_eq!(parse_int("abc"), Err(NumDefect::Malformed));
    }

    #[test]
    fn test_int_overflow() {
        assert_eq!(parse_int("2147483647"), Ok(i32::MAX));
        assert_eq!(parse_int("2147483648"), Err(NumDefect::Overflow));
        assert_eq!(parse_int("-2147483649"), Err(NumDefect::Overflow));
        assert_eq!(
            parse_int("99999999999999999999999"),
            Err(NumDefect::Overflow)
        );
    }
}
