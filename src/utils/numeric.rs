//! Strict numeric parsing and `%g`-style formatting
//!
//! Model files and problem files share these routines so that a token is
//! either a complete number or an error. Nothing here depends on the locale.

use crate::core::{LinearError, Result};

/// Parse a decimal integer with an optional leading `+` or `-`
///
/// Only ASCII digits are accepted after the sign. Values outside the `i32`
/// range wrap around exactly like 32-bit two's-complement arithmetic, so
/// `"2147483648"` yields `i32::MIN`.
pub fn parse_int(s: &str) -> Result<i32> {
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'+') => (false, &s[1..]),
        Some(b'-') => (true, &s[1..]),
        _ => (false, s),
    };

    if digits.is_empty() {
        return Err(LinearError::ParseError(format!(
            "invalid integer '{s}': no digits"
        )));
    }

    let mut value: i32 = 0;
    for byte in digits.bytes() {
        if !byte.is_ascii_digit() {
            return Err(LinearError::ParseError(format!(
                "invalid integer '{s}': unexpected character '{}'",
                byte as char
            )));
        }
        value = value
            .wrapping_mul(10)
            .wrapping_add(i32::from(byte - b'0'));
    }

    Ok(if negative { value.wrapping_neg() } else { value })
}

/// Parse a real number in decimal or exponential notation
///
/// The whole token must be consumed; NaN and infinities are rejected.
pub fn parse_real(s: &str) -> Result<f64> {
    let value: f64 = s
        .parse()
        .map_err(|_| LinearError::ParseError(format!("invalid real number '{s}'")))?;
    if !value.is_finite() {
        return Err(LinearError::ParseError(format!(
            "NaN or infinity in input: '{s}'"
        )));
    }
    Ok(value)
}

/// Format `value` like C's `%.<precision>g`
pub fn format_g(value: f64, precision: usize) -> String {
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }
    if !value.is_finite() {
        return value.to_string();
    }

    let precision = precision.max(1);
    let scientific = format!("{:.*e}", precision - 1, value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some(parts) => parts,
        None => return scientific,
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= precision as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            sign,
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
