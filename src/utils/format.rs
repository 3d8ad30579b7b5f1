//! Number formatting with a fixed count of significant digits.
//!
//! Output follows the `%g` convention: fixed notation for moderate
//! magnitudes, scientific notation with a two-digit exponent otherwise, and
//! trailing zeros removed.

/// Format `value` with `precision` significant digits.
///
/// # Examples
///
/// ```
/// use minopt_rs::utils::format_significant;
///
/// assert_eq!(format_significant(1.23456, 4), "1.235");
/// assert_eq!(format_significant(0.5, 4), "0.5");
/// assert_eq!(format_significant(123456.0, 4), "1.235e+05");
/// assert_eq!(format_significant(0.0000123, 4), "1.23e-05");
/// ```
pub fn format_significant(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let precision = precision.max(1);
    let scientific = format!("{:.*e}", precision - 1, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return scientific;
    };

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
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
