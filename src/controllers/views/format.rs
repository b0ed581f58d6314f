//! Display formatting shared by the HTML page and the CSV export.

use rust_decimal::Decimal;

pub const MISSING: &str = "-";

/// Whole dollars with thousands separators, e.g. `$12,345` or `-$3,000`.
pub fn currency(value: Decimal) -> String {
    let rounded = value.round();
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    format!("{}${}", sign, group_thousands(&rounded.abs().trunc().to_string()))
}

pub fn percent(value: Decimal) -> String {
    format!("{:.1}%", value.round_dp(1))
}

pub fn ratio(value: Option<Decimal>) -> String {
    match value {
        Some(value) => format!("{:.1}x", value.round_dp(1)),
        None => MISSING.to_string(),
    }
}

/// Signed gaps and unsigned activity counts alike, without narrowing.
pub fn count(value: impl Into<i128>) -> String {
    group_thousands_signed(value.into())
}

pub fn optional_text(value: Option<&str>) -> &str {
    match value {
        Some(text) if !text.trim().is_empty() => text,
        _ => MISSING,
    }
}

fn group_thousands_signed(value: i128) -> String {
    let digits = group_thousands(&value.unsigned_abs().to_string());
    if value < 0 {
        format!("-{}", digits)
    } else {
        digits
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
