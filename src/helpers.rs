use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};

pub fn round_to_step(value: f64, step: f64) -> f64 {
    if step <= 0.0 {
        return value;
    }
    (value / step).round() * step
}

/// Parses periods like `30s`, `5m`, `4h`, `1d` or `1w` into seconds.
pub fn parse_period_secs(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let (digits, multiplier) = if let Some(stripped) = s.strip_suffix('s') {
        (stripped, 1)
    } else if let Some(stripped) = s.strip_suffix('m') {
        (stripped, 60)
    } else if let Some(stripped) = s.strip_suffix('h') {
        (stripped, 3600)
    } else if let Some(stripped) = s.strip_suffix('d') {
        (stripped, 86_400)
    } else if let Some(stripped) = s.strip_suffix('w') {
        (stripped, 604_800)
    } else {
        return Err(format!(
            "Invalid period {s:?}. Use formats like 30s, 5m, 4h, 1d or 1w."
        ));
    };

    let num = u64::from_str(digits).map_err(|e| format!("{s:?}: {e}"))?;
    if num == 0 {
        return Err(format!("{s:?}: period must be positive"));
    }
    num.checked_mul(multiplier)
        .ok_or_else(|| format!("{s:?}: period is too long"))
}

/// Formats a price with a precision that suits its magnitude.
pub fn format_price(price: f64) -> String {
    let abs = price.abs();
    if abs >= 1000.0 {
        format!("{price:.2}")
    } else if abs >= 1.0 {
        format!("{price:.4}")
    } else {
        format!("{price:.8}")
    }
}

/// Converts epoch milliseconds to a UTC datetime, falling back to the epoch.
pub fn millis_to_datetime(millis: u64) -> DateTime<Utc> {
    i64::try_from(millis)
        .ok()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .unwrap_or_default()
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
