use chrono::{DateTime, NaiveDateTime};

/// Currency prefix used for every amount shown to the user
pub const CURRENCY_PREFIX: &str = "Ksh";

/// Format an amount as `Ksh 1,234.50`
pub fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    // Amounts that round to zero carry no sign
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    let whole = (cents / 100).to_string();
    let fraction = cents % 100;

    // Group the integer part in threes
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    format!("{} {}{}.{:02}", CURRENCY_PREFIX, sign, grouped, fraction)
}

/// Format a progress percentage, clamped to 0-100
pub fn format_progress(percent: f64) -> String {
    format!("{:.0}%", percent.clamp(0.0, 100.0))
}

/// Format a timestamp as `03 May 2024, 09:30`
/// Accepts RFC 3339 and the naive ISO format the backend emits
pub fn format_date(date: &str) -> String {
    const DISPLAY: &str = "%d %b %Y, %H:%M";

    if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
        dt.format(DISPLAY).to_string()
    } else if let Ok(dt) = NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M:%S%.f") {
        dt.format(DISPLAY).to_string()
    } else {
        date.to_string()
    }
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format an optional string, returning a default if None
pub fn format_optional(value: &Option<String>, default: &str) -> String {
    value.as_deref().unwrap_or(default).to_string()
}
