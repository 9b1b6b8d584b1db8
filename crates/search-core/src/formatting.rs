/// Round `value` to `decimals` decimal places (half away from zero).
///
/// # Examples
///
/// ```
/// use search_core::formatting::round_to;
///
/// assert_eq!(round_to(0.123456, 4), 0.1235);
/// assert_eq!(round_to(4.25, 1), 4.3);
/// assert_eq!(round_to(7.0, 1), 7.0);
/// ```
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10_f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// `numerator / denominator`, or `0.0` when the denominator is zero.
///
/// # Examples
///
/// ```
/// use search_core::formatting::safe_ratio;
///
/// assert_eq!(safe_ratio(5.0, 10.0), 0.5);
/// assert_eq!(safe_ratio(5.0, 0.0), 0.0);
/// ```
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Format an integer count with thousands separators.
///
/// # Examples
///
/// ```
/// use search_core::formatting::format_count;
///
/// assert_eq!(format_count(0), "0");
/// assert_eq!(format_count(999), "999");
/// assert_eq!(format_count(1234567), "1,234,567");
/// ```
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Format a ratio in `[0, 1]` as a percentage with two decimals.
///
/// # Examples
///
/// ```
/// use search_core::formatting::format_percent;
///
/// assert_eq!(format_percent(0.0345), "3.45%");
/// assert_eq!(format_percent(0.0), "0.00%");
/// assert_eq!(format_percent(1.0), "100.00%");
/// ```
pub fn format_percent(ratio: f64) -> String {
    format!("{:.2}%", ratio * 100.0)
}
