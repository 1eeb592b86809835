//! Display helpers for report output.

use chrono::{DateTime, Utc};

/// Formats a dollar amount as `$1.23M`, `$4.5K` or `$678`.
pub fn format_currency(value: f64) -> String {
    if value.abs() >= 1_000_000.0 {
        return format!("${:.2}M", value / 1_000_000.0);
    }
    if value.abs() >= 1_000.0 {
        return format!("${:.1}K", value / 1_000.0);
    }
    format!("${:.0}", value)
}

/// Formats a percentage with an explicit sign for non-negative values.
pub fn format_percent(value: f64, decimals: usize) -> String {
    let sign = if value >= 0.0 { "+" } else { "" };
    format!("{}{:.*}%", sign, decimals, value)
}

/// Formats a probability price in cents, e.g. `0.455` as `45.5¢`.
pub fn format_price(value: f64) -> String {
    format!("{:.1}¢", value * 100.0)
}

/// Shortens a wallet address to `0x1234...abcd`.
pub fn format_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() < 10 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Formats a millisecond timestamp as UTC date and time.
pub fn format_timestamp(timestamp_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

/// Time left until `end`: `2d 5h`, `5h 12m`, `12m` or `Ended`.
pub fn format_countdown(end: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let remaining = end - now;
    if remaining.num_milliseconds() <= 0 {
        return "Ended".to_string();
    }

    let days = remaining.num_days();
    let hours = remaining.num_hours() % 24;
    let minutes = remaining.num_minutes() % 60;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

/// Formats a number with thousands separators and fixed decimals.
pub fn format_number(value: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };

    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

const COMPACT_UNITS: [(f64, &str); 4] = [(1e12, "T"), (1e9, "B"), (1e6, "M"), (1e3, "K")];

/// Formats a number in short compact notation: `950`, `1.2K`, `34M`, `5.6B`.
///
/// Values below 100 in their unit keep two significant digits.
pub fn format_compact_number(value: f64) -> String {
    let abs = value.abs();
    let sign = if value < 0.0 { "-" } else { "" };

    let mut unit_index = COMPACT_UNITS.iter().position(|(size, _)| abs >= *size);
    loop {
        let (scale, suffix) = match unit_index {
            Some(i) => COMPACT_UNITS[i],
            None => (1.0, ""),
        };
        let rounded = round_compact(abs / scale);

        // 999_950 rounds to 1000K; promote to the next unit.
        if rounded >= 1000.0 {
            let next = match unit_index {
                Some(0) => None,
                Some(i) => Some(i - 1),
                None => Some(COMPACT_UNITS.len() - 1),
            };
            if let Some(next) = next {
                unit_index = Some(next);
                continue;
            }
        }

        return format!("{}{}{}", sign, trim_decimal(rounded), suffix);
    }
}

fn round_compact(scaled: f64) -> f64 {
    if scaled < 10.0 {
        (scaled * 10.0).round() / 10.0
    } else {
        scaled.round()
    }
}

fn trim_decimal(value: f64) -> String {
    let text = format!("{:.1}", value);
    text.strip_suffix(".0").map(str::to_string).unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(2_500_000.0), "$2.50M");
        assert_eq!(format_currency(12_340.0), "$12.3K");
        assert_eq!(format_currency(999.0), "$999");
        assert_eq!(format_currency(-1_500.0), "$-1.5K");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(12.345, 1), "+12.3%");
        assert_eq!(format_percent(0.0, 1), "+0.0%");
        assert_eq!(format_percent(-4.0, 2), "-4.00%");
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(0.45), "45.0¢");
        assert_eq!(format_price(0.125), "12.5¢");
    }

    #[test]
    fn test_format_address() {
        assert_eq!(
            format_address("0x1234567890abcdef1234567890abcdef12345678"),
            "0x1234...5678"
        );
        assert_eq!(format_address("0xabc"), "0xabc");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(1_700_000_000_000), "2023-11-14 22:13:20");
    }

    #[test]
    fn test_format_countdown() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        assert_eq!(format_countdown(now - Duration::minutes(1), now), "Ended");
        assert_eq!(format_countdown(now, now), "Ended");
        assert_eq!(
            format_countdown(now + Duration::days(2) + Duration::hours(5), now),
            "2d 5h"
        );
        assert_eq!(
            format_countdown(now + Duration::hours(3) + Duration::minutes(7), now),
            "3h 7m"
        );
        assert_eq!(format_countdown(now + Duration::seconds(150), now), "2m");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1_234_567.0, 0), "1,234,567");
        assert_eq!(format_number(1_234.5, 2), "1,234.50");
        assert_eq!(format_number(999.0, 0), "999");
        assert_eq!(format_number(-12_000.0, 0), "-12,000");
        assert_eq!(format_number(0.0, 1), "0.0");
    }

    #[test]
    fn test_format_compact_number() {
        assert_eq!(format_compact_number(950.0), "950");
        assert_eq!(format_compact_number(1_234.0), "1.2K");
        assert_eq!(format_compact_number(12_345.0), "12K");
        assert_eq!(format_compact_number(1_500_000.0), "1.5M");
        assert_eq!(format_compact_number(2_000_000_000.0), "2B");
        assert_eq!(format_compact_number(999_999.0), "1M");
        assert_eq!(format_compact_number(-4_200.0), "-4.2K");
    }
}
