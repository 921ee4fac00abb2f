//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Formats a whole-dollar amount, e.g. `29` becomes `$29`.
///
/// Usage in templates: `{{ plan.monthly_price|usd }}`
#[askama::filter_fn]
pub fn usd(amount: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(format!("${amount}"))
}

/// Formats a date as `Jun 14, 2026`.
///
/// Accepts anything whose string form starts with `YYYY-MM-DD`; other
/// values pass through unchanged.
#[askama::filter_fn]
pub fn short_date(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let raw = value.to_string();
    let date = raw
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok());
    Ok(date.map_or(raw, |date| date.format("%b %-d, %Y").to_string()))
}

/// Formats a time of day as `7:30 PM`.
#[askama::filter_fn]
pub fn clock(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let raw = value.to_string();
    let time = NaiveTime::parse_from_str(&raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M"))
        .ok();
    Ok(time.map_or(raw, |time| time.format("%-I:%M %p").to_string()))
}

/// Formats a timestamp relative to now: `just now`, `5m ago`, `2h ago`,
/// `3d ago`, then falls back to the short date.
#[askama::filter_fn]
pub fn ago(value: impl Display, env: &dyn askama::Values) -> askama::Result<String> {
    let raw = value.to_string();
    let Ok(timestamp) = raw.parse::<DateTime<Utc>>() else {
        return Ok(raw);
    };
    Ok(relative_to(timestamp, Utc::now(), env)?)
}

fn relative_to(
    timestamp: DateTime<Utc>,
    now: DateTime<Utc>,
    env: &dyn askama::Values,
) -> askama::Result<String> {
    let elapsed = now.signed_duration_since(timestamp);
    let minutes = elapsed.num_minutes();
    if minutes < 1 {
        return Ok("just now".to_string());
    }
    if minutes < 60 {
        return Ok(format!("{minutes}m ago"));
    }
    let hours = elapsed.num_hours();
    if hours < 24 {
        return Ok(format!("{hours}h ago"));
    }
    let days = elapsed.num_days();
    if days < 7 {
        return Ok(format!("{days}d ago"));
    }
    short_date::default().execute(timestamp.format("%Y-%m-%d"), env)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn short_date_formats_iso_dates() {
        let rendered = short_date::default().execute("2026-06-14", &()).unwrap();
        assert_eq!(rendered, "Jun 14, 2026");
    }

    #[test]
    fn short_date_passes_unparseable_input_through() {
        let rendered = short_date::default().execute("soon", &()).unwrap();
        assert_eq!(rendered, "soon");
    }

    #[test]
    fn clock_formats_24h_times() {
        assert_eq!(clock::default().execute("19:30:00", &()).unwrap(), "7:30 PM");
        assert_eq!(clock::default().execute("09:05", &()).unwrap(), "9:05 AM");
    }

    #[test]
    fn relative_times_step_through_units() {
        let now = Utc.with_ymd_and_hms(2026, 6, 14, 12, 0, 0).unwrap();
        let cases = [
            (now - chrono::Duration::seconds(30), "just now"),
            (now - chrono::Duration::minutes(5), "5m ago"),
            (now - chrono::Duration::hours(2), "2h ago"),
            (now - chrono::Duration::days(3), "3d ago"),
        ];
        for (timestamp, expected) in cases {
            assert_eq!(relative_to(timestamp, now, &()).unwrap(), expected);
        }
    }

    #[test]
    fn old_timestamps_fall_back_to_the_date() {
        let now = Utc.with_ymd_and_hms(2026, 6, 14, 12, 0, 0).unwrap();
        let timestamp = Utc.with_ymd_and_hms(2026, 1, 2, 8, 0, 0).unwrap();
        assert_eq!(relative_to(timestamp, now, &()).unwrap(), "Jan 2, 2026");
    }
}
