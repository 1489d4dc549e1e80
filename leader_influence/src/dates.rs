// Date primitives shared by the metrics.
//
// Timestamps in the exports come in several shapes (RFC 3339, naive date-times,
// bare dates). Anything that cannot be read is treated as missing.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| Utc.from_utc_datetime(&ndt))
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    parse_timestamp(s).map(|dt| dt.date_naive())
}

/// Whole calendar days from `now` to `date`. Negative when the date is past.
pub fn days_until(date: NaiveDate, now: DateTime<Utc>) -> i64 {
    (date - now.date_naive()).num_days()
}

/// The Monday starting the ISO week of `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// True when `ts` falls inside the trailing window of `days` ending at `now`.
pub fn within_trailing_days(ts: DateTime<Utc>, now: DateTime<Utc>, days: i64) -> bool {
    ts >= now - Duration::days(days)
}
