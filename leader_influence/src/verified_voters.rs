use chrono::{DateTime, NaiveDate, Utc};
use log::debug;

use std::collections::{BTreeMap, HashMap};

use crate::config::*;
use crate::dates;
use crate::index::SnapshotIndex;

/// Buckets dates by the week they fall in and returns the running total
/// per week, in ascending order.
pub fn cumulative_weekly_series<I>(days: I) -> Vec<TimeSeriesPoint>
where
    I: IntoIterator<Item = NaiveDate>,
{
    let mut weekly: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for d in days {
        *weekly.entry(dates::week_start(d)).or_insert(0) += 1;
    }
    let mut total: u64 = 0;
    weekly
        .into_iter()
        .map(|(week, count)| {
            total += count;
            TimeSeriesPoint {
                date: dates::format_date(week),
                value: total,
            }
        })
        .collect()
}

/// Average week-over-week growth, in percent, over the last five points.
///
/// Pairs starting from zero are skipped. Returns 0 with fewer than two points.
pub fn weekly_growth_rate(trend: &[TimeSeriesPoint]) -> f64 {
    if trend.len() < 2 {
        return 0.0;
    }
    let recent = &trend[trend.len().saturating_sub(5)..];
    let deltas: Vec<f64> = recent
        .windows(2)
        .filter(|w| w[0].value > 0)
        .map(|w| (w[1].value as f64 - w[0].value as f64) / w[0].value as f64 * 100.0)
        .collect();
    if deltas.is_empty() {
        0.0
    } else {
        deltas.iter().sum::<f64>() / deltas.len() as f64
    }
}

pub fn compute_verified_voters(idx: &SnapshotIndex, ctx: &MetricsContext) -> VerifiedVoterMetrics {
    let fp = idx.footprint(&ctx.main_group_id, None);
    let total_supporters = fp.profile_ids.len() as u64;
    let current = fp.verified_person_ids.len() as u64;

    // Earliest verification of every verified person.
    let mut first_verified: HashMap<&str, DateTime<Utc>> = HashMap::new();
    for person_id in fp.verified_person_ids.iter() {
        for v in idx.verifications_of_person(person_id) {
            if !v.is_fully_verified {
                continue;
            }
            let ts = v
                .created_at
                .as_deref()
                .and_then(dates::parse_timestamp)
                .unwrap_or(ctx.now);
            let e = first_verified.entry(*person_id).or_insert(ts);
            if ts < *e {
                *e = ts;
            }
        }
    }

    let growth_trend = cumulative_weekly_series(first_verified.values().map(|ts| ts.date_naive()));
    let verification_rate = if total_supporters > 0 {
        current as f64 / total_supporters as f64 * 100.0
    } else {
        0.0
    };
    let rate = weekly_growth_rate(&growth_trend);
    debug!(
        "compute_verified_voters: group {} supporters: {} verified: {} weeks: {}",
        ctx.main_group_id,
        total_supporters,
        current,
        growth_trend.len()
    );
    VerifiedVoterMetrics {
        current,
        verification_rate,
        growth_trend,
        weekly_growth_rate: Some(rate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SnapshotBuilder;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 15, 12, 0, 0).unwrap()
    }

    fn point(date: &str, value: u64) -> TimeSeriesPoint {
        TimeSeriesPoint {
            date: date.to_string(),
            value,
        }
    }

    #[test]
    fn forty_of_a_hundred_verified() {
        let mut b = SnapshotBuilder::new().group("g", "Main");
        for i in 0..100 {
            let p = format!("p{}", i);
            b = b.supporter("g", &p, "2026-09-01");
            if i < 40 {
                b = b.verified_in(&p, &["j1"], "2026-09-02T10:00:00Z");
            }
        }
        let snapshot = b.build();
        let idx = SnapshotIndex::new(&snapshot);
        let m = compute_verified_voters(&idx, &MetricsContext::new("g", now()));
        assert_eq!(m.current, 40);
        assert_eq!(m.verification_rate, 40.0);
        // 2026-09-02 is a Wednesday.
        assert_eq!(m.growth_trend, vec![point("2026-08-31", 40)]);
        assert_eq!(m.weekly_growth_rate, Some(0.0));
    }

    #[test]
    fn no_supporters() {
        let snapshot = SnapshotBuilder::new().group("g", "Main").build();
        let idx = SnapshotIndex::new(&snapshot);
        let m = compute_verified_voters(&idx, &MetricsContext::new("g", now()));
        assert_eq!(m.current, 0);
        assert_eq!(m.verification_rate, 0.0);
        assert!(m.growth_trend.is_empty());
        assert_eq!(m.weekly_growth_rate, Some(0.0));
    }

    #[test]
    fn earliest_verification_counts_once() {
        let snapshot = SnapshotBuilder::new()
            .supporter("g", "a", "")
            .leader("g", "a", "")
            .verified_in("a", &["j1"], "2026-10-01")
            .verified_in("a", &["j1"], "2026-09-01")
            .supporter("g", "b", "")
            .verified_in("b", &["j1"], "garbage")
            .build();
        let idx = SnapshotIndex::new(&snapshot);
        let m = compute_verified_voters(&idx, &MetricsContext::new("g", now()));
        assert_eq!(m.current, 2);
        assert_eq!(m.verification_rate, 100.0);
        // The unreadable timestamp falls into the current week.
        assert_eq!(
            m.growth_trend,
            vec![point("2026-08-31", 1), point("2026-10-12", 2)]
        );
        assert!(m.verification_rate <= 100.0);
    }

    #[test]
    fn growth_rate_uses_last_five_points() {
        let trend = vec![
            point("w0", 0),
            point("w1", 1),
            point("w2", 2),
            point("w3", 4),
            point("w4", 4),
            point("w5", 8),
        ];
        // Pairs: 1->2 (100), 2->4 (100), 4->4 (0), 4->8 (100).
        assert_eq!(weekly_growth_rate(&trend), 75.0);
        assert_eq!(weekly_growth_rate(&trend[..1]), 0.0);
        assert_eq!(weekly_growth_rate(&[point("a", 0), point("b", 3)]), 0.0);
    }
}
