use log::debug;

use crate::config::*;
use crate::dates;
use crate::index::SnapshotIndex;
use crate::model::RelType;

/// Joiner counts for a group over the trailing 30 and 90 days.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub struct RecentJoiners {
    pub last_30_days: u64,
    pub last_90_days: u64,
}

/// Counts the relationships of a role created in the trailing windows.
pub fn recent_joiners(idx: &SnapshotIndex, group_id: &str, role: RelType, ctx: &MetricsContext) -> RecentJoiners {
    let mut res = RecentJoiners::default();
    for rel in idx.rels_of_group(group_id) {
        if rel.rel_type != role {
            continue;
        }
        if let Some(ts) = rel.created_at.as_deref().and_then(dates::parse_timestamp) {
            if dates::within_trailing_days(ts, ctx.now, 30) {
                res.last_30_days += 1;
            }
            if dates::within_trailing_days(ts, ctx.now, 90) {
                res.last_90_days += 1;
            }
        }
    }
    res
}

pub fn compute_supporter_engagement(idx: &SnapshotIndex, ctx: &MetricsContext) -> SupporterEngagement {
    let main = ctx.main_group_id.as_str();
    let supporter_rels: Vec<_> = idx
        .rels_of_group(main)
        .iter()
        .filter(|r| r.rel_type == RelType::Supporter)
        .collect();
    let total_supporters = supporter_rels.len() as u64;
    let joiners = recent_joiners(idx, main, RelType::Supporter, ctx);

    let mut recent_verified: u64 = 0;
    let mut recent_total: u64 = 0;
    for rel in supporter_rels.iter() {
        let recent = rel
            .created_at
            .as_deref()
            .and_then(dates::parse_timestamp)
            .map(|ts| dates::within_trailing_days(ts, ctx.now, 30))
            .unwrap_or(false);
        if !recent {
            continue;
        }
        recent_total += 1;
        if let Some(person_id) = idx.person_of_profile(&rel.profile_id) {
            if idx.is_person_verified(person_id) {
                recent_verified += 1;
            }
        }
    }

    let recent_verification_rate = if recent_total > 0 {
        recent_verified as f64 / recent_total as f64
    } else {
        0.0
    };
    let engagement_score = if joiners.last_30_days > 0 {
        let growth = if total_supporters > 0 {
            (joiners.last_90_days as f64 / total_supporters as f64 * 100.0).min(100.0)
        } else {
            0.0
        };
        let verification = recent_verification_rate * 100.0;
        Some((growth * 0.6 + verification * 0.4).round() as u32)
    } else {
        None
    };
    debug!(
        "compute_supporter_engagement: {} supporters, {} recent, score {:?}",
        total_supporters,
        recent_total,
        engagement_score
    );
    SupporterEngagement {
        total_supporters,
        recent_joiners_30d: joiners.last_30_days,
        recent_joiners_90d: joiners.last_90_days,
        recent_verification_rate,
        engagement_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SnapshotBuilder;
    use crate::model::Snapshot;
    use chrono::{TimeZone, Utc};

    fn ctx() -> MetricsContext {
        MetricsContext::new("g", Utc.with_ymd_and_hms(2026, 10, 15, 12, 0, 0).unwrap())
    }

    #[test]
    fn recent_joiners_drive_the_score() {
        let snapshot = SnapshotBuilder::new()
            .group("g", "Main")
            .supporter("g", "a", "2026-10-10")
            .verified_in("a", &["j1"], "")
            .supporter("g", "b", "2026-10-01")
            .supporter("g", "c", "2026-08-01")
            .supporter("g", "d", "2025-01-01")
            .supporter("g", "e", "")
            .leader("g", "f", "2026-10-10")
            .build();
        let idx = SnapshotIndex::new(&snapshot);
        let e = compute_supporter_engagement(&idx, &ctx());
        assert_eq!(e.total_supporters, 5);
        assert_eq!(e.recent_joiners_30d, 2);
        assert_eq!(e.recent_joiners_90d, 3);
        assert_eq!(e.recent_verification_rate, 0.5);
        // growth 60, verification 50.
        assert_eq!(e.engagement_score, Some(56));
    }

    #[test]
    fn no_recent_joiners_means_no_score() {
        let snapshot = SnapshotBuilder::new()
            .group("g", "Main")
            .supporter("g", "a", "2020-01-01")
            .build();
        let idx = SnapshotIndex::new(&snapshot);
        let e = compute_supporter_engagement(&idx, &ctx());
        assert_eq!(e.recent_joiners_30d, 0);
        assert_eq!(e.engagement_score, None);
        assert_eq!(e.recent_verification_rate, 0.0);

        let empty = Snapshot::default();
        let idx = SnapshotIndex::new(&empty);
        let e = compute_supporter_engagement(&idx, &ctx());
        assert_eq!(e.total_supporters, 0);
        assert_eq!(e.engagement_score, None);
    }
}
