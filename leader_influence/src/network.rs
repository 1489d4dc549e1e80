use chrono::{DateTime, Utc};
use log::debug;

use std::collections::{BTreeMap, BTreeSet};

use crate::config::*;
use crate::dates;
use crate::index::SnapshotIndex;
use crate::model::RelType;
use crate::verified_voters::cumulative_weekly_series;

/// How far the group reaches through supporters who lead groups of their own.
pub fn compute_network_expansion(idx: &SnapshotIndex, ctx: &MetricsContext) -> NetworkExpansion {
    let main = ctx.main_group_id.as_str();
    let supporters = idx.footprint(main, Some(RelType::Supporter));

    let mut connected_groups: BTreeSet<&str> = BTreeSet::new();
    // Connected leader profile -> when they first started leading elsewhere.
    let mut connected: BTreeMap<&str, Option<DateTime<Utc>>> = BTreeMap::new();
    for profile_id in supporters.profile_ids.iter() {
        for rel in idx.rels_of_profile(profile_id) {
            if rel.rel_type != RelType::Leader || rel.viewpoint_group_id == main {
                continue;
            }
            connected_groups.insert(rel.viewpoint_group_id.as_str());
            let ts = rel.created_at.as_deref().and_then(dates::parse_timestamp);
            let first = connected.entry(*profile_id).or_insert(None);
            *first = match (*first, ts) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
        }
    }

    let main_jurisdictions = idx.group_jurisdictions(main);
    let mut reached: BTreeSet<&str> = BTreeSet::new();
    for g in connected_groups.iter() {
        reached.extend(idx.group_jurisdictions(g));
    }
    let new_jurisdictions = reached.difference(&main_jurisdictions).count() as u64;

    let connected_leaders = connected.len() as u64;
    let verified = idx.footprint(main, None).verified_person_ids.len() as u64;
    let trend = cumulative_weekly_series(connected.values().flatten().map(|ts| ts.date_naive()));

    debug!(
        "compute_network_expansion: {} connected leaders over {} groups, {} new jurisdictions",
        connected_leaders,
        connected_groups.len(),
        new_jurisdictions
    );
    NetworkExpansion {
        connected_leaders,
        new_jurisdictions,
        trend,
        potential_leaders: Some(verified.saturating_sub(connected_leaders)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SnapshotBuilder;
    use chrono::TimeZone;

    fn ctx() -> MetricsContext {
        MetricsContext::new("main", Utc.with_ymd_and_hms(2026, 10, 15, 0, 0, 0).unwrap())
    }

    #[test]
    fn supporters_leading_elsewhere() {
        let snapshot = SnapshotBuilder::new()
            .group("main", "Main")
            .group("g2", "Second")
            .group("g3", "Third")
            // ana supports main and leads two other groups.
            .supporter("main", "ana", "")
            .verified_in("ana", &["j1"], "")
            .leader("g2", "ana", "2026-09-10")
            .leader("g3", "ana", "2026-08-05")
            // bo leads main itself, which does not count.
            .supporter("main", "bo", "")
            .leader("main", "bo", "2026-01-01")
            .verified_in("bo", &["j1"], "")
            // cy is only a member of main.
            .member_as("main", "cy", RelType::Member, "")
            .leader("g2", "cy", "2026-09-01")
            // members of the connected groups.
            .supporter("g2", "dee", "")
            .verified_in("dee", &["j2", "j1"], "")
            .supporter("g3", "eve", "")
            .verified_in("eve", &["j3"], "")
            .supporter("g3", "fay", "")
            .unverified_in("fay", &["j4"])
            .build();
        let idx = SnapshotIndex::new(&snapshot);
        let n = compute_network_expansion(&idx, &ctx());
        assert_eq!(n.connected_leaders, 1);
        assert_eq!(n.new_jurisdictions, 2);
        assert_eq!(n.potential_leaders, Some(1));
        // 2026-08-05 is a Wednesday.
        assert_eq!(
            n.trend,
            vec![TimeSeriesPoint {
                date: "2026-08-03".to_string(),
                value: 1
            }]
        );
    }

    #[test]
    fn empty_network() {
        let snapshot = SnapshotBuilder::new().group("main", "Main").build();
        let idx = SnapshotIndex::new(&snapshot);
        let n = compute_network_expansion(&idx, &ctx());
        assert_eq!(n.connected_leaders, 0);
        assert_eq!(n.new_jurisdictions, 0);
        assert!(n.trend.is_empty());
        assert_eq!(n.potential_leaders, Some(0));
    }
}
