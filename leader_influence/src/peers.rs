use chrono::{DateTime, Utc};
use log::debug;

use std::collections::{BTreeMap, BTreeSet};

use crate::config::*;
use crate::dates;
use crate::enhancement::PeerLeader;
use crate::index::SnapshotIndex;
use crate::jurisdictions::display_name;

/// Adds to each peer leader what the snapshot knows about their groups.
///
/// The supporter total stays the one reported by the feed; verified voters,
/// reach and growth come from the verification tables.
pub fn enrich_leaders(idx: &SnapshotIndex, leaders: &[PeerLeader], ctx: &MetricsContext) -> Vec<LeaderComparison> {
    leaders
        .iter()
        .map(|leader| {
            // Verified person -> earliest verification.
            let mut verified: BTreeMap<&str, Option<DateTime<Utc>>> = BTreeMap::new();
            let mut reach: BTreeSet<&str> = BTreeSet::new();
            for group in leader.groups.iter() {
                let fp = idx.footprint(&group.id, None);
                for person_id in fp.verified_person_ids.iter() {
                    let mut first: Option<DateTime<Utc>> = None;
                    for v in idx.verifications_of_person(person_id) {
                        if !v.is_fully_verified {
                            continue;
                        }
                        if let Some(js) = idx.jurisdictions_of_verification(&v.id) {
                            reach.extend(js.iter().copied());
                        }
                        let ts = v.created_at.as_deref().and_then(dates::parse_timestamp);
                        first = match (first, ts) {
                            (Some(a), Some(b)) => Some(a.min(b)),
                            (a, b) => a.or(b),
                        };
                    }
                    verified.insert(*person_id, first);
                }
            }

            let verified_voters = verified.len() as u64;
            let recent = verified
                .values()
                .flatten()
                .filter(|ts| dates::within_trailing_days(**ts, ctx.now, 30))
                .count();
            let names: BTreeSet<String> = reach
                .iter()
                .filter_map(|jid| idx.jurisdiction(jid).and_then(display_name))
                .collect();
            let verification_rate = if leader.total_supporters > 0 {
                verified_voters as f64 / leader.total_supporters as f64
            } else {
                0.0
            };
            debug!(
                "enrich_leaders: {}: {} verified over {} groups, {} recent",
                leader.id,
                verified_voters,
                leader.groups.len(),
                recent
            );
            LeaderComparison {
                id: leader.id.clone(),
                name: leader.name.clone(),
                total_supporters: leader.total_supporters,
                verified_voters,
                verification_rate,
                growth_rate: recent as f64 / 30.0 * 7.0,
                reach: reach.len() as u64,
                jurisdictions: names.into_iter().collect(),
            }
        })
        .collect()
}

/// How contested each exposure is, and how much the group weighs in it.
pub fn analyze_electoral_landscape(exposures: &[BallotExposure]) -> Vec<ElectoralLandscape> {
    exposures
        .iter()
        .map(|e| {
            let candidate_count = e.ballot_item.candidate_count.unwrap_or(0);
            ElectoralLandscape {
                ballot_item: e.ballot_item.clone(),
                competitiveness: Competitiveness::from_candidate_count(candidate_count),
                candidate_count,
                your_leverage: e.leverage_level.unwrap_or(LeverageLevel::Marginal),
                verified_supporters: e.verified_supporters,
            }
        })
        .collect()
}
