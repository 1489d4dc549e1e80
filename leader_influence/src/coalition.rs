use log::debug;

use std::collections::BTreeSet;

use crate::config::*;
use crate::index::SnapshotIndex;
use crate::jurisdictions::display_name;

const MAX_COALITIONS: usize = 5;

/// Other groups whose verified members vote where the main group's do.
///
/// The synergy score weighs the jurisdiction overlap (0.5), the ballot items
/// both groups can vote on (0.3) and the size of the other group, capped at
/// 100 members (0.2).
pub fn find_coalition_opportunities(idx: &SnapshotIndex, ctx: &MetricsContext) -> Vec<CoalitionOpportunity> {
    let main = ctx.main_group_id.as_str();
    let main_jurisdictions = idx.group_jurisdictions(main);
    if main_jurisdictions.is_empty() {
        return vec![];
    }
    let total_items = idx.snapshot.ballot_items.len().max(1) as f64;

    let mut res: Vec<CoalitionOpportunity> = Vec::new();
    for group in idx.snapshot.viewpoint_groups.iter() {
        if group.id == main {
            continue;
        }
        let theirs = idx.group_jurisdictions(&group.id);
        let shared: BTreeSet<&str> = main_jurisdictions.intersection(&theirs).copied().collect();
        if shared.is_empty() {
            continue;
        }
        let supporter_count = idx.rels_of_group(&group.id).len() as u64;
        let shared_ballot_items = idx
            .snapshot
            .ballot_items
            .iter()
            .filter(|item| match item.jurisdiction_id.as_deref() {
                Some(jid) => shared.contains(jid),
                None => false,
            })
            .count() as u64;

        let overlap = shared.len() as f64 / main_jurisdictions.len() as f64;
        let ballot_overlap = shared_ballot_items as f64 / total_items;
        let size = supporter_count.min(100) as f64 / 100.0;
        let synergy_score = overlap * 0.5 + ballot_overlap * 0.3 + size * 0.2;

        res.push(CoalitionOpportunity {
            leader_name: group.label(),
            group_id: group.id.clone(),
            supporter_count,
            shared_jurisdictions: shared
                .iter()
                .map(|jid| {
                    idx.jurisdiction(jid)
                        .and_then(display_name)
                        .unwrap_or_else(|| jid.to_string())
                })
                .collect(),
            shared_ballot_items,
            synergy_score,
        });
    }

    res.sort_by(|a, b| {
        b.synergy_score
            .total_cmp(&a.synergy_score)
            .then_with(|| a.group_id.cmp(&b.group_id))
    });
    res.truncate(MAX_COALITIONS);
    debug!(
        "find_coalition_opportunities: {} candidates over {} main jurisdictions",
        res.len(),
        main_jurisdictions.len()
    );
    res
}
