mod config;
use log::{debug, info};

use serde::{Deserialize, Serialize};

pub use crate::config::*;

pub mod actions;
pub mod ballot_exposure;
pub mod builder;
pub mod coalition;
pub mod dates;
pub mod engagement;
pub mod enhancement;
pub mod index;
pub mod jurisdictions;
pub mod manual;
pub mod model;
pub mod network;
pub mod peers;
pub mod topics;
pub mod velocity;
pub mod verified_voters;

use crate::actions::ActionInputs;
use crate::enhancement::Enhancements;
use crate::index::SnapshotIndex;
use crate::model::{Snapshot, ViewpointGroup};

/// All the metrics of one computation pass.
///
/// The optional fields are only filled when the corresponding enhancement
/// feed (or enough snapshot data) is available.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CoreMetrics {
    #[serde(rename = "verifiedVoters")]
    pub verified_voters: VerifiedVoterMetrics,
    pub jurisdictions: JurisdictionConcentration,
    #[serde(rename = "ballotExposure")]
    pub ballot_exposure: Vec<BallotExposure>,
    #[serde(rename = "ballotItemsInfluence")]
    pub ballot_items_influence: Vec<BallotItemInfluence>,
    #[serde(rename = "networkExpansion")]
    pub network_expansion: NetworkExpansion,
    #[serde(rename = "supporterEngagement")]
    pub supporter_engagement: SupporterEngagement,
    #[serde(rename = "topicBreakdown")]
    pub topic_breakdown: Vec<TopicMetrics>,
    #[serde(rename = "topicOpportunities")]
    pub topic_opportunities: Vec<TopicOpportunity>,
    #[serde(rename = "focusThisWeek")]
    pub focus_this_week: Vec<ActionableInsight>,
    #[serde(rename = "velocity", skip_serializing_if = "Option::is_none", default)]
    pub velocity: Option<MovementVelocity>,
    #[serde(rename = "electoralLandscape", skip_serializing_if = "Option::is_none", default)]
    pub electoral_landscape: Option<Vec<ElectoralLandscape>>,
    #[serde(rename = "coalitionOpportunities", skip_serializing_if = "Option::is_none", default)]
    pub coalition_opportunities: Option<Vec<CoalitionOpportunity>>,
    #[serde(rename = "leaderComparison", skip_serializing_if = "Option::is_none", default)]
    pub leader_comparison: Option<Vec<LeaderComparison>>,
}

/// Computes every metric for the main group of the context.
///
/// Arguments:
/// * `snapshot` the relational data, never modified
/// * `ctx` the main group, the reference time and the rules
/// * `enhancements` the optional external feeds, already narrowed
///
/// The same arguments always produce the same result.
pub fn compute_metrics(snapshot: &Snapshot, ctx: &MetricsContext, enhancements: &Enhancements) -> CoreMetrics {
    info!(
        "Computing metrics for group {} at {}, rules: {:?}",
        ctx.main_group_id, ctx.now, ctx.rules
    );
    let idx = SnapshotIndex::new(snapshot);

    let verified_voters = verified_voters::compute_verified_voters(&idx, ctx);
    let jurisdictions = jurisdictions::compute_jurisdiction_concentration(&idx, ctx);
    let network_expansion = network::compute_network_expansion(&idx, ctx);
    let supporter_engagement = engagement::compute_supporter_engagement(&idx, ctx);
    info!(
        "compute_metrics: {} verified voters over {} jurisdictions, {} connected leaders",
        verified_voters.current, jurisdictions.total_jurisdictions, network_expansion.connected_leaders
    );

    let upcoming = enhancements.upcoming_elections.as_deref();
    let ballot_exposure = ballot_exposure::compute_ballot_exposure(&idx, ctx, upcoming, verified_voters.current);
    let ballot_items_influence = ballot_exposure::compute_ballot_item_influence(&idx, ctx);

    let topic_breakdown = topics::compute_topic_breakdown(&idx, ctx);
    let titled: Vec<ViewpointGroup> = snapshot
        .viewpoint_groups
        .iter()
        .filter(|g| g.topic_title().is_some())
        .cloned()
        .collect();
    let topic_opportunities = topics::find_topic_opportunities(&titled, &ballot_items_influence);

    let focus_this_week = actions::derive_actions(
        &ActionInputs {
            verified_voters: &verified_voters,
            jurisdictions: &jurisdictions,
            ballot_exposure: &ballot_exposure,
            network: &network_expansion,
        },
        ctx,
    );

    let benchmarks = enhancements.benchmarks.as_deref();
    let velocity = if benchmarks.is_some() || !verified_voters.growth_trend.is_empty() {
        Some(velocity::compute_movement_velocity(&verified_voters.growth_trend, benchmarks))
    } else {
        None
    };
    let electoral_landscape = upcoming.map(|_| peers::analyze_electoral_landscape(&ballot_exposure));
    let coalition_opportunities = if enhancements.peer_leaders.is_some() || snapshot.viewpoint_groups.len() > 1 {
        Some(coalition::find_coalition_opportunities(&idx, ctx))
    } else {
        None
    };
    let leader_comparison = enhancements
        .peer_leaders
        .as_deref()
        .filter(|l| !l.is_empty())
        .map(|l| peers::enrich_leaders(&idx, l, ctx));

    debug!(
        "compute_metrics: {} exposures, {} topics, {} insights",
        ballot_exposure.len(),
        topic_breakdown.len(),
        focus_this_week.len()
    );
    CoreMetrics {
        verified_voters,
        jurisdictions,
        ballot_exposure,
        ballot_items_influence,
        network_expansion,
        supporter_engagement,
        topic_breakdown,
        topic_opportunities,
        focus_this_week,
        velocity,
        electoral_landscape,
        coalition_opportunities,
        leader_comparison,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SnapshotBuilder;
    use crate::enhancement::{BenchmarkSample, UpcomingElection};
    use chrono::{TimeZone, Utc};

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn ctx() -> MetricsContext {
        MetricsContext::new("g", Utc.with_ymd_and_hms(2026, 10, 15, 9, 30, 0).unwrap())
    }

    /// 100 supporters in Springfield, 40 of them verified, a mayoral race in 20 days.
    fn springfield() -> Snapshot {
        let mut b = SnapshotBuilder::new()
            .group("g", "Transit for All")
            .named_jurisdiction("j1", "Springfield", Some("IL"))
            .election("e1", "General Election", "2026-11-04")
            .race(
                "b1",
                "e1",
                "j1",
                "Mayor",
                Some("city"),
                &[("Ann Lee", Some("Dem")), ("Bo Ray", Some("Rep"))],
            );
        for i in 0..100 {
            let person = format!("p{}", i);
            b = b.supporter("g", &person, "2026-09-02T10:00:00Z");
            b = if i < 40 {
                b.verified_in(&person, &["j1"], "2026-09-02T10:00:00Z")
            } else {
                b.unverified_in(&person, &["j1"])
            };
        }
        b.build()
    }

    #[test]
    fn springfield_scenario() {
        init();
        let snapshot = springfield();
        let m = compute_metrics(&snapshot, &ctx(), &Enhancements::default());
        assert_eq!(m.verified_voters.current, 40);
        assert_eq!(m.verified_voters.verification_rate, 40.0);
        assert_eq!(m.jurisdictions.total_jurisdictions, 1);
        assert_eq!(m.jurisdictions.concentration_index, 1.0);
        assert_eq!(m.ballot_exposure.len(), 1);
        let e = &m.ballot_exposure[0];
        assert_eq!(e.verified_supporters, 40);
        assert_eq!(e.potential_supporters, Some(100));
        assert_eq!(e.urgency, Urgency::High);
        assert_eq!(e.leverage_score, 120.0);
        assert_eq!(m.focus_this_week[0].title, "Focus on Mayor");
        assert_eq!(m.focus_this_week[0].impact, ImpactLevel::High);
        assert_eq!(m.focus_this_week[0].priority, 1);
        assert!(m.focus_this_week.len() <= 5);
        assert_eq!(m.topic_breakdown.len(), 1);
        assert!(m.velocity.is_some());
        assert_eq!(m.electoral_landscape, None);
        assert_eq!(m.coalition_opportunities, None);
        assert_eq!(m.leader_comparison, None);
    }

    #[test]
    fn same_inputs_same_metrics() {
        init();
        let snapshot = springfield();
        let enhancements = Enhancements {
            upcoming_elections: Some(vec![UpcomingElection {
                id: "api-1".to_string(),
                election_day: "2026-12-01".to_string(),
                election_type: None,
                office: None,
                candidate_count: 3,
            }]),
            peer_leaders: None,
            benchmarks: Some(vec![BenchmarkSample { growth_rate: 2.0 }]),
        };
        let a = compute_metrics(&snapshot, &ctx(), &enhancements);
        let b = compute_metrics(&snapshot, &ctx(), &enhancements);
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
        assert_eq!(a.ballot_exposure.len(), 2);
        assert_eq!(a.ballot_exposure[1].supporter_count_source, SupporterCountSource::Estimated);
        assert_eq!(a.ballot_exposure[1].verified_supporters, 4);
        assert_eq!(a.electoral_landscape.map(|l| l.len()), Some(2));
    }

    #[test]
    fn empty_snapshot() {
        init();
        let m = compute_metrics(&Snapshot::default(), &ctx(), &Enhancements::default());
        assert_eq!(m.verified_voters.current, 0);
        assert_eq!(m.verified_voters.verification_rate, 0.0);
        assert!(m.verified_voters.growth_trend.is_empty());
        assert_eq!(m.jurisdictions.concentration_index, 0.0);
        assert!(m.ballot_exposure.is_empty());
        assert!(m.focus_this_week.is_empty());
        assert_eq!(m.velocity, None);
    }
}
