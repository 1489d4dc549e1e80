use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ******** Output data structures *********

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub date: String,
    pub value: u64,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedVoterMetrics {
    pub current: u64,
    #[serde(rename = "verificationRate")]
    pub verification_rate: f64,
    #[serde(rename = "growthTrend")]
    pub growth_trend: Vec<TimeSeriesPoint>,
    #[serde(rename = "weeklyGrowthRate")]
    pub weekly_growth_rate: Option<f64>,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JurisdictionKind {
    State,
    County,
    City,
    District,
    Unknown,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct JurisdictionShare {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: JurisdictionKind,
    pub geoid: Option<String>,
    #[serde(rename = "verifiedCount")]
    pub verified_count: u64,
    /// All group-supporter verifications in this jurisdiction, verified or not.
    #[serde(rename = "supporterCount")]
    pub supporter_count: u64,
    /// Share of the group's verified voters, 0-100.
    pub percentage: f64,
    /// verified_count / supporter_count, 0-100.
    #[serde(rename = "verificationRate")]
    pub verification_rate: f64,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct JurisdictionConcentration {
    #[serde(rename = "topJurisdictions")]
    pub top_jurisdictions: Vec<JurisdictionShare>,
    /// Herfindahl-Hirschman index in [0, 1].
    #[serde(rename = "concentrationIndex")]
    pub concentration_index: f64,
    #[serde(rename = "totalJurisdictions")]
    pub total_jurisdictions: u64,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    High,
    Medium,
    Low,
}

impl Urgency {
    pub fn from_days_until(days: i64) -> Urgency {
        if days < 30 {
            Urgency::High
        } else if days < 90 {
            Urgency::Medium
        } else {
            Urgency::Low
        }
    }

    /// Multiplier applied to the leverage score.
    pub fn leverage_weight(&self) -> f64 {
        match self {
            Urgency::High => 1.0,
            Urgency::Medium => 0.7,
            Urgency::Low => 0.4,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeverageLevel {
    Kingmaker,
    Significant,
    Marginal,
}

impl LeverageLevel {
    pub fn classify(verified_supporters: u64, candidate_count: u32) -> LeverageLevel {
        let tossup = candidate_count >= 4;
        let competitive = candidate_count >= 2;
        if tossup && verified_supporters >= 500 {
            LeverageLevel::Kingmaker
        } else if (competitive && verified_supporters >= 200) || verified_supporters >= 100 {
            LeverageLevel::Significant
        } else {
            LeverageLevel::Marginal
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfficeLevel {
    Local,
    State,
    Federal,
}

impl OfficeLevel {
    /// Reads the free-form level labels of the office exports.
    pub fn from_label(label: &str) -> Option<OfficeLevel> {
        let l = label.trim().to_lowercase();
        if l.is_empty() {
            None
        } else if l.contains("federal") {
            Some(OfficeLevel::Federal)
        } else if l.contains("state") {
            Some(OfficeLevel::State)
        } else {
            Some(OfficeLevel::Local)
        }
    }

    /// Local races need fewer absolute votes to swing.
    pub fn leverage_multiplier(&self) -> f64 {
        match self {
            OfficeLevel::Local => 3.0,
            OfficeLevel::State => 2.0,
            OfficeLevel::Federal => 1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OfficeLevel::Local => "local",
            OfficeLevel::State => "state",
            OfficeLevel::Federal => "federal",
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BallotItemType {
    Race,
    Measure,
}

/// Where a supporter count comes from.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupporterCountSource {
    /// Counted from the verification / jurisdiction tables.
    Exact,
    /// Heuristic for external elections without jurisdiction linkage.
    Estimated,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct BallotItemSummary {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub item_type: BallotItemType,
    #[serde(rename = "electionDate")]
    pub election_date: String,
    #[serde(rename = "officeLevel")]
    pub office_level: Option<OfficeLevel>,
    #[serde(rename = "officeName")]
    pub office_name: Option<String>,
    #[serde(rename = "candidateCount")]
    pub candidate_count: Option<u32>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct BallotExposure {
    #[serde(rename = "ballotItem")]
    pub ballot_item: BallotItemSummary,
    #[serde(rename = "verifiedSupporters")]
    pub verified_supporters: u64,
    #[serde(rename = "potentialSupporters")]
    pub potential_supporters: Option<u64>,
    pub urgency: Urgency,
    #[serde(rename = "leverageScore")]
    pub leverage_score: f64,
    #[serde(rename = "leverageLevel")]
    pub leverage_level: Option<LeverageLevel>,
    pub jurisdiction: Option<String>,
    #[serde(rename = "jurisdictionId")]
    pub jurisdiction_id: Option<String>,
    #[serde(rename = "supporterCountSource")]
    pub supporter_count_source: SupporterCountSource,
}

#[derive(Eq, PartialEq, Debug, Clone, Hash, Serialize, Deserialize)]
pub struct CandidateEntry {
    pub name: String,
    pub party: Option<String>,
}

/// The detailed view of one upcoming ballot item inside the group's footprint.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct BallotItemInfluence {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub item_type: BallotItemType,
    #[serde(rename = "electionId")]
    pub election_id: String,
    #[serde(rename = "electionName")]
    pub election_name: String,
    #[serde(rename = "electionDate")]
    pub election_date: String,
    pub jurisdiction: String,
    #[serde(rename = "jurisdictionId")]
    pub jurisdiction_id: String,
    pub state: Option<String>,
    /// All group-supporter verifications able to vote on the item.
    pub supporters: u64,
    #[serde(rename = "verifiedSupporters")]
    pub verified_supporters: u64,
    pub urgency: Urgency,
    #[serde(rename = "daysUntil")]
    pub days_until: i64,
    #[serde(rename = "officeLevel")]
    pub office_level: OfficeLevel,
    #[serde(rename = "officeName")]
    pub office_name: Option<String>,
    #[serde(rename = "candidateCount")]
    pub candidate_count: u32,
    pub candidates: Vec<CandidateEntry>,
    #[serde(rename = "measureSummary")]
    pub measure_summary: Option<String>,
    #[serde(rename = "measureProSnippet")]
    pub measure_pro_snippet: Option<String>,
    #[serde(rename = "measureConSnippet")]
    pub measure_con_snippet: Option<String>,
    #[serde(rename = "numWinners")]
    pub num_winners: Option<u32>,
    #[serde(rename = "numSelectionsMax")]
    pub num_selections_max: Option<u32>,
    #[serde(rename = "isRankedChoice")]
    pub is_ranked_choice: bool,
    #[serde(rename = "isPrimary")]
    pub is_primary: bool,
    #[serde(rename = "isRunoff")]
    pub is_runoff: bool,
    #[serde(rename = "isRecall")]
    pub is_recall: bool,
    #[serde(rename = "leverageScore")]
    pub leverage_score: f64,
    #[serde(rename = "leverageLevel")]
    pub leverage_level: LeverageLevel,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct NetworkExpansion {
    #[serde(rename = "connectedLeaders")]
    pub connected_leaders: u64,
    #[serde(rename = "newJurisdictions")]
    pub new_jurisdictions: u64,
    pub trend: Vec<TimeSeriesPoint>,
    #[serde(rename = "potentialLeaders")]
    pub potential_leaders: Option<u64>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SupporterEngagement {
    #[serde(rename = "totalSupporters")]
    pub total_supporters: u64,
    #[serde(rename = "recentJoiners30d")]
    pub recent_joiners_30d: u64,
    #[serde(rename = "recentJoiners90d")]
    pub recent_joiners_90d: u64,
    /// Fraction of 30-day joiners who are verified, 0-1.
    #[serde(rename = "recentVerificationRate")]
    pub recent_verification_rate: f64,
    /// Unset when there is no recent joiner to measure against.
    #[serde(rename = "engagementScore")]
    pub engagement_score: Option<u32>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct TopicJurisdiction {
    pub id: String,
    pub name: String,
    #[serde(rename = "verifiedCount")]
    pub verified_count: u64,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct TopicMetrics {
    #[serde(rename = "groupId")]
    pub group_id: String,
    pub title: String,
    #[serde(rename = "supporterCount")]
    pub supporter_count: u64,
    #[serde(rename = "verifiedVoterCount")]
    pub verified_voter_count: u64,
    #[serde(rename = "leaderCount")]
    pub leader_count: u64,
    #[serde(rename = "recentJoiners30d")]
    pub recent_joiners_30d: u64,
    #[serde(rename = "recentJoiners90d")]
    pub recent_joiners_90d: u64,
    #[serde(rename = "topJurisdictions")]
    pub top_jurisdictions: Vec<TopicJurisdiction>,
    #[serde(rename = "createdDate")]
    pub created_date: Option<String>,
    #[serde(rename = "updatedDate")]
    pub updated_date: Option<String>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct TopicOpportunity {
    pub topic: String,
    #[serde(rename = "topicId")]
    pub topic_id: String,
    #[serde(rename = "ballotItemId")]
    pub ballot_item_id: String,
    #[serde(rename = "ballotItemTitle")]
    pub ballot_item_title: String,
    #[serde(rename = "relevanceScore")]
    pub relevance_score: f64,
    #[serde(rename = "opportunityScore")]
    pub opportunity_score: f64,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
    High,
    Medium,
    Low,
}

impl ImpactLevel {
    pub fn weight(&self) -> u32 {
        match self {
            ImpactLevel::High => 3,
            ImpactLevel::Medium => 2,
            ImpactLevel::Low => 1,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ActionableInsight {
    pub priority: u8,
    pub title: String,
    pub description: String,
    pub metric: String,
    pub action: String,
    pub impact: ImpactLevel,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Accelerating,
    Steady,
    Slowing,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct VelocityProjection {
    #[serde(rename = "in30Days")]
    pub in_30_days: i64,
    #[serde(rename = "in90Days")]
    pub in_90_days: i64,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct MovementVelocity {
    /// Verified voters gained per week.
    #[serde(rename = "yourGrowthRate")]
    pub your_growth_rate: f64,
    #[serde(rename = "peerMedian", skip_serializing_if = "Option::is_none", default)]
    pub peer_median: Option<f64>,
    #[serde(rename = "percentile", skip_serializing_if = "Option::is_none", default)]
    pub percentile: Option<f64>,
    #[serde(rename = "trendDirection")]
    pub trend_direction: TrendDirection,
    pub projection: VelocityProjection,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Competitiveness {
    Safe,
    Lean,
    Tossup,
}

impl Competitiveness {
    pub fn from_candidate_count(candidates: u32) -> Competitiveness {
        if candidates >= 4 {
            Competitiveness::Tossup
        } else if candidates >= 2 {
            Competitiveness::Lean
        } else {
            Competitiveness::Safe
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ElectoralLandscape {
    #[serde(rename = "ballotItem")]
    pub ballot_item: BallotItemSummary,
    pub competitiveness: Competitiveness,
    #[serde(rename = "candidateCount")]
    pub candidate_count: u32,
    #[serde(rename = "yourLeverage")]
    pub your_leverage: LeverageLevel,
    #[serde(rename = "verifiedSupporters")]
    pub verified_supporters: u64,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CoalitionOpportunity {
    #[serde(rename = "leaderName")]
    pub leader_name: String,
    #[serde(rename = "groupId")]
    pub group_id: String,
    #[serde(rename = "supporterCount")]
    pub supporter_count: u64,
    #[serde(rename = "sharedJurisdictions")]
    pub shared_jurisdictions: Vec<String>,
    #[serde(rename = "sharedBallotItems")]
    pub shared_ballot_items: u64,
    #[serde(rename = "synergyScore")]
    pub synergy_score: f64,
}

/// A peer leader, with the metrics the snapshot can tell about their groups.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct LeaderComparison {
    pub id: String,
    pub name: String,
    #[serde(rename = "totalSupporters")]
    pub total_supporters: u64,
    #[serde(rename = "verifiedVoters")]
    pub verified_voters: u64,
    /// verified_voters / total_supporters, 0-1.
    #[serde(rename = "verificationRate")]
    pub verification_rate: f64,
    /// Recent verifications per week.
    #[serde(rename = "growthRate")]
    pub growth_rate: f64,
    pub reach: u64,
    pub jurisdictions: Vec<String>,
}

// ********* Configuration **********

/// The group the dashboard is built for, unless told otherwise.
pub const DEFAULT_MAIN_GROUP_ID: &str = "4d627244-5598-4403-8704-979140ae9cac";

#[derive(PartialEq, Debug, Clone, Copy)]
pub struct InfluenceRules {
    /// Number of jurisdictions reported in the concentration metric.
    pub top_jurisdictions: usize,
    /// Number of jurisdictions reported per topic.
    pub topic_top_jurisdictions: usize,
    /// Length of the recommendation list, at most `MAX_INSIGHTS`.
    pub max_insights: usize,
    /// Share of the verified voters assumed to reach an external election.
    pub api_supporter_estimate_ratio: f64,
    /// Only consider elections labelled as primaries.
    pub primary_elections_only: bool,
}

impl InfluenceRules {
    /// Upper bound on the number of recommendations.
    pub const MAX_INSIGHTS: usize = 5;

    pub const DEFAULT_RULES: InfluenceRules = InfluenceRules {
        top_jurisdictions: 10,
        topic_top_jurisdictions: 5,
        max_insights: 5,
        api_supporter_estimate_ratio: 0.1,
        primary_elections_only: false,
    };
}

impl Default for InfluenceRules {
    fn default() -> Self {
        InfluenceRules::DEFAULT_RULES
    }
}

/// Everything a metric needs besides the snapshot itself.
///
/// `now` is always injected so that the same snapshot and context give the
/// same output.
#[derive(PartialEq, Debug, Clone)]
pub struct MetricsContext {
    pub main_group_id: String,
    pub now: DateTime<Utc>,
    pub rules: InfluenceRules,
}

impl MetricsContext {
    pub fn new(main_group_id: &str, now: DateTime<Utc>) -> MetricsContext {
        MetricsContext {
            main_group_id: main_group_id.to_string(),
            now,
            rules: InfluenceRules::DEFAULT_RULES,
        }
    }

    pub fn with_rules(self, rules: InfluenceRules) -> MetricsContext {
        MetricsContext { rules, ..self }
    }
}
