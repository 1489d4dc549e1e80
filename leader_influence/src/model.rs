// ********* Relational snapshot ***********
//
// Flat records keyed by opaque string ids, one table per entity. The field
// names follow the snake_case JSON exports the tables are loaded from.

use serde::{Deserialize, Serialize};

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub party_id: Option<String>,
    pub created_at: Option<String>,
}

impl Person {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// A platform identity. Bound 1:1 to a [Person].
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub person_id: String,
    pub display_name_long: Option<String>,
    pub display_name_short: Option<String>,
    pub location: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewpointGroup {
    pub id: String,
    pub name: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl ViewpointGroup {
    /// The title, when it is present and not blank.
    pub fn topic_title(&self) -> Option<&str> {
        self.title.as_deref().filter(|t| !t.trim().is_empty())
    }

    pub fn label(&self) -> String {
        self.topic_title()
            .or_else(|| self.name.as_deref().filter(|n| !n.trim().is_empty()))
            .unwrap_or(self.id.as_str())
            .to_string()
    }
}

/// The role a profile holds in a viewpoint group.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelType {
    Leader,
    Supporter,
    Member,
    #[serde(other)]
    Other,
}

impl Default for RelType {
    fn default() -> Self {
        RelType::Member
    }
}

/// Links a profile to a group. A profile may hold several roles across
/// several groups.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileViewpointGroupRel {
    pub id: String,
    pub profile_id: String,
    pub viewpoint_group_id: String,
    // Older exports call this field `role`.
    #[serde(rename = "type", alias = "role", default)]
    pub rel_type: RelType,
    pub is_public: Option<bool>,
    pub created_at: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoterVerification {
    pub id: String,
    pub person_id: String,
    #[serde(default)]
    pub is_fully_verified: bool,
    pub has_confirmed_voted: Option<bool>,
    pub created_at: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Jurisdiction {
    pub id: String,
    pub name: Option<String>,
    pub estimated_name: Option<String>,
    #[serde(rename = "type")]
    pub jurisdiction_type: Option<String>,
    pub level: Option<String>,
    pub state: Option<String>,
    pub geoid: Option<String>,
    pub geo_id: Option<String>,
    pub ocdid: Option<String>,
    pub parent_jurisdiction_id: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoterVerificationJurisdictionRel {
    pub id: String,
    pub voter_verification_id: String,
    pub jurisdiction_id: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Election {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub poll_date: String,
    pub jurisdiction_id: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct BallotItem {
    pub id: String,
    pub election_id: String,
    pub title: Option<String>,
    /// `race` or `measure` when the export tags it. Inferred otherwise.
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    pub race_id: Option<String>,
    pub measure_id: Option<String>,
    pub jurisdiction_id: Option<String>,
    pub num_selections_max: Option<u32>,
    pub num_winners: Option<u32>,
    pub is_ranked_choice: Option<bool>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct BallotItemOption {
    pub id: String,
    pub ballot_item_id: String,
    pub title: Option<String>,
    pub candidacy_id: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Race {
    pub id: String,
    pub office_term_id: String,
    pub ballot_item_id: Option<String>,
    pub is_primary: Option<bool>,
    pub is_runoff: Option<bool>,
    pub is_recall: Option<bool>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Candidacy {
    pub id: String,
    pub person_id: String,
    pub race_id: String,
    pub party_id: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Office {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub level: Option<String>,
    pub jurisdiction_id: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct OfficeTerm {
    pub id: String,
    pub office_id: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Measure {
    pub id: String,
    pub title: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub pro_snippet: Option<String>,
    pub con_snippet: Option<String>,
    pub ballot_item_id: Option<String>,
    pub influence_target_id: Option<String>,
    pub jurisdiction_id: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct InfluenceTarget {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Party {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub abbreviation: Option<String>,
}

/// The complete relational dataset for one computation pass.
///
/// Nothing in this crate mutates a snapshot: every metric re-scans it (through
/// a [crate::index::SnapshotIndex]) and returns fresh records.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub viewpoint_groups: Vec<ViewpointGroup>,
    #[serde(default)]
    pub profiles: Vec<Profile>,
    #[serde(default)]
    pub persons: Vec<Person>,
    #[serde(default)]
    pub profile_viewpoint_group_rels: Vec<ProfileViewpointGroupRel>,
    #[serde(default)]
    pub voter_verifications: Vec<VoterVerification>,
    #[serde(default)]
    pub jurisdictions: Vec<Jurisdiction>,
    #[serde(default)]
    pub voter_verification_jurisdiction_rels: Vec<VoterVerificationJurisdictionRel>,
    #[serde(default)]
    pub elections: Vec<Election>,
    #[serde(default)]
    pub ballot_items: Vec<BallotItem>,
    #[serde(default)]
    pub ballot_item_options: Vec<BallotItemOption>,
    #[serde(default)]
    pub races: Vec<Race>,
    #[serde(default)]
    pub candidacies: Vec<Candidacy>,
    #[serde(default)]
    pub offices: Vec<Office>,
    #[serde(default)]
    pub office_terms: Vec<OfficeTerm>,
    #[serde(default)]
    pub measures: Vec<Measure>,
    #[serde(default)]
    pub influence_targets: Vec<InfluenceTarget>,
    #[serde(default)]
    pub parties: Vec<Party>,
}

impl Snapshot {
    /// SHA-256 of the canonical JSON form of the snapshot.
    ///
    /// Two snapshots with the same digest produce the same metrics for the
    /// same context.
    pub fn digest(&self) -> String {
        // Serializing plain structs of strings, options and vectors cannot fail.
        let canonical = serde_json::to_string(self).unwrap_or_default();
        sha256::digest(canonical.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.profile_viewpoint_group_rels.is_empty()
            && self.voter_verifications.is_empty()
            && self.ballot_items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rel_type_accepts_role_alias() {
        let js = r#"{"id": "r1", "profile_id": "p1", "viewpoint_group_id": "g1", "role": "leader"}"#;
        let rel: ProfileViewpointGroupRel = serde_json::from_str(js).unwrap();
        assert_eq!(rel.rel_type, RelType::Leader);

        let js = r#"{"id": "r2", "profile_id": "p1", "viewpoint_group_id": "g1", "type": "admin"}"#;
        let rel: ProfileViewpointGroupRel = serde_json::from_str(js).unwrap();
        assert_eq!(rel.rel_type, RelType::Other);
    }

    #[test]
    fn missing_tables_default_to_empty() {
        let snapshot: Snapshot = serde_json::from_str(r#"{"profiles": []}"#).unwrap();
        assert!(snapshot.is_empty());
        assert!(snapshot.ballot_items.is_empty());
    }

    #[test]
    fn digest_tracks_content() {
        let mut a = Snapshot::default();
        let b = Snapshot::default();
        assert_eq!(a.digest(), b.digest());
        a.persons.push(Person {
            id: "p1".to_string(),
            ..Person::default()
        });
        assert_ne!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);
    }

    #[test]
    fn person_full_name_trims() {
        let p = Person {
            id: "p".to_string(),
            first_name: "Ada".to_string(),
            last_name: "".to_string(),
            ..Person::default()
        };
        assert_eq!(p.full_name(), "Ada");
    }
}
