use log::debug;

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::model::*;

/// Lookup maps over a [Snapshot], built once per computation pass.
///
/// Every join of the metrics goes through these maps: id -> record for each
/// table, and foreign key -> records for the relation tables.
pub struct SnapshotIndex<'a> {
    pub snapshot: &'a Snapshot,
    groups: HashMap<&'a str, &'a ViewpointGroup>,
    persons: HashMap<&'a str, &'a Person>,
    person_by_profile: HashMap<&'a str, &'a str>,
    verifications_by_person: HashMap<&'a str, Vec<&'a VoterVerification>>,
    jurisdictions: HashMap<&'a str, &'a Jurisdiction>,
    jurisdictions_by_verification: HashMap<&'a str, HashSet<&'a str>>,
    rels_by_group: HashMap<&'a str, Vec<&'a ProfileViewpointGroupRel>>,
    rels_by_profile: HashMap<&'a str, Vec<&'a ProfileViewpointGroupRel>>,
    elections: HashMap<&'a str, &'a Election>,
    options_by_ballot_item: HashMap<&'a str, Vec<&'a BallotItemOption>>,
    candidacies: HashMap<&'a str, &'a Candidacy>,
    candidacies_by_race: HashMap<&'a str, Vec<&'a Candidacy>>,
    races: HashMap<&'a str, &'a Race>,
    races_by_ballot_item: HashMap<&'a str, &'a Race>,
    office_terms: HashMap<&'a str, &'a OfficeTerm>,
    offices: HashMap<&'a str, &'a Office>,
    measures: HashMap<&'a str, &'a Measure>,
    measures_by_ballot_item: HashMap<&'a str, &'a Measure>,
    influence_targets: HashMap<&'a str, &'a InfluenceTarget>,
    parties: HashMap<&'a str, &'a Party>,
}

/// The people behind a group, seen through the verification tables.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct GroupFootprint<'a> {
    pub profile_ids: BTreeSet<&'a str>,
    pub person_ids: BTreeSet<&'a str>,
    /// Verifications of the group's persons, whatever their status.
    pub verification_ids: BTreeSet<&'a str>,
    pub verified_verification_ids: BTreeSet<&'a str>,
    pub verified_person_ids: BTreeSet<&'a str>,
}

fn by_id<'a, T, F>(records: &'a [T], key: F) -> HashMap<&'a str, &'a T>
where
    F: Fn(&'a T) -> &'a str,
{
    records.iter().map(|r| (key(r), r)).collect()
}

fn grouped<'a, T, F>(records: &'a [T], key: F) -> HashMap<&'a str, Vec<&'a T>>
where
    F: Fn(&'a T) -> &'a str,
{
    let mut res: HashMap<&'a str, Vec<&'a T>> = HashMap::new();
    for r in records.iter() {
        res.entry(key(r)).or_default().push(r);
    }
    res
}

impl<'a> SnapshotIndex<'a> {
    pub fn new(snapshot: &'a Snapshot) -> SnapshotIndex<'a> {
        let mut jurisdictions_by_verification: HashMap<&'a str, HashSet<&'a str>> = HashMap::new();
        for rel in snapshot.voter_verification_jurisdiction_rels.iter() {
            jurisdictions_by_verification
                .entry(rel.voter_verification_id.as_str())
                .or_default()
                .insert(rel.jurisdiction_id.as_str());
        }

        // Races point at their ballot item, or ballot items point at their race.
        let races = by_id(&snapshot.races, |r| r.id.as_str());
        let mut races_by_ballot_item: HashMap<&'a str, &'a Race> = HashMap::new();
        for race in snapshot.races.iter() {
            if let Some(bid) = race.ballot_item_id.as_deref() {
                races_by_ballot_item.entry(bid).or_insert(race);
            }
        }
        for item in snapshot.ballot_items.iter() {
            if let Some(race) = item.race_id.as_deref().and_then(|rid| races.get(rid)) {
                races_by_ballot_item.entry(item.id.as_str()).or_insert(*race);
            }
        }

        let measures = by_id(&snapshot.measures, |m| m.id.as_str());
        let mut measures_by_ballot_item: HashMap<&'a str, &'a Measure> = HashMap::new();
        for measure in snapshot.measures.iter() {
            if let Some(bid) = measure.ballot_item_id.as_deref() {
                measures_by_ballot_item.entry(bid).or_insert(measure);
            }
        }
        for item in snapshot.ballot_items.iter() {
            if let Some(m) = item.measure_id.as_deref().and_then(|mid| measures.get(mid)) {
                measures_by_ballot_item.entry(item.id.as_str()).or_insert(*m);
            }
        }

        let idx = SnapshotIndex {
            snapshot,
            groups: by_id(&snapshot.viewpoint_groups, |g| g.id.as_str()),
            persons: by_id(&snapshot.persons, |p| p.id.as_str()),
            person_by_profile: snapshot
                .profiles
                .iter()
                .map(|p| (p.id.as_str(), p.person_id.as_str()))
                .collect(),
            verifications_by_person: grouped(&snapshot.voter_verifications, |v| {
                v.person_id.as_str()
            }),
            jurisdictions: by_id(&snapshot.jurisdictions, |j| j.id.as_str()),
            jurisdictions_by_verification,
            rels_by_group: grouped(&snapshot.profile_viewpoint_group_rels, |r| {
                r.viewpoint_group_id.as_str()
            }),
            rels_by_profile: grouped(&snapshot.profile_viewpoint_group_rels, |r| {
                r.profile_id.as_str()
            }),
            elections: by_id(&snapshot.elections, |e| e.id.as_str()),
            options_by_ballot_item: grouped(&snapshot.ballot_item_options, |o| {
                o.ballot_item_id.as_str()
            }),
            candidacies: by_id(&snapshot.candidacies, |c| c.id.as_str()),
            candidacies_by_race: grouped(&snapshot.candidacies, |c| c.race_id.as_str()),
            races,
            races_by_ballot_item,
            office_terms: by_id(&snapshot.office_terms, |t| t.id.as_str()),
            offices: by_id(&snapshot.offices, |o| o.id.as_str()),
            measures,
            measures_by_ballot_item,
            influence_targets: by_id(&snapshot.influence_targets, |t| t.id.as_str()),
            parties: by_id(&snapshot.parties, |p| p.id.as_str()),
        };
        debug!(
            "SnapshotIndex::new: {} groups, {} profiles, {} verifications, {} ballot items",
            idx.groups.len(),
            idx.person_by_profile.len(),
            snapshot.voter_verifications.len(),
            snapshot.ballot_items.len()
        );
        idx
    }

    pub fn group(&self, id: &str) -> Option<&'a ViewpointGroup> {
        self.groups.get(id).copied()
    }

    pub fn person(&self, id: &str) -> Option<&'a Person> {
        self.persons.get(id).copied()
    }

    pub fn person_of_profile(&self, profile_id: &str) -> Option<&'a str> {
        self.person_by_profile.get(profile_id).copied()
    }

    pub fn verifications_of_person(&self, person_id: &str) -> &[&'a VoterVerification] {
        self.verifications_by_person
            .get(person_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_person_verified(&self, person_id: &str) -> bool {
        self.verifications_of_person(person_id)
            .iter()
            .any(|v| v.is_fully_verified)
    }

    pub fn jurisdiction(&self, id: &str) -> Option<&'a Jurisdiction> {
        self.jurisdictions.get(id).copied()
    }

    pub fn jurisdictions_of_verification(&self, verification_id: &str) -> Option<&HashSet<&'a str>> {
        self.jurisdictions_by_verification.get(verification_id)
    }

    pub fn rels_of_group(&self, group_id: &str) -> &[&'a ProfileViewpointGroupRel] {
        self.rels_by_group
            .get(group_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn rels_of_profile(&self, profile_id: &str) -> &[&'a ProfileViewpointGroupRel] {
        self.rels_by_profile
            .get(profile_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn election(&self, id: &str) -> Option<&'a Election> {
        self.elections.get(id).copied()
    }

    pub fn options_of_ballot_item(&self, ballot_item_id: &str) -> &[&'a BallotItemOption] {
        self.options_by_ballot_item
            .get(ballot_item_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn candidacy(&self, id: &str) -> Option<&'a Candidacy> {
        self.candidacies.get(id).copied()
    }

    pub fn candidacies_of_race(&self, race_id: &str) -> &[&'a Candidacy] {
        self.candidacies_by_race
            .get(race_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn race(&self, id: &str) -> Option<&'a Race> {
        self.races.get(id).copied()
    }

    pub fn race_of_ballot_item(&self, ballot_item_id: &str) -> Option<&'a Race> {
        self.races_by_ballot_item.get(ballot_item_id).copied()
    }

    /// Race -> OfficeTerm -> Office.
    pub fn office_of_race(&self, race: &Race) -> Option<&'a Office> {
        self.office_terms
            .get(race.office_term_id.as_str())
            .and_then(|term| self.offices.get(term.office_id.as_str()))
            .copied()
    }

    pub fn measure_of_ballot_item(&self, ballot_item_id: &str) -> Option<&'a Measure> {
        self.measures_by_ballot_item.get(ballot_item_id).copied()
    }

    pub fn measure(&self, id: &str) -> Option<&'a Measure> {
        self.measures.get(id).copied()
    }

    pub fn influence_target(&self, id: &str) -> Option<&'a InfluenceTarget> {
        self.influence_targets.get(id).copied()
    }

    pub fn party(&self, id: &str) -> Option<&'a Party> {
        self.parties.get(id).copied()
    }

    /// Collects the profiles, persons and verifications behind a group.
    ///
    /// With a role, only the relationships of that role are followed.
    pub fn footprint(&self, group_id: &str, role: Option<RelType>) -> GroupFootprint<'a> {
        let mut fp = GroupFootprint::default();
        for rel in self.rels_of_group(group_id) {
            if role.map(|r| r != rel.rel_type).unwrap_or(false) {
                continue;
            }
            fp.profile_ids.insert(rel.profile_id.as_str());
            if let Some(person_id) = self.person_of_profile(rel.profile_id.as_str()) {
                fp.person_ids.insert(person_id);
            }
        }
        for person_id in fp.person_ids.iter() {
            for v in self.verifications_of_person(person_id) {
                fp.verification_ids.insert(v.id.as_str());
                if v.is_fully_verified {
                    fp.verified_verification_ids.insert(v.id.as_str());
                    fp.verified_person_ids.insert(v.person_id.as_str());
                }
            }
        }
        fp
    }

    /// Jurisdictions reached by the verified members of a group (any role).
    pub fn group_jurisdictions(&self, group_id: &str) -> BTreeSet<&'a str> {
        let fp = self.footprint(group_id, None);
        let mut res: BTreeSet<&'a str> = BTreeSet::new();
        for vid in fp.verified_verification_ids.iter() {
            if let Some(js) = self.jurisdictions_of_verification(vid) {
                res.extend(js.iter().copied());
            }
        }
        res
    }
}
