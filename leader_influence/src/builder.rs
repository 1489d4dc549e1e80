use crate::model::*;

/// A builder for assembling snapshots in code.
///
/// People are referred to by a short key: the key becomes the person id, and
/// the profile of that person is `profile-<key>`. People are created the
/// first time they are mentioned.
///
/// ```
/// use leader_influence::builder::SnapshotBuilder;
///
/// let snapshot = SnapshotBuilder::new()
///     .group("g1", "Clean water")
///     .supporter("g1", "ana", "2026-09-01")
///     .verified_in("ana", &["j1"], "2026-09-02")
///     .election("e1", "General", "2026-11-03")
///     .race("b1", "e1", "j1", "Mayor", Some("city"), &[("Jo Park", None)])
///     .build();
///
/// assert_eq!(snapshot.voter_verifications.len(), 1);
/// assert_eq!(snapshot.ballot_items.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SnapshotBuilder {
    snapshot: Snapshot,
    counter: u32,
}

fn opt_str(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

impl SnapshotBuilder {
    pub fn new() -> SnapshotBuilder {
        SnapshotBuilder::default()
    }

    /// Starts from an existing snapshot.
    pub fn from_snapshot(snapshot: Snapshot) -> SnapshotBuilder {
        SnapshotBuilder {
            snapshot,
            counter: 0,
        }
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.counter += 1;
        format!("{}-{}", prefix, self.counter)
    }

    fn ensure_person(&mut self, key: &str) {
        if self.snapshot.persons.iter().any(|p| p.id == key) {
            return;
        }
        let (first, last) = match key.split_once(' ') {
            Some((f, l)) => (f.to_string(), l.to_string()),
            None => (key.to_string(), String::new()),
        };
        self.snapshot.persons.push(Person {
            id: key.to_string(),
            first_name: first,
            last_name: last,
            ..Person::default()
        });
        self.snapshot.profiles.push(Profile {
            id: format!("profile-{}", key),
            person_id: key.to_string(),
            ..Profile::default()
        });
    }

    /// Adds a group whose name and title are both `title`.
    pub fn group(self, id: &str, title: &str) -> SnapshotBuilder {
        self.with_group(ViewpointGroup {
            id: id.to_string(),
            name: opt_str(title),
            title: opt_str(title),
            ..ViewpointGroup::default()
        })
    }

    pub fn with_group(mut self, group: ViewpointGroup) -> SnapshotBuilder {
        self.snapshot.viewpoint_groups.push(group);
        self
    }

    /// Relates a person to a group. An empty `created_at` leaves it unset.
    pub fn member_as(
        mut self,
        group_id: &str,
        person: &str,
        rel_type: RelType,
        created_at: &str,
    ) -> SnapshotBuilder {
        self.ensure_person(person);
        let id = self.next_id("rel");
        self.snapshot
            .profile_viewpoint_group_rels
            .push(ProfileViewpointGroupRel {
                id,
                profile_id: format!("profile-{}", person),
                viewpoint_group_id: group_id.to_string(),
                rel_type,
                is_public: None,
                created_at: opt_str(created_at),
            });
        self
    }

    pub fn supporter(self, group_id: &str, person: &str, created_at: &str) -> SnapshotBuilder {
        self.member_as(group_id, person, RelType::Supporter, created_at)
    }

    pub fn leader(self, group_id: &str, person: &str, created_at: &str) -> SnapshotBuilder {
        self.member_as(group_id, person, RelType::Leader, created_at)
    }

    fn verification(
        mut self,
        person: &str,
        jurisdictions: &[&str],
        verified: bool,
        created_at: &str,
    ) -> SnapshotBuilder {
        self.ensure_person(person);
        let vid = self.next_id("vv");
        self.snapshot.voter_verifications.push(VoterVerification {
            id: vid.clone(),
            person_id: person.to_string(),
            is_fully_verified: verified,
            has_confirmed_voted: None,
            created_at: opt_str(created_at),
        });
        for j in jurisdictions {
            let id = self.next_id("vvj");
            self.snapshot
                .voter_verification_jurisdiction_rels
                .push(VoterVerificationJurisdictionRel {
                    id,
                    voter_verification_id: vid.clone(),
                    jurisdiction_id: j.to_string(),
                });
        }
        self
    }

    /// Adds a fully-verified verification placing the person in the given jurisdictions.
    pub fn verified_in(self, person: &str, jurisdictions: &[&str], created_at: &str) -> SnapshotBuilder {
        self.verification(person, jurisdictions, true, created_at)
    }

    /// Adds a verification that is not (yet) complete.
    pub fn unverified_in(self, person: &str, jurisdictions: &[&str]) -> SnapshotBuilder {
        self.verification(person, jurisdictions, false, "")
    }

    pub fn jurisdiction(mut self, jurisdiction: Jurisdiction) -> SnapshotBuilder {
        self.snapshot.jurisdictions.push(jurisdiction);
        self
    }

    /// A jurisdiction with a name and optionally a state code.
    pub fn named_jurisdiction(self, id: &str, name: &str, state: Option<&str>) -> SnapshotBuilder {
        self.jurisdiction(Jurisdiction {
            id: id.to_string(),
            name: opt_str(name),
            state: state.map(|s| s.to_string()),
            ..Jurisdiction::default()
        })
    }

    pub fn election(mut self, id: &str, name: &str, poll_date: &str) -> SnapshotBuilder {
        self.snapshot.elections.push(Election {
            id: id.to_string(),
            name: name.to_string(),
            poll_date: poll_date.to_string(),
            jurisdiction_id: None,
        });
        self
    }

    /// Adds a race on the ballot: office, term, race, ballot item and one
    /// candidacy per `(name, party)` entry.
    pub fn race(
        mut self,
        ballot_item_id: &str,
        election_id: &str,
        jurisdiction_id: &str,
        office_name: &str,
        office_level: Option<&str>,
        candidates: &[(&str, Option<&str>)],
    ) -> SnapshotBuilder {
        let office_id = self.next_id("office");
        let term_id = self.next_id("term");
        let race_id = format!("race-{}", ballot_item_id);
        self.snapshot.offices.push(Office {
            id: office_id.clone(),
            name: office_name.to_string(),
            level: office_level.map(|l| l.to_string()),
            jurisdiction_id: opt_str(jurisdiction_id),
        });
        self.snapshot.office_terms.push(OfficeTerm {
            id: term_id.clone(),
            office_id,
            ..OfficeTerm::default()
        });
        self.snapshot.races.push(Race {
            id: race_id.clone(),
            office_term_id: term_id,
            ballot_item_id: Some(ballot_item_id.to_string()),
            ..Race::default()
        });
        self.snapshot.ballot_items.push(BallotItem {
            id: ballot_item_id.to_string(),
            election_id: election_id.to_string(),
            jurisdiction_id: opt_str(jurisdiction_id),
            ..BallotItem::default()
        });
        for (name, party) in candidates {
            let party_id = party.map(|p| {
                if !self.snapshot.parties.iter().any(|x| x.id == p) {
                    self.snapshot.parties.push(Party {
                        id: p.to_string(),
                        name: p.to_string(),
                        abbreviation: Some(p.chars().take(1).collect()),
                    });
                }
                p.to_string()
            });
            self.ensure_person(name);
            let id = self.next_id("candidacy");
            self.snapshot.candidacies.push(Candidacy {
                id,
                person_id: name.to_string(),
                race_id: race_id.clone(),
                party_id,
            });
        }
        self
    }

    /// Adds a measure on the ballot.
    pub fn measure(
        mut self,
        ballot_item_id: &str,
        election_id: &str,
        jurisdiction_id: &str,
        title: &str,
    ) -> SnapshotBuilder {
        let measure_id = format!("measure-{}", ballot_item_id);
        self.snapshot.measures.push(Measure {
            id: measure_id.clone(),
            title: opt_str(title),
            ballot_item_id: Some(ballot_item_id.to_string()),
            ..Measure::default()
        });
        self.snapshot.ballot_items.push(BallotItem {
            id: ballot_item_id.to_string(),
            election_id: election_id.to_string(),
            measure_id: Some(measure_id),
            jurisdiction_id: opt_str(jurisdiction_id),
            ..BallotItem::default()
        });
        self
    }

    pub fn ballot_item(mut self, item: BallotItem) -> SnapshotBuilder {
        self.snapshot.ballot_items.push(item);
        self
    }

    pub fn build(self) -> Snapshot {
        self.snapshot
    }
}
