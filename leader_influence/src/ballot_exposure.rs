use chrono::{Datelike, NaiveDate};
use log::{debug, info};

use std::collections::{HashMap, HashSet};

use crate::config::*;
use crate::dates;
use crate::enhancement::UpcomingElection;
use crate::index::SnapshotIndex;
use crate::jurisdictions::{display_name, geoid, UNKNOWN_JURISDICTION};
use crate::model::*;

pub fn leverage_score(verified_supporters: u64, level: OfficeLevel, urgency: Urgency) -> f64 {
    verified_supporters as f64 * level.leverage_multiplier() * urgency.leverage_weight()
}

/// The key under which two exposures count as the same contest.
///
/// The same office in the same year is one contest, whatever the number of
/// ballot items carrying it. Items without an office are keyed by their id.
pub fn exposure_dedup_key(office_name: Option<&str>, election_date: &str, ballot_item_id: &str) -> String {
    let year = dates::parse_date(election_date).map(|d| d.year());
    match (office_name.map(|o| o.trim()).filter(|o| !o.is_empty()), year) {
        (Some(office), Some(year)) => format!("{}-{}", office, year),
        _ => ballot_item_id.to_string(),
    }
}

/// The dedup key of an exposure built from an external election.
pub fn api_dedup_key(election: &UpcomingElection) -> String {
    let year = dates::parse_date(&election.election_day)
        .map(|d| d.year().to_string())
        .unwrap_or_default();
    let name = election
        .office
        .as_ref()
        .map(|o| o.name.as_str())
        .filter(|n| !n.trim().is_empty())
        .unwrap_or(election.id.as_str());
    format!("api-{}-{}", name, year)
}

/// Office level of a jurisdiction when no office record says otherwise.
pub fn infer_office_level(j: &Jurisdiction) -> OfficeLevel {
    let ocdid = j.ocdid.as_deref().unwrap_or("");
    let labels = [j.name.as_deref(), j.jurisdiction_type.as_deref(), j.level.as_deref()];
    let congressional = labels
        .iter()
        .flatten()
        .any(|l| l.to_lowercase().contains("congressional"));
    if congressional || ocdid.contains("/cd:") {
        OfficeLevel::Federal
    } else if geoid(j).map(|g| g.len() == 2).unwrap_or(false) || ocdid.contains("/state:") {
        OfficeLevel::State
    } else {
        OfficeLevel::Local
    }
}

fn mentions_primary(label: Option<&str>) -> bool {
    label
        .map(|l| l.to_lowercase().contains("primary"))
        .unwrap_or(false)
}

// Supporter verifications reaching each jurisdiction: (any status, verified).
fn supporters_by_jurisdiction<'a>(
    idx: &SnapshotIndex<'a>,
    ctx: &MetricsContext,
) -> HashMap<&'a str, (u64, u64)> {
    let fp = idx.footprint(&ctx.main_group_id, None);
    let mut res: HashMap<&'a str, (u64, u64)> = HashMap::new();
    for vid in fp.verification_ids.iter() {
        let verified = fp.verified_verification_ids.contains(vid);
        if let Some(js) = idx.jurisdictions_of_verification(vid) {
            for jid in js.iter() {
                let e = res.entry(*jid).or_insert((0, 0));
                e.0 += 1;
                if verified {
                    e.1 += 1;
                }
            }
        }
    }
    res
}

fn race_of_item<'a>(idx: &SnapshotIndex<'a>, item: &BallotItem) -> Option<&'a Race> {
    idx.race_of_ballot_item(&item.id).or_else(|| {
        idx.options_of_ballot_item(&item.id)
            .iter()
            .filter_map(|o| o.candidacy_id.as_deref())
            .filter_map(|cid| idx.candidacy(cid))
            .find_map(|c| idx.race(&c.race_id))
    })
}

fn candidate_roster(idx: &SnapshotIndex, item: &BallotItem, race: Option<&Race>) -> Vec<CandidateEntry> {
    let mut candidacies: Vec<&Candidacy> = Vec::new();
    if let Some(race) = race {
        candidacies.extend(idx.candidacies_of_race(&race.id).iter().copied());
    }
    for o in idx.options_of_ballot_item(&item.id) {
        if let Some(c) = o.candidacy_id.as_deref().and_then(|cid| idx.candidacy(cid)) {
            candidacies.push(c);
        }
    }

    let mut seen: HashSet<CandidateEntry> = HashSet::new();
    let mut roster: Vec<CandidateEntry> = Vec::new();
    for c in candidacies {
        let person = match idx.person(&c.person_id) {
            Some(p) => p,
            None => continue,
        };
        let name = person.full_name();
        if name.is_empty() {
            continue;
        }
        let party = c
            .party_id
            .as_deref()
            .or(person.party_id.as_deref())
            .and_then(|pid| idx.party(pid))
            .map(|p| {
                p.abbreviation
                    .clone()
                    .filter(|a| !a.trim().is_empty())
                    .unwrap_or_else(|| p.name.clone())
            });
        let entry = CandidateEntry { name, party };
        if seen.insert(entry.clone()) {
            roster.push(entry);
        }
    }
    roster
}

fn non_blank(s: Option<&str>) -> Option<String> {
    s.map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

// Builds the influence record of every upcoming item in the group's
// footprint, in snapshot order.
fn collect_influence(idx: &SnapshotIndex, ctx: &MetricsContext) -> Vec<BallotItemInfluence> {
    let reach = supporters_by_jurisdiction(idx, ctx);
    let mut res: Vec<BallotItemInfluence> = Vec::new();
    for item in idx.snapshot.ballot_items.iter() {
        let election = match idx.election(&item.election_id) {
            Some(e) => e,
            None => {
                debug!("collect_influence: {}: missing election {}", item.id, item.election_id);
                continue;
            }
        };
        let date: NaiveDate = match dates::parse_date(&election.poll_date) {
            Some(d) => d,
            None => {
                debug!("collect_influence: {}: unreadable poll date {:?}", item.id, election.poll_date);
                continue;
            }
        };
        let days_until = dates::days_until(date, ctx.now);
        if days_until < 0 {
            continue;
        }
        let jurisdiction_id = match item.jurisdiction_id.as_deref().filter(|j| !j.is_empty()) {
            Some(j) => j,
            None => continue,
        };
        let (supporters, verified_supporters) = reach.get(jurisdiction_id).copied().unwrap_or((0, 0));
        if supporters == 0 {
            continue;
        }

        let race = race_of_item(idx, item);
        let is_primary = race.and_then(|r| r.is_primary).unwrap_or(false);
        if ctx.rules.primary_elections_only && !(is_primary || mentions_primary(Some(election.name.as_str()))) {
            continue;
        }
        let office = race.and_then(|r| idx.office_of_race(r));
        let measure = idx
            .measure_of_ballot_item(&item.id)
            .or_else(|| item.measure_id.as_deref().and_then(|m| idx.measure(m)));
        let candidates = candidate_roster(idx, item, race);

        let item_type = match item.item_type.as_deref().map(|t| t.to_lowercase()) {
            Some(t) if t == "race" => BallotItemType::Race,
            Some(t) if t == "measure" => BallotItemType::Measure,
            _ if measure.is_some() || (race.is_none() && candidates.is_empty()) => BallotItemType::Measure,
            _ => BallotItemType::Race,
        };

        let jurisdiction = idx.jurisdiction(jurisdiction_id);
        let jurisdiction_name = jurisdiction
            .and_then(display_name)
            .unwrap_or_else(|| UNKNOWN_JURISDICTION.to_string());
        let office_level = office
            .and_then(|o| o.level.as_deref())
            .and_then(OfficeLevel::from_label)
            .or_else(|| jurisdiction.map(infer_office_level))
            .unwrap_or(OfficeLevel::Local);
        let office_name = office.and_then(|o| non_blank(Some(o.name.as_str())));
        let target = measure
            .and_then(|m| m.influence_target_id.as_deref())
            .and_then(|t| idx.influence_target(t));

        let title = office_name
            .clone()
            .or_else(|| measure.and_then(|m| non_blank(m.title.as_deref())))
            .or_else(|| measure.and_then(|m| non_blank(m.name.as_deref())))
            .or_else(|| non_blank(item.title.as_deref()))
            .or_else(|| target.and_then(|t| non_blank(t.description.as_deref())))
            .or_else(|| target.and_then(|t| non_blank(t.name.as_deref())))
            .unwrap_or_else(|| match item_type {
                BallotItemType::Measure => format!("Measure in {}", jurisdiction_name),
                BallotItemType::Race => format!("Ballot item in {}", jurisdiction_name),
            });

        let urgency = Urgency::from_days_until(days_until);
        let candidate_count = candidates.len() as u32;
        res.push(BallotItemInfluence {
            id: item.id.clone(),
            title,
            item_type,
            election_id: election.id.clone(),
            election_name: election.name.clone(),
            election_date: dates::format_date(date),
            jurisdiction: jurisdiction_name,
            jurisdiction_id: jurisdiction_id.to_string(),
            state: jurisdiction.and_then(|j| non_blank(j.state.as_deref())),
            supporters,
            verified_supporters,
            urgency,
            days_until,
            office_level,
            office_name,
            candidate_count,
            candidates,
            measure_summary: measure.and_then(|m| {
                non_blank(m.summary.as_deref()).or_else(|| non_blank(m.description.as_deref()))
            }),
            measure_pro_snippet: measure.and_then(|m| non_blank(m.pro_snippet.as_deref())),
            measure_con_snippet: measure.and_then(|m| non_blank(m.con_snippet.as_deref())),
            num_winners: item.num_winners,
            num_selections_max: item.num_selections_max,
            is_ranked_choice: item.is_ranked_choice.unwrap_or(false),
            is_primary,
            is_runoff: race.and_then(|r| r.is_runoff).unwrap_or(false),
            is_recall: race.and_then(|r| r.is_recall).unwrap_or(false),
            leverage_score: leverage_score(verified_supporters, office_level, urgency),
            leverage_level: LeverageLevel::classify(verified_supporters, candidate_count),
        });
    }
    res
}

/// Every upcoming ballot item the group's supporters can vote on, with the
/// details of the contest.
///
/// Sorted by election date, then by reach.
pub fn compute_ballot_item_influence(idx: &SnapshotIndex, ctx: &MetricsContext) -> Vec<BallotItemInfluence> {
    let mut items = collect_influence(idx, ctx);
    items.sort_by(|a, b| {
        a.election_date
            .cmp(&b.election_date)
            .then_with(|| b.supporters.cmp(&a.supporters))
            .then_with(|| b.verified_supporters.cmp(&a.verified_supporters))
            .then_with(|| a.id.cmp(&b.id))
    });
    debug!("compute_ballot_item_influence: {} items", items.len());
    items
}

fn exposure_of(item: &BallotItemInfluence) -> BallotExposure {
    BallotExposure {
        ballot_item: BallotItemSummary {
            id: item.id.clone(),
            title: item.title.clone(),
            item_type: item.item_type,
            election_date: item.election_date.clone(),
            office_level: Some(item.office_level),
            office_name: item.office_name.clone(),
            candidate_count: match item.item_type {
                BallotItemType::Race => Some(item.candidate_count),
                BallotItemType::Measure => None,
            },
        },
        verified_supporters: item.verified_supporters,
        potential_supporters: Some(item.supporters),
        urgency: item.urgency,
        leverage_score: item.leverage_score,
        leverage_level: Some(item.leverage_level),
        jurisdiction: Some(item.jurisdiction.clone()),
        jurisdiction_id: Some(item.jurisdiction_id.clone()),
        supporter_count_source: SupporterCountSource::Exact,
    }
}

/// Exposures for elections from an external feed.
///
/// The feed has no jurisdiction linkage, so the verified supporters are
/// estimated as a fixed share of all verified voters.
pub fn api_exposures(
    elections: &[UpcomingElection],
    total_verified_voters: u64,
    ctx: &MetricsContext,
) -> Vec<(String, BallotExposure)> {
    let estimated =
        (total_verified_voters as f64 * ctx.rules.api_supporter_estimate_ratio).floor() as u64;
    if estimated == 0 {
        return Vec::new();
    }
    let current_year = ctx.now.year();
    let mut res: Vec<(String, BallotExposure)> = Vec::new();
    for e in elections.iter() {
        let date = match dates::parse_date(&e.election_day) {
            Some(d) => d,
            None => continue,
        };
        let days_until = dates::days_until(date, ctx.now);
        if days_until < 0 {
            continue;
        }
        if ctx.rules.primary_elections_only && !mentions_primary(e.election_type.as_deref()) {
            continue;
        }
        let office_level = e
            .office
            .as_ref()
            .and_then(|o| o.level.as_deref())
            .and_then(OfficeLevel::from_label)
            .unwrap_or(OfficeLevel::Local);
        let office_name = e
            .office
            .as_ref()
            .and_then(|o| non_blank(Some(o.name.as_str())))
            .unwrap_or_else(|| "Election".to_string());
        let title = if date.year() != current_year {
            format!("{} ({})", office_name, date.year())
        } else {
            office_name
        };
        let item_type = if mentions_measure(e.election_type.as_deref()) {
            BallotItemType::Measure
        } else {
            BallotItemType::Race
        };
        let urgency = Urgency::from_days_until(days_until);
        let exposure = BallotExposure {
            ballot_item: BallotItemSummary {
                id: e.id.clone(),
                title: title.clone(),
                item_type,
                election_date: dates::format_date(date),
                office_level: Some(office_level),
                office_name: Some(title),
                candidate_count: Some(e.candidate_count),
            },
            verified_supporters: estimated,
            potential_supporters: None,
            urgency,
            leverage_score: leverage_score(estimated, office_level, urgency),
            leverage_level: Some(LeverageLevel::classify(estimated, e.candidate_count)),
            jurisdiction: None,
            jurisdiction_id: None,
            supporter_count_source: SupporterCountSource::Estimated,
        };
        res.push((api_dedup_key(e), exposure));
    }
    res
}

fn mentions_measure(label: Option<&str>) -> bool {
    label.map(|l| l.eq_ignore_ascii_case("measure")).unwrap_or(false)
}

/// Ranks the ballot items where the group's verified voters carry weight.
///
/// Items sharing an office and an election year are counted once, the first
/// in snapshot order winning. Elections from the external feed, when given,
/// are appended under their own keys.
pub fn compute_ballot_exposure(
    idx: &SnapshotIndex,
    ctx: &MetricsContext,
    upcoming: Option<&[UpcomingElection]>,
    total_verified_voters: u64,
) -> Vec<BallotExposure> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut res: Vec<BallotExposure> = Vec::new();
    for item in collect_influence(idx, ctx).iter() {
        let key = exposure_dedup_key(item.office_name.as_deref(), &item.election_date, &item.id);
        if seen.insert(key) {
            res.push(exposure_of(item));
        }
    }
    let static_count = res.len();
    if let Some(elections) = upcoming {
        for (key, exposure) in api_exposures(elections, total_verified_voters, ctx) {
            if seen.insert(key) {
                res.push(exposure);
            }
        }
    }
    res.sort_by(|a, b| {
        a.ballot_item
            .election_date
            .cmp(&b.ballot_item.election_date)
            .then_with(|| b.leverage_score.total_cmp(&a.leverage_score))
            .then_with(|| a.ballot_item.id.cmp(&b.ballot_item.id))
    });
    info!(
        "compute_ballot_exposure: {} exposures ({} from the snapshot)",
        res.len(),
        static_count
    );
    res
}
