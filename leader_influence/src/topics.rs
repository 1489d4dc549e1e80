use log::debug;

use std::collections::{BTreeMap, BTreeSet};

use crate::config::*;
use crate::dates;
use crate::engagement::recent_joiners;
use crate::index::SnapshotIndex;
use crate::jurisdictions::qualified_name;
use crate::model::{RelType, ViewpointGroup};

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "is",
    "are", "was", "were", "be", "been", "being", "have", "has", "had", "do", "does", "did", "will",
    "would", "should", "could", "may", "might", "must", "can", "this", "that", "these", "those",
    "i", "you", "he", "she", "it", "we", "they", "what", "which", "who", "when", "where", "why",
    "how",
];

const STATE_CODES: &[&str] = &[
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "DC", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
    "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ", "NM",
    "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT", "VA", "WA",
    "WV", "WI", "WY",
];

// City shorthands and what they stand for.
const CITY_ALIASES: &[(&str, &[&str])] = &[
    ("SF", &["san francisco", "CA"]),
    ("NYC", &["new york", "NY"]),
    ("LA", &["los angeles", "CA"]),
    ("DC", &["washington", "DC"]),
];

pub fn compute_topic_breakdown(idx: &SnapshotIndex, ctx: &MetricsContext) -> Vec<TopicMetrics> {
    let mut res: Vec<TopicMetrics> = Vec::new();
    for group in idx.snapshot.viewpoint_groups.iter() {
        let title = match group.topic_title() {
            Some(t) => t,
            None => continue,
        };
        let supporters = idx.footprint(&group.id, Some(RelType::Supporter));
        let leaders = idx.footprint(&group.id, Some(RelType::Leader));
        let joiners = recent_joiners(idx, &group.id, RelType::Supporter, ctx);

        // Jurisdiction -> verified supporters placed in it.
        let mut reach: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for person_id in supporters.verified_person_ids.iter() {
            for v in idx.verifications_of_person(person_id) {
                if !v.is_fully_verified {
                    continue;
                }
                if let Some(js) = idx.jurisdictions_of_verification(&v.id) {
                    for jid in js.iter() {
                        reach.entry(*jid).or_default().insert(*person_id);
                    }
                }
            }
        }
        let mut top: Vec<TopicJurisdiction> = reach
            .iter()
            .filter_map(|(jid, persons)| {
                let name = idx.jurisdiction(jid).and_then(qualified_name)?;
                Some(TopicJurisdiction {
                    id: jid.to_string(),
                    name,
                    verified_count: persons.len() as u64,
                })
            })
            .collect();
        top.sort_by(|a, b| {
            b.verified_count
                .cmp(&a.verified_count)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });
        top.truncate(ctx.rules.topic_top_jurisdictions);

        res.push(TopicMetrics {
            group_id: group.id.clone(),
            title: title.to_string(),
            supporter_count: supporters.profile_ids.len() as u64,
            verified_voter_count: supporters.verified_person_ids.len() as u64,
            leader_count: leaders.profile_ids.len() as u64,
            recent_joiners_30d: joiners.last_30_days,
            recent_joiners_90d: joiners.last_90_days,
            top_jurisdictions: top,
            created_date: group
                .created_at
                .as_deref()
                .and_then(dates::parse_date)
                .map(dates::format_date),
            updated_date: group
                .updated_at
                .as_deref()
                .and_then(dates::parse_date)
                .map(dates::format_date),
        });
    }
    debug!("compute_topic_breakdown: {} topics", res.len());
    res
}

fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|w| w.chars().count() > 2)
        .map(|w| w.to_string())
        .collect()
}

fn keywords(text: &str) -> BTreeSet<String> {
    words(text)
        .into_iter()
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

fn phrases(text: &str) -> Vec<String> {
    let ws = words(text);
    let mut res: Vec<String> = Vec::new();
    for i in 0..ws.len().saturating_sub(1) {
        res.push(format!("{} {}", ws[i], ws[i + 1]));
        if i + 2 < ws.len() {
            res.push(format!("{} {} {}", ws[i], ws[i + 1], ws[i + 2]));
        }
    }
    res.retain(|p| p.len() > 5);
    res
}

/// Places a text names: upper-case state codes and a few city shorthands.
///
/// Only upper-case codes count, so that words like "in" or "or" are not
/// taken for Indiana or Oregon.
pub fn location_keywords(text: &str) -> BTreeSet<String> {
    let mut res: BTreeSet<String> = BTreeSet::new();
    for token in text.split(|c: char| !c.is_alphanumeric()) {
        if let Some((_, expands)) = CITY_ALIASES.iter().find(|(alias, _)| *alias == token) {
            res.insert(token.to_lowercase());
            res.extend(expands.iter().map(|e| e.to_lowercase()));
        } else if STATE_CODES.contains(&token) {
            res.insert(token.to_lowercase());
        }
    }
    res
}

fn matches_geography(locations: &BTreeSet<String>, item: &BallotItemInfluence) -> bool {
    if locations.is_empty() {
        return true;
    }
    let state = item.state.as_deref().unwrap_or("").to_lowercase();
    let jurisdiction_words: BTreeSet<String> = item
        .jurisdiction
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .map(|w| w.to_string())
        .collect();
    let jurisdiction = item.jurisdiction.to_lowercase();
    locations.iter().any(|l| {
        *l == state
            || jurisdiction_words.contains(l)
            || (l.contains(' ') && jurisdiction.contains(l.as_str()))
    })
}

/// How much a ballot item is about a topic, between 0 and 1.
///
/// Topics naming a place only match items in that place.
pub fn topic_relevance(topic: &ViewpointGroup, item: &BallotItemInfluence) -> f64 {
    let title = topic.title.as_deref().unwrap_or("").trim().to_lowercase();
    let raw = format!(
        "{} {}",
        topic.title.as_deref().unwrap_or(""),
        topic.description.as_deref().unwrap_or("")
    );
    let topic_text = raw.trim().to_lowercase();
    if topic_text.is_empty() {
        return 0.0;
    }
    if !matches_geography(&location_keywords(&raw), item) {
        return 0.0;
    }

    let item_title = item.title.to_lowercase();
    let item_text = format!(
        "{} {} {} {}",
        item_title,
        item.office_name.as_deref().unwrap_or(""),
        item.measure_summary.as_deref().unwrap_or(""),
        item.jurisdiction
    )
    .to_lowercase();

    let topic_keywords = keywords(&topic_text);
    if topic_keywords.is_empty() {
        return 0.0;
    }
    let item_keywords = keywords(&item_text);
    let mut keyword_score: u32 = 0;
    for k in topic_keywords.iter() {
        if item_keywords.contains(k) {
            keyword_score += 2;
        } else if item_keywords
            .iter()
            .any(|ik| ik.contains(k.as_str()) || k.contains(ik.as_str()))
        {
            keyword_score += 1;
        }
    }
    let keyword_part = (keyword_score as f64 / (topic_keywords.len() * 2) as f64).min(1.0);

    let topic_phrases = phrases(&topic_text);
    let phrase_hits = topic_phrases
        .iter()
        .filter(|p| item_text.contains(p.as_str()))
        .count();
    let phrase_part = (phrase_hits as f64 / topic_phrases.len().max(1) as f64).min(1.0);

    let title_part = if title.is_empty() {
        0.0
    } else if item_title.contains(title.as_str()) {
        1.0
    } else {
        let title_words = keywords(&title);
        if title_words.is_empty() {
            0.0
        } else {
            let hits = title_words
                .iter()
                .filter(|w| item_title.contains(w.as_str()))
                .count();
            hits as f64 / title_words.len() as f64
        }
    };

    (title_part * 0.4 + phrase_part * 0.3 + keyword_part * 0.3).min(1.0)
}

fn urgency_rank(u: Urgency) -> f64 {
    match u {
        Urgency::High => 3.0,
        Urgency::Medium => 2.0,
        Urgency::Low => 1.0,
    }
}

/// Pairs topics with the ballot items they are relevant to, best first.
pub fn find_topic_opportunities(
    topics: &[ViewpointGroup],
    items: &[BallotItemInfluence],
) -> Vec<TopicOpportunity> {
    let mut res: Vec<TopicOpportunity> = Vec::new();
    for topic in topics.iter() {
        let title = match topic.topic_title() {
            Some(t) => t,
            None => continue,
        };
        for item in items.iter() {
            let relevance = topic_relevance(topic, item);
            if relevance < 0.1 {
                continue;
            }
            let supporter_part = (item.verified_supporters as f64 / 100.0).min(1.0);
            let opportunity =
                relevance * 0.5 + supporter_part * 0.3 + urgency_rank(item.urgency) / 3.0 * 0.2;
            res.push(TopicOpportunity {
                topic: title.to_string(),
                topic_id: topic.id.clone(),
                ballot_item_id: item.id.clone(),
                ballot_item_title: item.title.clone(),
                relevance_score: relevance,
                opportunity_score: opportunity,
            });
        }
    }
    res.sort_by(|a, b| {
        b.opportunity_score
            .total_cmp(&a.opportunity_score)
            .then_with(|| a.topic_id.cmp(&b.topic_id))
            .then_with(|| a.ballot_item_id.cmp(&b.ballot_item_id))
    });
    debug!("find_topic_opportunities: {} pairs", res.len());
    res
}
