use log::debug;

use std::collections::BTreeMap;

use crate::config::*;
use crate::index::SnapshotIndex;
use crate::model::Jurisdiction;

pub const UNKNOWN_JURISDICTION: &str = "Unknown jurisdiction";

fn usable_name(s: Option<&str>, id: &str) -> Option<String> {
    let s = s?.trim();
    if s.is_empty() || s == id || s.chars().all(|c| c.is_ascii_digit()) {
        None
    } else {
        Some(s.to_string())
    }
}

pub fn geoid(j: &Jurisdiction) -> Option<&str> {
    j.geoid
        .as_deref()
        .or(j.geo_id.as_deref())
        .map(|g| g.trim())
        .filter(|g| !g.is_empty())
}

pub fn is_state_level(j: &Jurisdiction) -> bool {
    let typed_state = j
        .jurisdiction_type
        .as_deref()
        .map(|t| t.eq_ignore_ascii_case("state"))
        .unwrap_or(false);
    typed_state || geoid(j).map(|g| g.len() == 2).unwrap_or(false)
}

/// The human-readable name of a jurisdiction.
///
/// Prefers the estimated name, then the name. Geocodes and ids are never
/// returned; a state-level jurisdiction without a name falls back to its state.
pub fn display_name(j: &Jurisdiction) -> Option<String> {
    usable_name(j.estimated_name.as_deref(), &j.id)
        .or_else(|| usable_name(j.name.as_deref(), &j.id))
        .or_else(|| {
            if is_state_level(j) {
                usable_name(j.state.as_deref(), &j.id)
            } else {
                None
            }
        })
}

/// The display name, suffixed with the state when it does not already mention it.
pub fn qualified_name(j: &Jurisdiction) -> Option<String> {
    let name = display_name(j)?;
    match j.state.as_deref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        Some(state) if !name.contains(state) => Some(format!("{}, {}", name, state)),
        _ => Some(name),
    }
}

pub fn classify(j: &Jurisdiction, name: &str) -> JurisdictionKind {
    if is_state_level(j) {
        return JurisdictionKind::State;
    }
    let lower = name.to_lowercase();
    if lower.contains("county") {
        JurisdictionKind::County
    } else if lower.contains("city") {
        JurisdictionKind::City
    } else if lower.contains("district") || j.state.is_some() {
        JurisdictionKind::District
    } else {
        JurisdictionKind::Unknown
    }
}

/// Sum of the squared shares of each count. 0 for no counts.
pub fn herfindahl_index(counts: &[u64]) -> f64 {
    let total: u64 = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    counts
        .iter()
        .map(|c| {
            let share = *c as f64 / total as f64;
            share * share
        })
        .sum()
}

pub fn interpret_concentration(hhi: f64) -> &'static str {
    if hhi > 0.5 {
        "Very High"
    } else if hhi > 0.25 {
        "High"
    } else if hhi > 0.15 {
        "Medium"
    } else {
        "Low"
    }
}

#[derive(Default)]
struct Tally {
    verified: u64,
    supporters: u64,
}

pub fn compute_jurisdiction_concentration(
    idx: &SnapshotIndex,
    ctx: &MetricsContext,
) -> JurisdictionConcentration {
    let fp = idx.footprint(&ctx.main_group_id, None);
    let total_verified = fp.verified_verification_ids.len() as u64;

    let mut tallies: BTreeMap<&str, Tally> = BTreeMap::new();
    for vid in fp.verification_ids.iter() {
        let verified = fp.verified_verification_ids.contains(vid);
        if let Some(js) = idx.jurisdictions_of_verification(vid) {
            for jid in js.iter() {
                let t = tallies.entry(*jid).or_default();
                t.supporters += 1;
                if verified {
                    t.verified += 1;
                }
            }
        }
    }
    tallies.retain(|_, t| t.verified > 0);

    let counts: Vec<u64> = tallies.values().map(|t| t.verified).collect();
    let concentration_index = herfindahl_index(&counts);

    let mut shares: Vec<JurisdictionShare> = tallies
        .iter()
        .map(|(jid, t)| {
            let j = idx.jurisdiction(jid);
            let name = j
                .and_then(display_name)
                .unwrap_or_else(|| UNKNOWN_JURISDICTION.to_string());
            let kind = j
                .map(|j| classify(j, &name))
                .unwrap_or(JurisdictionKind::Unknown);
            let percentage = if total_verified > 0 {
                t.verified as f64 / total_verified as f64 * 100.0
            } else {
                0.0
            };
            JurisdictionShare {
                id: jid.to_string(),
                name,
                kind,
                geoid: j.and_then(geoid).map(|g| g.to_string()),
                verified_count: t.verified,
                supporter_count: t.supporters,
                percentage,
                verification_rate: t.verified as f64 / t.supporters.max(1) as f64 * 100.0,
            }
        })
        .collect();
    shares.sort_by(|a, b| {
        b.verified_count
            .cmp(&a.verified_count)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });
    let total_jurisdictions = shares.len() as u64;
    shares.truncate(ctx.rules.top_jurisdictions);

    debug!(
        "compute_jurisdiction_concentration: {} jurisdictions, hhi {:.3} ({})",
        total_jurisdictions,
        concentration_index,
        interpret_concentration(concentration_index)
    );
    JurisdictionConcentration {
        top_jurisdictions: shares,
        concentration_index,
        total_jurisdictions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SnapshotBuilder;
    use chrono::{TimeZone, Utc};

    fn ctx() -> MetricsContext {
        MetricsContext::new("g", Utc.with_ymd_and_hms(2026, 10, 15, 0, 0, 0).unwrap())
    }

    fn juris(id: &str) -> Jurisdiction {
        Jurisdiction {
            id: id.to_string(),
            ..Jurisdiction::default()
        }
    }

    #[test]
    fn display_names_skip_codes() {
        let mut j = juris("j1");
        j.name = Some("0644000".to_string());
        assert_eq!(display_name(&j), None);
        j.estimated_name = Some("Los Angeles".to_string());
        assert_eq!(display_name(&j).as_deref(), Some("Los Angeles"));

        let mut s = juris("j2");
        s.geoid = Some("06".to_string());
        s.state = Some("CA".to_string());
        assert_eq!(display_name(&s).as_deref(), Some("CA"));
        assert_eq!(classify(&s, "CA"), JurisdictionKind::State);

        let mut d = juris("j3");
        d.state = Some("CA".to_string());
        assert_eq!(display_name(&d), None);
        assert_eq!(qualified_name(&d), None);
    }

    #[test]
    fn qualified_names_add_state_once() {
        let mut j = juris("j1");
        j.name = Some("Travis County".to_string());
        j.state = Some("TX".to_string());
        assert_eq!(qualified_name(&j).as_deref(), Some("Travis County, TX"));
        j.name = Some("Austin, TX".to_string());
        assert_eq!(qualified_name(&j).as_deref(), Some("Austin, TX"));
        assert_eq!(classify(&j, "Travis County"), JurisdictionKind::County);
        assert_eq!(classify(&juris("x"), "Springfield"), JurisdictionKind::Unknown);
    }

    #[test]
    fn hhi_bounds() {
        assert_eq!(herfindahl_index(&[]), 0.0);
        assert_eq!(herfindahl_index(&[40]), 1.0);
        assert!((herfindahl_index(&[5, 5, 5, 5]) - 0.25).abs() < 1e-12);
        assert_eq!(interpret_concentration(1.0), "Very High");
        assert_eq!(interpret_concentration(0.3), "High");
        assert_eq!(interpret_concentration(0.2), "Medium");
        assert_eq!(interpret_concentration(0.1), "Low");
    }

    #[test]
    fn single_jurisdiction_concentration() {
        let mut b = SnapshotBuilder::new()
            .group("g", "Main")
            .named_jurisdiction("j1", "Springfield City", Some("IL"));
        for i in 0..100 {
            let p = format!("p{}", i);
            b = b.supporter("g", &p, "");
            if i < 40 {
                b = b.verified_in(&p, &["j1"], "");
            } else if i < 50 {
                b = b.unverified_in(&p, &["j1"]);
            }
        }
        let snapshot = b.build();
        let idx = SnapshotIndex::new(&snapshot);
        let c = compute_jurisdiction_concentration(&idx, &ctx());
        assert_eq!(c.concentration_index, 1.0);
        assert_eq!(c.total_jurisdictions, 1);
        let top = &c.top_jurisdictions[0];
        assert_eq!(top.name, "Springfield City");
        assert_eq!(top.kind, JurisdictionKind::City);
        assert_eq!(top.verified_count, 40);
        assert_eq!(top.supporter_count, 50);
        assert_eq!(top.percentage, 100.0);
        assert_eq!(top.verification_rate, 80.0);
    }

    #[test]
    fn nested_jurisdictions_keep_index_bounded() {
        let snapshot = SnapshotBuilder::new()
            .supporter("g", "a", "")
            .verified_in("a", &["state", "county"], "")
            .supporter("g", "b", "")
            .verified_in("b", &["state", "city"], "")
            .build();
        let idx = SnapshotIndex::new(&snapshot);
        let c = compute_jurisdiction_concentration(&idx, &ctx());
        assert!(c.concentration_index >= 0.0 && c.concentration_index <= 1.0);
        assert_eq!(c.total_jurisdictions, 3);
        // counts 2, 1, 1 over 4.
        assert!((c.concentration_index - 0.375).abs() < 1e-12);
        assert_eq!(c.top_jurisdictions[0].id, "state");
        assert_eq!(c.top_jurisdictions[0].name, UNKNOWN_JURISDICTION);
        assert_eq!(c.top_jurisdictions[0].percentage, 100.0);
    }

    #[test]
    fn top_list_is_truncated() {
        let mut b = SnapshotBuilder::new();
        for i in 0..12 {
            let p = format!("p{}", i);
            let j = format!("j{:02}", i);
            b = b.supporter("g", &p, "").verified_in(&p, &[j.as_str()], "");
        }
        let snapshot = b.build();
        let idx = SnapshotIndex::new(&snapshot);
        let c = compute_jurisdiction_concentration(&idx, &ctx());
        assert_eq!(c.total_jurisdictions, 12);
        assert_eq!(c.top_jurisdictions.len(), 10);
        assert_eq!(c.top_jurisdictions[0].id, "j00");
        assert!((c.concentration_index - 1.0 / 12.0).abs() < 1e-12);
    }
}
