// ********* Enhancement inputs ***********
//
// Optional feeds from outside the snapshot. They arrive untyped and are
// narrowed entry by entry: a bad entry is dropped, never the whole feed.

use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use std::error::Error;
use std::fmt::Display;

use crate::dates;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct UpcomingOffice {
    pub name: String,
    pub level: Option<String>,
}

/// An election known to an external feed, without jurisdiction linkage.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct UpcomingElection {
    pub id: String,
    #[serde(rename = "electionDay")]
    pub election_day: String,
    #[serde(rename = "type", default)]
    pub election_type: Option<String>,
    #[serde(default)]
    pub office: Option<UpcomingOffice>,
    #[serde(rename = "candidateCount", default)]
    pub candidate_count: u32,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PeerGroup {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "supporterCount", default)]
    pub supporter_count: u64,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PeerLeader {
    pub id: String,
    pub name: String,
    #[serde(rename = "totalSupporters", default)]
    pub total_supporters: u64,
    #[serde(default)]
    pub groups: Vec<PeerGroup>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkSample {
    #[serde(rename = "growthRate")]
    pub growth_rate: f64,
}

/// The enhancement feeds available for one computation pass. Each is optional.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Enhancements {
    pub upcoming_elections: Option<Vec<UpcomingElection>>,
    pub peer_leaders: Option<Vec<PeerLeader>>,
    pub benchmarks: Option<Vec<BenchmarkSample>>,
}

/// Errors found while narrowing an enhancement payload.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum EnhancementError {
    NotAnArray {
        feed: &'static str,
    },
    InvalidEntry {
        feed: &'static str,
        index: usize,
        reason: String,
    },
}

impl Error for EnhancementError {}

impl Display for EnhancementError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnhancementError::NotAnArray { feed } => {
                write!(f, "{} payload is not an array", feed)
            }
            EnhancementError::InvalidEntry {
                feed,
                index,
                reason,
            } => write!(f, "{} entry {} is invalid: {}", feed, index, reason),
        }
    }
}

fn narrow_entry<T: DeserializeOwned>(
    feed: &'static str,
    index: usize,
    entry: &Value,
) -> Result<T, EnhancementError> {
    T::deserialize(entry).map_err(|e| EnhancementError::InvalidEntry {
        feed,
        index,
        reason: e.to_string(),
    })
}

fn narrow_entries<T, F>(
    feed: &'static str,
    payload: &Value,
    check: F,
) -> Result<Vec<T>, EnhancementError>
where
    T: DeserializeOwned,
    F: Fn(&T) -> Result<(), String>,
{
    let entries = payload
        .as_array()
        .ok_or(EnhancementError::NotAnArray { feed })?;
    let mut res: Vec<T> = Vec::new();
    for (index, entry) in entries.iter().enumerate() {
        let narrowed = narrow_entry::<T>(feed, index, entry).and_then(|t| {
            check(&t)
                .map(|_| t)
                .map_err(|reason| EnhancementError::InvalidEntry {
                    feed,
                    index,
                    reason,
                })
        });
        match narrowed {
            Ok(t) => res.push(t),
            Err(e) => warn!("narrow_entries: dropping entry: {}", e),
        }
    }
    Ok(res)
}

/// Keeps the elections with an id and a readable election day.
pub fn narrow_upcoming_elections(
    payload: &Value,
) -> Result<Vec<UpcomingElection>, EnhancementError> {
    narrow_entries("upcomingElections", payload, |e: &UpcomingElection| {
        if e.id.trim().is_empty() {
            return Err("empty id".to_string());
        }
        match dates::parse_date(&e.election_day) {
            Some(_) => Ok(()),
            None => Err(format!("unreadable election day {:?}", e.election_day)),
        }
    })
}

pub fn narrow_peer_leaders(payload: &Value) -> Result<Vec<PeerLeader>, EnhancementError> {
    narrow_entries("peerLeaders", payload, |l: &PeerLeader| {
        if l.id.trim().is_empty() {
            Err("empty id".to_string())
        } else {
            Ok(())
        }
    })
}

/// Benchmarks come either as objects with a `growthRate` or as bare numbers.
pub fn narrow_benchmarks(payload: &Value) -> Result<Vec<BenchmarkSample>, EnhancementError> {
    let normalized: Value = match payload.as_array() {
        Some(entries) => Value::Array(
            entries
                .iter()
                .map(|e| match e.as_f64() {
                    Some(rate) => serde_json::json!({ "growthRate": rate }),
                    None => e.clone(),
                })
                .collect(),
        ),
        None => return Err(EnhancementError::NotAnArray { feed: "benchmarks" }),
    };
    narrow_entries("benchmarks", &normalized, |b: &BenchmarkSample| {
        if b.growth_rate.is_finite() {
            Ok(())
        } else {
            Err("growth rate is not finite".to_string())
        }
    })
}
