// Reads the snapshot tables and the enhancement feeds from JSON files.

use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde_json::Value as JSValue;
use snafu::prelude::*;

use std::fs;
use std::path::Path;

use leader_influence::enhancement::*;
use leader_influence::model::Snapshot;

use crate::dashboard::*;

pub const TABLE_FILES: [&str; 17] = [
    "viewpoint_groups.json",
    "profiles.json",
    "persons.json",
    "profile_viewpoint_group_rels.json",
    "voter_verifications.json",
    "jurisdictions.json",
    "voter_verification_jurisdiction_rels.json",
    "elections.json",
    "ballot_items.json",
    "ballot_item_options.json",
    "races.json",
    "candidacies.json",
    "offices.json",
    "office_terms.json",
    "measures.json",
    "influence_targets.json",
    "parties.json",
];

/// Reads one table. A missing file is an empty table.
pub fn read_table<T: DeserializeOwned>(dir: &Path, file_name: &str) -> DashboardResult<Vec<T>> {
    let p = dir.join(file_name);
    let path = p.display().to_string();
    if !p.exists() {
        warn!("read_table: {} not found, using an empty table", path);
        return Ok(vec![]);
    }
    let contents = fs::read_to_string(&p).context(OpeningJsonSnafu { path: path.clone() })?;
    let records: Vec<T> = serde_json::from_str(&contents).context(ParsingJsonSnafu { path: path.clone() })?;
    debug!("read_table: {}: {} records", path, records.len());
    Ok(records)
}

pub fn load_snapshot(dir: &Path) -> DashboardResult<Snapshot> {
    info!("Reading snapshot tables from {:?}", dir);
    if !dir.is_dir() {
        whatever!("Data directory {} does not exist", dir.display())
    }
    let snapshot = Snapshot {
        viewpoint_groups: read_table(dir, TABLE_FILES[0])?,
        profiles: read_table(dir, TABLE_FILES[1])?,
        persons: read_table(dir, TABLE_FILES[2])?,
        profile_viewpoint_group_rels: read_table(dir, TABLE_FILES[3])?,
        voter_verifications: read_table(dir, TABLE_FILES[4])?,
        jurisdictions: read_table(dir, TABLE_FILES[5])?,
        voter_verification_jurisdiction_rels: read_table(dir, TABLE_FILES[6])?,
        elections: read_table(dir, TABLE_FILES[7])?,
        ballot_items: read_table(dir, TABLE_FILES[8])?,
        ballot_item_options: read_table(dir, TABLE_FILES[9])?,
        races: read_table(dir, TABLE_FILES[10])?,
        candidacies: read_table(dir, TABLE_FILES[11])?,
        offices: read_table(dir, TABLE_FILES[12])?,
        office_terms: read_table(dir, TABLE_FILES[13])?,
        measures: read_table(dir, TABLE_FILES[14])?,
        influence_targets: read_table(dir, TABLE_FILES[15])?,
        parties: read_table(dir, TABLE_FILES[16])?,
    };
    if snapshot.is_empty() {
        warn!("load_snapshot: no relationship, verification or ballot item in {:?}", dir);
    }
    Ok(snapshot)
}

fn read_feed(path: &Path) -> DashboardResult<JSValue> {
    let p = path.display().to_string();
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path: p.clone() })?;
    serde_json::from_str(&contents).context(ParsingJsonSnafu { path: p })
}

/// Reads and narrows an optional feed. Any failure leaves the feed out.
fn load_feed<T, F>(path: Option<&Path>, narrow: F) -> Option<Vec<T>>
where
    F: Fn(&JSValue) -> Result<Vec<T>, EnhancementError>,
{
    let path = path?;
    let payload = match read_feed(path) {
        Ok(js) => js,
        Err(e) => {
            warn!("load_feed: ignoring {:?}: {}", path, e);
            return None;
        }
    };
    match narrow(&payload) {
        Ok(entries) => {
            info!("load_feed: {} entries from {:?}", entries.len(), path);
            Some(entries)
        }
        Err(e) => {
            warn!("load_feed: ignoring {:?}: {}", path, e);
            None
        }
    }
}

pub fn load_enhancements(
    upcoming_elections: Option<&Path>,
    peer_leaders: Option<&Path>,
    benchmarks: Option<&Path>,
) -> Enhancements {
    Enhancements {
        upcoming_elections: load_feed(upcoming_elections, narrow_upcoming_elections),
        peer_leaders: load_feed(peer_leaders, narrow_peer_leaders),
        benchmarks: load_feed(benchmarks, narrow_benchmarks),
    }
}
