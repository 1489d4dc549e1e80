use log::{debug, info, warn};

use leader_influence::enhancement::Enhancements;
use leader_influence::jurisdictions::UNKNOWN_JURISDICTION;
use leader_influence::model::{Snapshot, ViewpointGroup};
use leader_influence::*;
use snafu::{prelude::*, Snafu};

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::dashboard::config_reader::*;
use crate::dashboard::data_loader::*;

pub mod config_reader;
pub mod data_loader;

#[derive(Debug, Snafu)]
pub enum DashboardError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON file {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error serializing the dashboard"))]
    SerializingJson { source: serde_json::Error },
    #[snafu(display("Error writing the dashboard to {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Cannot read the date {date}"))]
    InvalidDate { date: String },
    #[snafu(display("The dashboard differs from the reference {path}"))]
    ReferenceMismatch { path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type DashboardResult<T> = Result<T, DashboardError>;

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    #[serde(rename = "mainGroupId")]
    pub main_group_id: String,
    #[serde(rename = "verifiedVoters")]
    pub verified_voters: u64,
    #[serde(rename = "verificationRate")]
    pub verification_rate: f64,
    #[serde(rename = "connectedLeaders")]
    pub connected_leaders: u64,
    /// Number of titled groups.
    pub viewpoints: u64,
    pub topics: Vec<String>,
    #[serde(rename = "topicSupporterCounts")]
    pub topic_supporter_counts: BTreeMap<String, u64>,
    #[serde(rename = "topicVerifiedVoterCounts")]
    pub topic_verified_voter_counts: BTreeMap<String, u64>,
    #[serde(rename = "topicMetrics")]
    pub topic_metrics: BTreeMap<String, TopicMetrics>,
    #[serde(rename = "growthRate")]
    pub growth_rate: f64,
    pub reach: u64,
    pub jurisdictions: Vec<String>,
    #[serde(rename = "lastUpdated")]
    pub last_updated: String,
    #[serde(rename = "snapshotDigest")]
    pub snapshot_digest: String,
}

/// The full output of a run: a summary block followed by all the metrics.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DashboardModel {
    pub summary: DashboardSummary,
    #[serde(flatten)]
    pub metrics: CoreMetrics,
    #[serde(rename = "viewpointGroups")]
    pub viewpoint_groups: Vec<ViewpointGroup>,
}

/// Computes the metrics and assembles the dashboard. Does not touch the file system.
pub fn build_dashboard(snapshot: &Snapshot, ctx: &MetricsContext, enhancements: &Enhancements) -> DashboardModel {
    let metrics = compute_metrics(snapshot, ctx, enhancements);

    let viewpoint_groups: Vec<ViewpointGroup> = snapshot
        .viewpoint_groups
        .iter()
        .filter(|g| g.topic_title().is_some())
        .cloned()
        .collect();
    let topics: Vec<String> = metrics.topic_breakdown.iter().map(|t| t.title.clone()).collect();
    let mut topic_supporter_counts: BTreeMap<String, u64> = BTreeMap::new();
    let mut topic_verified_voter_counts: BTreeMap<String, u64> = BTreeMap::new();
    let mut topic_metrics: BTreeMap<String, TopicMetrics> = BTreeMap::new();
    for t in metrics.topic_breakdown.iter() {
        topic_supporter_counts.insert(t.title.clone(), t.supporter_count);
        topic_verified_voter_counts.insert(t.title.clone(), t.verified_voter_count);
        topic_metrics.insert(t.title.clone(), t.clone());
    }
    let top = &metrics.jurisdictions.top_jurisdictions;

    let summary = DashboardSummary {
        main_group_id: ctx.main_group_id.clone(),
        verified_voters: metrics.verified_voters.current,
        verification_rate: metrics.verified_voters.verification_rate,
        connected_leaders: metrics.network_expansion.connected_leaders,
        viewpoints: topics.len() as u64,
        topics,
        topic_supporter_counts,
        topic_verified_voter_counts,
        topic_metrics,
        growth_rate: metrics.verified_voters.weekly_growth_rate.unwrap_or(0.0),
        reach: top.len() as u64,
        jurisdictions: top
            .iter()
            .filter(|j| j.name != UNKNOWN_JURISDICTION)
            .map(|j| j.name.clone())
            .collect(),
        last_updated: ctx.now.to_rfc3339(),
        snapshot_digest: snapshot.digest(),
    };
    debug!("build_dashboard: summary: {:?}", summary);
    DashboardModel {
        summary,
        metrics,
        viewpoint_groups,
    }
}

fn read_reference(path: &str) -> DashboardResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    serde_json::from_str(&contents).context(ParsingJsonSnafu { path })
}

/// Compares the pretty-printed dashboard with a reference file and prints the differences.
///
/// Both sides go through [JSValue] so that the key order does not matter.
pub fn check_reference(pretty_dashboard: &str, reference_path: &str) -> DashboardResult<()> {
    let reference = read_reference(reference_path)?;
    let pretty_reference = serde_json::to_string_pretty(&reference).context(SerializingJsonSnafu {})?;
    if pretty_reference != pretty_dashboard {
        warn!("Found differences with the reference dashboard");
        print_diff(pretty_reference.as_str(), pretty_dashboard, "\n");
        return ReferenceMismatchSnafu { path: reference_path }.fail();
    }
    info!("check_reference: dashboard matches {}", reference_path);
    Ok(())
}

fn write_output(pretty: &str, out: Option<&str>) -> DashboardResult<()> {
    match out {
        None | Some("") | Some("stdout") => {
            println!("{}", pretty);
            Ok(())
        }
        Some(path) => {
            info!("Writing dashboard to {}", path);
            fs::write(path, pretty).context(WritingOutputSnafu { path })
        }
    }
}

pub fn run_dashboard(args: &Args) -> DashboardResult<()> {
    let (config, config_dir) = match args.config.as_deref() {
        Some(p) => (read_config(p)?, Path::new(p).parent()),
        None => (DashboardConfig::default(), None),
    };
    let settings = resolve_settings(args, &config, config_dir)?;
    info!("settings: {:?}", settings);

    let snapshot = load_snapshot(&settings.data_dir)?;
    let enhancements = load_enhancements(
        settings.upcoming_elections.as_deref(),
        settings.peer_leaders.as_deref(),
        settings.benchmarks.as_deref(),
    );
    if snapshot.viewpoint_groups.iter().all(|g| g.id != settings.ctx.main_group_id) {
        warn!(
            "run_dashboard: main group {} is not in the snapshot",
            settings.ctx.main_group_id
        );
    }

    let dashboard = build_dashboard(&snapshot, &settings.ctx, &enhancements);
    let js = serde_json::to_value(&dashboard).context(SerializingJsonSnafu {})?;
    let pretty = serde_json::to_string_pretty(&js).context(SerializingJsonSnafu {})?;
    write_output(&pretty, settings.out.as_deref())?;

    if let Some(reference) = settings.reference.as_deref() {
        check_reference(&pretty, reference)?;
    }
    Ok(())
}
