use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use std::fs;
use std::path::{Path, PathBuf};

use leader_influence::dates;
use leader_influence::*;

use crate::args::Args;
use crate::dashboard::*;

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesConfig {
    #[serde(rename = "topJurisdictions")]
    pub top_jurisdictions: Option<usize>,
    #[serde(rename = "topicTopJurisdictions")]
    pub topic_top_jurisdictions: Option<usize>,
    #[serde(rename = "maxInsights")]
    pub max_insights: Option<usize>,
    #[serde(rename = "apiSupporterEstimateRatio")]
    pub api_supporter_estimate_ratio: Option<f64>,
    #[serde(rename = "primaryElectionsOnly")]
    pub primary_elections_only: Option<bool>,
}

impl RulesConfig {
    pub fn to_rules(&self) -> DashboardResult<InfluenceRules> {
        let d = InfluenceRules::DEFAULT_RULES;
        let ratio = self
            .api_supporter_estimate_ratio
            .unwrap_or(d.api_supporter_estimate_ratio);
        if !(0.0..=1.0).contains(&ratio) {
            whatever!("apiSupporterEstimateRatio must be between 0 and 1, got {}", ratio)
        }
        let max_insights = self.max_insights.unwrap_or(d.max_insights);
        if !(1..=InfluenceRules::MAX_INSIGHTS).contains(&max_insights) {
            whatever!(
                "maxInsights must be between 1 and {}, got {}",
                InfluenceRules::MAX_INSIGHTS,
                max_insights
            )
        }
        Ok(InfluenceRules {
            top_jurisdictions: self.top_jurisdictions.unwrap_or(d.top_jurisdictions),
            topic_top_jurisdictions: self
                .topic_top_jurisdictions
                .unwrap_or(d.topic_top_jurisdictions),
            max_insights,
            api_supporter_estimate_ratio: ratio,
            primary_elections_only: self
                .primary_elections_only
                .unwrap_or(d.primary_elections_only),
        })
    }
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(rename = "mainGroupId")]
    pub main_group_id: Option<String>,
    #[serde(rename = "dataDirectory")]
    pub data_directory: Option<String>,
    pub today: Option<String>,
    pub output: Option<String>,
    #[serde(rename = "upcomingElections")]
    pub upcoming_elections: Option<String>,
    #[serde(rename = "peerLeaders")]
    pub peer_leaders: Option<String>,
    pub benchmarks: Option<String>,
    pub rules: Option<RulesConfig>,
}

pub fn read_config(path: &str) -> DashboardResult<DashboardConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: DashboardConfig =
        serde_json::from_str(&contents).context(ParsingJsonSnafu { path })?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

/// Everything a run needs, once the command line and the configuration file
/// have been merged.
#[derive(PartialEq, Debug, Clone)]
pub struct RunSettings {
    pub ctx: MetricsContext,
    pub data_dir: PathBuf,
    pub out: Option<String>,
    pub reference: Option<String>,
    pub upcoming_elections: Option<PathBuf>,
    pub peer_leaders: Option<PathBuf>,
    pub benchmarks: Option<PathBuf>,
}

fn relative_to(root: Option<&Path>, p: &str) -> PathBuf {
    match root {
        Some(r) if Path::new(p).is_relative() => r.join(p),
        _ => PathBuf::from(p),
    }
}

pub fn parse_now(today: Option<&str>) -> DashboardResult<DateTime<Utc>> {
    match today {
        None => Ok(Utc::now()),
        Some(s) => dates::parse_timestamp(s).context(InvalidDateSnafu { date: s }),
    }
}

/// Merges the command line with the optional configuration file.
///
/// Paths from the command line are kept as they are, paths from the file are
/// relative to `config_dir`.
pub fn resolve_settings(
    args: &Args,
    config: &DashboardConfig,
    config_dir: Option<&Path>,
) -> DashboardResult<RunSettings> {
    let from_file = |p: &Option<String>| p.as_deref().map(|s| relative_to(config_dir, s));
    let from_args = |p: &Option<String>| p.as_deref().map(PathBuf::from);

    let mut rules = config.rules.clone().unwrap_or_default().to_rules()?;
    if args.primary_only {
        rules.primary_elections_only = true;
    }
    let main_group_id = args
        .group
        .clone()
        .or_else(|| config.main_group_id.clone())
        .unwrap_or_else(|| DEFAULT_MAIN_GROUP_ID.to_string());
    let now = parse_now(args.today.as_deref().or(config.today.as_deref()))?;

    let data_dir = match from_args(&args.data).or_else(|| from_file(&config.data_directory)) {
        Some(d) => d,
        None => whatever!("No data directory: pass --data or set dataDirectory in the configuration"),
    };
    let out = args.out.clone().or_else(|| {
        config
            .output
            .as_deref()
            .map(|o| relative_to(config_dir, o).display().to_string())
    });

    Ok(RunSettings {
        ctx: MetricsContext::new(&main_group_id, now).with_rules(rules),
        data_dir,
        out,
        reference: args.reference.clone(),
        upcoming_elections: from_args(&args.upcoming_elections)
            .or_else(|| from_file(&config.upcoming_elections)),
        peer_leaders: from_args(&args.peer_leaders).or_else(|| from_file(&config.peer_leaders)),
        benchmarks: from_args(&args.benchmarks).or_else(|| from_file(&config.benchmarks)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn reads_camel_case_config() {
        let js = r#"{
            "mainGroupId": "g1",
            "dataDirectory": "data",
            "today": "2026-10-15",
            "benchmarks": "/feeds/benchmarks.json",
            "rules": {"maxInsights": 3, "primaryElectionsOnly": true}
        }"#;
        let config: DashboardConfig = serde_json::from_str(js).unwrap();
        let settings = resolve_settings(&Args::default(), &config, Some(Path::new("/etc/influence"))).unwrap();
        assert_eq!(settings.ctx.main_group_id, "g1");
        assert_eq!(settings.ctx.now, Utc.with_ymd_and_hms(2026, 10, 15, 0, 0, 0).unwrap());
        assert_eq!(settings.ctx.rules.max_insights, 3);
        assert!(settings.ctx.rules.primary_elections_only);
        assert_eq!(settings.ctx.rules.top_jurisdictions, 10);
        assert_eq!(settings.data_dir, PathBuf::from("/etc/influence/data"));
        assert_eq!(settings.benchmarks, Some(PathBuf::from("/feeds/benchmarks.json")));
        assert_eq!(settings.upcoming_elections, None);
    }

    #[test]
    fn command_line_wins() {
        let config = DashboardConfig {
            main_group_id: Some("from-file".to_string()),
            data_directory: Some("data".to_string()),
            ..DashboardConfig::default()
        };
        let args = Args {
            group: Some("from-args".to_string()),
            data: Some("other".to_string()),
            today: Some("2026-01-02T03:04:05Z".to_string()),
            primary_only: true,
            ..Args::default()
        };
        let settings = resolve_settings(&args, &config, Some(Path::new("/etc"))).unwrap();
        assert_eq!(settings.ctx.main_group_id, "from-args");
        assert_eq!(settings.data_dir, PathBuf::from("other"));
        assert_eq!(settings.ctx.now, Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap());
        assert!(settings.ctx.rules.primary_elections_only);
    }

    #[test]
    fn invalid_settings() {
        let args = Args {
            data: Some("data".to_string()),
            today: Some("next tuesday".to_string()),
            ..Args::default()
        };
        let res = resolve_settings(&args, &DashboardConfig::default(), None);
        assert!(matches!(res, Err(DashboardError::InvalidDate { .. })));

        assert!(resolve_settings(&Args::default(), &DashboardConfig::default(), None).is_err());

        let rules = RulesConfig {
            api_supporter_estimate_ratio: Some(1.5),
            ..RulesConfig::default()
        };
        assert!(rules.to_rules().is_err());
        assert_eq!(RulesConfig::default().to_rules().unwrap(), InfluenceRules::DEFAULT_RULES);
    }

    #[test]
    fn max_insights_bounds() {
        for bad in [0, 6, 300] {
            let rules = RulesConfig {
                max_insights: Some(bad),
                ..RulesConfig::default()
            };
            assert!(rules.to_rules().is_err(), "maxInsights {} accepted", bad);
        }
        for good in [1, 5] {
            let rules = RulesConfig {
                max_insights: Some(good),
                ..RulesConfig::default()
            };
            assert_eq!(rules.to_rules().unwrap().max_insights, good);
        }

        let js = r#"{"dataDirectory": "data", "rules": {"maxInsights": 12}}"#;
        let config: DashboardConfig = serde_json::from_str(js).unwrap();
        let res = resolve_settings(&Args::default(), &config, None);
        assert!(matches!(res, Err(DashboardError::Whatever { .. })));
    }
}
