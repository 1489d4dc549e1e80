use log::debug;

use std::cmp::Reverse;
use std::collections::HashSet;

use crate::config::*;
use crate::dates;

const MOBILIZE: &str = "Publish a voter guide + mobilize supporters here";
const VERIFY: &str = "Run a targeted verification push";
const EXPAND: &str = "Expand into adjacent jurisdictions before you're fragile";
const RECRUIT: &str = "Recruit chapter leaders from engaged supporters";
const PREPARE: &str = "Research candidates and start building endorsement case.";

/// The metrics the recommendations are derived from.
#[derive(Debug, Clone, Copy)]
pub struct ActionInputs<'a> {
    pub verified_voters: &'a VerifiedVoterMetrics,
    pub jurisdictions: &'a JurisdictionConcentration,
    pub ballot_exposure: &'a [BallotExposure],
    pub network: &'a NetworkExpansion,
}

fn level_label(e: &BallotExposure) -> &'static str {
    e.ballot_item
        .office_level
        .map(|l| l.as_str())
        .unwrap_or("local")
}

fn leverage_label(level: Option<LeverageLevel>) -> &'static str {
    match level {
        Some(LeverageLevel::Kingmaker) => "kingmaker",
        Some(LeverageLevel::Significant) => "significant",
        Some(LeverageLevel::Marginal) | None => "marginal",
    }
}

fn focus_insight(e: &BallotExposure, days: i64) -> ActionableInsight {
    let urgent = days < 30;
    let description = if urgent {
        format!(
            "Election in {} days • {} verified supporters",
            days, e.verified_supporters
        )
    } else {
        let leverage = match e.leverage_level {
            Some(LeverageLevel::Kingmaker) => "Kingmaker leverage",
            Some(LeverageLevel::Significant) => "Significant leverage",
            _ => "",
        };
        format!("{} verified supporters • {}", e.verified_supporters, leverage)
            .trim_end_matches(&[' ', '•'][..])
            .to_string()
    };
    ActionableInsight {
        priority: 0,
        title: format!("Focus on {}", e.ballot_item.title),
        description,
        metric: format!(
            "Leverage Score: {} • {} level",
            e.leverage_score.round(),
            level_label(e)
        ),
        action: MOBILIZE.to_string(),
        impact: if urgent {
            ImpactLevel::High
        } else {
            ImpactLevel::Medium
        },
    }
}

/// Turns the metrics into at most a handful of prioritized recommendations.
///
/// The rules are evaluated in a fixed order; the same inputs always give the
/// same list.
pub fn derive_actions(inputs: &ActionInputs, ctx: &MetricsContext) -> Vec<ActionableInsight> {
    let max = ctx.rules.max_insights.min(InfluenceRules::MAX_INSIGHTS);
    let days_of = |e: &BallotExposure| -> i64 {
        dates::parse_date(&e.ballot_item.election_date)
            .map(|d| dates::days_until(d, ctx.now))
            .unwrap_or(-1)
    };

    // Best leverage first, one entry per title.
    let mut sorted: Vec<&BallotExposure> = inputs.ballot_exposure.iter().collect();
    sorted.sort_by(|a, b| b.leverage_score.total_cmp(&a.leverage_score));
    let mut seen_titles: HashSet<&str> = HashSet::new();
    let unique: Vec<&BallotExposure> = sorted
        .into_iter()
        .filter(|e| seen_titles.insert(e.ballot_item.title.as_str()))
        .collect();

    let mut insights: Vec<ActionableInsight> = Vec::new();

    // 1. Urgent or high-leverage contests.
    let high_impact = unique.iter().filter(|e| {
        let days = days_of(e);
        let strong = matches!(
            e.leverage_level,
            Some(LeverageLevel::Kingmaker) | Some(LeverageLevel::Significant)
        );
        (e.urgency == Urgency::High && e.verified_supporters >= 10)
            || (strong && e.verified_supporters >= 20 && days <= 90)
            || (e.verified_supporters >= 10 && days > 0 && days <= 180)
    });
    for e in high_impact.take(2) {
        insights.push(focus_insight(e, days_of(e)));
    }

    // 2. A strong jurisdiction with many unverified supporters.
    if let Some(j) = inputs.jurisdictions.top_jurisdictions.iter().take(5).find(|j| {
        j.verification_rate < 80.0 && j.verified_count >= 5 && j.percentage >= 5.0
    }) {
        insights.push(ActionableInsight {
            priority: 0,
            title: format!("Increase verification in {}", j.name),
            description: format!(
                "{}% verified • {} unverified supporters in high-concentration area",
                j.verification_rate.round(),
                j.supporter_count.saturating_sub(j.verified_count)
            ),
            metric: format!(
                "{} verified • {}% of your network",
                j.verified_count,
                j.percentage.round()
            ),
            action: VERIFY.to_string(),
            impact: if j.verification_rate < 60.0 {
                ImpactLevel::High
            } else {
                ImpactLevel::Medium
            },
        });
    }

    // 3. Concentration risk.
    let c = inputs.jurisdictions;
    if c.concentration_index > 0.5 && c.total_jurisdictions < 5 && inputs.verified_voters.current >= 10 {
        let percent = (c.concentration_index * 100.0).round();
        let (top_name, top_share) = c
            .top_jurisdictions
            .first()
            .map(|j| (j.name.as_str(), j.percentage.round()))
            .unwrap_or(("Primary location", 0.0));
        insights.push(ActionableInsight {
            priority: 0,
            title: "Expand geographic reach before you're fragile".to_string(),
            description: format!(
                "{}% concentration in {} jurisdictions • {} has {}%",
                percent, c.total_jurisdictions, top_name, top_share
            ),
            metric: format!(
                "Concentration Index: {}% • {} active jurisdictions",
                percent, c.total_jurisdictions
            ),
            action: EXPAND.to_string(),
            impact: if c.concentration_index > 0.7 {
                ImpactLevel::High
            } else {
                ImpactLevel::Medium
            },
        });
    }

    // 4. Few supporters organizing on their own.
    let n = inputs.network;
    let potential = n.potential_leaders.unwrap_or(0);
    if n.connected_leaders < 5 && potential >= 10 && inputs.verified_voters.current >= 20 {
        let ratio = if n.connected_leaders > 0 {
            potential as f64 / n.connected_leaders as f64
        } else {
            f64::INFINITY
        };
        insights.push(ActionableInsight {
            priority: 0,
            title: "Grow your network of allied organizers".to_string(),
            description: format!(
                "{} verified supporters could start their own groups • Only {} currently organizing",
                potential, n.connected_leaders
            ),
            metric: format!(
                "{} new jurisdictions reached via connected leaders",
                n.new_jurisdictions
            ),
            action: RECRUIT.to_string(),
            impact: if ratio > 5.0 {
                ImpactLevel::High
            } else {
                ImpactLevel::Medium
            },
        });
    }

    // 5. Fill up with the contests further out.
    if insights.len() < max {
        let used: HashSet<String> = insights
            .iter()
            .map(|i| i.title.trim_start_matches("Focus on ").to_string())
            .collect();
        let fillers: Vec<&BallotExposure> = unique
            .iter()
            .filter(|e| {
                let days = days_of(e);
                !used.contains(&e.ballot_item.title)
                    && matches!(e.urgency, Urgency::Medium | Urgency::Low)
                    && matches!(
                        e.leverage_level,
                        Some(LeverageLevel::Significant) | Some(LeverageLevel::Marginal)
                    )
                    && e.verified_supporters >= 5
                    && days > 0
                    && days <= 180
            })
            .copied()
            .take(max - insights.len())
            .collect();
        for e in fillers {
            insights.push(ActionableInsight {
                priority: 0,
                title: format!("Prepare for {}", e.ballot_item.title),
                description: format!(
                    "Election in {} days • {} verified supporters",
                    days_of(e),
                    e.verified_supporters
                ),
                metric: format!(
                    "Leverage: {} • {} level",
                    leverage_label(e.leverage_level),
                    level_label(e)
                ),
                action: PREPARE.to_string(),
                impact: ImpactLevel::Medium,
            });
        }
    }

    // 6. Never leave the list empty when there is something on the ballot.
    if insights.is_empty() {
        if let Some(top) = unique.first() {
            let days = days_of(top);
            insights.push(ActionableInsight {
                priority: 0,
                title: format!("Focus on {}", top.ballot_item.title),
                description: if days > 0 {
                    format!(
                        "Election in {} days • {} verified supporters",
                        days, top.verified_supporters
                    )
                } else {
                    format!("{} verified supporters", top.verified_supporters)
                },
                metric: format!("Leverage Score: {}", top.leverage_score.round()),
                action: MOBILIZE.to_string(),
                impact: if top.urgency == Urgency::High {
                    ImpactLevel::High
                } else {
                    ImpactLevel::Medium
                },
            });
        }
    }

    // Priorities follow the rule order and are unique, so the impact weight
    // never breaks a tie here.
    let mut res: Vec<ActionableInsight> = insights
        .into_iter()
        .take(max)
        .zip(1..=u8::MAX)
        .map(|(insight, priority)| ActionableInsight { priority, ..insight })
        .collect();
    res.sort_by_key(|i| (i.priority, Reverse(i.impact.weight())));
    debug!(
        "derive_actions: {} insights: {:?}",
        res.len(),
        res.iter().map(|i| i.title.as_str()).collect::<Vec<&str>>()
    );
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn ctx() -> MetricsContext {
        MetricsContext::new("g", Utc.with_ymd_and_hms(2026, 10, 15, 8, 0, 0).unwrap())
    }

    fn exposure(id: &str, title: &str, date: &str, verified: u64, urgency: Urgency, level: LeverageLevel) -> BallotExposure {
        BallotExposure {
            ballot_item: BallotItemSummary {
                id: id.to_string(),
                title: title.to_string(),
                item_type: BallotItemType::Race,
                election_date: date.to_string(),
                office_level: Some(OfficeLevel::Local),
                office_name: Some(title.to_string()),
                candidate_count: Some(2),
            },
            verified_supporters: verified,
            potential_supporters: Some(verified),
            urgency,
            leverage_score: verified as f64 * 3.0 * urgency.leverage_weight(),
            leverage_level: Some(level),
            jurisdiction: Some("Springfield".to_string()),
            jurisdiction_id: Some("j1".to_string()),
            supporter_count_source: SupporterCountSource::Exact,
        }
    }

    fn voters(current: u64) -> VerifiedVoterMetrics {
        VerifiedVoterMetrics {
            current,
            verification_rate: 40.0,
            growth_trend: vec![],
            weekly_growth_rate: Some(0.0),
        }
    }

    fn share(name: &str, verified: u64, supporters: u64, percentage: f64) -> JurisdictionShare {
        JurisdictionShare {
            id: name.to_lowercase(),
            name: name.to_string(),
            kind: JurisdictionKind::City,
            geoid: None,
            verified_count: verified,
            supporter_count: supporters,
            percentage,
            verification_rate: verified as f64 / supporters as f64 * 100.0,
        }
    }

    fn concentration(shares: Vec<JurisdictionShare>, hhi: f64) -> JurisdictionConcentration {
        JurisdictionConcentration {
            total_jurisdictions: shares.len() as u64,
            top_jurisdictions: shares,
            concentration_index: hhi,
        }
    }

    fn network(connected: u64, potential: u64) -> NetworkExpansion {
        NetworkExpansion {
            connected_leaders: connected,
            new_jurisdictions: 0,
            trend: vec![],
            potential_leaders: Some(potential),
        }
    }

    #[test]
    fn urgent_race_comes_first() {
        // 100 supporters, 40 verified, all in one place, a race in 20 days.
        let v = voters(40);
        let c = concentration(vec![share("Springfield", 40, 100, 100.0)], 1.0);
        let exposures = vec![exposure("b1", "Mayor", "2026-11-04", 40, Urgency::High, LeverageLevel::Marginal)];
        let n = network(0, 40);
        let inputs = ActionInputs {
            verified_voters: &v,
            jurisdictions: &c,
            ballot_exposure: &exposures,
            network: &n,
        };
        let actions = derive_actions(&inputs, &ctx());
        let titles: Vec<&str> = actions.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Focus on Mayor",
                "Increase verification in Springfield",
                "Expand geographic reach before you're fragile",
                "Grow your network of allied organizers",
            ]
        );
        assert_eq!(actions[0].impact, ImpactLevel::High);
        assert_eq!(actions[0].description, "Election in 20 days • 40 verified supporters");
        assert_eq!(actions[0].metric, "Leverage Score: 120 • local level");
        assert_eq!(actions[1].impact, ImpactLevel::High);
        assert_eq!(actions[1].description, "40% verified • 60 unverified supporters in high-concentration area");
        assert_eq!(actions[2].impact, ImpactLevel::High);
        assert_eq!(actions[3].impact, ImpactLevel::High);
        let priorities: Vec<u8> = actions.iter().map(|a| a.priority).collect();
        assert_eq!(priorities, vec![1, 2, 3, 4]);
        assert_eq!(derive_actions(&inputs, &ctx()), actions);
    }

    #[test]
    fn fills_with_later_contests_and_caps() {
        let v = voters(5);
        let c = concentration(vec![], 0.0);
        let n = network(0, 0);
        let mut exposures = vec![
            exposure("b1", "Mayor", "2026-11-04", 12, Urgency::High, LeverageLevel::Marginal),
            exposure("b1bis", "Mayor", "2026-11-04", 11, Urgency::High, LeverageLevel::Marginal),
        ];
        for i in 0..6 {
            exposures.push(exposure(
                &format!("c{}", i),
                &format!("Council {}", i),
                "2027-01-05",
                6 + i,
                Urgency::Medium,
                LeverageLevel::Marginal,
            ));
        }
        let inputs = ActionInputs {
            verified_voters: &v,
            jurisdictions: &c,
            ballot_exposure: &exposures,
            network: &n,
        };
        let actions = derive_actions(&inputs, &ctx());
        assert_eq!(actions.len(), 5);
        assert_eq!(actions[0].title, "Focus on Mayor");
        assert_eq!(actions[1].title, "Focus on Council 5");
        assert_eq!(actions[2].title, "Prepare for Council 4");
        assert_eq!(actions[2].action, PREPARE);
        assert_eq!(actions[2].metric, "Leverage: marginal • local level");
        assert!(actions.iter().skip(2).all(|a| a.impact == ImpactLevel::Medium));
        assert_eq!(actions[4].priority, 5);
    }

    #[test]
    fn fallback_on_weak_exposure() {
        let v = voters(1);
        let c = concentration(vec![], 0.0);
        let n = network(0, 0);
        let exposures = vec![
            exposure("b1", "School Board", "2026-10-20", 1, Urgency::High, LeverageLevel::Marginal),
            exposure("b2", "Dogcatcher", "2026-10-20", 2, Urgency::High, LeverageLevel::Marginal),
        ];
        let inputs = ActionInputs {
            verified_voters: &v,
            jurisdictions: &c,
            ballot_exposure: &exposures,
            network: &n,
        };
        let actions = derive_actions(&inputs, &ctx());
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].title, "Focus on Dogcatcher");
        assert_eq!(actions[0].metric, "Leverage Score: 6");
        assert_eq!(actions[0].impact, ImpactLevel::High);

        let none = ActionInputs {
            ballot_exposure: &[],
            ..inputs
        };
        assert!(derive_actions(&none, &ctx()).is_empty());
    }

    #[test]
    fn network_impact_depends_on_ratio() {
        let v = voters(30);
        let c = concentration(vec![], 0.0);
        let n = network(4, 12);
        let inputs = ActionInputs {
            verified_voters: &v,
            jurisdictions: &c,
            ballot_exposure: &[],
            network: &n,
        };
        let actions = derive_actions(&inputs, &ctx());
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].impact, ImpactLevel::Medium);
        assert_eq!(
            actions[0].description,
            "12 verified supporters could start their own groups • Only 4 currently organizing"
        );
    }

    #[test]
    fn insight_count_is_bounded() {
        let v = voters(5);
        let c = concentration(vec![], 0.0);
        let n = network(0, 0);
        let exposures: Vec<BallotExposure> = (0..300)
            .map(|i| {
                exposure(
                    &format!("c{}", i),
                    &format!("Council {}", i),
                    "2027-01-05",
                    6,
                    Urgency::Medium,
                    LeverageLevel::Marginal,
                )
            })
            .collect();
        let inputs = ActionInputs {
            verified_voters: &v,
            jurisdictions: &c,
            ballot_exposure: &exposures,
            network: &n,
        };
        let mut cx = ctx();
        cx.rules.max_insights = 300;
        let actions = derive_actions(&inputs, &cx);
        assert_eq!(actions.len(), InfluenceRules::MAX_INSIGHTS);
        let priorities: Vec<u8> = actions.iter().map(|a| a.priority).collect();
        assert_eq!(priorities, vec![1, 2, 3, 4, 5]);

        cx.rules.max_insights = 2;
        assert_eq!(derive_actions(&inputs, &cx).len(), 2);
    }

    #[test]
    fn strong_leverage_admits_contest_without_urgency() {
        // A past election still tagged medium urgency: only the leverage
        // clause can select it.
        let v = voters(5);
        let c = concentration(vec![], 0.0);
        let n = network(0, 0);
        let run = |verified: u64, level: LeverageLevel| {
            let exposures = vec![exposure("b1", "Sheriff", "2026-10-01", verified, Urgency::Medium, level)];
            let inputs = ActionInputs {
                verified_voters: &v,
                jurisdictions: &c,
                ballot_exposure: &exposures,
                network: &n,
            };
            derive_actions(&inputs, &ctx())
        };

        let significant = run(20, LeverageLevel::Significant);
        assert_eq!(significant.len(), 1);
        assert_eq!(significant[0].title, "Focus on Sheriff");
        assert!(significant[0].metric.ends_with("• local level"));

        let kingmaker = run(20, LeverageLevel::Kingmaker);
        assert!(kingmaker[0].metric.ends_with("• local level"));

        // Below 20 verified or with marginal leverage, only the fallback remains.
        for (verified, level) in [(19, LeverageLevel::Significant), (20, LeverageLevel::Marginal)] {
            let actions = run(verified, level);
            assert_eq!(actions.len(), 1);
            assert_eq!(actions[0].title, "Focus on Sheriff");
            assert_eq!(actions[0].metric, format!("Leverage Score: {}", (verified as f64 * 3.0 * Urgency::Medium.leverage_weight()).round()));
        }
    }

    #[test]
    fn verification_push_picks_first_eligible_jurisdiction() {
        let v = voters(5);
        let n = network(0, 0);
        let c = concentration(
            vec![
                share("Alpha", 4, 10, 40.0),
                share("Beta", 9, 10, 45.0),
                share("Gamma", 6, 200, 3.0),
                share("Delta", 14, 20, 12.0),
            ],
            0.3,
        );
        let inputs = ActionInputs {
            verified_voters: &v,
            jurisdictions: &c,
            ballot_exposure: &[],
            network: &n,
        };
        let actions = derive_actions(&inputs, &ctx());
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].title, "Increase verification in Delta");
        assert_eq!(actions[0].impact, ImpactLevel::Medium);
        assert_eq!(
            actions[0].description,
            "70% verified • 6 unverified supporters in high-concentration area"
        );
        assert_eq!(actions[0].metric, "14 verified • 12% of your network");

        // Only the five largest jurisdictions are considered.
        let c = concentration(
            vec![
                share("Alpha", 4, 10, 40.0),
                share("Beta", 9, 10, 45.0),
                share("Gamma", 6, 200, 3.0),
                share("Delta", 3, 20, 6.0),
                share("Epsilon", 10, 10, 5.0),
                share("Zeta", 5, 50, 5.0),
            ],
            0.3,
        );
        let inputs = ActionInputs {
            jurisdictions: &c,
            ..inputs
        };
        assert!(derive_actions(&inputs, &ctx()).is_empty());
    }

    #[test]
    fn concentration_risk_thresholds() {
        let v = voters(50);
        let n = network(0, 0);
        let expand = |hhi: f64, shares: Vec<JurisdictionShare>| {
            let c = concentration(shares, hhi);
            let inputs = ActionInputs {
                verified_voters: &v,
                jurisdictions: &c,
                ballot_exposure: &[],
                network: &n,
            };
            derive_actions(&inputs, &ctx())
                .into_iter()
                .find(|a| a.action == EXPAND)
        };
        let two = || {
            vec![
                share("Springfield", 60, 60, 60.0),
                share("Shelbyville", 40, 40, 40.0),
            ]
        };

        let medium = expand(0.52, two()).unwrap();
        assert_eq!(medium.impact, ImpactLevel::Medium);
        assert_eq!(
            medium.description,
            "52% concentration in 2 jurisdictions • Springfield has 60%"
        );
        assert_eq!(
            medium.metric,
            "Concentration Index: 52% • 2 active jurisdictions"
        );
        assert_eq!(expand(0.7, two()).unwrap().impact, ImpactLevel::Medium);
        assert_eq!(expand(0.71, two()).unwrap().impact, ImpactLevel::High);
        assert!(expand(0.5, two()).is_none());

        let five: Vec<JurisdictionShare> = ["A", "B", "C", "D", "E"]
            .iter()
            .map(|name| share(name, 10, 10, 20.0))
            .collect();
        assert!(expand(0.9, five).is_none());
    }
}
