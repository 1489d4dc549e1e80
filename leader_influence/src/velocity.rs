use log::debug;

use crate::config::*;
use crate::enhancement::BenchmarkSample;

/// Growth per week over the last four points of a cumulative series.
fn weekly_rate(trend: &[TimeSeriesPoint]) -> f64 {
    let recent = &trend[trend.len().saturating_sub(4)..];
    match (recent.first(), recent.last()) {
        (Some(first), Some(last)) if recent.len() >= 2 => {
            (last.value as f64 - first.value as f64) / (recent.len() - 1) as f64
        }
        _ => 0.0,
    }
}

fn trend_direction(trend: &[TimeSeriesPoint]) -> TrendDirection {
    if trend.len() < 3 {
        return TrendDirection::Steady;
    }
    let (first_half, second_half) = trend.split_at(trend.len() / 2);
    let first_rate = weekly_rate(first_half);
    let second_rate = weekly_rate(second_half);
    if second_rate > first_rate * 1.2 {
        TrendDirection::Accelerating
    } else if second_rate < first_rate * 0.8 {
        TrendDirection::Slowing
    } else {
        TrendDirection::Steady
    }
}

fn project(weekly_rate: f64, days: u32) -> i64 {
    (weekly_rate * days as f64 / 7.0).round() as i64
}

fn median(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Speed of the verified-voter growth, compared with peers when benchmark
/// samples are available.
pub fn compute_movement_velocity(
    growth_trend: &[TimeSeriesPoint],
    benchmarks: Option<&[BenchmarkSample]>,
) -> MovementVelocity {
    let your_growth_rate = weekly_rate(growth_trend);
    let mut res = MovementVelocity {
        your_growth_rate,
        peer_median: None,
        percentile: None,
        trend_direction: trend_direction(growth_trend),
        projection: VelocityProjection {
            in_30_days: project(your_growth_rate, 30),
            in_90_days: project(your_growth_rate, 90),
        },
    };
    if let Some(samples) = benchmarks.filter(|b| !b.is_empty()) {
        let mut rates: Vec<f64> = samples.iter().map(|b| b.growth_rate).collect();
        rates.sort_by(|a, b| a.total_cmp(b));
        let below = rates.iter().filter(|r| **r < your_growth_rate).count();
        res.peer_median = Some(median(&rates));
        res.percentile = Some(below as f64 / rates.len() as f64 * 100.0);
    }
    debug!("compute_movement_velocity: {:?}", res);
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[u64]) -> Vec<TimeSeriesPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| TimeSeriesPoint {
                date: format!("2026-09-{:02}", 7 * i + 1),
                value: *v,
            })
            .collect()
    }

    fn sample(growth_rate: f64) -> BenchmarkSample {
        BenchmarkSample { growth_rate }
    }

    #[test]
    fn rate_from_last_four_points() {
        let v = compute_movement_velocity(&series(&[1, 2, 4, 10, 16]), None);
        // (16 - 2) / 3
        assert!((v.your_growth_rate - 14.0 / 3.0).abs() < 1e-9);
        assert_eq!(v.trend_direction, TrendDirection::Accelerating);
        assert_eq!(v.projection.in_30_days, 20);
        assert_eq!(v.projection.in_90_days, 60);
        assert_eq!(v.peer_median, None);
        assert_eq!(v.percentile, None);
    }

    #[test]
    fn short_series_are_steady() {
        let v = compute_movement_velocity(&series(&[5]), None);
        assert_eq!(v.your_growth_rate, 0.0);
        assert_eq!(v.trend_direction, TrendDirection::Steady);
        assert_eq!(v.projection.in_90_days, 0);

        let v = compute_movement_velocity(&[], Some(&[]));
        assert_eq!(v.trend_direction, TrendDirection::Steady);
        assert_eq!(v.peer_median, None);
    }

    #[test]
    fn slowing_growth() {
        let v = compute_movement_velocity(&series(&[0, 10, 20, 21, 22]), None);
        assert_eq!(v.trend_direction, TrendDirection::Slowing);
    }

    #[test]
    fn compared_with_peers() {
        let peers = vec![sample(1.0), sample(8.0), sample(2.0), sample(3.0)];
        let v = compute_movement_velocity(&series(&[0, 3, 6, 9]), Some(&peers));
        assert_eq!(v.your_growth_rate, 3.0);
        assert_eq!(v.peer_median, Some(2.5));
        assert_eq!(v.percentile, Some(50.0));
        assert_eq!(v.trend_direction, TrendDirection::Steady);
    }
}
