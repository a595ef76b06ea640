use std::collections::BTreeMap;

use crate::scoring::config::ScoringConfig;

/// Steadiness of one angle over a hold, in [0, 1].
///
/// Population standard deviation mapped linearly from 1.0 at the dead zone
/// down to 0.0 at the saturation point. Fewer than two samples gives 1.0.
pub fn angle_stability(samples: &[f64], config: &ScoringConfig) -> f64 {
    let finite: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.len() < 2 {
        return 1.0;
    }

    let n = finite.len() as f64;
    let mean = finite.iter().sum::<f64>() / n;
    let variance = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    let dead_zone = config.stability_dead_zone_deg.max(0.0);
    let saturation = config.stability_saturation_deg;

    if std_dev <= dead_zone {
        return 1.0;
    }
    if !(saturation > dead_zone) || std_dev >= saturation {
        return 0.0;
    }

    (1.0 - (std_dev - dead_zone) / (saturation - dead_zone)).clamp(0.0, 1.0)
}

/// Unweighted mean of every tracked angle's stability; 0 when nothing was tracked.
pub fn session_stability(series: &BTreeMap<String, Vec<f64>>, config: &ScoringConfig) -> f64 {
    if series.is_empty() {
        return 0.0;
    }

    let total: f64 = series
        .values()
        .map(|samples| angle_stability(samples, config))
        .sum();
    total / series.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_series_are_fully_stable() {
        let config = ScoringConfig::default();
        assert_eq!(angle_stability(&[], &config), 1.0);
        assert_eq!(angle_stability(&[42.0], &config), 1.0);
    }

    #[test]
    fn small_wobble_stays_inside_dead_zone() {
        let config = ScoringConfig::default();
        // std dev ~4.08
        assert_eq!(angle_stability(&[90.0, 85.0, 95.0], &config), 1.0);
    }

    #[test]
    fn decreases_with_dispersion_and_saturates() {
        let config = ScoringConfig::default();
        // std dev 10 -> 1 - (10 - 5) / 15
        let mid = angle_stability(&[80.0, 100.0], &config);
        assert!((mid - (1.0 - 5.0 / 15.0)).abs() < 1e-9);

        assert_eq!(angle_stability(&[0.0, 90.0, 0.0, 90.0], &config), 0.0);
    }

    #[test]
    fn ignores_non_finite_samples() {
        let config = ScoringConfig::default();
        assert_eq!(angle_stability(&[90.0, f64::NAN, 90.0], &config), 1.0);
    }

    #[test]
    fn session_stability_averages_angles() {
        let config = ScoringConfig::default();
        let mut series = BTreeMap::new();
        series.insert("left_knee".to_string(), vec![90.0, 90.0]);
        series.insert("right_knee".to_string(), vec![0.0, 90.0]);

        assert_eq!(session_stability(&series, &config), 0.5);
        assert_eq!(session_stability(&BTreeMap::new(), &config), 0.0);
    }
}
