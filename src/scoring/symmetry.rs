use crate::pose::JointAngles;
use crate::scoring::config::ScoringConfig;

const LEFT_PREFIX: &str = "left_";
const RIGHT_PREFIX: &str = "right_";

/// Percentage accuracy of a single frame, `round(score * 100)`.
pub fn compute_accuracy(score: f64) -> u32 {
    if !score.is_finite() {
        return 0;
    }
    (score.clamp(0.0, 1.0) * 100.0).round() as u32
}

/// Left/right balance of one frame in [0, 100].
///
/// Pairs are `left_<x>` / `right_<x>`. Each pair scores
/// `100 * (1 - min(1, |l - r| / saturation))`; the result is the rounded mean.
/// Without any pair the configured neutral value is returned.
pub fn compute_symmetry(angles: &JointAngles, config: &ScoringConfig) -> u32 {
    let saturation = config.symmetry_saturation_deg;
    let mut total = 0.0;
    let mut pairs = 0usize;

    for (name, left) in angles {
        let Some(suffix) = name.strip_prefix(LEFT_PREFIX) else {
            continue;
        };
        let Some(right) = angles.get(&format!("{RIGHT_PREFIX}{suffix}")) else {
            continue;
        };
        if !left.is_finite() || !right.is_finite() {
            continue;
        }

        let imbalance = if saturation > 0.0 {
            ((left - right).abs() / saturation).min(1.0)
        } else if left == right {
            0.0
        } else {
            1.0
        };
        total += 100.0 * (1.0 - imbalance);
        pairs += 1;
    }

    if pairs == 0 {
        return config.symmetry_neutral.min(100);
    }

    (total / pairs as f64).round().clamp(0.0, 100.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn angles(pairs: &[(&str, f64)]) -> JointAngles {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn accuracy_rounds_and_clamps() {
        assert_eq!(compute_accuracy(0.666), 67);
        assert_eq!(compute_accuracy(1.0), 100);
        assert_eq!(compute_accuracy(1.5), 100);
        assert_eq!(compute_accuracy(-0.2), 0);
        assert_eq!(compute_accuracy(f64::NAN), 0);
    }

    #[test]
    fn balanced_pairs_are_fully_symmetric() {
        let config = ScoringConfig::default();
        let frame = angles(&[("left_knee", 90.0), ("right_knee", 90.0), ("spine", 170.0)]);
        assert_eq!(compute_symmetry(&frame, &config), 100);
    }

    #[test]
    fn averages_pair_scores() {
        let config = ScoringConfig::default();
        // knee: diff 45 -> 0; elbow: diff 9 -> 80
        let frame = angles(&[
            ("left_knee", 90.0),
            ("right_knee", 135.0),
            ("left_elbow", 100.0),
            ("right_elbow", 91.0),
        ]);
        assert_eq!(compute_symmetry(&frame, &config), 40);
    }

    #[test]
    fn unpaired_angles_fall_back_to_neutral() {
        let config = ScoringConfig {
            symmetry_neutral: 75,
            ..ScoringConfig::default()
        };
        let frame = angles(&[("left_knee", 90.0), ("right_hip", 120.0)]);
        assert_eq!(compute_symmetry(&frame, &config), 75);
        assert_eq!(compute_symmetry(&JointAngles::new(), &config), 75);
    }
}
