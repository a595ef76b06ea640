use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::pose::{JointAngles, TargetPose};

/// Normalized error per scored angle, `min(1, |observed - target| / tolerance)`.
pub type DeviationMap = BTreeMap<String, f64>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Similarity {
    /// Weighted match in [0, 1]
    pub score: f64,
    pub deviations: DeviationMap,
}

/// Compare one frame's angles against a target pose.
///
/// Angles missing from the sample, or from any of the target's three maps, are
/// left out of both numerator and denominator. A non-positive tolerance makes
/// the angle score 0 instead of dividing by it. Weights below zero count as 0.
pub fn score_frame(angles: &JointAngles, pose: &TargetPose) -> Similarity {
    let mut deviations = DeviationMap::new();
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;

    for (name, observed) in angles {
        let Some((target, tolerance, weight)) = pose.spec_for(name) else {
            continue;
        };
        if !observed.is_finite() || !target.is_finite() {
            continue;
        }

        let normalized_error = normalized_error(*observed, target, tolerance);
        deviations.insert(name.clone(), normalized_error);

        if weight.is_finite() && weight > 0.0 {
            weighted_sum += weight * (1.0 - normalized_error);
            weight_total += weight;
        }
    }

    let score = if weight_total > 0.0 {
        (weighted_sum / weight_total).clamp(0.0, 1.0)
    } else {
        0.0
    };

    Similarity { score, deviations }
}

fn normalized_error(observed: f64, target: f64, tolerance: f64) -> f64 {
    if !(tolerance.is_finite() && tolerance > 0.0) {
        return 1.0;
    }
    ((observed - target).abs() / tolerance).min(1.0)
}
