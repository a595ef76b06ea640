use serde::{Deserialize, Serialize};

use crate::pose::JointAngles;
use crate::scoring::similarity::DeviationMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Correction {
    /// Observed angle is below target: open the joint up.
    Straighten,
    /// Observed angle is above target: close the joint.
    Bend,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackHint {
    pub angle: String,
    pub correction: Correction,
    pub degrees_off: f64,
    pub normalized_error: f64,
    pub message: String,
}

/// Pick the angles furthest from target and turn each into a corrective hint.
///
/// Ordering is by normalized error, largest first. Ties keep the map's key
/// order (alphabetical by angle name), which carries no meaning of its own.
/// Angles already on target, even when a non-positive tolerance fails them,
/// or lacking an observed/target value, produce no hint. `limit` of `Some(0)` yields nothing; `None` means unbounded.
pub fn rank_feedback(
    deviations: &DeviationMap,
    targets: &JointAngles,
    current: &JointAngles,
    limit: Option<usize>,
) -> Vec<FeedbackHint> {
    let limit = limit.unwrap_or(usize::MAX);
    if limit == 0 || deviations.is_empty() {
        return Vec::new();
    }

    let mut ranked: Vec<(&String, f64)> = deviations
        .iter()
        .filter(|(_, error)| error.is_finite() && **error > 0.0)
        .map(|(name, error)| (name, *error))
        .collect();
    // sort_by is stable, so equal errors keep key order
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    ranked
        .into_iter()
        .filter_map(|(name, normalized_error)| {
            let observed = *current.get(name)?;
            let target = *targets.get(name)?;
            // no direction to give when the joint sits exactly on target
            if observed == target {
                return None;
            }
            Some(build_hint(name, observed, target, normalized_error))
        })
        .take(limit)
        .collect()
}

fn build_hint(angle: &str, observed: f64, target: f64, normalized_error: f64) -> FeedbackHint {
    let delta = observed - target;
    let degrees_off = delta.abs();
    let joint = display_name(angle);

    let (correction, message) = if delta > 0.0 {
        (
            Correction::Bend,
            format!("Bend your {joint} more ({degrees_off:.0}° too straight)"),
        )
    } else {
        (
            Correction::Straighten,
            format!("Straighten your {joint} ({degrees_off:.0}° too bent)"),
        )
    };

    FeedbackHint {
        angle: angle.to_string(),
        correction,
        degrees_off,
        normalized_error,
        message,
    }
}

fn display_name(angle: &str) -> String {
    angle.replace('_', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, f64)]) -> JointAngles {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn fixture() -> (DeviationMap, JointAngles, JointAngles) {
        let targets = map(&[("left_elbow", 90.0), ("left_knee", 90.0), ("right_knee", 90.0), ("spine", 180.0)]);
        let current = map(&[("left_elbow", 95.0), ("left_knee", 80.0), ("right_knee", 100.0), ("spine", 180.0)]);
        let deviations = map(&[("left_elbow", 0.5), ("left_knee", 1.0), ("right_knee", 1.0), ("spine", 0.0)]);
        (deviations, targets, current)
    }

    #[test]
    fn orders_by_error_then_key() {
        let (deviations, targets, current) = fixture();
        let hints = rank_feedback(&deviations, &targets, &current, None);

        let names: Vec<&str> = hints.iter().map(|h| h.angle.as_str()).collect();
        assert_eq!(names, vec!["left_knee", "right_knee", "left_elbow"]);
    }

    #[test]
    fn direction_follows_sign_of_delta() {
        let (deviations, targets, current) = fixture();
        let hints = rank_feedback(&deviations, &targets, &current, None);

        assert_eq!(hints[0].correction, Correction::Straighten);
        assert_eq!(hints[0].message, "Straighten your left knee (10° too bent)");
        assert_eq!(hints[1].correction, Correction::Bend);
        assert_eq!(hints[1].degrees_off, 10.0);
    }

    #[test]
    fn respects_limit() {
        let (deviations, targets, current) = fixture();
        for limit in 0..5 {
            let hints = rank_feedback(&deviations, &targets, &current, Some(limit));
            assert!(hints.len() <= limit);
        }
        assert!(rank_feedback(&deviations, &targets, &current, Some(0)).is_empty());
        assert_eq!(rank_feedback(&deviations, &targets, &current, Some(2)).len(), 2);
    }

    #[test]
    fn empty_deviations_give_no_hints() {
        let (_, targets, current) = fixture();
        assert!(rank_feedback(&DeviationMap::new(), &targets, &current, Some(3)).is_empty());
    }

    #[test]
    fn on_target_angles_are_not_reported() {
        let (deviations, targets, current) = fixture();
        let hints = rank_feedback(&deviations, &targets, &current, None);
        assert!(hints.iter().all(|h| h.angle != "spine"));
    }

    #[test]
    fn exact_match_failed_by_zero_tolerance_gives_no_direction() {
        let targets = map(&[("hip", 90.0), ("knee", 90.0)]);
        let current = map(&[("hip", 90.0), ("knee", 100.0)]);
        // hip fails only because its tolerance is not positive
        let deviations = map(&[("hip", 1.0), ("knee", 1.0)]);

        let hints = rank_feedback(&deviations, &targets, &current, None);
        assert_eq!(hints.len(), 1);
        assert_eq!(hints[0].angle, "knee");
        assert_eq!(hints[0].correction, Correction::Bend);
    }
}
