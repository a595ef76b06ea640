use serde::{Deserialize, Serialize};

/// Tunable thresholds and weights for frame and session scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoringConfig {
    /// Session score weights; should sum to 1.0
    pub weight_accuracy: f64,
    pub weight_stability: f64,

    /// Standard deviation (degrees) at or below which an angle counts as perfectly steady
    pub stability_dead_zone_deg: f64,

    /// Standard deviation (degrees) at or above which stability bottoms out at 0
    pub stability_saturation_deg: f64,

    /// Left/right difference (degrees) at which a pair scores 0 symmetry
    pub symmetry_saturation_deg: f64,

    /// Symmetry reported when a pose has no left/right angle pairs
    pub symmetry_neutral: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weight_accuracy: 0.70,
            weight_stability: 0.30,
            stability_dead_zone_deg: 5.0,
            stability_saturation_deg: 20.0,
            symmetry_saturation_deg: 45.0,
            symmetry_neutral: 100,
        }
    }
}
