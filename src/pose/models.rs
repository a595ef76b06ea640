use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One detection frame worth of joint angles, in degrees, keyed by angle name
/// (`"left_knee"`, `"right_elbow"`, ...). Ordered so every walk over a sample is
/// deterministic.
pub type JointAngles = BTreeMap<String, f64>;

/// Target angles for one pose plus how strictly and how heavily each is scored.
///
/// An angle only takes part in scoring when it appears in all three maps.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TargetPose {
    pub targets: BTreeMap<String, f64>,
    pub tolerances: BTreeMap<String, f64>,
    pub weights: BTreeMap<String, f64>,
}

impl TargetPose {
    /// Convenience constructor for a pose where every angle shares one tolerance and weight.
    pub fn uniform<I, S>(targets: I, tolerance: f64, weight: f64) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let targets: BTreeMap<String, f64> =
            targets.into_iter().map(|(k, v)| (k.into(), v)).collect();
        let tolerances = targets.keys().map(|k| (k.clone(), tolerance)).collect();
        let weights = targets.keys().map(|k| (k.clone(), weight)).collect();
        Self {
            targets,
            tolerances,
            weights,
        }
    }

    /// Target, tolerance and weight for `angle`, if all three are configured.
    pub fn spec_for(&self, angle: &str) -> Option<(f64, f64, f64)> {
        Some((
            *self.targets.get(angle)?,
            *self.tolerances.get(angle)?,
            *self.weights.get(angle)?,
        ))
    }

    /// Angle names present in only some of the three maps.
    pub fn incomplete_angles(&self) -> Vec<String> {
        let mut names: Vec<&String> = self
            .targets
            .keys()
            .chain(self.tolerances.keys())
            .chain(self.weights.keys())
            .collect();
        names.sort();
        names.dedup();
        names
            .into_iter()
            .filter(|name| self.spec_for(name).is_none())
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Beginner
    }
}

/// A pose as published by the pose library. Everything except `target` and
/// `hold_seconds` is display metadata and never touches scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoseDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub hold_seconds: f64,
    pub target: TargetPose,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub tips: Vec<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

/// Immutable per-frame record captured while holding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameScore {
    pub score: f64,
    pub captured_at: DateTime<Utc>,
    pub angles: JointAngles,
}
