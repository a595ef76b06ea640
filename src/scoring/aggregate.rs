use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::pose::{FrameScore, TargetPose};
use crate::scoring::{
    config::ScoringConfig,
    feedback::{rank_feedback, FeedbackHint},
    similarity::score_frame,
    stability::session_stability,
    symmetry::{compute_accuracy, compute_symmetry},
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum Grade {
    NeedsFocus,
    Improving,
    Healthy,
    Great,
    Superb,
}

impl Grade {
    pub fn label(&self) -> &'static str {
        match self {
            Grade::NeedsFocus => "Needs Focus",
            Grade::Improving => "Improving",
            Grade::Healthy => "Healthy",
            Grade::Great => "Great",
            Grade::Superb => "Superb",
        }
    }
}

/// Lower bounds are inclusive; only a perfect 100 reaches `Superb`.
pub fn score_to_grade(score: u32) -> Grade {
    match score {
        0..=39 => Grade::NeedsFocus,
        40..=59 => Grade::Improving,
        60..=79 => Grade::Healthy,
        80..=99 => Grade::Great,
        _ => Grade::Superb,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionResult {
    pub accuracy: u32,
    /// Mean per-angle steadiness in [0, 1]
    pub stability: f64,
    pub symmetry: u32,
    pub grade: Grade,
    pub feedback: Vec<FeedbackHint>,
    pub overall: u32,
}

/// Overall hold score in [0, 100] from mean frame similarity and stability.
pub fn aggregate_session(frames: &[FrameScore], stability: f64, config: &ScoringConfig) -> u32 {
    if frames.is_empty() {
        return 0;
    }

    let scores: Vec<f64> = frames
        .iter()
        .map(|frame| frame.score)
        .filter(|score| score.is_finite())
        .collect();
    if scores.is_empty() {
        return 0;
    }

    let mean = (scores.iter().sum::<f64>() / scores.len() as f64).clamp(0.0, 1.0);
    let stability = if stability.is_finite() {
        stability.clamp(0.0, 1.0)
    } else {
        0.0
    };

    let combined = config.weight_accuracy * mean + config.weight_stability * stability;
    if !combined.is_finite() {
        return 0;
    }
    (combined * 100.0).round().clamp(0.0, 100.0) as u32
}

/// Build the result for a finished hold.
///
/// Accuracy, symmetry and feedback come from the last frame only; the overall
/// score averages every frame. With no frames at all everything is zero except
/// symmetry, which falls back to the neutral value.
pub fn finalize_session(
    frames: &[FrameScore],
    series: &BTreeMap<String, Vec<f64>>,
    pose: &TargetPose,
    config: &ScoringConfig,
) -> SessionResult {
    let stability = session_stability(series, config);
    let overall = aggregate_session(frames, stability, config);

    let (accuracy, symmetry, feedback) = match frames.last() {
        Some(last) => {
            let similarity = score_frame(&last.angles, pose);
            (
                compute_accuracy(last.score),
                compute_symmetry(&last.angles, config),
                rank_feedback(&similarity.deviations, &pose.targets, &last.angles, None),
            )
        }
        None => (0, config.symmetry_neutral.min(100), Vec::new()),
    };

    SessionResult {
        accuracy,
        stability,
        symmetry,
        grade: score_to_grade(overall),
        feedback,
        overall,
    }
}
