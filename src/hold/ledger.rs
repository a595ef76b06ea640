use serde::{Deserialize, Serialize};

use crate::scoring::{score_to_grade, FeedbackHint, Grade, SessionResult};

/// Marker shown instead of a number for skipped levels.
pub const SKIPPED_MARK: &str = "—";

/// What a level produced. A skip is kept distinct from a genuine zero even
/// though the collapsed score view reports both as 0.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LevelOutcome {
    Scored { result: SessionResult },
    Skipped,
}

impl LevelOutcome {
    pub fn overall(&self) -> u32 {
        match self {
            LevelOutcome::Scored { result } => result.overall,
            LevelOutcome::Skipped => 0,
        }
    }

    pub fn feedback(&self) -> &[FeedbackHint] {
        match self {
            LevelOutcome::Scored { result } => &result.feedback,
            LevelOutcome::Skipped => &[],
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, LevelOutcome::Skipped)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LevelRecord {
    pub pose_id: String,
    pub pose_name: String,
    pub thumbnail: Option<String>,
    pub outcome: LevelOutcome,
}

/// Per-level outcomes for a whole challenge, in play order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LevelLedger {
    pub levels: Vec<LevelRecord>,
}

impl LevelLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: LevelRecord) {
        self.levels.push(record);
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Collapsed view: skipped levels read as 0.
    pub fn scores(&self) -> Vec<u32> {
        self.levels.iter().map(|l| l.outcome.overall()).collect()
    }

    /// Parallel to [`scores`](Self::scores); skipped levels have no feedback.
    pub fn feedback(&self) -> Vec<Vec<FeedbackHint>> {
        self.levels
            .iter()
            .map(|l| l.outcome.feedback().to_vec())
            .collect()
    }

    /// Score labels for summaries that tell a skip apart from a zero.
    pub fn display_scores(&self) -> Vec<String> {
        self.levels
            .iter()
            .map(|l| match &l.outcome {
                LevelOutcome::Skipped => SKIPPED_MARK.to_string(),
                LevelOutcome::Scored { result } => result.overall.to_string(),
            })
            .collect()
    }

    /// Unweighted mean of every level's score, skipped levels counting as 0.
    pub fn average(&self) -> u32 {
        if self.levels.is_empty() {
            return 0;
        }
        let total: u32 = self.scores().iter().sum();
        (total as f64 / self.levels.len() as f64).round() as u32
    }

    pub fn summary(&self) -> ChallengeSummary {
        let average = self.average();
        let grade = score_to_grade(average);
        ChallengeSummary {
            scores: self.scores(),
            display_scores: self.display_scores(),
            feedback: self.feedback(),
            skipped: self.levels.iter().map(|l| l.outcome.is_skipped()).collect(),
            average,
            grade,
            message: closing_message(grade).to_string(),
        }
    }
}

/// Flattened ledger handed to the presentation and report layers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeSummary {
    pub scores: Vec<u32>,
    pub display_scores: Vec<String>,
    pub feedback: Vec<Vec<FeedbackHint>>,
    pub skipped: Vec<bool>,
    pub average: u32,
    pub grade: Grade,
    pub message: String,
}

fn closing_message(grade: Grade) -> &'static str {
    match grade {
        Grade::NeedsFocus => "Keep practicing: slow down and focus on the highlighted joints.",
        Grade::Improving => "You're getting there. Work on the corrections from each level.",
        Grade::Healthy => "Solid session. A little more control will lift your score.",
        Grade::Great => "Great form! Just a few details left to polish.",
        Grade::Superb => "Flawless. Every pose held perfectly.",
    }
}
