use std::collections::BTreeMap;

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::hold::ledger::{ChallengeSummary, LevelLedger, LevelOutcome, LevelRecord};
use crate::pose::{FrameScore, JointAngles, PoseDefinition};
use crate::scoring::{
    finalize_session, rank_feedback, score_frame, FeedbackHint, ScoringConfig, SessionResult,
};
use crate::settings::EngineSettings;

/// Upper bound on hints shown while holding.
pub const MAX_LIVE_HINTS: usize = 3;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "phase", rename_all = "camelCase")]
pub enum HoldPhase {
    Idle,
    CameraReady,
    Countdown { remaining: u32 },
    Holding,
    Finalizing,
    LevelComplete,
    ChallengeComplete,
}

impl Default for HoldPhase {
    fn default() -> Self {
        HoldPhase::Idle
    }
}

/// Display values refreshed while holding.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LiveStatus {
    pub similarity_pct: u32,
    pub progress_pct: u32,
    pub feedback: Vec<FeedbackHint>,
    pub second_averages: JointAngles,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CountdownStep {
    Remaining(u32),
    /// Countdown hit zero; holding began under this epoch.
    HoldStarted { epoch: u64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// Not holding; the frame was dropped.
    Ignored,
    Live(LiveStatus),
    Completed(SessionResult),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    NextLevel { level: usize },
    ChallengeComplete(ChallengeSummary),
}

/// Countdown, hold and level bookkeeping for one challenge run.
///
/// Owns every per-level buffer. All of them are cleared on each exit from
/// Holding (finalize, reset, skip), which also bumps `hold_epoch` so a
/// per-second flush scheduled for an earlier hold is refused.
#[derive(Debug, Clone)]
pub struct HoldSession {
    poses: Vec<PoseDefinition>,
    level: usize,
    phase: HoldPhase,
    countdown_steps: u32,
    live_hint_limit: usize,
    scoring: ScoringConfig,

    frames: Vec<FrameScore>,
    angle_series: BTreeMap<String, Vec<f64>>,
    second_buffer: BTreeMap<String, Vec<f64>>,
    live: LiveStatus,
    hold_started_at: Option<Instant>,
    hold_epoch: u64,

    /// Result of the level just finished, read back by `advance`.
    pending: Option<LevelOutcome>,
    ledger: LevelLedger,
}

impl HoldSession {
    pub fn new(poses: Vec<PoseDefinition>, settings: &EngineSettings) -> Result<Self> {
        if poses.is_empty() {
            bail!("a challenge needs at least one pose");
        }
        for pose in &poses {
            if !(pose.hold_seconds.is_finite() && pose.hold_seconds > 0.0) {
                bail!("pose {} has invalid hold duration {}", pose.id, pose.hold_seconds);
            }
        }

        Ok(Self {
            poses,
            level: 0,
            phase: HoldPhase::Idle,
            countdown_steps: settings.countdown_steps.max(1),
            live_hint_limit: settings.live_hint_limit.min(MAX_LIVE_HINTS),
            scoring: settings.scoring.clone(),
            frames: Vec::new(),
            angle_series: BTreeMap::new(),
            second_buffer: BTreeMap::new(),
            live: LiveStatus::default(),
            hold_started_at: None,
            hold_epoch: 0,
            pending: None,
            ledger: LevelLedger::new(),
        })
    }

    pub fn phase(&self) -> HoldPhase {
        self.phase
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn level_count(&self) -> usize {
        self.poses.len()
    }

    pub fn current_pose(&self) -> Option<&PoseDefinition> {
        self.poses.get(self.level)
    }

    pub fn live(&self) -> &LiveStatus {
        &self.live
    }

    pub fn frames(&self) -> &[FrameScore] {
        &self.frames
    }

    pub fn angle_series(&self) -> &BTreeMap<String, Vec<f64>> {
        &self.angle_series
    }

    pub fn hold_epoch(&self) -> u64 {
        self.hold_epoch
    }

    pub fn pending_outcome(&self) -> Option<&LevelOutcome> {
        self.pending.as_ref()
    }

    pub fn ledger(&self) -> &LevelLedger {
        &self.ledger
    }

    pub fn camera_ready(&mut self) -> Result<()> {
        if self.phase != HoldPhase::Idle {
            bail!("camera already attached (phase {:?})", self.phase);
        }
        self.phase = HoldPhase::CameraReady;
        log_info!("camera ready for level {}", self.level);
        Ok(())
    }

    pub fn start_countdown(&mut self) -> Result<u32> {
        match self.phase {
            HoldPhase::CameraReady => {
                self.phase = HoldPhase::Countdown {
                    remaining: self.countdown_steps,
                };
                log_info!("countdown started for level {}", self.level);
                Ok(self.countdown_steps)
            }
            HoldPhase::Countdown { .. } => bail!("countdown already running"),
            other => bail!("cannot start countdown in phase {:?}", other),
        }
    }

    /// One countdown second elapsed. Reaching zero is the only way into Holding.
    pub fn countdown_tick(&mut self, now: Instant) -> Result<CountdownStep> {
        let HoldPhase::Countdown { remaining } = self.phase else {
            bail!("no countdown running (phase {:?})", self.phase);
        };

        let remaining = remaining.saturating_sub(1);
        if remaining > 0 {
            self.phase = HoldPhase::Countdown { remaining };
            return Ok(CountdownStep::Remaining(remaining));
        }

        self.clear_level_buffers();
        self.hold_started_at = Some(now);
        self.phase = HoldPhase::Holding;
        log_info!("holding level {} (epoch {})", self.level, self.hold_epoch);
        Ok(CountdownStep::HoldStarted {
            epoch: self.hold_epoch,
        })
    }

    /// Score a detection frame. Finalizes once the configured hold duration
    /// has elapsed, using the frame just received as the basis for accuracy,
    /// symmetry and feedback.
    pub fn ingest_frame(
        &mut self,
        angles: JointAngles,
        captured_at: DateTime<Utc>,
        now: Instant,
    ) -> FrameOutcome {
        if self.phase != HoldPhase::Holding {
            return FrameOutcome::Ignored;
        }
        let (Some(pose), Some(started_at)) = (self.poses.get(self.level), self.hold_started_at)
        else {
            return FrameOutcome::Ignored;
        };

        let hold_seconds = pose.hold_seconds;
        let similarity = score_frame(&angles, &pose.target);
        let feedback = rank_feedback(
            &similarity.deviations,
            &pose.target.targets,
            &angles,
            Some(self.live_hint_limit),
        );

        for (name, value) in &angles {
            if !value.is_finite() {
                continue;
            }
            self.angle_series.entry(name.clone()).or_default().push(*value);
            self.second_buffer.entry(name.clone()).or_default().push(*value);
        }

        let elapsed = now.saturating_duration_since(started_at).as_secs_f64();
        let progress = (elapsed / hold_seconds).clamp(0.0, 1.0);

        self.live.similarity_pct = (similarity.score * 100.0).round() as u32;
        self.live.progress_pct = (progress * 100.0).round() as u32;
        self.live.feedback = feedback;

        log_debug!(
            "level {} frame {}: similarity {:.3}, elapsed {:.2}s",
            self.level,
            self.frames.len(),
            similarity.score,
            elapsed
        );

        self.frames.push(FrameScore {
            score: similarity.score,
            captured_at,
            angles,
        });

        if elapsed >= hold_seconds {
            return FrameOutcome::Completed(self.finalize());
        }

        FrameOutcome::Live(self.live.clone())
    }

    /// Average the last second of angles for display and clear the window.
    /// Refused outside Holding or for an epoch other than the current hold.
    pub fn flush_second(&mut self, epoch: u64) -> Option<JointAngles> {
        if self.phase != HoldPhase::Holding || epoch != self.hold_epoch {
            return None;
        }

        let averages: JointAngles = self
            .second_buffer
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(name, values)| {
                (
                    name.clone(),
                    values.iter().sum::<f64>() / values.len() as f64,
                )
            })
            .collect();
        self.second_buffer.clear();
        self.live.second_averages = averages.clone();
        Some(averages)
    }

    /// Abandon the current attempt without recording anything.
    pub fn reset(&mut self) -> Result<()> {
        match self.phase {
            HoldPhase::CameraReady | HoldPhase::Countdown { .. } | HoldPhase::Holding => {
                self.clear_level_buffers();
                self.pending = None;
                self.phase = HoldPhase::CameraReady;
                log_info!("level {} reset", self.level);
                Ok(())
            }
            other => bail!("cannot reset in phase {:?}", other),
        }
    }

    /// Give up on the current level; it is recorded as skipped on `advance`.
    pub fn skip(&mut self) -> Result<()> {
        match self.phase {
            HoldPhase::CameraReady | HoldPhase::Countdown { .. } | HoldPhase::Holding => {
                self.clear_level_buffers();
                self.pending = Some(LevelOutcome::Skipped);
                self.phase = HoldPhase::LevelComplete;
                log_info!("level {} skipped", self.level);
                Ok(())
            }
            other => bail!("cannot skip in phase {:?}", other),
        }
    }

    /// Commit the cached level outcome and move on.
    pub fn advance(&mut self) -> Result<Advance> {
        if self.phase != HoldPhase::LevelComplete {
            bail!("cannot advance in phase {:?}", self.phase);
        }
        let outcome = self
            .pending
            .take()
            .ok_or_else(|| anyhow!("level {} completed without an outcome", self.level))?;
        let pose = self
            .poses
            .get(self.level)
            .ok_or_else(|| anyhow!("level {} out of range", self.level))?;

        self.ledger.record(LevelRecord {
            pose_id: pose.id.clone(),
            pose_name: pose.name.clone(),
            thumbnail: pose.thumbnail.clone(),
            outcome,
        });

        self.level += 1;
        if self.level < self.poses.len() {
            self.phase = HoldPhase::Countdown {
                remaining: self.countdown_steps,
            };
            log_info!("advancing to level {}", self.level);
            Ok(Advance::NextLevel { level: self.level })
        } else {
            self.phase = HoldPhase::ChallengeComplete;
            let summary = self.ledger.summary();
            log_info!(
                "challenge complete: average {} ({})",
                summary.average,
                summary.grade.label()
            );
            Ok(Advance::ChallengeComplete(summary))
        }
    }

    fn finalize(&mut self) -> SessionResult {
        self.phase = HoldPhase::Finalizing;

        let result = match self.poses.get(self.level) {
            Some(pose) => finalize_session(&self.frames, &self.angle_series, &pose.target, &self.scoring),
            None => finalize_session(&[], &BTreeMap::new(), &Default::default(), &self.scoring),
        };
        log_info!(
            "level {} finalized from {} frames: overall {} ({})",
            self.level,
            self.frames.len(),
            result.overall,
            result.grade.label()
        );

        self.pending = Some(LevelOutcome::Scored {
            result: result.clone(),
        });
        self.clear_level_buffers();
        self.phase = HoldPhase::LevelComplete;
        result
    }

    fn clear_level_buffers(&mut self) {
        self.frames.clear();
        self.angle_series.clear();
        self.second_buffer.clear();
        self.live = LiveStatus::default();
        self.hold_started_at = None;
        self.hold_epoch = self.hold_epoch.wrapping_add(1);
    }
}
