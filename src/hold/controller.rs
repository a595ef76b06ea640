use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use chrono::Utc;
use serde::Serialize;
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::hold::{
    events::{emit, EventSender, HoldEvent},
    ledger::LevelLedger,
    state::{Advance, CountdownStep, FrameOutcome, HoldPhase, HoldSession, LiveStatus},
};
use crate::pose::{JointAngles, PoseDefinition};
use crate::settings::EngineSettings;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldSnapshot {
    pub run_id: Uuid,
    pub phase: HoldPhase,
    pub level: usize,
    pub level_count: usize,
    pub pose_id: Option<String>,
    pub live: LiveStatus,
    pub ledger: LevelLedger,
}

struct Ticker {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

impl Ticker {
    fn stop(self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}

/// Drives a [`HoldSession`] from wall-clock time and detection callbacks.
///
/// Two periodic tasks may run: the countdown ticker and, while holding, the
/// per-second averaging ticker. Every transition out of Holding stops the
/// averaging ticker; reset and skip stop the countdown too.
#[derive(Clone)]
pub struct HoldController {
    session: Arc<Mutex<HoldSession>>,
    events: EventSender,
    countdown: Arc<Mutex<Option<Ticker>>>,
    averaging: Arc<Mutex<Option<Ticker>>>,
    tick_interval: Duration,
    run_id: Uuid,
    debug_mode: bool,
}

impl HoldController {
    pub fn new(
        poses: Vec<PoseDefinition>,
        settings: &EngineSettings,
    ) -> Result<(Self, mpsc::UnboundedReceiver<HoldEvent>)> {
        let debug_mode = std::env::var("POSEHOLD_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let session = HoldSession::new(poses, settings)?;
        let (events, receiver) = mpsc::unbounded_channel();

        let controller = Self {
            session: Arc::new(Mutex::new(session)),
            events,
            countdown: Arc::new(Mutex::new(None)),
            averaging: Arc::new(Mutex::new(None)),
            tick_interval: settings.tick_interval(),
            run_id: Uuid::new_v4(),
            debug_mode,
        };
        log_info!("challenge {} created", controller.run_id);

        Ok((controller, receiver))
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub async fn snapshot(&self) -> HoldSnapshot {
        let session = self.session.lock().await;
        HoldSnapshot {
            run_id: self.run_id,
            phase: session.phase(),
            level: session.level(),
            level_count: session.level_count(),
            pose_id: session.current_pose().map(|pose| pose.id.clone()),
            live: session.live().clone(),
            ledger: session.ledger().clone(),
        }
    }

    pub async fn camera_ready(&self) -> Result<()> {
        self.session.lock().await.camera_ready()
    }

    pub async fn start_countdown(&self) -> Result<()> {
        let (level, remaining) = {
            let mut session = self.session.lock().await;
            let remaining = session.start_countdown()?;
            (session.level(), remaining)
        };

        emit(&self.events, HoldEvent::CountdownTick { level, remaining });
        self.spawn_countdown().await;
        Ok(())
    }

    /// Detection callback. Frames arriving outside Holding are dropped.
    pub async fn on_detection(&self, angles: JointAngles) -> FrameOutcome {
        let (level, outcome) = {
            let mut session = self.session.lock().await;
            let outcome = session.ingest_frame(angles, Utc::now(), Instant::now());
            (session.level(), outcome)
        };

        match &outcome {
            FrameOutcome::Ignored => {
                if self.debug_mode {
                    log_debug!("frame ignored outside holding");
                }
            }
            FrameOutcome::Live(status) => {
                if self.debug_mode {
                    log_info!(
                        "level {} live: similarity {}%, progress {}%",
                        level,
                        status.similarity_pct,
                        status.progress_pct
                    );
                }
                emit(
                    &self.events,
                    HoldEvent::LiveUpdate {
                        level,
                        status: status.clone(),
                    },
                );
            }
            FrameOutcome::Completed(result) => {
                self.cancel_averaging().await;
                emit(
                    &self.events,
                    HoldEvent::LevelCompleted {
                        level,
                        result: result.clone(),
                    },
                );
            }
        }

        outcome
    }

    pub async fn reset(&self) -> Result<()> {
        let level = {
            let mut session = self.session.lock().await;
            session.reset()?;
            session.level()
        };

        self.cancel_countdown().await;
        self.cancel_averaging().await;
        emit(&self.events, HoldEvent::LevelReset { level });
        Ok(())
    }

    pub async fn skip(&self) -> Result<()> {
        let level = {
            let mut session = self.session.lock().await;
            session.skip()?;
            session.level()
        };

        self.cancel_countdown().await;
        self.cancel_averaging().await;
        emit(&self.events, HoldEvent::LevelSkipped { level });
        Ok(())
    }

    /// Record the finished level and either count down the next one or
    /// close the challenge.
    pub async fn advance(&self) -> Result<Advance> {
        let (advance, remaining) = {
            let mut session = self.session.lock().await;
            let advance = session.advance()?;
            let remaining = match session.phase() {
                HoldPhase::Countdown { remaining } => Some(remaining),
                _ => None,
            };
            (advance, remaining)
        };

        match &advance {
            Advance::NextLevel { level } => {
                let remaining = remaining
                    .ok_or_else(|| anyhow!("level {} did not enter countdown", level))?;
                emit(
                    &self.events,
                    HoldEvent::CountdownTick {
                        level: *level,
                        remaining,
                    },
                );
                self.spawn_countdown().await;
            }
            Advance::ChallengeComplete(summary) => {
                emit(
                    &self.events,
                    HoldEvent::ChallengeCompleted {
                        run_id: self.run_id,
                        summary: summary.clone(),
                    },
                );
            }
        }

        Ok(advance)
    }

    pub async fn shutdown(&self) {
        self.cancel_countdown().await;
        self.cancel_averaging().await;
    }

    async fn spawn_countdown(&self) {
        let mut guard = self.countdown.lock().await;
        if let Some(previous) = guard.take() {
            previous.stop();
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let controller = self.clone();
        let period = self.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        let (level, step, hold_seconds) = {
                            let mut session = controller.session.lock().await;
                            let step = session.countdown_tick(Instant::now());
                            let hold_seconds = session
                                .current_pose()
                                .map(|pose| pose.hold_seconds)
                                .unwrap_or_default();
                            (session.level(), step, hold_seconds)
                        };

                        match step {
                            Ok(CountdownStep::Remaining(remaining)) => {
                                emit(&controller.events, HoldEvent::CountdownTick { level, remaining });
                            }
                            Ok(CountdownStep::HoldStarted { epoch }) => {
                                emit(&controller.events, HoldEvent::HoldStarted { level, hold_seconds });
                                controller.spawn_averaging(epoch).await;
                                break;
                            }
                            Err(err) => {
                                log_warn!("countdown ticker stopping: {err}");
                                break;
                            }
                        }
                    }
                }
            }
        });

        *guard = Some(Ticker { handle, cancel });
    }

    async fn spawn_averaging(&self, epoch: u64) {
        let mut guard = self.averaging.lock().await;
        if let Some(previous) = guard.take() {
            previous.stop();
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let session = self.session.clone();
        let events = self.events.clone();
        let period = self.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        let (level, flushed) = {
                            let mut session = session.lock().await;
                            (session.level(), session.flush_second(epoch))
                        };

                        // None means this hold is over; the guard in the session
                        // keeps a late tick from touching the next level.
                        let Some(averages) = flushed else {
                            break;
                        };
                        if !averages.is_empty() {
                            emit(&events, HoldEvent::SecondAverages { level, averages });
                        }
                    }
                }
            }
        });

        *guard = Some(Ticker { handle, cancel });
    }

    async fn cancel_countdown(&self) {
        if let Some(ticker) = self.countdown.lock().await.take() {
            ticker.stop();
        }
    }

    async fn cancel_averaging(&self) {
        if let Some(ticker) = self.averaging.lock().await.take() {
            ticker.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::TargetPose;

    fn pose(id: &str, hold_seconds: f64) -> PoseDefinition {
        PoseDefinition {
            id: id.into(),
            name: id.into(),
            difficulty: Default::default(),
            hold_seconds,
            target: TargetPose::uniform([("knee", 90.0)], 10.0, 1.0),
            steps: Vec::new(),
            tips: Vec::new(),
            thumbnail: None,
        }
    }

    fn knee(value: f64) -> JointAngles {
        [("knee".to_string(), value)].into_iter().collect()
    }

    fn drain(events: &mut mpsc::UnboundedReceiver<HoldEvent>) -> Vec<HoldEvent> {
        let mut out = Vec::new();
        while let Ok(event) = events.try_recv() {
            out.push(event);
        }
        out
    }

    async fn sleep_ms(ms: u64) {
        time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_hold_and_finalize() {
        let (controller, mut events) =
            HoldController::new(vec![pose("a", 2.0)], &EngineSettings::default()).unwrap();
        controller.camera_ready().await.unwrap();
        controller.start_countdown().await.unwrap();
        assert!(controller.start_countdown().await.is_err());

        sleep_ms(3_100).await;
        assert_eq!(
            drain(&mut events),
            vec![
                HoldEvent::CountdownTick { level: 0, remaining: 3 },
                HoldEvent::CountdownTick { level: 0, remaining: 2 },
                HoldEvent::CountdownTick { level: 0, remaining: 1 },
                HoldEvent::HoldStarted { level: 0, hold_seconds: 2.0 },
            ]
        );
        assert_eq!(controller.snapshot().await.phase, HoldPhase::Holding);

        assert!(matches!(controller.on_detection(knee(90.0)).await, FrameOutcome::Live(_)));
        sleep_ms(1_000).await;
        assert!(matches!(controller.on_detection(knee(85.0)).await, FrameOutcome::Live(_)));
        sleep_ms(1_000).await;
        let FrameOutcome::Completed(result) = controller.on_detection(knee(95.0)).await else {
            panic!("hold should have completed");
        };
        assert_eq!(result.overall, 77);

        let seen = drain(&mut events);
        let averages: Vec<&HoldEvent> = seen
            .iter()
            .filter(|e| matches!(e, HoldEvent::SecondAverages { .. }))
            .collect();
        assert_eq!(averages.len(), 2);
        assert_eq!(
            averages[0],
            &HoldEvent::SecondAverages { level: 0, averages: knee(90.0) }
        );
        assert!(matches!(seen.last(), Some(HoldEvent::LevelCompleted { level: 0, .. })));

        // averaging ticker is gone once the hold is over
        sleep_ms(3_000).await;
        assert!(drain(&mut events).is_empty());

        let Advance::ChallengeComplete(summary) = controller.advance().await.unwrap() else {
            panic!("single level challenge should complete");
        };
        assert_eq!(summary.scores, vec![77]);
        assert!(matches!(
            drain(&mut events).as_slice(),
            [HoldEvent::ChallengeCompleted { .. }]
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn skip_stops_averaging_and_moves_on() {
        let (controller, mut events) =
            HoldController::new(vec![pose("a", 30.0), pose("b", 1.0)], &EngineSettings::default())
                .unwrap();
        controller.camera_ready().await.unwrap();
        controller.start_countdown().await.unwrap();
        sleep_ms(3_100).await;
        controller.on_detection(knee(70.0)).await;

        controller.skip().await.unwrap();
        drain(&mut events);
        sleep_ms(5_000).await;
        assert!(drain(&mut events).is_empty());

        assert_eq!(controller.advance().await.unwrap(), Advance::NextLevel { level: 1 });
        sleep_ms(3_100).await;
        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.phase, HoldPhase::Holding);
        assert_eq!(snapshot.pose_id.as_deref(), Some("b"));
        assert_eq!(snapshot.ledger.scores(), vec![0]);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_during_countdown_never_starts_holding() {
        let (controller, mut events) =
            HoldController::new(vec![pose("a", 5.0)], &EngineSettings::default()).unwrap();
        controller.camera_ready().await.unwrap();
        controller.start_countdown().await.unwrap();
        sleep_ms(1_500).await;

        controller.reset().await.unwrap();
        sleep_ms(5_000).await;

        let seen = drain(&mut events);
        assert!(!seen.iter().any(|e| matches!(e, HoldEvent::HoldStarted { .. })));
        assert_eq!(seen.last(), Some(&HoldEvent::LevelReset { level: 0 }));
        assert_eq!(controller.snapshot().await.phase, HoldPhase::CameraReady);
        assert!(matches!(controller.on_detection(knee(90.0)).await, FrameOutcome::Ignored));
    }

    #[tokio::test(start_paused = true)]
    async fn no_frames_means_no_completion() {
        let (controller, mut events) =
            HoldController::new(vec![pose("a", 1.0)], &EngineSettings::default()).unwrap();
        controller.camera_ready().await.unwrap();
        controller.start_countdown().await.unwrap();
        sleep_ms(10_000).await;

        assert_eq!(controller.snapshot().await.phase, HoldPhase::Holding);
        let seen = drain(&mut events);
        assert!(!seen.iter().any(|e| matches!(e, HoldEvent::LevelCompleted { .. })));
        controller.shutdown().await;
    }
}
