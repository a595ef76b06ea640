use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use rand::Rng;
use tokio::sync::mpsc::UnboundedReceiver;

use posehold::{
    log_error, log_info,
    report::{write_report, FsThumbnails},
    Advance, EngineSettings, FrameOutcome, HoldController, HoldEvent, HoldPhase, JointAngles,
    PoseDefinition, PoseLibrary, SettingsStore,
};

// ~15 fps detection
const FRAME_INTERVAL_MS: u64 = 66;
const JITTER_DEG: f64 = 6.0;
const POLL_INTERVAL_MS: u64 = 50;

const ENABLE_LOGS: bool = true;

const USAGE: &str =
    "usage: posehold <library.json> [--settings settings.json] [--report out.png] [--skip LEVEL]...";

struct Args {
    library: PathBuf,
    settings: Option<PathBuf>,
    report: Option<PathBuf>,
    skip: Vec<usize>,
}

fn parse_args() -> Result<Args> {
    let mut library = None;
    let mut settings = None;
    let mut report = None;
    let mut skip = Vec::new();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--settings" => settings = Some(PathBuf::from(args.next().context(USAGE)?)),
            "--report" => report = Some(PathBuf::from(args.next().context(USAGE)?)),
            "--skip" => {
                let level = args.next().context(USAGE)?;
                skip.push(level.parse().with_context(|| format!("invalid level {level}"))?);
            }
            "-h" | "--help" => bail!(USAGE),
            other if library.is_none() => library = Some(PathBuf::from(other)),
            other => bail!("unexpected argument {other}\n{USAGE}"),
        }
    }

    Ok(Args {
        library: library.context(USAGE)?,
        settings,
        report,
        skip,
    })
}

/// Print queued events as JSON lines.
fn flush_events(events: &mut UnboundedReceiver<HoldEvent>) {
    while let Ok(event) = events.try_recv() {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{line}"),
            Err(err) => log_error!("failed to serialize event: {err}"),
        }
    }
}

fn jittered_frame(pose: &PoseDefinition, rng: &mut impl Rng) -> JointAngles {
    pose.target
        .targets
        .iter()
        .map(|(name, target)| (name.clone(), target + rng.gen_range(-JITTER_DEG..=JITTER_DEG)))
        .collect()
}

async fn simulate_hold(
    controller: &HoldController,
    pose: &PoseDefinition,
    events: &mut UnboundedReceiver<HoldEvent>,
) -> Result<()> {
    while controller.snapshot().await.phase != HoldPhase::Holding {
        flush_events(events);
        tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
    }

    loop {
        let angles = jittered_frame(pose, &mut rand::thread_rng());
        let outcome = controller.on_detection(angles).await;
        flush_events(events);

        match outcome {
            FrameOutcome::Completed(result) => {
                log_info!(
                    "{}: overall {} ({}), accuracy {}, symmetry {}",
                    pose.name,
                    result.overall,
                    result.grade.label(),
                    result.accuracy,
                    result.symmetry
                );
                return Ok(());
            }
            FrameOutcome::Live(_) => {}
            FrameOutcome::Ignored => bail!("frame ignored while replaying {}", pose.id),
        }

        tokio::time::sleep(Duration::from_millis(FRAME_INTERVAL_MS)).await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    posehold::init_logging();

    let args = parse_args()?;
    let library = PoseLibrary::from_path(&args.library)?;
    let settings = match &args.settings {
        Some(path) => SettingsStore::new(path.clone())?.engine(),
        None => EngineSettings::default(),
    };

    let poses = library.poses.clone();
    let (controller, mut events) = HoldController::new(poses.clone(), &settings)?;
    log_info!("replaying {} levels (run {})", poses.len(), controller.run_id());

    controller.camera_ready().await?;
    controller.start_countdown().await?;

    for (level, pose) in poses.iter().enumerate() {
        if args.skip.contains(&level) {
            controller.skip().await?;
        } else {
            simulate_hold(&controller, pose, &mut events).await?;
        }

        if let Advance::ChallengeComplete(summary) = controller.advance().await? {
            flush_events(&mut events);
            log_info!(
                "challenge finished: {} / 100 ({}) - {}",
                summary.average,
                summary.grade.label(),
                summary.message
            );
        }
    }

    controller.shutdown().await;

    if let Some(report_path) = &args.report {
        let thumbnail_root = args
            .library
            .parent()
            .map(PathBuf::from)
            .unwrap_or_default();
        let ledger = controller.snapshot().await.ledger;
        write_report(&ledger, &FsThumbnails::new(thumbnail_root), report_path)?;
        log_info!("report written to {}", report_path.display());
    }

    Ok(())
}
