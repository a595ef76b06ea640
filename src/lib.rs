mod utils;

pub mod hold;
pub mod pose;
pub mod report;
pub mod scoring;
pub mod settings;

pub use hold::{Advance, FrameOutcome, HoldController, HoldEvent, HoldPhase, HoldSession};
pub use pose::{JointAngles, PoseDefinition, PoseLibrary, TargetPose};
pub use scoring::{Grade, SessionResult};
pub use settings::{EngineSettings, SettingsStore};

/// Initialize logging (reads RUST_LOG, defaults to info).
pub fn init_logging() {
    utils::logging::init();
}
