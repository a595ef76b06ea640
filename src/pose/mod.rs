pub mod library;
pub mod models;

pub use library::PoseLibrary;
pub use models::{Difficulty, FrameScore, JointAngles, PoseDefinition, TargetPose};
