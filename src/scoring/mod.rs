pub mod aggregate;
pub mod config;
pub mod feedback;
pub mod similarity;
pub mod stability;
pub mod symmetry;

pub use aggregate::{aggregate_session, finalize_session, score_to_grade, Grade, SessionResult};
pub use config::ScoringConfig;
pub use feedback::{rank_feedback, Correction, FeedbackHint};
pub use similarity::{score_frame, DeviationMap, Similarity};
pub use stability::{angle_stability, session_stability};
pub use symmetry::{compute_accuracy, compute_symmetry};
