pub mod controller;
pub mod events;
pub mod ledger;
pub mod state;

pub use controller::{HoldController, HoldSnapshot};
pub use events::HoldEvent;
pub use ledger::{ChallengeSummary, LevelLedger, LevelOutcome, LevelRecord, SKIPPED_MARK};
pub use state::{Advance, CountdownStep, FrameOutcome, HoldPhase, HoldSession, LiveStatus};
