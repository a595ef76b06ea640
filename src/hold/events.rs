use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::hold::ledger::ChallengeSummary;
use crate::hold::state::LiveStatus;
use crate::pose::JointAngles;
use crate::scoring::SessionResult;

/// Everything the presentation layer hears about a running challenge.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum HoldEvent {
    CountdownTick {
        level: usize,
        remaining: u32,
    },
    HoldStarted {
        level: usize,
        hold_seconds: f64,
    },
    LiveUpdate {
        level: usize,
        status: LiveStatus,
    },
    SecondAverages {
        level: usize,
        averages: JointAngles,
    },
    LevelCompleted {
        level: usize,
        result: SessionResult,
    },
    LevelSkipped {
        level: usize,
    },
    LevelReset {
        level: usize,
    },
    ChallengeCompleted {
        run_id: Uuid,
        summary: ChallengeSummary,
    },
}

pub type EventSender = UnboundedSender<HoldEvent>;

/// A closed receiver just means nobody is listening any more.
pub(crate) fn emit(events: &EventSender, event: HoldEvent) {
    let _ = events.send(event);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_event_tag_and_camel_case_fields() {
        let value = serde_json::to_value(HoldEvent::HoldStarted {
            level: 1,
            hold_seconds: 5.0,
        })
        .unwrap();

        assert_eq!(
            value,
            serde_json::json!({"event": "holdStarted", "level": 1, "holdSeconds": 5.0})
        );
    }
}
