//! Engine observables: topics and the published payload

use palm_bus::TopicId;
use palm_core::MappedPosition;

/// Topics the engine publishes on. UI-side observers subscribe or poll
/// `latest` on their own cadence; every topic is latest-value.
pub mod topic {
    use palm_bus::TopicId;

    pub const CURSOR: TopicId = TopicId("engine.cursor");
    pub const SCORE: TopicId = TopicId("engine.score");
    pub const HEALTH: TopicId = TopicId("engine.health");
    pub const GAME_OVER: TopicId = TopicId("engine.game_over");
    pub const INPUT_STATUS: TopicId = TopicId("engine.input_status");
}

/// Perception health as seen from the engine loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputStatus {
    /// Fresh samples are flowing.
    Live,
    /// No sample within the stale timeout; the cursor is held in place.
    Stale,
    /// The perception worker is gone; no recovery without a restart.
    Unavailable,
}

/// Payload published on the engine topics.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EngineEvent {
    Cursor(MappedPosition),
    Score(u32),
    Health(u32),
    /// Published exactly once, when health reaches zero.
    GameOver { final_score: u32 },
    InputStatus(InputStatus),
}

impl EngineEvent {
    /// The topic this payload belongs on.
    pub fn topic(&self) -> TopicId {
        match self {
            EngineEvent::Cursor(_) => topic::CURSOR,
            EngineEvent::Score(_) => topic::SCORE,
            EngineEvent::Health(_) => topic::HEALTH,
            EngineEvent::GameOver { .. } => topic::GAME_OVER,
            EngineEvent::InputStatus(_) => topic::INPUT_STATUS,
        }
    }
}
