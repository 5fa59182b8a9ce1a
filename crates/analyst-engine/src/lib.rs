pub mod artifacts;
pub mod engine;
pub mod event;
pub mod reducer;
pub mod sessions;
pub mod state;

pub use engine::{Engine, TurnReport};
pub use event::{EngineEvent, EventSink};
pub use state::{AppState, TurnId, TurnState};
