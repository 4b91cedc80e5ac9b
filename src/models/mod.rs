//! Application models: move arbitration, the engine process, live games and
//! replays.

pub mod arbiter;
pub mod engine;
pub mod game;
pub mod replay;

pub use arbiter::{AiDecision, Arbiter, BookCursor};
pub use engine::{EngineProcess, EngineReply, EngineRequest, UciEngine};
pub use game::{BoardView, GameOutcome, GameSession, MoveSource, Pacing, Session, SessionEvent};
pub use replay::ReplayController;
