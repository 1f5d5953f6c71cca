//! Core game engine: entities, the session state machine, and the
//! per-viewer projections the hosting environment fans out.

pub mod constants;
pub mod entities;
pub mod session;
pub mod views;

pub use entities::{
    Card, CardId, CardKind, CardSource, Deck, Phase, Player, PlayerId, PlayerName, Round,
    Submission,
};
pub use session::{DisconnectOutcome, GameError, GameSession};
pub use views::{GameView, GameViews, PlayerView, RoundView, SubmissionView};
