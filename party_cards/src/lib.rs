//! Engine for a real-time party card game: players submit response
//! cards against a prompt, a rotating card czar picks the winner, and
//! the first player to reach the score target wins.
//!
//! The crate is transport-agnostic. [`game::GameSession`] is a plain
//! value mutated through named, atomic operations; the hosting
//! environment (see the `pc_server` crate) serializes access, fans out
//! [`game::GameViews`] projections after each accepted mutation, and
//! supplies the async collaborators ([`cards::CardStore`],
//! [`ratings::RatingSink`]).

pub mod cards;
pub mod game;
pub mod net;
pub mod ratings;

pub use game::{GameError, GameSession, GameView, GameViews, Phase, PlayerId, PlayerName};
pub use net::{ClientCommand, ServerMessage, ValidationError};
