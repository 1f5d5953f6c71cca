//! The JSON event contract between clients and the server, plus the
//! shape-level validation that runs before any session operation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::constants::{
    MAX_NAME_LENGTH, MAX_POINTS_TO_WIN, MIN_POINTS_TO_WIN,
};
use crate::game::entities::{CardId, PlayerName};
use crate::game::views::GameView;
use crate::ratings::CardRating;

/// Largest ratings batch accepted in one command.
pub const MAX_RATINGS_BATCH: usize = 100;

/// Rejections that never reach the session: the command is malformed
/// regardless of game state.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum ValidationError {
    #[error("name cannot be empty")]
    EmptyName,
    #[error("name cannot be longer than {MAX_NAME_LENGTH} characters")]
    NameTooLong,
    #[error("points to win must be between {MIN_POINTS_TO_WIN} and {MAX_POINTS_TO_WIN}")]
    TargetOutOfRange,
    #[error("ratings must be between 1 and 5")]
    RatingOutOfRange,
    #[error("ratings batch cannot be empty")]
    EmptyRatings,
    #[error("too many ratings in one batch")]
    TooManyRatings,
}

/// Everything a client can ask for.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    Join { name: PlayerName },
    Start { points_to_win: u32 },
    SubmitCard { card_id: CardId },
    PickWinner { card_id: CardId },
    NextRound,
    PlayAgain,
    RateCards { ratings: Vec<CardRating> },
}

impl ClientCommand {
    /// Shape-level checks. Session-level preconditions (phase, host,
    /// hand contents) are the session's job.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Join { name } => {
                if name.as_str().is_empty() {
                    return Err(ValidationError::EmptyName);
                }
                if name.as_str().chars().count() > MAX_NAME_LENGTH {
                    return Err(ValidationError::NameTooLong);
                }
            }
            Self::Start { points_to_win } => {
                if !(MIN_POINTS_TO_WIN..=MAX_POINTS_TO_WIN).contains(points_to_win) {
                    return Err(ValidationError::TargetOutOfRange);
                }
            }
            Self::RateCards { ratings } => {
                if ratings.is_empty() {
                    return Err(ValidationError::EmptyRatings);
                }
                if ratings.len() > MAX_RATINGS_BATCH {
                    return Err(ValidationError::TooManyRatings);
                }
                if ratings.iter().any(|r| !(1..=5).contains(&r.rating)) {
                    return Err(ValidationError::RatingOutOfRange);
                }
            }
            Self::SubmitCard { .. } | Self::PickWinner { .. } | Self::NextRound | Self::PlayAgain => {}
        }
        Ok(())
    }
}

impl fmt::Display for ClientCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Join { .. } => "join",
            Self::Start { .. } => "start",
            Self::SubmitCard { .. } => "submit_card",
            Self::PickWinner { .. } => "pick_winner",
            Self::NextRound => "next_round",
            Self::PlayAgain => "play_again",
            Self::RateCards { .. } => "rate_cards",
        };
        write!(f, "{repr}")
    }
}

/// Everything the server sends back.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The viewer's fresh projection, broadcast to every connected
    /// player after each accepted mutation.
    GameState { state: GameView },
    /// Sent only to the connection whose command was rejected.
    Error { message: String },
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::GameState { .. } => write!(f, "game_state"),
            Self::Error { message } => write!(f, "error: {message}"),
        }
    }
}
