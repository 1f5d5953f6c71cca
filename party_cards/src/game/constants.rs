//! Game limits shared across the crate.

/// Number of response cards every player holds between rounds.
pub const HAND_SIZE: usize = 7;

/// Minimum number of players required to start (and keep) a game.
pub const MIN_PLAYERS: usize = 3;

/// Maximum roster size.
pub const MAX_PLAYERS: usize = 20;

/// Inclusive bounds for the score target a host may pick.
pub const MIN_POINTS_TO_WIN: u32 = 1;
pub const MAX_POINTS_TO_WIN: u32 = 50;

/// Maximum display name length accepted at the validation boundary.
pub const MAX_NAME_LENGTH: usize = 20;
