//! Card rating collaborator contract.
//!
//! Players can rate the response cards they saw in a round. Ratings
//! are best-effort telemetry: the hosting environment forwards them to
//! a sink off the hot path and a sink failure is logged, never
//! surfaced to the player.

use async_trait::async_trait;
use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::entities::{CardId, PlayerName};

/// One player's verdict on one card, 1 to 5.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CardRating {
    pub card_id: CardId,
    pub rating: u8,
}

#[derive(Debug, Error)]
pub enum RatingError {
    #[error("rating sink unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait RatingSink: Send + Sync {
    async fn rate_cards(
        &self,
        player_name: &PlayerName,
        ratings: &[CardRating],
        round_number: u32,
    ) -> Result<(), RatingError>;
}

/// A sink that records ratings to the log and nothing else. The
/// default until a persistent backend exists.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogRatingSink;

#[async_trait]
impl RatingSink for LogRatingSink {
    async fn rate_cards(
        &self,
        player_name: &PlayerName,
        ratings: &[CardRating],
        round_number: u32,
    ) -> Result<(), RatingError> {
        for rating in ratings {
            info!(
                "{player_name} rated card {} a {} in round {round_number}",
                rating.card_id, rating.rating
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_sink_accepts_ratings() {
        let sink = LogRatingSink;
        let ratings = [
            CardRating {
                card_id: 7,
                rating: 4,
            },
            CardRating {
                card_id: 9,
                rating: 1,
            },
        ];
        sink.rate_cards(&PlayerName::new("alice"), &ratings, 3)
            .await
            .unwrap();
    }

    #[test]
    fn test_rating_wire_format() {
        let rating: CardRating = serde_json::from_str(r#"{"card_id":12,"rating":5}"#).unwrap();
        assert_eq!(rating.card_id, 12);
        assert_eq!(rating.rating, 5);
    }
}
