//! Card store collaborator contract.
//!
//! The store supplies full prompt/response collections on demand. The
//! session reads it at game start and whenever a deck runs dry
//! mid-draw; calls may suspend (a real store might sit behind a
//! database), so the trait is async.

use async_trait::async_trait;
use thiserror::Error;

use crate::game::entities::Card;

/// Everything the store knows, split by card kind.
#[derive(Clone, Debug, Default)]
pub struct CardCollections {
    pub prompts: Vec<Card>,
    pub responses: Vec<Card>,
}

#[derive(Debug, Error)]
pub enum CardStoreError {
    #[error("card store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait CardStore: Send + Sync {
    /// Return the full card collections, split by kind. Invoked at
    /// game start and at every deck-exhaustion reshuffle.
    async fn get_cards_by_type(&self) -> Result<CardCollections, CardStoreError>;
}

/// A store over fixed in-memory collections. The server loads its card
/// file into one of these; tests construct them directly.
#[derive(Clone, Debug, Default)]
pub struct MemoryCardStore {
    collections: CardCollections,
}

impl MemoryCardStore {
    #[must_use]
    pub fn new(prompts: Vec<Card>, responses: Vec<Card>) -> Self {
        Self {
            collections: CardCollections { prompts, responses },
        }
    }
}

#[async_trait]
impl CardStore for MemoryCardStore {
    async fn get_cards_by_type(&self) -> Result<CardCollections, CardStoreError> {
        Ok(self.collections.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::{CardKind, CardSource};

    fn card(id: i64, kind: CardKind) -> Card {
        Card {
            id,
            kind,
            text: format!("card {id}"),
            source: CardSource::Original,
            is_top_scored: None,
        }
    }

    #[tokio::test]
    async fn test_memory_store_returns_collections() {
        let store = MemoryCardStore::new(
            vec![card(1, CardKind::Prompt)],
            vec![card(2, CardKind::Response), card(3, CardKind::Response)],
        );
        let collections = store.get_cards_by_type().await.unwrap();
        assert_eq!(collections.prompts.len(), 1);
        assert_eq!(collections.responses.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_store_is_not_an_error() {
        let store = MemoryCardStore::default();
        let collections = store.get_cards_by_type().await.unwrap();
        assert!(collections.prompts.is_empty());
        assert!(collections.responses.is_empty());
    }
}
