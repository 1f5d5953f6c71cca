use rand::seq::SliceRandom;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier assigned to a card by the card store.
pub type CardId = i64;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    Prompt,
    Response,
}

impl fmt::Display for CardKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Prompt => "prompt",
            Self::Response => "response",
        };
        write!(f, "{repr}")
    }
}

/// Where a card came from: the stock deck or a player-made addition.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CardSource {
    Original,
    Custom,
}

/// A single prompt or response card. Immutable once created; owned by
/// the card store and referenced by value everywhere else.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Card {
    pub id: CardId,
    pub kind: CardKind,
    pub text: String,
    pub source: CardSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_top_scored: Option<bool>,
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.text)
    }
}

/// Identity token for a connection. Stable for the lifetime of one
/// connection; reconnection moves a fresh token onto the old player
/// record.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct PlayerId(Uuid);

impl PlayerId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A player's display name. Surrounding whitespace is trimmed on
/// construction; length limits are enforced at the validation boundary.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct PlayerName(String);

impl PlayerName {
    pub fn new(s: &str) -> Self {
        Self(s.trim().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for PlayerName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(&s))
    }
}

impl From<&str> for PlayerName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PlayerName {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

/// The game phase. Transitions are owned by the session state machine.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Lobby,
    Playing,
    Judging,
    RoundResult,
    GameOver,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Lobby => "lobby",
            Self::Playing => "playing",
            Self::Judging => "judging",
            Self::RoundResult => "round_result",
            Self::GameOver => "game_over",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Debug)]
pub struct Player {
    pub id: PlayerId,
    pub name: PlayerName,
    pub score: u32,
    pub hand: Vec<Card>,
    pub is_host: bool,
    pub is_connected: bool,
}

impl Player {
    #[must_use]
    pub fn new(id: PlayerId, name: PlayerName, is_host: bool) -> Self {
        Self {
            id,
            name,
            score: 0,
            hand: Vec::with_capacity(super::constants::HAND_SIZE),
            is_host,
            is_connected: true,
        }
    }
}

/// A response card played into the current round, with a snapshot of
/// the submitter's name taken at submission time.
#[derive(Clone, Debug)]
pub struct Submission {
    pub player_id: PlayerId,
    pub player_name: PlayerName,
    pub card: Card,
}

#[derive(Clone, Debug)]
pub struct Round {
    pub number: u32,
    pub czar_id: PlayerId,
    pub prompt_card: Card,
    pub submissions: Vec<Submission>,
    pub winner_id: Option<PlayerId>,
    pub winning_card: Option<Card>,
}

impl Round {
    #[must_use]
    pub fn new(number: u32, czar_id: PlayerId, prompt_card: Card) -> Self {
        Self {
            number,
            czar_id,
            prompt_card,
            submissions: Vec::new(),
            winner_id: None,
            winning_card: None,
        }
    }

    #[must_use]
    pub fn has_submitted(&self, id: PlayerId) -> bool {
        self.submissions.iter().any(|s| s.player_id == id)
    }
}

/// A shuffled stack of one card kind. Cards are drawn from the top;
/// the session refills the deck from the card store on exhaustion.
#[derive(Clone, Debug, Default)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// Build a deck from store-supplied cards, shuffling them into a
    /// fresh order.
    #[must_use]
    pub fn shuffled(mut cards: Vec<Card>) -> Self {
        cards.shuffle(&mut rand::rng());
        Self { cards }
    }

    pub fn draw(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    /// Shuffle a fresh batch from the store under the current stack.
    pub fn refill(&mut self, mut cards: Vec<Card>) {
        cards.shuffle(&mut rand::rng());
        self.cards.splice(0..0, cards);
    }

    pub fn clear(&mut self) {
        self.cards.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(id: CardId) -> Card {
        Card {
            id,
            kind: CardKind::Response,
            text: format!("response {id}"),
            source: CardSource::Original,
            is_top_scored: None,
        }
    }

    #[test]
    fn test_player_name_trims_whitespace() {
        let name = PlayerName::new("  alice  ");
        assert_eq!(name.as_str(), "alice");
    }

    #[test]
    fn test_player_name_equality() {
        assert_eq!(PlayerName::new("bob"), PlayerName::from("bob".to_string()));
        assert_ne!(PlayerName::new("bob"), PlayerName::new("alice"));
    }

    #[test]
    fn test_player_id_unique() {
        assert_ne!(PlayerId::new(), PlayerId::new());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Lobby.to_string(), "lobby");
        assert_eq!(Phase::RoundResult.to_string(), "round_result");
        assert_eq!(Phase::GameOver.to_string(), "game_over");
    }

    #[test]
    fn test_phase_serializes_snake_case() {
        let json = serde_json::to_string(&Phase::RoundResult).unwrap();
        assert_eq!(json, "\"round_result\"");
    }

    #[test]
    fn test_card_roundtrip() {
        let card = Card {
            id: 3,
            kind: CardKind::Prompt,
            text: "why?".to_string(),
            source: CardSource::Custom,
            is_top_scored: Some(true),
        };
        let json = serde_json::to_string(&card).unwrap();
        let back: Card = serde_json::from_str(&json).unwrap();
        assert_eq!(card, back);
    }

    #[test]
    fn test_card_top_scored_flag_optional() {
        let json = r#"{"id":1,"kind":"response","text":"x","source":"original"}"#;
        let card: Card = serde_json::from_str(json).unwrap();
        assert_eq!(card.is_top_scored, None);
    }

    #[test]
    fn test_deck_draws_every_card_once() {
        let mut deck = Deck::shuffled((0..10).map(response).collect());
        let mut seen: Vec<CardId> = (0..10).map(|_| deck.draw().unwrap().id).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
        assert!(deck.draw().is_none());
    }

    #[test]
    fn test_deck_refill_adds_under_current_stack() {
        let mut deck = Deck::shuffled(vec![response(1)]);
        deck.refill((2..5).map(response).collect());
        assert_eq!(deck.len(), 4);
        // The pre-refill top card is still the next draw.
        assert_eq!(deck.draw().unwrap().id, 1);
    }

    #[test]
    fn test_round_has_submitted() {
        let czar = PlayerId::new();
        let submitter = PlayerId::new();
        let mut round = Round::new(1, czar, response(0));
        assert!(!round.has_submitted(submitter));
        round.submissions.push(Submission {
            player_id: submitter,
            player_name: PlayerName::new("bob"),
            card: response(1),
        });
        assert!(round.has_submitted(submitter));
        assert!(!round.has_submitted(czar));
    }

    #[test]
    fn test_new_player_starts_clean() {
        let player = Player::new(PlayerId::new(), PlayerName::new("carol"), true);
        assert_eq!(player.score, 0);
        assert!(player.hand.is_empty());
        assert!(player.is_host);
        assert!(player.is_connected);
    }
}
