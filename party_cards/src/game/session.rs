//! The game session state machine.
//!
//! All mutation funnels through the named operations below. Each one
//! validates its preconditions first and either performs its full
//! effect or fails with zero observable change. Card-store fetches
//! happen before any viewer-visible mutation, so a store failure never
//! leaves the session half-updated (deck refills are not projected to
//! viewers and are therefore safe to apply early).
//!
//! The session is an ordinary value with no interior locking; the
//! hosting environment must serialize operations against it (the
//! server wraps one session in an actor).

use log::warn;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::constants::{
    HAND_SIZE, MAX_PLAYERS, MAX_POINTS_TO_WIN, MIN_PLAYERS, MIN_POINTS_TO_WIN,
};
use super::entities::{CardId, Deck, Phase, Player, PlayerId, PlayerName, Round, Submission};
use crate::cards::{CardStore, CardStoreError};

/// Why an operation was rejected. Every variant is recovered at the
/// operation boundary and reported only to the originating connection.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum GameError {
    #[error("game already in progress, wait for it to finish")]
    GameInProgress,
    #[error("name already taken")]
    NameTaken,
    #[error("game is full")]
    GameFull,
    #[error("only the host can do that")]
    NotHost,
    #[error("need at least 3 players")]
    NotEnoughPlayers,
    #[error("points to win must be between 1 and 50")]
    InvalidTarget,
    #[error("wrong phase for that action")]
    WrongPhase,
    #[error("the card czar cannot submit")]
    CzarCannotSubmit,
    #[error("already submitted this round")]
    AlreadySubmitted,
    #[error("card not in hand")]
    CardNotInHand,
    #[error("only the card czar can pick")]
    NotCzar,
    #[error("card not found in submissions")]
    CardNotFound,
    #[error("player not found")]
    PlayerNotFound,
    #[error("no cards available")]
    NoCardsAvailable,
}

impl From<CardStoreError> for GameError {
    fn from(err: CardStoreError) -> Self {
        warn!("card store failure: {err}");
        Self::NoCardsAvailable
    }
}

/// What `disconnect` did with the session.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DisconnectOutcome {
    /// State changed; viewers should receive fresh projections.
    Updated,
    /// No connected player remains; the caller should drop the session.
    Closed,
    /// The identity was not part of the session.
    Ignored,
}

/// One party card game: lobby, submission and judging rounds, scoring,
/// until a player reaches the score target.
///
/// Sessions are plain values so that tests (or a multi-room deployment)
/// can run any number of them side by side; "one game per process" is
/// the server's policy, not a constraint here.
#[derive(Debug)]
pub struct GameSession {
    phase: Phase,
    players: Vec<Player>,
    current_round: Option<Round>,
    points_to_win: u32,
    host_id: Option<PlayerId>,
    prompt_deck: Deck,
    response_deck: Deck,
    czar_order: Vec<PlayerId>,
    czar_index: usize,
}

impl Default for GameSession {
    fn default() -> Self {
        Self {
            phase: Phase::Lobby,
            players: Vec::new(),
            current_round: None,
            points_to_win: 5,
            host_id: None,
            prompt_deck: Deck::default(),
            response_deck: Deck::default(),
            czar_order: Vec::new(),
            czar_index: 0,
        }
    }
}

impl GameSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    #[must_use]
    pub fn current_round(&self) -> Option<&Round> {
        self.current_round.as_ref()
    }

    #[must_use]
    pub fn host_id(&self) -> Option<PlayerId> {
        self.host_id
    }

    #[must_use]
    pub fn points_to_win(&self) -> u32 {
        self.points_to_win
    }

    #[must_use]
    pub fn czar_order(&self) -> &[PlayerId] {
        &self.czar_order
    }

    #[must_use]
    pub fn connected_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_connected).count()
    }

    /// How many submissions complete the current round: every connected
    /// player except the czar. Recomputed live so it tracks disconnects
    /// within a round.
    #[must_use]
    pub fn expected_submitters(&self) -> usize {
        match &self.current_round {
            Some(round) => self
                .players
                .iter()
                .filter(|p| p.is_connected && p.id != round.czar_id)
                .count(),
            None => 0,
        }
    }

    /// Add a player to the lobby, or reattach a reconnecting one.
    ///
    /// If a disconnected player with this exact name exists (only
    /// possible while a game is in progress, since the lobby removes
    /// leavers outright), the new identity is moved onto that record
    /// and every stored reference to the old identity is rewritten in
    /// one pass. Otherwise the player joins the lobby roster.
    pub fn join(&mut self, id: PlayerId, name: PlayerName) -> Result<(), GameError> {
        if let Some(pos) = self
            .players
            .iter()
            .position(|p| p.name == name && !p.is_connected)
        {
            self.reattach(pos, id);
            return Ok(());
        }

        if self.phase != Phase::Lobby {
            return Err(GameError::GameInProgress);
        }
        if self.players.iter().any(|p| p.name == name) {
            return Err(GameError::NameTaken);
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(GameError::GameFull);
        }

        let is_first = self.players.is_empty();
        self.players.push(Player::new(id, name, is_first));
        self.czar_order.push(id);
        if is_first {
            self.host_id = Some(id);
        }
        Ok(())
    }

    /// Rewrite every reference to the player's old identity: the roster
    /// record, the czar order, the host id, the current round's czar
    /// and winner ids, and all submission author ids. One transactional
    /// pass, so a partial remap cannot be observed.
    fn reattach(&mut self, pos: usize, new_id: PlayerId) {
        let old_id = self.players[pos].id;
        self.players[pos].id = new_id;
        self.players[pos].is_connected = true;
        for entry in &mut self.czar_order {
            if *entry == old_id {
                *entry = new_id;
            }
        }
        if self.host_id == Some(old_id) {
            self.host_id = Some(new_id);
        }
        if let Some(round) = &mut self.current_round {
            if round.czar_id == old_id {
                round.czar_id = new_id;
            }
            if round.winner_id == Some(old_id) {
                round.winner_id = Some(new_id);
            }
            for submission in &mut round.submissions {
                if submission.player_id == old_id {
                    submission.player_id = new_id;
                }
            }
        }
    }

    /// Start the game: shuffle fresh decks from the store, deal every
    /// player a full hand, and begin round 1 with the first czar.
    pub async fn start(
        &mut self,
        id: PlayerId,
        points_to_win: u32,
        store: &dyn CardStore,
    ) -> Result<(), GameError> {
        if self.host_id != Some(id) {
            return Err(GameError::NotHost);
        }
        if self.players.len() < MIN_PLAYERS {
            return Err(GameError::NotEnoughPlayers);
        }
        if !(MIN_POINTS_TO_WIN..=MAX_POINTS_TO_WIN).contains(&points_to_win) {
            return Err(GameError::InvalidTarget);
        }

        let collections = store.get_cards_by_type().await?;
        if collections.prompts.is_empty() || collections.responses.is_empty() {
            return Err(GameError::NoCardsAvailable);
        }

        // Gather everything the deal needs into locals; session state
        // is only assigned once every store call has succeeded.
        let prompt_deck = Deck::shuffled(collections.prompts);
        let mut response_deck = Deck::shuffled(collections.responses);
        Self::refill_responses(&mut response_deck, HAND_SIZE * self.players.len(), store).await?;

        self.points_to_win = points_to_win;
        self.prompt_deck = prompt_deck;
        self.response_deck = response_deck;
        for player in &mut self.players {
            player.hand.clear();
            while player.hand.len() < HAND_SIZE {
                match self.response_deck.draw() {
                    Some(card) => player.hand.push(card),
                    None => break,
                }
            }
        }

        self.czar_index = 0;
        self.begin_round()
    }

    /// Play a response card into the current round. Completing the
    /// round (submissions == connected non-czar players) shuffles the
    /// submission order and advances to judging.
    pub fn submit_card(&mut self, id: PlayerId, card_id: CardId) -> Result<(), GameError> {
        if self.phase != Phase::Playing {
            return Err(GameError::WrongPhase);
        }
        let Some(round) = &self.current_round else {
            return Err(GameError::WrongPhase);
        };
        if round.czar_id == id {
            return Err(GameError::CzarCannotSubmit);
        }
        if round.has_submitted(id) {
            return Err(GameError::AlreadySubmitted);
        }
        let pos = self
            .players
            .iter()
            .position(|p| p.id == id)
            .ok_or(GameError::PlayerNotFound)?;
        let card_idx = self.players[pos]
            .hand
            .iter()
            .position(|c| c.id == card_id)
            .ok_or(GameError::CardNotInHand)?;

        let card = self.players[pos].hand.remove(card_idx);
        let player_name = self.players[pos].name.clone();
        let expected = self.expected_submitters();
        let round = self
            .current_round
            .as_mut()
            .ok_or(GameError::WrongPhase)?;
        round.submissions.push(Submission {
            player_id: id,
            player_name,
            card,
        });
        if round.submissions.len() >= expected {
            self.close_submissions();
        }
        Ok(())
    }

    /// The czar awards the round to the player behind `card_id`.
    pub fn pick_winner(&mut self, id: PlayerId, card_id: CardId) -> Result<(), GameError> {
        if self.phase != Phase::Judging {
            return Err(GameError::WrongPhase);
        }
        let Some(round) = &self.current_round else {
            return Err(GameError::WrongPhase);
        };
        if round.czar_id != id {
            return Err(GameError::NotCzar);
        }
        let submission = round
            .submissions
            .iter()
            .find(|s| s.card.id == card_id)
            .ok_or(GameError::CardNotFound)?;
        let winner_id = submission.player_id;
        let winning_card = submission.card.clone();

        let winner_score = match self.players.iter_mut().find(|p| p.id == winner_id) {
            Some(winner) => {
                winner.score += 1;
                winner.score
            }
            None => 0,
        };
        if let Some(round) = &mut self.current_round {
            round.winner_id = Some(winner_id);
            round.winning_card = Some(winning_card);
        }
        self.phase = if winner_score >= self.points_to_win {
            Phase::GameOver
        } else {
            Phase::RoundResult
        };
        Ok(())
    }

    /// Host advances from a round result into the next round: top up
    /// every connected hand, rotate the czar past disconnected entries,
    /// draw the next prompt.
    pub async fn next_round(&mut self, id: PlayerId, store: &dyn CardStore) -> Result<(), GameError> {
        if self.phase != Phase::RoundResult {
            return Err(GameError::WrongPhase);
        }
        if self.host_id != Some(id) {
            return Err(GameError::NotHost);
        }
        if self.connected_count() < MIN_PLAYERS {
            return Err(GameError::NotEnoughPlayers);
        }

        let shortfall: usize = self
            .players
            .iter()
            .filter(|p| p.is_connected)
            .map(|p| HAND_SIZE.saturating_sub(p.hand.len()))
            .sum();
        Self::refill_responses(&mut self.response_deck, shortfall, store).await?;
        Self::refill_prompts(&mut self.prompt_deck, 1, store).await?;

        for player in &mut self.players {
            if !player.is_connected {
                continue;
            }
            while player.hand.len() < HAND_SIZE {
                match self.response_deck.draw() {
                    Some(card) => player.hand.push(card),
                    None => break,
                }
            }
        }

        self.advance_czar();
        self.begin_round()
    }

    /// Host resets the session back to a fresh lobby after game over.
    /// Disconnected players are dropped for good.
    pub fn play_again(&mut self, id: PlayerId) -> Result<(), GameError> {
        if self.host_id != Some(id) {
            return Err(GameError::NotHost);
        }
        for player in &mut self.players {
            player.score = 0;
            player.hand.clear();
        }
        self.players.retain(|p| p.is_connected);
        self.czar_order = self.players.iter().map(|p| p.id).collect();
        self.phase = Phase::Lobby;
        self.current_round = None;
        self.prompt_deck.clear();
        self.response_deck.clear();
        self.czar_index = 0;
        Ok(())
    }

    /// Handle a dropped connection. In the lobby the player is removed
    /// outright; mid-game they are retained (flagged disconnected) so
    /// they can reconnect by name. Departures can transfer the host,
    /// collapse the game back to the lobby, hand the czar seat onward,
    /// or complete a stalled submission phase.
    pub async fn disconnect(&mut self, id: PlayerId, store: &dyn CardStore) -> DisconnectOutcome {
        let Some(pos) = self.players.iter().position(|p| p.id == id) else {
            return DisconnectOutcome::Ignored;
        };
        self.players[pos].is_connected = false;

        if self.phase == Phase::Lobby {
            self.players.remove(pos);
            self.czar_order.retain(|entry| *entry != id);
            if self.host_id == Some(id) {
                self.host_id = self.players.first().map(|p| p.id);
                if let Some(first) = self.players.first_mut() {
                    first.is_host = true;
                }
            }
            if self.players.is_empty() {
                return DisconnectOutcome::Closed;
            }
            return DisconnectOutcome::Updated;
        }

        if self.host_id == Some(id) {
            if let Some(next) = self.players.iter().position(|p| p.is_connected) {
                self.host_id = Some(self.players[next].id);
                self.players[next].is_host = true;
                self.players[pos].is_host = false;
            }
        }

        let connected = self.connected_count();
        if connected == 0 {
            return DisconnectOutcome::Closed;
        }
        if connected < MIN_PLAYERS {
            // Too few players to continue: the game ends early.
            self.collapse_to_lobby();
            return DisconnectOutcome::Updated;
        }

        let czar_left = matches!(self.phase, Phase::Playing | Phase::Judging)
            && matches!(&self.current_round, Some(round) if round.czar_id == id);
        if czar_left {
            self.advance_czar();
            if let Err(err) = self.start_replacement_round(store).await {
                // The disconnect itself cannot be refused, so a store
                // failure here degrades to the same early-end collapse.
                warn!("could not start a replacement round: {err}");
                self.collapse_to_lobby();
            }
            return DisconnectOutcome::Updated;
        }

        // A departure shrinks the expected submitter set and can itself
        // complete a stalled submission phase.
        if self.phase == Phase::Playing {
            let expected = self.expected_submitters();
            let submitted = self
                .current_round
                .as_ref()
                .map_or(0, |round| round.submissions.len());
            if expected > 0 && submitted >= expected {
                self.close_submissions();
            }
        }
        DisconnectOutcome::Updated
    }

    /// Fix the submission order with one uniform shuffle and move to
    /// judging. The shuffled order is what every viewer sees, so
    /// presentation order carries no authorship information.
    fn close_submissions(&mut self) {
        if let Some(round) = &mut self.current_round {
            round.submissions.shuffle(&mut rand::rng());
        }
        self.phase = Phase::Judging;
    }

    fn begin_round(&mut self) -> Result<(), GameError> {
        let prompt_card = self
            .prompt_deck
            .draw()
            .ok_or(GameError::NoCardsAvailable)?;
        let czar_id = self.czar_order[self.czar_index % self.czar_order.len()];
        let number = self.current_round.as_ref().map_or(0, |r| r.number) + 1;
        self.current_round = Some(Round::new(number, czar_id, prompt_card));
        self.phase = Phase::Playing;
        Ok(())
    }

    async fn start_replacement_round(&mut self, store: &dyn CardStore) -> Result<(), GameError> {
        Self::refill_prompts(&mut self.prompt_deck, 1, store).await?;
        self.begin_round()
    }

    /// Advance the czar index to the next connected identity in czar
    /// order, wrapping. Bounded to one full rotation so it terminates
    /// even if every other entry is disconnected.
    fn advance_czar(&mut self) {
        let len = self.czar_order.len();
        if len == 0 {
            return;
        }
        self.czar_index = (self.czar_index + 1) % len;
        let mut attempts = 0;
        while attempts < len && !self.is_connected_id(self.czar_order[self.czar_index % len]) {
            self.czar_index = (self.czar_index + 1) % len;
            attempts += 1;
        }
    }

    fn is_connected_id(&self, id: PlayerId) -> bool {
        self.players.iter().any(|p| p.id == id && p.is_connected)
    }

    /// Force the session back to the lobby: round gone, scores and
    /// hands reset, disconnected players dropped, czar order rebuilt.
    fn collapse_to_lobby(&mut self) {
        self.phase = Phase::Lobby;
        self.current_round = None;
        for player in &mut self.players {
            player.hand.clear();
            player.score = 0;
        }
        self.players.retain(|p| p.is_connected);
        self.czar_order = self.players.iter().map(|p| p.id).collect();
        self.czar_index = 0;
    }

    /// Top `deck` up to at least `needed` response cards, refetching
    /// from the store as often as necessary. Deck contents are never
    /// projected to viewers, so doing this ahead of the deal keeps a
    /// store failure unobservable.
    async fn refill_responses(
        deck: &mut Deck,
        needed: usize,
        store: &dyn CardStore,
    ) -> Result<(), GameError> {
        while deck.len() < needed {
            let collections = store.get_cards_by_type().await?;
            if collections.responses.is_empty() {
                return Err(GameError::NoCardsAvailable);
            }
            deck.refill(collections.responses);
        }
        Ok(())
    }

    async fn refill_prompts(
        deck: &mut Deck,
        needed: usize,
        store: &dyn CardStore,
    ) -> Result<(), GameError> {
        while deck.len() < needed {
            let collections = store.get_cards_by_type().await?;
            if collections.prompts.is_empty() {
                return Err(GameError::NoCardsAvailable);
            }
            deck.refill(collections.prompts);
        }
        Ok(())
    }
}
