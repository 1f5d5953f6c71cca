//! Per-viewer projections of the session.
//!
//! The session itself is never sent anywhere. Each connected player
//! receives a [`GameView`] built for them: their own hand verbatim,
//! everyone else's hand omitted, and submissions disclosed only as far
//! as the phase allows. Everything authorship-revealing is stripped at
//! projection time, so a client cannot learn who played what before
//! the round result no matter what it inspects.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::entities::{Card, Phase, PlayerId, PlayerName};
use super::session::GameSession;

/// One roster entry as the viewer sees it. No hand.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: PlayerName,
    pub score: u32,
    pub is_host: bool,
    pub is_connected: bool,
    pub is_czar: bool,
    pub has_submitted: bool,
}

/// A submission as disclosed to viewers. Authorship (`player_id`,
/// `player_name`) is withheld until the round result.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SubmissionView {
    pub card: Card,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<PlayerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_name: Option<PlayerName>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RoundView {
    pub number: u32,
    pub czar_id: PlayerId,
    pub prompt_card: Card,
    /// Submissions received so far.
    pub submission_count: usize,
    /// Submissions the round is waiting for: connected non-czar
    /// players, recomputed at projection time.
    pub total_expected: usize,
    /// Empty during playing; cards-only in the post-shuffle order
    /// during judging; authored once the round is decided.
    pub submissions: Vec<SubmissionView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner_id: Option<PlayerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winning_card: Option<Card>,
}

/// Everything one viewer is allowed to know about the session.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct GameView {
    pub my_id: PlayerId,
    pub phase: Phase,
    pub points_to_win: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_id: Option<PlayerId>,
    pub players: Vec<PlayerView>,
    pub my_hand: Vec<Card>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<RoundView>,
}

impl GameView {
    /// Project the session for one viewer.
    #[must_use]
    pub fn of(session: &GameSession, viewer_id: PlayerId) -> Self {
        let phase = session.phase();
        let round = session.current_round();
        let czar_id = round.map(|r| r.czar_id);

        let players = session
            .players()
            .iter()
            // The lobby roster only lists who is actually present;
            // mid-game the record survives for reconnection and is
            // shown flagged instead.
            .filter(|p| phase != Phase::Lobby || p.is_connected)
            .map(|p| PlayerView {
                id: p.id,
                name: p.name.clone(),
                score: p.score,
                is_host: p.is_host,
                is_connected: p.is_connected,
                is_czar: czar_id == Some(p.id),
                has_submitted: round.is_some_and(|r| r.has_submitted(p.id)),
            })
            .collect();

        let my_hand = session
            .player(viewer_id)
            .map(|p| p.hand.clone())
            .unwrap_or_default();

        let round = round.map(|r| {
            let reveal_authors = matches!(phase, Phase::RoundResult | Phase::GameOver);
            let submissions = match phase {
                Phase::Playing => Vec::new(),
                _ => r
                    .submissions
                    .iter()
                    .map(|s| SubmissionView {
                        card: s.card.clone(),
                        player_id: reveal_authors.then_some(s.player_id),
                        player_name: reveal_authors.then(|| s.player_name.clone()),
                    })
                    .collect(),
            };
            RoundView {
                number: r.number,
                czar_id: r.czar_id,
                prompt_card: r.prompt_card.clone(),
                submission_count: r.submissions.len(),
                total_expected: session.expected_submitters(),
                submissions,
                winner_id: r.winner_id,
                winning_card: r.winning_card.clone(),
            }
        });

        Self {
            my_id: viewer_id,
            phase,
            points_to_win: session.points_to_win(),
            host_id: session.host_id(),
            players,
            my_hand,
            round,
        }
    }
}

/// Views for every connected player, keyed by identity. The hosting
/// environment fans these out after each accepted mutation.
#[derive(Clone, Debug, Default)]
pub struct GameViews(pub BTreeMap<PlayerId, GameView>);

impl GameViews {
    #[must_use]
    pub fn of(session: &GameSession) -> Self {
        Self(
            session
                .players()
                .iter()
                .filter(|p| p.is_connected)
                .map(|p| (p.id, GameView::of(session, p.id)))
                .collect(),
        )
    }

    #[must_use]
    pub fn get(&self, id: PlayerId) -> Option<&GameView> {
        self.0.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PlayerId, &GameView)> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::MemoryCardStore;
    use crate::game::constants::HAND_SIZE;
    use crate::game::entities::{CardKind, CardSource};

    fn card(id: i64, kind: CardKind) -> Card {
        Card {
            id,
            kind,
            text: format!("{kind} {id}"),
            source: CardSource::Original,
            is_top_scored: None,
        }
    }

    fn store() -> MemoryCardStore {
        MemoryCardStore::new(
            (0..10).map(|id| card(id, CardKind::Prompt)).collect(),
            (100..200).map(|id| card(id, CardKind::Response)).collect(),
        )
    }

    async fn started(names: &[&str]) -> (GameSession, Vec<PlayerId>) {
        let mut session = GameSession::new();
        let ids: Vec<PlayerId> = names
            .iter()
            .map(|name| {
                let id = PlayerId::new();
                session.join(id, (*name).into()).unwrap();
                id
            })
            .collect();
        session.start(ids[0], 5, &store()).await.unwrap();
        (session, ids)
    }

    #[tokio::test]
    async fn test_view_contains_only_own_hand() {
        let (session, ids) = started(&["a", "b", "c"]).await;
        let view = GameView::of(&session, ids[1]);
        assert_eq!(view.my_id, ids[1]);
        assert_eq!(view.my_hand.len(), HAND_SIZE);
        assert_eq!(view.my_hand, session.player(ids[1]).unwrap().hand);
        // No PlayerView field carries a hand; serialize to make sure.
        let json = serde_json::to_string(&view.players).unwrap();
        assert!(!json.contains("hand"));
    }

    #[tokio::test]
    async fn test_submissions_hidden_while_playing() {
        let (mut session, ids) = started(&["a", "b", "c"]).await;
        let played = session.player(ids[1]).unwrap().hand[0].id;
        session.submit_card(ids[1], played).unwrap();

        for &viewer in &ids {
            let round = GameView::of(&session, viewer).round.unwrap();
            assert!(round.submissions.is_empty());
            assert_eq!(round.submission_count, 1);
            assert_eq!(round.total_expected, 2);
        }
    }

    #[tokio::test]
    async fn test_judging_shows_cards_without_authors() {
        let (mut session, ids) = started(&["a", "b", "c"]).await;
        for &id in &ids[1..] {
            let played = session.player(id).unwrap().hand[0].id;
            session.submit_card(id, played).unwrap();
        }
        assert_eq!(session.phase(), Phase::Judging);

        let round = GameView::of(&session, ids[0]).round.unwrap();
        assert_eq!(round.submissions.len(), 2);
        assert!(round.submissions.iter().all(|s| s.player_name.is_none()));
        assert!(round.submissions.iter().all(|s| s.player_id.is_none()));
    }

    #[tokio::test]
    async fn test_round_result_reveals_authors_and_winner() {
        let (mut session, ids) = started(&["a", "b", "c"]).await;
        let winning = session.player(ids[1]).unwrap().hand[0].id;
        session.submit_card(ids[1], winning).unwrap();
        let other = session.player(ids[2]).unwrap().hand[0].id;
        session.submit_card(ids[2], other).unwrap();
        session.pick_winner(ids[0], winning).unwrap();

        let round = GameView::of(&session, ids[2]).round.unwrap();
        assert!(round.submissions.iter().all(|s| s.player_name.is_some()));
        assert!(round.submissions.iter().all(|s| s.player_id.is_some()));
        let winner_entry = round
            .submissions
            .iter()
            .find(|s| s.card.id == winning)
            .unwrap();
        assert_eq!(winner_entry.player_id, Some(ids[1]));
        assert_eq!(round.winner_id, Some(ids[1]));
        assert_eq!(round.winning_card.as_ref().unwrap().id, winning);
    }

    #[tokio::test]
    async fn test_czar_and_submission_flags() {
        let (mut session, ids) = started(&["a", "b", "c"]).await;
        let played = session.player(ids[1]).unwrap().hand[0].id;
        session.submit_card(ids[1], played).unwrap();

        let view = GameView::of(&session, ids[2]);
        let flag = |id: PlayerId| view.players.iter().find(|p| p.id == id).unwrap().clone();
        assert!(flag(ids[0]).is_czar);
        assert!(!flag(ids[1]).is_czar);
        assert!(flag(ids[1]).has_submitted);
        assert!(!flag(ids[2]).has_submitted);
    }

    #[tokio::test]
    async fn test_disconnected_player_flagged_mid_game() {
        let (mut session, ids) = started(&["a", "b", "c", "d"]).await;
        session.disconnect(ids[3], &store()).await;

        let view = GameView::of(&session, ids[0]);
        assert_eq!(view.players.len(), 4);
        let dropped = view.players.iter().find(|p| p.id == ids[3]).unwrap();
        assert!(!dropped.is_connected);
        // Views are only produced for connected players.
        let views = GameViews::of(&session);
        assert!(views.get(ids[3]).is_none());
        assert_eq!(views.iter().count(), 3);
    }

    #[test]
    fn test_lobby_view_omits_nothing_when_everyone_connected() {
        let mut session = GameSession::new();
        let a = PlayerId::new();
        session.join(a, "a".into()).unwrap();
        let view = GameView::of(&session, a);
        assert_eq!(view.phase, Phase::Lobby);
        assert_eq!(view.players.len(), 1);
        assert!(view.round.is_none());
        assert!(view.my_hand.is_empty());
    }
}
