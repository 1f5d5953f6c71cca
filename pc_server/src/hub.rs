//! The session hub actor.
//!
//! One hub owns one [`GameSession`] and every connection's outbound
//! channel. All traffic funnels through a single mpsc inbox and each
//! inbox message is processed to full completion (store awaits
//! included) before the next one is picked up, so session operations
//! never interleave. After every accepted mutation the hub projects
//! fresh views and fans them out; rejections go back only to the
//! connection that caused them.

use std::collections::HashMap;
use std::sync::Arc;

use log::{info, warn};
use tokio::sync::mpsc;

use party_cards::cards::CardStore;
use party_cards::game::{DisconnectOutcome, GameError, GameSession, GameViews, PlayerId};
use party_cards::net::{ClientCommand, ServerMessage};
use party_cards::ratings::{CardRating, RatingSink};

/// Everything a connection can tell the hub.
#[derive(Debug)]
pub enum HubMessage {
    Connect {
        conn_id: PlayerId,
        sender: mpsc::Sender<ServerMessage>,
    },
    Command {
        conn_id: PlayerId,
        command: ClientCommand,
    },
    Disconnect {
        conn_id: PlayerId,
    },
}

/// Cloneable handle for sending messages to the hub.
#[derive(Clone)]
pub struct HubHandle {
    sender: mpsc::Sender<HubMessage>,
}

impl HubHandle {
    pub async fn send(&self, message: HubMessage) -> Result<(), String> {
        self.sender
            .send(message)
            .await
            .map_err(|_| "Hub is closed".to_string())
    }
}

/// Actor hosting one game session.
pub struct SessionHub {
    /// Message inbox. The single-writer boundary for the session.
    inbox: mpsc::Receiver<HubMessage>,

    /// Created lazily on the first join; dropped when the last
    /// connection goes so the next arrival gets a fresh lobby.
    session: Option<GameSession>,

    /// Outbound channel per live connection.
    connections: HashMap<PlayerId, mpsc::Sender<ServerMessage>>,

    store: Arc<dyn CardStore>,
    ratings: Arc<dyn RatingSink>,
}

impl SessionHub {
    pub fn new(store: Arc<dyn CardStore>, ratings: Arc<dyn RatingSink>) -> (Self, HubHandle) {
        let (sender, inbox) = mpsc::channel(100);
        let hub = Self {
            inbox,
            session: None,
            connections: HashMap::new(),
            store,
            ratings,
        };
        (hub, HubHandle { sender })
    }

    /// Run until every handle is dropped.
    pub async fn run(mut self) {
        info!("Session hub started");
        while let Some(message) = self.inbox.recv().await {
            self.handle(message).await;
        }
        info!("Session hub stopped");
    }

    async fn handle(&mut self, message: HubMessage) {
        match message {
            HubMessage::Connect { conn_id, sender } => {
                self.connections.insert(conn_id, sender);
                info!("Connection {conn_id} registered");
            }
            HubMessage::Command { conn_id, command } => {
                self.handle_command(conn_id, command).await;
            }
            HubMessage::Disconnect { conn_id } => {
                self.handle_disconnect(conn_id).await;
            }
        }
    }

    async fn handle_command(&mut self, conn_id: PlayerId, command: ClientCommand) {
        if let Err(err) = command.validate() {
            self.send_error(conn_id, err.to_string()).await;
            return;
        }

        let result = match command {
            ClientCommand::Join { name } => self
                .session
                .get_or_insert_with(GameSession::new)
                .join(conn_id, name),
            ClientCommand::Start { points_to_win } => match &mut self.session {
                Some(session) => session.start(conn_id, points_to_win, &*self.store).await,
                None => Err(GameError::PlayerNotFound),
            },
            ClientCommand::SubmitCard { card_id } => match &mut self.session {
                Some(session) => session.submit_card(conn_id, card_id),
                None => Err(GameError::PlayerNotFound),
            },
            ClientCommand::PickWinner { card_id } => match &mut self.session {
                Some(session) => session.pick_winner(conn_id, card_id),
                None => Err(GameError::PlayerNotFound),
            },
            ClientCommand::NextRound => match &mut self.session {
                Some(session) => session.next_round(conn_id, &*self.store).await,
                None => Err(GameError::PlayerNotFound),
            },
            ClientCommand::PlayAgain => match &mut self.session {
                Some(session) => session.play_again(conn_id),
                None => Err(GameError::PlayerNotFound),
            },
            ClientCommand::RateCards { ratings } => {
                self.forward_ratings(conn_id, ratings);
                return;
            }
        };

        match result {
            Ok(()) => self.broadcast_views().await,
            Err(err) => self.send_error(conn_id, err.to_string()).await,
        }
    }

    async fn handle_disconnect(&mut self, conn_id: PlayerId) {
        self.connections.remove(&conn_id);

        let Some(session) = &mut self.session else {
            return;
        };
        match session.disconnect(conn_id, &*self.store).await {
            DisconnectOutcome::Updated => self.broadcast_views().await,
            DisconnectOutcome::Closed => {
                info!("Last player left; dropping the session");
                self.session = None;
            }
            DisconnectOutcome::Ignored => {}
        }
    }

    /// Ratings are best-effort telemetry: forwarded off the hot path,
    /// failures logged, never reported to the player.
    fn forward_ratings(&self, conn_id: PlayerId, ratings: Vec<CardRating>) {
        let Some(player) = self
            .session
            .as_ref()
            .and_then(|session| session.player(conn_id))
        else {
            return;
        };
        let name = player.name.clone();
        let round_number = self
            .session
            .as_ref()
            .and_then(|session| session.current_round())
            .map_or(0, |round| round.number);
        let sink = Arc::clone(&self.ratings);
        tokio::spawn(async move {
            if let Err(err) = sink.rate_cards(&name, &ratings, round_number).await {
                warn!("Rating sink rejected a batch from {name}: {err}");
            }
        });
    }

    /// Send every connected player their own projection. A full send
    /// buffer means a client that stopped reading; the frame is
    /// dropped and the socket's own disconnect path cleans up.
    async fn broadcast_views(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        let views = GameViews::of(session);
        for (id, view) in views.iter() {
            let Some(sender) = self.connections.get(id) else {
                continue;
            };
            let message = ServerMessage::GameState { state: view.clone() };
            if sender.send(message).await.is_err() {
                warn!("Dropping a game state update for {id}: channel closed");
            }
        }
    }

    async fn send_error(&self, conn_id: PlayerId, message: String) {
        let Some(sender) = self.connections.get(&conn_id) else {
            return;
        };
        if sender
            .send(ServerMessage::Error { message })
            .await
            .is_err()
        {
            warn!("Could not deliver an error to {conn_id}: channel closed");
        }
    }
}
