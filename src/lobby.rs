//! Player registration, matchmaking queues and running sessions.
//!
//! The lobby sits behind one mutex and every session behind its own. Code
//! that needs both always takes the lobby lock first; a session lock is never
//! held while acquiring the lobby.

use std::array::from_fn;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use crate::action::PlayerId;
use crate::card::{MAX_PLAYERS, MIN_PLAYERS};
use crate::config::GameOptions;
use crate::error::GameError;
use crate::game::Game;
use crate::pile::Pile;
use crate::protocol::{ErrorCode, Features, PlayerTable, ServerMessage, Standing};
use crate::visualize::{MessageSink, describe_message};

pub type ConnectionId = u64;
pub type SessionId = u64;
pub type SharedLobby = Arc<Mutex<Lobby>>;
pub type SharedSession = Arc<Mutex<Session>>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LobbyError {
    #[error("name {0:?} is already in use")]
    NameTaken(String),
    #[error("connection is already registered")]
    AlreadyRegistered,
    #[error("connection has not introduced itself")]
    NotRegistered,
    #[error("player count {0} is outside the supported range")]
    InvalidSize(usize),
    #[error("player is already waiting for a game")]
    AlreadyQueued,
    #[error("player is already in a game")]
    AlreadyStarted,
    #[error("player is not in a running game")]
    NoSession,
    #[error("failed to set up game: {0}")]
    Game(#[from] GameError),
}

impl LobbyError {
    pub fn code(&self) -> ErrorCode {
        match self {
            LobbyError::NameTaken(_) => ErrorCode::NameInUse,
            LobbyError::InvalidSize(_) => ErrorCode::InvalidCommand,
            LobbyError::AlreadyRegistered
            | LobbyError::NotRegistered
            | LobbyError::AlreadyQueued
            | LobbyError::AlreadyStarted
            | LobbyError::NoSession
            | LobbyError::Game(_) => ErrorCode::CommandNotAllowed,
        }
    }
}

/// Write side of one client connection.
#[derive(Clone, Debug)]
pub struct ClientHandle {
    id: ConnectionId,
    outbox: UnboundedSender<ServerMessage>,
}

impl ClientHandle {
    pub fn new(id: ConnectionId, outbox: UnboundedSender<ServerMessage>) -> Self {
        Self { id, outbox }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queues a message for the writer task. Returns false once the
    /// connection is gone; its disconnect path cleans up.
    pub fn send(&self, message: ServerMessage) -> bool {
        self.outbox.send(message).is_ok()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SessionState {
    Active,
    /// A winner was declared.
    Finished,
    /// A member disconnected mid-game.
    TornDown,
}

#[derive(Debug)]
struct Member {
    name: String,
    handle: ClientHandle,
}

/// The connections bound to one game. Seat order equals player id.
pub struct Session {
    id: SessionId,
    members: Vec<Member>,
    game: Game,
    state: SessionState,
    sink: Arc<dyn MessageSink>,
}

impl Session {
    fn new(
        id: SessionId,
        members: Vec<Member>,
        game: Game,
        sink: Arc<dyn MessageSink>,
    ) -> Self {
        Self {
            id,
            members,
            game,
            state: SessionState::Active,
            sink,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut Game {
        &mut self.game
    }

    pub fn member_names(&self) -> Vec<String> {
        self.members.iter().map(|m| m.name.clone()).collect()
    }

    pub fn player_id(&self, name: &str) -> Option<PlayerId> {
        self.members.iter().position(|m| m.name == name)
    }

    pub fn name_of(&self, player: PlayerId) -> Option<&str> {
        self.members.get(player).map(|m| m.name.as_str())
    }

    pub fn broadcast(&self, message: ServerMessage) {
        self.sink.record(None, &describe_message(&message));
        for member in &self.members {
            member.handle.send(message.clone());
        }
    }

    pub fn send_to(&self, player: PlayerId, message: ServerMessage) {
        if let Some(member) = self.members.get(player) {
            self.sink
                .record(Some(&member.name), &describe_message(&message));
            member.handle.send(message);
        }
    }

    pub fn hand_message(&self, player: PlayerId) -> Result<ServerMessage, GameError> {
        Ok(ServerMessage::Hand {
            cards: self.game.hand(player)?.faces(),
        })
    }

    /// `None` once the player's stock is empty.
    pub fn stock_message(&self, player: PlayerId) -> Option<ServerMessage> {
        let card = self.game.stock_top(player)?;
        let name = self.name_of(player)?;
        Some(ServerMessage::Stock {
            player: name.to_string(),
            card,
        })
    }

    pub fn table_message(&self) -> ServerMessage {
        let building_piles = from_fn(|idx| {
            self.game
                .building_pile(idx)
                .filter(|pile| !pile.is_empty())
                .and_then(|pile| pile.next_value())
        });
        let players = self
            .members
            .iter()
            .enumerate()
            .map(|(id, member)| PlayerTable {
                name: member.name.clone(),
                discard_tops: self.game.discard_tops(id),
            })
            .collect();
        ServerMessage::Table {
            building_piles,
            players,
        }
    }

    pub fn turn_message(&self) -> Option<ServerMessage> {
        self.name_of(self.game.current_player())
            .map(|name| ServerMessage::Turn {
                player: name.to_string(),
            })
    }

    pub fn standings(&self) -> Vec<Standing> {
        let scores = self.game.scores();
        self.members
            .iter()
            .zip(scores)
            .map(|(member, score)| Standing {
                name: member.name.clone(),
                score: *score,
            })
            .collect()
    }

    /// TABLE to everyone, then each member's own HAND.
    pub fn broadcast_table_and_hands(&self) -> Result<(), GameError> {
        self.broadcast(self.table_message());
        for player in 0..self.members.len() {
            self.send_to(player, self.hand_message(player)?);
        }
        Ok(())
    }

    /// Full state after a deal: TABLE, every HAND, every STOCK, then TURN.
    pub fn announce_deal(&self) -> Result<(), GameError> {
        self.broadcast_table_and_hands()?;
        for player in 0..self.members.len() {
            if let Some(stock) = self.stock_message(player) {
                self.broadcast(stock);
            }
        }
        if let Some(turn) = self.turn_message() {
            self.broadcast(turn);
        }
        Ok(())
    }

    pub fn finish(&mut self) {
        self.state = SessionState::Finished;
    }

    /// Marks the session dead and tells everyone but `leaver`.
    fn tear_down(&mut self, leaver: &str) -> Vec<String> {
        self.state = SessionState::TornDown;
        let message = ServerMessage::error(ErrorCode::PlayerDisconnected);
        let mut remaining = Vec::with_capacity(self.members.len());
        for member in self.members.iter().filter(|m| m.name != leaver) {
            self.sink
                .record(Some(&member.name), &describe_message(&message));
            member.handle.send(message.clone());
            remaining.push(member.name.clone());
        }
        remaining
    }
}

#[derive(Clone)]
enum ClientStatus {
    Idle,
    Queued(usize),
    Playing {
        session_id: SessionId,
        session: SharedSession,
    },
}

struct Client {
    handle: ClientHandle,
    status: ClientStatus,
}

/// Registry of every named connection.
pub struct Lobby {
    clients: HashMap<String, Client>,
    /// Waiting names per requested player count, in arrival order.
    queues: BTreeMap<usize, Vec<String>>,
    next_session_id: SessionId,
    options: GameOptions,
    sink: Arc<dyn MessageSink>,
}

impl Lobby {
    pub fn new(options: GameOptions, sink: Arc<dyn MessageSink>) -> Self {
        Self {
            clients: HashMap::new(),
            queues: BTreeMap::new(),
            next_session_id: 1,
            options,
            sink,
        }
    }

    pub fn shared(options: GameOptions, sink: Arc<dyn MessageSink>) -> SharedLobby {
        Arc::new(Mutex::new(Self::new(options, sink)))
    }

    pub fn sink(&self) -> Arc<dyn MessageSink> {
        Arc::clone(&self.sink)
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn queued(&self, players: usize) -> usize {
        self.queues.get(&players).map_or(0, Vec::len)
    }

    pub fn is_idle(&self, name: &str) -> bool {
        matches!(
            self.clients.get(name).map(|c| &c.status),
            Some(ClientStatus::Idle)
        )
    }

    /// Claims `name` for the connection and answers with WELCOME.
    pub fn register(
        &mut self,
        name: &str,
        handle: ClientHandle,
        _features: &Features,
    ) -> Result<(), LobbyError> {
        if self.clients.values().any(|c| c.handle.id() == handle.id()) {
            return Err(LobbyError::AlreadyRegistered);
        }
        if self.clients.contains_key(name) {
            return Err(LobbyError::NameTaken(name.to_string()));
        }
        let welcome = ServerMessage::Welcome {
            name: name.to_string(),
            features: Features::none(),
        };
        self.sink.record(Some(name), &describe_message(&welcome));
        handle.send(welcome);
        self.clients.insert(
            name.to_string(),
            Client {
                handle,
                status: ClientStatus::Idle,
            },
        );
        info!(player = %name, "player registered");
        Ok(())
    }

    /// Queues `name` for a game of `players` and starts one as soon as
    /// enough players wait for the same size.
    pub fn set_required_size(
        &mut self,
        name: &str,
        players: usize,
    ) -> Result<Option<SharedSession>, LobbyError> {
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&players) {
            return Err(LobbyError::InvalidSize(players));
        }
        let client = self.clients.get(name).ok_or(LobbyError::NotRegistered)?;
        match client.status {
            ClientStatus::Idle => {}
            ClientStatus::Queued(_) => return Err(LobbyError::AlreadyQueued),
            ClientStatus::Playing { .. } => return Err(LobbyError::AlreadyStarted),
        }
        // The game is built before any lobby state changes so a failure
        // leaves the queue as it was.
        let waiting = self.queued(players);
        let game = if waiting + 1 >= players {
            Some(self.options.build_game(players, self.next_session_id)?)
        } else {
            None
        };

        let client = self
            .clients
            .get_mut(name)
            .ok_or(LobbyError::NotRegistered)?;
        client.status = ClientStatus::Queued(players);
        self.sink
            .record(Some(name), &describe_message(&ServerMessage::Queue));
        client.handle.send(ServerMessage::Queue);
        let queue = self.queues.entry(players).or_default();
        queue.push(name.to_string());
        debug!(player = %name, players, waiting = queue.len(), "player queued");

        match game {
            Some(game) => self.start_session(players, game).map(Some),
            None => Ok(None),
        }
    }

    fn start_session(&mut self, players: usize, game: Game) -> Result<SharedSession, LobbyError> {
        let id = self.next_session_id;
        self.next_session_id += 1;

        let names: Vec<String> = self
            .queues
            .get_mut(&players)
            .map(|queue| queue.drain(..players).collect())
            .unwrap_or_default();
        let members: Vec<Member> = names
            .iter()
            .filter_map(|name| {
                self.clients.get(name).map(|client| Member {
                    name: name.clone(),
                    handle: client.handle.clone(),
                })
            })
            .collect();
        let session = Arc::new(Mutex::new(Session::new(
            id,
            members,
            game,
            Arc::clone(&self.sink),
        )));
        for name in &names {
            if let Some(client) = self.clients.get_mut(name) {
                client.status = ClientStatus::Playing {
                    session_id: id,
                    session: Arc::clone(&session),
                };
            }
        }

        {
            let guard = session.lock();
            guard.broadcast(ServerMessage::Start {
                players: guard.member_names(),
            });
            guard.announce_deal()?;
        }
        info!(session = id, players = ?names, "session started");
        Ok(session)
    }

    pub fn session_of(&self, name: &str) -> Result<SharedSession, LobbyError> {
        let client = self.clients.get(name).ok_or(LobbyError::NotRegistered)?;
        match &client.status {
            ClientStatus::Playing { session, .. } => Ok(Arc::clone(session)),
            ClientStatus::Idle | ClientStatus::Queued(_) => Err(LobbyError::NoSession),
        }
    }

    /// Returns every member of a finished session to the idle state.
    pub fn release_session(&mut self, session_id: SessionId) {
        for client in self.clients.values_mut() {
            if matches!(client.status, ClientStatus::Playing { session_id: id, .. } if id == session_id)
            {
                client.status = ClientStatus::Idle;
            }
        }
        debug!(session = session_id, "session released");
    }

    /// Drops a disconnected player. A game they were playing is torn down
    /// and the other members return to the idle state.
    pub fn remove(&mut self, name: &str) {
        let Some(client) = self.clients.remove(name) else {
            return;
        };
        match client.status {
            ClientStatus::Idle => {}
            ClientStatus::Queued(players) => {
                if let Some(queue) = self.queues.get_mut(&players) {
                    queue.retain(|queued| queued != name);
                }
            }
            ClientStatus::Playing {
                session_id,
                session,
            } => {
                let remaining = {
                    let mut guard = session.lock();
                    if guard.is_active() {
                        guard.tear_down(name)
                    } else {
                        Vec::new()
                    }
                };
                if !remaining.is_empty() {
                    info!(session = session_id, player = %name, "session torn down");
                }
                self.release_session(session_id);
            }
        }
        info!(player = %name, "player removed");
    }
}
