//! Multiplayer Skip-Bo game server: rules engine, line protocol, lobby and
//! TCP front end.

pub mod action;
pub mod card;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod game;
pub mod lobby;
pub mod pile;
pub mod protocol;
pub mod score;
pub mod server;
pub mod state;
pub mod telemetry;
pub mod visualize;

pub use crate::action::{CardAction, PlayerId};
pub use crate::card::{Card, CardColor, CardId, Face, cards_from_faces, full_deck};
pub use crate::config::{GameOptions, ServerConfig};
pub use crate::dispatch::{DispatchError, Dispatcher, resolve_action};
pub use crate::error::{GameError, InvalidMove, PileError};
pub use crate::game::{Game, GameBuilder, GameConfig, MoveOutcome};
pub use crate::lobby::{
    ClientHandle, Lobby, LobbyError, Session, SessionState, SharedLobby, SharedSession,
};
pub use crate::pile::{BuildingPile, Deck, DiscardPile, Hand, Pile, StockPile};
pub use crate::protocol::{
    ClientCommand, ErrorCode, Feature, Features, PlayerTable, Position, ProtocolError,
    ServerMessage, Standing,
};
pub use crate::score::{RoundResult, TARGET_SCORE, winner_points};
pub use crate::server::{ServerContext, ServerError, ServerHandle, start};
pub use crate::state::{BuildPileView, GamePhase, GameSettings, GameView, PlayerPublicState};
pub use crate::visualize::{MessageSink, TracingSink, describe_message};
