//! Turns decoded client commands into lobby and engine calls and fans the
//! results back out to the session.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::action::{CardAction, PlayerId};
use crate::error::GameError;
use crate::game::Game;
use crate::lobby::{ClientHandle, LobbyError, SharedLobby};
use crate::protocol::{ClientCommand, ErrorCode, Features, Position, ServerMessage};
use crate::visualize::{MessageSink, describe_message};

/// Conditions that end the connection's worker.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("engine invariant violated: {0}")]
    Engine(#[from] GameError),
}

/// Internal split between errors reported to the requester and fatal ones.
enum Failure {
    Reject(ErrorCode),
    Fatal(DispatchError),
}

impl From<ErrorCode> for Failure {
    fn from(code: ErrorCode) -> Self {
        Failure::Reject(code)
    }
}

impl From<LobbyError> for Failure {
    fn from(err: LobbyError) -> Self {
        match err {
            LobbyError::Game(err) => Failure::Fatal(DispatchError::Engine(err)),
            other => Failure::Reject(other.code()),
        }
    }
}

impl From<GameError> for Failure {
    fn from(err: GameError) -> Self {
        if !err.is_rejection() {
            return Failure::Fatal(DispatchError::Engine(err));
        }
        match err {
            GameError::InvalidMove(_) => Failure::Reject(ErrorCode::InvalidMove),
            _ => Failure::Reject(ErrorCode::CommandNotAllowed),
        }
    }
}

/// Per-connection command handler.
pub struct Dispatcher {
    lobby: SharedLobby,
    handle: ClientHandle,
    name: Option<String>,
    sink: Arc<dyn MessageSink>,
}

impl Dispatcher {
    pub fn new(lobby: SharedLobby, handle: ClientHandle) -> Self {
        let sink = lobby.lock().sink();
        Self {
            lobby,
            handle,
            name: None,
            sink,
        }
    }

    /// Name claimed with HELLO, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Handles one inbound line. Bad input is answered with an ERROR and is
    /// not an error here.
    pub fn handle_line(&mut self, line: &str) -> Result<(), DispatchError> {
        match line.parse::<ClientCommand>() {
            Ok(command) => self.handle_command(command),
            Err(err) => {
                debug!(connection = self.handle.id(), error = %err, "undecodable line");
                self.reply(ServerMessage::error(ErrorCode::from(&err)));
                Ok(())
            }
        }
    }

    pub fn handle_command(&mut self, command: ClientCommand) -> Result<(), DispatchError> {
        let keyword = command.keyword();
        let result = match command {
            ClientCommand::Hello { name, features } => self.hello(name, &features),
            ClientCommand::Game { players } => self.join_queue(players),
            ClientCommand::Play { from, to } => self.play(from, to),
            ClientCommand::End => self.end_turn(),
            ClientCommand::Hand => self.show_hand(),
            ClientCommand::Table => self.show_table(),
        };
        match result {
            Ok(()) => Ok(()),
            Err(Failure::Reject(code)) => {
                debug!(
                    connection = self.handle.id(),
                    command = keyword,
                    code = code.as_str(),
                    "command rejected"
                );
                self.reply(ServerMessage::error(code));
                Ok(())
            }
            Err(Failure::Fatal(err)) => Err(err),
        }
    }

    /// Reports a rejected request that never reached the decoder.
    pub fn reject(&self, code: ErrorCode) {
        self.reply(ServerMessage::error(code));
    }

    /// Releases the name and tears down any running game.
    pub fn disconnect(&mut self) {
        if let Some(name) = self.name.take() {
            self.lobby.lock().remove(&name);
        }
    }

    fn reply(&self, message: ServerMessage) {
        self.sink.record(self.name(), &describe_message(&message));
        self.handle.send(message);
    }

    fn registered_name(&self) -> Result<String, Failure> {
        self.name
            .clone()
            .ok_or(Failure::Reject(ErrorCode::CommandNotAllowed))
    }

    fn hello(&mut self, name: String, features: &Features) -> Result<(), Failure> {
        if self.name.is_some() {
            return Err(LobbyError::AlreadyRegistered.into());
        }
        self.lobby
            .lock()
            .register(&name, self.handle.clone(), features)?;
        self.name = Some(name);
        Ok(())
    }

    fn join_queue(&mut self, players: usize) -> Result<(), Failure> {
        let name = self.registered_name()?;
        self.lobby.lock().set_required_size(&name, players)?;
        Ok(())
    }

    fn play(&mut self, from: Position, to: Position) -> Result<(), Failure> {
        let name = self.registered_name()?;
        let shared = self.lobby.lock().session_of(&name)?;
        let mut session = shared.lock();
        if !session.is_active() {
            return Err(ErrorCode::CommandNotAllowed.into());
        }
        let player = session
            .player_id(&name)
            .ok_or(ErrorCode::CommandNotAllowed)?;
        if session.game().current_player() != player {
            return Err(ErrorCode::CommandNotAllowed.into());
        }
        let action =
            resolve_action(session.game(), player, from, to).ok_or(ErrorCode::InvalidMove)?;
        let outcome = session.game_mut().apply_move(player, action)?;
        debug!(session = session.id(), player = %name, ?action, "move applied");

        session.broadcast(ServerMessage::Play {
            from,
            to,
            player: name.clone(),
        });
        if matches!(action, CardAction::StockToBuildingPile { .. }) {
            if let Some(stock) = session.stock_message(player) {
                session.broadcast(stock);
            }
        }
        session.broadcast_table_and_hands()?;

        let Some(result) = outcome.round else {
            return Ok(());
        };
        let standings = session.standings();
        if result.game_over {
            session.broadcast(ServerMessage::Winner { scores: standings });
            session.finish();
            let session_id = session.id();
            drop(session);
            self.lobby.lock().release_session(session_id);
            info!(session = session_id, winner = %name, "game over");
        } else {
            session.broadcast(ServerMessage::Round { scores: standings });
            session.game_mut().start_next_round()?;
            session.announce_deal()?;
            info!(
                session = session.id(),
                round = result.round,
                winner = %name,
                points = result.points,
                "round finished"
            );
        }
        Ok(())
    }

    fn end_turn(&mut self) -> Result<(), Failure> {
        let name = self.registered_name()?;
        let shared = self.lobby.lock().session_of(&name)?;
        let mut session = shared.lock();
        if !session.is_active() {
            return Err(ErrorCode::CommandNotAllowed.into());
        }
        let player = session
            .player_id(&name)
            .ok_or(ErrorCode::CommandNotAllowed)?;
        let next = session.game_mut().end_turn(player)?;

        if let Some(turn) = session.turn_message() {
            session.broadcast(turn);
        }
        session.send_to(next, session.hand_message(next)?);
        if let Some(stock) = session.stock_message(next) {
            session.broadcast(stock);
        }
        Ok(())
    }

    fn show_hand(&mut self) -> Result<(), Failure> {
        let name = self.registered_name()?;
        let shared = self.lobby.lock().session_of(&name)?;
        let session = shared.lock();
        let player = session
            .player_id(&name)
            .ok_or(ErrorCode::CommandNotAllowed)?;
        session.send_to(player, session.hand_message(player)?);
        Ok(())
    }

    fn show_table(&mut self) -> Result<(), Failure> {
        let name = self.registered_name()?;
        let shared = self.lobby.lock().session_of(&name)?;
        let session = shared.lock();
        let player = session
            .player_id(&name)
            .ok_or(ErrorCode::CommandNotAllowed)?;
        session.send_to(player, session.table_message());
        Ok(())
    }
}

/// Maps wire positions onto a move, picking a concrete hand card that shows
/// the requested face. `None` when the pair of positions is not a move shape
/// or the hand has no such card.
pub fn resolve_action(
    game: &Game,
    player: PlayerId,
    from: Position,
    to: Position,
) -> Option<CardAction> {
    match (from, to) {
        (Position::Hand(Some(face)), Position::Building(building_pile)) => {
            let card = game.hand(player).ok()?.find_face(face)?;
            Some(CardAction::HandToBuildingPile {
                card,
                building_pile,
            })
        }
        (Position::Hand(Some(face)), Position::Discard(discard_pile)) => {
            let card = game.hand(player).ok()?.find_face(face)?;
            Some(CardAction::HandToDiscardPile { card, discard_pile })
        }
        (Position::Stock, Position::Building(building_pile)) => {
            Some(CardAction::StockToBuildingPile { building_pile })
        }
        (Position::Discard(discard_pile), Position::Building(building_pile)) => {
            Some(CardAction::DiscardToBuildingPile {
                discard_pile,
                building_pile,
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{InvalidMove, PileError};

    #[test]
    fn engine_rejections_map_to_wire_codes() {
        assert!(matches!(
            Failure::from(GameError::NotPlayersTurn),
            Failure::Reject(ErrorCode::CommandNotAllowed)
        ));
        assert!(matches!(
            Failure::from(GameError::RoundOver),
            Failure::Reject(ErrorCode::CommandNotAllowed)
        ));
        assert!(matches!(
            Failure::from(GameError::InvalidMove(InvalidMove::NoCardAvailable)),
            Failure::Reject(ErrorCode::InvalidMove)
        ));
        assert!(matches!(
            Failure::from(GameError::Pile(PileError::Empty("stock pile"))),
            Failure::Fatal(DispatchError::Engine(GameError::Pile(_)))
        ));
        assert!(matches!(
            Failure::from(GameError::RoundInProgress),
            Failure::Fatal(_)
        ));
    }
}
