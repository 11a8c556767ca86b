use std::fmt::Write;

use tracing::debug;

use crate::card::Face;
use crate::protocol::{Position, ServerMessage, Standing};

/// Receives a human-readable line for every message the server sends.
pub trait MessageSink: Send + Sync {
    /// `to` names the recipient, or is `None` for a session-wide broadcast.
    fn record(&self, to: Option<&str>, text: &str);
}

/// Default sink: logs each projection at debug level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl MessageSink for TracingSink {
    fn record(&self, to: Option<&str>, text: &str) {
        debug!(to = to.unwrap_or("*"), "{text}");
    }
}

/// One-line English rendering of a server message.
pub fn describe_message(message: &ServerMessage) -> String {
    match message {
        ServerMessage::Welcome { name, .. } => format!("Welcome, {name}"),
        ServerMessage::Queue => String::from("Waiting for more players"),
        ServerMessage::Start { players } => format!("Game started with {}", players.join(", ")),
        ServerMessage::Turn { player } => format!("It is {player}'s turn"),
        ServerMessage::Hand { cards } => {
            let hand = cards
                .iter()
                .map(Face::to_string)
                .collect::<Vec<_>>()
                .join(" ");
            if hand.is_empty() {
                String::from("Your hand is empty")
            } else {
                format!("Your hand: {hand}")
            }
        }
        ServerMessage::Stock { player, card } => format!("{player}'s stock shows {card}"),
        ServerMessage::Table {
            building_piles,
            players,
        } => {
            let mut out = String::from("Building piles:");
            for (idx, pile) in building_piles.iter().enumerate() {
                match pile {
                    Some(next) => {
                        let _ = write!(out, " [{idx}] needs {next}");
                    }
                    None => {
                        let _ = write!(out, " [{idx}] empty");
                    }
                }
            }
            for player in players {
                let tops = player
                    .discard_tops
                    .iter()
                    .map(|top| face_or_dash(*top))
                    .collect::<Vec<_>>()
                    .join(" ");
                let _ = write!(out, "; {} discards {tops}", player.name);
            }
            out
        }
        ServerMessage::Play { from, to, player } => {
            format!(
                "{player} moved {} to {}",
                describe_position(from),
                describe_position(to)
            )
        }
        ServerMessage::Round { scores } => format!("Round over. {}", describe_standings(scores)),
        ServerMessage::Winner { scores } => {
            let leader = scores
                .iter()
                .max_by_key(|standing| standing.score)
                .map(|standing| standing.name.as_str())
                .unwrap_or("nobody");
            format!("{leader} wins the game! {}", describe_standings(scores))
        }
        ServerMessage::Error { code } => format!("Error {}: {code:?}", code.as_str()),
    }
}

fn describe_position(position: &Position) -> String {
    match position {
        Position::Stock => String::from("stock pile"),
        Position::Hand(None) => String::from("hand"),
        Position::Hand(Some(face)) => format!("hand card {face}"),
        Position::Building(idx) => format!("building pile {idx}"),
        Position::Discard(idx) => format!("discard pile {idx}"),
    }
}

fn describe_standings(scores: &[Standing]) -> String {
    let parts = scores
        .iter()
        .map(|standing| format!("{} {}", standing.name, standing.score))
        .collect::<Vec<_>>();
    format!("Scores: {}", parts.join(", "))
}

fn face_or_dash(face: Option<Face>) -> String {
    face.map(|face| face.to_string())
        .unwrap_or_else(|| String::from("--"))
}
