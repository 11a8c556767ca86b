use thiserror::Error;

use crate::action::PlayerId;

/// Errors that can occur when manipulating the game state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("player index {0} is out of range")]
    InvalidPlayer(PlayerId),
    #[error("not the specified player's turn")]
    NotPlayersTurn,
    #[error("invalid move: {0}")]
    InvalidMove(#[from] InvalidMove),
    #[error("round is over, waiting for the next deal")]
    RoundOver,
    #[error("the current round has not finished yet")]
    RoundInProgress,
    #[error("game is already over")]
    GameOver,
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(&'static str),
    #[error("engine invariant violated: {0}")]
    Pile(#[from] PileError),
}

impl GameError {
    /// Rejections leave the engine untouched and are reported back to the
    /// requesting player. Everything else points at a broken invariant.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            GameError::NotPlayersTurn
                | GameError::InvalidMove(_)
                | GameError::RoundOver
                | GameError::GameOver
        )
    }
}

/// Details of illegal moves.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidMove {
    #[error("player index {0} is not seated")]
    UnknownPlayer(PlayerId),
    #[error("card is not in the player's hand")]
    CardNotInHand,
    #[error("discard pile index {0} is out of range")]
    DiscardIndex(usize),
    #[error("build pile index {0} is out of range")]
    BuildPileIndex(usize),
    #[error("no card available in the selected source")]
    NoCardAvailable,
    #[error("card does not match required value {required}")]
    CardMismatch { required: u8 },
    #[error("the round ended before every move in the batch was applied")]
    RoundEndedMidBatch,
}

/// Precondition violations on the pile primitives. Callers check emptiness
/// first, so seeing one of these means the engine is inconsistent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PileError {
    #[error("cannot take a card from an empty {0}")]
    Empty(&'static str),
    #[error("card is not part of the {0}")]
    Missing(&'static str),
}
