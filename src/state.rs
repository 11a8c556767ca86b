use serde::{Deserialize, Serialize};

use crate::action::PlayerId;
use crate::card::{
    BUILD_PILE_COUNT, Card, DISCARD_PILE_COUNT, Face, HAND_SIZE, MAX_PLAYERS, MIN_PLAYERS,
    STOCK_SIZE_LARGE_GAME, STOCK_SIZE_SMALL_GAME,
};
use crate::error::GameError;
use crate::score::TARGET_SCORE;

/// Global constants for a running game.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameSettings {
    pub num_players: usize,
    pub stock_size: usize,
    pub hand_size: usize,
    pub discard_piles: usize,
    pub build_piles: usize,
    pub target_score: u32,
}

impl GameSettings {
    pub fn new(num_players: usize) -> Result<Self, GameError> {
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&num_players) {
            return Err(GameError::InvalidConfiguration(
                "players must be between 2 and 6",
            ));
        }
        Ok(Self {
            num_players,
            stock_size: default_stock_size(num_players),
            hand_size: HAND_SIZE,
            discard_piles: DISCARD_PILE_COUNT,
            build_piles: BUILD_PILE_COUNT,
            target_score: TARGET_SCORE,
        })
    }
}

/// Standard deal: 30 cards for up to 4 players, otherwise 20.
pub fn default_stock_size(num_players: usize) -> usize {
    if num_players <= 4 {
        STOCK_SIZE_SMALL_GAME
    } else {
        STOCK_SIZE_LARGE_GAME
    }
}

/// Where the engine is in its round/turn cycle.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum GamePhase {
    /// The current player may move or end their turn.
    AwaitingMove,
    /// A stock pile was emptied; the next round has not been dealt yet.
    RoundOver,
    /// Somebody reached the target score.
    GameOver,
}

/// Public information regarding a build pile.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildPileView {
    pub size: usize,
    pub next_value: Option<u8>,
}

impl BuildPileView {
    pub fn empty() -> Self {
        Self {
            size: 0,
            next_value: Some(1),
        }
    }
}

/// Portion of a player's state that all opponents may observe.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerPublicState {
    pub id: PlayerId,
    pub stock_count: usize,
    pub stock_top: Option<Face>,
    pub discard_tops: [Option<Face>; DISCARD_PILE_COUNT],
    pub discard_counts: [usize; DISCARD_PILE_COUNT],
    pub hand_size: usize,
    pub score: u32,
    pub is_current: bool,
}

/// Snapshot of the game from one player's seat.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameView {
    pub settings: GameSettings,
    pub phase: GamePhase,
    pub round: u32,
    pub self_player: PlayerId,
    pub current_player: PlayerId,
    pub draw_pile_count: usize,
    pub recycle_pile_count: usize,
    pub build_piles: [BuildPileView; BUILD_PILE_COUNT],
    pub players: Vec<PlayerPublicState>,
    pub hand: Vec<Card>,
}
