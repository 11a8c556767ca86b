//! Round scoring for multi-round Skip-Bo.
//!
//! Only the round winner scores:
//!   points = 25 (base win) + 5 * (sum of opponents' remaining stock cards)
//! Scores accumulate across rounds until someone reaches the target (500).

use serde::{Deserialize, Serialize};

use crate::action::PlayerId;

pub const TARGET_SCORE: u32 = 500;
pub const ROUND_WIN_BONUS: u32 = 25;
pub const POINTS_PER_STOCK_CARD: u32 = 5;

/// Compute the round winner's points from every player's remaining stock.
///
/// `stock_counts` is indexed by player id; the winner's own entry is ignored.
pub fn winner_points(stock_counts: &[usize], winner: PlayerId) -> u32 {
    let opponents_stock_total: usize = stock_counts
        .iter()
        .enumerate()
        .filter(|(id, _)| *id != winner)
        .map(|(_, count)| *count)
        .sum();
    ROUND_WIN_BONUS + POINTS_PER_STOCK_CARD * opponents_stock_total as u32
}

/// Outcome of a finished round.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundResult {
    pub round: u32,
    pub winner: PlayerId,
    pub points: u32,
    /// Cumulative scores of all players after this round, by player id.
    pub scores: Vec<u32>,
    pub game_over: bool,
}

impl RoundResult {
    pub fn overall_winner(&self) -> Option<PlayerId> {
        self.game_over.then_some(self.winner)
    }
}
