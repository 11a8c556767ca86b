use serde::{Deserialize, Serialize};

use crate::card::{BUILD_PILE_COUNT, Card, DISCARD_PILE_COUNT};
use crate::error::{GameError, InvalidMove};
use crate::game::Game;
use crate::pile::Pile;

/// Zero-based index of a player within the game.
pub type PlayerId = usize;

/// One card movement a player may request during their turn.
///
/// Validation and execution are split so that a batch can be fully checked
/// before anything is mutated.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum CardAction {
    /// Play a specific hand card onto a building pile.
    HandToBuildingPile { card: Card, building_pile: usize },
    /// Put a specific hand card on one of the player's discard piles.
    HandToDiscardPile { card: Card, discard_pile: usize },
    /// Play the top of the stock pile onto a building pile.
    StockToBuildingPile { building_pile: usize },
    /// Play the top of a discard pile onto a building pile.
    DiscardToBuildingPile {
        discard_pile: usize,
        building_pile: usize,
    },
}

impl CardAction {
    pub fn is_discard(&self) -> bool {
        matches!(self, CardAction::HandToDiscardPile { .. })
    }

    pub fn is_valid(&self, game: &Game, player: PlayerId) -> bool {
        self.validate(game, player).is_ok()
    }

    /// Checks the move against the current state without touching it.
    pub fn validate(&self, game: &Game, player: PlayerId) -> Result<(), InvalidMove> {
        let state = game
            .player_state(player)
            .ok_or(InvalidMove::UnknownPlayer(player))?;
        match self {
            CardAction::HandToBuildingPile {
                card,
                building_pile,
            } => {
                if !state.hand.contains(card) {
                    return Err(InvalidMove::CardNotInHand);
                }
                check_building_pile(game, *building_pile, card)
            }
            CardAction::HandToDiscardPile { card, discard_pile } => {
                if !state.hand.contains(card) {
                    return Err(InvalidMove::CardNotInHand);
                }
                if *discard_pile >= DISCARD_PILE_COUNT {
                    return Err(InvalidMove::DiscardIndex(*discard_pile));
                }
                Ok(())
            }
            CardAction::StockToBuildingPile { building_pile } => {
                let card = state.stock.top_card().ok_or(InvalidMove::NoCardAvailable)?;
                check_building_pile(game, *building_pile, card)
            }
            CardAction::DiscardToBuildingPile {
                discard_pile,
                building_pile,
            } => {
                let pile = state
                    .discard_piles
                    .get(*discard_pile)
                    .ok_or(InvalidMove::DiscardIndex(*discard_pile))?;
                let card = pile.top_card().ok_or(InvalidMove::NoCardAvailable)?;
                check_building_pile(game, *building_pile, card)
            }
        }
    }

    /// Moves the card. Only call after [`CardAction::validate`] succeeded; a
    /// failure here means the two disagree.
    pub(crate) fn execute(&self, game: &mut Game, player: PlayerId) -> Result<(), GameError> {
        match *self {
            CardAction::HandToBuildingPile {
                card,
                building_pile,
            } => {
                let card = game.player_state_mut(player)?.hand.remove(&card)?;
                game.building_pile_mut(building_pile)?.add(card);
            }
            CardAction::HandToDiscardPile { card, discard_pile } => {
                let state = game.player_state_mut(player)?;
                let pile = state
                    .discard_piles
                    .get_mut(discard_pile)
                    .ok_or(InvalidMove::DiscardIndex(discard_pile))?;
                let card = state.hand.remove(&card)?;
                pile.add(card);
            }
            CardAction::StockToBuildingPile { building_pile } => {
                let card = game.player_state_mut(player)?.stock.remove_top()?;
                game.building_pile_mut(building_pile)?.add(card);
            }
            CardAction::DiscardToBuildingPile {
                discard_pile,
                building_pile,
            } => {
                let card = game
                    .player_state_mut(player)?
                    .discard_piles
                    .get_mut(discard_pile)
                    .ok_or(InvalidMove::DiscardIndex(discard_pile))?
                    .remove_top()?;
                game.building_pile_mut(building_pile)?.add(card);
            }
        }
        Ok(())
    }
}

fn check_building_pile(game: &Game, index: usize, card: &Card) -> Result<(), InvalidMove> {
    if index >= BUILD_PILE_COUNT {
        return Err(InvalidMove::BuildPileIndex(index));
    }
    let pile = game
        .building_pile(index)
        .ok_or(InvalidMove::BuildPileIndex(index))?;
    if pile.can_accept(card) {
        return Ok(());
    }
    // Full piles are cleared right after the move that fills them, so a
    // rejected card always had a concrete number to match.
    Err(InvalidMove::CardMismatch {
        required: pile.next_value().unwrap_or(1),
    })
}
