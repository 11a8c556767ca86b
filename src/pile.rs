//! Card containers: the shared draw deck, per-player stock, hand and discard
//! piles, and the shared building piles.
//!
//! Every container keeps its top card at the end of the backing `Vec`.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::card::{Card, Face, HAND_SIZE, MAX_CARD_VALUE, full_deck};
use crate::error::PileError;

/// Operations shared by all top-accessible card piles.
pub trait Pile {
    /// Name used in error messages.
    const KIND: &'static str;

    fn cards(&self) -> &[Card];

    fn cards_mut(&mut self) -> &mut Vec<Card>;

    /// Total predicate: never fails, only answers.
    fn can_accept(&self, _card: &Card) -> bool {
        true
    }

    fn add(&mut self, card: Card) {
        self.cards_mut().push(card);
    }

    fn remove_top(&mut self) -> Result<Card, PileError> {
        self.cards_mut().pop().ok_or(PileError::Empty(Self::KIND))
    }

    fn top_card(&self) -> Option<&Card> {
        self.cards().last()
    }

    fn is_empty(&self) -> bool {
        self.cards().is_empty()
    }

    fn len(&self) -> usize {
        self.cards().len()
    }

    fn clear(&mut self) {
        self.cards_mut().clear();
    }
}

/// Shared draw source.
#[derive(Clone, Debug, Default)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    pub fn from_cards(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    /// A complete deck, shuffled uniformly.
    pub fn shuffled<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut deck = Self::from_cards(full_deck());
        deck.shuffle(rng);
        deck
    }

    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cards.shuffle(rng);
    }

    pub fn draw(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    /// Moves every card of `other` into this deck.
    pub fn absorb(&mut self, other: &mut Vec<Card>) {
        self.cards.append(other);
    }
}

impl Pile for Deck {
    const KIND: &'static str = "deck";

    fn cards(&self) -> &[Card] {
        &self.cards
    }

    fn cards_mut(&mut self) -> &mut Vec<Card> {
        &mut self.cards
    }
}

#[derive(Clone, Debug, Default)]
pub struct StockPile {
    cards: Vec<Card>,
}

impl StockPile {
    /// `cards` is ordered bottom first.
    pub fn from_cards(cards: Vec<Card>) -> Self {
        Self { cards }
    }
}

impl Pile for StockPile {
    const KIND: &'static str = "stock pile";

    fn cards(&self) -> &[Card] {
        &self.cards
    }

    fn cards_mut(&mut self) -> &mut Vec<Card> {
        &mut self.cards
    }
}

#[derive(Clone, Debug, Default)]
pub struct DiscardPile {
    cards: Vec<Card>,
}

impl Pile for DiscardPile {
    const KIND: &'static str = "discard pile";

    fn cards(&self) -> &[Card] {
        &self.cards
    }

    fn cards_mut(&mut self) -> &mut Vec<Card> {
        &mut self.cards
    }
}

/// A player's hand. Order is irrelevant; cards are looked up by identity or face.
#[derive(Clone, Debug, Default)]
pub struct Hand {
    cards: Vec<Card>,
}

impl Hand {
    pub fn contains(&self, card: &Card) -> bool {
        self.cards.iter().any(|c| c == card)
    }

    /// First card in the hand satisfying `predicate`.
    pub fn find<P>(&self, predicate: P) -> Option<Card>
    where
        P: Fn(&Card) -> bool,
    {
        self.cards.iter().find(|card| predicate(card)).copied()
    }

    /// Resolves a face to one concrete card instance.
    pub fn find_face(&self, face: Face) -> Option<Card> {
        self.find(|card| card.face() == face)
    }

    /// Removes this exact card (by identity).
    pub fn remove(&mut self, card: &Card) -> Result<Card, PileError> {
        let index = self
            .cards
            .iter()
            .position(|c| c == card)
            .ok_or(PileError::Missing(Self::KIND))?;
        Ok(self.cards.remove(index))
    }

    pub fn missing(&self) -> usize {
        HAND_SIZE.saturating_sub(self.cards.len())
    }

    pub fn faces(&self) -> Vec<Face> {
        self.cards.iter().map(Card::face).collect()
    }
}

impl Pile for Hand {
    const KIND: &'static str = "hand";

    fn cards(&self) -> &[Card] {
        &self.cards
    }

    fn cards_mut(&mut self) -> &mut Vec<Card> {
        &mut self.cards
    }

    fn can_accept(&self, _card: &Card) -> bool {
        self.cards.len() < HAND_SIZE
    }
}

/// Shared pile built upward from 1 to 12.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BuildingPile {
    cards: Vec<Card>,
}

impl BuildingPile {
    pub fn new() -> Self {
        Self {
            cards: Vec::with_capacity(MAX_CARD_VALUE as usize),
        }
    }

    pub fn is_full(&self) -> bool {
        self.cards.len() >= MAX_CARD_VALUE as usize
    }

    /// Number the pile needs next, or `None` once it is full.
    pub fn next_value(&self) -> Option<u8> {
        if self.is_full() {
            None
        } else {
            Some(self.cards.len() as u8 + 1)
        }
    }

    /// Empties the pile and hands back its cards.
    pub fn take_cards(&mut self) -> Vec<Card> {
        std::mem::take(&mut self.cards)
    }
}

impl Pile for BuildingPile {
    const KIND: &'static str = "building pile";

    fn cards(&self) -> &[Card] {
        &self.cards
    }

    fn cards_mut(&mut self) -> &mut Vec<Card> {
        &mut self.cards
    }

    fn can_accept(&self, card: &Card) -> bool {
        match self.next_value() {
            Some(required) => card.face().matches_value(required),
            None => false,
        }
    }
}
