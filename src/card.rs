use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

pub const MIN_CARD_VALUE: u8 = 1;
pub const MAX_CARD_VALUE: u8 = 12;
pub const SKIP_BO_COUNT: usize = 18;
pub const COPIES_PER_VALUE: usize = 12;
pub const DECK_SIZE: usize = COPIES_PER_VALUE * MAX_CARD_VALUE as usize + SKIP_BO_COUNT;
pub const HAND_SIZE: usize = 5;
pub const DISCARD_PILE_COUNT: usize = 4;
pub const BUILD_PILE_COUNT: usize = 4;
pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 6;
pub const STOCK_SIZE_SMALL_GAME: usize = 30;
pub const STOCK_SIZE_LARGE_GAME: usize = 20;

const NUMBERED_COLORS: [CardColor; 3] = [CardColor::Red, CardColor::Blue, CardColor::Green];

/// Printed colour of a card. Wildcards carry their own colour.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum CardColor {
    Red,
    Blue,
    Green,
    SkipBo,
}

/// Unique identity of a physical card within one deck.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CardId(pub u16);

/// What a card is worth when played, independent of which physical card it is.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Face {
    /// Numbered card between 1 and 12.
    Number(u8),
    /// Skip-Bo wild card. Counts as any number when played.
    SkipBo,
}

impl Face {
    /// Returns true if the face is the wildcard.
    #[inline]
    pub fn is_skip_bo(&self) -> bool {
        matches!(self, Face::SkipBo)
    }

    /// Returns the numeric value when available.
    #[inline]
    pub fn value(&self) -> Option<u8> {
        match self {
            Face::Number(v) => Some(*v),
            Face::SkipBo => None,
        }
    }

    /// Checks whether the face can legally satisfy the requested value.
    #[inline]
    pub fn matches_value(&self, value: u8) -> bool {
        debug_assert!((MIN_CARD_VALUE..=MAX_CARD_VALUE).contains(&value));
        matches!(self, Face::SkipBo) || self.value() == Some(value)
    }
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Face::Number(value) => write!(f, "{value}"),
            Face::SkipBo => f.write_str("SB"),
        }
    }
}

/// A physical Skip-Bo card.
///
/// Equality is identity: two cards showing the same number are still different
/// cards while in play. Compare [`Card::face`] to compare values.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct Card {
    id: CardId,
    color: CardColor,
    number: Option<u8>,
}

impl Card {
    pub fn numbered(id: CardId, color: CardColor, number: u8) -> Self {
        debug_assert!(color != CardColor::SkipBo);
        debug_assert!((MIN_CARD_VALUE..=MAX_CARD_VALUE).contains(&number));
        Self {
            id,
            color,
            number: Some(number),
        }
    }

    pub fn skip_bo(id: CardId) -> Self {
        Self {
            id,
            color: CardColor::SkipBo,
            number: None,
        }
    }

    pub fn id(&self) -> CardId {
        self.id
    }

    pub fn color(&self) -> CardColor {
        self.color
    }

    pub fn number(&self) -> Option<u8> {
        self.number
    }

    pub fn face(&self) -> Face {
        match self.number {
            Some(value) => Face::Number(value),
            None => Face::SkipBo,
        }
    }

    #[inline]
    pub fn is_skip_bo(&self) -> bool {
        self.color == CardColor::SkipBo
    }
}

impl PartialEq for Card {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Card {}

impl Hash for Card {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Builds a full 162-card Skip-Bo deck in deterministic order (unshuffled).
pub fn full_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(DECK_SIZE);
    let mut next_id = 0u16;
    for copy in 0..COPIES_PER_VALUE {
        let color = NUMBERED_COLORS[copy % NUMBERED_COLORS.len()];
        for value in MIN_CARD_VALUE..=MAX_CARD_VALUE {
            deck.push(Card::numbered(CardId(next_id), color, value));
            next_id += 1;
        }
    }
    for _ in 0..SKIP_BO_COUNT {
        deck.push(Card::skip_bo(CardId(next_id)));
        next_id += 1;
    }
    deck
}

/// Creates identity-distinct cards for the given faces, in order.
///
/// Handy for stacking a deck in tests and replays.
pub fn cards_from_faces(faces: &[Face]) -> Vec<Card> {
    faces
        .iter()
        .enumerate()
        .map(|(idx, face)| {
            let id = CardId(idx as u16);
            match face {
                Face::Number(value) => {
                    Card::numbered(id, NUMBERED_COLORS[idx % NUMBERED_COLORS.len()], *value)
                }
                Face::SkipBo => Card::skip_bo(id),
            }
        })
        .collect()
}
