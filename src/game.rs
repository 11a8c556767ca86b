use std::array::from_fn;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::action::{CardAction, PlayerId};
use crate::card::{BUILD_PILE_COUNT, Card, DISCARD_PILE_COUNT, Face};
use crate::error::{GameError, InvalidMove};
use crate::pile::{BuildingPile, Deck, DiscardPile, Hand, Pile, StockPile};
use crate::score::{RoundResult, winner_points};
use crate::state::{BuildPileView, GamePhase, GameSettings, GameView, PlayerPublicState};

/// Configuration required to bootstrap a game instance.
#[derive(Clone, Copy, Debug)]
pub struct GameConfig {
    pub num_players: usize,
    /// Fixed RNG seed; `None` seeds from the OS.
    pub seed: Option<u64>,
    pub stock_size: Option<usize>,
    pub target_score: Option<u32>,
    /// Who opens the first round; `None` picks uniformly at random.
    pub first_player: Option<PlayerId>,
}

impl GameConfig {
    pub fn new(num_players: usize) -> Result<Self, GameError> {
        GameSettings::new(num_players)?;
        Ok(Self {
            num_players,
            seed: None,
            stock_size: None,
            target_score: None,
            first_player: None,
        })
    }
}

/// Builder that enables deterministic deck injection for testing and replays.
pub struct GameBuilder {
    config: GameConfig,
    deck: Option<Vec<Card>>,
}

impl GameBuilder {
    pub fn new(num_players: usize) -> Result<Self, GameError> {
        Ok(Self {
            config: GameConfig::new(num_players)?,
            deck: None,
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Deck used for the first deal, drawn from the end. Later rounds always
    /// use a freshly shuffled full deck.
    pub fn with_deck(mut self, deck: Vec<Card>) -> Self {
        self.deck = Some(deck);
        self
    }

    /// Override the default stock size (per player). When not set, the standard
    /// rules apply: 30 cards for up to 4 players, otherwise 20.
    pub fn with_stock_size(mut self, stock_size: usize) -> Self {
        self.config.stock_size = Some(stock_size);
        self
    }

    pub fn with_target_score(mut self, target_score: u32) -> Self {
        self.config.target_score = Some(target_score);
        self
    }

    pub fn with_first_player(mut self, player: PlayerId) -> Self {
        self.config.first_player = Some(player);
        self
    }

    pub fn build(self) -> Result<Game, GameError> {
        Game::from_builder(self)
    }
}

/// Result of an accepted move.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MoveOutcome {
    /// Set when the move emptied the mover's stock pile.
    pub round: Option<RoundResult>,
}

/// Core Skip-Bo game engine with multi-round scoring.
#[derive(Clone)]
pub struct Game {
    settings: GameSettings,
    phase: GamePhase,
    round: u32,
    current_player: PlayerId,
    players: Vec<PlayerState>,
    build_piles: [BuildingPile; BUILD_PILE_COUNT],
    deck: Deck,
    recycle_pile: Vec<Card>,
    scores: Vec<u32>,
    history: Vec<RoundResult>,
    rng: StdRng,
}

impl Game {
    pub fn builder(num_players: usize) -> Result<GameBuilder, GameError> {
        GameBuilder::new(num_players)
    }

    pub fn new(config: GameConfig) -> Result<Self, GameError> {
        GameBuilder { config, deck: None }.build()
    }

    pub fn settings(&self) -> GameSettings {
        self.settings
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// One-based round number.
    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn current_player(&self) -> PlayerId {
        self.current_player
    }

    pub fn num_players(&self) -> usize {
        self.players.len()
    }

    /// Cumulative scores by player id.
    pub fn scores(&self) -> &[u32] {
        &self.scores
    }

    pub fn round_history(&self) -> &[RoundResult] {
        &self.history
    }

    pub fn is_finished(&self) -> bool {
        self.phase == GamePhase::GameOver
    }

    pub fn winner(&self) -> Option<PlayerId> {
        self.history.last().and_then(RoundResult::overall_winner)
    }

    pub fn draw_pile_count(&self) -> usize {
        self.deck.len()
    }

    pub fn hand(&self, player: PlayerId) -> Result<&Hand, GameError> {
        self.players
            .get(player)
            .map(|state| &state.hand)
            .ok_or(GameError::InvalidPlayer(player))
    }

    pub fn stock_top(&self, player: PlayerId) -> Option<Face> {
        self.players
            .get(player)
            .and_then(|state| state.stock.top_card())
            .map(Card::face)
    }

    pub fn stock_count(&self, player: PlayerId) -> usize {
        self.players
            .get(player)
            .map(|state| state.stock.len())
            .unwrap_or(0)
    }

    pub fn discard_tops(&self, player: PlayerId) -> [Option<Face>; DISCARD_PILE_COUNT] {
        from_fn(|idx| {
            self.players
                .get(player)
                .and_then(|state| state.discard_piles[idx].top_card())
                .map(Card::face)
        })
    }

    pub fn building_pile(&self, index: usize) -> Option<&BuildingPile> {
        self.build_piles.get(index)
    }

    pub fn view(&self, perspective: PlayerId) -> Result<GameView, GameError> {
        let hand = self.hand(perspective)?.cards().to_vec();
        let build_piles = from_fn(|idx| BuildPileView {
            size: self.build_piles[idx].len(),
            next_value: self.build_piles[idx].next_value(),
        });
        let players = self
            .players
            .iter()
            .enumerate()
            .map(|(idx, player)| PlayerPublicState {
                id: idx,
                stock_count: player.stock.len(),
                stock_top: player.stock.top_card().map(Card::face),
                discard_tops: self.discard_tops(idx),
                discard_counts: from_fn(|d| player.discard_piles[d].len()),
                hand_size: player.hand.len(),
                score: self.scores[idx],
                is_current: idx == self.current_player,
            })
            .collect();

        Ok(GameView {
            settings: self.settings,
            phase: self.phase,
            round: self.round,
            self_player: perspective,
            current_player: self.current_player,
            draw_pile_count: self.deck.len(),
            recycle_pile_count: self.recycle_pile.len(),
            build_piles,
            players,
            hand,
        })
    }

    /// Every move the player could make right now.
    pub fn legal_moves(&self, player: PlayerId) -> Result<Vec<CardAction>, GameError> {
        if self.phase != GamePhase::AwaitingMove {
            return Ok(Vec::new());
        }
        self.check_turn(player)?;
        let state = &self.players[player];

        let mut candidates = Vec::new();
        for building_pile in 0..BUILD_PILE_COUNT {
            for card in state.hand.cards() {
                candidates.push(CardAction::HandToBuildingPile {
                    card: *card,
                    building_pile,
                });
            }
            candidates.push(CardAction::StockToBuildingPile { building_pile });
            for discard_pile in 0..DISCARD_PILE_COUNT {
                candidates.push(CardAction::DiscardToBuildingPile {
                    discard_pile,
                    building_pile,
                });
            }
        }
        for discard_pile in 0..DISCARD_PILE_COUNT {
            for card in state.hand.cards() {
                candidates.push(CardAction::HandToDiscardPile {
                    card: *card,
                    discard_pile,
                });
            }
        }

        Ok(candidates
            .into_iter()
            .filter(|action| action.is_valid(self, player))
            .collect())
    }

    /// Validates and applies a single move. The engine is untouched on rejection.
    pub fn apply_move(
        &mut self,
        player: PlayerId,
        action: CardAction,
    ) -> Result<MoveOutcome, GameError> {
        self.check_turn(player)?;
        action.validate(self, player)?;
        action.execute(self, player)?;

        self.recycle_full_piles();
        if !action.is_discard() {
            self.refill_hand(player);
        }

        let round = if self.players[player].stock.is_empty() {
            Some(self.finish_round(player))
        } else {
            None
        };
        Ok(MoveOutcome { round })
    }

    /// Applies a batch atomically: either every move is applied or none is.
    pub fn apply_moves(
        &mut self,
        player: PlayerId,
        actions: &[CardAction],
    ) -> Result<MoveOutcome, GameError> {
        self.check_turn(player)?;
        let mut scratch = self.clone();
        let mut outcome = MoveOutcome::default();
        for action in actions {
            if outcome.round.is_some() {
                return Err(InvalidMove::RoundEndedMidBatch.into());
            }
            outcome = scratch.apply_move(player, *action)?;
        }
        *self = scratch;
        Ok(outcome)
    }

    /// Passes the turn to the next player and fills their hand.
    pub fn end_turn(&mut self, player: PlayerId) -> Result<PlayerId, GameError> {
        self.check_turn(player)?;
        self.current_player = (self.current_player + 1) % self.players.len();
        self.begin_turn();
        Ok(self.current_player)
    }

    /// Reshuffles a fresh deck, redeals every pile and picks a random opener.
    pub fn start_next_round(&mut self) -> Result<PlayerId, GameError> {
        match self.phase {
            GamePhase::RoundOver => {}
            GamePhase::GameOver => return Err(GameError::GameOver),
            GamePhase::AwaitingMove => return Err(GameError::RoundInProgress),
        }
        let deck = Deck::shuffled(&mut self.rng);
        self.deal(deck)?;
        self.round += 1;
        self.current_player = self.rng.gen_range(0..self.players.len());
        self.phase = GamePhase::AwaitingMove;
        self.begin_turn();
        Ok(self.current_player)
    }

    pub(crate) fn player_state(&self, player: PlayerId) -> Option<&PlayerState> {
        self.players.get(player)
    }

    pub(crate) fn player_state_mut(
        &mut self,
        player: PlayerId,
    ) -> Result<&mut PlayerState, GameError> {
        self.players
            .get_mut(player)
            .ok_or(GameError::InvalidPlayer(player))
    }

    pub(crate) fn building_pile_mut(
        &mut self,
        index: usize,
    ) -> Result<&mut BuildingPile, GameError> {
        self.build_piles
            .get_mut(index)
            .ok_or_else(|| InvalidMove::BuildPileIndex(index).into())
    }

    fn from_builder(builder: GameBuilder) -> Result<Self, GameError> {
        let GameBuilder { config, deck } = builder;
        let mut settings = GameSettings::new(config.num_players)?;
        if let Some(custom_stock) = config.stock_size {
            if custom_stock == 0 {
                return Err(GameError::InvalidConfiguration("stock size must be positive"));
            }
            settings.stock_size = custom_stock;
        }
        if let Some(target) = config.target_score {
            if target == 0 {
                return Err(GameError::InvalidConfiguration("target score must be positive"));
            }
            settings.target_score = target;
        }
        if let Some(first) = config.first_player {
            if first >= settings.num_players {
                return Err(GameError::InvalidPlayer(first));
            }
        }

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let deck = match deck {
            Some(cards) => Deck::from_cards(cards),
            None => Deck::shuffled(&mut rng),
        };
        let current_player = config
            .first_player
            .unwrap_or_else(|| rng.gen_range(0..settings.num_players));

        let mut game = Game {
            settings,
            phase: GamePhase::AwaitingMove,
            round: 1,
            current_player,
            players: vec![PlayerState::default(); settings.num_players],
            build_piles: from_fn(|_| BuildingPile::new()),
            deck: Deck::default(),
            recycle_pile: Vec::new(),
            scores: vec![0; settings.num_players],
            history: Vec::new(),
            rng,
        };
        game.deal(deck)?;
        game.begin_turn();
        Ok(game)
    }

    fn deal(&mut self, mut deck: Deck) -> Result<(), GameError> {
        let stock_size = self.settings.stock_size;
        if deck.len() < stock_size * self.players.len() {
            return Err(GameError::InvalidConfiguration(
                "deck does not contain enough cards to deal stocks",
            ));
        }
        for player in &mut self.players {
            let mut stock = Vec::with_capacity(stock_size);
            for _ in 0..stock_size {
                stock.push(deck.draw().ok_or(GameError::InvalidConfiguration(
                    "deck exhausted while dealing stocks",
                ))?);
            }
            *player = PlayerState::new(StockPile::from_cards(stock));
        }
        for pile in &mut self.build_piles {
            pile.clear();
        }
        self.recycle_pile.clear();
        self.deck = deck;
        Ok(())
    }

    fn check_turn(&self, player: PlayerId) -> Result<(), GameError> {
        match self.phase {
            GamePhase::AwaitingMove => {}
            GamePhase::RoundOver => return Err(GameError::RoundOver),
            GamePhase::GameOver => return Err(GameError::GameOver),
        }
        if player >= self.players.len() {
            return Err(GameError::InvalidPlayer(player));
        }
        if player != self.current_player {
            return Err(GameError::NotPlayersTurn);
        }
        Ok(())
    }

    fn begin_turn(&mut self) {
        self.refill_hand(self.current_player);
    }

    /// Draws until the hand holds five cards or nothing is left to draw.
    fn refill_hand(&mut self, player: PlayerId) {
        while self.players[player].hand.missing() > 0 {
            match self.draw_card() {
                Some(card) => self.players[player].hand.add(card),
                None => break,
            }
        }
    }

    fn draw_card(&mut self) -> Option<Card> {
        if let Some(card) = self.deck.draw() {
            return Some(card);
        }
        if self.recycle_pile.is_empty() {
            return None;
        }
        self.recycle_pile.shuffle(&mut self.rng);
        self.deck.absorb(&mut self.recycle_pile);
        self.deck.draw()
    }

    fn recycle_full_piles(&mut self) {
        for pile in self.build_piles.iter_mut() {
            if pile.is_full() {
                self.recycle_pile.extend(pile.take_cards());
            }
        }
    }

    fn finish_round(&mut self, winner: PlayerId) -> RoundResult {
        let stock_counts: Vec<usize> = self.players.iter().map(|p| p.stock.len()).collect();
        let points = winner_points(&stock_counts, winner);
        self.scores[winner] += points;
        let game_over = self
            .scores
            .iter()
            .any(|score| *score >= self.settings.target_score);
        self.phase = if game_over {
            GamePhase::GameOver
        } else {
            GamePhase::RoundOver
        };
        let result = RoundResult {
            round: self.round,
            winner,
            points,
            scores: self.scores.clone(),
            game_over,
        };
        self.history.push(result.clone());
        result
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct PlayerState {
    pub(crate) stock: StockPile,
    pub(crate) hand: Hand,
    pub(crate) discard_piles: [DiscardPile; DISCARD_PILE_COUNT],
}

impl PlayerState {
    fn new(stock: StockPile) -> Self {
        Self {
            stock,
            ..Self::default()
        }
    }
}
