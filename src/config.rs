use crate::action::PlayerId;
use crate::card::{Card, DECK_SIZE, MAX_PLAYERS};
use crate::error::GameError;
use crate::game::{Game, GameBuilder};
use crate::score::TARGET_SCORE;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5555;
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024;

/// Runtime settings of the TCP server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    /// `0` lets the OS pick a free port.
    pub port: u16,
    /// Base seed for every session's RNG; sessions derive their own from it.
    pub seed: Option<u64>,
    pub stock_size: Option<usize>,
    pub target_score: u32,
    pub max_line_length: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            seed: None,
            stock_size: None,
            target_score: TARGET_SCORE,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

impl ServerConfig {
    /// Loopback config on an ephemeral port, handy for tests.
    pub fn local() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..Self::default()
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.max_line_length == 0 {
            return Err("max line length must be positive");
        }
        if self.target_score == 0 {
            return Err("target score must be positive");
        }
        match self.stock_size {
            Some(0) => Err("stock size must be positive"),
            Some(size) if size * MAX_PLAYERS > DECK_SIZE => {
                Err("stock size too large to deal a six player game")
            }
            _ => Ok(()),
        }
    }

    pub fn game_options(&self) -> GameOptions {
        GameOptions {
            seed: self.seed,
            stock_size: self.stock_size,
            target_score: Some(self.target_score),
            ..GameOptions::default()
        }
    }
}

/// Engine settings applied to every session the lobby creates.
#[derive(Clone, Debug, Default)]
pub struct GameOptions {
    pub seed: Option<u64>,
    pub stock_size: Option<usize>,
    pub target_score: Option<u32>,
    pub first_player: Option<PlayerId>,
    /// Deck for the first deal of every session, drawn from the end.
    pub deck: Option<Vec<Card>>,
}

impl GameOptions {
    /// Builds the game for session `session_id`. A fixed base seed is offset
    /// by the session id so concurrent sessions do not share a shuffle.
    pub fn build_game(&self, num_players: usize, session_id: u64) -> Result<Game, GameError> {
        let mut builder = GameBuilder::new(num_players)?;
        if let Some(seed) = self.seed {
            builder = builder.with_seed(seed.wrapping_add(session_id));
        }
        if let Some(stock_size) = self.stock_size {
            builder = builder.with_stock_size(stock_size);
        }
        if let Some(target) = self.target_score {
            builder = builder.with_target_score(target);
        }
        if let Some(first) = self.first_player {
            builder = builder.with_first_player(first);
        }
        if let Some(deck) = &self.deck {
            builder = builder.with_deck(deck.clone());
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_listens_on_standard_port() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address(), "0.0.0.0:5555");
        assert_eq!(config.target_score, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_stock_size_that_cannot_be_dealt() {
        let config = ServerConfig {
            stock_size: Some(28),
            ..ServerConfig::local()
        };
        assert!(config.validate().is_err());
        let config = ServerConfig {
            stock_size: Some(27),
            ..ServerConfig::local()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn options_carry_overrides_into_the_engine() {
        let options = ServerConfig {
            stock_size: Some(3),
            target_score: 50,
            seed: Some(9),
            ..ServerConfig::local()
        }
        .game_options();
        let game = options.build_game(3, 1).expect("game");
        assert_eq!(game.settings().stock_size, 3);
        assert_eq!(game.settings().target_score, 50);
        assert_eq!(game.stock_count(2), 3);
    }
}
