//! Line-oriented text protocol spoken between clients and the server.
//!
//! A message is `COMMAND` or `COMMAND~field~field...`. Lists inside a field
//! are joined with `,` and the parts of one list element with `.`, for example
//! `TABLE~1.X.X.4~alice.5.X.X.X,bob.X.X.X.SB`. Player names are restricted so
//! they can never contain a separator.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::card::{BUILD_PILE_COUNT, DISCARD_PILE_COUNT, Face, MAX_CARD_VALUE, MIN_CARD_VALUE};

pub const SEPARATOR: char = '~';
pub const LIST_SEPARATOR: char = ',';
pub const VALUE_SEPARATOR: char = '.';
/// Placeholder for an empty (or full) pile.
pub const EMPTY_TOKEN: &str = "X";
pub const SKIP_BO_TOKEN: &str = "SB";
pub const MAX_NAME_LENGTH: usize = 30;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("empty message")]
    Empty,
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
    #[error("{command} expects {expected} field(s), got {found}")]
    FieldCount {
        command: &'static str,
        expected: &'static str,
        found: usize,
    },
    #[error("invalid number {0:?}")]
    InvalidNumber(String),
    #[error("invalid card {0:?}")]
    InvalidCard(String),
    #[error("invalid position {0:?}")]
    InvalidPosition(String),
    #[error("invalid player name {0:?}")]
    InvalidName(String),
    #[error("invalid feature list {0:?}")]
    InvalidFeatures(String),
    #[error("malformed list element {0:?}")]
    InvalidElement(String),
    #[error("unknown error code {0:?}")]
    UnknownErrorCode(String),
}

/// Error codes carried by `ERROR~code`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ErrorCode {
    InvalidPlayerName,
    NameInUse,
    PlayerDisconnected,
    InvalidCommand,
    CommandNotAllowed,
    InvalidMove,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 6] = [
        ErrorCode::InvalidPlayerName,
        ErrorCode::NameInUse,
        ErrorCode::PlayerDisconnected,
        ErrorCode::InvalidCommand,
        ErrorCode::CommandNotAllowed,
        ErrorCode::InvalidMove,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidPlayerName => "001",
            ErrorCode::NameInUse => "002",
            ErrorCode::PlayerDisconnected => "103",
            ErrorCode::InvalidCommand => "204",
            ErrorCode::CommandNotAllowed => "205",
            ErrorCode::InvalidMove => "206",
        }
    }
}

impl FromStr for ErrorCode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorCode::ALL
            .into_iter()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownErrorCode(s.to_string()))
    }
}

impl From<&ProtocolError> for ErrorCode {
    fn from(err: &ProtocolError) -> Self {
        match err {
            ProtocolError::InvalidName(_) => ErrorCode::InvalidPlayerName,
            _ => ErrorCode::InvalidCommand,
        }
    }
}

/// Optional protocol extensions a peer may announce in `HELLO`/`WELCOME`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Feature {
    Chat,
    Lobby,
    Master,
}

impl Feature {
    pub fn symbol(&self) -> char {
        match self {
            Feature::Chat => 'C',
            Feature::Lobby => 'L',
            Feature::Master => 'M',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            'C' => Some(Feature::Chat),
            'L' => Some(Feature::Lobby),
            'M' => Some(Feature::Master),
            _ => None,
        }
    }
}

/// Feature flags, kept in strictly ascending order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Features(Vec<Feature>);

impl Features {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn contains(&self, feature: Feature) -> bool {
        self.0.contains(&feature)
    }

    pub fn iter(&self) -> impl Iterator<Item = Feature> + '_ {
        self.0.iter().copied()
    }
}

impl FromStr for Features {
    type Err = ProtocolError;

    fn from_str(field: &str) -> Result<Self, Self::Err> {
        let mut features: Vec<Feature> = Vec::with_capacity(field.len());
        for symbol in field.chars() {
            let feature = Feature::from_symbol(symbol)
                .ok_or_else(|| ProtocolError::InvalidFeatures(field.to_string()))?;
            if features.last().is_some_and(|last| *last >= feature) {
                return Err(ProtocolError::InvalidFeatures(field.to_string()));
            }
            features.push(feature);
        }
        Ok(Self(features))
    }
}

impl fmt::Display for Features {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for feature in &self.0 {
            write!(f, "{}", feature.symbol())?;
        }
        Ok(())
    }
}

impl FromIterator<Feature> for Features {
    fn from_iter<T: IntoIterator<Item = Feature>>(iter: T) -> Self {
        let mut features: Vec<Feature> = iter.into_iter().collect();
        features.sort();
        features.dedup();
        Self(features)
    }
}

/// Names are 1–30 characters of ASCII letters, digits, `_` or `-`.
pub fn validate_name(name: &str) -> Result<(), ProtocolError> {
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if name.is_empty() || name.len() > MAX_NAME_LENGTH || !valid_chars {
        return Err(ProtocolError::InvalidName(name.to_string()));
    }
    Ok(())
}

pub fn parse_face(token: &str) -> Result<Face, ProtocolError> {
    if token == SKIP_BO_TOKEN || token.eq_ignore_ascii_case("skipbo") {
        return Ok(Face::SkipBo);
    }
    match token.parse::<u8>() {
        Ok(value) if (MIN_CARD_VALUE..=MAX_CARD_VALUE).contains(&value) => Ok(Face::Number(value)),
        _ => Err(ProtocolError::InvalidCard(token.to_string())),
    }
}

fn parse_index(token: &str, whole: &str) -> Result<usize, ProtocolError> {
    token
        .parse::<usize>()
        .map_err(|_| ProtocolError::InvalidPosition(whole.to_string()))
}

/// Where a card is taken from or put to. Indices are zero-based and are
/// range-checked by the engine, not here.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Position {
    Stock,
    /// Hand, optionally naming the card.
    Hand(Option<Face>),
    Building(usize),
    Discard(usize),
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Stock => f.write_str("S"),
            Position::Hand(None) => f.write_str("H"),
            Position::Hand(Some(face)) => write!(f, "H{VALUE_SEPARATOR}{face}"),
            Position::Building(index) => write!(f, "B{VALUE_SEPARATOR}{index}"),
            Position::Discard(index) => write!(f, "D{VALUE_SEPARATOR}{index}"),
        }
    }
}

impl FromStr for Position {
    type Err = ProtocolError;

    fn from_str(field: &str) -> Result<Self, Self::Err> {
        let (kind, rest) = match field.split_once(VALUE_SEPARATOR) {
            Some((kind, rest)) => (kind, Some(rest)),
            None => (field, None),
        };
        match (kind, rest) {
            ("S", None) => Ok(Position::Stock),
            ("H", None) => Ok(Position::Hand(None)),
            ("H", Some(card)) => parse_face(card).map(|face| Position::Hand(Some(face))),
            ("B", Some(index)) => parse_index(index, field).map(Position::Building),
            ("D", Some(index)) => parse_index(index, field).map(Position::Discard),
            _ => Err(ProtocolError::InvalidPosition(field.to_string())),
        }
    }
}

/// Messages sent by clients.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ClientCommand {
    Hello { name: String, features: Features },
    Game { players: usize },
    Play { from: Position, to: Position },
    End,
    Hand,
    Table,
}

impl ClientCommand {
    pub fn keyword(&self) -> &'static str {
        match self {
            ClientCommand::Hello { .. } => "HELLO",
            ClientCommand::Game { .. } => "GAME",
            ClientCommand::Play { .. } => "PLAY",
            ClientCommand::End => "END",
            ClientCommand::Hand => "HAND",
            ClientCommand::Table => "TABLE",
        }
    }
}

impl fmt::Display for ClientCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())?;
        match self {
            ClientCommand::Hello { name, features } => {
                write!(f, "{SEPARATOR}{name}{SEPARATOR}{features}")
            }
            ClientCommand::Game { players } => write!(f, "{SEPARATOR}{players}"),
            ClientCommand::Play { from, to } => write!(f, "{SEPARATOR}{from}{SEPARATOR}{to}"),
            ClientCommand::End | ClientCommand::Hand | ClientCommand::Table => Ok(()),
        }
    }
}

impl FromStr for ClientCommand {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (keyword, fields) = split_message(line)?;
        match keyword {
            "HELLO" => {
                let (name, features) = match fields.as_slice() {
                    [name] => (*name, Features::none()),
                    [name, features] => (*name, features.parse()?),
                    _ => return Err(field_count("HELLO", "1-2", fields.len())),
                };
                validate_name(name)?;
                Ok(ClientCommand::Hello {
                    name: name.to_string(),
                    features,
                })
            }
            "GAME" => {
                let [count] = expect_fields::<1>("GAME", "1", &fields)?;
                let players = count
                    .parse::<usize>()
                    .map_err(|_| ProtocolError::InvalidNumber(count.to_string()))?;
                Ok(ClientCommand::Game { players })
            }
            "PLAY" => {
                let [from, to] = expect_fields::<2>("PLAY", "2", &fields)?;
                Ok(ClientCommand::Play {
                    from: from.parse()?,
                    to: to.parse()?,
                })
            }
            "END" => {
                expect_fields::<0>("END", "0", &fields)?;
                Ok(ClientCommand::End)
            }
            "HAND" => {
                expect_fields::<0>("HAND", "0", &fields)?;
                Ok(ClientCommand::Hand)
            }
            "TABLE" => {
                expect_fields::<0>("TABLE", "0", &fields)?;
                Ok(ClientCommand::Table)
            }
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}

/// One player's public discard tops as shown in `TABLE`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PlayerTable {
    pub name: String,
    pub discard_tops: [Option<Face>; DISCARD_PILE_COUNT],
}

/// A `name.score` pair in `ROUND` and `WINNER`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Standing {
    pub name: String,
    pub score: u32,
}

/// Messages sent by the server.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ServerMessage {
    Welcome {
        name: String,
        features: Features,
    },
    Queue,
    Start {
        players: Vec<String>,
    },
    Turn {
        player: String,
    },
    Hand {
        cards: Vec<Face>,
    },
    Stock {
        player: String,
        card: Face,
    },
    Table {
        /// Next value each building pile expects; `None` when the pile is empty.
        building_piles: [Option<u8>; BUILD_PILE_COUNT],
        players: Vec<PlayerTable>,
    },
    Play {
        from: Position,
        to: Position,
        player: String,
    },
    Round {
        scores: Vec<Standing>,
    },
    Winner {
        scores: Vec<Standing>,
    },
    Error {
        code: ErrorCode,
    },
}

impl ServerMessage {
    pub fn error(code: ErrorCode) -> Self {
        ServerMessage::Error { code }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            ServerMessage::Welcome { .. } => "WELCOME",
            ServerMessage::Queue => "QUEUE",
            ServerMessage::Start { .. } => "START",
            ServerMessage::Turn { .. } => "TURN",
            ServerMessage::Hand { .. } => "HAND",
            ServerMessage::Stock { .. } => "STOCK",
            ServerMessage::Table { .. } => "TABLE",
            ServerMessage::Play { .. } => "PLAY",
            ServerMessage::Round { .. } => "ROUND",
            ServerMessage::Winner { .. } => "WINNER",
            ServerMessage::Error { .. } => "ERROR",
        }
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())?;
        match self {
            ServerMessage::Welcome { name, features } => {
                write!(f, "{SEPARATOR}{name}{SEPARATOR}{features}")
            }
            ServerMessage::Queue => Ok(()),
            ServerMessage::Start { players } => {
                write!(f, "{SEPARATOR}{}", join_list(players.iter().cloned()))
            }
            ServerMessage::Turn { player } => write!(f, "{SEPARATOR}{player}"),
            ServerMessage::Hand { cards } => {
                write!(f, "{SEPARATOR}{}", join_list(cards.iter().map(Face::to_string)))
            }
            ServerMessage::Stock { player, card } => {
                write!(f, "{SEPARATOR}{player}{SEPARATOR}{card}")
            }
            ServerMessage::Table {
                building_piles,
                players,
            } => {
                let piles = join_with(
                    building_piles
                        .iter()
                        .map(|pile| pile.map_or_else(|| EMPTY_TOKEN.to_string(), |v| v.to_string())),
                    VALUE_SEPARATOR,
                );
                let blocks = join_list(players.iter().map(|player| {
                    let mut block = player.name.clone();
                    for top in &player.discard_tops {
                        block.push(VALUE_SEPARATOR);
                        block.push_str(&face_or_empty(*top));
                    }
                    block
                }));
                write!(f, "{SEPARATOR}{piles}{SEPARATOR}{blocks}")
            }
            ServerMessage::Play { from, to, player } => {
                write!(f, "{SEPARATOR}{from}{SEPARATOR}{to}{SEPARATOR}{player}")
            }
            ServerMessage::Round { scores } | ServerMessage::Winner { scores } => {
                let standings = join_list(
                    scores
                        .iter()
                        .map(|s| format!("{}{VALUE_SEPARATOR}{}", s.name, s.score)),
                );
                write!(f, "{SEPARATOR}{standings}")
            }
            ServerMessage::Error { code } => write!(f, "{SEPARATOR}{}", code.as_str()),
        }
    }
}

impl FromStr for ServerMessage {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (keyword, fields) = split_message(line)?;
        match keyword {
            "WELCOME" => {
                let (name, features) = match fields.as_slice() {
                    [name] => (*name, Features::none()),
                    [name, features] => (*name, features.parse()?),
                    _ => return Err(field_count("WELCOME", "1-2", fields.len())),
                };
                validate_name(name)?;
                Ok(ServerMessage::Welcome {
                    name: name.to_string(),
                    features,
                })
            }
            "QUEUE" => {
                expect_fields::<0>("QUEUE", "0", &fields)?;
                Ok(ServerMessage::Queue)
            }
            "START" => {
                let [names] = expect_fields::<1>("START", "1", &fields)?;
                let players = split_list(names)
                    .map(|name| validate_name(name).map(|_| name.to_string()))
                    .collect::<Result<_, _>>()?;
                Ok(ServerMessage::Start { players })
            }
            "TURN" => {
                let [player] = expect_fields::<1>("TURN", "1", &fields)?;
                validate_name(player)?;
                Ok(ServerMessage::Turn {
                    player: player.to_string(),
                })
            }
            "HAND" => {
                let [cards] = expect_fields::<1>("HAND", "1", &fields)?;
                let cards = split_list(cards).map(parse_face).collect::<Result<_, _>>()?;
                Ok(ServerMessage::Hand { cards })
            }
            "STOCK" => {
                let [player, card] = expect_fields::<2>("STOCK", "2", &fields)?;
                validate_name(player)?;
                Ok(ServerMessage::Stock {
                    player: player.to_string(),
                    card: parse_face(card)?,
                })
            }
            "TABLE" => {
                let [piles, blocks] = expect_fields::<2>("TABLE", "2", &fields)?;
                let building_piles = parse_building_piles(piles)?;
                let players = split_list(blocks)
                    .map(parse_player_table)
                    .collect::<Result<_, _>>()?;
                Ok(ServerMessage::Table {
                    building_piles,
                    players,
                })
            }
            "PLAY" => {
                let [from, to, player] = expect_fields::<3>("PLAY", "3", &fields)?;
                validate_name(player)?;
                Ok(ServerMessage::Play {
                    from: from.parse()?,
                    to: to.parse()?,
                    player: player.to_string(),
                })
            }
            "ROUND" => {
                let [scores] = expect_fields::<1>("ROUND", "1", &fields)?;
                Ok(ServerMessage::Round {
                    scores: parse_standings(scores)?,
                })
            }
            "WINNER" => {
                let [scores] = expect_fields::<1>("WINNER", "1", &fields)?;
                Ok(ServerMessage::Winner {
                    scores: parse_standings(scores)?,
                })
            }
            "ERROR" => {
                let [code] = expect_fields::<1>("ERROR", "1", &fields)?;
                Ok(ServerMessage::Error { code: code.parse()? })
            }
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}

fn split_message(line: &str) -> Result<(&str, Vec<&str>), ProtocolError> {
    if line.is_empty() {
        return Err(ProtocolError::Empty);
    }
    let mut parts = line.split(SEPARATOR);
    let keyword = parts.next().unwrap_or_default();
    Ok((keyword, parts.collect()))
}

fn field_count(command: &'static str, expected: &'static str, found: usize) -> ProtocolError {
    ProtocolError::FieldCount {
        command,
        expected,
        found,
    }
}

fn expect_fields<'a, const N: usize>(
    command: &'static str,
    expected: &'static str,
    fields: &[&'a str],
) -> Result<[&'a str; N], ProtocolError> {
    <[&str; N]>::try_from(fields).map_err(|_| field_count(command, expected, fields.len()))
}

/// Splits a list field; the empty field is the empty list.
fn split_list(field: &str) -> impl Iterator<Item = &str> {
    field.split(LIST_SEPARATOR).filter(move |_| !field.is_empty())
}

fn join_list<I: Iterator<Item = String>>(items: I) -> String {
    join_with(items, LIST_SEPARATOR)
}

fn join_with<I: Iterator<Item = String>>(items: I, separator: char) -> String {
    let mut joined = String::new();
    for (idx, item) in items.enumerate() {
        if idx > 0 {
            joined.push(separator);
        }
        joined.push_str(&item);
    }
    joined
}

fn face_or_empty(face: Option<Face>) -> String {
    face.map_or_else(|| EMPTY_TOKEN.to_string(), |face| face.to_string())
}

fn parse_optional_face(token: &str) -> Result<Option<Face>, ProtocolError> {
    if token == EMPTY_TOKEN {
        Ok(None)
    } else {
        parse_face(token).map(Some)
    }
}

fn parse_building_piles(field: &str) -> Result<[Option<u8>; BUILD_PILE_COUNT], ProtocolError> {
    let values: Vec<&str> = field.split(VALUE_SEPARATOR).collect();
    let values = <[&str; BUILD_PILE_COUNT]>::try_from(values.as_slice())
        .map_err(|_| ProtocolError::InvalidElement(field.to_string()))?;
    let mut piles = [None; BUILD_PILE_COUNT];
    for (slot, token) in piles.iter_mut().zip(values) {
        if token == EMPTY_TOKEN {
            continue;
        }
        match token.parse::<u8>() {
            Ok(value) if (MIN_CARD_VALUE..=MAX_CARD_VALUE).contains(&value) => {
                *slot = Some(value)
            }
            _ => return Err(ProtocolError::InvalidNumber(token.to_string())),
        }
    }
    Ok(piles)
}

fn parse_player_table(block: &str) -> Result<PlayerTable, ProtocolError> {
    let parts: Vec<&str> = block.split(VALUE_SEPARATOR).collect();
    let [name, d0, d1, d2, d3] = <[&str; 1 + DISCARD_PILE_COUNT]>::try_from(parts.as_slice())
        .map_err(|_| ProtocolError::InvalidElement(block.to_string()))?;
    validate_name(name)?;
    Ok(PlayerTable {
        name: name.to_string(),
        discard_tops: [
            parse_optional_face(d0)?,
            parse_optional_face(d1)?,
            parse_optional_face(d2)?,
            parse_optional_face(d3)?,
        ],
    })
}

fn parse_standings(field: &str) -> Result<Vec<Standing>, ProtocolError> {
    split_list(field)
        .map(|element| {
            let (name, score) = element
                .split_once(VALUE_SEPARATOR)
                .ok_or_else(|| ProtocolError::InvalidElement(element.to_string()))?;
            validate_name(name)?;
            let score = score
                .parse::<u32>()
                .map_err(|_| ProtocolError::InvalidNumber(score.to_string()))?;
            Ok(Standing {
                name: name.to_string(),
                score,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_client_commands() {
        assert_eq!(
            "HELLO~alice~CM".parse::<ClientCommand>(),
            Ok(ClientCommand::Hello {
                name: "alice".into(),
                features: [Feature::Chat, Feature::Master].into_iter().collect(),
            })
        );
        assert_eq!(
            "HELLO~bob".parse::<ClientCommand>(),
            Ok(ClientCommand::Hello {
                name: "bob".into(),
                features: Features::none(),
            })
        );
        assert_eq!(
            "GAME~3".parse::<ClientCommand>(),
            Ok(ClientCommand::Game { players: 3 })
        );
        assert_eq!(
            "PLAY~H.5~B.0".parse::<ClientCommand>(),
            Ok(ClientCommand::Play {
                from: Position::Hand(Some(Face::Number(5))),
                to: Position::Building(0),
            })
        );
        assert_eq!(
            "PLAY~H.SkipBo~D.3".parse::<ClientCommand>(),
            Ok(ClientCommand::Play {
                from: Position::Hand(Some(Face::SkipBo)),
                to: Position::Discard(3),
            })
        );
        assert_eq!("END".parse::<ClientCommand>(), Ok(ClientCommand::End));
        assert_eq!("HAND".parse::<ClientCommand>(), Ok(ClientCommand::Hand));
        assert_eq!("TABLE".parse::<ClientCommand>(), Ok(ClientCommand::Table));
    }

    #[test]
    fn rejects_malformed_client_commands() {
        assert_eq!(
            "JUMP".parse::<ClientCommand>(),
            Err(ProtocolError::UnknownCommand("JUMP".into()))
        );
        assert!(matches!(
            "GAME".parse::<ClientCommand>(),
            Err(ProtocolError::FieldCount { command: "GAME", found: 0, .. })
        ));
        assert_eq!(
            "GAME~two".parse::<ClientCommand>(),
            Err(ProtocolError::InvalidNumber("two".into()))
        );
        assert!(matches!(
            "END~now".parse::<ClientCommand>(),
            Err(ProtocolError::FieldCount { .. })
        ));
        assert_eq!(
            "PLAY~H.13~B.0".parse::<ClientCommand>(),
            Err(ProtocolError::InvalidCard("13".into()))
        );
        assert_eq!(
            "PLAY~Q~B.0".parse::<ClientCommand>(),
            Err(ProtocolError::InvalidPosition("Q".into()))
        );
        assert_eq!(
            "PLAY~S~B.x".parse::<ClientCommand>(),
            Err(ProtocolError::InvalidPosition("B.x".into()))
        );
        assert_eq!("".parse::<ClientCommand>(), Err(ProtocolError::Empty));
    }

    #[test]
    fn name_rules() {
        assert!(validate_name("a").is_ok());
        assert!(validate_name("Player_One-2").is_ok());
        assert!(validate_name(&"x".repeat(MAX_NAME_LENGTH)).is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name(&"x".repeat(MAX_NAME_LENGTH + 1)).is_err());
        assert!(validate_name("bad name").is_err());
        assert!(validate_name("a.b").is_err());
        assert!(validate_name("a,b").is_err());
        assert!(validate_name("é").is_err());
        let err = "HELLO~no~way~".parse::<ClientCommand>().unwrap_err();
        assert_eq!(ErrorCode::from(&err), ErrorCode::InvalidCommand);
        let err = "HELLO~a b".parse::<ClientCommand>().unwrap_err();
        assert_eq!(ErrorCode::from(&err), ErrorCode::InvalidPlayerName);
    }

    #[test]
    fn features_must_be_ascending_and_known() {
        assert!("".parse::<Features>().is_ok());
        assert!("CLM".parse::<Features>().is_ok());
        assert!("LM".parse::<Features>().is_ok());
        assert!("MC".parse::<Features>().is_err());
        assert!("CC".parse::<Features>().is_err());
        assert!("CZ".parse::<Features>().is_err());
        let features: Features = "CM".parse().expect("valid");
        assert!(features.contains(Feature::Chat));
        assert!(!features.contains(Feature::Lobby));
        assert_eq!(features.to_string(), "CM");
    }

    #[test]
    fn encodes_server_messages() {
        let table = ServerMessage::Table {
            building_piles: [Some(2), None, None, Some(12)],
            players: vec![
                PlayerTable {
                    name: "alice".into(),
                    discard_tops: [Some(Face::Number(5)), None, None, None],
                },
                PlayerTable {
                    name: "bob".into(),
                    discard_tops: [None, None, None, Some(Face::SkipBo)],
                },
            ],
        };
        assert_eq!(table.to_string(), "TABLE~2.X.X.12~alice.5.X.X.X,bob.X.X.X.SB");
        assert_eq!(
            ServerMessage::Hand { cards: vec![] }.to_string(),
            "HAND~"
        );
        assert_eq!(
            ServerMessage::Start {
                players: vec!["p1".into(), "p2".into()]
            }
            .to_string(),
            "START~p1,p2"
        );
        assert_eq!(
            ServerMessage::error(ErrorCode::InvalidMove).to_string(),
            "ERROR~206"
        );
        assert_eq!(
            ServerMessage::Welcome {
                name: "alice".into(),
                features: Features::none()
            }
            .to_string(),
            "WELCOME~alice~"
        );
    }

    #[test]
    fn every_server_message_survives_a_round_trip() {
        let messages = vec![
            ServerMessage::Welcome {
                name: "alice".into(),
                features: "CL".parse().expect("features"),
            },
            ServerMessage::Queue,
            ServerMessage::Start {
                players: vec!["alice".into(), "bob-2".into(), "c_3".into()],
            },
            ServerMessage::Turn {
                player: "bob-2".into(),
            },
            ServerMessage::Hand {
                cards: vec![Face::Number(1), Face::SkipBo, Face::Number(12)],
            },
            ServerMessage::Hand { cards: vec![] },
            ServerMessage::Stock {
                player: "alice".into(),
                card: Face::SkipBo,
            },
            ServerMessage::Table {
                building_piles: [None, Some(7), None, Some(1)],
                players: vec![PlayerTable {
                    name: "alice".into(),
                    discard_tops: [Some(Face::Number(9)), Some(Face::SkipBo), None, None],
                }],
            },
            ServerMessage::Play {
                from: Position::Discard(2),
                to: Position::Building(3),
                player: "alice".into(),
            },
            ServerMessage::Play {
                from: Position::Hand(Some(Face::SkipBo)),
                to: Position::Discard(0),
                player: "bob-2".into(),
            },
            ServerMessage::Round {
                scores: vec![
                    Standing {
                        name: "alice".into(),
                        score: 175,
                    },
                    Standing {
                        name: "bob-2".into(),
                        score: 0,
                    },
                ],
            },
            ServerMessage::Winner {
                scores: vec![Standing {
                    name: "alice".into(),
                    score: 510,
                }],
            },
        ];
        let errors = ErrorCode::ALL.into_iter().map(ServerMessage::error);
        for message in messages.into_iter().chain(errors) {
            let line = message.to_string();
            assert_eq!(line.parse::<ServerMessage>(), Ok(message), "line {line}");
        }
    }

    #[test]
    fn every_client_command_survives_a_round_trip() {
        let commands = vec![
            ClientCommand::Hello {
                name: "zed".into(),
                features: "M".parse().expect("features"),
            },
            ClientCommand::Game { players: 6 },
            ClientCommand::Play {
                from: Position::Stock,
                to: Position::Building(1),
            },
            ClientCommand::Play {
                from: Position::Hand(Some(Face::Number(7))),
                to: Position::Discard(2),
            },
            ClientCommand::End,
            ClientCommand::Hand,
            ClientCommand::Table,
        ];
        for command in commands {
            let line = command.to_string();
            assert_eq!(line.parse::<ClientCommand>(), Ok(command), "line {line}");
        }
    }
}
