mod common;

use std::sync::Arc;
use std::thread;

use common::{build_deck, init_logging, n};
use parking_lot::Mutex;
use skipbo_server::{
    ClientHandle, Dispatcher, GameOptions, Lobby, MessageSink, ServerMessage, SharedLobby,
    TracingSink,
};
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

struct TestClient {
    dispatcher: Dispatcher,
    inbox: UnboundedReceiver<ServerMessage>,
}

impl TestClient {
    fn connect(lobby: &SharedLobby, id: u64) -> Self {
        let (tx, inbox) = unbounded_channel();
        Self {
            dispatcher: Dispatcher::new(Arc::clone(lobby), ClientHandle::new(id, tx)),
            inbox,
        }
    }

    fn send(&mut self, line: &str) {
        self.dispatcher.handle_line(line).expect("request handled");
    }

    fn received(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(message) = self.inbox.try_recv() {
            lines.push(message.to_string());
        }
        lines
    }
}

fn keywords(lines: &[String]) -> Vec<&str> {
    lines
        .iter()
        .map(|line| line.split('~').next().unwrap_or_default())
        .collect()
}

/// Ann (player 0) holds 1-5 and has stock [1, 2]; Bob's stock is all 12s
/// and nothing is left to draw.
fn scripted_options(target_score: u32) -> GameOptions {
    let draws = [n(5), n(4), n(3), n(2), n(1)];
    GameOptions {
        seed: Some(7),
        stock_size: Some(2),
        target_score: Some(target_score),
        first_player: Some(0),
        deck: Some(build_deck(2, &draws, &[vec![n(1), n(2)], vec![n(12)]])),
    }
}

fn scripted_lobby(target_score: u32) -> SharedLobby {
    init_logging();
    Lobby::shared(scripted_options(target_score), Arc::new(TracingSink))
}

fn start_pair(lobby: &SharedLobby) -> (TestClient, TestClient) {
    let mut ann = TestClient::connect(lobby, 1);
    let mut bob = TestClient::connect(lobby, 2);
    ann.send("HELLO~ann");
    bob.send("HELLO~bob~CL");
    ann.send("GAME~2");
    bob.send("GAME~2");
    (ann, bob)
}

const EMPTY_TABLE: &str = "TABLE~X.X.X.X~ann.X.X.X.X,bob.X.X.X.X";

#[test]
fn session_start_announces_players_and_hands() {
    let lobby = scripted_lobby(500);
    let (mut ann, mut bob) = start_pair(&lobby);
    assert_eq!(
        ann.received(),
        [
            "WELCOME~ann~",
            "QUEUE",
            "START~ann,bob",
            EMPTY_TABLE,
            "HAND~1,2,3,4,5",
            "STOCK~ann~1",
            "STOCK~bob~12",
            "TURN~ann",
        ]
    );
    assert_eq!(
        bob.received(),
        [
            "WELCOME~bob~",
            "QUEUE",
            "START~ann,bob",
            EMPTY_TABLE,
            "HAND~",
            "STOCK~ann~1",
            "STOCK~bob~12",
            "TURN~ann",
        ]
    );
}

#[test]
fn misplaced_card_is_an_invalid_move() {
    let lobby = scripted_lobby(500);
    let (mut ann, mut bob) = start_pair(&lobby);
    ann.received();
    bob.received();

    ann.send("PLAY~H.5~B.0");
    assert_eq!(ann.received(), ["ERROR~206"]);
    ann.send("PLAY~H.SB~B.0");
    assert_eq!(ann.received(), ["ERROR~206"], "no wildcard in hand");
    ann.send("PLAY~S~D.0");
    assert_eq!(ann.received(), ["ERROR~206"], "stock cannot be discarded");
    ann.send("PLAY~S~B.7");
    assert_eq!(ann.received(), ["ERROR~206"]);
    assert!(bob.received().is_empty());
}

#[test]
fn moves_out_of_turn_are_not_allowed() {
    let lobby = scripted_lobby(500);
    let (mut ann, mut bob) = start_pair(&lobby);
    ann.received();
    bob.received();

    bob.send("PLAY~S~B.0");
    assert_eq!(bob.received(), ["ERROR~205"]);
    bob.send("END");
    assert_eq!(bob.received(), ["ERROR~205"]);
    assert!(ann.received().is_empty());
}

#[test]
fn stock_play_broadcasts_move_stock_and_table() {
    let lobby = scripted_lobby(500);
    let (mut ann, mut bob) = start_pair(&lobby);
    ann.received();
    bob.received();

    ann.send("PLAY~S~B.0");
    let table = "TABLE~2.X.X.X~ann.X.X.X.X,bob.X.X.X.X";
    assert_eq!(
        ann.received(),
        ["PLAY~S~B.0~ann", "STOCK~ann~2", table, "HAND~1,2,3,4,5"]
    );
    assert_eq!(
        bob.received(),
        ["PLAY~S~B.0~ann", "STOCK~ann~2", table, "HAND~"]
    );
}

#[test]
fn emptying_stock_scores_round_and_deals_again() {
    let lobby = scripted_lobby(500);
    let (mut ann, mut bob) = start_pair(&lobby);
    ann.send("PLAY~S~B.0");
    ann.received();
    bob.received();

    ann.send("PLAY~S~B.0");
    let lines = ann.received();
    assert_eq!(
        &lines[..4],
        [
            "PLAY~S~B.0~ann",
            "TABLE~3.X.X.X~ann.X.X.X.X,bob.X.X.X.X",
            "HAND~1,2,3,4,5",
            "ROUND~ann.35,bob.0",
        ]
    );
    assert_eq!(lines[4], EMPTY_TABLE);
    assert_eq!(
        keywords(&lines[5..]),
        ["HAND", "STOCK", "STOCK", "TURN"]
    );
    let bob_lines = bob.received();
    assert!(bob_lines.contains(&"ROUND~ann.35,bob.0".to_string()));
    assert_eq!(bob_lines.last(), lines.last());

    // The new round accepts requests again.
    ann.send("TABLE");
    assert_eq!(ann.received(), [EMPTY_TABLE]);
}

#[test]
fn reaching_target_declares_winner_and_frees_players() {
    let lobby = scripted_lobby(30);
    let (mut ann, mut bob) = start_pair(&lobby);
    ann.send("PLAY~S~B.0");
    ann.received();
    bob.received();

    ann.send("PLAY~S~B.0");
    let lines = ann.received();
    assert_eq!(lines.last().map(String::as_str), Some("WINNER~ann.35,bob.0"));
    assert_eq!(keywords(&lines), ["PLAY", "TABLE", "HAND", "WINNER"]);
    assert_eq!(bob.received().last(), lines.last());

    ann.send("HAND");
    assert_eq!(ann.received(), ["ERROR~205"]);
    ann.send("GAME~2");
    assert_eq!(ann.received(), ["QUEUE"]);
    bob.send("GAME~3");
    assert_eq!(bob.received(), ["QUEUE"]);
}

#[test]
fn end_passes_the_turn_and_discards_do_not_end_play() {
    let lobby = scripted_lobby(500);
    let (mut ann, mut bob) = start_pair(&lobby);
    ann.received();
    bob.received();

    // END needs no discard.
    ann.send("END");
    assert_eq!(ann.received(), ["TURN~bob", "STOCK~bob~12"]);
    assert_eq!(bob.received(), ["TURN~bob", "HAND~", "STOCK~bob~12"]);

    bob.send("END");
    assert_eq!(bob.received(), ["TURN~ann", "STOCK~ann~1"]);
    assert_eq!(
        ann.received(),
        ["TURN~ann", "HAND~1,2,3,4,5", "STOCK~ann~1"]
    );

    ann.send("PLAY~H.5~D.0");
    let table = "TABLE~X.X.X.X~ann.5.X.X.X,bob.X.X.X.X";
    assert_eq!(
        ann.received(),
        ["PLAY~H.5~D.0~ann", table, "HAND~1,2,3,4"]
    );
    assert_eq!(bob.received(), ["PLAY~H.5~D.0~ann", table, "HAND~"]);

    ann.send("PLAY~H.1~B.0");
    let table = "TABLE~2.X.X.X~ann.5.X.X.X,bob.X.X.X.X";
    assert_eq!(
        ann.received(),
        ["PLAY~H.1~B.0~ann", table, "HAND~2,3,4"]
    );
    assert_eq!(bob.received(), ["PLAY~H.1~B.0~ann", table, "HAND~"]);

    ann.send("PLAY~D.0~B.0");
    assert_eq!(ann.received(), ["ERROR~206"], "pile 0 needs a 2");

    ann.send("END");
    assert_eq!(ann.received(), ["TURN~bob", "STOCK~bob~12"]);
    bob.send("PLAY~S~B.1");
    assert_eq!(bob.received(), ["ERROR~206"]);
}

#[test]
fn queries_answer_only_the_requester() {
    let lobby = scripted_lobby(500);
    let (mut ann, mut bob) = start_pair(&lobby);
    ann.received();
    bob.received();

    bob.send("HAND");
    assert_eq!(bob.received(), ["HAND~"]);
    ann.send("TABLE");
    assert_eq!(ann.received(), [EMPTY_TABLE]);
    ann.send("HAND");
    assert_eq!(ann.received(), ["HAND~1,2,3,4,5"]);
    assert!(bob.received().is_empty());
}

#[test]
fn malformed_and_premature_requests_are_rejected() {
    let lobby = scripted_lobby(500);
    let mut carl = TestClient::connect(&lobby, 3);
    for line in ["GAME~2", "HAND", "TABLE", "PLAY~S~B.0", "END"] {
        carl.send(line);
        assert_eq!(carl.received(), ["ERROR~205"], "{line}");
    }

    carl.send("HELLO~carl");
    assert_eq!(carl.received(), ["WELCOME~carl~"]);
    carl.send("HAND");
    assert_eq!(carl.received(), ["ERROR~205"]);
    carl.send("HELLO~carl2");
    assert_eq!(carl.received(), ["ERROR~205"]);

    for line in ["GAME~9", "GAME~1", "GAME~x", "FOO", "", "PLAY~S", "HELLO~a~LC"] {
        carl.send(line);
        assert_eq!(carl.received(), ["ERROR~204"], "{line:?}");
    }

    let mut dave = TestClient::connect(&lobby, 4);
    dave.send("HELLO~bad name");
    assert_eq!(dave.received(), ["ERROR~001"]);
    dave.send("HELLO~carl");
    assert_eq!(dave.received(), ["ERROR~002"]);
    dave.send("HELLO~dave");
    assert_eq!(dave.received(), ["WELCOME~dave~"]);
    assert_eq!(dave.dispatcher.name(), Some("dave"));
}

#[test]
fn disconnect_ends_session_for_everyone() {
    let lobby = scripted_lobby(500);
    let (mut ann, mut bob) = start_pair(&lobby);
    ann.received();
    bob.received();

    ann.dispatcher.disconnect();
    assert_eq!(bob.received(), ["ERROR~103"]);
    bob.send("HAND");
    assert_eq!(bob.received(), ["ERROR~205"]);
    bob.send("GAME~2");
    assert_eq!(bob.received(), ["QUEUE"]);

    let mut again = TestClient::connect(&lobby, 5);
    again.send("HELLO~ann");
    assert_eq!(again.received(), ["WELCOME~ann~"]);
}

#[test]
fn disconnect_racing_a_move_settles_cleanly() {
    for _ in 0..20 {
        let lobby = scripted_lobby(500);
        let (mut ann, mut bob) = start_pair(&lobby);
        ann.received();
        bob.received();

        let mover = thread::spawn(move || {
            ann.send("PLAY~S~B.0");
            ann
        });
        let leaver = thread::spawn(move || {
            bob.dispatcher.disconnect();
        });
        leaver.join().expect("leaver thread");
        let mut ann = mover.join().expect("mover thread");

        let lines = ann.received();
        assert!(lines.contains(&"ERROR~103".to_string()), "{lines:?}");
        let after_teardown = lines
            .iter()
            .skip_while(|line| *line != "ERROR~103")
            .skip(1)
            .collect::<Vec<_>>();
        assert!(
            after_teardown.is_empty() || after_teardown == ["ERROR~205"],
            "{lines:?}"
        );
        ann.send("GAME~2");
        assert_eq!(ann.received(), ["QUEUE"]);
    }
}

#[derive(Default)]
struct RecordingSink {
    lines: Mutex<Vec<(Option<String>, String)>>,
}

impl MessageSink for RecordingSink {
    fn record(&self, to: Option<&str>, text: &str) {
        self.lines
            .lock()
            .push((to.map(str::to_string), text.to_string()));
    }
}

#[test]
fn every_message_reaches_the_render_sink() {
    let sink = Arc::new(RecordingSink::default());
    let lobby = Lobby::shared(scripted_options(500), sink.clone());
    let (mut ann, _bob) = start_pair(&lobby);
    ann.send("PLAY~H.5~B.0");

    let lines = sink.lines.lock();
    assert!(lines.contains(&(Some("ann".to_string()), "Welcome, ann".to_string())));
    assert!(lines.contains(&(None, "Game started with ann, bob".to_string())));
    assert!(lines.contains(&(None, "It is ann's turn".to_string())));
    assert!(lines.contains(&(Some("ann".to_string()), "Your hand: 1 2 3 4 5".to_string())));
    assert_eq!(
        lines.last(),
        Some(&(Some("ann".to_string()), "Error 206: InvalidMove".to_string()))
    );
}
