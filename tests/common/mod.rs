//! Shared helpers for integration tests.

#![allow(dead_code)]

use once_cell::sync::OnceCell;
use skipbo_server::{Card, Face, cards_from_faces};
use tracing_subscriber::{EnvFilter, fmt};

static INITIALIZED: OnceCell<()> = OnceCell::new();

/// Installs a test subscriber once. `TEST_LOG`, then `RUST_LOG`, picks the
/// level; the default is quiet.
pub fn init_logging() {
    INITIALIZED.get_or_init(|| {
        let filter = std::env::var("TEST_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .map(EnvFilter::new)
            .unwrap_or_else(|_| EnvFilter::new("warn"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .without_time()
            .try_init()
            .ok();
    });
}

pub fn n(value: u8) -> Face {
    Face::Number(value)
}

/// First-deal deck: `draw_sequence` in reverse draw order, then each stock
/// prefix (top first, padded with 12s) from the last player to the first.
pub fn build_deck(
    stock_size: usize,
    draw_sequence: &[Face],
    stock_prefixes: &[Vec<Face>],
) -> Vec<Card> {
    let mut faces = draw_sequence.to_vec();
    for prefix in stock_prefixes.iter().rev() {
        assert!(prefix.len() <= stock_size, "stock prefix exceeds stock size");
        faces.extend_from_slice(prefix);
        faces.extend(std::iter::repeat(n(12)).take(stock_size - prefix.len()));
    }
    cards_from_faces(&faces)
}
