//! Board assembly from configuration
//!
//! Turns each [`BoardSpec`] into a [`BoardConfig`] for `String` viewers:
//! `hidden` and `only` become inclusion filters combined by the board's
//! filter policy, and `evict` becomes an eviction predicate.

use std::collections::HashSet;
use std::sync::Arc;

use board_core::{Board, BoardConfig, BoardError, BoardEvent, BoardRegistry, BoardSender};
use tokio::sync::mpsc;

use crate::config::{BoardSpec, ConsoleConfig};

/// Board configuration for `spec`, without a sender
#[must_use]
pub fn board_config(config: &ConsoleConfig, spec: &BoardSpec) -> BoardConfig<String> {
    let mut board = BoardConfig::new()
        .with_id(spec.id.clone())
        .with_tick(config.tick_for(spec))
        .with_start_delay(config.start_delay_for(spec))
        .with_observers(config.viewers_for(spec).iter().cloned())
        .with_filter_policy(spec.filter_policy);

    if !spec.hidden.is_empty() {
        let hidden: HashSet<String> = spec.hidden.iter().cloned().collect();
        board = board.with_filter(move |viewer: &String| !hidden.contains(viewer));
    }
    if let Some(only) = &spec.only {
        let only: HashSet<String> = only.iter().cloned().collect();
        board = board.with_filter(move |viewer: &String| only.contains(viewer));
    }
    if !spec.evict.is_empty() {
        let evicted: HashSet<String> = spec.evict.iter().cloned().collect();
        board = board.with_remove_if(move |viewer: &String| evicted.contains(viewer));
    }

    if let Some(title) = &spec.title {
        board = board.with_title(title.to_line());
    }
    spec.lines
        .iter()
        .fold(board, |board, line| board.push_line(line.to_line()))
}

/// Build every configured board
///
/// `make_sender` is called once per board. Boards report to `events`.
///
/// # Errors
///
/// Returns the first [`BoardError`] from building; boards built before it
/// stay registered so the caller can close them.
pub fn build_boards<F>(
    config: &ConsoleConfig,
    registry: &BoardRegistry,
    events: &mpsc::UnboundedSender<BoardEvent>,
    mut make_sender: F,
) -> Result<Vec<Board<String>>, BoardError>
where
    F: FnMut(&BoardSpec) -> Arc<dyn BoardSender<String>>,
{
    config
        .boards
        .iter()
        .map(|spec| -> Result<Board<String>, BoardError> {
            let board = board_config(config, spec)
                .with_shared_sender(make_sender(spec))
                .with_events(events.clone())
                .build(registry)?;
            tracing::debug!(
                board_id = %spec.id,
                lines = spec.lines.len(),
                viewers = config.viewers_for(spec).len(),
                "Board built"
            );
            Ok(board)
        })
        .collect()
}
