//! Board Events and Statistics
//!
//! Boards report what happened during rendering through two channels:
//!
//! - [`BoardEvent`]s pushed to an optional unbounded channel configured with
//!   [`crate::BoardConfig::with_event_channel`]
//! - [`BoardStats`] counters that can be read at any time
//!
//! Both are best effort: a dropped event receiver never affects rendering.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::guard::CallbackStage;

/// Something observable that happened on a board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoardEvent {
    /// A render was delivered
    Rendered {
        /// Id of the board, if any
        board_id: Option<String>,
        /// Render counter
        sequence: u64,
        /// Number of observers rendered for
        audience: usize,
    },

    /// A render found nobody to render for
    Skipped {
        /// Id of the board, if any
        board_id: Option<String>,
    },

    /// A render failed as a whole
    RenderFailed {
        /// Id of the board, if any
        board_id: Option<String>,
        /// Failure description
        message: String,
        /// Failures in a row, including this one
        consecutive: u64,
    },

    /// A user callback panicked and its contribution was dropped
    CallbackFailed {
        /// Id of the board, if any
        board_id: Option<String>,
        /// Which callback
        stage: CallbackStage,
        /// Panic message
        message: String,
    },

    /// Static observers were removed by eviction predicates
    Evicted {
        /// Id of the board, if any
        board_id: Option<String>,
        /// How many were removed
        count: usize,
    },

    /// The board closed
    Closed {
        /// Id of the board, if any
        board_id: Option<String>,
    },
}

/// Point-in-time render counters of a board
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardStats {
    /// Renders delivered to a sender
    pub renders: u64,
    /// Renders skipped for lack of observers
    pub skipped: u64,
    /// Renders that failed
    pub failures: u64,
    /// Failures since the last successful render
    pub consecutive_failures: u64,
}

impl BoardStats {
    /// Whether the latest render failed
    #[must_use]
    pub fn is_failing(&self) -> bool {
        self.consecutive_failures > 0
    }
}

/// Live counters behind [`BoardStats`]
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    renders: AtomicU64,
    skipped: AtomicU64,
    failures: AtomicU64,
    consecutive_failures: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn record_render(&self) {
        self.renders.fetch_add(1, Ordering::Relaxed);
        self.consecutive_failures.store(0, Ordering::Relaxed);
    }

    pub(crate) fn record_skip(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the consecutive failure count including this one
    pub(crate) fn record_failure(&self) -> u64 {
        self.failures.fetch_add(1, Ordering::Relaxed);
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn snapshot(&self) -> BoardStats {
        BoardStats {
            renders: self.renders.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            consecutive_failures: self.consecutive_failures.load(Ordering::Relaxed),
        }
    }
}

/// Optional event sink; sending never fails the caller
#[derive(Debug, Clone, Default)]
pub(crate) struct EventSink {
    tx: Option<mpsc::UnboundedSender<BoardEvent>>,
}

impl EventSink {
    pub(crate) fn new(tx: Option<mpsc::UnboundedSender<BoardEvent>>) -> Self {
        Self { tx }
    }

    pub(crate) fn emit(&self, event: BoardEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).is_err() {
                tracing::trace!("Board event receiver dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_track_consecutive_failures() {
        let counters = StatsCounters::default();
        assert_eq!(counters.record_failure(), 1);
        assert_eq!(counters.record_failure(), 2);
        assert!(counters.snapshot().is_failing());

        counters.record_render();
        counters.record_skip();
        let stats = counters.snapshot();
        assert_eq!(
            stats,
            BoardStats {
                renders: 1,
                skipped: 1,
                failures: 2,
                consecutive_failures: 0,
            }
        );
        assert!(!stats.is_failing());
    }

    #[test]
    fn test_sink_tolerates_dropped_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = EventSink::new(Some(tx));
        drop(rx);
        sink.emit(BoardEvent::Closed { board_id: None });
        EventSink::default().emit(BoardEvent::Skipped { board_id: None });
    }

    #[test]
    fn test_sink_delivers_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = EventSink::new(Some(tx));
        sink.emit(BoardEvent::Evicted {
            board_id: Some("b".to_string()),
            count: 2,
        });
        assert_eq!(
            rx.try_recv().ok(),
            Some(BoardEvent::Evicted {
                board_id: Some("b".to_string()),
                count: 2,
            })
        );
    }
}
