//! Board Registry - Id Lookup Across Boards
//!
//! Boards built with an id are registered here by
//! [`crate::BoardConfig::build`]. The registry is an explicitly owned value;
//! clone it to share it.
//!
//! # Architecture
//!
//! ```text
//!                         BoardRegistry
//!          ┌──────────────────────────────────────────┐
//!          │ HashMap<String, Entry>                   │
//!          │   - wrapped in Arc<RwLock<>>             │
//!          │   Entry = type-erased handle + Board<O>  │
//!          └───────────────────┬──────────────────────┘
//!                              │
//!        ┌─────────────────────┼─────────────────────┐
//!        │                     │                     │
//!  ┌─────▼──────┐       ┌──────▼─────┐        ┌──────▼─────┐
//!  │ "lobby"    │       │ "arena"    │        │ "stats"    │
//!  │ Board<Name>│       │ Board<Name>│        │ Board<u64> │
//!  └────────────┘       └────────────┘        └────────────┘
//! ```
//!
//! [`BoardRegistry::get`] returns a type-erased [`ManagedBoard`] handle;
//! [`BoardRegistry::get_typed`] returns the board only if its observer type
//! matches. A board frees its id when it closes.
//!
//! # Thread Safety
//!
//! Lookups take the read lock; registration and removal take the write lock.
//! Boards are never closed or evicted while a lock is held.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::board::{Board, BoardState};
use crate::error::BoardError;
use crate::events::BoardStats;
use crate::observer::Observer;

/// Operations available on any registered board, whatever its observer type
pub trait ManagedBoard: Send + Sync {
    /// Registry id
    fn id(&self) -> Option<&str>;

    /// Name of the observer type
    fn observer_type(&self) -> &'static str;

    /// Lifecycle state
    fn state(&self) -> BoardState;

    /// Render counters
    fn stats(&self) -> BoardStats;

    /// Close the board
    fn close(&self);
}

impl<O: Observer> ManagedBoard for Board<O> {
    fn id(&self) -> Option<&str> {
        Board::id(self)
    }

    fn observer_type(&self) -> &'static str {
        std::any::type_name::<O>()
    }

    fn state(&self) -> BoardState {
        Board::state(self)
    }

    fn stats(&self) -> BoardStats {
        Board::stats(self)
    }

    fn close(&self) {
        Board::close(self);
    }
}

struct Entry {
    handle: Arc<dyn ManagedBoard>,
    typed: Box<dyn Any + Send + Sync>,
    identity: usize,
}

type Entries = RwLock<HashMap<String, Entry>>;

/// Registry of boards by id
#[derive(Clone, Default)]
pub struct BoardRegistry {
    inner: Arc<Entries>,
}

impl fmt::Debug for BoardRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoardRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}

impl BoardRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `board` under its id
    ///
    /// Check and insert happen under one write lock, so two boards racing for
    /// the same id cannot both win.
    pub(crate) fn register<O: Observer>(&self, board: &Board<O>) -> Result<(), BoardError> {
        let Some(id) = board.id() else {
            return Ok(());
        };
        let mut inner = self.inner.write();
        if inner.contains_key(id) {
            tracing::warn!(board_id = %id, "Board id already registered");
            return Err(BoardError::DuplicateId { id: id.to_string() });
        }
        inner.insert(
            id.to_string(),
            Entry {
                handle: Arc::new(board.clone()),
                typed: Box::new(board.clone()),
                identity: board.identity(),
            },
        );
        tracing::info!(board_id = %id, observer_type = std::any::type_name::<O>(), "Board registered");
        Ok(())
    }

    /// A link a board keeps to free its id on close
    pub(crate) fn link(&self) -> RegistryLink {
        RegistryLink {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Look up a board of any observer type
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<dyn ManagedBoard>> {
        self.inner.read().get(id).map(|entry| Arc::clone(&entry.handle))
    }

    /// Look up a board whose observers are `O`
    ///
    /// Returns `None` when the id is absent or the board renders for another
    /// observer type.
    #[must_use]
    pub fn get_typed<O: Observer>(&self, id: &str) -> Option<Board<O>> {
        self.inner
            .read()
            .get(id)
            .and_then(|entry| entry.typed.downcast_ref::<Board<O>>())
            .cloned()
    }

    /// Check if an id is registered
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.inner.read().contains_key(id)
    }

    /// Registered ids, sorted
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of registered boards
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether no board is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Remove `id` without closing the board
    ///
    /// Returns the removed board's handle.
    pub fn unregister(&self, id: &str) -> Option<Arc<dyn ManagedBoard>> {
        let entry = self.inner.write().remove(id);
        if entry.is_some() {
            tracing::info!(board_id = %id, "Board unregistered");
        }
        entry.map(|entry| entry.handle)
    }

    /// Close every registered board
    ///
    /// Returns how many boards were closed. Closed boards free their ids, so
    /// the registry is empty afterwards unless boards were added meanwhile.
    pub fn close_all(&self) -> usize {
        let handles: Vec<Arc<dyn ManagedBoard>> = self
            .inner
            .read()
            .values()
            .map(|entry| Arc::clone(&entry.handle))
            .collect();
        for handle in &handles {
            handle.close();
        }
        tracing::info!(closed = handles.len(), "Closed all boards");
        handles.len()
    }

    /// Evict `observer` from every board rendering for `O`
    ///
    /// Returns how many boards had it as a static observer.
    pub fn evict_everywhere<O: Observer>(&self, observer: &O) -> usize {
        let boards: Vec<Board<O>> = self
            .inner
            .read()
            .values()
            .filter_map(|entry| entry.typed.downcast_ref::<Board<O>>().cloned())
            .collect();
        boards.iter().filter(|board| board.evict(observer)).count()
    }

    /// Snapshot of registered boards by state and observer type
    #[must_use]
    pub fn summary(&self) -> RegistrySummary {
        let inner = self.inner.read();
        let mut by_state: HashMap<BoardState, usize> = HashMap::new();
        let mut by_observer_type: HashMap<&'static str, usize> = HashMap::new();

        for entry in inner.values() {
            *by_state.entry(entry.handle.state()).or_insert(0) += 1;
            *by_observer_type.entry(entry.handle.observer_type()).or_insert(0) += 1;
        }

        RegistrySummary {
            total_boards: inner.len(),
            by_state,
            by_observer_type,
        }
    }
}

/// Weak back-reference from a board to the registry that holds it
pub(crate) struct RegistryLink {
    inner: Weak<Entries>,
}

impl RegistryLink {
    /// Remove `id` if it still maps to the board with `identity`
    pub(crate) fn release(&self, id: &str, identity: usize) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let mut entries = inner.write();
        if entries.get(id).is_some_and(|entry| entry.identity == identity) {
            entries.remove(id);
            tracing::debug!(board_id = %id, "Board id released");
        }
    }
}

/// Summary of registry contents
#[derive(Debug, Clone)]
pub struct RegistrySummary {
    /// Total number of registered boards
    pub total_boards: usize,
    /// Count by lifecycle state
    pub by_state: HashMap<BoardState, usize>,
    /// Count by observer type name
    pub by_observer_type: HashMap<&'static str, usize>,
}
