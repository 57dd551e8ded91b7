//! Board - Per-Observer Line Rendering on a Timer
//!
//! A [`Board`] owns a set of indexed [`Line`]s, an optional title, the
//! observer configuration and a [`BoardSender`]. One render:
//!
//! ```text
//! resolve audience ──► (empty?) ──► skip, no hooks, no send
//!        │
//!        ▼
//! run_before hooks ──► render title + lines per observer ──► sender.send
//!                                                               │
//!                                              run_after hooks ◄┘
//! ```
//!
//! # Lifecycle
//!
//! ```text
//! Unstarted ──start()──► Running ──close()──► Closed
//!     └──────────────close()──────────────────┘
//! ```
//!
//! `render` and `send_once` work in Unstarted and Running. Closed is
//! terminal: `render` and `start` return [`BoardError::Closed`] and a second
//! `close` does nothing.
//!
//! # Usage
//!
//! ```ignore
//! let registry = BoardRegistry::new();
//! let board = BoardConfig::new()
//!     .with_id("lobby")
//!     .with_title("Lobby")
//!     .push_line("Welcome")
//!     .push_line(Line::dynamic(|name: &String| format!("Hi {name}")))
//!     .with_observer("ann".to_string())
//!     .with_sender(my_sender)
//!     .build(&registry)?;
//! board.start()?;
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::error::{board_label, BoardError};
use crate::events::{BoardEvent, BoardStats, EventSink, StatsCounters};
use crate::guard::{guarded, CallbackFailure, CallbackStage};
use crate::line::{FrameMemo, Line};
use crate::observer::{
    Audience, FilterPolicy, Observer, ObserverHook, ObserverListSupplier, ObserverPredicate,
    ObserverSources, ObserverSupplier,
};
use crate::registry::{BoardRegistry, RegistryLink};
use crate::scheduler::{ticks, RenderJob, RenderScheduler};
use crate::sender::{BoardSender, NullSender, ObserverView, RenderFrame};

/// Default render period: one second
pub const DEFAULT_TICK: Duration = ticks(20);

/// Everything needed to build a [`Board`]
///
/// Fields are public; the `with_*` helpers chain for the common cases.
///
/// | field | default |
/// |-------|---------|
/// | `id` | none (not registered) |
/// | `tick` | [`DEFAULT_TICK`] |
/// | `start_delay` | zero |
/// | `filter_policy` | [`FilterPolicy::All`] |
/// | `sender` | [`NullSender`] |
/// | `runtime` | the runtime `start` is called from |
pub struct BoardConfig<O: Observer> {
    /// Registry id; `None` keeps the board out of the registry
    pub id: Option<String>,
    /// Period between scheduled renders, must be non-zero
    pub tick: Duration,
    /// Wait before the first scheduled render
    pub start_delay: Duration,
    /// Observers that see the board until evicted
    pub static_observers: Vec<O>,
    /// Single-observer suppliers, run every render
    pub dynamic_observers: Vec<ObserverSupplier<O>>,
    /// Observer-list suppliers, run every render
    pub dynamic_observer_lists: Vec<ObserverListSupplier<O>>,
    /// Inclusion filters
    pub filters: Vec<ObserverPredicate<O>>,
    /// How inclusion filters combine
    pub filter_policy: FilterPolicy,
    /// Eviction predicates over the static observers
    pub remove_if: Vec<ObserverPredicate<O>>,
    /// Hooks run for every observer before rendering
    pub run_before: Vec<ObserverHook<O>>,
    /// Hooks run for every observer after a successful send
    pub run_after: Vec<ObserverHook<O>>,
    /// Lines by index
    pub lines: BTreeMap<usize, Line<O>>,
    /// Optional title line
    pub title: Option<Line<O>>,
    /// Where rendered frames go
    pub sender: Arc<dyn BoardSender<O>>,
    /// Runtime to schedule on
    pub runtime: Option<Handle>,
    /// Event channel
    pub events: Option<mpsc::UnboundedSender<BoardEvent>>,
}

impl<O: Observer> Default for BoardConfig<O> {
    fn default() -> Self {
        Self {
            id: None,
            tick: DEFAULT_TICK,
            start_delay: Duration::ZERO,
            static_observers: Vec::new(),
            dynamic_observers: Vec::new(),
            dynamic_observer_lists: Vec::new(),
            filters: Vec::new(),
            filter_policy: FilterPolicy::default(),
            remove_if: Vec::new(),
            run_before: Vec::new(),
            run_after: Vec::new(),
            lines: BTreeMap::new(),
            title: None,
            sender: Arc::new(NullSender),
            runtime: None,
            events: None,
        }
    }
}

impl<O: Observer> BoardConfig<O> {
    /// A configuration with every default
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the board under `id`
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the render period
    #[must_use]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Set the wait before the first scheduled render
    #[must_use]
    pub fn with_start_delay(mut self, start_delay: Duration) -> Self {
        self.start_delay = start_delay;
        self
    }

    /// Add a static observer
    #[must_use]
    pub fn with_observer(mut self, observer: O) -> Self {
        self.static_observers.push(observer);
        self
    }

    /// Add several static observers
    #[must_use]
    pub fn with_observers(mut self, observers: impl IntoIterator<Item = O>) -> Self {
        self.static_observers.extend(observers);
        self
    }

    /// Add a single-observer supplier
    #[must_use]
    pub fn with_dynamic_observer<F>(mut self, supplier: F) -> Self
    where
        F: Fn() -> Option<O> + Send + Sync + 'static,
    {
        self.dynamic_observers.push(Arc::new(supplier));
        self
    }

    /// Add an observer-list supplier
    #[must_use]
    pub fn with_dynamic_observer_list<F>(mut self, supplier: F) -> Self
    where
        F: Fn() -> Vec<O> + Send + Sync + 'static,
    {
        self.dynamic_observer_lists.push(Arc::new(supplier));
        self
    }

    /// Add an inclusion filter
    #[must_use]
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&O) -> bool + Send + Sync + 'static,
    {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Choose how inclusion filters combine
    #[must_use]
    pub fn with_filter_policy(mut self, policy: FilterPolicy) -> Self {
        self.filter_policy = policy;
        self
    }

    /// Add an eviction predicate
    #[must_use]
    pub fn with_remove_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&O) -> bool + Send + Sync + 'static,
    {
        self.remove_if.push(Arc::new(predicate));
        self
    }

    /// Add a pre-render hook
    #[must_use]
    pub fn with_run_before<F>(mut self, hook: F) -> Self
    where
        F: Fn(&O) + Send + Sync + 'static,
    {
        self.run_before.push(Arc::new(hook));
        self
    }

    /// Add a post-render hook
    #[must_use]
    pub fn with_run_after<F>(mut self, hook: F) -> Self
    where
        F: Fn(&O) + Send + Sync + 'static,
    {
        self.run_after.push(Arc::new(hook));
        self
    }

    /// Put `line` at `index`, replacing any line already there
    #[must_use]
    pub fn with_line(mut self, index: usize, line: impl Into<Line<O>>) -> Self {
        self.lines.insert(index, line.into());
        self
    }

    /// Append `line` after the highest index in use
    #[must_use]
    pub fn push_line(mut self, line: impl Into<Line<O>>) -> Self {
        let index = self.lines.keys().next_back().map_or(0, |last| last + 1);
        self.lines.insert(index, line.into());
        self
    }

    /// Set the title line
    #[must_use]
    pub fn with_title(mut self, title: impl Into<Line<O>>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Deliver through `sender`
    #[must_use]
    pub fn with_sender(self, sender: impl BoardSender<O> + 'static) -> Self {
        self.with_shared_sender(Arc::new(sender))
    }

    /// Deliver through a sender shared with other boards
    #[must_use]
    pub fn with_shared_sender(mut self, sender: Arc<dyn BoardSender<O>>) -> Self {
        self.sender = sender;
        self
    }

    /// Schedule on `runtime` instead of the caller's runtime
    #[must_use]
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Report events to `tx`
    #[must_use]
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<BoardEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Report events to a new channel and return its receiving end
    #[must_use]
    pub fn with_event_channel(self) -> (Self, mpsc::UnboundedReceiver<BoardEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (self.with_events(tx), rx)
    }

    /// Check the configuration without building
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Config`] for a zero tick or an empty id.
    pub fn validate(&self) -> Result<(), BoardError> {
        if self.tick.is_zero() {
            return Err(BoardError::Config("tick must be greater than zero".to_string()));
        }
        if self.id.as_deref().is_some_and(str::is_empty) {
            return Err(BoardError::Config("board id must not be empty".to_string()));
        }
        Ok(())
    }

    /// Validate, create the board and register it when it has an id
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Config`] for an invalid configuration and
    /// [`BoardError::DuplicateId`] when the id is already registered.
    pub fn build(self, registry: &BoardRegistry) -> Result<Board<O>, BoardError> {
        self.validate()?;

        let label = board_label(self.id.as_deref());
        let mut statics = Vec::with_capacity(self.static_observers.len());
        for observer in self.static_observers {
            if !statics.contains(&observer) {
                statics.push(observer);
            }
        }

        let board = Board {
            inner: Arc::new(BoardInner {
                label,
                registry: self.id.as_ref().map(|_| registry.link()),
                id: self.id,
                tick: self.tick,
                start_delay: self.start_delay,
                sources: ObserverSources {
                    dynamic_observers: self.dynamic_observers,
                    dynamic_observer_lists: self.dynamic_observer_lists,
                    filters: self.filters,
                    filter_policy: self.filter_policy,
                    remove_if: self.remove_if,
                },
                run_before: self.run_before,
                run_after: self.run_after,
                lines: self.lines,
                title: self.title,
                sender: self.sender,
                runtime: self.runtime,
                events: EventSink::new(self.events),
                stats: StatsCounters::default(),
                statics: Mutex::new(statics),
                gate: Mutex::new(RenderState::default()),
                lifecycle: Mutex::new(Lifecycle::Unstarted),
                closed: AtomicBool::new(false),
            }),
        };

        if board.inner.id.is_some() {
            registry.register(&board)?;
        }
        tracing::debug!(
            board_id = %board.inner.label,
            lines = board.inner.lines.len(),
            tick_ms = board.inner.tick.as_millis(),
            "Board built"
        );
        Ok(board)
    }
}

impl<O: Observer> fmt::Debug for BoardConfig<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoardConfig")
            .field("id", &self.id)
            .field("tick", &self.tick)
            .field("start_delay", &self.start_delay)
            .field("static_observers", &self.static_observers.len())
            .field("filter_policy", &self.filter_policy)
            .field("lines", &self.lines.len())
            .field("title", &self.title.is_some())
            .finish_non_exhaustive()
    }
}

/// Where a board is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoardState {
    /// Built, not scheduled
    Unstarted,
    /// Scheduled renders are running
    Running,
    /// Closed for good
    Closed,
}

impl fmt::Display for BoardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unstarted => "unstarted",
            Self::Running => "running",
            Self::Closed => "closed",
        })
    }
}

/// What a single render did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Nobody to render for; no hooks ran and nothing was sent
    Skipped,
    /// A frame was delivered
    Rendered {
        /// Observers rendered for
        audience: usize,
        /// Render counter of the frame
        sequence: u64,
    },
}

/// Working state carried from one render to the next
#[derive(Debug)]
struct RenderState<O> {
    /// Title last delivered to each observer
    last_titles: HashMap<O, String>,
    /// Frames delivered so far
    sequence: u64,
}

impl<O> Default for RenderState<O> {
    fn default() -> Self {
        Self {
            last_titles: HashMap::new(),
            sequence: 0,
        }
    }
}

impl<O> RenderState<O> {
    fn reset(&mut self) {
        self.last_titles.clear();
    }
}

enum Lifecycle {
    Unstarted,
    Running(RenderScheduler),
    Closed,
}

struct BoardInner<O: Observer> {
    id: Option<String>,
    label: String,
    registry: Option<RegistryLink>,
    tick: Duration,
    start_delay: Duration,
    sources: ObserverSources<O>,
    run_before: Vec<ObserverHook<O>>,
    run_after: Vec<ObserverHook<O>>,
    lines: BTreeMap<usize, Line<O>>,
    title: Option<Line<O>>,
    sender: Arc<dyn BoardSender<O>>,
    runtime: Option<Handle>,
    events: EventSink,
    stats: StatsCounters,
    statics: Mutex<Vec<O>>,
    gate: Mutex<RenderState<O>>,
    lifecycle: Mutex<Lifecycle>,
    closed: AtomicBool,
}

// Last handle gone without `close`: the scheduler already exits through its
// weak link, so only the sender and lines are left to release.
impl<O: Observer> Drop for BoardInner<O> {
    fn drop(&mut self) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        let sender = &self.sender;
        let lines = self.lines.values().chain(self.title.iter());
        let failures = guarded(CallbackStage::Sender, || sender.close())
            .err()
            .into_iter()
            .chain(lines.filter_map(|line| guarded(CallbackStage::Line, || line.close()).err()));
        for failure in failures {
            tracing::warn!(
                board_id = %self.label,
                stage = %failure.stage,
                message = %failure.message,
                "Board callback failed while dropping"
            );
        }
        tracing::debug!(board_id = %self.label, "Board dropped without close");
    }
}

/// A periodically rendered, per-observer board
///
/// Cheap to clone; clones are handles to the same board. Dropping the last
/// handle without [`Board::close`] still closes the sender and the lines, but
/// a registered board keeps a handle in its registry until closed.
pub struct Board<O: Observer> {
    inner: Arc<BoardInner<O>>,
}

impl<O: Observer> Clone for Board<O> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<O: Observer> fmt::Debug for Board<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Board")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .field("tick", &self.inner.tick)
            .finish_non_exhaustive()
    }
}

impl<O: Observer> Board<O> {
    /// Registry id
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.inner.id.as_deref()
    }

    /// Render period
    #[must_use]
    pub fn tick(&self) -> Duration {
        self.inner.tick
    }

    /// Wait before the first scheduled render
    #[must_use]
    pub fn start_delay(&self) -> Duration {
        self.inner.start_delay
    }

    /// Lines by index
    #[must_use]
    pub fn lines(&self) -> &BTreeMap<usize, Line<O>> {
        &self.inner.lines
    }

    /// Title line
    #[must_use]
    pub fn title(&self) -> Option<&Line<O>> {
        self.inner.title.as_ref()
    }

    /// Lifecycle state
    #[must_use]
    pub fn state(&self) -> BoardState {
        match *self.inner.lifecycle.lock() {
            Lifecycle::Unstarted => BoardState::Unstarted,
            Lifecycle::Running(_) => BoardState::Running,
            Lifecycle::Closed => BoardState::Closed,
        }
    }

    /// Whether `close` has been called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Render counters
    #[must_use]
    pub fn stats(&self) -> BoardStats {
        self.inner.stats.snapshot()
    }

    /// Current static observers
    #[must_use]
    pub fn static_observers(&self) -> Vec<O> {
        self.inner.statics.lock().clone()
    }

    /// Add a static observer; returns false if it was already present
    pub fn add_observer(&self, observer: O) -> bool {
        let mut statics = self.inner.statics.lock();
        if statics.contains(&observer) {
            return false;
        }
        statics.push(observer);
        true
    }

    /// Remove a static observer; returns true if it was present
    pub fn remove_observer(&self, observer: &O) -> bool {
        let mut statics = self.inner.statics.lock();
        let before = statics.len();
        statics.retain(|o| o != observer);
        statics.len() != before
    }

    /// `observer` left: drop it from the static set and release its display
    ///
    /// Returns true if it was a static observer. The sender is told either
    /// way.
    pub fn evict(&self, observer: &O) -> bool {
        let removed = self.remove_observer(observer);
        self.evict_from_sender(observer);
        removed
    }

    /// Render once, outside the schedule
    ///
    /// Per-render state is reset first, so every title counts as changed.
    ///
    /// # Errors
    ///
    /// See [`Board::render`].
    pub fn send_once(&self) -> Result<RenderOutcome, BoardError> {
        self.render(true)
    }

    /// Run one render cycle
    ///
    /// Must not be called from inside one of this board's own callbacks.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Closed`] once closed, and [`BoardError::Send`] or
    /// [`BoardError::Panicked`] when delivery fails. Panicking callbacks
    /// other than the sender are reported, not returned.
    pub fn render(&self, reset_state: bool) -> Result<RenderOutcome, BoardError> {
        let inner = &*self.inner;
        let mut state = inner.gate.lock();
        if self.is_closed() {
            return Err(self.closed_error());
        }
        if reset_state {
            state.reset();
        }

        let mut failures = Vec::new();
        let mut statics = inner.statics.lock().clone();
        let resolution = inner.sources.resolve(&mut statics, &mut failures);
        if !resolution.evicted.is_empty() {
            inner
                .statics
                .lock()
                .retain(|o| !resolution.evicted.contains(o));
            for observer in &resolution.evicted {
                self.evict_from_sender(observer);
            }
            tracing::debug!(
                board_id = %inner.label,
                count = resolution.evicted.len(),
                "Evicted static observers"
            );
            inner.events.emit(BoardEvent::Evicted {
                board_id: inner.id.clone(),
                count: resolution.evicted.len(),
            });
        }

        let audience = resolution.audience;
        if audience.is_empty() {
            inner.stats.record_skip();
            tracing::debug!(board_id = %inner.label, "No observers, render skipped");
            inner.events.emit(BoardEvent::Skipped {
                board_id: inner.id.clone(),
            });
            self.report(failures);
            return Ok(RenderOutcome::Skipped);
        }

        run_hooks(&inner.run_before, CallbackStage::RunBefore, &audience, &mut failures);

        let (views, titles) = self.compose(&audience, &state, &mut failures);
        let sequence = state.sequence + 1;
        let frame = RenderFrame {
            board_id: inner.id.clone(),
            sequence,
            views,
        };

        if let Err(err) = self.deliver(&frame) {
            let consecutive = inner.stats.record_failure();
            tracing::warn!(
                board_id = %inner.label,
                consecutive = consecutive,
                error = %err,
                "Render failed"
            );
            inner.events.emit(BoardEvent::RenderFailed {
                board_id: inner.id.clone(),
                message: err.to_string(),
                consecutive,
            });
            self.report(failures);
            return Err(err);
        }

        state.sequence = sequence;
        state.last_titles.retain(|o, _| audience.contains(o));
        state.last_titles.extend(titles);
        drop(state);

        run_hooks(&inner.run_after, CallbackStage::RunAfter, &audience, &mut failures);

        inner.stats.record_render();
        tracing::trace!(
            board_id = %inner.label,
            sequence = sequence,
            audience = audience.len(),
            "Board rendered"
        );
        inner.events.emit(BoardEvent::Rendered {
            board_id: inner.id.clone(),
            sequence,
            audience: audience.len(),
        });
        self.report(failures);

        Ok(RenderOutcome::Rendered {
            audience: audience.len(),
            sequence,
        })
    }

    /// Render the title and every line for each observer
    ///
    /// Returns the views plus the titles to remember once delivery succeeds.
    fn compose(
        &self,
        audience: &Audience<O>,
        state: &RenderState<O>,
        failures: &mut Vec<CallbackFailure>,
    ) -> (Vec<ObserverView<O>>, Vec<(O, String)>) {
        let inner = &*self.inner;
        let mut memo = FrameMemo::new();
        let mut views = Vec::with_capacity(audience.len());
        let mut titles = Vec::new();

        for observer in audience {
            let mut title = None;
            let mut title_changed = false;
            if let Some(line) = &inner.title {
                match guarded(CallbackStage::Title, || line.render(observer, &mut memo)) {
                    Ok(text) => {
                        title_changed = state.last_titles.get(observer) != Some(&text);
                        titles.push((observer.clone(), text.clone()));
                        title = Some(text);
                    }
                    Err(failure) => failures.push(failure),
                }
            }

            let mut lines = BTreeMap::new();
            for (index, line) in &inner.lines {
                match guarded(CallbackStage::Line, || line.render(observer, &mut memo)) {
                    Ok(text) => {
                        lines.insert(*index, text);
                    }
                    Err(failure) => failures.push(failure),
                }
            }

            views.push(ObserverView {
                observer: observer.clone(),
                title,
                title_changed,
                lines,
            });
        }

        (views, titles)
    }

    fn deliver(&self, frame: &RenderFrame<O>) -> Result<(), BoardError> {
        match guarded(CallbackStage::Sender, || self.inner.sender.send(frame)) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(BoardError::Send {
                board: self.inner.label.clone(),
                source,
            }),
            Err(failure) => Err(BoardError::Panicked {
                board: self.inner.label.clone(),
                message: failure.message,
            }),
        }
    }

    fn evict_from_sender(&self, observer: &O) {
        if let Err(failure) = guarded(CallbackStage::Sender, || self.inner.sender.evict(observer)) {
            self.report(vec![failure]);
        }
    }

    fn report(&self, failures: Vec<CallbackFailure>) {
        for failure in failures {
            tracing::warn!(
                board_id = %self.inner.label,
                stage = %failure.stage,
                message = %failure.message,
                "Board callback failed"
            );
            self.inner.events.emit(BoardEvent::CallbackFailed {
                board_id: self.inner.id.clone(),
                stage: failure.stage,
                message: failure.message,
            });
        }
    }

    fn closed_error(&self) -> BoardError {
        BoardError::Closed {
            board: self.inner.label.clone(),
        }
    }

    /// Schedule renders: first after `start_delay`, then every `tick`
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Closed`] after `close`,
    /// [`BoardError::AlreadyRunning`] on a second `start`, and
    /// [`BoardError::NoRuntime`] when neither a configured runtime nor an
    /// ambient one is available.
    pub fn start(&self) -> Result<(), BoardError> {
        let inner = &*self.inner;
        let mut lifecycle = inner.lifecycle.lock();
        match *lifecycle {
            Lifecycle::Closed => return Err(self.closed_error()),
            Lifecycle::Running(_) => {
                return Err(BoardError::AlreadyRunning {
                    board: inner.label.clone(),
                })
            }
            Lifecycle::Unstarted => {}
        }

        let runtime = inner
            .runtime
            .clone()
            .or_else(|| Handle::try_current().ok())
            .ok_or_else(|| BoardError::NoRuntime {
                board: inner.label.clone(),
            })?;

        inner.gate.lock().reset();

        let weak: Weak<BoardInner<O>> = Arc::downgrade(&self.inner);
        let label = inner.label.clone();
        let job: RenderJob = Arc::new(move || match weak.upgrade() {
            Some(inner) => Board { inner }.render(false).map(|_| ()),
            None => Err(BoardError::Closed {
                board: label.clone(),
            }),
        });

        *lifecycle = Lifecycle::Running(RenderScheduler::spawn(
            &runtime,
            inner.label.clone(),
            inner.start_delay,
            inner.tick,
            job,
        ));
        tracing::info!(board_id = %inner.label, "Board started");
        Ok(())
    }

    /// Stop rendering for good and release every resource
    ///
    /// Waits for an in-flight render; no render starts after this returns.
    /// Closes the sender and every line, and frees the id in the registry.
    /// Calling it again does nothing.
    pub fn close(&self) {
        let inner = &*self.inner;
        let previous = std::mem::replace(&mut *inner.lifecycle.lock(), Lifecycle::Closed);
        if matches!(previous, Lifecycle::Closed) {
            return;
        }
        inner.closed.store(true, Ordering::SeqCst);
        if let Lifecycle::Running(scheduler) = previous {
            scheduler.stop();
        }
        drop(inner.gate.lock());

        if let Err(failure) = guarded(CallbackStage::Sender, || inner.sender.close()) {
            self.report(vec![failure]);
        }
        for line in inner.lines.values().chain(inner.title.iter()) {
            if let Err(failure) = guarded(CallbackStage::Line, || line.close()) {
                self.report(vec![failure]);
            }
        }
        if let (Some(id), Some(registry)) = (&inner.id, &inner.registry) {
            registry.release(id, self.identity());
        }

        tracing::info!(board_id = %inner.label, "Board closed");
        inner.events.emit(BoardEvent::Closed {
            board_id: inner.id.clone(),
        });
    }

    /// Whether `self` and `other` are handles to the same board
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Identity of the shared board state, stable for the board's lifetime
    pub(crate) fn identity(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }
}

fn run_hooks<O: Observer>(
    hooks: &[ObserverHook<O>],
    stage: CallbackStage,
    audience: &Audience<O>,
    failures: &mut Vec<CallbackFailure>,
) {
    for hook in hooks {
        for observer in audience {
            if let Err(failure) = guarded(stage, || hook(observer)) {
                failures.push(failure);
            }
        }
    }
}
