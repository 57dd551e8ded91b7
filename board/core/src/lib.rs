//! Board Core - Tick-Driven, Per-Observer Text Boards
//!
//! This crate renders "boards": small multi-line text displays that every
//! observer sees with their own content. A board resolves who is watching,
//! renders its title and lines for each of them (advancing any animations),
//! and hands the result to a pluggable sender on a fixed period.
//!
//! It has no opinion on how text reaches a screen. That is the
//! [`BoardSender`]'s job.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          BoardRegistry                            │
//! │            id ──► Board<O>  (typed and type-erased lookup)        │
//! └──────────────────────────────┬───────────────────────────────────┘
//!                                │
//! ┌──────────────────────────────┼───────────────────────────────────┐
//! │                           Board<O>                                │
//! │                                                                   │
//! │  RenderScheduler ──tick──► render()                               │
//! │                              │                                    │
//! │           ┌──────────────────┼──────────────────────┐             │
//! │           ▼                  ▼                      ▼             │
//! │   ObserverSources       Line<O> / Animation     BoardSender<O>    │
//! │   (statics, suppliers,  (static, dynamic,       (send, evict,     │
//! │    filters, eviction)    merged, framed,         close)           │
//! │                          highlighted, scrolled)                   │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`BoardConfig`]: everything a board needs, validated by `build`
//! - [`Board`]: the running board; `render`, `start`, `close`
//! - [`Line`]: one row of text per observer
//! - [`BoardSender`]: where rendered frames go
//! - [`BoardRegistry`]: id lookup across boards
//!
//! # Quick Start
//!
//! ```ignore
//! use board_core::{BoardConfig, BoardRegistry, Line, Scrolled};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), board_core::BoardError> {
//!     let registry = BoardRegistry::new();
//!     let board = BoardConfig::new()
//!         .with_id("lobby")
//!         .with_title(Line::framed(["Lobby", "LOBBY"]))
//!         .push_line(Line::dynamic(|name: &String| format!("Welcome, {name}")))
//!         .push_line(Line::animated(Scrolled::new("News: servers restart at noon", 2, 20)))
//!         .with_observer("ann".to_string())
//!         .with_sender(my_sender)
//!         .build(&registry)?;
//!
//!     board.start()?;
//!     // ...
//!     registry.close_all();
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`board`]: configuration, render cycle and lifecycle
//! - [`line`]: lines and animation engines
//! - [`color`]: escape-sequence awareness for scrolling text
//! - [`observer`]: audience resolution
//! - [`sender`]: the delivery boundary
//! - [`scheduler`]: the per-board timer
//! - [`registry`]: id lookup
//! - [`events`]: events and statistics
//! - [`guard`]: panic containment for user callbacks
//! - [`test_utils`]: recording sender for tests

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod board;
pub mod color;
pub mod error;
pub mod events;
pub mod guard;
pub mod line;
pub mod observer;
pub mod registry;
pub mod scheduler;
pub mod sender;
pub mod test_utils;

pub use board::{Board, BoardConfig, BoardState, RenderOutcome, DEFAULT_TICK};
pub use color::{LineColor, SectionColor, SECTION_SIGN};
pub use error::BoardError;
pub use events::{BoardEvent, BoardStats};
pub use guard::{CallbackFailure, CallbackStage};
pub use line::{Animation, Framed, Highlighted, Line, LineSource, Scrolled};
pub use observer::{
    Audience, FilterPolicy, Observer, ObserverHook, ObserverListSupplier, ObserverPredicate,
    ObserverSupplier,
};
pub use registry::{BoardRegistry, ManagedBoard, RegistrySummary};
pub use scheduler::{ticks, TICK};
pub use sender::{BoardSender, NullSender, ObserverView, RenderFrame, SendError};
