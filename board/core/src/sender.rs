//! Sender Boundary - Handing Rendered Boards to a Display
//!
//! A board never talks to a display itself. After a render it packs every
//! observer's title and lines into a [`RenderFrame`] and hands it to its
//! [`BoardSender`]. The sender owns whatever per-observer display state the
//! target needs and releases it on [`BoardSender::evict`] and
//! [`BoardSender::close`].
//!
//! A board calls its sender from one render at a time; different boards may
//! share a sender and call it concurrently.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::observer::Observer;

/// Delivery failure reported by a sender
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    /// The display rejected or failed to apply the frame
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// The sender was closed
    #[error("sender is closed")]
    Closed,
}

/// Everything one observer sees after a render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObserverView<O> {
    /// Who this view is for
    pub observer: O,
    /// Rendered title, when the board has one
    pub title: Option<String>,
    /// Whether the title differs from the one last sent to this observer
    pub title_changed: bool,
    /// Rendered lines by index
    pub lines: BTreeMap<usize, String>,
}

impl<O> ObserverView<O> {
    /// Lines in index order
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.lines.values().map(String::as_str)
    }
}

/// One render's output for the whole audience
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderFrame<O> {
    /// Id of the rendering board, if it has one
    pub board_id: Option<String>,
    /// Render counter of the board, starting at 1
    pub sequence: u64,
    /// One view per observer, in audience order
    pub views: Vec<ObserverView<O>>,
}

impl<O: Observer> RenderFrame<O> {
    /// Observers this frame was rendered for
    pub fn audience(&self) -> impl Iterator<Item = &O> {
        self.views.iter().map(|view| &view.observer)
    }

    /// The view rendered for `observer`
    #[must_use]
    pub fn view_for(&self, observer: &O) -> Option<&ObserverView<O>> {
        self.views.iter().find(|view| &view.observer == observer)
    }
}

/// Delivers rendered frames to a display
pub trait BoardSender<O>: Send + Sync {
    /// Deliver one render
    ///
    /// # Errors
    ///
    /// Returns [`SendError`] when the frame could not be delivered. The board
    /// reports the failure and tries again on the next tick.
    fn send(&self, frame: &RenderFrame<O>) -> Result<(), SendError>;

    /// `observer` left: release whatever the display holds for it
    fn evict(&self, _observer: &O) {}

    /// Release every per-observer resource
    ///
    /// Must tolerate being called more than once.
    fn close(&self) {}
}

/// Sender that discards every frame
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSender;

impl<O> BoardSender<O> for NullSender {
    fn send(&self, _frame: &RenderFrame<O>) -> Result<(), SendError> {
        Ok(())
    }
}
