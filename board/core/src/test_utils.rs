//! Test doubles for boards
//!
//! [`RecordingSender`] keeps every frame it is given so tests can assert on
//! exactly what a board delivered.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::observer::Observer;
use crate::sender::{BoardSender, RenderFrame, SendError};

#[derive(Debug)]
struct Recorded<O> {
    frames: Vec<RenderFrame<O>>,
    evicted: Vec<O>,
    close_count: usize,
    fail_with: Option<SendError>,
}

/// A sender that records frames, evictions and closes
///
/// Clones share the same record, so keep one clone for assertions and hand
/// another to the board.
#[derive(Debug, Clone)]
pub struct RecordingSender<O> {
    inner: Arc<Mutex<Recorded<O>>>,
}

impl<O: Observer> RecordingSender<O> {
    /// A sender that accepts every frame
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Recorded {
                frames: Vec::new(),
                evicted: Vec::new(),
                close_count: 0,
                fail_with: None,
            })),
        }
    }

    /// A sender that rejects every frame with [`SendError::Delivery`]
    #[must_use]
    pub fn failing() -> Self {
        let sender = Self::new();
        sender.fail_with(Some(SendError::Delivery("recording sender set to fail".to_string())));
        sender
    }

    /// Start (or with `None`, stop) failing sends
    pub fn fail_with(&self, error: Option<SendError>) {
        self.inner.lock().fail_with = error;
    }

    /// Number of accepted frames
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.inner.lock().frames.len()
    }

    /// Every accepted frame, oldest first
    #[must_use]
    pub fn frames(&self) -> Vec<RenderFrame<O>> {
        self.inner.lock().frames.clone()
    }

    /// The most recent accepted frame
    #[must_use]
    pub fn last_frame(&self) -> Option<RenderFrame<O>> {
        self.inner.lock().frames.last().cloned()
    }

    /// Observers passed to `evict`, in call order
    #[must_use]
    pub fn evicted(&self) -> Vec<O> {
        self.inner.lock().evicted.clone()
    }

    /// Number of `close` calls
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.inner.lock().close_count
    }
}

impl<O: Observer> Default for RecordingSender<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: Observer> BoardSender<O> for RecordingSender<O> {
    fn send(&self, frame: &RenderFrame<O>) -> Result<(), SendError> {
        let mut recorded = self.inner.lock();
        if let Some(error) = &recorded.fail_with {
            return Err(error.clone());
        }
        recorded.frames.push(frame.clone());
        Ok(())
    }

    fn evict(&self, observer: &O) {
        self.inner.lock().evicted.push(observer.clone());
    }

    fn close(&self) {
        self.inner.lock().close_count += 1;
    }
}
