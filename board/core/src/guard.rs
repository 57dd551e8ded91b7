//! Callback error boundary
//!
//! Every piece of user code a board runs (filters, suppliers, hooks, lines,
//! the sender) goes through [`guarded`] so one misbehaving callback costs its
//! own contribution to a render and nothing more.

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::{Deserialize, Serialize};

/// Which kind of user callback failed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallbackStage {
    /// Inclusion filter
    Filter,
    /// Eviction predicate
    RemoveIf,
    /// Single-observer supplier
    Supplier,
    /// Observer-list supplier
    ListSupplier,
    /// Pre-render hook
    RunBefore,
    /// Post-render hook
    RunAfter,
    /// Board title line
    Title,
    /// Board content line
    Line,
    /// Sender delivery or eviction
    Sender,
}

impl CallbackStage {
    /// Human-readable label
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Filter => "filter",
            Self::RemoveIf => "remove-if",
            Self::Supplier => "supplier",
            Self::ListSupplier => "list-supplier",
            Self::RunBefore => "run-before",
            Self::RunAfter => "run-after",
            Self::Title => "title",
            Self::Line => "line",
            Self::Sender => "sender",
        }
    }
}

impl fmt::Display for CallbackStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A user callback that panicked during a render
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallbackFailure {
    /// Where the failure happened
    pub stage: CallbackStage,
    /// Panic message, if one could be extracted
    pub message: String,
}

impl CallbackFailure {
    fn from_panic(stage: CallbackStage, payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self { stage, message }
    }
}

impl fmt::Display for CallbackFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} callback panicked: {}", self.stage, self.message)
    }
}

/// Run `f`, converting a panic into a [`CallbackFailure`]
pub(crate) fn guarded<T>(stage: CallbackStage, f: impl FnOnce() -> T) -> Result<T, CallbackFailure> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| CallbackFailure::from_panic(stage, &*payload))
}
