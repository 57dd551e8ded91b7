//! Observer Resolution - Who Sees a Board This Render
//!
//! Each render starts by working out the audience: the static observers that
//! survive eviction, plus whatever the dynamic suppliers return, all passed
//! through the inclusion filters.
//!
//! # Order
//!
//! 1. Eviction predicates run over the static set; matches are removed for good
//! 2. Surviving static observers that pass the filters seed the audience
//! 3. Single-observer suppliers run, each adding at most one observer
//! 4. List suppliers run, their results flattened in
//!
//! Duplicates collapse; the audience keeps first-seen order.
//!
//! Every callback runs behind the panic boundary in [`crate::guard`]. A failed
//! callback drops only its own contribution.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::guard::{guarded, CallbackFailure, CallbackStage};

/// Anything a board can render for
///
/// Blanket-implemented; observers are compared by equality and hashed to
/// de-duplicate the audience and key per-observer state.
pub trait Observer: Clone + Eq + Hash + Send + Sync + 'static {}

impl<T> Observer for T where T: Clone + Eq + Hash + Send + Sync + 'static {}

/// Inclusion filter or eviction predicate
pub type ObserverPredicate<O> = Arc<dyn Fn(&O) -> bool + Send + Sync>;

/// Yields zero or one observer per render
pub type ObserverSupplier<O> = Arc<dyn Fn() -> Option<O> + Send + Sync>;

/// Yields any number of observers per render
pub type ObserverListSupplier<O> = Arc<dyn Fn() -> Vec<O> + Send + Sync>;

/// Per-observer callback run before or after delivery
pub type ObserverHook<O> = Arc<dyn Fn(&O) + Send + Sync>;

/// How several inclusion filters combine
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterPolicy {
    /// Every filter must accept
    #[default]
    All,
    /// At least one filter must accept
    Any,
}

impl FilterPolicy {
    /// Whether `observer` is admitted by `filters`
    ///
    /// An empty filter set admits everyone under both policies. A filter that
    /// panics counts as rejecting and is recorded in `failures`.
    pub fn admits<O>(
        self,
        filters: &[ObserverPredicate<O>],
        observer: &O,
        failures: &mut Vec<CallbackFailure>,
    ) -> bool {
        if filters.is_empty() {
            return true;
        }
        let mut verdict = |filter: &ObserverPredicate<O>| {
            guarded(CallbackStage::Filter, || filter(observer)).unwrap_or_else(|failure| {
                failures.push(failure);
                false
            })
        };
        match self {
            Self::All => filters.iter().all(&mut verdict),
            Self::Any => filters.iter().any(&mut verdict),
        }
    }
}

/// The de-duplicated, ordered set of observers for one render
#[derive(Clone, Debug)]
pub struct Audience<O: Observer> {
    order: Vec<O>,
    seen: HashSet<O>,
}

impl<O: Observer> Audience<O> {
    /// An empty audience
    #[must_use]
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Add `observer` unless already present; returns true if added
    pub fn insert(&mut self, observer: O) -> bool {
        if self.seen.contains(&observer) {
            return false;
        }
        self.seen.insert(observer.clone());
        self.order.push(observer);
        true
    }

    /// Number of observers
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nobody is watching
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Whether `observer` is in the audience
    #[must_use]
    pub fn contains(&self, observer: &O) -> bool {
        self.seen.contains(observer)
    }

    /// Observers in first-seen order
    pub fn iter(&self) -> std::slice::Iter<'_, O> {
        self.order.iter()
    }

    /// Consume into first-seen order
    #[must_use]
    pub fn into_vec(self) -> Vec<O> {
        self.order
    }
}

impl<O: Observer> Default for Audience<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: Observer> FromIterator<O> for Audience<O> {
    fn from_iter<I: IntoIterator<Item = O>>(iter: I) -> Self {
        let mut audience = Self::new();
        for observer in iter {
            audience.insert(observer);
        }
        audience
    }
}

impl<'a, O: Observer> IntoIterator for &'a Audience<O> {
    type Item = &'a O;
    type IntoIter = std::slice::Iter<'a, O>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Result of one resolution pass
#[derive(Debug)]
pub struct Resolution<O: Observer> {
    /// Who the board renders for
    pub audience: Audience<O>,
    /// Static observers removed by eviction predicates during this pass
    pub evicted: Vec<O>,
}

/// The dynamic half of a board's observer configuration
pub struct ObserverSources<O> {
    /// Single-observer suppliers
    pub dynamic_observers: Vec<ObserverSupplier<O>>,
    /// Observer-list suppliers
    pub dynamic_observer_lists: Vec<ObserverListSupplier<O>>,
    /// Inclusion filters
    pub filters: Vec<ObserverPredicate<O>>,
    /// How filters combine
    pub filter_policy: FilterPolicy,
    /// Eviction predicates over the static set
    pub remove_if: Vec<ObserverPredicate<O>>,
}

impl<O> Default for ObserverSources<O> {
    fn default() -> Self {
        Self {
            dynamic_observers: Vec::new(),
            dynamic_observer_lists: Vec::new(),
            filters: Vec::new(),
            filter_policy: FilterPolicy::default(),
            remove_if: Vec::new(),
        }
    }
}

impl<O> Clone for ObserverSources<O> {
    fn clone(&self) -> Self {
        Self {
            dynamic_observers: self.dynamic_observers.clone(),
            dynamic_observer_lists: self.dynamic_observer_lists.clone(),
            filters: self.filters.clone(),
            filter_policy: self.filter_policy,
            remove_if: self.remove_if.clone(),
        }
    }
}

impl<O: Observer> ObserverSources<O> {
    /// Whether any eviction predicate accepts `observer`
    fn evicts(&self, observer: &O, failures: &mut Vec<CallbackFailure>) -> bool {
        self.remove_if.iter().any(|predicate| {
            guarded(CallbackStage::RemoveIf, || predicate(observer)).unwrap_or_else(|failure| {
                failures.push(failure);
                false
            })
        })
    }

    /// Resolve the audience, pruning `statics` in place
    pub fn resolve(&self, statics: &mut Vec<O>, failures: &mut Vec<CallbackFailure>) -> Resolution<O> {
        let mut evicted = Vec::new();
        if !self.remove_if.is_empty() {
            let mut kept = Vec::with_capacity(statics.len());
            for observer in statics.drain(..) {
                if self.evicts(&observer, failures) {
                    evicted.push(observer);
                } else {
                    kept.push(observer);
                }
            }
            *statics = kept;
        }

        let mut audience = Audience::new();
        let policy = self.filter_policy;
        for observer in statics.iter() {
            if policy.admits(&self.filters, observer, failures) {
                audience.insert(observer.clone());
            }
        }

        for supplier in &self.dynamic_observers {
            match guarded(CallbackStage::Supplier, || supplier()) {
                Ok(Some(observer)) => {
                    if policy.admits(&self.filters, &observer, failures) {
                        audience.insert(observer);
                    }
                }
                Ok(None) => {}
                Err(failure) => failures.push(failure),
            }
        }

        for supplier in &self.dynamic_observer_lists {
            match guarded(CallbackStage::ListSupplier, || supplier()) {
                Ok(observers) => {
                    for observer in observers {
                        if policy.admits(&self.filters, &observer, failures) {
                            audience.insert(observer);
                        }
                    }
                }
                Err(failure) => failures.push(failure),
            }
        }

        Resolution { audience, evicted }
    }
}
