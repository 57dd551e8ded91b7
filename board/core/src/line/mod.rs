//! Board Lines - Text Producers and Animations
//!
//! A [`Line`] turns an observer into one row of board text. Lines compose:
//! a merged line concatenates its parts, and animated lines keep their own
//! frame cursor that advances every time they render.
//!
//! # Architecture
//!
//! ```text
//! Line<O>
//!   ├── Static      constant text, never recomputed
//!   ├── Dynamic     Fn(&O) -> String
//!   ├── Merged      Vec<Line<O>>, concatenated in order
//!   ├── Animated    Arc<Animation>
//!   │     ├── Framed       explicit frame list
//!   │     ├── Highlighted  highlight swept across a text
//!   │     └── Scrolled     marquee with color repair
//!   └── Custom      Arc<dyn LineSource<O>>
//! ```
//!
//! # Animation clock
//!
//! Each animated instance owns one cursor. [`Line::apply`] advances it on
//! every call. A board render evaluates each animated instance once and
//! shows that frame to the whole audience, so one render is one frame.

mod framed;
mod highlighted;
mod scrolled;

pub use framed::{step, Framed, NO_FRAME};
pub use highlighted::Highlighted;
pub use scrolled::Scrolled;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A stateful frame generator
#[derive(Debug, Clone)]
pub enum Animation {
    /// Explicit, editable frames
    Framed(Framed),
    /// Highlight sweep
    Highlighted(Highlighted),
    /// Marquee scroll
    Scrolled(Scrolled),
}

impl Animation {
    /// Whether rendering advances this animation
    #[must_use]
    pub fn animate(&self) -> bool {
        match self {
            Self::Framed(f) => f.animate(),
            Self::Highlighted(h) => h.frames().animate(),
            Self::Scrolled(s) => s.animate(),
        }
    }

    /// Whether rendering moves forward
    #[must_use]
    pub fn forward(&self) -> bool {
        match self {
            Self::Framed(f) => f.forward(),
            Self::Highlighted(h) => h.frames().forward(),
            Self::Scrolled(s) => s.forward(),
        }
    }

    /// The frame last shown, `None` before the first advance
    #[must_use]
    pub fn current(&self) -> Option<String> {
        match self {
            Self::Framed(f) => f.current(),
            Self::Highlighted(h) => h.frames().current(),
            Self::Scrolled(s) => s.current(),
        }
    }

    /// Advance and return the new frame
    pub fn next(&self) -> Option<String> {
        match self {
            Self::Framed(f) => f.next(),
            Self::Highlighted(h) => h.frames().next(),
            Self::Scrolled(s) => Some(s.next()),
        }
    }

    /// Retreat and return the new frame
    pub fn previous(&self) -> Option<String> {
        match self {
            Self::Framed(f) => f.previous(),
            Self::Highlighted(h) => h.frames().previous(),
            Self::Scrolled(s) => Some(s.previous()),
        }
    }

    /// Produce the next text according to `animate` and `forward`
    pub fn apply(&self) -> String {
        let text = if !self.animate() {
            self.current()
        } else if self.forward() {
            self.next()
        } else {
            self.previous()
        };
        text.unwrap_or_default()
    }

    /// The frame list behind a framed or highlighted animation
    #[must_use]
    pub fn frames(&self) -> Option<&Framed> {
        match self {
            Self::Framed(f) => Some(f),
            Self::Highlighted(h) => Some(h.frames()),
            Self::Scrolled(_) => None,
        }
    }
}

impl From<Framed> for Animation {
    fn from(value: Framed) -> Self {
        Self::Framed(value)
    }
}

impl From<Highlighted> for Animation {
    fn from(value: Highlighted) -> Self {
        Self::Highlighted(value)
    }
}

impl From<Scrolled> for Animation {
    fn from(value: Scrolled) -> Self {
        Self::Scrolled(value)
    }
}

/// A line kind supplied by the embedding application
pub trait LineSource<O>: Send + Sync {
    /// Text for `observer`
    fn apply(&self, observer: &O) -> String;

    /// Whether the text can change between renders
    fn requires_recompute(&self) -> bool {
        true
    }

    /// Release resources; called when the owning board closes
    fn close(&self) {}
}

/// Per-render cache of animated frames, keyed by animation instance
#[derive(Debug, Default)]
pub(crate) struct FrameMemo {
    frames: HashMap<usize, String>,
}

impl FrameMemo {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

/// One row of board text
pub enum Line<O> {
    /// Constant text
    Static(String),
    /// Text computed from the observer
    Dynamic(Arc<dyn Fn(&O) -> String + Send + Sync>),
    /// Parts rendered in order and concatenated
    Merged(Vec<Line<O>>),
    /// Frame-advancing text; clones share the cursor
    Animated(Arc<Animation>),
    /// Application-defined line
    Custom(Arc<dyn LineSource<O>>),
}

impl<O> Line<O> {
    /// A line that always shows `text`
    pub fn constant(text: impl Into<String>) -> Self {
        Self::Static(text.into())
    }

    /// A line computed per observer
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&O) -> String + Send + Sync + 'static,
    {
        Self::Dynamic(Arc::new(f))
    }

    /// Concatenate `parts` in order
    pub fn merged(parts: impl IntoIterator<Item = Line<O>>) -> Self {
        Self::Merged(parts.into_iter().collect())
    }

    /// Cycle through `frames`
    pub fn framed<I, S>(frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::animated(Framed::new(frames))
    }

    /// Wrap any animation engine
    pub fn animated(animation: impl Into<Animation>) -> Self {
        Self::Animated(Arc::new(animation.into()))
    }

    /// Wrap an application-defined line
    pub fn custom(source: impl LineSource<O> + 'static) -> Self {
        Self::Custom(Arc::new(source))
    }

    /// Text for `observer`
    ///
    /// Animated lines advance on every call.
    pub fn apply(&self, observer: &O) -> String {
        match self {
            Self::Static(text) => text.clone(),
            Self::Dynamic(f) => f(observer),
            Self::Merged(parts) => parts.iter().map(|part| part.apply(observer)).collect(),
            Self::Animated(animation) => animation.apply(),
            Self::Custom(source) => source.apply(observer),
        }
    }

    /// Whether the text can change between renders
    #[must_use]
    pub fn requires_recompute(&self) -> bool {
        match self {
            Self::Static(_) => false,
            Self::Merged(parts) => parts.iter().any(Line::requires_recompute),
            Self::Dynamic(_) | Self::Animated(_) => true,
            Self::Custom(source) => source.requires_recompute(),
        }
    }

    /// Release resources held by custom parts
    pub fn close(&self) {
        match self {
            Self::Merged(parts) => parts.iter().for_each(Line::close),
            Self::Custom(source) => source.close(),
            Self::Static(_) | Self::Dynamic(_) | Self::Animated(_) => {}
        }
    }

    /// The animation behind this line, if it is animated
    #[must_use]
    pub fn animation(&self) -> Option<&Animation> {
        match self {
            Self::Animated(animation) => Some(animation),
            _ => None,
        }
    }

    /// Text for `observer` inside a board render
    ///
    /// Each animated instance advances once per `memo` and repeats that frame
    /// for later observers.
    pub(crate) fn render(&self, observer: &O, memo: &mut FrameMemo) -> String {
        match self {
            Self::Animated(animation) => {
                let key = Arc::as_ptr(animation) as usize;
                memo.frames
                    .entry(key)
                    .or_insert_with(|| animation.apply())
                    .clone()
            }
            Self::Merged(parts) => parts.iter().map(|part| part.render(observer, memo)).collect(),
            _ => self.apply(observer),
        }
    }
}

impl<O> Clone for Line<O> {
    fn clone(&self) -> Self {
        match self {
            Self::Static(text) => Self::Static(text.clone()),
            Self::Dynamic(f) => Self::Dynamic(Arc::clone(f)),
            Self::Merged(parts) => Self::Merged(parts.clone()),
            Self::Animated(animation) => Self::Animated(Arc::clone(animation)),
            Self::Custom(source) => Self::Custom(Arc::clone(source)),
        }
    }
}

impl<O> fmt::Debug for Line<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(text) => f.debug_tuple("Static").field(text).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
            Self::Merged(parts) => f.debug_tuple("Merged").field(parts).finish(),
            Self::Animated(animation) => f.debug_tuple("Animated").field(animation).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl<O> From<&str> for Line<O> {
    fn from(value: &str) -> Self {
        Self::constant(value)
    }
}

impl<O> From<String> for Line<O> {
    fn from(value: String) -> Self {
        Self::Static(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_static_line_ignores_observer() {
        let line: Line<u32> = "hello".into();
        assert_eq!(line.apply(&1), "hello");
        assert_eq!(line.apply(&2), "hello");
        assert!(!line.requires_recompute());
    }

    #[test]
    fn test_merged_concatenates_in_order() {
        let line: Line<String> = Line::merged([Line::constant("a"), Line::dynamic(|o: &String| o.clone())]);
        assert_eq!(line.apply(&"bob".to_string()), "abob");
        assert!(line.requires_recompute());

        let flat: Line<String> = Line::merged([Line::constant("x"), Line::constant("y")]);
        assert!(!flat.requires_recompute());
    }

    #[test]
    fn test_apply_advances_every_call() {
        let line: Line<u8> = Line::framed(["1", "2"]);
        assert_eq!(line.apply(&0), "1");
        assert_eq!(line.apply(&0), "2");
        assert_eq!(line.apply(&0), "1");
    }

    #[test]
    fn test_render_advances_once_per_memo() {
        let line: Line<u8> = Line::framed(["1", "2", "3"]);
        let merged: Line<u8> = Line::merged([line.clone(), Line::constant("|"), line.clone()]);

        let mut memo = FrameMemo::new();
        assert_eq!(merged.render(&1, &mut memo), "1|1");
        assert_eq!(merged.render(&2, &mut memo), "1|1");
        assert_eq!(line.render(&3, &mut memo), "1");

        let mut memo = FrameMemo::new();
        assert_eq!(merged.render(&1, &mut memo), "2|2");
    }

    #[test]
    fn test_frozen_animation_shows_current_or_empty() {
        let line: Line<u8> = Line::animated(Framed::new(["a", "b"]).frozen());
        assert_eq!(line.apply(&0), "");
        if let Some(frames) = line.animation().and_then(Animation::frames) {
            frames.set_current_frame(1);
        }
        assert_eq!(line.apply(&0), "b");
        assert!(line.requires_recompute());
    }

    #[test]
    fn test_scrolled_animation_dispatch() {
        let line: Line<u8> = Line::animated(Scrolled::new("Hi", 1, 6));
        assert_eq!(line.apply(&0), "\u{a7}rHi  ");
        let animation = line.animation().map(Animation::current);
        assert_eq!(animation.flatten().as_deref(), Some("\u{a7}rHi  "));
    }

    struct Closing(AtomicBool);

    impl LineSource<u8> for Closing {
        fn apply(&self, observer: &u8) -> String {
            format!("#{observer}")
        }

        fn requires_recompute(&self) -> bool {
            false
        }

        fn close(&self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_custom_line_is_closed_through_merge() {
        let source = Arc::new(Closing(AtomicBool::new(false)));
        let line: Line<u8> = Line::merged([Line::Custom(source.clone()), Line::constant("!")]);
        assert_eq!(line.apply(&4), "#4!");
        assert!(!line.requires_recompute());
        line.close();
        assert!(source.0.load(Ordering::SeqCst));
    }
}
