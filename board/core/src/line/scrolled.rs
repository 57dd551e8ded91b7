//! Marquee scrolling with color-sequence repair
//!
//! # Window generation
//!
//! The message is padded to the display width, then cut into windows of
//! `width - 2` characters (at least one):
//!
//! 1. windows sliding across the message,
//! 2. `space_between` transition windows where blank space grows in from the
//!    right,
//! 3. windows where the start of the message re-enters after the gap,
//! 4. windows where the gap drains out to the left.
//!
//! The last window flows back into the first, so the list is circular.
//!
//! # Color repair
//!
//! Slicing can cut a `§x` sequence in half. A window ending in the escape
//! character gets it replaced with a space. A window starting with a full
//! sequence switches the line's current color to it, moves on to the next
//! window and blanks that window's first character. Every output is prefixed
//! with the current color's sequence.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::color::{LineColor, SectionColor};

#[derive(Debug)]
struct ScrollState {
    color: Arc<dyn LineColor>,
    last: Option<String>,
}

/// A line that scrolls a message through a fixed-width window
#[derive(Debug)]
pub struct Scrolled {
    message: String,
    width: usize,
    space_between: usize,
    windows: Vec<String>,
    position: AtomicUsize,
    state: Mutex<ScrollState>,
    animate: bool,
    forward: bool,
}

impl Scrolled {
    /// Scroll `message` through `width` columns, leaving `space_between` blank
    /// columns before it wraps around, starting in [`SectionColor::RESET`]
    pub fn new(message: impl Into<String>, space_between: usize, width: usize) -> Self {
        Self::with_color(message, space_between, width, SectionColor::RESET.shared())
    }

    /// Like [`Scrolled::new`] with an explicit starting color
    pub fn with_color(
        message: impl Into<String>,
        space_between: usize,
        width: usize,
        color: Arc<dyn LineColor>,
    ) -> Self {
        let message = message.into();
        let windows = generate_windows(&message, space_between, width);
        Self {
            message,
            width,
            space_between,
            windows,
            position: AtomicUsize::new(0),
            state: Mutex::new(ScrollState { color, last: None }),
            animate: true,
            forward: true,
        }
    }

    /// Keep showing the last produced window
    #[must_use]
    pub fn frozen(mut self) -> Self {
        self.animate = false;
        self
    }

    /// Scroll right instead of left
    #[must_use]
    pub fn reversed(mut self) -> Self {
        self.forward = false;
        self
    }

    /// Whether rendering advances the scroll
    #[must_use]
    pub fn animate(&self) -> bool {
        self.animate
    }

    /// Whether the scroll moves forward through the windows
    #[must_use]
    pub fn forward(&self) -> bool {
        self.forward
    }

    /// The unscrolled message
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Display width the windows were cut for
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Blank columns between the end of the message and its restart
    #[must_use]
    pub fn space_between(&self) -> usize {
        self.space_between
    }

    /// Every generated window, before color repair
    #[must_use]
    pub fn windows(&self) -> &[String] {
        &self.windows
    }

    /// Index of the window the next forward step will show
    #[must_use]
    pub fn position(&self) -> usize {
        self.position.load(Ordering::SeqCst)
    }

    /// The color currently prefixed to every output
    #[must_use]
    pub fn color(&self) -> Arc<dyn LineColor> {
        Arc::clone(&self.state.lock().color)
    }

    /// The last produced output, `None` before the first step
    #[must_use]
    pub fn current(&self) -> Option<String> {
        self.state.lock().last.clone()
    }

    /// Scroll one step forward
    pub fn next(&self) -> String {
        self.step(true)
    }

    /// Scroll one step backward
    pub fn previous(&self) -> String {
        self.step(false)
    }

    fn window(&self, forward: bool) -> Vec<char> {
        let len = self.windows.len();
        let index = if forward {
            self.position
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |p| Some((p + 1) % len))
                .unwrap_or_default()
        } else {
            let previous = self
                .position
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |p| Some((p + len - 1) % len))
                .unwrap_or_default();
            (previous + len - 1) % len
        };
        self.windows[index % len].chars().collect()
    }

    fn step(&self, forward: bool) -> String {
        if self.windows.is_empty() {
            return String::new();
        }
        let mut state = self.state.lock();
        let escape = state.color.escape_char();

        let mut window = self.window(forward);
        if window.last() == Some(&escape) {
            if let Some(last) = window.last_mut() {
                *last = ' ';
            }
        }
        if window.first() == Some(&escape) {
            if let Some(color) = window.get(1).and_then(|code| state.color.by_code(*code)) {
                state.color = color;
                window = self.window(forward);
                if let Some(first) = window.first_mut() {
                    *first = ' ';
                }
            }
        }

        let text: String = window.into_iter().collect();
        let output = format!("{}{text}", state.color.sequence());
        state.last = Some(output.clone());
        output
    }
}

impl Clone for Scrolled {
    fn clone(&self) -> Self {
        let state = self.state.lock();
        Self {
            message: self.message.clone(),
            width: self.width,
            space_between: self.space_between,
            windows: self.windows.clone(),
            position: AtomicUsize::new(self.position()),
            state: Mutex::new(ScrollState {
                color: Arc::clone(&state.color),
                last: state.last.clone(),
            }),
            animate: self.animate,
            forward: self.forward,
        }
    }
}

/// Cut `message` into the circular window list described in the module docs
fn generate_windows(message: &str, space_between: usize, width: usize) -> Vec<String> {
    let window = width.saturating_sub(2).max(1);
    let mut chars: Vec<char> = message.chars().collect();
    let padded = width.max(window);
    if chars.len() < padded {
        chars.resize(padded, ' ');
    }
    let len = chars.len();
    let slice = |from: usize, to: usize| -> String { chars[from..to].iter().collect() };

    let mut windows = Vec::new();
    for i in 0..len - window {
        windows.push(slice(i, i + window));
    }

    let mut space = String::new();
    for i in 0..space_between {
        windows.push(format!("{}{space}", slice(len - window + i.min(window), len)));
        if space.len() < window {
            space.push(' ');
        }
    }

    for i in 0..window.saturating_sub(space_between) {
        windows.push(format!(
            "{}{space}{}",
            slice(len - window + space_between + i, len),
            slice(0, i)
        ));
    }

    for i in 0..space_between {
        if i > space.len() {
            break;
        }
        let reentry = window - space_between.min(window) + i;
        windows.push(format!("{}{}", &space[..space.len() - i], slice(0, reentry.min(len))));
    }

    windows
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_short_message_is_padded_before_windowing() {
        let line = Scrolled::new("Hi", 1, 6);
        assert_eq!(
            line.windows(),
            &["Hi  ", "i   ", "    ", "    ", "   H", "  Hi", " Hi "]
        );
    }

    #[test]
    fn test_window_count_follows_construction_rule() {
        // 3 sliding + 2 transition + 6 re-entry + 2 drain
        let line = Scrolled::new("Hello World", 2, 10);
        assert_eq!(line.windows().len(), 13);
        assert!(line.windows().iter().all(|w| w.chars().count() == 8));
        assert_eq!(line.windows()[0], "Hello Wo");
        assert_eq!(line.windows()[12], " Hello W");
    }

    #[test]
    fn test_gap_wider_than_window_stops_growing() {
        let line = Scrolled::new("abcd", 5, 3);
        assert!(line.windows().iter().all(|w| w.chars().count() == 1));
        assert_eq!(line.windows().len(), 3 + 5 + 2);
    }

    #[test]
    fn test_tiny_width_still_produces_windows() {
        let line = Scrolled::new("", 0, 0);
        assert_eq!(line.windows(), &[" "]);
        assert_eq!(line.next(), "\u{a7}r ");
    }

    #[test]
    fn test_next_wraps_around() {
        let line = Scrolled::new("Hi", 1, 6);
        let first = line.next();
        for _ in 1..line.windows().len() {
            line.next();
        }
        assert_eq!(line.next(), first);
        assert_eq!(line.position(), 1);
    }

    #[test]
    fn test_color_sequences_are_repaired() {
        let line = Scrolled::new("abc\u{a7}ade", 0, 5);
        assert_eq!(
            line.windows(),
            &["abc", "bc\u{a7}", "c\u{a7}a", "\u{a7}ad", "ade", "dea", "eab"]
        );
        assert_eq!(line.next(), "\u{a7}rabc");
        assert_eq!(line.next(), "\u{a7}rbc ");
        assert_eq!(line.next(), "\u{a7}rc\u{a7}a");
        assert_eq!(line.next(), "\u{a7}a de");
        assert_eq!(line.next(), "\u{a7}adea");
        assert_eq!(line.color().sequence(), "\u{a7}a");
        assert_eq!(line.current().as_deref(), Some("\u{a7}adea"));
    }

    #[test]
    fn test_previous_walks_backwards() {
        let line = Scrolled::new("Hi", 1, 6);
        assert_eq!(line.previous(), "\u{a7}r Hi ");
        assert_eq!(line.previous(), "\u{a7}r  Hi");
        assert_eq!(line.position(), 5);
    }

    #[test]
    fn test_current_before_first_step_is_none() {
        let line = Scrolled::new("Hi", 1, 6).frozen();
        assert!(!line.animate());
        assert_eq!(line.current(), None);
    }
}
