//! Frame storage and the circular frame-advance rule
//!
//! [`step`] is the one place that knows how a frame cursor moves. Framed and
//! highlighted lines both keep a [`Framed`] and let it drive their output.

use parking_lot::Mutex;

/// Cursor value meaning "no frame shown yet"
pub const NO_FRAME: isize = -1;

/// Move a frame cursor one step over `len` frames
///
/// Forward wraps from the last index to 0; backward wraps from the first
/// index (or from [`NO_FRAME`]) to the last. Returns `None` when there are no
/// frames to move over.
#[must_use]
pub fn step(current: isize, len: usize, forward: bool) -> Option<isize> {
    let last = isize::try_from(len).ok()?.checked_sub(1)?;
    if last < 0 {
        return None;
    }
    let next = if forward {
        let next = current + 1;
        if next > last || next < 0 {
            0
        } else {
            next
        }
    } else {
        let previous = current - 1;
        if previous <= NO_FRAME || previous > last {
            last
        } else {
            previous
        }
    };
    Some(next)
}

#[derive(Debug)]
struct FrameState {
    frames: Vec<String>,
    current: isize,
}

impl FrameState {
    fn at(&self, index: isize) -> Option<String> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.frames.get(i))
            .cloned()
    }

    /// Keep the cursor inside `[-1, len - 1]` after frames were removed
    fn clamp(&mut self) {
        let last = isize::try_from(self.frames.len()).unwrap_or(isize::MAX) - 1;
        if self.current > last {
            self.current = last;
        }
    }

    fn advance(&mut self, forward: bool) -> Option<String> {
        let next = step(self.current, self.frames.len(), forward)?;
        self.current = next;
        self.at(next)
    }
}

/// A line that cycles through an editable list of frames
///
/// The frame list and cursor sit behind one lock, so a framed line can be
/// edited from any thread while a board renders it.
#[derive(Debug)]
pub struct Framed {
    state: Mutex<FrameState>,
    animate: bool,
    forward: bool,
}

impl Framed {
    /// Create an animating, forward-running line over `frames`
    pub fn new<I, S>(frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            state: Mutex::new(FrameState {
                frames: frames.into_iter().map(Into::into).collect(),
                current: NO_FRAME,
            }),
            animate: true,
            forward: true,
        }
    }

    /// Stop advancing: every render shows the current frame
    #[must_use]
    pub fn frozen(mut self) -> Self {
        self.animate = false;
        self
    }

    /// Run the animation backwards
    #[must_use]
    pub fn reversed(mut self) -> Self {
        self.forward = false;
        self
    }

    /// Whether rendering advances the animation
    #[must_use]
    pub fn animate(&self) -> bool {
        self.animate
    }

    /// Whether rendering moves to the next (rather than previous) frame
    #[must_use]
    pub fn forward(&self) -> bool {
        self.forward
    }

    /// Append a frame
    pub fn add_frame(&self, frame: impl Into<String>) {
        self.state.lock().frames.push(frame.into());
    }

    /// Remove the first frame equal to `frame`
    ///
    /// Returns true if a frame was removed.
    pub fn remove_frame(&self, frame: &str) -> bool {
        let mut state = self.state.lock();
        let Some(position) = state.frames.iter().position(|f| f == frame) else {
            return false;
        };
        state.frames.remove(position);
        state.clamp();
        true
    }

    /// Replace the frame at `index`, returning the old frame
    ///
    /// Returns `None` (and changes nothing) when `index` is out of range.
    pub fn set_frame(&self, index: usize, frame: impl Into<String>) -> Option<String> {
        let mut state = self.state.lock();
        let slot = state.frames.get_mut(index)?;
        Some(std::mem::replace(slot, frame.into()))
    }

    /// The frame at `index`
    #[must_use]
    pub fn frame(&self, index: usize) -> Option<String> {
        self.state.lock().frames.get(index).cloned()
    }

    /// Snapshot of every frame
    #[must_use]
    pub fn frames(&self) -> Vec<String> {
        self.state.lock().frames.clone()
    }

    /// Number of frames
    #[must_use]
    pub fn total_length(&self) -> usize {
        self.state.lock().frames.len()
    }

    /// The cursor, [`NO_FRAME`] before the first advance
    #[must_use]
    pub fn current_frame(&self) -> isize {
        self.state.lock().current
    }

    /// Move the cursor, clamped to `[-1, len - 1]`
    pub fn set_current_frame(&self, index: isize) {
        let mut state = self.state.lock();
        state.current = index.max(NO_FRAME);
        state.clamp();
    }

    /// The frame under the cursor, `None` if nothing has been shown yet
    #[must_use]
    pub fn current(&self) -> Option<String> {
        let state = self.state.lock();
        state.at(state.current)
    }

    /// Advance one frame and return it
    pub fn next(&self) -> Option<String> {
        self.state.lock().advance(true)
    }

    /// Step back one frame and return it
    pub fn previous(&self) -> Option<String> {
        self.state.lock().advance(false)
    }

    /// Render with this line's own animate/forward settings
    pub fn apply(&self) -> String {
        self.apply_with(self.animate, self.forward)
    }

    /// Render with explicit settings
    ///
    /// Not animating returns the current frame (or an empty string before the
    /// first frame); otherwise the cursor moves in the given direction.
    pub fn apply_with(&self, animate: bool, forward: bool) -> String {
        let text = if !animate {
            self.current()
        } else if forward {
            self.next()
        } else {
            self.previous()
        };
        text.unwrap_or_default()
    }
}

impl Clone for Framed {
    fn clone(&self) -> Self {
        let state = self.state.lock();
        Self {
            state: Mutex::new(FrameState {
                frames: state.frames.clone(),
                current: state.current,
            }),
            animate: self.animate,
            forward: self.forward,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(count: usize) -> Framed {
        Framed::new((0..count).map(|i| format!("f{i}")))
    }

    #[test]
    fn test_step_rules() {
        assert_eq!(step(NO_FRAME, 3, true), Some(0));
        assert_eq!(step(2, 3, true), Some(0));
        assert_eq!(step(NO_FRAME, 3, false), Some(2));
        assert_eq!(step(0, 3, false), Some(2));
        assert_eq!(step(1, 3, false), Some(0));
        assert_eq!(step(0, 0, true), None);
        // a stale cursor past the end snaps back into range
        assert_eq!(step(7, 3, false), Some(2));
    }

    #[test]
    fn test_next_visits_each_frame_once_then_wraps() {
        for count in 1..=6 {
            let line = frames(count);
            let seen: Vec<String> = (0..count).filter_map(|_| line.next()).collect();
            let expected: Vec<String> = (0..count).map(|i| format!("f{i}")).collect();
            assert_eq!(seen, expected);
            assert_eq!(line.next().as_deref(), Some("f0"));
        }
    }

    #[test]
    fn test_previous_runs_backwards_from_sentinel() {
        for count in 1..=6 {
            let line = frames(count);
            let seen: Vec<String> = (0..count).filter_map(|_| line.previous()).collect();
            let expected: Vec<String> = (0..count).rev().map(|i| format!("f{i}")).collect();
            assert_eq!(seen, expected);
            assert_eq!(line.current_frame(), 0);
            assert_eq!(line.previous(), Some(format!("f{}", count - 1)));
        }
    }

    #[test]
    fn test_frozen_line_returns_empty_then_current() {
        let line = frames(3).frozen();
        assert_eq!(line.apply(), "");
        assert_eq!(line.current_frame(), NO_FRAME);

        line.set_current_frame(1);
        assert_eq!(line.apply(), "f1");
        assert_eq!(line.apply(), "f1");
    }

    #[test]
    fn test_reversed_line_applies_previous() {
        let line = frames(3).reversed();
        assert_eq!(line.apply(), "f2");
        assert_eq!(line.apply(), "f1");
        assert_eq!(line.apply_with(true, true), "f2");
    }

    #[test]
    fn test_frame_mutation_keeps_cursor_in_range() {
        let line = frames(3);
        line.set_current_frame(2);
        assert!(line.remove_frame("f2"));
        assert!(!line.remove_frame("missing"));
        assert_eq!(line.current_frame(), 1);

        assert_eq!(line.set_frame(0, "new"), Some("f0".to_string()));
        assert_eq!(line.set_frame(9, "nope"), None);
        line.add_frame("tail");
        assert_eq!(line.frames(), vec!["new", "f1", "tail"]);
        assert_eq!(line.total_length(), 3);

        line.set_current_frame(40);
        assert_eq!(line.current_frame(), 2);
        line.set_current_frame(-9);
        assert_eq!(line.current_frame(), NO_FRAME);
    }

    #[test]
    fn test_empty_framed_line_renders_nothing() {
        let line = Framed::new(Vec::<String>::new());
        assert_eq!(line.next(), None);
        assert_eq!(line.apply(), "");
        assert_eq!(line.current_frame(), NO_FRAME);
    }
}
