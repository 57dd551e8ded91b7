//! Highlight sweep: one character at a time lit up across a fixed text

use super::framed::Framed;

/// A line that sweeps a highlight format across its text
///
/// Frames are generated once, one per character of the context. A frame for a
/// space shows the plain text so the sweep appears to pause between words.
#[derive(Debug, Clone)]
pub struct Highlighted {
    context: String,
    frames: Framed,
}

impl Highlighted {
    /// Highlight `context` with `highlight`, leaving the rest in `normal`
    pub fn new(context: impl Into<String>, highlight: &str, normal: &str) -> Self {
        Self::with_affixes(context, highlight, normal, "", "")
    }

    /// Like [`Highlighted::new`] with text placed before and after every frame
    pub fn with_affixes(
        context: impl Into<String>,
        highlight: &str,
        normal: &str,
        prefix: &str,
        suffix: &str,
    ) -> Self {
        let context = context.into();
        let chars: Vec<char> = context.chars().collect();
        let frames = chars.iter().enumerate().map(|(index, ch)| {
            if *ch == ' ' {
                format!("{prefix}{normal}{context}{suffix}")
            } else {
                let before: String = chars[..index].iter().collect();
                let after: String = chars[index + 1..].iter().collect();
                format!("{prefix}{normal}{before}{highlight}{ch}{normal}{after}{suffix}")
            }
        });
        Self {
            frames: Framed::new(frames),
            context,
        }
    }

    /// Keep showing the current frame instead of sweeping
    #[must_use]
    pub fn frozen(mut self) -> Self {
        self.frames = self.frames.frozen();
        self
    }

    /// Sweep from the last character to the first
    #[must_use]
    pub fn reversed(mut self) -> Self {
        self.frames = self.frames.reversed();
        self
    }

    /// The unformatted text being highlighted
    #[must_use]
    pub fn context(&self) -> &str {
        &self.context
    }

    /// The generated frames and cursor
    #[must_use]
    pub fn frames(&self) -> &Framed {
        &self.frames
    }
}
