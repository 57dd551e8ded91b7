//! Line Colors - Escape-Sequence Awareness for Animated Text
//!
//! Display surfaces that embed formatting inline (an escape character followed
//! by a one-character code) need animations to never cut a sequence in half.
//! [`LineColor`] describes how a surface recognises those sequences; the
//! scrolling engine uses it to track the active color across window
//! boundaries.
//!
//! [`SectionColor`] implements the common legacy scheme: `§` followed by one of
//! `0-9`, `a-f` (colors) or `k-o`, `r` (formats and reset).

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// The section sign that opens a legacy color sequence
pub const SECTION_SIGN: char = '\u{a7}';

/// Codes recognised after [`SECTION_SIGN`]
const SECTION_CODES: &str = "0123456789abcdefklmnor";

/// A color (or format) that can prefix a rendered line
///
/// Implementations are cheap immutable values shared behind an `Arc`.
pub trait LineColor: fmt::Debug + Send + Sync {
    /// Character that starts an inline color sequence
    fn escape_char(&self) -> char;

    /// Resolve the color named by `code`, the character after the escape
    ///
    /// Returns `None` when `code` is not a recognised color code.
    fn by_code(&self, code: char) -> Option<Arc<dyn LineColor>>;

    /// The escape sequence that switches a display to this color
    fn sequence(&self) -> String;

    /// Translate author-facing markup into display escape sequences
    fn format(&self, text: &str) -> String {
        text.to_string()
    }
}

/// Legacy `§`-prefixed color code
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SectionColor {
    code: char,
}

impl SectionColor {
    /// Reset all colors and formats
    pub const RESET: Self = Self { code: 'r' };
    /// Black
    pub const BLACK: Self = Self { code: '0' };
    /// Dark green
    pub const DARK_GREEN: Self = Self { code: '2' };
    /// Gold
    pub const GOLD: Self = Self { code: '6' };
    /// Gray
    pub const GRAY: Self = Self { code: '7' };
    /// Green
    pub const GREEN: Self = Self { code: 'a' };
    /// Aqua
    pub const AQUA: Self = Self { code: 'b' };
    /// Red
    pub const RED: Self = Self { code: 'c' };
    /// Yellow
    pub const YELLOW: Self = Self { code: 'e' };
    /// White
    pub const WHITE: Self = Self { code: 'f' };
    /// Bold
    pub const BOLD: Self = Self { code: 'l' };

    /// Look up a color by its code character (case-insensitive)
    #[must_use]
    pub fn from_code(code: char) -> Option<Self> {
        let code = code.to_ascii_lowercase();
        SECTION_CODES.contains(code).then_some(Self { code })
    }

    /// The code character of this color
    #[must_use]
    pub fn code(self) -> char {
        self.code
    }

    /// Whether this code is a format (bold, italic, ...) rather than a color
    #[must_use]
    pub fn is_format(self) -> bool {
        matches!(self.code, 'k'..='o')
    }

    /// Create a shared handle, the form expected by the scrolling engine
    #[must_use]
    pub fn shared(self) -> Arc<dyn LineColor> {
        Arc::new(self)
    }

    /// Replace `alternate` + code pairs with `§` + code
    ///
    /// `&6Gold` becomes `§6Gold`; an `alternate` not followed by a valid code is
    /// left untouched.
    #[must_use]
    pub fn translate_alternate(alternate: char, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            if c == alternate {
                if let Some(color) = chars.peek().copied().and_then(Self::from_code) {
                    out.push(SECTION_SIGN);
                    out.push(color.code);
                    chars.next();
                    continue;
                }
            }
            out.push(c);
        }
        out
    }

    /// Remove every `§` sequence from `text`
    #[must_use]
    pub fn strip(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut chars = text.chars();
        while let Some(c) = chars.next() {
            if c == SECTION_SIGN {
                chars.next();
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl Default for SectionColor {
    fn default() -> Self {
        Self::RESET
    }
}

impl fmt::Display for SectionColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SECTION_SIGN}{}", self.code)
    }
}

impl LineColor for SectionColor {
    fn escape_char(&self) -> char {
        SECTION_SIGN
    }

    fn by_code(&self, code: char) -> Option<Arc<dyn LineColor>> {
        Self::from_code(code).map(Self::shared)
    }

    fn sequence(&self) -> String {
        self.to_string()
    }

    fn format(&self, text: &str) -> String {
        Self::translate_alternate('&', text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code_accepts_known_codes() {
        assert_eq!(SectionColor::from_code('a'), Some(SectionColor::GREEN));
        assert_eq!(SectionColor::from_code('A'), Some(SectionColor::GREEN));
        assert_eq!(SectionColor::from_code('r'), Some(SectionColor::RESET));
        assert_eq!(SectionColor::from_code('z'), None);
        assert_eq!(SectionColor::from_code('&'), None);
    }

    #[test]
    fn test_sequence_and_display() {
        assert_eq!(SectionColor::GOLD.sequence(), "\u{a7}6");
        assert_eq!(SectionColor::default().to_string(), "\u{a7}r");
    }

    #[test]
    fn test_translate_alternate() {
        assert_eq!(
            SectionColor::translate_alternate('&', "&6Gold &zx & done&"),
            "\u{a7}6Gold &zx & done&"
        );
        assert_eq!(SectionColor::GRAY.format("&lBold"), "\u{a7}lBold");
    }

    #[test]
    fn test_strip_removes_sequences() {
        assert_eq!(SectionColor::strip("\u{a7}6Gold\u{a7}r!"), "Gold!");
        assert_eq!(SectionColor::strip("dangling\u{a7}"), "dangling");
    }

    #[test]
    fn test_by_code_returns_shared_color() {
        let reset = SectionColor::RESET;
        let green = reset.by_code('a').map(|c| c.sequence());
        assert_eq!(green.as_deref(), Some("\u{a7}a"));
        assert!(reset.by_code('x').is_none());
        assert!(SectionColor::BOLD.is_format());
        assert!(!SectionColor::RED.is_format());
    }
}
