//! Terminal Sender - Printing Board Updates
//!
//! Keeps a screen per viewer holding the title and lines that viewer was last
//! shown, and prints only what changed. Section color codes become ANSI SGR
//! sequences, or are stripped when color is off.
//!
//! A sender serves one board. Several senders can share one output handle.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use board_core::{
    BoardSender, Observer, ObserverView, RenderFrame, SectionColor, SendError, SECTION_SIGN,
};
use dashmap::DashMap;
use parking_lot::Mutex;

/// Output handle shared between senders
pub type SharedOutput<W> = Arc<Mutex<W>>;

const ANSI_RESET: &str = "\x1b[0m";

/// What one viewer currently sees
#[derive(Debug, Default, Clone)]
struct Screen {
    title: Option<String>,
    lines: BTreeMap<usize, String>,
}

#[derive(Debug, PartialEq, Eq)]
enum Change {
    Title(String),
    Line(usize, String),
    Cleared(usize),
}

impl Screen {
    /// Bring the screen in line with `view`, returning what changed
    fn update<O>(&mut self, view: &ObserverView<O>) -> Vec<Change> {
        let mut changes = Vec::new();

        if view.title_changed || self.title != view.title {
            if let Some(title) = &view.title {
                changes.push(Change::Title(title.clone()));
            }
            self.title.clone_from(&view.title);
        }

        let stale: Vec<usize> = self
            .lines
            .keys()
            .filter(|index| !view.lines.contains_key(index))
            .copied()
            .collect();
        for index in stale {
            self.lines.remove(&index);
            changes.push(Change::Cleared(index));
        }

        for (index, text) in &view.lines {
            if self.lines.get(index) != Some(text) {
                self.lines.insert(*index, text.clone());
                changes.push(Change::Line(*index, text.clone()));
            }
        }
        changes
    }
}

/// Prints per-viewer board updates to a writer
pub struct TerminalSender<O: Observer, W: Write + Send> {
    out: SharedOutput<W>,
    screens: DashMap<O, Screen>,
    ansi: bool,
    closed: AtomicBool,
}

impl<O: Observer, W: Write + Send> TerminalSender<O, W> {
    /// Sender printing to `out`
    ///
    /// With `ansi` off, color codes are stripped instead of translated.
    #[must_use]
    pub fn with_output(out: SharedOutput<W>, ansi: bool) -> Self {
        Self {
            out,
            screens: DashMap::new(),
            ansi,
            closed: AtomicBool::new(false),
        }
    }

    /// Number of viewers with a screen
    #[must_use]
    pub fn screen_count(&self) -> usize {
        self.screens.len()
    }

    /// Whether `close` was called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn paint(&self, text: &str) -> String {
        if self.ansi {
            to_ansi(text)
        } else {
            SectionColor::strip(text)
        }
    }
}

impl<O, W> BoardSender<O> for TerminalSender<O, W>
where
    O: Observer + Display,
    W: Write + Send,
{
    fn send(&self, frame: &RenderFrame<O>) -> Result<(), SendError> {
        if self.is_closed() {
            return Err(SendError::Closed);
        }
        let board = frame.board_id.as_deref().unwrap_or("-");

        // Screens are stored only once the rows reach the output, so a failed
        // write is printed again on the next send.
        let mut rows = Vec::new();
        let mut updated = Vec::new();
        for view in &frame.views {
            let mut screen = self
                .screens
                .get(&view.observer)
                .map(|screen| screen.value().clone())
                .unwrap_or_default();
            let changes = screen.update(view);
            if changes.is_empty() {
                continue;
            }
            updated.push((view.observer.clone(), screen));
            for change in changes {
                let row = match change {
                    Change::Title(text) => format!("title: {}", self.paint(&text)),
                    Change::Line(index, text) => format!("{index}: {}", self.paint(&text)),
                    Change::Cleared(index) => format!("{index}: -"),
                };
                rows.push(format!("[{board}] {} | {row}", view.observer));
            }
        }
        if rows.is_empty() {
            return Ok(());
        }

        let mut out = self.out.lock();
        for row in &rows {
            writeln!(out, "{row}").map_err(delivery)?;
        }
        out.flush().map_err(delivery)?;
        drop(out);

        for (observer, screen) in updated {
            self.screens.insert(observer, screen);
        }
        tracing::trace!(board_id = %board, rows = rows.len(), "Printed board update");
        Ok(())
    }

    fn evict(&self, observer: &O) {
        if self.screens.remove(observer).is_some() {
            tracing::debug!(viewer = %observer, "Dropped viewer screen");
        }
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let screens = self.screen_count();
        self.screens.clear();
        tracing::debug!(screens, "Terminal sender closed");
    }
}

fn delivery(error: io::Error) -> SendError {
    SendError::Delivery(error.to_string())
}

/// ANSI SGR parameter for a section code
fn sgr(code: char) -> Option<&'static str> {
    Some(match code {
        '0' => "30",
        '1' => "34",
        '2' => "32",
        '3' => "36",
        '4' => "31",
        '5' => "35",
        '6' => "33",
        '7' => "37",
        '8' => "90",
        '9' => "94",
        'a' => "92",
        'b' => "96",
        'c' => "91",
        'd' => "95",
        'e' => "93",
        'f' => "97",
        'k' => "8",
        'l' => "1",
        'm' => "9",
        'n' => "4",
        'o' => "3",
        'r' => "0",
        _ => return None,
    })
}

/// Replace section codes in `text` with ANSI escape sequences
///
/// A colored text ends with a reset so it does not bleed into the next row.
#[must_use]
pub fn to_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut colored = false;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == SECTION_SIGN {
            if let Some(param) = chars.peek().copied().and_then(sgr) {
                chars.next();
                out.push_str("\x1b[");
                out.push_str(param);
                out.push('m');
                colored = true;
                continue;
            }
        }
        out.push(c);
    }
    if colored {
        out.push_str(ANSI_RESET);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sender(ansi: bool) -> TerminalSender<String, Vec<u8>> {
        TerminalSender::with_output(Arc::new(Mutex::new(Vec::new())), ansi)
    }

    fn take_output(sender: &TerminalSender<String, Vec<u8>>) -> Vec<String> {
        let mut bytes = sender.out.lock();
        let text = String::from_utf8(std::mem::take(&mut *bytes)).unwrap();
        text.lines().map(str::to_string).collect()
    }

    fn view(observer: &str, title: Option<&str>, title_changed: bool, lines: &[&str]) -> ObserverView<String> {
        ObserverView {
            observer: observer.to_string(),
            title: title.map(str::to_string),
            title_changed,
            lines: lines
                .iter()
                .enumerate()
                .map(|(i, text)| (i, (*text).to_string()))
                .collect(),
        }
    }

    fn frame(views: Vec<ObserverView<String>>) -> RenderFrame<String> {
        RenderFrame {
            board_id: Some("lobby".to_string()),
            sequence: 1,
            views,
        }
    }

    #[test]
    fn test_to_ansi() {
        assert_eq!(to_ansi("plain"), "plain");
        assert_eq!(to_ansi("\u{a7}aGo"), "\x1b[92mGo\x1b[0m");
        assert_eq!(to_ansi("\u{a7}l\u{a7}6x"), "\x1b[1m\x1b[33mx\x1b[0m");
        // unknown code is kept as text
        assert_eq!(to_ansi("\u{a7}zx"), "\u{a7}zx");
    }

    #[test]
    fn test_first_send_prints_everything() {
        let sender = sender(false);
        sender
            .send(&frame(vec![view("ann", Some("\u{a7}6Lobby"), true, &["hi", "there"])]))
            .unwrap();

        assert_eq!(
            take_output(&sender),
            vec![
                "[lobby] ann | title: Lobby",
                "[lobby] ann | 0: hi",
                "[lobby] ann | 1: there",
            ]
        );
        assert_eq!(sender.screen_count(), 1);
    }

    #[test]
    fn test_only_changes_are_printed() {
        let sender = sender(false);
        sender
            .send(&frame(vec![view("ann", Some("T"), true, &["a", "b", "c"])]))
            .unwrap();
        take_output(&sender);

        sender
            .send(&frame(vec![view("ann", Some("T"), false, &["a", "B"])]))
            .unwrap();
        assert_eq!(
            take_output(&sender),
            vec!["[lobby] ann | 2: -", "[lobby] ann | 1: B"]
        );

        sender
            .send(&frame(vec![view("ann", Some("T"), false, &["a", "B"])]))
            .unwrap();
        assert!(take_output(&sender).is_empty());
    }

    #[test]
    fn test_screens_are_per_viewer() {
        let sender = sender(true);
        sender
            .send(&frame(vec![view("ann", None, false, &["x"]), view("bob", None, false, &["\u{a7}cy"])]))
            .unwrap();
        assert_eq!(
            take_output(&sender),
            vec!["[lobby] ann | 0: x", "[lobby] bob | 0: \x1b[91my\x1b[0m"]
        );

        sender
            .send(&frame(vec![view("ann", None, false, &["x"]), view("bob", None, false, &["z"])]))
            .unwrap();
        assert_eq!(take_output(&sender), vec!["[lobby] bob | 0: z"]);
    }

    #[test]
    fn test_evict_drops_screen() {
        let sender = sender(false);
        sender.send(&frame(vec![view("ann", None, false, &["x"])])).unwrap();
        take_output(&sender);

        sender.evict(&"ann".to_string());
        assert_eq!(sender.screen_count(), 0);

        // a returning viewer is drawn from scratch
        sender.send(&frame(vec![view("ann", None, false, &["x"])])).unwrap();
        assert_eq!(take_output(&sender), vec!["[lobby] ann | 0: x"]);
    }

    #[test]
    fn test_close_is_idempotent_and_rejects_sends() {
        let sender = sender(false);
        sender.send(&frame(vec![view("ann", None, false, &["x"])])).unwrap();

        sender.close();
        sender.close();
        assert!(sender.is_closed());
        assert_eq!(sender.screen_count(), 0);
        assert_eq!(
            sender.send(&frame(vec![view("ann", None, false, &["x"])])),
            Err(SendError::Closed)
        );
    }

    #[test]
    fn test_write_failure_is_delivery_error() {
        struct Broken;

        impl Write for Broken {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let sender: TerminalSender<String, Broken> =
            TerminalSender::with_output(Arc::new(Mutex::new(Broken)), false);
        let err = sender
            .send(&frame(vec![view("ann", None, false, &["x"])]))
            .unwrap_err();
        assert!(matches!(err, SendError::Delivery(ref message) if message.contains("pipe closed")));
    }

    #[test]
    fn test_failed_write_is_printed_again_after_recovery() {
        struct Flaky {
            failing: bool,
            written: Vec<u8>,
        }

        impl Write for Flaky {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                if self.failing {
                    return Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"));
                }
                self.written.extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let out = Arc::new(Mutex::new(Flaky {
            failing: true,
            written: Vec::new(),
        }));
        let sender: TerminalSender<String, Flaky> = TerminalSender::with_output(Arc::clone(&out), false);
        let update = frame(vec![view("ann", None, false, &["x"])]);

        assert!(sender.send(&update).is_err());
        assert_eq!(sender.screen_count(), 0);

        out.lock().failing = false;
        sender.send(&update).unwrap();
        let printed = String::from_utf8(out.lock().written.clone()).unwrap();
        assert_eq!(printed, "[lobby] ann | 0: x\n");
        assert_eq!(sender.screen_count(), 1);

        // once delivered, the same frame prints nothing
        sender.send(&update).unwrap();
        assert_eq!(out.lock().written.len(), printed.len());
    }
}
