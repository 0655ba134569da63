//! Cursor-based substring scanner.
//!
//! tibia.com pages are scanned with ordered marker searches instead of a
//! markup parser. A [`Scanner`] keeps a cursor into the text; every step finds
//! a marker at or after the cursor and moves the cursor forward. Steps that do
//! not find their marker return `None` and leave the cursor untouched, so the
//! caller decides whether a missing marker ends a loop or is an error.
//!
//! ```rust
//! use crawler_core::Scanner;
//!
//! let mut scanner = Scanner::new(r#"<img src="a.gif" /> <div>Bibby</div>"#);
//! scanner.skip_past(r#"src=""#);
//! assert_eq!(scanner.take_until(r#"""#), Some("a.gif"));
//! scanner.skip_past("<div>");
//! assert_eq!(scanner.take_until("</div>"), Some("Bibby"));
//! assert_eq!(scanner.seek("<div>"), None);
//! ```

/// A forward-only cursor over borrowed text.
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    /// Start scanning at the beginning of `text`.
    pub const fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    /// Text from the cursor to the end.
    pub fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    /// Move the cursor to the start of the next `marker`.
    ///
    /// Returns the new cursor position.
    pub fn seek(&mut self, marker: &str) -> Option<usize> {
        let offset = self.rest().find(marker)?;
        self.pos += offset;
        Some(self.pos)
    }

    /// Move the cursor just past the next `marker`.
    pub fn skip_past(&mut self, marker: &str) -> Option<usize> {
        self.seek(marker)?;
        self.pos += marker.len();
        Some(self.pos)
    }

    /// Return the text between the cursor and the next `marker`.
    ///
    /// The cursor stops at the start of `marker`, so `marker` itself can be
    /// matched by the next step.
    pub fn take_until(&mut self, marker: &str) -> Option<&'a str> {
        let start = self.pos;
        let offset = self.rest().find(marker)?;
        self.pos += offset;
        Some(&self.text[start..self.pos])
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic, clippy::disallowed_macros)]
mod tests {
    use super::*;

    #[test]
    fn test_seek_moves_to_marker_start() {
        let mut scanner = Scanner::new("abc<div>def");
        assert_eq!(scanner.seek("<div>"), Some(3));
        assert_eq!(scanner.rest(), "<div>def");
    }

    #[test]
    fn test_seek_missing_marker_keeps_cursor() {
        let mut scanner = Scanner::new("abc<div>def");
        scanner.seek("c").unwrap();
        assert_eq!(scanner.seek("<span>"), None);
        assert_eq!(scanner.rest(), "c<div>def");
    }

    #[test]
    fn test_skip_past_moves_after_marker() {
        let mut scanner = Scanner::new("title=\"Boss\"");
        assert_eq!(scanner.skip_past("title=\""), Some(7));
        assert_eq!(scanner.rest(), "Boss\"");
    }

    #[test]
    fn test_take_until_stops_before_marker() {
        let mut scanner = Scanner::new("Bibby\" src=\"x\"");
        assert_eq!(scanner.take_until("\" src=\""), Some("Bibby"));
        assert!(scanner.rest().starts_with("\" src=\""));
    }

    #[test]
    fn test_take_until_at_marker_is_empty() {
        let mut scanner = Scanner::new("\"rest");
        assert_eq!(scanner.take_until("\""), Some(""));
        assert_eq!(scanner.rest(), "\"rest");
    }

    #[test]
    fn test_take_until_missing_marker_keeps_cursor() {
        let mut scanner = Scanner::new("x <div>unterminated");
        scanner.skip_past("<div>").unwrap();
        assert_eq!(scanner.take_until("</div>"), None);
        assert_eq!(scanner.rest(), "unterminated");
    }

    #[test]
    fn test_searches_never_look_behind_cursor() {
        let mut scanner = Scanner::new("<b>one</b><b>two</b>");
        let mut values = Vec::new();
        while scanner.skip_past("<b>").is_some() {
            values.push(scanner.take_until("</b>").unwrap());
        }
        assert_eq!(values, ["one", "two"]);
        assert_eq!(scanner.rest(), "</b>");
    }

    #[test]
    fn test_multibyte_text() {
        let mut scanner = Scanner::new("<div>Ferumbras' Ascendant 🔥</div>");
        scanner.skip_past("<div>").unwrap();
        assert_eq!(scanner.take_until("</div>"), Some("Ferumbras' Ascendant 🔥"));
    }
}
