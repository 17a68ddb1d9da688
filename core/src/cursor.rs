/*
 * Copyright (c) 2026 Mohamad Al-Zawahreh (dba Sovereign Systems).
 *
 * This file is part of quill.
 *
 * LICENSE: DUAL-LICENSED (AGPLv3 or COMMERCIAL).
 *
 * 1. OPEN SOURCE: You may use this file under the terms of the GNU Affero
 * General Public License v3.0. If you link to this code, your ENTIRE
 * application must be open-sourced under AGPLv3.
 *
 * 2. COMMERCIAL: For proprietary use, you must obtain a Commercial License
 * from Sovereign Systems.
 *
 * PATENT NOTICE: Protected by US Patent App #63/935,467.
 * NO IMPLIED LICENSE to rights of Mohamad Al-Zawahreh or Sovereign Systems.
 */

//! Positional scanner over immutable source text.
//!
//! A `Cursor` holds two positions: the *committed* one, which only ever moves
//! forward, and the *peeked* one, which runs ahead speculatively and can be
//! reverted back to the committed position any number of times. The cursor
//! is `Copy`, so a trial parse works on its own snapshot and the caller
//! adopts the result only when the trial succeeds.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in the source: byte offset plus 1-based line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Position {
    pub offset: usize,
    pub line: u32,
    pub col: u32,
}

impl Position {
    pub fn start() -> Self {
        Position {
            offset: 0,
            line: 1,
            col: 1,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::start()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Cursor<'src> {
    text: &'src str,
    committed: Position,
    peeked: Position,
}

impl<'src> Cursor<'src> {
    pub fn new(text: &'src str) -> Self {
        Cursor {
            text,
            committed: Position::start(),
            peeked: Position::start(),
        }
    }

    /// Snapshot for a nested parse: it starts where this cursor is peeking.
    pub fn fork(&self) -> Self {
        Cursor {
            text: self.text,
            committed: self.peeked,
            peeked: self.peeked,
        }
    }

    pub fn text(&self) -> &'src str {
        self.text
    }

    pub fn committed(&self) -> Position {
        self.committed
    }

    pub fn peeked(&self) -> Position {
        self.peeked
    }

    /// Unconsumed text at the peeked position.
    pub fn rest(&self) -> &'src str {
        &self.text[self.peeked.offset..]
    }

    pub fn skip_whitespace(&mut self) {
        let skipped = self
            .rest()
            .char_indices()
            .find(|(_, c)| !c.is_whitespace())
            .map(|(i, _)| i)
            .unwrap_or_else(|| self.rest().len());
        self.advance(skipped);
    }

    /// Tests an anchored pattern at the peeked position without moving.
    /// Returns the matched slice.
    pub fn try_match(&self, pattern: &Regex) -> Option<&'src str> {
        let rest = self.rest();
        pattern
            .find(rest)
            .filter(|m| m.start() == 0)
            .map(|m| &rest[..m.end()])
    }

    /// Moves the peeked position `len` bytes forward, tracking lines.
    pub fn advance(&mut self, len: usize) {
        let end = (self.peeked.offset + len).min(self.text.len());
        for c in self.text[self.peeked.offset..end].chars() {
            if c == '\n' {
                self.peeked.line += 1;
                self.peeked.col = 1;
            } else {
                self.peeked.col += 1;
            }
        }
        self.peeked.offset = end;
    }

    pub fn commit(&mut self) {
        if self.peeked.offset >= self.committed.offset {
            self.committed = self.peeked;
        }
    }

    pub fn revert(&mut self) {
        self.peeked = self.committed;
    }

    pub fn at_end(&mut self) -> bool {
        self.skip_whitespace();
        self.commit();
        self.committed.offset == self.text.len()
    }

    /// Short description of what sits at the peeked position, for diagnostics.
    pub fn describe_next(&self) -> String {
        let word: String = self
            .rest()
            .chars()
            .take_while(|c| !c.is_whitespace())
            .take(16)
            .collect();
        if word.is_empty() {
            "end of input".to_string()
        } else {
            format!("'{}'", word)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_tracks_lines_and_columns() {
        let mut cursor = Cursor::new("ab\ncd");
        cursor.advance(4);
        assert_eq!(cursor.peeked().line, 2);
        assert_eq!(cursor.peeked().col, 2);
        assert_eq!(cursor.committed(), Position::start());
    }

    #[test]
    fn test_revert_returns_to_committed() {
        let mut cursor = Cursor::new("abc def");
        cursor.advance(3);
        cursor.commit();
        cursor.skip_whitespace();
        cursor.advance(2);
        assert_eq!(cursor.rest(), "f");
        cursor.revert();
        cursor.revert();
        assert_eq!(cursor.rest(), " def");
        assert_eq!(cursor.committed().offset, 3);
    }

    #[test]
    fn test_try_match_is_anchored_and_pure() {
        let pattern = Regex::new(r"^[0-9]+").unwrap();
        let mut cursor = Cursor::new("  42 x 7");
        assert_eq!(cursor.try_match(&pattern), None);
        cursor.skip_whitespace();
        assert_eq!(cursor.try_match(&pattern), Some("42"));
        assert_eq!(cursor.peeked().offset, 2);
    }

    #[test]
    fn test_at_end_skips_trailing_whitespace() {
        let mut cursor = Cursor::new("x \n\t ");
        cursor.advance(1);
        assert!(cursor.at_end());
        assert_eq!(cursor.committed().line, 2);
    }

    #[test]
    fn test_fork_starts_at_peeked_position() {
        let mut cursor = Cursor::new("a   b");
        cursor.advance(1);
        cursor.commit();
        cursor.skip_whitespace();
        let fork = cursor.fork();
        assert_eq!(fork.committed().offset, 4);
        assert_eq!(fork.rest(), "b");
        assert_eq!(cursor.committed().offset, 1);
    }

    #[test]
    fn test_describe_next() {
        let mut cursor = Cursor::new("  foo bar");
        cursor.skip_whitespace();
        assert_eq!(cursor.describe_next(), "'foo'");
        cursor.advance(100);
        assert_eq!(cursor.describe_next(), "end of input");
    }
}
