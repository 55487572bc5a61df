use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use regex::Regex;

use crate::error::{Cursor, ParseError};
use crate::parse_result::ParseResult::{self, *};

/// What `match_until` does when the input ends before the terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EofMode {
    /// Reaching eof is `Unmatched`.
    Fail,
    /// Reaching eof ends the token; the rest of the input is the match.
    Match,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Checkpoint {
    pos: usize,
    index: usize,
}

/// Position-tracking walker over a borrowed text.
///
/// `pos` is a byte offset that always sits on a character boundary;
/// `index` is the same position counted in characters, reported by
/// [`offset`](Parser::offset).
#[derive(Debug, Clone)]
pub struct Parser<'a> {
    input: &'a str,
    filename: Option<&'a str>,
    pos: usize,
    index: usize,
    /// Compiled `match_regex` patterns, keyed by source.
    patterns: HashMap<String, Regex>,
}

impl<'a> Parser<'a> {
    /// Rejects an empty input.
    pub fn new(input: &'a str) -> Result<Self, ParseError> {
        Self::build(input, None)
    }

    pub fn with_filename(input: &'a str, filename: &'a str) -> Result<Self, ParseError> {
        Self::build(input, Some(filename))
    }

    fn build(input: &'a str, filename: Option<&'a str>) -> Result<Self, ParseError> {
        let parser = Parser {
            input,
            filename,
            pos: 0,
            index: 0,
            patterns: HashMap::new(),
        };
        if input.is_empty() {
            return Err(parser.error("cannot parse an empty input"));
        }
        Ok(parser)
    }

    // ── Position ────────────────────────────────────────────────────

    pub fn input(&self) -> &'a str {
        self.input
    }

    pub fn filename(&self) -> Option<&'a str> {
        self.filename
    }

    pub fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    pub fn bof(&self) -> bool {
        self.pos == 0
    }

    /// Characters consumed since the start of input.
    pub fn offset(&self) -> usize {
        self.index
    }

    pub fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    pub fn peek_char(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    /// The character under the cursor.
    ///
    /// # Panics
    /// At eof. Callers check [`eof`](Parser::eof) first.
    pub fn current(&self) -> char {
        match self.peek_char() {
            Some(c) => c,
            None => panic!("Parser::current called at end of input"),
        }
    }

    pub fn advance(&mut self) -> bool {
        match self.peek_char() {
            Some(c) => {
                self.pos += c.len_utf8();
                self.index += 1;
                true
            }
            None => false,
        }
    }

    pub fn reverse(&mut self) -> bool {
        match self.input[..self.pos].chars().next_back() {
            Some(c) => {
                self.pos -= c.len_utf8();
                self.index -= 1;
                true
            }
            None => false,
        }
    }

    /// Advances exactly `n` characters, or not at all.
    pub fn advance_by(&mut self, n: usize) -> bool {
        let mut state = self.scope();
        for _ in 0..n {
            if !state.advance() {
                return false;
            }
        }
        state.accept();
        true
    }

    fn consume(&mut self, bytes: usize) -> &'a str {
        let text = &self.input[self.pos..self.pos + bytes];
        self.pos += bytes;
        self.index += text.chars().count();
        text
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            pos: self.pos,
            index: self.index,
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.pos = checkpoint.pos;
        self.index = checkpoint.index;
    }

    /// Opens a backtracking scope. The position is restored when the
    /// returned guard drops unless [`ScopedState::accept`] was called.
    pub fn scope(&mut self) -> ScopedState<'_, 'a> {
        ScopedState {
            checkpoint: self.checkpoint(),
            parser: self,
            accepted: false,
        }
    }

    // ── Check / peek / skip ─────────────────────────────────────────

    pub fn check_char(&mut self, c: char) -> bool {
        if self.peek_char() == Some(c) {
            self.consume(c.len_utf8());
            true
        } else {
            false
        }
    }

    pub fn check(&mut self, s: &str) -> bool {
        if self.peek(s) {
            self.consume(s.len());
            true
        } else {
            false
        }
    }

    pub fn check_any(&mut self, set: &[char]) -> bool {
        match self.peek_char() {
            Some(c) if set.contains(&c) => {
                self.consume(c.len_utf8());
                true
            }
            _ => false,
        }
    }

    /// Like [`check`](Parser::check) but never consumes.
    pub fn peek(&self, s: &str) -> bool {
        !s.is_empty() && self.remaining().starts_with(s)
    }

    pub fn skip(&mut self, c: char) {
        while self.check_char(c) {}
    }

    pub fn skip_any(&mut self, set: &[char]) {
        while self.check_any(set) {}
    }

    pub fn skip_until(&mut self, c: char) {
        self.skip_until_any(&[c]);
    }

    pub fn skip_until_any(&mut self, set: &[char]) {
        let len = self
            .remaining()
            .find(|c: char| set.contains(&c))
            .unwrap_or(self.remaining().len());
        self.consume(len);
    }

    // ── Match ───────────────────────────────────────────────────────

    /// Maximal run of characters satisfying `pred`.
    pub fn match_with(&mut self, mut pred: impl FnMut(char) -> bool) -> ParseResult<&'a str> {
        self.match_indexed(|c, _| pred(c))
    }

    /// Like [`match_with`](Parser::match_with), but the predicate also
    /// sees the 0-based index of the character within the run.
    pub fn match_indexed(
        &mut self,
        mut pred: impl FnMut(char, usize) -> bool,
    ) -> ParseResult<&'a str> {
        let len = self
            .remaining()
            .char_indices()
            .enumerate()
            .find(|&(i, (_, c))| !pred(c, i))
            .map(|(_, (byte, _))| byte)
            .unwrap_or(self.remaining().len());
        if len == 0 {
            return Unmatched;
        }
        Matched(self.consume(len))
    }

    pub fn match_each(&mut self, set: &[char]) -> ParseResult<&'a str> {
        self.match_with(|c| set.contains(&c))
    }

    /// Everything up to, not including, `c`. The result may be empty
    /// when the cursor already sits on the terminator.
    pub fn match_until(&mut self, c: char, mode: EofMode) -> ParseResult<&'a str> {
        self.match_until_any(&[c], mode)
    }

    pub fn match_until_any(&mut self, set: &[char], mode: EofMode) -> ParseResult<&'a str> {
        let found = self.remaining().find(|c: char| set.contains(&c));
        self.take_until(found, mode)
    }

    pub fn match_until_str(&mut self, terminator: &str, mode: EofMode) -> ParseResult<&'a str> {
        let found = self.remaining().find(terminator);
        self.take_until(found, mode)
    }

    fn take_until(&mut self, found: Option<usize>, mode: EofMode) -> ParseResult<&'a str> {
        match (found, mode) {
            (Some(len), _) => Matched(self.consume(len)),
            (None, EofMode::Match) if !self.eof() => Matched(self.consume(self.remaining().len())),
            _ => Unmatched,
        }
    }

    /// Matches `pattern` anchored at the cursor. Empty matches are
    /// `Unmatched`; an invalid pattern is an error. Each pattern is
    /// compiled once per parser.
    pub fn match_regex(&mut self, pattern: &str) -> ParseResult<&'a str> {
        let re = match self.patterns.get(pattern) {
            Some(re) => re.clone(),
            None => match Regex::new(&format!("^(?:{pattern})")) {
                Ok(re) => {
                    self.patterns.insert(pattern.to_string(), re.clone());
                    re
                }
                Err(e) => return Error(self.error(format!("invalid pattern {pattern:?}: {e}"))),
            },
        };
        self.match_regex_with(&re)
    }

    /// Matches a precompiled pattern at the cursor.
    ///
    /// `re` should start with `^`. An unanchored pattern still only
    /// matches at the cursor, but a miss searches the rest of the input
    /// first.
    pub fn match_regex_with(&mut self, re: &Regex) -> ParseResult<&'a str> {
        match re.find(self.remaining()) {
            Some(m) if m.start() == 0 && m.end() > 0 => Matched(self.consume(m.end())),
            _ => Unmatched,
        }
    }

    // ── Diagnostics ─────────────────────────────────────────────────

    pub fn cursor(&self) -> Cursor {
        let before = &self.input[..self.pos];
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let line_end = self.input[self.pos..]
            .find('\n')
            .map(|i| self.pos + i)
            .unwrap_or(self.input.len());
        Cursor {
            filename: self.filename.map(str::to_string),
            line_text: self.input[line_start..line_end].replace('\r', ""),
            line: before.matches('\n').count(),
            column: self.input[line_start..self.pos].chars().count(),
            offset: self.index,
        }
    }

    /// An error at the current position.
    pub fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(self.cursor(), message)
    }
}

/// Backtracking guard over a [`Parser`].
///
/// Derefs to the parser, so rules run through it unchanged. Dropping the
/// guard without [`accept`](ScopedState::accept) rolls the position back
/// to where the scope was opened. Scopes nest through reborrowing.
pub struct ScopedState<'p, 'a> {
    parser: &'p mut Parser<'a>,
    checkpoint: Checkpoint,
    accepted: bool,
}

impl ScopedState<'_, '_> {
    /// Commits everything consumed inside this scope.
    pub fn accept(mut self) {
        self.accepted = true;
    }
}

impl<'a> Deref for ScopedState<'_, 'a> {
    type Target = Parser<'a>;

    fn deref(&self) -> &Parser<'a> {
        self.parser
    }
}

impl<'a> DerefMut for ScopedState<'_, 'a> {
    fn deref_mut(&mut self) -> &mut Parser<'a> {
        self.parser
    }
}

impl Drop for ScopedState<'_, '_> {
    fn drop(&mut self) {
        if !self.accepted {
            self.parser.restore(self.checkpoint);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_rejected() {
        assert!(Parser::new("").is_err());
    }

    #[test]
    fn advance_and_reverse() {
        let mut p = Parser::new("123").unwrap();
        assert!(p.bof());
        assert_eq!(p.current(), '1');
        assert!(p.advance());
        assert_eq!(p.current(), '2');
        assert!(p.advance());
        assert!(p.advance());
        assert!(p.eof());
        assert!(!p.advance());
        assert_eq!(p.offset(), 3);
        assert!(p.reverse());
        assert_eq!(p.current(), '3');
        assert!(p.reverse());
        assert!(p.reverse());
        assert!(p.bof());
        assert!(!p.reverse());
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn advance_by_is_atomic() {
        let mut p = Parser::new("abc").unwrap();
        assert!(!p.advance_by(4));
        assert_eq!(p.offset(), 0);
        assert!(p.advance_by(2));
        assert_eq!(p.current(), 'c');
    }

    #[test]
    fn offset_counts_characters() {
        let mut p = Parser::new("äöü").unwrap();
        assert!(p.advance());
        assert_eq!(p.offset(), 1);
        assert_eq!(p.current(), 'ö');
        assert!(p.reverse());
        assert_eq!(p.current(), 'ä');
    }

    #[test]
    fn check() {
        let mut p = Parser::new("abcdef").unwrap();
        assert!(!p.check_char('b'));
        assert!(p.check_char('a'));
        assert_eq!(p.offset(), 1);
        assert!(!p.check("cd"));
        assert!(p.peek("bc"));
        assert_eq!(p.offset(), 1);
        assert!(p.check("bcd"));
        assert_eq!(p.offset(), 4);
        assert!(p.check_any(&['x', 'e']));
        assert_eq!(p.current(), 'f');
    }

    #[test]
    fn skip() {
        let mut p = Parser::new("111122223333").unwrap();
        p.skip('2');
        assert_eq!(p.offset(), 0);
        p.skip('1');
        assert_eq!(p.offset(), 4);
        p.skip_any(&['2', '4']);
        assert_eq!(p.offset(), 8);
        p.skip('3');
        assert_eq!(p.offset(), 12);
        assert!(p.eof());
    }

    #[test]
    fn skip_until() {
        let mut p = Parser::new("111122223333").unwrap();
        p.skip_until('1');
        assert_eq!(p.offset(), 0);
        p.skip_until('2');
        assert_eq!(p.offset(), 4);
        p.skip_until('3');
        assert_eq!(p.offset(), 8);
        p.skip_until('4');
        assert_eq!(p.offset(), 12);
    }

    #[test]
    fn match_until_char() {
        let mut p = Parser::new("111122223333").unwrap();
        assert_eq!(p.match_until('2', EofMode::Fail), Matched("1111"));
        assert_eq!(p.match_until('3', EofMode::Fail), Matched("2222"));
        assert_eq!(p.match_until('4', EofMode::Fail), Unmatched);
        assert_eq!(p.offset(), 8);
        assert_eq!(p.match_until('4', EofMode::Match), Matched("3333"));
        assert!(p.eof());
        assert_eq!(p.match_until('4', EofMode::Match), Unmatched);
    }

    #[test]
    fn match_until_string() {
        let mut p = Parser::new("112233abc123").unwrap();
        assert_eq!(p.match_until_str("abc", EofMode::Fail), Matched("112233"));
        assert_eq!(p.match_until_str("23", EofMode::Fail), Matched("abc1"));
        assert_eq!(p.match_until_str("xyz", EofMode::Fail), Unmatched);
        assert_eq!(p.current(), '2');
    }

    #[test]
    fn match_predicate() {
        let mut p = Parser::new("1234abcd5678").unwrap();
        assert_eq!(p.match_with(|c| c.is_ascii_alphabetic()), Unmatched);
        assert_eq!(p.match_with(|c| c.is_ascii_digit()), Matched("1234"));
        assert_eq!(p.match_with(|c| c.is_ascii_alphabetic()), Matched("abcd"));
        assert_eq!(p.match_with(|c| c.is_ascii_digit()), Matched("5678"));
        assert!(p.eof());
    }

    #[test]
    fn match_indexed_alternation() {
        let mut p = Parser::new("1a2b3c4d").unwrap();
        let digit_then_alpha = |c: char, i: usize| {
            if i % 2 == 0 {
                c.is_ascii_digit()
            } else {
                c.is_ascii_alphabetic()
            }
        };
        assert_eq!(p.match_indexed(digit_then_alpha), Matched("1a2b3c4d"));

        let mut p = Parser::new("1a2bc").unwrap();
        assert_eq!(p.match_indexed(digit_then_alpha), Matched("1a2b"));
        assert_eq!(p.current(), 'c');
    }

    #[test]
    fn match_regex() {
        let mut p = Parser::new("1234abcd5678").unwrap();
        assert_eq!(p.match_regex("[a-z]+"), Unmatched);
        assert_eq!(p.match_regex("[0-9]+"), Matched("1234"));
        assert_eq!(p.match_regex("[a-z]+"), Matched("abcd"));
        assert_eq!(p.match_regex("[0-9]{2}"), Matched("56"));
        assert!(p.match_regex("(").is_error());
    }

    #[test]
    fn match_regex_compiles_each_pattern_once() {
        let mut p = Parser::new("aa11bb").unwrap();
        assert_eq!(p.match_regex("[a-z]+"), Matched("aa"));
        assert_eq!(p.match_regex("[0-9]+"), Matched("11"));
        assert_eq!(p.match_regex("[a-z]+"), Matched("bb"));
        assert_eq!(p.patterns.len(), 2);
        assert!(p.match_regex("(").is_error());
        assert_eq!(p.patterns.len(), 2);
    }

    #[test]
    fn precompiled_pattern_only_matches_at_cursor() {
        let unanchored = Regex::new("[0-9]+").unwrap();
        let mut p = Parser::new("ab12").unwrap();
        assert_eq!(p.match_regex_with(&unanchored), Unmatched);
        assert_eq!(p.offset(), 0);
        p.advance_by(2);
        assert_eq!(p.match_regex_with(&unanchored), Matched("12"));
    }

    #[test]
    fn match_regex_empty_match_is_unmatched() {
        let mut p = Parser::new("111abc").unwrap();
        assert_eq!(p.match_regex("[a-zA-Z]*"), Unmatched);
        assert_eq!(p.offset(), 0);
        assert_eq!(p.match_regex(".*"), Matched("111abc"));
    }

    #[test]
    fn match_regex_identifier() {
        let mut p = Parser::new("my_key-2 = 3").unwrap();
        assert_eq!(p.match_regex(r"[a-zA-Z_][a-zA-Z0-9\-_]*"), Matched("my_key-2"));
        assert_eq!(p.current(), ' ');
    }

    #[test]
    fn scoped_state_rolls_back() {
        let mut p = Parser::new("abcdef").unwrap();
        {
            let mut state = p.scope();
            assert!(state.check("abc"));
            assert_eq!(state.offset(), 3);
        }
        assert_eq!(p.offset(), 0);
        {
            let mut state = p.scope();
            assert!(state.check("abc"));
            state.accept();
        }
        assert_eq!(p.offset(), 3);
    }

    #[test]
    fn nested_scopes() {
        let mut p = Parser::new("abcdef").unwrap();
        {
            let mut outer = p.scope();
            assert!(outer.check("ab"));
            {
                let mut inner = outer.scope();
                assert!(inner.check("cd"));
                inner.accept();
            }
            assert_eq!(outer.offset(), 4);
        }
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn cursor_reports_line_and_column() {
        let mut p = Parser::with_filename("first\r\nsecond line\nthird", "x.txt").unwrap();
        p.skip_until('l');
        let cursor = p.cursor();
        assert_eq!(cursor.line, 1);
        assert_eq!(cursor.column, 7);
        assert_eq!(cursor.line_text, "second line");
        assert_eq!(cursor.filename.as_deref(), Some("x.txt"));
        assert_eq!(cursor.offset, 14);
    }
}
