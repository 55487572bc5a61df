use crate::error::ParseError;

/// Outcome of a single grammar rule.
///
/// `Unmatched` means the rule did not apply and nothing was consumed, so
/// the caller may try an alternative. `Error` means the rule committed and
/// the input is malformed; it must propagate to the top of the parse.
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub enum ParseResult<T> {
    Matched(T),
    Unmatched,
    Error(ParseError),
}

use ParseResult::*;

impl<T> ParseResult<T> {
    pub fn is_matched(&self) -> bool {
        matches!(self, Matched(_))
    }

    pub fn is_unmatched(&self) -> bool {
        matches!(self, Unmatched)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Error(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Matched(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Matched(v) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ParseError> {
        match self {
            Error(e) => Some(e),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ParseResult<U> {
        match self {
            Matched(v) => Matched(f(v)),
            Unmatched => Unmatched,
            Error(e) => Error(e),
        }
    }

    pub fn and_then<U>(self, f: impl FnOnce(T) -> ParseResult<U>) -> ParseResult<U> {
        match self {
            Matched(v) => f(v),
            Unmatched => Unmatched,
            Error(e) => Error(e),
        }
    }

    /// Tries `f` only when this rule did not apply. Errors short-circuit.
    pub fn or_else(self, f: impl FnOnce() -> ParseResult<T>) -> ParseResult<T> {
        match self {
            Unmatched => f(),
            other => other,
        }
    }

    /// Splits the outcome so `?` can propagate errors:
    /// `if let Some(v) = rule(p).into_result()? { .. }`.
    pub fn into_result(self) -> Result<Option<T>, ParseError> {
        match self {
            Matched(v) => Ok(Some(v)),
            Unmatched => Ok(None),
            Error(e) => Err(e),
        }
    }

    /// Escalates `Unmatched` to an error built by `f`.
    pub fn require(self, f: impl FnOnce() -> ParseError) -> Result<T, ParseError> {
        match self {
            Matched(v) => Ok(v),
            Unmatched => Err(f()),
            Error(e) => Err(e),
        }
    }
}

impl<T> From<ParseError> for ParseResult<T> {
    fn from(e: ParseError) -> Self {
        Error(e)
    }
}

impl<T> From<Result<T, ParseError>> for ParseResult<T> {
    fn from(r: Result<T, ParseError>) -> Self {
        match r {
            Ok(v) => Matched(v),
            Err(e) => Error(e),
        }
    }
}
