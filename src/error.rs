use std::fmt;

use crate::tree::WrongVariant;

/// A diagnostic location inside the parsed text.
///
/// Computed on demand by [`Parser::cursor`](crate::parser::Parser::cursor);
/// never built while a rule is still matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub filename: Option<String>,
    /// The full line containing the position, without its line ending.
    pub line_text: String,
    /// 0-based line number
    pub line: usize,
    /// 0-based column (characters from the start of the line)
    pub column: usize,
    /// 0-based character offset from the start of input
    pub offset: usize,
}

/// Malformed input. Carries where it happened and what was expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub cursor: Cursor,
    pub message: String,
}

impl ParseError {
    pub fn new(cursor: Cursor, message: impl Into<String>) -> Self {
        ParseError {
            cursor,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}",
            self.cursor.filename.as_deref().unwrap_or("<input>"),
            self.cursor.line + 1,
            self.cursor.column + 1,
            self.message
        )
    }
}

impl std::error::Error for ParseError {}

/// Every failure the codecs and facades can report.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    WrongVariant(#[from] WrongVariant),

    #[error("{format} cannot represent this tree: {reason}")]
    UnsupportedFormat { format: &'static str, reason: String },

    #[error("missing entry [{header}] {key}")]
    MissingEntry { header: String, key: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("input is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl Error {
    pub(crate) fn unsupported(format: &'static str, reason: impl Into<String>) -> Self {
        Error::UnsupportedFormat {
            format,
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor(filename: Option<&str>) -> Cursor {
        Cursor {
            filename: filename.map(str::to_string),
            line_text: "a = ?".to_string(),
            line: 2,
            column: 4,
            offset: 17,
        }
    }

    #[test]
    fn display_is_one_based() {
        let err = ParseError::new(cursor(Some("settings.ini")), "Unknown value type");
        assert_eq!(err.to_string(), "settings.ini:3:5: Unknown value type");
    }

    #[test]
    fn display_without_filename() {
        let err = ParseError::new(cursor(None), "oops");
        assert_eq!(err.to_string(), "<input>:3:5: oops");
    }

    #[test]
    fn parse_error_converts_into_crate_error() {
        let err: Error = ParseError::new(cursor(None), "oops").into();
        assert!(matches!(err, Error::Parse(_)));
        assert_eq!(err.to_string(), "<input>:3:5: oops");
    }
}
