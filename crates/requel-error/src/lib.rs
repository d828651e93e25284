//! Error taxonomy for the requel workspace.
//!
//! Four failure classes surface at the API boundary: lexical
//! ([`TokenizeError`]), grammatical ([`ParseError`]), tree-invariant
//! ([`FormatError`]), and configuration ([`PresetError`]). The umbrella
//! [`RequelError`] joins them for callers that drive the whole pipeline.
//!
//! Messages are single-line and carry the offending byte offset or token;
//! none of them embed backtraces.

use std::fmt;

use thiserror::Error;

/// Malformed lexical input: unterminated strings or comments, unknown
/// characters, malformed literals.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("tokenize error at byte {offset}: {message}")]
pub struct TokenizeError {
    /// Byte offset of the offending character.
    pub offset: usize,
    /// One-line description.
    pub message: String,
}

impl TokenizeError {
    /// Create a tokenize error at the given byte offset.
    pub fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// A grammar violation raised by one of the parser routines.
///
/// `expected` is a short set of alternatives, `found` is the actual lexeme
/// value (or `"end of input"`), and `context` is the breadcrumb of
/// productions being parsed, outermost first.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Byte offset of the offending lexeme.
    pub offset: usize,
    /// Alternatives that would have been accepted here.
    pub expected: Vec<String>,
    /// The lexeme value actually seen, or `"end of input"`.
    pub found: String,
    /// Productions being parsed when the error was raised.
    pub context: Vec<&'static str>,
}

impl ParseError {
    /// The `found` value used when a routine exhausts the lexeme stream.
    pub const END_OF_INPUT: &'static str = "end of input";

    pub fn new(
        offset: usize,
        expected: Vec<String>,
        found: impl Into<String>,
        context: Vec<&'static str>,
    ) -> Self {
        Self {
            offset,
            expected,
            found: found.into(),
            context,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error at byte {}: expected ", self.offset)?;
        for (i, alt) in self.expected.iter().enumerate() {
            if i > 0 {
                f.write_str(" or ")?;
            }
            write!(f, "{alt}")?;
        }
        write!(f, ", found {}", self.found)?;
        if !self.context.is_empty() {
            write!(f, " (while parsing {})", self.context.join(" > "))?;
        }
        Ok(())
    }
}

/// An invariant violation in a tree handed to the formatter.
///
/// Always a programmer error: the parsers never build such trees, so this
/// only fires on hand-constructed or badly transformed input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("format error: {message}")]
pub struct FormatError {
    /// One-line description of the violated invariant.
    pub message: String,
}

impl FormatError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// An unknown dialect preset name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown dialect preset: '{name}'")]
pub struct PresetError {
    /// The name that failed to resolve.
    pub name: String,
}

impl PresetError {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Umbrella error for the whole parse/transform/format pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequelError {
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Preset(#[from] PresetError),
}

/// Result type alias using [`RequelError`].
pub type Result<T> = std::result::Result<T, RequelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_error_display() {
        let err = TokenizeError::new(17, "unterminated string literal");
        assert_eq!(
            err.to_string(),
            "tokenize error at byte 17: unterminated string literal"
        );
    }

    #[test]
    fn parse_error_display_with_alternatives() {
        let err = ParseError::new(
            42,
            vec!["identifier".to_owned(), "'('".to_owned()],
            "')'",
            vec!["select query", "from clause"],
        );
        assert_eq!(
            err.to_string(),
            "parse error at byte 42: expected identifier or '(', found ')' \
             (while parsing select query > from clause)"
        );
    }

    #[test]
    fn parse_error_display_end_of_input() {
        let err = ParseError::new(
            100,
            vec!["expression".to_owned()],
            ParseError::END_OF_INPUT,
            vec![],
        );
        assert_eq!(
            err.to_string(),
            "parse error at byte 100: expected expression, found end of input"
        );
    }

    #[test]
    fn format_error_display() {
        let err = FormatError::new("function call has both OVER and WITHIN GROUP");
        assert_eq!(
            err.to_string(),
            "format error: function call has both OVER and WITHIN GROUP"
        );
    }

    #[test]
    fn preset_error_display() {
        let err = PresetError::new("oracle");
        assert_eq!(err.to_string(), "unknown dialect preset: 'oracle'");
    }

    #[test]
    fn umbrella_from_conversions() {
        let err: RequelError = TokenizeError::new(0, "bad").into();
        assert!(matches!(err, RequelError::Tokenize(_)));

        let err: RequelError = PresetError::new("x").into();
        assert!(matches!(err, RequelError::Preset(_)));
    }
}
