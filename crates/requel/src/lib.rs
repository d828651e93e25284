//! Public API facade for requel.
//!
//! requel parses SELECT-family SQL text into a typed AST, runs
//! structural transformations on the tree, and re-emits dialect-aware
//! formatted SQL together with an out-of-line parameter bag.
//!
//! ```
//! use requel::{parse_select, FormatOptions, Formatter};
//!
//! let query = parse_select("SELECT id, name FROM users WHERE id = :id")?;
//! let formatter = Formatter::new(FormatOptions::default())?;
//! let out = formatter.format(&query)?;
//! assert_eq!(
//!     out.sql,
//!     "select \"id\", \"name\" from \"users\" where \"id\" = $1"
//! );
//! # Ok::<(), requel::RequelError>(())
//! ```

pub use requel_ast as ast;
pub use requel_error::{
    FormatError, ParseError, PresetError, RequelError, Result, TokenizeError,
};
pub use requel_format::{
    format_metrics_snapshot, reset_format_metrics, BreakStyle, ContainerKind, Dialect,
    EscapePair, FormatMetricsSnapshot, FormatOptions, Formatted, Formatter, KeywordCase,
    ParamBag, ParamBinding, ParameterStyle, ParameterSymbol, PrintToken, PrintTokenKind,
};
pub use requel_parser::{
    parse_expression, parse_metrics_snapshot, parse_select, parse_source, parse_values,
    parse_with, reset_parse_metrics, reset_tokenize_metrics, tokenize,
    tokenize_metrics_snapshot, Lexeme, LexemeKind, ParseMetricsSnapshot, Parser,
    TokenizeMetricsSnapshot,
};
pub use requel_transform::CteGraph;
