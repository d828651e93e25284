//! Lexeme types and keyword tables.
//!
//! The tokenizer emits a flat sequence of [`Lexeme`]s. Keywords are folded
//! to lowercase in the `value` field; quoted identifiers keep their case
//! and bypass keyword detection. Comments never appear in the stream —
//! they decorate the following lexeme (or the last one at end of input).

use requel_ast::{Comment, LiteralKind, Span};

/// A single lexeme produced by the tokenizer.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    /// The lexeme discriminant.
    pub kind: LexemeKind,
    /// Normalized textual value: keywords lowercase, quoted identifiers
    /// unquoted with case retained, literals raw as written.
    pub value: String,
    /// Comments attached to this lexeme.
    pub comments: Vec<Comment>,
    /// Byte-offset span into the original source.
    pub span: Span,
}

impl Lexeme {
    /// Whether this lexeme is the given keyword (already lowercase).
    #[must_use]
    pub fn is_keyword(&self, kw: &str) -> bool {
        self.kind == LexemeKind::Keyword && self.value == kw
    }
}

/// Lexeme discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LexemeKind {
    /// An unquoted or quoted identifier.
    Identifier,
    /// A reserved word or fused keyword phrase, lowercase.
    Keyword,
    /// A literal, tagged with its category.
    Literal(LiteralKind),
    /// An operator such as `=`, `||`, or `::`.
    Operator,
    Comma,
    Dot,
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    /// A bind parameter: `?`, `?3`, `:name`, `@name`, `$1`, `$name`.
    /// The value keeps the prefix character.
    Parameter,
    /// An identifier immediately followed by `(` — a function name.
    Function,
}

// ---------------------------------------------------------------------------
// Keyword table
// ---------------------------------------------------------------------------

/// Single-word keywords of the SELECT grammar, lowercase, sorted.
///
/// Words not in this table lex as identifiers. Words in this table that the
/// grammar does not reserve (see [`is_reserved`]) may still be used as
/// identifiers where a production expects one.
pub const KEYWORDS: &[&str] = &[
    "all",
    "and",
    "array",
    "as",
    "asc",
    "at",
    "between",
    "both",
    "by",
    "case",
    "cast",
    "character",
    "cross",
    "current",
    "desc",
    "distinct",
    "double",
    "else",
    "end",
    "escape",
    "except",
    "exclude",
    "exists",
    "extract",
    "false",
    "filter",
    "following",
    "for",
    "from",
    "full",
    "group",
    "groups",
    "having",
    "ilike",
    "in",
    "inner",
    "intersect",
    "interval",
    "is",
    "join",
    "key",
    "lateral",
    "leading",
    "left",
    "like",
    "limit",
    "locked",
    "materialized",
    "natural",
    "no",
    "not",
    "nowait",
    "null",
    "nulls",
    "of",
    "offset",
    "on",
    "or",
    "order",
    "others",
    "outer",
    "over",
    "overlay",
    "partition",
    "placing",
    "position",
    "preceding",
    "range",
    "recursive",
    "right",
    "row",
    "rows",
    "select",
    "share",
    "similar",
    "skip",
    "substring",
    "then",
    "ties",
    "time",
    "timestamp",
    "trailing",
    "trim",
    "true",
    "unbounded",
    "union",
    "update",
    "using",
    "values",
    "when",
    "where",
    "window",
    "with",
    "within",
];

/// Multi-word keyword phrases fused into a single lexeme, longest first
/// within each leading word. The fused value is the phrase joined by
/// single spaces.
pub const KEYWORD_PHRASES: &[&[&str]] = &[
    &["at", "time", "zone"],
    &["character", "varying"],
    &["double", "precision"],
    &["group", "by"],
    &["is", "not", "distinct", "from"],
    &["is", "distinct", "from"],
    &["nulls", "first"],
    &["nulls", "last"],
    &["order", "by"],
    &["partition", "by"],
    &["similar", "to"],
    &["time", "without", "time", "zone"],
    &["time", "with", "time", "zone"],
    &["timestamp", "without", "time", "zone"],
    &["timestamp", "with", "time", "zone"],
    &["union", "all"],
    &["within", "group"],
];

/// Words reserved by the grammar: never accepted in identifier position.
///
/// Everything else in [`KEYWORDS`] is soft — `groups`, `key`, `row`, and
/// friends are only keywords where a production requires one.
const RESERVED: &[&str] = &[
    "and",
    "as",
    "between",
    "case",
    "cast",
    "cross",
    "distinct",
    "else",
    "end",
    "except",
    "exists",
    "from",
    "full",
    "group",
    "group by",
    "having",
    "in",
    "inner",
    "intersect",
    "is",
    "join",
    "lateral",
    "left",
    "like",
    "limit",
    "natural",
    "not",
    "null",
    "offset",
    "on",
    "or",
    "order",
    "order by",
    "right",
    "select",
    "then",
    "union",
    "union all",
    "using",
    "values",
    "when",
    "where",
    "window",
    "with",
];

/// Whether a lowercase word is a single-word keyword.
#[must_use]
pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.binary_search(&word).is_ok()
}

/// Whether a lowercase keyword value is reserved (rejected as identifier).
#[must_use]
pub fn is_reserved(value: &str) -> bool {
    RESERVED.binary_search(&value).is_ok()
}

/// Phrases starting with the given lowercase word, longest first.
#[must_use]
pub fn phrases_starting_with(word: &str) -> Vec<&'static [&'static str]> {
    let mut matches: Vec<&[&str]> = KEYWORD_PHRASES
        .iter()
        .copied()
        .filter(|p| p[0] == word)
        .collect();
    matches.sort_by_key(|p| std::cmp::Reverse(p.len()));
    matches
}

/// Operator spellings the tokenizer recognizes, longest first so the scan
/// is a maximal munch. `::` never fuses with its neighbours.
pub const OPERATORS: &[&str] = &[
    "->>", "::", "||", "->", "<=", ">=", "<>", "<@", "!=", "==", "=", "<", ">", "@>", "+", "-",
    "*", "/", "%", "^", "|", "&", "#", "~", "!", "@",
];
