//! Dialect-aware SQL formatting.
//!
//! A two-stage printer: `print.rs` lowers the AST into a token tree
//! annotated with container kinds, `line.rs` walks that tree applying the
//! presentation options. Dialect presets seed the identifier escape pair
//! and parameter emission; every field can be overridden per instance.

mod line;
mod params;
mod print;

use std::sync::atomic::{AtomicU64, Ordering};

use requel_ast::{Expr, Query};
use requel_error::{PresetError, RequelError};
use serde::{Deserialize, Serialize};

pub use params::{ParamBag, ParamBinding};
pub use print::{ContainerKind, PrintToken, PrintTokenKind};

// ---------------------------------------------------------------------------
// Format metrics
// ---------------------------------------------------------------------------

/// Monotonic counter of successful format calls.
static REQUEL_FORMAT_CALLS_TOTAL: AtomicU64 = AtomicU64::new(0);

/// Point-in-time format metrics snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatMetricsSnapshot {
    /// Total queries successfully formatted.
    pub requel_format_calls_total: u64,
}

/// Take a point-in-time snapshot of format metrics.
#[must_use]
pub fn format_metrics_snapshot() -> FormatMetricsSnapshot {
    FormatMetricsSnapshot {
        requel_format_calls_total: REQUEL_FORMAT_CALLS_TOTAL.load(Ordering::Relaxed),
    }
}

/// Reset format metrics (used by tests/diagnostics).
pub fn reset_format_metrics() {
    REQUEL_FORMAT_CALLS_TOTAL.store(0, Ordering::Relaxed);
}

// ---------------------------------------------------------------------------
// Dialect presets
// ---------------------------------------------------------------------------

/// Built-in dialect presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Postgres,
    Mysql,
    Sqlite,
    Sqlserver,
}

impl Dialect {
    /// Resolve a preset name.
    pub fn from_name(name: &str) -> Result<Self, PresetError> {
        match name {
            "postgres" => Ok(Self::Postgres),
            "mysql" => Ok(Self::Mysql),
            "sqlite" => Ok(Self::Sqlite),
            "sqlserver" => Ok(Self::Sqlserver),
            other => Err(PresetError::new(other)),
        }
    }

    fn identifier_escape(self) -> (String, String) {
        match self {
            Self::Postgres | Self::Sqlite => ("\"".to_owned(), "\"".to_owned()),
            Self::Mysql => ("`".to_owned(), "`".to_owned()),
            Self::Sqlserver => ("[".to_owned(), "]".to_owned()),
        }
    }

    fn parameter_symbol(self) -> ParameterSymbol {
        match self {
            Self::Postgres => ParameterSymbol::plain("$"),
            Self::Mysql | Self::Sqlite => ParameterSymbol::plain("?"),
            Self::Sqlserver => ParameterSymbol::plain("@"),
        }
    }

    fn parameter_style(self) -> ParameterStyle {
        match self {
            Self::Postgres => ParameterStyle::Indexed,
            Self::Mysql | Self::Sqlite => ParameterStyle::Anonymous,
            Self::Sqlserver => ParameterStyle::Named,
        }
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// How parameters are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterStyle {
    Anonymous,
    Indexed,
    Named,
}

/// Keyword case transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordCase {
    #[default]
    None,
    Upper,
    Lower,
}

/// Where a break is placed relative to a comma or AND token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakStyle {
    #[default]
    None,
    Before,
    After,
}

/// An identifier escape pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EscapePair {
    pub start: String,
    pub end: String,
}

/// The parameter symbol: a plain prefix or a wrapping pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterSymbol {
    Plain(String),
    Wrapped { start: String, end: String },
}

impl ParameterSymbol {
    pub fn plain(symbol: impl Into<String>) -> Self {
        Self::Plain(symbol.into())
    }

    pub fn wrapped(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self::Wrapped {
            start: start.into(),
            end: end.into(),
        }
    }

    pub(crate) fn wrap(&self, inner: &str) -> String {
        match self {
            Self::Plain(symbol) => format!("{symbol}{inner}"),
            Self::Wrapped { start, end } => format!("{start}{inner}{end}"),
        }
    }
}

/// The formatter options record. Unset fields fall back to the preset
/// (or to the postgres-shaped defaults when no preset is named); unknown
/// fields are rejected when deserializing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct FormatOptions {
    pub preset: Option<String>,
    pub identifier_escape: Option<EscapePair>,
    pub parameter_symbol: Option<ParameterSymbol>,
    pub parameter_style: Option<ParameterStyle>,
    pub indent_char: Option<char>,
    pub indent_size: Option<usize>,
    pub newline: Option<String>,
    pub keyword_case: Option<KeywordCase>,
    pub comma_break: Option<BreakStyle>,
    pub and_break: Option<BreakStyle>,
    pub export_comment: Option<bool>,
    pub strict_comment_placement: Option<bool>,
    pub cte_oneline: Option<bool>,
    pub cte_oneline_dependency: Option<bool>,
}

/// Options with every field resolved against the preset.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedOptions {
    pub identifier_escape: (String, String),
    pub parameter_symbol: ParameterSymbol,
    pub parameter_style: ParameterStyle,
    pub indent_char: char,
    pub indent_size: usize,
    pub newline: String,
    pub keyword_case: KeywordCase,
    pub comma_break: BreakStyle,
    pub and_break: BreakStyle,
    pub export_comment: bool,
    pub strict_comment_placement: bool,
    pub cte_oneline: bool,
    pub cte_oneline_dependency: bool,
}

// ---------------------------------------------------------------------------
// Formatter
// ---------------------------------------------------------------------------

/// A format result: the SQL text plus the out-of-line parameter bag.
#[derive(Debug, Clone, PartialEq)]
pub struct Formatted {
    pub sql: String,
    pub params: ParamBag,
}

/// The dialect-aware formatter. Construction resolves the preset;
/// formatting is a pure function of the tree and the resolved options.
#[derive(Debug, Clone)]
pub struct Formatter {
    opts: ResolvedOptions,
}

impl Formatter {
    /// Build a formatter, resolving the preset name if one is given.
    pub fn new(options: FormatOptions) -> Result<Self, PresetError> {
        let dialect = match &options.preset {
            Some(name) => Dialect::from_name(name)?,
            None => Dialect::Postgres,
        };
        Ok(Self {
            opts: ResolvedOptions {
                identifier_escape: options
                    .identifier_escape
                    .map_or_else(|| dialect.identifier_escape(), |e| (e.start, e.end)),
                parameter_symbol: options
                    .parameter_symbol
                    .unwrap_or_else(|| dialect.parameter_symbol()),
                parameter_style: options
                    .parameter_style
                    .unwrap_or_else(|| dialect.parameter_style()),
                indent_char: options.indent_char.unwrap_or(' '),
                indent_size: options.indent_size.unwrap_or(4),
                newline: options.newline.unwrap_or_else(|| " ".to_owned()),
                keyword_case: options.keyword_case.unwrap_or_default(),
                comma_break: options.comma_break.unwrap_or_default(),
                and_break: options.and_break.unwrap_or_default(),
                export_comment: options.export_comment.unwrap_or(false),
                strict_comment_placement: options.strict_comment_placement.unwrap_or(false),
                cte_oneline: options.cte_oneline.unwrap_or(false),
                cte_oneline_dependency: options.cte_oneline_dependency.unwrap_or(false),
            },
        })
    }

    /// Formatter with all-default options.
    #[must_use]
    pub fn default_options() -> Self {
        Self::new(FormatOptions::default()).unwrap_or_else(|_| unreachable!())
    }

    /// Format a query into SQL text and a parameter bag.
    pub fn format(&self, query: &Query) -> Result<Formatted, RequelError> {
        let span = tracing::debug_span!(
            target: "requel.format",
            "format",
            sql_len = tracing::field::Empty,
            param_count = tracing::field::Empty,
        );
        let _guard = span.enter();

        let mut lowering = print::Lowering::new(&self.opts);
        let root = lowering.lower_query_root(query)?;
        let sql = line::LinePrinter::new(&self.opts).render(&root);
        let params = lowering.params.into_bag();

        span.record("sql_len", sql.len() as u64);
        span.record("param_count", params.len() as u64);
        REQUEL_FORMAT_CALLS_TOTAL.fetch_add(1, Ordering::Relaxed);
        Ok(Formatted { sql, params })
    }

    /// Format a standalone expression.
    pub fn format_expr(&self, expr: &Expr) -> Result<Formatted, RequelError> {
        let mut lowering = print::Lowering::new(&self.opts);
        let root = lowering.lower_expr_root(expr)?;
        let sql = line::LinePrinter::new(&self.opts).render(&root);
        let params = lowering.params.into_bag();
        REQUEL_FORMAT_CALLS_TOTAL.fetch_add(1, Ordering::Relaxed);
        Ok(Formatted { sql, params })
    }
}
