//! Tokenizer and recursive-descent parsers for the SELECT grammar.
//!
//! The pipeline front half: SQL text → [`Lexeme`] stream → AST from
//! `requel-ast`. Expression parsing uses Pratt precedence-climbing in
//! `expr.rs`; clause and query parsing live in `parser.rs`.

pub mod expr;
pub mod lexer;
pub mod parser;
pub mod token;

pub use lexer::{
    reset_tokenize_metrics, tokenize, tokenize_metrics_snapshot, TokenizeMetricsSnapshot,
};
pub use parser::{
    parse_metrics_snapshot, reset_parse_metrics, ParseMetricsSnapshot, Parser, MAX_PARSE_DEPTH,
};
pub use token::{Lexeme, LexemeKind};

use requel_ast::{Expr, Query, Source, ValuesQuery, WithClause};
use requel_error::{RequelError, Result};

/// Parse a complete SELECT-family statement from SQL text.
///
/// Fails if the text does not tokenize, does not parse, or has trailing
/// lexemes after the query.
pub fn parse_select(sql: &str) -> Result<Query> {
    let lexemes = tokenize(sql)?;
    let mut parser = Parser::new(lexemes);
    let query = parser.parse_query()?;
    ensure_complete(&parser)?;
    Ok(query)
}

/// Parse a standalone expression from SQL text.
pub fn parse_expression(sql: &str) -> Result<Expr> {
    let lexemes = tokenize(sql)?;
    let mut parser = Parser::new(lexemes);
    let expr = parser.parse_expr()?;
    ensure_complete(&parser)?;
    Ok(expr)
}

/// Parse a standalone table source from SQL text.
pub fn parse_source(sql: &str) -> Result<Source> {
    let lexemes = tokenize(sql)?;
    let mut parser = Parser::new(lexemes);
    let source = parser.parse_source()?;
    ensure_complete(&parser)?;
    Ok(source)
}

/// Parse a standalone `WITH` clause from SQL text.
pub fn parse_with(sql: &str) -> Result<WithClause> {
    let lexemes = tokenize(sql)?;
    let mut parser = Parser::new(lexemes);
    let with = parser.parse_with_clause()?;
    ensure_complete(&parser)?;
    Ok(with)
}

/// Parse a standalone `VALUES` query from SQL text.
pub fn parse_values(sql: &str) -> Result<ValuesQuery> {
    let lexemes = tokenize(sql)?;
    let mut parser = Parser::new(lexemes);
    let values = parser.parse_values_query()?;
    ensure_complete(&parser)?;
    Ok(values)
}

fn ensure_complete(parser: &Parser) -> std::result::Result<(), RequelError> {
    if parser.is_complete() {
        Ok(())
    } else {
        Err(parser.err_expected(&["end of input"]).into())
    }
}
