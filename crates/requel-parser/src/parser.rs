//! Recursive-descent parser for the SELECT grammar.
//!
//! Expression parsing lives in `expr.rs`. Every routine advances the
//! cursor only on success of the lexemes it consumes; the first failure
//! wins and no partial AST escapes.

use std::sync::atomic::{AtomicU64, Ordering};

use requel_ast::{
    BinaryQuery, Comment, CommonTable, Distinct, Expr, ForClause, FromClause, GroupByClause,
    HavingClause, Join, JoinConstraint, JoinKind, LimitClause, LockMode, LockWait, Materialized,
    NamedWindow, OffsetClause, OrderByClause, OrderItem, Query, SelectClause, SelectItem,
    SelectQuery, SetOp, Source, ValuesQuery, WhereClause, WindowClause, WithClause,
};
use requel_error::ParseError;

use crate::token::{is_reserved, Lexeme, LexemeKind};

// ---------------------------------------------------------------------------
// Parse metrics
// ---------------------------------------------------------------------------

/// Monotonic counter of successfully parsed queries.
static REQUEL_PARSE_QUERIES_TOTAL: AtomicU64 = AtomicU64::new(0);

/// Point-in-time parse metrics snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseMetricsSnapshot {
    /// Total queries successfully parsed.
    pub requel_parse_queries_total: u64,
}

/// Take a point-in-time snapshot of parse metrics.
#[must_use]
pub fn parse_metrics_snapshot() -> ParseMetricsSnapshot {
    ParseMetricsSnapshot {
        requel_parse_queries_total: REQUEL_PARSE_QUERIES_TOTAL.load(Ordering::Relaxed),
    }
}

/// Reset parse metrics (used by tests/diagnostics).
pub fn reset_parse_metrics() {
    REQUEL_PARSE_QUERIES_TOTAL.store(0, Ordering::Relaxed);
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Maximum grammar recursion depth before parsing aborts.
pub const MAX_PARSE_DEPTH: u32 = 500;

/// The parser: a lexeme stream plus a cursor.
///
/// Each `parse_*` routine consumes lexemes from the cursor forward and
/// leaves the cursor just past what it recognized, so callers can chain
/// productions or check [`Parser::is_complete`] afterwards.
pub struct Parser {
    pub(crate) lexemes: Vec<Lexeme>,
    pub(crate) pos: usize,
    pub(crate) depth: u32,
    pub(crate) context: Vec<&'static str>,
    /// Ordinals handed to anonymous `?` parameters, in textual order.
    pub(crate) anon_params: u32,
}

impl Parser {
    #[must_use]
    pub fn new(lexemes: Vec<Lexeme>) -> Self {
        Self {
            lexemes,
            pos: 0,
            depth: 0,
            context: Vec::new(),
            anon_params: 0,
        }
    }

    /// The cursor position (index into the lexeme stream).
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.pos
    }

    /// Whether the cursor has consumed the whole stream.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.pos >= self.lexemes.len()
    }

    /// Parse one query and record the metric.
    pub fn parse_query(&mut self) -> Result<Query, ParseError> {
        let span = tracing::debug_span!(
            target: "requel.parse",
            "parse_query",
            lexemes = self.lexemes.len(),
        );
        let _guard = span.enter();

        let query = self.parse_query_inner()?;
        REQUEL_PARSE_QUERIES_TOTAL.fetch_add(1, Ordering::Relaxed);
        Ok(query)
    }

    // -----------------------------------------------------------------------
    // Cursor helpers
    // -----------------------------------------------------------------------

    pub(crate) fn peek(&self) -> Option<&Lexeme> {
        self.lexemes.get(self.pos)
    }

    pub(crate) fn peek_nth(&self, n: usize) -> Option<&Lexeme> {
        self.lexemes.get(self.pos + n)
    }

    pub(crate) fn advance(&mut self) -> Lexeme {
        let lexeme = self.lexemes[self.pos].clone();
        self.pos += 1;
        lexeme
    }

    /// Byte offset of the current lexeme, or of end of input.
    pub(crate) fn offset_here(&self) -> usize {
        self.peek().map_or_else(
            || {
                self.lexemes
                    .last()
                    .map_or(0, |l| l.span.end as usize)
            },
            |l| l.span.start as usize,
        )
    }

    pub(crate) fn found_here(&self) -> String {
        self.peek().map_or_else(
            || ParseError::END_OF_INPUT.to_owned(),
            |l| format!("'{}'", l.value),
        )
    }

    pub(crate) fn err_expected(&self, expected: &[&str]) -> ParseError {
        ParseError::new(
            self.offset_here(),
            expected.iter().map(|s| (*s).to_owned()).collect(),
            self.found_here(),
            self.context.clone(),
        )
    }

    pub(crate) fn at_keyword(&self, kw: &str) -> bool {
        self.peek().is_some_and(|l| l.is_keyword(kw))
    }

    pub(crate) fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.at_keyword(kw) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Eat a keyword and return its lexeme (for comment lifting).
    pub(crate) fn eat_keyword_lexeme(&mut self, kw: &str) -> Option<Lexeme> {
        if self.at_keyword(kw) {
            Some(self.advance())
        } else {
            None
        }
    }

    pub(crate) fn expect_keyword(&mut self, kw: &str) -> Result<Lexeme, ParseError> {
        self.eat_keyword_lexeme(kw)
            .ok_or_else(|| self.err_expected(&[kw]))
    }

    pub(crate) fn at_kind(&self, kind: LexemeKind) -> bool {
        self.peek().is_some_and(|l| l.kind == kind)
    }

    pub(crate) fn eat_kind(&mut self, kind: LexemeKind) -> bool {
        if self.at_kind(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn expect_kind(
        &mut self,
        kind: LexemeKind,
        describe: &'static str,
    ) -> Result<Lexeme, ParseError> {
        if self.at_kind(kind) {
            Ok(self.advance())
        } else {
            Err(self.err_expected(&[describe]))
        }
    }

    pub(crate) fn at_operator(&self, op: &str) -> bool {
        self.peek()
            .is_some_and(|l| l.kind == LexemeKind::Operator && l.value == op)
    }

    pub(crate) fn eat_operator(&mut self, op: &str) -> bool {
        if self.at_operator(op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Whether the current lexeme can stand in identifier position:
    /// a plain identifier, a function name, or a soft keyword.
    pub(crate) fn at_identifier(&self) -> bool {
        self.peek().is_some_and(|l| match l.kind {
            LexemeKind::Identifier | LexemeKind::Function => true,
            LexemeKind::Keyword => !is_reserved(&l.value),
            _ => false,
        })
    }

    /// Consume an identifier (soft keywords permitted), returning its value.
    pub(crate) fn parse_identifier(&mut self) -> Result<String, ParseError> {
        if self.at_identifier() {
            Ok(self.advance().value)
        } else {
            Err(self.err_expected(&["identifier"]))
        }
    }

    pub(crate) fn with_context<T>(
        &mut self,
        name: &'static str,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        self.context.push(name);
        let result = f(self);
        self.context.pop();
        result
    }

    pub(crate) fn with_recursion_guard<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_PARSE_DEPTH {
            return Err(ParseError::new(
                self.offset_here(),
                vec![format!("nesting no deeper than {MAX_PARSE_DEPTH}")],
                self.found_here(),
                self.context.clone(),
            ));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    pub(crate) fn parse_comma_sep<T>(
        &mut self,
        f: impl Fn(&mut Self) -> Result<T, ParseError>,
    ) -> Result<Vec<T>, ParseError> {
        let mut items = vec![f(self)?];
        while self.eat_kind(LexemeKind::Comma) {
            items.push(f(self)?);
        }
        Ok(items)
    }

    /// Comments attached to the current lexeme, without consuming it.
    fn comments_here(&self) -> Vec<Comment> {
        self.peek().map(|l| l.comments.clone()).unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Queries and set operators
    // -----------------------------------------------------------------------

    pub(crate) fn parse_query_inner(&mut self) -> Result<Query, ParseError> {
        self.with_recursion_guard(|p| {
            p.with_context("query", |p| {
                let with = if p.at_keyword("with") {
                    Some(p.parse_with_clause()?)
                } else {
                    None
                };
                let mut left = p.parse_query_term(with)?;
                while let Some(op) = p.peek_set_op() {
                    p.advance_set_op();
                    let right = p.parse_query_term(None)?;
                    left = Query::Binary(BinaryQuery {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    });
                }
                Ok(left)
            })
        })
    }

    fn peek_set_op(&self) -> Option<SetOp> {
        let lexeme = self.peek()?;
        if lexeme.kind != LexemeKind::Keyword {
            return None;
        }
        match lexeme.value.as_str() {
            "union" => Some(SetOp::Union),
            "union all" => Some(SetOp::UnionAll),
            "intersect" => Some(SetOp::Intersect),
            "except" => Some(SetOp::Except),
            _ => None,
        }
    }

    fn advance_set_op(&mut self) {
        self.pos += 1;
    }

    /// One operand of a set-operator chain: a simple select, a VALUES
    /// query, or a parenthesized query.
    fn parse_query_term(&mut self, with: Option<WithClause>) -> Result<Query, ParseError> {
        if self.at_kind(LexemeKind::OpenParen) && self.paren_opens_query() {
            if with.is_some() {
                return Err(self.err_expected(&["select"]));
            }
            self.advance(); // (
            let query = self.parse_query_inner()?;
            self.expect_kind(LexemeKind::CloseParen, "')'")?;
            return Ok(query);
        }
        if self.at_keyword("values") {
            if with.is_some() {
                return Err(self.err_expected(&["select"]));
            }
            return Ok(Query::Values(self.parse_values_query()?));
        }
        let select = self.parse_select_query(with)?;
        Ok(Query::Select(Box::new(select)))
    }

    /// Disambiguate `(` by peeking one lexeme past it: a query opener
    /// means a parenthesized select or set-operation operand.
    pub(crate) fn paren_opens_query(&self) -> bool {
        self.peek_nth(1).is_some_and(|l| {
            matches!(l.kind, LexemeKind::Keyword if matches!(l.value.as_str(), "select" | "with" | "values"))
                || l.kind == LexemeKind::OpenParen
        })
    }

    // -----------------------------------------------------------------------
    // Simple select
    // -----------------------------------------------------------------------

    fn parse_select_query(
        &mut self,
        with: Option<WithClause>,
    ) -> Result<SelectQuery, ParseError> {
        self.with_context("select query", |p| {
            let select = p.parse_select_clause()?;

            let from = if p.at_keyword("from") {
                Some(p.parse_from_clause()?)
            } else {
                None
            };

            let where_clause = match p.eat_keyword_lexeme("where") {
                Some(kw) => Some(p.with_context("where clause", |p| {
                    Ok(WhereClause {
                        condition: p.parse_expr()?,
                        comments: kw.comments,
                    })
                })?),
                None => None,
            };

            let group_by = match p.eat_keyword_lexeme("group by") {
                Some(kw) => Some(p.with_context("group by clause", |p| {
                    Ok(GroupByClause {
                        items: p.parse_comma_sep(Self::parse_expr)?,
                        comments: kw.comments,
                    })
                })?),
                None => None,
            };

            let having = match p.eat_keyword_lexeme("having") {
                Some(kw) => Some(p.with_context("having clause", |p| {
                    Ok(HavingClause {
                        condition: p.parse_expr()?,
                        comments: kw.comments,
                    })
                })?),
                None => None,
            };

            let window = match p.eat_keyword_lexeme("window") {
                Some(kw) => Some(p.with_context("window clause", |p| {
                    Ok(WindowClause {
                        defs: p.parse_comma_sep(Self::parse_named_window)?,
                        comments: kw.comments,
                    })
                })?),
                None => None,
            };

            let order_by = match p.eat_keyword_lexeme("order by") {
                Some(kw) => Some(p.with_context("order by clause", |p| {
                    Ok(OrderByClause {
                        items: p.parse_comma_sep(Self::parse_order_item)?,
                        comments: kw.comments,
                    })
                })?),
                None => None,
            };

            let mut limit = None;
            let mut offset = None;
            loop {
                if limit.is_none() {
                    if let Some(kw) = p.eat_keyword_lexeme("limit") {
                        limit = Some(LimitClause {
                            value: p.parse_expr()?,
                            comments: kw.comments,
                        });
                        continue;
                    }
                }
                if offset.is_none() {
                    if let Some(kw) = p.eat_keyword_lexeme("offset") {
                        offset = Some(OffsetClause {
                            value: p.parse_expr()?,
                            comments: kw.comments,
                        });
                        continue;
                    }
                }
                break;
            }

            let for_lock = if p.at_keyword("for") {
                Some(p.parse_for_clause()?)
            } else {
                None
            };

            Ok(SelectQuery {
                with,
                select,
                from,
                where_clause,
                group_by,
                having,
                window,
                order_by,
                limit,
                offset,
                for_lock,
            })
        })
    }

    fn parse_select_clause(&mut self) -> Result<SelectClause, ParseError> {
        self.with_context("select clause", |p| {
            let kw = p.expect_keyword("select")?;

            let distinct = if p.eat_keyword("distinct") {
                if p.eat_keyword("on") {
                    p.expect_kind(LexemeKind::OpenParen, "'('")?;
                    let values = p.parse_comma_sep(Self::parse_expr)?;
                    p.expect_kind(LexemeKind::CloseParen, "')'")?;
                    Some(Distinct::On(values))
                } else {
                    Some(Distinct::Distinct)
                }
            } else {
                let _ = p.eat_keyword("all");
                None
            };

            let items = p.parse_comma_sep(Self::parse_select_item)?;

            Ok(SelectClause {
                distinct,
                items,
                comments: kw.comments,
            })
        })
    }

    fn parse_select_item(&mut self) -> Result<SelectItem, ParseError> {
        let comments = self.comments_here();
        let value = self.parse_select_item_value()?;
        let alias = self.parse_alias()?;
        Ok(SelectItem {
            value,
            alias,
            comments,
        })
    }

    /// A select item value: a bare `*`, a qualified wildcard, or any
    /// expression. Wildcards are only legal here.
    fn parse_select_item_value(&mut self) -> Result<Expr, ParseError> {
        if self.at_operator("*") {
            let lexeme = self.advance();
            return Ok(Expr::Column(
                requel_ast::ColumnRef {
                    qualifiers: Vec::new(),
                    target: requel_ast::ColumnTarget::Wildcard,
                },
                lexeme.span,
            ));
        }
        self.parse_expr()
    }

    /// `[AS] alias` — a bare alias must be a plain identifier lexeme so
    /// that soft keywords keep their grammatical role; after an explicit
    /// `AS`, soft keywords are accepted too.
    pub(crate) fn parse_alias(&mut self) -> Result<Option<String>, ParseError> {
        if self.eat_keyword("as") {
            return Ok(Some(self.parse_identifier()?));
        }
        if self.at_kind(LexemeKind::Identifier) {
            return Ok(Some(self.advance().value));
        }
        Ok(None)
    }

    // -----------------------------------------------------------------------
    // FROM clause, sources, joins
    // -----------------------------------------------------------------------

    fn parse_from_clause(&mut self) -> Result<FromClause, ParseError> {
        self.with_context("from clause", |p| {
            let kw = p.expect_keyword("from")?;
            let source = p.parse_source()?;
            let mut joins = Vec::new();
            loop {
                if p.eat_kind(LexemeKind::Comma) {
                    // `FROM a, b` is a cross join.
                    let lateral = p.eat_keyword("lateral");
                    let source = p.parse_source()?;
                    joins.push(Join {
                        kind: JoinKind::Cross,
                        natural: false,
                        lateral,
                        source,
                        constraint: None,
                    });
                    continue;
                }
                let Some((kind, natural)) = p.parse_join_prefix()? else {
                    break;
                };
                let lateral = p.eat_keyword("lateral");
                let source = p.parse_source()?;
                let constraint = p.parse_join_constraint()?;
                joins.push(Join {
                    kind,
                    natural,
                    lateral,
                    source,
                    constraint,
                });
            }
            Ok(FromClause {
                source,
                joins,
                comments: kw.comments,
            })
        })
    }

    /// Assemble a join kind from its keyword sequence, or `None` when the
    /// cursor is not at a join.
    fn parse_join_prefix(&mut self) -> Result<Option<(JoinKind, bool)>, ParseError> {
        let natural = self.eat_keyword("natural");
        let kind = if self.eat_keyword("join") {
            JoinKind::Inner
        } else if self.eat_keyword("inner") {
            self.expect_keyword("join")?;
            JoinKind::Inner
        } else if self.eat_keyword("left") {
            let _ = self.eat_keyword("outer");
            self.expect_keyword("join")?;
            JoinKind::Left
        } else if self.eat_keyword("right") {
            let _ = self.eat_keyword("outer");
            self.expect_keyword("join")?;
            JoinKind::Right
        } else if self.eat_keyword("full") {
            let _ = self.eat_keyword("outer");
            self.expect_keyword("join")?;
            JoinKind::Full
        } else if self.eat_keyword("cross") {
            self.expect_keyword("join")?;
            JoinKind::Cross
        } else {
            if natural {
                return Err(self.err_expected(&["join"]));
            }
            return Ok(None);
        };
        Ok(Some((kind, natural)))
    }

    fn parse_join_constraint(&mut self) -> Result<Option<JoinConstraint>, ParseError> {
        if self.eat_keyword("on") {
            let condition = self.with_context("join condition", Self::parse_expr)?;
            return Ok(Some(JoinConstraint::On(condition)));
        }
        if self.eat_keyword("using") {
            self.expect_kind(LexemeKind::OpenParen, "'('")?;
            let columns = self.parse_comma_sep(Self::parse_identifier)?;
            self.expect_kind(LexemeKind::CloseParen, "')'")?;
            return Ok(Some(JoinConstraint::Using(columns)));
        }
        Ok(None)
    }

    /// A table source: subquery, function call, or (qualified) table name.
    pub fn parse_source(&mut self) -> Result<Source, ParseError> {
        self.with_context("table source", |p| {
            if p.at_kind(LexemeKind::OpenParen) {
                if !p.paren_opens_query() {
                    return Err(p.err_expected(&["select", "values"]));
                }
                p.advance(); // (
                let query = p.parse_query_inner()?;
                p.expect_kind(LexemeKind::CloseParen, "')'")?;
                let alias = p.parse_alias()?;
                let column_aliases = p.parse_column_aliases()?;
                return Ok(Source::Subquery {
                    query: Box::new(query),
                    alias,
                    column_aliases,
                });
            }

            if !p.at_identifier() {
                return Err(p.err_expected(&["table name", "subquery"]));
            }

            // Identifier chain: qualifiers ending in a name, or a function
            // source when the final segment is a call.
            let mut qualifiers: Vec<String> = Vec::new();
            let mut name = p.advance();
            while p.at_kind(LexemeKind::Dot) {
                p.advance();
                if !p.at_identifier() {
                    return Err(p.err_expected(&["identifier"]));
                }
                qualifiers.push(std::mem::replace(&mut name, p.advance()).value);
            }

            if name.kind == LexemeKind::Function && p.at_kind(LexemeKind::OpenParen) {
                let name = requel_ast::QualifiedName {
                    qualifiers,
                    name: name.value,
                };
                p.advance(); // (
                let args = if p.at_kind(LexemeKind::CloseParen) {
                    Vec::new()
                } else {
                    p.parse_comma_sep(Self::parse_expr)?
                };
                p.expect_kind(LexemeKind::CloseParen, "')'")?;
                let alias = p.parse_alias()?;
                return Ok(Source::Function { name, args, alias });
            }

            let alias = p.parse_alias()?;
            let column_aliases = p.parse_column_aliases()?;
            Ok(Source::Table {
                qualifiers,
                name: name.value,
                alias,
                column_aliases,
            })
        })
    }

    /// `(col, col, ...)` after a source alias.
    fn parse_column_aliases(&mut self) -> Result<Option<Vec<String>>, ParseError> {
        if !self.at_kind(LexemeKind::OpenParen) {
            return Ok(None);
        }
        self.advance();
        let columns = self.parse_comma_sep(Self::parse_identifier)?;
        self.expect_kind(LexemeKind::CloseParen, "')'")?;
        Ok(Some(columns))
    }

    // -----------------------------------------------------------------------
    // WITH clause
    // -----------------------------------------------------------------------

    /// `WITH [RECURSIVE] name [(cols)] AS [[NOT] MATERIALIZED] (query), ...`
    pub fn parse_with_clause(&mut self) -> Result<WithClause, ParseError> {
        self.with_context("with clause", |p| {
            let kw = p.expect_keyword("with")?;
            let recursive = p.eat_keyword("recursive");
            let tables = p.parse_comma_sep(Self::parse_common_table)?;
            Ok(WithClause {
                recursive,
                tables,
                comments: kw.comments,
            })
        })
    }

    fn parse_common_table(&mut self) -> Result<CommonTable, ParseError> {
        self.with_context("common table", |p| {
            let comments = p.comments_here();
            let name = p.parse_identifier()?;
            let column_aliases = p.parse_column_aliases()?;
            p.expect_keyword("as")?;
            let materialized = if p.eat_keyword("not") {
                p.expect_keyword("materialized")?;
                Some(Materialized::NotMaterialized)
            } else if p.eat_keyword("materialized") {
                Some(Materialized::Materialized)
            } else {
                None
            };
            p.expect_kind(LexemeKind::OpenParen, "'('")?;
            let query = p.parse_query_inner()?;
            p.expect_kind(LexemeKind::CloseParen, "')'")?;
            Ok(CommonTable {
                name,
                column_aliases,
                materialized,
                query,
                comments,
            })
        })
    }

    // -----------------------------------------------------------------------
    // VALUES
    // -----------------------------------------------------------------------

    /// `VALUES (row), (row), ...` — rows may be empty and need not be
    /// rectangular; shape validation is not a parser concern.
    pub fn parse_values_query(&mut self) -> Result<ValuesQuery, ParseError> {
        self.with_context("values", |p| {
            let kw = p.expect_keyword("values")?;
            let rows = p.parse_comma_sep(|p| {
                p.expect_kind(LexemeKind::OpenParen, "'('")?;
                let row = if p.at_kind(LexemeKind::CloseParen) {
                    Vec::new()
                } else {
                    p.parse_comma_sep(Self::parse_expr)?
                };
                p.expect_kind(LexemeKind::CloseParen, "')'")?;
                Ok(row)
            })?;
            Ok(ValuesQuery {
                rows,
                comments: kw.comments,
            })
        })
    }

    // -----------------------------------------------------------------------
    // ORDER BY, WINDOW, FOR
    // -----------------------------------------------------------------------

    pub(crate) fn parse_order_item(&mut self) -> Result<OrderItem, ParseError> {
        let value = self.parse_expr()?;
        let direction = if self.eat_keyword("asc") {
            Some(requel_ast::SortDirection::Asc)
        } else if self.eat_keyword("desc") {
            Some(requel_ast::SortDirection::Desc)
        } else {
            None
        };
        let nulls = if self.eat_keyword("nulls first") {
            Some(requel_ast::NullsOrder::First)
        } else if self.eat_keyword("nulls last") {
            Some(requel_ast::NullsOrder::Last)
        } else {
            None
        };
        Ok(OrderItem {
            value,
            direction,
            nulls,
        })
    }

    fn parse_named_window(&mut self) -> Result<NamedWindow, ParseError> {
        let name = self.parse_identifier()?;
        self.expect_keyword("as")?;
        self.expect_kind(LexemeKind::OpenParen, "'('")?;
        let spec = self.parse_window_spec()?;
        self.expect_kind(LexemeKind::CloseParen, "')'")?;
        Ok(NamedWindow { name, spec })
    }

    fn parse_for_clause(&mut self) -> Result<ForClause, ParseError> {
        self.with_context("for clause", |p| {
            let kw = p.expect_keyword("for")?;
            let mode = if p.eat_keyword("update") {
                LockMode::Update
            } else if p.eat_keyword("no") {
                p.expect_keyword("key")?;
                p.expect_keyword("update")?;
                LockMode::NoKeyUpdate
            } else if p.eat_keyword("key") {
                p.expect_keyword("share")?;
                LockMode::KeyShare
            } else if p.eat_keyword("share") {
                LockMode::Share
            } else {
                return Err(p.err_expected(&["update", "no key update", "share", "key share"]));
            };
            let tables = if p.eat_keyword("of") {
                p.parse_comma_sep(Self::parse_identifier)?
            } else {
                Vec::new()
            };
            let wait = if p.eat_keyword("nowait") {
                Some(LockWait::Nowait)
            } else if p.eat_keyword("skip") {
                p.expect_keyword("locked")?;
                Some(LockWait::SkipLocked)
            } else {
                None
            };
            Ok(ForClause {
                mode,
                tables,
                wait,
                comments: kw.comments,
            })
        })
    }
}
