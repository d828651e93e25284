//! Pratt expression parser.
//!
//! Precedence ladder, lowest to highest:
//!   OR
//!   AND
//!   NOT (prefix)
//!   = <> < <= > >= IS [NOT] ... [NOT] IN [NOT] BETWEEN [NOT] LIKE/SIMILAR
//!   | # & (bitwise)
//!   + - || (additive, concat)
//!   * / % (multiplicative)
//!   - + (unary prefix)
//!   ^
//!   :: and AT TIME ZONE (postfix)
//!   . (member access, handled in the atom chain)

use requel_ast::{
    BinaryOp, CastStyle, ColumnRef, ColumnTarget, Expr, FrameBound, FrameExclude, FrameSpec,
    FrameUnit, InSet, IsTarget, Literal, LiteralKind, OverWindow, ParamRef, QualifiedName, Span,
    TimeZoneSpec, TrimSide, TypeRef, UnaryOp, WindowSpec,
};
use requel_error::ParseError;

use crate::parser::Parser;
use crate::token::LexemeKind;

// Binding powers: higher = tighter binding. Left BP is checked against
// min_bp; right BP is passed to the recursive call.
mod bp {
    pub const OR: (u8, u8) = (1, 2);
    pub const AND: (u8, u8) = (3, 4);
    // Prefix NOT right BP:
    pub const NOT_PREFIX: u8 = 5;
    // Comparison / pattern / membership family:
    pub const COMPARISON: (u8, u8) = (7, 8);
    // Bitwise | # &:
    pub const BITWISE: (u8, u8) = (9, 10);
    // Additive + - ||:
    pub const ADD: (u8, u8) = (11, 12);
    // Multiplicative * / %:
    pub const MUL: (u8, u8) = (13, 14);
    // Unary prefix sign right BP:
    pub const UNARY_SIGN: u8 = 15;
    // Exponentiation:
    pub const POW: (u8, u8) = (17, 18);
    // Postfix :: and AT TIME ZONE left BP:
    pub const POSTFIX: u8 = 19;
}

/// Words accepted as an INTERVAL qualifier tail (`day`, `year to month`).
const INTERVAL_UNITS: &[&str] = &[
    "day", "days", "hour", "hours", "microsecond", "microseconds", "millisecond", "milliseconds",
    "minute", "minutes", "month", "months", "second", "seconds", "to", "week", "weeks", "year",
    "years",
];

impl Parser {
    /// Parse a single expression.
    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.with_recursion_guard(|p| p.with_context("expression", |p| p.parse_expr_bp(0)))
    }

    // ── Pratt core ──────────────────────────────────────────────────────

    pub(crate) fn parse_expr_bp(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_prefix()?;

        loop {
            // Postfix: `::type` and `AT TIME ZONE`.
            if self.at_operator("::") {
                if bp::POSTFIX < min_bp {
                    break;
                }
                self.advance();
                let type_ref = self.parse_type_ref()?;
                let span = lhs.span().merge(self.last_span());
                lhs = Expr::Cast {
                    value: Box::new(lhs),
                    type_ref,
                    style: CastStyle::DoubleColon,
                    span,
                };
                continue;
            }
            if self.at_keyword("at time zone") {
                if bp::POSTFIX < min_bp {
                    break;
                }
                self.advance();
                let zone = self.parse_expr_bp(bp::POSTFIX + 1)?;
                let span = lhs.span().merge(zone.span());
                lhs = Expr::AtTimeZone {
                    value: Box::new(lhs),
                    zone: Box::new(zone),
                    span,
                };
                continue;
            }

            let Some((l_bp, r_bp)) = self.peek_infix_bp() else {
                break;
            };
            if l_bp < min_bp {
                break;
            }
            lhs = self.parse_infix(lhs, r_bp)?;
        }

        Ok(lhs)
    }

    fn last_span(&self) -> Span {
        self.lexemes
            .get(self.pos.wrapping_sub(1))
            .map_or(Span::ZERO, |l| l.span)
    }

    /// Whether the current lexeme opens a query (after a consumed `(`).
    fn at_query_opener(&self) -> bool {
        self.peek().is_some_and(|l| {
            l.kind == LexemeKind::Keyword
                && matches!(l.value.as_str(), "select" | "with" | "values")
        })
    }

    // ── Infix dispatch ──────────────────────────────────────────────────

    fn peek_infix_bp(&self) -> Option<(u8, u8)> {
        let lexeme = self.peek()?;
        match lexeme.kind {
            LexemeKind::Operator => match lexeme.value.as_str() {
                "=" | "==" | "<>" | "!=" | "<" | "<=" | ">" | ">=" => Some(bp::COMPARISON),
                "|" | "#" | "&" => Some(bp::BITWISE),
                "+" | "-" | "||" => Some(bp::ADD),
                "*" | "/" | "%" => Some(bp::MUL),
                "^" => Some(bp::POW),
                _ => None,
            },
            LexemeKind::Keyword => match lexeme.value.as_str() {
                "or" => Some(bp::OR),
                "and" => Some(bp::AND),
                "is" | "is distinct from" | "is not distinct from" | "in" | "between" | "like"
                | "ilike" | "similar to" => Some(bp::COMPARISON),
                // `NOT` is infix only when it opens a negated comparison tail.
                "not" => match self.peek_nth(1) {
                    Some(next) if next.kind == LexemeKind::Keyword => match next.value.as_str() {
                        "in" | "between" | "like" | "ilike" | "similar to" => Some(bp::COMPARISON),
                        _ => None,
                    },
                    _ => None,
                },
                _ => None,
            },
            _ => None,
        }
    }

    fn parse_infix(&mut self, lhs: Expr, r_bp: u8) -> Result<Expr, ParseError> {
        let lexeme = self.advance();
        if lexeme.kind == LexemeKind::Operator {
            let op = match lexeme.value.as_str() {
                "=" | "==" => BinaryOp::Eq,
                "<>" | "!=" => BinaryOp::NotEq,
                "<" => BinaryOp::Lt,
                "<=" => BinaryOp::LtEq,
                ">" => BinaryOp::Gt,
                ">=" => BinaryOp::GtEq,
                "|" => BinaryOp::BitOr,
                "#" => BinaryOp::BitXor,
                "&" => BinaryOp::BitAnd,
                "+" => BinaryOp::Add,
                "-" => BinaryOp::Sub,
                "||" => BinaryOp::Concat,
                "*" => BinaryOp::Mul,
                "/" => BinaryOp::Div,
                "%" => BinaryOp::Mod,
                _ => BinaryOp::Pow,
            };
            let rhs = self.parse_expr_bp(r_bp)?;
            let span = lhs.span().merge(rhs.span());
            return Ok(Expr::Binary {
                op,
                left: Box::new(lhs),
                right: Box::new(rhs),
                span,
            });
        }

        match lexeme.value.as_str() {
            "or" | "and" => {
                let op = if lexeme.value == "or" {
                    BinaryOp::Or
                } else {
                    BinaryOp::And
                };
                let rhs = self.parse_expr_bp(r_bp)?;
                let span = lhs.span().merge(rhs.span());
                Ok(Expr::Binary {
                    op,
                    left: Box::new(lhs),
                    right: Box::new(rhs),
                    span,
                })
            }
            "is" => self.parse_is_tail(lhs),
            "is distinct from" | "is not distinct from" => {
                let rhs = self.parse_expr_bp(r_bp)?;
                let span = lhs.span().merge(rhs.span());
                let target = if lexeme.value == "is distinct from" {
                    IsTarget::DistinctFrom(Box::new(rhs))
                } else {
                    IsTarget::NotDistinctFrom(Box::new(rhs))
                };
                Ok(Expr::Is {
                    value: Box::new(lhs),
                    target,
                    negated: false,
                    span,
                })
            }
            "not" => {
                let next = self.advance();
                match next.value.as_str() {
                    "in" => self.parse_in_tail(lhs, true),
                    "between" => self.parse_between_tail(lhs, true),
                    "like" => self.parse_like_tail(lhs, false, false, true),
                    "ilike" => self.parse_like_tail(lhs, false, true, true),
                    "similar to" => self.parse_like_tail(lhs, true, false, true),
                    _ => Err(self.err_expected(&["in", "between", "like", "similar to"])),
                }
            }
            "in" => self.parse_in_tail(lhs, false),
            "between" => self.parse_between_tail(lhs, false),
            "like" => self.parse_like_tail(lhs, false, false, false),
            "ilike" => self.parse_like_tail(lhs, false, true, false),
            _ => self.parse_like_tail(lhs, true, false, false),
        }
    }

    /// `IS [NOT] NULL | TRUE | FALSE` — the DISTINCT FROM forms arrive as
    /// fused keywords and never reach this tail.
    fn parse_is_tail(&mut self, lhs: Expr) -> Result<Expr, ParseError> {
        let negated = self.eat_keyword("not");
        let target = if self.at_kind(LexemeKind::Literal(LiteralKind::Null)) {
            self.advance();
            IsTarget::Null
        } else if self.at_kind(LexemeKind::Literal(LiteralKind::Boolean)) {
            let lexeme = self.advance();
            if lexeme.value == "true" {
                IsTarget::True
            } else {
                IsTarget::False
            }
        } else {
            return Err(self.err_expected(&["null", "true", "false"]));
        };
        let span = lhs.span().merge(self.last_span());
        Ok(Expr::Is {
            value: Box::new(lhs),
            target,
            negated,
            span,
        })
    }

    fn parse_in_tail(&mut self, lhs: Expr, negated: bool) -> Result<Expr, ParseError> {
        self.expect_kind(LexemeKind::OpenParen, "'('")?;
        let set = if self.at_query_opener() {
            let query = self.parse_query_inner()?;
            InSet::Subquery(Box::new(query))
        } else if self.at_kind(LexemeKind::CloseParen) {
            InSet::List(Vec::new())
        } else {
            InSet::List(self.parse_comma_sep(Self::parse_expr)?)
        };
        self.expect_kind(LexemeKind::CloseParen, "')'")?;
        let span = lhs.span().merge(self.last_span());
        Ok(Expr::In {
            value: Box::new(lhs),
            set,
            negated,
            span,
        })
    }

    fn parse_between_tail(&mut self, lhs: Expr, negated: bool) -> Result<Expr, ParseError> {
        // The bounds bind tighter than AND so the separator stays visible.
        let low = self.parse_expr_bp(bp::COMPARISON.1)?;
        self.expect_keyword("and")?;
        let high = self.parse_expr_bp(bp::COMPARISON.1)?;
        let span = lhs.span().merge(high.span());
        Ok(Expr::Between {
            value: Box::new(lhs),
            low: Box::new(low),
            high: Box::new(high),
            negated,
            span,
        })
    }

    fn parse_like_tail(
        &mut self,
        lhs: Expr,
        similar: bool,
        case_insensitive: bool,
        negated: bool,
    ) -> Result<Expr, ParseError> {
        let pattern = self.parse_expr_bp(bp::COMPARISON.1)?;
        let escape = if self.eat_keyword("escape") {
            Some(Box::new(self.parse_expr_bp(bp::COMPARISON.1)?))
        } else {
            None
        };
        let span = lhs.span().merge(self.last_span());
        Ok(Expr::Like {
            value: Box::new(lhs),
            pattern: Box::new(pattern),
            escape,
            similar,
            case_insensitive,
            negated,
            span,
        })
    }

    // ── Prefix (nud) ────────────────────────────────────────────────────

    fn parse_prefix(&mut self) -> Result<Expr, ParseError> {
        let Some(lexeme) = self.peek() else {
            return Err(self.err_expected(&["expression"]));
        };
        let kind = lexeme.kind;
        match kind {
            LexemeKind::Literal(literal_kind) => {
                let lexeme = self.advance();
                Ok(Expr::Literal(
                    Literal {
                        kind: literal_kind,
                        raw: lexeme.value,
                    },
                    lexeme.span,
                ))
            }

            LexemeKind::Parameter => {
                let lexeme = self.advance();
                let param = self.param_ref(&lexeme.value);
                Ok(Expr::Parameter(param, lexeme.span))
            }

            LexemeKind::Operator => {
                let value = self.peek().map(|l| l.value.clone()).unwrap_or_default();
                match value.as_str() {
                    "-" | "+" => {
                        let lexeme = self.advance();
                        let op = if value == "-" {
                            UnaryOp::Minus
                        } else {
                            UnaryOp::Plus
                        };
                        let operand = self.parse_expr_bp(bp::UNARY_SIGN)?;
                        let span = lexeme.span.merge(operand.span());
                        Ok(Expr::Unary {
                            op,
                            operand: Box::new(operand),
                            span,
                        })
                    }
                    _ => Err(self.err_expected(&["expression"])),
                }
            }

            LexemeKind::OpenParen => {
                let open = self.advance();
                if self.at_query_opener() {
                    let query = self.parse_query_inner()?;
                    self.expect_kind(LexemeKind::CloseParen, "')'")?;
                    let span = open.span.merge(self.last_span());
                    return Ok(Expr::Subquery(Box::new(query), span));
                }
                let inner = self.parse_expr()?;
                self.expect_kind(LexemeKind::CloseParen, "')'")?;
                let span = open.span.merge(self.last_span());
                Ok(Expr::Paren {
                    inner: Box::new(inner),
                    span,
                })
            }

            LexemeKind::Identifier | LexemeKind::Function => self.parse_chain(),

            LexemeKind::Keyword => {
                let value = self.peek().map(|l| l.value.clone()).unwrap_or_default();
                match value.as_str() {
                    "not" => {
                        let lexeme = self.advance();
                        if self.eat_keyword("exists") {
                            return self.parse_exists_tail(lexeme.span, true);
                        }
                        let operand = self.parse_expr_bp(bp::NOT_PREFIX)?;
                        let span = lexeme.span.merge(operand.span());
                        Ok(Expr::Unary {
                            op: UnaryOp::Not,
                            operand: Box::new(operand),
                            span,
                        })
                    }
                    "exists" => {
                        let lexeme = self.advance();
                        self.parse_exists_tail(lexeme.span, false)
                    }
                    "case" => self.parse_case(),
                    "cast" => self.parse_cast(),
                    "extract" => self.parse_extract(),
                    "position" => self.parse_position(),
                    "substring" => self.parse_substring(),
                    "trim" => self.parse_trim(),
                    "overlay" => self.parse_overlay(),
                    "array" => self.parse_array(),
                    "interval" => self.parse_interval(),
                    _ if self.at_identifier() => self.parse_chain(),
                    _ => Err(self.err_expected(&["expression"])),
                }
            }

            _ => Err(self.err_expected(&["expression"])),
        }
    }

    fn parse_exists_tail(&mut self, start: Span, negated: bool) -> Result<Expr, ParseError> {
        self.expect_kind(LexemeKind::OpenParen, "'('")?;
        let query = self.parse_query_inner()?;
        self.expect_kind(LexemeKind::CloseParen, "')'")?;
        let span = start.merge(self.last_span());
        Ok(Expr::Exists {
            query: Box::new(query),
            negated,
            span,
        })
    }

    // ── Column chains and function calls ────────────────────────────────

    /// An identifier chain: `a`, `a.b.c`, `a.*`, or a function call when
    /// the final segment was lexed as a function name.
    fn parse_chain(&mut self) -> Result<Expr, ParseError> {
        let first = self.advance();
        let start = first.span;
        let mut qualifiers: Vec<String> = Vec::new();
        let mut name = first;

        while self.at_kind(LexemeKind::Dot) {
            if self
                .peek_nth(1)
                .is_some_and(|l| l.kind == LexemeKind::Operator && l.value == "*")
            {
                self.advance(); // dot
                self.advance(); // star
                qualifiers.push(name.value);
                let span = start.merge(self.last_span());
                return Ok(Expr::Column(
                    ColumnRef {
                        qualifiers,
                        target: ColumnTarget::Wildcard,
                    },
                    span,
                ));
            }
            self.advance(); // dot
            if !self.at_identifier() {
                return Err(self.err_expected(&["identifier", "'*'"]));
            }
            qualifiers.push(std::mem::replace(&mut name, self.advance()).value);
        }

        if name.kind == LexemeKind::Function && self.at_kind(LexemeKind::OpenParen) {
            return self.parse_function_call(qualifiers, name.value, start);
        }

        let span = start.merge(self.last_span());
        Ok(Expr::Column(
            ColumnRef {
                qualifiers,
                target: ColumnTarget::Name(name.value),
            },
            span,
        ))
    }

    /// The argument list and tail features of a function call. After the
    /// closing parenthesis a small state machine attaches FILTER, WITHIN
    /// GROUP, and OVER; OVER and WITHIN GROUP are mutually exclusive.
    fn parse_function_call(
        &mut self,
        qualifiers: Vec<String>,
        name: String,
        start: Span,
    ) -> Result<Expr, ParseError> {
        self.with_context("function call", |p| {
            let name = QualifiedName { qualifiers, name };
            p.expect_kind(LexemeKind::OpenParen, "'('")?;

            let distinct = p.eat_keyword("distinct");
            let mut args = Vec::new();
            if p.at_operator("*") {
                let star = p.advance();
                args.push(Expr::Column(
                    ColumnRef {
                        qualifiers: Vec::new(),
                        target: ColumnTarget::Wildcard,
                    },
                    star.span,
                ));
            } else if !p.at_kind(LexemeKind::CloseParen) {
                args = p.parse_comma_sep(Self::parse_expr)?;
            }

            let order_by = if p.eat_keyword("order by") {
                Some(p.parse_comma_sep(Self::parse_order_item)?)
            } else {
                None
            };

            p.expect_kind(LexemeKind::CloseParen, "')'")?;

            let mut filter = None;
            let mut over = None;
            let mut within_group = None;
            loop {
                if filter.is_none() && p.at_keyword("filter") {
                    p.advance();
                    p.expect_kind(LexemeKind::OpenParen, "'('")?;
                    p.expect_keyword("where")?;
                    filter = Some(Box::new(p.parse_expr()?));
                    p.expect_kind(LexemeKind::CloseParen, "')'")?;
                    continue;
                }
                if p.at_keyword("within group") {
                    if over.is_some() || within_group.is_some() {
                        return Err(
                            p.err_expected(&["at most one of 'over' and 'within group'"])
                        );
                    }
                    p.advance();
                    p.expect_kind(LexemeKind::OpenParen, "'('")?;
                    p.expect_keyword("order by")?;
                    within_group = Some(p.parse_comma_sep(Self::parse_order_item)?);
                    p.expect_kind(LexemeKind::CloseParen, "')'")?;
                    continue;
                }
                if p.at_keyword("over") {
                    if over.is_some() || within_group.is_some() {
                        return Err(
                            p.err_expected(&["at most one of 'over' and 'within group'"])
                        );
                    }
                    p.advance();
                    over = Some(if p.at_kind(LexemeKind::OpenParen) {
                        p.advance();
                        let spec = p.parse_window_spec()?;
                        p.expect_kind(LexemeKind::CloseParen, "')'")?;
                        OverWindow::Spec(spec)
                    } else {
                        OverWindow::Named(p.parse_identifier()?)
                    });
                    continue;
                }
                break;
            }

            let span = start.merge(p.last_span());
            Ok(Expr::FunctionCall {
                name,
                args,
                distinct,
                order_by,
                filter,
                over,
                within_group,
                span,
            })
        })
    }

    // ── Special atoms ───────────────────────────────────────────────────

    fn parse_case(&mut self) -> Result<Expr, ParseError> {
        self.with_context("case expression", |p| {
            let start = p.advance().span; // case
            let subject = if p.at_keyword("when") {
                None
            } else {
                Some(Box::new(p.parse_expr()?))
            };
            let mut branches = Vec::new();
            p.expect_keyword("when")?;
            loop {
                let condition = p.parse_expr()?;
                p.expect_keyword("then")?;
                let value = p.parse_expr()?;
                branches.push((condition, value));
                if !p.eat_keyword("when") {
                    break;
                }
            }
            let else_value = if p.eat_keyword("else") {
                Some(Box::new(p.parse_expr()?))
            } else {
                None
            };
            let end = p.expect_keyword("end")?;
            Ok(Expr::Case {
                subject,
                branches,
                else_value,
                span: start.merge(end.span),
            })
        })
    }

    fn parse_cast(&mut self) -> Result<Expr, ParseError> {
        self.with_context("cast", |p| {
            let start = p.advance().span; // cast
            p.expect_kind(LexemeKind::OpenParen, "'('")?;
            let value = p.parse_expr()?;
            p.expect_keyword("as")?;
            let type_ref = p.parse_type_ref()?;
            p.expect_kind(LexemeKind::CloseParen, "')'")?;
            Ok(Expr::Cast {
                value: Box::new(value),
                type_ref,
                style: CastStyle::CastAs,
                span: start.merge(p.last_span()),
            })
        })
    }

    fn parse_extract(&mut self) -> Result<Expr, ParseError> {
        self.with_context("extract", |p| {
            let start = p.advance().span; // extract
            p.expect_kind(LexemeKind::OpenParen, "'('")?;
            let field = p.parse_identifier()?.to_ascii_lowercase();
            p.expect_keyword("from")?;
            let from = p.parse_expr()?;
            p.expect_kind(LexemeKind::CloseParen, "')'")?;
            Ok(Expr::Extract {
                field,
                from: Box::new(from),
                span: start.merge(p.last_span()),
            })
        })
    }

    fn parse_position(&mut self) -> Result<Expr, ParseError> {
        self.with_context("position", |p| {
            let start = p.advance().span; // position
            p.expect_kind(LexemeKind::OpenParen, "'('")?;
            // The needle binds tighter than IN so the separator stays visible.
            let needle = p.parse_expr_bp(bp::COMPARISON.1)?;
            p.expect_keyword("in")?;
            let haystack = p.parse_expr()?;
            p.expect_kind(LexemeKind::CloseParen, "')'")?;
            Ok(Expr::Position {
                needle: Box::new(needle),
                haystack: Box::new(haystack),
                span: start.merge(p.last_span()),
            })
        })
    }

    fn parse_substring(&mut self) -> Result<Expr, ParseError> {
        self.with_context("substring", |p| {
            let start_span = p.advance().span; // substring
            p.expect_kind(LexemeKind::OpenParen, "'('")?;
            let target = p.parse_expr()?;

            let mut start = None;
            let mut length = None;
            let mut pattern = None;
            let mut escape = None;
            let mut keyword_form = false;

            if p.eat_kind(LexemeKind::Comma) {
                start = Some(Box::new(p.parse_expr()?));
                if p.eat_kind(LexemeKind::Comma) {
                    length = Some(Box::new(p.parse_expr()?));
                }
            } else if p.eat_keyword("from") {
                keyword_form = true;
                start = Some(Box::new(p.parse_expr()?));
                if p.eat_keyword("for") {
                    length = Some(Box::new(p.parse_expr()?));
                }
            } else if p.eat_keyword("for") {
                keyword_form = true;
                length = Some(Box::new(p.parse_expr()?));
            } else if p.eat_keyword("similar") {
                keyword_form = true;
                pattern = Some(Box::new(p.parse_expr()?));
                p.expect_keyword("escape")?;
                escape = Some(Box::new(p.parse_expr()?));
            }

            p.expect_kind(LexemeKind::CloseParen, "')'")?;
            Ok(Expr::Substring {
                target: Box::new(target),
                start,
                length,
                pattern,
                escape,
                keyword_form,
                span: start_span.merge(p.last_span()),
            })
        })
    }

    fn parse_trim(&mut self) -> Result<Expr, ParseError> {
        self.with_context("trim", |p| {
            let start = p.advance().span; // trim
            p.expect_kind(LexemeKind::OpenParen, "'('")?;

            let side = if p.eat_keyword("leading") {
                TrimSide::Leading
            } else if p.eat_keyword("trailing") {
                TrimSide::Trailing
            } else {
                let _ = p.eat_keyword("both");
                TrimSide::Both
            };

            let (characters, target, postgres_style) = if p.eat_keyword("from") {
                // Reversed form: TRIM(side FROM target [, characters]).
                let target = p.parse_expr()?;
                let characters = if p.eat_kind(LexemeKind::Comma) {
                    Some(Box::new(p.parse_expr()?))
                } else {
                    None
                };
                (characters, target, true)
            } else {
                let first = p.parse_expr()?;
                if p.eat_keyword("from") {
                    let target = p.parse_expr()?;
                    (Some(Box::new(first)), target, false)
                } else if p.eat_kind(LexemeKind::Comma) {
                    let characters = p.parse_expr()?;
                    (Some(Box::new(characters)), first, true)
                } else {
                    (None, first, false)
                }
            };

            p.expect_kind(LexemeKind::CloseParen, "')'")?;
            Ok(Expr::Trim {
                side,
                characters,
                target: Box::new(target),
                postgres_style,
                span: start.merge(p.last_span()),
            })
        })
    }

    fn parse_overlay(&mut self) -> Result<Expr, ParseError> {
        self.with_context("overlay", |p| {
            let start = p.advance().span; // overlay
            p.expect_kind(LexemeKind::OpenParen, "'('")?;
            let target = p.parse_expr()?;
            p.expect_keyword("placing")?;
            let placing = p.parse_expr()?;
            p.expect_keyword("from")?;
            let from = p.parse_expr()?;
            let for_length = if p.eat_keyword("for") {
                Some(Box::new(p.parse_expr()?))
            } else {
                None
            };
            p.expect_kind(LexemeKind::CloseParen, "')'")?;
            Ok(Expr::Overlay {
                target: Box::new(target),
                placing: Box::new(placing),
                from: Box::new(from),
                for_length,
                span: start.merge(p.last_span()),
            })
        })
    }

    fn parse_array(&mut self) -> Result<Expr, ParseError> {
        self.with_context("array", |p| {
            let start = p.advance().span; // array
            p.expect_kind(LexemeKind::OpenBracket, "'['")?;
            let elements = if p.at_kind(LexemeKind::CloseBracket) {
                Vec::new()
            } else {
                p.parse_comma_sep(Self::parse_expr)?
            };
            p.expect_kind(LexemeKind::CloseBracket, "']'")?;
            Ok(Expr::Array {
                elements,
                span: start.merge(p.last_span()),
            })
        })
    }

    fn parse_interval(&mut self) -> Result<Expr, ParseError> {
        self.with_context("interval", |p| {
            let start = p.advance().span; // interval
            let lexeme = p.expect_kind(
                LexemeKind::Literal(LiteralKind::String),
                "string literal",
            )?;
            let literal = Literal::string(lexeme.value);
            let mut words: Vec<String> = Vec::new();
            while let Some(next) = p.peek() {
                if next.kind == LexemeKind::Identifier
                    && INTERVAL_UNITS
                        .binary_search(&next.value.to_ascii_lowercase().as_str())
                        .is_ok()
                {
                    words.push(p.advance().value.to_ascii_lowercase());
                } else {
                    break;
                }
            }
            let qualifier = if words.is_empty() {
                None
            } else {
                Some(words.join(" "))
            };
            Ok(Expr::Interval {
                literal,
                qualifier,
                span: start.merge(p.last_span()),
            })
        })
    }

    // ── Types ───────────────────────────────────────────────────────────

    /// A type reference: a (possibly fused multi-word) type name with
    /// optional precision/scale and time-zone suffix. Fused temporal names
    /// are normalized so `timestamp with time zone` and
    /// `timestamp(3) with time zone` meet in the same shape.
    pub(crate) fn parse_type_ref(&mut self) -> Result<TypeRef, ParseError> {
        self.with_context("type", |p| {
            if !p.at_identifier() {
                return Err(p.err_expected(&["type name"]));
            }
            let raw = p.advance().value.to_ascii_lowercase();
            let (name, mut timezone) = match raw.as_str() {
                "timestamp with time zone" => ("timestamp".to_owned(), Some(TimeZoneSpec::With)),
                "timestamp without time zone" => {
                    ("timestamp".to_owned(), Some(TimeZoneSpec::Without))
                }
                "time with time zone" => ("time".to_owned(), Some(TimeZoneSpec::With)),
                "time without time zone" => ("time".to_owned(), Some(TimeZoneSpec::Without)),
                _ => (raw, None),
            };

            let mut precision = None;
            let mut scale = None;
            if p.at_kind(LexemeKind::OpenParen) {
                p.advance();
                precision = Some(p.parse_u32_literal()?);
                if p.eat_kind(LexemeKind::Comma) {
                    scale = Some(p.parse_u32_literal()?);
                }
                p.expect_kind(LexemeKind::CloseParen, "')'")?;
            }

            if timezone.is_none() && matches!(name.as_str(), "time" | "timestamp") {
                if p.at_keyword("with") && p.peek_nth(1).is_some_and(|l| l.is_keyword("time")) {
                    p.advance();
                    p.advance();
                    p.expect_word("zone")?;
                    timezone = Some(TimeZoneSpec::With);
                } else if p
                    .peek()
                    .is_some_and(|l| {
                        l.kind == LexemeKind::Identifier
                            && l.value.eq_ignore_ascii_case("without")
                    })
                    && p.peek_nth(1).is_some_and(|l| l.is_keyword("time"))
                {
                    p.advance();
                    p.advance();
                    p.expect_word("zone")?;
                    timezone = Some(TimeZoneSpec::Without);
                }
            }

            Ok(TypeRef {
                name,
                precision,
                scale,
                timezone,
            })
        })
    }

    fn parse_u32_literal(&mut self) -> Result<u32, ParseError> {
        let lexeme =
            self.expect_kind(LexemeKind::Literal(LiteralKind::Numeric), "integer")?;
        lexeme.value.parse().map_err(|_| {
            ParseError::new(
                lexeme.span.start as usize,
                vec!["integer".to_owned()],
                format!("'{}'", lexeme.value),
                self.context.clone(),
            )
        })
    }

    fn expect_word(&mut self, word: &'static str) -> Result<(), ParseError> {
        let got = self.parse_identifier()?;
        if got.eq_ignore_ascii_case(word) {
            Ok(())
        } else {
            Err(ParseError::new(
                self.last_span().start as usize,
                vec![word.to_owned()],
                format!("'{got}'"),
                self.context.clone(),
            ))
        }
    }

    // ── Parameters ──────────────────────────────────────────────────────

    /// Resolve a parameter lexeme value into its identity.
    fn param_ref(&mut self, value: &str) -> ParamRef {
        if value == "?" {
            let ordinal = self.anon_params;
            self.anon_params += 1;
            return ParamRef::Anonymous(ordinal);
        }
        if let Some(rest) = value.strip_prefix('?') {
            return rest
                .parse()
                .map_or_else(|_| ParamRef::Named(rest.to_owned()), ParamRef::Indexed);
        }
        if let Some(rest) = value.strip_prefix('$') {
            if rest.bytes().all(|b| b.is_ascii_digit()) {
                return rest
                    .parse()
                    .map_or_else(|_| ParamRef::Named(rest.to_owned()), ParamRef::Indexed);
            }
            return ParamRef::Named(rest.to_owned());
        }
        let rest = value
            .strip_prefix(':')
            .or_else(|| value.strip_prefix('@'))
            .unwrap_or(value);
        ParamRef::Named(rest.to_owned())
    }

    // ── Window specifications ───────────────────────────────────────────

    /// `[base] [PARTITION BY ...] [ORDER BY ...] [frame]` inside `OVER (...)`
    /// or a WINDOW clause definition.
    pub(crate) fn parse_window_spec(&mut self) -> Result<WindowSpec, ParseError> {
        self.with_context("window specification", |p| {
            let mut spec = WindowSpec::default();
            if p.at_kind(LexemeKind::Identifier) {
                spec.base = Some(p.advance().value);
            }
            if p.eat_keyword("partition by") {
                spec.partition_by = p.parse_comma_sep(Self::parse_expr)?;
            }
            if p.eat_keyword("order by") {
                spec.order_by = p.parse_comma_sep(Self::parse_order_item)?;
            }
            if p.at_keyword("rows") || p.at_keyword("range") || p.at_keyword("groups") {
                spec.frame = Some(p.parse_frame_spec()?);
            }
            Ok(spec)
        })
    }

    fn parse_frame_spec(&mut self) -> Result<FrameSpec, ParseError> {
        let unit = if self.eat_keyword("rows") {
            FrameUnit::Rows
        } else if self.eat_keyword("range") {
            FrameUnit::Range
        } else {
            self.expect_keyword("groups")?;
            FrameUnit::Groups
        };

        let (start, end) = if self.eat_keyword("between") {
            let start = self.parse_frame_bound()?;
            self.expect_keyword("and")?;
            let end = self.parse_frame_bound()?;
            (start, Some(end))
        } else {
            (self.parse_frame_bound()?, None)
        };

        let exclude = if self.eat_keyword("exclude") {
            Some(if self.eat_keyword("current") {
                self.expect_keyword("row")?;
                FrameExclude::CurrentRow
            } else if self.eat_keyword("group") {
                FrameExclude::Group
            } else if self.eat_keyword("ties") {
                FrameExclude::Ties
            } else {
                self.expect_keyword("no")?;
                self.expect_keyword("others")?;
                FrameExclude::NoOthers
            })
        } else {
            None
        };

        Ok(FrameSpec {
            unit,
            start,
            end,
            exclude,
        })
    }

    fn parse_frame_bound(&mut self) -> Result<FrameBound, ParseError> {
        if self.eat_keyword("unbounded") {
            if self.eat_keyword("preceding") {
                return Ok(FrameBound::UnboundedPreceding);
            }
            self.expect_keyword("following")?;
            return Ok(FrameBound::UnboundedFollowing);
        }
        if self.eat_keyword("current") {
            self.expect_keyword("row")?;
            return Ok(FrameBound::CurrentRow);
        }
        let expr = self.parse_expr()?;
        if self.eat_keyword("preceding") {
            Ok(FrameBound::Preceding(Box::new(expr)))
        } else {
            self.expect_keyword("following")?;
            Ok(FrameBound::Following(Box::new(expr)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use requel_ast::Query;

    fn expr(sql: &str) -> Expr {
        let lexemes = crate::lexer::tokenize(sql).expect("tokenize");
        let mut parser = Parser::new(lexemes);
        let expr = parser.parse_expr().expect("parse");
        assert!(parser.is_complete(), "trailing input in {sql:?}");
        expr
    }

    fn expr_err(sql: &str) -> ParseError {
        let lexemes = crate::lexer::tokenize(sql).expect("tokenize");
        let mut parser = Parser::new(lexemes);
        parser.parse_expr().expect_err("should fail")
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let Expr::Binary { op, right, .. } = expr("a + b * c") else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(
            *right,
            Expr::Binary {
                op: BinaryOp::Mul,
                ..
            }
        ));
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let Expr::Binary { op, right, .. } = expr("a = 1 or b = 2 and c = 3") else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Or);
        assert!(matches!(
            *right,
            Expr::Binary {
                op: BinaryOp::And,
                ..
            }
        ));
    }

    #[test]
    fn exponent_binds_tighter_than_unary_minus() {
        let Expr::Unary { op, operand, .. } = expr("-2 ^ 2") else {
            panic!("expected unary");
        };
        assert_eq!(op, UnaryOp::Minus);
        assert!(matches!(
            *operand,
            Expr::Binary {
                op: BinaryOp::Pow,
                ..
            }
        ));
    }

    #[test]
    fn not_spans_a_whole_comparison() {
        let Expr::Unary { op, operand, .. } = expr("not a = b") else {
            panic!("expected unary");
        };
        assert_eq!(op, UnaryOp::Not);
        assert!(matches!(
            *operand,
            Expr::Binary {
                op: BinaryOp::Eq,
                ..
            }
        ));
    }

    #[test]
    fn parentheses_are_preserved() {
        let Expr::Binary { op, left, .. } = expr("(a + b) * c") else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Mul);
        assert!(matches!(*left, Expr::Paren { .. }));
    }

    #[test]
    fn is_family() {
        assert!(matches!(
            expr("x is null"),
            Expr::Is {
                target: IsTarget::Null,
                negated: false,
                ..
            }
        ));
        assert!(matches!(
            expr("x is not null"),
            Expr::Is {
                target: IsTarget::Null,
                negated: true,
                ..
            }
        ));
        assert!(matches!(
            expr("x is not true"),
            Expr::Is {
                target: IsTarget::True,
                negated: true,
                ..
            }
        ));
        assert!(matches!(
            expr("x is distinct from y"),
            Expr::Is {
                target: IsTarget::DistinctFrom(_),
                negated: false,
                ..
            }
        ));
        assert!(matches!(
            expr("x is not distinct from y"),
            Expr::Is {
                target: IsTarget::NotDistinctFrom(_),
                negated: false,
                ..
            }
        ));
    }

    #[test]
    fn in_list_and_subquery() {
        let Expr::In { set, negated, .. } = expr("x in (1, 2, 3)") else {
            panic!("expected in");
        };
        assert!(!negated);
        assert!(matches!(set, InSet::List(items) if items.len() == 3));

        let Expr::In { set, negated, .. } = expr("x not in (select id from t)") else {
            panic!("expected in");
        };
        assert!(negated);
        assert!(matches!(set, InSet::Subquery(_)));
    }

    #[test]
    fn between_keeps_and_separator_out_of_bounds() {
        let Expr::Binary { op, left, .. } = expr("a between 1 and 2 and b") else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::And);
        assert!(matches!(*left, Expr::Between { negated: false, .. }));
    }

    #[test]
    fn like_family() {
        assert!(matches!(
            expr("x like 'a%'"),
            Expr::Like {
                similar: false,
                case_insensitive: false,
                negated: false,
                escape: None,
                ..
            }
        ));
        assert!(matches!(
            expr("x not ilike 'a%'"),
            Expr::Like {
                case_insensitive: true,
                negated: true,
                ..
            }
        ));
        assert!(matches!(
            expr("x similar to 'a_' escape '!'"),
            Expr::Like {
                similar: true,
                escape: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn case_with_and_without_subject() {
        let Expr::Case {
            subject, branches, else_value, ..
        } = expr("case when age > 18 then 'adult' else 'minor' end")
        else {
            panic!("expected case");
        };
        assert!(subject.is_none());
        assert_eq!(branches.len(), 1);
        assert!(else_value.is_some());

        let Expr::Case { subject, .. } = expr("case status when 1 then 'on' end") else {
            panic!("expected case");
        };
        assert!(subject.is_some());
    }

    #[test]
    fn cast_both_styles() {
        let Expr::Cast {
            style, type_ref, ..
        } = expr("cast(x as numeric(10, 2))")
        else {
            panic!("expected cast");
        };
        assert_eq!(style, CastStyle::CastAs);
        assert_eq!(type_ref.name, "numeric");
        assert_eq!(type_ref.precision, Some(10));
        assert_eq!(type_ref.scale, Some(2));

        let Expr::Cast { style, .. } = expr("x::int") else {
            panic!("expected cast");
        };
        assert_eq!(style, CastStyle::DoubleColon);
    }

    #[test]
    fn temporal_types_normalize_time_zone_suffix() {
        let Expr::Cast { type_ref, .. } = expr("cast(x as timestamp with time zone)") else {
            panic!("expected cast");
        };
        assert_eq!(type_ref.name, "timestamp");
        assert_eq!(type_ref.timezone, Some(TimeZoneSpec::With));

        let Expr::Cast { type_ref, .. } = expr("cast(x as timestamp(3) without time zone)")
        else {
            panic!("expected cast");
        };
        assert_eq!(type_ref.name, "timestamp");
        assert_eq!(type_ref.precision, Some(3));
        assert_eq!(type_ref.timezone, Some(TimeZoneSpec::Without));
    }

    #[test]
    fn multi_word_type_names() {
        let Expr::Cast { type_ref, .. } = expr("cast(x as double precision)") else {
            panic!("expected cast");
        };
        assert_eq!(type_ref.name, "double precision");

        let Expr::Cast { type_ref, .. } = expr("cast(x as character varying(30))") else {
            panic!("expected cast");
        };
        assert_eq!(type_ref.name, "character varying");
        assert_eq!(type_ref.precision, Some(30));
    }

    #[test]
    fn extract_position_overlay() {
        assert!(matches!(expr("extract(year from d)"), Expr::Extract { field, .. } if field == "year"));
        assert!(matches!(expr("position('x' in s)"), Expr::Position { .. }));
        assert!(matches!(
            expr("overlay(s placing 'ab' from 2 for 3)"),
            Expr::Overlay {
                for_length: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn substring_forms() {
        assert!(matches!(
            expr("substring(s, 1, 2)"),
            Expr::Substring {
                keyword_form: false,
                start: Some(_),
                length: Some(_),
                ..
            }
        ));
        assert!(matches!(
            expr("substring(s from 2 for 3)"),
            Expr::Substring {
                keyword_form: true,
                start: Some(_),
                length: Some(_),
                ..
            }
        ));
        assert!(matches!(
            expr("substring(s similar '%#\"a*#\"%' escape '#')"),
            Expr::Substring {
                pattern: Some(_),
                escape: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn trim_forms() {
        assert!(matches!(
            expr("trim(s)"),
            Expr::Trim {
                side: TrimSide::Both,
                characters: None,
                postgres_style: false,
                ..
            }
        ));
        assert!(matches!(
            expr("trim(leading 'x' from s)"),
            Expr::Trim {
                side: TrimSide::Leading,
                characters: Some(_),
                postgres_style: false,
                ..
            }
        ));
        assert!(matches!(
            expr("trim(both from s, 'x')"),
            Expr::Trim {
                side: TrimSide::Both,
                characters: Some(_),
                postgres_style: true,
                ..
            }
        ));
        assert!(matches!(
            expr("trim(s, 'x')"),
            Expr::Trim {
                characters: Some(_),
                postgres_style: true,
                ..
            }
        ));
    }

    #[test]
    fn array_and_interval() {
        assert!(matches!(expr("array[1, 2, 3]"), Expr::Array { elements, .. } if elements.len() == 3));
        assert!(matches!(expr("array[]"), Expr::Array { elements, .. } if elements.is_empty()));

        let Expr::Interval { qualifier, .. } = expr("interval '1' day") else {
            panic!("expected interval");
        };
        assert_eq!(qualifier.as_deref(), Some("day"));

        let Expr::Interval { qualifier, .. } = expr("interval '1-2' year to month") else {
            panic!("expected interval");
        };
        assert_eq!(qualifier.as_deref(), Some("year to month"));
    }

    #[test]
    fn at_time_zone_is_postfix() {
        let Expr::AtTimeZone { zone, .. } = expr("created_at at time zone 'UTC'") else {
            panic!("expected at time zone");
        };
        assert!(matches!(*zone, Expr::Literal(_, _)));
    }

    #[test]
    fn function_call_basics() {
        let Expr::FunctionCall { name, args, .. } = expr("count(*)") else {
            panic!("expected call");
        };
        assert_eq!(name.name, "count");
        assert_eq!(args.len(), 1);
        assert!(matches!(&args[0], Expr::Column(c, _) if c.is_wildcard()));

        let Expr::FunctionCall { distinct, .. } = expr("count(distinct x)") else {
            panic!("expected call");
        };
        assert!(distinct);

        let Expr::FunctionCall { name, .. } = expr("pg_catalog.lower(x)") else {
            panic!("expected call");
        };
        assert_eq!(name.qualifiers, vec!["pg_catalog".to_owned()]);
    }

    #[test]
    fn aggregate_order_by_inside_parens() {
        let Expr::FunctionCall { order_by, .. } = expr("array_agg(x order by y desc)") else {
            panic!("expected call");
        };
        assert_eq!(order_by.map(|o| o.len()), Some(1));
    }

    #[test]
    fn within_group_attaches_an_order_by() {
        let Expr::FunctionCall {
            name, within_group, over, ..
        } = expr("PERCENTILE_CONT(0.5) WITHIN GROUP (ORDER BY amount)")
        else {
            panic!("expected call");
        };
        assert_eq!(name.name.to_ascii_lowercase(), "percentile_cont");
        assert!(over.is_none());
        let items = within_group.expect("within group present");
        assert_eq!(items.len(), 1);
        assert!(
            matches!(&items[0].value, Expr::Column(c, _) if matches!(&c.target, ColumnTarget::Name(n) if n == "amount"))
        );
    }

    #[test]
    fn filter_combines_with_over() {
        let Expr::FunctionCall { filter, over, .. } =
            expr("count(*) filter (where x > 0) over (partition by y)")
        else {
            panic!("expected call");
        };
        assert!(filter.is_some());
        assert!(matches!(over, Some(OverWindow::Spec(_))));
    }

    #[test]
    fn over_and_within_group_are_mutually_exclusive() {
        let err = expr_err("f(x) within group (order by y) over (order by z)");
        assert!(err.expected[0].contains("at most one"));
        let err = expr_err("f(x) over w within group (order by y)");
        assert!(err.expected[0].contains("at most one"));
    }

    #[test]
    fn over_named_window_and_frame() {
        let Expr::FunctionCall { over, .. } = expr("sum(x) over w") else {
            panic!("expected call");
        };
        assert!(matches!(over, Some(OverWindow::Named(n)) if n == "w"));

        let Expr::FunctionCall { over, .. } = expr(
            "sum(x) over (partition by g order by t rows between unbounded preceding and current row exclude ties)",
        ) else {
            panic!("expected call");
        };
        let Some(OverWindow::Spec(spec)) = over else {
            panic!("expected spec");
        };
        assert_eq!(spec.partition_by.len(), 1);
        assert_eq!(spec.order_by.len(), 1);
        let frame = spec.frame.expect("frame present");
        assert_eq!(frame.unit, FrameUnit::Rows);
        assert_eq!(frame.start, FrameBound::UnboundedPreceding);
        assert_eq!(frame.end, Some(FrameBound::CurrentRow));
        assert_eq!(frame.exclude, Some(FrameExclude::Ties));
    }

    #[test]
    fn subquery_and_exists() {
        assert!(matches!(expr("(select 1)"), Expr::Subquery(_, _)));
        assert!(matches!(
            expr("exists (select 1)"),
            Expr::Exists { negated: false, .. }
        ));
        assert!(matches!(
            expr("not exists (select 1)"),
            Expr::Exists { negated: true, .. }
        ));
    }

    #[test]
    fn subquery_inside_a_query_is_boxed_query() {
        let Expr::Subquery(query, _) = expr("(select id from t)") else {
            panic!("expected subquery");
        };
        assert!(matches!(*query, Query::Select(_)));
    }

    #[test]
    fn parameter_identities() {
        assert!(matches!(
            expr(":userId"),
            Expr::Parameter(ParamRef::Named(n), _) if n == "userId"
        ));
        assert!(matches!(expr("$2"), Expr::Parameter(ParamRef::Indexed(2), _)));
        assert!(matches!(expr("?7"), Expr::Parameter(ParamRef::Indexed(7), _)));
        assert!(matches!(
            expr("@tenant"),
            Expr::Parameter(ParamRef::Named(n), _) if n == "tenant"
        ));

        // Each bare `?` is its own identity, ordered textually.
        let Expr::Binary { left, right, .. } = expr("? + ?") else {
            panic!("expected binary");
        };
        assert!(matches!(*left, Expr::Parameter(ParamRef::Anonymous(0), _)));
        assert!(matches!(*right, Expr::Parameter(ParamRef::Anonymous(1), _)));
    }

    #[test]
    fn qualified_wildcard_chain() {
        let Expr::Column(col, _) = expr("t.*") else {
            panic!("expected column");
        };
        assert_eq!(col.qualifiers, vec!["t".to_owned()]);
        assert!(col.is_wildcard());
    }

    #[test]
    fn soft_keywords_usable_as_columns() {
        assert!(matches!(
            expr("key"),
            Expr::Column(c, _) if matches!(&c.target, ColumnTarget::Name(n) if n == "key")
        ));
        assert!(matches!(expr("u.update"), Expr::Column(_, _)));
    }

    #[test]
    fn deep_nesting_hits_the_recursion_guard() {
        let depth = 600;
        let sql = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        let err = expr_err(&sql);
        assert!(err.expected[0].contains("nesting"));
    }

    #[test]
    fn end_of_input_error() {
        let err = expr_err("1 +");
        assert_eq!(err.found, ParseError::END_OF_INPUT);
    }
}
