//! Abstract syntax tree for the requel SELECT grammar.
//!
//! Every SELECT-family construct the parser recognizes has a node here:
//! queries, clauses, table sources, and value expressions, one enum per
//! syntactic category. Nodes carry only syntactic information — no symbol
//! tables — plus a [`Span`] on every expression node for diagnostics and
//! the comments lifted off their opening keyword lexeme.
//!
//! Trees are acyclic and exclusively owned; transformers return new trees
//! sharing nothing with their input at the interface level. Structural
//! equality (`PartialEq`) is the equality contract for tests.

use std::fmt;

// ---------------------------------------------------------------------------
// Span — source location tracking
// ---------------------------------------------------------------------------

/// A byte-offset range into the original SQL source text.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Byte offset of the first character (inclusive).
    pub start: u32,
    /// Byte offset one past the last character (exclusive).
    pub end: u32,
}

impl Span {
    /// Create a new span from start (inclusive) to end (exclusive) offsets.
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// A zero-length span at position 0, used as a placeholder.
    pub const ZERO: Self = Self { start: 0, end: 0 };

    /// Merge two spans into one that covers both.
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        let start = if self.start < other.start {
            self.start
        } else {
            other.start
        };
        let end = if self.end > other.end {
            self.end
        } else {
            other.end
        };
        Self { start, end }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

/// A source comment lifted off a lexeme and attached to the AST node that
/// consumed the lexeme's opening keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// Comment text without the delimiters (`--` or `/* */`).
    pub text: String,
    /// `true` for `/* */` comments, `false` for `--` line comments.
    pub block: bool,
}

impl Comment {
    pub fn line(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            block: false,
        }
    }

    pub fn block(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            block: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// A SELECT-family query.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// A plain `SELECT ...` with its optional clauses.
    Select(Box<SelectQuery>),
    /// Two queries joined by a set operator, left-associative.
    Binary(BinaryQuery),
    /// A standalone `VALUES (...), (...)`.
    Values(ValuesQuery),
}

/// A simple SELECT query: clauses in their fixed grammatical order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectQuery {
    pub with: Option<WithClause>,
    pub select: SelectClause,
    pub from: Option<FromClause>,
    pub where_clause: Option<WhereClause>,
    pub group_by: Option<GroupByClause>,
    pub having: Option<HavingClause>,
    pub window: Option<WindowClause>,
    pub order_by: Option<OrderByClause>,
    pub limit: Option<LimitClause>,
    pub offset: Option<OffsetClause>,
    pub for_lock: Option<ForClause>,
}

/// `left op right` where op is a set operator.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryQuery {
    pub op: SetOp,
    pub left: Box<Query>,
    pub right: Box<Query>,
}

/// Set operators joining SELECT cores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetOp {
    Union,
    UnionAll,
    Intersect,
    Except,
}

impl SetOp {
    /// The lowercase SQL spelling of this operator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Union => "union",
            Self::UnionAll => "union all",
            Self::Intersect => "intersect",
            Self::Except => "except",
        }
    }
}

/// `VALUES (row), (row), ...` — rows need not be rectangular at parse time.
#[derive(Debug, Clone, PartialEq)]
pub struct ValuesQuery {
    pub rows: Vec<Vec<Expr>>,
    pub comments: Vec<Comment>,
}

// ---------------------------------------------------------------------------
// WITH clause
// ---------------------------------------------------------------------------

/// `WITH [RECURSIVE] name [(cols)] AS [[NOT] MATERIALIZED] (query), ...`
#[derive(Debug, Clone, PartialEq)]
pub struct WithClause {
    pub recursive: bool,
    pub tables: Vec<CommonTable>,
    pub comments: Vec<Comment>,
}

/// One common table expression definition.
#[derive(Debug, Clone, PartialEq)]
pub struct CommonTable {
    pub name: String,
    pub column_aliases: Option<Vec<String>>,
    pub materialized: Option<Materialized>,
    pub query: Query,
    pub comments: Vec<Comment>,
}

/// The `[NOT] MATERIALIZED` hint on a common table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Materialized {
    Materialized,
    NotMaterialized,
}

// ---------------------------------------------------------------------------
// SELECT clause
// ---------------------------------------------------------------------------

/// The projection list, with its optional distinctness modifier.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectClause {
    pub distinct: Option<Distinct>,
    pub items: Vec<SelectItem>,
    pub comments: Vec<Comment>,
}

/// `DISTINCT` or `DISTINCT ON (exprs)`.
#[derive(Debug, Clone, PartialEq)]
pub enum Distinct {
    Distinct,
    On(Vec<Expr>),
}

/// One projected item, optionally aliased.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub value: Expr,
    pub alias: Option<String>,
    pub comments: Vec<Comment>,
}

impl SelectItem {
    #[must_use]
    pub fn new(value: Expr) -> Self {
        Self {
            value,
            alias: None,
            comments: Vec::new(),
        }
    }

    /// The display name of this item: the alias when present, otherwise the
    /// last identifier of a bare column reference. Items whose value is any
    /// other expression have no stable output name.
    #[must_use]
    pub fn output_name(&self) -> Option<&str> {
        if let Some(alias) = &self.alias {
            return Some(alias);
        }
        if let Expr::Column(col, _) = &self.value {
            if let ColumnTarget::Name(name) = &col.target {
                return Some(name);
            }
        }
        None
    }
}

// ---------------------------------------------------------------------------
// FROM clause, sources, joins
// ---------------------------------------------------------------------------

/// `FROM source join*`.
#[derive(Debug, Clone, PartialEq)]
pub struct FromClause {
    pub source: Source,
    pub joins: Vec<Join>,
    pub comments: Vec<Comment>,
}

/// A table source in a FROM clause or join.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// `[q1.q2.]name [AS alias [(cols)]]`.
    Table {
        qualifiers: Vec<String>,
        name: String,
        alias: Option<String>,
        column_aliases: Option<Vec<String>>,
    },
    /// `(query) [AS alias [(cols)]]`.
    Subquery {
        query: Box<Query>,
        alias: Option<String>,
        column_aliases: Option<Vec<String>>,
    },
    /// `func(args) [AS alias]`.
    Function {
        name: QualifiedName,
        args: Vec<Expr>,
        alias: Option<String>,
    },
}

impl Source {
    /// The unqualified table name, when this source is a bare table.
    /// Used by the CTE dependency tracer for reference detection.
    #[must_use]
    pub fn unqualified_table_name(&self) -> Option<&str> {
        match self {
            Self::Table {
                qualifiers, name, ..
            } if qualifiers.is_empty() => Some(name),
            _ => None,
        }
    }
}

/// One join step following the leading source.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub natural: bool,
    pub lateral: bool,
    pub source: Source,
    pub constraint: Option<JoinConstraint>,
}

/// The kind of join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

/// Join constraint: `ON expr` or `USING (cols)`. Absent for cross and
/// natural joins.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinConstraint {
    On(Expr),
    Using(Vec<String>),
}

// ---------------------------------------------------------------------------
// Remaining clauses
// ---------------------------------------------------------------------------

/// `WHERE condition`.
#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    pub condition: Expr,
    pub comments: Vec<Comment>,
}

/// `HAVING condition`.
#[derive(Debug, Clone, PartialEq)]
pub struct HavingClause {
    pub condition: Expr,
    pub comments: Vec<Comment>,
}

/// `GROUP BY items`.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupByClause {
    pub items: Vec<Expr>,
    pub comments: Vec<Comment>,
}

/// `ORDER BY items`.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByClause {
    pub items: Vec<OrderItem>,
    pub comments: Vec<Comment>,
}

/// One ordering term.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub value: Expr,
    pub direction: Option<SortDirection>,
    pub nulls: Option<NullsOrder>,
}

impl OrderItem {
    #[must_use]
    pub fn new(value: Expr) -> Self {
        Self {
            value,
            direction: None,
            nulls: None,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// `NULLS FIRST` / `NULLS LAST`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NullsOrder {
    First,
    Last,
}

/// `WINDOW name AS (spec), ...`.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowClause {
    pub defs: Vec<NamedWindow>,
    pub comments: Vec<Comment>,
}

/// One named window definition.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedWindow {
    pub name: String,
    pub spec: WindowSpec,
}

/// `LIMIT value`.
#[derive(Debug, Clone, PartialEq)]
pub struct LimitClause {
    pub value: Expr,
    pub comments: Vec<Comment>,
}

/// `OFFSET value`.
#[derive(Debug, Clone, PartialEq)]
pub struct OffsetClause {
    pub value: Expr,
    pub comments: Vec<Comment>,
}

/// `FOR UPDATE [OF tables] [NOWAIT | SKIP LOCKED]` and friends.
#[derive(Debug, Clone, PartialEq)]
pub struct ForClause {
    pub mode: LockMode,
    pub tables: Vec<String>,
    pub wait: Option<LockWait>,
    pub comments: Vec<Comment>,
}

/// Row lock strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    Update,
    NoKeyUpdate,
    Share,
    KeyShare,
}

impl LockMode {
    /// The lowercase SQL spelling of this lock mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::NoKeyUpdate => "no key update",
            Self::Share => "share",
            Self::KeyShare => "key share",
        }
    }
}

/// Lock wait policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockWait {
    Nowait,
    SkipLocked,
}

// ---------------------------------------------------------------------------
// Names
// ---------------------------------------------------------------------------

/// A possibly-qualified name like `pg_catalog.lower` or just `count`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct QualifiedName {
    pub qualifiers: Vec<String>,
    pub name: String,
}

impl QualifiedName {
    /// Create an unqualified name.
    #[must_use]
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            qualifiers: Vec::new(),
            name: name.into(),
        }
    }
}

/// A column reference: zero or more qualifiers and a final target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub qualifiers: Vec<String>,
    pub target: ColumnTarget,
}

/// The final segment of a column reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnTarget {
    /// A named column.
    Name(String),
    /// `*` (bare) or `t.*` (when qualifiers are present).
    Wildcard,
}

impl ColumnRef {
    #[must_use]
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            qualifiers: Vec::new(),
            target: ColumnTarget::Name(name.into()),
        }
    }

    #[must_use]
    pub const fn is_wildcard(&self) -> bool {
        matches!(self.target, ColumnTarget::Wildcard)
    }
}

// ---------------------------------------------------------------------------
// Literals and parameters
// ---------------------------------------------------------------------------

/// A literal value, with the raw source text preserved for round-trips.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Literal {
    pub kind: LiteralKind,
    /// The literal exactly as written, quotes and escapes included.
    pub raw: String,
}

/// Literal categories the tokenizer distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    Numeric,
    String,
    Boolean,
    Null,
}

impl Literal {
    pub fn numeric(raw: impl Into<String>) -> Self {
        Self {
            kind: LiteralKind::Numeric,
            raw: raw.into(),
        }
    }

    pub fn string(raw: impl Into<String>) -> Self {
        Self {
            kind: LiteralKind::String,
            raw: raw.into(),
        }
    }

    pub fn boolean(raw: impl Into<String>) -> Self {
        Self {
            kind: LiteralKind::Boolean,
            raw: raw.into(),
        }
    }

    #[must_use]
    pub fn null() -> Self {
        Self {
            kind: LiteralKind::Null,
            raw: "null".to_owned(),
        }
    }
}

/// A bind parameter reference.
///
/// Identity rules: named parameters share identity by name, indexed
/// parameters by index, and each anonymous `?` is its own identity (the
/// ordinal is assigned by the parser in textual order).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamRef {
    /// `:name`, `@name`, or `$name`.
    Named(String),
    /// `$1` or `?1`.
    Indexed(u32),
    /// A bare `?`, with its parse-time ordinal.
    Anonymous(u32),
}

impl ParamRef {
    /// A stable key naming this parameter's identity.
    #[must_use]
    pub fn identity_key(&self) -> String {
        match self {
            Self::Named(name) => format!("name:{name}"),
            Self::Indexed(i) => format!("index:{i}"),
            Self::Anonymous(ord) => format!("anon:{ord}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

/// Binary operators, in source spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    BitOr,
    BitXor,
    BitAnd,
    Add,
    Sub,
    Concat,
    Mul,
    Div,
    Mod,
    Pow,
}

impl BinaryOp {
    /// The lowercase SQL spelling of this operator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Or => "or",
            Self::And => "and",
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::BitOr => "|",
            Self::BitXor => "#",
            Self::BitAnd => "&",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Concat => "||",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Pow => "^",
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Plus,
    Minus,
}

impl UnaryOp {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Not => "not",
            Self::Plus => "+",
            Self::Minus => "-",
        }
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

/// A value expression. Every variant carries a [`Span`].
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal constant.
    Literal(Literal, Span),

    /// A column reference or wildcard.
    Column(ColumnRef, Span),

    /// A bind parameter.
    Parameter(ParamRef, Span),

    /// `left op right`.
    Binary {
        op: BinaryOp,
        left: Box<Self>,
        right: Box<Self>,
        span: Span,
    },

    /// `op operand`.
    Unary {
        op: UnaryOp,
        operand: Box<Self>,
        span: Span,
    },

    /// An explicitly parenthesized expression, preserved for round-trips.
    Paren { inner: Box<Self>, span: Span },

    /// A function call with its optional tail features. `over` and
    /// `within_group` are mutually exclusive; the formatter enforces this.
    FunctionCall {
        name: QualifiedName,
        args: Vec<Self>,
        distinct: bool,
        order_by: Option<Vec<OrderItem>>,
        filter: Option<Box<Self>>,
        over: Option<OverWindow>,
        within_group: Option<Vec<OrderItem>>,
        span: Span,
    },

    /// `CASE [subject] WHEN ... THEN ... [ELSE ...] END`.
    Case {
        subject: Option<Box<Self>>,
        branches: Vec<(Self, Self)>,
        else_value: Option<Box<Self>>,
        span: Span,
    },

    /// `value [NOT] BETWEEN low AND high`.
    Between {
        value: Box<Self>,
        low: Box<Self>,
        high: Box<Self>,
        negated: bool,
        span: Span,
    },

    /// `value [NOT] IN (list | subquery)`.
    In {
        value: Box<Self>,
        set: InSet,
        negated: bool,
        span: Span,
    },

    /// `value IS [NOT] target`.
    Is {
        value: Box<Self>,
        target: IsTarget,
        negated: bool,
        span: Span,
    },

    /// `value [NOT] LIKE/ILIKE/SIMILAR TO pattern [ESCAPE escape]`.
    Like {
        value: Box<Self>,
        pattern: Box<Self>,
        escape: Option<Box<Self>>,
        similar: bool,
        case_insensitive: bool,
        negated: bool,
        span: Span,
    },

    /// `[NOT] EXISTS (query)`.
    Exists {
        query: Box<Query>,
        negated: bool,
        span: Span,
    },

    /// `CAST(value AS type)` or `value::type`.
    Cast {
        value: Box<Self>,
        type_ref: TypeRef,
        style: CastStyle,
        span: Span,
    },

    /// `ARRAY[...]`.
    Array { elements: Vec<Self>, span: Span },

    /// `INTERVAL 'literal' [qualifier]`.
    Interval {
        literal: Literal,
        qualifier: Option<String>,
        span: Span,
    },

    /// `EXTRACT(field FROM expr)`.
    Extract {
        field: String,
        from: Box<Self>,
        span: Span,
    },

    /// `POSITION(needle IN haystack)`.
    Position {
        needle: Box<Self>,
        haystack: Box<Self>,
        span: Span,
    },

    /// `SUBSTRING(...)` in its comma, FROM/FOR, and SIMILAR/ESCAPE forms.
    Substring {
        target: Box<Self>,
        start: Option<Box<Self>>,
        length: Option<Box<Self>>,
        pattern: Option<Box<Self>>,
        escape: Option<Box<Self>>,
        /// `true` for the keyword form (`FROM`/`FOR`), `false` for commas.
        keyword_form: bool,
        span: Span,
    },

    /// `TRIM([side] [characters] FROM target)` and the PostgreSQL reversed
    /// form `TRIM(side FROM target, characters)`.
    Trim {
        side: TrimSide,
        characters: Option<Box<Self>>,
        target: Box<Self>,
        postgres_style: bool,
        span: Span,
    },

    /// `OVERLAY(target PLACING placing FROM from [FOR for])`.
    Overlay {
        target: Box<Self>,
        placing: Box<Self>,
        from: Box<Self>,
        for_length: Option<Box<Self>>,
        span: Span,
    },

    /// `value AT TIME ZONE zone`.
    AtTimeZone {
        value: Box<Self>,
        zone: Box<Self>,
        span: Span,
    },

    /// A subquery used as a value: `(SELECT ...)`.
    Subquery(Box<Query>, Span),
}

impl Expr {
    /// Return the span of this expression node.
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Literal(_, s)
            | Self::Column(_, s)
            | Self::Parameter(_, s)
            | Self::Subquery(_, s) => *s,
            Self::Binary { span, .. }
            | Self::Unary { span, .. }
            | Self::Paren { span, .. }
            | Self::FunctionCall { span, .. }
            | Self::Case { span, .. }
            | Self::Between { span, .. }
            | Self::In { span, .. }
            | Self::Is { span, .. }
            | Self::Like { span, .. }
            | Self::Exists { span, .. }
            | Self::Cast { span, .. }
            | Self::Array { span, .. }
            | Self::Interval { span, .. }
            | Self::Extract { span, .. }
            | Self::Position { span, .. }
            | Self::Substring { span, .. }
            | Self::Trim { span, .. }
            | Self::Overlay { span, .. }
            | Self::AtTimeZone { span, .. } => *span,
        }
    }
}

/// The right-hand side of an IN expression.
#[derive(Debug, Clone, PartialEq)]
pub enum InSet {
    List(Vec<Expr>),
    Subquery(Box<Query>),
}

/// The target of an IS test.
#[derive(Debug, Clone, PartialEq)]
pub enum IsTarget {
    Null,
    True,
    False,
    DistinctFrom(Box<Expr>),
    NotDistinctFrom(Box<Expr>),
}

/// Which side TRIM strips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrimSide {
    Leading,
    Trailing,
    Both,
}

impl TrimSide {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Leading => "leading",
            Self::Trailing => "trailing",
            Self::Both => "both",
        }
    }
}

/// How a cast was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastStyle {
    /// `CAST(x AS t)`.
    CastAs,
    /// `x::t`.
    DoubleColon,
}

/// A type reference in a cast or column definition position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    /// The (possibly multi-word) type name, lowercase.
    pub name: String,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub timezone: Option<TimeZoneSpec>,
}

impl TypeRef {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            precision: None,
            scale: None,
            timezone: None,
        }
    }
}

/// `WITH TIME ZONE` / `WITHOUT TIME ZONE` on a temporal type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeZoneSpec {
    With,
    Without,
}

// ---------------------------------------------------------------------------
// Window specifications
// ---------------------------------------------------------------------------

/// The window attached by `OVER`: a bare name or an inline specification.
#[derive(Debug, Clone, PartialEq)]
pub enum OverWindow {
    Named(String),
    Spec(WindowSpec),
}

/// A window specification.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WindowSpec {
    /// Optional named window this spec refines.
    pub base: Option<String>,
    pub partition_by: Vec<Expr>,
    pub order_by: Vec<OrderItem>,
    pub frame: Option<FrameSpec>,
}

/// A window frame specification.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSpec {
    pub unit: FrameUnit,
    pub start: FrameBound,
    /// `None` for the BETWEEN-less single-bound syntax.
    pub end: Option<FrameBound>,
    pub exclude: Option<FrameExclude>,
}

/// ROWS, RANGE, or GROUPS framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameUnit {
    Rows,
    Range,
    Groups,
}

/// A window frame boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameBound {
    UnboundedPreceding,
    Preceding(Box<Expr>),
    CurrentRow,
    Following(Box<Expr>),
    UnboundedFollowing,
}

/// A window frame EXCLUDE clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameExclude {
    NoOthers,
    CurrentRow,
    Group,
    Ties,
}
