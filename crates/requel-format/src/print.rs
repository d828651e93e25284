//! Stage 1: AST → print-token lowering.
//!
//! Lowering walks the AST and produces a dialect-agnostic token tree.
//! Leaf tokens carry text plus glue flags controlling adjacent spacing;
//! container tokens tag subtrees with the grammar production they came
//! from, which is what drives the line printer's indentation and break
//! decisions. Parameter placeholders are assigned here, on first
//! encounter, so their numbering matches textual order.

use std::collections::HashSet;

use requel_ast::{
    CastStyle, ColumnTarget, CommonTable, Comment, Distinct, Expr, ForClause, FrameBound,
    FrameSpec, FrameUnit, FromClause, InSet, IsTarget, Join, JoinConstraint, JoinKind, Materialized,
    OrderItem, OverWindow, ParamRef, Query, SelectItem, SelectQuery, Source, TimeZoneSpec, TrimSide,
    TypeRef, ValuesQuery, WindowSpec, WithClause,
};
use requel_error::FormatError;

use crate::params::ParamCollector;
use crate::ResolvedOptions;

// ---------------------------------------------------------------------------
// Print tokens
// ---------------------------------------------------------------------------

/// Grammar production a container token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Query,
    SelectClause,
    FromClause,
    JoinClause,
    WhereClause,
    GroupByClause,
    HavingClause,
    WindowClause,
    OrderByClause,
    LimitClause,
    OffsetClause,
    ForClause,
    WithClause,
    CommonTable,
    CteImport,
    Values,
    SetOperator,
    SubQuery,
    CaseExpression,
    CaseBranch,
}

/// Print token discriminant.
#[derive(Debug, Clone, PartialEq)]
pub enum PrintTokenKind {
    /// A keyword; `breakable` marks condition-chain ANDs for the
    /// and-break option.
    Keyword { breakable: bool },
    Identifier,
    Literal,
    Operator,
    /// A comma; `breakable` marks list-level commas for the comma-break
    /// option.
    Comma { breakable: bool },
    Parameter,
    Comment,
    /// A forced line break; `back` drops one indent level (used before
    /// closing tokens such as `)` and `END`).
    Break { back: bool },
    /// A structural node; `oneline` forces single-line rendering of the
    /// subtree.
    Container { kind: ContainerKind, oneline: bool },
}

/// One node of the print-token tree.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintToken {
    pub kind: PrintTokenKind,
    /// Text for leaf tokens; empty for containers and breaks.
    pub text: String,
    /// Children for containers; empty for leaves.
    pub children: Vec<PrintToken>,
    /// Suppress the space before this token.
    pub glue_left: bool,
    /// Suppress the space after this token.
    pub glue_right: bool,
}

impl PrintToken {
    fn leaf(kind: PrintTokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            children: Vec::new(),
            glue_left: false,
            glue_right: false,
        }
    }

    pub(crate) fn keyword(text: impl Into<String>) -> Self {
        Self::leaf(PrintTokenKind::Keyword { breakable: false }, text)
    }

    fn keyword_breakable(text: impl Into<String>) -> Self {
        Self::leaf(PrintTokenKind::Keyword { breakable: true }, text)
    }

    fn identifier(text: impl Into<String>) -> Self {
        Self::leaf(PrintTokenKind::Identifier, text)
    }

    fn literal(text: impl Into<String>) -> Self {
        Self::leaf(PrintTokenKind::Literal, text)
    }

    fn operator(text: impl Into<String>) -> Self {
        Self::leaf(PrintTokenKind::Operator, text)
    }

    fn parameter(text: impl Into<String>) -> Self {
        Self::leaf(PrintTokenKind::Parameter, text)
    }

    pub(crate) fn comment(text: impl Into<String>) -> Self {
        Self::leaf(PrintTokenKind::Comment, text)
    }

    fn comma(breakable: bool) -> Self {
        let mut token = Self::leaf(PrintTokenKind::Comma { breakable }, ",");
        token.glue_left = true;
        token
    }

    fn line_break(back: bool) -> Self {
        Self::leaf(PrintTokenKind::Break { back }, "")
    }

    fn open_paren() -> Self {
        let mut token = Self::operator("(");
        token.glue_right = true;
        token
    }

    fn open_paren_glued() -> Self {
        let mut token = Self::open_paren();
        token.glue_left = true;
        token
    }

    fn close_paren() -> Self {
        let mut token = Self::operator(")");
        token.glue_left = true;
        token
    }

    fn open_bracket() -> Self {
        let mut token = Self::operator("[");
        token.glue_left = true;
        token.glue_right = true;
        token
    }

    fn close_bracket() -> Self {
        let mut token = Self::operator("]");
        token.glue_left = true;
        token
    }

    fn dot() -> Self {
        let mut token = Self::operator(".");
        token.glue_left = true;
        token.glue_right = true;
        token
    }

    fn double_colon() -> Self {
        let mut token = Self::operator("::");
        token.glue_left = true;
        token.glue_right = true;
        token
    }

    pub(crate) fn container(kind: ContainerKind, children: Vec<Self>) -> Self {
        Self {
            kind: PrintTokenKind::Container {
                kind,
                oneline: false,
            },
            text: String::new(),
            children,
            glue_left: false,
            glue_right: false,
        }
    }

    fn container_oneline(kind: ContainerKind, children: Vec<Self>) -> Self {
        Self {
            kind: PrintTokenKind::Container {
                kind,
                oneline: true,
            },
            text: String::new(),
            children,
            glue_left: false,
            glue_right: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Lowering
// ---------------------------------------------------------------------------

/// AST-to-print-token lowering. Owns the parameter collector so that
/// placeholder numbering is stable across the whole query, nested
/// subqueries and CTE bodies included.
pub(crate) struct Lowering<'a> {
    opts: &'a ResolvedOptions,
    pub(crate) params: ParamCollector,
    /// Common tables to render as one-liners, by name.
    oneline_ctes: HashSet<String>,
    /// Leaf names for import-comment emission, in declaration order.
    import_names: Vec<String>,
}

type Lowered = Result<Vec<PrintToken>, FormatError>;

impl<'a> Lowering<'a> {
    pub(crate) fn new(opts: &'a ResolvedOptions) -> Self {
        Self {
            opts,
            params: ParamCollector::new(opts.parameter_style, opts.parameter_symbol.clone()),
            oneline_ctes: HashSet::new(),
            import_names: Vec::new(),
        }
    }

    /// Lower a whole query, applying the CTE one-liner policy to the
    /// outermost WITH clause.
    pub(crate) fn lower_query_root(&mut self, query: &Query) -> Result<PrintToken, FormatError> {
        self.apply_cte_policy(query);
        let children = self.lower_query(query)?;
        Ok(PrintToken::container(ContainerKind::Query, children))
    }

    /// Lower a standalone expression (no clause structure around it).
    pub(crate) fn lower_expr_root(&mut self, expr: &Expr) -> Result<PrintToken, FormatError> {
        let children = self.lower_expr(expr)?;
        Ok(PrintToken::container(ContainerKind::Query, children))
    }

    fn apply_cte_policy(&mut self, query: &Query) {
        // `cte_oneline` needs no precomputation: it applies to every
        // common table and wins over dependency mode.
        if self.opts.cte_oneline {
            return;
        }
        if self.opts.cte_oneline_dependency {
            // A cyclic graph disables one-liner treatment entirely.
            if let Some(graph) = requel_transform::CteGraph::trace_query(query) {
                if !graph.is_cyclic() {
                    let leaves: Vec<String> =
                        graph.leaf_names().iter().map(|n| (*n).to_owned()).collect();
                    self.oneline_ctes = leaves.iter().cloned().collect();
                    self.import_names = leaves;
                }
            }
        }
    }

    fn comments(&self, comments: &[Comment], clause_level: bool) -> Vec<PrintToken> {
        if !self.opts.export_comment {
            return Vec::new();
        }
        if self.opts.strict_comment_placement && !clause_level {
            return Vec::new();
        }
        comments
            .iter()
            .map(|c| PrintToken::comment(c.text.clone()))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    fn lower_query(&mut self, query: &Query) -> Lowered {
        match query {
            Query::Select(select) => self.lower_select(select),
            Query::Binary(binary) => {
                let mut tokens = self.lower_query(&binary.left)?;
                tokens.push(PrintToken::container(
                    ContainerKind::SetOperator,
                    vec![PrintToken::keyword(binary.op.as_str())],
                ));
                tokens.extend(self.lower_query(&binary.right)?);
                Ok(tokens)
            }
            Query::Values(values) => self.lower_values(values),
        }
    }

    fn lower_select(&mut self, select: &SelectQuery) -> Lowered {
        let mut tokens = Vec::new();
        if let Some(with) = &select.with {
            tokens.push(self.lower_with(with)?);
        }
        tokens.push(self.lower_select_clause(select)?);
        if let Some(from) = &select.from {
            tokens.extend(self.lower_from(from)?);
        }
        if let Some(where_clause) = &select.where_clause {
            let mut children = self.comments(&where_clause.comments, true);
            children.insert(0, PrintToken::keyword("where"));
            children.extend(self.lower_condition(&where_clause.condition)?);
            tokens.push(PrintToken::container(ContainerKind::WhereClause, children));
        }
        if let Some(group_by) = &select.group_by {
            let mut children = vec![PrintToken::keyword("group by")];
            children.extend(self.comments(&group_by.comments, true));
            children.extend(self.lower_expr_list(&group_by.items, true)?);
            tokens.push(PrintToken::container(
                ContainerKind::GroupByClause,
                children,
            ));
        }
        if let Some(having) = &select.having {
            let mut children = vec![PrintToken::keyword("having")];
            children.extend(self.comments(&having.comments, true));
            children.extend(self.lower_condition(&having.condition)?);
            tokens.push(PrintToken::container(ContainerKind::HavingClause, children));
        }
        if let Some(window) = &select.window {
            let mut children = vec![PrintToken::keyword("window")];
            children.extend(self.comments(&window.comments, true));
            for (i, def) in window.defs.iter().enumerate() {
                if i > 0 {
                    children.push(PrintToken::comma(true));
                }
                children.push(self.quoted(&def.name));
                children.push(PrintToken::keyword("as"));
                children.push(PrintToken::open_paren());
                children.extend(self.lower_window_spec(&def.spec)?);
                children.push(PrintToken::close_paren());
            }
            tokens.push(PrintToken::container(ContainerKind::WindowClause, children));
        }
        if let Some(order_by) = &select.order_by {
            let mut children = vec![PrintToken::keyword("order by")];
            children.extend(self.comments(&order_by.comments, true));
            children.extend(self.lower_order_items(&order_by.items, true)?);
            tokens.push(PrintToken::container(
                ContainerKind::OrderByClause,
                children,
            ));
        }
        if let Some(limit) = &select.limit {
            let mut children = vec![PrintToken::keyword("limit")];
            children.extend(self.comments(&limit.comments, true));
            children.extend(self.lower_expr(&limit.value)?);
            tokens.push(PrintToken::container(ContainerKind::LimitClause, children));
        }
        if let Some(offset) = &select.offset {
            let mut children = vec![PrintToken::keyword("offset")];
            children.extend(self.comments(&offset.comments, true));
            children.extend(self.lower_expr(&offset.value)?);
            tokens.push(PrintToken::container(ContainerKind::OffsetClause, children));
        }
        if let Some(for_lock) = &select.for_lock {
            tokens.push(self.lower_for(for_lock));
        }
        Ok(tokens)
    }

    fn lower_select_clause(&mut self, select: &SelectQuery) -> Result<PrintToken, FormatError> {
        let clause = &select.select;
        let mut children = vec![PrintToken::keyword("select")];
        children.extend(self.comments(&clause.comments, true));
        match &clause.distinct {
            Some(Distinct::Distinct) => children.push(PrintToken::keyword("distinct")),
            Some(Distinct::On(values)) => {
                children.push(PrintToken::keyword("distinct"));
                children.push(PrintToken::keyword("on"));
                children.push(PrintToken::open_paren());
                children.extend(self.lower_expr_list(values, false)?);
                children.push(PrintToken::close_paren());
            }
            None => {}
        }
        for (i, item) in clause.items.iter().enumerate() {
            if i > 0 {
                children.push(PrintToken::comma(true));
            }
            children.extend(self.lower_select_item(item)?);
        }
        Ok(PrintToken::container(ContainerKind::SelectClause, children))
    }

    fn lower_select_item(&mut self, item: &SelectItem) -> Lowered {
        let mut tokens = self.comments(&item.comments, false);
        tokens.extend(self.lower_expr(&item.value)?);
        if let Some(alias) = &item.alias {
            tokens.push(PrintToken::keyword("as"));
            tokens.push(self.quoted(alias));
        }
        Ok(tokens)
    }

    // -----------------------------------------------------------------------
    // FROM, sources, joins
    // -----------------------------------------------------------------------

    fn lower_from(&mut self, from: &FromClause) -> Lowered {
        let mut children = vec![PrintToken::keyword("from")];
        children.extend(self.comments(&from.comments, true));
        children.extend(self.lower_source(&from.source)?);
        let mut tokens = vec![PrintToken::container(ContainerKind::FromClause, children)];
        for join in &from.joins {
            tokens.push(self.lower_join(join)?);
        }
        Ok(tokens)
    }

    fn lower_join(&mut self, join: &Join) -> Result<PrintToken, FormatError> {
        let mut children = Vec::new();
        if join.natural {
            children.push(PrintToken::keyword("natural"));
        }
        children.push(PrintToken::keyword(match join.kind {
            JoinKind::Inner => "join",
            JoinKind::Left => "left join",
            JoinKind::Right => "right join",
            JoinKind::Full => "full join",
            JoinKind::Cross => "cross join",
        }));
        if join.lateral {
            children.push(PrintToken::keyword("lateral"));
        }
        children.extend(self.lower_source(&join.source)?);
        match &join.constraint {
            Some(JoinConstraint::On(condition)) => {
                children.push(PrintToken::keyword("on"));
                children.extend(self.lower_condition(condition)?);
            }
            Some(JoinConstraint::Using(columns)) => {
                children.push(PrintToken::keyword("using"));
                children.push(PrintToken::open_paren());
                for (i, column) in columns.iter().enumerate() {
                    if i > 0 {
                        children.push(PrintToken::comma(false));
                    }
                    children.push(self.quoted(column));
                }
                children.push(PrintToken::close_paren());
            }
            None => {}
        }
        Ok(PrintToken::container(ContainerKind::JoinClause, children))
    }

    fn lower_source(&mut self, source: &Source) -> Lowered {
        match source {
            Source::Table {
                qualifiers,
                name,
                alias,
                column_aliases,
            } => {
                let mut tokens = Vec::new();
                for qualifier in qualifiers {
                    tokens.push(self.quoted(qualifier));
                    tokens.push(PrintToken::dot());
                }
                tokens.push(self.quoted(name));
                self.lower_source_alias(&mut tokens, alias.as_deref(), column_aliases.as_deref());
                Ok(tokens)
            }
            Source::Subquery {
                query,
                alias,
                column_aliases,
            } => {
                let mut tokens = vec![PrintToken::open_paren()];
                tokens.push(self.lower_subquery(query)?);
                tokens.push(PrintToken::close_paren());
                self.lower_source_alias(&mut tokens, alias.as_deref(), column_aliases.as_deref());
                Ok(tokens)
            }
            Source::Function { name, args, alias } => {
                let mut tokens = Vec::new();
                for qualifier in &name.qualifiers {
                    tokens.push(self.quoted(qualifier));
                    tokens.push(PrintToken::dot());
                }
                tokens.push(PrintToken::identifier(name.name.clone()));
                tokens.push(PrintToken::open_paren_glued());
                tokens.extend(self.lower_expr_list(args, false)?);
                tokens.push(PrintToken::close_paren());
                self.lower_source_alias(&mut tokens, alias.as_deref(), None);
                Ok(tokens)
            }
        }
    }

    fn lower_source_alias(
        &mut self,
        tokens: &mut Vec<PrintToken>,
        alias: Option<&str>,
        column_aliases: Option<&[String]>,
    ) {
        if let Some(alias) = alias {
            tokens.push(PrintToken::keyword("as"));
            tokens.push(self.quoted(alias));
        }
        if let Some(columns) = column_aliases {
            tokens.push(PrintToken::open_paren());
            for (i, column) in columns.iter().enumerate() {
                if i > 0 {
                    tokens.push(PrintToken::comma(false));
                }
                tokens.push(self.quoted(column));
            }
            tokens.push(PrintToken::close_paren());
        }
    }

    /// A nested query wrapped in a SubQuery container: indented in pretty
    /// mode, with the closing paren dropped back to the caller's level.
    fn lower_subquery(&mut self, query: &Query) -> Result<PrintToken, FormatError> {
        let mut children = self.lower_query(query)?;
        children.push(PrintToken::line_break(true));
        Ok(PrintToken::container(ContainerKind::SubQuery, children))
    }

    // -----------------------------------------------------------------------
    // WITH clause
    // -----------------------------------------------------------------------

    fn lower_with(&mut self, with: &WithClause) -> Result<PrintToken, FormatError> {
        let mut children = Vec::new();
        children.push(PrintToken::keyword(if with.recursive {
            "with recursive"
        } else {
            "with"
        }));
        children.extend(self.comments(&with.comments, true));
        // Import comments belong to the outermost WITH clause only.
        for name in std::mem::take(&mut self.import_names) {
            children.push(PrintToken::container(
                ContainerKind::CteImport,
                vec![PrintToken::comment(format!("import {name}.cte.sql"))],
            ));
        }
        for (i, table) in with.tables.iter().enumerate() {
            if i > 0 {
                children.push(PrintToken::comma(true));
            }
            children.push(self.lower_common_table(table)?);
        }
        Ok(PrintToken::container(ContainerKind::WithClause, children))
    }

    fn lower_common_table(&mut self, table: &CommonTable) -> Result<PrintToken, FormatError> {
        let mut children = self.comments(&table.comments, false);
        children.push(self.quoted(&table.name));
        if let Some(columns) = &table.column_aliases {
            children.push(PrintToken::open_paren());
            for (i, column) in columns.iter().enumerate() {
                if i > 0 {
                    children.push(PrintToken::comma(false));
                }
                children.push(self.quoted(column));
            }
            children.push(PrintToken::close_paren());
        }
        children.push(PrintToken::keyword("as"));
        match table.materialized {
            Some(Materialized::Materialized) => {
                children.push(PrintToken::keyword("materialized"));
            }
            Some(Materialized::NotMaterialized) => {
                children.push(PrintToken::keyword("not"));
                children.push(PrintToken::keyword("materialized"));
            }
            None => {}
        }
        children.push(PrintToken::open_paren());
        children.push(self.lower_subquery(&table.query)?);
        children.push(PrintToken::close_paren());

        if self.opts.cte_oneline || self.oneline_ctes.contains(&table.name) {
            Ok(PrintToken::container_oneline(
                ContainerKind::CommonTable,
                children,
            ))
        } else {
            Ok(PrintToken::container(ContainerKind::CommonTable, children))
        }
    }

    // -----------------------------------------------------------------------
    // VALUES
    // -----------------------------------------------------------------------

    fn lower_values(&mut self, values: &ValuesQuery) -> Lowered {
        let mut children = vec![PrintToken::keyword("values")];
        children.extend(self.comments(&values.comments, true));
        for (i, row) in values.rows.iter().enumerate() {
            if i > 0 {
                children.push(PrintToken::comma(true));
            }
            children.push(PrintToken::open_paren());
            children.extend(self.lower_expr_list(row, false)?);
            children.push(PrintToken::close_paren());
        }
        Ok(vec![PrintToken::container(ContainerKind::Values, children)])
    }

    // -----------------------------------------------------------------------
    // FOR clause
    // -----------------------------------------------------------------------

    fn lower_for(&mut self, for_lock: &ForClause) -> PrintToken {
        let mut children = vec![PrintToken::keyword("for")];
        children.extend(self.comments(&for_lock.comments, true));
        children.push(PrintToken::keyword(for_lock.mode.as_str()));
        if !for_lock.tables.is_empty() {
            children.push(PrintToken::keyword("of"));
            for (i, table) in for_lock.tables.iter().enumerate() {
                if i > 0 {
                    children.push(PrintToken::comma(false));
                }
                children.push(self.quoted(table));
            }
        }
        match for_lock.wait {
            Some(requel_ast::LockWait::Nowait) => {
                children.push(PrintToken::keyword("nowait"));
            }
            Some(requel_ast::LockWait::SkipLocked) => {
                children.push(PrintToken::keyword("skip"));
                children.push(PrintToken::keyword("locked"));
            }
            None => {}
        }
        PrintToken::container(ContainerKind::ForClause, children)
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    /// A clause-level condition: its top-level AND chain is breakable.
    fn lower_condition(&mut self, condition: &Expr) -> Lowered {
        self.lower_expr_inner(condition, true)
    }

    fn lower_expr(&mut self, expr: &Expr) -> Lowered {
        self.lower_expr_inner(expr, false)
    }

    fn lower_expr_list(&mut self, exprs: &[Expr], breakable: bool) -> Lowered {
        let mut tokens = Vec::new();
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                tokens.push(PrintToken::comma(breakable));
            }
            tokens.extend(self.lower_expr(expr)?);
        }
        Ok(tokens)
    }

    fn lower_order_items(&mut self, items: &[OrderItem], breakable: bool) -> Lowered {
        let mut tokens = Vec::new();
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                tokens.push(PrintToken::comma(breakable));
            }
            tokens.extend(self.lower_expr(&item.value)?);
            match item.direction {
                Some(requel_ast::SortDirection::Asc) => {
                    tokens.push(PrintToken::keyword("asc"));
                }
                Some(requel_ast::SortDirection::Desc) => {
                    tokens.push(PrintToken::keyword("desc"));
                }
                None => {}
            }
            match item.nulls {
                Some(requel_ast::NullsOrder::First) => {
                    tokens.push(PrintToken::keyword("nulls first"));
                }
                Some(requel_ast::NullsOrder::Last) => {
                    tokens.push(PrintToken::keyword("nulls last"));
                }
                None => {}
            }
        }
        Ok(tokens)
    }

    #[allow(clippy::too_many_lines)]
    fn lower_expr_inner(&mut self, expr: &Expr, and_breakable: bool) -> Lowered {
        match expr {
            Expr::Literal(literal, _) => Ok(vec![PrintToken::literal(literal.raw.clone())]),

            Expr::Column(column, _) => {
                let mut tokens = Vec::new();
                for qualifier in &column.qualifiers {
                    tokens.push(self.quoted(qualifier));
                    tokens.push(PrintToken::dot());
                }
                match &column.target {
                    ColumnTarget::Name(name) => tokens.push(self.quoted(name)),
                    ColumnTarget::Wildcard => tokens.push(PrintToken::operator("*")),
                }
                Ok(tokens)
            }

            Expr::Parameter(param, _) => Ok(vec![self.lower_param(param)]),

            Expr::Binary {
                op, left, right, ..
            } => {
                let mut tokens = self.lower_expr_inner(left, and_breakable)?;
                match op {
                    requel_ast::BinaryOp::And => {
                        tokens.push(if and_breakable {
                            PrintToken::keyword_breakable("and")
                        } else {
                            PrintToken::keyword("and")
                        });
                    }
                    requel_ast::BinaryOp::Or => tokens.push(PrintToken::keyword("or")),
                    other => tokens.push(PrintToken::operator(other.as_str())),
                }
                tokens.extend(self.lower_expr_inner(right, and_breakable)?);
                Ok(tokens)
            }

            Expr::Unary { op, operand, .. } => {
                let mut tokens = Vec::new();
                match op {
                    requel_ast::UnaryOp::Not => tokens.push(PrintToken::keyword("not")),
                    requel_ast::UnaryOp::Plus => {
                        let mut sign = PrintToken::operator("+");
                        sign.glue_right = true;
                        tokens.push(sign);
                    }
                    requel_ast::UnaryOp::Minus => {
                        let mut sign = PrintToken::operator("-");
                        sign.glue_right = true;
                        tokens.push(sign);
                    }
                }
                tokens.extend(self.lower_expr(operand)?);
                Ok(tokens)
            }

            Expr::Paren { inner, .. } => {
                let mut tokens = vec![PrintToken::open_paren()];
                tokens.extend(self.lower_expr(inner)?);
                tokens.push(PrintToken::close_paren());
                Ok(tokens)
            }

            Expr::FunctionCall {
                name,
                args,
                distinct,
                order_by,
                filter,
                over,
                within_group,
                ..
            } => self.lower_function_call(
                name,
                args,
                *distinct,
                order_by.as_deref(),
                filter.as_deref(),
                over.as_ref(),
                within_group.as_deref(),
            ),

            Expr::Case {
                subject,
                branches,
                else_value,
                ..
            } => {
                let mut children = vec![PrintToken::keyword("case")];
                if let Some(subject) = subject {
                    children.extend(self.lower_expr(subject)?);
                }
                for (when, then) in branches {
                    let mut branch = vec![PrintToken::keyword("when")];
                    branch.extend(self.lower_expr(when)?);
                    branch.push(PrintToken::keyword("then"));
                    branch.extend(self.lower_expr(then)?);
                    children.push(PrintToken::container(ContainerKind::CaseBranch, branch));
                }
                if let Some(else_value) = else_value {
                    let mut branch = vec![PrintToken::keyword("else")];
                    branch.extend(self.lower_expr(else_value)?);
                    children.push(PrintToken::container(ContainerKind::CaseBranch, branch));
                }
                children.push(PrintToken::line_break(true));
                children.push(PrintToken::keyword("end"));
                Ok(vec![PrintToken::container(
                    ContainerKind::CaseExpression,
                    children,
                )])
            }

            Expr::Between {
                value,
                low,
                high,
                negated,
                ..
            } => {
                let mut tokens = self.lower_expr(value)?;
                if *negated {
                    tokens.push(PrintToken::keyword("not"));
                }
                tokens.push(PrintToken::keyword("between"));
                tokens.extend(self.lower_expr(low)?);
                tokens.push(PrintToken::keyword("and"));
                tokens.extend(self.lower_expr(high)?);
                Ok(tokens)
            }

            Expr::In {
                value,
                set,
                negated,
                ..
            } => {
                let mut tokens = self.lower_expr(value)?;
                if *negated {
                    tokens.push(PrintToken::keyword("not"));
                }
                tokens.push(PrintToken::keyword("in"));
                tokens.push(PrintToken::open_paren());
                match set {
                    InSet::List(items) => tokens.extend(self.lower_expr_list(items, false)?),
                    InSet::Subquery(query) => tokens.push(self.lower_subquery(query)?),
                }
                tokens.push(PrintToken::close_paren());
                Ok(tokens)
            }

            Expr::Is {
                value,
                target,
                negated,
                ..
            } => {
                let mut tokens = self.lower_expr(value)?;
                match target {
                    IsTarget::Null | IsTarget::True | IsTarget::False => {
                        tokens.push(PrintToken::keyword("is"));
                        if *negated {
                            tokens.push(PrintToken::keyword("not"));
                        }
                        tokens.push(PrintToken::keyword(match target {
                            IsTarget::Null => "null",
                            IsTarget::True => "true",
                            _ => "false",
                        }));
                    }
                    IsTarget::DistinctFrom(other) => {
                        tokens.push(PrintToken::keyword("is distinct from"));
                        tokens.extend(self.lower_expr(other)?);
                    }
                    IsTarget::NotDistinctFrom(other) => {
                        tokens.push(PrintToken::keyword("is not distinct from"));
                        tokens.extend(self.lower_expr(other)?);
                    }
                }
                Ok(tokens)
            }

            Expr::Like {
                value,
                pattern,
                escape,
                similar,
                case_insensitive,
                negated,
                ..
            } => {
                let mut tokens = self.lower_expr(value)?;
                if *negated {
                    tokens.push(PrintToken::keyword("not"));
                }
                tokens.push(PrintToken::keyword(if *similar {
                    "similar to"
                } else if *case_insensitive {
                    "ilike"
                } else {
                    "like"
                }));
                tokens.extend(self.lower_expr(pattern)?);
                if let Some(escape) = escape {
                    tokens.push(PrintToken::keyword("escape"));
                    tokens.extend(self.lower_expr(escape)?);
                }
                Ok(tokens)
            }

            Expr::Exists { query, negated, .. } => {
                let mut tokens = Vec::new();
                if *negated {
                    tokens.push(PrintToken::keyword("not"));
                }
                tokens.push(PrintToken::keyword("exists"));
                tokens.push(PrintToken::open_paren());
                tokens.push(self.lower_subquery(query)?);
                tokens.push(PrintToken::close_paren());
                Ok(tokens)
            }

            Expr::Cast {
                value,
                type_ref,
                style,
                ..
            } => match style {
                CastStyle::CastAs => {
                    let mut tokens = vec![PrintToken::keyword("cast")];
                    tokens.push(PrintToken::open_paren_glued());
                    tokens.extend(self.lower_expr(value)?);
                    tokens.push(PrintToken::keyword("as"));
                    tokens.extend(self.lower_type_ref(type_ref));
                    tokens.push(PrintToken::close_paren());
                    Ok(tokens)
                }
                CastStyle::DoubleColon => {
                    let mut tokens = self.lower_expr(value)?;
                    tokens.push(PrintToken::double_colon());
                    tokens.extend(self.lower_type_ref(type_ref));
                    Ok(tokens)
                }
            },

            Expr::Array { elements, .. } => {
                let mut tokens = vec![PrintToken::keyword("array")];
                tokens.push(PrintToken::open_bracket());
                tokens.extend(self.lower_expr_list(elements, false)?);
                tokens.push(PrintToken::close_bracket());
                Ok(tokens)
            }

            Expr::Interval {
                literal, qualifier, ..
            } => {
                let mut tokens = vec![PrintToken::keyword("interval")];
                tokens.push(PrintToken::literal(literal.raw.clone()));
                if let Some(qualifier) = qualifier {
                    tokens.push(PrintToken::keyword(qualifier.clone()));
                }
                Ok(tokens)
            }

            Expr::Extract { field, from, .. } => {
                let mut tokens = vec![PrintToken::keyword("extract")];
                tokens.push(PrintToken::open_paren_glued());
                tokens.push(PrintToken::keyword(field.clone()));
                tokens.push(PrintToken::keyword("from"));
                tokens.extend(self.lower_expr(from)?);
                tokens.push(PrintToken::close_paren());
                Ok(tokens)
            }

            Expr::Position {
                needle, haystack, ..
            } => {
                let mut tokens = vec![PrintToken::keyword("position")];
                tokens.push(PrintToken::open_paren_glued());
                tokens.extend(self.lower_expr(needle)?);
                tokens.push(PrintToken::keyword("in"));
                tokens.extend(self.lower_expr(haystack)?);
                tokens.push(PrintToken::close_paren());
                Ok(tokens)
            }

            Expr::Substring {
                target,
                start,
                length,
                pattern,
                escape,
                keyword_form,
                ..
            } => {
                let mut tokens = vec![PrintToken::keyword("substring")];
                tokens.push(PrintToken::open_paren_glued());
                tokens.extend(self.lower_expr(target)?);
                if let Some(pattern) = pattern {
                    tokens.push(PrintToken::keyword("similar"));
                    tokens.extend(self.lower_expr(pattern)?);
                    if let Some(escape) = escape {
                        tokens.push(PrintToken::keyword("escape"));
                        tokens.extend(self.lower_expr(escape)?);
                    }
                } else if *keyword_form {
                    if let Some(start) = start {
                        tokens.push(PrintToken::keyword("from"));
                        tokens.extend(self.lower_expr(start)?);
                    }
                    if let Some(length) = length {
                        tokens.push(PrintToken::keyword("for"));
                        tokens.extend(self.lower_expr(length)?);
                    }
                } else {
                    if let Some(start) = start {
                        tokens.push(PrintToken::comma(false));
                        tokens.extend(self.lower_expr(start)?);
                    }
                    if let Some(length) = length {
                        tokens.push(PrintToken::comma(false));
                        tokens.extend(self.lower_expr(length)?);
                    }
                }
                tokens.push(PrintToken::close_paren());
                Ok(tokens)
            }

            Expr::Trim {
                side,
                characters,
                target,
                postgres_style,
                ..
            } => {
                let mut tokens = vec![PrintToken::keyword("trim")];
                tokens.push(PrintToken::open_paren_glued());
                if *side != TrimSide::Both {
                    tokens.push(PrintToken::keyword(side.as_str()));
                }
                if *postgres_style {
                    tokens.push(PrintToken::keyword("from"));
                    tokens.extend(self.lower_expr(target)?);
                    if let Some(characters) = characters {
                        tokens.push(PrintToken::comma(false));
                        tokens.extend(self.lower_expr(characters)?);
                    }
                } else if let Some(characters) = characters {
                    tokens.extend(self.lower_expr(characters)?);
                    tokens.push(PrintToken::keyword("from"));
                    tokens.extend(self.lower_expr(target)?);
                } else {
                    tokens.extend(self.lower_expr(target)?);
                }
                tokens.push(PrintToken::close_paren());
                Ok(tokens)
            }

            Expr::Overlay {
                target,
                placing,
                from,
                for_length,
                ..
            } => {
                let mut tokens = vec![PrintToken::keyword("overlay")];
                tokens.push(PrintToken::open_paren_glued());
                tokens.extend(self.lower_expr(target)?);
                tokens.push(PrintToken::keyword("placing"));
                tokens.extend(self.lower_expr(placing)?);
                tokens.push(PrintToken::keyword("from"));
                tokens.extend(self.lower_expr(from)?);
                if let Some(for_length) = for_length {
                    tokens.push(PrintToken::keyword("for"));
                    tokens.extend(self.lower_expr(for_length)?);
                }
                tokens.push(PrintToken::close_paren());
                Ok(tokens)
            }

            Expr::AtTimeZone { value, zone, .. } => {
                let mut tokens = self.lower_expr(value)?;
                tokens.push(PrintToken::keyword("at time zone"));
                tokens.extend(self.lower_expr(zone)?);
                Ok(tokens)
            }

            Expr::Subquery(query, _) => {
                let mut tokens = vec![PrintToken::open_paren()];
                tokens.push(self.lower_subquery(query)?);
                tokens.push(PrintToken::close_paren());
                Ok(tokens)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn lower_function_call(
        &mut self,
        name: &requel_ast::QualifiedName,
        args: &[Expr],
        distinct: bool,
        order_by: Option<&[OrderItem]>,
        filter: Option<&Expr>,
        over: Option<&OverWindow>,
        within_group: Option<&[OrderItem]>,
    ) -> Lowered {
        if over.is_some() && within_group.is_some() {
            return Err(FormatError::new(
                "function call has both OVER and WITHIN GROUP",
            ));
        }

        let mut tokens = Vec::new();
        for qualifier in &name.qualifiers {
            tokens.push(self.quoted(qualifier));
            tokens.push(PrintToken::dot());
        }
        tokens.push(PrintToken::identifier(name.name.clone()));
        tokens.push(PrintToken::open_paren_glued());
        if distinct {
            tokens.push(PrintToken::keyword("distinct"));
        }
        tokens.extend(self.lower_expr_list(args, false)?);
        if let Some(items) = order_by {
            tokens.push(PrintToken::keyword("order by"));
            tokens.extend(self.lower_order_items(items, false)?);
        }
        tokens.push(PrintToken::close_paren());

        if let Some(filter) = filter {
            tokens.push(PrintToken::keyword("filter"));
            tokens.push(PrintToken::open_paren());
            tokens.push(PrintToken::keyword("where"));
            tokens.extend(self.lower_expr(filter)?);
            tokens.push(PrintToken::close_paren());
        }
        if let Some(items) = within_group {
            tokens.push(PrintToken::keyword("within group"));
            tokens.push(PrintToken::open_paren());
            tokens.push(PrintToken::keyword("order by"));
            tokens.extend(self.lower_order_items(items, false)?);
            tokens.push(PrintToken::close_paren());
        }
        if let Some(over) = over {
            tokens.push(PrintToken::keyword("over"));
            match over {
                OverWindow::Named(window) => tokens.push(self.quoted(window)),
                OverWindow::Spec(spec) => {
                    tokens.push(PrintToken::open_paren());
                    tokens.extend(self.lower_window_spec(spec)?);
                    tokens.push(PrintToken::close_paren());
                }
            }
        }
        Ok(tokens)
    }

    fn lower_window_spec(&mut self, spec: &WindowSpec) -> Lowered {
        let mut tokens = Vec::new();
        if let Some(base) = &spec.base {
            tokens.push(self.quoted(base));
        }
        if !spec.partition_by.is_empty() {
            tokens.push(PrintToken::keyword("partition by"));
            tokens.extend(self.lower_expr_list(&spec.partition_by, false)?);
        }
        if !spec.order_by.is_empty() {
            tokens.push(PrintToken::keyword("order by"));
            tokens.extend(self.lower_order_items(&spec.order_by, false)?);
        }
        if let Some(frame) = &spec.frame {
            tokens.extend(self.lower_frame(frame)?);
        }
        Ok(tokens)
    }

    fn lower_frame(&mut self, frame: &FrameSpec) -> Lowered {
        let mut tokens = vec![PrintToken::keyword(match frame.unit {
            FrameUnit::Rows => "rows",
            FrameUnit::Range => "range",
            FrameUnit::Groups => "groups",
        })];
        if let Some(end) = &frame.end {
            tokens.push(PrintToken::keyword("between"));
            tokens.extend(self.lower_frame_bound(&frame.start)?);
            tokens.push(PrintToken::keyword("and"));
            tokens.extend(self.lower_frame_bound(end)?);
        } else {
            tokens.extend(self.lower_frame_bound(&frame.start)?);
        }
        if let Some(exclude) = frame.exclude {
            tokens.push(PrintToken::keyword("exclude"));
            tokens.push(PrintToken::keyword(match exclude {
                requel_ast::FrameExclude::NoOthers => "no others",
                requel_ast::FrameExclude::CurrentRow => "current row",
                requel_ast::FrameExclude::Group => "group",
                requel_ast::FrameExclude::Ties => "ties",
            }));
        }
        Ok(tokens)
    }

    fn lower_frame_bound(&mut self, bound: &FrameBound) -> Lowered {
        match bound {
            FrameBound::UnboundedPreceding => {
                Ok(vec![PrintToken::keyword("unbounded preceding")])
            }
            FrameBound::UnboundedFollowing => {
                Ok(vec![PrintToken::keyword("unbounded following")])
            }
            FrameBound::CurrentRow => Ok(vec![PrintToken::keyword("current row")]),
            FrameBound::Preceding(expr) => {
                let mut tokens = self.lower_expr(expr)?;
                tokens.push(PrintToken::keyword("preceding"));
                Ok(tokens)
            }
            FrameBound::Following(expr) => {
                let mut tokens = self.lower_expr(expr)?;
                tokens.push(PrintToken::keyword("following"));
                Ok(tokens)
            }
        }
    }

    fn lower_type_ref(&mut self, type_ref: &TypeRef) -> Vec<PrintToken> {
        let mut tokens = vec![PrintToken::keyword(type_ref.name.clone())];
        if type_ref.precision.is_some() || type_ref.scale.is_some() {
            tokens.push(PrintToken::open_paren_glued());
            if let Some(precision) = type_ref.precision {
                tokens.push(PrintToken::literal(precision.to_string()));
            }
            if let Some(scale) = type_ref.scale {
                tokens.push(PrintToken::comma(false));
                tokens.push(PrintToken::literal(scale.to_string()));
            }
            tokens.push(PrintToken::close_paren());
        }
        match type_ref.timezone {
            Some(TimeZoneSpec::With) => {
                tokens.push(PrintToken::keyword("with time zone"));
            }
            Some(TimeZoneSpec::Without) => {
                tokens.push(PrintToken::keyword("without time zone"));
            }
            None => {}
        }
        tokens
    }

    fn lower_param(&mut self, param: &ParamRef) -> PrintToken {
        PrintToken::parameter(self.params.placeholder(param))
    }

    /// Quote an identifier with the configured escape pair, doubling any
    /// embedded closing character.
    fn quoted(&self, name: &str) -> PrintToken {
        let (start, end) = &self.opts.identifier_escape;
        let doubled = format!("{end}{end}");
        let escaped = name.replace(end.as_str(), &doubled);
        PrintToken::identifier(format!("{start}{escaped}{end}"))
    }
}
