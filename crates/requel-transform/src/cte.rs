//! CTE dependency tracing.
//!
//! Builds a directed graph over the common tables of a `WITH` clause: an
//! edge `A → B` exists iff the body of `A` references `B` as an
//! unqualified table source under `A`'s scope. Reference detection is
//! purely syntactic; an inner `WITH` clause shadows outer names for the
//! whole subtree it governs.
//!
//! Leaf-ness is decided on the full graph: a CTE is a leaf iff the outer
//! query references it and no *other* CTE references it. A recursive
//! CTE's self-reference therefore does not disqualify it from being a
//! leaf, but it does make the graph cyclic.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use requel_ast::{
    Distinct, Expr, FrameBound, InSet, IsTarget, Join, OrderItem, OverWindow, Query, SelectQuery,
    Source, WindowSpec, WithClause,
};

/// The dependency graph of one `WITH` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CteGraph {
    /// CTE names in declaration order.
    names: Vec<String>,
    /// `edges[a]` = names referenced by the body of `a`.
    edges: BTreeMap<String, BTreeSet<String>>,
    /// Names referenced by the outer query (outside the WITH clause).
    outer_refs: BTreeSet<String>,
}

impl CteGraph {
    /// Trace the WITH clause of a simple select. Returns `None` when the
    /// query carries no WITH clause.
    #[must_use]
    pub fn trace(select: &SelectQuery) -> Option<Self> {
        let with = select.with.as_ref()?;
        let universe: HashSet<String> =
            with.tables.iter().map(|t| t.name.clone()).collect();

        let mut outer_refs = BTreeSet::new();
        {
            let mut walker = RefWalker::new(&universe, &mut outer_refs);
            walker.walk_select_sans_with(select);
        }
        Some(Self::assemble(with, &universe, outer_refs))
    }

    /// Trace the WITH clause of the leftmost select of a query. Set
    /// operands to the right are part of the outer query for reference
    /// purposes: the CTEs are in scope for the whole chain.
    #[must_use]
    pub fn trace_query(query: &Query) -> Option<Self> {
        fn leftmost(query: &Query) -> Option<&SelectQuery> {
            match query {
                Query::Select(select) => Some(select),
                Query::Binary(binary) => leftmost(&binary.left),
                Query::Values(_) => None,
            }
        }

        let select = leftmost(query)?;
        let with = select.with.as_ref()?;
        let universe: HashSet<String> =
            with.tables.iter().map(|t| t.name.clone()).collect();

        let mut outer_refs = BTreeSet::new();
        {
            let mut walker = RefWalker::new(&universe, &mut outer_refs);
            walker.walk_query_skipping_root_with(query);
        }
        Some(Self::assemble(with, &universe, outer_refs))
    }

    /// Build the graph from the per-CTE reference edges plus the already
    /// collected outer references.
    fn assemble(
        with: &WithClause,
        universe: &HashSet<String>,
        outer_refs: BTreeSet<String>,
    ) -> Self {
        let mut edges = BTreeMap::new();
        for table in &with.tables {
            let mut refs = BTreeSet::new();
            let mut walker = RefWalker::new(universe, &mut refs);
            walker.walk_query(&table.query);
            edges.insert(table.name.clone(), refs);
        }

        Self {
            names: with.tables.iter().map(|t| t.name.clone()).collect(),
            edges,
            outer_refs,
        }
    }

    /// CTE names in declaration order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The names referenced by the body of `name`.
    #[must_use]
    pub fn references(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.edges.get(name)
    }

    /// The names referenced by the outer query.
    #[must_use]
    pub const fn outer_references(&self) -> &BTreeSet<String> {
        &self.outer_refs
    }

    /// Leaf CTEs: referenced by the outer query, referenced by no other
    /// CTE. Declaration order.
    #[must_use]
    pub fn leaf_names(&self) -> Vec<&str> {
        self.names
            .iter()
            .filter(|name| {
                self.outer_refs.contains(*name)
                    && !self.edges.iter().any(|(from, refs)| {
                        from != *name && refs.contains(*name)
                    })
            })
            .map(String::as_str)
            .collect()
    }

    /// A topological ordering in which every CTE appears after the CTEs
    /// its body references, or `None` when the graph is cyclic (including
    /// self-references). Declaration order breaks ties.
    #[must_use]
    pub fn topo_order(&self) -> Option<Vec<&str>> {
        // Kahn's algorithm over the reversed edges: a CTE is ready once
        // everything it references has been emitted.
        let mut pending: BTreeMap<&str, usize> = BTreeMap::new();
        for name in &self.names {
            let refs = self.edges.get(name).map_or(0, |r| {
                r.iter().filter(|r| self.edges.contains_key(*r)).count()
            });
            pending.insert(name, refs);
        }

        let mut queue: VecDeque<&str> = self
            .names
            .iter()
            .filter(|n| pending.get(n.as_str()) == Some(&0))
            .map(String::as_str)
            .collect();

        let mut order = Vec::with_capacity(self.names.len());
        while let Some(ready) = queue.pop_front() {
            order.push(ready);
            for name in &self.names {
                if let Some(refs) = self.edges.get(name) {
                    if refs.contains(ready) && name != ready {
                        let count = pending.get_mut(name.as_str())?;
                        *count -= 1;
                        if *count == 0 {
                            queue.push_back(name);
                        }
                    }
                }
            }
        }

        (order.len() == self.names.len()).then_some(order)
    }

    /// Whether the graph has a cycle (self-references included).
    #[must_use]
    pub fn is_cyclic(&self) -> bool {
        self.topo_order().is_none()
    }
}

// ---------------------------------------------------------------------------
// Reference walker
// ---------------------------------------------------------------------------

/// Walks a subtree recording unqualified table-source names that resolve
/// to CTEs of the traced WITH clause, honouring inner-WITH shadowing.
struct RefWalker<'a> {
    universe: &'a HashSet<String>,
    shadow: Vec<HashSet<String>>,
    out: &'a mut BTreeSet<String>,
}

impl<'a> RefWalker<'a> {
    fn new(universe: &'a HashSet<String>, out: &'a mut BTreeSet<String>) -> Self {
        Self {
            universe,
            shadow: Vec::new(),
            out,
        }
    }

    fn record(&mut self, name: &str) {
        if self.universe.contains(name) && !self.shadow.iter().any(|s| s.contains(name)) {
            self.out.insert(name.to_owned());
        }
    }

    fn walk_query(&mut self, query: &Query) {
        match query {
            Query::Select(select) => self.walk_select(select),
            Query::Binary(binary) => {
                self.walk_query(&binary.left);
                self.walk_query(&binary.right);
            }
            Query::Values(values) => {
                for row in &values.rows {
                    for expr in row {
                        self.walk_expr(expr);
                    }
                }
            }
        }
    }

    /// Walk a query whose leftmost select carries the WITH clause being
    /// traced: that clause itself is skipped, everything else counts as
    /// the outer query.
    fn walk_query_skipping_root_with(&mut self, query: &Query) {
        match query {
            Query::Select(select) => self.walk_select_sans_with(select),
            Query::Binary(binary) => {
                self.walk_query_skipping_root_with(&binary.left);
                self.walk_query(&binary.right);
            }
            Query::Values(values) => {
                for row in &values.rows {
                    for expr in row {
                        self.walk_expr(expr);
                    }
                }
            }
        }
    }

    fn walk_select(&mut self, select: &SelectQuery) {
        if let Some(with) = &select.with {
            // Inner WITH: its names shadow ours for the whole select,
            // including the inner CTE bodies themselves.
            self.shadow
                .push(with.tables.iter().map(|t| t.name.clone()).collect());
            for table in &with.tables {
                self.walk_query(&table.query);
            }
            self.walk_select_sans_with(select);
            self.shadow.pop();
        } else {
            self.walk_select_sans_with(select);
        }
    }

    /// Walk every clause of a select except its WITH clause.
    fn walk_select_sans_with(&mut self, select: &SelectQuery) {
        if let Some(Distinct::On(values)) = &select.select.distinct {
            for expr in values {
                self.walk_expr(expr);
            }
        }
        for item in &select.select.items {
            self.walk_expr(&item.value);
        }
        if let Some(from) = &select.from {
            self.walk_source(&from.source);
            for join in &from.joins {
                self.walk_join(join);
            }
        }
        if let Some(where_clause) = &select.where_clause {
            self.walk_expr(&where_clause.condition);
        }
        if let Some(group_by) = &select.group_by {
            for expr in &group_by.items {
                self.walk_expr(expr);
            }
        }
        if let Some(having) = &select.having {
            self.walk_expr(&having.condition);
        }
        if let Some(window) = &select.window {
            for def in &window.defs {
                self.walk_window_spec(&def.spec);
            }
        }
        if let Some(order_by) = &select.order_by {
            self.walk_order_items(&order_by.items);
        }
        if let Some(limit) = &select.limit {
            self.walk_expr(&limit.value);
        }
        if let Some(offset) = &select.offset {
            self.walk_expr(&offset.value);
        }
    }

    fn walk_join(&mut self, join: &Join) {
        self.walk_source(&join.source);
        if let Some(requel_ast::JoinConstraint::On(condition)) = &join.constraint {
            self.walk_expr(condition);
        }
    }

    fn walk_source(&mut self, source: &Source) {
        match source {
            Source::Table {
                qualifiers, name, ..
            } => {
                if qualifiers.is_empty() {
                    self.record(name);
                }
            }
            Source::Subquery { query, .. } => self.walk_query(query),
            Source::Function { args, .. } => {
                for arg in args {
                    self.walk_expr(arg);
                }
            }
        }
    }

    fn walk_order_items(&mut self, items: &[OrderItem]) {
        for item in items {
            self.walk_expr(&item.value);
        }
    }

    fn walk_window_spec(&mut self, spec: &WindowSpec) {
        for expr in &spec.partition_by {
            self.walk_expr(expr);
        }
        self.walk_order_items(&spec.order_by);
        if let Some(frame) = &spec.frame {
            self.walk_frame_bound(&frame.start);
            if let Some(end) = &frame.end {
                self.walk_frame_bound(end);
            }
        }
    }

    fn walk_frame_bound(&mut self, bound: &FrameBound) {
        if let FrameBound::Preceding(expr) | FrameBound::Following(expr) = bound {
            self.walk_expr(expr);
        }
    }

    #[allow(clippy::too_many_lines)]
    fn walk_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(..) | Expr::Column(..) | Expr::Parameter(..) => {}
            Expr::Binary { left, right, .. } => {
                self.walk_expr(left);
                self.walk_expr(right);
            }
            Expr::Unary { operand, .. } => self.walk_expr(operand),
            Expr::Paren { inner, .. } => self.walk_expr(inner),
            Expr::FunctionCall {
                args,
                order_by,
                filter,
                over,
                within_group,
                ..
            } => {
                for arg in args {
                    self.walk_expr(arg);
                }
                if let Some(items) = order_by {
                    self.walk_order_items(items);
                }
                if let Some(filter) = filter {
                    self.walk_expr(filter);
                }
                if let Some(OverWindow::Spec(spec)) = over {
                    self.walk_window_spec(spec);
                }
                if let Some(items) = within_group {
                    self.walk_order_items(items);
                }
            }
            Expr::Case {
                subject,
                branches,
                else_value,
                ..
            } => {
                if let Some(subject) = subject {
                    self.walk_expr(subject);
                }
                for (when, then) in branches {
                    self.walk_expr(when);
                    self.walk_expr(then);
                }
                if let Some(else_value) = else_value {
                    self.walk_expr(else_value);
                }
            }
            Expr::Between {
                value, low, high, ..
            } => {
                self.walk_expr(value);
                self.walk_expr(low);
                self.walk_expr(high);
            }
            Expr::In { value, set, .. } => {
                self.walk_expr(value);
                match set {
                    InSet::List(items) => {
                        for item in items {
                            self.walk_expr(item);
                        }
                    }
                    InSet::Subquery(query) => self.walk_query(query),
                }
            }
            Expr::Is { value, target, .. } => {
                self.walk_expr(value);
                if let IsTarget::DistinctFrom(other) | IsTarget::NotDistinctFrom(other) = target
                {
                    self.walk_expr(other);
                }
            }
            Expr::Like {
                value,
                pattern,
                escape,
                ..
            } => {
                self.walk_expr(value);
                self.walk_expr(pattern);
                if let Some(escape) = escape {
                    self.walk_expr(escape);
                }
            }
            Expr::Exists { query, .. } => self.walk_query(query),
            Expr::Cast { value, .. } => self.walk_expr(value),
            Expr::Array { elements, .. } => {
                for element in elements {
                    self.walk_expr(element);
                }
            }
            Expr::Interval { .. } => {}
            Expr::Extract { from, .. } => self.walk_expr(from),
            Expr::Position {
                needle, haystack, ..
            } => {
                self.walk_expr(needle);
                self.walk_expr(haystack);
            }
            Expr::Substring {
                target,
                start,
                length,
                pattern,
                escape,
                ..
            } => {
                self.walk_expr(target);
                for part in [start, length, pattern, escape].into_iter().flatten() {
                    self.walk_expr(part);
                }
            }
            Expr::Trim {
                characters, target, ..
            } => {
                if let Some(characters) = characters {
                    self.walk_expr(characters);
                }
                self.walk_expr(target);
            }
            Expr::Overlay {
                target,
                placing,
                from,
                for_length,
                ..
            } => {
                self.walk_expr(target);
                self.walk_expr(placing);
                self.walk_expr(from);
                if let Some(for_length) = for_length {
                    self.walk_expr(for_length);
                }
            }
            Expr::AtTimeZone { value, zone, .. } => {
                self.walk_expr(value);
                self.walk_expr(zone);
            }
            Expr::Subquery(query, _) => self.walk_query(query),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use requel_parser::parse_select;

    fn graph(sql: &str) -> CteGraph {
        let query = parse_select(sql).expect("parse");
        let Query::Select(select) = query else {
            panic!("expected simple select");
        };
        CteGraph::trace(&select).expect("with clause present")
    }

    #[test]
    fn no_with_clause_means_no_graph() {
        let query = parse_select("SELECT 1").expect("parse");
        let Query::Select(select) = query else {
            panic!("expected select");
        };
        assert!(CteGraph::trace(&select).is_none());
    }

    #[test]
    fn edges_and_leaves_on_a_chain() {
        let graph = graph(
            "WITH base_users AS (SELECT id FROM users WHERE active = true), \
             enriched AS (SELECT b.id FROM base_users b) \
             SELECT * FROM enriched",
        );
        assert_eq!(graph.names(), ["base_users", "enriched"]);
        assert!(graph.references("base_users").expect("edges").is_empty());
        assert!(graph
            .references("enriched")
            .expect("edges")
            .contains("base_users"));
        assert!(graph.outer_references().contains("enriched"));
        assert!(!graph.outer_references().contains("base_users"));
        assert_eq!(graph.leaf_names(), vec!["enriched"]);
    }

    #[test]
    fn shared_cte_is_not_a_leaf() {
        // Referenced by the outer query AND another CTE: the full-graph
        // rule keeps it off the leaf list.
        let graph = graph(
            "WITH a AS (SELECT 1 AS x), \
             b AS (SELECT x FROM a) \
             SELECT * FROM a JOIN b USING (x)",
        );
        assert_eq!(graph.leaf_names(), vec!["b"]);
    }

    #[test]
    fn references_found_in_subqueries_and_conditions() {
        let graph = graph(
            "WITH counts AS (SELECT 1 AS n), names AS (SELECT 'a' AS s) \
             SELECT * FROM t \
             WHERE t.n IN (SELECT n FROM counts) \
             AND EXISTS (SELECT 1 FROM names)",
        );
        assert!(graph.outer_references().contains("counts"));
        assert!(graph.outer_references().contains("names"));
    }

    #[test]
    fn qualified_sources_do_not_count() {
        let graph = graph(
            "WITH users AS (SELECT 1) SELECT * FROM public.users",
        );
        assert!(graph.outer_references().is_empty());
        assert!(graph.leaf_names().is_empty());
    }

    #[test]
    fn inner_with_shadows_outer_names() {
        let graph = graph(
            "WITH shared AS (SELECT 1 AS x), \
             wrapper AS ( \
                 WITH shared AS (SELECT 2 AS x) SELECT x FROM shared \
             ) \
             SELECT * FROM wrapper",
        );
        // wrapper's body resolves `shared` to its inner CTE, so no edge.
        assert!(graph.references("wrapper").expect("edges").is_empty());
        assert_eq!(graph.leaf_names(), vec!["wrapper"]);
    }

    #[test]
    fn topological_order_respects_dependencies() {
        let graph = graph(
            "WITH c AS (SELECT * FROM a), \
             a AS (SELECT 1), \
             b AS (SELECT * FROM c) \
             SELECT * FROM b",
        );
        let order = graph.topo_order().expect("acyclic");
        let index = |n: &str| order.iter().position(|o| *o == n).expect("present");
        assert!(index("a") < index("c"));
        assert!(index("c") < index("b"));
    }

    #[test]
    fn recursive_cte_is_cyclic() {
        let graph = graph(
            "WITH RECURSIVE walk AS ( \
                 SELECT 1 AS n UNION ALL SELECT n + 1 FROM walk WHERE n < 10 \
             ) \
             SELECT * FROM walk",
        );
        assert!(graph.is_cyclic());
        assert!(graph.topo_order().is_none());
        // Self-reference does not disqualify leaf-ness.
        assert_eq!(graph.leaf_names(), vec!["walk"]);
    }

    #[test]
    fn mutual_cycle_detected() {
        // Forward references parse fine; the tracer flags the cycle.
        let graph = graph(
            "WITH a AS (SELECT * FROM b), b AS (SELECT * FROM a) SELECT * FROM a",
        );
        assert!(graph.is_cyclic());
    }

    #[test]
    fn trace_query_sees_set_operand_references() {
        let query = parse_select(
            "WITH a AS (SELECT 1 AS x), b AS (SELECT 2 AS x) \
             SELECT x FROM a UNION SELECT x FROM b",
        )
        .expect("parse");
        assert!(matches!(query, Query::Binary(_)));
        let graph = CteGraph::trace_query(&query).expect("with clause");
        assert!(graph.outer_references().contains("a"));
        assert!(graph.outer_references().contains("b"));
        assert_eq!(graph.leaf_names(), vec!["a", "b"]);
    }

    #[test]
    fn values_and_function_sources_are_walked() {
        let graph = graph(
            "WITH seed AS (VALUES (1), (2)), \
             used AS (SELECT * FROM unnest(array[1]) u WHERE 1 IN (SELECT * FROM seed)) \
             SELECT * FROM used",
        );
        assert!(graph.references("used").expect("edges").contains("seed"));
    }
}
