//! Round-trip property: for SQL that parses, formatting and re-parsing
//! yields a structurally equal tree, across formatter option
//! combinations.
//!
//! Parameters are exercised only under the named `:name` style here:
//! positional rewriting (e.g. `:x` → `$1`) is deliberately lossy, so the
//! structural-equality contract applies to renderings that re-parse to
//! the same parameter identities.

use proptest::prelude::*;
use requel::{
    parse_select, BreakStyle, FormatOptions, Formatter, KeywordCase, ParameterStyle,
    ParameterSymbol,
};

fn option_matrix() -> Vec<FormatOptions> {
    vec![
        FormatOptions::default(),
        FormatOptions {
            newline: Some("\n".to_owned()),
            indent_size: Some(2),
            ..FormatOptions::default()
        },
        FormatOptions {
            newline: Some("\n".to_owned()),
            keyword_case: Some(KeywordCase::Upper),
            comma_break: Some(BreakStyle::After),
            and_break: Some(BreakStyle::Before),
            ..FormatOptions::default()
        },
        FormatOptions {
            preset: Some("mysql".to_owned()),
            ..FormatOptions::default()
        },
        FormatOptions {
            newline: Some("\n".to_owned()),
            cte_oneline: Some(true),
            ..FormatOptions::default()
        },
        FormatOptions {
            newline: Some("\n".to_owned()),
            cte_oneline_dependency: Some(true),
            comma_break: Some(BreakStyle::Before),
            ..FormatOptions::default()
        },
    ]
}

fn assert_roundtrip(sql: &str) {
    let parsed = parse_select(sql).expect("original should parse");
    for options in option_matrix() {
        let formatter = Formatter::new(options.clone()).expect("formatter");
        let formatted = formatter.format(&parsed).expect("format");
        let reparsed = parse_select(&formatted.sql).unwrap_or_else(|e| {
            panic!("formatted SQL should re-parse: {e}\nsql: {}", formatted.sql)
        });
        let reformatted = formatter.format(&reparsed).expect("reformat");
        assert_eq!(
            parsed, reparsed,
            "round-trip changed the tree\noptions: {options:?}\nsql: {}",
            formatted.sql
        );
        assert_eq!(
            formatted.sql, reformatted.sql,
            "second format pass changed the text"
        );
    }
}

#[test]
fn roundtrip_basic_selects() {
    assert_roundtrip("SELECT 1");
    assert_roundtrip("SELECT * FROM users");
    assert_roundtrip("SELECT u.id, u.name AS label FROM users u");
    assert_roundtrip("SELECT DISTINCT a, b FROM t");
    assert_roundtrip("SELECT DISTINCT ON (a) a, b FROM t");
    assert_roundtrip("SELECT t.* FROM t");
}

#[test]
fn roundtrip_clauses() {
    assert_roundtrip(
        "SELECT g, count(*) FROM t WHERE x > 0 AND y < 10 GROUP BY g \
         HAVING count(*) > 1 ORDER BY g DESC NULLS LAST LIMIT 10 OFFSET 5",
    );
    assert_roundtrip("SELECT a FROM t FOR UPDATE NOWAIT");
    assert_roundtrip("SELECT a FROM t FOR NO KEY UPDATE OF t SKIP LOCKED");
}

#[test]
fn roundtrip_joins() {
    assert_roundtrip(
        "SELECT * FROM a JOIN b ON a.id = b.id LEFT JOIN c USING (id) \
         CROSS JOIN d NATURAL JOIN e FULL JOIN f ON true",
    );
    assert_roundtrip("SELECT * FROM a, b WHERE a.id = b.id");
    assert_roundtrip("SELECT * FROM t LEFT JOIN LATERAL (SELECT 1) s ON true");
    assert_roundtrip("SELECT * FROM generate_series(1, 10) g");
    assert_roundtrip("SELECT * FROM (SELECT id FROM t) sub (renamed)");
}

#[test]
fn roundtrip_set_operations() {
    assert_roundtrip("SELECT 1 UNION SELECT 2 UNION ALL SELECT 3");
    assert_roundtrip("SELECT 1 INTERSECT SELECT 2 EXCEPT SELECT 3");
    assert_roundtrip("(SELECT 1 UNION SELECT 2) INTERSECT SELECT 3");
}

#[test]
fn roundtrip_values() {
    assert_roundtrip("values (1, 'a', true), (2, 'b', null)");
    assert_roundtrip("values ()");
    assert_roundtrip("SELECT * FROM (VALUES (1, 2), (3, 4)) v (a, b)");
}

#[test]
fn roundtrip_with_clauses() {
    assert_roundtrip("WITH a AS (SELECT 1) SELECT * FROM a");
    assert_roundtrip(
        "WITH base (id) AS MATERIALIZED (SELECT id FROM t), \
         top AS NOT MATERIALIZED (SELECT * FROM base) \
         SELECT * FROM top",
    );
    assert_roundtrip(
        "WITH RECURSIVE walk AS (SELECT 1 AS n UNION ALL SELECT n + 1 FROM walk WHERE n < 5) \
         SELECT * FROM walk",
    );
}

#[test]
fn roundtrip_expressions() {
    assert_roundtrip("SELECT a + b * c - d / e % f FROM t");
    assert_roundtrip("SELECT (a + b) * c FROM t");
    assert_roundtrip("SELECT a || b || 'x' FROM t");
    assert_roundtrip("SELECT -x, +y, not z FROM t");
    assert_roundtrip("SELECT a | b # c & d, a ^ b FROM t");
    assert_roundtrip("SELECT x IS NULL, y IS NOT TRUE, z IS DISTINCT FROM w FROM t");
    assert_roundtrip("SELECT x BETWEEN 1 AND 10, y NOT BETWEEN a AND b FROM t");
    assert_roundtrip("SELECT x IN (1, 2, 3), y NOT IN (SELECT id FROM t) FROM u");
    assert_roundtrip("SELECT x LIKE 'a%', y NOT ILIKE '_b' ESCAPE '!', z SIMILAR TO 'c+' FROM t");
    assert_roundtrip("SELECT EXISTS (SELECT 1), NOT EXISTS (SELECT 2) FROM t");
    assert_roundtrip("SELECT CASE WHEN a > 1 THEN 'x' ELSE 'y' END FROM t");
    assert_roundtrip("SELECT CASE status WHEN 1 THEN 'on' WHEN 2 THEN 'off' END FROM t");
}

#[test]
fn roundtrip_typed_expressions() {
    assert_roundtrip("SELECT CAST(x AS numeric(10, 2)) FROM t");
    assert_roundtrip("SELECT x::int, y::timestamp with time zone FROM t");
    assert_roundtrip("SELECT CAST(x AS double precision), CAST(y AS character varying(30)) FROM t");
    assert_roundtrip("SELECT EXTRACT(year FROM d), POSITION('x' IN s) FROM t");
    assert_roundtrip("SELECT SUBSTRING(s, 1, 2), SUBSTRING(s FROM 2 FOR 3) FROM t");
    assert_roundtrip("SELECT TRIM(s), TRIM(leading 'x' FROM s), TRIM(s, 'y') FROM t");
    assert_roundtrip("SELECT OVERLAY(s PLACING 'ab' FROM 2 FOR 3) FROM t");
    assert_roundtrip("SELECT ARRAY[1, 2, 3], ARRAY[] FROM t");
    assert_roundtrip("SELECT INTERVAL '1' day, INTERVAL '1-2' year to month FROM t");
    assert_roundtrip("SELECT created_at AT TIME ZONE 'UTC' FROM t");
}

#[test]
fn roundtrip_function_calls_and_windows() {
    assert_roundtrip("SELECT count(*), count(DISTINCT x), coalesce(a, b, 0) FROM t");
    assert_roundtrip("SELECT array_agg(x ORDER BY y DESC) FROM t");
    assert_roundtrip("SELECT count(*) FILTER (WHERE x > 0) FROM t");
    assert_roundtrip("SELECT percentile_cont(0.5) WITHIN GROUP (ORDER BY amount) FROM t");
    assert_roundtrip("SELECT sum(x) OVER (PARTITION BY g ORDER BY ts) FROM t");
    assert_roundtrip(
        "SELECT sum(x) OVER (ORDER BY ts ROWS BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW) \
         FROM t",
    );
    assert_roundtrip(
        "SELECT sum(x) OVER w FROM t WINDOW w AS (PARTITION BY g ORDER BY ts \
         GROUPS 2 PRECEDING EXCLUDE TIES)",
    );
    assert_roundtrip("SELECT pg_catalog.lower(name) FROM t");
}

#[test]
fn roundtrip_subqueries() {
    assert_roundtrip("SELECT (SELECT max(id) FROM t) AS top FROM u");
    assert_roundtrip("SELECT a FROM (SELECT a FROM (SELECT 1 AS a) x) y");
    assert_roundtrip("SELECT a FROM t WHERE a IN (SELECT b FROM u WHERE u.c = t.c)");
}

#[test]
fn roundtrip_named_parameters_under_named_style() {
    let options = FormatOptions {
        parameter_style: Some(ParameterStyle::Named),
        parameter_symbol: Some(ParameterSymbol::plain(":")),
        ..FormatOptions::default()
    };
    let parsed =
        parse_select("SELECT a FROM t WHERE a = :x AND b = :y AND c = :x").expect("parse");
    let formatter = Formatter::new(options).expect("formatter");
    let formatted = formatter.format(&parsed).expect("format");
    let reparsed = parse_select(&formatted.sql).expect("re-parse");
    assert_eq!(parsed, reparsed);
}

// ---------------------------------------------------------------------------
// Property-based round-trips over generated SQL
// ---------------------------------------------------------------------------

fn is_keyword(word: &str) -> bool {
    requel::tokenize(word)
        .map(|lexemes| lexemes[0].kind != requel::LexemeKind::Identifier)
        .unwrap_or(true)
}

fn arb_ident() -> BoxedStrategy<String> {
    prop::string::string_regex("[a-z][a-z0-9]{0,5}")
        .expect("valid regex")
        .prop_filter("must not be a keyword", |s| !is_keyword(s))
        .boxed()
}

fn arb_literal() -> BoxedStrategy<String> {
    prop_oneof![
        any::<i32>().prop_map(|n| n.to_string()),
        (1u32..1000).prop_map(|n| format!("{n}.{}", n % 100)),
        arb_ident().prop_map(|s| format!("'{s}'")),
        Just("null".to_owned()),
        Just("true".to_owned()),
        Just("false".to_owned()),
    ]
    .boxed()
}

fn arb_expr(depth: u32) -> BoxedStrategy<String> {
    if depth == 0 {
        prop_oneof![
            arb_literal(),
            arb_ident(),
            (arb_ident(), arb_ident()).prop_map(|(t, c)| format!("{t}.{c}")),
        ]
        .boxed()
    } else {
        let leaf = arb_expr(0);
        prop_oneof![
            4 => leaf,
            2 => (arb_expr(depth - 1), prop_oneof![
                Just("+"), Just("-"), Just("*"), Just("/"),
                Just("="), Just("<>"), Just("<"), Just("<="),
                Just(">"), Just(">="), Just("and"), Just("or"),
                Just("||"),
            ], arb_expr(depth - 1))
                .prop_map(|(l, op, r)| format!("({l} {op} {r})")),
            1 => arb_expr(depth - 1).prop_map(|e| format!("(-{e})")),
            1 => arb_expr(depth - 1).prop_map(|e| format!("(not {e})")),
            1 => arb_expr(depth - 1).prop_map(|e| format!("{e} is null")),
            1 => arb_expr(depth - 1).prop_map(|e| format!("{e} is not null")),
            1 => (arb_expr(depth - 1), arb_expr(0), arb_expr(0))
                .prop_map(|(e, lo, hi)| format!("{e} between {lo} and {hi}")),
            1 => (arb_expr(depth - 1), prop::collection::vec(arb_expr(0), 1..4))
                .prop_map(|(e, items)| format!("{e} in ({})", items.join(", "))),
            1 => (arb_expr(depth - 1), arb_ident())
                .prop_map(|(e, p)| format!("{e} like '{p}'")),
            1 => arb_expr(depth - 1).prop_map(|e| format!("cast({e} as text)")),
            1 => (arb_expr(depth - 1), arb_expr(0), arb_expr(0))
                .prop_map(|(c, t, el)| format!("case when {c} then {t} else {el} end")),
            1 => (arb_ident(), prop::collection::vec(arb_expr(0), 0..3))
                .prop_map(|(name, args)| format!("{name}({})", args.join(", "))),
            1 => arb_expr(0).prop_map(|e| format!("(select {e})")),
        ]
        .boxed()
    }
}

fn arb_select() -> BoxedStrategy<String> {
    use std::fmt::Write as _;

    let cols = prop::collection::vec(arb_expr(1), 1..4).prop_map(|cols| cols.join(", "));
    let table = arb_ident();
    let where_clause = prop::option::of(arb_expr(1));
    let order_by = prop::option::of(arb_ident());
    let limit = prop::option::of(1u32..100);

    (cols, table, where_clause, order_by, limit)
        .prop_map(|(cols, tbl, wh, ord, lim)| {
            let mut sql = format!("select {cols} from {tbl}");
            if let Some(w) = wh {
                write!(sql, " where {w}").expect("write to string");
            }
            if let Some(o) = ord {
                write!(sql, " order by {o}").expect("write to string");
            }
            if let Some(l) = lim {
                write!(sql, " limit {l}").expect("write to string");
            }
            sql
        })
        .boxed()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn generated_selects_roundtrip(sql in arb_select()) {
        if parse_select(&sql).is_ok() {
            assert_roundtrip(&sql);
        }
    }

    #[test]
    fn generated_expressions_roundtrip_in_select_items(expr in arb_expr(2)) {
        let sql = format!("select {expr}");
        if parse_select(&sql).is_ok() {
            assert_roundtrip(&sql);
        }
    }
}
