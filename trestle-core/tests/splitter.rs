#[cfg(test)]
mod tests {
    use indoc::indoc;
    use trestle_core::{
        QueryError, find_order_by, find_top_level, has_top_level_comma, split_order_by,
        split_projection,
    };

    macro_rules! assert_order_by_at {
        ($sql:expr, $expected:expr) => {{
            assert_eq!(find_order_by($sql), $expected, "in: {}", $sql);
        }};
    }

    #[test]
    fn order_by_found() {
        assert_order_by_at!("SELECT a FROM t ORDER BY a", Some(16));
        assert_order_by_at!("SELECT a FROM t order by a", Some(16));
        assert_order_by_at!("SELECT a FROM t Order   By a", Some(16));
        assert_order_by_at!("SELECT a FROM t\nORDER\n  BY a DESC", Some(16));
    }

    #[test]
    fn order_by_absent_reports_none() {
        assert_order_by_at!("SELECT a FROM t", None);
        assert_order_by_at!("SELECT a FROM t WHERE b = 1", None);
    }

    #[test]
    fn order_by_rightmost_top_level_wins() {
        let sql = "SELECT * FROM (SELECT a FROM t ORDER BY a) s ORDER BY b";
        assert_eq!(find_order_by(sql), Some(45));
        let (before, onward) = split_order_by(sql).unwrap();
        assert_eq!(before, "SELECT * FROM (SELECT a FROM t ORDER BY a) s ");
        assert_eq!(onward, "ORDER BY b");
    }

    #[test]
    fn order_by_inside_subquery_does_not_match() {
        assert_order_by_at!("SELECT * FROM (SELECT a FROM t ORDER BY a) s", None);
        assert_order_by_at!("SELECT rank() OVER (ORDER BY a) FROM t", None);
    }

    #[test]
    fn order_by_inside_literals_and_identifiers_does_not_match() {
        assert_order_by_at!("SELECT a FROM t WHERE b = 'ORDER BY x'", None);
        assert_order_by_at!("SELECT a FROM t WHERE b = 'it''s ORDER BY'", None);
        assert_order_by_at!("SELECT \"ORDER BY\" FROM t", None);
        assert_order_by_at!("SELECT [ORDER BY] FROM t", None);
    }

    #[test]
    fn order_by_preceded_by_as_is_an_alias() {
        assert_order_by_at!("SELECT a AS order by FROM t", None);
        // only the aliased occurrence is excluded
        let sql = "SELECT a AS order by FROM t ORDER BY a";
        assert_eq!(find_order_by(sql), Some(28));
    }

    #[test]
    fn projection_simple() {
        let parts = split_projection("SELECT a, b FROM t WHERE c = 1").unwrap();
        assert_eq!(parts.head, "SELECT");
        assert_eq!(parts.projection, "a, b");
        assert_eq!(parts.from_onward, "FROM t WHERE c = 1");
    }

    #[test]
    fn projection_keeps_distinct_in_the_head() {
        let parts = split_projection("SELECT DISTINCT a FROM t").unwrap();
        assert_eq!(parts.head, "SELECT DISTINCT");
        assert_eq!(parts.projection, "a");
        let parts = split_projection("select all a from t").unwrap();
        assert_eq!(parts.head, "select all");
    }

    #[test]
    fn projection_tolerates_nesting() {
        let sql = indoc! {"
            SELECT coalesce(a, (SELECT max(b) FROM u WHERE u.k = t.k)) AS m,
                   substr(c, 1, 3)
            FROM t
            WHERE d > 0"};
        let parts = split_projection(sql).unwrap();
        assert!(parts.projection.starts_with("coalesce"));
        assert!(parts.projection.ends_with("substr(c, 1, 3)"));
        assert_eq!(parts.from_onward, "FROM t\nWHERE d > 0");
    }

    #[test]
    fn projection_tolerates_leading_whitespace() {
        let parts = split_projection("\n  SELECT a FROM t").unwrap();
        assert_eq!(parts.projection, "a");
    }

    macro_rules! assert_malformed {
        ($sql:expr) => {{
            let error = split_projection($sql).unwrap_err();
            assert!(
                matches!(
                    error.downcast_ref::<QueryError>(),
                    Some(QueryError::MalformedQuery(..)),
                ),
                "expected MalformedQuery for: {}",
                $sql,
            );
        }};
    }

    #[test]
    fn projection_rejects_unrecognized_shapes() {
        assert_malformed!("UPDATE t SET a = 1");
        assert_malformed!("WITH s AS (SELECT 1) SELECT * FROM s");
        assert_malformed!("SELECT 1");
        assert_malformed!("SELECT FROM t");
        assert_malformed!("");
    }

    #[test]
    fn top_level_keyword_is_leftmost_and_depth_aware() {
        let sql = "SELECT a FROM t WHERE k IN (SELECT k FROM u WHERE x = 1)";
        assert_eq!(find_top_level(sql, &["WHERE"]), Some(16));
        assert_eq!(find_top_level(sql, &["GROUP", "BY"]), None);
        assert_eq!(
            find_top_level("DELETE FROM t WHERE a = 1", &["WHERE"]),
            Some(14),
        );
    }

    #[test]
    fn top_level_comma_detection() {
        assert!(has_top_level_comma("a, b"));
        assert!(!has_top_level_comma("f(a, b)"));
        assert!(!has_top_level_comma("'a, b'"));
        assert!(has_top_level_comma("f(a, b), c"));
    }
}
