use crate::{
    AsValue, QueryError, Result, SqlStatement, Value, find_top_level, has_top_level_comma,
    split_projection,
};
use std::borrow::Cow;

/// A table targeted by a mutation, with the per-table configuration the
/// engine needs: the identity primary key column, and whether the table
/// opts into the dialect's native returning clause when one exists.
#[derive(Debug, Clone)]
pub struct TableRef {
    pub schema: Cow<'static, str>,
    pub name: Cow<'static, str>,
    pub primary_key: Cow<'static, str>,
    pub native_returning: bool,
}

impl TableRef {
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        primary_key: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            schema: "".into(),
            name: name.into(),
            primary_key: primary_key.into(),
            native_returning: true,
        }
    }

    pub fn with_schema(mut self, schema: impl Into<Cow<'static, str>>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Opt out of the dialect's native returning clause; affected rows are
    /// then recovered by a deterministic follow-up select.
    pub fn reselect_returning(mut self) -> Self {
        self.native_returning = false;
        self
    }
}

/// Where an assignment's value comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueSource {
    /// A bound constant.
    Value(Value),
    /// Another column of the same table.
    Column(Cow<'static, str>),
    /// A raw SQL expression, written verbatim.
    Expr(Cow<'static, str>),
}

/// One `column = value` pair of an INSERT or UPDATE. Order is preserved:
/// the column list and the VALUES list always line up.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub column: Cow<'static, str>,
    pub source: ValueSource,
}

impl Assignment {
    pub fn value(column: impl Into<Cow<'static, str>>, value: impl AsValue) -> Self {
        Self {
            column: column.into(),
            source: ValueSource::Value(value.as_value()),
        }
    }

    pub fn column(
        column: impl Into<Cow<'static, str>>,
        other: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            column: column.into(),
            source: ValueSource::Column(other.into()),
        }
    }

    pub fn expr(
        column: impl Into<Cow<'static, str>>,
        expr: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            column: column.into(),
            source: ValueSource::Expr(expr.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Insert,
    Update,
    Delete,
}

/// A mutation being assembled: the target table, the ordered assignment
/// list, and an optional row predicate taken from a single-table SELECT
/// against the same table.
#[derive(Debug, Clone)]
pub struct MutationIntent {
    pub(crate) kind: MutationKind,
    pub(crate) table: TableRef,
    pub(crate) assignments: Vec<Assignment>,
    pub(crate) source: Option<SqlStatement>,
}

impl MutationIntent {
    pub fn insert(table: TableRef) -> Self {
        Self::new(MutationKind::Insert, table)
    }

    pub fn update(table: TableRef) -> Self {
        Self::new(MutationKind::Update, table)
    }

    pub fn delete(table: TableRef) -> Self {
        Self::new(MutationKind::Delete, table)
    }

    fn new(kind: MutationKind, table: TableRef) -> Self {
        Self {
            kind,
            table,
            assignments: Vec::new(),
            source: None,
        }
    }

    pub fn assign(mut self, assignment: Assignment) -> Self {
        self.assignments.push(assignment);
        self
    }

    /// Set `column` to a bound constant.
    pub fn set(self, column: impl Into<Cow<'static, str>>, value: impl AsValue) -> Self {
        self.assign(Assignment::value(column, value))
    }

    /// Set `column` to the value of another column.
    pub fn set_column(
        self,
        column: impl Into<Cow<'static, str>>,
        other: impl Into<Cow<'static, str>>,
    ) -> Self {
        self.assign(Assignment::column(column, other))
    }

    /// Set `column` to a raw SQL expression.
    pub fn set_expr(
        self,
        column: impl Into<Cow<'static, str>>,
        expr: impl Into<Cow<'static, str>>,
    ) -> Self {
        self.assign(Assignment::expr(column, expr))
    }

    /// Restrict the mutation to the rows selected by `statement`, a
    /// single-table SELECT against the target table. Its WHERE clause and
    /// parameters become the mutation predicate.
    pub fn source(mut self, statement: SqlStatement) -> Self {
        self.source = Some(statement);
        self
    }

    pub fn kind(&self) -> MutationKind {
        self.kind
    }

    pub fn table(&self) -> &TableRef {
        &self.table
    }

    /// The predicate extracted from the source SELECT, if any. Source
    /// parameters keep their original indices: they stay first in every
    /// compiled parameter list, so the spliced WHERE text is reused as-is.
    pub(crate) fn predicate(&self) -> Result<Predicate> {
        let Some(source) = &self.source else {
            return Ok(Predicate::default());
        };
        let shape = analyze_source(source)?;
        Ok(Predicate {
            where_onward: shape.where_onward.map(str::to_string),
            params: source.params.clone(),
        })
    }
}

/// The predicate of a mutation: `WHERE …` text plus the parameters it
/// references.
#[derive(Debug, Clone, Default)]
pub(crate) struct Predicate {
    pub where_onward: Option<String>,
    pub params: Vec<Value>,
}

/// The usable pieces of a mutation's source SELECT.
#[derive(Debug, PartialEq, Eq)]
struct SourceShape<'a> {
    /// `WHERE` clause text, starting at the keyword, terminator stripped.
    where_onward: Option<&'a str>,
}

/// Check that a source SELECT has the single-table shape a mutation can
/// target, and slice out its WHERE clause.
///
/// Joined tables and grouped, ordered or limited selections have no
/// correct UPDATE/DELETE counterpart, so they fail fast instead of
/// producing wrong SQL.
fn analyze_source(statement: &SqlStatement) -> Result<SourceShape<'_>> {
    let parts = split_projection(&statement.text)?;
    let from_onward = parts.from_onward;
    const REJECTED: &[(&[&str], &str)] = &[
        (&["JOIN"], "JOIN"),
        (&["GROUP", "BY"], "GROUP BY"),
        (&["HAVING"], "HAVING"),
        (&["ORDER", "BY"], "ORDER BY"),
        (&["LIMIT"], "LIMIT"),
        (&["OFFSET"], "OFFSET"),
        (&["FETCH"], "FETCH"),
        (&["UNION"], "UNION"),
    ];
    for (phrase, construct) in REJECTED {
        if find_top_level(from_onward, phrase).is_some() {
            return Err(QueryError::UnsupportedQueryShape(format!(
                "a single-table mutation source cannot carry {}",
                construct
            ))
            .into());
        }
    }
    let where_at = find_top_level(from_onward, &["WHERE"]);
    let table_part = &from_onward[..where_at.unwrap_or(from_onward.len())];
    if has_top_level_comma(table_part) {
        return Err(QueryError::UnsupportedQueryShape(
            "a mutation source must select from exactly one table".into(),
        )
        .into());
    }
    Ok(SourceShape {
        where_onward: where_at
            .map(|at| from_onward[at..].trim_end().trim_end_matches(';').trim_end()),
    })
}
