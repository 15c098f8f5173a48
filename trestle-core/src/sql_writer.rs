use crate::{
    CapturedCommand, Dialect, MutationCapture, MutationIntent, MutationKind, Predicate,
    QueryError, Result, SqlStatement, TableRef, Value, ValueSource, separated_by,
};

/// Compiles a [`MutationIntent`] into dialect-correct SQL.
///
/// The writer never executes anything: `compile` stores its output into the
/// caller's [`MutationCapture`], and the engine decides how to run it. All
/// text goes through `&mut String` out-parameters so a statement is built in
/// one allocation.
///
/// Parameter indexing: a predicate's parameters keep the indices they had in
/// the source SELECT (they stay first in the list, and the spliced WHERE
/// text references them by index), assignment constants are appended after.
pub struct MutationWriter {
    dialect: Dialect,
}

impl MutationWriter {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Compile phase of the mutation protocol: build the statement and the
    /// follow-up select, arm `capture` with them, execute nothing.
    pub fn compile(&self, intent: &MutationIntent, capture: &mut MutationCapture) -> Result<()> {
        let predicate = intent.predicate()?;
        let (statement, reselect) = match intent.kind() {
            MutationKind::Insert => (
                self.compile_insert(intent)?,
                self.identity_select(intent.table()),
            ),
            MutationKind::Update => (
                self.compile_update(intent, &predicate)?,
                self.key_select(intent.table(), &predicate),
            ),
            MutationKind::Delete => (
                self.compile_delete(intent, &predicate),
                self.reselect(intent.table(), &predicate),
            ),
        };
        capture.store(CapturedCommand {
            statement,
            reselect: Some(reselect),
        })
    }

    fn compile_insert(&self, intent: &MutationIntent) -> Result<SqlStatement> {
        if intent.assignments.is_empty() {
            return Err(
                QueryError::InvalidArgument("an INSERT needs at least one column".into()).into(),
            );
        }
        if intent.source.is_some() {
            return Err(QueryError::InvalidArgument(
                "an INSERT cannot target predicate-selected rows".into(),
            )
            .into());
        }
        let mut text = String::with_capacity(128);
        let mut params = Vec::with_capacity(intent.assignments.len());
        text.push_str("INSERT INTO ");
        self.write_table(&mut text, intent.table());
        text.push_str(" (");
        separated_by(
            &mut text,
            &intent.assignments,
            |out, v| self.dialect.write_identifier(out, &v.column),
            ", ",
        );
        // the VALUES list walks the same assignments, so the orders match
        text.push_str(") VALUES (");
        separated_by(
            &mut text,
            &intent.assignments,
            |out, v| self.write_source(out, &mut params, &v.source),
            ", ",
        );
        text.push_str(");");
        Ok(SqlStatement::with_params(text, params))
    }

    fn compile_update(
        &self,
        intent: &MutationIntent,
        predicate: &Predicate,
    ) -> Result<SqlStatement> {
        if intent.assignments.is_empty() {
            return Err(
                QueryError::InvalidArgument("an UPDATE needs at least one assignment".into())
                    .into(),
            );
        }
        let mut text = String::with_capacity(128);
        let mut params = predicate.params.clone();
        text.push_str("UPDATE ");
        self.write_table(&mut text, intent.table());
        text.push_str(" SET ");
        separated_by(
            &mut text,
            &intent.assignments,
            |out, v| {
                self.dialect.write_identifier(out, &v.column);
                out.push_str(" = ");
                self.write_source(out, &mut params, &v.source);
            },
            ", ",
        );
        self.write_predicate(&mut text, predicate);
        text.push(';');
        Ok(SqlStatement::with_params(text, params))
    }

    fn compile_delete(&self, intent: &MutationIntent, predicate: &Predicate) -> SqlStatement {
        let mut text = String::with_capacity(64);
        text.push_str("DELETE FROM ");
        self.write_table(&mut text, intent.table());
        self.write_predicate(&mut text, predicate);
        text.push(';');
        SqlStatement::with_params(text, predicate.params.clone())
    }

    /// `SELECT * FROM t [WHERE …]` over the rows the predicate matches.
    pub(crate) fn reselect(&self, table: &TableRef, predicate: &Predicate) -> SqlStatement {
        let mut text = String::with_capacity(64);
        text.push_str("SELECT * FROM ");
        self.write_table(&mut text, table);
        self.write_predicate(&mut text, predicate);
        text.push(';');
        SqlStatement::with_params(text, predicate.params.clone())
    }

    /// `SELECT pk FROM t [WHERE …]`, the pre-mutation read that pins down
    /// which rows an UPDATE is about to touch. The predicate cannot be
    /// replayed after the mutation, an assignment may overwrite a column it
    /// filters on.
    pub(crate) fn key_select(&self, table: &TableRef, predicate: &Predicate) -> SqlStatement {
        let mut text = String::with_capacity(64);
        text.push_str("SELECT ");
        self.dialect.write_identifier(&mut text, &table.primary_key);
        text.push_str(" FROM ");
        self.write_table(&mut text, table);
        self.write_predicate(&mut text, predicate);
        text.push(';');
        SqlStatement::with_params(text, predicate.params.clone())
    }

    /// `SELECT * FROM t WHERE pk IN (…)` over the keys a preceding
    /// [`key_select`](Self::key_select) pinned down.
    pub(crate) fn keyed_reselect(&self, table: &TableRef, keys: &[Value]) -> SqlStatement {
        let mut text = String::with_capacity(64);
        let mut params = Vec::with_capacity(keys.len());
        text.push_str("SELECT * FROM ");
        self.write_table(&mut text, table);
        text.push_str(" WHERE ");
        self.dialect.write_identifier(&mut text, &table.primary_key);
        text.push_str(" IN (");
        separated_by(
            &mut text,
            keys,
            |out, key| {
                let index = params.len();
                params.push(key.clone());
                self.dialect.write_placeholder(out, index);
            },
            ", ",
        );
        text.push_str(");");
        SqlStatement::with_params(text, params)
    }

    /// `SELECT * FROM t WHERE pk = <identity expression>`, the follow-up
    /// that recovers the row a fallback INSERT just created.
    pub(crate) fn identity_select(&self, table: &TableRef) -> SqlStatement {
        let mut text = String::with_capacity(64);
        text.push_str("SELECT * FROM ");
        self.write_table(&mut text, table);
        text.push_str(" WHERE ");
        self.dialect.write_identifier(&mut text, &table.primary_key);
        text.push_str(" = ");
        text.push_str(self.dialect.identity_expr());
        text.push(';');
        SqlStatement::new(text)
    }

    fn write_table(&self, out: &mut String, table: &TableRef) {
        if !table.schema.is_empty() {
            self.dialect.write_identifier(out, &table.schema);
            out.push('.');
        }
        self.dialect.write_identifier(out, &table.name);
    }

    fn write_predicate(&self, out: &mut String, predicate: &Predicate) {
        if let Some(where_onward) = &predicate.where_onward {
            out.push(' ');
            out.push_str(where_onward);
        }
    }

    fn write_source(&self, out: &mut String, params: &mut Vec<Value>, source: &ValueSource) {
        match source {
            ValueSource::Value(v) => {
                let index = params.len();
                params.push(v.clone());
                self.dialect.write_placeholder(out, index);
            }
            ValueSource::Column(name) => self.dialect.write_identifier(out, name),
            ValueSource::Expr(expr) => out.push_str(expr),
        }
    }
}
