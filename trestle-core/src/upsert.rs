use crate::{
    AsValue, Assignment, Connection, MutationIntent, Result, RowLabeled, RowsAffected,
    SqlStatement, TableRef, Transaction,
};
use std::borrow::Cow;

/// Update the rows a predicate matches, or insert a new row when none do,
/// as one atomic operation.
///
/// Both steps run inside a single transaction on one connection: the update
/// goes first, the insert only happens when the update touched nothing (its
/// predicate dropped, it targets the bare table), and any failure at either
/// step rolls the whole thing back. The two-step shape works on every
/// dialect without a conflict target and lets the insert carry a different
/// assignment list than the update.
pub struct Upsert {
    table: TableRef,
    source: SqlStatement,
    update: Vec<Assignment>,
    insert: Option<Vec<Assignment>>,
}

impl Upsert {
    /// `source` is a single-table SELECT whose WHERE clause decides which
    /// rows the update step targets.
    pub fn new(table: TableRef, source: impl Into<SqlStatement>) -> Self {
        Self {
            table,
            source: source.into(),
            update: Vec::new(),
            insert: None,
        }
    }

    pub fn assign(mut self, assignment: Assignment) -> Self {
        self.update.push(assignment);
        self
    }

    /// Set `column` to a bound constant in the update step (and in the
    /// insert step too, unless distinct insert assignments are given).
    pub fn set(self, column: impl Into<Cow<'static, str>>, value: impl AsValue) -> Self {
        self.assign(Assignment::value(column, value))
    }

    pub fn insert_assign(mut self, assignment: Assignment) -> Self {
        self.insert.get_or_insert_default().push(assignment);
        self
    }

    /// Set `column` to a bound constant in the insert step only. The first
    /// call switches the insert step away from reusing the update
    /// assignments.
    pub fn insert_set(self, column: impl Into<Cow<'static, str>>, value: impl AsValue) -> Self {
        self.insert_assign(Assignment::value(column, value))
    }

    /// Upsert and hand back the rows written: the updated rows, or the one
    /// inserted row.
    pub async fn fetch<C: Connection>(&self, connection: &mut C) -> Result<Vec<RowLabeled>> {
        let mut transaction = connection.begin().await?;
        let outcome = async {
            // the fetched rows are the update's matched set (pinned by key
            // before the mutation, or emitted by the native returning
            // clause): empty means the update touched nothing, the same
            // signal `execute` reads from the affected count
            let rows = self.update_intent().fetch(&mut transaction).await?;
            if !rows.is_empty() {
                return Ok(rows);
            }
            let row = self.insert_intent().fetch_one(&mut transaction).await?;
            Ok(vec![row])
        }
        .await;
        finish(transaction, outcome).await
    }

    /// Upsert and report the affected row count.
    pub async fn execute<C: Connection>(&self, connection: &mut C) -> Result<RowsAffected> {
        let mut transaction = connection.begin().await?;
        let outcome = async {
            let affected = self.update_intent().execute(&mut transaction).await?;
            if affected.rows_affected > 0 {
                return Ok(affected);
            }
            self.insert_intent().execute(&mut transaction).await
        }
        .await;
        finish(transaction, outcome).await
    }

    fn update_intent(&self) -> MutationIntent {
        let mut intent = MutationIntent::update(self.table.clone()).source(self.source.clone());
        for assignment in &self.update {
            intent = intent.assign(assignment.clone());
        }
        intent
    }

    fn insert_intent(&self) -> MutationIntent {
        let mut intent = MutationIntent::insert(self.table.clone());
        for assignment in self.insert.as_ref().unwrap_or(&self.update) {
            intent = intent.assign(assignment.clone());
        }
        intent
    }
}

/// Commit on success; on failure roll back and re-raise the original error,
/// a rollback failure is only logged so the primary error wins.
async fn finish<T: Transaction, V>(transaction: T, outcome: Result<V>) -> Result<V> {
    match outcome {
        Ok(v) => {
            transaction.commit().await?;
            Ok(v)
        }
        Err(e) => {
            if let Err(rollback) = transaction.rollback().await {
                log::error!("{:#}", rollback);
            }
            Err(e)
        }
    }
}
