use crate::{
    CapturedCommand, Executor, MutationCapture, MutationIntent, MutationKind, MutationWriter,
    QueryError, Result, ReturningSyntax, RowLabeled, RowsAffected, SqlStatement, find_top_level,
    stream::TryStreamExt,
};
use log::debug;

/// Mutation execution, in two phases.
///
/// Every mutation first runs the compile phase: the writer builds the final
/// SQL and parameters into a capture slot owned by this call, executing
/// nothing. The captured command is consumed exactly once and either
/// augmented with the dialect's native returning clause or replayed as
/// effect-plus-follow-up-select. Concurrent logical calls never share a
/// slot, each call arms its own.
impl MutationIntent {
    /// Run the mutation for effect and report the affected row count.
    pub async fn execute<E: Executor>(&self, executor: &mut E) -> Result<RowsAffected> {
        let dialect = executor.dialect();
        let mut capture = MutationCapture::new();
        MutationWriter::new(dialect).compile(self, &mut capture)?;
        let command = capture.take()?;
        debug!("{}: executing mutation: {}", dialect, command.statement);
        executor.execute(command.statement).await
    }

    /// Run the mutation and hand back the rows it touched.
    ///
    /// With a native returning clause (and a table that opts into it) this
    /// is one round trip; otherwise the effect and a deterministic
    /// follow-up select run in sequence on the same connection.
    pub async fn fetch<E: Executor>(&self, executor: &mut E) -> Result<Vec<RowLabeled>> {
        let dialect = executor.dialect();
        let mut capture = MutationCapture::new();
        MutationWriter::new(dialect).compile(self, &mut capture)?;
        let command = capture.take()?;
        match dialect.returning_syntax() {
            Some(syntax) if self.table().native_returning => {
                let augmented = augment_returning(self.kind(), syntax, &command.statement)?;
                debug!("{}: fetching mutated rows: {}", dialect, augmented);
                executor.fetch(augmented).try_collect().await
            }
            _ => self.fetch_reselect(executor, command).await,
        }
    }

    /// Insert-get-row: run the mutation and require exactly one row back.
    pub async fn fetch_one<E: Executor>(&self, executor: &mut E) -> Result<RowLabeled> {
        let mut rows = self.fetch(executor).await?;
        let count = rows.len();
        match rows.pop() {
            Some(row) if count == 1 => Ok(row),
            _ => Err(QueryError::InvariantViolation(format!(
                "the mutation returned {} rows instead of the expected 1",
                count
            ))
            .into()),
        }
    }

    /// The fallback sequence for dialects (or tables) without a native
    /// returning clause. A DELETE reads the matched rows before it runs,
    /// they no longer exist afterwards. An UPDATE pins the matched primary
    /// keys before it runs (an assignment may overwrite a column the
    /// predicate filters on) and re-selects by those keys after, so the
    /// returned rows are the ones actually touched, carrying post-mutation
    /// values. An INSERT re-selects by the connection's last identity.
    async fn fetch_reselect<E: Executor>(
        &self,
        executor: &mut E,
        command: CapturedCommand,
    ) -> Result<Vec<RowLabeled>> {
        let Some(reselect) = command.reselect else {
            return Err(QueryError::InvariantViolation(
                "the compile phase did not build a follow-up select".into(),
            )
            .into());
        };
        debug!(
            "{}: executing mutation with follow-up select: {}",
            executor.dialect(),
            command.statement
        );
        match self.kind() {
            MutationKind::Delete => {
                let rows = executor.fetch(reselect).try_collect().await?;
                executor.execute(command.statement).await?;
                Ok(rows)
            }
            MutationKind::Update => {
                let matched: Vec<RowLabeled> = executor.fetch(reselect).try_collect().await?;
                let mut keys = Vec::with_capacity(matched.len());
                for row in &matched {
                    let Some(key) = row.values().first() else {
                        return Err(QueryError::InvariantViolation(
                            "the key select returned an empty row".into(),
                        )
                        .into());
                    };
                    keys.push(key.clone());
                }
                executor.execute(command.statement).await?;
                if keys.is_empty() {
                    return Ok(Vec::new());
                }
                let keyed = MutationWriter::new(executor.dialect())
                    .keyed_reselect(self.table(), &keys);
                executor.fetch(keyed).try_collect().await
            }
            MutationKind::Insert => {
                executor.execute(command.statement).await?;
                executor.fetch(reselect).try_collect().await
            }
        }
    }
}

/// Splice the dialect's returning clause into a compiled mutation.
fn augment_returning(
    kind: MutationKind,
    syntax: ReturningSyntax,
    statement: &SqlStatement,
) -> Result<SqlStatement> {
    let text = statement.text_trimmed();
    let mut out = String::with_capacity(text.len() + 24);
    match syntax {
        ReturningSyntax::Returning => {
            out.push_str(text);
            out.push_str(" RETURNING *");
        }
        ReturningSyntax::Output => {
            let clause = match kind {
                MutationKind::Delete => "OUTPUT DELETED.*",
                _ => "OUTPUT INSERTED.*",
            };
            let anchor = match kind {
                // between the column list and the VALUES block
                MutationKind::Insert => find_top_level(text, &["VALUES"]),
                // after SET / the table reference, before the predicate
                _ => find_top_level(text, &["WHERE"]),
            };
            match anchor {
                Some(at) => {
                    out.push_str(text[..at].trim_end());
                    out.push(' ');
                    out.push_str(clause);
                    out.push(' ');
                    out.push_str(&text[at..]);
                }
                None if kind == MutationKind::Insert => {
                    return Err(QueryError::InvariantViolation(
                        "a compiled INSERT has no VALUES block to anchor OUTPUT on".into(),
                    )
                    .into());
                }
                None => {
                    out.push_str(text);
                    out.push(' ');
                    out.push_str(clause);
                }
            }
        }
    }
    out.push(';');
    Ok(SqlStatement::with_params(out, statement.params.iter().cloned()))
}
