use crate::{
    Dialect, QueryError, QueryResult, Result, RowLabeled, RowsAffected, SqlStatement, Value,
    stream::{Stream, StreamExt, TryStreamExt},
};
use std::{future::Future, pin::pin};

/// Something that can run SQL against one backend connection.
///
/// `run` is the single required round trip; the other methods are adapters
/// over it. Every method is an async boundary: dropping the returned future
/// or stream cancels the in-flight round trip, and nothing is rolled back
/// by cancellation alone.
pub trait Executor: Send + Sized {
    /// The backend variant this executor talks to.
    fn dialect(&self) -> Dialect;

    /// General method to send any statement and return any result type
    /// (either row or count).
    fn run(
        &mut self,
        statement: SqlStatement,
    ) -> impl Stream<Item = Result<QueryResult>> + Send;

    /// Execute the statement and return the rows.
    fn fetch(
        &mut self,
        statement: SqlStatement,
    ) -> impl Stream<Item = Result<RowLabeled>> + Send {
        self.run(statement).filter_map(|v| async move {
            match v {
                Ok(QueryResult::Row(v)) => Some(Ok(v)),
                Err(e) => Some(Err(e)),
                _ => None,
            }
        })
    }

    /// Execute the statement and return the total number of rows affected.
    fn execute(
        &mut self,
        statement: SqlStatement,
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        self.run(statement)
            .filter_map(|v| async move {
                match v {
                    Ok(QueryResult::Affected(v)) => Some(Ok(v)),
                    Err(e) => Some(Err(e)),
                    _ => None,
                }
            })
            .try_collect()
    }

    /// Execute the statement and return the first column of the first row.
    fn fetch_scalar(
        &mut self,
        statement: SqlStatement,
    ) -> impl Future<Output = Result<Value>> + Send {
        let stream = self.fetch(statement);
        async move {
            let mut stream = pin!(stream);
            let Some(row) = stream.try_next().await? else {
                return Err(QueryError::InvariantViolation(
                    "scalar query returned no rows".into(),
                )
                .into());
            };
            let Some(value) = row.values().first() else {
                return Err(QueryError::InvariantViolation(
                    "scalar query returned an empty row".into(),
                )
                .into());
            };
            Ok(value.clone())
        }
    }
}

/// An open transaction. `commit` and `rollback` consume the handle, so
/// using it after either one is a type error.
pub trait Transaction: Executor {
    fn commit(self) -> impl Future<Output = Result<()>> + Send;
    fn rollback(self) -> impl Future<Output = Result<()>> + Send;
}

pub trait Connection: Executor {
    type Transaction<'c>: Transaction
    where
        Self: 'c;

    /// Open a transaction. The handle must not be shared between concurrent
    /// operations; every step inside runs in sequence on it.
    fn begin(&mut self) -> impl Future<Output = Result<Self::Transaction<'_>>> + Send;
}
