#![allow(dead_code)]

use std::collections::VecDeque;
use trestle_core::{
    Connection, Dialect, Error, Executor, QueryResult, Result, RowLabeled, RowNames,
    RowsAffected, SqlStatement, Transaction, Value,
    stream::{self, Stream},
};

/// The canned outcome of one expected round trip.
pub enum Reply {
    Rows(Vec<RowLabeled>),
    Affected(RowsAffected),
    Fail(&'static str),
}

/// One expected round trip: the exact statement text and parameter list the
/// code under test must produce, and what the backend replies.
pub struct Step {
    pub sql: String,
    pub params: Vec<Value>,
    pub reply: Reply,
}

impl Step {
    pub fn rows(sql: impl Into<String>, params: Vec<Value>, rows: Vec<RowLabeled>) -> Self {
        Self {
            sql: sql.into(),
            params,
            reply: Reply::Rows(rows),
        }
    }

    pub fn affected(sql: impl Into<String>, params: Vec<Value>, rows_affected: u64) -> Self {
        Self {
            sql: sql.into(),
            params,
            reply: Reply::Affected(RowsAffected {
                rows_affected,
                last_affected_id: None,
            }),
        }
    }

    pub fn affected_with_id(
        sql: impl Into<String>,
        params: Vec<Value>,
        rows_affected: u64,
        last_affected_id: i64,
    ) -> Self {
        Self {
            sql: sql.into(),
            params,
            reply: Reply::Affected(RowsAffected {
                rows_affected,
                last_affected_id: Some(last_affected_id),
            }),
        }
    }

    pub fn fail(sql: impl Into<String>, params: Vec<Value>, message: &'static str) -> Self {
        Self {
            sql: sql.into(),
            params,
            reply: Reply::Fail(message),
        }
    }
}

/// An in-memory backend that replays a script of expected round trips and
/// panics on any statement the script does not foresee. Transactions only
/// record their boundaries into `events`.
pub struct ScriptedBackend {
    dialect: Dialect,
    steps: VecDeque<Step>,
    pub events: Vec<&'static str>,
}

impl ScriptedBackend {
    pub fn new(dialect: Dialect, steps: Vec<Step>) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        Self {
            dialect,
            steps: steps.into(),
            events: Vec::new(),
        }
    }

    pub fn assert_done(&self) {
        assert!(
            self.steps.is_empty(),
            "{} scripted round trips never happened, next: {}",
            self.steps.len(),
            self.steps.front().map(|v| v.sql.as_str()).unwrap_or(""),
        );
    }

    fn next_reply(&mut self, statement: &SqlStatement) -> Vec<Result<QueryResult>> {
        let Some(step) = self.steps.pop_front() else {
            panic!("round trip the script does not foresee: {}", statement.text);
        };
        assert_eq!(statement.text, step.sql, "statement text mismatch");
        assert_eq!(
            statement.params, step.params,
            "parameter list mismatch for: {}",
            step.sql,
        );
        match step.reply {
            Reply::Rows(rows) => rows.into_iter().map(|v| Ok(v.into())).collect(),
            Reply::Affected(affected) => vec![Ok(affected.into())],
            Reply::Fail(message) => vec![Err(Error::msg(message))],
        }
    }
}

impl Executor for ScriptedBackend {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn run(&mut self, statement: SqlStatement) -> impl Stream<Item = Result<QueryResult>> + Send {
        stream::iter(self.next_reply(&statement))
    }
}

pub struct ScriptedTransaction<'c> {
    backend: &'c mut ScriptedBackend,
}

impl Executor for ScriptedTransaction<'_> {
    fn dialect(&self) -> Dialect {
        self.backend.dialect
    }

    fn run(&mut self, statement: SqlStatement) -> impl Stream<Item = Result<QueryResult>> + Send {
        self.backend.run(statement)
    }
}

impl Transaction for ScriptedTransaction<'_> {
    async fn commit(self) -> Result<()> {
        self.backend.events.push("commit");
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.backend.events.push("rollback");
        Ok(())
    }
}

impl Connection for ScriptedBackend {
    type Transaction<'c>
        = ScriptedTransaction<'c>
    where
        Self: 'c;

    async fn begin(&mut self) -> Result<ScriptedTransaction<'_>> {
        self.events.push("begin");
        Ok(ScriptedTransaction { backend: self })
    }
}

pub fn labels(names: &[&str]) -> RowNames {
    names.iter().map(|v| v.to_string()).collect::<Vec<_>>().into()
}

pub fn row(labels: &RowNames, values: Vec<Value>) -> RowLabeled {
    RowLabeled::new(labels.clone(), values.into_boxed_slice())
}

/// The single-row reply of a `SELECT COUNT(*)`.
pub fn count_rows(count: i64) -> Vec<RowLabeled> {
    let names = labels(&["COUNT(*)"]);
    vec![row(&names, vec![Value::Int64(Some(count))])]
}

/// Single-column key rows, the reply to an UPDATE's pre-mutation key pin.
pub fn key_rows(keys: impl IntoIterator<Item = i64>) -> Vec<RowLabeled> {
    let names = labels(&["id"]);
    keys.into_iter()
        .map(|key| row(&names, vec![Value::Int64(Some(key))]))
        .collect()
}

/// One `(id, name)` row per key in `keys`, the shape the pagination tests
/// page over.
pub fn keyed_rows(keys: impl IntoIterator<Item = i64>) -> Vec<RowLabeled> {
    let names = labels(&["id", "name"]);
    keys.into_iter()
        .map(|key| {
            row(
                &names,
                vec![
                    Value::Int64(Some(key)),
                    Value::Varchar(Some(format!("record {}", key))),
                ],
            )
        })
        .collect()
}
