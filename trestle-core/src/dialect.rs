use crate::{QueryError, Result};
use std::fmt::{self, Display};

/// How a dialect expresses "give me a slice of the result set".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSyntax {
    /// Trailing `LIMIT {size} OFFSET {offset}`, valid with or without an
    /// `ORDER BY`.
    LimitOffset,
    /// `OFFSET {n} ROWS FETCH NEXT {m} ROWS ONLY`, rejected by the backend
    /// unless the statement is ordered.
    OffsetFetch,
}

/// How a dialect hands back the rows touched by a mutation, when it can.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturningSyntax {
    /// Trailing `RETURNING *` after the whole statement.
    Returning,
    /// `OUTPUT INSERTED.*` / `OUTPUT DELETED.*` inside the statement.
    Output,
}

/// A SQL backend variant.
///
/// Resolved once per connection and threaded through every call; all
/// SQL-text decisions branch on this value, never on call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    SqlServer,
}

impl Dialect {
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Dialect::Sqlite),
            "sqlserver" | "mssql" => Ok(Dialect::SqlServer),
            _ => Err(QueryError::UnsupportedDialect(name.into()).into()),
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "sqlite",
            Dialect::SqlServer => "sqlserver",
        }
    }

    pub const fn page_syntax(&self) -> PageSyntax {
        match self {
            Dialect::Sqlite => PageSyntax::LimitOffset,
            Dialect::SqlServer => PageSyntax::OffsetFetch,
        }
    }

    pub const fn returning_syntax(&self) -> Option<ReturningSyntax> {
        match self {
            Dialect::Sqlite => None,
            Dialect::SqlServer => Some(ReturningSyntax::Output),
        }
    }

    pub const fn supports_returning(&self) -> bool {
        self.returning_syntax().is_some()
    }

    /// Expression evaluating to the identity generated by the last INSERT
    /// on the current connection.
    pub const fn identity_expr(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "last_insert_rowid()",
            Dialect::SqlServer => "SCOPE_IDENTITY()",
        }
    }

    /// Write the placeholder for the parameter at `index`. Parameters are
    /// 0-based in the list, 1-based in the SQL text, and addressed by index
    /// rather than by order of appearance.
    pub fn write_placeholder(&self, out: &mut String, index: usize) {
        let mut buffer = itoa::Buffer::new();
        out.push_str(match self {
            Dialect::Sqlite => "?",
            Dialect::SqlServer => "@P",
        });
        out.push_str(buffer.format(index as u64 + 1));
    }

    /// Quote `value` as an identifier, doubling the closing character.
    pub fn write_identifier(&self, out: &mut String, value: &str) {
        match self {
            Dialect::Sqlite => {
                out.push('"');
                write_escaped(out, value, '"', "\"\"");
                out.push('"');
            }
            Dialect::SqlServer => {
                out.push('[');
                write_escaped(out, value, ']', "]]");
                out.push(']');
            }
        }
    }
}

impl Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub(crate) fn write_escaped(out: &mut String, value: &str, search: char, replace: &str) {
    let mut position = 0;
    for (i, c) in value.char_indices() {
        if c == search {
            out.push_str(&value[position..i]);
            out.push_str(replace);
            position = i + 1;
        }
    }
    out.push_str(&value[position..]);
}
