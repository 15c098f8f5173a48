use crate::{AsValue, Value, truncate_long};
use std::fmt::{self, Display};

/// SQL text paired with its ordered positional parameters.
///
/// Placeholders are index-addressed (`?1` / `@P1`, 1-based), so where a
/// placeholder appears in the text is independent of the parameter's
/// position in the list. Whatever appends a parameter writes the matching
/// placeholder for its index; the two never drift apart.
#[derive(Debug, Clone, Default)]
pub struct SqlStatement {
    pub text: String,
    pub params: Vec<Value>,
}

impl SqlStatement {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params(
        text: impl Into<String>,
        params: impl IntoIterator<Item = Value>,
    ) -> Self {
        Self {
            text: text.into(),
            params: params.into_iter().collect(),
        }
    }

    /// Append a parameter value.
    pub fn bind(&mut self, value: impl AsValue) -> &mut Self {
        self.params.push(value.as_value());
        self
    }

    /// Index the next appended parameter will take.
    pub fn next_index(&self) -> usize {
        self.params.len()
    }

    /// Statement text without the trailing terminator.
    pub(crate) fn text_trimmed(&self) -> &str {
        self.text.trim_end().trim_end_matches(';').trim_end()
    }
}

impl From<&str> for SqlStatement {
    fn from(value: &str) -> Self {
        SqlStatement::new(value)
    }
}

impl From<String> for SqlStatement {
    fn from(value: String) -> Self {
        SqlStatement::new(value)
    }
}

impl Display for SqlStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", truncate_long!(self.text))
    }
}
