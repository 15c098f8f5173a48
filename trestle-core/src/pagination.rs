use crate::{
    Dialect, Executor, PageSyntax, QueryError, Result, RowLabeled, SqlStatement, Value,
    find_order_by, split_order_by, split_projection,
    stream::TryStreamExt,
};
use log::debug;

/// A validated request for one page of a result set, 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    page_size: u64,
}

impl PageRequest {
    /// Rejects `page < 0` and `page_size <= 0` before any I/O happens.
    pub fn new(page: i64, page_size: i64) -> Result<Self> {
        if page < 0 {
            return Err(QueryError::InvalidArgument(format!(
                "page must be non-negative, got {}",
                page
            ))
            .into());
        }
        if page_size <= 0 {
            return Err(QueryError::InvalidArgument(format!(
                "page size must be positive, got {}",
                page_size
            ))
            .into());
        }
        Ok(Self {
            page: page as u64,
            page_size: page_size as u64,
        })
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }
}

/// One resolved page of a result set.
#[derive(Debug, Clone)]
pub struct PageResult<T> {
    /// The page actually returned. Differs from the request when the
    /// request ran past the end.
    pub page: u64,
    pub page_size: u64,
    /// Records matching the unpaged statement at count time.
    pub record_count: u64,
    /// `ceil(record_count / page_size)`.
    pub page_count: u64,
    pub rows: Vec<T>,
}

/// Rewrite a SELECT into the equivalent `SELECT COUNT(*)`.
///
/// Any outer `ORDER BY` is dropped first: ordering is meaningless for a
/// scalar count and some backends reject it without a limit. The FROM and
/// WHERE text is carried over verbatim, parameters included.
pub fn count_statement(statement: &SqlStatement) -> Result<SqlStatement> {
    if statement.text.trim().is_empty() {
        return Err(QueryError::InvalidArgument("statement text is empty".into()).into());
    }
    let trimmed = statement.text_trimmed();
    let text = match split_order_by(trimmed) {
        Some((before, _)) => before,
        None => trimmed,
    };
    let parts = split_projection(text)?;
    let mut out = String::with_capacity(parts.from_onward.len() + 16);
    out.push_str("SELECT COUNT(*) ");
    out.push_str(parts.from_onward.trim_end());
    Ok(SqlStatement::with_params(out, statement.params.iter().cloned()))
}

/// Append the dialect's paging clause to a copy of `statement`, along with
/// the two positional parameters it references: page size first, then
/// `offset = page * page_size`.
pub fn page_statement(
    dialect: Dialect,
    statement: &SqlStatement,
    page: u64,
    page_size: u64,
) -> Result<SqlStatement> {
    if statement.text.trim().is_empty() {
        return Err(QueryError::InvalidArgument("statement text is empty".into()).into());
    }
    let mut text = statement.text_trimmed().to_string();
    let mut params = statement.params.clone();
    let size_index = params.len();
    let offset_index = size_index + 1;
    let offset = page.saturating_mul(page_size).min(i64::MAX as u64);
    params.push(Value::Int64(Some(page_size.min(i64::MAX as u64) as i64)));
    params.push(Value::Int64(Some(offset as i64)));
    match dialect.page_syntax() {
        PageSyntax::LimitOffset => {
            text.push_str(" LIMIT ");
            dialect.write_placeholder(&mut text, size_index);
            text.push_str(" OFFSET ");
            dialect.write_placeholder(&mut text, offset_index);
        }
        PageSyntax::OffsetFetch => {
            if find_order_by(&text).is_none() {
                // the backend rejects OFFSET/FETCH on an unordered statement
                text.push_str(" ORDER BY (SELECT NULL)");
            }
            text.push_str(" OFFSET ");
            dialect.write_placeholder(&mut text, offset_index);
            text.push_str(" ROWS FETCH NEXT ");
            dialect.write_placeholder(&mut text, size_index);
            text.push_str(" ROWS ONLY");
        }
    }
    Ok(SqlStatement { text, params })
}

/// Resolve one page of `statement`'s results.
///
/// The record count is re-resolved on every attempt because it can change
/// between the count query and the page fetch, and a page that ran past the
/// end is corrected to the last page that exists. Each retry strictly
/// decreases the page, so the loop terminates at page 0. This is
/// best-effort under concurrent writers; callers needing exact consistency
/// run it inside an isolated transaction.
pub async fn paginate<E: Executor>(
    executor: &mut E,
    statement: &SqlStatement,
    request: PageRequest,
) -> Result<PageResult<RowLabeled>> {
    let dialect = executor.dialect();
    let count = count_statement(statement)?;
    let mut page = request.page();
    let page_size = request.page_size();
    loop {
        let record_count = executor
            .fetch_scalar(count.clone())
            .await?
            .as_i64()
            .ok_or_else(|| {
                QueryError::InvariantViolation("count query returned a non-integer".into())
            })?
            .max(0) as u64;
        let page_count = record_count.div_ceil(page_size);
        if page >= page_count {
            page = page_count.saturating_sub(1);
        }
        let paged = page_statement(dialect, statement, page, page_size)?;
        debug!(
            "{}: fetching page {} of {} ({} records): {}",
            dialect, page, page_count, record_count, paged
        );
        let rows: Vec<RowLabeled> = executor.fetch(paged).try_collect().await?;
        if rows.is_empty() && page > 0 {
            // the count shrank between the two round trips; retry from the
            // new top
            continue;
        }
        return Ok(PageResult {
            page,
            page_size,
            record_count,
            page_count,
            rows,
        });
    }
}
