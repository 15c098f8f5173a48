use crate::{QueryError, Result};

/// Locating clause boundaries in SQL text without parsing it.
///
/// The scanner walks the statement once, skipping `'…'` string literals,
/// `"…"` quoted identifiers and `[…]` bracketed identifiers (closing
/// characters escaped by doubling), and tracking parenthesis depth, so a
/// keyword inside a subquery, a function call or a literal never matches.
/// Matching is case-insensitive and multiline.
#[derive(Clone, Copy, Debug)]
struct Token<'a> {
    text: &'a str,
    start: usize,
    depth: u32,
}

impl Token<'_> {
    fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

struct Scanner<'a> {
    sql: &'a str,
    pos: usize,
    depth: u32,
}

impl<'a> Scanner<'a> {
    fn new(sql: &'a str) -> Self {
        Self { sql, pos: 0, depth: 0 }
    }

    fn skip_quoted(&mut self, close: u8) {
        let bytes = self.sql.as_bytes();
        self.pos += 1;
        while self.pos < bytes.len() {
            if bytes[self.pos] == close {
                // a doubled closing character stays inside the region
                if bytes.get(self.pos + 1) == Some(&close) {
                    self.pos += 2;
                    continue;
                }
                self.pos += 1;
                return;
            }
            self.pos += 1;
        }
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Token<'a>;
    fn next(&mut self) -> Option<Token<'a>> {
        let bytes = self.sql.as_bytes();
        while self.pos < bytes.len() {
            match bytes[self.pos] {
                b'\'' => self.skip_quoted(b'\''),
                b'"' => self.skip_quoted(b'"'),
                b'[' => self.skip_quoted(b']'),
                b'(' => {
                    self.depth += 1;
                    self.pos += 1;
                }
                b')' => {
                    self.depth = self.depth.saturating_sub(1);
                    self.pos += 1;
                }
                b',' => {
                    let token = Token {
                        text: &self.sql[self.pos..self.pos + 1],
                        start: self.pos,
                        depth: self.depth,
                    };
                    self.pos += 1;
                    return Some(token);
                }
                b if b.is_ascii_alphabetic() || b == b'_' => {
                    let start = self.pos;
                    while self.pos < bytes.len()
                        && (bytes[self.pos].is_ascii_alphanumeric() || bytes[self.pos] == b'_')
                    {
                        self.pos += 1;
                    }
                    return Some(Token {
                        text: &self.sql[start..self.pos],
                        start,
                        depth: self.depth,
                    });
                }
                _ => self.pos += 1,
            }
        }
        None
    }
}

/// Word indices where `phrase` occurs at nesting depth zero, with nothing
/// but whitespace between its words.
fn phrase_matches(sql: &str, words: &[Token], phrase: &[&str]) -> Vec<usize> {
    debug_assert!(!phrase.is_empty());
    let mut result = Vec::new();
    'outer: for i in 0..words.len() {
        for (j, part) in phrase.iter().enumerate() {
            let Some(word) = words.get(i + j) else {
                continue 'outer;
            };
            if word.depth != 0 || !word.text.eq_ignore_ascii_case(part) {
                continue 'outer;
            }
            if j > 0 && !sql[words[i + j - 1].end()..word.start].trim().is_empty() {
                continue 'outer;
            }
        }
        result.push(i);
    }
    result
}

/// Byte offset of the rightmost top-level `ORDER BY`, skipping any that a
/// preceding `AS` turns into an alias.
pub fn find_order_by(sql: &str) -> Option<usize> {
    let words: Vec<_> = Scanner::new(sql).collect();
    phrase_matches(sql, &words, &["ORDER", "BY"])
        .into_iter()
        .rev()
        .find(|&i| i == 0 || !words[i - 1].text.eq_ignore_ascii_case("AS"))
        .map(|i| words[i].start)
}

/// Split at the rightmost top-level `ORDER BY`: `(before, order_by_onward)`.
pub fn split_order_by(sql: &str) -> Option<(&str, &str)> {
    find_order_by(sql).map(|at| (&sql[..at], &sql[at..]))
}

/// Byte offset of the leftmost top-level occurrence of `phrase`.
pub fn find_top_level(sql: &str, phrase: &[&str]) -> Option<usize> {
    let words: Vec<_> = Scanner::new(sql).collect();
    phrase_matches(sql, &words, phrase)
        .first()
        .map(|&i| words[i].start)
}

/// True when a `,` appears at nesting depth zero anywhere in `sql`.
pub fn has_top_level_comma(sql: &str) -> bool {
    Scanner::new(sql).any(|token| token.depth == 0 && token.text == ",")
}

/// The pieces of a SELECT statement around its projection list.
#[derive(Debug, PartialEq, Eq)]
pub struct SelectParts<'a> {
    /// The `SELECT` keyword plus any `DISTINCT`/`ALL` qualifier.
    pub head: &'a str,
    /// Projection list, trimmed.
    pub projection: &'a str,
    /// Everything from the top-level `FROM` keyword onward.
    pub from_onward: &'a str,
}

/// Split a statement believed to start with `SELECT` into keyword,
/// projection list and `FROM`-onward, tolerating nested parentheses
/// (subqueries, function calls) inside the projection.
pub fn split_projection(sql: &str) -> Result<SelectParts<'_>> {
    let mut scanner = Scanner::new(sql);
    let first = scanner.next().filter(|v| {
        v.depth == 0
            && v.text.eq_ignore_ascii_case("SELECT")
            && sql[..v.start].trim().is_empty()
    });
    let Some(first) = first else {
        return Err(QueryError::MalformedQuery(format!(
            "expected a statement starting with SELECT: {}",
            crate::truncate_long!(sql),
        ))
        .into());
    };
    let mut head_end = first.end();
    let mut from_start = None;
    let mut qualifier = true;
    for token in scanner {
        if qualifier {
            qualifier = false;
            if token.depth == 0
                && (token.text.eq_ignore_ascii_case("DISTINCT")
                    || token.text.eq_ignore_ascii_case("ALL"))
            {
                head_end = token.end();
                continue;
            }
        }
        if token.depth == 0 && token.text.eq_ignore_ascii_case("FROM") {
            from_start = Some(token.start);
            break;
        }
    }
    let Some(from_start) = from_start else {
        return Err(QueryError::MalformedQuery(format!(
            "no top-level FROM clause: {}",
            crate::truncate_long!(sql),
        ))
        .into());
    };
    let projection = sql[head_end..from_start].trim();
    if projection.is_empty() {
        return Err(QueryError::MalformedQuery(format!(
            "empty projection list: {}",
            crate::truncate_long!(sql),
        ))
        .into());
    }
    Ok(SelectParts {
        head: &sql[first.start..head_end],
        projection,
        from_onward: &sql[from_start..],
    })
}
