// tierline-core/src/domain/compiler/params.rs

use crate::domain::error::DomainError;
use crate::domain::value::SqlValue;
use std::collections::BTreeMap;

/// SQL text with `$name` placeholders rewritten to positional `?`,
/// and the values to bind in the same order.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

#[derive(Debug, PartialEq)]
enum Segment {
    Code(String),
    Literal(String),
    Comment(String),
    Placeholder(String),
}

/// Minimal lexer: enough to tell code apart from string literals,
/// quoted identifiers and comments, where `$` must be left alone.
fn segments(sql: &str) -> Vec<Segment> {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = Vec::new();
    let mut code = String::new();
    let mut i = 0;

    let flush = |code: &mut String, out: &mut Vec<Segment>| {
        if !code.is_empty() {
            out.push(Segment::Code(std::mem::take(code)));
        }
    };

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match c {
            '\'' | '"' => {
                flush(&mut code, &mut out);
                let start = i;
                i += 1;
                while i < chars.len() && chars[i] != c {
                    i += 1;
                }
                i = (i + 1).min(chars.len());
                out.push(Segment::Literal(chars[start..i].iter().collect()));
            }
            '-' if next == Some('-') => {
                flush(&mut code, &mut out);
                let start = i;
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                out.push(Segment::Comment(chars[start..i].iter().collect()));
            }
            '/' if next == Some('*') => {
                flush(&mut code, &mut out);
                let start = i;
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i = (i + 2).min(chars.len());
                out.push(Segment::Comment(chars[start..i].iter().collect()));
            }
            '$' if next.is_some_and(|n| n.is_ascii_alphabetic() || n == '_') => {
                flush(&mut code, &mut out);
                let start = i + 1;
                i = start;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                out.push(Segment::Placeholder(chars[start..i].iter().collect()));
            }
            _ => {
                code.push(c);
                i += 1;
            }
        }
    }
    flush(&mut code, &mut out);
    out
}

/// Rewrites `$name` placeholders to `?` and collects their values.
/// `unit` names the calculation/model in errors.
pub fn bind_parameters(
    unit: &str,
    logic: &str,
    values: &BTreeMap<String, SqlValue>,
) -> Result<BoundQuery, DomainError> {
    let mut sql = String::with_capacity(logic.len());
    let mut params = Vec::new();

    for segment in segments(logic) {
        match segment {
            Segment::Placeholder(name) => {
                let value = values
                    .get(&name)
                    .ok_or_else(|| DomainError::MissingParameter {
                        unit: unit.to_string(),
                        parameter: name.clone(),
                    })?;
                sql.push('?');
                params.push(value.clone());
            }
            Segment::Code(s) | Segment::Literal(s) | Segment::Comment(s) => sql.push_str(&s),
        }
    }

    Ok(BoundQuery { sql, params })
}

/// The SQL without its comments.
pub fn strip_comments(sql: &str) -> String {
    segments(sql)
        .into_iter()
        .filter_map(|s| match s {
            Segment::Comment(_) => None,
            Segment::Placeholder(name) => Some(format!("${}", name)),
            Segment::Code(s) | Segment::Literal(s) => Some(s),
        })
        .collect()
}

/// True when something other than comments, whitespace and `;` remains.
pub fn is_executable(sql: &str) -> bool {
    strip_comments(sql)
        .chars()
        .any(|c| !c.is_whitespace() && c != ';')
}
