//! Minimal statement representation. The query parser/execution
//! engine proper is out of scope; this is intentionally far short of
//! full SQL, but enough to drive `/query` end-to-end with a time-bounded
//! measurement scan (`SELECT * FROM <measurement> [WHERE time >= a AND
//! time < b]`).

use crate::error::QueryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start_nanos: i64,
    pub end_nanos: i64,
}

impl TimeRange {
    pub fn contains(&self, timestamp_nanos: i64) -> bool {
        timestamp_nanos >= self.start_nanos && timestamp_nanos < self.end_nanos
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Select {
        measurement: String,
        time_range: Option<TimeRange>,
    },
}

/// Splits a query string on `;` and parses each non-empty statement,
/// matching "statements execute in declared order".
pub fn parse_statements(query: &str) -> Result<Vec<Statement>, QueryError> {
    query
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_one)
        .collect()
}

fn parse_one(stmt: &str) -> Result<Statement, QueryError> {
    let upper = stmt.to_ascii_uppercase();
    if !upper.trim_start().starts_with("SELECT *") {
        return Err(QueryError::Parse(format!(
            "only `SELECT * FROM <measurement>` is supported, got {stmt:?}"
        )));
    }
    let from_idx = upper
        .find("FROM")
        .ok_or_else(|| QueryError::Parse(format!("expected FROM clause in {stmt:?}")))?;

    let (measurement_part, where_part) = match upper[from_idx..].find("WHERE") {
        Some(offset) => {
            let where_idx = from_idx + offset;
            (
                stmt[from_idx + 4..where_idx].trim(),
                Some(stmt[where_idx + 5..].trim()),
            )
        }
        None => (stmt[from_idx + 4..].trim(), None),
    };

    let measurement = measurement_part.to_string();
    if measurement.is_empty() {
        return Err(QueryError::Parse(format!(
            "missing measurement in {stmt:?}"
        )));
    }
    let time_range = where_part.map(parse_time_range).transpose()?;
    Ok(Statement::Select {
        measurement,
        time_range,
    })
}

fn parse_time_range(clause: &str) -> Result<TimeRange, QueryError> {
    let upper = clause.to_ascii_uppercase();
    let and_idx = upper.find("AND").ok_or_else(|| {
        QueryError::Parse(format!("expected `time >= a AND time < b`, got {clause:?}"))
    })?;
    let (left, right) = (clause[..and_idx].trim(), clause[and_idx + 3..].trim());
    Ok(TimeRange {
        start_nanos: parse_bound(left, ">=")?,
        end_nanos: parse_bound(right, "<")?,
    })
}

fn parse_bound(expr: &str, op: &str) -> Result<i64, QueryError> {
    let idx = expr
        .find(op)
        .ok_or_else(|| QueryError::Parse(format!("expected {op:?} in {expr:?}")))?;
    expr[idx + op.len()..]
        .trim()
        .parse::<i64>()
        .map_err(|e| QueryError::Parse(format!("invalid time bound in {expr:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_select_star() {
        let stmts = parse_statements("SELECT * FROM cpu").unwrap();
        assert_eq!(
            stmts,
            vec![Statement::Select {
                measurement: "cpu".to_string(),
                time_range: None,
            }]
        );
    }

    #[test]
    fn parses_time_bounded_select() {
        let stmts = parse_statements("SELECT * FROM cpu WHERE time >= 10 AND time < 20").unwrap();
        assert_eq!(
            stmts,
            vec![Statement::Select {
                measurement: "cpu".to_string(),
                time_range: Some(TimeRange {
                    start_nanos: 10,
                    end_nanos: 20,
                }),
            }]
        );
    }

    #[test]
    fn splits_multiple_statements_in_order() {
        let stmts = parse_statements("SELECT * FROM cpu; SELECT * FROM mem").unwrap();
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn rejects_unsupported_statement_shape() {
        assert!(parse_statements("DROP MEASUREMENT cpu").is_err());
    }

    #[test]
    fn rejects_missing_measurement() {
        assert!(parse_statements("SELECT * FROM").is_err());
    }
}
