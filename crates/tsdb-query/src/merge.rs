//! Deterministic merge across shard sub-query results: timestamp
//! ascending, tie-break by series key lexicographic. A standalone
//! function so the ordering invariant is directly unit-testable without
//! standing up the full pipeline.

use crate::executor::SeriesPoint;

pub fn merge(batches: Vec<Vec<SeriesPoint>>) -> Vec<SeriesPoint> {
    let mut merged: Vec<SeriesPoint> = batches.into_iter().flatten().collect();
    merged.sort_by(|a, b| {
        a.timestamp_nanos
            .cmp(&b.timestamp_nanos)
            .then_with(|| a.series_key.cmp(&b.series_key))
    });
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn point(series_key: &str, ts: i64) -> SeriesPoint {
        SeriesPoint {
            series_key: series_key.to_string(),
            measurement: "cpu".to_string(),
            tags: BTreeMap::new(),
            timestamp_nanos: ts,
            fields: BTreeMap::new(),
        }
    }

    #[test]
    fn orders_by_timestamp_ascending() {
        let merged = merge(vec![
            vec![point("a", 30), point("a", 10)],
            vec![point("a", 20)],
        ]);
        let timestamps: Vec<i64> = merged.iter().map(|p| p.timestamp_nanos).collect();
        assert_eq!(timestamps, vec![10, 20, 30]);
    }

    #[test]
    fn ties_break_on_series_key() {
        let merged = merge(vec![vec![point("b", 10), point("a", 10)]]);
        let keys: Vec<&str> = merged.iter().map(|p| p.series_key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
