//! Batch normalization: a standalone pure function so the round-trip
//! and normalization invariants are directly unit-testable without HTTP or
//! the broker.

use crate::batch::BatchPoints;
use crate::error::WriteError;
use std::collections::BTreeMap;
use std::str::FromStr;
use tsdb_base::{now_nanos, Precision, Scalar};

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPoint {
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    pub timestamp_nanos: i64,
    pub fields: BTreeMap<String, Scalar>,
}

/// Applies the normalization rules in order:
/// 1. a point missing a timestamp inherits the batch timestamp, else now.
/// 2. precision (point overrides batch, default nanoseconds) converts any
///    integer timestamp to nanoseconds.
/// 3. batch-level tags not already present on the point are copied in,
///    point tags taking precedence.
/// 4. structural validation: non-empty measurement, non-empty fields,
///    disjoint tag/field keys. Field-type-conflict-against-schema is
///    checked by the coordinator against the metastore, not here, since
///    that requires catalog state this function deliberately doesn't see.
pub fn normalize(batch: BatchPoints) -> Result<Vec<NormalizedPoint>, WriteError> {
    if batch.database.is_empty() {
        return Err(WriteError::DatabaseRequired);
    }

    let batch_precision = parse_precision(batch.precision.as_deref())?;

    let mut out = Vec::with_capacity(batch.points.len());
    for point in batch.points {
        if point.name.is_empty() {
            return Err(WriteError::MeasurementRequired);
        }
        if point.values.is_empty() {
            return Err(WriteError::FieldsRequired);
        }

        let precision = match point.precision.as_deref() {
            Some(p) => parse_precision(Some(p))?,
            None => batch_precision,
        };

        let timestamp_nanos = match point.timestamp.as_ref().or(batch.timestamp.as_ref()) {
            Some(ts) => ts
                .to_nanos(precision)
                .map_err(WriteError::InvalidTimestamp)?,
            None => now_nanos(),
        };

        let mut tags = point.tags;
        for (k, v) in &batch.tags {
            tags.entry(k.clone()).or_insert_with(|| v.clone());
        }

        for key in point.values.keys() {
            if tags.contains_key(key) {
                return Err(WriteError::TagFieldCollision(key.clone()));
            }
        }

        out.push(NormalizedPoint {
            measurement: point.name,
            tags,
            timestamp_nanos,
            fields: point.values,
        });
    }

    Ok(out)
}

fn parse_precision(raw: Option<&str>) -> Result<Precision, WriteError> {
    match raw {
        None | Some("") => Ok(Precision::default()),
        Some(p) => {
            Precision::from_str(p).map_err(|e| WriteError::InvalidTimestamp(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{WirePoint, WireTimestamp};

    fn batch(points: Vec<WirePoint>) -> BatchPoints {
        BatchPoints {
            database: "db".to_string(),
            retention_policy: String::new(),
            tags: BTreeMap::new(),
            timestamp: None,
            precision: None,
            points,
        }
    }

    fn point(name: &str, values: &[(&str, Scalar)]) -> WirePoint {
        WirePoint {
            name: name.to_string(),
            tags: BTreeMap::new(),
            timestamp: None,
            precision: None,
            values: values.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        }
    }

    #[test]
    fn preserves_point_count() {
        let b = batch(vec![
            point("cpu", &[("v", Scalar::Int(1))]),
            point("mem", &[("v", Scalar::Int(2))]),
        ]);
        let out = normalize(b).unwrap();
        assert_eq!(out.len(), 2);
        for p in &out {
            assert_ne!(p.timestamp_nanos, 0);
        }
    }

    #[test]
    fn batch_tags_fill_in_missing_point_tags_without_overriding() {
        let mut b = batch(vec![point("cpu", &[("v", Scalar::Int(1))])]);
        b.tags.insert("host".to_string(), "a".to_string());
        b.points[0].tags.insert("host".to_string(), "b".to_string());
        let out = normalize(b).unwrap();
        assert_eq!(out[0].tags.get("host"), Some(&"b".to_string()));

        let mut b2 = batch(vec![point("cpu", &[("v", Scalar::Int(1))])]);
        b2.tags.insert("host".to_string(), "a".to_string());
        let out2 = normalize(b2).unwrap();
        assert_eq!(out2[0].tags.get("host"), Some(&"a".to_string()));
    }

    #[test]
    fn seconds_precision_applies_to_nanos() {
        let mut b = batch(vec![point("cpu", &[("v", Scalar::Int(1))])]);
        b.timestamp = Some(WireTimestamp::Epoch(1_700_000_000));
        b.precision = Some("s".to_string());
        let out = normalize(b).unwrap();
        assert_eq!(out[0].timestamp_nanos, 1_700_000_000_000_000_000);
    }

    #[test]
    fn rejects_missing_database() {
        let mut b = batch(vec![]);
        b.database = String::new();
        assert_eq!(normalize(b).unwrap_err(), WriteError::DatabaseRequired);
    }

    #[test]
    fn rejects_empty_measurement() {
        let b = batch(vec![point("", &[("v", Scalar::Int(1))])]);
        assert_eq!(normalize(b).unwrap_err(), WriteError::MeasurementRequired);
    }

    #[test]
    fn rejects_tag_field_collision() {
        let mut p = point("cpu", &[("host", Scalar::Int(1))]);
        p.tags.insert("host".to_string(), "a".to_string());
        let b = batch(vec![p]);
        assert!(matches!(
            normalize(b).unwrap_err(),
            WriteError::TagFieldCollision(_)
        ));
    }
}
