//! Wire shapes for the write body. A timestamp may arrive as either an
//! integer epoch (interpreted at the given precision) or an ISO-8601
//! string; the decoder tries the numeric form first and falls back to the
//! string form, never guessing on an ambiguous value.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tsdb_base::Scalar;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireTimestamp {
    Epoch(i64),
    Iso(String),
}

impl WireTimestamp {
    /// Resolves to nanoseconds, interpreting an epoch integer at `precision`
    /// and an ISO-8601 string as exact RFC 3339 (precision does not apply
    /// to the string form, since it already carries its own precision).
    pub fn to_nanos(&self, precision: tsdb_base::Precision) -> Result<i64, String> {
        match self {
            WireTimestamp::Epoch(v) => Ok(precision.to_nanos(*v)),
            WireTimestamp::Iso(s) => chrono::DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.timestamp_nanos_opt().unwrap_or_default())
                .map_err(|e| format!("invalid timestamp {s:?}: {e}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WirePoint {
    pub name: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub timestamp: Option<WireTimestamp>,
    #[serde(default)]
    pub precision: Option<String>,
    pub values: BTreeMap<String, Scalar>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPoints {
    #[serde(default)]
    pub database: String,
    #[serde(rename = "retentionPolicy", default)]
    pub retention_policy: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub timestamp: Option<WireTimestamp>,
    #[serde(default)]
    pub precision: Option<String>,
    pub points: Vec<WirePoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_epoch_timestamp_before_trying_string() {
        let json = r#"{"database":"db","timestamp":1700000000,"points":[]}"#;
        let batch: BatchPoints = serde_json::from_str(json).unwrap();
        assert!(matches!(batch.timestamp, Some(WireTimestamp::Epoch(1700000000))));
    }

    #[test]
    fn decodes_iso_timestamp_when_not_numeric() {
        let json = r#"{"database":"db","timestamp":"2020-01-01T00:00:00Z","points":[]}"#;
        let batch: BatchPoints = serde_json::from_str(json).unwrap();
        assert!(matches!(batch.timestamp, Some(WireTimestamp::Iso(_))));
    }
}
