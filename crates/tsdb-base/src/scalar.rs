//! Field value representation.
//!
//! Decoding tries the numeric interpretation first and only falls back to
//! string/bool on failure, mirroring the "never guess on ambiguous zero
//! values" design note for dynamic JSON shapes: an explicit untagged enum,
//! tried most-specific-first.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl Scalar {
    /// A coarse type tag used for the measurement's field-schema conflict
    /// check (an int64 field can never silently become a string field).
    pub fn kind(&self) -> ScalarKind {
        match self {
            Scalar::Int(_) => ScalarKind::Int,
            Scalar::Float(_) => ScalarKind::Float,
            Scalar::Bool(_) => ScalarKind::Bool,
            Scalar::Str(_) => ScalarKind::Str,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalarKind {
    Int,
    Float,
    Bool,
    Str,
}
