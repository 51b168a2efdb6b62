//! Monotonic identifier newtypes.
//!
//! Every id space (data nodes, shards, shard groups) is assigned from a
//! counter that lives in the metastore and is never rewound, even after the
//! entity it named is removed (see the DataNode/Shard invariants in the
//! spec's data model section).

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(v: u64) -> Self {
                Self(v)
            }
        }
    };
}

id_newtype!(DataNodeId);
id_newtype!(ShardId);
id_newtype!(ShardGroupId);

/// A monotonic counter, replicated as part of the metastore's catalog.
/// `next()` hands out the id and advances the counter; ids are never reused
/// even if the caller discards the returned value (e.g. a proposal that is
/// never applied still burns the id it would have used, matching "ids are
/// never reused" for data nodes).
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
pub struct IdSequence(u64);

impl IdSequence {
    pub fn next(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }

    pub fn peek(&self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_never_repeats() {
        let mut seq = IdSequence::default();
        let a = seq.next();
        let b = seq.next();
        assert_eq!(a, 1);
        assert_eq!(b, 2);
        assert!(b > a);
    }

    #[test]
    fn newtype_displays_inner_value() {
        assert_eq!(DataNodeId(42).to_string(), "42");
    }
}
