//! Series identity: a stable hash over measurement + canonicalized tags.
//!
//! Canonicalization sorts tags by key before hashing so that two points with
//! the same measurement and the same tag mapping hash identically
//! regardless of the order tags were inserted in.

use std::collections::BTreeMap;

/// Builds the canonical series key used both for series-id hashing and for
/// the shard router's `hash(series_key) mod shards_in_group` placement.
pub fn canonical_key(measurement: &str, tags: &BTreeMap<String, String>) -> String {
    let mut key = String::with_capacity(measurement.len() + tags.len() * 16);
    key.push_str(measurement);
    key.push('\0');
    for (i, (k, v)) in tags.iter().enumerate() {
        if i > 0 {
            key.push(',');
        }
        key.push_str(k);
        key.push('=');
        key.push_str(v);
    }
    key
}

/// FNV-1a 64, used for both series ids and shard placement. Implemented
/// directly rather than pulling in a hashing crate: it's a dozen lines and
/// needs to be this exact, stable algorithm (not whatever
/// `std::hash::Hasher` happens to be today).
pub fn fnv1a64(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    let mut hash = OFFSET_BASIS;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

pub fn series_id(measurement: &str, tags: &BTreeMap<String, String>) -> u64 {
    fnv1a64(canonical_key(measurement, tags).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn series_id_is_stable_regardless_of_insertion_order() {
        let a = tags(&[("host", "a"), ("region", "us")]);
        let b = tags(&[("region", "us"), ("host", "a")]);
        assert_eq!(series_id("cpu", &a), series_id("cpu", &b));
    }

    #[test]
    fn different_tag_values_hash_differently() {
        let a = tags(&[("host", "a")]);
        let b = tags(&[("host", "b")]);
        assert_ne!(series_id("cpu", &a), series_id("cpu", &b));
    }

    #[test]
    fn fnv1a_matches_known_vector() {
        // FNV-1a 64 of the empty string is the offset basis.
        assert_eq!(fnv1a64(b""), 0xcbf29ce484222325);
    }
}
