//! Self-describing binary export of the catalog, used by `GET /metastore`
//! and its inverse `restore`. A leading format-version `u32` lets a future
//! version reject or upgrade an incompatible blob instead of silently
//! misparsing it; the body is `serde_json`, matching this workspace's
//! pervasive use of `serde_json` over a bespoke binary codec.

use crate::catalog::Catalog;
use crate::error::MetaError;
use std::io::{Read, Write};

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

pub fn snapshot(catalog: &Catalog, mut writer: impl Write) -> Result<(), MetaError> {
    writer
        .write_all(&SNAPSHOT_FORMAT_VERSION.to_be_bytes())
        .map_err(|e| MetaError::SnapshotDecode(e.to_string()))?;
    serde_json::to_writer(&mut writer, catalog)
        .map_err(|e| MetaError::SnapshotDecode(e.to_string()))
}

pub fn restore(mut reader: impl Read) -> Result<Catalog, MetaError> {
    let mut version_bytes = [0u8; 4];
    reader
        .read_exact(&mut version_bytes)
        .map_err(|e| MetaError::SnapshotDecode(e.to_string()))?;
    let version = u32::from_be_bytes(version_bytes);
    if version != SNAPSHOT_FORMAT_VERSION {
        return Err(MetaError::UnsupportedSnapshotVersion {
            found: version,
            expected: SNAPSHOT_FORMAT_VERSION,
        });
    }
    serde_json::from_reader(reader).map_err(|e| MetaError::SnapshotDecode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::{self, LogRecord};

    #[test]
    fn round_trips_a_populated_catalog() {
        let mut catalog = Catalog::default();
        log::apply(
            &mut catalog,
            &LogRecord::CreateDatabase {
                name: "db".to_string(),
            },
        );
        log::apply(
            &mut catalog,
            &LogRecord::AssignDataNode {
                id: tsdb_base::DataNodeId(1),
                url: "http://a:8086".to_string(),
            },
        );

        let mut buf = Vec::new();
        snapshot(&catalog, &mut buf).unwrap();
        let restored = restore(&buf[..]).unwrap();

        assert!(restored.databases.contains_key("db"));
        assert_eq!(restored.data_nodes.len(), 1);
    }

    #[test]
    fn rejects_mismatched_version() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&999u32.to_be_bytes());
        buf.extend_from_slice(b"{}");
        assert!(matches!(
            restore(&buf[..]),
            Err(MetaError::UnsupportedSnapshotVersion { found: 999, .. })
        ));
    }
}
