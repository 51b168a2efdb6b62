//! The read/apply façade used by the rest of the workspace.
//!
//! Reads take a cheap clone of the current [`Catalog`] under a shared lock;
//! writes are serialized through a single apply path keyed by log index, so
//! that "a proposal returns only after its record is locally applied"
//! holds without the catalog lock ever being held across an await point.

use crate::catalog::Catalog;
use crate::error::MetaError;
use crate::log::{self, Entry, LogRecord};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};

/// Applies committed log entries to an in-memory [`Catalog`].
///
/// This is deliberately not the broker: [`Metastore`] only knows how to
/// validate and apply records. Ordering and distribution across nodes is
/// `tsdb-broker`'s job; the two are wired together by `tsdb-cluster`.
#[derive(Clone)]
pub struct Metastore {
    inner: Arc<RwLock<Catalog>>,
    applied_index: watch::Sender<u64>,
}

impl Metastore {
    pub fn new() -> Self {
        let (applied_index, _) = watch::channel(0);
        Self {
            inner: Arc::new(RwLock::new(Catalog::default())),
            applied_index,
        }
    }

    pub fn from_catalog(catalog: Catalog) -> Self {
        let (applied_index, _) = watch::channel(0);
        Self {
            inner: Arc::new(RwLock::new(catalog)),
            applied_index,
        }
    }

    /// A snapshot-consistent read. The returned clone is independent of any
    /// concurrent writer; cloning a `Catalog` of realistic size is cheap
    /// relative to holding the lock across a handler's lifetime.
    pub async fn snapshot(&self) -> Catalog {
        self.inner.read().await.clone()
    }

    /// Validates `record` against the current catalog, then applies it and
    /// advances `index`. Called from the single log-apply task that
    /// consumes the broker's committed stream (see `tsdb-cluster`), so
    /// concurrent calls never race for the same index.
    pub async fn apply_committed(&self, entry: &Entry) -> Result<(), MetaError> {
        let mut guard = self.inner.write().await;
        log::validate(&guard, &entry.record)?;
        log::apply(&mut guard, &entry.record);
        drop(guard);
        let _ = self.applied_index.send(entry.index);
        Ok(())
    }

    /// Validates a record the caller is *about to propose*, without
    /// applying it. Used so that obviously-bad proposals (duplicate
    /// database name) fail before ever reaching the broker.
    pub async fn validate(&self, record: &LogRecord) -> Result<(), MetaError> {
        let guard = self.inner.read().await;
        log::validate(&guard, record)
    }

    pub fn last_applied_index(&self) -> u64 {
        *self.applied_index.borrow()
    }

    /// Resolves once the local apply path has caught up to `index`, or
    /// immediately if it already has. Backs "a proposal returns only after
    /// its record is locally applied".
    pub async fn wait_for_index(&self, index: u64) {
        let mut rx = self.applied_index.subscribe();
        while *rx.borrow() < index {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for Metastore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn apply_is_observable_only_after_commit() {
        let meta = Metastore::new();
        assert!(!meta.snapshot().await.databases.contains_key("db"));

        meta.apply_committed(&Entry {
            index: 1,
            record: LogRecord::CreateDatabase {
                name: "db".to_string(),
            },
        })
        .await
        .unwrap();

        assert!(meta.snapshot().await.databases.contains_key("db"));
        assert_eq!(meta.last_applied_index(), 1);
    }

    #[tokio::test]
    async fn wait_for_index_resolves_after_apply() {
        let meta = Metastore::new();
        let waiter = meta.clone();
        let handle = tokio::spawn(async move {
            waiter.wait_for_index(1).await;
        });

        meta.apply_committed(&Entry {
            index: 1,
            record: LogRecord::CreateDatabase {
                name: "db".to_string(),
            },
        })
        .await
        .unwrap();

        tokio::time::timeout(std::time::Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn validate_rejects_duplicate_database_before_apply() {
        let meta = Metastore::new();
        meta.apply_committed(&Entry {
            index: 1,
            record: LogRecord::CreateDatabase {
                name: "db".to_string(),
            },
        })
        .await
        .unwrap();

        let err = meta
            .validate(&LogRecord::CreateDatabase {
                name: "db".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err, MetaError::DatabaseExists);
    }
}
