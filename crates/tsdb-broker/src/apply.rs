//! Drives a [`crate::Broker`]'s committed-entry stream into a
//! [`tsdb_meta::Metastore`]. This is the "single log-apply task" referenced
//! by `Metastore`'s own docs: the thing that turns "committed" into
//! "locally applied" so `Metastore::wait_for_index` has something to wait
//! for. Every process that holds both a broker and a metastore spawns
//! exactly one of these, started from the metastore's own last-applied
//! index so a restart resumes rather than replays from scratch.

use crate::Broker;
use futures::StreamExt;
use std::sync::Arc;
use tsdb_meta::Metastore;

/// Spawns the apply loop and returns its handle. Dropping the handle does
/// not stop the task; abort it explicitly on shutdown.
pub fn spawn_apply_loop(broker: Arc<dyn Broker>, meta: Metastore) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut stream = broker.stream(meta.last_applied_index() + 1);
        while let Some(entry) = stream.next().await {
            if let Err(err) = meta.apply_committed(&entry).await {
                tracing::error!(index = entry.index, %err, "failed to apply committed log entry");
            }
        }
    })
}
