//! A single-node broker: it is always its own leader, so `propose` commits
//! immediately and `stream` never redirects. Sufficient to drive the full
//! write/query pipeline end-to-end without a real Raft/gossip
//! implementation, which is explicitly out of scope.

use crate::error::BrokerError;
use crate::Broker;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Mutex;
use tokio::sync::broadcast;
use tsdb_meta::log::{Entry, LogRecord};

const BROADCAST_CAPACITY: usize = 1024;

pub struct LocalBroker {
    log: Mutex<Vec<Entry>>,
    committed: broadcast::Sender<Entry>,
}

impl LocalBroker {
    pub fn new() -> Self {
        let (committed, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            log: Mutex::new(Vec::new()),
            committed,
        }
    }
}

impl Default for LocalBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Broker for LocalBroker {
    async fn propose(&self, record: LogRecord) -> Result<u64, BrokerError> {
        let entry = {
            let mut log = self.log.lock().unwrap();
            let index = log.len() as u64 + 1;
            let entry = Entry { index, record };
            log.push(entry.clone());
            entry
        };
        // A lagging/absent subscriber simply misses the broadcast and
        // catches up via `stream`'s replay-from-index on its next restart;
        // dropping the send here is not an error for the proposer.
        let _ = self.committed.send(entry.clone());
        Ok(entry.index)
    }

    fn stream(&self, start_index: u64) -> BoxStream<'static, Entry> {
        let backlog: Vec<Entry> = self
            .log
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.index >= start_index)
            .cloned()
            .collect();
        let live = self.committed.subscribe();
        let last_backlog_index = backlog.last().map(|e| e.index).unwrap_or(start_index.saturating_sub(1));

        let live_stream = stream::unfold(
            (live, last_backlog_index),
            move |(mut rx, mut last)| async move {
                loop {
                    match rx.recv().await {
                        Ok(entry) if entry.index > last => {
                            last = entry.index;
                            return Some((entry, (rx, last)));
                        }
                        Ok(_) => continue, // already covered by the backlog
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            },
        );

        stream::iter(backlog).chain(live_stream).boxed()
    }
}
