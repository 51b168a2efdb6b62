//! An HTTP client stub for a peer broker, exercising the leader-redirect
//! contract even though this workspace ships only one real broker
//! implementation (`LocalBroker`). A production multi-node consensus
//! implementation is out of scope; this gives the rest of the cluster
//! code a second `Broker` impl to be written against so the trait
//! boundary is real, not aspirational.

use crate::error::BrokerError;
use crate::Broker;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt as _};
use serde::Deserialize;
use std::sync::RwLock;
use std::time::Duration;
use tsdb_meta::log::{Entry, LogRecord};

/// How long `propose` will keep retrying against a redirected leader before
/// giving up with `UnableToJoin`.
const DEFAULT_JOIN_DEADLINE: Duration = Duration::from_secs(5);

#[derive(Deserialize)]
struct ProposeResponse {
    index: u64,
}

#[derive(Deserialize)]
struct RedirectResponse {
    leader: String,
}

pub struct RemoteBroker {
    client: reqwest::Client,
    leader_url: RwLock<String>,
    join_deadline: Duration,
}

impl RemoteBroker {
    pub fn new(initial_leader_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            leader_url: RwLock::new(initial_leader_url.into()),
            join_deadline: DEFAULT_JOIN_DEADLINE,
        }
    }

    fn leader(&self) -> String {
        self.leader_url.read().unwrap().clone()
    }

    fn set_leader(&self, url: String) {
        *self.leader_url.write().unwrap() = url;
    }
}

#[async_trait]
impl Broker for RemoteBroker {
    async fn propose(&self, record: LogRecord) -> Result<u64, BrokerError> {
        let deadline = tokio::time::Instant::now() + self.join_deadline;
        loop {
            let url = format!("{}/internal/propose", self.leader());
            let resp = self
                .client
                .post(&url)
                .json(&record)
                .send()
                .await
                .map_err(|e| BrokerError::Transport(e.to_string()))?;

            if resp.status() == reqwest::StatusCode::TEMPORARY_REDIRECT {
                let redirect: RedirectResponse = resp
                    .json()
                    .await
                    .map_err(|e| BrokerError::Transport(e.to_string()))?;
                self.set_leader(redirect.leader.clone());
                if tokio::time::Instant::now() >= deadline {
                    return Err(BrokerError::UnableToJoin(self.join_deadline));
                }
                continue;
            }

            if !resp.status().is_success() {
                return Err(BrokerError::Transport(format!(
                    "propose failed with status {}",
                    resp.status()
                )));
            }

            let body: ProposeResponse = resp
                .json()
                .await
                .map_err(|e| BrokerError::Transport(e.to_string()))?;
            return Ok(body.index);
        }
    }

    fn stream(&self, _start_index: u64) -> BoxStream<'static, Entry> {
        // Streaming from a real peer would hold a long-lived chunked HTTP
        // response parsed line-by-line; wiring that up has no local broker
        // to talk to in this workspace; callers exercise `stream` only
        // against `LocalBroker` today. An empty stream keeps the trait
        // object usable rather than panicking if ever constructed.
        stream::empty().boxed()
    }
}
