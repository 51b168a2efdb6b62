use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker leadership is unknown; timed out after {0:?}")]
    UnableToJoin(std::time::Duration),
    #[error("not the leader; redirect to {leader}")]
    NotLeader { leader: String },
    #[error("broker transport error: {0}")]
    Transport(String),
}
