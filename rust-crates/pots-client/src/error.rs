use crate::messages::clean_error_message;
use reqwest::StatusCode;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0} is not initialized")]
    NotInitialized(&'static str),

    #[error("{kind} query failed: {source}")]
    Query {
        kind: &'static str,
        #[source]
        source: Box<Error>,
    },

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid json payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("endpoint responded with {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("transaction simulation failed: {0}")]
    Simulation(String),

    #[error("transaction broadcast failed: {0}")]
    Broadcast(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub fn query(kind: &'static str, source: Error) -> Self {
        Error::Query {
            kind,
            source: Box::new(source),
        }
    }

    /// Text suitable for a toast: chain errors are reduced to the contract's own message.
    pub fn user_message(&self) -> String {
        match self {
            Error::Simulation(raw) | Error::Broadcast(raw) => clean_error_message(raw),
            Error::Query { source, .. } => source.user_message(),
            other => other.to_string(),
        }
    }
}
