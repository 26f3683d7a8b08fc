use thiserror::Error;

/// Failure taxonomy for the composer core.
///
/// `Config` and `Validation` are rejected before any network call.
/// `Transport` wraps a non-success backend status with its diagnostic body.
/// `Decode` means the reply was malformed with nothing salvageable.
#[derive(Error, Debug)]
pub enum DeckError {
    #[error("{0}")]
    Config(String),

    #[error("{backend} API error: {status}")]
    Transport {
        backend: &'static str,
        status: u16,
        body: String,
    },

    #[error("{0}")]
    Decode(String),

    #[error("{0}")]
    Validation(String),

    #[error("{step} step timed out after {secs}s")]
    Timeout { step: &'static str, secs: u64 },

    #[error("run superseded by a newer prompt")]
    Superseded,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DeckError>;
