/// Shared error type used across all website-monitor crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database: {0}")]
    Sqlite(String),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// A precondition for the requested check was not met (e.g. visual
    /// check requested with no stored baselines). The message is shown to
    /// the operator verbatim — it must already be user-facing.
    #[error("{0}")]
    Precondition(String),

    #[error("config: {0}")]
    Config(String),

    #[error("lock: {0}")]
    Lock(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }
}
