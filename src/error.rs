use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Channel #{0} does not exist or is invisible from bot or is archived")]
    ChannelNotFound(String),

    #[error("Channel #{0} has been archived")]
    ChannelArchived(String),

    #[error("{method} failed: {payload}")]
    Sink {
        method: String,
        payload: serde_json::Value,
    },

    #[error("Baseline commit {baseline} is not reachable from {tip} in {repo}")]
    BaselineUnreachable {
        repo: String,
        baseline: String,
        tip: String,
    },

    #[error("Cannot fast-forward {repo} to {remote}/{branch}")]
    Diverged {
        repo: String,
        remote: String,
        branch: String,
    },

    #[error("Rolling back {depth} commit(s) of {repo} after \"{cause}\" failed: {source}")]
    RollbackFailed {
        repo: String,
        depth: usize,
        cause: String,
        source: Box<Error>,
    },

    #[error("Diff entry has neither a before nor an after path")]
    InvalidDiffEntry,
}

impl Error {
    /// Failures of a single notification that the next poll cycle retries.
    pub fn is_delivery(&self) -> bool {
        matches!(self, Error::Sink { .. } | Error::Http(_))
    }
}
