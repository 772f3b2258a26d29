use thiserror::Error;

#[derive(Debug, Error)]
pub enum CfError {
    /// Upstream reported that the handle (or other resource) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Upstream answered with `status: FAILED` for any other reason.
    #[error("Codeforces API error: {0}")]
    Failed(String),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl CfError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CfError::NotFound(_))
    }
}
