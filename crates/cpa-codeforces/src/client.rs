use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use cpa_types::codeforces::{CfUser, Contest, ProblemSet, RatingChange, Submission};

use crate::error::CfError;

pub const DEFAULT_BASE_URL: &str = "https://codeforces.com/api";

/// Read-only view of the contest platform.
#[async_trait]
pub trait ContestSource: Send + Sync {
    async fn user_info(&self, handle: &str) -> Result<CfUser, CfError>;

    async fn user_rating(&self, handle: &str) -> Result<Vec<RatingChange>, CfError>;

    async fn user_status(&self, handle: &str) -> Result<Vec<Submission>, CfError>;

    /// `tags` is passed through verbatim (`;`-separated on the wire).
    async fn problemset(&self, tags: Option<&str>) -> Result<ProblemSet, CfError>;

    async fn contests(&self) -> Result<Vec<Contest>, CfError>;
}

/// HTTP client for the public Codeforces API.
#[derive(Clone)]
pub struct CodeforcesClient {
    http: reqwest::Client,
    base_url: String,
}

impl CodeforcesClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, &str)],
    ) -> Result<T, CfError> {
        let url = format!("{}/{}", self.base_url, method);
        debug!("GET {} {:?}", url, query);

        let response = self.http.get(&url).query(query).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        decode_envelope(status, &body)
    }
}

impl Default for CodeforcesClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[async_trait]
impl ContestSource for CodeforcesClient {
    async fn user_info(&self, handle: &str) -> Result<CfUser, CfError> {
        let users: Vec<CfUser> = self.call("user.info", &[("handles", handle)]).await?;
        users
            .into_iter()
            .next()
            .ok_or_else(|| CfError::NotFound(format!("handle {}", handle)))
    }

    async fn user_rating(&self, handle: &str) -> Result<Vec<RatingChange>, CfError> {
        self.call("user.rating", &[("handle", handle)]).await
    }

    async fn user_status(&self, handle: &str) -> Result<Vec<Submission>, CfError> {
        self.call("user.status", &[("handle", handle), ("from", "1")]).await
    }

    async fn problemset(&self, tags: Option<&str>) -> Result<ProblemSet, CfError> {
        match tags {
            Some(tags) => self.call("problemset.problems", &[("tags", tags)]).await,
            None => self.call("problemset.problems", &[]).await,
        }
    }

    async fn contests(&self) -> Result<Vec<Contest>, CfError> {
        self.call("contest.list", &[("gym", "false")]).await
    }
}

/// Every API response is wrapped as `{status, comment?, result?}`.
#[derive(Deserialize)]
struct Envelope<T> {
    status: String,
    comment: Option<String>,
    result: Option<T>,
}

/// Unwraps the response envelope. Failed calls come back with a 4xx status
/// but still carry a JSON envelope, so the body is decoded first and the HTTP
/// status only matters when the body is not an envelope at all.
pub(crate) fn decode_envelope<T: DeserializeOwned>(
    http_status: u16,
    body: &[u8],
) -> Result<T, CfError> {
    let envelope: Envelope<T> = match serde_json::from_slice(body) {
        Ok(envelope) => envelope,
        Err(_) if !(200..300).contains(&http_status) => return Err(CfError::Status(http_status)),
        Err(e) => return Err(e.into()),
    };

    if envelope.status == "OK" {
        return envelope
            .result
            .ok_or_else(|| CfError::Failed("response has no result".into()));
    }

    let comment = envelope.comment.unwrap_or_else(|| envelope.status.clone());
    if comment.to_lowercase().contains("not found") {
        Err(CfError::NotFound(comment))
    } else {
        Err(CfError::Failed(comment))
    }
}
