use anyhow::{Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};

pub const GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Verified identity returned by the federated login provider. `sub` and
/// `email` are empty when the provider omitted them.
#[derive(Debug, Clone, Default)]
pub struct FederatedIdentity {
    pub sub: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Turns a client-supplied ID token into a verified identity.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<FederatedIdentity>;
}

/// Verifies Google ID tokens with the `tokeninfo` endpoint.
pub struct GoogleVerifier {
    http: reqwest::Client,
    tokeninfo_url: String,
    /// Expected `aud`. Left unset only in development.
    client_id: Option<String>,
}

impl GoogleVerifier {
    pub fn new(client_id: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            tokeninfo_url: GOOGLE_TOKENINFO_URL.to_string(),
            client_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    #[serde(default)]
    aud: String,
    #[serde(default)]
    sub: String,
    #[serde(default)]
    email: String,
    /// tokeninfo sends the string "true"; accept a JSON bool as well.
    #[serde(default, deserialize_with = "flag")]
    email_verified: bool,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

#[async_trait]
impl IdentityVerifier for GoogleVerifier {
    async fn verify(&self, token: &str) -> Result<FederatedIdentity> {
        let response = self
            .http
            .get(&self.tokeninfo_url)
            .query(&[("id_token", token)])
            .send()
            .await?;

        if !response.status().is_success() {
            bail!("tokeninfo rejected token with status {}", response.status());
        }

        let info: TokenInfo = response.json().await?;
        check_audience(&info, self.client_id.as_deref())?;
        check_email_verified(&info)?;

        Ok(FederatedIdentity {
            sub: info.sub,
            email: info.email,
            name: info.name,
            picture: info.picture,
        })
    }
}

fn check_audience(info: &TokenInfo, client_id: Option<&str>) -> Result<()> {
    match client_id {
        Some(expected) if info.aud != expected => {
            bail!("token audience {} does not match client id", info.aud)
        }
        _ => Ok(()),
    }
}

/// Accounts are matched by email, so an unverified address must never get
/// through.
fn check_email_verified(info: &TokenInfo) -> Result<()> {
    if !info.email_verified {
        bail!("email {} is not verified by the provider", info.email);
    }
    Ok(())
}

fn flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Text(text) => text.eq_ignore_ascii_case("true"),
    })
}
