use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

// -- JWT Claims --

/// Bearer token claims. `exp` is a unix timestamp in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

// Required fields default to empty so a missing field surfaces as a
// validation message rather than a body rejection.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignupRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub codeforces_handle: Option<String>,
}

/// Password login by email or username.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GoogleLoginRequest {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub codeforces_handle: Option<String>,
    pub profile_picture: Option<String>,
    pub token: String,
}

// -- Profile --

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub email: Option<String>,
    /// Outer `None`: key absent, leave unchanged. `Some(None)`: clear the handle.
    #[serde(default, deserialize_with = "present")]
    pub codeforces_handle: Option<Option<String>>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

// -- Bookmarks --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateBookmarkRequest {
    #[serde(default)]
    pub problem_id: String,
    #[serde(default)]
    pub problem_name: String,
    #[serde(default)]
    pub rating: Option<i64>,
    /// `null` and absent both mean no tags.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

// -- Generic bodies --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}
