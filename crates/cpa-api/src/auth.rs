use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::WithRejection;
use jsonwebtoken::{EncodingKey, Header, encode};
use rand_core::OsRng;
use tracing::{error, info, warn};
use uuid::Uuid;

use cpa_codeforces::ContestSource;
use cpa_db::{Conflict, Database};
use cpa_db::models::{NewUser, UserRow};
use cpa_types::api::{AuthResponse, Claims, GoogleLoginRequest, LoginRequest, SignupRequest};

use crate::error::ApiError;
use crate::google::{FederatedIdentity, IdentityVerifier};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    /// Lifetime of issued bearer tokens. There is no refresh.
    pub token_ttl: chrono::Duration,
    pub contests: Arc<dyn ContestSource>,
    pub identity: Arc<dyn IdentityVerifier>,
}

/// Run a blocking DB closure off the async runtime.
pub(crate) async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    let result = tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            anyhow::anyhow!("database task failed")
        })??;
    Ok(result)
}

const EMAIL_TAKEN: &str = "An account with this email already exists";
const EMAIL_TAKEN_GOOGLE: &str = "An account with this email already exists. Please use Google login.";
const USERNAME_TAKEN: &str = "Username already taken";

pub async fn signup(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<SignupRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.trim().to_string();
    let email = req.email.trim().to_string();
    if username.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation(
            "Username, email, and password are required".into(),
        ));
    }

    let codeforces_handle = req
        .codeforces_handle
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty());
    let password = req.password;

    let user = with_db(&state, move |db| {
        if let Some(conflict) = signup_conflict(db, &email, &username)? {
            return Ok(Err(conflict));
        }

        // Hash password with Argon2id
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
            .to_string();

        let id = Uuid::new_v4().to_string();
        let created = db.create_user(&NewUser {
            id: &id,
            username: &username,
            email: &email,
            password: Some(&password_hash),
            google_id: None,
            profile_picture: None,
            codeforces_handle: codeforces_handle.as_deref(),
        });

        if let Err(e) = created {
            // A concurrent signup claimed the email or username after the check.
            let Some(conflict) = Conflict::of(&e) else {
                return Err(e);
            };
            let error = signup_conflict(db, &email, &username)?.unwrap_or_else(|| match conflict {
                Conflict::Username => ApiError::Conflict(USERNAME_TAKEN.into()),
                _ => ApiError::Conflict(EMAIL_TAKEN.into()),
            });
            return Ok(Err(error));
        }

        db.get_user_by_id(&id)?
            .map(Ok)
            .ok_or_else(|| anyhow::anyhow!("user {} missing after insert", id))
    })
    .await??;

    info!("New account {} ({})", user.username, user.id);
    let response = auth_response(&state, &user)?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// The conflict a signup for `email`/`username` would hit right now, if any.
/// Federated-only accounts get pointed at the right login method.
fn signup_conflict(db: &Database, email: &str, username: &str) -> anyhow::Result<Option<ApiError>> {
    if let Some(existing) = db.get_user_by_email(email)? {
        let message = if existing.google_id.is_some() {
            EMAIL_TAKEN_GOOGLE
        } else {
            EMAIL_TAKEN
        };
        return Ok(Some(ApiError::Conflict(message.into())));
    }

    if db.get_user_by_username(username)?.is_some() {
        return Ok(Some(ApiError::Conflict(USERNAME_TAKEN.into())));
    }

    Ok(None)
}

pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let identifier = req
        .email
        .filter(|s| !s.trim().is_empty())
        .or(req.username.filter(|s| !s.trim().is_empty()))
        .map(|s| s.trim().to_string());

    let Some(identifier) = identifier.filter(|_| !req.password.is_empty()) else {
        return Err(ApiError::Validation(
            "Email/Username and password are required".into(),
        ));
    };

    let user = with_db(&state, move |db| db.find_user_by_login(&identifier))
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".into()))?;

    let Some(stored_hash) = user.password.as_deref() else {
        return Err(ApiError::Unauthorized(
            "This account uses Google login. Please sign in with Google.".into(),
        ));
    };

    let parsed_hash = PasswordHash::new(stored_hash)
        .map_err(|e| anyhow::anyhow!("stored hash for {} is corrupt: {}", user.id, e))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized("Invalid credentials".into()))?;

    Ok(Json(auth_response(&state, &user)?))
}

pub async fn google_login(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<GoogleLoginRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    if req.token.trim().is_empty() {
        return Err(ApiError::Validation("Google token is required".into()));
    }

    let identity = state.identity.verify(req.token.trim()).await.map_err(|e| {
        warn!("Google token verification failed: {:#}", e);
        ApiError::Unauthorized("Invalid Google token".into())
    })?;

    if identity.email.is_empty() || identity.sub.is_empty() {
        return Err(ApiError::Validation(
            "Invalid Google account information".into(),
        ));
    }

    let user = with_db(&state, move |db| link_or_provision(db, &identity)).await?;
    Ok(Json(auth_response(&state, &user)?))
}

/// Find the account matching the federated identity by email or subject id,
/// linking it if needed, or create a new password-less account.
fn link_or_provision(db: &Database, identity: &FederatedIdentity) -> anyhow::Result<UserRow> {
    if let Some(user) = db.find_user_by_email_or_google_id(&identity.email, &identity.sub)? {
        return link_existing(db, user, identity);
    }

    let base = base_username(identity.name.as_deref(), &identity.email);
    let mut counter = 0;
    loop {
        let username = match counter {
            0 => base.clone(),
            n => format!("{}{}", base, n),
        };
        counter += 1;

        if db.get_user_by_username(&username)?.is_some() {
            continue;
        }

        let id = Uuid::new_v4().to_string();
        let created = db.create_user(&NewUser {
            id: &id,
            username: &username,
            email: &identity.email,
            password: None,
            google_id: Some(&identity.sub),
            profile_picture: identity.picture.as_deref(),
            codeforces_handle: None,
        });

        match created {
            Ok(()) => {
                info!("Provisioned account {} from Google sign-in", username);
                return db
                    .get_user_by_id(&id)?
                    .ok_or_else(|| anyhow::anyhow!("user {} missing after insert", id));
            }
            // Name taken between the check and the insert; try the next one.
            Err(e) if Conflict::of(&e) == Some(Conflict::Username) => continue,
            // A concurrent sign-in created or claimed this identity first.
            Err(e) if Conflict::of(&e).is_some() => {
                let user = db
                    .find_user_by_email_or_google_id(&identity.email, &identity.sub)?
                    .ok_or(e)?;
                return link_existing(db, user, identity);
            }
            Err(e) => return Err(e),
        }
    }
}

fn link_existing(
    db: &Database,
    user: UserRow,
    identity: &FederatedIdentity,
) -> anyhow::Result<UserRow> {
    if user.google_id.is_some() {
        return Ok(user);
    }

    db.link_google_account(&user.id, &identity.sub, identity.picture.as_deref())?;
    info!("Linked Google account to {}", user.username);
    db.get_user_by_id(&user.id)?
        .ok_or_else(|| anyhow::anyhow!("user {} vanished while linking", user.id))
}

/// Display name without whitespace, lowercased; falls back to the local part
/// of the email.
pub(crate) fn base_username(name: Option<&str>, email: &str) -> String {
    name.map(|n| {
        n.chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase()
    })
    .filter(|n| !n.is_empty())
    .unwrap_or_else(|| email.split('@').next().unwrap_or(email).to_string())
}

fn auth_response(state: &AppState, user: &UserRow) -> Result<AuthResponse, ApiError> {
    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("corrupt user id '{}': {}", user.id, e))?;

    let token = create_token(&state.jwt_secret, user_id, &user.username, state.token_ttl)?;

    Ok(AuthResponse {
        id: user_id,
        username: user.username.clone(),
        email: user.email.clone(),
        codeforces_handle: user.codeforces_handle.clone(),
        profile_picture: user.profile_picture.clone(),
        token,
    })
}

pub fn create_token(
    secret: &str,
    user_id: Uuid,
    username: &str,
    ttl: chrono::Duration,
) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + ttl).timestamp().max(0) as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
