use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use jsonwebtoken::{DecodingKey, Validation, decode};

use cpa_types::api::Claims;

use crate::auth::{AppState, with_db};
use crate::error::ApiError;
use crate::rows::profile_from_row;

/// Validate the bearer JWT, load the account it names and hand the
/// `UserProfile` to the handler as a request extension.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| ApiError::Unauthorized("Not authorized, no token".into()))?;

    let claims = decode_token(&state.jwt_secret, bearer.token())
        .map_err(|_| ApiError::Unauthorized("Not authorized, token failed".into()))?;

    let user_id = claims.sub.to_string();
    let user = with_db(&state, move |db| db.get_user_by_id(&user_id))
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Not authorized, user not found".into()))?;

    req.extensions_mut().insert(profile_from_row(&user)?);
    Ok(next.run(req).await)
}

/// Signature and expiry check.
pub fn decode_token(secret: &str, token: &str) -> jsonwebtoken::errors::Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}
