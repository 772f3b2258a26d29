use axum::{Extension, Json, extract::State, response::IntoResponse};
use axum_extra::extract::WithRejection;
use tracing::info;

use cpa_db::Conflict;
use cpa_types::api::UpdateProfileRequest;
use cpa_types::models::UserProfile;

use crate::auth::{AppState, with_db};
use crate::error::ApiError;
use crate::rows::profile_from_row;

pub async fn get_profile(Extension(user): Extension<UserProfile>) -> impl IntoResponse {
    Json(user)
}

/// PUT /users/profile: change email and/or the linked Codeforces handle.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<UserProfile>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateProfileRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req
        .email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty() && *e != user.email);

    // Empty string clears the handle just like null.
    let handle = req
        .codeforces_handle
        .map(|h| h.map(|h| h.trim().to_string()).filter(|h| !h.is_empty()));

    let id = user.id.to_string();
    let updated = with_db(&state, move |db| {
        if let Some(email) = email.as_deref() {
            if db.get_user_by_email(email)?.is_some() {
                return Ok(None);
            }
        }

        let result = db.update_profile(
            &id,
            email.as_deref(),
            handle.as_ref().map(|h| h.as_deref()),
        );
        match result {
            Ok(()) => {}
            // Another account took the address after the check.
            Err(e) if Conflict::of(&e) == Some(Conflict::Email) => return Ok(None),
            Err(e) => return Err(e),
        }

        db.get_user_by_id(&id)?
            .map(Some)
            .ok_or_else(|| anyhow::anyhow!("user {} vanished during update", id))
    })
    .await?
    .ok_or_else(|| ApiError::Conflict("An account with this email already exists".into()))?;

    info!("Profile updated for {}", updated.username);
    Ok(Json(profile_from_row(&updated)?))
}
