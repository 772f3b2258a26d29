use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use cpa_db::Conflict;
use cpa_db::models::NewBookmark;
use cpa_types::api::{CreateBookmarkRequest, MessageBody};
use cpa_types::models::{Bookmark, UserProfile};

use crate::auth::{AppState, with_db};
use crate::error::ApiError;
use crate::rows::bookmark_from_row;

pub async fn list_bookmarks(
    State(state): State<AppState>,
    Extension(user): Extension<UserProfile>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = user.id.to_string();
    let rows = with_db(&state, move |db| db.list_bookmarks(&user_id)).await?;

    let bookmarks = rows
        .into_iter()
        .map(bookmark_from_row)
        .collect::<anyhow::Result<Vec<Bookmark>>>()?;

    Ok(Json(bookmarks))
}

pub async fn create_bookmark(
    State(state): State<AppState>,
    Extension(user): Extension<UserProfile>,
    WithRejection(Json(req), _): WithRejection<Json<CreateBookmarkRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let problem_id = req.problem_id.trim().to_string();
    let problem_name = req.problem_name.trim().to_string();
    if problem_id.is_empty() || problem_name.is_empty() {
        return Err(ApiError::Validation(
            "problem_id and problem_name are required".into(),
        ));
    }

    let tags = serde_json::to_string(&req.tags.unwrap_or_default()).map_err(anyhow::Error::from)?;
    let id = Uuid::new_v4().to_string();
    let user_id = user.id.to_string();

    let row = with_db(&state, move |db| {
        if db.get_bookmark_by_problem(&user_id, &problem_id)?.is_some() {
            return Ok(None);
        }
        let inserted = db.insert_bookmark(&NewBookmark {
            id: &id,
            user_id: &user_id,
            problem_id: &problem_id,
            problem_name: &problem_name,
            rating: req.rating,
            tags: &tags,
        });
        match inserted {
            Ok(()) => db.get_bookmark(&id, &user_id),
            // Same problem saved by a concurrent request.
            Err(e) if Conflict::of(&e) == Some(Conflict::Bookmark) => Ok(None),
            Err(e) => Err(e),
        }
    })
    .await?
    .ok_or_else(|| ApiError::Conflict("Problem is already bookmarked".into()))?;

    Ok((StatusCode::CREATED, Json(bookmark_from_row(row)?)))
}

/// DELETE /users/bookmarks/{id}. Only the owner can remove a bookmark;
/// anyone else, or an id that was never issued, gets 404.
pub async fn delete_bookmark(
    State(state): State<AppState>,
    Extension(user): Extension<UserProfile>,
    WithRejection(Path(bookmark_id), _): WithRejection<Path<String>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let not_found = || ApiError::NotFound("Bookmark not found".into());

    let id = bookmark_id
        .parse::<Uuid>()
        .map_err(|_| not_found())?
        .to_string();
    let user_id = user.id.to_string();
    let removed = with_db(&state, move |db| db.delete_bookmark(&id, &user_id)).await?;

    if !removed {
        return Err(not_found());
    }

    Ok(Json(MessageBody {
        message: "Bookmark removed".into(),
    }))
}
