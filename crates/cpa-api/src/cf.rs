use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};

use cpa_codeforces::catalog::{self, ProblemFilter, SortKey};
use cpa_codeforces::compare::compare_snapshots;
use cpa_codeforces::derive::{DEFAULT_TOP_TAGS, HandleStats, handle_stats};
use cpa_codeforces::snapshot::fetch_solved_set_best_effort;
use cpa_codeforces::{CfError, fetch_handle_snapshot};
use cpa_types::codeforces::{CfUser, RatingChange};

use crate::auth::AppState;
use crate::error::ApiError;

pub async fn user_info(
    State(state): State<AppState>,
    WithRejection(Path(handle), _): WithRejection<Path<String>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .contests
        .user_info(&handle)
        .await
        .map_err(|e| ApiError::from_cf(e, "User not found", "Error fetching user info"))?;
    Ok(Json(user))
}

pub async fn user_rating(
    State(state): State<AppState>,
    WithRejection(Path(handle), _): WithRejection<Path<String>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let history = state.contests.user_rating(&handle).await.map_err(|e| {
        ApiError::from_cf(e, "Rating history not found", "Error fetching rating history")
    })?;
    Ok(Json(history))
}

pub async fn user_status(
    State(state): State<AppState>,
    WithRejection(Path(handle), _): WithRejection<Path<String>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let submissions = state.contests.user_status(&handle).await.map_err(|e| {
        ApiError::from_cf(e, "Submissions not found", "Error fetching submissions")
    })?;
    Ok(Json(submissions))
}

#[derive(Debug, Deserialize)]
pub struct ProblemsQuery {
    pub tags: Option<String>,
}

pub async fn problems(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<ProblemsQuery>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let tags = query.tags.as_deref().filter(|t| !t.trim().is_empty());
    let set = state
        .contests
        .problemset(tags)
        .await
        .map_err(|e| ApiError::from_cf(e, "Problems not found", "Error fetching problems"))?;
    Ok(Json(set))
}

pub async fn contests(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let all = state
        .contests
        .contests()
        .await
        .map_err(|e| ApiError::from_cf(e, "Contests not found", "Error fetching contests"))?;
    Ok(Json(catalog::upcoming_contests(all)))
}

#[derive(Debug, Serialize)]
pub struct HandleSummary {
    pub profile: CfUser,
    pub rating_history: Vec<RatingChange>,
    pub stats: HandleStats,
}

/// Dashboard view of one handle: profile, sorted rating history and the
/// derived statistics.
pub async fn summary(
    State(state): State<AppState>,
    WithRejection(Path(handle), _): WithRejection<Path<String>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = fetch_handle_snapshot(state.contests.as_ref(), &handle)
        .await
        .map_err(|e| ApiError::from_cf(e, "User not found", "Error fetching user data"))?;

    let stats = handle_stats(&snapshot, DEFAULT_TOP_TAGS);
    Ok(Json(HandleSummary {
        profile: snapshot.profile,
        rating_history: snapshot.rating_history,
        stats,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CompareQuery {
    pub handle1: Option<String>,
    pub handle2: Option<String>,
}

pub async fn compare(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<CompareQuery>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let non_empty = |h: Option<String>| h.map(|h| h.trim().to_string()).filter(|h| !h.is_empty());
    let (Some(handle1), Some(handle2)) = (non_empty(query.handle1), non_empty(query.handle2)) else {
        return Err(ApiError::Validation("Please enter both handles".into()));
    };

    let source = state.contests.as_ref();
    let fetch = |handle: String| async move {
        fetch_handle_snapshot(source, &handle)
            .await
            .map_err(|e| snapshot_error(e, &handle))
    };

    let (left, right) = tokio::try_join!(fetch(handle1), fetch(handle2))?;
    let now = chrono::Utc::now().timestamp();
    Ok(Json(compare_snapshots(&left, &right, now)))
}

fn snapshot_error(err: CfError, handle: &str) -> ApiError {
    ApiError::from_cf(
        err,
        &format!("User {} not found", handle),
        &format!("Error fetching data for {}", handle),
    )
}

#[derive(Debug, Deserialize)]
pub struct RecommendQuery {
    /// `;` or `,` separated, all must match.
    pub tags: Option<String>,
    pub min_rating: Option<i64>,
    pub max_rating: Option<i64>,
    pub q: Option<String>,
    pub sort: Option<String>,
    #[serde(default)]
    pub solved_only: bool,
    pub handle: Option<String>,
    pub limit: Option<usize>,
}

/// Filtered and sorted problem catalog. The tag filter is applied locally so
/// multiple tags combine with AND.
pub async fn recommend(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<RecommendQuery>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let sort = match query.sort.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => raw
            .parse::<SortKey>()
            .map_err(|e| ApiError::Validation(e.to_string()))?,
        None => SortKey::default(),
    };

    let handle = query
        .handle
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty());
    if query.solved_only && handle.is_none() {
        return Err(ApiError::Validation(
            "A handle is required to show solved problems".into(),
        ));
    }

    let rating_range = match (query.min_rating, query.max_rating) {
        (None, None) => None,
        (min, max) => Some((min.unwrap_or(0), max.unwrap_or(i64::MAX))),
    };

    let filter = ProblemFilter {
        tags: split_tags(query.tags.as_deref()),
        rating_range,
        search: query.q,
        solved_only: query.solved_only,
    };

    let source = state.contests.as_ref();
    let solved = async {
        match handle.as_deref() {
            Some(handle) => fetch_solved_set_best_effort(source, handle).await,
            None => Default::default(),
        }
    };
    let (set, solved) = tokio::join!(source.problemset(None), solved);
    let set = set.map_err(|e| ApiError::from_cf(e, "Problems not found", "Error fetching problems"))?;

    Ok(Json(catalog::recommend(set, &filter, sort, &solved, query.limit)))
}

fn split_tags(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split([';', ','])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
