use std::collections::HashSet;

use serde::Serialize;
use tracing::warn;

use cpa_types::codeforces::{CfUser, RatingChange, Submission};

use crate::client::ContestSource;
use crate::derive;
use crate::error::CfError;

/// Everything fetched for one handle in a single request.
#[derive(Debug, Clone, Serialize)]
pub struct HandleSnapshot {
    pub profile: CfUser,
    /// Ascending by rating update time.
    pub rating_history: Vec<RatingChange>,
    pub submissions: Vec<Submission>,
    /// `false` when the submission list could not be fetched and
    /// `submissions` is empty for that reason rather than genuinely empty.
    pub submissions_available: bool,
}

/// Fetch profile, rating history and submissions concurrently.
///
/// Profile and rating history are required: the first failure among them
/// fails the snapshot. The submission list is optional and degrades to empty.
pub async fn fetch_handle_snapshot<S>(source: &S, handle: &str) -> Result<HandleSnapshot, CfError>
where
    S: ContestSource + ?Sized,
{
    let required = async { tokio::try_join!(source.user_info(handle), source.user_rating(handle)) };
    let (required, submissions) = tokio::join!(required, source.user_status(handle));

    let (profile, mut rating_history) = required?;
    rating_history.sort_by_key(|change| change.rating_update_time_seconds);

    let (submissions, submissions_available) = match submissions {
        Ok(submissions) => (submissions, true),
        Err(e) => {
            warn!("Submissions for {} unavailable, continuing without them: {}", handle, e);
            (Vec::new(), false)
        }
    };

    Ok(HandleSnapshot {
        profile,
        rating_history,
        submissions,
        submissions_available,
    })
}

/// Solved problem keys for `handle`, or an empty set if the lookup fails.
/// Only used for cosmetic "solved" badges, so failures are not reported.
pub async fn fetch_solved_set_best_effort<S>(source: &S, handle: &str) -> HashSet<String>
where
    S: ContestSource + ?Sized,
{
    match source.user_status(handle).await {
        Ok(submissions) => derive::solved_set(&submissions),
        Err(e) => {
            warn!("Solved-set lookup for {} failed: {}", handle, e);
            HashSet::new()
        }
    }
}
