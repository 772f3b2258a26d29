use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

use cpa_db::models::{BookmarkRow, UserRow};
use cpa_types::models::{Bookmark, UserProfile};

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
pub(crate) fn parse_db_time(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc()))
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

pub(crate) fn profile_from_row(row: &UserRow) -> Result<UserProfile> {
    Ok(UserProfile {
        id: row.id.parse().with_context(|| format!("corrupt user id '{}'", row.id))?,
        username: row.username.clone(),
        email: row.email.clone(),
        codeforces_handle: row.codeforces_handle.clone(),
        profile_picture: row.profile_picture.clone(),
        google_id: row.google_id.clone(),
        created_at: parse_db_time(&row.created_at),
        updated_at: parse_db_time(&row.updated_at),
    })
}

pub(crate) fn bookmark_from_row(row: BookmarkRow) -> Result<Bookmark> {
    let tags = serde_json::from_str(&row.tags).unwrap_or_else(|e| {
        warn!("Corrupt tags on bookmark '{}': {}", row.id, e);
        Vec::new()
    });

    Ok(Bookmark {
        id: row.id.parse().with_context(|| format!("corrupt bookmark id '{}'", row.id))?,
        user_id: row
            .user_id
            .parse()
            .with_context(|| format!("corrupt user_id on bookmark '{}'", row.id))?,
        problem_id: row.problem_id,
        problem_name: row.problem_name,
        rating: row.rating,
        tags,
        created_at: parse_db_time(&row.created_at),
    })
}
