use rusqlite::ErrorCode;
use thiserror::Error;

/// A write collided with a UNIQUE constraint. Returned inside the
/// `anyhow::Error` of the failing query; callers use `downcast_ref`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Conflict {
    #[error("username already taken")]
    Username,
    #[error("email already registered")]
    Email,
    #[error("google account already linked")]
    GoogleId,
    #[error("problem already bookmarked")]
    Bookmark,
}

impl Conflict {
    /// Look for a conflict behind an error returned by a query.
    pub fn of(err: &anyhow::Error) -> Option<Self> {
        err.downcast_ref::<Conflict>().copied()
    }
}

/// Turn UNIQUE violations on known columns into [`Conflict`]. Everything
/// else, primary key collisions included, passes through unchanged.
pub(crate) fn classify(err: rusqlite::Error) -> anyhow::Error {
    let conflict = match &err {
        rusqlite::Error::SqliteFailure(e, Some(msg)) if e.code == ErrorCode::ConstraintViolation => {
            // "UNIQUE constraint failed: users.email"
            match msg.strip_prefix("UNIQUE constraint failed: ") {
                Some("users.username") => Some(Conflict::Username),
                Some("users.email") => Some(Conflict::Email),
                Some("users.google_id") => Some(Conflict::GoogleId),
                Some("bookmarks.user_id, bookmarks.problem_id") => Some(Conflict::Bookmark),
                _ => None,
            }
        }
        _ => None,
    };

    match conflict {
        Some(conflict) => conflict.into(),
        None => err.into(),
    }
}
