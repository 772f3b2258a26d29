use crate::Database;
use crate::error::classify;
use crate::models::{BookmarkRow, NewBookmark, NewUser, UserRow};
use anyhow::Result;
use rusqlite::{Connection, Row};

const USER_COLUMNS: &str = "id, username, email, password, google_id, profile_picture, \
                            codeforces_handle, created_at, updated_at";

const BOOKMARK_COLUMNS: &str = "id, user_id, problem_id, problem_name, rating, tags, created_at";

impl Database {
    // -- Users --

    pub fn create_user(&self, user: &NewUser<'_>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, password, google_id, profile_picture, codeforces_handle)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    user.id,
                    user.username,
                    user.email,
                    user.password,
                    user.google_id,
                    user.profile_picture,
                    user.codeforces_handle,
                ],
            )
            .map_err(classify)?;
            Ok(())
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", &[&id]))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username = ?1", &[&username]))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email = ?1", &[&email]))
    }

    /// Password login accepts either the email or the username.
    pub fn find_user_by_login(&self, identifier: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email = ?1 OR username = ?1", &[&identifier]))
    }

    /// Federated login matches an existing account by email or subject id.
    pub fn find_user_by_email_or_google_id(
        &self,
        email: &str,
        google_id: &str,
    ) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            query_user(conn, "email = ?1 OR google_id = ?2", &[&email, &google_id])
        })
    }

    /// Attach a Google subject id to an existing account. The picture is only
    /// replaced when one is supplied.
    pub fn link_google_account(
        &self,
        id: &str,
        google_id: &str,
        profile_picture: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users
                 SET google_id = ?2,
                     profile_picture = COALESCE(?3, profile_picture),
                     updated_at = datetime('now')
                 WHERE id = ?1",
                rusqlite::params![id, google_id, profile_picture],
            )
            .map_err(classify)?;
            Ok(())
        })
    }

    /// `email: None` keeps the current email. `codeforces_handle: None` keeps
    /// the current handle, `Some(None)` clears it.
    pub fn update_profile(
        &self,
        id: &str,
        email: Option<&str>,
        codeforces_handle: Option<Option<&str>>,
    ) -> Result<()> {
        let (set_handle, handle) = match codeforces_handle {
            Some(handle) => (true, handle),
            None => (false, None),
        };

        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users
                 SET email = COALESCE(?2, email),
                     codeforces_handle = CASE WHEN ?3 THEN ?4 ELSE codeforces_handle END,
                     updated_at = datetime('now')
                 WHERE id = ?1",
                rusqlite::params![id, email, set_handle, handle],
            )
            .map_err(classify)?;
            Ok(())
        })
    }

    // -- Bookmarks --

    pub fn insert_bookmark(&self, bookmark: &NewBookmark<'_>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO bookmarks (id, user_id, problem_id, problem_name, rating, tags)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    bookmark.id,
                    bookmark.user_id,
                    bookmark.problem_id,
                    bookmark.problem_name,
                    bookmark.rating,
                    bookmark.tags,
                ],
            )
            .map_err(classify)?;
            Ok(())
        })
    }

    pub fn list_bookmarks(&self, user_id: &str) -> Result<Vec<BookmarkRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM bookmarks WHERE user_id = ?1 ORDER BY created_at, rowid",
                BOOKMARK_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], bookmark_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Fetch a bookmark only if it belongs to `user_id`.
    pub fn get_bookmark(&self, id: &str, user_id: &str) -> Result<Option<BookmarkRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM bookmarks WHERE id = ?1 AND user_id = ?2",
                BOOKMARK_COLUMNS
            );
            let row = conn
                .query_row(&sql, [id, user_id], bookmark_from_row)
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_bookmark_by_problem(
        &self,
        user_id: &str,
        problem_id: &str,
    ) -> Result<Option<BookmarkRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM bookmarks WHERE user_id = ?1 AND problem_id = ?2",
                BOOKMARK_COLUMNS
            );
            let row = conn
                .query_row(&sql, [user_id, problem_id], bookmark_from_row)
                .optional()?;
            Ok(row)
        })
    }

    /// Returns `false` when no bookmark with that id is owned by `user_id`.
    pub fn delete_bookmark(&self, id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM bookmarks WHERE id = ?1 AND user_id = ?2",
                [id, user_id],
            )?;
            Ok(removed > 0)
        })
    }
}

fn query_user(
    conn: &Connection,
    predicate: &str,
    params: &[&dyn rusqlite::types::ToSql],
) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE {} LIMIT 1", USER_COLUMNS, predicate);
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row(params, user_from_row).optional()?;
    Ok(row)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        google_id: row.get(4)?,
        profile_picture: row.get(5)?,
        codeforces_handle: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn bookmark_from_row(row: &Row<'_>) -> rusqlite::Result<BookmarkRow> {
    Ok(BookmarkRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        problem_id: row.get(2)?,
        problem_name: row.get(3)?,
        rating: row.get(4)?,
        tags: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
