/// Database row types. These map directly to SQLite rows.
/// Distinct from cpa-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    /// `None` for accounts created through Google sign-in.
    pub password: Option<String>,
    pub google_id: Option<String>,
    pub profile_picture: Option<String>,
    pub codeforces_handle: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub struct BookmarkRow {
    pub id: String,
    pub user_id: String,
    pub problem_id: String,
    pub problem_name: String,
    pub rating: Option<i64>,
    /// JSON array of tag names.
    pub tags: String,
    pub created_at: String,
}

/// Fields for a new account. Exactly one of `password` / `google_id` is
/// normally set, but both are allowed.
pub struct NewUser<'a> {
    pub id: &'a str,
    pub username: &'a str,
    pub email: &'a str,
    pub password: Option<&'a str>,
    pub google_id: Option<&'a str>,
    pub profile_picture: Option<&'a str>,
    pub codeforces_handle: Option<&'a str>,
}

pub struct NewBookmark<'a> {
    pub id: &'a str,
    pub user_id: &'a str,
    pub problem_id: &'a str,
    pub problem_name: &'a str,
    pub rating: Option<i64>,
    pub tags: &'a str,
}
