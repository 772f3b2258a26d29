use axum::{
    Router, middleware,
    routing::{delete, get, post},
};

use crate::auth::{self, AppState};
use crate::{bookmarks, cf, users};

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/users/profile",
            get(users::get_profile).put(users::update_profile),
        )
        .route(
            "/users/bookmarks",
            get(bookmarks::list_bookmarks).post(bookmarks::create_bookmark),
        )
        .route("/users/bookmarks/{id}", delete(bookmarks::delete_bookmark))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::require_auth,
        ));

    Router::new()
        .route("/", get(|| async { "CP Analyzer API is running" }))
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/google", post(auth::google_login))
        .route("/cf/user/{handle}", get(cf::user_info))
        .route("/cf/user/{handle}/rating", get(cf::user_rating))
        .route("/cf/user/{handle}/status", get(cf::user_status))
        .route("/cf/user/{handle}/summary", get(cf::summary))
        .route("/cf/compare", get(cf::compare))
        .route("/cf/problems", get(cf::problems))
        .route("/cf/problems/recommend", get(cf::recommend))
        .route("/cf/contests", get(cf::contests))
        .merge(protected)
        .with_state(state)
}
