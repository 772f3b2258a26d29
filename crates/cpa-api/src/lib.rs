pub mod auth;
pub mod bookmarks;
pub mod cf;
pub mod error;
pub mod google;
pub mod middleware;
pub mod routes;
mod rows;
pub mod users;

pub use auth::{AppState, AppStateInner};
pub use error::ApiError;
