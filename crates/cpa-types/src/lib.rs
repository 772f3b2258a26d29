pub mod api;
pub mod codeforces;
pub mod models;
