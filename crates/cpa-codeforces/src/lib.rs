//! Codeforces data access and the derivations built on top of it.
//!
//! `client` talks to the public API, `snapshot` fans out the per-handle reads,
//! and `derive` / `compare` / `catalog` are pure functions over the fetched data.

pub mod catalog;
pub mod client;
pub mod compare;
pub mod derive;
pub mod error;
pub mod snapshot;

pub use client::{CodeforcesClient, ContestSource};
pub use error::CfError;
pub use snapshot::{HandleSnapshot, fetch_handle_snapshot};
