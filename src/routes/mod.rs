//! HTTP handlers, one module per area. Paths are relative to `/api`.

pub mod applications;
pub mod auth;
pub mod companies;
pub mod extract;
pub mod health;
pub mod jobs;
pub mod stats;
pub mod users;

pub use extract::{AppJson, AppPath, AppQuery};
