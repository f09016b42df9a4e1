pub mod auth;
pub mod domain;
pub mod error;
pub mod infra;
pub mod middleware;
pub mod routes;
pub mod security;
pub mod state;
pub mod store;

pub use state::AppState;
