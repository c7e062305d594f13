//! Shopping list: derived from meal plans, with per-range overrides.

pub mod aggregate;
pub mod dto;
pub mod handlers;
pub mod repo;
mod repo_types;
pub mod services;
// Client-side toggle contract; the server has no caller of its own.
#[allow(dead_code)]
pub mod toggle;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::shopping_routes()
}
