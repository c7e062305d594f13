//! Free-standing recipe formatting tools.

pub mod dto;
pub mod handlers;
pub mod page;

use crate::state::AppState;
use crate::usage::handlers::usage_routes;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::tool_routes().merge(usage_routes())
}
