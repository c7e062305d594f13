//! Meal plans: a date range of days, each with breakfast, lunch and dinner
//! slots holding recipe references and participants.

pub mod dto;
pub mod handlers;
pub mod participants;
pub mod repo;
mod repo_types;
pub mod services;

pub use repo_types::MealPlanRow;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::meal_plan_routes()
}
