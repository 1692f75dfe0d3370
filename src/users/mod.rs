use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod model;

pub fn router() -> Router<AppState> {
    handlers::user_routes()
}
