use crate::state::AppState;
use axum::Router;

mod dto;
pub mod extractors;
pub mod handlers;
pub mod password;
pub mod repo_types;
pub mod services;
pub(crate) mod token;

pub fn router() -> Router<AppState> {
    handlers::user_routes()
}
