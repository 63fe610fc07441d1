use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;

/// Staff-only routes, mounted under `/admin`.
pub fn router() -> Router<AppState> {
    handlers::admin_routes()
}
