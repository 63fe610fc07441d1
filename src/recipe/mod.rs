use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
pub mod repo_types;

use handlers::{owned_routes, Ingredients, Tags};

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(owned_routes::<Tags>())
        .merge(owned_routes::<Ingredients>())
}
