use crate::state::AppState;
use axum::Router;

pub mod game;
pub mod keys;

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .nest("/api/game", game::routes(state.clone()))
        .nest("/api/keys", keys::routes(state.clone()))
}
