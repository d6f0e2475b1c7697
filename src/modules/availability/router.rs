use axum::{Router, routing::get};

use crate::state::AppState;

use super::controller::{get_available_rooms, get_room_free};

pub fn init_rooms_router() -> Router<AppState> {
    Router::new()
        .route("/available", get(get_available_rooms))
        .route("/{id}/free", get(get_room_free))
}
