use axum::{Router, routing::post};

use crate::state::AppState;

use super::controller::{assign_room, unassign_room};

pub fn init_assignments_router() -> Router<AppState> {
    Router::new()
        .route("/assign", post(assign_room))
        .route("/unassign", post(unassign_room))
}
