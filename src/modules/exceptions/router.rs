use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    approve_exception, create_exception, delete_exception, get_exception_by_id, get_exceptions,
    reject_exception, update_exception,
};

pub fn init_exceptions_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_exception).get(get_exceptions))
        .route(
            "/{id}",
            get(get_exception_by_id)
                .put(update_exception)
                .delete(delete_exception),
        )
        .route("/{id}/approve", post(approve_exception))
        .route("/{id}/reject", post(reject_exception))
}
