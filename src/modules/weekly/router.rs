use axum::{Router, routing::get};

use crate::state::AppState;

use super::controller::get_weekly_schedule;

pub fn init_weekly_router() -> Router<AppState> {
    Router::new().route("/weekly", get(get_weekly_schedule))
}
