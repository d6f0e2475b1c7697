use sqlx::PgPool;

use classrota_config::cors::CorsConfig;
use classrota_db::init_db_pool;

use crate::events::EventPublisher;

#[derive(Clone, Debug)]
pub struct AppState {
    pub db: PgPool,
    pub cors_config: CorsConfig,
    pub events: EventPublisher,
}

pub async fn init_app_state() -> AppState {
    AppState {
        db: init_db_pool().await,
        cors_config: CorsConfig::from_env(),
        events: EventPublisher::spawn(),
    }
}
