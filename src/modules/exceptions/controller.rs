use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use classrota_core::AppError;
use classrota_models::ExceptionId;

use crate::middleware::auth::AuthContext;
use crate::modules::exceptions::model::{
    CreateExceptionDto, ExceptionFilterParams, PaginatedExceptionsResponse, ScheduleException,
    UpdateExceptionDto,
};
use crate::modules::exceptions::service::ExceptionService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    post,
    path = "/api/schedule-exceptions",
    request_body = CreateExceptionDto,
    responses(
        (status = 201, description = "Exception created", body = ScheduleException),
        (status = 404, description = "Schedule or class not found"),
        (status = 409, description = "Redirect target unavailable"),
        (status = 422, description = "Validation failure")
    ),
    tag = "Schedule exceptions"
)]
#[instrument(skip(state))]
pub async fn create_exception(
    State(state): State<AppState>,
    ctx: AuthContext,
    ValidatedJson(dto): ValidatedJson<CreateExceptionDto>,
) -> Result<(StatusCode, Json<ScheduleException>), AppError> {
    let exception =
        ExceptionService::create_exception(&state.db, &state.events, &ctx, dto).await?;

    Ok((StatusCode::CREATED, Json(exception)))
}

#[utoipa::path(
    get,
    path = "/api/schedule-exceptions",
    params(ExceptionFilterParams),
    responses(
        (status = 200, description = "List of exceptions", body = PaginatedExceptionsResponse)
    ),
    tag = "Schedule exceptions"
)]
#[instrument(skip(state))]
pub async fn get_exceptions(
    State(state): State<AppState>,
    _ctx: AuthContext,
    Query(filters): Query<ExceptionFilterParams>,
) -> Result<Json<PaginatedExceptionsResponse>, AppError> {
    let exceptions = ExceptionService::list_exceptions(&state.db, filters).await?;

    Ok(Json(exceptions))
}

#[utoipa::path(
    get,
    path = "/api/schedule-exceptions/{id}",
    params(("id" = String, Path, description = "Exception ID")),
    responses(
        (status = 200, description = "Exception details", body = ScheduleException),
        (status = 404, description = "Exception not found")
    ),
    tag = "Schedule exceptions"
)]
#[instrument(skip(state))]
pub async fn get_exception_by_id(
    State(state): State<AppState>,
    _ctx: AuthContext,
    Path(id): Path<ExceptionId>,
) -> Result<Json<ScheduleException>, AppError> {
    let exception = ExceptionService::get_exception(&state.db, id).await?;

    Ok(Json(exception))
}

#[utoipa::path(
    put,
    path = "/api/schedule-exceptions/{id}",
    params(("id" = String, Path, description = "Exception ID")),
    request_body = UpdateExceptionDto,
    responses(
        (status = 200, description = "Exception updated", body = ScheduleException),
        (status = 403, description = "Requires administrator access"),
        (status = 404, description = "Exception not found")
    ),
    tag = "Schedule exceptions"
)]
#[instrument(skip(state))]
pub async fn update_exception(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<ExceptionId>,
    ValidatedJson(dto): ValidatedJson<UpdateExceptionDto>,
) -> Result<Json<ScheduleException>, AppError> {
    ctx.require_admin()?;

    let exception =
        ExceptionService::update_exception(&state.db, &state.events, id, dto, ctx.user_id).await?;

    Ok(Json(exception))
}

#[utoipa::path(
    post,
    path = "/api/schedule-exceptions/{id}/approve",
    params(("id" = String, Path, description = "Exception ID")),
    responses(
        (status = 200, description = "Exception approved", body = ScheduleException),
        (status = 403, description = "Requires administrator access"),
        (status = 404, description = "Exception not found"),
        (status = 422, description = "Exception is not approvable")
    ),
    tag = "Schedule exceptions"
)]
#[instrument(skip(state))]
pub async fn approve_exception(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<ExceptionId>,
) -> Result<Json<ScheduleException>, AppError> {
    ctx.require_admin()?;

    let exception =
        ExceptionService::approve_exception(&state.db, &state.events, id, ctx.user_id).await?;

    Ok(Json(exception))
}

#[utoipa::path(
    post,
    path = "/api/schedule-exceptions/{id}/reject",
    params(("id" = String, Path, description = "Exception ID")),
    responses(
        (status = 200, description = "Exception rejected", body = ScheduleException),
        (status = 403, description = "Requires administrator access"),
        (status = 404, description = "Exception not found")
    ),
    tag = "Schedule exceptions"
)]
#[instrument(skip(state))]
pub async fn reject_exception(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<ExceptionId>,
) -> Result<Json<ScheduleException>, AppError> {
    ctx.require_admin()?;

    let exception =
        ExceptionService::reject_exception(&state.db, &state.events, id, ctx.user_id).await?;

    Ok(Json(exception))
}

#[utoipa::path(
    delete,
    path = "/api/schedule-exceptions/{id}",
    params(("id" = String, Path, description = "Exception ID")),
    responses(
        (status = 204, description = "Exception deleted"),
        (status = 403, description = "Requires administrator access"),
        (status = 404, description = "Exception not found")
    ),
    tag = "Schedule exceptions"
)]
#[instrument(skip(state))]
pub async fn delete_exception(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<ExceptionId>,
) -> Result<StatusCode, AppError> {
    ctx.require_admin()?;

    ExceptionService::delete_exception(&state.db, &state.events, id, ctx.user_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
