mod common;

use axum::http::StatusCode;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use classrota_models::DayOfWeek;
use common::{
    create_class, create_room, create_schedule, date, request_as, seed_reference, setup_test_app,
};

#[sqlx::test(migrations = "./migrations")]
async fn assign_then_conflict_roundtrip(pool: PgPool) {
    let refs = seed_reference(&pool).await;
    let room = create_room(&pool, "R201", 30, refs.room_type_id, None).await;
    let chemistry = create_class(
        &pool,
        "Chemistry",
        &refs,
        refs.room_type_id,
        25,
        date(2025, 9, 1),
        date(2026, 1, 30),
    )
    .await;
    let biology = create_class(
        &pool,
        "Biology",
        &refs,
        refs.room_type_id,
        25,
        date(2025, 9, 1),
        date(2026, 1, 30),
    )
    .await;
    let slot_x = create_schedule(&pool, chemistry, DayOfWeek::Tuesday, refs.period_2).await;
    let slot_y = create_schedule(&pool, biology, DayOfWeek::Tuesday, refs.period_2).await;

    let admin = Uuid::new_v4();

    let (status, body) = request_as(
        setup_test_app(pool.clone()).await,
        "admin",
        admin,
        "POST",
        "/api/schedule/assign",
        Some(json!({"schedule_id": slot_x, "room_id": room})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "assigned");
    assert_eq!(body["class_status"], "assigned");
    assert_eq!(body["assigned_by"], json!(admin.to_string()));

    // Same room, same day/period: conflict naming the occupying class
    let (status, body) = request_as(
        setup_test_app(pool.clone()).await,
        "admin",
        admin,
        "POST",
        "/api/schedule/assign",
        Some(json!({"schedule_id": slot_y, "room_id": room})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");
    assert!(body["error"].as_str().unwrap().contains("Chemistry"));
    assert_eq!(body["details"]["class_name"], "Chemistry");

    // Unassign reverts and frees the room
    let (status, body) = request_as(
        setup_test_app(pool.clone()).await,
        "admin",
        admin,
        "POST",
        "/api/schedule/unassign",
        Some(json!({"schedule_id": slot_x})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending_assignment");
    assert_eq!(body["room_id"], serde_json::Value::Null);

    let (status, _) = request_as(
        setup_test_app(pool.clone()).await,
        "admin",
        admin,
        "POST",
        "/api/schedule/assign",
        Some(json!({"schedule_id": slot_y, "room_id": room})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[sqlx::test(migrations = "./migrations")]
async fn assignment_requires_admin_role(pool: PgPool) {
    let refs = seed_reference(&pool).await;
    let room = create_room(&pool, "R201", 30, refs.room_type_id, None).await;
    let class = create_class(
        &pool,
        "Chemistry",
        &refs,
        refs.room_type_id,
        25,
        date(2025, 9, 1),
        date(2026, 1, 30),
    )
    .await;
    let slot = create_schedule(&pool, class, DayOfWeek::Tuesday, refs.period_2).await;

    let (status, _) = request_as(
        setup_test_app(pool.clone()).await,
        "teacher",
        Uuid::new_v4(),
        "POST",
        "/api/schedule/assign",
        Some(json!({"schedule_id": slot, "room_id": room})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn missing_identity_headers_are_unauthorized(pool: PgPool) {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    let app = setup_test_app(pool).await;
    let request = Request::builder()
        .method("GET")
        .uri("/api/stats")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
async fn available_rooms_partition(pool: PgPool) {
    let refs = seed_reference(&pool).await;
    let room = create_room(&pool, "R101", 30, refs.room_type_id, None).await;
    create_room(&pool, "R102", 30, refs.room_type_id, None).await;
    let class = create_class(
        &pool,
        "Algebra I",
        &refs,
        refs.room_type_id,
        25,
        date(2025, 9, 1),
        date(2026, 1, 30),
    )
    .await;
    let slot = create_schedule(&pool, class, DayOfWeek::Monday, refs.period_1).await;

    let admin = Uuid::new_v4();
    let (status, _) = request_as(
        setup_test_app(pool.clone()).await,
        "admin",
        admin,
        "POST",
        "/api/schedule/assign",
        Some(json!({"schedule_id": slot, "room_id": room})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let uri = format!(
        "/api/rooms/available?time_slot_id={}&day_of_week=2",
        refs.period_1
    );
    let (status, body) = request_as(
        setup_test_app(pool.clone()).await,
        "admin",
        admin,
        "GET",
        &uri,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["normal_rooms"].as_array().unwrap().len(), 1);
    assert_eq!(body["occupied_rooms"].as_array().unwrap().len(), 1);
    assert_eq!(body["total_available"], 1);
    assert_eq!(body["occupied_rooms"][0]["occupied_by_class"], "Algebra I");
}

#[sqlx::test(migrations = "./migrations")]
async fn stats_endpoint_reports_counts(pool: PgPool) {
    let refs = seed_reference(&pool).await;
    let class = create_class(
        &pool,
        "Algebra I",
        &refs,
        refs.room_type_id,
        25,
        date(2025, 9, 1),
        date(2026, 1, 30),
    )
    .await;
    create_schedule(&pool, class, DayOfWeek::Monday, refs.period_1).await;

    let (status, body) = request_as(
        setup_test_app(pool.clone()).await,
        "admin",
        Uuid::new_v4(),
        "GET",
        "/api/stats",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_classes"], 1);
    assert_eq!(body["total_slots"], 1);
    assert_eq!(body["pending_slots"], 1);
    assert_eq!(body["assignment_rate"], 0.0);
}
