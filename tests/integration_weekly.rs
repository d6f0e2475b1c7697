mod common;

use axum::http::StatusCode;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use classrota_models::DayOfWeek;
use common::{
    create_class, create_room, create_schedule, date, request_as, seed_reference, setup_test_app,
};

// Week of Sunday 2025-10-05: Monday is 10-06, Wednesday is 10-08.

#[sqlx::test(migrations = "./migrations")]
async fn exception_request_lifecycle_shapes_the_week(pool: PgPool) {
    let refs = seed_reference(&pool).await;
    let room = create_room(&pool, "R101", 30, refs.room_type_id, None).await;
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
    let monday = create_schedule(&pool, class, DayOfWeek::Monday, refs.period_1).await;

    let admin = Uuid::new_v4();
    let teacher = refs.teacher_id.into_inner();

    let (status, _) = request_as(
        setup_test_app(pool.clone()).await,
        "admin",
        admin,
        "POST",
        "/api/schedule/assign",
        Some(json!({"schedule_id": monday, "room_id": room})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Teacher files a cancellation request; it starts pending
    let (status, body) = request_as(
        setup_test_app(pool.clone()).await,
        "teacher",
        teacher,
        "POST",
        "/api/schedule-exceptions",
        Some(json!({
            "class_schedule_id": monday,
            "exception_date": "2025-10-06",
            "exception_type": "cancelled",
            "reason": "school trip"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["approval_status"], "pending");
    let exception_id = body["id"].as_str().unwrap().to_string();

    // Pending request does not affect the resolved week
    let (_, body) = request_as(
        setup_test_app(pool.clone()).await,
        "admin",
        admin,
        "GET",
        "/api/schedule/weekly?week_start_date=2025-10-05",
        None,
    )
    .await;
    assert_eq!(body["rows"][0]["status"], "assigned");

    // Approval flips the occurrence to suspended, room still attached
    let (status, body) = request_as(
        setup_test_app(pool.clone()).await,
        "admin",
        admin,
        "POST",
        &format!("/api/schedule-exceptions/{}/approve", exception_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["approval_status"], "approved");

    let (_, body) = request_as(
        setup_test_app(pool.clone()).await,
        "admin",
        admin,
        "GET",
        "/api/schedule/weekly?week_start_date=2025-10-05",
        None,
    )
    .await;
    let rows = body["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["status"], "suspended");
    assert_eq!(rows[0]["room_name"], "R101");
}

#[sqlx::test(migrations = "./migrations")]
async fn cross_day_move_shows_two_rows_in_the_week(pool: PgPool) {
    let refs = seed_reference(&pool).await;
    let room = create_room(&pool, "R101", 30, refs.room_type_id, None).await;
    let target = create_room(&pool, "R202", 30, refs.room_type_id, None).await;
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
    let monday = create_schedule(&pool, class, DayOfWeek::Monday, refs.period_1).await;

    let admin = Uuid::new_v4();

    let (status, _) = request_as(
        setup_test_app(pool.clone()).await,
        "admin",
        admin,
        "POST",
        "/api/schedule/assign",
        Some(json!({"schedule_id": monday, "room_id": room})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Admin moves the Monday occurrence to Wednesday; auto-approved
    let (status, _) = request_as(
        setup_test_app(pool.clone()).await,
        "admin",
        admin,
        "POST",
        "/api/schedule-exceptions",
        Some(json!({
            "class_schedule_id": monday,
            "exception_date": "2025-10-06",
            "exception_type": "moved",
            "moved_to_date": "2025-10-08",
            "moved_to_time_slot_id": refs.period_2,
            "moved_to_room_id": target,
            "reason": "assembly in the main building"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = request_as(
        setup_test_app(pool.clone()).await,
        "admin",
        admin,
        "GET",
        "/api/schedule/weekly?week_start_date=2025-10-05",
        None,
    )
    .await;
    let rows = body["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["date"], "2025-10-06");
    assert!(
        rows[0]["note"]
            .as_str()
            .unwrap()
            .starts_with("moved to Wednesday")
    );
    assert_eq!(rows[1]["date"], "2025-10-08");
    assert_eq!(rows[1]["room_name"], "R202");
    assert!(
        rows[1]["note"]
            .as_str()
            .unwrap()
            .starts_with("moved from Monday")
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn student_view_hides_unroomed_slots(pool: PgPool) {
    let refs = seed_reference(&pool).await;
    let room = create_room(&pool, "R101", 30, refs.room_type_id, None).await;
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
    let monday = create_schedule(&pool, class, DayOfWeek::Monday, refs.period_1).await;
    create_schedule(&pool, class, DayOfWeek::Wednesday, refs.period_1).await;

    let admin = Uuid::new_v4();
    let (status, _) = request_as(
        setup_test_app(pool.clone()).await,
        "admin",
        admin,
        "POST",
        "/api/schedule/assign",
        Some(json!({"schedule_id": monday, "room_id": room})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = request_as(
        setup_test_app(pool.clone()).await,
        "student",
        Uuid::new_v4(),
        "GET",
        "/api/schedule/weekly?week_start_date=2025-10-05",
        None,
    )
    .await;
    let rows = body["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["room_name"], "R101");

    // Admin sees the pending Wednesday slot too
    let (_, body) = request_as(
        setup_test_app(pool.clone()).await,
        "admin",
        admin,
        "GET",
        "/api/schedule/weekly?week_start_date=2025-10-05",
        None,
    )
    .await;
    assert_eq!(body["rows"].as_array().unwrap().len(), 2);
}
