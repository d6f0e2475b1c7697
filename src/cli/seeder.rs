//! Seeds the database with demo scheduling data: departments, room
//! types, rooms, teachers, daily periods, and classes with recurring
//! slots left pending assignment.

use chrono::NaiveDate;
use fake::Fake;
use fake::faker::name::en::Name;
use sqlx::PgPool;
use std::time::Instant;

use classrota_models::{ClassId, DepartmentId, RoomTypeId, TeacherId, TimeSlotId};

pub struct SeedConfig {
    pub rooms: usize,
    pub teachers_per_department: usize,
    pub classes_per_department: usize,
    pub semester_start: NaiveDate,
    pub semester_end: NaiveDate,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            rooms: 12,
            teachers_per_department: 4,
            classes_per_department: 6,
            semester_start: NaiveDate::from_ymd_opt(2025, 9, 1).expect("valid date"),
            semester_end: NaiveDate::from_ymd_opt(2026, 1, 30).expect("valid date"),
        }
    }
}

const DEPARTMENTS: &[&str] = &["Mathematics", "Science", "Humanities", "Languages"];
const SUBJECTS: &[&str] = &[
    "Algebra", "Geometry", "Physics", "Chemistry", "Biology", "History", "Geography",
    "Literature", "Grammar", "Composition",
];
const PERIODS: &[(&str, &str)] = &[
    ("08:00:00", "09:30:00"),
    ("09:45:00", "11:15:00"),
    ("11:30:00", "13:00:00"),
    ("14:00:00", "15:30:00"),
    ("15:45:00", "17:15:00"),
];

pub async fn seed_all(db: &PgPool, config: SeedConfig) -> Result<(), Box<dyn std::error::Error>> {
    let start_time = Instant::now();

    let departments = seed_departments(db).await?;
    let (lecture_type, lab_type) = seed_room_types(db).await?;
    let periods = seed_time_slots(db).await?;
    seed_rooms(db, &departments, lecture_type, lab_type, config.rooms).await?;

    let mut total_classes = 0;
    for (index, department_id) in departments.iter().enumerate() {
        let teachers =
            seed_teachers(db, *department_id, config.teachers_per_department).await?;
        let classes = seed_classes(
            db,
            *department_id,
            &teachers,
            lecture_type,
            &config,
            index,
        )
        .await?;
        seed_schedules(db, &classes, &periods).await?;
        total_classes += classes.len();
    }

    println!(
        "✓ Seeded {} departments, {} rooms, {} classes in {:?}",
        departments.len(),
        config.rooms,
        total_classes,
        start_time.elapsed()
    );

    Ok(())
}

async fn seed_departments(
    db: &PgPool,
) -> Result<Vec<DepartmentId>, Box<dyn std::error::Error>> {
    let mut ids = Vec::with_capacity(DEPARTMENTS.len());
    for name in DEPARTMENTS {
        let id: DepartmentId = sqlx::query_scalar(
            "INSERT INTO departments (name) VALUES ($1)
             ON CONFLICT (name) DO UPDATE SET updated_at = NOW()
             RETURNING id",
        )
        .bind(name)
        .fetch_one(db)
        .await?;
        ids.push(id);
    }
    Ok(ids)
}

async fn seed_room_types(
    db: &PgPool,
) -> Result<(RoomTypeId, RoomTypeId), Box<dyn std::error::Error>> {
    let lecture: RoomTypeId = sqlx::query_scalar(
        "INSERT INTO room_types (name, is_lab) VALUES ('Lecture room', FALSE)
         ON CONFLICT (name) DO UPDATE SET is_lab = FALSE
         RETURNING id",
    )
    .fetch_one(db)
    .await?;

    let lab: RoomTypeId = sqlx::query_scalar(
        "INSERT INTO room_types (name, is_lab) VALUES ('Laboratory', TRUE)
         ON CONFLICT (name) DO UPDATE SET is_lab = TRUE
         RETURNING id",
    )
    .fetch_one(db)
    .await?;

    Ok((lecture, lab))
}

async fn seed_time_slots(db: &PgPool) -> Result<Vec<TimeSlotId>, Box<dyn std::error::Error>> {
    let mut ids = Vec::with_capacity(PERIODS.len());
    for (index, (starts, ends)) in PERIODS.iter().enumerate() {
        let id: TimeSlotId = sqlx::query_scalar(
            "INSERT INTO time_slots (sequence, starts_at, ends_at)
             VALUES ($1, $2::time, $3::time)
             ON CONFLICT (sequence) DO UPDATE SET starts_at = EXCLUDED.starts_at
             RETURNING id",
        )
        .bind((index + 1) as i32)
        .bind(starts)
        .bind(ends)
        .fetch_one(db)
        .await?;
        ids.push(id);
    }
    Ok(ids)
}

async fn seed_rooms(
    db: &PgPool,
    departments: &[DepartmentId],
    lecture_type: RoomTypeId,
    lab_type: RoomTypeId,
    count: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    for index in 0..count {
        // Every fourth room is a lab; every third has a department affinity
        let is_lab = index % 4 == 3;
        let department = (index % 3 == 0).then(|| departments[index % departments.len()]);
        let capacity = if is_lab { 20 } else { 25 + (index % 4) as i32 * 5 };

        sqlx::query(
            "INSERT INTO rooms (name, capacity, room_type_id, department_id)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (name) DO NOTHING",
        )
        .bind(format!("R{}", 101 + index))
        .bind(capacity)
        .bind(if is_lab { lab_type } else { lecture_type })
        .bind(department)
        .execute(db)
        .await?;
    }
    Ok(())
}

async fn seed_teachers(
    db: &PgPool,
    department_id: DepartmentId,
    count: usize,
) -> Result<Vec<TeacherId>, Box<dyn std::error::Error>> {
    let mut ids = Vec::with_capacity(count);
    for _ in 0..count {
        let name: String = Name().fake();
        let id: TeacherId = sqlx::query_scalar(
            "INSERT INTO teachers (name, department_id) VALUES ($1, $2) RETURNING id",
        )
        .bind(name)
        .bind(department_id)
        .fetch_one(db)
        .await?;
        ids.push(id);
    }
    Ok(ids)
}

async fn seed_classes(
    db: &PgPool,
    department_id: DepartmentId,
    teachers: &[TeacherId],
    room_type_id: RoomTypeId,
    config: &SeedConfig,
    department_index: usize,
) -> Result<Vec<ClassId>, Box<dyn std::error::Error>> {
    let mut ids = Vec::with_capacity(config.classes_per_department);
    for index in 0..config.classes_per_department {
        let subject = SUBJECTS[(department_index * 3 + index) % SUBJECTS.len()];
        let id: ClassId = sqlx::query_scalar(
            "INSERT INTO classes (name, department_id, teacher_id, room_type_id, max_students, start_date, end_date)
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
        )
        .bind(format!("{} {}", subject, index / SUBJECTS.len() + 1))
        .bind(department_id)
        .bind(teachers[index % teachers.len()])
        .bind(room_type_id)
        .bind(20 + (index % 3) as i32 * 5)
        .bind(config.semester_start)
        .bind(config.semester_end)
        .fetch_one(db)
        .await?;
        ids.push(id);
    }
    Ok(ids)
}

async fn seed_schedules(
    db: &PgPool,
    classes: &[ClassId],
    periods: &[TimeSlotId],
) -> Result<(), Box<dyn std::error::Error>> {
    for (index, class_id) in classes.iter().enumerate() {
        // Two weekly slots per class on distinct days, pending assignment
        let first_day = 2 + (index % 3) as i16; // Monday..Wednesday
        let second_day = first_day + 2;
        for (day, period) in [
            (first_day, periods[index % periods.len()]),
            (second_day, periods[(index + 2) % periods.len()]),
        ] {
            sqlx::query(
                "INSERT INTO class_schedules
                     (class_id, day_of_week, time_slot_id, week_pattern, start_week, end_week)
                 VALUES ($1, $2, $3, 'every', 1, 18)",
            )
            .bind(class_id)
            .bind(day)
            .bind(period)
            .execute(db)
            .await?;
        }
    }
    Ok(())
}
