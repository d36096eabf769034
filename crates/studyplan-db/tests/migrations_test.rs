//! Schema smoke tests against a real PostgreSQL database.

use studyplan_db::pool;
use studyplan_test_utils::{create_test_db, drop_test_db};

#[tokio::test]
async fn migrations_create_all_tables() {
    let (pool, db_name) = create_test_db().await;

    let counts = pool::table_counts(&pool).await.expect("counts query");
    for table in ["students", "goals", "ai_tasks", "manual_tasks"] {
        assert!(
            counts.iter().any(|(name, n)| name == table && *n == 0),
            "missing empty table {table}: {counts:?}"
        );
    }

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let (pool, db_name) = create_test_db().await;

    // Second run over an already-migrated database is a no-op.
    pool::run_migrations(&pool)
        .await
        .expect("re-running migrations");

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn sequence_numbers_are_unique_per_goal() {
    use studyplan_db::models::GoalKind;
    use studyplan_db::queries::{goals, students};

    let (pool, db_name) = create_test_db().await;

    let student = students::insert_student(&pool, "seq@example.com", "Seq Tester")
        .await
        .unwrap();
    let goal = goals::insert_goal(&pool, student.id, "Exam prep", GoalKind::Exam, None)
        .await
        .unwrap();

    let insert = "INSERT INTO ai_tasks \
                  (goal_id, student_id, title, task_date, start_time, duration_minutes, sequence_no) \
                  VALUES ($1, $2, 'Study', '2026-03-02', '2026-03-02 09:00:00', 60, 1)";
    sqlx::query(insert)
        .bind(goal.id)
        .bind(student.id)
        .execute(&pool)
        .await
        .unwrap();
    let duplicate = sqlx::query(insert)
        .bind(goal.id)
        .bind(student.id)
        .execute(&pool)
        .await;
    assert!(duplicate.is_err(), "duplicate sequence_no must be rejected");

    pool.close().await;
    drop_test_db(&db_name).await;
}
