//! Database query functions for the `ai_tasks` table.
//!
//! Batch inserts and the regenerate delete happen inside the plan
//! generator's transaction in `studyplan-core`; the functions here are
//! the owner-scoped reads and single-row mutations everything else uses.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::AiTask;

/// Fetch a single task by ID, scoped to its owner.
pub async fn get_task(pool: &PgPool, id: Uuid, student_id: Uuid) -> Result<Option<AiTask>> {
    let task =
        sqlx::query_as::<_, AiTask>("SELECT * FROM ai_tasks WHERE id = $1 AND student_id = $2")
            .bind(id)
            .bind(student_id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch task")?;

    Ok(task)
}

/// List all tasks for a goal, in sequence order.
pub async fn list_tasks_for_goal(pool: &PgPool, goal_id: Uuid) -> Result<Vec<AiTask>> {
    let tasks = sqlx::query_as::<_, AiTask>(
        "SELECT * FROM ai_tasks WHERE goal_id = $1 ORDER BY sequence_no ASC",
    )
    .bind(goal_id)
    .fetch_all(pool)
    .await
    .context("failed to list tasks for goal")?;

    Ok(tasks)
}

/// List all tasks for a student across goals, ordered by date then time.
pub async fn list_tasks_for_student(pool: &PgPool, student_id: Uuid) -> Result<Vec<AiTask>> {
    let tasks = sqlx::query_as::<_, AiTask>(
        "SELECT * FROM ai_tasks WHERE student_id = $1 ORDER BY task_date ASC, start_time ASC",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await
    .context("failed to list tasks for student")?;

    Ok(tasks)
}

/// List a student's still-active tasks on or after a reference date,
/// ordered by date then start time. This is the input set for
/// re-optimization.
pub async fn list_pending_tasks_for_student(
    pool: &PgPool,
    student_id: Uuid,
    from_date: NaiveDate,
) -> Result<Vec<AiTask>> {
    let tasks = sqlx::query_as::<_, AiTask>(
        "SELECT * FROM ai_tasks \
         WHERE student_id = $1 AND status = 'active' AND task_date >= $2 \
         ORDER BY task_date ASC, start_time ASC",
    )
    .bind(student_id)
    .bind(from_date)
    .fetch_all(pool)
    .await
    .context("failed to list pending tasks")?;

    Ok(tasks)
}

/// Highest sequence number recorded for a goal, or 0 when the goal has
/// no tasks. Extend operations continue from this value plus one.
pub async fn max_sequence_no_for_goal(pool: &PgPool, goal_id: Uuid) -> Result<i32> {
    let row: (Option<i32>,) =
        sqlx::query_as("SELECT MAX(sequence_no) FROM ai_tasks WHERE goal_id = $1")
            .bind(goal_id)
            .fetch_one(pool)
            .await
            .context("failed to fetch max sequence number")?;

    Ok(row.0.unwrap_or(0))
}

/// Latest task date recorded for a goal, if any. Extend derives its
/// start date from this.
pub async fn latest_task_date_for_goal(pool: &PgPool, goal_id: Uuid) -> Result<Option<NaiveDate>> {
    let row: (Option<NaiveDate>,) =
        sqlx::query_as("SELECT MAX(task_date) FROM ai_tasks WHERE goal_id = $1")
            .bind(goal_id)
            .fetch_one(pool)
            .await
            .context("failed to fetch latest task date")?;

    Ok(row.0)
}

/// Distinct dates that already have a task for this goal and student.
/// Extend skips exactly these dates.
pub async fn task_dates_for_goal(
    pool: &PgPool,
    goal_id: Uuid,
    student_id: Uuid,
) -> Result<Vec<NaiveDate>> {
    let rows: Vec<(NaiveDate,)> = sqlx::query_as(
        "SELECT DISTINCT task_date FROM ai_tasks \
         WHERE goal_id = $1 AND student_id = $2 \
         ORDER BY task_date",
    )
    .bind(goal_id)
    .bind(student_id)
    .fetch_all(pool)
    .await
    .context("failed to fetch task dates")?;

    Ok(rows.into_iter().map(|(d,)| d).collect())
}

/// Occupied time ranges for a student on or after a reference date, as
/// `(start_time, duration_minutes)` pairs across both task kinds.
///
/// `exclude_goal` leaves out one goal's AI tasks -- a regenerate is about
/// to delete them, so they must not block their own replacements. Manual
/// tasks without an explicit time are unscheduled and cannot conflict;
/// those without a duration block a default 60 minutes.
pub async fn occupied_intervals_for_student(
    pool: &PgPool,
    student_id: Uuid,
    from_date: NaiveDate,
    exclude_goal: Option<Uuid>,
) -> Result<Vec<(NaiveDateTime, i32)>> {
    let rows: Vec<(NaiveDateTime, i32)> = sqlx::query_as(
        "SELECT start_time, duration_minutes FROM ai_tasks \
         WHERE student_id = $1 AND status = 'active' AND task_date >= $2 \
           AND ($3::uuid IS NULL OR goal_id <> $3) \
         UNION ALL \
         SELECT start_time, COALESCE(duration_minutes, 60) FROM manual_tasks \
         WHERE student_id = $1 AND status = 'active' AND task_date >= $2 \
           AND start_time IS NOT NULL",
    )
    .bind(student_id)
    .bind(from_date)
    .bind(exclude_goal)
    .fetch_all(pool)
    .await
    .context("failed to fetch occupied intervals")?;

    Ok(rows)
}

/// Mark a task completed (owner-scoped).
///
/// Returns the number of rows affected (0 means not found or not owned).
pub async fn complete_task(pool: &PgPool, id: Uuid, student_id: Uuid) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE ai_tasks SET status = 'completed' WHERE id = $1 AND student_id = $2",
    )
    .bind(id)
    .bind(student_id)
    .execute(pool)
    .await
    .context("failed to complete task")?;

    Ok(result.rows_affected())
}

/// Delete a single task (owner-scoped).
pub async fn delete_task(pool: &PgPool, id: Uuid, student_id: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM ai_tasks WHERE id = $1 AND student_id = $2")
        .bind(id)
        .bind(student_id)
        .execute(pool)
        .await
        .context("failed to delete task")?;

    Ok(result.rows_affected())
}
