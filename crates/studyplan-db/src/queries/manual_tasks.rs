//! Database query functions for the `manual_tasks` table.
//!
//! Manual tasks belong to a student directly and are never written by
//! the plan generator.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{ManualTask, TaskStatus};

/// Fields for a new manual task.
#[derive(Debug, Clone)]
pub struct NewManualTask<'a> {
    pub title: &'a str,
    pub task_date: NaiveDate,
    pub start_time: Option<NaiveDateTime>,
    pub duration_minutes: Option<i32>,
    pub color_tag: Option<&'a str>,
}

/// Insert a new manual task row for the student.
pub async fn insert_manual_task(
    pool: &PgPool,
    student_id: Uuid,
    new: &NewManualTask<'_>,
) -> Result<ManualTask> {
    let task = sqlx::query_as::<_, ManualTask>(
        "INSERT INTO manual_tasks (student_id, title, task_date, start_time, duration_minutes, color_tag) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING *",
    )
    .bind(student_id)
    .bind(new.title)
    .bind(new.task_date)
    .bind(new.start_time)
    .bind(new.duration_minutes)
    .bind(new.color_tag)
    .fetch_one(pool)
    .await
    .context("failed to insert manual task")?;

    Ok(task)
}

/// List all manual tasks for a student, ordered by date then time.
pub async fn list_manual_tasks_for_student(
    pool: &PgPool,
    student_id: Uuid,
) -> Result<Vec<ManualTask>> {
    let tasks = sqlx::query_as::<_, ManualTask>(
        "SELECT * FROM manual_tasks WHERE student_id = $1 \
         ORDER BY task_date ASC, start_time ASC NULLS LAST",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await
    .context("failed to list manual tasks")?;

    Ok(tasks)
}

/// Update a manual task's status (owner-scoped).
///
/// Returns the number of rows affected (0 means not found or not owned).
pub async fn update_manual_task_status(
    pool: &PgPool,
    id: Uuid,
    student_id: Uuid,
    status: TaskStatus,
) -> Result<u64> {
    let result =
        sqlx::query("UPDATE manual_tasks SET status = $1 WHERE id = $2 AND student_id = $3")
            .bind(status)
            .bind(id)
            .bind(student_id)
            .execute(pool)
            .await
            .context("failed to update manual task status")?;

    Ok(result.rows_affected())
}

/// Delete a manual task (owner-scoped).
pub async fn delete_manual_task(pool: &PgPool, id: Uuid, student_id: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM manual_tasks WHERE id = $1 AND student_id = $2")
        .bind(id)
        .bind(student_id)
        .execute(pool)
        .await
        .context("failed to delete manual task")?;

    Ok(result.rows_affected())
}
