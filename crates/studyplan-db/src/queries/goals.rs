//! Database query functions for the `goals` table.
//!
//! Every lookup and mutation is owner-scoped: a goal is only visible to
//! the student it belongs to. Deleting a goal cascades to its AI tasks
//! at the schema level; manual tasks are unaffected.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Goal, GoalKind, GoalStatus};

/// Insert a new goal row. Returns the inserted goal with server-generated
/// defaults (id, status, created_at).
pub async fn insert_goal(
    pool: &PgPool,
    student_id: Uuid,
    title: &str,
    kind: GoalKind,
    target_date: Option<NaiveDate>,
) -> Result<Goal> {
    let goal = sqlx::query_as::<_, Goal>(
        "INSERT INTO goals (student_id, title, kind, target_date) \
         VALUES ($1, $2, $3, $4) \
         RETURNING *",
    )
    .bind(student_id)
    .bind(title)
    .bind(kind)
    .bind(target_date)
    .fetch_one(pool)
    .await
    .context("failed to insert goal")?;

    Ok(goal)
}

/// Fetch a goal by ID, scoped to its owner.
pub async fn get_goal_for_student(
    pool: &PgPool,
    goal_id: Uuid,
    student_id: Uuid,
) -> Result<Option<Goal>> {
    let goal =
        sqlx::query_as::<_, Goal>("SELECT * FROM goals WHERE id = $1 AND student_id = $2")
            .bind(goal_id)
            .bind(student_id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch goal")?;

    Ok(goal)
}

/// List all goals for a student, newest first.
pub async fn list_goals_for_student(pool: &PgPool, student_id: Uuid) -> Result<Vec<Goal>> {
    let goals = sqlx::query_as::<_, Goal>(
        "SELECT * FROM goals WHERE student_id = $1 ORDER BY created_at DESC",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await
    .context("failed to list goals")?;

    Ok(goals)
}

/// Delete a goal (owner-scoped). The `ON DELETE CASCADE` on `ai_tasks`
/// removes its generated tasks in the same statement.
///
/// Returns the number of rows affected (0 means not found or not owned).
pub async fn delete_goal(pool: &PgPool, goal_id: Uuid, student_id: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM goals WHERE id = $1 AND student_id = $2")
        .bind(goal_id)
        .bind(student_id)
        .execute(pool)
        .await
        .context("failed to delete goal")?;

    Ok(result.rows_affected())
}

/// Update a goal's target date (owner-scoped). Date validation happens
/// in the core layer; this is a bare write.
pub async fn update_goal_target_date(
    pool: &PgPool,
    goal_id: Uuid,
    student_id: Uuid,
    target_date: NaiveDate,
) -> Result<u64> {
    let result =
        sqlx::query("UPDATE goals SET target_date = $1 WHERE id = $2 AND student_id = $3")
            .bind(target_date)
            .bind(goal_id)
            .bind(student_id)
            .execute(pool)
            .await
            .context("failed to update goal target date")?;

    Ok(result.rows_affected())
}

/// Update a goal's status (owner-scoped).
pub async fn update_goal_status(
    pool: &PgPool,
    goal_id: Uuid,
    student_id: Uuid,
    status: GoalStatus,
) -> Result<u64> {
    let result = sqlx::query("UPDATE goals SET status = $1 WHERE id = $2 AND student_id = $3")
        .bind(status)
        .bind(goal_id)
        .bind(student_id)
        .execute(pool)
        .await
        .context("failed to update goal status")?;

    Ok(result.rows_affected())
}
