//! Goal lifecycle rules that go beyond plain CRUD.

use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use studyplan_db::queries::{ai_tasks, goals};

use crate::error::PlanError;

/// Move a goal's target date.
///
/// The new date must not lie in the past and must fall after every task
/// already planned for the goal, so the existing plan stays valid.
pub async fn update_target_date(
    pool: &PgPool,
    student_id: Uuid,
    goal_id: Uuid,
    new_date: NaiveDate,
    today: NaiveDate,
) -> Result<(), PlanError> {
    let goal = goals::get_goal_for_student(pool, goal_id, student_id)
        .await?
        .ok_or_else(|| PlanError::not_found("goal not found"))?;

    if new_date < today {
        return Err(PlanError::validation("target date must not be in the past"));
    }
    if let Some(latest) = ai_tasks::latest_task_date_for_goal(pool, goal.id).await?
        && new_date <= latest
    {
        return Err(PlanError::validation(
            "target date must fall after the last planned task",
        ));
    }

    let updated = goals::update_goal_target_date(pool, goal_id, student_id, new_date).await?;
    if updated == 0 {
        return Err(PlanError::not_found("goal not found"));
    }

    tracing::info!(goal_id = %goal_id, target_date = %new_date, "goal target date moved");
    Ok(())
}
