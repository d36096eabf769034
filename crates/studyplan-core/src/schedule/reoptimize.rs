//! Re-timing of pending tasks after an energy-preference change.

use anyhow::Context;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use studyplan_db::models::{AiTask, EnergyPreference, SlotLabel};
use studyplan_db::queries::ai_tasks;
use studyplan_db::queries::students;

use crate::error::PlanError;
use crate::schedule::slots::{self, SlotQuality};

/// Persist a new energy preference and re-time every still-active task
/// on or after `reference_date` into the new window.
///
/// Tasks keep their dates and relative order within each day; only start
/// times and slot labels change, and the whole rewrite is one
/// transaction. Returns the updated tasks in date-then-time order.
pub async fn reoptimize(
    pool: &PgPool,
    student_id: Uuid,
    preference: EnergyPreference,
    reference_date: NaiveDate,
) -> Result<Vec<AiTask>, PlanError> {
    let updated = students::update_energy_preference(pool, student_id, preference).await?;
    if updated == 0 {
        return Err(PlanError::not_found("student not found"));
    }

    let pending = ai_tasks::list_pending_tasks_for_student(pool, student_id, reference_date).await?;
    if pending.is_empty() {
        return Ok(Vec::new());
    }

    // Pending tasks arrive sorted by date then time, so each day is a
    // contiguous run.
    let mut placements: Vec<(Uuid, chrono::NaiveDateTime, SlotLabel)> =
        Vec::with_capacity(pending.len());
    for day_run in pending.chunk_by(|a, b| a.task_date == b.task_date) {
        let durations: Vec<i32> = day_run.iter().map(|t| t.duration_minutes).collect();
        let day_plan = slots::reoptimize_day(day_run[0].task_date, &durations, preference);
        for (task, (start, quality)) in day_run.iter().zip(day_plan) {
            let label = match quality {
                SlotQuality::Peak => SlotLabel::Peak,
                SlotQuality::Overflow => SlotLabel::Overflow,
            };
            placements.push((task.id, start, label));
        }
    }

    let mut tx = pool.begin().await.context("failed to begin transaction")?;
    let mut updated_tasks = Vec::with_capacity(placements.len());
    for (id, start, label) in placements {
        let task = sqlx::query_as::<_, AiTask>(
            "UPDATE ai_tasks SET start_time = $1, slot_label = $2 \
             WHERE id = $3 AND student_id = $4 \
             RETURNING *",
        )
        .bind(start)
        .bind(label)
        .bind(id)
        .bind(student_id)
        .fetch_one(&mut *tx)
        .await
        .context("failed to re-time task")?;
        updated_tasks.push(task);
    }
    tx.commit().await.context("failed to commit re-timing")?;

    tracing::info!(
        student_id = %student_id,
        preference = %preference,
        tasks = updated_tasks.len(),
        "pending tasks re-timed"
    );
    Ok(updated_tasks)
}
