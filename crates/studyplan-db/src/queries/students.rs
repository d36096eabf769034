//! Database query functions for the `students` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{EnergyPreference, Student};

/// Insert a new student row. Returns the inserted student with
/// server-generated defaults (id, energy_preference, created_at).
pub async fn insert_student(pool: &PgPool, email: &str, full_name: &str) -> Result<Student> {
    let student = sqlx::query_as::<_, Student>(
        "INSERT INTO students (email, full_name) VALUES ($1, $2) RETURNING *",
    )
    .bind(email)
    .bind(full_name)
    .fetch_one(pool)
    .await
    .context("failed to insert student")?;

    Ok(student)
}

/// Fetch a student by ID.
pub async fn get_student(pool: &PgPool, id: Uuid) -> Result<Option<Student>> {
    let student = sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch student")?;

    Ok(student)
}

/// Persist the student's energy preference.
///
/// Returns the number of rows affected (0 means the student was not found).
pub async fn update_energy_preference(
    pool: &PgPool,
    id: Uuid,
    preference: EnergyPreference,
) -> Result<u64> {
    let result = sqlx::query("UPDATE students SET energy_preference = $1 WHERE id = $2")
        .bind(preference)
        .bind(id)
        .execute(pool)
        .await
        .context("failed to update energy preference")?;

    Ok(result.rows_affected())
}
