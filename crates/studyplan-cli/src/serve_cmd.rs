use std::net::SocketAddr;

use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::{delete, get, patch, post, put};
use axum::{Json, Router};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use studyplan_core::error::PlanError;
use studyplan_core::goal as goal_service;
use studyplan_core::schedule::{GenerateRequest, GenerationMode, generate, reoptimize};
use studyplan_db::models::{EnergyPreference, GoalKind, TaskStatus};
use studyplan_db::queries::{ai_tasks, goals, manual_tasks, students};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn internal(err: anyhow::Error) -> Self {
        tracing::error!(error = %format!("{err:#}"), "internal error");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "internal error".to_string(),
        }
    }
}

impl From<PlanError> for AppError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::NotFound(msg) => Self::not_found(msg),
            PlanError::Validation(msg) => Self::bad_request(msg),
            PlanError::Generation(_) | PlanError::Persistence(_) => {
                tracing::error!(error = %err, "plan operation failed");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: err.to_string(),
                }
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct NewStudentBody {
    email: String,
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct NewGoalBody {
    title: String,
    kind: GoalKind,
    #[serde(default)]
    target_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct TargetDateBody {
    target_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct GenerateBody {
    #[serde(default)]
    topics: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    hours_per_day: i32,
    mode: GenerationMode,
    #[serde(default)]
    energy_preference: Option<EnergyPreference>,
}

#[derive(Debug, Deserialize)]
struct ReoptimizeParams {
    energy_preference: EnergyPreference,
}

#[derive(Debug, Deserialize)]
struct NewManualTaskBody {
    title: String,
    task_date: NaiveDate,
    #[serde(default)]
    start_time: Option<NaiveDateTime>,
    #[serde(default)]
    duration_minutes: Option<i32>,
    #[serde(default)]
    color_tag: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: TaskStatus,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(pool: PgPool) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/students", post(create_student))
        .route("/api/students/{id}", get(get_student))
        .route(
            "/api/students/{id}/goals",
            get(list_goals).post(create_goal),
        )
        .route(
            "/api/students/{id}/goals/{goal_id}",
            get(get_goal).delete(delete_goal),
        )
        .route(
            "/api/students/{id}/goals/{goal_id}/target-date",
            patch(update_target_date),
        )
        .route(
            "/api/students/{id}/goals/{goal_id}/generate",
            post(generate_plan),
        )
        .route("/api/students/{id}/reoptimize", post(reoptimize_tasks))
        .route("/api/students/{id}/tasks", get(list_tasks))
        .route(
            "/api/students/{id}/tasks/{task_id}/complete",
            patch(complete_task),
        )
        .route("/api/students/{id}/tasks/{task_id}", delete(delete_task))
        .route(
            "/api/students/{id}/manual-tasks",
            get(list_manual_tasks).post(create_manual_task),
        )
        .route(
            "/api/students/{id}/manual-tasks/{task_id}",
            delete(delete_manual_task),
        )
        .route(
            "/api/students/{id}/manual-tasks/{task_id}/status",
            put(update_manual_task_status),
        )
        .layer(CorsLayer::permissive())
        .with_state(pool)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(pool: PgPool, bind: &str, port: u16) -> Result<()> {
    let app = build_router(pool);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!("studyplan serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("studyplan serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn index() -> Html<&'static str> {
    Html(
        "<!DOCTYPE html>\
<html><head><title>studyplan</title></head><body>\
<h1>studyplan</h1>\
<p>POST <code>/api/students</code> to get started.</p>\
</body></html>",
    )
}

async fn create_student(
    State(pool): State<PgPool>,
    Json(body): Json<NewStudentBody>,
) -> Result<axum::response::Response, AppError> {
    if body.email.trim().is_empty() || body.full_name.trim().is_empty() {
        return Err(AppError::bad_request("email and full_name are required"));
    }
    let student = students::insert_student(&pool, body.email.trim(), body.full_name.trim())
        .await
        .map_err(AppError::internal)?;
    Ok((StatusCode::CREATED, Json(student)).into_response())
}

async fn get_student(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<axum::response::Response, AppError> {
    let student = students::get_student(&pool, id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("student {id} not found")))?;
    Ok(Json(student).into_response())
}

async fn list_goals(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<axum::response::Response, AppError> {
    let goals = goals::list_goals_for_student(&pool, id)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(goals).into_response())
}

async fn create_goal(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
    Json(body): Json<NewGoalBody>,
) -> Result<axum::response::Response, AppError> {
    if body.title.trim().is_empty() {
        return Err(AppError::bad_request("title is required"));
    }
    students::get_student(&pool, id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("student {id} not found")))?;

    let goal = goals::insert_goal(&pool, id, body.title.trim(), body.kind, body.target_date)
        .await
        .map_err(AppError::internal)?;
    Ok((StatusCode::CREATED, Json(goal)).into_response())
}

async fn get_goal(
    State(pool): State<PgPool>,
    Path((id, goal_id)): Path<(Uuid, Uuid)>,
) -> Result<axum::response::Response, AppError> {
    let goal = goals::get_goal_for_student(&pool, goal_id, id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("goal {goal_id} not found")))?;
    Ok(Json(goal).into_response())
}

async fn delete_goal(
    State(pool): State<PgPool>,
    Path((id, goal_id)): Path<(Uuid, Uuid)>,
) -> Result<axum::response::Response, AppError> {
    let deleted = goals::delete_goal(&pool, goal_id, id)
        .await
        .map_err(AppError::internal)?;
    if deleted == 0 {
        return Err(AppError::not_found(format!("goal {goal_id} not found")));
    }
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn update_target_date(
    State(pool): State<PgPool>,
    Path((id, goal_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<TargetDateBody>,
) -> Result<axum::response::Response, AppError> {
    let today = Utc::now().date_naive();
    goal_service::update_target_date(&pool, id, goal_id, body.target_date, today).await?;
    let goal = goals::get_goal_for_student(&pool, goal_id, id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("goal {goal_id} not found")))?;
    Ok(Json(goal).into_response())
}

async fn generate_plan(
    State(pool): State<PgPool>,
    Path((id, goal_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<GenerateBody>,
) -> Result<axum::response::Response, AppError> {
    let req = GenerateRequest {
        goal_id,
        topics: body.topics,
        start_date: body.start_date,
        end_date: body.end_date,
        hours_per_day: body.hours_per_day,
        mode: body.mode,
        energy_preference: body.energy_preference,
    };
    let today = Utc::now().date_naive();
    let tasks = generate(&pool, id, &req, today).await?;
    Ok((StatusCode::CREATED, Json(tasks)).into_response())
}

async fn reoptimize_tasks(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
    Query(params): Query<ReoptimizeParams>,
) -> Result<axum::response::Response, AppError> {
    let today = Utc::now().date_naive();
    let tasks = reoptimize(&pool, id, params.energy_preference, today).await?;
    Ok(Json(tasks).into_response())
}

async fn list_tasks(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<axum::response::Response, AppError> {
    let tasks = ai_tasks::list_tasks_for_student(&pool, id)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(tasks).into_response())
}

async fn complete_task(
    State(pool): State<PgPool>,
    Path((id, task_id)): Path<(Uuid, Uuid)>,
) -> Result<axum::response::Response, AppError> {
    let updated = ai_tasks::complete_task(&pool, task_id, id)
        .await
        .map_err(AppError::internal)?;
    if updated == 0 {
        return Err(AppError::not_found(format!("task {task_id} not found")));
    }
    let task = ai_tasks::get_task(&pool, task_id, id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("task {task_id} not found")))?;
    Ok(Json(task).into_response())
}

async fn delete_task(
    State(pool): State<PgPool>,
    Path((id, task_id)): Path<(Uuid, Uuid)>,
) -> Result<axum::response::Response, AppError> {
    let deleted = ai_tasks::delete_task(&pool, task_id, id)
        .await
        .map_err(AppError::internal)?;
    if deleted == 0 {
        return Err(AppError::not_found(format!("task {task_id} not found")));
    }
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn list_manual_tasks(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<axum::response::Response, AppError> {
    let tasks = manual_tasks::list_manual_tasks_for_student(&pool, id)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(tasks).into_response())
}

async fn create_manual_task(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
    Json(body): Json<NewManualTaskBody>,
) -> Result<axum::response::Response, AppError> {
    if body.title.trim().is_empty() {
        return Err(AppError::bad_request("title is required"));
    }
    if let Some(minutes) = body.duration_minutes
        && minutes <= 0
    {
        return Err(AppError::bad_request("duration_minutes must be positive"));
    }
    students::get_student(&pool, id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("student {id} not found")))?;

    let task = manual_tasks::insert_manual_task(
        &pool,
        id,
        &manual_tasks::NewManualTask {
            title: body.title.trim(),
            task_date: body.task_date,
            start_time: body.start_time,
            duration_minutes: body.duration_minutes,
            color_tag: body.color_tag.as_deref(),
        },
    )
    .await
    .map_err(AppError::internal)?;
    Ok((StatusCode::CREATED, Json(task)).into_response())
}

async fn delete_manual_task(
    State(pool): State<PgPool>,
    Path((id, task_id)): Path<(Uuid, Uuid)>,
) -> Result<axum::response::Response, AppError> {
    let deleted = manual_tasks::delete_manual_task(&pool, task_id, id)
        .await
        .map_err(AppError::internal)?;
    if deleted == 0 {
        return Err(AppError::not_found(format!("task {task_id} not found")));
    }
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn update_manual_task_status(
    State(pool): State<PgPool>,
    Path((id, task_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<StatusBody>,
) -> Result<axum::response::Response, AppError> {
    let updated = manual_tasks::update_manual_task_status(&pool, task_id, id, body.status)
        .await
        .map_err(AppError::internal)?;
    if updated == 0 {
        return Err(AppError::not_found(format!("task {task_id} not found")));
    }
    Ok(StatusCode::NO_CONTENT.into_response())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use sqlx::PgPool;
    use tower::ServiceExt;

    use studyplan_test_utils::{create_test_db, drop_test_db};

    // -----------------------------------------------------------------------
    // HTTP helpers
    // -----------------------------------------------------------------------

    async fn send_get(pool: PgPool, uri: &str) -> axum::response::Response {
        let app = super::build_router(pool);
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn send_json(
        pool: PgPool,
        method: &str,
        uri: &str,
        body: serde_json::Value,
    ) -> axum::response::Response {
        let app = super::build_router(pool);
        app.oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create_student(pool: &PgPool, email: &str) -> String {
        let resp = send_json(
            pool.clone(),
            "POST",
            "/api/students",
            serde_json::json!({ "email": email, "full_name": "Test Student" }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        body_json(resp).await["id"].as_str().unwrap().to_string()
    }

    async fn create_goal(pool: &PgPool, student_id: &str) -> String {
        let resp = send_json(
            pool.clone(),
            "POST",
            &format!("/api/students/{student_id}/goals"),
            serde_json::json!({ "title": "Pass finals", "kind": "exam" }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        body_json(resp).await["id"].as_str().unwrap().to_string()
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_index_returns_html() {
        let (pool, db_name) = create_test_db().await;

        let resp = send_get(pool.clone(), "/").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp
            .headers()
            .get("content-type")
            .expect("should have content-type header")
            .to_str()
            .unwrap();
        assert!(
            content_type.contains("text/html"),
            "content-type should contain text/html, got: {content_type}"
        );

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_student_roundtrip() {
        let (pool, db_name) = create_test_db().await;

        let id = create_student(&pool, "alice@example.com").await;
        let resp = send_get(pool.clone(), &format!("/api/students/{id}")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["email"], "alice@example.com");
        assert_eq!(json["energy_preference"], "balanced");

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_student_not_found() {
        let (pool, db_name) = create_test_db().await;

        let random_id = uuid::Uuid::new_v4();
        let resp = send_get(pool.clone(), &format!("/api/students/{random_id}")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_generate_returns_task_list() {
        let (pool, db_name) = create_test_db().await;

        let student_id = create_student(&pool, "bob@example.com").await;
        let goal_id = create_goal(&pool, &student_id).await;

        let start = chrono::Utc::now().date_naive();
        let end = start + chrono::Duration::days(3);
        let resp = send_json(
            pool.clone(),
            "POST",
            &format!("/api/students/{student_id}/goals/{goal_id}/generate"),
            serde_json::json!({
                "topics": "Algebra, Geometry, Trig",
                "start_date": start.to_string(),
                "end_date": end.to_string(),
                "hours_per_day": 2,
                "mode": "create"
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let json = body_json(resp).await;
        let tasks = json.as_array().expect("response should be an array");
        // start..end inclusive: four days.
        assert_eq!(tasks.len(), 4);
        assert_eq!(tasks[0]["title"], "Study Algebra");
        assert_eq!(tasks[0]["sequence_no"], 1);
        assert_eq!(tasks[3]["task_date"], end.to_string());

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_generate_validation_maps_to_400() {
        let (pool, db_name) = create_test_db().await;

        let student_id = create_student(&pool, "carol@example.com").await;
        let goal_id = create_goal(&pool, &student_id).await;

        // start after end
        let resp = send_json(
            pool.clone(),
            "POST",
            &format!("/api/students/{student_id}/goals/{goal_id}/generate"),
            serde_json::json!({
                "topics": "Algebra",
                "start_date": "2026-03-05",
                "end_date": "2026-03-02",
                "hours_per_day": 2,
                "mode": "create"
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert!(json["error"].as_str().unwrap().contains("start date"));

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_generate_unknown_goal_maps_to_404() {
        let (pool, db_name) = create_test_db().await;

        let student_id = create_student(&pool, "dave@example.com").await;
        let random_goal = uuid::Uuid::new_v4();
        let resp = send_json(
            pool.clone(),
            "POST",
            &format!("/api/students/{student_id}/goals/{random_goal}/generate"),
            serde_json::json!({
                "topics": "Algebra",
                "start_date": "2026-03-02",
                "end_date": "2026-03-05",
                "hours_per_day": 2,
                "mode": "create"
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_reoptimize_persists_preference() {
        let (pool, db_name) = create_test_db().await;

        let student_id = create_student(&pool, "erin@example.com").await;
        let resp = send_json(
            pool.clone(),
            "POST",
            &format!("/api/students/{student_id}/reoptimize?energy_preference=night"),
            serde_json::json!({}),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = send_get(pool.clone(), &format!("/api/students/{student_id}")).await;
        let json = body_json(resp).await;
        assert_eq!(json["energy_preference"], "night");

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_goal_delete_removes_tasks() {
        let (pool, db_name) = create_test_db().await;

        let student_id = create_student(&pool, "frank@example.com").await;
        let goal_id = create_goal(&pool, &student_id).await;

        let start = chrono::Utc::now().date_naive();
        let end = start + chrono::Duration::days(2);
        let resp = send_json(
            pool.clone(),
            "POST",
            &format!("/api/students/{student_id}/goals/{goal_id}/generate"),
            serde_json::json!({
                "topics": "Algebra",
                "start_date": start.to_string(),
                "end_date": end.to_string(),
                "hours_per_day": 1,
                "mode": "create"
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = send_json(
            pool.clone(),
            "DELETE",
            &format!("/api/students/{student_id}/goals/{goal_id}"),
            serde_json::json!({}),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = send_get(pool.clone(), &format!("/api/students/{student_id}/tasks")).await;
        let json = body_json(resp).await;
        assert_eq!(json, serde_json::json!([]));

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_manual_task_crud() {
        let (pool, db_name) = create_test_db().await;

        let student_id = create_student(&pool, "grace@example.com").await;
        let resp = send_json(
            pool.clone(),
            "POST",
            &format!("/api/students/{student_id}/manual-tasks"),
            serde_json::json!({
                "title": "Dentist",
                "task_date": "2026-03-02",
                "start_time": "2026-03-02T14:00:00"
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let task = body_json(resp).await;
        let task_id = task["id"].as_str().unwrap();

        let resp = send_json(
            pool.clone(),
            "PUT",
            &format!("/api/students/{student_id}/manual-tasks/{task_id}/status"),
            serde_json::json!({ "status": "completed" }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = send_get(
            pool.clone(),
            &format!("/api/students/{student_id}/manual-tasks"),
        )
        .await;
        let json = body_json(resp).await;
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["status"], "completed");

        let resp = send_json(
            pool.clone(),
            "DELETE",
            &format!("/api/students/{student_id}/manual-tasks/{task_id}"),
            serde_json::json!({}),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = send_get(
            pool.clone(),
            &format!("/api/students/{student_id}/manual-tasks"),
        )
        .await;
        let json = body_json(resp).await;
        assert_eq!(json, serde_json::json!([]));

        pool.close().await;
        drop_test_db(&db_name).await;
    }
}
