//! Session workflow API handlers
//!
//! Create/inspect/end sessions and drive the Upload → Processing → Results
//! step machine.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use aeroscan_common::time;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use aeroscan_common::events::DemoEvent;

use crate::{
    error::ApiResult,
    models::{ProjectMetadata, Step, StepTransition, UploadManifest},
    services::ProcessingRunner,
    view::{render, View},
    AppState,
};

/// POST /api/sessions response
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
    pub step: Step,
}

/// POST /api/sessions/:id/upload request
#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub files: Vec<String>,
}

/// POST /api/sessions/:id/upload response
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub session_id: Uuid,
    pub uploaded_files: usize,
    pub message: String,
}

/// POST /api/sessions/:id/start request
#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    /// Quick start with sample data instead of uploaded files
    #[serde(default)]
    pub sample: bool,
}

/// POST /api/sessions
pub async fn create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<CreateSessionResponse>) {
    let session_id = open_session(&state).await;
    (
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id,
            step: Step::Upload,
        }),
    )
}

/// Create a session and announce it on the event bus
pub(crate) async fn open_session(state: &AppState) -> Uuid {
    let session_id = state.sessions.create().await;
    state.event_bus.emit_lossy(DemoEvent::SessionCreated {
        session_id,
        timestamp: time::now(),
    });
    session_id
}

/// GET /api/sessions/:id
///
/// Current view of the session as JSON.
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<View>> {
    let snapshot = state.sessions.get(session_id).await?;
    Ok(Json(render(&snapshot)))
}

/// DELETE /api/sessions/:id
///
/// Ends the session and stops its processing script if one is running.
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.sessions.remove(session_id).await?;
    state.event_bus.emit_lossy(DemoEvent::SessionEnded {
        session_id,
        timestamp: time::now(),
    });
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/sessions/:id/upload
pub async fn upload_files(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<UploadRequest>,
) -> ApiResult<Json<UploadResponse>> {
    let manifest = UploadManifest::from_files(request.files)?;
    let uploaded_files = state
        .sessions
        .update(session_id, |s| s.set_upload(manifest))
        .await?;

    tracing::info!(session_id = %session_id, uploaded_files, "Files selected");

    Ok(Json(UploadResponse {
        session_id,
        uploaded_files,
        message: format!("Uploaded {} files", uploaded_files),
    }))
}

/// PUT /api/sessions/:id/metadata
pub async fn update_metadata(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(metadata): Json<ProjectMetadata>,
) -> ApiResult<Json<ProjectMetadata>> {
    let stored = metadata.clone();
    state
        .sessions
        .update(session_id, |s| s.set_metadata(metadata))
        .await?;

    tracing::debug!(session_id = %session_id, project = %stored.project_name, "Metadata updated");
    Ok(Json(stored))
}

/// POST /api/sessions/:id/start
///
/// Generates the project data, moves to step 2 and spawns the processing
/// script in the background.
pub async fn start_processing(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    request: Option<Json<StartRequest>>,
) -> ApiResult<Json<StepTransition>> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let (seed, count) = (state.config.seed, state.config.defect_count);

    let transition = state
        .sessions
        .update(session_id, |s| {
            if request.sample {
                s.use_sample_data(seed, count)
            } else {
                s.start_processing(seed, count)
            }
        })
        .await?;

    tracing::info!(
        session_id = %session_id,
        sample = request.sample,
        seed,
        defect_count = count,
        "Processing started"
    );
    announce_transition(&state, &transition);

    let runner = ProcessingRunner::new(
        state.sessions.clone(),
        state.event_bus.clone(),
        state.processing_script(),
    );
    // Detached; the store holds the task's cancellation token
    let _handle = runner.spawn(session_id).await;

    Ok(Json(transition))
}

/// POST /api/sessions/:id/confirm
pub async fn confirm_results(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<StepTransition>> {
    let transition = state
        .sessions
        .update(session_id, |s| s.confirm_results())
        .await?;
    announce_transition(&state, &transition);
    Ok(Json(transition))
}

/// POST /api/sessions/:id/reset
///
/// "New project": back to step 1 with all project data discarded.
pub async fn new_project(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<StepTransition>> {
    let transition = state
        .sessions
        .update(session_id, |s| s.new_project())
        .await?;
    announce_transition(&state, &transition);
    Ok(Json(transition))
}

fn announce_transition(state: &AppState, transition: &StepTransition) {
    tracing::info!(
        session_id = %transition.session_id,
        from = transition.old_step.number(),
        to = transition.new_step.number(),
        action = %transition.action,
        "Step changed"
    );
    state.event_bus.emit_lossy(DemoEvent::StepChanged {
        session_id: transition.session_id,
        old_step: transition.old_step.number(),
        new_step: transition.new_step.number(),
        action: transition.action.clone(),
        timestamp: transition.transitioned_at,
    });
}

/// Build session workflow routes
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/api/sessions", post(create_session))
        .route(
            "/api/sessions/:id",
            get(get_session).delete(delete_session),
        )
        .route("/api/sessions/:id/upload", post(upload_files))
        .route("/api/sessions/:id/metadata", put(update_metadata))
        .route("/api/sessions/:id/start", post(start_processing))
        .route("/api/sessions/:id/confirm", post(confirm_results))
        .route("/api/sessions/:id/reset", post(new_project))
}
