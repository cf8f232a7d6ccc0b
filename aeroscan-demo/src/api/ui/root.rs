//! Root page handler

use axum::{extract::State, response::Redirect};

use crate::{api::session::open_session, AppState};

/// GET /
///
/// Every visit opens an independent session at step 1.
pub async fn root_page(State(state): State<AppState>) -> Redirect {
    let session_id = open_session(&state).await;
    Redirect::to(&format!("/session/{}", session_id))
}
