//! UI Routes - HTML pages for the aeroscan-demo web interface
//!
//! Pages are rendered server-side from [`crate::view::View`]; a small
//! vanilla JS file posts actions to the JSON API and reloads on progress.
//!
//! - **Static Assets** (`static_assets`): CSS/JS file serving
//! - **Root** (`root`): opens a fresh session
//! - **Session Page** (`session_page`): the three workflow steps

use axum::{routing::get, Router};

use crate::AppState;

mod root;
mod session_page;
mod static_assets;

pub use session_page::render_page;

use root::root_page;
use session_page::session_page;
use static_assets::{serve_aeroscan_css, serve_aeroscan_js};

/// Build UI routes
pub fn ui_routes() -> Router<AppState> {
    Router::new()
        // Page routes
        .route("/", get(root_page))
        .route("/session/:id", get(session_page))
        // Static assets
        .route("/static/aeroscan.css", get(serve_aeroscan_css))
        .route("/static/aeroscan.js", get(serve_aeroscan_js))
}
