//! Static asset handlers
//!
//! Embeds and serves CSS/JS files at compile time

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

const AEROSCAN_CSS: &str = include_str!("../../../static/aeroscan.css");
const AEROSCAN_JS: &str = include_str!("../../../static/aeroscan.js");

/// GET /static/aeroscan.css
pub async fn serve_aeroscan_css() -> Response {
    asset("text/css", AEROSCAN_CSS)
}

/// GET /static/aeroscan.js
pub async fn serve_aeroscan_js() -> Response {
    asset("application/javascript", AEROSCAN_JS)
}

fn asset(content_type: &'static str, body: &'static str) -> Response {
    (
        StatusCode::OK,
        [
            ("content-type", content_type),
            ("cache-control", "no-cache, no-store, must-revalidate"),
        ],
        body,
    )
        .into_response()
}
