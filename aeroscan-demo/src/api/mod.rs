//! HTTP API handlers for aeroscan-demo
//!
//! JSON endpoints drive the three-step workflow; SSE streams push
//! processing progress; the `ui` module renders the same views as HTML.

pub mod health;
pub mod results;
pub mod session;
pub mod sse;
pub mod ui;

pub use health::health_routes;
pub use results::results_routes;
pub use session::session_routes;
pub use sse::{event_stream, session_event_stream};
pub use ui::ui_routes;
