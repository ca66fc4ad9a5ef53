//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health   - Liveness check
//! GET  /methods  - Tool names, descriptions and input schemas
//! POST /mcp      - Invoke one tool: { method, params, credentials? }
//! POST /chat     - Answer one chat command line: { text }
//! ```

pub mod chat;
pub mod health;
pub mod mcp;

use axum::Router;
use axum::routing::{get, post};

use crate::gateway::CrmGateway;
use crate::state::AppState;

/// Build the application router.
pub fn routes<G: CrmGateway + 'static>() -> Router<AppState<G>> {
    Router::new()
        .route("/health", get(health::health))
        .route("/methods", get(mcp::methods))
        .route("/mcp", post(mcp::invoke::<G>))
        .route("/chat", post(chat::reply::<G>))
}
