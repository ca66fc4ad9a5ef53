//! Chat command endpoint.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::chat::ChatBot;
use crate::gateway::CrmGateway;
use crate::state::AppState;

const ACCESS_DENIED: &str = "❌ Acesso negado";

/// Request body for `POST /chat`.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
    /// Caller identity, checked against the configured chat id.
    #[serde(default)]
    pub chat_id: Option<String>,
}

/// Response body for `POST /chat`.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// Answer one command line.
///
/// Callers other than the configured chat id get `403` and no CRM call is
/// made.
#[instrument(skip_all, fields(chat_id = ?request.chat_id))]
pub async fn reply<G: CrmGateway>(
    State(state): State<AppState<G>>,
    Json(request): Json<ChatRequest>,
) -> (StatusCode, Json<ChatResponse>) {
    if !state.chat_allows(request.chat_id.as_deref()) {
        warn!("Chat request from unauthorized caller");
        let reply = ChatResponse {
            reply: ACCESS_DENIED.to_string(),
        };
        return (StatusCode::FORBIDDEN, Json(reply));
    }

    let bot = ChatBot::new(state.gateway(), state.catalog(), state.settings());
    let reply = ChatResponse {
        reply: bot.reply(&request.text).await,
    };
    (StatusCode::OK, Json(reply))
}
