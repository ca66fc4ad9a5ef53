//! Tool invocation over HTTP.

use axum::Json;
use axum::extract::State;
use crm_bridge_core::LocationId;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::gateway::{CrmError, CrmGateway, HttpGateway};
use crate::state::AppState;
use crate::tools::{Tool, ToolExecutor, ToolName, ToolOutput, crm_tools};

/// Response for `GET /methods`.
#[derive(Debug, Serialize)]
pub struct MethodsResponse {
    pub methods: Vec<Tool>,
}

/// Request body for `POST /mcp`.
#[derive(Debug, Deserialize)]
pub struct InvokeRequest {
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub credentials: Option<Credentials>,
}

/// Credentials for one call, overriding the server's own.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub api_key: String,
    pub location_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"[REDACTED]")
            .field("location_id", &self.location_id)
            .finish()
    }
}

/// Response body for `POST /mcp`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvokeResponse {
    pub success: bool,
    pub method: String,
    pub text: String,
}

/// List the available tools.
pub async fn methods() -> Json<MethodsResponse> {
    Json(MethodsResponse {
        methods: crm_tools(),
    })
}

/// Invoke one tool.
///
/// Operation failures are answered with `success: false`. Only an unknown
/// method, malformed params or unusable credentials are rejected.
#[instrument(skip(state, request), fields(method = %request.method))]
pub async fn invoke<G: CrmGateway>(
    State(state): State<AppState<G>>,
    Json(request): Json<InvokeRequest>,
) -> Result<Json<InvokeResponse>, AppError> {
    let tool: ToolName = request
        .method
        .parse()
        .map_err(|_| AppError::UnknownMethod(request.method.clone()))?;

    let params = match request.params {
        Value::Null => Value::Object(Map::new()),
        params @ Value::Object(_) => params,
        _ => return Err(AppError::BadRequest("params must be an object".to_string())),
    };

    let output = match request.credentials {
        Some(credentials) => {
            let location_id = LocationId::parse(&credentials.location_id)
                .map_err(|e| AppError::BadRequest(format!("locationId: {e}")))?;
            if credentials.api_key.trim().is_empty() {
                return Err(AppError::BadRequest("apiKey must not be blank".to_string()));
            }
            let config = state
                .crm()
                .with_credentials(SecretString::from(credentials.api_key), location_id);
            let gateway = HttpGateway::new(&config).map_err(|e| match e {
                CrmError::Unexpected(reason) => AppError::BadRequest(format!("credentials: {reason}")),
                other => AppError::Internal(other.to_string()),
            })?;
            info!(location_id = %config.location_id, "Using per-request credentials");
            run(&gateway, &state, tool, &params).await
        }
        None => run(state.gateway(), &state, tool, &params).await,
    };

    Ok(Json(InvokeResponse {
        success: !output.is_error,
        method: tool.method().to_string(),
        text: output.text,
    }))
}

async fn run<G: CrmGateway, S>(
    gateway: &G,
    state: &AppState<S>,
    tool: ToolName,
    params: &Value,
) -> ToolOutput {
    ToolExecutor::new(gateway, state.catalog(), state.settings())
        .invoke(tool.as_str(), params)
        .await
}
