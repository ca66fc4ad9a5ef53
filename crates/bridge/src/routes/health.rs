//! Health check.

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not contact the CRM.
pub async fn health() -> &'static str {
    "ok"
}
