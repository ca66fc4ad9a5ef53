//! Remote CRM gateway.
//!
//! The gateway is the only component that talks HTTP. It sends one request
//! to one endpoint and returns the parsed JSON body, or a [`CrmError`] on
//! any non-2xx status or transport failure. It never retries; fallback
//! policy belongs to the services built on top of it.
//!
//! # API Reference
//!
//! - Base URL: `https://services.leadconnectorhq.com`
//! - Authentication: `Authorization: Bearer <key>`
//! - API Version: `2021-07-28` (specified via `Version` header)

mod api;
mod http;
mod shared;
mod types;

pub use api::{Api, total_value};
pub use http::HttpGateway;
pub use shared::SharedGateway;
pub use types::*;

use std::future::Future;

use crm_bridge_core::LocationId;
use serde_json::Value;
use thiserror::Error;

pub use reqwest::Method;

/// Errors that can occur when talking to the CRM.
#[derive(Debug, Clone, Error)]
pub enum CrmError {
    /// The CRM answered with a non-2xx status. The body is kept verbatim.
    #[error("CRM returned HTTP {status}: {body}")]
    Remote { status: u16, body: String },

    /// Connection, TLS or timeout failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body was not valid JSON.
    #[error("failed to parse CRM response: {0}")]
    Parse(String),

    /// A 2xx response that lacks a field the caller needs.
    #[error("unexpected CRM response: {0}")]
    Unexpected(String),
}

impl CrmError {
    /// Whether the CRM rejected the request content (400 or 422).
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Remote { status: 400 | 422, .. })
    }

    /// HTTP status of a remote rejection.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for CrmError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Request payload: nothing, query-string pairs, or a JSON body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Empty,
    Query(Vec<(String, String)>),
    Json(Value),
}

impl Payload {
    /// Build a query payload from borrowed pairs.
    #[must_use]
    pub fn query<K: ToString, V: ToString>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        Self::Query(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    /// Value of a query parameter.
    #[must_use]
    pub fn query_param(&self, key: &str) -> Option<&str> {
        match self {
            Self::Query(pairs) => pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    /// JSON body, if any.
    #[must_use]
    pub const fn json(&self) -> Option<&Value> {
        match self {
            Self::Json(body) => Some(body),
            _ => None,
        }
    }
}

/// Authenticated access to the CRM, scoped to one location.
///
/// Implementations carry the credential and location; callers only name
/// the method, endpoint and payload.
pub trait CrmGateway: Send + Sync {
    /// Location every call is scoped to.
    fn location_id(&self) -> &LocationId;

    /// Perform one request and return the parsed JSON body.
    ///
    /// An empty 2xx body yields `Value::Null`.
    fn request(
        &self,
        method: Method,
        endpoint: &str,
        payload: Payload,
    ) -> impl Future<Output = Result<Value, CrmError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_statuses() {
        let err = CrmError::Remote {
            status: 422,
            body: "{}".into(),
        };
        assert!(err.is_validation());
        assert_eq!(err.status(), Some(422));

        let err = CrmError::Remote {
            status: 400,
            body: String::new(),
        };
        assert!(err.is_validation());

        let err = CrmError::Remote {
            status: 500,
            body: String::new(),
        };
        assert!(!err.is_validation());
        assert!(!CrmError::Transport("timeout".into()).is_validation());
    }

    #[test]
    fn test_remote_error_keeps_body_verbatim() {
        let err = CrmError::Remote {
            status: 422,
            body: r#"{"message":"pipelineStageId is invalid"}"#.into(),
        };
        assert_eq!(
            err.to_string(),
            r#"CRM returned HTTP 422: {"message":"pipelineStageId is invalid"}"#
        );
    }

    #[test]
    fn test_payload_helpers() {
        let payload = Payload::query([("locationId", "loc_1"), ("limit", "50")]);
        assert_eq!(payload.query_param("limit"), Some("50"));
        assert_eq!(payload.query_param("query"), None);
        assert!(payload.json().is_none());
    }
}
