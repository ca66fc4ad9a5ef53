//! `reqwest`-backed gateway.

use std::sync::Arc;

use crm_bridge_core::LocationId;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use super::{CrmError, CrmGateway, Method, Payload};
use crate::config::CrmConfig;

/// LeadConnector HTTP client.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct HttpGateway {
    inner: Arc<HttpGatewayInner>,
}

struct HttpGatewayInner {
    client: reqwest::Client,
    base_url: String,
    location_id: LocationId,
}

impl std::fmt::Debug for HttpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGateway")
            .field("base_url", &self.inner.base_url)
            .field("location_id", &self.inner.location_id)
            .finish_non_exhaustive()
    }
}

impl HttpGateway {
    /// Create a new gateway.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &CrmConfig) -> Result<Self, CrmError> {
        let mut headers = HeaderMap::new();

        let mut auth_value = HeaderValue::from_str(&config.authorization())
            .map_err(|e| CrmError::Unexpected(format!("Invalid API key format: {e}")))?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);

        headers.insert(
            "Version",
            HeaderValue::from_str(&config.api_version)
                .map_err(|e| CrmError::Unexpected(format!("Invalid API version: {e}")))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(HttpGatewayInner {
                client,
                base_url: config.base_url.trim_end_matches('/').to_string(),
                location_id: config.location_id.clone(),
            }),
        })
    }

    fn url(&self, endpoint: &str) -> Result<Url, CrmError> {
        Url::parse(&format!("{}{endpoint}", self.inner.base_url))
            .map_err(|e| CrmError::Unexpected(format!("Invalid endpoint {endpoint}: {e}")))
    }

    /// Turn a response into parsed JSON or a `Remote` error.
    async fn handle_response(response: reqwest::Response) -> Result<Value, CrmError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "CRM request rejected");
            return Err(CrmError::Remote {
                status: status.as_u16(),
                body,
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).map_err(|e| CrmError::Parse(e.to_string()))
    }
}

impl CrmGateway for HttpGateway {
    fn location_id(&self) -> &LocationId {
        &self.inner.location_id
    }

    #[instrument(skip(self, payload), fields(method = %method, endpoint = %endpoint))]
    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        payload: Payload,
    ) -> Result<Value, CrmError> {
        let mut url = self.url(endpoint)?;

        let builder = match payload {
            Payload::Empty => self.inner.client.request(method, url),
            Payload::Query(pairs) => {
                url.query_pairs_mut().extend_pairs(pairs.iter());
                self.inner.client.request(method, url)
            }
            Payload::Json(body) => {
                debug!(fields = ?body.as_object().map(|o| o.keys().collect::<Vec<_>>()), "CRM request body");
                self.inner.client.request(method, url).json(&body)
            }
        };

        let response = builder.send().await?;
        Self::handle_response(response).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn config() -> CrmConfig {
        let mut config = CrmConfig::new(
            SecretString::from("pit-test-key"),
            LocationId::new_unchecked("loc_1"),
        );
        config.base_url = "https://crm.example.com/".to_string();
        config
    }

    #[test]
    fn test_new_builds_client() {
        let gateway = HttpGateway::new(&config()).unwrap();
        assert_eq!(gateway.location_id().as_str(), "loc_1");
    }

    #[test]
    fn test_url_joins_base_and_endpoint() {
        let gateway = HttpGateway::new(&config()).unwrap();
        let url = gateway.url("/contacts/").unwrap();
        assert_eq!(url.as_str(), "https://crm.example.com/contacts/");
    }

    #[test]
    fn test_invalid_api_key_rejected() {
        let mut config = config();
        config.api_key = SecretString::from("bad\nkey");
        assert!(matches!(
            HttpGateway::new(&config),
            Err(CrmError::Unexpected(_))
        ));
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let gateway = HttpGateway::new(&config()).unwrap();
        let debug_output = format!("{gateway:?}");
        assert!(debug_output.contains("loc_1"));
        assert!(!debug_output.contains("pit-test-key"));
    }
}
