//! Process-wide gateway, built on first use.

use crm_bridge_core::LocationId;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::info;

use super::{CrmError, CrmGateway, HttpGateway, Method, Payload};
use crate::config::CrmConfig;

/// Gateway that constructs its HTTP client lazily, exactly once.
///
/// Concurrent first calls race on the same initializer; one wins and the
/// rest reuse its client. A failed initialization is not cached, so the
/// next call tries again.
#[derive(Debug)]
pub struct SharedGateway {
    config: CrmConfig,
    client: OnceCell<HttpGateway>,
}

impl SharedGateway {
    #[must_use]
    pub fn new(config: CrmConfig) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    /// Configuration the client is (or will be) built from.
    #[must_use]
    pub const fn config(&self) -> &CrmConfig {
        &self.config
    }

    #[cfg(test)]
    fn is_initialized(&self) -> bool {
        self.client.initialized()
    }

    /// The underlying client, building it on first call.
    ///
    /// # Errors
    ///
    /// Returns error if the client cannot be built from the configuration.
    pub async fn client(&self) -> Result<&HttpGateway, CrmError> {
        self.client
            .get_or_try_init(|| async {
                let gateway = HttpGateway::new(&self.config)?;
                info!(location_id = %self.config.location_id, "CRM gateway initialized");
                Ok(gateway)
            })
            .await
    }
}

impl CrmGateway for SharedGateway {
    fn location_id(&self) -> &LocationId {
        &self.config.location_id
    }

    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        payload: Payload,
    ) -> Result<Value, CrmError> {
        self.client().await?.request(method, endpoint, payload).await
    }
}
