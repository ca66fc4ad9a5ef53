//! Application state shared across handlers.

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::config::CrmConfig;
use crate::gateway::SharedGateway;
use crate::services::ResolverSettings;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Generic over the gateway so route tests can
/// run against a scripted one; the server uses [`SharedGateway`].
pub struct AppState<G = SharedGateway> {
    inner: Arc<AppStateInner<G>>,
    chat_caller: Option<Arc<str>>,
}

struct AppStateInner<G> {
    crm: CrmConfig,
    gateway: G,
    catalog: Catalog,
    settings: ResolverSettings,
}

impl<G> Clone for AppState<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            chat_caller: self.chat_caller.clone(),
        }
    }
}

impl AppState {
    /// State backed by a lazily-built HTTP gateway for `crm`.
    #[must_use]
    pub fn new(crm: CrmConfig, catalog: Catalog, settings: ResolverSettings) -> Self {
        let gateway = SharedGateway::new(crm.clone());
        Self::with_gateway(crm, gateway, catalog, settings)
    }
}

impl<G> AppState<G> {
    /// State around an already-built gateway.
    ///
    /// `crm` is still needed: per-request credentials reuse its transport
    /// settings.
    #[must_use]
    pub fn with_gateway(
        crm: CrmConfig,
        gateway: G,
        catalog: Catalog,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                crm,
                gateway,
                catalog,
                settings,
            }),
            chat_caller: None,
        }
    }

    /// Restrict `POST /chat` to one caller id.
    #[must_use]
    pub fn with_chat_caller(mut self, caller: Option<String>) -> Self {
        self.chat_caller = caller.map(Arc::from);
        self
    }

    /// Whether `caller` may use the chat endpoint.
    ///
    /// Without a configured caller every request is answered.
    #[must_use]
    pub fn chat_allows(&self, caller: Option<&str>) -> bool {
        self.chat_caller
            .as_deref()
            .is_none_or(|allowed| caller.map(str::trim) == Some(allowed))
    }

    /// Default CRM configuration.
    #[must_use]
    pub fn crm(&self) -> &CrmConfig {
        &self.inner.crm
    }

    /// Gateway used when a request carries no credentials of its own.
    #[must_use]
    pub fn gateway(&self) -> &G {
        &self.inner.gateway
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    #[must_use]
    pub fn settings(&self) -> ResolverSettings {
        self.inner.settings
    }
}
