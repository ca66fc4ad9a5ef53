//! Command implementations.

pub mod catalog;
pub mod chat;
pub mod crm;

use std::io::Write;

use crm_bridge::catalog::{Catalog, CatalogError};
use crm_bridge::config::{BridgeConfig, ConfigError};
use crm_bridge::gateway::{CrmError, HttpGateway};
use crm_bridge::services::{OperationError, ResolverSettings};
use crm_bridge::tools::{ToolError, ToolExecutor};
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Environment configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Catalog could not be loaded.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// HTTP client could not be built.
    #[error("Gateway error: {0}")]
    Gateway(#[from] CrmError),

    /// A tool call failed.
    #[error("{0}")]
    Tool(#[from] ToolError),

    /// A service call failed.
    #[error("{0}")]
    Operation(#[from] OperationError),

    /// Output could not be encoded.
    #[error("Failed to encode output: {0}")]
    Encode(String),

    /// Writing to stdout failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration, catalog and gateway for commands that talk to the CRM.
pub struct Context {
    catalog: Catalog,
    gateway: HttpGateway,
    settings: ResolverSettings,
}

impl Context {
    /// Load everything from the environment (and `.env`).
    pub fn load() -> Result<Self, CliError> {
        let config = BridgeConfig::from_env()?;
        let catalog = config.load_catalog()?;
        let gateway = HttpGateway::new(&config.crm)?;
        tracing::info!(location_id = %config.crm.location_id, "Connected to CRM");

        Ok(Self {
            catalog,
            gateway,
            settings: config.resolver_settings(),
        })
    }

    pub const fn tools(&self) -> ToolExecutor<'_, HttpGateway> {
        ToolExecutor::new(&self.gateway, &self.catalog, self.settings)
    }

    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub const fn gateway(&self) -> &HttpGateway {
        &self.gateway
    }

    pub const fn settings(&self) -> ResolverSettings {
        self.settings
    }
}

/// Write one block of output to stdout.
pub fn emit(text: &str) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{text}")?;
    Ok(())
}
