//! Resolution and fallback services.
//!
//! # Services
//!
//! - `contacts` - Find-or-create contact resolution
//! - `opportunities` - Opportunity creation in three strictness modes
//! - `messaging` - SMS delivery with a conversation fallback
//! - `pipelines` - Pipeline listing over the primary and alternate routes

pub mod contacts;
mod error;
pub mod messaging;
pub mod opportunities;
pub mod pipelines;

pub use contacts::{CONTACT_SEARCH_LIMIT, ContactResolver, ContactSource, ContactSpec, ResolvedContact};
pub use error::OperationError;
pub use messaging::{DeliveryResult, DeliveryRoute, Messenger};
pub use opportunities::{
    CreatedOpportunity, OpportunityOrchestrator, OpportunityRequest, ResolutionMode,
    ResolutionReport,
};
pub use pipelines::{PipelineListing, PipelineRoute, fetch_pipelines};

/// Behaviour switches shared by the services.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverSettings {
    /// Rewrite email/phone with a random suffix when creating contacts, and
    /// retry with the original email if the CRM rejects the rewrite.
    pub disambiguate_contacts: bool,
}
