//! Opportunity creation.
//!
//! One orchestrator serves every caller. The [`ResolutionMode`] decides how
//! much the caller must already know:
//!
//! | Mode | Required | Resolved here |
//! |---|---|---|
//! | `ids_required` | title, contact id, pipeline id, stage id | nothing |
//! | `names_resolved` | title, contact id or name | contact, pipeline, stage |
//! | `natural_language` | contact name | contact, pipeline, stage, title |
//!
//! Every mode runs the same chain: validate, resolve the contact, place the
//! opportunity in the catalog, submit. Validation failures never reach the
//! network, and a contact that cannot be resolved stops the chain before the
//! opportunity is submitted.

use std::str::FromStr;

use chrono::Local;
use crm_bridge_core::{ContactId, MonetaryValue, OpportunityId, OpportunityStatus, PipelineId, StageId};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::contacts::{ContactResolver, ContactSource, ContactSpec};
use super::{OperationError, ResolverSettings};
use crate::catalog::{Catalog, PipelineSpec, PlacementSource, PlacementWarning};
use crate::gateway::{Api, CrmGateway, NewOpportunity};

/// Title segment used when no pipeline name was supplied.
const UNNAMED_PIPELINE_LABEL: &str = "Lead";

/// How much of the opportunity the caller has already resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMode {
    /// Every id is supplied. Nothing is looked up.
    IdsRequired,
    /// Title given; contact, pipeline and stage may be names.
    #[default]
    NamesResolved,
    /// Only a contact name is required. The title is generated.
    NaturalLanguage,
}

impl ResolutionMode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::IdsRequired => "ids_required",
            Self::NamesResolved => "names_resolved",
            Self::NaturalLanguage => "natural_language",
        }
    }
}

impl std::fmt::Display for ResolutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "ids_required" | "ids" | "strict" => Ok(Self::IdsRequired),
            "names_resolved" | "names" | "easy" => Ok(Self::NamesResolved),
            "natural_language" | "natural" => Ok(Self::NaturalLanguage),
            _ => Err(format!("invalid resolution mode: {s}")),
        }
    }
}

/// Input of [`OpportunityOrchestrator::create`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpportunityRequest {
    pub mode: ResolutionMode,
    pub title: Option<String>,
    pub contact: ContactSpec,
    pub pipeline: PipelineSpec,
    pub value: MonetaryValue,
    pub status: OpportunityStatus,
}

impl OpportunityRequest {
    fn title(&self) -> Option<&str> {
        self.title.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    /// Names of the required fields that are missing for the mode.
    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        match self.mode {
            ResolutionMode::IdsRequired => {
                if self.title().is_none() {
                    missing.push("title");
                }
                if self.contact.id.is_none() {
                    missing.push("contact_id");
                }
                if self.pipeline.pipeline_id.is_none() {
                    missing.push("pipeline_id");
                }
                if self.pipeline.stage_id.is_none() {
                    missing.push("stage_id");
                }
            }
            ResolutionMode::NamesResolved => {
                if self.title().is_none() {
                    missing.push("title");
                }
                if self.contact.id.is_none() && self.contact.name().is_none() {
                    missing.push("contact_name");
                }
            }
            ResolutionMode::NaturalLanguage => {
                if self.contact.name().is_none() {
                    missing.push("name");
                }
            }
        }
        missing
    }
}

/// How each part of a created opportunity was determined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionReport {
    pub contact: ContactSource,
    pub pipeline: PlacementSource,
    pub stage: PlacementSource,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<PlacementWarning>,
}

/// A submitted opportunity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedOpportunity {
    pub id: OpportunityId,
    pub title: String,
    pub contact_id: ContactId,
    pub pipeline_id: PipelineId,
    pub stage_id: StageId,
    pub value: MonetaryValue,
    pub status: OpportunityStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    pub resolution: ResolutionReport,
}

fn clock_stamp() -> String {
    Local::now().format("%H:%M").to_string()
}

/// Validates, resolves and submits opportunities.
pub struct OpportunityOrchestrator<'a, G> {
    gateway: &'a G,
    catalog: &'a Catalog,
    settings: ResolverSettings,
    stamp: fn() -> String,
}

impl<'a, G: CrmGateway> OpportunityOrchestrator<'a, G> {
    #[must_use]
    pub const fn new(gateway: &'a G, catalog: &'a Catalog, settings: ResolverSettings) -> Self {
        Self {
            gateway,
            catalog,
            settings,
            stamp: clock_stamp,
        }
    }

    /// Replace the `HH:MM` stamp used in generated titles.
    #[must_use]
    pub const fn with_stamp_source(mut self, stamp: fn() -> String) -> Self {
        self.stamp = stamp;
        self
    }

    /// Create an opportunity.
    ///
    /// # Errors
    ///
    /// - `Validation` when a field required by the mode is missing (no calls made)
    /// - `Resolution` when no contact id could be determined
    /// - `Crm` when the CRM rejects the opportunity; the body is kept verbatim
    #[instrument(skip(self, request), fields(mode = %request.mode))]
    pub async fn create(
        &self,
        request: OpportunityRequest,
    ) -> Result<CreatedOpportunity, OperationError> {
        let missing = request.missing_fields();
        if !missing.is_empty() {
            return Err(OperationError::Validation { missing });
        }

        let contact = ContactResolver::new(self.gateway, self.settings)
            .resolve(&request.contact)
            .await?;
        if !matches!(contact.source, ContactSource::Explicit | ContactSource::Matched) {
            info!(contact_id = %contact.id, source = ?contact.source, "Contact resolved");
        }

        let placement = self.catalog.resolve(&request.pipeline);
        for warning in &placement.warnings {
            warn!(%warning, "Pipeline placement fallback");
        }

        let title = match request.mode {
            ResolutionMode::NaturalLanguage => self.generated_title(&request),
            ResolutionMode::IdsRequired | ResolutionMode::NamesResolved => {
                request.title().unwrap_or_default().to_string()
            }
        };

        let body = NewOpportunity {
            location_id: self.gateway.location_id().clone(),
            name: title.clone(),
            contact_id: contact.id.clone(),
            pipeline_id: placement.pipeline_id.clone(),
            pipeline_stage_id: placement.stage_id.clone(),
            status: request.status,
            monetary_value: request.value,
        };
        let created = Api::new(self.gateway).create_opportunity(&body).await?;

        info!(
            opportunity_id = %created.id,
            pipeline_id = %placement.pipeline_id,
            stage_id = %placement.stage_id,
            "Opportunity created"
        );

        Ok(CreatedOpportunity {
            title: created.display_name().map_or(title, String::from),
            created_at: created.created().map(String::from),
            id: created.id,
            contact_id: contact.id,
            pipeline_id: placement.pipeline_id,
            stage_id: placement.stage_id,
            value: request.value,
            status: request.status,
            resolution: ResolutionReport {
                contact: contact.source,
                pipeline: placement.pipeline_source,
                stage: placement.stage_source,
                warnings: placement.warnings,
            },
        })
    }

    /// `"{name} - {pipeline} - {HH:MM}"`, so repeated quick submissions for
    /// the same person get distinct titles.
    fn generated_title(&self, request: &OpportunityRequest) -> String {
        let name = request.contact.name().unwrap_or_default();
        let pipeline = request
            .pipeline
            .pipeline_name
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(UNNAMED_PIPELINE_LABEL);
        format!("{name} - {pipeline} - {}", (self.stamp)())
    }
}
