//! Catalog inspection.
//!
//! # Environment Variables
//!
//! - `CRM_CATALOG_PATH` - Catalog file used when `--path` is not given

use std::path::PathBuf;

use crm_bridge::catalog::{Catalog, CatalogDrift};
use crm_bridge::services::fetch_pipelines;

use super::{CliError, Context, emit};

/// Print the catalog in effect as YAML.
///
/// Needs no CRM credentials.
pub fn show(path: Option<PathBuf>) -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let path = path.or_else(|| {
        std::env::var("CRM_CATALOG_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
    });
    let catalog = match &path {
        Some(path) => Catalog::from_path(path)?,
        None => Catalog::builtin()?,
    };
    tracing::info!(
        source = path.as_ref().map_or_else(|| "built-in".to_string(), |p| p.display().to_string()),
        "Catalog loaded"
    );

    let yaml = serde_yaml::to_string(&catalog).map_err(|e| CliError::Encode(e.to_string()))?;
    emit(&yaml)
}

/// Check every catalog id against the CRM's live pipelines.
pub async fn verify(ctx: &Context) -> Result<(), CliError> {
    let listing = fetch_pipelines(ctx.gateway()).await?;
    let drift = ctx.catalog().verify_against(&listing.pipelines);

    if drift.is_empty() {
        tracing::info!(
            pipelines = ctx.catalog().pipelines().len(),
            "Catalog matches the CRM"
        );
        return emit("✅ Catalog matches the CRM");
    }

    for item in &drift {
        match item {
            CatalogDrift::MissingPipeline { pipeline } => {
                emit(&format!("❌ pipeline {pipeline} not found in the CRM"))?;
            }
            CatalogDrift::MissingStage { pipeline, stage } => {
                emit(&format!("❌ stage {stage} not found in pipeline {pipeline}"))?;
            }
        }
    }
    tracing::warn!(differences = drift.len(), "Catalog drift detected");
    Ok(())
}
