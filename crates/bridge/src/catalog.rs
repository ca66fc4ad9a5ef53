//! Pipeline/stage catalog and the name-to-id resolver built on it.
//!
//! The catalog is configuration, not code: a YAML document listing each
//! pipeline with its synonyms, its stages and the stage new opportunities
//! land in by default. It is loaded once at startup and shared read-only.
//!
//! ## YAML Format
//!
//! ```yaml
//! default_pipeline: SjYJh6QYcw6bdK6poVnL
//! pipelines:
//!   - id: SjYJh6QYcw6bdK6poVnL
//!     name: Vendas
//!     synonyms: [vendas, leads, principal]
//!     default_stage: 6c3a7dde-3fa6-46c8-bafa-d0e085aa62bd
//!     stages:
//!       - id: 6c3a7dde-3fa6-46c8-bafa-d0e085aa62bd
//!         name: New Lead
//!         synonyms: [inicial, novo lead]
//! ```
//!
//! Resolution never fails. Unknown names fall back to the default pipeline
//! and its default stage, and every fallback is reported in
//! [`ResolvedPlacement::warnings`] so callers can tell the user.

use std::collections::HashSet;
use std::path::Path;

use crm_bridge_core::{PipelineId, StageId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gateway::Pipeline;

/// Catalog shipped with the binary.
const BUILTIN_CATALOG: &str = include_str!("../catalog.yaml");

/// Errors raised while loading a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The file could not be read.
    #[error("failed to read catalog {path}: {message}")]
    Io { path: String, message: String },

    /// The document is not valid YAML for the catalog shape.
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The document parsed but is inconsistent.
    #[error("invalid catalog: {0}")]
    Invalid(String),
}

/// A stage as listed in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageEntry {
    pub id: StageId,
    pub name: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

/// A pipeline as listed in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineEntry {
    pub id: PipelineId,
    pub name: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
    pub default_stage: StageId,
    pub stages: Vec<StageEntry>,
}

impl PipelineEntry {
    fn stage_named(&self, key: &str) -> Option<&StageEntry> {
        self.stages
            .iter()
            .find(|stage| stage.synonyms.iter().any(|s| s == key))
    }

    fn has_stage(&self, id: &StageId) -> bool {
        self.stages.iter().any(|stage| &stage.id == id)
    }
}

/// Validated pipeline/stage catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCatalog")]
pub struct Catalog {
    default_pipeline: PipelineId,
    pipelines: Vec<PipelineEntry>,
    /// Default stage of the default pipeline.
    #[serde(skip_serializing)]
    default_stage: StageId,
}

#[derive(Deserialize)]
struct RawCatalog {
    default_pipeline: PipelineId,
    pipelines: Vec<PipelineEntry>,
}

impl TryFrom<RawCatalog> for Catalog {
    type Error = CatalogError;

    fn try_from(raw: RawCatalog) -> Result<Self, Self::Error> {
        let mut pipelines = raw.pipelines;
        let mut seen_pipeline_keys = HashSet::new();

        for pipeline in &mut pipelines {
            pipeline.synonyms = normalize_synonyms(&pipeline.name, &pipeline.synonyms);
            for key in &pipeline.synonyms {
                if !seen_pipeline_keys.insert(key.clone()) {
                    return Err(CatalogError::Invalid(format!(
                        "pipeline synonym '{key}' is used more than once"
                    )));
                }
            }

            let mut seen_stage_keys = HashSet::new();
            for stage in &mut pipeline.stages {
                stage.synonyms = normalize_synonyms(&stage.name, &stage.synonyms);
                for key in &stage.synonyms {
                    if !seen_stage_keys.insert(key.clone()) {
                        return Err(CatalogError::Invalid(format!(
                            "stage synonym '{key}' is used more than once in pipeline {}",
                            pipeline.id
                        )));
                    }
                }
            }

            if !pipeline.has_stage(&pipeline.default_stage) {
                return Err(CatalogError::Invalid(format!(
                    "default stage {} is not a stage of pipeline {}",
                    pipeline.default_stage, pipeline.id
                )));
            }
        }

        let default_stage = pipelines
            .iter()
            .find(|p| p.id == raw.default_pipeline)
            .map(|p| p.default_stage.clone())
            .ok_or_else(|| {
                CatalogError::Invalid(format!(
                    "default pipeline {} is not listed",
                    raw.default_pipeline
                ))
            })?;

        Ok(Self {
            default_pipeline: raw.default_pipeline,
            pipelines,
            default_stage,
        })
    }
}

/// Lowercase, trim and de-duplicate synonyms, always including the name.
fn normalize_synonyms(name: &str, synonyms: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(synonyms.len() + 1);
    for raw in std::iter::once(name).chain(synonyms.iter().map(String::as_str)) {
        let key = normalize_key(raw);
        if !key.is_empty() && !out.contains(&key) {
            out.push(key);
        }
    }
    out
}

fn normalize_key(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Caller-supplied pipeline/stage designation. Ids win over names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineSpec {
    pub pipeline_id: Option<PipelineId>,
    pub pipeline_name: Option<String>,
    pub stage_id: Option<StageId>,
    pub stage_name: Option<String>,
}

/// How a pipeline or stage id was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementSource {
    /// Supplied as an id by the caller.
    Explicit,
    /// Looked up from a name or synonym.
    Named,
    /// Catalog default, because nothing usable was supplied.
    Default,
}

/// Something the caller should know about a resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlacementWarning {
    /// The pipeline name matched nothing; the default pipeline was used.
    UnknownPipelineName { name: String },
    /// The stage name matched nothing in the pipeline; its default stage was used.
    UnknownStageName { name: String },
    /// An explicit pipeline id is not in the catalog, so stages could not be checked.
    PipelineNotInCatalog { pipeline: PipelineId },
    /// An explicit stage id belongs to another pipeline in the catalog.
    StageOutsidePipeline { stage: StageId, owner: PipelineId },
}

impl std::fmt::Display for PlacementWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownPipelineName { name } => {
                write!(f, "unknown pipeline '{name}', using default pipeline")
            }
            Self::UnknownStageName { name } => {
                write!(f, "unknown stage '{name}', using the pipeline's default stage")
            }
            Self::PipelineNotInCatalog { pipeline } => {
                write!(f, "pipeline {pipeline} is not in the catalog")
            }
            Self::StageOutsidePipeline { stage, owner } => {
                write!(f, "stage {stage} belongs to pipeline {owner}")
            }
        }
    }
}

/// Result of [`Catalog::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPlacement {
    pub pipeline_id: PipelineId,
    pub pipeline_source: PlacementSource,
    pub stage_id: StageId,
    pub stage_source: PlacementSource,
    pub warnings: Vec<PlacementWarning>,
}

impl ResolvedPlacement {
    /// The pipeline an explicit stage id actually belongs to, when that is
    /// not the resolved pipeline.
    #[must_use]
    pub fn stage_outside_pipeline(&self) -> Option<&PipelineId> {
        self.warnings.iter().find_map(|w| match w {
            PlacementWarning::StageOutsidePipeline { owner, .. } => Some(owner),
            _ => None,
        })
    }

    /// Whether any default was substituted for a supplied name.
    #[must_use]
    pub fn used_fallback(&self) -> bool {
        self.warnings.iter().any(|w| {
            matches!(
                w,
                PlacementWarning::UnknownPipelineName { .. }
                    | PlacementWarning::UnknownStageName { .. }
            )
        })
    }
}

/// A difference between the catalog and the pipelines the CRM reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatalogDrift {
    MissingPipeline { pipeline: PipelineId },
    MissingStage { pipeline: PipelineId, stage: StageId },
}

impl Catalog {
    /// The catalog compiled into the binary.
    ///
    /// # Errors
    ///
    /// Returns an error only if the embedded document is broken.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_yaml(BUILTIN_CATALOG)
    }

    /// Parse and validate a YAML catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed, the default pipeline is not
    /// listed, a default stage is not part of its pipeline, or a synonym is
    /// used twice.
    pub fn from_yaml(yaml: &str) -> Result<Self, CatalogError> {
        let raw: RawCatalog = serde_yaml::from_str(yaml)?;
        Self::try_from(raw)
    }

    /// Read a YAML catalog from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or fails validation.
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|e| CatalogError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_yaml(&content)
    }

    #[must_use]
    pub const fn default_pipeline(&self) -> &PipelineId {
        &self.default_pipeline
    }

    #[must_use]
    pub fn pipelines(&self) -> &[PipelineEntry] {
        &self.pipelines
    }

    /// Look up a pipeline by id.
    #[must_use]
    pub fn pipeline(&self, id: &PipelineId) -> Option<&PipelineEntry> {
        self.pipelines.iter().find(|p| &p.id == id)
    }

    /// Look up a pipeline by name or synonym, case-insensitively.
    #[must_use]
    pub fn pipeline_named(&self, name: &str) -> Option<&PipelineEntry> {
        let key = normalize_key(name);
        self.pipelines
            .iter()
            .find(|p| p.synonyms.iter().any(|s| *s == key))
    }

    fn stage_owner(&self, stage: &StageId) -> Option<&PipelineId> {
        self.pipelines
            .iter()
            .find(|p| p.has_stage(stage))
            .map(|p| &p.id)
    }

    /// Map a pipeline/stage designation to ids. Pure and infallible.
    #[must_use]
    pub fn resolve(&self, spec: &PipelineSpec) -> ResolvedPlacement {
        let mut warnings = Vec::new();
        let pipeline_name = spec.pipeline_name.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let stage_name = spec.stage_name.as_deref().map(str::trim).filter(|s| !s.is_empty());

        let (pipeline_id, pipeline_source) = if let Some(id) = &spec.pipeline_id {
            if self.pipeline(id).is_none() {
                warnings.push(PlacementWarning::PipelineNotInCatalog {
                    pipeline: id.clone(),
                });
            }
            (id.clone(), PlacementSource::Explicit)
        } else if let Some(name) = pipeline_name {
            match self.pipeline_named(name) {
                Some(entry) => (entry.id.clone(), PlacementSource::Named),
                None => {
                    warnings.push(PlacementWarning::UnknownPipelineName {
                        name: name.to_string(),
                    });
                    (self.default_pipeline.clone(), PlacementSource::Default)
                }
            }
        } else {
            (self.default_pipeline.clone(), PlacementSource::Default)
        };

        let (stage_id, stage_source) = if let Some(id) = &spec.stage_id {
            if let Some(owner) = self.stage_owner(id) {
                if *owner != pipeline_id {
                    warnings.push(PlacementWarning::StageOutsidePipeline {
                        stage: id.clone(),
                        owner: owner.clone(),
                    });
                }
            }
            (id.clone(), PlacementSource::Explicit)
        } else {
            // Stages of an uncatalogued pipeline cannot be checked, so fall
            // back to searching every pipeline.
            let entry = self.pipeline(&pipeline_id);
            let named = stage_name.and_then(|name| {
                let key = normalize_key(name);
                match entry {
                    Some(entry) => entry.stage_named(&key),
                    None => self.pipelines.iter().find_map(|p| p.stage_named(&key)),
                }
            });

            if let Some(stage) = named {
                (stage.id.clone(), PlacementSource::Named)
            } else {
                if let Some(name) = stage_name {
                    warnings.push(PlacementWarning::UnknownStageName {
                        name: name.to_string(),
                    });
                }
                let stage = entry.map_or_else(
                    || self.default_stage.clone(),
                    |p| p.default_stage.clone(),
                );
                (stage, PlacementSource::Default)
            }
        };

        ResolvedPlacement {
            pipeline_id,
            pipeline_source,
            stage_id,
            stage_source,
            warnings,
        }
    }

    /// Compare the catalog with the pipelines the CRM reports.
    #[must_use]
    pub fn verify_against(&self, remote: &[Pipeline]) -> Vec<CatalogDrift> {
        let mut drift = Vec::new();
        for entry in &self.pipelines {
            let Some(live) = remote.iter().find(|p| p.id == entry.id) else {
                drift.push(CatalogDrift::MissingPipeline {
                    pipeline: entry.id.clone(),
                });
                continue;
            };
            for stage in &entry.stages {
                if !live.stages.iter().any(|s| s.id == stage.id) {
                    drift.push(CatalogDrift::MissingStage {
                        pipeline: entry.id.clone(),
                        stage: stage.id.clone(),
                    });
                }
            }
        }
        drift
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SALES: &str = "SjYJh6QYcw6bdK6poVnL";
    const NEW_LEAD: &str = "6c3a7dde-3fa6-46c8-bafa-d0e085aa62bd";
    const PROPOSAL: &str = "d548cca5-2cdc-4d64-99f1-fb4a3ade1174";

    const TWO_PIPELINES: &str = r"
default_pipeline: p_sales
pipelines:
  - id: p_sales
    name: Sales
    synonyms: [vendas]
    default_stage: s_new
    stages:
      - id: s_new
        name: New
      - id: s_won
        name: Won
        synonyms: [ganho]
  - id: p_support
    name: Support
    synonyms: [suporte]
    default_stage: s_ticket
    stages:
      - id: s_ticket
        name: Ticket
      - id: s_done
        name: Won
";

    fn named(pipeline: Option<&str>, stage: Option<&str>) -> PipelineSpec {
        PipelineSpec {
            pipeline_name: pipeline.map(String::from),
            stage_name: stage.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.default_pipeline().as_str(), SALES);
        assert_eq!(catalog.pipelines()[0].stages.len(), 5);
    }

    #[test]
    fn test_synonyms_map_to_same_pipeline() {
        let catalog = Catalog::builtin().unwrap();
        for name in ["vendas", "leads", "principal", "Vendas", "  SALES ", "padrão"] {
            let placement = catalog.resolve(&named(Some(name), None));
            assert_eq!(placement.pipeline_id.as_str(), SALES, "synonym {name}");
            assert_eq!(placement.pipeline_source, PlacementSource::Named);
        }
    }

    #[test]
    fn test_stage_names_resolve() {
        let catalog = Catalog::builtin().unwrap();
        let placement = catalog.resolve(&named(Some("vendas"), Some("new lead")));
        assert_eq!(placement.stage_id.as_str(), NEW_LEAD);
        assert_eq!(placement.stage_source, PlacementSource::Named);

        let placement = catalog.resolve(&named(None, Some("Proposta Enviada")));
        assert_eq!(placement.stage_id.as_str(), PROPOSAL);
    }

    #[test]
    fn test_unknown_names_fall_back_to_defaults() {
        let catalog = Catalog::builtin().unwrap();
        let placement = catalog.resolve(&named(Some("marketing"), Some("limbo")));

        assert_eq!(placement.pipeline_id.as_str(), SALES);
        assert_eq!(placement.pipeline_source, PlacementSource::Default);
        assert_eq!(placement.stage_id.as_str(), NEW_LEAD);
        assert_eq!(placement.stage_source, PlacementSource::Default);
        assert!(placement.used_fallback());
        assert_eq!(placement.warnings.len(), 2);
    }

    #[test]
    fn test_nothing_supplied_uses_defaults_silently() {
        let catalog = Catalog::builtin().unwrap();
        let placement = catalog.resolve(&PipelineSpec::default());
        assert_eq!(placement.pipeline_id.as_str(), SALES);
        assert_eq!(placement.stage_id.as_str(), NEW_LEAD);
        assert!(placement.warnings.is_empty());
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let catalog = Catalog::builtin().unwrap();
        let spec = named(Some("leads"), Some("quente"));
        assert_eq!(catalog.resolve(&spec), catalog.resolve(&spec));
    }

    #[test]
    fn test_explicit_ids_win_over_names() {
        let catalog = Catalog::builtin().unwrap();
        let spec = PipelineSpec {
            pipeline_id: Some(PipelineId::new_unchecked(SALES)),
            pipeline_name: Some("something else".into()),
            stage_id: Some(StageId::new_unchecked(PROPOSAL)),
            stage_name: Some("new lead".into()),
        };
        let placement = catalog.resolve(&spec);
        assert_eq!(placement.stage_id.as_str(), PROPOSAL);
        assert_eq!(placement.pipeline_source, PlacementSource::Explicit);
        assert_eq!(placement.stage_source, PlacementSource::Explicit);
        assert!(placement.warnings.is_empty());
    }

    #[test]
    fn test_stage_names_are_scoped_to_resolved_pipeline() {
        let catalog = Catalog::from_yaml(TWO_PIPELINES).unwrap();

        let placement = catalog.resolve(&named(Some("suporte"), Some("won")));
        assert_eq!(placement.stage_id.as_str(), "s_done");

        let placement = catalog.resolve(&named(Some("vendas"), Some("won")));
        assert_eq!(placement.stage_id.as_str(), "s_won");

        // "ganho" exists only in Sales, so Support falls back to its own default.
        let placement = catalog.resolve(&named(Some("suporte"), Some("ganho")));
        assert_eq!(placement.stage_id.as_str(), "s_ticket");
        assert_eq!(placement.stage_source, PlacementSource::Default);
    }

    #[test]
    fn test_explicit_stage_from_other_pipeline_is_flagged() {
        let catalog = Catalog::from_yaml(TWO_PIPELINES).unwrap();
        let spec = PipelineSpec {
            pipeline_name: Some("vendas".into()),
            stage_id: Some(StageId::new_unchecked("s_ticket")),
            ..Default::default()
        };
        let placement = catalog.resolve(&spec);
        assert_eq!(placement.stage_id.as_str(), "s_ticket");
        assert_eq!(
            placement.stage_outside_pipeline().map(PipelineId::as_str),
            Some("p_support")
        );
    }

    #[test]
    fn test_uncatalogued_pipeline_is_flagged() {
        let catalog = Catalog::from_yaml(TWO_PIPELINES).unwrap();
        let spec = PipelineSpec {
            pipeline_id: Some(PipelineId::new_unchecked("p_other")),
            stage_name: Some("ganho".into()),
            ..Default::default()
        };
        let placement = catalog.resolve(&spec);
        assert_eq!(placement.stage_id.as_str(), "s_won");
        assert!(matches!(
            placement.warnings.as_slice(),
            [PlacementWarning::PipelineNotInCatalog { .. }]
        ));
    }

    #[test]
    fn test_rejects_missing_default_pipeline() {
        let yaml = TWO_PIPELINES.replace("default_pipeline: p_sales", "default_pipeline: nope");
        assert!(matches!(
            Catalog::from_yaml(&yaml),
            Err(CatalogError::Invalid(_))
        ));
    }

    #[test]
    fn test_rejects_default_stage_outside_pipeline() {
        let yaml = TWO_PIPELINES.replace("default_stage: s_ticket", "default_stage: s_new");
        assert!(matches!(
            Catalog::from_yaml(&yaml),
            Err(CatalogError::Invalid(_))
        ));
    }

    #[test]
    fn test_rejects_duplicate_pipeline_synonym() {
        let yaml = TWO_PIPELINES.replace("synonyms: [suporte]", "synonyms: [vendas]");
        let err = Catalog::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("vendas"));
    }

    #[test]
    fn test_verify_against_reports_drift() {
        let catalog = Catalog::from_yaml(TWO_PIPELINES).unwrap();
        let remote: Vec<Pipeline> = serde_json::from_value(serde_json::json!([
            {"id": "p_sales", "name": "Sales", "stages": [
                {"id": "s_new", "name": "New", "position": 0}
            ]}
        ]))
        .unwrap();

        let drift = catalog.verify_against(&remote);
        assert_eq!(
            drift,
            vec![
                CatalogDrift::MissingStage {
                    pipeline: PipelineId::new_unchecked("p_sales"),
                    stage: StageId::new_unchecked("s_won"),
                },
                CatalogDrift::MissingPipeline {
                    pipeline: PipelineId::new_unchecked("p_support"),
                },
            ]
        );
    }
}
