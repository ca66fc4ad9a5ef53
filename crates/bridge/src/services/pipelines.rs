//! Pipeline listing over the primary and alternate routes.

use serde::Serialize;
use tracing::{instrument, warn};

use super::OperationError;
use crate::gateway::{Api, CrmGateway, Pipeline};

/// Which route answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineRoute {
    Primary,
    Alternate,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineListing {
    pub pipelines: Vec<Pipeline>,
    pub route: PipelineRoute,
}

/// List the location's pipelines, trying `/pipelines/` when
/// `/opportunities/pipelines` fails.
///
/// # Errors
///
/// Returns `PipelinesUnavailable` with both errors when both routes fail.
#[instrument(skip(gateway))]
pub async fn fetch_pipelines<G: CrmGateway>(gateway: &G) -> Result<PipelineListing, OperationError> {
    let api = Api::new(gateway);
    let primary = match api.list_pipelines().await {
        Ok(pipelines) => {
            return Ok(PipelineListing {
                pipelines,
                route: PipelineRoute::Primary,
            });
        }
        Err(e) => e,
    };

    warn!(
        error = %primary,
        status = ?primary.status(),
        "Primary pipeline route failed, trying alternate"
    );
    match api.list_pipelines_alternate().await {
        Ok(pipelines) => Ok(PipelineListing {
            pipelines,
            route: PipelineRoute::Alternate,
        }),
        Err(alternate) => Err(OperationError::PipelinesUnavailable { primary, alternate }),
    }
}
