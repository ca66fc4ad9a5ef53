//! Errors shared by the resolution services.

use thiserror::Error;

use crate::gateway::CrmError;

/// Failure of one resolve-then-act operation.
#[derive(Debug, Error)]
pub enum OperationError {
    /// Required input was missing. Raised before any network call.
    #[error("missing required fields: {}", .missing.join(", "))]
    Validation { missing: Vec<&'static str> },

    /// Input was present but unusable. Raised before any network call.
    #[error("invalid {field}: {reason}")]
    InvalidArgument { field: &'static str, reason: String },

    /// No contact id could be determined.
    #[error("contact could not be resolved: {reason}")]
    Resolution {
        reason: String,
        #[source]
        source: Option<CrmError>,
    },

    /// The CRM rejected the final call, or the call never completed.
    #[error(transparent)]
    Crm(#[from] CrmError),

    /// Both SMS routes failed.
    #[error("direct send failed: {primary}; conversation fallback failed: {fallback}")]
    Delivery { primary: CrmError, fallback: CrmError },

    /// Both pipeline listing routes failed.
    #[error("pipeline listing failed: {primary}; alternate route failed: {alternate}")]
    PipelinesUnavailable { primary: CrmError, alternate: CrmError },
}

impl OperationError {
    /// Validation error for a single field.
    #[must_use]
    pub fn missing(field: &'static str) -> Self {
        Self::Validation {
            missing: vec![field],
        }
    }

    /// Whether the failure happened before anything was sent.
    #[must_use]
    pub const fn is_input_error(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::InvalidArgument { .. })
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_validation_lists_fields() {
        let err = OperationError::Validation {
            missing: vec!["title", "contact_name"],
        };
        assert_eq!(err.to_string(), "missing required fields: title, contact_name");
        assert!(err.is_input_error());
    }

    #[test]
    fn test_delivery_keeps_both_errors() {
        let err = OperationError::Delivery {
            primary: CrmError::Remote {
                status: 400,
                body: "no conversation".into(),
            },
            fallback: CrmError::Transport("timed out".into()),
        };
        let text = err.to_string();
        assert!(text.contains("no conversation"));
        assert!(text.contains("timed out"));
    }

    #[test]
    fn test_resolution_exposes_source() {
        let err = OperationError::Resolution {
            reason: "creation failed".into(),
            source: Some(CrmError::Transport("refused".into())),
        };
        assert!(err.source().is_some());
        assert!(!err.is_input_error());
    }
}
