//! Tool-invocation surface.
//!
//! Every CRM operation is exposed as a named tool with a JSON-Schema input.
//! Arguments arrive as a flat bag of strings and numbers, so the executor
//! accepts numeric strings wherever a number is expected and a few
//! Portuguese aliases (`nome`, `telefone`, `valor`, ...) alongside the
//! English names.
//!
//! [`ToolExecutor::execute`] returns pretty JSON or a typed error;
//! [`ToolExecutor::invoke`] never fails and renders errors as pt-BR text
//! for the chat and HTTP front-ends.

mod args;
mod executor;
mod render;

use std::str::FromStr;

use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::services::OperationError;

pub use executor::{ToolExecutor, ToolOutput};

/// Prefix shared by every tool name.
pub const TOOL_PREFIX: &str = "ghl_";

/// Errors raised by [`ToolExecutor::execute`].
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid argument {field}: {reason}")]
    InvalidArgument { field: &'static str, reason: String },

    /// The operation behind the tool failed.
    #[error("{tool} failed: {source}")]
    Operation {
        tool: ToolName,
        #[source]
        source: OperationError,
    },

    #[error("failed to serialize result: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The tools this crate exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    GetContacts,
    GetContact,
    CreateContact,
    UpdateContact,
    SendSms,
    GetConversations,
    CreateOpportunity,
    GetOpportunities,
    GetPipelines,
    GetAppointments,
    CreateAppointment,
}

impl ToolName {
    pub const ALL: [Self; 11] = [
        Self::GetContacts,
        Self::GetContact,
        Self::CreateContact,
        Self::UpdateContact,
        Self::SendSms,
        Self::GetConversations,
        Self::CreateOpportunity,
        Self::GetOpportunities,
        Self::GetPipelines,
        Self::GetAppointments,
        Self::CreateAppointment,
    ];

    /// Full tool name, e.g. `ghl_send_sms`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::GetContacts => "ghl_get_contacts",
            Self::GetContact => "ghl_get_contact",
            Self::CreateContact => "ghl_create_contact",
            Self::UpdateContact => "ghl_update_contact",
            Self::SendSms => "ghl_send_sms",
            Self::GetConversations => "ghl_get_conversations",
            Self::CreateOpportunity => "ghl_create_opportunity",
            Self::GetOpportunities => "ghl_get_opportunities",
            Self::GetPipelines => "ghl_get_pipelines",
            Self::GetAppointments => "ghl_get_appointments",
            Self::CreateAppointment => "ghl_create_appointment",
        }
    }

    /// Name without the `ghl_` prefix, as the HTTP surface lists it.
    #[must_use]
    pub fn method(&self) -> &'static str {
        self.as_str().trim_start_matches(TOOL_PREFIX)
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts the name with or without the `ghl_` prefix.
impl FromStr for ToolName {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bare = s.trim().trim_start_matches(TOOL_PREFIX);
        Self::ALL
            .into_iter()
            .find(|tool| tool.method() == bare)
            .ok_or_else(|| ToolError::UnknownTool(s.to_string()))
    }
}

/// A tool as advertised to callers.
#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

impl Tool {
    fn new(name: ToolName, description: &str, input_schema: serde_json::Value) -> Self {
        Self {
            name: name.as_str().to_string(),
            description: description.to_string(),
            input_schema,
        }
    }
}

/// All CRM tools with their input schemas.
#[must_use]
pub fn crm_tools() -> Vec<Tool> {
    vec![
        Tool::new(
            ToolName::GetContacts,
            "List contacts from the CRM location. Returns id, name, email, phone and tags.",
            json!({
                "type": "object",
                "properties": {
                    "limit": {
                        "type": "integer",
                        "description": "Number of contacts to fetch (1-100, default 10)",
                        "minimum": 1,
                        "maximum": 100
                    },
                    "query": {
                        "type": "string",
                        "description": "Optional free-text filter (name, email or phone)"
                    }
                }
            }),
        ),
        Tool::new(
            ToolName::GetContact,
            "Fetch one contact by id. Reports found: false when the id does not exist.",
            json!({
                "type": "object",
                "properties": {
                    "contactId": {"type": "string", "description": "Contact id"}
                },
                "required": ["contactId"]
            }),
        ),
        Tool::new(
            ToolName::CreateContact,
            "Create a contact. Phone numbers are normalised to E.164.",
            json!({
                "type": "object",
                "properties": {
                    "firstName": {"type": "string", "description": "First name (alias: nome)"},
                    "lastName": {"type": "string", "description": "Last name (alias: sobrenome)"},
                    "email": {"type": "string", "description": "Email address"},
                    "phone": {"type": "string", "description": "Phone number (alias: telefone)"},
                    "tags": {"type": "string", "description": "Comma-separated tags"}
                },
                "required": ["firstName"]
            }),
        ),
        Tool::new(
            ToolName::UpdateContact,
            "Update a contact. Only the fields supplied are changed.",
            json!({
                "type": "object",
                "properties": {
                    "contactId": {"type": "string", "description": "Contact id"},
                    "firstName": {"type": "string", "description": "First name (alias: nome)"},
                    "lastName": {"type": "string", "description": "Last name (alias: sobrenome)"},
                    "email": {"type": "string", "description": "Email address"},
                    "phone": {"type": "string", "description": "Phone number (alias: telefone)"},
                    "tags": {"type": "string", "description": "Comma-separated tags; replaces the current tags"}
                },
                "required": ["contactId"]
            }),
        ),
        Tool::new(
            ToolName::SendSms,
            "Send an SMS to a contact. Falls back to opening a conversation when the direct send fails.",
            json!({
                "type": "object",
                "properties": {
                    "contactId": {"type": "string", "description": "Contact id"},
                    "message": {"type": "string", "description": "Message body (alias: mensagem)"}
                },
                "required": ["contactId", "message"]
            }),
        ),
        Tool::new(
            ToolName::GetConversations,
            "List recent conversations with their last message and unread count.",
            json!({
                "type": "object",
                "properties": {
                    "limit": {
                        "type": "integer",
                        "description": "Number of conversations to fetch (1-100, default 10)",
                        "minimum": 1,
                        "maximum": 100
                    }
                }
            }),
        ),
        Tool::new(
            ToolName::CreateOpportunity,
            "Create an opportunity. `mode` selects how much must be supplied: ids_required \
             (title, contact_id, pipeline_id, stage_id), names_resolved (title and contact \
             name; pipeline and stage by name) or natural_language (contact name only; the \
             title is generated).",
            json!({
                "type": "object",
                "properties": {
                    "mode": {
                        "type": "string",
                        "enum": ["ids_required", "names_resolved", "natural_language"],
                        "description": "Input strictness (default names_resolved)"
                    },
                    "title": {"type": "string", "description": "Opportunity title (alias: titulo)"},
                    "contact_id": {"type": "string", "description": "Existing contact id"},
                    "contact_name": {"type": "string", "description": "Contact name (alias: nome)"},
                    "contact_email": {"type": "string", "description": "Contact email (alias: email)"},
                    "contact_phone": {"type": "string", "description": "Contact phone (alias: telefone)"},
                    "pipeline_id": {"type": "string", "description": "Pipeline id"},
                    "pipeline_name": {"type": "string", "description": "Pipeline name, e.g. vendas"},
                    "stage_id": {"type": "string", "description": "Stage id"},
                    "stage_name": {"type": "string", "description": "Stage name, e.g. novo lead"},
                    "value": {"type": "number", "description": "Monetary value (alias: valor)"},
                    "status": {"type": "string", "description": "open, won, lost or abandoned"},
                    "force_new": {"type": "boolean", "description": "Always create a new contact"}
                }
            }),
        ),
        Tool::new(
            ToolName::GetOpportunities,
            "List opportunities with value, status and stage, plus the total value.",
            json!({
                "type": "object",
                "properties": {
                    "limit": {
                        "type": "integer",
                        "description": "Number of opportunities to fetch (1-100, default 10)",
                        "minimum": 1,
                        "maximum": 100
                    }
                }
            }),
        ),
        Tool::new(
            ToolName::GetPipelines,
            "List pipelines and their stages with ids.",
            json!({"type": "object", "properties": {}}),
        ),
        Tool::new(
            ToolName::GetAppointments,
            "List calendar events, optionally for one calendar and time window.",
            json!({
                "type": "object",
                "properties": {
                    "calendar_id": {"type": "string", "description": "Calendar id"},
                    "start_time": {"type": "integer", "description": "Window start, epoch milliseconds"},
                    "end_time": {"type": "integer", "description": "Window end, epoch milliseconds"}
                }
            }),
        ),
        Tool::new(
            ToolName::CreateAppointment,
            "Book an appointment for a contact on a calendar.",
            json!({
                "type": "object",
                "properties": {
                    "calendar_id": {"type": "string", "description": "Calendar id"},
                    "contact_id": {"type": "string", "description": "Contact id"},
                    "start_time": {"type": "string", "description": "ISO 8601 start"},
                    "end_time": {"type": "string", "description": "ISO 8601 end"},
                    "title": {"type": "string", "description": "Appointment title"}
                },
                "required": ["calendar_id", "contact_id", "start_time"]
            }),
        ),
    ]
}
