//! Result summaries and pt-BR error text.
//!
//! Summaries keep only the fields a person (or a model) needs, the same way
//! list responses are trimmed before they are shown.

use serde_json::{Value, json};

use super::{ToolError, ToolName};
use crate::gateway::{Appointment, Contact, Conversation, CrmError, Opportunity, total_value};
use crate::services::{OperationError, PipelineListing};

pub fn contacts(contacts: &[Contact]) -> Value {
    let summaries: Vec<Value> = contacts
        .iter()
        .map(|c| {
            json!({
                "id": c.id,
                "name": c.display_name(),
                "email": c.email,
                "phone": c.phone,
                "tags": c.tags,
            })
        })
        .collect();

    json!({
        "total_contacts": summaries.len(),
        "contacts": summaries,
    })
}

pub fn created_contact(contact: &Contact) -> Value {
    json!({
        "success": true,
        "contact_id": contact.id,
        "name": contact.display_name(),
        "email": contact.email,
        "phone": contact.phone,
        "created_at": contact.date_added,
    })
}

pub fn contact(contact: &Contact) -> Value {
    json!({
        "found": true,
        "id": contact.id,
        "name": contact.display_name(),
        "first_name": contact.first_name,
        "last_name": contact.last_name,
        "email": contact.email,
        "phone": contact.phone,
        "tags": contact.tags,
        "created_at": contact.date_added,
    })
}

pub fn updated_contact(contact: &Contact) -> Value {
    json!({
        "success": true,
        "contact_id": contact.id,
        "name": contact.display_name(),
        "email": contact.email,
        "phone": contact.phone,
        "tags": contact.tags,
    })
}

pub fn conversations(conversations: &[Conversation]) -> Value {
    let summaries: Vec<Value> = conversations
        .iter()
        .map(|c| {
            json!({
                "id": c.id,
                "contact_id": c.contact_id,
                "last_message": c.last_message_body,
                "last_message_date": c.last_message_date,
                "unread_count": c.unread_count,
            })
        })
        .collect();

    json!({
        "total_conversations": summaries.len(),
        "conversations": summaries,
    })
}

pub fn opportunities(opportunities: &[Opportunity]) -> Value {
    let summaries: Vec<Value> = opportunities
        .iter()
        .map(|o| {
            json!({
                "id": o.id,
                "title": o.display_name(),
                "contact_id": o.contact_id,
                "value": o.monetary_value,
                "status": o.status,
                "pipeline_id": o.pipeline_id,
                "stage": o.pipeline_stage_id,
                "created_at": o.created(),
            })
        })
        .collect();

    json!({
        "total_opportunities": summaries.len(),
        "total_value": total_value(opportunities).display_brl(),
        "opportunities": summaries,
    })
}

pub fn pipelines(listing: &PipelineListing) -> Value {
    let summaries: Vec<Value> = listing
        .pipelines
        .iter()
        .map(|p| {
            let stages: Vec<Value> = p
                .stages
                .iter()
                .map(|s| json!({"id": s.id, "name": s.name, "position": s.position}))
                .collect();
            json!({"id": p.id, "name": p.name, "stages": stages})
        })
        .collect();

    json!({
        "total_pipelines": summaries.len(),
        "route": listing.route,
        "pipelines": summaries,
    })
}

pub fn appointment(a: &Appointment) -> Value {
    json!({
        "id": a.id,
        "title": a.title,
        "calendar_id": a.calendar_id,
        "contact_id": a.contact_id,
        "start_time": a.start_time,
        "end_time": a.end_time,
        "status": a.appointment_status.as_ref().or(a.status.as_ref()),
    })
}

pub fn appointments(appointments: &[Appointment]) -> Value {
    let summaries: Vec<Value> = appointments.iter().map(appointment).collect();

    json!({
        "total_appointments": summaries.len(),
        "appointments": summaries,
    })
}

/// What the user was trying to do, for "Erro ao ..." messages.
const fn action(tool: ToolName) -> &'static str {
    match tool {
        ToolName::GetContacts => "buscar contatos",
        ToolName::GetContact => "buscar contato",
        ToolName::CreateContact => "criar contato",
        ToolName::UpdateContact => "atualizar contato",
        ToolName::SendSms => "enviar SMS",
        ToolName::GetConversations => "buscar conversas",
        ToolName::CreateOpportunity => "criar oportunidade",
        ToolName::GetOpportunities => "buscar oportunidades",
        ToolName::GetPipelines => "buscar pipelines",
        ToolName::GetAppointments => "buscar agendamentos",
        ToolName::CreateAppointment => "criar agendamento",
    }
}

/// Upstream failure in words, with the raw body kept verbatim.
fn crm_error(error: &CrmError) -> String {
    match error {
        CrmError::Remote { status, body } => format!("HTTP {status}\n{body}"),
        CrmError::Transport(message) => format!("falha de conexão: {message}"),
        CrmError::Parse(message) | CrmError::Unexpected(message) => {
            format!("resposta inesperada do CRM: {message}")
        }
    }
}

/// pt-BR text for a failed tool call.
pub fn error(error: &ToolError) -> String {
    match error {
        ToolError::UnknownTool(name) => format!("❌ Ferramenta desconhecida: {name}"),
        ToolError::InvalidArgument { field, reason } => {
            format!("❌ Argumento inválido ({field}): {reason}")
        }
        ToolError::Serialize(e) => format!("❌ Erro ao formatar resposta: {e}"),
        ToolError::Operation { tool, source } => operation_error(*tool, source),
    }
}

fn operation_error(tool: ToolName, error: &OperationError) -> String {
    match error {
        OperationError::Validation { missing } => {
            format!("❌ Campos obrigatórios faltando: {}", missing.join(", "))
        }
        OperationError::InvalidArgument { field, reason } => {
            format!("❌ Argumento inválido ({field}): {reason}")
        }
        OperationError::Resolution { reason, source } => {
            let mut text = format!(
                "❌ Não foi possível resolver o contato: {reason}. \
                 Use o ID diretamente ou forneça nome/email."
            );
            if let Some(source) = source {
                text.push_str("\nDetalhe: ");
                text.push_str(&crm_error(source));
            }
            text
        }
        OperationError::Crm(e) => format!("❌ Erro ao {}: {}", action(tool), crm_error(e)),
        OperationError::Delivery { primary, fallback } => format!(
            "❌ Erro ao enviar SMS: {}\nTentativa alternativa: {}",
            crm_error(primary),
            crm_error(fallback)
        ),
        OperationError::PipelinesUnavailable { primary, alternate } => format!(
            "❌ Erro ao buscar pipelines: {}\nRota alternativa: {}",
            crm_error(primary),
            crm_error(alternate)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_body_is_kept_verbatim() {
        let err = ToolError::Operation {
            tool: ToolName::CreateOpportunity,
            source: OperationError::Crm(CrmError::Remote {
                status: 422,
                body: r#"{"message":"pipelineStageId is invalid"}"#.into(),
            }),
        };
        let text = error(&err);
        assert!(text.starts_with("❌ Erro ao criar oportunidade: HTTP 422"));
        assert!(text.contains(r#"{"message":"pipelineStageId is invalid"}"#));
    }

    #[test]
    fn test_delivery_failure_shows_both_attempts() {
        let err = ToolError::Operation {
            tool: ToolName::SendSms,
            source: OperationError::Delivery {
                primary: CrmError::Remote {
                    status: 400,
                    body: "no phone".into(),
                },
                fallback: CrmError::Transport("timeout".into()),
            },
        };
        let text = error(&err);
        assert!(text.contains("no phone"));
        assert!(text.contains("Tentativa alternativa: falha de conexão: timeout"));
    }

    #[test]
    fn test_validation_lists_fields() {
        let err = ToolError::Operation {
            tool: ToolName::CreateOpportunity,
            source: OperationError::Validation {
                missing: vec!["title"],
            },
        };
        assert_eq!(error(&err), "❌ Campos obrigatórios faltando: title");
    }
}
