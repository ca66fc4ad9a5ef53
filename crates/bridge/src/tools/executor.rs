//! Dispatch from tool name to operation.

use crm_bridge_core::{CalendarId, ContactId, Email, OpportunityStatus, PhoneNumber, PipelineId, StageId};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{instrument, warn};

use super::{ToolError, ToolName, args, render};
use crate::catalog::{Catalog, PipelineSpec};
use crate::gateway::{Api, AppointmentQuery, ContactUpdate, CrmGateway, NewAppointment, NewContact};
use crate::services::{
    ContactSpec, Messenger, OperationError, OpportunityOrchestrator, OpportunityRequest,
    ResolutionMode, ResolverSettings, fetch_pipelines,
};

/// Default page size for list tools.
const DEFAULT_LIMIT: u32 = 10;

/// Largest page a list tool will request.
const MAX_TOOL_LIMIT: u32 = 100;

/// Text result of [`ToolExecutor::invoke`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolOutput {
    pub is_error: bool,
    pub text: String,
}

/// Runs tools against a gateway.
pub struct ToolExecutor<'a, G> {
    gateway: &'a G,
    catalog: &'a Catalog,
    settings: ResolverSettings,
}

impl<'a, G: CrmGateway> ToolExecutor<'a, G> {
    #[must_use]
    pub const fn new(gateway: &'a G, catalog: &'a Catalog, settings: ResolverSettings) -> Self {
        Self {
            gateway,
            catalog,
            settings,
        }
    }

    /// Execute a tool and return its result as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool is unknown, an argument is malformed, or
    /// the operation fails.
    #[instrument(skip(self, input), fields(tool_name = %name))]
    pub async fn execute(&self, name: &str, input: &Value) -> Result<String, ToolError> {
        let tool: ToolName = name.parse()?;
        let result = match tool {
            ToolName::GetContacts => self.get_contacts(input).await?,
            ToolName::GetContact => self.get_contact(input).await?,
            ToolName::CreateContact => self.create_contact(input).await?,
            ToolName::UpdateContact => self.update_contact(input).await?,
            ToolName::SendSms => self.send_sms(input).await?,
            ToolName::GetConversations => self.get_conversations(input).await?,
            ToolName::CreateOpportunity => self.create_opportunity(input).await?,
            ToolName::GetOpportunities => self.get_opportunities(input).await?,
            ToolName::GetPipelines => self.get_pipelines().await?,
            ToolName::GetAppointments => self.get_appointments(input).await?,
            ToolName::CreateAppointment => self.create_appointment(input).await?,
        };
        Ok(serde_json::to_string_pretty(&result)?)
    }

    /// Execute a tool, rendering any failure as text.
    pub async fn invoke(&self, name: &str, input: &Value) -> ToolOutput {
        match self.execute(name, input).await {
            Ok(text) => ToolOutput {
                is_error: false,
                text,
            },
            Err(e) => {
                warn!(tool_name = %name, error = %e, "Tool call failed");
                ToolOutput {
                    is_error: true,
                    text: render::error(&e),
                }
            }
        }
    }

    fn api(&self) -> Api<'a, G> {
        Api::new(self.gateway)
    }

    async fn get_contacts(&self, input: &Value) -> Result<Value, ToolError> {
        let limit = args::limit(input, DEFAULT_LIMIT, MAX_TOOL_LIMIT)?;
        let query = args::text(input, &["query", "busca"]);
        let contacts = self
            .api()
            .list_contacts(limit, query.as_deref())
            .await
            .map_err(failed(ToolName::GetContacts))?;
        Ok(render::contacts(&contacts))
    }

    async fn get_contact(&self, input: &Value) -> Result<Value, ToolError> {
        let contact_id = required_contact_id(input, ToolName::GetContact)?;
        let contact = self
            .api()
            .get_contact(&contact_id)
            .await
            .map_err(failed(ToolName::GetContact))?;
        Ok(contact.map_or_else(
            || json!({"found": false, "id": contact_id}),
            |c| render::contact(&c),
        ))
    }

    async fn create_contact(&self, input: &Value) -> Result<Value, ToolError> {
        let Some(first_name) = args::text(input, &["firstName", "first_name", "nome", "name"])
        else {
            return Err(ToolError::Operation {
                tool: ToolName::CreateContact,
                source: OperationError::missing("firstName"),
            });
        };

        let mut contact = NewContact::named(self.gateway.location_id().clone(), first_name);
        contact.last_name = args::text(input, &["lastName", "last_name", "sobrenome"]);
        contact.email = args::parsed_with(input, &["email"], "email", Email::parse)?
            .map(Email::into_inner);
        contact.phone = args::parsed_with(input, &["phone", "telefone"], "phone", PhoneNumber::parse)?
            .map(|p| p.to_e164());
        contact.tags = args::tags(input, "tags");

        let created = self
            .api()
            .create_contact(&contact)
            .await
            .map_err(failed(ToolName::CreateContact))?;
        Ok(render::created_contact(&created))
    }

    async fn update_contact(&self, input: &Value) -> Result<Value, ToolError> {
        let contact_id = required_contact_id(input, ToolName::UpdateContact)?;
        let tags = args::tags(input, "tags");
        let update = ContactUpdate {
            first_name: args::text(input, &["firstName", "first_name", "nome"]),
            last_name: args::text(input, &["lastName", "last_name", "sobrenome"]),
            email: args::parsed_with(input, &["email"], "email", Email::parse)?
                .map(Email::into_inner),
            phone: args::parsed_with(input, &["phone", "telefone"], "phone", PhoneNumber::parse)?
                .map(|p| p.to_e164()),
            tags: (!tags.is_empty()).then_some(tags),
            custom_fields: None,
        };
        if update == ContactUpdate::default() {
            return Err(ToolError::Operation {
                tool: ToolName::UpdateContact,
                source: OperationError::InvalidArgument {
                    field: "contact",
                    reason: "nothing to update".to_string(),
                },
            });
        }

        let updated = self
            .api()
            .update_contact(&contact_id, &update)
            .await
            .map_err(failed(ToolName::UpdateContact))?;
        Ok(render::updated_contact(&updated))
    }

    async fn send_sms(&self, input: &Value) -> Result<Value, ToolError> {
        let contact_id: Option<ContactId> =
            args::parsed(input, &["contactId", "contact_id"], "contactId")?;
        let message = args::text(input, &["message", "mensagem"]);

        let (Some(contact_id), Some(message)) = (contact_id, message) else {
            let mut missing = Vec::new();
            if args::text(input, &["contactId", "contact_id"]).is_none() {
                missing.push("contactId");
            }
            if args::text(input, &["message", "mensagem"]).is_none() {
                missing.push("message");
            }
            return Err(ToolError::Operation {
                tool: ToolName::SendSms,
                source: OperationError::Validation { missing },
            });
        };

        let delivery = Messenger::new(self.gateway)
            .send_sms(&contact_id, &message)
            .await
            .map_err(failed(ToolName::SendSms))?;

        Ok(json!({
            "success": true,
            "contact_id": delivery.contact_id,
            "conversation_id": delivery.conversation_id,
            "message": message,
            "message_id": delivery.message_id,
            "sent_at": delivery.sent_at,
            "route": delivery.route,
        }))
    }

    async fn get_conversations(&self, input: &Value) -> Result<Value, ToolError> {
        let limit = args::limit(input, DEFAULT_LIMIT, MAX_TOOL_LIMIT)?;
        let conversations = self
            .api()
            .list_conversations(limit)
            .await
            .map_err(failed(ToolName::GetConversations))?;
        Ok(render::conversations(&conversations))
    }

    async fn create_opportunity(&self, input: &Value) -> Result<Value, ToolError> {
        let request = opportunity_request(input)?;
        let created = OpportunityOrchestrator::new(self.gateway, self.catalog, self.settings)
            .create(request)
            .await
            .map_err(failed(ToolName::CreateOpportunity))?;

        let mut summary = serde_json::to_value(&created)?;
        if let Some(fields) = summary.as_object_mut() {
            fields.insert("success".to_string(), Value::Bool(true));
            fields.insert("value_display".to_string(), json!(created.value.display_brl()));
        }
        Ok(summary)
    }

    async fn get_opportunities(&self, input: &Value) -> Result<Value, ToolError> {
        let limit = args::limit(input, DEFAULT_LIMIT, MAX_TOOL_LIMIT)?;
        let opportunities = self
            .api()
            .list_opportunities(limit)
            .await
            .map_err(failed(ToolName::GetOpportunities))?;
        Ok(render::opportunities(&opportunities))
    }

    async fn get_pipelines(&self) -> Result<Value, ToolError> {
        let listing = fetch_pipelines(self.gateway)
            .await
            .map_err(failed(ToolName::GetPipelines))?;
        Ok(render::pipelines(&listing))
    }

    async fn get_appointments(&self, input: &Value) -> Result<Value, ToolError> {
        let query = AppointmentQuery {
            calendar_id: args::parsed::<CalendarId>(input, &["calendar_id", "calendarId"], "calendar_id")?,
            start_time: args::integer(input, &["start_time", "startTime"], "start_time")?,
            end_time: args::integer(input, &["end_time", "endTime"], "end_time")?,
        };
        let appointments = self
            .api()
            .list_appointments(&query)
            .await
            .map_err(failed(ToolName::GetAppointments))?;
        Ok(render::appointments(&appointments))
    }

    async fn create_appointment(&self, input: &Value) -> Result<Value, ToolError> {
        let calendar_id: Option<CalendarId> =
            args::parsed(input, &["calendar_id", "calendarId"], "calendar_id")?;
        let contact_id: Option<ContactId> =
            args::parsed(input, &["contact_id", "contactId"], "contact_id")?;
        let start_time = args::text(input, &["start_time", "startTime"]);

        let (Some(calendar_id), Some(contact_id), Some(start_time)) =
            (calendar_id, contact_id, start_time)
        else {
            let missing = [
                ("calendar_id", &["calendar_id", "calendarId"]),
                ("contact_id", &["contact_id", "contactId"]),
                ("start_time", &["start_time", "startTime"]),
            ]
            .into_iter()
            .filter(|(_, keys)| args::text(input, *keys).is_none())
            .map(|(field, _)| field)
            .collect();
            return Err(ToolError::Operation {
                tool: ToolName::CreateAppointment,
                source: OperationError::Validation { missing },
            });
        };

        let appointment = NewAppointment {
            location_id: self.gateway.location_id().clone(),
            calendar_id,
            contact_id,
            start_time,
            end_time: args::text(input, &["end_time", "endTime"]),
            title: args::text(input, &["title", "titulo"]),
        };
        let created = self
            .api()
            .create_appointment(&appointment)
            .await
            .map_err(failed(ToolName::CreateAppointment))?;
        Ok(json!({"success": true, "appointment": render::appointment(&created)}))
    }
}

/// Wrap an operation failure with the tool it came from.
fn failed<E: Into<OperationError>>(tool: ToolName) -> impl Fn(E) -> ToolError {
    move |e| ToolError::Operation {
        tool,
        source: e.into(),
    }
}

/// `contactId` (or `contact_id`), which the tool cannot run without.
fn required_contact_id(input: &Value, tool: ToolName) -> Result<ContactId, ToolError> {
    args::parsed(input, &["contactId", "contact_id"], "contactId")?.ok_or_else(|| {
        ToolError::Operation {
            tool,
            source: OperationError::missing("contactId"),
        }
    })
}

/// Build an orchestrator request from a flat argument bag.
fn opportunity_request(input: &Value) -> Result<OpportunityRequest, ToolError> {
    let mode = args::text(input, &["mode", "modo"])
        .map(|raw| {
            raw.parse::<ResolutionMode>()
                .map_err(|reason| ToolError::InvalidArgument {
                    field: "mode",
                    reason,
                })
        })
        .transpose()?
        .unwrap_or_default();
    let status = args::text(input, &["status"])
        .map(|raw| {
            raw.parse::<OpportunityStatus>()
                .map_err(|reason| ToolError::InvalidArgument {
                    field: "status",
                    reason,
                })
        })
        .transpose()?
        .unwrap_or_default();

    let contact = ContactSpec {
        id: args::parsed(input, &["contact_id", "contactId"], "contact_id")?,
        name: args::text(input, &["contact_name", "contactName", "nome", "name"]),
        email: args::parsed_with(input, &["contact_email", "email"], "contact_email", Email::parse)?,
        phone: args::parsed_with(
            input,
            &["contact_phone", "phone", "telefone"],
            "contact_phone",
            PhoneNumber::parse,
        )?,
        force_new: args::flag(input, &["force_new", "forceNew"]),
    };

    let pipeline = PipelineSpec {
        pipeline_id: args::parsed::<PipelineId>(input, &["pipeline_id", "pipelineId"], "pipeline_id")?,
        pipeline_name: args::text(input, &["pipeline_name", "pipeline"]),
        stage_id: args::parsed::<StageId>(input, &["stage_id", "stageId"], "stage_id")?,
        stage_name: args::text(input, &["stage_name", "stage", "estagio"]),
    };

    Ok(OpportunityRequest {
        mode,
        title: args::text(input, &["title", "titulo"]),
        contact,
        pipeline,
        value: args::money(input, &["value", "valor", "monetaryValue"], "value")?,
        status,
    })
}
