//! One-shot CRM operations.
//!
//! Each command builds the same argument bag the tool surface accepts and
//! prints the tool's JSON result, so the CLI and HTTP callers see identical
//! behaviour.

use crm_bridge::tools::ToolName;
use serde_json::{Map, Value, json};

use super::{CliError, Context, emit};
use crate::OpportunityArgs;

/// Fields for `contacts create`.
pub struct ContactArgs {
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub tags: Option<String>,
}

/// Fields for `contacts update`. Unset fields are left unchanged.
pub struct ContactChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub tags: Option<String>,
}

async fn execute(ctx: &Context, tool: ToolName, args: &Value) -> Result<(), CliError> {
    let output = ctx.tools().execute(tool.as_str(), args).await?;
    emit(&output)
}

/// Insert the fields that are set.
fn with_optional(mut args: Map<String, Value>, fields: Vec<(&str, Option<String>)>) -> Value {
    for (key, value) in fields {
        if let Some(value) = value {
            args.insert(key.to_string(), Value::String(value));
        }
    }
    Value::Object(args)
}

pub async fn list_contacts(ctx: &Context, limit: u32, query: Option<String>) -> Result<(), CliError> {
    let mut args = Map::new();
    args.insert("limit".to_string(), json!(limit));
    execute(ctx, ToolName::GetContacts, &with_optional(args, vec![("query", query)])).await
}

pub async fn create_contact(ctx: &Context, contact: ContactArgs) -> Result<(), CliError> {
    let args = with_optional(
        Map::new(),
        vec![
            ("firstName", Some(contact.first_name)),
            ("lastName", contact.last_name),
            ("email", contact.email),
            ("phone", contact.phone),
            ("tags", contact.tags),
        ],
    );
    execute(ctx, ToolName::CreateContact, &args).await
}

pub async fn get_contact(ctx: &Context, contact_id: &str) -> Result<(), CliError> {
    execute(ctx, ToolName::GetContact, &json!({"contactId": contact_id})).await
}

pub async fn update_contact(
    ctx: &Context,
    contact_id: &str,
    changes: ContactChanges,
) -> Result<(), CliError> {
    let args = with_optional(
        Map::new(),
        vec![
            ("contactId", Some(contact_id.to_string())),
            ("firstName", changes.first_name),
            ("lastName", changes.last_name),
            ("email", changes.email),
            ("phone", changes.phone),
            ("tags", changes.tags),
        ],
    );
    execute(ctx, ToolName::UpdateContact, &args).await
}

pub async fn send_sms(ctx: &Context, contact_id: &str, message: &str) -> Result<(), CliError> {
    let args = json!({"contactId": contact_id, "message": message});
    execute(ctx, ToolName::SendSms, &args).await
}

pub async fn create_opportunity(ctx: &Context, opportunity: OpportunityArgs) -> Result<(), CliError> {
    let mut args = Map::new();
    args.insert("force_new".to_string(), Value::Bool(opportunity.force_new));
    let args = with_optional(
        args,
        vec![
            ("mode", Some(opportunity.mode)),
            ("title", opportunity.title),
            ("contact_id", opportunity.contact_id),
            ("contact_name", opportunity.contact_name),
            ("contact_email", opportunity.email),
            ("contact_phone", opportunity.phone),
            ("pipeline_id", opportunity.pipeline_id),
            ("pipeline_name", opportunity.pipeline),
            ("stage_id", opportunity.stage_id),
            ("stage_name", opportunity.stage),
            ("value", opportunity.value),
            ("status", opportunity.status),
        ],
    );
    execute(ctx, ToolName::CreateOpportunity, &args).await
}

pub async fn list_pipelines(ctx: &Context) -> Result<(), CliError> {
    execute(ctx, ToolName::GetPipelines, &json!({})).await
}
