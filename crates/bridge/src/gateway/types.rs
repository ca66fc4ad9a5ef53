//! Wire types for the LeadConnector API.
//!
//! Field names follow the upstream JSON (`firstName`, `contactId`,
//! `pipelineStageId`, ...). Response types are lenient: anything the CRM may
//! omit is optional or defaulted.

use crm_bridge_core::{
    AppointmentId, CalendarId, ContactId, ConversationId, LocationId, MessageChannel, MessageId,
    MonetaryValue, OpportunityId, OpportunityStatus, PipelineId, StageId,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Contacts
// =============================================================================

/// A contact as returned by the CRM.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: ContactId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub custom_fields: Option<Value>,
    #[serde(default)]
    pub date_added: Option<String>,
}

impl Contact {
    /// Name shown to users: the CRM's full name, or first and last joined.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = self
            .contact_name
            .as_deref()
            .or(self.name.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if let Some(full) = full {
            return full.to_string();
        }
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Body of `POST /contacts/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContact {
    pub location_id: LocationId,
    pub first_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_fields: Option<Value>,
}

impl NewContact {
    /// Contact with only a first name.
    #[must_use]
    pub fn named(location_id: LocationId, first_name: impl Into<String>) -> Self {
        Self {
            location_id,
            first_name: first_name.into(),
            last_name: None,
            email: None,
            phone: None,
            tags: Vec::new(),
            custom_fields: None,
        }
    }
}

/// Body of `PUT /contacts/{id}`. Only set fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_fields: Option<Value>,
}

// =============================================================================
// Conversations and messages
// =============================================================================

/// A conversation thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    #[serde(default)]
    pub contact_id: Option<ContactId>,
    #[serde(default)]
    pub last_message_body: Option<String>,
    /// Epoch milliseconds or an ISO string, depending on the endpoint.
    #[serde(default)]
    pub last_message_date: Option<Value>,
    #[serde(default)]
    pub unread_count: u32,
}

/// Where an outbound message goes: straight to a contact, or into an
/// existing conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageTarget {
    Contact(ContactId),
    Conversation(ConversationId),
}

/// Body of `POST /conversations/messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    #[serde(rename = "type")]
    pub channel: MessageChannel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<ContactId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<LocationId>,
}

impl OutboundMessage {
    /// SMS addressed to a contact, scoped to a location.
    #[must_use]
    pub fn sms_to_contact(contact_id: ContactId, location_id: LocationId, body: &str) -> Self {
        Self {
            channel: MessageChannel::Sms,
            message: body.to_string(),
            contact_id: Some(contact_id),
            conversation_id: None,
            location_id: Some(location_id),
        }
    }

    /// SMS posted into an existing conversation.
    #[must_use]
    pub fn sms_in_conversation(conversation_id: ConversationId, body: &str) -> Self {
        Self {
            channel: MessageChannel::Sms,
            message: body.to_string(),
            contact_id: None,
            conversation_id: Some(conversation_id),
            location_id: None,
        }
    }

    #[must_use]
    pub fn target(&self) -> Option<MessageTarget> {
        self.conversation_id
            .clone()
            .map(MessageTarget::Conversation)
            .or_else(|| self.contact_id.clone().map(MessageTarget::Contact))
    }
}

/// Response of `POST /conversations/messages`.
///
/// The message id arrives as `messageId` or `id` depending on the route the
/// CRM took, sometimes both; `messageId` wins.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentMessage {
    pub message_id: Option<MessageId>,
    pub conversation_id: Option<ConversationId>,
    pub date_added: Option<String>,
}

impl SentMessage {
    /// Pick the known fields out of a raw response.
    #[must_use]
    pub fn from_response(value: &Value) -> Self {
        let text = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
        };
        Self {
            message_id: text("messageId")
                .or_else(|| text("id"))
                .map(MessageId::new_unchecked),
            conversation_id: text("conversationId").map(ConversationId::new_unchecked),
            date_added: text("dateAdded").map(String::from),
        }
    }
}

// =============================================================================
// Opportunities and pipelines
// =============================================================================

/// An opportunity as returned by the CRM.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub id: OpportunityId,
    #[serde(default)]
    pub name: Option<String>,
    /// Older API versions call the name `title`.
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub contact_id: Option<ContactId>,
    #[serde(default)]
    pub pipeline_id: Option<PipelineId>,
    #[serde(default)]
    pub pipeline_stage_id: Option<StageId>,
    #[serde(default)]
    pub monetary_value: Option<MonetaryValue>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub date_added: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Opportunity {
    /// The opportunity's name under either field.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().or(self.title.as_deref())
    }

    /// Creation timestamp under either field.
    #[must_use]
    pub fn created(&self) -> Option<&str> {
        self.created_at.as_deref().or(self.date_added.as_deref())
    }
}

/// Body of `POST /opportunities/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOpportunity {
    pub location_id: LocationId,
    pub name: String,
    pub contact_id: ContactId,
    pub pipeline_id: PipelineId,
    pub pipeline_stage_id: StageId,
    pub status: OpportunityStatus,
    pub monetary_value: MonetaryValue,
}

/// A pipeline with its ordered stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: PipelineId,
    pub name: String,
    #[serde(default)]
    pub stages: Vec<Stage>,
}

/// One step of a pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    pub id: StageId,
    pub name: String,
    #[serde(default)]
    pub position: Option<i64>,
}

// =============================================================================
// Calendar
// =============================================================================

/// A calendar event or appointment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: AppointmentId,
    #[serde(default)]
    pub calendar_id: Option<CalendarId>,
    #[serde(default)]
    pub contact_id: Option<ContactId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub appointment_status: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Body of `POST /calendars/events/appointments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAppointment {
    pub location_id: LocationId,
    pub calendar_id: CalendarId,
    pub contact_id: ContactId,
    pub start_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Filters for `GET /calendars/events`. Times are epoch milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentQuery {
    pub calendar_id: Option<CalendarId>,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_contact_display_name_prefers_full_name() {
        let contact: Contact = serde_json::from_value(json!({
            "id": "c1",
            "contactName": "maria silva",
            "firstName": "Maria",
            "lastName": "Silva"
        }))
        .unwrap();
        assert_eq!(contact.display_name(), "maria silva");
    }

    #[test]
    fn test_contact_display_name_joins_parts() {
        let contact: Contact = serde_json::from_value(json!({
            "id": "c1",
            "firstName": "João",
            "lastName": null
        }))
        .unwrap();
        assert_eq!(contact.display_name(), "João");
    }

    #[test]
    fn test_new_contact_wire_names() {
        let mut contact = NewContact::named(LocationId::new_unchecked("loc_1"), "Maria");
        contact.phone = Some("+5511999998888".into());
        let value = serde_json::to_value(&contact).unwrap();
        assert_eq!(
            value,
            json!({"locationId": "loc_1", "firstName": "Maria", "phone": "+5511999998888"})
        );
    }

    #[test]
    fn test_new_opportunity_wire_names() {
        let opportunity = NewOpportunity {
            location_id: LocationId::new_unchecked("loc_1"),
            name: "Deal".into(),
            contact_id: ContactId::new_unchecked("c1"),
            pipeline_id: PipelineId::new_unchecked("p1"),
            pipeline_stage_id: StageId::new_unchecked("s1"),
            status: OpportunityStatus::Open,
            monetary_value: "1500".parse().unwrap(),
        };
        assert_eq!(
            serde_json::to_value(&opportunity).unwrap(),
            json!({
                "locationId": "loc_1",
                "name": "Deal",
                "contactId": "c1",
                "pipelineId": "p1",
                "pipelineStageId": "s1",
                "status": "open",
                "monetaryValue": 1500
            })
        );
    }

    #[test]
    fn test_outbound_message_shapes() {
        let direct = OutboundMessage::sms_to_contact(
            ContactId::new_unchecked("c1"),
            LocationId::new_unchecked("loc_1"),
            "Olá",
        );
        assert_eq!(
            serde_json::to_value(&direct).unwrap(),
            json!({"type": "SMS", "message": "Olá", "contactId": "c1", "locationId": "loc_1"})
        );

        let threaded =
            OutboundMessage::sms_in_conversation(ConversationId::new_unchecked("conv1"), "Olá");
        assert_eq!(
            serde_json::to_value(&threaded).unwrap(),
            json!({"type": "SMS", "message": "Olá", "conversationId": "conv1"})
        );
        assert_eq!(
            threaded.target(),
            Some(MessageTarget::Conversation(ConversationId::new_unchecked("conv1")))
        );
    }

    #[test]
    fn test_sent_message_accepts_either_id_field() {
        let a = SentMessage::from_response(&json!({"messageId": "m1", "id": "x"}));
        let b = SentMessage::from_response(&json!({"id": "m2", "dateAdded": "2024-05-01"}));
        assert_eq!(a.message_id.unwrap().as_str(), "m1");
        assert_eq!(b.message_id.unwrap().as_str(), "m2");
        assert_eq!(b.date_added.as_deref(), Some("2024-05-01"));
        assert!(SentMessage::from_response(&json!({})).message_id.is_none());
    }

    #[test]
    fn test_opportunity_accepts_title_alias() {
        let opportunity: Opportunity = serde_json::from_value(json!({
            "id": "o1",
            "title": "Old style",
            "monetaryValue": 250.5
        }))
        .unwrap();
        assert_eq!(opportunity.display_name(), Some("Old style"));
        assert_eq!(opportunity.monetary_value.unwrap().to_string(), "250.5");
    }
}
