//! Typed calls on top of [`CrmGateway::request`].
//!
//! Each method owns one endpoint: it shapes the query or body with the
//! upstream vocabulary and unwraps the response envelope
//! (`{"contacts": [...]}`, `{"contact": {...}}`, ...).

use crm_bridge_core::{ContactId, MonetaryValue};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::instrument;

use super::{
    Appointment, AppointmentQuery, Contact, ContactUpdate, Conversation, CrmError, CrmGateway,
    Method, NewAppointment, NewContact, NewOpportunity, Opportunity, OutboundMessage, Payload,
    Pipeline, SentMessage,
};

/// Typed view of a gateway.
#[derive(Debug)]
pub struct Api<'a, G> {
    gateway: &'a G,
}

impl<G> Clone for Api<'_, G> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<G> Copy for Api<'_, G> {}

impl<'a, G: CrmGateway> Api<'a, G> {
    #[must_use]
    pub const fn new(gateway: &'a G) -> Self {
        Self { gateway }
    }

    fn location(&self) -> &str {
        self.gateway.location_id().as_str()
    }

    // -------------------------------------------------------------------------
    // Contacts
    // -------------------------------------------------------------------------

    /// `GET /contacts/` for up to `limit` contacts, optionally filtered.
    ///
    /// # Errors
    ///
    /// Returns the gateway error, or `Parse` if the list is malformed.
    #[instrument(skip(self))]
    pub async fn list_contacts(
        &self,
        limit: u32,
        query: Option<&str>,
    ) -> Result<Vec<Contact>, CrmError> {
        let mut params = vec![
            ("locationId".to_string(), self.location().to_string()),
            ("limit".to_string(), limit.to_string()),
        ];
        if let Some(query) = query.filter(|q| !q.trim().is_empty()) {
            params.push(("query".to_string(), query.to_string()));
        }
        let body = self
            .gateway
            .request(Method::GET, "/contacts/", Payload::Query(params))
            .await?;
        list_field(&body, "contacts")
    }

    /// `GET /contacts/{id}`. A 404 is reported as `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns any gateway error other than 404.
    #[instrument(skip(self), fields(contact_id = %id))]
    pub async fn get_contact(&self, id: &ContactId) -> Result<Option<Contact>, CrmError> {
        let endpoint = format!("/contacts/{id}");
        match self.gateway.request(Method::GET, &endpoint, Payload::Empty).await {
            Ok(body) => object_field(&body, "contact").map(Some),
            Err(CrmError::Remote { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// `POST /contacts/`.
    ///
    /// # Errors
    ///
    /// Returns the gateway error, or `Unexpected` if no contact comes back.
    #[instrument(skip(self, contact), fields(first_name = %contact.first_name))]
    pub async fn create_contact(&self, contact: &NewContact) -> Result<Contact, CrmError> {
        let body = self
            .gateway
            .request(Method::POST, "/contacts/", Payload::Json(to_json(contact)?))
            .await?;
        object_field(&body, "contact")
    }

    /// `PUT /contacts/{id}` with only the fields that are set.
    ///
    /// # Errors
    ///
    /// Returns the gateway error, or `Unexpected` if no contact comes back.
    #[instrument(skip(self, update), fields(contact_id = %id))]
    pub async fn update_contact(
        &self,
        id: &ContactId,
        update: &ContactUpdate,
    ) -> Result<Contact, CrmError> {
        let endpoint = format!("/contacts/{id}");
        let body = self
            .gateway
            .request(Method::PUT, &endpoint, Payload::Json(to_json(update)?))
            .await?;
        object_field(&body, "contact")
    }

    // -------------------------------------------------------------------------
    // Conversations
    // -------------------------------------------------------------------------

    /// `GET /conversations/search`.
    ///
    /// # Errors
    ///
    /// Returns the gateway error, or `Parse` if the list is malformed.
    #[instrument(skip(self))]
    pub async fn list_conversations(&self, limit: u32) -> Result<Vec<Conversation>, CrmError> {
        let payload = Payload::query([
            ("locationId", self.location().to_string()),
            ("limit", limit.to_string()),
        ]);
        let body = self
            .gateway
            .request(Method::GET, "/conversations/search", payload)
            .await?;
        list_field(&body, "conversations")
    }

    /// `POST /conversations/` for a contact.
    ///
    /// # Errors
    ///
    /// Returns the gateway error, or `Unexpected` if the response carries no
    /// conversation id.
    #[instrument(skip(self), fields(contact_id = %contact_id))]
    pub async fn create_conversation(
        &self,
        contact_id: &ContactId,
    ) -> Result<Conversation, CrmError> {
        let payload = Payload::Json(json!({
            "locationId": self.location(),
            "contactId": contact_id,
        }));
        let body = self
            .gateway
            .request(Method::POST, "/conversations/", payload)
            .await?;
        // Some API versions answer with the bare conversation.
        match body.get("conversation") {
            Some(conversation) => parse(conversation.clone(), "conversation"),
            None if body.get("id").is_some() => parse(body, "conversation"),
            None => Err(CrmError::Unexpected(
                "response has no conversation id".to_string(),
            )),
        }
    }

    /// `POST /conversations/messages`.
    ///
    /// # Errors
    ///
    /// Returns the gateway error.
    #[instrument(skip(self, message), fields(target = ?message.target()))]
    pub async fn send_message(&self, message: &OutboundMessage) -> Result<SentMessage, CrmError> {
        let body = self
            .gateway
            .request(
                Method::POST,
                "/conversations/messages",
                Payload::Json(to_json(message)?),
            )
            .await?;
        Ok(SentMessage::from_response(&body))
    }

    // -------------------------------------------------------------------------
    // Opportunities and pipelines
    // -------------------------------------------------------------------------

    /// `GET /opportunities/search`.
    ///
    /// # Errors
    ///
    /// Returns the gateway error, or `Parse` if the list is malformed.
    #[instrument(skip(self))]
    pub async fn list_opportunities(&self, limit: u32) -> Result<Vec<Opportunity>, CrmError> {
        let payload = Payload::query([
            ("location_id", self.location().to_string()),
            ("limit", limit.to_string()),
        ]);
        let body = self
            .gateway
            .request(Method::GET, "/opportunities/search", payload)
            .await?;
        list_field(&body, "opportunities")
    }

    /// `POST /opportunities/`.
    ///
    /// # Errors
    ///
    /// Returns the gateway error, or `Unexpected` if no opportunity comes back.
    #[instrument(skip(self, opportunity), fields(
        contact_id = %opportunity.contact_id,
        pipeline_id = %opportunity.pipeline_id,
        stage_id = %opportunity.pipeline_stage_id,
    ))]
    pub async fn create_opportunity(
        &self,
        opportunity: &NewOpportunity,
    ) -> Result<Opportunity, CrmError> {
        let body = self
            .gateway
            .request(
                Method::POST,
                "/opportunities/",
                Payload::Json(to_json(opportunity)?),
            )
            .await?;
        match body.get("opportunity") {
            Some(created) => parse(created.clone(), "opportunity"),
            None if body.get("id").is_some() => parse(body, "opportunity"),
            None => Err(CrmError::Unexpected(
                "response has no opportunity".to_string(),
            )),
        }
    }

    /// `GET /opportunities/pipelines`.
    ///
    /// # Errors
    ///
    /// Returns the gateway error, or `Parse` if the list is malformed.
    #[instrument(skip(self))]
    pub async fn list_pipelines(&self) -> Result<Vec<Pipeline>, CrmError> {
        self.pipelines_at("/opportunities/pipelines").await
    }

    /// `GET /pipelines/`, the older route for the same listing.
    ///
    /// # Errors
    ///
    /// Returns the gateway error, or `Parse` if the list is malformed.
    #[instrument(skip(self))]
    pub async fn list_pipelines_alternate(&self) -> Result<Vec<Pipeline>, CrmError> {
        self.pipelines_at("/pipelines/").await
    }

    async fn pipelines_at(&self, endpoint: &str) -> Result<Vec<Pipeline>, CrmError> {
        let payload = Payload::query([("locationId", self.location())]);
        let body = self.gateway.request(Method::GET, endpoint, payload).await?;
        list_field(&body, "pipelines")
    }

    // -------------------------------------------------------------------------
    // Calendar
    // -------------------------------------------------------------------------

    /// `GET /calendars/events`.
    ///
    /// # Errors
    ///
    /// Returns the gateway error, or `Parse` if the list is malformed.
    #[instrument(skip(self))]
    pub async fn list_appointments(
        &self,
        query: &AppointmentQuery,
    ) -> Result<Vec<Appointment>, CrmError> {
        let mut params = vec![("locationId".to_string(), self.location().to_string())];
        if let Some(calendar) = &query.calendar_id {
            params.push(("calendarId".to_string(), calendar.to_string()));
        }
        if let Some(start) = query.start_time {
            params.push(("startTime".to_string(), start.to_string()));
        }
        if let Some(end) = query.end_time {
            params.push(("endTime".to_string(), end.to_string()));
        }
        let body = self
            .gateway
            .request(Method::GET, "/calendars/events", Payload::Query(params))
            .await?;
        list_field(&body, "events")
    }

    /// `POST /calendars/events/appointments`.
    ///
    /// # Errors
    ///
    /// Returns the gateway error, or `Parse` if the response is malformed.
    #[instrument(skip(self, appointment), fields(contact_id = %appointment.contact_id))]
    pub async fn create_appointment(
        &self,
        appointment: &NewAppointment,
    ) -> Result<Appointment, CrmError> {
        let body = self
            .gateway
            .request(
                Method::POST,
                "/calendars/events/appointments",
                Payload::Json(to_json(appointment)?),
            )
            .await?;
        parse(body, "appointment")
    }
}

/// Sum of monetary values, for list summaries.
#[must_use]
pub fn total_value(opportunities: &[Opportunity]) -> MonetaryValue {
    let total = opportunities
        .iter()
        .filter_map(|o| o.monetary_value)
        .map(|v| v.amount())
        .sum();
    MonetaryValue::new(total).unwrap_or_default()
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, CrmError> {
    serde_json::to_value(value)
        .map_err(|e| CrmError::Parse(format!("Failed to encode request: {e}")))
}

fn parse<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, CrmError> {
    serde_json::from_value(value).map_err(|e| CrmError::Parse(format!("Invalid {what}: {e}")))
}

/// `body[key]` as an object; missing is `Unexpected`.
fn object_field<T: DeserializeOwned>(body: &Value, key: &str) -> Result<T, CrmError> {
    let value = body
        .get(key)
        .cloned()
        .ok_or_else(|| CrmError::Unexpected(format!("response has no '{key}'")))?;
    parse(value, key)
}

/// `body[key]` as a list; missing or null is an empty list.
fn list_field<T: DeserializeOwned>(body: &Value, key: &str) -> Result<Vec<T>, CrmError> {
    match body.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(list) => parse(list.clone(), key),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crm_bridge_core::{CalendarId, LocationId};
    use serde_json::json;

    use super::*;
    use crate::testing::ScriptedGateway;

    #[tokio::test]
    async fn test_list_contacts_query_and_envelope() {
        let gateway = ScriptedGateway::new("loc_1");
        gateway.respond(
            Method::GET,
            "/contacts/",
            Ok(json!({"contacts": [{"id": "c1", "firstName": "Ana"}]})),
        );

        let contacts = Api::new(&gateway).list_contacts(50, Some("Ana")).await.unwrap();
        assert_eq!(contacts.len(), 1);

        let call = gateway.only_call();
        assert_eq!(call.payload.query_param("locationId"), Some("loc_1"));
        assert_eq!(call.payload.query_param("limit"), Some("50"));
        assert_eq!(call.payload.query_param("query"), Some("Ana"));
    }

    #[tokio::test]
    async fn test_get_contact_404_is_none() {
        let gateway = ScriptedGateway::new("loc_1");
        gateway.respond(
            Method::GET,
            "/contacts/missing",
            Err(CrmError::Remote {
                status: 404,
                body: "not found".into(),
            }),
        );
        let contact = Api::new(&gateway)
            .get_contact(&ContactId::new_unchecked("missing"))
            .await
            .unwrap();
        assert!(contact.is_none());
    }

    #[tokio::test]
    async fn test_create_contact_missing_envelope_is_unexpected() {
        let gateway = ScriptedGateway::new("loc_1");
        gateway.respond(Method::POST, "/contacts/", Ok(json!({"ok": true})));
        let result = Api::new(&gateway)
            .create_contact(&NewContact::named(LocationId::new_unchecked("loc_1"), "Ana"))
            .await;
        assert!(matches!(result, Err(CrmError::Unexpected(_))));
    }

    #[tokio::test]
    async fn test_create_conversation_accepts_bare_object() {
        let gateway = ScriptedGateway::new("loc_1");
        gateway.respond(Method::POST, "/conversations/", Ok(json!({"id": "conv1"})));
        let conversation = Api::new(&gateway)
            .create_conversation(&ContactId::new_unchecked("c1"))
            .await
            .unwrap();
        assert_eq!(conversation.id.as_str(), "conv1");

        let body = gateway.only_call().payload;
        assert_eq!(body.json(), Some(&json!({"locationId": "loc_1", "contactId": "c1"})));
    }

    #[tokio::test]
    async fn test_opportunities_use_snake_case_location() {
        let gateway = ScriptedGateway::new("loc_1");
        gateway.respond(
            Method::GET,
            "/opportunities/search",
            Ok(json!({"opportunities": [
                {"id": "o1", "name": "A", "monetaryValue": 100},
                {"id": "o2", "name": "B", "monetaryValue": 250.5}
            ]})),
        );
        let list = Api::new(&gateway).list_opportunities(10).await.unwrap();
        assert_eq!(total_value(&list).to_string(), "350.5");
        assert_eq!(gateway.only_call().payload.query_param("location_id"), Some("loc_1"));
    }

    #[tokio::test]
    async fn test_list_appointments_filters() {
        let gateway = ScriptedGateway::new("loc_1");
        gateway.respond(Method::GET, "/calendars/events", Ok(json!({"events": []})));
        let query = AppointmentQuery {
            calendar_id: Some(CalendarId::new_unchecked("cal_1")),
            start_time: Some(1_700_000_000_000),
            end_time: None,
        };
        let events = Api::new(&gateway).list_appointments(&query).await.unwrap();
        assert!(events.is_empty());

        let call = gateway.only_call();
        assert_eq!(call.payload.query_param("calendarId"), Some("cal_1"));
        assert_eq!(call.payload.query_param("startTime"), Some("1700000000000"));
        assert_eq!(call.payload.query_param("endTime"), None);
    }

    #[tokio::test]
    async fn test_missing_list_is_empty() {
        let gateway = ScriptedGateway::new("loc_1");
        gateway.respond(Method::GET, "/opportunities/pipelines", Ok(json!({})));
        assert!(Api::new(&gateway).list_pipelines().await.unwrap().is_empty());
    }
}
