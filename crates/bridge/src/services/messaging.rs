//! SMS delivery with a conversation fallback.
//!
//! The CRM accepts a message addressed straight to a contact only when it
//! can find (or open) a conversation on its own, which it does not do
//! consistently. When the direct send fails, a conversation is created
//! explicitly and the message is posted into it.

use crm_bridge_core::{ContactId, ConversationId, MessageId};
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::OperationError;
use crate::gateway::{Api, CrmError, CrmGateway, OutboundMessage, SentMessage};

/// Which route delivered the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryRoute {
    /// Sent to the contact directly.
    Direct,
    /// Sent into a conversation opened for the purpose.
    NewConversation,
}

/// A delivered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryResult {
    pub contact_id: ContactId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<MessageId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<String>,
    pub route: DeliveryRoute,
}

impl DeliveryResult {
    fn new(contact_id: ContactId, sent: SentMessage, route: DeliveryRoute) -> Self {
        Self {
            contact_id,
            conversation_id: sent.conversation_id,
            message_id: sent.message_id,
            sent_at: sent.date_added,
            route,
        }
    }
}

/// Sends messages to contacts.
pub struct Messenger<'a, G> {
    api: Api<'a, G>,
    gateway: &'a G,
}

impl<'a, G: CrmGateway> Messenger<'a, G> {
    #[must_use]
    pub const fn new(gateway: &'a G) -> Self {
        Self {
            api: Api::new(gateway),
            gateway,
        }
    }

    /// Send an SMS to a contact.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for an empty message, and `Delivery` carrying
    /// both underlying errors when the direct send and the fallback fail.
    #[instrument(skip(self, message), fields(contact_id = %contact_id, length = message.len()))]
    pub async fn send_sms(
        &self,
        contact_id: &ContactId,
        message: &str,
    ) -> Result<DeliveryResult, OperationError> {
        if message.trim().is_empty() {
            return Err(OperationError::missing("message"));
        }

        let direct = OutboundMessage::sms_to_contact(
            contact_id.clone(),
            self.gateway.location_id().clone(),
            message,
        );
        let primary = match self.api.send_message(&direct).await {
            Ok(sent) => {
                info!(message_id = ?sent.message_id, "SMS sent");
                return Ok(DeliveryResult::new(
                    contact_id.clone(),
                    sent,
                    DeliveryRoute::Direct,
                ));
            }
            Err(e) => e,
        };

        warn!(
            error = %primary,
            status = ?primary.status(),
            "Direct send failed, opening a conversation"
        );
        match self.send_via_new_conversation(contact_id, message).await {
            Ok(result) => {
                info!(
                    conversation_id = ?result.conversation_id,
                    message_id = ?result.message_id,
                    "SMS sent through new conversation"
                );
                Ok(result)
            }
            Err(fallback) => Err(OperationError::Delivery { primary, fallback }),
        }
    }

    async fn send_via_new_conversation(
        &self,
        contact_id: &ContactId,
        message: &str,
    ) -> Result<DeliveryResult, CrmError> {
        let conversation = self.api.create_conversation(contact_id).await?;
        let outbound = OutboundMessage::sms_in_conversation(conversation.id.clone(), message);
        let mut sent = self.api.send_message(&outbound).await?;
        sent.conversation_id.get_or_insert(conversation.id);
        Ok(DeliveryResult::new(
            contact_id.clone(),
            sent,
            DeliveryRoute::NewConversation,
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::gateway::Method;
    use crate::testing::ScriptedGateway;

    fn contact() -> ContactId {
        ContactId::new_unchecked("abc123")
    }

    #[tokio::test]
    async fn test_direct_send_is_one_call() {
        let gateway = ScriptedGateway::new("loc_1");
        gateway.respond(
            Method::POST,
            "/conversations/messages",
            Ok(json!({"messageId": "m_1", "conversationId": "conv_1", "dateAdded": "2024-05-01T10:00:00Z"})),
        );

        let result = Messenger::new(&gateway).send_sms(&contact(), "Hello").await.unwrap();

        assert_eq!(result.route, DeliveryRoute::Direct);
        assert_eq!(result.message_id.unwrap().as_str(), "m_1");
        assert_eq!(result.sent_at.as_deref(), Some("2024-05-01T10:00:00Z"));
        let call = gateway.only_call();
        assert_eq!(
            call.payload.json(),
            Some(&json!({
                "type": "SMS",
                "message": "Hello",
                "contactId": "abc123",
                "locationId": "loc_1",
            }))
        );
    }

    #[tokio::test]
    async fn test_fallback_opens_conversation_then_sends() {
        let gateway = ScriptedGateway::new("loc_1");
        gateway
            .reject(Method::POST, "/conversations/messages", 400, "no conversation")
            .respond(
                Method::POST,
                "/conversations/",
                Ok(json!({"conversation": {"id": "conv_9"}})),
            )
            .respond(
                Method::POST,
                "/conversations/messages",
                Ok(json!({"id": "m_9"})),
            );

        let result = Messenger::new(&gateway).send_sms(&contact(), "Oi").await.unwrap();

        assert_eq!(result.route, DeliveryRoute::NewConversation);
        assert_eq!(result.conversation_id.unwrap().as_str(), "conv_9");
        assert_eq!(result.message_id.unwrap().as_str(), "m_9");
        assert_eq!(gateway.calls_to(&Method::POST, "/conversations/").len(), 1);

        let sends = gateway.calls_to(&Method::POST, "/conversations/messages");
        assert_eq!(sends.len(), 2);
        assert_eq!(
            sends[1].payload.json(),
            Some(&json!({"type": "SMS", "message": "Oi", "conversationId": "conv_9"}))
        );
    }

    #[tokio::test]
    async fn test_both_routes_failing_reports_both_errors() {
        let gateway = ScriptedGateway::new("loc_1");
        gateway
            .reject(Method::POST, "/conversations/messages", 400, "contact has no phone")
            .reject(Method::POST, "/conversations/", 403, "scope not allowed");

        let err = Messenger::new(&gateway)
            .send_sms(&contact(), "Hello")
            .await
            .unwrap_err();

        let text = err.to_string();
        assert!(text.contains("contact has no phone"), "{text}");
        assert!(text.contains("scope not allowed"), "{text}");
        assert!(matches!(err, OperationError::Delivery { .. }));
        assert_eq!(gateway.call_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected_without_calls() {
        let gateway = ScriptedGateway::new("loc_1");

        let err = Messenger::new(&gateway).send_sms(&contact(), "  ").await.unwrap_err();

        assert!(err.is_input_error());
        assert_eq!(gateway.call_count(), 0);
    }
}
