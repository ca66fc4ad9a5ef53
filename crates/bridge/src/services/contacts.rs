//! Contact resolution: find an existing contact or create one.
//!
//! The CRM has no find-or-create endpoint and callers supply typed names,
//! not ids, so resolution is two-tiered:
//!
//! 1. An explicit id is used verbatim, without an existence check.
//! 2. With `force_new` or an email, creation is attempted first. If it
//!    fails, the existing contacts are searched before giving up.
//! 3. Otherwise one page of contacts is searched for a case-insensitive
//!    substring match on the display name (or an exact email match).
//! 4. With no match, a contact is created from what was supplied.
//!
//! When disambiguation is enabled, step 2 rewrites the email local part and
//! the phone's trailing digits with a random suffix so the CRM does not
//! reject the record as a duplicate, and retries once with the original
//! email if the rewritten one is refused.

use crm_bridge_core::{ContactId, Email, PhoneNumber};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::{OperationError, ResolverSettings};
use crate::gateway::{Api, Contact, CrmError, CrmGateway, NewContact};

/// Page size of the existing-contact search.
pub const CONTACT_SEARCH_LIMIT: u32 = 50;

/// What the caller knows about the contact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactSpec {
    pub id: Option<ContactId>,
    pub name: Option<String>,
    pub email: Option<Email>,
    pub phone: Option<PhoneNumber>,
    /// Skip the name search and create a new contact.
    pub force_new: bool,
}

impl ContactSpec {
    /// Spec for a known contact id.
    #[must_use]
    pub fn with_id(id: ContactId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    /// Spec with only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// The trimmed name, if non-empty.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }
}

/// How the contact id was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactSource {
    /// Supplied by the caller.
    Explicit,
    /// Found by name or email.
    Matched,
    /// Created by this call.
    Created,
    /// Created with the original email after the rewritten one was refused.
    CreatedAfterRetry,
    /// Creation failed, then an existing contact matched.
    MatchedAfterCreateFailed,
}

/// Outcome of [`ContactResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedContact {
    pub id: ContactId,
    pub source: ContactSource,
    /// Email as stored by the CRM, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Phone as stored by the CRM, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl ResolvedContact {
    fn explicit(id: ContactId) -> Self {
        Self {
            id,
            source: ContactSource::Explicit,
            email: None,
            phone: None,
        }
    }

    fn from_contact(contact: Contact, source: ContactSource) -> Self {
        Self {
            id: contact.id,
            source,
            email: contact.email,
            phone: contact.phone,
        }
    }
}

fn random_suffix() -> u32 {
    rand::rng().random_range(10_000..100_000)
}

/// Resolves a [`ContactSpec`] to a contact id.
pub struct ContactResolver<'a, G> {
    api: Api<'a, G>,
    gateway: &'a G,
    settings: ResolverSettings,
    suffix: fn() -> u32,
}

impl<'a, G: CrmGateway> ContactResolver<'a, G> {
    #[must_use]
    pub const fn new(gateway: &'a G, settings: ResolverSettings) -> Self {
        Self {
            api: Api::new(gateway),
            gateway,
            settings,
            suffix: random_suffix,
        }
    }

    /// Replace the random suffix generator.
    #[must_use]
    pub const fn with_suffix_source(mut self, suffix: fn() -> u32) -> Self {
        self.suffix = suffix;
        self
    }

    /// Resolve the spec to a contact id.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::Resolution` when no id can be determined:
    /// no id and no name, the search failed, or creation failed and nothing
    /// matched. The underlying CRM error is kept as the source.
    #[instrument(skip(self, spec), fields(
        explicit = spec.id.is_some(),
        force_new = spec.force_new,
        has_email = spec.email.is_some(),
    ))]
    pub async fn resolve(&self, spec: &ContactSpec) -> Result<ResolvedContact, OperationError> {
        if let Some(id) = &spec.id {
            debug!(contact_id = %id, "Using explicit contact id");
            return Ok(ResolvedContact::explicit(id.clone()));
        }

        let Some(name) = spec.name() else {
            return Err(OperationError::Resolution {
                reason: "neither a contact id nor a name was supplied".to_string(),
                source: None,
            });
        };

        let mut create_error = None;
        if spec.force_new || spec.email.is_some() {
            match self.create_direct(name, spec).await {
                Ok(resolved) => return Ok(resolved),
                Err(e) => {
                    warn!(error = %e, "Contact creation failed, searching existing contacts");
                    create_error = Some(e);
                }
            }
        }

        let contacts = match self.api.list_contacts(CONTACT_SEARCH_LIMIT, None).await {
            Ok(contacts) => contacts,
            Err(e) => {
                let reason = match &create_error {
                    Some(created) => format!("creation failed ({created}) and contact search failed"),
                    None => "contact search failed".to_string(),
                };
                return Err(OperationError::Resolution {
                    reason,
                    source: Some(e),
                });
            }
        };

        if let Some(found) = find_match(&contacts, name, spec.email.as_ref()) {
            let source = if create_error.is_some() {
                ContactSource::MatchedAfterCreateFailed
            } else {
                ContactSource::Matched
            };
            info!(contact_id = %found.id, ?source, "Matched existing contact");
            return Ok(ResolvedContact::from_contact(found.clone(), source));
        }

        if let Some(e) = create_error {
            return Err(OperationError::Resolution {
                reason: "creation failed and no existing contact matched".to_string(),
                source: Some(e),
            });
        }

        info!(searched = contacts.len(), "No contact matched, creating one");
        let contact = self
            .api
            .create_contact(&self.new_contact(name, spec, None))
            .await
            .map_err(|e| OperationError::Resolution {
                reason: "contact creation failed".to_string(),
                source: Some(e),
            })?;
        Ok(ResolvedContact::from_contact(contact, ContactSource::Created))
    }

    async fn create_direct(
        &self,
        name: &str,
        spec: &ContactSpec,
    ) -> Result<ResolvedContact, CrmError> {
        if !self.settings.disambiguate_contacts {
            let contact = self
                .api
                .create_contact(&self.new_contact(name, spec, None))
                .await?;
            return Ok(ResolvedContact::from_contact(contact, ContactSource::Created));
        }

        let tagged = self.new_contact(name, spec, Some((self.suffix)()));
        debug!(email = ?tagged.email, phone = ?tagged.phone, "Creating disambiguated contact");

        match self.api.create_contact(&tagged).await {
            Ok(contact) => Ok(ResolvedContact::from_contact(contact, ContactSource::Created)),
            Err(e) if e.is_validation() && spec.email.is_some() => {
                warn!(error = %e, "Rewritten email refused, retrying with original email");
                let retry = NewContact {
                    email: spec.email.as_ref().map(|e| e.as_str().to_string()),
                    ..tagged
                };
                let contact = self.api.create_contact(&retry).await?;
                Ok(ResolvedContact::from_contact(
                    contact,
                    ContactSource::CreatedAfterRetry,
                ))
            }
            Err(e) => Err(e),
        }
    }

    /// Creation body; `suffix` enables the email/phone rewrite.
    fn new_contact(&self, name: &str, spec: &ContactSpec, suffix: Option<u32>) -> NewContact {
        let mut contact = NewContact::named(self.gateway.location_id().clone(), name);
        contact.email = spec.email.as_ref().map(|email| match suffix {
            Some(tag) => email.with_local_suffix(&tag.to_string()).into_inner(),
            None => email.as_str().to_string(),
        });
        contact.phone = spec.phone.as_ref().map(|phone| match suffix {
            Some(tag) => phone.with_trailing_digits(tag).to_synthetic_e164(),
            None => phone.to_e164(),
        });
        contact
    }
}

/// First contact whose display name contains `name` (case-insensitive), or
/// whose email equals `email` (case-insensitive).
fn find_match<'c>(contacts: &'c [Contact], name: &str, email: Option<&Email>) -> Option<&'c Contact> {
    let needle = name.to_lowercase();
    contacts.iter().find(|contact| {
        contact.display_name().to_lowercase().contains(&needle)
            || email.is_some_and(|email| {
                contact.email.as_deref().is_some_and(|stored| email.matches(stored))
            })
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::gateway::Method;
    use crate::testing::ScriptedGateway;

    const ENABLED: ResolverSettings = ResolverSettings {
        disambiguate_contacts: true,
    };

    fn fixed_suffix() -> u32 {
        48_213
    }

    fn contacts_page() -> serde_json::Value {
        json!({"contacts": [
            {"id": "c_ana", "contactName": "Ana Souza", "email": "ana@example.com"},
            {"id": "c_maria", "firstName": "Maria", "lastName": "Silva Santos"},
        ]})
    }

    #[tokio::test]
    async fn test_explicit_id_makes_no_calls() {
        let gateway = ScriptedGateway::new("loc_1");
        let resolver = ContactResolver::new(&gateway, ResolverSettings::default());

        let resolved = resolver
            .resolve(&ContactSpec::with_id(ContactId::new_unchecked("abc123")))
            .await
            .unwrap();

        assert_eq!(resolved.id.as_str(), "abc123");
        assert_eq!(resolved.source, ContactSource::Explicit);
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn test_name_substring_match_skips_creation() {
        let gateway = ScriptedGateway::new("loc_1");
        gateway.respond(Method::GET, "/contacts/", Ok(contacts_page()));
        let resolver = ContactResolver::new(&gateway, ResolverSettings::default());

        let resolved = resolver.resolve(&ContactSpec::named("maria silva")).await.unwrap();

        assert_eq!(resolved.id.as_str(), "c_maria");
        assert_eq!(resolved.source, ContactSource::Matched);
        assert!(gateway.calls_to(&Method::POST, "/contacts/").is_empty());
        assert_eq!(
            gateway.only_call().payload.query_param("limit"),
            Some("50")
        );
    }

    #[tokio::test]
    async fn test_no_match_creates_exactly_once() {
        let gateway = ScriptedGateway::new("loc_1");
        gateway
            .respond(Method::GET, "/contacts/", Ok(contacts_page()))
            .respond(
                Method::POST,
                "/contacts/",
                Ok(json!({"contact": {"id": "c_new", "firstName": "Carlos"}})),
            );
        let resolver = ContactResolver::new(&gateway, ResolverSettings::default());

        let resolved = resolver.resolve(&ContactSpec::named("Carlos")).await.unwrap();

        assert_eq!(resolved.id.as_str(), "c_new");
        assert_eq!(resolved.source, ContactSource::Created);
        let creates = gateway.calls_to(&Method::POST, "/contacts/");
        assert_eq!(creates.len(), 1);
        assert_eq!(
            creates[0].payload.json(),
            Some(&json!({"locationId": "loc_1", "firstName": "Carlos"}))
        );
    }

    #[tokio::test]
    async fn test_email_creates_directly_without_search() {
        let gateway = ScriptedGateway::new("loc_1");
        gateway.respond(
            Method::POST,
            "/contacts/",
            Ok(json!({"contact": {"id": "c_new"}})),
        );
        let resolver = ContactResolver::new(&gateway, ResolverSettings::default());
        let spec = ContactSpec {
            name: Some("Bruno".into()),
            email: Some(Email::parse("bruno@example.com").unwrap()),
            phone: Some(PhoneNumber::parse("(11) 98888-7777").unwrap()),
            ..ContactSpec::default()
        };

        let resolved = resolver.resolve(&spec).await.unwrap();

        assert_eq!(resolved.source, ContactSource::Created);
        let body = gateway.only_call().payload;
        let body = body.json().unwrap();
        assert_eq!(body["email"], "bruno@example.com");
        assert_eq!(body["phone"], "+5511988887777");
    }

    #[tokio::test]
    async fn test_disambiguation_rewrites_email_and_phone() {
        let gateway = ScriptedGateway::new("loc_1");
        gateway.respond(
            Method::POST,
            "/contacts/",
            Ok(json!({"contact": {"id": "c_new"}})),
        );
        let resolver = ContactResolver::new(&gateway, ENABLED).with_suffix_source(fixed_suffix);
        let spec = ContactSpec {
            name: Some("Bruno".into()),
            email: Some(Email::parse("bruno@example.com").unwrap()),
            phone: Some(PhoneNumber::parse("11988887777").unwrap()),
            ..ContactSpec::default()
        };

        resolver.resolve(&spec).await.unwrap();

        let body = gateway.only_call().payload;
        let body = body.json().unwrap();
        assert_eq!(body["email"], "bruno.48213@example.com");
        assert_eq!(body["phone"], "+5511988887213");
    }

    #[tokio::test]
    async fn test_validation_rejection_retries_with_original_email() {
        let gateway = ScriptedGateway::new("loc_1");
        gateway
            .reject(Method::POST, "/contacts/", 422, r#"{"message":"invalid email"}"#)
            .respond(
                Method::POST,
                "/contacts/",
                Ok(json!({"contact": {"id": "c_retry", "email": "bruno@example.com"}})),
            );
        let resolver = ContactResolver::new(&gateway, ENABLED).with_suffix_source(fixed_suffix);
        let spec = ContactSpec {
            name: Some("Bruno".into()),
            email: Some(Email::parse("bruno@example.com").unwrap()),
            ..ContactSpec::default()
        };

        let resolved = resolver.resolve(&spec).await.unwrap();

        assert_eq!(resolved.id.as_str(), "c_retry");
        assert_eq!(resolved.source, ContactSource::CreatedAfterRetry);
        let creates = gateway.calls_to(&Method::POST, "/contacts/");
        assert_eq!(creates.len(), 2);
        assert_eq!(
            creates[1].payload.json().unwrap()["email"],
            "bruno@example.com"
        );
    }

    #[tokio::test]
    async fn test_without_disambiguation_no_retry() {
        let gateway = ScriptedGateway::new("loc_1");
        gateway
            .reject(Method::POST, "/contacts/", 422, "duplicate")
            .respond(Method::GET, "/contacts/", Ok(contacts_page()));
        let resolver = ContactResolver::new(&gateway, ResolverSettings::default());
        let spec = ContactSpec {
            name: Some("Someone".into()),
            email: Some(Email::parse("ANA@example.com").unwrap()),
            ..ContactSpec::default()
        };

        let resolved = resolver.resolve(&spec).await.unwrap();

        assert_eq!(resolved.id.as_str(), "c_ana");
        assert_eq!(resolved.source, ContactSource::MatchedAfterCreateFailed);
        assert_eq!(gateway.calls_to(&Method::POST, "/contacts/").len(), 1);
    }

    #[tokio::test]
    async fn test_failed_create_and_no_match_is_resolution_error() {
        let gateway = ScriptedGateway::new("loc_1");
        gateway
            .reject(Method::POST, "/contacts/", 500, "boom")
            .respond(Method::GET, "/contacts/", Ok(json!({"contacts": []})));
        let resolver = ContactResolver::new(&gateway, ResolverSettings::default());
        let spec = ContactSpec {
            name: Some("Zé".into()),
            force_new: true,
            ..ContactSpec::default()
        };

        let err = resolver.resolve(&spec).await.unwrap_err();

        assert!(matches!(
            err,
            OperationError::Resolution {
                source: Some(CrmError::Remote { status: 500, .. }),
                ..
            }
        ));
        // No second creation attempt after the search came back empty.
        assert_eq!(gateway.calls_to(&Method::POST, "/contacts/").len(), 1);
    }

    #[tokio::test]
    async fn test_search_failure_is_resolution_error() {
        let gateway = ScriptedGateway::new("loc_1");
        gateway.reject(Method::GET, "/contacts/", 401, "unauthorized");
        let resolver = ContactResolver::new(&gateway, ResolverSettings::default());

        let err = resolver.resolve(&ContactSpec::named("Ana")).await.unwrap_err();

        assert!(matches!(err, OperationError::Resolution { .. }));
        assert_eq!(gateway.call_count(), 1);
    }

    #[tokio::test]
    async fn test_blank_name_without_id_fails_without_calls() {
        let gateway = ScriptedGateway::new("loc_1");
        let resolver = ContactResolver::new(&gateway, ResolverSettings::default());

        let err = resolver.resolve(&ContactSpec::named("   ")).await.unwrap_err();

        assert!(matches!(err, OperationError::Resolution { source: None, .. }));
        assert_eq!(gateway.call_count(), 0);
    }

    #[test]
    fn test_find_match_rules() {
        let contacts: Vec<Contact> =
            serde_json::from_value(contacts_page()["contacts"].clone()).unwrap();

        assert_eq!(find_match(&contacts, "SOUZA", None).unwrap().id.as_str(), "c_ana");
        assert_eq!(find_match(&contacts, "silva", None).unwrap().id.as_str(), "c_maria");
        assert!(find_match(&contacts, "Pedro", None).is_none());

        let email = Email::parse("Ana@Example.com").unwrap();
        assert_eq!(
            find_match(&contacts, "Pedro", Some(&email)).unwrap().id.as_str(),
            "c_ana"
        );
    }
}
