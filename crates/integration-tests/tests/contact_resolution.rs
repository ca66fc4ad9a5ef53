//! Find-or-create properties of the contact resolver.

use crm_bridge::gateway::{CrmError, Method};
use crm_bridge::services::{ContactResolver, ContactSource, ContactSpec, OperationError, ResolverSettings};
use crm_bridge_core::{ContactId, Email, PhoneNumber};
use crm_bridge_integration_tests::{body, contacts_page, created_contact, gateway};

const EXISTING: &[(&str, &str, &str)] = &[
    ("c_ana", "Ana", "Lima"),
    ("c_maria", "Maria", "Santos"),
    ("c_joao", "João", "Pereira"),
];

#[tokio::test]
async fn test_explicit_ids_are_returned_without_any_call() {
    let gateway = gateway();
    let resolver = ContactResolver::new(&gateway, ResolverSettings::default());

    for id in ["abc123", "c_ana", "  spaced-id  "] {
        let spec = ContactSpec {
            name: Some("Ignored Name".into()),
            force_new: true,
            ..ContactSpec::with_id(ContactId::new_unchecked(id))
        };
        let resolved = resolver.resolve(&spec).await.unwrap();
        assert_eq!(resolved.id.as_str(), id);
        assert_eq!(resolved.source, ContactSource::Explicit);
    }

    assert_eq!(gateway.call_count(), 0);
}

#[tokio::test]
async fn test_case_insensitive_substring_matches_existing_contact() {
    for (query, expected) in [
        ("maria", "c_maria"),
        ("MARIA SANTOS", "c_maria"),
        ("ana li", "c_ana"),
        ("joão", "c_joao"),
    ] {
        let gateway = gateway();
        gateway.respond(Method::GET, "/contacts/", Ok(contacts_page(EXISTING)));

        let resolved = ContactResolver::new(&gateway, ResolverSettings::default())
            .resolve(&ContactSpec::named(query))
            .await
            .unwrap();

        assert_eq!(resolved.id.as_str(), expected, "query {query}");
        assert_eq!(resolved.source, ContactSource::Matched);
        assert!(gateway.calls_to(&Method::POST, "/contacts/").is_empty());
        assert_eq!(
            gateway.only_call().payload.query_param("limit"),
            Some("50"),
            "search page is capped"
        );
    }
}

#[tokio::test]
async fn test_unmatched_name_creates_exactly_one_contact() {
    let gateway = gateway();
    gateway
        .respond(Method::GET, "/contacts/", Ok(contacts_page(EXISTING)))
        .respond(Method::POST, "/contacts/", Ok(created_contact("c_new", "Carlos")));

    let resolved = ContactResolver::new(&gateway, ResolverSettings::default())
        .resolve(&ContactSpec::named("Carlos Costa"))
        .await
        .unwrap();

    assert_eq!(resolved.id.as_str(), "c_new");
    assert_eq!(resolved.source, ContactSource::Created);

    let creates = gateway.calls_to(&Method::POST, "/contacts/");
    assert_eq!(creates.len(), 1);
    let sent = body(&creates[0]);
    assert_eq!(sent["firstName"], "Carlos Costa");
    assert!(sent.get("email").is_none());
    assert_eq!(sent["locationId"], "loc_test");
}

#[tokio::test]
async fn test_email_skips_search_and_keeps_supplied_values_by_default() {
    let gateway = gateway();
    gateway.respond(Method::POST, "/contacts/", Ok(created_contact("c_bia", "Bia")));

    let spec = ContactSpec {
        email: Some(Email::parse("bia@example.com").unwrap()),
        phone: Some(PhoneNumber::parse("(11) 98888-7777").unwrap()),
        ..ContactSpec::named("Bia")
    };
    let resolved = ContactResolver::new(&gateway, ResolverSettings::default())
        .resolve(&spec)
        .await
        .unwrap();

    assert_eq!(resolved.id.as_str(), "c_bia");
    let call = gateway.only_call();
    assert_eq!(call.method, Method::POST);
    let sent = body(&call);
    assert_eq!(sent["email"], "bia@example.com");
    assert_eq!(sent["phone"], "+5511988887777");
}

#[tokio::test]
async fn test_failed_search_is_a_resolution_error_with_source() {
    let gateway = gateway();
    gateway.reject(Method::GET, "/contacts/", 401, "invalid token");

    let err = ContactResolver::new(&gateway, ResolverSettings::default())
        .resolve(&ContactSpec::named("Ana"))
        .await
        .unwrap_err();

    match err {
        OperationError::Resolution {
            source: Some(CrmError::Remote { status, body }),
            ..
        } => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid token");
        }
        other => panic!("expected resolution error, got {other:?}"),
    }
    assert!(gateway.calls_to(&Method::POST, "/contacts/").is_empty());
}
