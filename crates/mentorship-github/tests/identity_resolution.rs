mod support;

use mentorship_github::{IdentityResolver, OwnerKind, RemoteError, ResolveError, ResolvedVia};
use serde_json::json;
use support::{account, not_found, viewer, ScriptedTransport};

#[test]
fn resolves_user_on_first_step() {
    let transport = ScriptedTransport::new().respond(account("user", "U_foo", "foo"));
    let resolution = IdentityResolver::new(&transport).resolve("foo").unwrap();

    assert_eq!(resolution.id, "U_foo");
    assert_eq!(resolution.kind, OwnerKind::User);
    assert_eq!(resolution.via, ResolvedVia::User);
    assert_eq!(transport.operations(), vec!["ResolveUser"]);
    assert_eq!(transport.requests()[0].variables, json!({ "login": "foo" }));
}

#[test]
fn falls_through_to_organization() {
    let transport = ScriptedTransport::new()
        .respond(not_found("user"))
        .respond(account("organization", "O_acme", "acme"));
    let resolution = IdentityResolver::new(&transport).resolve("acme").unwrap();

    assert_eq!(resolution.id, "O_acme");
    assert_eq!(resolution.via, ResolvedVia::Organization);
    assert_eq!(
        transport.operations(),
        vec!["ResolveUser", "ResolveOrganization"]
    );
}

#[test]
fn falls_back_to_authenticated_user() {
    let transport = ScriptedTransport::new()
        .respond(not_found("user"))
        .respond(not_found("organization"))
        .respond(viewer("U_bar", "bar"))
        .respond(account("user", "U_bar", "bar"));
    let resolution = IdentityResolver::new(&transport).resolve("foo").unwrap();

    assert_eq!(resolution.requested, "foo");
    assert_eq!(resolution.login, "bar");
    assert_eq!(resolution.id, "U_bar");
    assert_eq!(resolution.via, ResolvedVia::FallbackUser);
    assert_eq!(resolution.via.to_string(), "fallback-user");
    assert_eq!(transport.requests()[3].variables["login"], "bar");
}

#[test]
fn fallback_organization_is_reported() {
    let transport = ScriptedTransport::new()
        .respond(not_found("user"))
        .respond(not_found("organization"))
        .respond(viewer("U_bar", "bar"))
        .respond(not_found("user"))
        .respond(account("organization", "O_bar", "bar"));
    let resolution = IdentityResolver::new(&transport).resolve("foo").unwrap();
    assert_eq!(resolution.via, ResolvedVia::FallbackOrganization);
    assert_eq!(resolution.kind, OwnerKind::Organization);
}

#[test]
fn fallback_runs_at_most_once() {
    let transport = ScriptedTransport::new()
        .respond(not_found("user"))
        .respond(not_found("organization"))
        .respond(viewer("U_bar", "bar"))
        .respond(not_found("user"))
        .respond(not_found("organization"))
        // Never consumed: a second fallback would ask for the viewer again.
        .respond(viewer("U_bar", "bar"));

    let err = IdentityResolver::new(&transport).resolve("foo").unwrap_err();
    match err {
        ResolveError::UnresolvableOwner {
            requested,
            fallback,
            errors,
        } => {
            assert_eq!(requested, "foo");
            assert_eq!(fallback.as_deref(), Some("bar"));
            assert_eq!(errors.len(), 4);
        }
        other => panic!("expected UnresolvableOwner, got {other:?}"),
    }
    assert_eq!(transport.requests().len(), 5);
    assert_eq!(transport.remaining(), 1);
}

#[test]
fn fallback_is_skipped_when_viewer_is_the_requested_owner() {
    let transport = ScriptedTransport::new()
        .respond(not_found("user"))
        .respond(not_found("organization"))
        .respond(viewer("U_foo", "Foo"));

    let err = IdentityResolver::new(&transport).resolve("foo").unwrap_err();
    assert!(matches!(
        err,
        ResolveError::UnresolvableOwner { fallback: None, .. }
    ));
    assert_eq!(transport.operations(), vec!["ResolveUser", "ResolveOrganization", "Viewer"]);
}

#[test]
fn authentication_failure_aborts_immediately() {
    let transport = ScriptedTransport::new()
        .respond(json!({ "errors": [{ "message": "Bad credentials" }] }))
        .respond(account("organization", "O_acme", "acme"));

    let err = IdentityResolver::new(&transport).resolve("acme").unwrap_err();
    match err {
        ResolveError::Remote(RemoteError::Graphql { errors }) => {
            assert_eq!(errors[0].message, "Bad credentials");
        }
        other => panic!("expected remote error, got {other:?}"),
    }
    assert_eq!(transport.requests().len(), 1);
}

#[test]
fn transport_failure_during_fallback_is_fatal() {
    let transport = ScriptedTransport::new()
        .respond(not_found("user"))
        .respond(not_found("organization"))
        .fail(RemoteError::Http {
            status: 502,
            body: "Bad Gateway".into(),
        });

    let err = IdentityResolver::new(&transport).resolve("foo").unwrap_err();
    assert!(matches!(
        err,
        ResolveError::Remote(RemoteError::Http { status: 502, .. })
    ));
}

#[test]
fn repeated_resolution_is_deterministic() {
    let script = || {
        ScriptedTransport::new()
            .respond(not_found("user"))
            .respond(not_found("organization"))
            .respond(viewer("U_bar", "bar"))
            .respond(account("user", "U_bar", "bar"))
    };
    let first = IdentityResolver::new(script()).resolve("foo").unwrap();
    let second = IdentityResolver::new(script()).resolve("foo").unwrap();
    assert_eq!(first, second);
}
