//! Tests for secret generation and webhook authentication.

use crate::counter::{ApiToken, CounterId};
use crate::webhook::domain::{SECRET_LENGTH, Webhook, WebhookDomainError, WebhookId, WebhookSecret};
use mockable::DefaultClock;
use rstest::{fixture, rstest};

#[fixture]
fn registered() -> (Webhook, WebhookSecret) {
    Webhook::register(
        " CRM ",
        None,
        CounterId::new(123_456).expect("valid counter"),
        ApiToken::new("token").expect("valid token"),
        &DefaultClock,
    )
    .expect("valid webhook")
}

#[test]
fn generated_secrets_are_long_alphanumeric_and_distinct() {
    let first = WebhookSecret::generate();
    let second = WebhookSecret::generate();

    assert_eq!(first.expose().len(), SECRET_LENGTH);
    assert!(first.expose().chars().all(|ch| ch.is_ascii_alphanumeric()));
    assert_ne!(first, second);
    assert_eq!(format!("{first:?}"), "WebhookSecret(***)");
}

#[rstest]
fn issued_secret_authenticates(registered: (Webhook, WebhookSecret)) {
    let (webhook, secret) = registered;
    assert_eq!(webhook.name(), "CRM");
    assert!(webhook.is_active());
    assert_eq!(webhook.authenticate(Some(secret.expose())), Ok(()));
}

#[rstest]
#[case(None)]
#[case(Some(""))]
#[case(Some("not-the-secret"))]
fn wrong_or_missing_secret_is_unauthorized(
    registered: (Webhook, WebhookSecret),
    #[case] supplied: Option<&str>,
) {
    let (webhook, _secret) = registered;
    assert_eq!(
        webhook.authenticate(supplied),
        Err(WebhookDomainError::Unauthorized)
    );
}

#[rstest]
fn digest_is_bound_to_the_webhook_id(registered: (Webhook, WebhookSecret)) {
    let (webhook, secret) = registered;
    let other_digest = secret.digest_for(WebhookId::new());
    assert_ne!(&other_digest, webhook.secret_digest());
    assert!(!other_digest.verify(webhook.id(), secret.expose()));
}

#[rstest]
fn deactivated_webhook_rejects_its_own_secret(registered: (Webhook, WebhookSecret)) {
    let (mut webhook, secret) = registered;
    webhook.deactivate(&DefaultClock);
    assert_eq!(
        webhook.authenticate(Some(secret.expose())),
        Err(WebhookDomainError::Unauthorized)
    );
}

#[test]
fn blank_name_is_rejected() {
    let result = Webhook::register(
        "  ",
        None,
        CounterId::new(1).expect("valid counter"),
        ApiToken::new("token").expect("valid token"),
        &DefaultClock,
    );
    assert!(matches!(result, Err(WebhookDomainError::EmptyName)));
}

#[rstest]
fn callback_url_joins_base_and_id(registered: (Webhook, WebhookSecret)) {
    let (webhook, _secret) = registered;
    assert_eq!(
        webhook.callback_url("https://scores.example.com/"),
        format!(
            "https://scores.example.com/webhook/offline-conversions/{}",
            webhook.id()
        )
    );
}
