//! Built-in executors against a local HTTP endpoint.

use std::time::{Duration, Instant};

use hermes::action::{DiscordExecutor, SlackExecutor};
use hermes::{
    ActionContext, ActionError, ActionExecutor, ActionRegistry, EventId, RelayAction, RelayId,
};
use serde_json::json;

use crate::support::endpoint::{MockEndpoint, closed_url};
use crate::support::helpers::{action, fast_webhook_client, init_test_tracing, webhook_client};

fn context(action: &RelayAction) -> ActionContext {
    ActionContext::new(RelayId::new("relay-1"), EventId::new("evt-1"), action)
}

async fn run(
    executor: &dyn ActionExecutor,
    action: &RelayAction,
    payload: &str,
) -> Result<(), ActionError> {
    executor
        .execute(&context(action), &action.config, payload.as_bytes())
        .await
}

#[tokio::test]
async fn server_errors_are_retried_with_growing_backoff() {
    init_test_tracing();
    let endpoint = MockEndpoint::start(500).await;
    let slack = SlackExecutor::new(webhook_client());
    let action = action(1, "slack", json!({ "webhook_url": endpoint.url() }));

    let err = run(&slack, &action, "{}").await.unwrap_err();

    match err {
        ActionError::RetriesExhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert!(matches!(*last, ActionError::Retryable { status: 500 }));
        }
        other => panic!("expected exhausted retries, got {other:?}"),
    }
    assert_eq!(endpoint.hit_count(), 3);

    let gaps = endpoint.gaps();
    assert!(gaps[0] >= Duration::from_millis(200), "{gaps:?}");
    assert!(gaps[1] >= Duration::from_millis(400), "{gaps:?}");
    assert!(gaps[1] >= gaps[0]);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let endpoint = MockEndpoint::start(400).await;
    let slack = SlackExecutor::new(fast_webhook_client());
    let action = action(1, "slack", json!({ "webhook_url": endpoint.url() }));

    let err = run(&slack, &action, "{}").await.unwrap_err();

    assert!(
        matches!(&err, ActionError::Rejected { status: 400, body } if body == "mock 400"),
        "{err:?}"
    );
    assert!(!err.is_retryable());
    assert_eq!(endpoint.hit_count(), 1);
}

#[tokio::test]
async fn rate_limit_then_success() {
    let endpoint = MockEndpoint::scripted(&[429], 200).await;
    let slack = SlackExecutor::new(fast_webhook_client());
    let action = action(1, "slack", json!({ "webhook_url": endpoint.url() }));

    run(&slack, &action, "{}").await.unwrap();

    assert_eq!(endpoint.hit_count(), 2);
}

#[tokio::test]
async fn requests_are_json() {
    let endpoint = MockEndpoint::start(204).await;
    let slack = SlackExecutor::new(fast_webhook_client());
    let action = action(
        1,
        "slack",
        json!({
            "webhook_url": endpoint.url(),
            "message_template": "Order {{order.id}} paid ({{order.total}})",
        }),
    );

    run(&slack, &action, r#"{"order":{"id":"A-7","total":42}}"#)
        .await
        .unwrap();

    let hit = &endpoint.hits()[0];
    assert_eq!(hit.content_type.as_deref(), Some("application/json"));
    assert_eq!(hit.json(), json!({ "text": "Order A-7 paid (42)" }));
}

#[tokio::test]
async fn discord_posts_content_and_username() {
    let endpoint = MockEndpoint::start(204).await;
    let discord = DiscordExecutor::new(fast_webhook_client());
    let action = action(
        1,
        "discord",
        json!({
            "webhook_url": endpoint.url(),
            "message_template": "New signup: {{email}}",
            "username": "Hermes",
        }),
    );

    run(&discord, &action, r#"{"email":"ada@example.com"}"#)
        .await
        .unwrap();

    assert_eq!(
        endpoint.hits()[0].json(),
        json!({ "content": "New signup: ada@example.com", "username": "Hermes" })
    );
}

#[tokio::test]
async fn missing_url_fails_without_a_request() {
    let endpoint = MockEndpoint::start(200).await;
    let slack = SlackExecutor::new(fast_webhook_client());
    let action = action(1, "slack", json!({ "message_template": "hi" }));

    let err = run(&slack, &action, "{}").await.unwrap_err();

    assert!(matches!(err, ActionError::InvalidConfig(msg) if msg == "missing webhook_url"));
    assert_eq!(endpoint.hit_count(), 0);
}

#[tokio::test]
async fn malformed_url_fails_without_retrying() {
    let slack = SlackExecutor::new(webhook_client());
    let discord = DiscordExecutor::new(webhook_client());

    for (executor, action_type) in [
        (&slack as &dyn ActionExecutor, "slack"),
        (&discord as &dyn ActionExecutor, "discord"),
    ] {
        let action = action(1, action_type, json!({ "webhook_url": "not a url" }));

        let started = Instant::now();
        let err = run(executor, &action, "{}").await.unwrap_err();

        assert!(
            matches!(&err, ActionError::InvalidConfig(msg) if msg.starts_with("webhook_url")),
            "{action_type}: {err:?}"
        );
        assert!(
            started.elapsed() < Duration::from_millis(150),
            "{action_type} backed off on a config error"
        );
    }
}

#[tokio::test]
async fn unreachable_endpoint_is_retried() {
    let slack = SlackExecutor::new(fast_webhook_client());
    let action = action(1, "slack", json!({ "webhook_url": closed_url().await }));

    let err = run(&slack, &action, "{}").await.unwrap_err();

    match err {
        ActionError::RetriesExhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert!(matches!(*last, ActionError::Transport(_)), "{last:?}");
        }
        other => panic!("expected exhausted retries, got {other:?}"),
    }
}

#[tokio::test]
async fn default_registry_dispatches_by_type() {
    let endpoint = MockEndpoint::start(200).await;
    let registry = ActionRegistry::with_defaults(fast_webhook_client());
    let log = action(1, "log", json!({ "label": "audit" }));
    let discord = action(2, "discord", json!({ "webhook_url": endpoint.url() }));

    for action in [&log, &discord] {
        let executor = registry.get(&action.action_type).unwrap();
        run(executor, action, r#"{"ok":true}"#).await.unwrap();
    }

    assert_eq!(endpoint.hit_count(), 1);
    assert!(registry.get("teams").is_err());
}
