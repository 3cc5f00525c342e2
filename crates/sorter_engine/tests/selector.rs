use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use sorter_core::CategorySet;
use sorter_engine::{
    ClassificationClient, Classifier, ClassifySettings, ProbeStatus, ProviderConfig,
    ProviderError, ProviderRegistry, ProviderSelector, SelectionPolicy,
};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(id: &str, server: &MockServer) -> ProviderConfig {
    ProviderConfig {
        id: id.to_string(),
        base_url: format!("{}/v1", server.uri()),
        api_key: format!("sk-{id}"),
        model: "test-model".to_string(),
    }
}

fn registry(providers: Vec<ProviderConfig>) -> ProviderRegistry {
    ProviderRegistry::new(providers)
        .unwrap()
        .with_probe_timeout(Duration::from_millis(300))
}

async fn mount_probe(server: &MockServer, status: u16) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"max_tokens": 1})))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({"choices": []})))
        .with_priority(1)
        .mount(server)
        .await;
}

async fn mount_reply(server: &MockServer, category: &str, expected_calls: u64) {
    let reply = json!({"category": category}).to_string();
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"max_tokens": 200})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": reply}}]
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn fast_settings() -> ClassifySettings {
    ClassifySettings {
        max_attempts: 2,
        backoff_step: Duration::from_millis(5),
        backoff_floor: Duration::from_millis(5),
        backoff_cap: Duration::from_millis(10),
        request_timeout: Duration::from_millis(500),
        ..ClassifySettings::default()
    }
}

#[test]
fn duplicate_ids_are_rejected() {
    let config = ProviderConfig {
        id: "dup".to_string(),
        base_url: "http://localhost/v1".to_string(),
        api_key: "k".to_string(),
        model: "m".to_string(),
    };
    let err = ProviderRegistry::new(vec![config.clone(), config]).unwrap_err();
    assert!(matches!(err, ProviderError::Duplicate(id) if id == "dup"));
}

#[test]
fn debug_output_hides_the_api_key() {
    let config = ProviderConfig {
        id: "p".to_string(),
        base_url: "http://localhost/v1".to_string(),
        api_key: "sk-secret-value".to_string(),
        model: "m".to_string(),
    };
    let rendered = format!("{config:?}");
    assert!(!rendered.contains("sk-secret-value"));
    assert!(rendered.contains("<redacted>"));
}

#[tokio::test]
async fn probe_maps_statuses() {
    sorter_logging::initialize_for_tests();
    let ok = MockServer::start().await;
    let denied = MockServer::start().await;
    let limited = MockServer::start().await;
    let broken = MockServer::start().await;
    mount_probe(&ok, 200).await;
    mount_probe(&denied, 401).await;
    mount_probe(&limited, 429).await;
    mount_probe(&broken, 502).await;

    let mut missing_key = provider("nokey", &ok);
    missing_key.api_key = "  ".to_string();
    let registry = registry(vec![
        provider("ok", &ok),
        provider("denied", &denied),
        provider("limited", &limited),
        provider("broken", &broken),
        missing_key,
    ]);

    let results = registry.probe_all().await;
    let statuses: Vec<_> = results.iter().map(|(_, s)| s.clone()).collect();
    assert_eq!(statuses[0], ProbeStatus::Reachable);
    assert_eq!(statuses[1], ProbeStatus::InvalidCredential);
    assert_eq!(statuses[2], ProbeStatus::RateLimited);
    assert_eq!(statuses[3], ProbeStatus::HttpStatus(502));
    assert!(matches!(statuses[4], ProbeStatus::Misconfigured(_)));

    assert!(matches!(
        registry.probe("absent").await,
        Err(ProviderError::Unknown(_))
    ));
}

#[tokio::test]
async fn probe_reports_network_failures() {
    sorter_logging::initialize_for_tests();
    let registry = registry(vec![ProviderConfig {
        id: "closed".to_string(),
        base_url: "http://127.0.0.1:9/v1".to_string(),
        api_key: "k".to_string(),
        model: "m".to_string(),
    }]);
    let status = registry.probe("closed").await.unwrap();
    assert!(matches!(status, ProbeStatus::Network(_)), "got {status:?}");
}

#[tokio::test]
async fn auto_selection_prefers_then_fails_over() {
    sorter_logging::initialize_for_tests();
    let first = MockServer::start().await;
    let second = MockServer::start().await;
    let third = MockServer::start().await;
    mount_probe(&first, 200).await;
    mount_probe(&second, 401).await;
    mount_probe(&third, 200).await;

    let selector = ProviderSelector::new(registry(vec![
        provider("first", &first),
        provider("second", &second),
        provider("third", &third),
    ]));

    let chosen = selector
        .select_best(&SelectionPolicy::Auto {
            preferred: Some("third".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(chosen.id, "third");

    let chosen = selector
        .select_best(&SelectionPolicy::Auto {
            preferred: Some("second".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(chosen.id, "first");
    assert_eq!(selector.active_id().as_deref(), Some("first"));
}

#[tokio::test]
async fn selection_errors() {
    sorter_logging::initialize_for_tests();
    let denied = MockServer::start().await;
    let limited = MockServer::start().await;
    mount_probe(&denied, 403).await;
    mount_probe(&limited, 429).await;

    let selector = ProviderSelector::new(registry(vec![
        provider("denied", &denied),
        provider("limited", &limited),
    ]));

    let err = selector
        .select_best(&SelectionPolicy::Fixed("limited".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProviderError::Unreachable { ref id, status: ProbeStatus::RateLimited } if id == "limited"
    ));

    let err = selector
        .select_best(&SelectionPolicy::Auto { preferred: None })
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::NoneReachable { tried: 2 }));

    let err = selector
        .select_best(&SelectionPolicy::Fixed("ghost".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Unknown(_)));
    assert!(selector.active().is_none());
}

#[tokio::test]
async fn failed_switch_keeps_the_previous_provider() {
    sorter_logging::initialize_for_tests();
    let primary = MockServer::start().await;
    let backup = MockServer::start().await;
    mount_probe(&primary, 200).await;
    mount_probe(&backup, 401).await;
    mount_reply(&primary, "自然科学", 1).await;
    mount_reply(&backup, "人文社科", 0).await;

    let mut bad_url = provider("bad-url", &primary);
    bad_url.base_url = "not a url".to_string();
    let selector = Arc::new(ProviderSelector::new(registry(vec![
        provider("primary", &primary),
        provider("backup", &backup),
        bad_url,
    ])));
    selector
        .select_best(&SelectionPolicy::Fixed("primary".to_string()))
        .await
        .unwrap();

    assert!(matches!(
        selector.switch_to("backup").await,
        Err(ProviderError::Unreachable { .. })
    ));
    assert!(matches!(
        selector.switch_to("bad-url").await,
        Err(ProviderError::Misconfigured { .. })
    ));
    assert!(matches!(
        selector.switch_to("ghost").await,
        Err(ProviderError::Unknown(_))
    ));
    assert_eq!(selector.active_id().as_deref(), Some("primary"));

    let client = ClassificationClient::new(
        Arc::clone(&selector),
        CategorySet::new(["自然科学", "人文社科"]),
        fast_settings(),
    );
    let classification = client.classify("t", "c").await;
    assert_eq!(classification.result.category(), "自然科学");
    assert_eq!(classification.provider.as_deref(), Some("primary"));
}

#[tokio::test]
async fn successful_switch_routes_later_calls() {
    sorter_logging::initialize_for_tests();
    let primary = MockServer::start().await;
    let backup = MockServer::start().await;
    mount_probe(&primary, 200).await;
    mount_probe(&backup, 200).await;
    mount_reply(&primary, "自然科学", 1).await;
    mount_reply(&backup, "人文社科", 1).await;

    let selector = Arc::new(ProviderSelector::new(registry(vec![
        provider("primary", &primary),
        provider("backup", &backup),
    ])));
    selector
        .select_best(&SelectionPolicy::Auto { preferred: None })
        .await
        .unwrap();

    let client = ClassificationClient::new(
        Arc::clone(&selector),
        CategorySet::new(["自然科学", "人文社科"]),
        fast_settings(),
    );
    assert_eq!(client.classify("t", "c").await.result.category(), "自然科学");

    let switched = selector.switch_to("backup").await.unwrap();
    assert_eq!(switched.id, "backup");
    let classification = client.classify("t", "c").await;
    assert_eq!(classification.result.category(), "人文社科");
    assert_eq!(classification.provider.as_deref(), Some("backup"));
}
