#![allow(clippy::unwrap_used)]
// End-to-end tests for lifecycle, registry and dispatcher against wiremock.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use campcare_core::{
    CommandRequest, CommandResult, ConfigEntry, CoreError, Dispatcher, EntryState,
    InstanceConfig, InstanceId, InstanceOptions, InstanceRegistry, IntegrationManager, Operation,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn secret(s: &str) -> SecretString {
    SecretString::from(s.to_owned())
}

fn config(name: &str, key: &str, server: &MockServer) -> InstanceConfig {
    InstanceConfig::new(name, secret(key)).with_base_url(server.uri())
}

fn host() -> (IntegrationManager, Dispatcher) {
    let registry = Arc::new(InstanceRegistry::default());
    let manager = IntegrationManager::new(Arc::clone(&registry));
    let dispatcher = Dispatcher::new(registry);
    (manager, dispatcher)
}

async fn mount_version(server: &MockServer, key: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path("/version"))
        .and(header("authorization", format!("Bearer {key}").as_str()))
        .respond_with(ResponseTemplate::new(status).set_body_string("21"))
        .mount(server)
        .await;
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_duplicate_display_name_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/version"))
        .respond_with(ResponseTemplate::new(200).set_body_string("21"))
        .expect(1)
        .mount(&server)
        .await;

    let (manager, _) = host();
    manager.setup(config("De Kroon", "k1", &server)).await.unwrap();

    let err = manager
        .setup(config(" De Kroon ", "k2", &server))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::AlreadyConfigured { ref name } if name == "De Kroon"));
    assert_eq!(manager.entries().await.len(), 1);
}

#[tokio::test]
async fn test_failed_setup_leaves_nothing_behind() {
    let server = MockServer::start().await;
    mount_version(&server, "bad", 401).await;

    let (manager, dispatcher) = host();
    let err = manager.setup(config("De Kroon", "bad", &server)).await.unwrap_err();

    assert_eq!(err.code(), "unauthorized");
    assert!(manager.entries().await.is_empty());
    assert!(manager.registry().is_empty());

    let reply = dispatcher.call(&CommandRequest::new("list_places")).await;
    assert_eq!(reply.error.unwrap().code, "unknown_instance");
}

#[tokio::test]
async fn test_setup_reports_remote_reason() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/version"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({ "message": "maintenance" })))
        .mount(&server)
        .await;

    let (manager, _) = host();
    let err = manager.setup(config("De Kroon", "k", &server)).await.unwrap_err();

    assert_eq!(err.code(), "setup_failed");
    assert!(err.to_string().contains("maintenance"));
}

#[tokio::test]
async fn test_unreachable_host_fails_setup() {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    let unreachable = InstanceConfig::new("De Kroon", secret("k"))
        .with_base_url(format!("http://127.0.0.1:{port}"));

    let (manager, _) = host();
    let err = manager.setup(unreachable).await.unwrap_err();

    assert_eq!(err.code(), "setup_failed");
    assert!(manager.entries().await.is_empty());
    assert!(manager.registry().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_update_rebuilds_client_while_old_call_finishes() {
    let server = MockServer::start().await;
    mount_version(&server, "old", 200).await;
    mount_version(&server, "new", 200).await;

    Mock::given(method("GET"))
        .and(path("/places"))
        .and(header("authorization", "Bearer old"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "id": 1, "name": "OLD" }]))
                .set_delay(Duration::from_millis(400)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/places"))
        .and(header("authorization", "Bearer new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 2, "name": "NEW" }])))
        .expect(1)
        .mount(&server)
        .await;

    let (manager, dispatcher) = host();
    let entry = manager.setup(config("De Kroon", "old", &server)).await.unwrap();

    let in_flight = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move { dispatcher.call(&CommandRequest::new("list_places")).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    let options = InstanceOptions {
        credential: Some(secret("new")),
        ..InstanceOptions::default()
    };
    manager.update_options(&entry.id, options).await.unwrap();

    let fresh = dispatcher.call(&CommandRequest::new("list_places")).await;
    let old = in_flight.await.unwrap();

    let names = |reply: &campcare_core::Reply| match &reply.result {
        Some(CommandResult::Places(places)) => places
            .iter()
            .filter_map(|p| p.name.clone())
            .collect::<Vec<_>>(),
        other => panic!("unexpected result {other:?}"),
    };
    assert_eq!(names(&fresh), ["NEW"]);
    assert_eq!(names(&old), ["OLD"]);
}

#[tokio::test]
async fn test_failed_update_removes_live_client() {
    let server = MockServer::start().await;
    mount_version(&server, "good", 200).await;
    mount_version(&server, "revoked", 401).await;

    let (manager, dispatcher) = host();
    let entry = manager.setup(config("De Kroon", "good", &server)).await.unwrap();

    let options = InstanceOptions {
        credential: Some(secret("revoked")),
        ..InstanceOptions::default()
    };
    let err = manager.update_options(&entry.id, options).await.unwrap_err();
    assert!(matches!(err, CoreError::AuthenticationFailed { .. }));

    assert!(!manager.registry().contains(&entry.id));
    let record = manager.entry(&entry.id).await.unwrap();
    assert!(matches!(record.state, EntryState::SetupError { .. }));

    let reply = dispatcher
        .call(&CommandRequest::new("list_places").with_instance(entry.id.clone()))
        .await;
    assert_eq!(reply.error.unwrap().code, "unknown_instance");

    // A later good update brings the entry back.
    let options = InstanceOptions {
        credential: Some(secret("good")),
        ..InstanceOptions::default()
    };
    manager.update_options(&entry.id, options).await.unwrap();
    assert!(manager.registry().contains(&entry.id));
}

#[tokio::test]
async fn test_restored_entry_is_probed_only_with_new_settings() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/version"))
        .and(header("authorization", "Bearer revoked"))
        .respond_with(ResponseTemplate::new(401))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/version"))
        .and(header("authorization", "Bearer rotated"))
        .respond_with(ResponseTemplate::new(200).set_body_string("21"))
        .expect(1)
        .mount(&server)
        .await;

    let (manager, _) = host();
    let id = InstanceId::from("e1");
    manager
        .restore(ConfigEntry::new(id.clone(), config("De Kroon", "revoked", &server)))
        .await
        .unwrap();
    assert_eq!(manager.entry(&id).await.unwrap().state, EntryState::NotLoaded);
    assert!(!manager.registry().contains(&id));

    let options = InstanceOptions {
        credential: Some(secret("rotated")),
        ..InstanceOptions::default()
    };
    manager.update_options(&id, options).await.unwrap();

    assert_eq!(manager.entry(&id).await.unwrap().state, EntryState::Loaded);
    assert!(manager.registry().contains(&id));
}

#[tokio::test]
async fn test_unload_then_resolve_is_unknown_instance() {
    let server = MockServer::start().await;
    mount_version(&server, "k", 200).await;

    let (manager, dispatcher) = host();
    let entry = manager.setup(config("De Kroon", "k", &server)).await.unwrap();
    manager.unload(&entry.id).await.unwrap();

    assert!(matches!(
        manager.registry().resolve(&entry.id),
        Err(CoreError::UnknownInstance { .. })
    ));
    let reply = dispatcher
        .call(
            &CommandRequest::new("check_plate")
                .with_instance(entry.id.clone())
                .with_param("plate", "AB-12"),
        )
        .await;
    assert_eq!(reply.error.unwrap().code, "unknown_instance");
}

#[tokio::test]
async fn test_shutdown_marks_entries_not_loaded() {
    let server = MockServer::start().await;
    mount_version(&server, "k", 200).await;

    let (manager, _) = host();
    manager.setup(config("De Kroon", "k", &server)).await.unwrap();
    manager.shutdown().await;

    assert!(manager.registry().is_empty());
    assert_eq!(manager.entries().await[0].state, EntryState::NotLoaded);
}

// ── Dispatch ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_missing_plate_makes_no_request() {
    let server = MockServer::start().await;
    mount_version(&server, "k", 200).await;
    Mock::given(method("GET"))
        .and(path("/license_plates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let (manager, dispatcher) = host();
    manager.setup(config("De Kroon", "k", &server)).await.unwrap();

    let reply = dispatcher
        .call(&CommandRequest::new("query_plate").with_id(1))
        .await;
    assert_eq!(reply.error.unwrap().code, "missing_field");

    let request = CommandRequest::new("query_plate").with_param("plate", "");
    assert!(!dispatcher.fire(&request).await);

    let reply = dispatcher
        .call(
            &CommandRequest::new("query_plate")
                .with_param("plate", "AB-12")
                .with_param("start_date", "01/07/2025"),
        )
        .await;
    assert_eq!(reply.error.unwrap().code, "invalid_format");
}

#[tokio::test]
async fn test_fire_query_plate_broadcasts_event() {
    let server = MockServer::start().await;
    mount_version(&server, "k", 200).await;
    Mock::given(method("GET"))
        .and(path("/license_plates"))
        .and(query_param("license_plate", "AB-12"))
        .and(query_param("start_date", "2025-07-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "license_plate": "AB-12",
            "reservation": { "id": 5, "place": { "name": "C3" } }
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let (manager, dispatcher) = host();
    let entry = manager.setup(config("De Kroon", "k", &server)).await.unwrap();
    let mut events = dispatcher.subscribe();

    let request = CommandRequest::new("query_plate")
        .with_param("plate", "AB-12")
        .with_param("start_date", "2025-07-01");
    assert!(dispatcher.fire(&request).await);

    let event = events.try_recv().unwrap();
    assert_eq!(event.topic, "campingcareha_query_license_plate");
    assert_eq!(event.instance_id, entry.id);
    assert_eq!(event.operation, Operation::QueryPlate);
    assert_eq!(event.request_params, request.params);

    let payload = serde_json::to_value(&event.result).unwrap();
    assert_eq!(payload[0]["reservation"]["place"]["name"], "C3");
}

#[tokio::test]
async fn test_fire_without_match_emits_nothing() {
    let server = MockServer::start().await;
    mount_version(&server, "k", 200).await;
    Mock::given(method("GET"))
        .and(path("/license_plates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let (manager, dispatcher) = host();
    manager.setup(config("De Kroon", "k", &server)).await.unwrap();
    let mut events = dispatcher.subscribe();

    let request = CommandRequest::new("query_plate").with_param("plate", "AB-12");
    assert!(!dispatcher.fire(&request).await);
    assert!(events.try_recv().is_err());

    let reply = dispatcher.call(&request).await;
    let error = reply.error.unwrap();
    assert_eq!(error.code, "not_found");
    assert_eq!(error.message, "no reservation found");
}

#[tokio::test]
async fn test_call_check_plate_and_reservation() {
    let server = MockServer::start().await;
    mount_version(&server, "k", 200).await;
    Mock::given(method("GET"))
        .and(path("/license_plates/check_plate"))
        .and(query_param("plate", "AB-12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "valid": false })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/reservations/901"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 901, "status": "arrived" })))
        .mount(&server)
        .await;

    let (manager, dispatcher) = host();
    manager.setup(config("De Kroon", "k", &server)).await.unwrap();

    let reply = dispatcher
        .call(&CommandRequest::new("check_plate").with_id(1).with_param("plate", "AB-12"))
        .await;
    assert_eq!(
        serde_json::to_value(&reply).unwrap(),
        json!({ "id": 1, "success": true, "result": { "valid": false } })
    );

    let reply = dispatcher
        .call(&CommandRequest::new("get_reservation").with_id(2).with_param("reservation_id", 901))
        .await;
    assert!(reply.success);
    assert_eq!(
        serde_json::to_value(&reply.result).unwrap(),
        json!({ "id": "901", "status": "arrived" })
    );
}

#[tokio::test]
async fn test_two_instances_need_an_explicit_target() {
    let server = MockServer::start().await;
    mount_version(&server, "k", 200).await;
    Mock::given(method("GET"))
        .and(path("/places"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let (manager, dispatcher) = host();
    let north = manager.setup(config("North", "k", &server)).await.unwrap();
    manager.setup(config("South", "k", &server)).await.unwrap();

    let reply = dispatcher.call(&CommandRequest::new("list_places")).await;
    assert_eq!(reply.error.unwrap().code, "ambiguous_instance");

    let reply = dispatcher
        .call(&CommandRequest::new("list_places").with_instance(north.id))
        .await;
    assert!(reply.success);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_calls_keep_their_ids() {
    let server = MockServer::start().await;
    mount_version(&server, "k", 200).await;
    for id in 1..=4 {
        Mock::given(method("GET"))
            .and(path(format!("/reservations/{id}")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "id": id }))
                    // Later requests answer first.
                    .set_delay(Duration::from_millis(200 / id)),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    let (manager, dispatcher) = host();
    manager.setup(config("De Kroon", "k", &server)).await.unwrap();

    let requests: Vec<CommandRequest> = (1..=4)
        .map(|id| {
            CommandRequest::new("get_reservation")
                .with_id(id)
                .with_param("reservation_id", id)
        })
        .collect();
    let replies = futures::future::join_all(requests.iter().map(|r| dispatcher.call(r))).await;

    for reply in replies {
        assert!(reply.success);
        let id = reply.id.unwrap();
        assert_eq!(
            serde_json::to_value(&reply.result).unwrap(),
            json!({ "id": id.to_string() })
        );
    }
}
