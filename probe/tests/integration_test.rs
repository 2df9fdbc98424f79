//! Integration tests for the probe sequence
//!
//! These tests run the probes against an httpmock server standing in for
//! ejabberd's mod_http_api.

use std::time::Duration;

use assert_matches::assert_matches;
use httpmock::prelude::*;
use serde_json::json;

use auth::decode_token;
use probe_lib::{
    names, AdminClient, Credentials, ProbeConfig, ProbeFailure, ProbeReport, ProbeSuite, Verdict,
};

const JWK: &str =
    "eyJrdHkiOiJvY3QiLCJrIjoiWjBwYWMyTkxSVUl6TTNaWFpHVkhiVXAzZGpkVlNrcFNkMHhSVTJGdFkxRT0ifQ==";

/// `admin@ejabberd.local:secret`
const ADMIN_BASIC: &str = "Basic YWRtaW5AZWphYmJlcmQubG9jYWw6c2VjcmV0";

fn config_for(server: &MockServer) -> ProbeConfig {
    ProbeConfig::new(JWK)
        .with_endpoint("http", server.host(), server.port())
        .with_admin_password("secret")
        .with_user_password("pw")
        .with_timeout(2)
}

fn mint(config: &ProbeConfig) -> String {
    let minter = config.token_minter().expect("Failed to build minter");
    minter
        .mint(config.user_jid().unwrap().as_str())
        .expect("Failed to mint token")
}

async fn run(config: &ProbeConfig, token: &str) -> ProbeReport {
    let client = AdminClient::from_config(config).unwrap();
    ProbeSuite::new(config, client, token).unwrap().run().await
}

fn verdict(report: &ProbeReport, name: &str) -> Verdict {
    report
        .get(name)
        .unwrap_or_else(|| panic!("no outcome for {}", name))
        .verdict()
}

#[tokio::test]
async fn test_healthy_deployment_passes() {
    let server = MockServer::start_async().await;
    let config = config_for(&server);
    let token = mint(&config);
    let bearer = format!("Bearer {}", token);

    let api_root = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/");
            then.status(400).body("Missing command");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/admin/");
            then.status(401).body("Unauthorized");
        })
        .await;
    let status_basic = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/status").header("Authorization", ADMIN_BASIC);
            then.status(200).json_body(json!("The node ejabberd@localhost is started"));
        })
        .await;
    let status_bearer = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/status")
                .header("Authorization", bearer.as_str());
            then.status(200).json_body(json!("The node ejabberd@localhost is started"));
        })
        .await;
    let register = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/register")
                .header("Authorization", ADMIN_BASIC)
                .json_body(json!({"user": "test", "host": "ejabberd.local", "password": "pw"}));
            then.status(200)
                .json_body(json!("User test@ejabberd.local successfully registered"));
        })
        .await;
    let create_room = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/create_room")
                .header("Authorization", ADMIN_BASIC)
                .json_body(json!({
                    "name": "testroom",
                    "service": "conference.ejabberd.local",
                    "host": "ejabberd.local"
                }));
            then.status(200).json_body(json!(0));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/muc_online_rooms")
                .header("Authorization", ADMIN_BASIC)
                .json_body(json!({"service": "conference.ejabberd.local"}));
            then.status(200)
                .json_body(json!(["testroom@conference.ejabberd.local"]));
        })
        .await;
    let send_message = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/send_message")
                .header("Authorization", bearer.as_str())
                .json_body(json!({
                    "type": "groupchat",
                    "from": "test@ejabberd.local",
                    "to": "testroom@conference.ejabberd.local",
                    "subject": "",
                    "body": "JWT probe message"
                }));
            then.status(200).json_body(json!(0));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/get_room_options")
                .header("Authorization", ADMIN_BASIC);
            then.status(200)
                .json_body(json!([{"name": "title", "value": ""}]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/get_room_occupants")
                .header("Authorization", bearer.as_str());
            then.status(200).json_body(json!([
                {"jid": "test@ejabberd.local/probe", "nick": "test", "role": "participant"}
            ]));
        })
        .await;

    let report = run(&config, &token).await;

    for outcome in report.outcomes() {
        assert_eq!(outcome.verdict(), Verdict::Pass, "{}", outcome.summary_line());
    }
    assert_eq!(report.outcomes().len(), 12);
    assert!(report.all_passed());
    assert_eq!(report.summary(), "12 passed, 0 failed, 0 skipped");

    // Anonymous and tampered calls fall through to a 404
    assert_eq!(
        report.get(names::STATUS_ANONYMOUS).unwrap().failure().unwrap().status(),
        Some(404)
    );
    assert_eq!(
        report.get(names::STATUS_TAMPERED).unwrap().failure().unwrap().status(),
        Some(404)
    );

    assert_eq!(
        report.get(names::ADMIN_PAGE).unwrap().note.as_deref(),
        Some("requires authentication")
    );
    assert_eq!(
        report.get(names::ONLINE_ROOMS).unwrap().note.as_deref(),
        Some("testroom@conference.ejabberd.local listed")
    );
    assert_eq!(
        report.get(names::ROOM_OCCUPANTS).unwrap().note.as_deref(),
        Some("1 occupant(s)")
    );

    api_root.assert_async().await;
    status_basic.assert_async().await;
    status_bearer.assert_async().await;
    register.assert_async().await;
    create_room.assert_async().await;
    send_message.assert_async().await;
}

#[tokio::test]
async fn test_bearer_token_carries_user_identity() {
    let server = MockServer::start_async().await;
    let config = config_for(&server);
    let token = mint(&config);

    let decoded = decode_token(&token, &config.key_material().unwrap()).unwrap();
    assert_eq!(decoded.claims.identity, "test@ejabberd.local");
    assert_eq!(decoded.header.kid, None);
    assert!(!decoded.claims.is_expired());
}

#[tokio::test]
async fn test_failed_registration_skips_user_probes() {
    let server = MockServer::start_async().await;
    let config = config_for(&server);
    let token = mint(&config);

    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/register");
            then.status(500).json_body(json!({
                "status": "error",
                "code": 1,
                "message": "Registration not allowed"
            }));
        })
        .await;
    let send_message = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/send_message");
            then.status(200).json_body(json!(0));
        })
        .await;

    let report = run(&config, &token).await;

    assert_eq!(verdict(&report, names::REGISTER), Verdict::Fail);
    assert_eq!(
        report.get(names::REGISTER).unwrap().summary_line(),
        "❌ register: [500] Registration not allowed (code 1) (test@ejabberd.local)"
    );
    assert_eq!(verdict(&report, names::SEND_MESSAGE), Verdict::Skipped);
    assert_eq!(verdict(&report, names::ROOM_OCCUPANTS), Verdict::Skipped);
    // Independent probes still ran
    assert_eq!(verdict(&report, names::ROOM_OPTIONS), Verdict::Fail);
    assert_eq!(report.outcomes().len(), 12);
    assert!(!report.all_passed());
    assert_eq!(send_message.hits_async().await, 0);
}

#[tokio::test]
async fn test_already_registered_user_counts_as_registered() {
    let server = MockServer::start_async().await;
    let config = config_for(&server);
    let token = mint(&config);

    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/register");
            then.status(409).json_body(json!({
                "status": "error",
                "code": 10090,
                "message": "User test@ejabberd.local already registered"
            }));
        })
        .await;

    let report = run(&config, &token).await;

    assert_eq!(verdict(&report, names::REGISTER), Verdict::Pass);
    // gated probes ran, and failed against the unmocked endpoints
    assert_eq!(verdict(&report, names::SEND_MESSAGE), Verdict::Fail);
    assert_eq!(verdict(&report, names::ROOM_OCCUPANTS), Verdict::Fail);
}

#[tokio::test]
async fn test_missing_admin_password_skips_basic_probes() {
    let server = MockServer::start_async().await;
    let mut config = config_for(&server);
    config.admin_password = None;
    let token = mint(&config);

    let report = run(&config, &token).await;

    for name in [
        names::STATUS_BASIC,
        names::REGISTER,
        names::CREATE_ROOM,
        names::ONLINE_ROOMS,
        names::ROOM_OPTIONS,
        names::SEND_MESSAGE,
        names::ROOM_OCCUPANTS,
    ] {
        assert_eq!(verdict(&report, name), Verdict::Skipped, "{}", name);
    }
    assert_eq!(report.skipped(), 7);
}

#[tokio::test]
async fn test_anonymous_access_is_a_failure() {
    let server = MockServer::start_async().await;
    let config = config_for(&server);
    let token = mint(&config);

    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/status");
            then.status(200).json_body(json!("started"));
        })
        .await;

    let report = run(&config, &token).await;

    assert_eq!(verdict(&report, names::STATUS_ANONYMOUS), Verdict::Fail);
    assert_eq!(verdict(&report, names::STATUS_TAMPERED), Verdict::Fail);
    assert_eq!(verdict(&report, names::STATUS_BEARER), Verdict::Pass);
}

#[tokio::test]
async fn test_unreachable_server() {
    let config = ProbeConfig::new(JWK)
        .with_endpoint("http", "127.0.0.1", 1)
        .with_admin_password("secret")
        .with_user_password("pw")
        .with_timeout(2);
    let token = mint(&config);

    let report = run(&config, &token).await;

    assert_matches!(
        report.get(names::API_ROOT).unwrap().failure(),
        Some(ProbeFailure::Connect(_))
    );
    // A rejection needs an answer from the server
    assert_eq!(verdict(&report, names::STATUS_ANONYMOUS), Verdict::Fail);
    assert_eq!(report.passed(), 0);
    assert_eq!(report.skipped(), 2);
    assert_eq!(report.failed(), 10);
}

#[tokio::test]
async fn test_request_timeout() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/");
            then.status(200).delay(Duration::from_secs(3));
        })
        .await;

    let client = AdminClient::new(server.base_url(), Duration::from_secs(1)).unwrap();
    let result = client.get("/api/", &Credentials::None).await;

    assert_eq!(result, Err(ProbeFailure::Timeout));
}

#[tokio::test]
async fn test_basic_credentials_are_sent() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/status")
                .header("Authorization", ADMIN_BASIC)
                .json_body(json!({}));
            then.status(200).body("ok");
        })
        .await;

    let client = AdminClient::new(server.base_url(), Duration::from_secs(2)).unwrap();
    let response = client
        .call("status", &json!({}), &Credentials::basic("admin@ejabberd.local", "secret"))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body, "ok");
    mock.assert_async().await;
}
