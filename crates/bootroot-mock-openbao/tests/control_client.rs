//! Control Client Tests
//!
//! Runs the simulator on a real loopback socket and drives it through
//! `ControlClient`, the way an external test driver would.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use bootroot_mock_openbao::{
    ClientError, ControlClient, MockOpenBao, SecretItem, SecretKey, SimulatorConfig,
};
use reqwest::StatusCode;

async fn start() -> (bootroot_mock_openbao::RunningServer, ControlClient) {
    let server = MockOpenBao::new(SimulatorConfig::ephemeral())
        .spawn()
        .await
        .expect("server should bind");
    let client = ControlClient::new(server.base_url());
    (server, client)
}

#[tokio::test]
async fn test_login_and_health_over_socket() {
    let (server, client) = start().await;

    assert!(server.addr.port() != 0);
    assert!(client.health().await.unwrap());
    assert_eq!(client.login().await.unwrap(), "mock-client-token");

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_rotation_then_failure_then_recovery() {
    let (server, client) = start().await;

    let first = client.read_secret("edge-proxy", SecretItem::SecretId).await.unwrap();
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.data().unwrap()["secret_id"], "synced-secret-id-edge-proxy-v1");

    client.set_version("edge-proxy", SecretItem::SecretId, 2).await.unwrap();
    client.fail_next("edge-proxy", SecretItem::SecretId, 2).await.unwrap();

    for _ in 0..2 {
        let read = client.read_secret("edge-proxy", SecretItem::SecretId).await.unwrap();
        assert_eq!(read.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(read.data().is_none());
    }

    let recovered = client.read_secret("edge-proxy", SecretItem::SecretId).await.unwrap();
    assert_eq!(recovered.status, StatusCode::OK);
    assert_eq!(recovered.data().unwrap()["secret_id"], "synced-secret-id-edge-proxy-v2");

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_rejected_control_call_surfaces_status() {
    let (server, client) = start().await;

    let err = client.set_version("", SecretItem::Trust, 1).await.unwrap_err();
    match err {
        ClientError::Status { status, body, .. } => {
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(body["errors"][0].as_str().unwrap().contains("service"));
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = client.set_version("api", SecretItem::Trust, 0).await.unwrap_err();
    assert!(matches!(err, ClientError::Status { status, .. } if status == StatusCode::BAD_REQUEST));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_reset_is_visible_through_shared_state() {
    let (server, client) = start().await;

    client.set_version("api", SecretItem::Eab, 6).await.unwrap();
    client.fail_next("api", SecretItem::Trust, 3).await.unwrap();
    assert_eq!(server.state.with_store(|store| store.tracked_keys()), 2);
    assert_eq!(
        server
            .state
            .with_store(|store| store.state(&SecretKey::new("api", SecretItem::Trust)))
            .pending_failures,
        3
    );

    client.reset().await.unwrap();
    assert_eq!(server.state.with_store(|store| store.tracked_keys()), 0);

    let read = client.read_secret("api", SecretItem::Eab).await.unwrap();
    assert_eq!(read.data().unwrap()["kid"], "synced-kid-api-v1");

    server.shutdown().await.unwrap();
}
