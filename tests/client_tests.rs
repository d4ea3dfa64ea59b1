//! ManifestClient tests against a local mock server.

mod test_utils;

use hypdl::{Error, ManifestClient};
use std::time::Duration;
use test_utils::{manifest_json, MockGame, MockPackage, MockVersion};

const TIMEOUT: Duration = Duration::from_secs(5);

fn sample_manifest() -> String {
    let major = MockVersion::new("2.3.0")
        .with_game(MockPackage::game("https://cdn.example.com/game.zip", b"data"));
    manifest_json(&[MockGame::new("abc", major)])
}

#[test]
fn test_fetch_success() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/getGamePackages")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(sample_manifest())
        .expect(1)
        .create();

    let client =
        ManifestClient::new(format!("{}/getGamePackages", server.url()), TIMEOUT, 3).unwrap();
    let manifest = client.fetch().unwrap();

    assert_eq!(manifest.games.len(), 1);
    assert_eq!(manifest.games[0].id, "abc");
    mock.assert();
}

#[test]
fn test_server_error_exhausts_attempts() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/getGamePackages")
        .with_status(503)
        .expect(3)
        .create();

    let client =
        ManifestClient::new(format!("{}/getGamePackages", server.url()), TIMEOUT, 3).unwrap();
    let err = client.fetch().unwrap_err();

    match err {
        Error::ManifestUnavailable {
            attempts,
            last_error,
        } => {
            assert_eq!(attempts, 3);
            assert!(last_error.contains("503"), "got: {}", last_error);
        }
        other => panic!("expected ManifestUnavailable, got {:?}", other),
    }
    mock.assert();
}

#[test]
fn test_malformed_body_is_retried() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/getGamePackages")
        .with_status(200)
        .with_body("<html>maintenance</html>")
        .expect(2)
        .create();

    let client =
        ManifestClient::new(format!("{}/getGamePackages", server.url()), TIMEOUT, 2).unwrap();
    let err = client.fetch().unwrap_err();

    assert!(matches!(err, Error::ManifestUnavailable { attempts: 2, .. }));
    mock.assert();
}

#[test]
fn test_api_error_code_is_retried() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/getGamePackages")
        .with_status(200)
        .with_body(r#"{"retcode": -500, "message": "system busy", "data": null}"#)
        .expect(3)
        .create();

    let client =
        ManifestClient::new(format!("{}/getGamePackages", server.url()), TIMEOUT, 3).unwrap();
    let err = client.fetch().unwrap_err();

    assert!(err.to_string().contains("system busy"));
    mock.assert();
}

#[test]
fn test_connection_refused() {
    // Nothing listens on port 9 (discard) in the test environment
    let client = ManifestClient::new("http://127.0.0.1:9/manifest", TIMEOUT, 2).unwrap();
    let err = client.fetch().unwrap_err();

    assert!(matches!(err, Error::ManifestUnavailable { attempts: 2, .. }));
}

#[test]
fn test_zero_attempts_still_tries_once() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/getGamePackages")
        .with_status(200)
        .with_body(sample_manifest())
        .expect(1)
        .create();

    let client =
        ManifestClient::new(format!("{}/getGamePackages", server.url()), TIMEOUT, 0).unwrap();
    assert!(client.fetch().is_ok());
    mock.assert();
}
