//! Redirect policy scenarios.

use korra::engine::NO_FOLLOW;
use korra::results::{bin_path_for, read_all};
use korra::EngineConfig;

use crate::helpers::{run_session, write_script, Response, TestServer};

#[tokio::test]
async fn test_no_follow_records_the_redirect_as_success() {
    let server = TestServer::start(vec![Response::new(302).with_header("Location", "/next")]).await;
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(
        dir.path(),
        "redirect.txt",
        &format!("GET {}\n", server.url("/from")),
    );

    let config = EngineConfig {
        redirects: NO_FOLLOW,
        ..EngineConfig::default()
    };
    run_session(&script, &config).await;

    let results = read_all(&bin_path_for(&script)).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].code, 302);
    assert_eq!(results[0].error, "");
    // Only the original request went out.
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn test_default_policy_follows_and_records_the_final_url() {
    let server = TestServer::start(vec![
        Response::new(302).with_header("Location", "/next"),
        Response::new(200).with_body("landed"),
    ])
    .await;
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(
        dir.path(),
        "follow.txt",
        &format!("GET {}\n", server.url("/from")),
    );

    run_session(&script, &EngineConfig::default()).await;

    let results = read_all(&bin_path_for(&script)).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].code, 200);
    assert_eq!(results[0].error, "");
    assert_eq!(results[0].path, "/next");
    assert!(results[0].url.ends_with("/next"));
    assert_eq!(server.requests().len(), 2);
}

#[tokio::test]
async fn test_exceeding_the_redirect_limit_is_a_transport_error() {
    // Every response points at the next hop; a limit of 1 gives up.
    let server = TestServer::start(vec![
        Response::new(302).with_header("Location", "/hop1"),
        Response::new(302).with_header("Location", "/hop2"),
        Response::new(302).with_header("Location", "/hop3"),
    ])
    .await;
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(
        dir.path(),
        "loop.txt",
        &format!("GET {}\n", server.url("/from")),
    );

    let config = EngineConfig {
        redirects: 1,
        ..EngineConfig::default()
    };
    run_session(&script, &config).await;

    let results = read_all(&bin_path_for(&script)).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].code, 0);
    assert!(!results[0].error.is_empty());
}
