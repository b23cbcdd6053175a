//! Polling loop scenarios: retry-until-status and budget exhaustion.

use std::time::Instant;

use korra::results::{bin_path_for, read_all};
use korra::EngineConfig;

use crate::helpers::{run_session, write_script, Response, TestServer};

#[tokio::test]
async fn test_poll_retries_until_status_matches() {
    let server =
        TestServer::start(vec![Response::new(500), Response::new(500), Response::new(200)]).await;
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(
        dir.path(),
        "poll.txt",
        &format!(
            "POLL GET {}\n[status=^200$ count=3 wait=10]\n",
            server.url("/poll")
        ),
    );

    let started = Instant::now();
    run_session(&script, &EngineConfig::default()).await;

    let results = read_all(&bin_path_for(&script)).unwrap();
    let codes: Vec<u16> = results.iter().map(|r| r.code).collect();
    let counts: Vec<i32> = results.iter().map(|r| r.request_count).collect();
    assert_eq!(codes, vec![500, 500, 200]);
    assert_eq!(counts, vec![1, 2, 3]);
    // Two inter-poll waits of 10 ms happened.
    assert!(started.elapsed().as_millis() >= 20);
}

#[tokio::test]
async fn test_poll_budget_is_exhausted_after_count_attempts() {
    let server = TestServer::start(vec![
        Response::new(500),
        Response::new(500),
        Response::new(500),
        Response::new(200),
    ])
    .await;
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(
        dir.path(),
        "exhaust.txt",
        &format!(
            "POLL GET {}\n[status=^200$ count=2 wait=10]\nCOMMENT moved on\n",
            server.url("/stuck")
        ),
    );

    let (log_tx, mut log_rx) = korra::logging::channel();
    let engine = korra::Engine::new(&EngineConfig::default()).unwrap();
    let parsed = korra::SessionScript::parse_file(&script).unwrap();
    let (session, handle) = korra::Session::new(script.clone(), parsed, engine, log_tx, false);
    session.run().await;

    // Exactly two attempts were made, both failing, and the session
    // advanced past the polled request.
    let results = read_all(&bin_path_for(&script)).unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.code == 500));
    assert_eq!(
        results.iter().map(|r| r.request_count).collect::<Vec<_>>(),
        vec![1, 2]
    );
    assert!(handle.progress().is_complete());

    let mut saw_comment = false;
    while let Some(line) = log_rx.recv().await {
        if line.contains("moved on") {
            saw_comment = true;
        }
    }
    assert!(saw_comment);
}

#[tokio::test]
async fn test_inactive_poll_params_do_not_retry() {
    // A polling block without the POLL prefix parses but stays inert.
    let server = TestServer::start(vec![Response::new(500), Response::new(500)]).await;
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(
        dir.path(),
        "inert.txt",
        &format!("GET {}\n[status=^200$ count=5 wait=10]\n", server.url("/once")),
    );

    run_session(&script, &EngineConfig::default()).await;

    let results = read_all(&bin_path_for(&script)).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].code, 500);
}
