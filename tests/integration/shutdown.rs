//! Stop and quiesce scenarios.

use std::time::{Duration, Instant};

use korra::results::{bin_path_for, read_all};
use korra::session::DRAIN_WINDOW;
use korra::{Engine, EngineConfig, Session, SessionScript};

use crate::helpers::{write_script, Response, TestServer};

#[tokio::test]
async fn test_stop_mid_pause_yields_no_results() {
    let server = TestServer::start(vec![Response::new(200)]).await;
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(
        dir.path(),
        "interrupted.txt",
        &format!("PAUSE 60000\nGET {}\n", server.url("/z")),
    );

    let parsed = SessionScript::parse_file(&script).unwrap();
    let engine = Engine::new(&EngineConfig::default()).unwrap();
    let (log_tx, mut log_rx) = korra::logging::channel();
    tokio::spawn(async move { while log_rx.recv().await.is_some() {} });

    let (session, handle) = Session::new(script.clone(), parsed, engine, log_tx, false);
    let runner = tokio::spawn(session.run());

    tokio::time::sleep(Duration::from_millis(50)).await;
    let stopped = Instant::now();
    handle.stop();
    runner.await.unwrap();

    assert!(stopped.elapsed() < DRAIN_WINDOW);
    let results = read_all(&bin_path_for(&script)).unwrap();
    assert!(results.is_empty());
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn test_stop_drains_one_in_flight_result() {
    // The server sits on the response long enough for stop to land first.
    let server =
        TestServer::start(vec![Response::new(200).with_delay(Duration::from_millis(300))]).await;
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(
        dir.path(),
        "inflight.txt",
        &format!("GET {}\nPAUSE 60000\n", server.url("/slow")),
    );

    let parsed = SessionScript::parse_file(&script).unwrap();
    let engine = Engine::new(&EngineConfig::default()).unwrap();
    let (log_tx, mut log_rx) = korra::logging::channel();
    tokio::spawn(async move { while log_rx.recv().await.is_some() {} });

    let (session, handle) = Session::new(script.clone(), parsed, engine, log_tx, false);
    let runner = tokio::spawn(session.run());

    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.stop();
    runner.await.unwrap();

    // The in-flight hit completed inside the drain window and was written.
    let results = read_all(&bin_path_for(&script)).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].code, 200);
}

#[tokio::test]
async fn test_completed_session_ignores_stop() {
    let server = TestServer::start(vec![Response::new(200)]).await;
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(
        dir.path(),
        "finished.txt",
        &format!("GET {}\n", server.url("/done")),
    );

    let parsed = SessionScript::parse_file(&script).unwrap();
    let engine = Engine::new(&EngineConfig::default()).unwrap();
    let (log_tx, mut log_rx) = korra::logging::channel();
    tokio::spawn(async move { while log_rx.recv().await.is_some() {} });

    let (session, handle) = Session::new(script.clone(), parsed, engine, log_tx, false);
    session.run().await;

    handle.stop();
    handle.stop();

    let results = read_all(&bin_path_for(&script)).unwrap();
    assert_eq!(results.len(), 1);
    assert!(handle.progress().is_complete());
}
