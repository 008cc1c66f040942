use std::time::Duration;

use crate::console::run_admin;
use crate::test::mock_transport::MockTransport;

#[tokio::test]
async fn test_toggle_then_quit() {
    super::init_tracing();

    let transport = MockTransport::new(Some(false));
    let (handle, worker) = crate::Builder::new().build_with(transport.clone());
    let worker = tokio::spawn(worker.wait());

    handle
        .wait_for_sync(Some(Duration::from_secs(1)))
        .await
        .unwrap();

    let mut out = Vec::new();
    run_admin(handle, &b"t\nq\nt\n"[..], &mut out, "Uno")
        .await
        .unwrap();
    worker.await.unwrap();

    let out = String::from_utf8(out).unwrap();
    let rendered: Vec<&str> = out.lines().filter(|l| l.starts_with('[')).collect();

    assert_eq!(rendered, vec!["[ ] Uno: OFF", "[x] Uno: ON"]);
    assert_eq!(
        transport.writes().await,
        vec![true],
        "nothing after quit is read"
    );
}

#[tokio::test]
async fn test_rejected_toggle_shows_old_state() {
    super::init_tracing();

    let transport = MockTransport::new(Some(true));
    transport.reject_writes(true).await;
    let (handle, worker) = crate::Builder::new().build_with(transport.clone());
    let worker = tokio::spawn(worker.wait());

    handle
        .wait_for_sync(Some(Duration::from_secs(1)))
        .await
        .unwrap();

    let mut out = Vec::new();
    run_admin(handle, &b"toggle\nwhat\n"[..], &mut out, "Uno")
        .await
        .unwrap();
    worker.await.unwrap();

    let out = String::from_utf8(out).unwrap();
    let rendered: Vec<&str> = out.lines().filter(|l| l.starts_with('[')).collect();

    assert_eq!(rendered, vec!["[x] Uno: ON", "[x] Uno: ON"]);
    assert_eq!(out.matches("Commands:").count(), 2, "{out}");
}
