use std::time::Duration;

use crate::HandleError;
use crate::test::mock_transport::MockTransport;

#[tokio::test(start_paused = true)]
async fn test_sends_negation_and_commits() {
    super::init_tracing();

    let transport = MockTransport::new(Some(false));
    let (handle, worker) = crate::Builder::new().build_with(transport.clone());
    let worker = tokio::spawn(worker.wait());

    handle.wait_for_sync(None).await.unwrap();

    assert!(handle.toggle().await.unwrap());
    assert!(handle.enabled().await.unwrap());

    assert!(!handle.toggle().await.unwrap());
    assert!(!handle.enabled().await.unwrap());

    assert_eq!(transport.writes().await, vec![true, false]);

    drop(handle);
    worker.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_rejected_write_leaves_state() {
    super::init_tracing();

    let transport = MockTransport::new(Some(false));
    let (handle, worker) = crate::Builder::new().build_with(transport.clone());
    let worker = tokio::spawn(worker.wait());

    let before = handle.wait_for_sync(None).await.unwrap();
    transport.reject_writes(true).await;

    let result = handle.toggle().await;
    assert!(matches!(result, Err(HandleError::Write(_))), "{result:?}");

    assert_eq!(transport.writes().await, vec![true]);
    assert_eq!(handle.state().await.unwrap(), before);

    drop(handle);
    worker.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_toggle_waits_behind_a_slow_poll() {
    super::init_tracing();

    let transport = MockTransport::new(Some(false)).with_delay(Duration::from_secs(2));
    let (handle, worker) = crate::Builder::new().build_with(transport.clone());
    let worker = tokio::spawn(worker.wait());

    // Let the startup poll begin, then queue a toggle behind it.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(transport.fetches(), 1);

    assert!(handle.toggle().await.unwrap());

    let state = handle.state().await.unwrap();
    assert!(state.enabled, "the earlier poll must not undo the toggle");
    assert!(!state.loading);

    drop(handle);
    worker.await.unwrap();
}
