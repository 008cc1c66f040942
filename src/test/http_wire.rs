use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tokio::sync::Mutex;

use crate::HandleError;
use crate::flag::FlagUpdate;

#[derive(Clone)]
struct FlagService {
    flag: Arc<Mutex<bool>>,
    reject_writes: bool,
}

async fn get_flags(State(service): State<FlagService>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "feature-flag-1": *service.flag.lock().await }))
}

async fn post_flags(
    State(service): State<FlagService>,
    Json(update): Json<FlagUpdate>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if service.reject_writes {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    *service.flag.lock().await = update.state;
    Ok(Json(serde_json::json!({ "success": true })))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

fn flag_routes(service: FlagService) -> Router {
    Router::new()
        .route("/api/flags", get(get_flags).post(post_flags))
        .route("/api/health", get(health))
        .with_state(service)
}

/// Serve a flag on a random local port, returning its base URL.
async fn serve(service: FlagService) -> String {
    serve_app(flag_routes(service)).await
}

async fn serve_app(app: Router) -> String {

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{address}")
}

#[tokio::test]
async fn test_read_toggle_health() {
    super::init_tracing();

    let flag = Arc::new(Mutex::new(true));
    let endpoint = serve(FlagService {
        flag: flag.clone(),
        reject_writes: false,
    })
    .await;

    let (handle, worker) = crate::Builder::new()
        .set_endpoint(Some(endpoint))
        .build()
        .await
        .unwrap();
    let worker = tokio::spawn(worker.wait());

    let state = handle
        .wait_for_sync(Some(Duration::from_secs(5)))
        .await
        .unwrap();
    assert!(state.enabled);
    assert!(state.last_synced.is_some());

    assert!(!handle.toggle().await.unwrap());
    assert!(!*flag.lock().await, "the service received the negated value");

    assert!(handle.health().await.unwrap().is_ok());

    drop(handle);
    worker.await.unwrap();
}

#[tokio::test]
async fn test_non_ok_write() {
    super::init_tracing();

    let flag = Arc::new(Mutex::new(false));
    let endpoint = serve(FlagService {
        flag: flag.clone(),
        reject_writes: true,
    })
    .await;

    let (handle, worker) = crate::Builder::new()
        .set_endpoint(Some(endpoint))
        .build()
        .await
        .unwrap();
    let worker = tokio::spawn(worker.wait());

    handle
        .wait_for_sync(Some(Duration::from_secs(5)))
        .await
        .unwrap();

    let result = handle.toggle().await;
    assert!(matches!(result, Err(HandleError::Write(_))), "{result:?}");
    assert!(!handle.enabled().await.unwrap());
    assert!(!*flag.lock().await);

    drop(handle);
    worker.await.unwrap();
}

#[tokio::test]
async fn test_unreachable_service_settles() {
    super::init_tracing();

    // Grab a free port, then close it again.
    let address = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let (handle, worker) = crate::Builder::new()
        .set_endpoint(Some(format!("http://{address}")))
        .set_timeout(Some(Duration::from_millis(500)))
        .build()
        .await
        .unwrap();
    let worker = tokio::spawn(worker.wait());

    let state = handle
        .wait_for_sync(Some(Duration::from_secs(5)))
        .await
        .unwrap();
    assert!(!state.loading);
    assert!(!state.enabled);
    assert!(handle.health().await.is_err());

    drop(handle);
    worker.await.unwrap();
}

#[tokio::test]
async fn test_endpoint_with_base_path() {
    super::init_tracing();

    let flag = Arc::new(Mutex::new(false));
    let root = serve_app(Router::new().nest(
        "/flags-svc",
        flag_routes(FlagService {
            flag: flag.clone(),
            reject_writes: false,
        }),
    ))
    .await;

    let (handle, worker) = crate::Builder::new()
        .set_endpoint(Some(format!("{root}/flags-svc/")))
        .build()
        .await
        .unwrap();
    let worker = tokio::spawn(worker.wait());

    let state = handle
        .wait_for_sync(Some(Duration::from_secs(5)))
        .await
        .unwrap();
    assert!(state.last_synced.is_some(), "the nested route was reached");

    assert!(handle.toggle().await.unwrap());
    assert!(*flag.lock().await);
    assert!(handle.health().await.unwrap().is_ok());

    drop(handle);
    worker.await.unwrap();
}
