use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio_util::sync::CancellationToken;

use crate::cgroup::ProcessPlacement;
use crate::container::Container;
use crate::service::{self, Warden};
use crate::telemetry::TelemetryProvider;

mod models;

pub use models::SimpleResult;

type SharedWarden<T> = State<Arc<Warden<T>>>;

async fn index() -> StatusCode {
    log::debug!("index");
    StatusCode::OK
}

async fn control<T: TelemetryProvider + 'static>(
    State(warden): SharedWarden<T>,
    Path(message): Path<String>,
) -> Response {
    match warden.control(&message).await {
        Ok(reply) => (StatusCode::OK, format!("{reply}\n")).into_response(),
        Err(err) => {
            log::warn!("control request failed: {}", err);
            let status = match &err {
                service::Error::Monitor(_) => StatusCode::CONFLICT,
                _ => StatusCode::BAD_REQUEST,
            };
            (status, format!("{err}\n")).into_response()
        }
    }
}

async fn process_container<T: TelemetryProvider + 'static>(
    State(warden): SharedWarden<T>,
    Path(pid): Path<String>,
) -> (StatusCode, Json<ProcessPlacement>) {
    match warden.locate_process(&pid) {
        Ok(placement) => {
            log::debug!(
                "process {} runs in container `{}` ({})",
                pid,
                placement.id,
                placement.path
            );
            (StatusCode::OK, Json(placement))
        }
        Err(err) => {
            log::warn!("failed to locate process: {}", err);
            (StatusCode::BAD_REQUEST, Json(ProcessPlacement::default()))
        }
    }
}

async fn register<T: TelemetryProvider + 'static>(
    State(warden): SharedWarden<T>,
    Path(cid): Path<String>,
) -> Json<SimpleResult> {
    Json(logged("register", &cid, warden.register(&cid).await))
}

async fn unregister<T: TelemetryProvider + 'static>(
    State(warden): SharedWarden<T>,
    Path(cid): Path<String>,
) -> Json<SimpleResult> {
    Json(logged("unregister", &cid, warden.unregister(&cid)))
}

async fn is_registered<T: TelemetryProvider + 'static>(
    State(warden): SharedWarden<T>,
    Path(cid): Path<String>,
) -> Json<SimpleResult> {
    Json(logged("isregistered", &cid, warden.is_registered(&cid)))
}

async fn status<T: TelemetryProvider + 'static>(
    State(warden): SharedWarden<T>,
    Path(cid): Path<String>,
) -> Json<Option<Container>> {
    Json(warden.status(&cid))
}

async fn set_cpu<T: TelemetryProvider + 'static>(
    State(warden): SharedWarden<T>,
    Path(cid): Path<String>,
) -> Json<SimpleResult> {
    Json(warden.set_cpu(&cid))
}

async fn set_cpuset<T: TelemetryProvider + 'static>(
    State(warden): SharedWarden<T>,
    Path(cid): Path<String>,
) -> Json<SimpleResult> {
    Json(warden.set_cpuset(&cid))
}

async fn reset_cpu<T: TelemetryProvider + 'static>(
    State(warden): SharedWarden<T>,
    Path(cid): Path<String>,
) -> Json<bool> {
    Json(warden.reset_cpu(&cid))
}

async fn reset_cpuset<T: TelemetryProvider + 'static>(
    State(warden): SharedWarden<T>,
    Path(cid): Path<String>,
) -> Json<bool> {
    Json(warden.reset_cpuset(&cid))
}

fn logged(operation: &str, cid: &str, result: SimpleResult) -> SimpleResult {
    log::info!(
        "{}: container_id={}, result={}, description={}",
        operation,
        cid,
        result.result,
        result.desc
    );
    result
}

/// The HTTP control surface of the warden.
pub struct APIServer {
    router: axum::Router,
}

impl APIServer {
    pub fn new<T: TelemetryProvider + 'static>(warden: Arc<Warden<T>>) -> Self {
        let router = axum::Router::new()
            .route("/", get(index))
            .route("/control/{msg}", get(control::<T>))
            .route("/api/process/getcontainer/{pid}", get(process_container::<T>))
            .route("/api/container/register/{cid}", get(register::<T>))
            .route("/api/container/unregister/{cid}", get(unregister::<T>))
            .route("/api/container/isregistered/{cid}", get(is_registered::<T>))
            .route("/api/container/status/{cid}", get(status::<T>))
            .route("/api/container/set/cpu/{cid}", get(set_cpu::<T>))
            .route("/api/container/set/cpuset/{cid}", get(set_cpuset::<T>))
            .route("/api/container/reset/cpu/{cid}", get(reset_cpu::<T>))
            .route("/api/container/reset/cpuset/{cid}", get(reset_cpuset::<T>))
            .with_state(warden);
        Self { router }
    }

    /// Serves requests on `listener` until `shutdown` is cancelled, then drains open
    /// connections.
    pub async fn listen(
        self,
        listener: tokio::net::TcpListener,
        shutdown: CancellationToken,
    ) -> std::io::Result<()> {
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
    }
}
