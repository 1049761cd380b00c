//! HTTP listener for a crawling unit
//!
//! - `GET|POST /crawl?url=..&depth=..` enqueues one URL (the peer protocol)
//! - `POST /enqueue` with `{"url": ".."}` enqueues one URL at depth 0
//! - `GET /healthz` reports frontier counters
//!
//! Every enqueue answers immediately with the admission outcome.

use crate::crawler::{Admission, Coordinator, HealthReport, Origin};
use crate::{RippleError, UrlError};
use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Debug, Deserialize)]
pub struct CrawlQuery {
    pub url: String,
    #[serde(default)]
    pub depth: u32,
}

#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnqueueResponse {
    pub url: String,
    pub status: String,
}

/// Builds the listener's routes around a shared coordinator
pub fn router(coordinator: Arc<Coordinator>) -> Router {
    Router::new()
        .route("/crawl", get(handle_crawl).post(handle_crawl))
        .route("/enqueue", post(handle_enqueue))
        .route("/healthz", get(handle_health))
        .layer(Extension(coordinator))
}

/// Serves the routes until `shutdown` resolves
pub async fn serve<F>(
    listener: TcpListener,
    coordinator: Arc<Coordinator>,
    shutdown: F,
) -> Result<(), RippleError>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(coordinator))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

pub async fn handle_crawl(
    Query(query): Query<CrawlQuery>,
    Extension(coordinator): Extension<Arc<Coordinator>>,
) -> (StatusCode, Json<EnqueueResponse>) {
    let result = coordinator.enqueue(&query.url, query.depth, Origin::Remote);
    admission_response(query.url, result)
}

pub async fn handle_enqueue(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Json(request): Json<EnqueueRequest>,
) -> (StatusCode, Json<EnqueueResponse>) {
    let result = coordinator.enqueue(&request.url, 0, Origin::Remote);
    admission_response(request.url, result)
}

pub async fn handle_health(
    Extension(coordinator): Extension<Arc<Coordinator>>,
) -> Json<HealthReport> {
    Json(coordinator.health())
}

fn admission_response(
    url: String,
    result: Result<Admission, UrlError>,
) -> (StatusCode, Json<EnqueueResponse>) {
    let (code, status) = match result {
        Ok(Admission::Accepted) => (StatusCode::ACCEPTED, "accepted"),
        Ok(Admission::Duplicate) => (StatusCode::OK, "duplicate"),
        Ok(Admission::DepthExceeded) => (StatusCode::OK, "too_deep"),
        Ok(Admission::QueueFull) => (StatusCode::SERVICE_UNAVAILABLE, "dropped"),
        Ok(Admission::Closed) => (StatusCode::SERVICE_UNAVAILABLE, "closed"),
        Err(e) => {
            tracing::debug!("Rejected enqueue of {}: {}", url, e);
            (StatusCode::BAD_REQUEST, "invalid_url")
        }
    };

    (
        code,
        Json(EnqueueResponse {
            url,
            status: status.to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        Config, CrawlerConfig, DispatchConfig, FilterConfig, OutputConfig, ServerConfig,
        UserAgentConfig,
    };
    use crate::crawler::SessionMode;
    use crate::storage::{SqliteStorage, Storage};
    use tokio::sync::oneshot;

    fn coordinator(queue_capacity: usize) -> Arc<Coordinator> {
        let config = Config {
            crawler: CrawlerConfig {
                queue_capacity,
                max_depth: 1,
                flush_interval_secs: 0,
                ..CrawlerConfig::default()
            },
            user_agent: UserAgentConfig {
                crawler_name: "TestCrawler".to_string(),
                crawler_version: "1.0".to_string(),
                contact_url: "https://example.com/about".to_string(),
                contact_email: "admin@example.com".to_string(),
            },
            filter: FilterConfig {
                allowed_hosts: vec!["a.test".to_string()],
                path_prefix: None,
                deny_segments: vec![],
            },
            output: OutputConfig {
                database_path: ":memory:".to_string(),
            },
            dispatch: DispatchConfig::default(),
            server: ServerConfig::default(),
            seeds: vec![],
        };
        let storage: Arc<dyn Storage> = Arc::new(SqliteStorage::new_in_memory().unwrap());
        Arc::new(Coordinator::new(&config, storage, "hash", SessionMode::Service).unwrap())
    }

    async fn crawl(coordinator: &Arc<Coordinator>, url: &str, depth: u32) -> (StatusCode, String) {
        let (code, Json(body)) = handle_crawl(
            Query(CrawlQuery {
                url: url.to_string(),
                depth,
            }),
            Extension(Arc::clone(coordinator)),
        )
        .await;
        (code, body.status)
    }

    #[tokio::test]
    async fn test_crawl_status_codes() {
        let coordinator = coordinator(1);

        assert_eq!(
            crawl(&coordinator, "https://a.test/one", 0).await,
            (StatusCode::ACCEPTED, "accepted".to_string())
        );
        assert_eq!(
            crawl(&coordinator, "https://a.test/one", 1).await,
            (StatusCode::OK, "duplicate".to_string())
        );
        assert_eq!(
            crawl(&coordinator, "https://a.test/deep", 2).await,
            (StatusCode::OK, "too_deep".to_string())
        );
        assert_eq!(
            crawl(&coordinator, "https://a.test/two", 0).await,
            (StatusCode::SERVICE_UNAVAILABLE, "dropped".to_string())
        );
        assert_eq!(
            crawl(&coordinator, "ftp://a.test/file", 0).await,
            (StatusCode::BAD_REQUEST, "invalid_url".to_string())
        );
    }

    #[tokio::test]
    async fn test_enqueue_after_close() {
        let coordinator = coordinator(10);
        coordinator.frontier().close();

        let (code, Json(body)) = handle_enqueue(
            Extension(Arc::clone(&coordinator)),
            Json(EnqueueRequest {
                url: "https://a.test/late".to_string(),
            }),
        )
        .await;
        assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.status, "closed");
    }

    #[tokio::test]
    async fn test_listener_round_trip() {
        let coordinator = coordinator(10);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let server = tokio::spawn(serve(listener, Arc::clone(&coordinator), async move {
            let _ = stop_rx.await;
        }));

        let client = reqwest::Client::new();
        let response = client
            .post(format!("http://{}/enqueue", addr))
            .json(&serde_json::json!({ "url": "https://a.test/page" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 202);

        let health: serde_json::Value = client
            .get(format!("http://{}/healthz", addr))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["pending"], 1);
        assert_eq!(health["mode"], "service");

        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
