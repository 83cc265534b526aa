pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::pipeline::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/runs", post(handlers::handle_start_run))
        .route(
            "/api/v1/postings/process",
            post(handlers::handle_process_posting),
        )
        .route(
            "/api/v1/jobs/:source/:external_id",
            get(handlers::handle_get_job),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::classification::Capabilities;
    use crate::config::Config;
    use crate::pipeline::engine::JobPipeline;
    use crate::pipeline::ingestion::IngestionRunner;
    use crate::pipeline::prefilter::PostingFilter;
    use crate::scraper::SourceError;
    use crate::store::memory::MemoryJobStore;
    use crate::store::JobStore;
    use crate::testing::{posting, ScriptedClassifier, ScriptedExtractor, ScriptedSource, Step};

    fn app(source: ScriptedSource) -> Router {
        let config = Config::from_lookup(|key| match key {
            "JOB_STORE" => Some("memory".to_string()),
            "SCRAPER_URL" => Some("http://scraper".to_string()),
            _ => None,
        })
        .unwrap();
        let store: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());
        let capabilities = Capabilities::new(
            Arc::new(ScriptedClassifier::relevant()),
            Arc::new(ScriptedExtractor::new()),
            Duration::from_secs(60),
        );
        let pipeline = Arc::new(JobPipeline::new(
            PostingFilter::new(config.filter.clone()),
            capabilities,
            store.clone(),
        ));
        let runner = Arc::new(IngestionRunner::new(
            Arc::new(source),
            pipeline.clone(),
            store.clone(),
            "djinni",
        ));
        build_router(AppState {
            store,
            pipeline,
            runner,
            config,
        })
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(ScriptedSource::batches_of(vec![]))
            .oneshot(get("/health"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_run_returns_summary() {
        let source = ScriptedSource::batches_of(vec![vec![posting("1", "Dev"), posting("2", "Dev")]]);
        let response = app(source)
            .oneshot(post_json("/api/v1/runs", json!({"cv_text": "Rust", "max_postings": 10})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(
            body,
            json!({"total_scraped": 2, "total_filtered": 0, "total_processed": 2})
        );
    }

    #[tokio::test]
    async fn test_run_with_unreachable_scraper_is_bad_gateway() {
        let source = ScriptedSource::new(vec![Step::Fail(SourceError::Transport(
            "connection refused".to_string(),
        ))]);
        let response = app(source)
            .oneshot(post_json("/api/v1/runs", json!({"cv_text": "Rust"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(json_body(response).await["error"]["code"], "INGESTION_FAILED");
    }

    #[tokio::test]
    async fn test_process_then_lookup() {
        let app = app(ScriptedSource::batches_of(vec![]));
        let mut payload = serde_json::to_value(posting("77", "Rust Dev")).unwrap();
        payload["source"] = json!("");

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/v1/postings/process",
                json!({"posting": payload, "cv_text": "Rust"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let result = json_body(response).await;
        assert_eq!(result["status"], "accepted");
        assert_eq!(result["source"], "djinni");

        let response = app.clone().oneshot(get("/api/v1/jobs/djinni/77")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["title"], "Rust Dev");

        let response = app.oneshot(get("/api/v1/jobs/djinni/missing")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
