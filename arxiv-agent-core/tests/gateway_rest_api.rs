//! Integration tests for the HTTP service endpoints.

use arxiv_agent_core::client::PaperSource;
use arxiv_agent_core::config::AppConfig;
use arxiv_agent_core::error::{SearchError, TransportError};
use arxiv_agent_core::gateway::{AppState, SharedState, router};
use arxiv_agent_core::storage::FileStorage;
use arxiv_agent_core::types::{PaperRecord, SearchRequest};
use async_trait::async_trait;
use axum::body::Body;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt;

/// Canned source that records every request it receives.
struct MockSource {
    papers: Vec<PaperRecord>,
    fail: bool,
    requests: Mutex<Vec<SearchRequest>>,
}

impl MockSource {
    fn new(papers: Vec<PaperRecord>) -> Self {
        Self {
            papers,
            fail: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }

    fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaperSource for MockSource {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<PaperRecord>, SearchError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(TransportError::Connection {
                url: "http://mock".into(),
                message: "connection refused".into(),
            }
            .into());
        }
        Ok(self.papers.clone())
    }
}

fn paper(title: &str, published: &str) -> PaperRecord {
    PaperRecord {
        title: title.into(),
        authors: vec!["Jane Roe".into()],
        summary: format!("About {title}."),
        published: Some(published.parse().unwrap()),
        updated: None,
        id: format!("http://arxiv.org/abs/{}", title.to_lowercase()),
        pdf_url: None,
        categories: ["cs.AI".to_string()].into_iter().collect(),
    }
}

fn sample_papers() -> Vec<PaperRecord> {
    vec![
        paper("Beta", "2024-01-01T00:00:00Z"),
        paper("Alpha", "2024-02-01T00:00:00Z"),
    ]
}

fn make_state(source: Arc<MockSource>) -> (SharedState, TempDir) {
    let dir = TempDir::new().unwrap();
    let storage = Arc::new(FileStorage::new(dir.path(), 50).unwrap());
    let state = Arc::new(AppState::new(source, storage, &AppConfig::default()));
    (state, dir)
}

fn make_request(method: &str, uri: &str, body: Option<serde_json::Value>) -> axum::http::Request<Body> {
    let builder = axum::http::Request::builder().method(method).uri(uri);
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(
    state: &SharedState,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (axum::http::StatusCode, serde_json::Value) {
    let app = router(state.clone());
    let resp = ServiceExt::<axum::http::Request<Body>>::oneshot(app, make_request(method, uri, body))
        .await
        .unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), 1_000_000)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    (status, json)
}

// --- /health ---

#[tokio::test]
async fn test_health() {
    let (state, _dir) = make_state(Arc::new(MockSource::new(vec![])));
    let (status, json) = send(&state, "GET", "/health", None).await;
    assert_eq!(status, 200);
    assert_eq!(json["status"], "ok");
}

// --- /papers/by-author ---

#[tokio::test]
async fn test_author_search_success() {
    let source = Arc::new(MockSource::new(sample_papers()));
    let (state, _dir) = make_state(source.clone());
    let (status, json) = send(
        &state,
        "POST",
        "/papers/by-author",
        Some(serde_json::json!({"author_id": "  Jane Roe ", "max_results": 10})),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(json["success"], true);
    assert_eq!(json["count"], 2);
    assert_eq!(json["papers"][0]["title"], "Beta");
    assert_eq!(json["papers"][0]["published"], "2024-01-01T00:00:00Z");
    assert_eq!(source.requests(), vec![SearchRequest::author("Jane Roe", 10)]);
}

#[tokio::test]
async fn test_author_search_default_max_results() {
    let source = Arc::new(MockSource::new(vec![]));
    let (state, _dir) = make_state(source.clone());
    let (status, json) = send(
        &state,
        "POST",
        "/papers/by-author",
        Some(serde_json::json!({"author_id": "Hinton"})),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(json["count"], 0);
    assert_eq!(source.requests(), vec![SearchRequest::author("Hinton", 50)]);
}

#[tokio::test]
async fn test_author_search_sorted_by_title() {
    let (state, _dir) = make_state(Arc::new(MockSource::new(sample_papers())));
    let (_, json) = send(
        &state,
        "POST",
        "/papers/by-author",
        Some(serde_json::json!({"author_id": "Roe", "sort_by": "title", "sort_order": "asc"})),
    )
    .await;
    assert_eq!(json["papers"][0]["title"], "Alpha");
    assert_eq!(json["papers"][1]["title"], "Beta");
}

#[tokio::test]
async fn test_author_search_validation_errors() {
    let source = Arc::new(MockSource::new(sample_papers()));
    let (state, _dir) = make_state(source.clone());

    for body in [
        serde_json::json!({"author_id": "Roe", "max_results": 0}),
        serde_json::json!({"author_id": "Roe", "max_results": 101}),
        serde_json::json!({"author_id": "   "}),
        serde_json::json!({"author_id": "Roe", "sort_by": "citations"}),
        serde_json::json!({"max_results": 5}),
    ] {
        let (status, json) = send(&state, "POST", "/papers/by-author", Some(body)).await;
        assert_eq!(status, 400);
        assert_eq!(json["success"], false);
        assert_eq!(json["kind"], "validation");
    }
    assert!(source.requests().is_empty());
}

#[tokio::test]
async fn test_transport_failure_is_not_empty_result() {
    let (state, _dir) = make_state(Arc::new(MockSource::failing()));
    let (status, json) = send(
        &state,
        "POST",
        "/papers/by-author",
        Some(serde_json::json!({"author_id": "Roe"})),
    )
    .await;
    assert_eq!(status, 502);
    assert_eq!(json["success"], false);
    assert_eq!(json["kind"], "transport");
    assert!(json.get("papers").is_none());
}

// --- /papers/daily ---

#[tokio::test]
async fn test_daily_served_from_cache_second_time() {
    let source = Arc::new(MockSource::new(sample_papers()));
    let (state, _dir) = make_state(source.clone());
    let body = serde_json::json!({"categories": ["cs.AI", "cs.LG"]});

    let (status, first) = send(&state, "POST", "/papers/daily", Some(body.clone())).await;
    assert_eq!(status, 200);
    assert_eq!(first["cached"], false);
    assert_eq!(first["count"], 2);

    let (_, second) = send(&state, "POST", "/papers/daily", Some(body)).await;
    assert_eq!(second["cached"], true);
    assert_eq!(second["papers"], first["papers"]);
    assert_eq!(source.requests().len(), 1);
}

#[tokio::test]
async fn test_daily_removes_hidden_categories() {
    let source = Arc::new(MockSource::new(vec![]));
    let (state, _dir) = make_state(source.clone());

    let (status, _) = send(
        &state,
        "PUT",
        "/categories/ada",
        Some(serde_json::json!({"hidden": ["cs.CV"]})),
    )
    .await;
    assert_eq!(status, 200);

    send(
        &state,
        "POST",
        "/papers/daily",
        Some(serde_json::json!({"categories": ["cs.AI", "cs.CV"], "user_id": "ada"})),
    )
    .await;
    assert_eq!(
        source.requests(),
        vec![SearchRequest::daily(vec!["cs.AI".into()], None)]
    );
}

#[tokio::test]
async fn test_daily_all_hidden_skips_fetch() {
    let source = Arc::new(MockSource::new(sample_papers()));
    let (state, _dir) = make_state(source.clone());
    send(
        &state,
        "PUT",
        "/categories/ada",
        Some(serde_json::json!({"hidden": ["cs.CV"]})),
    )
    .await;

    let (status, json) = send(
        &state,
        "POST",
        "/papers/daily",
        Some(serde_json::json!({"categories": ["cs.CV"], "user_id": "ada"})),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(json["count"], 0);
    assert!(source.requests().is_empty());
}

#[tokio::test]
async fn test_daily_blank_entry_does_not_unhide_categories() {
    let source = Arc::new(MockSource::new(sample_papers()));
    let (state, _dir) = make_state(source.clone());
    send(
        &state,
        "PUT",
        "/categories/ada",
        Some(serde_json::json!({"hidden": ["cs.CV"]})),
    )
    .await;

    let (status, json) = send(
        &state,
        "POST",
        "/papers/daily",
        Some(serde_json::json!({"categories": ["cs.CV", "", "  "], "user_id": "ada"})),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(json["count"], 0);
    assert!(source.requests().is_empty());
}

#[tokio::test]
async fn test_daily_invalid_category_rejected() {
    let (state, _dir) = make_state(Arc::new(MockSource::new(vec![])));
    let (status, json) = send(
        &state,
        "POST",
        "/papers/daily",
        Some(serde_json::json!({"categories": ["cs.AI OR all:*"]})),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(json["kind"], "validation");
}

// --- /profile ---

#[tokio::test]
async fn test_profile_roundtrip() {
    let (state, _dir) = make_state(Arc::new(MockSource::new(vec![])));

    let (status, json) = send(&state, "GET", "/profile/ada", None).await;
    assert_eq!(status, 200);
    assert_eq!(json["profile"]["user_id"], "ada");
    assert_eq!(json["profile"]["interests"], serde_json::json!([]));

    let (status, _) = send(
        &state,
        "POST",
        "/profile",
        Some(serde_json::json!({
            "user_id": "ada",
            "interests": ["nlp", " nlp "],
            "favorite_authors": ["Yoshua Bengio"]
        })),
    )
    .await;
    assert_eq!(status, 200);

    let (_, json) = send(&state, "GET", "/profile/ada", None).await;
    assert_eq!(json["profile"]["interests"], serde_json::json!(["nlp"]));
    assert_eq!(json["profile"]["favorite_authors"][0], "Yoshua Bengio");

    let (_, json) = send(&state, "GET", "/profiles", None).await;
    assert_eq!(json["profiles"], serde_json::json!(["ada"]));
}

#[tokio::test]
async fn test_profile_rejects_unsafe_user_id() {
    let (state, _dir) = make_state(Arc::new(MockSource::new(vec![])));
    let (status, json) = send(
        &state,
        "POST",
        "/profile",
        Some(serde_json::json!({"user_id": "../../etc/passwd"})),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(json["kind"], "validation");
}

// --- /categories ---

#[tokio::test]
async fn test_categories_default_empty() {
    let (state, _dir) = make_state(Arc::new(MockSource::new(vec![])));
    let (status, json) = send(&state, "GET", "/categories/nobody", None).await;
    assert_eq!(status, 200);
    assert_eq!(json["hidden"], serde_json::json!([]));
}

// --- /history ---

#[tokio::test]
async fn test_history_records_searches_newest_first() {
    let (state, _dir) = make_state(Arc::new(MockSource::new(sample_papers())));
    send(
        &state,
        "POST",
        "/papers/by-author",
        Some(serde_json::json!({"author_id": "Hinton", "user_id": "ada"})),
    )
    .await;
    send(
        &state,
        "POST",
        "/papers/daily",
        Some(serde_json::json!({"categories": ["cs.AI"]})),
    )
    .await;

    let (status, json) = send(&state, "GET", "/history?limit=10", None).await;
    assert_eq!(status, 200);
    assert_eq!(json["count"], 2);
    assert_eq!(json["history"][0]["mode"], "daily");
    assert_eq!(
        json["history"][0]["query"],
        "cat:cs.AI AND submittedDate:[now-3d TO now]"
    );
    assert_eq!(json["history"][1]["mode"], "author");
    assert_eq!(json["history"][1]["user_id"], "ada");
    assert_eq!(json["history"][1]["result_count"], 2);

    let (_, json) = send(&state, "GET", "/history?limit=1", None).await;
    assert_eq!(json["count"], 1);
}

#[tokio::test]
async fn test_history_bad_limit_rejected() {
    let (state, _dir) = make_state(Arc::new(MockSource::new(vec![])));
    let (status, json) = send(&state, "GET", "/history?limit=lots", None).await;
    assert_eq!(status, 400);
    assert_eq!(json["kind"], "validation");
}
