use std::time::Duration;

use reqwest::Client;
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use news_core::{ApiClient, ArticlesQuery, ClientConfig, ClientError, FetchError};

fn test_config() -> ClientConfig {
    ClientConfig {
        fetch_timeout: Duration::from_millis(500),
        status_poll_timeout: Duration::from_millis(300),
        base_backoff: Duration::from_millis(20),
        ..ClientConfig::default()
    }
}

fn api_for(server: &MockServer) -> ApiClient {
    ApiClient::new(
        Client::new(),
        Url::parse(&server.uri()).unwrap(),
        test_config(),
    )
    .unwrap()
}

fn article_json(id: u64) -> serde_json::Value {
    json!({
        "id": id,
        "title": format!("Article {id}"),
        "summary": "Summary text",
        "source": "Example News",
        "category": "tech",
        "url": format!("http://example.com/{id}"),
        "created_at": "2026-08-23T10:00:00Z",
        "view_count": 12,
        "audio_play_count": 1,
        "has_audio": false
    })
}

fn articles_body(ids: &[u64]) -> serde_json::Value {
    json!({
        "articles": ids.iter().map(|id| article_json(*id)).collect::<Vec<_>>(),
        "total": ids.len(),
        "has_more": false,
        "processing_status": "normal"
    })
}

#[tokio::test]
async fn articles_success_parses_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/channel/articles"))
        .and(query_param("limit", "20"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(articles_body(&[1, 2])))
        .mount(&server)
        .await;

    let api = api_for(&server);
    let page = api.fetch_articles(&ArticlesQuery::default()).await.unwrap();
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].id, 1);
    assert_eq!(page.total, 2);
    assert!(!page.has_more);
}

#[tokio::test]
async fn category_filter_is_forwarded_but_all_is_not() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/channel/articles"))
        .and(query_param("category", "sport"))
        .respond_with(ResponseTemplate::new(200).set_body_json(articles_body(&[7])))
        .mount(&server)
        .await;

    let api = api_for(&server);
    let query = ArticlesQuery {
        category: Some("sport".into()),
        ..ArticlesQuery::default()
    };
    let page = api.fetch_articles(&query).await.unwrap();
    assert_eq!(page.items[0].id, 7);

    // "all" maps to no category parameter; the mock above requires one, so
    // this request must not match it.
    let query = ArticlesQuery {
        category: Some("all".into()),
        ..ArticlesQuery::default()
    };
    let err = api.fetch_articles(&query).await.unwrap_err();
    assert!(matches!(err, FetchError::Http { .. }));
}

#[tokio::test]
async fn non_2xx_is_classified_as_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/channel/trending"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let api = api_for(&server);
    let err = api.fetch_trending().await.unwrap_err();
    match err {
        FetchError::Http { status } => assert_eq!(status.as_u16(), 503),
        other => panic!("expected http error, got {other:?}"),
    }
}

#[tokio::test]
async fn processing_marker_wins_over_2xx_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/channel/articles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "articles": [article_json(1)],
            "total": 1,
            "has_more": false,
            "processing_status": "processing"
        })))
        .mount(&server)
        .await;

    let api = api_for(&server);
    let err = api.fetch_articles(&ArticlesQuery::default()).await.unwrap_err();
    assert!(matches!(err, FetchError::ServerBusy));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn empty_item_set_is_a_failure_not_a_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/channel/articles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "articles": [],
            "total": 0,
            "has_more": false
        })))
        .mount(&server)
        .await;

    let api = api_for(&server);
    let err = api.fetch_articles(&ArticlesQuery::default()).await.unwrap_err();
    assert!(matches!(err, FetchError::EmptyPayload));
}

#[tokio::test]
async fn malformed_body_fails_schema_validation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/channel/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{ not json"))
        .mount(&server)
        .await;

    let api = api_for(&server);
    let err = api.fetch_latest().await.unwrap_err();
    assert!(matches!(err, FetchError::EmptyPayload));
}

#[tokio::test]
async fn slow_response_yields_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/channel/dashboard-data"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(3))
                .set_body_json(json!({"weather": {"temperature": "8"}})),
        )
        .mount(&server)
        .await;

    let api = api_for(&server);
    let started = std::time::Instant::now();
    let err = api.fetch_dashboard().await.unwrap_err();
    assert!(matches!(err, FetchError::Timeout));
    assert!(started.elapsed() < Duration::from_secs(2), "timeout must cancel the request");
}

// A server that returns headers promptly and then stalls the body shares the
// same deadline as the headers; the body read gets no second budget.
#[tokio::test]
async fn stalled_body_shares_the_request_deadline() {
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            tokio::time::sleep(Duration::from_millis(300)).await;
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 64\r\n\r\n")
                .await;
            // Hold the connection open without ever sending the body.
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
    });

    let api = ApiClient::new(
        Client::new(),
        Url::parse(&format!("http://{addr}")).unwrap(),
        test_config(),
    )
    .unwrap();

    let started = std::time::Instant::now();
    let err = api.fetch_latest().await.unwrap_err();
    assert!(matches!(err, FetchError::Timeout));
    // fetch_timeout is 500ms; a per-phase budget would let this run ~800ms.
    assert!(
        started.elapsed() < Duration::from_millis(700),
        "body stall must not earn a fresh deadline"
    );
}

#[test]
fn non_base_url_is_rejected_at_construction() {
    let err = ApiClient::new(
        Client::new(),
        Url::parse("mailto:desk@example.com").unwrap(),
        ClientConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, ClientError::InvalidBaseUrl(_)));
}

#[tokio::test]
async fn dashboard_with_no_sections_counts_as_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/channel/dashboard-data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let api = api_for(&server);
    let err = api.fetch_dashboard().await.unwrap_err();
    assert!(matches!(err, FetchError::EmptyPayload));
}

#[tokio::test]
async fn status_poll_reports_busy_flag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/channel/processing-status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "is_processing": true,
            "api_status": "available"
        })))
        .mount(&server)
        .await;

    let api = api_for(&server);
    assert!(api.poll_status().await.unwrap());
}

#[tokio::test]
async fn record_play_posts_and_swallows_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/channel/articles/42/play"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "play_count": 5
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = api_for(&server);
    api.record_play(42).await;
    // A failing tracker call must not surface anywhere.
    api.record_play(9999).await;
}
