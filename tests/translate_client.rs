//! 翻译客户端集成测试
//!
//! 使用模拟端点验证请求格式、分块与重试策略

use std::time::{Duration, Instant};

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use page_translate::translation::{GoogleTranslateClient, TranslationError, Translator};

#[allow(dead_code)]
mod common {
    include!("common/mod.rs");
}

use common::fast_config;

const ENDPOINT: &str = "/translate_a/single";

fn translation_body(text: &str) -> serde_json::Value {
    json!([[[text, "source", null, null]], null, "en"])
}

/// 以 "首字母大写 + 长度" 作为译文，`a` 开头的块延迟返回
struct EchoLength;

impl Respond for EchoLength {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let q = request
            .url
            .query_pairs()
            .find(|(key, _)| key == "q")
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default();

        let head = q.chars().next().unwrap_or('?');
        let body = translation_body(&format!("{}{}", head.to_ascii_uppercase(), q.chars().count()));

        let template = ResponseTemplate::new(200).set_body_json(body);
        if head == 'a' {
            template.set_delay(Duration::from_millis(150))
        } else {
            template
        }
    }
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.map_or(0, |requests| requests.len())
}

#[tokio::test]
async fn test_short_text_uses_single_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .and(query_param("client", "gtx"))
        .and(query_param("sl", "en"))
        .and(query_param("tl", "zh"))
        .and(query_param("dt", "t"))
        .and(query_param("q", "Hello world & more"))
        .respond_with(ResponseTemplate::new(200).set_body_json(translation_body("你好世界")))
        .expect(1)
        .mount(&server)
        .await;

    let client = GoogleTranslateClient::new(fast_config(&server.uri())).unwrap();
    let translation = client.translate("Hello world & more", "en", "zh").await.unwrap();

    assert_eq!(translation, "你好世界");
}

#[tokio::test]
async fn test_empty_text_sends_nothing() {
    let server = MockServer::start().await;
    let client = GoogleTranslateClient::new(fast_config(&server.uri())).unwrap();

    assert_eq!(client.translate("", "auto", "zh").await.unwrap(), "");
    assert_eq!(request_count(&server).await, 0);
}

#[tokio::test]
async fn test_long_text_is_chunked_and_joined_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(EchoLength)
        .mount(&server)
        .await;

    // 第一块最慢返回，结果仍按原顺序拼接
    let text = format!("{}{}{}", "a".repeat(5000), "b".repeat(5000), "c".repeat(10));
    let client = GoogleTranslateClient::new(fast_config(&server.uri())).unwrap();
    let translation = client.translate(&text, "auto", "zh").await.unwrap();

    assert_eq!(translation, "A5000B5000C10");
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn test_exact_chunk_boundary() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(EchoLength)
        .mount(&server)
        .await;

    let client = GoogleTranslateClient::new(fast_config(&server.uri())).unwrap();
    let translation = client.translate(&"b".repeat(5000), "auto", "zh").await.unwrap();

    assert_eq!(translation, "B5000");
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_server_errors_are_retried_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(translation_body("你好")))
        .mount(&server)
        .await;

    let client = GoogleTranslateClient::new(fast_config(&server.uri())).unwrap();
    let translation = client.translate("Hello", "auto", "zh").await.unwrap();

    assert_eq!(translation, "你好");
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn test_retries_exhausted_reports_service_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = GoogleTranslateClient::new(fast_config(&server.uri())).unwrap();
    let err = client.translate("Hello", "auto", "zh").await.unwrap_err();

    assert!(matches!(err, TranslationError::ServiceUnavailable));
    assert_eq!(err.to_string(), "翻译服务不可用，请稍后重试");
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn test_client_errors_are_retried_too() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = GoogleTranslateClient::new(fast_config(&server.uri())).unwrap();
    let err = client.translate("Hello", "auto", "zh").await.unwrap_err();

    assert!(matches!(err, TranslationError::ServiceUnavailable));
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn test_malformed_body_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>blocked</html>"))
        .mount(&server)
        .await;

    let client = GoogleTranslateClient::new(fast_config(&server.uri())).unwrap();
    let err = client.translate("Hello", "auto", "zh").await.unwrap_err();

    assert!(matches!(err, TranslationError::ServiceUnavailable));
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn test_zero_retries_makes_one_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut config = fast_config(&server.uri());
    config.max_retries = 0;
    let client = GoogleTranslateClient::new(config).unwrap();

    assert!(client.translate("Hello", "auto", "zh").await.is_err());
    assert_eq!(request_count(&server).await, 1);
}

/// 重试间隔按次数递增：第 n 次重试前等待 n 个单位
fn paced_config(server_uri: &str) -> page_translate::translation::TranslationConfig {
    let mut config = fast_config(server_uri);
    config.retry_delay_ms = 100;
    config
}

#[tokio::test]
async fn test_retry_waits_grow_with_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(translation_body("你好")))
        .mount(&server)
        .await;

    let client = GoogleTranslateClient::new(paced_config(&server.uri())).unwrap();
    let started = Instant::now();
    let translation = client.translate("Hello", "auto", "zh").await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(translation, "你好");
    assert_eq!(request_count(&server).await, 3);
    // 100ms + 200ms
    assert!(elapsed >= Duration::from_millis(300), "elapsed {:?}", elapsed);
}

#[tokio::test]
async fn test_exhausted_retries_wait_before_giving_up() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = GoogleTranslateClient::new(paced_config(&server.uri())).unwrap();
    let started = Instant::now();
    let err = client.translate("Hello", "auto", "zh").await.unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, TranslationError::ServiceUnavailable));
    assert_eq!(request_count(&server).await, 3);
    assert!(elapsed >= Duration::from_millis(300), "elapsed {:?}", elapsed);
}
