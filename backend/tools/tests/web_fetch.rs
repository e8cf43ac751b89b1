use adkit_core::{State, Tool, ToolContext};
use adkit_tools::WebFetchTool;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn args(url: String, max_bytes: Option<usize>) -> serde_json::Map<String, serde_json::Value> {
    let mut map = serde_json::Map::new();
    map.insert("url".into(), json!(url));
    if let Some(n) = max_bytes {
        map.insert("max_bytes".into(), json!(n));
    }
    map
}

#[tokio::test]
async fn fetches_and_strips_html() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(
                    "<html><body><p>Hello <b>agents</b></p></body></html>",
                    "text/html; charset=utf-8",
                ),
        )
        .mount(&server)
        .await;

    let tool = WebFetchTool::new().allow_local(true);
    let mut ctx = ToolContext::new("inv", "researcher", State::default());
    let result = tool
        .execute(args(format!("{}/page", server.uri()), None), &mut ctx)
        .await
        .unwrap();

    assert!(result.is_success());
    assert_eq!(result.get("body"), Some(&json!("Hello agents")));
    assert_eq!(result.get("status_code"), Some(&json!(200)));
    assert_eq!(result.get("truncated"), Some(&json!(false)));
}

#[tokio::test]
async fn truncates_to_max_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/plain")
                .set_body_string("abcdefghij"),
        )
        .mount(&server)
        .await;

    let tool = WebFetchTool::new().allow_local(true);
    let mut ctx = ToolContext::new("inv", "researcher", State::default());
    let result = tool
        .execute(args(server.uri(), Some(4)), &mut ctx)
        .await
        .unwrap();

    assert_eq!(result.get("body"), Some(&json!("abcd")));
    assert_eq!(result.get("truncated"), Some(&json!(true)));
}

#[tokio::test]
async fn loopback_is_refused_by_default() {
    let server = MockServer::start().await;
    let tool = WebFetchTool::new();
    let mut ctx = ToolContext::new("inv", "researcher", State::default());
    let result = tool
        .execute(args(server.uri(), None), &mut ctx)
        .await
        .unwrap();

    assert!(!result.is_success());
    assert!(result.error_message().unwrap().contains("blocked"));
}

#[tokio::test]
async fn mapped_ipv6_loopback_is_refused() {
    let server = MockServer::start().await;
    let port = server.address().port();
    let tool = WebFetchTool::new();
    let mut ctx = ToolContext::new("inv", "researcher", State::default());
    let result = tool
        .execute(args(format!("http://[::ffff:127.0.0.1]:{port}/"), None), &mut ctx)
        .await
        .unwrap();

    assert!(!result.is_success());
    assert!(result.error_message().unwrap().contains("blocked"));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn large_body_is_cut_at_max_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/plain")
                .set_body_bytes(vec![b'x'; 4 * 1024 * 1024]),
        )
        .mount(&server)
        .await;

    let tool = WebFetchTool::new().allow_local(true);
    let mut ctx = ToolContext::new("inv", "researcher", State::default());
    let result = tool
        .execute(args(server.uri(), Some(10)), &mut ctx)
        .await
        .unwrap();

    assert_eq!(result.get("body"), Some(&json!("xxxxxxxxxx")));
    assert_eq!(result.get("truncated"), Some(&json!(true)));
}
