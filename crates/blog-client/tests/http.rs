use blog_client::{BlogApi, BlogClient, ClientConfig, ClientError};
use reqwest::StatusCode;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};

/// Accept a single connection, answer it with `response`, and hand back the
/// raw request text.
async fn serve_once(response: String) -> (BlogClient, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let request = read_request(&mut socket).await;
        socket
            .write_all(response.as_bytes())
            .await
            .expect("write response");
        socket.shutdown().await.ok();
        request
    });
    let client = BlogClient::with_config(ClientConfig {
        base_url: format!("http://{addr}"),
        ..ClientConfig::default()
    })
    .expect("client");
    (client, handle)
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let read = socket.read(&mut chunk).await.expect("read request");
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
        let Some(end) = buffer.windows(4).position(|window| window == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&buffer[..end]).to_string();
        let length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if buffer.len() >= end + 4 + length {
            break;
        }
    }
    String::from_utf8_lossy(&buffer).to_string()
}

fn http_response(status: &str, content_type: &str, extra_headers: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\n{extra_headers}Connection: close\r\n\r\n{body}",
        body.len()
    )
}

#[tokio::test]
async fn generate_posts_topic_and_returns_content() {
    let (client, server) = serve_once(http_response(
        "200 OK",
        "application/json",
        "",
        r##"{"status": "success", "content": "# Rust\n\nBody"}"##,
    ))
    .await;

    let content = client.generate("Rust").await.expect("generate");
    assert_eq!(content, "# Rust\n\nBody");

    let request = server.await.expect("server task");
    assert!(request.starts_with("POST /generate HTTP/1.1"));
    assert!(request.contains(r#"{"topic":"Rust"}"#));
}

#[tokio::test]
async fn generate_failure_surfaces_server_message() {
    let (client, server) = serve_once(http_response(
        "500 INTERNAL SERVER ERROR",
        "application/json",
        "",
        r#"{"status": "error", "message": "model unavailable"}"#,
    ))
    .await;

    let error = client.generate("Rust").await.expect_err("should fail");
    assert!(matches!(&error, ClientError::Api(message) if message == "model unavailable"));
    assert_eq!(error.to_string(), "model unavailable");
    server.await.expect("server task");
}

#[tokio::test]
async fn list_articles_reads_summaries() {
    let (client, server) = serve_once(http_response(
        "200 OK",
        "application/json",
        "",
        r#"{"status": "success", "articles": [{"id": 3, "title": "Ownership", "created_at": "2024-05-01T10:00:00"}]}"#,
    ))
    .await;

    let articles = client.list_articles().await.expect("list");
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].id, 3);
    assert_eq!(articles[0].title, "Ownership");

    let request = server.await.expect("server task");
    assert!(request.starts_with("GET /api/articles HTTP/1.1"));
}

#[tokio::test]
async fn save_article_sends_title_and_content() {
    let (client, server) = serve_once(http_response(
        "200 OK",
        "application/json",
        "",
        r#"{"status": "success", "message": "saved", "article": {"id": 9}}"#,
    ))
    .await;

    let receipt = client
        .save_article("Lifetimes", "**borrowed**")
        .await
        .expect("save");
    assert_eq!(receipt.message.as_deref(), Some("saved"));
    assert_eq!(receipt.article.map(|article| article.id), Some(9));

    let request = server.await.expect("server task");
    assert!(request.starts_with("POST /api/articles HTTP/1.1"));
    assert!(request.contains(r#""title":"Lifetimes""#));
    assert!(request.contains(r#""content":"**borrowed**""#));
}

#[tokio::test]
async fn delete_article_targets_the_id() {
    let (client, server) = serve_once(http_response(
        "200 OK",
        "application/json",
        "",
        r#"{"status": "success", "message": "deleted"}"#,
    ))
    .await;

    let message = client.delete_article(3).await.expect("delete");
    assert_eq!(message.as_deref(), Some("deleted"));

    let request = server.await.expect("server task");
    assert!(request.starts_with("DELETE /api/articles/3 HTTP/1.1"));
}

#[tokio::test]
async fn missing_article_reports_status() {
    let (client, server) = serve_once(http_response(
        "404 NOT FOUND",
        "text/html; charset=utf-8",
        "",
        "<!doctype html><title>404 Not Found</title>",
    ))
    .await;

    let error = client.get_article(42).await.expect_err("should fail");
    assert!(matches!(error, ClientError::Status(StatusCode::NOT_FOUND)));
    server.await.expect("server task");
}

#[tokio::test]
async fn export_article_downloads_file() {
    let (client, server) = serve_once(http_response(
        "200 OK",
        "text/plain; charset=utf-8",
        "Content-Disposition: attachment; filename=article_3_20240501_101500.txt\r\n",
        "Title: Ownership\n\nBody\n",
    ))
    .await;

    let file = client.export_article(3).await.expect("export");
    assert_eq!(file.file_name, "article_3_20240501_101500.txt");
    assert_eq!(file.bytes, b"Title: Ownership\n\nBody\n");

    let request = server.await.expect("server task");
    assert!(request.starts_with("GET /api/articles/3/export HTTP/1.1"));
}

#[tokio::test]
async fn export_text_json_error_is_reported() {
    let (client, server) = serve_once(http_response(
        "400 BAD REQUEST",
        "application/json",
        "",
        r#"{"status": "error", "message": "content is required"}"#,
    ))
    .await;

    let error = client.export_text("Draft", "").await.expect_err("should fail");
    assert!(matches!(&error, ClientError::Api(message) if message == "content is required"));

    let request = server.await.expect("server task");
    assert!(request.starts_with("POST /api/export-text HTTP/1.1"));
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let client = BlogClient::with_config(ClientConfig {
        base_url: format!("http://{addr}"),
        ..ClientConfig::default()
    })
    .expect("client");
    let error = client.list_articles().await.expect_err("should fail");
    assert!(matches!(error, ClientError::Http(_)));
}
