use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use uuid::Uuid;

use super::*;

/// Serve one canned response and hand back the raw request text.
async fn serve_once(status: &str, body: String) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let status = status.to_owned();
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        request
    });
    (format!("http://{addr}"), handle)
}

/// Read headers plus a `content-length` body.
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut raw = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        raw.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&raw).into_owned();
        if let Some(head_end) = text.find("\r\n\r\n") {
            let length = text[..head_end]
                .lines()
                .find_map(|line| line.to_ascii_lowercase().strip_prefix("content-length:").map(|v| v.trim().to_owned()))
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(0);
            if raw.len() >= head_end + 4 + length || n == 0 {
                return text;
            }
        } else if n == 0 {
            return text;
        }
    }
}

#[test]
fn urls_encode_document_id() {
    let store = HttpCommentStore::new("http://localhost:3000/", None).unwrap();
    assert_eq!(store.annotations_url("posts/hello world"), "http://localhost:3000/api/documents/posts%2Fhello%20world/annotations");
    assert_eq!(store.annotation_url(Uuid::nil()), format!("http://localhost:3000/api/annotations/{}", Uuid::nil()));
}

#[test]
fn invalid_session_token_is_rejected() {
    assert!(matches!(HttpCommentStore::new("http://x", Some("bad\ntoken")), Err(HttpStoreError::InvalidHeader(_))));
}

#[test]
fn error_mapping_follows_call() {
    let id = Uuid::new_v4();
    let auth = WireError::new(wire::E_NOT_AUTHENTICATED, "sign in");
    let missing = WireError::new(wire::E_NOT_FOUND, "gone");
    let invalid = WireError::new(wire::E_INVALID_CONTEXT, "empty context");

    assert_eq!(store_error(&auth, Call::Create), StoreError::NotAuthenticated);
    assert_eq!(store_error(&auth, Call::List), StoreError::NotAuthenticated);
    assert_eq!(store_error(&missing, Call::Get(id)), StoreError::NotFound(id));
    assert_eq!(store_error(&invalid, Call::Create), StoreError::PersistenceFailed("empty context".into()));
    assert!(matches!(store_error(&missing, Call::List), StoreError::Unavailable(_)));
}

#[tokio::test]
async fn list_sends_cookie_and_decodes_records() {
    let id = Uuid::new_v4();
    let body = serde_json::json!({
        "success": true,
        "data": [{ "id": id, "context": "quick%20brown", "comment": "nice", "date": 5, "author": { "name": "ada" } }]
    })
    .to_string();
    let (base, server) = serve_once("200 OK", body).await;

    let store = HttpCommentStore::new(&base, Some("tok123")).unwrap();
    let records = store.list_approved("post-7").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].clone().into_annotation().context_text, "quick brown");

    let request = server.await.unwrap();
    assert!(request.starts_with("GET /api/documents/post-7/annotations "));
    assert!(request.to_ascii_lowercase().contains("cookie: session_token=tok123"));
}

#[tokio::test]
async fn create_posts_encoded_context() {
    let id = Uuid::new_v4();
    let body = serde_json::json!({
        "success": true,
        "data": { "id": id, "context": "a%20b", "comment": "c" }
    })
    .to_string();
    let (base, server) = serve_once("200 OK", body).await;

    let store = HttpCommentStore::new(&base, Some("tok")).unwrap();
    let created = store.create("post-7", "a b", "c", Some("actor")).await.unwrap();
    assert_eq!(created.id, id);

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /api/documents/post-7/annotations "));
    assert!(request.contains(r#""context":"a%20b""#));
}

#[tokio::test]
async fn unauthorized_envelope_maps_to_not_authenticated() {
    let body = serde_json::json!({
        "success": false,
        "error": { "code": "E_NOT_AUTHENTICATED", "message": "sign-in required" }
    })
    .to_string();
    let (base, _server) = serve_once("401 Unauthorized", body).await;

    let store = HttpCommentStore::new(&base, None).unwrap();
    let err = store.create("post-7", "a", "b", None).await.unwrap_err();
    assert_eq!(err, StoreError::NotAuthenticated);
}

#[tokio::test]
async fn non_envelope_body_is_unavailable_for_reads() {
    let (base, _server) = serve_once("502 Bad Gateway", "<html>oops</html>".to_owned()).await;
    let store = HttpCommentStore::new(&base, None).unwrap();
    let err = store.get_by_id(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, StoreError::Unavailable(msg) if msg.contains("502")));
}
