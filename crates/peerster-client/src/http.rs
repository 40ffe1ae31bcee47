use crate::poll::SnapshotSource;
use peerster_core::{decode_snapshot, CollectionKind, CollectionSnapshot, PostRequest, WireError};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {status} from {path}")]
    Status { status: u16, path: &'static str },
    #[error("decode error: {0}")]
    Decode(#[from] WireError),
    #[error("fetch task failed: {0}")]
    Task(tokio::task::JoinError),
}

/// Split an address into an optional `http`/`https` scheme and the host part.
fn parse_addr(addr: &str) -> (Option<&str>, &str) {
    if let Some(host) = addr.strip_prefix("https://") {
        (Some("https"), host)
    } else if let Some(host) = addr.strip_prefix("http://") {
        (Some("http"), host)
    } else {
        (None, addr)
    }
}

/// Reads and writes against the gossiper's web server.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    base_url: String,
    client: reqwest::Client,
}

impl HttpGateway {
    /// `server` is `host:port` or a full `http(s)://host:port` URL; a bare
    /// address is plain HTTP.
    pub fn new(server: &str, timeout: Duration) -> Result<Self, FetchError> {
        let (scheme, host) = parse_addr(server.trim());
        let base_url = format!(
            "{}://{}",
            scheme.unwrap_or("http"),
            host.trim_end_matches('/')
        );
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get_snapshot(
        &self,
        kind: CollectionKind,
    ) -> Result<Option<CollectionSnapshot>, FetchError> {
        let url = format!("{}{}", self.base_url, kind.path());
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                path: kind.path(),
            });
        }
        let body = response.bytes().await?;
        // An absent body carries no snapshot, same as `null`.
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        Ok(decode_snapshot(kind, &body)?)
    }

    pub async fn post<R: PostRequest>(&self, request: &R) -> Result<(), FetchError> {
        let url = format!("{}{}", self.base_url, R::PATH);
        let response = self.client.post(&url).json(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                path: R::PATH,
            });
        }
        Ok(())
    }
}

impl SnapshotSource for HttpGateway {
    fn fetch(
        &self,
        kind: CollectionKind,
    ) -> impl Future<Output = Result<Option<CollectionSnapshot>, FetchError>> + Send {
        self.get_snapshot(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
    use peerster_core::{ConversationId, DownloadPost, MessagePost, PeerPost};
    use serde_json::Value;
    use std::sync::{Arc, Mutex};

    type Captured = Arc<Mutex<Vec<(&'static str, Value)>>>;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        addr.to_string()
    }

    fn gateway(addr: &str) -> HttpGateway {
        HttpGateway::new(addr, Duration::from_secs(2)).expect("client")
    }

    #[test]
    fn base_url_defaults_to_http_and_honours_scheme() {
        assert_eq!(gateway("127.0.0.1:8080").base_url(), "http://127.0.0.1:8080");
        assert_eq!(
            gateway("https://peerster.local:443/").base_url(),
            "https://peerster.local:443"
        );
        assert_eq!(gateway("http://10.0.0.2:80").base_url(), "http://10.0.0.2:80");
    }

    #[tokio::test]
    async fn fetch_distinguishes_null_absent_and_empty() {
        let router = Router::new()
            .route("/message", get(|| async { "null" }))
            .route("/private-message", get(|| async { "[]" }))
            .route("/node", get(|| async { "" }))
            .route("/reachable-node", get(|| async { r#"["alice","bob"]"# }))
            .route(
                "/reputations",
                get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
            );
        let gateway = gateway(&serve(router).await);

        assert!(gateway
            .get_snapshot(CollectionKind::Rumors)
            .await
            .expect("rumors")
            .is_none());
        assert_eq!(
            gateway
                .get_snapshot(CollectionKind::PrivateMessages)
                .await
                .expect("private"),
            Some(CollectionSnapshot::PrivateMessages(Vec::new()))
        );
        assert!(gateway
            .get_snapshot(CollectionKind::Peers)
            .await
            .expect("peers")
            .is_none());
        assert_eq!(
            gateway
                .get_snapshot(CollectionKind::Origins)
                .await
                .expect("origins"),
            Some(CollectionSnapshot::Origins(vec![
                "alice".to_string(),
                "bob".to_string()
            ]))
        );
        let err = gateway
            .get_snapshot(CollectionKind::Reputations)
            .await
            .expect_err("status error");
        assert!(matches!(
            err,
            FetchError::Status {
                status: 500,
                path: "/reputations"
            }
        ));
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let router = Router::new().route("/message", get(|| async { "[{\"Text\":" }));
        let gateway = gateway(&serve(router).await);
        let err = gateway
            .get_snapshot(CollectionKind::Rumors)
            .await
            .expect_err("decode error");
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);
        let err = gateway(&addr.to_string())
            .get_snapshot(CollectionKind::Peers)
            .await
            .expect_err("transport error");
        assert!(matches!(err, FetchError::Transport(_)));
    }

    #[tokio::test]
    async fn posts_use_browser_client_bodies() {
        let captured: Captured = Arc::new(Mutex::new(Vec::new()));
        async fn record(
            path: &'static str,
            State(captured): State<Captured>,
            Json(body): Json<Value>,
        ) -> StatusCode {
            captured.lock().expect("lock").push((path, body));
            StatusCode::OK
        }
        let router = Router::new()
            .route(
                "/message",
                axum::routing::post(|state: State<Captured>, body: Json<Value>| {
                    record("/message", state, body)
                }),
            )
            .route(
                "/node",
                axum::routing::post(|state: State<Captured>, body: Json<Value>| {
                    record("/node", state, body)
                }),
            )
            .route(
                "/download",
                axum::routing::post(|state: State<Captured>, body: Json<Value>| {
                    record("/download", state, body)
                }),
            )
            .with_state(captured.clone());
        let gateway = gateway(&serve(router).await);

        let message =
            MessagePost::new(&ConversationId::origin("bob"), "hello bob").expect("valid");
        gateway.post(&message).await.expect("post message");
        gateway
            .post(&PeerPost::new("10.0.0.9:5000").expect("valid"))
            .await
            .expect("post peer");
        gateway
            .post(&DownloadPost::new("f.bin", "beef", "bob", "alice").expect("valid"))
            .await
            .expect("post download");

        let captured = captured.lock().expect("lock").clone();
        assert_eq!(
            captured,
            vec![
                (
                    "/message",
                    serde_json::json!({"message": "hello bob", "destination": "bob"})
                ),
                ("/node", serde_json::json!({"node": "10.0.0.9:5000"})),
                (
                    "/download",
                    serde_json::json!({
                        "filename": "f.bin",
                        "hexhash": "beef",
                        "destination": "bob",
                        "origin": "alice"
                    })
                ),
            ]
        );
    }
}
