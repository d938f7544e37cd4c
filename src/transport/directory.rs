use crate::session::SessionError;
use crate::shared::room_token::decode_room_token;
use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Where a host endpoint can be reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerRecord {
    #[serde(rename = "peerId")]
    pub peer_id: String,
    pub addr: String,
}

/// Endpoint id to advertised address.
pub type PeerRegistry = Arc<DashMap<String, String>>;

#[derive(Debug, Serialize)]
struct OkResponse {
    ok: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ErrorResponse {
    ok: bool,
    error: String,
}

/// Locates host endpoints by room token, either in-process or through a directory service.
#[derive(Clone)]
pub enum Directory {
    Memory(PeerRegistry),
    Http {
        http: reqwest::Client,
        base_url: String,
    },
}

impl Directory {
    pub fn memory() -> Self {
        Directory::Memory(Arc::new(DashMap::new()))
    }

    pub fn http(base_url: impl Into<String>) -> Self {
        Directory::Http {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn register(&self, record: &PeerRecord) -> Result<(), SessionError> {
        match self {
            Directory::Memory(registry) => {
                registry.insert(record.peer_id.clone(), record.addr.clone());
                Ok(())
            }
            Directory::Http { http, base_url } => {
                let response = http
                    .post(format!("{base_url}/api/peers"))
                    .timeout(REQUEST_TIMEOUT)
                    .json(record)
                    .send()
                    .await
                    .map_err(|error| SessionError::Directory(error.to_string()))?;
                if !response.status().is_success() {
                    return Err(SessionError::Directory(format!(
                        "register failed with status {}",
                        response.status().as_u16()
                    )));
                }
                Ok(())
            }
        }
    }

    pub async fn resolve(&self, token: &str) -> Result<PeerRecord, SessionError> {
        match self {
            Directory::Memory(registry) => resolve_in(registry, token),
            Directory::Http { http, base_url } => {
                let response = http
                    .get(format!("{base_url}/api/peers/{}", token.trim()))
                    .timeout(REQUEST_TIMEOUT)
                    .send()
                    .await
                    .map_err(|error| SessionError::Directory(error.to_string()))?;
                match response.status() {
                    StatusCode::NOT_FOUND => Err(SessionError::TokenNotFound(token.to_string())),
                    StatusCode::CONFLICT => Err(SessionError::AmbiguousToken(token.to_string())),
                    status if status.is_success() => response
                        .json::<PeerRecord>()
                        .await
                        .map_err(|error| SessionError::Directory(error.to_string())),
                    status => Err(SessionError::Directory(format!(
                        "lookup failed with status {}",
                        status.as_u16()
                    ))),
                }
            }
        }
    }

    pub async fn unregister(&self, peer_id: &str) -> Result<(), SessionError> {
        match self {
            Directory::Memory(registry) => {
                registry.remove(peer_id);
                Ok(())
            }
            Directory::Http { http, base_url } => {
                http.delete(format!("{base_url}/api/peers/{peer_id}"))
                    .timeout(REQUEST_TIMEOUT)
                    .send()
                    .await
                    .map_err(|error| SessionError::Directory(error.to_string()))?;
                Ok(())
            }
        }
    }
}

/// Case-insensitive prefix match of a room token against registered endpoint ids.
pub fn resolve_in(registry: &DashMap<String, String>, token: &str) -> Result<PeerRecord, SessionError> {
    let prefix =
        decode_room_token(token).ok_or_else(|| SessionError::TokenNotFound(token.to_string()))?;
    let mut matches = registry
        .iter()
        .filter(|entry| entry.key().starts_with(&prefix))
        .map(|entry| PeerRecord {
            peer_id: entry.key().clone(),
            addr: entry.value().clone(),
        });
    let Some(found) = matches.next() else {
        return Err(SessionError::TokenNotFound(token.to_string()));
    };
    if matches.next().is_some() {
        return Err(SessionError::AmbiguousToken(token.to_string()));
    }
    Ok(found)
}

pub fn router(registry: PeerRegistry) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/peers", post(register_peer))
        .route("/api/peers/:token", get(lookup_peer).delete(remove_peer))
        .layer(cors)
        .with_state(registry)
}

pub async fn run(port: u16) -> anyhow::Result<()> {
    serve(Arc::new(DashMap::new()), port).await
}

/// Serves `registry` on `port` until the listener fails.
pub async fn serve(registry: PeerRegistry, port: u16) -> anyhow::Result<()> {
    let app = router(registry);
    let address = format!("0.0.0.0:{port}");
    tracing::info!("peer directory listening on {address}");
    let listener = tokio::net::TcpListener::bind(&address).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(OkResponse { ok: true })
}

async fn register_peer(
    State(registry): State<PeerRegistry>,
    payload: Result<Json<PeerRecord>, axum::extract::rejection::JsonRejection>,
) -> impl IntoResponse {
    let Json(record) = match payload {
        Ok(payload) => payload,
        Err(_) => return error_response(StatusCode::BAD_REQUEST, "Invalid JSON"),
    };
    let peer_id = record.peer_id.trim().to_ascii_lowercase();
    if peer_id.is_empty() || record.addr.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "peerId and addr are required");
    }
    tracing::info!(peer = %peer_id, addr = %record.addr, "peer registered");
    registry.insert(peer_id, record.addr);
    (StatusCode::OK, Json(OkResponse { ok: true })).into_response()
}

async fn lookup_peer(
    State(registry): State<PeerRegistry>,
    Path(token): Path<String>,
) -> impl IntoResponse {
    match resolve_in(&registry, &token) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(error @ SessionError::AmbiguousToken(_)) => {
            error_response(StatusCode::CONFLICT, &error.to_string())
        }
        Err(error) => error_response(StatusCode::NOT_FOUND, &error.to_string()),
    }
}

async fn remove_peer(
    State(registry): State<PeerRegistry>,
    Path(peer_id): Path<String>,
) -> impl IntoResponse {
    registry.remove(&peer_id.to_ascii_lowercase());
    (StatusCode::OK, Json(OkResponse { ok: true })).into_response()
}

fn error_response(status: StatusCode, message: &str) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            ok: false,
            error: message.to_string(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(ids: &[&str]) -> PeerRegistry {
        let registry: PeerRegistry = Arc::new(DashMap::new());
        for (index, id) in ids.iter().enumerate() {
            registry.insert(id.to_string(), format!("127.0.0.1:{}", 4000 + index));
        }
        registry
    }

    #[test]
    fn resolves_unique_prefix_case_insensitively() {
        let registry = registry_with(&["abcd1234ffff0000", "99990000aaaa1111"]);
        let record = resolve_in(&registry, "ABCD1234").unwrap();
        assert_eq!(record.peer_id, "abcd1234ffff0000");
        assert_eq!(record.addr, "127.0.0.1:4000");
    }

    #[test]
    fn unknown_and_ambiguous_tokens_fail() {
        let registry = registry_with(&["abcd1234ffff0000", "abcd1234eeee0000"]);
        assert_eq!(
            resolve_in(&registry, "ABCD1234"),
            Err(SessionError::AmbiguousToken("ABCD1234".to_string()))
        );
        assert_eq!(
            resolve_in(&registry, "00000000"),
            Err(SessionError::TokenNotFound("00000000".to_string()))
        );
        assert!(matches!(
            resolve_in(&registry, "nope"),
            Err(SessionError::TokenNotFound(_))
        ));
    }

    #[tokio::test]
    async fn http_directory_round_trip() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, router(Arc::new(DashMap::new()))).await;
        });

        let directory = Directory::http(format!("http://{addr}/"));
        let record = PeerRecord {
            peer_id: "0123abcd99998888".to_string(),
            addr: "127.0.0.1:5555".to_string(),
        };
        directory.register(&record).await.unwrap();
        assert_eq!(directory.resolve("0123ABCD").await.unwrap(), record);

        directory.unregister(&record.peer_id).await.unwrap();
        assert!(matches!(
            directory.resolve("0123ABCD").await,
            Err(SessionError::TokenNotFound(_))
        ));
        server.abort();
    }
}
