//! HTTP surface
//!
//! Routes, handlers and the single place where error kinds become status
//! codes. The core modules hand back plain data (ordered ids, content text,
//! folder sets, listings, byte streams); rendering and HTML escaping belong
//! to whatever consumes this API.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::drive::{Listing, ListingCache};
use crate::error::AppError;
use crate::notes::{NoteIndexCache, derive_taxonomy};
use crate::proxy::{DOCUMENT_DISPOSITION, DOCUMENT_MIME, FetchProxy, FetchTarget};

/// Shared state handed to every request handler
#[derive(Clone)]
pub struct AppState {
    pub notes: Arc<NoteIndexCache>,
    pub listings: Arc<ListingCache>,
    pub proxy: Arc<FetchProxy>,
}

/// Map error kinds to wire status codes
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NoteNotFound(_)
            | AppError::ContentMissing(_)
            | AppError::CategoryNotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::GatewayTimeout => StatusCode::GATEWAY_TIMEOUT,
        };
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Response body for GET /notes
#[derive(Debug, Serialize)]
struct NotesResponse {
    notes: Vec<String>,
    folders: Vec<String>,
    subfolders: Vec<String>,
}

/// Response body for GET /notes/{*path}
#[derive(Debug, Serialize)]
struct NoteResponse {
    path: String,
    content: String,
    prev: Option<String>,
    next: Option<String>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct AdminResponse {
    status: &'static str,
}

/// Query parameters for GET /proxy-pdf
#[derive(Debug, Deserialize)]
struct ProxyParams {
    #[serde(default)]
    url: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

async fn handle_notes(State(state): State<AppState>) -> Json<NotesResponse> {
    let index = state.notes.get();
    let (folders, subfolders) = derive_taxonomy(index.ids());
    Json(NotesResponse {
        notes: index.ids().to_vec(),
        folders,
        subfolders,
    })
}

async fn handle_note(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Json<NoteResponse>, AppError> {
    // One snapshot per request: nav links and content must come from the
    // same index build.
    let index = state.notes.get();
    let (prev, next) = index.neighbors(&path)?;
    let (prev, next) = (prev.map(str::to_string), next.map(str::to_string));
    let content = state.notes.read_from(&index, &path)?;
    Ok(Json(NoteResponse {
        path,
        content,
        prev,
        next,
    }))
}

async fn handle_listings(State(state): State<AppState>) -> Json<BTreeMap<String, Listing>> {
    Json(state.listings.get_listings().await)
}

async fn handle_listing_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<Listing>, AppError> {
    Ok(Json(state.listings.category(&category).await?))
}

async fn handle_proxy_pdf(
    State(state): State<AppState>,
    Query(params): Query<ProxyParams>,
) -> Result<Response, AppError> {
    match state.proxy.validate(&params.url)? {
        FetchTarget::Local(path) => Ok(Redirect::to(&path).into_response()),
        FetchTarget::Remote(url) => {
            let upstream = state.proxy.fetch(url).await?;
            let body = Body::from_stream(upstream.bytes_stream());
            Ok((
                [
                    (header::CONTENT_TYPE, DOCUMENT_MIME),
                    (header::CONTENT_DISPOSITION, DOCUMENT_DISPOSITION),
                ],
                body,
            )
                .into_response())
        }
    }
}

async fn handle_invalidate_notes(State(state): State<AppState>) -> Json<AdminResponse> {
    state.notes.invalidate();
    info!("Note index invalidated via admin hook");
    Json(AdminResponse { status: "ok" })
}

async fn handle_refresh_listings(State(state): State<AppState>) -> Json<AdminResponse> {
    state.listings.refresh();
    info!("Listing cache refreshed via admin hook");
    Json(AdminResponse { status: "ok" })
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/notes", get(handle_notes))
        .route("/notes/{*path}", get(handle_note))
        .route("/listings", get(handle_listings))
        .route("/listings/{category}", get(handle_listing_category))
        .route("/proxy-pdf", get(handle_proxy_pdf))
        .route("/admin/invalidate-notes", post(handle_invalidate_notes))
        .route("/admin/refresh-listings", post(handle_refresh_listings))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CategoryConfig;
    use crate::drive::{FileEntry, ListingProvider, ProviderError};
    use crate::proxy::FetchPolicy;
    use async_trait::async_trait;
    use axum::http::Request;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tower::util::ServiceExt;

    struct StubProvider;

    #[async_trait]
    impl ListingProvider for StubProvider {
        async fn fetch(&self, category: &str, folder_id: &str) -> Result<Listing, ProviderError> {
            if folder_id == "broken" {
                return Err(ProviderError::MissingCredentials);
            }
            Ok(Listing {
                category: category.to_string(),
                files: vec![FileEntry {
                    name: "2023 Paper.pdf".to_string(),
                    link_id: format!("{folder_id}-1"),
                    provider: Some("google".to_string()),
                    drive_id: None,
                }],
            })
        }
    }

    fn seeded_notes() -> TempDir {
        let dir = TempDir::new().unwrap();
        for (rel, content) in [
            ("Algebra/01 Linear.html", "<div>ax+b</div>"),
            ("Algebra/02 Quadratic.html", "<div>x^2</div>"),
            ("Calculus/Limits.html", "<div>lim</div>"),
        ] {
            let path = dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        dir
    }

    fn test_state(notes_root: &std::path::Path, policy: FetchPolicy) -> AppState {
        let categories = vec![
            CategoryConfig {
                category: "EJU".to_string(),
                folder_id: "folder-a".to_string(),
            },
            CategoryConfig {
                category: "Broken".to_string(),
                folder_id: "broken".to_string(),
            },
        ];
        AppState {
            notes: Arc::new(NoteIndexCache::new(notes_root.to_path_buf())),
            listings: Arc::new(ListingCache::new(
                Box::new(StubProvider),
                categories,
                Duration::from_secs(600),
            )),
            proxy: Arc::new(FetchProxy::new(policy).unwrap()),
        }
    }

    fn default_policy() -> FetchPolicy {
        FetchPolicy::new(
            vec!["drive.google.com".to_string()],
            "/static/".to_string(),
            Duration::from_secs(5),
        )
    }

    async fn get_response(app: Router, uri: &str) -> Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = seeded_notes();
        let app = router(test_state(dir.path(), default_policy()));
        let response = get_response(app, "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_notes_listing_with_taxonomy() {
        let dir = seeded_notes();
        let app = router(test_state(dir.path(), default_policy()));

        let response = get_response(app, "/notes").await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(
            json["notes"],
            serde_json::json!([
                "Algebra/01 Linear",
                "Algebra/02 Quadratic",
                "Calculus/Limits"
            ])
        );
        assert_eq!(json["folders"], serde_json::json!(["Algebra", "Calculus"]));
        assert_eq!(
            json["subfolders"],
            serde_json::json!(["01 Linear", "02 Quadratic", "Limits"])
        );
    }

    #[tokio::test]
    async fn test_note_view_with_nav() {
        let dir = seeded_notes();
        let app = router(test_state(dir.path(), default_policy()));

        let response = get_response(app, "/notes/Algebra/02%20Quadratic").await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["path"], "Algebra/02 Quadratic");
        assert_eq!(json["content"], "<div>x^2</div>");
        assert_eq!(json["prev"], "Algebra/01 Linear");
        assert_eq!(json["next"], "Calculus/Limits");
    }

    #[tokio::test]
    async fn test_note_view_probes_the_index_once() {
        let dir = seeded_notes();
        let state = test_state(dir.path(), default_policy());
        let app = router(state.clone());

        let response = get_response(app, "/notes/Algebra/01%20Linear").await;
        assert_eq!(response.status(), StatusCode::OK);

        // A single request performs exactly one get(): the initial build,
        // with no extra cache hit from a second snapshot fetch.
        let (hits, rebuilds) = state.notes.stats();
        assert_eq!(rebuilds, 1);
        assert_eq!(hits, 0);
    }

    #[tokio::test]
    async fn test_unknown_note_is_404() {
        let dir = seeded_notes();
        let app = router(test_state(dir.path(), default_policy()));

        let response = get_response(app, "/notes/Topology/Nope").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("note unavailable"));
    }

    #[tokio::test]
    async fn test_listings_with_fault_isolation() {
        let dir = seeded_notes();
        let app = router(test_state(dir.path(), default_policy()));

        let response = get_response(app, "/listings").await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["EJU"]["files"][0]["link_id"], "folder-a-1");
        assert_eq!(json["Broken"]["files"][0]["link_id"], "error");
    }

    #[tokio::test]
    async fn test_listing_category_lookup() {
        let dir = seeded_notes();
        let state = test_state(dir.path(), default_policy());

        let response = get_response(router(state.clone()), "/listings/EJU").await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = get_response(router(state), "/listings/Chemistry").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_proxy_rejections() {
        let dir = seeded_notes();
        let state = test_state(dir.path(), default_policy());

        let cases = [
            ("/proxy-pdf", StatusCode::BAD_REQUEST),
            ("/proxy-pdf?url=", StatusCode::BAD_REQUEST),
            (
                "/proxy-pdf?url=http://drive.google.com/x",
                StatusCode::BAD_REQUEST,
            ),
            (
                "/proxy-pdf?url=https://evil.example.com/x",
                StatusCode::FORBIDDEN,
            ),
        ];
        for (uri, expected) in cases {
            let response = get_response(router(state.clone()), uri).await;
            assert_eq!(response.status(), expected, "uri: {uri}");
        }
    }

    #[tokio::test]
    async fn test_proxy_static_shortcut_redirects() {
        let dir = seeded_notes();
        let app = router(test_state(dir.path(), default_policy()));

        let response = get_response(app, "/proxy-pdf?url=/static/foo.pdf").await;
        assert!(response.status().is_redirection());
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/static/foo.pdf"
        );
    }

    #[tokio::test]
    async fn test_proxy_streams_with_forced_content_type() {
        // Stub upstream that declares a misleading content type; the proxy
        // must pass the bytes through but not the headers.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let body: &[u8] = b"%PDF-1.4 proxied";
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Disposition: attachment; filename=\"evil.exe\"\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(body).await.unwrap();
        });

        let dir = seeded_notes();
        let policy = FetchPolicy::new(
            vec!["127.0.0.1".to_string()],
            "/static/".to_string(),
            Duration::from_secs(5),
        )
        .allow_insecure_for_tests();
        let app = router(test_state(dir.path(), policy));

        let uri = format!("/proxy-pdf?url=http://{addr}/doc.pdf");
        let response = get_response(app, &uri).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            DOCUMENT_MIME
        );
        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            DOCUMENT_DISPOSITION
        );

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"%PDF-1.4 proxied");
    }

    #[tokio::test]
    async fn test_admin_invalidate_notes() {
        let dir = seeded_notes();
        let state = test_state(dir.path(), default_policy());
        state.notes.get();

        let app = router(state.clone());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/admin/invalidate-notes")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        state.notes.get();
        // One build before the hook, one forced rebuild after.
        assert_eq!(state.notes.stats().1, 2);
    }

    #[tokio::test]
    async fn test_admin_refresh_listings() {
        let dir = seeded_notes();
        let state = test_state(dir.path(), default_policy());

        let app = router(state.clone());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/admin/refresh-listings")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
