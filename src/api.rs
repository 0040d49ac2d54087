//! HTTP surface for the catalog.
//!
//! - `POST /api/import` – Multipart upload (`file`, `collection`) of a JSON array; each element
//!   is created as a document and the response lists every element's outcome.
//! - `OPTIONS /api/import` – Preflight answer with permissive CORS headers.
//! - `GET|POST /api/:collection` – List or create documents.
//! - `GET|PATCH|DELETE /api/:collection/:id` – Read, update or delete one document.
//! - `GET /api/search/:collection/:id` – Current search projection of a document.
//! - `POST /api/search/reindex` – Rebuild every projection from the store.
//! - `GET /api/debug` – Configuration presence flags.
//! - `GET /metrics` – Import and sync counters.
//! - `GET /commands` – Machine-readable command catalog.
//!
//! Credentials are `Authorization: Bearer <PAYLOAD_API_KEY>` (service) or
//! `Authorization: users API-Key <key>` (user). Writes and imports need either one.

use crate::access::{AccessGate, authenticate};
use crate::content::{
    CollectionSchema, ContentStore, ContentVariant, DocumentId, Record, StoreError, User, Where,
    schema_for,
};
use crate::import::{ImportApi, ImportError, ImportErrorKind, ImportRequest, TracingProgress, UploadedFile};
use crate::search::{SearchIndex, SearchIndexError, SearchSync};
use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, Path, Query, State,
        multipart::MultipartRejection,
    },
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use time::OffsetDateTime;
use tower_http::cors::{Any, CorsLayer};

/// Relationship depth used when the caller does not ask for one.
const DEFAULT_DEPTH: u8 = 1;

/// Shared handles used by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Batch import engine.
    pub importer: Arc<dyn ImportApi>,
    /// Content collections.
    pub store: Arc<dyn ContentStore>,
    /// Search projection storage.
    pub index: Arc<dyn SearchIndex>,
    /// Sync controller, used for explicit reindexing.
    pub sync: Arc<SearchSync>,
    /// Credential rules.
    pub gate: AccessGate,
    /// Whether `PAYLOAD_SECRET` is configured.
    pub has_payload_secret: bool,
    /// Largest accepted import body, in bytes.
    pub import_max_bytes: usize,
}

/// Build the HTTP router.
pub fn create_router(state: AppState) -> Router {
    let import = Router::new()
        .route("/api/import", post(import_batch).options(import_preflight))
        .layer(DefaultBodyLimit::max(state.import_max_bytes));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let content = Router::new()
        .route("/api/debug", get(debug_info))
        .route("/api/search/reindex", post(reindex))
        .route("/api/search/:collection/:id", get(get_projection))
        .route("/api/:collection", get(list_documents).post(create_document))
        .route(
            "/api/:collection/:id",
            get(get_document)
                .patch(update_document)
                .delete(delete_document),
        )
        .route("/metrics", get(get_metrics))
        .route("/commands", get(get_commands))
        .layer(cors);

    import.merge(content).with_state(state)
}

/// Caller identity resolved from the `Authorization` header.
struct Caller {
    authorization: Option<String>,
    user: Option<User>,
}

impl Caller {
    async fn resolve(state: &AppState, headers: &HeaderMap) -> Self {
        let authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let user = authenticate(state.store.as_ref(), authorization.as_deref()).await;
        Self {
            authorization,
            user,
        }
    }

    fn can_write(&self, gate: &AccessGate) -> bool {
        gate.can_write(self.authorization.as_deref(), self.user.as_ref())
    }

    fn can_read(&self, gate: &AccessGate, schema: &CollectionSchema) -> bool {
        gate.can_read(
            schema.read_access,
            self.authorization.as_deref(),
            self.user.as_ref(),
        )
    }
}

/// Import a JSON batch into a collection.
async fn import_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, AppError> {
    let caller = Caller::resolve(&state, &headers).await;
    if !caller.can_write(&state.gate) {
        return Err(ImportError::Unauthorized.into());
    }

    let mut multipart = multipart.map_err(|err| ImportError::Internal(err.body_text()))?;
    let mut request = ImportRequest {
        authorized: true,
        acting_user: caller.user,
        ..ImportRequest::default()
    };
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ImportError::Internal(err.body_text()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let name = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| ImportError::Internal(err.body_text()))?;
                request.file = Some(UploadedFile {
                    name,
                    bytes: bytes.to_vec(),
                });
            }
            Some("collection") => {
                let collection = field
                    .text()
                    .await
                    .map_err(|err| ImportError::Internal(err.body_text()))?;
                request.collection = Some(collection);
            }
            _ => {}
        }
    }

    let progress = TracingProgress::new(request.collection.clone().unwrap_or_default());
    let report = state.importer.import(request, &progress).await?;
    Ok(Json(serde_json::to_value(report).map_err(internal)?))
}

/// Preflight response for browser uploads.
async fn import_preflight() -> impl IntoResponse {
    (
        StatusCode::OK,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*")),
            (
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static("POST, OPTIONS"),
            ),
            (
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static("Content-Type, Authorization"),
            ),
        ],
    )
}

#[derive(Deserialize)]
struct DepthQuery {
    #[serde(default)]
    depth: Option<u8>,
}

impl DepthQuery {
    fn depth(&self) -> u8 {
        self.depth.unwrap_or(DEFAULT_DEPTH)
    }
}

/// Response body for list requests.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    docs: Vec<Record>,
    total_docs: usize,
}

fn readable_schema(
    state: &AppState,
    caller: &Caller,
    collection: &str,
) -> Result<&'static CollectionSchema, AppError> {
    let schema = schema_for(collection)
        .ok_or_else(|| AppError::Store(StoreError::UnknownCollection(collection.to_string())))?;
    if !caller.can_read(&state.gate, schema) {
        return Err(AppError::Forbidden);
    }
    Ok(schema)
}

async fn list_documents(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Query(query): Query<DepthQuery>,
    headers: HeaderMap,
) -> Result<Json<ListResponse>, AppError> {
    let caller = Caller::resolve(&state, &headers).await;
    let schema = readable_schema(&state, &caller, &collection)?;
    let found = state
        .store
        .find(schema.slug, &Where::All, query.depth())
        .await?;
    let docs: Vec<Record> = found.docs.into_iter().map(|doc| schema.redact(doc)).collect();
    Ok(Json(ListResponse {
        total_docs: docs.len(),
        docs,
    }))
}

async fn get_document(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    Query(query): Query<DepthQuery>,
    headers: HeaderMap,
) -> Result<Json<Record>, AppError> {
    let caller = Caller::resolve(&state, &headers).await;
    let schema = readable_schema(&state, &caller, &collection)?;
    let doc = state
        .store
        .find_by_id(schema.slug, &DocumentId::parse(&id), query.depth())
        .await?;
    Ok(Json(schema.redact(doc)))
}

/// Response body for write requests.
#[derive(Serialize)]
struct WriteResponse {
    message: &'static str,
    doc: Record,
}

async fn create_document(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<WriteResponse>), AppError> {
    let caller = Caller::resolve(&state, &headers).await;
    if !caller.can_write(&state.gate) {
        return Err(AppError::Unauthorized);
    }
    let doc = state
        .store
        .create(&collection, body, caller.user.as_ref())
        .await?;
    tracing::info!(collection = %collection, id = ?DocumentId::from_record(&doc), "Document created");
    Ok((
        StatusCode::CREATED,
        Json(WriteResponse {
            message: "Document created successfully.",
            doc: redact_for(&collection, doc),
        }),
    ))
}

async fn update_document(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(patch): Json<Value>,
) -> Result<Json<WriteResponse>, AppError> {
    let caller = Caller::resolve(&state, &headers).await;
    if !caller.can_write(&state.gate) {
        return Err(AppError::Unauthorized);
    }
    let doc = state
        .store
        .update(&collection, &DocumentId::parse(&id), patch, caller.user.as_ref())
        .await?;
    tracing::info!(collection = %collection, %id, "Document updated");
    Ok(Json(WriteResponse {
        message: "Updated successfully.",
        doc: redact_for(&collection, doc),
    }))
}

async fn delete_document(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<WriteResponse>, AppError> {
    let caller = Caller::resolve(&state, &headers).await;
    if !caller.can_write(&state.gate) {
        return Err(AppError::Unauthorized);
    }
    let doc = state
        .store
        .delete(&collection, &DocumentId::parse(&id), caller.user.as_ref())
        .await?;
    tracing::info!(collection = %collection, %id, "Document deleted");
    Ok(Json(WriteResponse {
        message: "Deleted successfully.",
        doc: redact_for(&collection, doc),
    }))
}

fn redact_for(collection: &str, doc: Record) -> Record {
    match schema_for(collection) {
        Some(schema) => schema.redact(doc),
        None => doc,
    }
}

async fn get_projection(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let caller = Caller::resolve(&state, &headers).await;
    let schema = readable_schema(&state, &caller, &collection)?;
    let variant = ContentVariant::from_slug(schema.slug)
        .ok_or_else(|| AppError::NotFound(format!("{collection} is not searchable")))?;
    let projection = state.index.get(variant, &DocumentId::parse(&id)).await?;
    match projection {
        Some(projection) => Ok(Json(projection).into_response()),
        None => Err(AppError::NotFound(format!(
            "No search document for {collection}/{id}"
        ))),
    }
}

async fn reindex(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let caller = Caller::resolve(&state, &headers).await;
    let role = caller.user.as_ref().map(|user| user.role);
    if !state.gate.allows(caller.authorization.as_deref(), role) {
        return Err(if caller.user.is_some() {
            AppError::Forbidden
        } else {
            AppError::Unauthorized
        });
    }
    let summary = state.sync.reindex_all(state.store.as_ref()).await;
    Ok(Json(summary).into_response())
}

/// Response body for `GET /api/debug`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DebugResponse {
    has_payload_secret: bool,
    has_payload_api_key: bool,
    search_backend: &'static str,
    timestamp: String,
}

async fn debug_info(State(state): State<AppState>) -> Json<DebugResponse> {
    Json(DebugResponse {
        has_payload_secret: state.has_payload_secret,
        has_payload_api_key: state.gate.has_api_key(),
        search_backend: state.index.backend(),
        timestamp: OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default(),
    })
}

/// Return import and sync counters.
async fn get_metrics(State(state): State<AppState>) -> Json<crate::metrics::MetricsSnapshot> {
    Json(state.importer.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery by tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "import",
                method: "POST",
                path: "/api/import",
                description: "Multipart upload with a `file` part (JSON array) and a `collection` part. Records are created in order; the response lists { index, status, id | errorMessage } per record.",
                request_example: Some(json!({
                    "file": "videos.json",
                    "collection": "videos"
                })),
            },
            CommandDescriptor {
                name: "list_documents",
                method: "GET",
                path: "/api/:collection",
                description: "List documents of a collection. `?depth=0` leaves relationships as ids.",
                request_example: None,
            },
            CommandDescriptor {
                name: "create_document",
                method: "POST",
                path: "/api/:collection",
                description: "Create one document. Requires a user API key or the service key.",
                request_example: Some(json!({
                    "title": "Intro",
                    "categories": [1]
                })),
            },
            CommandDescriptor {
                name: "search_document",
                method: "GET",
                path: "/api/search/:collection/:id",
                description: "Return the current search projection of a document.",
                request_example: None,
            },
            CommandDescriptor {
                name: "reindex",
                method: "POST",
                path: "/api/search/reindex",
                description: "Rebuild every search projection. Requires the service key or an admin.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return import and search sync counters.",
                request_example: None,
            },
        ],
    })
}

/// Error type returned by handlers; renders `{ "error": ..., "details"?: ... }`.
#[derive(Debug)]
pub enum AppError {
    /// Import request rejected or failed.
    Import(ImportError),
    /// Store operation failed.
    Store(StoreError),
    /// Search index lookup failed.
    Search(SearchIndexError),
    /// Missing or invalid credentials.
    Unauthorized,
    /// Credentials present but insufficient.
    Forbidden,
    /// Resource does not exist.
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Import(error) => match error.kind() {
                ImportErrorKind::Unauthorized => (
                    StatusCode::UNAUTHORIZED,
                    json!({ "error": error.to_string() }),
                ),
                ImportErrorKind::BadRequest
                | ImportErrorKind::UnsupportedFormat
                | ImportErrorKind::InvalidPayload => (
                    StatusCode::BAD_REQUEST,
                    json!({ "error": error.to_string() }),
                ),
                ImportErrorKind::InternalFailure => {
                    let details = match &error {
                        ImportError::Internal(details) => details.clone(),
                        other => other.to_string(),
                    };
                    tracing::error!(details = %details, "Import failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        json!({ "error": "Import failed", "details": details }),
                    )
                }
            },
            Self::Store(error) => {
                let status = match &error {
                    StoreError::UnknownCollection(_) | StoreError::NotFound { .. } => {
                        StatusCode::NOT_FOUND
                    }
                    StoreError::NotAnObject | StoreError::Validation(_) => StatusCode::BAD_REQUEST,
                    StoreError::Rejected(_) => StatusCode::FORBIDDEN,
                    StoreError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status.is_server_error() {
                    tracing::error!(error = %error, "Content store request failed");
                }
                (status, json!({ "error": error.to_string() }))
            }
            Self::Search(error) => {
                tracing::error!(error = %error, "Search index request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Search index unavailable", "details": error.to_string() }),
                )
            }
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "Authentication required" }),
            ),
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                json!({ "error": "You are not allowed to perform this action." }),
            ),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, json!({ "error": message })),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ImportError> for AppError {
    fn from(inner: ImportError) -> Self {
        Self::Import(inner)
    }
}

impl From<StoreError> for AppError {
    fn from(inner: StoreError) -> Self {
        Self::Store(inner)
    }
}

impl From<SearchIndexError> for AppError {
    fn from(inner: SearchIndexError) -> Self {
        Self::Search(inner)
    }
}

fn internal(error: serde_json::Error) -> AppError {
    AppError::Import(ImportError::Internal(error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::MemoryContentStore;
    use crate::import::{ImportProgress, ImportReport, ImportItemResult};
    use crate::metrics::{CatalogMetrics, MetricsSnapshot};
    use crate::search::{MemorySearchIndex, SearchSettings};
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    const BOUNDARY: &str = "catalog-test-boundary";

    #[derive(Clone, Debug)]
    struct ImportCall {
        authorized: bool,
        file_name: Option<String>,
        collection: Option<String>,
        user: Option<String>,
    }

    /// Import engine stub that records requests and applies only the auth check.
    #[derive(Default)]
    struct StubImporter {
        calls: Mutex<Vec<ImportCall>>,
    }

    #[async_trait]
    impl ImportApi for StubImporter {
        async fn import(
            &self,
            request: ImportRequest,
            _progress: &dyn ImportProgress,
        ) -> Result<ImportReport, ImportError> {
            self.calls.lock().await.push(ImportCall {
                authorized: request.authorized,
                file_name: request.file.as_ref().map(|file| file.name.clone()),
                collection: request.collection.clone(),
                user: request.acting_user.as_ref().map(|user| user.email.clone()),
            });
            if !request.authorized {
                return Err(ImportError::Unauthorized);
            }
            Ok(ImportReport::from_results(vec![ImportItemResult::created(
                0,
                DocumentId::Number(1),
            )]))
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            CatalogMetrics::new().snapshot()
        }
    }

    struct Harness {
        router: Router,
        importer: Arc<StubImporter>,
        store: Arc<MemoryContentStore>,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryContentStore::new());
        let index = Arc::new(MemorySearchIndex::new());
        let metrics = Arc::new(CatalogMetrics::new());
        let sync = Arc::new(SearchSync::new(
            index.clone(),
            SearchSettings::default(),
            metrics,
        ));
        store.subscribe(sync.clone());
        let importer = Arc::new(StubImporter::default());
        let state = AppState {
            importer: importer.clone(),
            store: store.clone(),
            index,
            sync,
            gate: AccessGate::new(Some("service-key".into())),
            has_payload_secret: true,
            import_max_bytes: 1024 * 1024,
        };
        Harness {
            router: create_router(state),
            importer,
            store,
        }
    }

    fn multipart(parts: &[(&str, Option<&str>, &str)]) -> Body {
        let mut body = String::new();
        for (name, file_name, content) in parts {
            body.push_str(&format!("--{BOUNDARY}\r\n"));
            match file_name {
                Some(file_name) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/json\r\n\r\n"
                )),
                None => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
                )),
            }
            body.push_str(content);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        Body::from(body)
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.expect("router response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, json)
    }

    fn import_request(authorization: Option<&str>, body: Body) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/api/import")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(authorization) = authorization {
            builder = builder.header(header::AUTHORIZATION, authorization);
        }
        builder.body(body).expect("request")
    }

    #[tokio::test]
    async fn preflight_returns_cors_headers() {
        let app = harness();
        let response = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/import")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "POST, OPTIONS");
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_HEADERS],
            "Content-Type, Authorization"
        );
    }

    #[tokio::test]
    async fn import_without_credentials_is_unauthorized() {
        let app = harness();
        let body = multipart(&[("file", Some("data.json"), "[]"), ("collection", None, "videos")]);
        let (status, json) = send(&app.router, import_request(None, body)).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json, json!({ "error": "Authentication required" }));
        assert!(app.importer.calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn import_forwards_multipart_fields() {
        let app = harness();
        let body = multipart(&[
            ("collection", None, "videos"),
            ("file", Some("batch.json"), r#"[{"title":"A"}]"#),
        ]);
        let (status, json) = send(&app.router, import_request(Some("Bearer service-key"), body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Imported 1 items, 0 errors");
        let calls = app.importer.calls.lock().await;
        assert!(calls[0].authorized);
        assert_eq!(calls[0].file_name.as_deref(), Some("batch.json"));
        assert_eq!(calls[0].collection.as_deref(), Some("videos"));
        assert!(calls[0].user.is_none());
    }

    #[tokio::test]
    async fn import_records_the_authenticated_user() {
        let app = harness();
        app.store
            .create("users", json!({ "email": "editor@example.com", "apiKey": "ed-key" }), None)
            .await
            .unwrap();
        let body = multipart(&[("file", Some("a.json"), "[]"), ("collection", None, "tags")]);
        let (status, _) = send(&app.router, import_request(Some("users API-Key ed-key"), body)).await;

        assert_eq!(status, StatusCode::OK);
        let calls = app.importer.calls.lock().await;
        assert_eq!(calls[0].user.as_deref(), Some("editor@example.com"));
    }

    #[tokio::test]
    async fn malformed_multipart_is_an_internal_failure() {
        let app = harness();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/import")
            .header(header::CONTENT_TYPE, "multipart/form-data")
            .header(header::AUTHORIZATION, "Bearer service-key")
            .body(Body::from("garbage"))
            .unwrap();
        let (status, json) = send(&app.router, request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Import failed");
        assert!(json["details"].is_string());
        assert!(app.importer.calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn restricted_collections_need_key_or_admin() {
        let app = harness();
        app.store.create("tags", json!({ "name": "live" }), None).await.unwrap();

        let get = |auth: Option<&str>| {
            let mut builder = Request::builder().uri("/api/tags");
            if let Some(auth) = auth {
                builder = builder.header(header::AUTHORIZATION, auth);
            }
            builder.body(Body::empty()).unwrap()
        };

        let (status, _) = send(&app.router, get(None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, json) = send(&app.router, get(Some("Bearer service-key"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["totalDocs"], 1);

        let (status, _) = send(
            &app.router,
            Request::builder().uri("/api/videos").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn users_never_expose_api_keys() {
        let app = harness();
        app.store
            .create(
                "users",
                json!({ "email": "root@example.com", "role": "admin", "apiKey": "root-key" }),
                None,
            )
            .await
            .unwrap();
        let request = Request::builder()
            .uri("/api/users/1")
            .header(header::AUTHORIZATION, "users API-Key root-key")
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(&app.router, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["email"], "root@example.com");
        assert!(json.get("apiKey").is_none());
    }

    #[tokio::test]
    async fn writes_sync_search_projection() {
        let app = harness();
        let create = Request::builder()
            .method(Method::POST)
            .uri("/api/videos")
            .header(header::AUTHORIZATION, "Bearer service-key")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"title":"Intro","description":"Hello world"}"#))
            .unwrap();
        let (status, json) = send(&app.router, create).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["doc"]["id"], 1);

        let (status, projection) = send(
            &app.router,
            Request::builder().uri("/api/search/videos/1").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(projection["searchContent"], "Intro Hello world");
        assert_eq!(projection["originalDocId"], "1");

        let delete = Request::builder()
            .method(Method::DELETE)
            .uri("/api/videos/1")
            .header(header::AUTHORIZATION, "Bearer service-key")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app.router, delete).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            &app.router,
            Request::builder().uri("/api/search/videos/1").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn anonymous_writes_are_rejected() {
        let app = harness();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/videos")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"title":"Intro"}"#))
            .unwrap();
        let (status, json) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "Authentication required");
    }

    #[tokio::test]
    async fn validation_failures_are_bad_requests() {
        let app = harness();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/videos")
            .header(header::AUTHORIZATION, "Bearer service-key")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"description":"no title"}"#))
            .unwrap();
        let (status, json) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "The following field is invalid: title");
    }

    #[tokio::test]
    async fn debug_reports_presence_flags_only() {
        let app = harness();
        let (status, json) = send(
            &app.router,
            Request::builder().uri("/api/debug").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["hasPayloadSecret"], true);
        assert_eq!(json["hasPayloadApiKey"], true);
        assert_eq!(json["searchBackend"], "memory");
        assert!(json["timestamp"].as_str().is_some_and(|ts| ts.contains('T')));
        assert!(!json.to_string().contains("service-key"));
    }

    #[tokio::test]
    async fn commands_catalog_exposes_import_endpoint() {
        let response = get_commands().await;
        let commands = response.0.commands;
        let import = commands
            .iter()
            .find(|cmd| cmd.name == "import")
            .expect("import command present");

        assert_eq!(import.method, "POST");
        assert_eq!(import.path, "/api/import");
        assert!(commands.len() >= 3);
    }

    #[tokio::test]
    async fn reindex_requires_service_key_or_admin() {
        let app = harness();
        app.store
            .create("users", json!({ "email": "u@example.com", "apiKey": "u-key" }), None)
            .await
            .unwrap();
        let reindex = |auth: &str| {
            Request::builder()
                .method(Method::POST)
                .uri("/api/search/reindex")
                .header(header::AUTHORIZATION, auth)
                .body(Body::empty())
                .unwrap()
        };

        let (status, _) = send(&app.router, reindex("users API-Key u-key")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, json) = send(&app.router, reindex("Bearer service-key")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["failed"], 0);
    }
}
