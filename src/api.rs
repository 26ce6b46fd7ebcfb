//! JSON-over-HTTP surface for the table editor.
//!
//! Handlers only translate between requests and store calls; every status
//! code decision lives in [`ApiError`].

use std::time::Duration;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, State,
    },
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use crate::db::Database;
use crate::error::StoreError;
use crate::keys::TranslationKeyStore;
use crate::languages::LanguageCatalog;
use crate::matrix::TranslationMatrix;

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub catalog: LanguageCatalog,
    pub keys: TranslationKeyStore,
    pub matrix: TranslationMatrix,
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl AppState {
    pub fn new(db: Database, default_page_size: u32, max_page_size: u32) -> Self {
        Self {
            catalog: LanguageCatalog::new(db.clone()),
            keys: TranslationKeyStore::new(db.clone()),
            matrix: TranslationMatrix::new(db.clone()),
            db,
            default_page_size,
            max_page_size: max_page_size.max(1),
        }
    }
}

/// Failure rendered as `{title, detail, status}`.
#[derive(Debug)]
pub enum ApiError {
    Store(StoreError),
    /// A body, path or query string axum could not extract
    Rejected { status: StatusCode, detail: String },
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, title, detail) = match self {
            ApiError::Store(StoreError::Validation(detail)) => {
                (StatusCode::BAD_REQUEST, "Validation Error", detail)
            }
            ApiError::Store(StoreError::Conflict(detail)) => {
                (StatusCode::CONFLICT, "Conflict", detail)
            }
            ApiError::Store(StoreError::NotFound(detail)) => {
                (StatusCode::NOT_FOUND, "Not Found", detail)
            }
            ApiError::Store(StoreError::Storage(e)) => {
                error!("Storage failure: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                    "The operation could not be completed".to_string(),
                )
            }
            ApiError::Rejected { status, detail } => {
                (status, status.canonical_reason().unwrap_or("Bad Request"), detail)
            }
        };

        let body = json!({
            "title": title,
            "detail": detail,
            "status": status.as_u16(),
        });
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// Extractors that answer malformed input with an `ApiError` body instead of
// axum's plain-text rejection.

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
struct ApiJson<T>(T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
struct ApiPath<T>(T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
struct ApiQuery<T>(T);

#[derive(Debug, Deserialize)]
pub struct AddLanguageRequest {
    pub code: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct KeyRequest {
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTranslationRequest {
    pub value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// Build the router. `cors_origins` that are not valid header values are skipped,
/// and so is `*`: credentialed requests need an explicit origin.
pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) if value != "*" => Some(value),
            _ => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    // The editor frontend sends cookies, so methods and headers are mirrored
    // rather than wildcarded.
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .max_age(Duration::from_secs(600));

    Router::new()
        .route("/health", get(health))
        .route("/api/languages", get(list_languages).post(register_language))
        .route("/api/languages/available", get(available_languages))
        .route("/api/languages/:id", delete(unregister_language))
        .route("/api/translations/table", get(table))
        .route("/api/translations/keys", post(add_key))
        .route("/api/translations/keys/:id", delete(remove_key))
        .route("/api/translations/:key_id/:language_id", put(upsert_translation))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Response {
    match state.db.ping().await {
        Ok(()) => Json(json!({ "status": "ok" })).into_response(),
        Err(e) => {
            error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
                .into_response()
        }
    }
}

async fn list_languages(State(state): State<AppState>) -> ApiResult<Response> {
    let languages = state.catalog.list_registered().await?;
    Ok(Json(languages).into_response())
}

async fn available_languages(State(state): State<AppState>) -> ApiResult<Response> {
    let languages = state.catalog.list_available().await?;
    Ok(Json(languages).into_response())
}

async fn register_language(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AddLanguageRequest>,
) -> ApiResult<Response> {
    let language = state.catalog.register(&request.code, &request.name).await?;
    info!("Language registered: {} ({})", language.code, language.name);
    Ok((StatusCode::CREATED, Json(language)).into_response())
}

async fn unregister_language(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    let report = state.catalog.unregister(id).await?;
    info!(
        "Language {} deleted with {} translations",
        report.owner_id, report.cells_removed
    );
    Ok(StatusCode::NO_CONTENT)
}

async fn table(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TableQuery>,
) -> ApiResult<Response> {
    let page = query.page.unwrap_or(1);
    let page_size = query
        .page_size
        .unwrap_or(state.default_page_size)
        .min(state.max_page_size);

    let data = state.matrix.page(page, page_size).await?;
    Ok(Json(data).into_response())
}

async fn add_key(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<KeyRequest>,
) -> ApiResult<Response> {
    let row = state.keys.add(&request.key).await?;
    info!("Translation key added: {}", row.key);
    Ok((StatusCode::CREATED, Json(row)).into_response())
}

async fn remove_key(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    let report = state.keys.remove(id).await?;
    info!(
        "Translation key {} deleted with {} translations",
        report.owner_id, report.cells_removed
    );
    Ok(StatusCode::NO_CONTENT)
}

async fn upsert_translation(
    State(state): State<AppState>,
    ApiPath((key_id, language_id)): ApiPath<(i64, i64)>,
    ApiJson(request): ApiJson<UpdateTranslationRequest>,
) -> ApiResult<Response> {
    let cell = state.matrix.upsert(key_id, language_id, &request.value).await?;
    Ok(Json(cell).into_response())
}
