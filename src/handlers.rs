use crate::business_models::{LocalBusinessDisplay, LocalBusinessSearchParams};
use crate::config::Config;
use crate::credential_models::{
    mask_secret, ApiKeySummary, ApiKeyUpdate, ApiKeyView, NewApiKey,
};
use crate::credential_store::{mutate, SharedCredentialStore};
use crate::csv_export::{
    businesses_to_csv, export_filename, jobs_to_csv, BUSINESS_EXPORT_PREFIX, JOB_EXPORT_PREFIX,
};
use crate::errors::AppError;
use crate::job_models::{JobDisplay, JobSearchParams};
use crate::pagination::{page_window, paginate, Page, PageLink, RESULTS_PER_PAGE};
use crate::services::{JobSearchService, LocalBusinessService, RapidApiClient};
use crate::webhook_models::{BusinessRelayRequest, JobRelayRequest, RelaySummary};
use crate::webhook_relay::{RelayRecord, WebhookRelay};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Credential profiles.
    pub store: SharedCredentialStore,
    pub jobs: JobSearchService,
    pub businesses: LocalBusinessService,
    pub relay: WebhookRelay,
}

impl AppState {
    pub fn new(config: Config, store: SharedCredentialStore) -> Result<Self, AppError> {
        let api = RapidApiClient::new(store.clone(), config.http_timeout())?;
        let relay = WebhookRelay::new(config.http_timeout(), config.webhook_delay())?;

        Ok(Self {
            jobs: JobSearchService::new(api.clone()),
            businesses: LocalBusinessService::new(api),
            relay,
            store,
            config,
        })
    }
}

/// All JSON API routes except `/health`.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Credential profiles
        .route("/api/v1/keys", get(list_keys).post(create_key))
        .route("/api/v1/keys/summary", get(key_summary))
        .route(
            "/api/v1/keys/:id",
            get(get_key).put(update_key).delete(delete_key),
        )
        .route("/api/v1/keys/:id/toggle", post(toggle_key))
        // Single-key flow
        .route(
            "/api/v1/key",
            get(default_key_status).put(save_default_key).delete(clear_default_key),
        )
        // Searches
        .route("/api/v1/jobs/search", post(search_jobs))
        .route("/api/v1/businesses/search", post(search_businesses))
        // CSV export
        .route("/api/v1/jobs/export", post(export_jobs))
        .route("/api/v1/businesses/export", post(export_businesses))
        // Clay.com relay
        .route("/api/clay-webhook", post(relay_jobs))
        .route("/api/clay-webhook-businesses", post(relay_businesses))
}

/// Complete application without transport-level middleware.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(api_routes())
        .with_state(state)
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "leadscout",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

// ============ Credential profiles ============

/// GET /api/v1/keys
pub async fn list_keys(State(state): State<Arc<AppState>>) -> Json<Vec<ApiKeyView>> {
    let store = state.store.lock().await;
    Json(store.list().iter().map(|p| p.to_view()).collect())
}

/// POST /api/v1/keys
pub async fn create_key(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NewApiKey>,
) -> Result<(StatusCode, Json<ApiKeyView>), AppError> {
    let profile = mutate(&state.store, move |store| store.add(input)).await?;
    Ok((StatusCode::CREATED, Json(profile.to_view())))
}

/// GET /api/v1/keys/summary
pub async fn key_summary(State(state): State<Arc<AppState>>) -> Json<ApiKeySummary> {
    Json(state.store.lock().await.summary())
}

/// GET /api/v1/keys/:id
pub async fn get_key(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiKeyView>, AppError> {
    let store = state.store.lock().await;
    store
        .get(&id)
        .map(|p| Json(p.to_view()))
        .ok_or_else(|| AppError::NotFound(format!("API key {} not found", id)))
}

/// PUT /api/v1/keys/:id
pub async fn update_key(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<ApiKeyUpdate>,
) -> Result<Json<ApiKeyView>, AppError> {
    let profile = mutate(&state.store, move |store| store.update(&id, update)).await?;
    Ok(Json(profile.to_view()))
}

/// DELETE /api/v1/keys/:id
pub async fn delete_key(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    mutate(&state.store, move |store| store.delete(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/keys/:id/toggle
pub async fn toggle_key(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiKeyView>, AppError> {
    let profile = mutate(&state.store, {
        let id = id.clone();
        move |store| store.toggle_active(&id)
    })
    .await?;
    tracing::info!(
        "API key {} is now {}",
        id,
        if profile.is_active { "active" } else { "inactive" }
    );
    Ok(Json(profile.to_view()))
}

// ============ Single-key flow ============

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultKeyStatus {
    pub has_key: bool,
    /// Masked secret of the first active profile.
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultKeyInput {
    pub api_key: String,
}

/// GET /api/v1/key
pub async fn default_key_status(State(state): State<Arc<AppState>>) -> Json<DefaultKeyStatus> {
    let store = state.store.lock().await;
    Json(DefaultKeyStatus {
        has_key: store.has_any_active(),
        api_key: store.first_active_secret().map(|s| mask_secret(&s)),
    })
}

/// PUT /api/v1/key
pub async fn save_default_key(
    State(state): State<Arc<AppState>>,
    Json(input): Json<DefaultKeyInput>,
) -> Result<Json<ApiKeyView>, AppError> {
    let profile =
        mutate(&state.store, move |store| store.save_default_key(&input.api_key)).await?;
    Ok(Json(profile.to_view()))
}

/// DELETE /api/v1/key
///
/// Deactivates every profile; nothing is deleted.
pub async fn clear_default_key(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let deactivated = mutate(&state.store, |store| store.deactivate_all()).await?;
    tracing::info!("Deactivated {} API key profile(s)", deactivated);
    Ok(Json(json!({ "deactivated": deactivated })))
}

// ============ Searches ============

/// Search body: provider parameters plus the result page to show.
#[derive(Debug, Deserialize)]
pub struct SearchRequest<P> {
    #[serde(flatten)]
    pub params: P,
    #[serde(rename = "resultsPage", default)]
    pub results_page: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults<T> {
    pub total_results: usize,
    /// Every normalized record, for selection and export.
    pub results: Vec<T>,
    pub page: Page<T>,
    pub page_links: Vec<PageLink>,
}

impl<T: Clone> SearchResults<T> {
    fn new(results: Vec<T>, requested_page: Option<usize>) -> Self {
        let page = paginate(&results, requested_page.unwrap_or(1), RESULTS_PER_PAGE);
        let page_links = page_window(page.page, page.total_pages);
        Self {
            total_results: results.len(),
            results,
            page,
            page_links,
        }
    }
}

/// POST /api/v1/jobs/search
pub async fn search_jobs(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest<JobSearchParams>>,
) -> Result<Json<SearchResults<JobDisplay>>, AppError> {
    tracing::info!("POST /jobs/search - query: {:?}", request.params.query);
    let jobs = state.jobs.search_display(&request.params).await?;
    Ok(Json(SearchResults::new(jobs, request.results_page)))
}

/// POST /api/v1/businesses/search
pub async fn search_businesses(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest<LocalBusinessSearchParams>>,
) -> Result<Json<SearchResults<LocalBusinessDisplay>>, AppError> {
    tracing::info!("POST /businesses/search - query: {:?}", request.params.query);
    let businesses = state.businesses.search_display(&request.params).await?;
    Ok(Json(SearchResults::new(businesses, request.results_page)))
}

// ============ CSV export ============

#[derive(Debug, Deserialize)]
pub struct JobExportRequest {
    #[serde(default)]
    pub jobs: Vec<JobDisplay>,
}

#[derive(Debug, Deserialize)]
pub struct BusinessExportRequest {
    #[serde(default)]
    pub businesses: Vec<LocalBusinessDisplay>,
}

fn csv_attachment(prefix: &str, body: String) -> Response {
    let filename = export_filename(prefix, chrono::Utc::now());
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response()
}

/// POST /api/v1/jobs/export
pub async fn export_jobs(Json(request): Json<JobExportRequest>) -> Result<Response, AppError> {
    if request.jobs.is_empty() {
        return Err(AppError::BadRequest("No data to export".to_string()));
    }
    tracing::info!("Exporting {} job(s) to CSV", request.jobs.len());
    Ok(csv_attachment(JOB_EXPORT_PREFIX, jobs_to_csv(&request.jobs)))
}

/// POST /api/v1/businesses/export
pub async fn export_businesses(
    Json(request): Json<BusinessExportRequest>,
) -> Result<Response, AppError> {
    if request.businesses.is_empty() {
        return Err(AppError::BadRequest("No data to export".to_string()));
    }
    tracing::info!("Exporting {} business(es) to CSV", request.businesses.len());
    Ok(csv_attachment(
        BUSINESS_EXPORT_PREFIX,
        businesses_to_csv(&request.businesses),
    ))
}

// ============ Clay.com relay ============

async fn relay_batch<R: RelayRecord>(
    state: &AppState,
    records: &[R],
    webhook_url: Option<String>,
) -> (StatusCode, Json<RelaySummary>) {
    let url = webhook_url
        .filter(|u| !u.trim().is_empty())
        .or_else(|| state.config.clay_webhook_url.clone())
        .unwrap_or_default();

    match state.relay.relay(records, &url).await {
        Ok(summary) if summary.all_failed() => (StatusCode::INTERNAL_SERVER_ERROR, Json(summary)),
        Ok(summary) => (StatusCode::OK, Json(summary)),
        Err(AppError::BadRequest(message)) => {
            (StatusCode::BAD_REQUEST, Json(RelaySummary::rejected(message)))
        }
        Err(e) => {
            tracing::error!("Error sending to Clay webhook: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(RelaySummary::rejected(format!("An error occurred: {}", e))),
            )
        }
    }
}

/// Parses a relay body, answering in the relay's own `{success, message}` shape.
///
/// `field` must hold a non-empty array; anything else is "No data to send".
fn relay_request<T: DeserializeOwned>(
    body: Result<Json<Value>, JsonRejection>,
    field: &str,
) -> Result<T, (StatusCode, Json<RelaySummary>)> {
    let internal = |message: String| {
        tracing::error!("Error reading relay request: {}", message);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(RelaySummary::rejected(format!("An error occurred: {}", message))),
        )
    };

    let Json(value) = body.map_err(|rejection| internal(rejection.body_text()))?;
    let has_records = value
        .get(field)
        .and_then(Value::as_array)
        .is_some_and(|records| !records.is_empty());
    if !has_records {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(RelaySummary::rejected("No data to send")),
        ));
    }

    serde_json::from_value(value).map_err(|e| internal(e.to_string()))
}

/// POST /api/clay-webhook
pub async fn relay_jobs(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> (StatusCode, Json<RelaySummary>) {
    match relay_request::<JobRelayRequest>(body, "jobs") {
        Ok(request) => relay_batch(&state, &request.jobs, request.webhook_url).await,
        Err(response) => response,
    }
}

/// POST /api/clay-webhook-businesses
pub async fn relay_businesses(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> (StatusCode, Json<RelaySummary>) {
    match relay_request::<BusinessRelayRequest>(body, "businesses") {
        Ok(request) => relay_batch(&state, &request.businesses, request.webhook_url).await,
        Err(response) => response,
    }
}
