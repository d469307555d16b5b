//! Plan Master - workload plan import and aggregation server.

mod cell;
mod config;
mod importer;
mod labels;
mod methodical;
mod plan_store;
mod schema;
mod sheet_parser;
mod summary;
mod summary_schema;
mod totals;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use config::AppConfig;
use plan_store::{PlanInfo, PlanStore, StoreError};
use schema::{Plan, PlanRow};
use std::sync::Arc;
use summary_schema::{MethodWorkDraft, SummaryCode, SummaryValues};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type ApiError = (StatusCode, String);

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    store: PlanStore,
    config: Arc<AppConfig>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "plan_master=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load service config
    let config = AppConfig::load()?;
    info!(
        "Importing sheets prefixed '{}', teaching sheets {:?}",
        config.sheet_prefix, config.teaching_sheets
    );

    // Build application state
    let bind_addr = config.bind_addr.clone();
    let body_limit = config.max_upload_mb * 1024 * 1024;
    let state = AppState {
        store: PlanStore::new(),
        config: Arc::new(config),
    };

    // Build router
    let app = Router::new()
        .route("/health", get(health))
        .route("/plans", get(list_plans))
        .route("/plans/import", post(import_plan))
        .route("/plans/draft/import", post(import_draft))
        .route("/plans/:id", get(get_plan).delete(delete_plan))
        .route("/plans/:id/copy", post(copy_plan))
        .route("/plans/:id/tables/:index/include", put(set_table_include))
        .route("/plans/:id/tables/:index/rows", put(replace_table_rows))
        .route("/plans/:id/summary/:code", put(update_summary_row))
        .route("/plans/:id/methodical", put(replace_methodical))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Run server
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Server listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> &'static str {
    "ok"
}

async fn list_plans(State(state): State<AppState>) -> Json<Vec<PlanInfo>> {
    Json(state.store.list())
}

#[derive(serde::Deserialize)]
struct NameQuery {
    name: Option<String>,
}

/// Upload a workbook and store it as a new plan.
async fn import_plan(
    State(state): State<AppState>,
    Query(query): Query<NameQuery>,
    multipart: Multipart,
) -> Result<Json<Plan>, ApiError> {
    let (filename, data) = read_upload(multipart).await?;
    let name = query
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| plan_name_from_file(&filename));

    let plan = importer::build_plan(&name, &filename, &data, &state.config)
        .map_err(|e| import_failed(&filename, e))?;
    if plan.tables.is_empty() {
        return Err(no_tables(&filename));
    }

    let plan = state.store.insert(plan);
    info!("Imported plan {} from {}", plan.id, filename);
    Ok(Json(plan))
}

/// Upload a workbook into the draft plan, replacing its tables.
async fn import_draft(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Plan>, ApiError> {
    let (filename, data) = read_upload(multipart).await?;

    let tables = importer::import_tables(&filename, &data, &state.config)
        .map_err(|e| import_failed(&filename, e))?;
    if tables.is_empty() {
        return Err(no_tables(&filename));
    }

    let plan = state
        .store
        .replace_draft_tables(tables, &filename, importer::content_hash(&data))
        .map_err(store_error)?;
    info!("Draft plan {} reloaded from {}", plan.id, filename);
    Ok(Json(plan))
}

async fn get_plan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Plan>, StatusCode> {
    state.store.get(&id).map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn delete_plan(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    if state.store.delete(&id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// Save a plan under a new id.
async fn copy_plan(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<NameQuery>,
) -> Result<Json<Plan>, ApiError> {
    state
        .store
        .copy_as_new(&id, query.name.as_deref())
        .map(Json)
        .map_err(store_error)
}

#[derive(serde::Deserialize)]
struct IncludeBody {
    include: bool,
}

async fn set_table_include(
    State(state): State<AppState>,
    Path((id, index)): Path<(String, usize)>,
    Json(body): Json<IncludeBody>,
) -> Result<Json<Plan>, ApiError> {
    state
        .store
        .set_table_include(&id, index, body.include)
        .map(Json)
        .map_err(store_error)
}

async fn replace_table_rows(
    State(state): State<AppState>,
    Path((id, index)): Path<(String, usize)>,
    Json(rows): Json<Vec<PlanRow>>,
) -> Result<Json<Plan>, ApiError> {
    state
        .store
        .replace_table_rows(&id, index, rows)
        .map(Json)
        .map_err(store_error)
}

/// Edit the six values of an unmanaged summary row. An empty code is
/// addressed as "total".
async fn update_summary_row(
    State(state): State<AppState>,
    Path((id, code)): Path<(String, String)>,
    Json(values): Json<SummaryValues>,
) -> Result<Json<Plan>, ApiError> {
    let code = if code.eq_ignore_ascii_case("total") {
        Some(SummaryCode::Total)
    } else {
        SummaryCode::parse(&code)
    }
    .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Unknown summary row: {}", code)))?;

    state
        .store
        .update_summary_row(&id, code, values)
        .map(Json)
        .map_err(store_error)
}

async fn replace_methodical(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(drafts): Json<Vec<MethodWorkDraft>>,
) -> Result<Json<Plan>, ApiError> {
    state
        .store
        .replace_methodical(&id, &drafts)
        .map(Json)
        .map_err(store_error)
}

// ============================================================================
// Helper functions
// ============================================================================

/// Read the `file` field of a multipart upload.
async fn read_upload(mut multipart: Multipart) -> Result<(String, Vec<u8>), ApiError> {
    let mut filename = String::new();
    let mut file_data = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (StatusCode::BAD_REQUEST, format!("Multipart error: {}", e))
    })? {
        if field.name() == Some("file") {
            filename = field.file_name().unwrap_or("plan.xlsx").to_string();
            file_data = field.bytes().await.map_err(|e| {
                (StatusCode::BAD_REQUEST, format!("Failed to read file: {}", e))
            })?.to_vec();
            break;
        }
    }

    if file_data.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No file uploaded".to_string()));
    }

    info!("Received file: {} ({} bytes)", filename, file_data.len());
    Ok((filename, file_data))
}

fn plan_name_from_file(filename: &str) -> String {
    std::path::Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(filename)
        .to_string()
}

fn import_failed(filename: &str, e: anyhow::Error) -> ApiError {
    error!("Import of {} failed: {:#}", filename, e);
    (StatusCode::BAD_REQUEST, format!("Import failed: {:#}", e))
}

fn no_tables(filename: &str) -> ApiError {
    warn!("No plan tables recognized in {}", filename);
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        "No plan tables recognized in workbook".to_string(),
    )
}

fn store_error(e: StoreError) -> ApiError {
    (e.status(), e.to_string())
}
