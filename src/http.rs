use crate::codegen::{generate_drizzle, preview};
use crate::engine::Engine;
use crate::error::EngineError;
use crate::kit::MigrationKit;
use crate::validate::{validate_schema, validate_tenant_id, Issue};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::error::Error as _;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

const PREVIEW_CHARS: usize = 500;

pub struct AppState<K> {
    pub engine: Arc<Engine<K>>,
    /// Hides error source chains from responses.
    pub production: bool,
}

/// An engine error on its way to the client.
pub struct ApiError {
    error: EngineError,
    production: bool,
}

impl ApiError {
    fn new<K>(state: &AppState<K>, error: impl Into<EngineError>) -> Self {
        ApiError {
            error: error.into(),
            production: state.production,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.error.status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(code = self.error.code(), error = %self.error, "request failed");
        }

        let mut body = json!({
            "success": false,
            "error": self.error.to_string(),
            "code": self.error.code(),
        });
        if let Some(issues) = self.error.issues() {
            body["details"] = json!(issues);
        }
        if !self.production {
            let mut chain = format!("{:?}", self.error);
            let mut source = self.error.source();
            while let Some(cause) = source {
                chain.push_str(&format!("\ncaused by: {}", cause));
                source = cause.source();
            }
            body["debug"] = Value::String(chain);
        }
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchemaRequest {
    #[serde(default)]
    schema: Option<Value>,
    #[serde(default)]
    database_url: Option<String>,
}

pub fn router<K: MigrationKit>(state: Arc<AppState<K>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/schema/generate/:tenant_id", post(generate::<K>))
        .route("/schema/validate/:tenant_id", post(validate::<K>))
        .route("/schema/migrate/:tenant_id", post(migrate::<K>))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": "schema-engine",
    }))
}

async fn not_found(uri: Uri) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "error": format!("Route {} not found", uri.path()),
            "code": "ROUTE_NOT_FOUND",
        })),
    )
        .into_response()
}

/// Parse the body and validate tenant, schema and URL together so the
/// client sees every issue at once.
fn parse_request(
    tenant: &str,
    body: Result<Json<SchemaRequest>, JsonRejection>,
) -> Result<(crate::ir::SchemaInput, Option<String>), EngineError> {
    let Json(request) = body.map_err(|rejection| {
        EngineError::Validation(vec![Issue::new("body", rejection.body_text())])
    })?;

    let mut issues = validate_tenant_id(tenant).err().unwrap_or_default();
    let schema = match request.schema {
        Some(raw) => validate_schema(&raw)
            .map_err(|found| {
                issues.extend(found.into_iter().map(|issue| issue.prefixed("schema")));
            })
            .ok(),
        None => {
            issues.push(Issue::new("schema", "Required"));
            None
        }
    };
    if let Some(url) = request.database_url.as_deref() {
        issues.extend(
            crate::validate::validate_database_url(url)
                .err()
                .unwrap_or_default(),
        );
    }

    match schema {
        Some(schema) if issues.is_empty() => Ok((schema, request.database_url)),
        _ => Err(EngineError::Validation(issues)),
    }
}

async fn generate<K: MigrationKit>(
    State(state): State<Arc<AppState<K>>>,
    Path(tenant): Path<String>,
    body: Result<Json<SchemaRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let (schema, database_url) =
        parse_request(&tenant, body).map_err(|e| ApiError::new(&state, e))?;
    let artifacts = state
        .engine
        .generate(&tenant, &schema, database_url.as_deref())
        .await
        .map_err(|e| ApiError::new(&state, e))?;

    let message = format!(
        "Successfully generated schema and migration files for tenant {}",
        tenant
    );
    Ok(Json(json!({
        "message": message,
        "success": true,
        "data": artifacts,
    })))
}

async fn validate<K: MigrationKit>(
    State(state): State<Arc<AppState<K>>>,
    Path(tenant): Path<String>,
    body: Result<Json<SchemaRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let (schema, _) = parse_request(&tenant, body).map_err(|e| ApiError::new(&state, e))?;
    let source = generate_drizzle(&schema);

    Ok(Json(json!({
        "message": format!("Schema validation successful for tenant {}", tenant),
        "success": true,
        "data": {
            "valid": true,
            "drizzlePreview": preview(&source, PREVIEW_CHARS),
            "drizzleSchema": source,
        },
    })))
}

async fn migrate<K: MigrationKit>(
    State(state): State<Arc<AppState<K>>>,
    Path(tenant): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .engine
        .migrate(&tenant)
        .await
        .map_err(|e| ApiError::new(&state, e))?;

    Ok(Json(json!({
        "message": format!("Migration applied successfully for tenant {}", tenant),
        "success": true,
    })))
}
