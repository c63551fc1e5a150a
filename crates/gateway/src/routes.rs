use crate::config::{SERVICE_NAME, Settings};
use crate::errors::PipelineError;
use crate::pipeline::{DetectionRequest, DetectionResponse, RequestPipeline};
use crate::state::AppState;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartError},
    http::StatusCode,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct ApiState {
    pub app: Arc<AppState>,
    pub pipeline: Arc<RequestPipeline>,
}

impl ApiState {
    pub fn new(app: Arc<AppState>) -> Self {
        let pipeline = Arc::new(RequestPipeline::new(Arc::clone(&app)));
        Self { app, pipeline }
    }
}

pub fn router(state: ApiState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/model", get(model))
        .route("/config", get(config))
        .route("/predict", post(predict))
        .route("/predict/", post(predict))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(settings: &Settings, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(ApiState::new(state), settings.max_upload_bytes);

    let address = settings.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("Detection server listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Detection server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

async fn predict(
    State(state): State<ApiState>,
    multipart: Multipart,
) -> Result<Json<DetectionResponse>, PipelineError> {
    let request = read_form(multipart).await?;
    let response = state.pipeline.run(request).await?;
    Ok(Json(response))
}

/// Collect `file`, `confidence` and `language` from the upload form.
async fn read_form(mut multipart: Multipart) -> Result<DetectionRequest, PipelineError> {
    let mut request = DetectionRequest::default();
    let mut has_file = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(form_error)?
    {
        match field.name() {
            Some("file") => {
                request.content_type = field.content_type().map(str::to_string);
                request.image = field
                    .bytes()
                    .await
                    .map_err(form_error)?
                    .to_vec();
                has_file = true;
            }
            Some("confidence") => {
                request.confidence = Some(
                    field
                        .text()
                        .await
                        .map_err(form_error)?,
                );
            }
            Some("language") => {
                request.language = Some(
                    field
                        .text()
                        .await
                        .map_err(form_error)?,
                );
            }
            other => tracing::debug!(field = ?other, "Ignoring unknown form field"),
        }
    }

    if !has_file {
        return Err(PipelineError::BadRequest("missing 'file' field".to_string()));
    }
    Ok(request)
}

/// Keep the body-limit rejection distinct from a malformed form.
fn form_error(error: MultipartError) -> PipelineError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        PipelineError::PayloadTooLarge(error.body_text())
    } else {
        PipelineError::BadRequest(error.body_text())
    }
}

async fn health(State(state): State<ApiState>) -> Json<Value> {
    let app = &state.app;
    let model = app.model_config();

    Json(json!({
        "status": if app.engine().is_some() { "healthy" } else { "degraded" },
        "ready": app.is_ready(),
        "lifecycle": app.lifecycle(),
        "model_loaded": app.engine().is_some(),
        "current_model": model.map_or("none", |c| c.model_identifier.as_str()),
        "translate_file": model.map_or("none", |c| c.translation_table_identifier.as_str()),
        "translations_loaded": app.translations().map_or(0, |t| t.len()),
        "errors": app.startup_errors(),
        "timestamp": chrono::Local::now().to_rfc3339(),
    }))
}

async fn model(State(state): State<ApiState>) -> Json<Value> {
    let app = &state.app;
    let current = app
        .model_config()
        .map_or("none", |c| c.model_identifier.as_str());

    let mut body = json!({
        "current_model": current,
        "model_loaded": app.engine().is_some(),
    });
    if let Some(engine) = app.engine() {
        body["classes"] = json!(engine.classes());
    }
    Json(body)
}

async fn config(State(state): State<ApiState>) -> Json<Value> {
    let app = &state.app;
    let document = app
        .model_config()
        .map_or_else(|| json!({}), |c| Value::Object(c.document().clone()));

    Json(json!({
        "model_config": document,
        "translate_file": app
            .model_config()
            .map_or("none", |c| c.translation_table_identifier.as_str()),
        "translations_loaded": app.translations().map_or(0, |t| t.len()),
        "languages": app.languages().supported(),
        "default_confidence": app.default_confidence(),
    }))
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "predict": "POST /predict/ (multipart: file, confidence, language)",
            "health": "GET /health",
            "model": "GET /model",
            "config": "GET /config",
        },
    }))
}
