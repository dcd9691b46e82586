//! HTTP transport module for decision-relay
//!
//! Axum router with the decision and storyboard endpoints, static pages,
//! health and metrics. Handlers share one [`AppState`] built at startup.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use futures_util::stream::{self, StreamExt};
use serde_json::json;
use std::{collections::HashMap, sync::Arc, time::Instant};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::Instrument;

use crate::clients::ChatCompletionsClient;
use crate::config::Config;
use crate::error::{RelayError, Result};
use crate::fallback::{
    ANALYZE_FRAMES_TEMPERATURE, DECISION_TEMPERATURE, FallbackCoordinator, FallbackOutcome,
    NEXT_FRAME_TEMPERATURE,
};
use crate::prompts::{build_prompt, build_prompt_analyze_frames, build_prompt_next_frame};
use crate::sanitize::Sanitizer;
use crate::schemas::{
    AnalyzeFramesRequest, AnalyzeFramesResponse, DecisionRequest, DecisionResponse,
    NextFrameRequest, NextFrameResponse, OutcomeResult,
};

/// Shared state for HTTP server
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub coordinator: Arc<FallbackCoordinator>,
    pub metrics: Arc<Mutex<HttpMetrics>>,
}

/// Metrics for HTTP server
#[derive(Debug, Clone, Default)]
pub struct HttpMetrics {
    pub total_requests: u64,
    pub errors_total: u64,
    pub latencies: Vec<f64>, // ring buffer for the average
    pub model_successes: HashMap<String, u64>,
    pub fallbacks_used: u64,
    pub placeholders_returned: u64,
}

impl HttpMetrics {
    fn record_outcome(&mut self, outcome: &FallbackOutcome) {
        match outcome.succeeded_model() {
            Some(model) => *self.model_successes.entry(model.to_string()).or_default() += 1,
            None => self.placeholders_returned = self.placeholders_returned.saturating_add(1),
        }
        if outcome.used_fallback() {
            self.fallbacks_used = self.fallbacks_used.saturating_add(1);
        }
    }
}

impl AppState {
    pub fn new(config: Config, coordinator: FallbackCoordinator) -> Self {
        Self {
            config: Arc::new(config),
            coordinator: Arc::new(coordinator),
            metrics: Arc::new(Mutex::new(HttpMetrics::default())),
        }
    }

    /// Construct the production model clients from configuration.
    pub fn from_config(config: Config) -> Result<Self> {
        let primary = ChatCompletionsClient::new(
            &config.models.primary_base_url,
            config.runtime.primary_api_key.clone(),
            config.models.request_timeout_ms,
            config.models.lenient_envelope,
        )?;
        let secondary = ChatCompletionsClient::new(
            &config.models.fallback_base_url,
            config.runtime.fallback_api_key.clone(),
            config.models.request_timeout_ms,
            config.models.lenient_envelope,
        )?;
        let sanitizer = Sanitizer::new(
            config.sanitizer.denylist.clone(),
            config.sanitizer.max_len,
        );
        let coordinator =
            FallbackCoordinator::with_default_models(Arc::new(primary), Arc::new(secondary), sanitizer);
        Ok(Self::new(config, coordinator))
    }

    async fn record(&self, outcome: &FallbackOutcome) {
        self.metrics.lock().await.record_outcome(outcome);
    }
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    "ok"
}

/// Metrics endpoint
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let metrics = state.metrics.lock().await.clone();
    let avg_latency_ms = if metrics.latencies.is_empty() {
        None
    } else {
        Some(metrics.latencies.iter().sum::<f64>() / metrics.latencies.len() as f64)
    };

    Json(json!({
        "metrics_version": "1",
        "total_requests": metrics.total_requests,
        "errors_total": metrics.errors_total,
        "avg_latency_ms": avg_latency_ms,
        "model_successes": metrics.model_successes,
        "fallbacks_used": metrics.fallbacks_used,
        "placeholders_returned": metrics.placeholders_returned,
        "models": {
            "primary": state.coordinator.primary_model(),
            "secondary": state.coordinator.secondary_model(),
        }
    }))
}

async fn serve_page(state: &AppState, name: &str) -> Result<Html<String>> {
    let path = state.config.server.templates_dir.join(name);
    match tokio::fs::read_to_string(&path).await {
        Ok(content) => Ok(Html(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(RelayError::NotFound {
            message: format!("page {} not found", name),
        }),
        Err(e) => Err(e.into()),
    }
}

pub async fn index_page(State(state): State<AppState>) -> Result<Html<String>> {
    serve_page(&state, "index.html").await
}

pub async fn life_page(State(state): State<AppState>) -> Result<Html<String>> {
    serve_page(&state, "life.html").await
}

pub async fn flow_page(State(state): State<AppState>) -> Result<Html<String>> {
    serve_page(&state, "flow.html").await
}

/// Decision analysis: one pipeline run per outcome, results in input order.
pub async fn run_ai_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<DecisionResponse>> {
    let req = DecisionRequest::from_body(&body)?;
    let concurrency = state.config.server.outcome_concurrency.max(1);
    tracing::info!(
        outcomes = req.outcomes.len(),
        concurrency,
        "running decision analysis"
    );

    // buffered() yields in submission order, so indices stay aligned
    let results: Vec<OutcomeResult> = stream::iter(req.outcomes.clone().into_iter().enumerate())
        .map(|(i, outcome)| {
            let state = state.clone();
            let title = req.title.clone();
            async move {
                let prompt = build_prompt(&title, &outcome);
                let result = state.coordinator.run(&prompt, DECISION_TEMPERATURE).await;
                state.record(&result).await;
                OutcomeResult {
                    index: i + 1,
                    outcome,
                    result: result.into_text(),
                }
            }
        })
        .buffered(concurrency)
        .collect()
        .await;

    Ok(Json(DecisionResponse {
        title: req.title,
        results,
    }))
}

pub async fn next_frame_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<NextFrameResponse>> {
    let req = NextFrameRequest::from_body(&body)?;
    let prompt = build_prompt_next_frame(&req.title, &req.current_frame);
    let outcome = state
        .coordinator
        .run_single(&prompt, NEXT_FRAME_TEMPERATURE)
        .await;
    state.record(&outcome).await;

    Ok(Json(NextFrameResponse {
        title: req.title,
        current_frame: req.current_frame,
        result: outcome.into_text(),
    }))
}

pub async fn analyze_frames_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AnalyzeFramesResponse>> {
    let req = AnalyzeFramesRequest::from_body(&body)?;
    let prompt = build_prompt_analyze_frames(&req.title, &req.frames);
    let outcome = state
        .coordinator
        .run_single(&prompt, ANALYZE_FRAMES_TEMPERATURE)
        .await;
    state.record(&outcome).await;

    Ok(Json(AnalyzeFramesResponse {
        title: req.title,
        frames: req.frames,
        result: outcome.into_text(),
    }))
}

/// Request id span, latency and error counters for every request.
async fn track_requests(
    State(metrics): State<Arc<Mutex<HttpMetrics>>>,
    req: Request,
    next: Next,
) -> Response {
    let span = tracing::info_span!(
        "request",
        id = %uuid::Uuid::new_v4(),
        method = %req.method(),
        path = %req.uri().path(),
    );
    async move {
        let start = Instant::now();
        let resp = next.run(req).await;
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        let mut m = metrics.lock().await;
        m.latencies.push(latency_ms);
        if m.latencies.len() > 256 {
            m.latencies.remove(0);
        }
        if !resp.status().is_success() {
            m.errors_total = m.errors_total.saturating_add(1);
        }
        m.total_requests = m.total_requests.saturating_add(1);
        drop(m);

        tracing::info!(status = resp.status().as_u16(), latency_ms, "request finished");
        resp
    }
    .instrument(span)
    .await
}

async fn fallback_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "application/json")],
        json!({"error": "Not found"}).to_string(),
    )
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/life", get(life_page))
        .route("/flow", get(flow_page))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/run-ai", post(run_ai_handler))
        .route("/runAi", post(run_ai_handler))
        .route("/run-ai-life", post(run_ai_handler))
        .route("/run-ai-flow-next-frame", post(next_frame_handler))
        .route("/run-ai-flow-analyze-frames", post(analyze_frames_handler))
        .fallback(fallback_404)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            track_requests,
        ))
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_http_server(state: AppState) -> anyhow::Result<()> {
    let bind = state.config.server.http_bind;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind HTTP listener: {}", e))?;

    tracing::info!("Starting HTTP server on {}", bind);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

    Ok(())
}
