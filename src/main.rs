use anyhow::Result;
use axum::{extract::State, http::StatusCode, response::Json, routing::post, Router};
use research_flow::models::{ResearchRequest, ResearchResponse};
use research_flow::tasks::Synthesizer;
use research_flow::tools::get_llm;
use research_flow::{ResearchConfig, ResearchError, ResearchPipeline, ServiceSettings};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Clone)]
struct AppState {
    pipeline: Arc<ResearchPipeline>,
    synthesizer: Arc<Synthesizer>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("research_flow=debug,tower_http=info")),
        )
        .init();

    let config = ResearchConfig::from_env();
    let settings = ServiceSettings::from_env();

    let synthesizer = Synthesizer::new(Arc::new(get_llm(&settings)?), config.completion_timeout);
    let pipeline = ResearchPipeline::from_settings(config, &settings)?;
    let state = AppState {
        pipeline: Arc::new(pipeline),
        synthesizer: Arc::new(synthesizer),
    };

    let app = Router::new()
        .route("/research", post(research))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    info!("Research server running on http://{}", settings.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

#[instrument(skip(state, req))]
async fn research(
    State(state): State<AppState>,
    Json(req): Json<ResearchRequest>,
) -> Result<Json<ResearchResponse>, (StatusCode, String)> {
    let start_time = std::time::Instant::now();
    let request_id = Uuid::new_v4().to_string();
    info!("Starting research request {}", request_id);

    let max_urls = req.max_urls.unwrap_or(0);
    let outcome = state
        .pipeline
        .run(&req.query, max_urls)
        .await
        .map_err(|e| match e {
            ResearchError::InvalidInput(_) => (StatusCode::BAD_REQUEST, e.to_string()),
            other => {
                error!("Research failed: {}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
            }
        })?;

    let answer = if req.synthesize {
        let answer = state.synthesizer.synthesize(&outcome).await.map_err(|e| {
            error!("Synthesis failed: {}", e);
            (StatusCode::BAD_GATEWAY, e.to_string())
        })?;
        Some(answer)
    } else {
        None
    };

    info!("Request {} completed in {:?}", request_id, start_time.elapsed());
    Ok(Json(ResearchResponse {
        request_id,
        completed_at: chrono::Utc::now(),
        elapsed_ms: start_time.elapsed().as_millis() as u64,
        outcome,
        answer,
    }))
}
