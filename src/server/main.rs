//! HTTP server for soil coverage lookups and land assessments.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    routing::{get, patch},
    Router,
};
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use landiq::assessment::{AssessmentService, InMemoryRepository};
use landiq::config::{Config, ExplanationConfig};
use landiq::explanation::{ExplanationService, HuggingFaceClient, TextGenerator};
use landiq::LookupHandle;

mod routes;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "Soil coverage lookup and land assessment server")]
struct Args {
    /// Config file (defaults to ./landiq.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overrides the config file
    #[arg(short, long)]
    listen: Option<String>,

    /// Soil GeoJSON dataset (.geojson or .geojson.gz), overrides the config file
    #[arg(long)]
    dataset: Option<PathBuf>,
}

/// Application state shared across handlers
pub struct AppState {
    pub lookup: LookupHandle,
    pub assessments: AssessmentService,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let mut config = Config::load_or_default(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }
    if let Some(dataset) = args.dataset {
        config.dataset.path = dataset;
    }

    info!("LandIQ Server");
    info!("Loading soil dataset from {}", config.dataset.path.display());

    let service = config
        .dataset
        .open()
        .context("Failed to load soil dataset")?;
    info!(
        "Lookup ready with {} mapping units ({:?} resolver)",
        service.store().len(),
        config.dataset.resolver
    );

    let repository = Arc::new(InMemoryRepository::seeded_from(service.store()));
    let lookup = LookupHandle::loaded(Arc::new(service));

    let generator = build_generator(&config.explanation)?;
    let explanations = Arc::new(
        ExplanationService::new(generator, repository.clone())
            .with_general_timeout(Duration::from_secs(config.explanation.timeout_secs)),
    );

    let state = Arc::new(AppState {
        lookup: lookup.clone(),
        assessments: AssessmentService::new(lookup, repository.clone(), repository, explanations),
    });

    // Build router
    let app = Router::new()
        .route("/health", get(routes::health_handler))
        .route("/v1/lookup", get(routes::lookup_handler))
        .route(
            "/api/assessments",
            get(routes::list_assessments_handler).post(routes::create_assessment_handler),
        )
        .route(
            "/api/assessments/{id}",
            get(routes::get_assessment_handler).delete(routes::delete_assessment_handler),
        )
        .route("/api/assessments/{id}/save", patch(routes::save_assessment_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("Starting server on {}", config.server.listen);

    let listener = tokio::net::TcpListener::bind(&config.server.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_generator(config: &ExplanationConfig) -> Result<Option<Arc<dyn TextGenerator>>> {
    if !config.enabled {
        info!("Explanation generation disabled; fallback explanations will be stored");
        return Ok(None);
    }

    let Some(url) = config.api_url.clone() else {
        warn!("Explanation generation enabled without api_url; using fallback explanations");
        return Ok(None);
    };

    let Some(api_key) = config.api_key() else {
        warn!(
            "Explanation generation enabled but {} is not set; using fallback explanations",
            config.api_key_env
        );
        return Ok(None);
    };

    info!("Generating explanations with {} at {}", config.model_name, url);
    let client = HuggingFaceClient::new(
        url,
        api_key,
        config.model_name.clone(),
        Duration::from_secs(config.timeout_secs),
    )
    .context("Failed to build text generation client")?;

    Ok(Some(Arc::new(client)))
}
