use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use arv_scraper::service::{self, Estimate, EstimateRequest};
use arv_scraper::session::chrome::ChromeSession;
use arv_scraper::{ArvError, Config};

#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    // one scraping session at a time
    run_lock: Arc<Mutex<()>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "arv_scraper=info,info".into()),
        )
        .init();

    let config = Config::from_env()?;
    let state = AppState {
        config: Arc::new(config),
        run_lock: Arc::new(Mutex::new(())),
    };

    let app = Router::new()
        .route("/calculate", post(calculate))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind(&state.config.bind_addr).await?;
    info!("Listening on {}", state.config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn calculate(
    State(state): State<AppState>,
    Json(request): Json<EstimateRequest>,
) -> Result<Json<Estimate>, ArvError> {
    // reject before acquiring any session resource
    if request.address.trim().is_empty() {
        return Err(ArvError::InvalidAddress("address is required".to_string()));
    }

    let _run = state.run_lock.lock().await;
    let session = ChromeSession::launch(&state.config)
        .await
        .map_err(|e| ArvError::Session {
            step: "session launch",
            source: e,
        })?;
    let estimate = service::run_estimate(&state.config, &session, &request).await?;
    Ok(Json(estimate))
}
