//! End-to-end estimate orchestration.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::comps::{SearchWorkflow, WorkflowOutput};
use crate::config::{Config, SearchTolerances};
use crate::error::ArvError;
use crate::photos;
use crate::report;
use crate::session::SessionDriver;
use crate::value;

#[derive(Debug, Clone, Deserialize)]
pub struct EstimateRequest {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Estimate {
    pub address: String,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub estimated_value: i64,
    pub report_path: String,
}

/// Runs one estimate over an already-acquired session.
///
/// The session is closed exactly once on every path out of the gather phase,
/// success or failure; photo download and report composition run strictly
/// after release since they no longer need it.
pub async fn run_estimate(
    config: &Config,
    session: &dyn SessionDriver,
    request: &EstimateRequest,
) -> Result<Estimate, ArvError> {
    let gathered = gather(config, session, request).await;
    if let Err(e) = session.close().await {
        warn!(error = %e, "session did not close cleanly");
    }
    let output = gathered?;

    let client = photos::build_client();
    let fetched = photos::fetch_listing_photos(&client, &output.comparables).await;
    let summary = report::compose_report(&fetched, &config.report_path)?;

    let estimated_value =
        value::average_price(output.comparables.iter().filter_map(|c| c.price.as_deref()));
    info!(
        estimated_value,
        comparables = output.comparables.len(),
        report = %summary.path.display(),
        "estimate complete"
    );

    Ok(Estimate {
        address: request.address.clone(),
        state: request.state.clone(),
        zip: request.zip.clone(),
        estimated_value,
        report_path: summary.path.display().to_string(),
    })
}

async fn gather(
    config: &Config,
    session: &dyn SessionDriver,
    request: &EstimateRequest,
) -> Result<WorkflowOutput, ArvError> {
    let tolerances = SearchTolerances::load(&config.tolerances_path);
    let workflow = SearchWorkflow::new(
        session,
        config,
        tolerances,
        &request.address,
        request.zip.as_deref(),
    )?;
    workflow.run().await
}
