use crate::config::Config;
use crate::errors::AppError;
use crate::market_data::{BondListing, Bonds, FixedDepositListing, FundListing, MarketAnalysis, MutualFunds};
use crate::models::*;
use crate::poller::PollerStatus;
use crate::store::{persist_document, ClientStore};
use crate::synthesis::synthesize;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use utoipa::{OpenApi, ToSchema};

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Client data store used by the on-demand endpoint.
    pub store: Arc<dyn ClientStore>,
    /// Application configuration.
    pub config: Config,
    /// Latest poller snapshot; `None` when the poller is disabled.
    pub poller_status: Option<watch::Receiver<PollerStatus>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub poller: Option<PollerStatus>,
}

/// Health check endpoint.
///
/// Returns the service status, version, and the poller's latest snapshot.
///
/// # Returns
///
/// * `(StatusCode, Json<HealthResponse>)` - HTTP 200 OK with health status JSON.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let poller = state
        .poller_status
        .as_ref()
        .map(|status| status.borrow().clone());

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            service: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            poller,
        }),
    )
}

/// POST /analyze-portfolio/{client_id}
///
/// Builds the analysis document for one client on demand and stores a copy.
/// A failed insert is logged; the caller still gets the document.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `client_id` - Identifier of the client whose intake row is analyzed.
///
/// # Returns
///
/// * `Result<Json<AnalysisDocument>, AppError>` - The analysis document or an error.
#[utoipa::path(
    post,
    path = "/analyze-portfolio/{client_id}",
    params(("client_id" = String, Path, description = "Client identifier")),
    responses(
        (status = 200, description = "Analysis document", body = AnalysisDocument),
        (status = 400, description = "Blank client id"),
        (status = 404, description = "Client not found"),
        (status = 503, description = "Client data store unavailable")
    )
)]
pub async fn analyze_portfolio(
    State(state): State<Arc<AppState>>,
    Path(client_id): Path<String>,
) -> Result<Json<AnalysisDocument>, AppError> {
    tracing::info!("POST /analyze-portfolio/{}", client_id);

    let client_id = client_id.trim();
    if client_id.is_empty() {
        return Err(AppError::BadRequest("client_id must not be blank".to_string()));
    }

    let intake = state
        .store
        .fetch_intake_by_client_id(client_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Client not found".to_string()))?;

    let doc = synthesize(&intake);

    if let Err(e) = persist_document(
        state.store.as_ref(),
        &intake.client_id,
        &state.config.analysis_user_id,
        &doc,
    )
    .await
    {
        tracing::error!(
            "Failed to store on-demand analysis for client {}: {}",
            intake.client_id,
            e
        );
    }

    Ok(Json(doc))
}

#[derive(OpenApi)]
#[openapi(
    paths(health, analyze_portfolio),
    components(schemas(
        HealthResponse,
        PollerStatus,
        AnalysisDocument,
        ClientProfile,
        FinancialSituation,
        InvestmentObjectives,
        RiskProfile,
        RiskTolerance,
        RiskBand,
        InvestmentStrategy,
        SleeveWeights,
        InvestmentVehicles,
        MutualFundSplit,
        PortfolioData,
        PortfolioRecommendation,
        RecommendedPortfolio,
        MarketAnalysis,
        MutualFunds,
        FundListing,
        Bonds,
        BondListing,
        FixedDepositListing
    )),
    tags((name = "portfolio-advisor", description = "Client portfolio analysis"))
)]
pub struct ApiDoc;
