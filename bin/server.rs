// Settlement Workbench - Web Server
// Stateless JSON API over the calculator, reverse solver, and narrative
// provider. The calculator endpoints carry their full inputs in the
// request body, mirroring the pure-function contract of the core.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use settlement_workbench::{
    compute_financials, fallback_narrative, infer_ratio_from_general_amount,
    infer_ratio_from_special_amount, DeductionItem, DeductionMode, DerivedFinancials,
    EstimationParams, EstimationScenario, GeminiNarrativeProvider, NarrativeProvider,
    NarrativeRequest,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::warn;

/// Shared application state
#[derive(Clone)]
struct AppState {
    /// Configured provider, if an API key was supplied at startup
    provider: Option<Arc<GeminiNarrativeProvider>>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

// ============================================================================
// Request / Response bodies
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinancialsRequest {
    settlement_amount: f64,
    deductions: Vec<DeductionItem>,
    mode: DeductionMode,
    scenario: EstimationScenario,
    params: EstimationParams,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpecialRatioRequest {
    tax_inclusive_special: f64,
    base_payable: f64,
    tax_rate: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneralRatioRequest {
    general_amt: f64,
    base_payable: f64,
}

/// Solver response: `updated = false` means the base was degenerate and
/// the caller should retain its current ratio.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RatioResponse {
    updated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    ratio: Option<f64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NarrativeResponse {
    text: String,
    /// "provider" or "fallback"
    source: String,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// POST /api/financials - Full derived financials for one snapshot
async fn post_financials(Json(body): Json<FinancialsRequest>) -> Json<ApiResponse<DerivedFinancials>> {
    let financials = compute_financials(
        body.settlement_amount,
        &body.deductions,
        body.mode,
        body.scenario,
        &body.params,
    );
    Json(ApiResponse::ok(financials))
}

/// POST /api/ratio/special - Infer the mixed ratio from a special amount
async fn post_ratio_special(Json(body): Json<SpecialRatioRequest>) -> Json<ApiResponse<RatioResponse>> {
    let ratio = infer_ratio_from_special_amount(
        body.tax_inclusive_special,
        body.base_payable,
        body.tax_rate,
    );
    Json(ApiResponse::ok(RatioResponse {
        updated: ratio.is_some(),
        ratio,
    }))
}

/// POST /api/ratio/general - Infer the mixed ratio from a general amount
async fn post_ratio_general(Json(body): Json<GeneralRatioRequest>) -> Json<ApiResponse<RatioResponse>> {
    let ratio = infer_ratio_from_general_amount(body.general_amt, body.base_payable);
    Json(ApiResponse::ok(RatioResponse {
        updated: ratio.is_some(),
        ratio,
    }))
}

/// POST /api/narrative - Audit narrative with fallback substitution
async fn post_narrative(
    axum::extract::State(state): axum::extract::State<AppState>,
    Json(request): Json<NarrativeRequest>,
) -> impl IntoResponse {
    let response = match &state.provider {
        Some(provider) => match provider.analyze(&request).await {
            Ok(text) => NarrativeResponse {
                text,
                source: "provider".to_string(),
            },
            Err(e) => {
                warn!(error = %e, "narrative provider failed, substituting fallback");
                NarrativeResponse {
                    text: fallback_narrative(&request),
                    source: "fallback".to_string(),
                }
            }
        },
        None => NarrativeResponse {
            text: fallback_narrative(&request),
            source: "fallback".to_string(),
        },
    };

    (StatusCode::OK, Json(ApiResponse::ok(response)))
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "settlement_server=info,settlement_workbench=info".into()),
        )
        .init();

    println!("🌐 Settlement Workbench - API Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let provider = match std::env::var("GEMINI_API_KEY") {
        Ok(api_key) if !api_key.is_empty() => {
            println!("✓ Narrative provider configured");
            Some(Arc::new(GeminiNarrativeProvider::new(api_key)))
        }
        _ => {
            println!("✓ No GEMINI_API_KEY: narrative endpoint serves the fallback");
            None
        }
    };

    let state = AppState { provider };

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/financials", post(post_financials))
        .route("/ratio/special", post(post_ratio_special))
        .route("/ratio/general", post(post_ratio_general))
        .route("/narrative", post(post_narrative))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    let addr = "0.0.0.0:3000";
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    println!("\n🚀 Server running on http://localhost:3000");
    println!("   API: http://localhost:3000/api/financials");
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
