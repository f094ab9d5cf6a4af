//! HTTP endpoint for portfolio analysis.
//!
//! `POST /analyze` fetches prices for the requested tickers, runs the
//! analysis pipeline and returns an [`AnalysisResponse`]. Tickers that cannot
//! be fetched are reported as warnings as long as the rest still produce
//! enough aligned data.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::analysis::{AnalysisOptions, AnalysisResponse, PortfolioAnalysis};
use crate::config::ServerConfig;
use crate::market_data::{fetch_price_table, restrict_weights, DateRange, PriceSource};
use crate::types::{ApiResponse, WeightVector};
use crate::{Error, Result};

/// State shared across handlers.
pub struct AppState {
    pub source: Arc<dyn PriceSource>,
    pub options: AnalysisOptions,
}

impl AppState {
    pub fn new(source: Arc<dyn PriceSource>, options: AnalysisOptions) -> Self {
        Self { source, options }
    }
}

/// Body of `POST /analyze`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub tickers: Vec<String>,
    /// Fractions summing to 1 or percentages summing to 100; equal
    /// weighting when omitted
    #[serde(default)]
    pub weights: Option<Vec<f64>>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Overrides the configured annualization setting
    #[serde(default)]
    pub annualize: Option<bool>,
}

/// Fetch, align and analyze one request.
pub async fn analyze(
    source: &dyn PriceSource,
    request: &AnalyzeRequest,
    defaults: &AnalysisOptions,
) -> Result<AnalysisResponse> {
    let tickers = request
        .tickers
        .iter()
        .map(|t| {
            let t = t.trim().to_uppercase();
            if t.is_empty() {
                Err(Error::InvalidInput("ticker must not be empty".to_string()))
            } else {
                Ok(t)
            }
        })
        .collect::<Result<Vec<String>>>()?;
    if tickers.is_empty() {
        return Err(Error::InvalidInput("at least one ticker is required".to_string()));
    }

    // Validate weights before spending any requests on the provider.
    let requested_weights = request
        .weights
        .clone()
        .map(WeightVector::from_user_input)
        .transpose()?;
    if let Some(w) = &requested_weights {
        if w.len() != tickers.len() {
            return Err(Error::InvalidWeights(format!(
                "expected {} weights, got {}",
                tickers.len(),
                w.len()
            )));
        }
    }

    let range = DateRange::new(request.start_date, request.end_date)?;
    let outcome = fetch_price_table(source, &tickers, range).await?;

    let weights = match &requested_weights {
        Some(w) if outcome.unavailable.is_empty() => Some(w.clone()),
        Some(w) => Some(restrict_weights(&tickers, w, outcome.table.tickers())?),
        None => None,
    };

    let options = AnalysisOptions {
        annualize: request.annualize.unwrap_or(defaults.annualize),
        ..*defaults
    };

    let analysis = PortfolioAnalysis::run(&outcome.table, weights.as_ref(), &options)?;
    tracing::info!(
        tickers = ?analysis.tickers,
        periods = analysis.metrics.periods,
        "portfolio analyzed"
    );
    Ok(analysis.to_response(outcome.warnings()))
}

/// HTTP status for an analysis failure.
pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::InvalidInput(_)
        | Error::InvalidWeights(_)
        | Error::InsufficientData(_)
        | Error::AssetUnavailable { .. }
        | Error::NoValidData => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn analyze_portfolio(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "malformed analyze request");
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::<()>::err(rejection.body_text())),
            )
                .into_response();
        }
    };

    match analyze(state.source.as_ref(), &request, &state.options).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            let status = status_for(&e);
            if status.is_server_error() {
                tracing::error!(error = %e, "analysis failed");
            } else {
                tracing::warn!(error = %e, "analysis rejected");
            }
            (status, Json(ApiResponse::<()>::err(e.to_string()))).into_response()
        }
    }
}

async fn home() -> &'static str {
    "Portfolio risk analyzer is running"
}

async fn health_check() -> &'static str {
    "ok"
}

/// Build the application router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health_check))
        .route("/analyze", post(analyze_portfolio))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(config: &ServerConfig, state: Arc<AppState>) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| Error::Config(format!("invalid listen address: {}", e)))?;

    let app = create_router(state);
    tracing::info!("Analyzer listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::InMemoryPriceSource;
    use crate::types::PricePoint;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn series(closes: &[f64]) -> Vec<PricePoint> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PricePoint::new(date(2 + i as u32), c))
            .collect()
    }

    fn state() -> Arc<AppState> {
        let source = InMemoryPriceSource::new()
            .with_series("A", series(&[100.0, 110.0, 99.0]))
            .with_series("B", series(&[50.0, 50.0, 55.0]))
            .with_series("C", series(&[20.0, 21.0, 22.0]));
        Arc::new(AppState::new(
            Arc::new(source),
            AnalysisOptions {
                annualize: false,
                ..Default::default()
            },
        ))
    }

    fn request(tickers: &[&str], weights: Option<Vec<f64>>) -> AnalyzeRequest {
        AnalyzeRequest {
            tickers: tickers.iter().map(|t| t.to_string()).collect(),
            weights,
            start_date: date(1),
            end_date: date(31),
            annualize: None,
        }
    }

    #[tokio::test]
    async fn test_analyze_equal_weights() {
        let state = state();
        let response = analyze(state.source.as_ref(), &request(&["a", "b"], None), &state.options)
            .await
            .unwrap();

        assert_eq!(response.tickers, vec!["A".to_string(), "B".to_string()]);
        assert!(!response.annualized);
        assert!((response.expected_return - 0.025).abs() < 1e-12);
        assert_eq!(response.max_drawdown, 0.0);
        assert!(response.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_analyze_percentage_weights() {
        let state = state();
        let response = analyze(
            state.source.as_ref(),
            &request(&["A", "B"], Some(vec![40.0, 60.0])),
            &state.options,
        )
        .await
        .unwrap();
        assert_eq!(response.weights, vec![0.4, 0.6]);
    }

    #[tokio::test]
    async fn test_analyze_rejects_bad_weights() {
        let state = state();
        let err = analyze(
            state.source.as_ref(),
            &request(&["A", "B"], Some(vec![0.5, 0.6])),
            &state.options,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::InvalidWeights(_)));
        assert_eq!(status_for(&err), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_analyze_partial_failure_renormalizes() {
        let state = state();
        let response = analyze(
            state.source.as_ref(),
            &request(&["A", "MISSING", "C"], Some(vec![0.25, 0.5, 0.25])),
            &state.options,
        )
        .await
        .unwrap();

        assert_eq!(response.tickers, vec!["A".to_string(), "C".to_string()]);
        assert_eq!(response.weights, vec![0.5, 0.5]);
        assert_eq!(response.warnings.len(), 1);
        assert!(response.warnings[0].contains("MISSING"));
    }

    #[tokio::test]
    async fn test_analyze_skips_asset_without_usable_prices() {
        let source = InMemoryPriceSource::new()
            .with_series("A", series(&[100.0, 110.0, 99.0]))
            .with_series("B", series(&[50.0, 50.0, 55.0]))
            .with_series("BAD", series(&[0.0, 0.0, 0.0]));
        let response = analyze(
            &source,
            &request(&["A", "B", "BAD"], None),
            &AnalysisOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(response.tickers, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(response.weights, vec![0.5, 0.5]);
        assert_eq!(response.warnings.len(), 1);
        assert!(response.warnings[0].starts_with("BAD"));
    }

    #[tokio::test]
    async fn test_analyze_rejects_empty_ticker() {
        let state = state();
        let err = analyze(
            state.source.as_ref(),
            &request(&["A", " ", "B"], Some(vec![0.2, 0.3, 0.5])),
            &state.options,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_analyze_no_valid_data() {
        let state = state();
        let err = analyze(state.source.as_ref(), &request(&["X", "Y"], None), &state.options)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoValidData));
    }

    #[tokio::test]
    async fn test_router_analyze() {
        let app = create_router(state());
        let body = serde_json::json!({
            "tickers": ["A", "B"],
            "start_date": "2024-01-01",
            "end_date": "2024-01-31",
            "annualize": true
        });

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/analyze")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["annualized"], true);
        assert_eq!(json["tickers"][1], "B");
        assert_eq!(json["correlation_matrix"][1][1], 1.0);
    }

    #[tokio::test]
    async fn test_router_error_body() {
        let app = create_router(state());
        let body = serde_json::json!({
            "tickers": ["NOPE"],
            "start_date": "2024-01-01",
            "end_date": "2024-01-31"
        });

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/analyze")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["ok"], false);
        assert!(json["error"].as_str().unwrap().contains("no valid data"));
    }

    #[tokio::test]
    async fn test_router_malformed_body() {
        for body in [r#"{"tickers": ["A"]"#, r#"{"tickers": ["A"]}"#] {
            let response = create_router(state())
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri("/analyze")
                        .header("content-type", "application/json")
                        .body(Body::from(body))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);

            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(json["ok"], false);
            assert!(!json["error"].as_str().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_router_home() {
        let app = create_router(state());
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
