//! HTTP server for the facilitator API.
//!
//! Routes:
//! - `POST /create` builds an unsigned payment transaction
//! - `POST /submit` settles a signed transaction
//! - `GET /status/{signature}` reports a signature's ledger status
//! - `POST /invoice` issues an x402 payment intent
//! - `POST /verify` checks an encoded payment intent
//! - `GET /health` liveness probe

use crate::apis;
use axum::{
	extract::{rejection::JsonRejection, Path, State},
	http::{HeaderName, HeaderValue, Method, StatusCode},
	response::Json,
	routing::{get, post},
	Router,
};
use facilitator_config::{ApiConfig, CorsConfig};
use facilitator_core::FacilitatorEngine;
use facilitator_types::{
	APIError, CreateInvoiceRequest, CreateTransactionRequest, CreateTransactionResponse,
	HealthResponse, InvoiceResponse, SubmitTransactionRequest, SubmitTransactionResponse,
	TransactionStatusResponse, VerifyPaymentRequest, VerifyPaymentResponse,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Reference to the engine processing requests.
	pub engine: Arc<FacilitatorEngine>,
}

/// Starts the HTTP server for the API.
pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<FacilitatorEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(engine, &api_config);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Facilitator API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Builds the router with all routes and middleware.
pub fn router(engine: Arc<FacilitatorEngine>, api_config: &ApiConfig) -> Router {
	Router::new()
		.route("/create", post(handle_create))
		.route("/submit", post(handle_submit))
		.route("/status/{signature}", get(handle_status))
		.route("/invoice", post(handle_invoice))
		.route("/verify", post(handle_verify))
		.route("/health", get(handle_health))
		.layer(RequestBodyLimitLayer::new(api_config.max_request_size))
		.layer(TimeoutLayer::new(Duration::from_secs(api_config.timeout_seconds)))
		.layer(cors_layer(api_config.cors.as_ref()))
		.layer(TraceLayer::new_for_http())
		.with_state(AppState { engine })
}

/// CORS policy from configuration, permissive when none is configured.
fn cors_layer(cors: Option<&CorsConfig>) -> CorsLayer {
	let Some(cors) = cors.filter(|c| !c.allowed_origins.is_empty()) else {
		return CorsLayer::permissive();
	};

	let origins = if cors.allowed_origins.iter().any(|o| o == "*") {
		AllowOrigin::any()
	} else {
		AllowOrigin::list(
			cors.allowed_origins
				.iter()
				.filter_map(|o| o.parse::<HeaderValue>().ok()),
		)
	};
	let methods = if cors.allowed_methods.is_empty() {
		AllowMethods::any()
	} else {
		AllowMethods::list(
			cors.allowed_methods
				.iter()
				.filter_map(|m| m.parse::<Method>().ok()),
		)
	};
	let headers = if cors.allowed_headers.is_empty() {
		AllowHeaders::any()
	} else {
		AllowHeaders::list(
			cors.allowed_headers
				.iter()
				.filter_map(|h| h.parse::<HeaderName>().ok()),
		)
	};

	CorsLayer::new()
		.allow_origin(origins)
		.allow_methods(methods)
		.allow_headers(headers)
}

/// Unwraps a JSON body, turning extractor rejections into a 400.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, APIError> {
	payload
		.map(|Json(body)| body)
		.map_err(|rejection| APIError::BadRequest {
			error: "Invalid request body".to_string(),
			message: Some(rejection.body_text()),
			details: None,
		})
}

async fn handle_create(
	State(state): State<AppState>,
	payload: Result<Json<CreateTransactionRequest>, JsonRejection>,
) -> Result<Json<CreateTransactionResponse>, APIError> {
	let request = json_body(payload)?;
	match apis::payment::create_transaction(request, &state.engine).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Create request failed: {}", e);
			Err(e)
		},
	}
}

async fn handle_submit(
	State(state): State<AppState>,
	payload: Result<Json<SubmitTransactionRequest>, JsonRejection>,
) -> Result<Json<SubmitTransactionResponse>, APIError> {
	let request = json_body(payload)?;
	match apis::payment::submit_transaction(request, &state.engine).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Submit request failed: {}", e);
			Err(e)
		},
	}
}

async fn handle_status(
	Path(signature): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<TransactionStatusResponse>, APIError> {
	match apis::payment::transaction_status(&signature, &state.engine).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Status request failed: {}", e);
			Err(e)
		},
	}
}

async fn handle_invoice(
	State(state): State<AppState>,
	payload: Result<Json<CreateInvoiceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<InvoiceResponse>), APIError> {
	let request = json_body(payload)?;
	match apis::intent::create_invoice(request, &state.engine) {
		Ok(response) => Ok((StatusCode::CREATED, Json(response))),
		Err(e) => {
			tracing::warn!("Invoice request failed: {}", e);
			Err(e)
		},
	}
}

async fn handle_verify(
	State(state): State<AppState>,
	payload: Result<Json<VerifyPaymentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<VerifyPaymentResponse>), APIError> {
	let request = json_body(payload)?;
	let response = apis::intent::verify_payment(request, &state.engine)?;
	let status = if response.valid {
		StatusCode::OK
	} else {
		StatusCode::BAD_REQUEST
	};
	Ok((status, Json(response)))
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
	Json(apis::health::health(&state.engine))
}
