//! API types for the facilitator HTTP API.
//!
//! This module defines the request and response bodies of the settlement
//! endpoints together with the structured error type the handlers return.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Request to build an unsigned payment transaction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionRequest {
	/// Priced service identifier
	#[serde(default)]
	pub agent_id: Option<String>,
	/// Base58 address of the paying wallet
	#[serde(default)]
	pub payer: Option<String>,
}

/// Unsigned transaction returned to the caller for signing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionResponse {
	pub success: bool,
	/// Base64 transaction with an empty signature slot
	pub transaction: String,
	pub payment_id: String,
	pub agent_id: String,
	/// Amount in the asset's smallest unit
	pub amount: u64,
	pub amount_display: String,
	pub currency: String,
	pub recipient: String,
	pub blockhash: String,
	pub last_valid_block_height: u64,
}

/// Request to settle a signed transaction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTransactionRequest {
	/// Base64 signed transaction in either wire format
	#[serde(default)]
	pub signed_transaction: Option<String>,
	#[serde(default)]
	pub payment_id: Option<String>,
}

/// Confirmed settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTransactionResponse {
	pub success: bool,
	pub tx_signature: String,
	pub slot: u64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub payment_id: Option<String>,
	pub explorer_url: String,
	pub solscan_url: String,
}

/// Current state of a transaction signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStatusResponse {
	pub signature: String,
	/// One of `not_found`, `confirmed`, `failed`
	pub status: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub slot: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub confirmations: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub confirmation_status: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<serde_json::Value>,
	pub explorer_url: String,
}

/// Request to issue an x402 invoice.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
	#[serde(default)]
	pub agent_id: Option<String>,
	#[serde(default)]
	pub payer: Option<String>,
	/// Overrides the catalog price, in the token's smallest unit
	#[serde(default)]
	pub amount: Option<String>,
	#[serde(default)]
	pub task_metadata: Option<serde_json::Value>,
}

/// An issued invoice with its encoded payment header.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceResponse {
	pub invoice_id: String,
	pub agent_id: String,
	pub amount: String,
	pub amount_display: String,
	pub currency: String,
	pub payer: String,
	pub recipient: String,
	pub network: String,
	pub expires_at: u64,
	pub created_at: u64,
	pub payment_payload: crate::PaymentIntent,
	pub x_payment_header: String,
}

/// Request to verify an encoded payment header.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyPaymentRequest {
	#[serde(default)]
	pub payment: Option<String>,
}

/// Outcome of payment verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
	pub valid: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub payment_id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub payer: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub recipient: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub amount: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub agent_id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

impl VerifyPaymentResponse {
	pub fn rejected(error: impl Into<String>) -> Self {
		Self {
			valid: false,
			payment_id: None,
			payer: None,
			recipient: None,
			amount: None,
			agent_id: None,
			error: Some(error.into()),
		}
	}
}

/// Liveness probe body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
	pub status: String,
	pub service: String,
	pub timestamp: String,
}

/// API error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Always false
	pub success: bool,
	/// Short error summary
	pub error: String,
	/// Human-readable description
	#[serde(skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	/// Additional error context, e.g. the on-chain error
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
}

/// Structured API error type with appropriate HTTP status mapping.
#[derive(Debug)]
pub enum APIError {
	/// Bad request, client input or an on-chain rejection (400)
	BadRequest {
		error: String,
		message: Option<String>,
		details: Option<serde_json::Value>,
	},
	/// Unknown resource (404)
	NotFound { error: String, message: String },
	/// Request conflicts with the state recorded for it (409)
	Conflict { error: String, message: String },
	/// Internal server error, including upstream failures (500)
	InternalServerError { error: String, message: String },
}

impl APIError {
	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			APIError::BadRequest { .. } => 400,
			APIError::NotFound { .. } => 404,
			APIError::Conflict { .. } => 409,
			APIError::InternalServerError { .. } => 500,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		match self {
			APIError::BadRequest {
				error,
				message,
				details,
			} => ErrorResponse {
				success: false,
				error: error.clone(),
				message: message.clone(),
				details: details.clone(),
			},
			APIError::NotFound { error, message }
			| APIError::Conflict { error, message }
			| APIError::InternalServerError { error, message } => ErrorResponse {
				success: false,
				error: error.clone(),
				message: Some(message.clone()),
				details: None,
			},
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			APIError::BadRequest { error, .. } => write!(f, "Bad Request: {}", error),
			APIError::NotFound { message, .. } => write!(f, "Not Found: {}", message),
			APIError::Conflict { message, .. } => write!(f, "Conflict: {}", message),
			APIError::InternalServerError { message, .. } => {
				write!(f, "Internal Server Error: {}", message)
			},
		}
	}
}

impl std::error::Error for APIError {}

impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = StatusCode::from_u16(self.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}
