//! x402 payment intent API.

use facilitator_core::{FacilitatorEngine, SettlementError};
use facilitator_types::{
	APIError, CreateInvoiceRequest, InvoiceResponse, VerifyPaymentRequest, VerifyPaymentResponse,
};

pub fn create_invoice(
	request: CreateInvoiceRequest,
	engine: &FacilitatorEngine,
) -> Result<InvoiceResponse, APIError> {
	Ok(engine.create_invoice(&request)?)
}

/// Verifies an encoded payment header.
///
/// A rejected intent is a regular outcome carried in the response body with
/// `valid = false`; only unexpected engine failures become an `APIError`.
pub fn verify_payment(
	request: VerifyPaymentRequest,
	engine: &FacilitatorEngine,
) -> Result<VerifyPaymentResponse, APIError> {
	let Some(payment) = request.payment.filter(|p| !p.trim().is_empty()) else {
		return Ok(VerifyPaymentResponse::rejected("Missing payment"));
	};

	match engine.verify_payment(&payment) {
		Ok(response) => Ok(response),
		Err(SettlementError::IntentRejected(reason)) => Ok(VerifyPaymentResponse::rejected(reason)),
		Err(e) => Err(e.into()),
	}
}
