//! Payment settlement API.
//!
//! Translates `/create`, `/submit` and `/status` traffic to and from the
//! engine's build, submit and status operations.

use facilitator_core::FacilitatorEngine;
use facilitator_types::{
	APIError, BuildRequest, CreateTransactionRequest, CreateTransactionResponse, PaymentStatus,
	SignedSubmission, StatusRecord, SubmitTransactionRequest, SubmitTransactionResponse,
	TransactionStatusResponse,
};

/// Builds an unsigned payment transaction for the requested agent.
pub async fn create_transaction(
	request: CreateTransactionRequest,
	engine: &FacilitatorEngine,
) -> Result<CreateTransactionResponse, APIError> {
	let envelope = engine
		.build(&BuildRequest {
			service_id: request.agent_id.unwrap_or_default(),
			payer: request.payer.unwrap_or_default(),
		})
		.await?;

	Ok(CreateTransactionResponse {
		success: true,
		transaction: envelope.serialized_tx,
		payment_id: envelope.payment_id,
		agent_id: envelope.service_id,
		amount: envelope.amount,
		amount_display: envelope.amount_display,
		currency: envelope.currency,
		recipient: envelope.recipient.to_string(),
		blockhash: envelope.recent_blockhash.to_string(),
		last_valid_block_height: envelope.last_valid_block_height,
	})
}

/// Settles a signed transaction and waits for confirmation.
pub async fn submit_transaction(
	request: SubmitTransactionRequest,
	engine: &FacilitatorEngine,
) -> Result<SubmitTransactionResponse, APIError> {
	let submission = SignedSubmission {
		signed_tx: request.signed_transaction.unwrap_or_default(),
		payment_id: request.payment_id.filter(|id| !id.trim().is_empty()),
	};

	let result = engine.submit(&submission).await?;

	Ok(SubmitTransactionResponse {
		success: true,
		tx_signature: result.signature.to_string(),
		slot: result.slot,
		payment_id: result.payment_id,
		explorer_url: result.explorer_url,
		solscan_url: result.alt_explorer_url,
	})
}

/// Reports the current ledger status of a signature.
pub async fn transaction_status(
	signature: &str,
	engine: &FacilitatorEngine,
) -> Result<TransactionStatusResponse, APIError> {
	let record = engine.status(signature).await?;
	Ok(status_response(record, engine))
}

fn status_response(record: StatusRecord, engine: &FacilitatorEngine) -> TransactionStatusResponse {
	let status = match record.status {
		PaymentStatus::NotFound => "not_found",
		PaymentStatus::Confirmed => "confirmed",
		PaymentStatus::Failed => "failed",
	};

	TransactionStatusResponse {
		signature: record.signature.to_string(),
		status: status.to_string(),
		slot: record.slot,
		confirmations: record.confirmations,
		confirmation_status: record.confirmation_level.map(|level| level.as_str().to_string()),
		error: record.error,
		explorer_url: engine
			.config()
			.facilitator
			.network
			.explorer_url(&record.signature),
	}
}
