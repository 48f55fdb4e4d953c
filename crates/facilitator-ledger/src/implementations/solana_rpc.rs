//! JSON-RPC ledger client.
//!
//! Speaks JSON-RPC 2.0 over HTTP to a ledger node. Transactions travel base64
//! encoded and are simulated before broadcast at the `confirmed` commitment.

use crate::{LedgerError, LedgerFactory, LedgerInterface, LedgerRegistry};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use facilitator_types::{
	AccountInfo, Address, BlockReference, ConfigSchema, ConfirmationLevel, Field, FieldType,
	Hash, ImplementationRegistry, Schema, Signature, SignatureStatus, ValidationError,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// JSON-RPC code for a failed preflight simulation.
const PREFLIGHT_FAILURE: i64 = -32002;

/// Ledger client backed by a JSON-RPC node.
pub struct SolanaRpcLedger {
	client: reqwest::Client,
	rpc_url: String,
	commitment: ConfirmationLevel,
	search_transaction_history: bool,
	next_id: AtomicU64,
}

impl SolanaRpcLedger {
	pub fn new(
		rpc_url: String,
		commitment: ConfirmationLevel,
		request_timeout: Duration,
		search_transaction_history: bool,
	) -> Result<Self, LedgerError> {
		let client = reqwest::Client::builder()
			.timeout(request_timeout)
			.build()
			.map_err(|e| LedgerError::Configuration(format!("Failed to build client: {}", e)))?;
		Ok(Self {
			client,
			rpc_url,
			commitment,
			search_transaction_history,
			next_id: AtomicU64::new(1),
		})
	}

	async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, LedgerError> {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let request = json!({
			"jsonrpc": "2.0",
			"id": id,
			"method": method,
			"params": params,
		});

		let response = self
			.client
			.post(&self.rpc_url)
			.json(&request)
			.send()
			.await
			.map_err(|e| LedgerError::Network(format!("{} request failed: {}", method, e)))?;

		let body: RpcResponse<T> = response
			.json()
			.await
			.map_err(|e| LedgerError::InvalidResponse(format!("{}: {}", method, e)))?;

		match (body.result, body.error) {
			(_, Some(error)) => Err(LedgerError::Rpc {
				code: error.code,
				message: error.message,
				data: error.data,
			}),
			(Some(result), None) => Ok(result),
			(None, None) => Err(LedgerError::InvalidResponse(format!(
				"{}: response has neither result nor error",
				method
			))),
		}
	}

	fn commitment_config(&self) -> Value {
		json!({ "commitment": self.commitment.as_str() })
	}
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
	result: Option<T>,
	error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
	code: i64,
	message: String,
	#[serde(default)]
	data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct WithContext<T> {
	value: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockhashValue {
	blockhash: String,
	last_valid_block_height: u64,
}

#[derive(Debug, Deserialize)]
struct RpcAccount {
	lamports: u64,
	owner: String,
	/// `[payload, encoding]`
	data: (String, String),
	executable: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcSignatureStatus {
	slot: u64,
	confirmations: Option<u64>,
	err: Option<Value>,
	confirmation_status: Option<ConfirmationLevel>,
}

/// Maps a `sendTransaction` RPC error to the ledger error taxonomy.
///
/// A failed preflight carries the simulated transaction error in `data.err`;
/// a stale block hash is reported separately so callers can ask the payer to
/// rebuild.
fn classify_send_error(error: LedgerError) -> LedgerError {
	let (code, message, data) = match error {
		LedgerError::Rpc {
			code,
			message,
			data,
		} => (code, message, data),
		other => return other,
	};

	let simulated = data
		.as_ref()
		.and_then(|data| data.get("err"))
		.filter(|err| !err.is_null())
		.cloned();

	match simulated {
		Some(Value::String(err)) if err == "BlockhashNotFound" => LedgerError::BlockhashExpired,
		Some(err) if code == PREFLIGHT_FAILURE => LedgerError::TransactionRejected(err),
		_ if message.contains("Blockhash not found") => LedgerError::BlockhashExpired,
		_ => LedgerError::Rpc {
			code,
			message,
			data,
		},
	}
}

fn parse<T: std::str::FromStr>(value: &str, what: &str) -> Result<T, LedgerError>
where
	T::Err: std::fmt::Display,
{
	value
		.parse()
		.map_err(|e| LedgerError::InvalidResponse(format!("invalid {} '{}': {}", what, value, e)))
}

#[async_trait]
impl LedgerInterface for SolanaRpcLedger {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(SolanaRpcSchema)
	}

	async fn get_latest_blockhash(&self) -> Result<BlockReference, LedgerError> {
		let response: WithContext<BlockhashValue> = self
			.call("getLatestBlockhash", json!([self.commitment_config()]))
			.await?;
		Ok(BlockReference {
			blockhash: parse(&response.value.blockhash, "blockhash")?,
			last_valid_block_height: response.value.last_valid_block_height,
		})
	}

	async fn get_account_info(
		&self,
		address: &Address,
	) -> Result<Option<AccountInfo>, LedgerError> {
		let response: WithContext<Option<RpcAccount>> = self
			.call(
				"getAccountInfo",
				json!([
					address.to_string(),
					{ "encoding": "base64", "commitment": self.commitment.as_str() }
				]),
			)
			.await?;

		response
			.value
			.map(|account| {
				let data = STANDARD.decode(&account.data.0).map_err(|e| {
					LedgerError::InvalidResponse(format!("invalid account data: {}", e))
				})?;
				Ok(AccountInfo {
					lamports: account.lamports,
					owner: parse(&account.owner, "owner")?,
					data,
					executable: account.executable,
				})
			})
			.transpose()
	}

	async fn send_raw_transaction(&self, tx: &[u8]) -> Result<Signature, LedgerError> {
		let signature: String = self
			.call(
				"sendTransaction",
				json!([
					STANDARD.encode(tx),
					{
						"encoding": "base64",
						"skipPreflight": false,
						"preflightCommitment": ConfirmationLevel::Confirmed.as_str(),
					}
				]),
			)
			.await
			.map_err(classify_send_error)?;
		parse(&signature, "signature")
	}

	async fn get_signature_status(
		&self,
		signature: &Signature,
	) -> Result<Option<SignatureStatus>, LedgerError> {
		let response: WithContext<Vec<Option<RpcSignatureStatus>>> = self
			.call(
				"getSignatureStatuses",
				json!([
					[signature.to_string()],
					{ "searchTransactionHistory": self.search_transaction_history }
				]),
			)
			.await?;

		Ok(response
			.value
			.into_iter()
			.next()
			.flatten()
			.map(|status| SignatureStatus {
				slot: status.slot,
				confirmations: status.confirmations,
				err: status.err,
				confirmation_status: status.confirmation_status,
			}))
	}

	async fn get_block_height(&self) -> Result<u64, LedgerError> {
		self.call("getBlockHeight", json!([self.commitment_config()]))
			.await
	}

	async fn is_blockhash_valid(&self, blockhash: &Hash) -> Result<bool, LedgerError> {
		let response: WithContext<bool> = self
			.call(
				"isBlockhashValid",
				json!([blockhash.to_string(), self.commitment_config()]),
			)
			.await?;
		Ok(response.value)
	}
}

/// Configuration schema for the JSON-RPC ledger client.
pub struct SolanaRpcSchema;

impl ConfigSchema for SolanaRpcSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("rpc_url", FieldType::Url)],
			vec![
				Field::new("commitment", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some("processed" | "confirmed" | "finalized") => Ok(()),
						_ => Err("must be processed, confirmed or finalized".to_string()),
					}
				}),
				Field::new(
					"request_timeout_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(300),
					},
				),
				Field::new("search_transaction_history", FieldType::Boolean),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create a JSON-RPC ledger client from configuration.
///
/// Configuration parameters:
/// - `rpc_url`: node endpoint (required)
/// - `commitment`: level for reads, default `confirmed`
/// - `request_timeout_seconds`: per-request timeout, default 30
/// - `search_transaction_history`: look beyond the recent status cache, default true
pub fn create_ledger(config: &toml::Value) -> Result<Box<dyn LedgerInterface>, LedgerError> {
	SolanaRpcSchema
		.validate(config)
		.map_err(|e| LedgerError::Configuration(format!("Invalid configuration: {}", e)))?;

	let rpc_url = config
		.get("rpc_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| LedgerError::Configuration("rpc_url is required".to_string()))?
		.to_string();

	let commitment = match config.get("commitment").and_then(|v| v.as_str()) {
		Some("processed") => ConfirmationLevel::Processed,
		Some("finalized") => ConfirmationLevel::Finalized,
		_ => ConfirmationLevel::Confirmed,
	};

	let timeout_seconds = config
		.get("request_timeout_seconds")
		.and_then(|v| v.as_integer())
		.unwrap_or(30) as u64;

	let search_transaction_history = config
		.get("search_transaction_history")
		.and_then(|v| v.as_bool())
		.unwrap_or(true);

	let ledger = SolanaRpcLedger::new(
		rpc_url,
		commitment,
		Duration::from_secs(timeout_seconds),
		search_transaction_history,
	)?;
	Ok(Box::new(ledger))
}

/// Registry for the JSON-RPC ledger implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "solana_rpc";
	type Factory = LedgerFactory;

	fn factory() -> Self::Factory {
		create_ledger
	}
}

impl LedgerRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	fn rpc_error(code: i64, message: &str, data: Option<Value>) -> LedgerError {
		LedgerError::Rpc {
			code,
			message: message.to_string(),
			data,
		}
	}

	#[test]
	fn test_preflight_failure_is_rejection() {
		let error = classify_send_error(rpc_error(
			-32002,
			"Transaction simulation failed: Error processing Instruction 0",
			Some(json!({"err": {"InstructionError": [0, {"Custom": 0}]}, "logs": []})),
		));
		match error {
			LedgerError::TransactionRejected(err) => {
				assert_eq!(err["InstructionError"][0], 0);
			},
			other => panic!("unexpected error: {other:?}"),
		}
	}

	#[test]
	fn test_blockhash_not_found_is_expiry() {
		let error = classify_send_error(rpc_error(
			-32002,
			"Transaction simulation failed: Blockhash not found",
			Some(json!({"err": "BlockhashNotFound", "logs": []})),
		));
		assert!(matches!(error, LedgerError::BlockhashExpired));
	}

	#[test]
	fn test_other_errors_pass_through() {
		let error = classify_send_error(rpc_error(-32003, "signature verification failure", None));
		assert!(matches!(error, LedgerError::Rpc { code: -32003, .. }));

		let error = classify_send_error(LedgerError::Network("timeout".into()));
		assert!(matches!(error, LedgerError::Network(_)));
	}

	#[test]
	fn test_signature_status_parsing() {
		let body = r#"{
			"jsonrpc": "2.0",
			"id": 1,
			"result": {
				"context": {"slot": 82},
				"value": [{
					"slot": 72,
					"confirmations": 10,
					"err": null,
					"status": {"Ok": null},
					"confirmationStatus": "confirmed"
				}, null]
			}
		}"#;
		let response: RpcResponse<WithContext<Vec<Option<RpcSignatureStatus>>>> =
			serde_json::from_str(body).unwrap();
		let statuses = response.result.unwrap().value;
		let first = statuses[0].as_ref().unwrap();
		assert_eq!(first.slot, 72);
		assert_eq!(first.confirmation_status, Some(ConfirmationLevel::Confirmed));
		assert!(first.err.is_none());
		assert!(statuses[1].is_none());
	}

	#[test]
	fn test_error_body_parsing() {
		let body = r#"{"jsonrpc":"2.0","id":3,"error":{"code":-32602,"message":"Invalid params"}}"#;
		let response: RpcResponse<Value> = serde_json::from_str(body).unwrap();
		assert!(response.result.is_none());
		let error = response.error.unwrap();
		assert_eq!(error.code, -32602);
		assert!(error.data.is_none());
	}

	#[test]
	fn test_account_parsing() {
		let body = r#"{"context":{"slot":1},"value":{"lamports":2039280,"owner":"TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA","data":["AQID","base64"],"executable":false,"rentEpoch":0}}"#;
		let response: WithContext<Option<RpcAccount>> = serde_json::from_str(body).unwrap();
		let account = response.value.unwrap();
		assert_eq!(account.data.0, "AQID");
		assert_eq!(account.lamports, 2_039_280);
	}

	#[test]
	fn test_factory_validation() {
		let valid: toml::Value =
			toml::from_str("rpc_url = \"https://api.devnet.solana.com\"\ncommitment = \"finalized\"")
				.unwrap();
		assert!(create_ledger(&valid).is_ok());

		let missing: toml::Value = toml::from_str("commitment = \"confirmed\"").unwrap();
		assert!(matches!(
			create_ledger(&missing),
			Err(LedgerError::Configuration(_))
		));

		let bad_level: toml::Value =
			toml::from_str("rpc_url = \"http://localhost:8899\"\ncommitment = \"max\"").unwrap();
		assert!(create_ledger(&bad_level).is_err());
	}
}
