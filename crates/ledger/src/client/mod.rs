//! The [`Ledger`] trait and its JSON-RPC implementation.
//!
//! The ledger records every submission in its history regardless of whether
//! the effect applied, so the client follows a three-step pattern: submit
//! the operation, fetch its record, then replay the record as a dry run at
//! the state preceding its inclusion to classify the outcome. Reverts are
//! expected outcomes; only transport problems surface as errors.

mod types;

pub use types::*;

use crate::abi::{AbiError, InterfaceDescriptor};
use crate::types::{Operation, Outcome, Receipt, TransactionRecord};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Gas limit attached to every state-changing call.
const GAS_LIMIT: u64 = 30_000_000;

/// Marker preceding the human-readable reason in a revert payload.
const REVERT_MARKER: &str = "revert ";

/// Transport-level errors from the ledger boundary.
///
/// None of these represent a reverted operation; a revert is a normal
/// [`Outcome::Failure`]. Any of these aborts a campaign.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("RPC {method} failed: {message} (code {code})")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },

    #[error("Malformed RPC response: {0}")]
    MalformedResponse(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("No accounts available on the endpoint")]
    NoAccounts,

    #[error(transparent)]
    Abi(#[from] AbiError),
}

/// Capability interface to the external ledger.
///
/// Injected into the provisioning phase and the campaign driver so both are
/// testable against an in-memory ledger.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Submit a state-changing operation. The ledger accepts it into its
    /// history unconditionally; the receipt says nothing about the effect.
    async fn submit(&self, op: &Operation) -> Result<Receipt, LedgerError>;

    /// Fetch the historical record of a submitted operation.
    async fn fetch(&self, receipt: &Receipt) -> Result<TransactionRecord, LedgerError>;

    /// Replay a record as a dry run at the state immediately preceding its
    /// inclusion and classify the result.
    async fn classify(&self, record: &TransactionRecord) -> Result<Outcome, LedgerError>;

    /// Run the full submit -> fetch -> classify cycle for one operation.
    async fn execute(&self, op: &Operation) -> Result<Outcome, LedgerError> {
        let receipt = self.submit(op).await?;
        let record = self.fetch(&receipt).await?;
        self.classify(&record).await
    }
}

/// Extract the human-readable reason from a revert payload.
///
/// The payload carries the reason after the literal `"revert "` marker;
/// payloads without the marker are passed through whole.
pub fn extract_revert_reason(message: &str) -> String {
    match message.find(REVERT_MARKER) {
        Some(idx) => message[idx + REVERT_MARKER.len()..].to_string(),
        None => message.to_string(),
    }
}

/// Ledger client speaking Ethereum-flavoured JSON-RPC over HTTP.
pub struct JsonRpcLedger {
    endpoint: String,
    contract: String,
    sender: String,
    descriptor: InterfaceDescriptor,
    client: Client,
    next_id: AtomicU64,
}

impl JsonRpcLedger {
    /// Per-call timeout; a non-responsive endpoint surfaces as a transport
    /// error instead of blocking the campaign indefinitely.
    const RPC_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connect to an endpoint, using the endpoint's first unlocked account
    /// as the submitting identity.
    pub async fn connect(
        endpoint: impl Into<String>,
        contract: impl Into<String>,
        descriptor: InterfaceDescriptor,
    ) -> Result<Self, LedgerError> {
        let mut ledger = Self::with_sender(endpoint, contract, descriptor, String::new());

        let accounts: Vec<String> = ledger.call_rpc("eth_accounts", serde_json::json!([])).await?;
        let sender = accounts.into_iter().next().ok_or(LedgerError::NoAccounts)?;
        debug!(sender = %sender, "Resolved submitting account");

        ledger.sender = sender;
        Ok(ledger)
    }

    /// Create a client with an explicit submitting account.
    pub fn with_sender(
        endpoint: impl Into<String>,
        contract: impl Into<String>,
        descriptor: InterfaceDescriptor,
        sender: String,
    ) -> Self {
        let client = Client::builder()
            .timeout(Self::RPC_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            endpoint: endpoint.into(),
            contract: contract.into(),
            sender,
            descriptor,
            client,
            next_id: AtomicU64::new(1),
        }
    }

    /// Issue one JSON-RPC call and deserialize its `result` field.
    ///
    /// A populated `error` field maps to [`LedgerError::Rpc`]; `classify`
    /// handles the one case where an error object is meaningful data.
    async fn call_rpc<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, LedgerError> {
        let response = self.call_raw(method, params).await?;

        if let Some(error) = response.error {
            return Err(LedgerError::Rpc {
                method: method.to_string(),
                code: error.code,
                message: error.message,
            });
        }

        // A missing result deserializes as JSON null so that `Option<T>`
        // targets can represent "not found" responses.
        let result = response.result.unwrap_or(serde_json::Value::Null);
        serde_json::from_value(result)
            .map_err(|e| LedgerError::MalformedResponse(format!("{method}: {e}")))
    }

    /// Issue one JSON-RPC call and return the raw envelope.
    async fn call_raw(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<JsonRpcResponse, LedgerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(id, method, params);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        Ok(response.json().await?)
    }
}

#[async_trait]
impl Ledger for JsonRpcLedger {
    async fn submit(&self, op: &Operation) -> Result<Receipt, LedgerError> {
        let params = SendTransactionParams {
            from: self.sender.clone(),
            to: self.contract.clone(),
            gas: format_hex_quantity(GAS_LIMIT),
            data: self.descriptor.encode(op)?,
        };

        let hash: String = self
            .call_rpc("eth_sendTransaction", serde_json::json!([params]))
            .await?;
        debug!(%op, hash = %hash, "Submitted operation");

        Ok(Receipt { hash })
    }

    async fn fetch(&self, receipt: &Receipt) -> Result<TransactionRecord, LedgerError> {
        let raw: Option<RawTransaction> = self
            .call_rpc(
                "eth_getTransactionByHash",
                serde_json::json!([receipt.hash]),
            )
            .await?;

        let raw = raw.ok_or_else(|| LedgerError::TransactionNotFound(receipt.hash.clone()))?;

        let block_number = parse_hex_quantity(&raw.block_number).ok_or_else(|| {
            LedgerError::MalformedResponse(format!("bad block number {:?}", raw.block_number))
        })?;
        let value = parse_hex_quantity(&raw.value)
            .ok_or_else(|| LedgerError::MalformedResponse(format!("bad value {:?}", raw.value)))?;

        Ok(TransactionRecord {
            hash: raw.hash,
            from: raw.from,
            to: raw.to,
            input: raw.input,
            value,
            block_number,
        })
    }

    async fn classify(&self, record: &TransactionRecord) -> Result<Outcome, LedgerError> {
        let params = CallParams {
            from: record.from.clone(),
            to: record.to.clone(),
            value: format_hex_quantity(record.value),
            data: record.input.clone(),
        };
        let prior_block = format_hex_quantity(record.block_number.saturating_sub(1));

        let response = self
            .call_raw("eth_call", serde_json::json!([params, prior_block]))
            .await?;

        // A rejection of the dry run is the ledger telling us the effect
        // reverted, not a transport problem.
        match response.error {
            Some(error) => Ok(Outcome::Failure {
                reason: extract_revert_reason(&error.message),
            }),
            None => Ok(Outcome::Success),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_reason_after_marker() {
        let message =
            "VM Exception while processing transaction: revert insufficient balance in channel";
        assert_eq!(
            extract_revert_reason(message),
            "insufficient balance in channel"
        );
    }

    #[test]
    fn test_extract_reason_without_marker() {
        assert_eq!(extract_revert_reason("out of gas"), "out of gas");
    }

    #[test]
    fn test_extract_reason_empty_after_marker() {
        assert_eq!(extract_revert_reason("execution revert "), "");
    }

    #[test]
    fn test_hex_gas_encoding() {
        assert_eq!(format_hex_quantity(GAS_LIMIT), "0x1c9c380");
    }
}
