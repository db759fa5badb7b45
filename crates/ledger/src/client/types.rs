//! Wire types for JSON-RPC communication with the ledger endpoint.

use serde::{Deserialize, Serialize};

/// A JSON-RPC 2.0 request envelope.
#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: serde_json::Value,
}

impl<'a> JsonRpcRequest<'a> {
    pub fn new(id: u64, method: &'a str, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

/// A JSON-RPC 2.0 response envelope.
#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<JsonRpcErrorObject>,
}

/// The error object carried by a failed JSON-RPC call.
///
/// For `eth_call` replays this is where the ledger's revert payload lands.
#[derive(Clone, Debug, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
}

/// Parameters for a state-changing `eth_sendTransaction` call.
#[derive(Debug, Serialize)]
pub struct SendTransactionParams {
    pub from: String,
    pub to: String,
    pub gas: String,
    pub data: String,
}

/// Parameters for an `eth_call` dry run, rebuilt from a fetched record.
#[derive(Debug, Serialize)]
pub struct CallParams {
    pub from: String,
    pub to: String,
    pub value: String,
    pub data: String,
}

/// Raw transaction object returned by `eth_getTransactionByHash`.
#[derive(Debug, Deserialize)]
pub struct RawTransaction {
    pub hash: String,
    pub from: String,
    pub to: String,
    pub input: String,
    pub value: String,
    #[serde(rename = "blockNumber")]
    pub block_number: String,
}

/// Parse a `0x`-prefixed hex quantity.
pub fn parse_hex_quantity(value: &str) -> Option<u64> {
    u64::from_str_radix(value.strip_prefix("0x")?, 16).ok()
}

/// Format a quantity as `0x`-prefixed hex, the way the RPC expects it.
pub fn format_hex_quantity(value: u64) -> String {
    format!("0x{value:x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_quantity_round_trip() {
        assert_eq!(parse_hex_quantity("0x0"), Some(0));
        assert_eq!(parse_hex_quantity("0x1c8"), Some(456));
        assert_eq!(parse_hex_quantity("456"), None);
        assert_eq!(format_hex_quantity(456), "0x1c8");
    }

    #[test]
    fn test_response_with_error_only() {
        let raw = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"execution reverted"}}"#;
        let response: JsonRpcResponse = serde_json::from_str(raw).unwrap();
        assert!(response.result.is_none());
        assert_eq!(response.error.unwrap().code, -32000);
    }
}
