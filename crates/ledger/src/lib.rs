//! Ledger RPC boundary for channelnet.
//!
//! The external ledger accepts every submitted operation into its history
//! unconditionally; only a dry-run replay against the state preceding the
//! operation's inclusion reveals whether its effect was applied or reverted.
//! This crate models that boundary:
//!
//! - [`types`]: operations, receipts, records and outcomes
//! - [`abi`]: interface descriptor loading and calldata encoding
//! - [`client`]: the [`Ledger`] trait and the JSON-RPC implementation
//! - [`memory`]: an in-process ledger for offline runs and tests

pub mod abi;
pub mod client;
pub mod memory;
pub mod types;

pub use abi::{AbiError, InterfaceDescriptor};
pub use client::{JsonRpcLedger, Ledger, LedgerError};
pub use memory::InMemoryLedger;
pub use types::{Operation, Outcome, ParticipantId, Receipt, TransactionRecord};
