//! In-process ledger for offline runs and tests.
//!
//! Mirrors the deployed contract's observable behavior: every submission is
//! appended to the history unconditionally, the effect is applied only when
//! valid, and the dry-run replay reports the revert reason through the same
//! payload format the real endpoint uses.

use crate::client::{extract_revert_reason, Ledger, LedgerError};
use crate::types::{Operation, Outcome, ParticipantId, Receipt, TransactionRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// One entry in the ledger's history.
struct Entry {
    record: TransactionRecord,
    /// Raw rejection payload, populated when the effect reverted.
    error: Option<String>,
}

/// A bilateral channel with one balance per side.
struct Channel {
    /// `sides[0]` belongs to the lower participant id, `sides[1]` to the higher.
    sides: [u64; 2],
}

#[derive(Default)]
struct State {
    participants: HashMap<u64, String>,
    channels: HashMap<(u64, u64), Channel>,
    history: Vec<Entry>,
}

impl State {
    /// Apply an operation's effect, returning the revert reason on rejection.
    fn apply(&mut self, op: &Operation) -> Result<(), String> {
        match op {
            Operation::Register { id, name } => {
                if self.participants.contains_key(&id.0) {
                    return Err(format!("user {id} already registered"));
                }
                self.participants.insert(id.0, name.clone());
                Ok(())
            }
            Operation::OpenChannel { a, b, capacity } => {
                self.require_registered(*a)?;
                self.require_registered(*b)?;
                if a == b {
                    return Err(format!("cannot open a channel from user {a} to itself"));
                }

                let key = channel_key(*a, *b);
                if self.channels.contains_key(&key) {
                    return Err(format!("channel between users {a} and {b} already exists"));
                }
                self.channels.insert(
                    key,
                    Channel {
                        sides: [*capacity, *capacity],
                    },
                );
                Ok(())
            }
            Operation::Pay { from, to, amount } => {
                self.require_registered(*from)?;
                self.require_registered(*to)?;
                if from == to {
                    return Err(format!("user {from} cannot pay itself"));
                }

                let key = channel_key(*from, *to);
                let channel = self
                    .channels
                    .get_mut(&key)
                    .ok_or_else(|| format!("no channel between users {from} and {to}"))?;

                let (src, dst) = if from.0 < to.0 { (0, 1) } else { (1, 0) };
                if channel.sides[src] < *amount {
                    return Err("insufficient balance in channel".to_string());
                }
                channel.sides[src] -= amount;
                channel.sides[dst] += amount;
                Ok(())
            }
        }
    }

    fn require_registered(&self, id: ParticipantId) -> Result<(), String> {
        if self.participants.contains_key(&id.0) {
            Ok(())
        } else {
            Err(format!("user {id} not registered"))
        }
    }
}

fn channel_key(a: ParticipantId, b: ParticipantId) -> (u64, u64) {
    (a.0.min(b.0), a.0.max(b.0))
}

/// Deterministic in-memory implementation of [`Ledger`].
#[derive(Default)]
pub struct InMemoryLedger {
    state: RwLock<State>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of transactions in the history, reverted ones included.
    pub async fn history_len(&self) -> usize {
        self.state.read().await.history.len()
    }

    /// Current per-side balances of a channel, `(lower id side, higher id side)`.
    pub async fn channel_balance(
        &self,
        a: ParticipantId,
        b: ParticipantId,
    ) -> Option<(u64, u64)> {
        let state = self.state.read().await;
        state
            .channels
            .get(&channel_key(a, b))
            .map(|c| (c.sides[0], c.sides[1]))
    }

    /// Whether a participant id has been registered.
    pub async fn is_registered(&self, id: ParticipantId) -> bool {
        self.state.read().await.participants.contains_key(&id.0)
    }

    fn hash_for_index(index: usize) -> String {
        format!("0x{:064x}", index + 1)
    }

    fn index_for_hash(hash: &str) -> Option<usize> {
        let index = usize::from_str_radix(hash.strip_prefix("0x")?, 16).ok()?;
        index.checked_sub(1)
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn submit(&self, op: &Operation) -> Result<Receipt, LedgerError> {
        let mut state = self.state.write().await;

        let error = state
            .apply(op)
            .err()
            .map(|reason| format!("VM Exception while processing transaction: revert {reason}"));

        let index = state.history.len();
        let hash = Self::hash_for_index(index);
        let record = TransactionRecord {
            hash: hash.clone(),
            from: "0x0".to_string(),
            to: "memory".to_string(),
            input: "0x".to_string(),
            value: 0,
            block_number: index as u64 + 1,
        };
        state.history.push(Entry { record, error });

        Ok(Receipt { hash })
    }

    async fn fetch(&self, receipt: &Receipt) -> Result<TransactionRecord, LedgerError> {
        let state = self.state.read().await;
        Self::index_for_hash(&receipt.hash)
            .and_then(|index| state.history.get(index))
            .map(|entry| entry.record.clone())
            .ok_or_else(|| LedgerError::TransactionNotFound(receipt.hash.clone()))
    }

    async fn classify(&self, record: &TransactionRecord) -> Result<Outcome, LedgerError> {
        let state = self.state.read().await;
        let entry = Self::index_for_hash(&record.hash)
            .and_then(|index| state.history.get(index))
            .ok_or_else(|| LedgerError::TransactionNotFound(record.hash.clone()))?;

        Ok(match &entry.error {
            Some(payload) => Outcome::Failure {
                reason: extract_revert_reason(payload),
            },
            None => Outcome::Success,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(id: u64) -> Operation {
        Operation::Register {
            id: ParticipantId(id),
            name: format!("User_{id}"),
        }
    }

    fn open(a: u64, b: u64, capacity: u64) -> Operation {
        Operation::OpenChannel {
            a: ParticipantId(a),
            b: ParticipantId(b),
            capacity,
        }
    }

    fn pay(from: u64, to: u64, amount: u64) -> Operation {
        Operation::Pay {
            from: ParticipantId(from),
            to: ParticipantId(to),
            amount,
        }
    }

    #[tokio::test]
    async fn test_register_and_duplicate() {
        let ledger = InMemoryLedger::new();

        assert_eq!(ledger.execute(&register(0)).await.unwrap(), Outcome::Success);
        assert!(ledger.is_registered(ParticipantId(0)).await);

        let outcome = ledger.execute(&register(0)).await.unwrap();
        assert_eq!(outcome.reason(), Some("user 0 already registered"));
    }

    #[tokio::test]
    async fn test_open_channel_requires_registration() {
        let ledger = InMemoryLedger::new();
        let outcome = ledger.execute(&open(0, 1, 5)).await.unwrap();
        assert_eq!(outcome.reason(), Some("user 0 not registered"));
    }

    #[tokio::test]
    async fn test_pay_moves_balance_between_sides() {
        let ledger = InMemoryLedger::new();
        ledger.execute(&register(0)).await.unwrap();
        ledger.execute(&register(1)).await.unwrap();
        ledger.execute(&open(0, 1, 5)).await.unwrap();

        assert_eq!(ledger.execute(&pay(1, 0, 3)).await.unwrap(), Outcome::Success);
        assert_eq!(
            ledger.channel_balance(ParticipantId(0), ParticipantId(1)).await,
            Some((8, 2))
        );
    }

    #[tokio::test]
    async fn test_pay_insufficient_balance_reverts() {
        let ledger = InMemoryLedger::new();
        ledger.execute(&register(0)).await.unwrap();
        ledger.execute(&register(1)).await.unwrap();
        ledger.execute(&open(0, 1, 2)).await.unwrap();

        let outcome = ledger.execute(&pay(0, 1, 3)).await.unwrap();
        assert_eq!(outcome.reason(), Some("insufficient balance in channel"));

        // The failed payment left the balances untouched.
        assert_eq!(
            ledger.channel_balance(ParticipantId(0), ParticipantId(1)).await,
            Some((2, 2))
        );
    }

    #[tokio::test]
    async fn test_pay_without_channel_reverts() {
        let ledger = InMemoryLedger::new();
        ledger.execute(&register(0)).await.unwrap();
        ledger.execute(&register(1)).await.unwrap();

        let outcome = ledger.execute(&pay(0, 1, 1)).await.unwrap();
        assert_eq!(outcome.reason(), Some("no channel between users 0 and 1"));
    }

    #[tokio::test]
    async fn test_reverted_submissions_still_enter_history() {
        let ledger = InMemoryLedger::new();
        ledger.execute(&register(0)).await.unwrap();
        ledger.execute(&register(0)).await.unwrap(); // reverted duplicate

        assert_eq!(ledger.history_len().await, 2);

        // Both records remain individually classifiable.
        let first = ledger.fetch(&Receipt { hash: InMemoryLedger::hash_for_index(0) }).await.unwrap();
        let second = ledger.fetch(&Receipt { hash: InMemoryLedger::hash_for_index(1) }).await.unwrap();
        assert_eq!(ledger.classify(&first).await.unwrap(), Outcome::Success);
        assert!(!ledger.classify(&second).await.unwrap().is_success());
    }

    #[tokio::test]
    async fn test_unknown_hash_is_transport_error() {
        let ledger = InMemoryLedger::new();
        let result = ledger
            .fetch(&Receipt {
                hash: "0xdeadbeef".to_string(),
            })
            .await;
        assert!(matches!(result, Err(LedgerError::TransactionNotFound(_))));
    }
}
