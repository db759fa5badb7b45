//! Types crossing the ledger boundary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a registered participant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ParticipantId {
    fn from(value: u64) -> Self {
        ParticipantId(value)
    }
}

/// A state-changing operation accepted by the ledger contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    /// Register a participant under a display name.
    Register { id: ParticipantId, name: String },
    /// Open a bilateral channel, crediting `capacity` to each side.
    OpenChannel {
        a: ParticipantId,
        b: ParticipantId,
        capacity: u64,
    },
    /// Move `amount` from the sender's side of the channel to the receiver's.
    Pay {
        from: ParticipantId,
        to: ParticipantId,
        amount: u64,
    },
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Register { id, name } => write!(f, "register({id}, {name:?})"),
            Operation::OpenChannel { a, b, capacity } => {
                write!(f, "open_channel({a}, {b}, {capacity})")
            }
            Operation::Pay { from, to, amount } => write!(f, "pay({from}, {to}, {amount})"),
        }
    }
}

/// Handle to a submitted operation.
///
/// Submission never implies the operation's effect was applied; pair this
/// with [`crate::Ledger::fetch`] and [`crate::Ledger::classify`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    /// Transaction hash, hex-encoded with `0x` prefix.
    pub hash: String,
}

/// A transaction record fetched from the ledger's history.
#[derive(Clone, Debug)]
pub struct TransactionRecord {
    /// Transaction hash.
    pub hash: String,
    /// Submitting account.
    pub from: String,
    /// Contract address the call targeted.
    pub to: String,
    /// Hex-encoded calldata.
    pub input: String,
    /// Native value carried by the call (always zero for this contract).
    pub value: u64,
    /// Block in which the transaction was included.
    pub block_number: u64,
}

/// Classified result of a submitted operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The dry-run replay completed; the effect was applied.
    Success,
    /// The dry-run replay reverted; the effect was rolled back.
    Failure {
        /// Human-readable reason extracted from the revert payload.
        reason: String,
    },
}

impl Outcome {
    /// Whether the operation's effect was applied.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    /// The revert reason, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Outcome::Success => None,
            Outcome::Failure { reason } => Some(reason),
        }
    }
}
