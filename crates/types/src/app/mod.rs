// Path: crates/types/src/app/mod.rs
//! Core ledger data structures: transactions, endorsements and history entries.

use crate::codec::{self, DecodedValue};
use crate::error::LedgerError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The endorser status code for a successful proposal response.
pub const STATUS_OK: u16 = 200;
/// Status codes at or above this threshold are endorsement failures.
pub const STATUS_ERROR_THRESHOLD: u16 = 400;

/// An opaque transaction identifier assigned by the ledger network.
/// Unique within a channel.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct TxId(pub String);

impl TxId {
    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TxId {
    fn from(s: &str) -> Self {
        TxId(s.to_string())
    }
}

/// The identity of an endorsing peer. Ordered lexically, which is the tie-break
/// order used wherever the client must choose deterministically between peers.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct PeerId(pub String);

impl PeerId {
    /// Returns the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(s: &str) -> Self {
        PeerId(s.to_string())
    }
}

/// A state-changing request against a contract on a channel.
///
/// Built by the caller, never mutated, and consumed on submission.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// The contract function to invoke.
    pub function: String,
    /// Ordered, opaque arguments.
    pub args: Vec<Vec<u8>>,
    /// The target contract identifier.
    pub contract_id: String,
    /// The target channel identifier.
    pub channel_id: String,
}

impl Transaction {
    /// Creates a transaction from string arguments.
    pub fn new<I, A>(channel_id: &str, contract_id: &str, function: &str, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: AsRef<[u8]>,
    {
        Self {
            function: function.to_string(),
            args: args.into_iter().map(|a| a.as_ref().to_vec()).collect(),
            contract_id: contract_id.to_string(),
            channel_id: channel_id.to_string(),
        }
    }
}

/// How the network concluded a submission.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The transaction was validated and committed.
    Success,
    /// The network refused the transaction.
    Rejected(String),
    /// The network itself gave up waiting for the commit event. As with a local
    /// timeout, the transaction may still commit later.
    TimedOut,
}

/// The network's answer to a submitted transaction. Immutable once produced.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TransactionResult {
    /// The identifier the network assigned to the transaction.
    pub tx_id: TxId,
    /// The submission outcome.
    pub outcome: SubmissionOutcome,
}

impl TransactionResult {
    /// Returns true only when the network confirmed the commit.
    pub fn is_committed(&self) -> bool {
        matches!(self.outcome, SubmissionOutcome::Success)
    }
}

/// A read-only request sent to every endorsing peer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    /// The target channel identifier.
    pub channel_id: String,
    /// The target contract identifier.
    pub contract_id: String,
    /// The contract function to evaluate.
    pub function: String,
    /// Ordered, opaque arguments.
    pub args: Vec<Vec<u8>>,
}

/// A request for every historical version of a key.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    /// The target channel identifier.
    pub channel_id: String,
    /// The target contract identifier.
    pub contract_id: String,
    /// The key whose history is requested.
    pub key: String,
}

/// One peer's signed answer to a query.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EndorsementResponse {
    /// The endorsing peer.
    pub peer: PeerId,
    /// The raw proposal response payload.
    pub payload: Vec<u8>,
    /// The status code reported by the peer.
    pub status: u16,
    /// The peer's status message; empty on success.
    pub message: String,
    /// The proposal's transaction ID, when the peer reports one.
    pub tx_id: Option<TxId>,
}

impl EndorsementResponse {
    /// Creates a successful response carrying `payload`.
    pub fn ok(peer: &str, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            peer: PeerId::from(peer),
            payload: payload.into(),
            status: STATUS_OK,
            message: String::new(),
            tx_id: None,
        }
    }

    /// Creates a failed response with the given status and message.
    pub fn failed(peer: &str, status: u16, message: &str) -> Self {
        Self {
            peer: PeerId::from(peer),
            payload: Vec::new(),
            status,
            message: message.to_string(),
            tx_id: None,
        }
    }

    /// Attaches the proposal's transaction ID.
    pub fn with_tx_id(mut self, tx_id: TxId) -> Self {
        self.tx_id = Some(tx_id);
        self
    }

    /// Returns true if the peer endorsed the proposal.
    pub fn is_success(&self) -> bool {
        self.status < STATUS_ERROR_THRESHOLD
    }
}

/// The single logical answer produced from a set of agreeing endorsements.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// The decoded payload the endorsers agreed on.
    pub value: DecodedValue,
    /// The proposal's transaction ID, if the endorsers reported one.
    pub tx_id: Option<TxId>,
    /// The peers whose responses make up this result, sorted.
    pub endorsers: Vec<PeerId>,
}

/// One historical version of a key.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// The transaction that wrote this version.
    pub tx_id: TxId,
    /// The raw value snapshot written by the transaction.
    pub snapshot: Vec<u8>,
    /// The position of the write in submission order.
    pub position: i64,
    /// Commit time in seconds since the Unix epoch, when the network reports it.
    pub timestamp: Option<u64>,
    /// True if the transaction deleted the key.
    pub is_delete: bool,
}

impl HistoryEntry {
    /// Creates a history entry for a plain write.
    pub fn new(tx_id: &str, position: i64, snapshot: impl Into<Vec<u8>>) -> Self {
        Self {
            tx_id: TxId::from(tx_id),
            snapshot: snapshot.into(),
            position,
            timestamp: None,
            is_delete: false,
        }
    }

    /// Decodes the snapshot.
    pub fn value(&self) -> Result<DecodedValue, LedgerError> {
        codec::decode(&self.snapshot)
    }
}
