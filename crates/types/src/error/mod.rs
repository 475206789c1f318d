// Path: crates/types/src/error/mod.rs
//! Core error types for the ledger client.

use crate::app::{PeerId, TxId};
use std::time::Duration;
use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// Every failure a caller of the ledger client can observe.
///
/// Decoder and aggregation errors are surfaced exactly as produced: a disagreement
/// between endorsers or a garbled payload is a correctness signal, not something
/// the client recovers from locally.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// An operation other than `initialize`/`close` was attempted outside the
    /// `Connected` state.
    #[error("Client is not connected to the ledger network")]
    NotConnected,
    /// `initialize` was called on a client that is already connected.
    #[error("Client is already initialized")]
    AlreadyInitialized,
    /// `initialize` was called on a client that has been closed.
    #[error("Client has been closed")]
    Closed,
    /// The configuration was rejected before any network contact.
    #[error("Invalid configuration: {0}")]
    Config(String),
    /// An endorsement payload could not be decoded.
    #[error("Malformed payload{}: {reason} ({} bytes)", peer_suffix(.peer), .raw.len())]
    MalformedPayload {
        /// The peer that produced the payload, when known.
        peer: Option<PeerId>,
        /// A description of the decode failure.
        reason: String,
        /// The raw payload, kept for diagnostics.
        raw: Vec<u8>,
    },
    /// The network returned no endorsement responses at all.
    #[error("No endorsement responses received")]
    NoResponses,
    /// Endorsers disagreed under a unanimous policy.
    #[error("Endorsement mismatch; dissenting peers: {}", join_peers(.dissenting))]
    EndorsementMismatch {
        /// The peers whose answer differs from the reference group, sorted.
        dissenting: Vec<PeerId>,
    },
    /// The largest group of agreeing endorsers is smaller than the quorum.
    #[error("Insufficient endorsements. Required: {required}, obtained: {obtained}")]
    InsufficientEndorsements {
        /// The quorum size requested by the policy.
        required: usize,
        /// The size of the largest agreeing group.
        obtained: usize,
    },
    /// Every endorser answered with a failure status.
    #[error("Endorsement rejected by peer {peer} (status {status}): {message}")]
    EndorsementRejected {
        /// The lexically first failing peer.
        peer: PeerId,
        /// The status code the peer reported.
        status: u16,
        /// The message the peer reported.
        message: String,
    },
    /// A history entry carried a sequence position outside `[0, max]`.
    #[error("History entry {tx_id} has out-of-range position {position} (max {max})")]
    OutOfRangeEntry {
        /// The transaction the entry belongs to.
        tx_id: TxId,
        /// The offending position.
        position: i64,
        /// The configured maximum position.
        max: i64,
    },
    /// A submission did not complete within its timeout. The transaction may or
    /// may not have been committed.
    #[error("Submission of '{function}' timed out after {timeout:?}; commit status is unknown")]
    SubmissionTimeout {
        /// The contract function that was submitted.
        function: String,
        /// The timeout that elapsed.
        timeout: Duration,
    },
    /// A read-only query did not complete within its timeout.
    #[error("Query '{function}' timed out after {timeout:?}")]
    QueryTimeout {
        /// The contract function (or history key) that was queried.
        function: String,
        /// The timeout that elapsed.
        timeout: Duration,
    },
    /// The ledger network could not be reached.
    #[error("Ledger network unavailable: {0}")]
    NetworkUnavailable(String),
    /// The ledger network was reached but failed the request.
    #[error("Ledger network error: {0}")]
    Network(String),
}

fn peer_suffix(peer: &Option<PeerId>) -> String {
    peer.as_ref()
        .map(|p| format!(" from peer {}", p))
        .unwrap_or_default()
}

fn join_peers(peers: &[PeerId]) -> String {
    peers
        .iter()
        .map(PeerId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl ErrorCode for LedgerError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotConnected => "LEDGER_NOT_CONNECTED",
            Self::AlreadyInitialized => "LEDGER_ALREADY_INITIALIZED",
            Self::Closed => "LEDGER_CLOSED",
            Self::Config(_) => "LEDGER_CONFIG_INVALID",
            Self::MalformedPayload { .. } => "LEDGER_MALFORMED_PAYLOAD",
            Self::NoResponses => "LEDGER_NO_RESPONSES",
            Self::EndorsementMismatch { .. } => "LEDGER_ENDORSEMENT_MISMATCH",
            Self::InsufficientEndorsements { .. } => "LEDGER_INSUFFICIENT_ENDORSEMENTS",
            Self::EndorsementRejected { .. } => "LEDGER_ENDORSEMENT_REJECTED",
            Self::OutOfRangeEntry { .. } => "LEDGER_OUT_OF_RANGE_ENTRY",
            Self::SubmissionTimeout { .. } => "LEDGER_SUBMISSION_TIMEOUT",
            Self::QueryTimeout { .. } => "LEDGER_QUERY_TIMEOUT",
            Self::NetworkUnavailable(_) => "LEDGER_NETWORK_UNAVAILABLE",
            Self::Network(_) => "LEDGER_NETWORK_ERROR",
        }
    }
}

impl From<toml::de::Error> for LedgerError {
    fn from(e: toml::de::Error) -> Self {
        LedgerError::Config(e.to_string())
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(e: std::io::Error) -> Self {
        LedgerError::Config(format!("Failed to read configuration: {}", e))
    }
}
