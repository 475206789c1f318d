// Path: crates/client/src/network.rs
//! The boundary between the client and the external ledger network.

use async_trait::async_trait;
use ledger_types::app::{
    EndorsementResponse, HistoryEntry, HistoryRequest, QueryRequest, Transaction,
    TransactionResult,
};
use ledger_types::config::ConnectionProfile;
use ledger_types::error::LedgerError;
use std::fmt::Debug;
use std::sync::Arc;

/// A ledger network the client can open connections to.
///
/// Consensus, contract execution and identity issuance all live behind this trait.
#[async_trait]
pub trait LedgerNetwork: Send + Sync + Debug {
    /// Opens a connection with the given identity. Fails with
    /// `LedgerError::NetworkUnavailable` when the network cannot be reached.
    async fn connect(
        &self,
        profile: &ConnectionProfile,
    ) -> Result<Arc<dyn LedgerConnection>, LedgerError>;
}

/// One open connection to a ledger network.
#[async_trait]
pub trait LedgerConnection: Send + Sync + Debug {
    /// Joins `channel_id` and checks that `contract_id` is instantiated on it.
    async fn bind(&self, channel_id: &str, contract_id: &str) -> Result<(), LedgerError>;

    /// Submits a transaction for ordering and commit. The network may still commit
    /// the transaction after the caller stopped waiting for this future.
    async fn submit(&self, tx: Transaction) -> Result<TransactionResult, LedgerError>;

    /// Sends a read-only proposal to every endorsing peer. One response per peer,
    /// in no particular order.
    async fn solicit(
        &self,
        request: &QueryRequest,
    ) -> Result<Vec<EndorsementResponse>, LedgerError>;

    /// Fetches every historical version of a key. Entries may arrive out of order
    /// and may be duplicated.
    async fn solicit_history(
        &self,
        request: &HistoryRequest,
    ) -> Result<Vec<HistoryEntry>, LedgerError>;

    /// Releases the connection. Must be idempotent.
    fn release(&self);
}

/// Releases a connection when dropped unless ownership was handed off with `disarm`.
pub(crate) struct ConnectionGuard {
    connection: Arc<dyn LedgerConnection>,
    armed: bool,
}

impl ConnectionGuard {
    pub(crate) fn new(connection: Arc<dyn LedgerConnection>) -> Self {
        Self {
            connection,
            armed: true,
        }
    }

    pub(crate) fn connection(&self) -> &Arc<dyn LedgerConnection> {
        &self.connection
    }

    pub(crate) fn disarm(mut self) -> Arc<dyn LedgerConnection> {
        self.armed = false;
        Arc::clone(&self.connection)
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if self.armed {
            log::debug!("Releasing connection abandoned during initialization");
            self.connection.release();
        }
    }
}
