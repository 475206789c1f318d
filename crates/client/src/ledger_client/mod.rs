// Path: crates/client/src/ledger_client/mod.rs

//! The caller-facing façade over a ledger network.
//!
//! A [`LedgerClient`] moves through `Uninitialized -> Connected -> Closed`. The
//! connection is established once, under exclusive access, and then shared read-only
//! by every concurrent `invoke`/`query`/`query_history` call.
//!
//! # Timeouts
//!
//! Every network call is bounded by the per-call timeout (or the configured default).
//! When the timeout elapses the client stops waiting and drops the in-flight future.
//! Whether the network then abandons the request depends on the network: a submitted
//! transaction may still be ordered and committed after `SubmissionTimeout` is
//! returned. Callers that retry must be prepared for the first attempt to land.

use crate::aggregator::aggregate;
use crate::history::{History, Reconstructor};
use crate::network::{ConnectionGuard, LedgerConnection, LedgerNetwork};
use arc_swap::ArcSwap;
use ledger_telemetry::client_metrics;
use ledger_telemetry::record_error;
use ledger_telemetry::time::Timer;
use ledger_types::app::{
    HistoryRequest, QueryRequest, QueryResult, SubmissionOutcome, Transaction,
    TransactionResult,
};
use ledger_types::config::{CallOptions, ClientConfig};
use ledger_types::error::LedgerError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// The externally visible lifecycle state of a [`LedgerClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// `initialize` has not succeeded yet.
    Uninitialized,
    /// Bound to a channel and contract; operations are accepted.
    Connected,
    /// Closed. Terminal.
    Closed,
}

/// Everything established by a successful `initialize`.
#[derive(Debug)]
struct Session {
    config: ClientConfig,
    connection: Arc<dyn LedgerConnection>,
    reconstructor: Reconstructor,
}

impl Session {
    fn timeout(&self, opts: &CallOptions) -> Duration {
        opts.timeout.unwrap_or_else(|| self.config.timeout())
    }
}

#[derive(Debug)]
enum Lifecycle {
    Uninitialized,
    Connected(Arc<Session>),
    Closed,
}

/// A query/invoke client for one channel and contract.
///
/// Safe to share between tasks (`Arc<LedgerClient>`). The façade never retries.
pub struct LedgerClient {
    network: Arc<dyn LedgerNetwork>,
    state: ArcSwap<Lifecycle>,
    // Serializes initialize/close. Operations only read `state`.
    transition: Mutex<()>,
}

impl std::fmt::Debug for LedgerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerClient")
            .field("network", &self.network)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl LedgerClient {
    /// Creates an uninitialized client. No network contact happens until `initialize`.
    pub fn new(network: Arc<dyn LedgerNetwork>) -> Self {
        Self {
            network,
            state: ArcSwap::from_pointee(Lifecycle::Uninitialized),
            transition: Mutex::new(()),
        }
    }

    pub fn state(&self) -> ClientState {
        match **self.state.load() {
            Lifecycle::Uninitialized => ClientState::Uninitialized,
            Lifecycle::Connected(_) => ClientState::Connected,
            Lifecycle::Closed => ClientState::Closed,
        }
    }

    /// The configuration the client was initialized with, if connected.
    pub fn config(&self) -> Option<ClientConfig> {
        match &**self.state.load() {
            Lifecycle::Connected(session) => Some(session.config.clone()),
            _ => None,
        }
    }

    /// Connects with the configured identity and binds to the channel and contract.
    ///
    /// On any failure the client stays `Uninitialized` and a partially opened
    /// connection is released, so `initialize` can be retried.
    pub async fn initialize(&self, config: ClientConfig) -> Result<(), LedgerError> {
        let _timer = Timer::new(client_metrics(), "initialize");
        let result = self.establish(config).await;
        finish("initialize", result)
    }

    async fn establish(&self, config: ClientConfig) -> Result<(), LedgerError> {
        config.validate()?;
        let _transition = self.transition.lock().await;
        match **self.state.load() {
            Lifecycle::Uninitialized => {}
            Lifecycle::Connected(_) => return Err(LedgerError::AlreadyInitialized),
            Lifecycle::Closed => return Err(LedgerError::Closed),
        }

        let timeout = config.timeout();
        let endpoint = &config.profile.endpoint;
        let connection = tokio::time::timeout(timeout, self.network.connect(&config.profile))
            .await
            .map_err(|_| {
                LedgerError::NetworkUnavailable(format!(
                    "connecting to {} timed out after {:?}",
                    endpoint, timeout
                ))
            })??;

        // Released on every exit path below, including cancellation of this future.
        let guard = ConnectionGuard::new(connection);
        tokio::time::timeout(
            timeout,
            guard
                .connection()
                .bind(&config.channel_id, &config.contract_id),
        )
        .await
        .map_err(|_| {
            LedgerError::NetworkUnavailable(format!(
                "binding to {}/{} timed out after {:?}",
                config.channel_id, config.contract_id, timeout
            ))
        })??;
        let connection = guard.disarm();

        log::info!(
            "Ledger client connected to {} as {}@{} (channel '{}', contract '{}')",
            endpoint,
            config.profile.identity.user,
            config.profile.identity.organization,
            config.channel_id,
            config.contract_id
        );
        let session = Session {
            reconstructor: Reconstructor::new(config.max_history_position),
            config,
            connection,
        };
        self.state.store(Arc::new(Lifecycle::Connected(Arc::new(session))));
        client_metrics().set_connected(true);
        Ok(())
    }

    /// Releases the connection and moves to `Closed`. Idempotent.
    ///
    /// Calls already in flight keep their handle to the released connection and
    /// finish with whatever the network reports for a released connection.
    pub async fn close(&self) -> Result<(), LedgerError> {
        let _transition = self.transition.lock().await;
        let previous = self.state.swap(Arc::new(Lifecycle::Closed));
        if let Lifecycle::Connected(session) = &*previous {
            session.connection.release();
            client_metrics().set_connected(false);
            log::info!(
                "Ledger client closed (channel '{}', contract '{}')",
                session.config.channel_id,
                session.config.contract_id
            );
        }
        Ok(())
    }

    fn session(&self) -> Result<Arc<Session>, LedgerError> {
        match &**self.state.load() {
            Lifecycle::Connected(session) => Ok(Arc::clone(session)),
            _ => Err(LedgerError::NotConnected),
        }
    }

    /// Builds a transaction against the bound channel and contract.
    pub fn transaction<I, A>(&self, function: &str, args: I) -> Result<Transaction, LedgerError>
    where
        I: IntoIterator<Item = A>,
        A: AsRef<[u8]>,
    {
        let session = self.session()?;
        Ok(Transaction::new(
            &session.config.channel_id,
            &session.config.contract_id,
            function,
            args,
        ))
    }

    /// Submits `tx` with the default timeout. See [`LedgerClient::invoke_with`].
    pub async fn invoke(&self, tx: Transaction) -> Result<TransactionResult, LedgerError> {
        self.invoke_with(tx, CallOptions::default()).await
    }

    /// Submits a state-changing transaction and waits for the network's verdict.
    ///
    /// A rejection or a network-side timeout is reported in the returned
    /// [`TransactionResult`]. If the local timeout elapses first the call fails with
    /// `SubmissionTimeout`, and the transaction may or may not commit.
    pub async fn invoke_with(
        &self,
        tx: Transaction,
        opts: CallOptions,
    ) -> Result<TransactionResult, LedgerError> {
        let _timer = Timer::new(client_metrics(), "invoke");
        let result = self.submit(tx, opts).await;
        finish("invoke", result)
    }

    async fn submit(
        &self,
        tx: Transaction,
        opts: CallOptions,
    ) -> Result<TransactionResult, LedgerError> {
        let session = self.session()?;
        if tx.channel_id != session.config.channel_id || tx.contract_id != session.config.contract_id
        {
            return Err(LedgerError::Config(format!(
                "transaction targets {}/{} but the client is bound to {}/{}",
                tx.channel_id, tx.contract_id, session.config.channel_id, session.config.contract_id
            )));
        }

        let timeout = session.timeout(&opts);
        let function = tx.function.clone();
        let result = tokio::time::timeout(timeout, session.connection.submit(tx))
            .await
            .map_err(|_| {
                log::warn!(
                    "Submission of '{}' timed out after {:?}; commit status unknown",
                    function,
                    timeout
                );
                LedgerError::SubmissionTimeout {
                    function: function.clone(),
                    timeout,
                }
            })??;

        match &result.outcome {
            SubmissionOutcome::Success => {
                log::info!("Transaction {} ('{}') committed", result.tx_id, function)
            }
            SubmissionOutcome::Rejected(reason) => log::warn!(
                "Transaction {} ('{}') rejected: {}",
                result.tx_id,
                function,
                reason
            ),
            SubmissionOutcome::TimedOut => log::warn!(
                "Transaction {} ('{}') timed out on the network; commit status unknown",
                result.tx_id,
                function
            ),
        }
        Ok(result)
    }

    /// Evaluates a read-only contract function under the configured policy.
    pub async fn query<I, A>(&self, function: &str, args: I) -> Result<QueryResult, LedgerError>
    where
        I: IntoIterator<Item = A>,
        A: AsRef<[u8]>,
    {
        self.query_with(function, args, CallOptions::default()).await
    }

    /// Evaluates a read-only contract function on every endorsing peer and
    /// reconciles the answers. Decode and aggregation errors are returned unchanged.
    pub async fn query_with<I, A>(
        &self,
        function: &str,
        args: I,
        opts: CallOptions,
    ) -> Result<QueryResult, LedgerError>
    where
        I: IntoIterator<Item = A>,
        A: AsRef<[u8]>,
    {
        let _timer = Timer::new(client_metrics(), "query");
        let args: Vec<Vec<u8>> = args.into_iter().map(|a| a.as_ref().to_vec()).collect();
        let result = self.evaluate(function, args, opts).await;
        finish("query", result)
    }

    async fn evaluate(
        &self,
        function: &str,
        args: Vec<Vec<u8>>,
        opts: CallOptions,
    ) -> Result<QueryResult, LedgerError> {
        let session = self.session()?;
        let policy = opts.policy.unwrap_or(session.config.policy);
        let timeout = session.timeout(&opts);
        let request = QueryRequest {
            channel_id: session.config.channel_id.clone(),
            contract_id: session.config.contract_id.clone(),
            function: function.to_string(),
            args,
        };

        let responses = tokio::time::timeout(timeout, session.connection.solicit(&request))
            .await
            .map_err(|_| LedgerError::QueryTimeout {
                function: function.to_string(),
                timeout,
            })??;
        log::debug!(
            "Query '{}' collected {} endorsement responses",
            function,
            responses.len()
        );

        aggregate(responses, policy).map_err(|e| {
            if let LedgerError::EndorsementMismatch { dissenting } = &e {
                client_metrics().inc_endorsement_mismatches();
                log::warn!(
                    "Endorsers disagree on query '{}'; dissenting peers: {:?}",
                    function,
                    dissenting
                );
            }
            e
        })
    }

    /// Fetches the ordered history of `key` with the default timeout.
    pub async fn query_history(&self, key: &str) -> Result<History, LedgerError> {
        self.query_history_with(key, CallOptions::default()).await
    }

    /// Fetches every historical version of `key`, ordered by submission position
    /// with repeated deliveries removed.
    pub async fn query_history_with(
        &self,
        key: &str,
        opts: CallOptions,
    ) -> Result<History, LedgerError> {
        let _timer = Timer::new(client_metrics(), "query_history");
        let result = self.history(key, opts).await;
        finish("query_history", result)
    }

    async fn history(&self, key: &str, opts: CallOptions) -> Result<History, LedgerError> {
        let session = self.session()?;
        let timeout = session.timeout(&opts);
        let request = HistoryRequest {
            channel_id: session.config.channel_id.clone(),
            contract_id: session.config.contract_id.clone(),
            key: key.to_string(),
        };

        let entries = tokio::time::timeout(timeout, session.connection.solicit_history(&request))
            .await
            .map_err(|_| LedgerError::QueryTimeout {
                function: format!("history of '{}'", key),
                timeout,
            })??;
        let received = entries.len();
        let history = session.reconstructor.reconstruct(entries)?;
        let dropped = received.saturating_sub(history.len());
        if dropped > 0 {
            client_metrics().inc_history_duplicates_dropped(dropped as u64);
        }
        log::debug!(
            "History of '{}': {} entries received, {} duplicates dropped",
            key,
            received,
            dropped
        );
        Ok(history)
    }
}

impl Drop for LedgerClient {
    fn drop(&mut self) {
        if let Lifecycle::Connected(session) = &**self.state.load() {
            session.connection.release();
            client_metrics().set_connected(false);
        }
    }
}

fn finish<T>(operation: &'static str, result: Result<T, LedgerError>) -> Result<T, LedgerError> {
    match &result {
        Ok(_) => client_metrics().inc_operations_total(operation, "ok"),
        Err(e) => {
            client_metrics().inc_operations_total(operation, "error");
            record_error(e);
        }
    }
    result
}
