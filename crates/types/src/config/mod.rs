// Path: crates/types/src/config/mod.rs

//! Configuration structures for the ledger client (`client.toml`).
use crate::error::LedgerError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How endorsement responses for one query are reconciled into a single result.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EndorsementPolicy {
    /// Every endorser must return the same decoded payload.
    #[default]
    RequireUnanimous,
    /// At least `n` endorsers must agree on the same decoded payload.
    RequireQuorum(usize),
    /// Return the most common answer; ties go to the group holding the lexically
    /// smallest peer identity.
    BestEffort,
}

/// The caller's identity on the network.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct IdentityBundle {
    /// The membership organization the user belongs to (e.g. "Org1").
    pub organization: String,
    /// The enrolled user name (e.g. "User1").
    pub user: String,
    /// Optional path to the user's PEM certificate.
    #[serde(default)]
    pub certificate: Option<PathBuf>,
    /// Optional path to the user's PEM private key.
    #[serde(default)]
    pub private_key: Option<PathBuf>,
}

/// Where the ledger network lives and who is connecting to it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ConnectionProfile {
    /// The network endpoint, e.g. `grpcs://peer0.org1.example.com:7051`.
    pub endpoint: String,
    /// The identity used for every request.
    pub identity: IdentityBundle,
}

/// Configuration for a ledger client (`client.toml`).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// The channel the client binds to.
    pub channel_id: String,
    /// The contract the client binds to.
    pub contract_id: String,
    /// Default per-call timeout in milliseconds. Defaults to 30000.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// The largest history position accepted from the network. Defaults to 1_000_000_000.
    #[serde(default = "default_max_history_position")]
    pub max_history_position: i64,
    /// The default endorsement policy for queries.
    #[serde(default)]
    pub policy: EndorsementPolicy,
    /// The network address and identity bundle.
    pub profile: ConnectionProfile,
}

fn default_timeout_ms() -> u64 {
    30_000
}
fn default_max_history_position() -> i64 {
    1_000_000_000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            channel_id: "chainhero".to_string(),
            contract_id: "heroes-service".to_string(),
            timeout_ms: default_timeout_ms(),
            max_history_position: default_max_history_position(),
            policy: EndorsementPolicy::default(),
            profile: ConnectionProfile {
                endpoint: "memory://chainhero".to_string(),
                identity: IdentityBundle {
                    organization: "Org1".to_string(),
                    user: "User1".to_string(),
                    certificate: None,
                    private_key: None,
                },
            },
        }
    }
}

impl ClientConfig {
    /// Parses a configuration from TOML text. The result is not validated.
    pub fn from_toml_str(s: &str) -> Result<Self, LedgerError> {
        Ok(toml::from_str(s)?)
    }

    /// Reads and parses a configuration file. The result is not validated.
    pub fn from_file(path: &Path) -> Result<Self, LedgerError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// The default per-call timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validates the configuration for semantic correctness.
    pub fn validate(&self) -> Result<(), LedgerError> {
        let required = [
            ("channel_id", &self.channel_id),
            ("contract_id", &self.contract_id),
            ("profile.endpoint", &self.profile.endpoint),
            ("profile.identity.organization", &self.profile.identity.organization),
            ("profile.identity.user", &self.profile.identity.user),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(LedgerError::Config(format!("'{}' must not be empty", name)));
            }
        }
        if self.timeout_ms == 0 {
            return Err(LedgerError::Config(
                "'timeout_ms' must be greater than 0".to_string(),
            ));
        }
        if self.max_history_position < 0 {
            return Err(LedgerError::Config(
                "'max_history_position' must not be negative".to_string(),
            ));
        }
        validate_policy(self.policy)
    }
}

/// Rejects policies that can never be satisfied.
pub fn validate_policy(policy: EndorsementPolicy) -> Result<(), LedgerError> {
    match policy {
        EndorsementPolicy::RequireQuorum(0) => Err(LedgerError::Config(
            "quorum size must be at least 1".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Per-call overrides of the client defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Overrides the configured timeout.
    pub timeout: Option<Duration>,
    /// Overrides the configured endorsement policy. Ignored by submissions.
    pub policy: Option<EndorsementPolicy>,
}

impl CallOptions {
    /// Sets the timeout override.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the endorsement policy override.
    pub fn with_policy(mut self, policy: EndorsementPolicy) -> Self {
        self.policy = Some(policy);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config_applies_defaults() {
        let cfg = ClientConfig::from_toml_str(
            r#"
            channel_id = "chainhero"
            contract_id = "heroes-service"

            [profile]
            endpoint = "grpcs://peer0.org1.example.com:7051"

            [profile.identity]
            organization = "Org1"
            user = "User1"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.timeout(), Duration::from_secs(30));
        assert_eq!(cfg.policy, EndorsementPolicy::RequireUnanimous);
        assert_eq!(cfg.max_history_position, 1_000_000_000);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_parse_quorum_policy() {
        let cfg = ClientConfig::from_toml_str(
            r#"
            channel_id = "c"
            contract_id = "cc"
            timeout_ms = 500
            policy = { require_quorum = 2 }

            [profile]
            endpoint = "memory://test"
            identity = { organization = "Org1", user = "User1" }
            "#,
        )
        .unwrap();
        assert_eq!(cfg.policy, EndorsementPolicy::RequireQuorum(2));
        assert_eq!(cfg.timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_default_config_roundtrips_through_toml() {
        let cfg = ClientConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert_eq!(ClientConfig::from_toml_str(&text).unwrap(), cfg);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut cfg = ClientConfig {
            channel_id: " ".into(),
            ..ClientConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(LedgerError::Config(_))));

        cfg.channel_id = "chainhero".into();
        cfg.timeout_ms = 0;
        assert!(matches!(cfg.validate(), Err(LedgerError::Config(_))));

        cfg.timeout_ms = 10;
        cfg.policy = EndorsementPolicy::RequireQuorum(0);
        assert!(matches!(cfg.validate(), Err(LedgerError::Config(_))));

        cfg.policy = EndorsementPolicy::BestEffort;
        cfg.max_history_position = -1;
        assert!(matches!(cfg.validate(), Err(LedgerError::Config(_))));
    }
}
