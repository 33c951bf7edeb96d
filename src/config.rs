//! Run configuration for the provisioning driver.
//!
//! The pool identifier and the shared bootstrap password are supplied from
//! outside (command line or environment); neither is compiled into the crate.
//!
//! The bootstrap password is the same for every account created in a run and is
//! valid from account creation until the permanent password is set immediately
//! afterwards. Anyone who knows it can act in that window, so treat it like any
//! other credential and rotate it between runs.

use crate::secret::SecretString;

/// What the driver does when a provider call fails for a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop at the first failure; later rows are not attempted.
    #[default]
    Abort,
    /// Record the failure against the row and carry on with the next one.
    Continue,
}

/// Errors raised when validating a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("User pool id must not be empty")]
    MissingPoolId,

    #[error("Bootstrap password must not be empty")]
    MissingBootstrapPassword,

    #[error("Concurrency must be at least 1")]
    ZeroConcurrency,
}

/// Settings for one provisioning run.
#[derive(Debug, Clone)]
pub struct ProvisionerConfig {
    pub pool_id: String,
    /// Shared temporary password used only to create accounts.
    pub bootstrap_password: SecretString,
    pub failure_policy: FailurePolicy,
    /// Maximum rows in flight. Only honored with [`FailurePolicy::Continue`];
    /// aborting runs are always sequential.
    pub concurrency: usize,
    /// Decide create-or-skip without mutating the pool.
    pub dry_run: bool,
}

impl ProvisionerConfig {
    pub fn builder() -> ProvisionerConfigBuilder {
        ProvisionerConfigBuilder::default()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_id.trim().is_empty() {
            return Err(ConfigError::MissingPoolId);
        }
        if self.bootstrap_password.is_empty() {
            return Err(ConfigError::MissingBootstrapPassword);
        }
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(())
    }

    /// Whether rows may be processed with more than one in flight.
    pub fn is_concurrent(&self) -> bool {
        self.failure_policy == FailurePolicy::Continue && self.concurrency > 1
    }
}

/// Fluent builder for [`ProvisionerConfig`].
///
/// ```rust
/// use pool_provisioner::config::{FailurePolicy, ProvisionerConfig};
///
/// let config = ProvisionerConfig::builder()
///     .with_pool_id("ap-northeast-1_AbCdEf123")
///     .with_bootstrap_password("Bootstrap#0001")
///     .with_failure_policy(FailurePolicy::Continue)
///     .with_concurrency(4)
///     .build()
///     .unwrap();
/// assert!(config.is_concurrent());
/// ```
#[derive(Debug, Clone)]
pub struct ProvisionerConfigBuilder {
    pool_id: String,
    bootstrap_password: SecretString,
    failure_policy: FailurePolicy,
    concurrency: usize,
    dry_run: bool,
}

impl Default for ProvisionerConfigBuilder {
    fn default() -> Self {
        Self {
            pool_id: String::new(),
            bootstrap_password: SecretString::default(),
            failure_policy: FailurePolicy::default(),
            concurrency: 1,
            dry_run: false,
        }
    }
}

impl ProvisionerConfigBuilder {
    pub fn with_pool_id(mut self, pool_id: impl Into<String>) -> Self {
        self.pool_id = pool_id.into();
        self
    }

    pub fn with_bootstrap_password(mut self, password: impl Into<SecretString>) -> Self {
        self.bootstrap_password = password.into();
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn build(self) -> Result<ProvisionerConfig, ConfigError> {
        let config = ProvisionerConfig {
            pool_id: self.pool_id,
            bootstrap_password: self.bootstrap_password,
            failure_policy: self.failure_policy,
            concurrency: self.concurrency,
            dry_run: self.dry_run,
        };
        config.validate()?;
        Ok(config)
    }
}
