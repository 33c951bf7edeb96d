//! Provisioning driver: create-or-skip per input row.
//!
//! A run takes one directory snapshot, builds an [`ExistenceIndex`] from it, and
//! then walks the requests in input order. A row whose email already counts as
//! present is skipped without any remote call. Every other row is activated
//! with two back-to-back calls:
//!
//! 1. create the account with the shared bootstrap password, `email_verified`
//!    set to `true` and the welcome message suppressed
//! 2. set the row's own password as permanent
//!
//! Creating with the row's password directly would leave it temporary and
//! expiring; the second call makes it the account's real credential.
//!
//! The snapshot is never refreshed during a run, so two rows with the same
//! email both reach the create call and the second fails with
//! [`StoreError::UsernameExists`].
//!
//! # Failure handling
//!
//! Under [`FailurePolicy::Abort`] the first failed call ends the run with
//! [`ProvisionError::RowFailed`]; later rows are not attempted. Under
//! [`FailurePolicy::Continue`] the failure is recorded against the row and the
//! run goes on; with `concurrency > 1` up to that many rows are in flight and
//! the report is still in input order. Nothing is retried and a failed
//! password commit is not rolled back.
//!
//! # Example Usage
//!
//! ```rust
//! use pool_provisioner::config::ProvisionerConfig;
//! use pool_provisioner::input::ProvisionRequest;
//! use pool_provisioner::provisioning::Provisioner;
//! use pool_provisioner::store::{DirectoryUser, InMemoryStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = InMemoryStore::new("pool-1");
//! store.seed(DirectoryUser::confirmed("ann@example.com"));
//!
//! let config = ProvisionerConfig::builder()
//!     .with_pool_id("pool-1")
//!     .with_bootstrap_password("Bootstrap#0001")
//!     .build()?;
//! let provisioner = Provisioner::new(store, config)?;
//!
//! let report = provisioner
//!     .provision(&[
//!         ProvisionRequest::new("ann@example.com", "Initial#1"),
//!         ProvisionRequest::new("bob@example.com", "Initial#2"),
//!     ])
//!     .await?;
//! assert_eq!(report.skipped(), 1);
//! assert_eq!(report.created(), 1);
//! # Ok(())
//! # }
//! ```

pub mod report;
#[cfg(test)]
mod tests;

pub use report::{ActivationStep, ProvisionReport, RowOutcome, RowReport};

use crate::config::{ConfigError, FailurePolicy, ProvisionerConfig};
use crate::directory::DirectoryReader;
use crate::index::ExistenceIndex;
use crate::input::ProvisionRequest;
use crate::store::{
    CreateUserRequest, EMAIL_ATTRIBUTE, EMAIL_VERIFIED_ATTRIBUTE, IdentityStore,
    SetPasswordRequest, StoreError, UserAttribute,
};
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use uuid::Uuid;

/// Errors that end a provisioning run.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The directory snapshot could not be taken; nothing was mutated.
    #[error("Failed to list existing users of pool '{pool_id}': {source}")]
    Directory {
        pool_id: String,
        #[source]
        source: StoreError,
    },

    /// A row failed under [`FailurePolicy::Abort`]. `report` holds the rows
    /// processed up to and including the failed one.
    #[error("Row {row} ({email}) failed at {step}: {source}")]
    RowFailed {
        row: usize,
        email: String,
        step: ActivationStep,
        #[source]
        source: StoreError,
        report: Box<ProvisionReport>,
    },
}

impl ProvisionError {
    /// The partial report of an aborted run, if there is one.
    pub fn partial_report(&self) -> Option<&ProvisionReport> {
        match self {
            ProvisionError::RowFailed { report, .. } => Some(report.as_ref()),
            _ => None,
        }
    }
}

type RowResult = Result<RowOutcome, (ActivationStep, StoreError)>;

/// Drives a provisioning run against an injected [`IdentityStore`].
#[derive(Debug, Clone)]
pub struct Provisioner<S> {
    reader: DirectoryReader<S>,
    config: ProvisionerConfig,
}

impl<S: IdentityStore> Provisioner<S> {
    pub fn new(store: S, config: ProvisionerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            reader: DirectoryReader::new(store),
            config,
        })
    }

    pub fn config(&self) -> &ProvisionerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        self.reader.store()
    }

    /// Take the directory snapshot used for duplicate checks.
    pub async fn snapshot(&self) -> Result<ExistenceIndex, ProvisionError> {
        let users = self
            .reader
            .fetch_all_users(&self.config.pool_id)
            .await
            .map_err(|source| ProvisionError::Directory {
                pool_id: self.config.pool_id.clone(),
                source,
            })?;
        Ok(ExistenceIndex::build(&users))
    }

    /// Provision `requests` in input order and report what happened to each row.
    pub async fn provision(
        &self,
        requests: &[ProvisionRequest],
    ) -> Result<ProvisionReport, ProvisionError> {
        let run_id = Uuid::new_v4();
        info!(
            "[{}] Provisioning {} rows into pool '{}' (policy: {:?}, concurrency: {}, dry run: {})",
            run_id,
            requests.len(),
            self.config.pool_id,
            self.config.failure_policy,
            self.config.concurrency,
            self.config.dry_run
        );

        let index = self.snapshot().await?;
        let mut report = ProvisionReport::new(
            run_id,
            &self.config.pool_id,
            index.len(),
            self.config.dry_run,
        );

        if self.config.is_concurrent() {
            let results: Vec<RowResult> = stream::iter(requests)
                .map(|request| self.process_row(&index, request))
                .buffered(self.config.concurrency)
                .collect()
                .await;

            for (i, (request, result)) in requests.iter().zip(results).enumerate() {
                let outcome = result.unwrap_or_else(|(step, error)| {
                    warn!(
                        "Row {} ({}) failed at {}: {}",
                        i + 1,
                        request.email,
                        step,
                        error
                    );
                    RowOutcome::failed(step, &error)
                });
                report.record(i + 1, &request.email, outcome);
            }
        } else {
            for (i, request) in requests.iter().enumerate() {
                let row = i + 1;
                match self.process_row(&index, request).await {
                    Ok(outcome) => report.record(row, &request.email, outcome),
                    Err((step, error)) => {
                        warn!(
                            "Row {} ({}) failed at {}: {}",
                            row, request.email, step, error
                        );
                        report.record(row, &request.email, RowOutcome::failed(step, &error));
                        if self.config.failure_policy == FailurePolicy::Abort {
                            return Err(ProvisionError::RowFailed {
                                row,
                                email: request.email.clone(),
                                step,
                                source: error,
                                report: Box::new(report),
                            });
                        }
                    }
                }
            }
        }

        info!("[{}] Finished: {}", run_id, report.summary());
        Ok(report)
    }

    async fn process_row(&self, index: &ExistenceIndex, request: &ProvisionRequest) -> RowResult {
        if index.contains(&request.email) {
            let matched: Vec<String> = index
                .matches(&request.email)
                .into_iter()
                .map(str::to_string)
                .collect();
            info!("Creating user >>> {} >>> pass", request.email);
            debug!("{} matched existing users {:?}", request.email, matched);
            return Ok(RowOutcome::Skipped { matched });
        }

        if self.config.dry_run {
            info!("Creating user >>> {} (dry run)", request.email);
            return Ok(RowOutcome::WouldCreate);
        }

        info!("Creating user >>> {}", request.email);
        self.activate(request).await?;
        Ok(RowOutcome::Created)
    }

    /// Create the account with the bootstrap password, then commit the row's
    /// password as permanent.
    async fn activate(
        &self,
        request: &ProvisionRequest,
    ) -> Result<(), (ActivationStep, StoreError)> {
        let store = self.reader.store();
        let pool_id = &self.config.pool_id;

        let create = CreateUserRequest {
            username: request.email.clone(),
            temporary_password: self.config.bootstrap_password.clone(),
            attributes: vec![
                UserAttribute::new(EMAIL_VERIFIED_ATTRIBUTE, "true"),
                UserAttribute::new(EMAIL_ATTRIBUTE, &request.email),
            ],
            suppress_notification: true,
        };
        store
            .create_user(pool_id, &create)
            .await
            .map_err(|e| (ActivationStep::Create, e))?;

        let commit = SetPasswordRequest {
            username: request.email.clone(),
            password: request.initial_password.clone(),
            permanent: true,
        };
        store
            .set_user_password(pool_id, &commit)
            .await
            .map_err(|e| (ActivationStep::SetPassword, e))?;

        debug!("Activated {}", request.email);
        Ok(())
    }
}
