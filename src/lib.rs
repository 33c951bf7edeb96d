//! Idempotent bulk provisioning for managed user pools.
//!
//! Takes a list of desired accounts (email plus initial password), compares it
//! with the accounts already present in the pool, and creates only the missing
//! ones. Each created account is activated in two steps so that its initial
//! password ends up permanent rather than temporary.
//!
//! # Core Components
//!
//! - [`DirectoryReader`] - fetches every existing user, following pagination
//! - [`ExistenceIndex`] - duplicate-check view over that snapshot
//! - [`Provisioner`] - the create-or-skip driver
//! - [`IdentityStore`] - the provider contract, with [`store::InMemoryStore`]
//!   and (feature `cognito`) `store::CognitoStore` backends
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pool_provisioner::{InputColumns, Provisioner, ProvisionerConfig, read_requests_from_path};
//! use pool_provisioner::store::InMemoryStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let requests = read_requests_from_path("users.csv", &InputColumns::default())?;
//! let config = ProvisionerConfig::builder()
//!     .with_pool_id("pool-1")
//!     .with_bootstrap_password(std::env::var("BOOTSTRAP_PASSWORD")?)
//!     .build()?;
//! let provisioner = Provisioner::new(InMemoryStore::new("pool-1"), config)?;
//! let report = provisioner.provision(&requests).await?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod directory;
pub mod index;
pub mod input;
pub mod provisioning;
pub mod secret;
pub mod store;

pub use config::{ConfigError, FailurePolicy, ProvisionerConfig, ProvisionerConfigBuilder};
pub use directory::DirectoryReader;
pub use index::ExistenceIndex;
pub use input::{InputColumns, InputError, ProvisionRequest, read_requests, read_requests_from_path};
pub use provisioning::{
    ActivationStep, ProvisionError, ProvisionReport, Provisioner, RowOutcome, RowReport,
};
pub use secret::SecretString;
pub use store::{DirectoryUser, IdentityStore, StoreError, UserStatus};
