//! Identity-store abstraction.
//!
//! The [`IdentityStore`] trait is the contract this crate consumes from a managed
//! user pool: a paged user listing, account creation with a temporary password,
//! and an administrative password set. Everything above this layer (directory
//! reading, duplicate detection, provisioning) is written against the trait, so a
//! backend is chosen by whoever constructs the components.
//!
//! Two backends ship with the crate:
//!
//! - [`InMemoryStore`] - a thread-safe in-process pool with a call journal and
//!   fault injection, used by the tests and for local dry runs
//! - `CognitoStore` - AWS Cognito, behind the `cognito` feature
//!
//! # Example Usage
//!
//! ```rust
//! use pool_provisioner::store::{DirectoryUser, IdentityStore, InMemoryStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = InMemoryStore::new("pool-1").with_page_size(2);
//! store.seed(DirectoryUser::confirmed("ann@example.com"));
//!
//! let page = store.list_users("pool-1", None).await?;
//! assert_eq!(page.users.len(), 1);
//! assert!(page.next_token().is_none());
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "cognito")]
pub mod cognito;
pub mod errors;
pub mod in_memory;

#[cfg(feature = "cognito")]
pub use cognito::CognitoStore;
pub use errors::StoreError;
pub use in_memory::{InMemoryStore, StoreCall, StoreOperation};

use crate::secret::SecretString;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;

/// Result alias for identity-store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Attribute name carrying the account's email address.
pub const EMAIL_ATTRIBUTE: &str = "email";

/// Attribute name carrying the email-verified flag.
pub const EMAIL_VERIFIED_ATTRIBUTE: &str = "email_verified";

/// Provider-defined account state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UserStatus {
    Unconfirmed,
    Confirmed,
    Archived,
    Compromised,
    Unknown,
    ResetRequired,
    ForceChangePassword,
    ExternalProvider,
    /// A state this crate does not know about, kept verbatim.
    Other(String),
}

impl UserStatus {
    /// The provider's wire name for this state.
    pub fn as_str(&self) -> &str {
        match self {
            UserStatus::Unconfirmed => "UNCONFIRMED",
            UserStatus::Confirmed => "CONFIRMED",
            UserStatus::Archived => "ARCHIVED",
            UserStatus::Compromised => "COMPROMISED",
            UserStatus::Unknown => "UNKNOWN",
            UserStatus::ResetRequired => "RESET_REQUIRED",
            UserStatus::ForceChangePassword => "FORCE_CHANGE_PASSWORD",
            UserStatus::ExternalProvider => "EXTERNAL_PROVIDER",
            UserStatus::Other(value) => value,
        }
    }
}

impl From<&str> for UserStatus {
    fn from(value: &str) -> Self {
        match value {
            "UNCONFIRMED" => UserStatus::Unconfirmed,
            "CONFIRMED" => UserStatus::Confirmed,
            "ARCHIVED" => UserStatus::Archived,
            "COMPROMISED" => UserStatus::Compromised,
            "UNKNOWN" => UserStatus::Unknown,
            "RESET_REQUIRED" => UserStatus::ResetRequired,
            "FORCE_CHANGE_PASSWORD" => UserStatus::ForceChangePassword,
            "EXTERNAL_PROVIDER" => UserStatus::ExternalProvider,
            other => UserStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One existing account in the pool.
///
/// `username` is the provider's stable identity. By convention this crate creates
/// accounts whose username equals their email, but the provider does not enforce
/// that, so duplicate detection keys on the `email` attribute instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryUser {
    pub username: String,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub last_modified_at: DateTime<Utc>,
    /// Attribute name -> value, including `email` when the account has one.
    pub attributes: BTreeMap<String, String>,
}

impl DirectoryUser {
    /// Create a user with no attributes, stamped with the current time.
    pub fn new(username: impl Into<String>, status: UserStatus) -> Self {
        let now = Utc::now();
        Self {
            username: username.into(),
            status,
            created_at: now,
            last_modified_at: now,
            attributes: BTreeMap::new(),
        }
    }

    /// Convenience constructor for a confirmed account whose username and
    /// `email` attribute are both `email`.
    pub fn confirmed(email: impl Into<String>) -> Self {
        let email = email.into();
        Self::new(email.clone(), UserStatus::Confirmed).with_attribute(EMAIL_ATTRIBUTE, email)
    }

    /// Set an attribute, replacing any previous value.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn email(&self) -> Option<&str> {
        self.attribute(EMAIL_ATTRIBUTE)
    }
}

/// A name/value attribute sent with account creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAttribute {
    pub name: String,
    pub value: String,
}

impl UserAttribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One page of a user listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPage {
    pub users: Vec<DirectoryUser>,
    pub pagination_token: Option<String>,
}

impl UserPage {
    pub fn new(users: Vec<DirectoryUser>, pagination_token: Option<String>) -> Self {
        Self {
            users,
            pagination_token,
        }
    }

    /// The continuation token, if another page follows. An empty token counts
    /// as no token.
    pub fn next_token(&self) -> Option<&str> {
        self.pagination_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Parameters of an account-creation call.
#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    pub username: String,
    pub temporary_password: SecretString,
    pub attributes: Vec<UserAttribute>,
    /// Suppress the provider's welcome message.
    pub suppress_notification: bool,
}

impl CreateUserRequest {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }
}

/// Parameters of an administrative password set.
#[derive(Debug, Clone)]
pub struct SetPasswordRequest {
    pub username: String,
    pub password: SecretString,
    /// A permanent password does not expire and ends the forced-reset state.
    pub permanent: bool,
}

/// Operations consumed from a managed user pool.
///
/// Implementations must be safe to share between tasks; the provisioning driver
/// may keep several calls in flight when concurrency is enabled.
pub trait IdentityStore: Send + Sync {
    /// Fetch one page of users. `pagination_token` is the token returned by the
    /// previous page, or `None` for the first page. Page size is the provider's
    /// default.
    fn list_users(
        &self,
        pool_id: &str,
        pagination_token: Option<&str>,
    ) -> impl Future<Output = StoreResult<UserPage>> + Send;

    /// Create an account with a temporary password.
    ///
    /// Fails with [`StoreError::UsernameExists`] if the username is taken.
    fn create_user(
        &self,
        pool_id: &str,
        request: &CreateUserRequest,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Set an account's password.
    ///
    /// Fails with [`StoreError::UserNotFound`] if the user does not exist.
    fn set_user_password(
        &self,
        pool_id: &str,
        request: &SetPasswordRequest,
    ) -> impl Future<Output = StoreResult<()>> + Send;
}
