//! In-memory identity store.
//!
//! This module provides a thread-safe, in-process implementation of the
//! [`IdentityStore`] trait. It behaves like a small user pool: listings are paged
//! with an opaque continuation token, creating a taken username fails, and
//! setting a permanent password confirms the account.
//!
//! # Features
//!
//! * Configurable page size for exercising multi-page listings
//! * A call journal recording every operation in the order it was issued
//! * Fault injection on the N-th call of an operation or for a given username
//! * Cheap `Clone` sharing the same underlying pool
//!
//! # Example Usage
//!
//! ```rust
//! use pool_provisioner::store::{InMemoryStore, StoreError, StoreOperation};
//!
//! let store = InMemoryStore::new("pool-1").with_page_size(60);
//! store.fail_nth(StoreOperation::CreateUser, 2, StoreError::throttled("AdminCreateUser"));
//! ```

use crate::store::{
    CreateUserRequest, DirectoryUser, IdentityStore, SetPasswordRequest, StoreError,
    StoreResult, UserAttribute, UserPage, UserStatus,
};
use crate::secret::SecretString;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Default number of users per listing page.
pub const DEFAULT_PAGE_SIZE: usize = 60;

const TOKEN_PREFIX: &str = "offset:";

/// The operations of the identity-store contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    ListUsers,
    CreateUser,
    SetUserPassword,
}

/// One recorded call against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    ListUsers {
        pagination_token: Option<String>,
    },
    CreateUser {
        username: String,
        temporary_password: SecretString,
        attributes: Vec<UserAttribute>,
        suppress_notification: bool,
    },
    SetUserPassword {
        username: String,
        password: SecretString,
        permanent: bool,
    },
}

impl StoreCall {
    pub fn operation(&self) -> StoreOperation {
        match self {
            StoreCall::ListUsers { .. } => StoreOperation::ListUsers,
            StoreCall::CreateUser { .. } => StoreOperation::CreateUser,
            StoreCall::SetUserPassword { .. } => StoreOperation::SetUserPassword,
        }
    }

    /// The username a mutation targeted; `None` for listings.
    pub fn username(&self) -> Option<&str> {
        match self {
            StoreCall::ListUsers { .. } => None,
            StoreCall::CreateUser { username, .. }
            | StoreCall::SetUserPassword { username, .. } => Some(username),
        }
    }
}

#[derive(Debug, Clone)]
enum Fault {
    /// Fail the `nth` (1-based) call of `operation`.
    OnCall {
        operation: StoreOperation,
        nth: usize,
        error: StoreError,
    },
    /// Fail every call of `operation` targeting `username`.
    ForUser {
        operation: StoreOperation,
        username: String,
        error: StoreError,
    },
}

#[derive(Debug, Default)]
struct PoolState {
    // Insertion order is listing order.
    users: Vec<DirectoryUser>,
    passwords: HashMap<String, (SecretString, bool)>,
    journal: Vec<StoreCall>,
    call_counts: HashMap<StoreOperation, usize>,
    faults: Vec<Fault>,
}

impl PoolState {
    fn position(&self, username: &str) -> Option<usize> {
        self.users.iter().position(|u| u.username == username)
    }

    /// Journal the call, bump its counter and return an injected fault if one
    /// applies.
    fn record(&mut self, call: StoreCall) -> StoreResult<()> {
        let operation = call.operation();
        let count = self.call_counts.entry(operation).or_insert(0);
        *count += 1;
        let nth_call = *count;
        let username = call.username().map(str::to_string);
        self.journal.push(call);

        for fault in &self.faults {
            match fault {
                Fault::OnCall {
                    operation: op,
                    nth,
                    error,
                } if *op == operation && *nth == nth_call => return Err(error.clone()),
                Fault::ForUser {
                    operation: op,
                    username: target,
                    error,
                } if *op == operation && username.as_deref() == Some(target.as_str()) => {
                    return Err(error.clone());
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Thread-safe in-memory user pool.
///
/// Clones share state, so a test can hand one clone to the component under test
/// and inspect the journal through another.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    pool_id: String,
    page_size: usize,
    // Held only for short non-async critical sections.
    state: Arc<Mutex<PoolState>>,
}

impl InMemoryStore {
    /// Create an empty pool answering to `pool_id`.
    pub fn new(pool_id: impl Into<String>) -> Self {
        Self {
            pool_id: pool_id.into(),
            page_size: DEFAULT_PAGE_SIZE,
            state: Arc::new(Mutex::new(PoolState::default())),
        }
    }

    /// Set the listing page size (minimum 1).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn pool_id(&self) -> &str {
        &self.pool_id
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        // A poisoned lock only means a test panicked mid-call; the data is still usable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add an existing account without recording a call.
    pub fn seed(&self, user: DirectoryUser) {
        self.lock().users.push(user);
    }

    /// Add several existing accounts without recording calls.
    pub fn seed_many(&self, users: impl IntoIterator<Item = DirectoryUser>) {
        self.lock().users.extend(users);
    }

    /// Fail the `nth` (1-based) call of `operation` with `error`.
    pub fn fail_nth(&self, operation: StoreOperation, nth: usize, error: StoreError) {
        self.lock().faults.push(Fault::OnCall {
            operation,
            nth,
            error,
        });
    }

    /// Fail every `operation` call that targets `username` with `error`.
    pub fn fail_for_user(
        &self,
        operation: StoreOperation,
        username: impl Into<String>,
        error: StoreError,
    ) {
        self.lock().faults.push(Fault::ForUser {
            operation,
            username: username.into(),
            error,
        });
    }

    /// Remove all injected faults.
    pub fn clear_faults(&self) {
        self.lock().faults.clear();
    }

    /// Snapshot of all accounts in listing order.
    pub fn users(&self) -> Vec<DirectoryUser> {
        self.lock().users.clone()
    }

    pub fn user(&self, username: &str) -> Option<DirectoryUser> {
        let state = self.lock();
        state.position(username).map(|i| state.users[i].clone())
    }

    pub fn user_count(&self) -> usize {
        self.lock().users.len()
    }

    /// Current password of an account and whether it is permanent.
    pub fn password_of(&self, username: &str) -> Option<(SecretString, bool)> {
        self.lock().passwords.get(username).cloned()
    }

    /// Every call issued so far, in order.
    pub fn journal(&self) -> Vec<StoreCall> {
        self.lock().journal.clone()
    }

    /// Number of calls issued for `operation`.
    pub fn call_count(&self, operation: StoreOperation) -> usize {
        self.lock()
            .call_counts
            .get(&operation)
            .copied()
            .unwrap_or(0)
    }

    /// Forget recorded calls and counters, keeping accounts and faults.
    pub fn clear_journal(&self) {
        let mut state = self.lock();
        state.journal.clear();
        state.call_counts.clear();
    }

    fn check_pool(&self, pool_id: &str) -> StoreResult<()> {
        if pool_id == self.pool_id {
            Ok(())
        } else {
            Err(StoreError::pool_not_found(pool_id))
        }
    }

    fn parse_token(token: Option<&str>) -> StoreResult<usize> {
        match token {
            None => Ok(0),
            Some(token) => token
                .strip_prefix(TOKEN_PREFIX)
                .and_then(|offset| offset.parse::<usize>().ok())
                .ok_or_else(|| {
                    StoreError::invalid_parameter(format!("Invalid pagination token: {}", token))
                }),
        }
    }
}

impl IdentityStore for InMemoryStore {
    async fn list_users(
        &self,
        pool_id: &str,
        pagination_token: Option<&str>,
    ) -> StoreResult<UserPage> {
        let mut state = self.lock();
        state.record(StoreCall::ListUsers {
            pagination_token: pagination_token.map(str::to_string),
        })?;
        self.check_pool(pool_id)?;

        let offset = Self::parse_token(pagination_token)?;
        let end = offset.saturating_add(self.page_size).min(state.users.len());
        let users = state.users.get(offset..end).unwrap_or_default().to_vec();
        let next = (end < state.users.len()).then(|| format!("{}{}", TOKEN_PREFIX, end));

        Ok(UserPage::new(users, next))
    }

    async fn create_user(&self, pool_id: &str, request: &CreateUserRequest) -> StoreResult<()> {
        let mut state = self.lock();
        state.record(StoreCall::CreateUser {
            username: request.username.clone(),
            temporary_password: request.temporary_password.clone(),
            attributes: request.attributes.clone(),
            suppress_notification: request.suppress_notification,
        })?;
        self.check_pool(pool_id)?;

        if request.username.is_empty() {
            return Err(StoreError::invalid_parameter("Username must not be empty"));
        }
        if state.position(&request.username).is_some() {
            return Err(StoreError::username_exists(pool_id, &request.username));
        }

        let mut user = DirectoryUser::new(&request.username, UserStatus::ForceChangePassword);
        for attr in &request.attributes {
            user.attributes.insert(attr.name.clone(), attr.value.clone());
        }
        state.users.push(user);
        state.passwords.insert(
            request.username.clone(),
            (request.temporary_password.clone(), false),
        );
        Ok(())
    }

    async fn set_user_password(
        &self,
        pool_id: &str,
        request: &SetPasswordRequest,
    ) -> StoreResult<()> {
        let mut state = self.lock();
        state.record(StoreCall::SetUserPassword {
            username: request.username.clone(),
            password: request.password.clone(),
            permanent: request.permanent,
        })?;
        self.check_pool(pool_id)?;

        let index = state
            .position(&request.username)
            .ok_or_else(|| StoreError::user_not_found(pool_id, &request.username))?;

        let user = &mut state.users[index];
        user.status = if request.permanent {
            UserStatus::Confirmed
        } else {
            UserStatus::ForceChangePassword
        };
        user.last_modified_at = Utc::now();
        state.passwords.insert(
            request.username.clone(),
            (request.password.clone(), request.permanent),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request(username: &str) -> CreateUserRequest {
        CreateUserRequest {
            username: username.to_string(),
            temporary_password: SecretString::new("Temp#0001"),
            attributes: vec![UserAttribute::new("email", username)],
            suppress_notification: true,
        }
    }

    #[tokio::test]
    async fn test_list_users_pages_in_insertion_order() {
        let store = InMemoryStore::new("pool").with_page_size(2);
        for i in 1..=5 {
            store.seed(DirectoryUser::confirmed(format!("user{}@example.com", i)));
        }

        let page1 = store.list_users("pool", None).await.unwrap();
        assert_eq!(page1.users.len(), 2);
        assert_eq!(page1.users[0].username, "user1@example.com");
        let token = page1.next_token().unwrap().to_string();

        let page2 = store.list_users("pool", Some(&token)).await.unwrap();
        assert_eq!(page2.users[0].username, "user3@example.com");
        let token = page2.next_token().unwrap().to_string();

        let page3 = store.list_users("pool", Some(&token)).await.unwrap();
        assert_eq!(page3.users.len(), 1);
        assert!(page3.next_token().is_none());
        assert_eq!(store.call_count(StoreOperation::ListUsers), 3);
    }

    #[tokio::test]
    async fn test_empty_pool_lists_one_empty_page() {
        let store = InMemoryStore::new("pool");
        let page = store.list_users("pool", None).await.unwrap();
        assert!(page.users.is_empty());
        assert!(page.next_token().is_none());
    }

    #[tokio::test]
    async fn test_unknown_pool_and_bad_token_are_rejected() {
        let store = InMemoryStore::new("pool");
        assert_eq!(
            store.list_users("other", None).await,
            Err(StoreError::pool_not_found("other"))
        );
        assert!(matches!(
            store.list_users("pool", Some("garbage")).await,
            Err(StoreError::InvalidParameter { .. })
        ));
    }

    #[tokio::test]
    async fn test_forged_huge_offset_returns_empty_last_page() {
        let store = InMemoryStore::new("pool").with_page_size(2);
        store.seed(DirectoryUser::confirmed("ann@example.com"));
        let token = format!("{}{}", TOKEN_PREFIX, usize::MAX);

        let page = store.list_users("pool", Some(&token)).await.unwrap();
        assert!(page.users.is_empty());
        assert!(page.next_token().is_none());
    }

    #[tokio::test]
    async fn test_create_then_permanent_password_confirms_user() {
        let store = InMemoryStore::new("pool");
        store
            .create_user("pool", &create_request("ann@example.com"))
            .await
            .unwrap();
        let user = store.user("ann@example.com").unwrap();
        assert_eq!(user.status, UserStatus::ForceChangePassword);
        assert_eq!(user.email(), Some("ann@example.com"));

        store
            .set_user_password(
                "pool",
                &SetPasswordRequest {
                    username: "ann@example.com".to_string(),
                    password: SecretString::new("Real#Pass1"),
                    permanent: true,
                },
            )
            .await
            .unwrap();
        assert_eq!(
            store.user("ann@example.com").unwrap().status,
            UserStatus::Confirmed
        );
        let (password, permanent) = store.password_of("ann@example.com").unwrap();
        assert_eq!(password.expose(), "Real#Pass1");
        assert!(permanent);
    }

    #[tokio::test]
    async fn test_create_existing_username_fails() {
        let store = InMemoryStore::new("pool");
        store.seed(DirectoryUser::confirmed("ann@example.com"));
        let result = store
            .create_user("pool", &create_request("ann@example.com"))
            .await;
        assert_eq!(
            result,
            Err(StoreError::username_exists("pool", "ann@example.com"))
        );
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn test_set_password_for_unknown_user_fails() {
        let store = InMemoryStore::new("pool");
        let result = store
            .set_user_password(
                "pool",
                &SetPasswordRequest {
                    username: "ghost@example.com".to_string(),
                    password: SecretString::new("x"),
                    permanent: true,
                },
            )
            .await;
        assert_eq!(
            result,
            Err(StoreError::user_not_found("pool", "ghost@example.com"))
        );
    }

    #[tokio::test]
    async fn test_injected_faults_fire_and_are_journaled() {
        let store = InMemoryStore::new("pool");
        store.fail_nth(
            StoreOperation::CreateUser,
            2,
            StoreError::throttled("AdminCreateUser"),
        );
        store.fail_for_user(
            StoreOperation::CreateUser,
            "bad@example.com",
            StoreError::invalid_parameter("bad email"),
        );

        assert!(store.create_user("pool", &create_request("a@x.com")).await.is_ok());
        assert_eq!(
            store.create_user("pool", &create_request("b@x.com")).await,
            Err(StoreError::throttled("AdminCreateUser"))
        );
        assert!(store.create_user("pool", &create_request("c@x.com")).await.is_ok());
        assert!(
            store
                .create_user("pool", &create_request("bad@example.com"))
                .await
                .is_err()
        );

        assert_eq!(store.journal().len(), 4);
        assert_eq!(store.user_count(), 2);

        store.clear_faults();
        assert!(store.create_user("pool", &create_request("b@x.com")).await.is_ok());
    }
}
