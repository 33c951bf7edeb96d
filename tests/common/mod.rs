//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use pool_provisioner::store::{DirectoryUser, InMemoryStore, StoreCall};
use pool_provisioner::{FailurePolicy, ProvisionRequest, ProvisionerConfig};

pub const POOL_ID: &str = "ap-northeast-1_TestPool";
pub const BOOTSTRAP_PASSWORD: &str = "Bootstrap#9020";

/// A pool seeded with `existing` confirmed accounts.
pub fn pool_with(existing: &[&str]) -> InMemoryStore {
    let store = InMemoryStore::new(POOL_ID);
    store.seed_many(existing.iter().map(|email| DirectoryUser::confirmed(*email)));
    store
}

pub fn config(policy: FailurePolicy) -> ProvisionerConfig {
    config_with_concurrency(policy, 1)
}

pub fn config_with_concurrency(policy: FailurePolicy, concurrency: usize) -> ProvisionerConfig {
    ProvisionerConfig::builder()
        .with_pool_id(POOL_ID)
        .with_bootstrap_password(BOOTSTRAP_PASSWORD)
        .with_failure_policy(policy)
        .with_concurrency(concurrency)
        .build()
        .expect("valid test config")
}

/// Request whose password is derived from the email so tests can check it.
pub fn request(email: &str) -> ProvisionRequest {
    ProvisionRequest::new(email, password_for(email))
}

pub fn password_for(email: &str) -> String {
    format!("Init#{}", email)
}

pub fn requests(emails: &[&str]) -> Vec<ProvisionRequest> {
    emails.iter().map(|e| request(e)).collect()
}

/// Usernames targeted by mutation calls, in call order.
pub fn mutated_usernames(journal: &[StoreCall]) -> Vec<String> {
    journal
        .iter()
        .filter_map(|call| call.username().map(str::to_string))
        .collect()
}
