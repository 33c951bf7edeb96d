//! Driver tests against the in-memory store.

use super::*;
use crate::store::{DirectoryUser, InMemoryStore, StoreCall, StoreOperation, UserStatus};

fn config(policy: FailurePolicy) -> ProvisionerConfig {
    ProvisionerConfig::builder()
        .with_pool_id("pool")
        .with_bootstrap_password("Bootstrap#0001")
        .with_failure_policy(policy)
        .build()
        .unwrap()
}

fn request(email: &str) -> ProvisionRequest {
    ProvisionRequest::new(email, format!("{}-Pass#1", email))
}

#[tokio::test]
async fn test_create_call_carries_verified_email_and_suppression() {
    let store = InMemoryStore::new("pool");
    let provisioner = Provisioner::new(store.clone(), config(FailurePolicy::Abort)).unwrap();

    provisioner.provision(&[request("ann@x.com")]).await.unwrap();

    let journal = store.journal();
    match &journal[1] {
        StoreCall::CreateUser {
            username,
            temporary_password,
            attributes,
            suppress_notification,
        } => {
            assert_eq!(username, "ann@x.com");
            assert_eq!(temporary_password.expose(), "Bootstrap#0001");
            assert_eq!(
                attributes,
                &vec![
                    UserAttribute::new("email_verified", "true"),
                    UserAttribute::new("email", "ann@x.com"),
                ]
            );
            assert!(*suppress_notification);
        }
        other => panic!("expected CreateUser, got {:?}", other),
    }

    let user = store.user("ann@x.com").unwrap();
    assert_eq!(user.status, UserStatus::Confirmed);
    let (password, permanent) = store.password_of("ann@x.com").unwrap();
    assert_eq!(password.expose(), "ann@x.com-Pass#1");
    assert!(permanent);
}

#[tokio::test]
async fn test_dry_run_makes_no_mutations() {
    let store = InMemoryStore::new("pool");
    store.seed(DirectoryUser::confirmed("ann@x.com"));
    let config = ProvisionerConfig::builder()
        .with_pool_id("pool")
        .with_bootstrap_password("Bootstrap#0001")
        .with_dry_run(true)
        .build()
        .unwrap();
    let provisioner = Provisioner::new(store.clone(), config).unwrap();

    let report = provisioner
        .provision(&[request("ann@x.com"), request("bob@x.com")])
        .await
        .unwrap();

    assert_eq!(report.skipped(), 1);
    assert_eq!(report.would_create(), 1);
    assert_eq!(report.rows[1].outcome, RowOutcome::WouldCreate);
    assert_eq!(store.call_count(StoreOperation::CreateUser), 0);
    assert_eq!(store.call_count(StoreOperation::SetUserPassword), 0);
    assert_eq!(report.summary(), "Dry run: 1 would be created, 1 skipped (2 rows)");
}

#[tokio::test]
async fn test_directory_failure_aborts_before_any_mutation() {
    let store = InMemoryStore::new("pool");
    store.fail_nth(
        StoreOperation::ListUsers,
        1,
        StoreError::unauthorized("ListUsers", "expired credentials"),
    );
    let provisioner = Provisioner::new(store.clone(), config(FailurePolicy::Continue)).unwrap();

    let err = provisioner.provision(&[request("ann@x.com")]).await.unwrap_err();
    assert!(matches!(err, ProvisionError::Directory { .. }));
    assert!(err.partial_report().is_none());
    assert_eq!(store.call_count(StoreOperation::CreateUser), 0);
}

#[tokio::test]
async fn test_repeated_email_within_one_run_hits_username_exists() {
    let store = InMemoryStore::new("pool");
    let provisioner = Provisioner::new(store.clone(), config(FailurePolicy::Continue)).unwrap();

    let report = provisioner
        .provision(&[request("ann@x.com"), request("ann@x.com")])
        .await
        .unwrap();

    assert_eq!(report.rows[0].outcome, RowOutcome::Created);
    assert_eq!(
        report.rows[1].outcome,
        RowOutcome::failed(
            ActivationStep::Create,
            &StoreError::username_exists("pool", "ann@x.com")
        )
    );
    assert_eq!(store.user_count(), 1);
}

#[tokio::test]
async fn test_skip_records_matching_usernames() {
    let store = InMemoryStore::new("pool");
    store.seed(
        DirectoryUser::new("legacy-id-7", UserStatus::Confirmed)
            .with_attribute("email", "ann@x.com"),
    );
    let provisioner = Provisioner::new(store, config(FailurePolicy::Abort)).unwrap();

    let report = provisioner.provision(&[request("ann@x.com")]).await.unwrap();
    assert_eq!(
        report.rows[0].outcome,
        RowOutcome::Skipped {
            matched: vec!["legacy-id-7".to_string()]
        }
    );
    assert_eq!(report.existing_users, 1);
}

#[tokio::test]
async fn test_set_password_failure_leaves_account_on_bootstrap_password() {
    let store = InMemoryStore::new("pool");
    store.fail_for_user(
        StoreOperation::SetUserPassword,
        "ann@x.com",
        StoreError::invalid_parameter("Password does not conform to policy"),
    );
    let provisioner = Provisioner::new(store.clone(), config(FailurePolicy::Abort)).unwrap();

    let err = provisioner.provision(&[request("ann@x.com")]).await.unwrap_err();
    match err {
        ProvisionError::RowFailed { row, step, .. } => {
            assert_eq!(row, 1);
            assert_eq!(step, ActivationStep::SetPassword);
        }
        other => panic!("expected RowFailed, got {:?}", other),
    }

    let (password, permanent) = store.password_of("ann@x.com").unwrap();
    assert_eq!(password.expose(), "Bootstrap#0001");
    assert!(!permanent);
    assert_eq!(
        store.user("ann@x.com").unwrap().status,
        UserStatus::ForceChangePassword
    );
}

#[test]
fn test_invalid_config_is_rejected_at_construction() {
    let mut config = config(FailurePolicy::Abort);
    config.concurrency = 0;
    assert_eq!(
        Provisioner::new(InMemoryStore::new("pool"), config).unwrap_err(),
        ConfigError::ZeroConcurrency
    );
}
