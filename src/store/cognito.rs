//! AWS Cognito user-pool backend.
//!
//! Maps the [`IdentityStore`] contract onto `ListUsers`, `AdminCreateUser` and
//! `AdminSetUserPassword`. Credentials and region come from the standard AWS
//! configuration chain (environment, profile, instance metadata).

use crate::store::{
    CreateUserRequest, DirectoryUser, IdentityStore, SetPasswordRequest, StoreError,
    StoreResult, UserPage, UserStatus,
};
use aws_config::BehaviorVersion;
use aws_sdk_cognitoidentityprovider::Client;
use aws_sdk_cognitoidentityprovider::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_cognitoidentityprovider::primitives::DateTime as AwsDateTime;
use aws_sdk_cognitoidentityprovider::types::{AttributeType, MessageActionType, UserType};
use chrono::{DateTime, Utc};
use log::trace;
use std::collections::BTreeMap;

/// Identity store backed by an AWS Cognito user pool.
#[derive(Debug, Clone)]
pub struct CognitoStore {
    client: Client,
}

impl CognitoStore {
    /// Wrap an already configured SDK client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the default AWS configuration chain, optionally
    /// overriding the region.
    pub async fn from_env(region: Option<String>) -> Self {
        let mut builder = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            builder = builder.region(aws_config::Region::new(region));
        }
        let config = builder.load().await;
        Self::new(Client::new(&config))
    }

    fn convert_user(user: &UserType) -> DirectoryUser {
        let attributes: BTreeMap<String, String> = user
            .attributes()
            .iter()
            .map(|attr| {
                (
                    attr.name().to_string(),
                    attr.value().unwrap_or_default().to_string(),
                )
            })
            .collect();

        DirectoryUser {
            username: user.username().unwrap_or_default().to_string(),
            status: user
                .user_status()
                .map(|status| UserStatus::from(status.as_str()))
                .unwrap_or(UserStatus::Unknown),
            created_at: convert_timestamp(user.user_create_date()),
            last_modified_at: convert_timestamp(user.user_last_modified_date()),
            attributes,
        }
    }
}

fn convert_timestamp(value: Option<&AwsDateTime>) -> DateTime<Utc> {
    value
        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts.secs(), ts.subsec_nanos()))
        .unwrap_or_default()
}

/// Translate an SDK failure into the store taxonomy using the service error code.
fn map_sdk_error<E, R>(
    operation: &str,
    pool_id: &str,
    username: Option<&str>,
    err: SdkError<E, R>,
) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    if matches!(
        err,
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_)
    ) {
        return StoreError::network(format!(
            "{} failed: {}",
            operation,
            DisplayErrorContext(&err)
        ));
    }

    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(&err).to_string());
    let username = username.unwrap_or_default();

    match err.code() {
        Some("UserNotFoundException") => StoreError::user_not_found(pool_id, username),
        Some("UsernameExistsException") => StoreError::username_exists(pool_id, username),
        Some("ResourceNotFoundException") => StoreError::pool_not_found(pool_id),
        Some("InvalidParameterException") | Some("InvalidPasswordException") => {
            StoreError::invalid_parameter(message)
        }
        Some("TooManyRequestsException") | Some("LimitExceededException") => {
            StoreError::throttled(operation)
        }
        Some("NotAuthorizedException")
        | Some("AccessDeniedException")
        | Some("UnrecognizedClientException")
        | Some("ExpiredTokenException") => StoreError::unauthorized(operation, message),
        _ => StoreError::internal(format!("{} failed: {}", operation, message)),
    }
}

impl IdentityStore for CognitoStore {
    async fn list_users(
        &self,
        pool_id: &str,
        pagination_token: Option<&str>,
    ) -> StoreResult<UserPage> {
        trace!("ListUsers pool={} token_present={}", pool_id, pagination_token.is_some());
        let response = self
            .client
            .list_users()
            .user_pool_id(pool_id)
            .set_pagination_token(pagination_token.map(str::to_string))
            .send()
            .await
            .map_err(|e| map_sdk_error("ListUsers", pool_id, None, e))?;

        let users = response.users().iter().map(Self::convert_user).collect();
        Ok(UserPage::new(
            users,
            response.pagination_token().map(str::to_string),
        ))
    }

    async fn create_user(&self, pool_id: &str, request: &CreateUserRequest) -> StoreResult<()> {
        let attributes = request
            .attributes
            .iter()
            .map(|attr| {
                AttributeType::builder()
                    .name(&attr.name)
                    .value(&attr.value)
                    .build()
                    .map_err(|e| StoreError::invalid_parameter(e.to_string()))
            })
            .collect::<StoreResult<Vec<_>>>()?;

        let mut call = self
            .client
            .admin_create_user()
            .user_pool_id(pool_id)
            .username(&request.username)
            .temporary_password(request.temporary_password.expose())
            .set_user_attributes(Some(attributes));
        if request.suppress_notification {
            call = call.message_action(MessageActionType::Suppress);
        }

        call.send().await.map_err(|e| {
            map_sdk_error("AdminCreateUser", pool_id, Some(&request.username), e)
        })?;
        Ok(())
    }

    async fn set_user_password(
        &self,
        pool_id: &str,
        request: &SetPasswordRequest,
    ) -> StoreResult<()> {
        self.client
            .admin_set_user_password()
            .user_pool_id(pool_id)
            .username(&request.username)
            .password(request.password.expose())
            .permanent(request.permanent)
            .send()
            .await
            .map_err(|e| {
                map_sdk_error("AdminSetUserPassword", pool_id, Some(&request.username), e)
            })?;
        Ok(())
    }
}
