//! Directory reader: the complete current user set of a pool.
//!
//! [`DirectoryReader::fetch_all_users`] follows the provider's continuation token
//! until a page arrives without one, concatenating pages in the order the
//! provider returned them. There is no page-count limit; large pools simply take
//! longer. Any failed page aborts the fetch and no partial result is returned.

use crate::store::{DirectoryUser, IdentityStore, StoreResult};
use log::{debug, info};

/// Reads every user of a pool through an injected [`IdentityStore`].
#[derive(Debug, Clone)]
pub struct DirectoryReader<S> {
    store: S,
}

impl<S: IdentityStore> DirectoryReader<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetch all users of `pool_id`, in provider order across pages.
    pub async fn fetch_all_users(&self, pool_id: &str) -> StoreResult<Vec<DirectoryUser>> {
        let mut users = Vec::new();
        let mut token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self.store.list_users(pool_id, token.as_deref()).await?;
            pages += 1;
            debug!(
                "Fetched page {} of pool '{}' ({} users)",
                pages,
                pool_id,
                page.users.len()
            );

            let next = page.next_token().map(str::to_string);
            users.extend(page.users);

            match next {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        info!(
            "Pool '{}' has {} existing users ({} pages)",
            pool_id,
            users.len(),
            pages
        );
        Ok(users)
    }
}
