//! CancellableStore - a store wrapper that fails fast once shutdown begins.
//!
//! Every call is raced against a [`CancellationToken`]. When the token is
//! cancelled, in-flight calls return `StoreError::Cancelled` immediately and
//! new calls never reach the inner store.
//!
//! # Example
//!
//! ```ignore
//! use appctl_store::CancellableStore;
//! use tokio_util::sync::CancellationToken;
//!
//! let token = CancellationToken::new();
//! let store = CancellableStore::new(kube_store, token.clone());
//!
//! // On shutdown:
//! token.cancel();
//! ```

use std::future::Future;

use appctl_core::ObjectKey;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::StoreError;
use crate::traits::ResourceStore;
use crate::types::{ListParams, Operation};

/// A store wrapper tying every call to a shutdown token.
pub struct CancellableStore<S> {
    /// The inner store implementation.
    inner: S,
    /// Cancelled when the process shuts down.
    token: CancellationToken,
}

impl<S> CancellableStore<S> {
    /// Create a new cancellable store wrapper.
    pub fn new(inner: S, token: CancellationToken) -> Self {
        Self { inner, token }
    }

    async fn guard<T, F>(&self, operation: Operation, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>> + Send,
    {
        if self.token.is_cancelled() {
            return Err(StoreError::cancelled(operation));
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => {
                debug!(%operation, "Store call abandoned on shutdown");
                Err(StoreError::cancelled(operation))
            }
            result = call => result,
        }
    }
}

#[async_trait]
impl<K, S> ResourceStore<K> for CancellableStore<S>
where
    K: Send + Sync + 'static,
    S: ResourceStore<K>,
{
    async fn get(&self, key: &ObjectKey) -> Result<Option<K>, StoreError> {
        self.guard(Operation::Get, self.inner.get(key)).await
    }

    async fn list(&self, namespace: &str, params: &ListParams) -> Result<Vec<K>, StoreError> {
        self.guard(Operation::List, self.inner.list(namespace, params))
            .await
    }

    async fn create(&self, resource: &K) -> Result<K, StoreError> {
        self.guard(Operation::Create, self.inner.create(resource))
            .await
    }

    async fn update(&self, resource: &K) -> Result<K, StoreError> {
        self.guard(Operation::Update, self.inner.update(resource))
            .await
    }

    async fn update_status(&self, resource: &K) -> Result<K, StoreError> {
        self.guard(Operation::UpdateStatus, self.inner.update_status(resource))
            .await
    }

    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }
}
