//! Store traits.

use std::sync::Arc;

use appctl_core::ObjectKey;
use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::ListParams;

/// Typed access to one kind of object in the declarative-state API.
///
/// One instantiation exists per kind the controller touches (App, Deployment,
/// Service, Pod). Implementations must be thread-safe (`Send + Sync`).
/// Every method performs I/O from the caller's point of view.
#[async_trait]
pub trait ResourceStore<K>: Send + Sync
where
    K: Send + Sync + 'static,
{
    /// Reads an object by key.
    ///
    /// Returns `None` if the object does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues, not for missing objects.
    async fn get(&self, key: &ObjectKey) -> Result<Option<K>, StoreError>;

    /// Lists objects in `namespace` whose labels satisfy `params`.
    async fn list(&self, namespace: &str, params: &ListParams) -> Result<Vec<K>, StoreError>;

    /// Creates a new object.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` if an object with the same key exists.
    async fn create(&self, resource: &K) -> Result<K, StoreError>;

    /// Replaces an existing object's metadata and spec. Stored status is kept.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the object does not exist.
    /// Returns `StoreError::Conflict` if `resource` carries a stale resource version.
    async fn update(&self, resource: &K) -> Result<K, StoreError>;

    /// Replaces only the status of an existing object.
    ///
    /// # Errors
    ///
    /// Same as [`ResourceStore::update`].
    async fn update_status(&self, resource: &K) -> Result<K, StoreError>;

    /// Returns the name of this backend for logging.
    fn backend_name(&self) -> &'static str;
}

#[async_trait]
impl<K, S> ResourceStore<K> for Arc<S>
where
    K: Send + Sync + 'static,
    S: ResourceStore<K> + ?Sized,
{
    async fn get(&self, key: &ObjectKey) -> Result<Option<K>, StoreError> {
        (**self).get(key).await
    }

    async fn list(&self, namespace: &str, params: &ListParams) -> Result<Vec<K>, StoreError> {
        (**self).list(namespace, params).await
    }

    async fn create(&self, resource: &K) -> Result<K, StoreError> {
        (**self).create(resource).await
    }

    async fn update(&self, resource: &K) -> Result<K, StoreError> {
        (**self).update(resource).await
    }

    async fn update_status(&self, resource: &K) -> Result<K, StoreError> {
        (**self).update_status(resource).await
    }

    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }
}
