use std::marker::PhantomData;

use appctl_core::ObjectKey;
use appctl_store::{ListParams, ResourceStore, StoreError, StoreObject};
use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, PostParams};
use kube::{Client, Resource};
use tracing::trace;

use crate::error::map_kube_error;

/// Resource store backed by the Kubernetes API server.
pub struct KubeStore<K> {
    client: Client,
    _kind: PhantomData<fn() -> K>,
}

impl<K> KubeStore<K>
where
    K: StoreObject + Resource<Scope = NamespaceResourceScope>,
{
    pub fn new(client: Client) -> Self {
        Self {
            client,
            _kind: PhantomData,
        }
    }

    fn api(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn key_of(resource: &K) -> Result<ObjectKey, StoreError> {
        ObjectKey::of(resource).ok_or_else(|| {
            StoreError::invalid(format!(
                "{} must have metadata.name and metadata.namespace",
                K::kind_name()
            ))
        })
    }
}

impl<K> Clone for KubeStore<K> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            _kind: PhantomData,
        }
    }
}

#[async_trait]
impl<K> ResourceStore<K> for KubeStore<K>
where
    K: StoreObject + Resource<Scope = NamespaceResourceScope>,
{
    async fn get(&self, key: &ObjectKey) -> Result<Option<K>, StoreError> {
        trace!(kind = %K::kind_name(), %key, "get");
        self.api(&key.namespace)
            .get_opt(&key.name)
            .await
            .map_err(|e| map_kube_error(&K::kind_name(), key, e))
    }

    async fn list(&self, namespace: &str, params: &ListParams) -> Result<Vec<K>, StoreError> {
        let selector = params.selector();
        trace!(kind = %K::kind_name(), namespace, %selector, "list");
        let mut lp = kube::api::ListParams::default();
        if !selector.is_empty() {
            lp = lp.labels(&selector);
        }
        let key = ObjectKey::new(namespace, "");
        self.api(namespace)
            .list(&lp)
            .await
            .map(|list| list.items)
            .map_err(|e| map_kube_error(&K::kind_name(), &key, e))
    }

    async fn create(&self, resource: &K) -> Result<K, StoreError> {
        let key = Self::key_of(resource)?;
        trace!(kind = %K::kind_name(), %key, "create");
        self.api(&key.namespace)
            .create(&PostParams::default(), resource)
            .await
            .map_err(|e| map_kube_error(&K::kind_name(), &key, e))
    }

    async fn update(&self, resource: &K) -> Result<K, StoreError> {
        let key = Self::key_of(resource)?;
        trace!(kind = %K::kind_name(), %key, "replace");
        self.api(&key.namespace)
            .replace(&key.name, &PostParams::default(), resource)
            .await
            .map_err(|e| map_kube_error(&K::kind_name(), &key, e))
    }

    async fn update_status(&self, resource: &K) -> Result<K, StoreError> {
        let key = Self::key_of(resource)?;
        trace!(kind = %K::kind_name(), %key, "replace_status");
        let body = serde_json::to_vec(resource)?;
        self.api(&key.namespace)
            .replace_status(&key.name, &PostParams::default(), body)
            .await
            .map_err(|e| map_kube_error(&K::kind_name(), &key, e))
    }

    fn backend_name(&self) -> &'static str {
        "kube"
    }
}
