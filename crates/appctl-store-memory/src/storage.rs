use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use appctl_core::ObjectKey;
use appctl_store::{ListParams, Operation, ResourceStore, StoreError, StoreObject};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;
use uuid::Uuid;

/// In-memory store for one kind of object.
///
/// This store provides:
/// - Concurrent access via `DashMap`
/// - Server-assigned `uid`, `resourceVersion` and `generation`
/// - Optimistic concurrency: writes carrying a stale `resourceVersion` fail with `Conflict`
/// - Status subresource semantics (`update` keeps status, `update_status` touches only status)
/// - Write accounting and one-shot fault injection for tests
pub struct InMemoryStore<K> {
    /// Objects keyed by namespace/name
    data: DashMap<ObjectKey, K>,
    /// Source of resource versions, shared by every write
    version_counter: AtomicU64,
    /// Successful writes issued through the `ResourceStore` trait
    writes: AtomicUsize,
    /// Errors to return from the next call of an operation
    faults: DashMap<Operation, StoreError>,
}

impl<K: StoreObject> InMemoryStore<K> {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
            version_counter: AtomicU64::new(1),
            writes: AtomicUsize::new(0),
            faults: DashMap::new(),
        }
    }

    /// Makes the next call of `operation` fail with `error`.
    pub fn fail_next(&self, operation: Operation, error: StoreError) {
        self.faults.insert(operation, error);
    }

    /// Number of successful create/update/update_status calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Stores `resource` as if another actor had created it. Not counted as a write.
    pub fn seed(&self, resource: &K) -> Result<K, StoreError> {
        let key = key_of(resource)?;
        let mut stored = resource.clone();
        let meta = stored.meta_mut();
        meta.uid.get_or_insert_with(|| Uuid::new_v4().to_string());
        meta.generation.get_or_insert(1);
        meta.resource_version = Some(self.next_version());
        self.data.insert(key, stored.clone());
        Ok(stored)
    }

    /// Overwrites the stored object verbatim, as another actor would.
    /// Only `resourceVersion` is assigned. Not counted as a write.
    pub fn apply_external(&self, resource: &K) -> Result<K, StoreError> {
        let key = key_of(resource)?;
        let mut entry = self
            .data
            .get_mut(&key)
            .ok_or_else(|| StoreError::not_found(K::kind_name(), &key))?;
        let mut stored = resource.clone();
        stored.meta_mut().resource_version = Some(self.next_version());
        *entry = stored.clone();
        Ok(stored)
    }

    /// Removes an object, returning it if present.
    pub fn remove(&self, key: &ObjectKey) -> Option<K> {
        self.data.remove(key).map(|(_, obj)| obj)
    }

    /// Current stored copy of an object.
    pub fn snapshot(&self, key: &ObjectKey) -> Option<K> {
        self.data.get(key).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn next_version(&self) -> String {
        self.version_counter
            .fetch_add(1, Ordering::SeqCst)
            .to_string()
    }

    fn take_fault(&self, operation: Operation) -> Result<(), StoreError> {
        match self.faults.remove(&operation) {
            Some((_, error)) => Err(error),
            None => Ok(()),
        }
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

impl<K: StoreObject> Default for InMemoryStore<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> fmt::Debug for InMemoryStore<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("objects", &self.data.len())
            .field("writes", &self.writes.load(Ordering::SeqCst))
            .finish()
    }
}

fn key_of<K: StoreObject>(resource: &K) -> Result<ObjectKey, StoreError> {
    ObjectKey::of(resource).ok_or_else(|| {
        StoreError::invalid(format!(
            "{} must have metadata.name and metadata.namespace",
            K::kind_name()
        ))
    })
}

fn check_version<K: StoreObject>(
    key: &ObjectKey,
    stored: &K,
    incoming: &K,
) -> Result<(), StoreError> {
    let expected = incoming.meta().resource_version.as_deref();
    let actual = stored.meta().resource_version.as_deref();
    match expected {
        Some(expected) if Some(expected) != actual => Err(StoreError::conflict(
            K::kind_name(),
            key,
            format!(
                "the object has been modified; expected resourceVersion {expected}, found {}",
                actual.unwrap_or("<none>")
            ),
        )),
        _ => Ok(()),
    }
}

fn copy_field(from: &Value, to: &mut Value, field: &str) {
    if let Some(target) = to.as_object_mut() {
        match from.get(field) {
            Some(value) => {
                target.insert(field.to_string(), value.clone());
            }
            None => {
                target.remove(field);
            }
        }
    }
}

#[async_trait]
impl<K: StoreObject> ResourceStore<K> for InMemoryStore<K> {
    async fn get(&self, key: &ObjectKey) -> Result<Option<K>, StoreError> {
        self.take_fault(Operation::Get)?;
        Ok(self.snapshot(key))
    }

    async fn list(&self, namespace: &str, params: &ListParams) -> Result<Vec<K>, StoreError> {
        self.take_fault(Operation::List)?;
        let mut matching: Vec<(ObjectKey, K)> = self
            .data
            .iter()
            .filter(|entry| entry.key().namespace == namespace)
            .filter(|entry| params.matches(entry.value().meta().labels.as_ref()))
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        matching.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(matching.into_iter().map(|(_, obj)| obj).collect())
    }

    async fn create(&self, resource: &K) -> Result<K, StoreError> {
        self.take_fault(Operation::Create)?;
        let key = key_of(resource)?;
        match self.data.entry(key) {
            Entry::Occupied(occupied) => Err(StoreError::already_exists(
                K::kind_name(),
                occupied.key(),
            )),
            Entry::Vacant(slot) => {
                let mut created = resource.clone();
                let meta = created.meta_mut();
                meta.uid = Some(Uuid::new_v4().to_string());
                meta.generation = Some(1);
                meta.resource_version = Some(self.next_version());
                slot.insert(created.clone());
                self.record_write();
                Ok(created)
            }
        }
    }

    async fn update(&self, resource: &K) -> Result<K, StoreError> {
        self.take_fault(Operation::Update)?;
        let key = key_of(resource)?;
        let mut entry = self
            .data
            .get_mut(&key)
            .ok_or_else(|| StoreError::not_found(K::kind_name(), &key))?;
        check_version(&key, entry.value(), resource)?;

        let stored_json = serde_json::to_value(entry.value())?;
        let mut next_json = serde_json::to_value(resource)?;
        copy_field(&stored_json, &mut next_json, "status");
        let spec_changed = stored_json.get("spec") != next_json.get("spec");

        let mut updated: K = serde_json::from_value(next_json)?;
        let previous = entry.meta();
        let generation = previous.generation.unwrap_or(1) + i64::from(spec_changed);
        let uid = previous.uid.clone();
        let meta = updated.meta_mut();
        meta.uid = uid;
        meta.generation = Some(generation);
        meta.resource_version = Some(self.next_version());

        *entry = updated.clone();
        self.record_write();
        Ok(updated)
    }

    async fn update_status(&self, resource: &K) -> Result<K, StoreError> {
        self.take_fault(Operation::UpdateStatus)?;
        let key = key_of(resource)?;
        let mut entry = self
            .data
            .get_mut(&key)
            .ok_or_else(|| StoreError::not_found(K::kind_name(), &key))?;
        check_version(&key, entry.value(), resource)?;

        let mut next_json = serde_json::to_value(entry.value())?;
        copy_field(&serde_json::to_value(resource)?, &mut next_json, "status");
        let mut updated: K = serde_json::from_value(next_json)?;
        updated.meta_mut().resource_version = Some(self.next_version());

        *entry = updated.clone();
        self.record_write();
        Ok(updated)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
