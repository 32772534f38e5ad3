//! In-memory resource store backend for the app controller.
//!
//! This crate provides an in-memory implementation of the `ResourceStore`
//! trait from `appctl-store`, using a `DashMap` per kind for concurrent access.
//! It mimics the API server closely enough for reconcile tests: server-assigned
//! uids, monotonic resource versions, optimistic conflicts and a status
//! subresource.
//!
//! # Example
//!
//! ```ignore
//! use appctl_store_memory::InMemoryStore;
//! use appctl_store::ResourceStore;
//! use k8s_openapi::api::apps::v1::Deployment;
//!
//! let store = InMemoryStore::<Deployment>::new();
//! let created = store.create(&deployment).await?;
//! assert_eq!(store.write_count(), 1);
//! ```

pub mod storage;

pub use appctl_store::{ResourceStore, StoreError};
pub use storage::InMemoryStore;
