//! # appctl-store
//!
//! Resource store abstraction for the app controller.
//!
//! This crate defines the contract the reconciler uses to read and write
//! cluster objects. Backends live in separate crates (`appctl-store-memory`,
//! `appctl-store-kube`).
//!
//! ## Overview
//!
//! The main trait is [`ResourceStore`], instantiated once per kind:
//! - `get` by namespace + name (absence is `Ok(None)`)
//! - `list` in a namespace filtered by labels
//! - `create`, `update` and `update_status` with optimistic versioning
//!
//! ## Example
//!
//! ```ignore
//! use appctl_store::{ListParams, ResourceStore, StoreError};
//! use k8s_openapi::api::core::v1::Pod;
//!
//! async fn pods_of(store: &dyn ResourceStore<Pod>, app: &str) -> Result<Vec<Pod>, StoreError> {
//!     store
//!         .list("default", &ListParams::new().with_label("app", app))
//!         .await
//! }
//! ```

pub mod cancellable;
mod error;
mod traits;
mod types;

pub use cancellable::CancellableStore;
pub use error::{ErrorCategory, StoreError};
pub use traits::ResourceStore;
pub use types::{ListParams, Operation, StoreObject};

/// Type alias for a shared, type-erased store of one kind.
pub type DynStore<K> = std::sync::Arc<dyn ResourceStore<K>>;
