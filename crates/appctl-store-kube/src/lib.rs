//! Kubernetes resource store backend for the app controller.
//!
//! [`KubeStore`] implements `ResourceStore<K>` for any namespaced kind by
//! delegating to `kube::Api`. The status subresource and optimistic
//! concurrency are enforced by the API server itself; this crate only maps
//! calls and errors.
//!
//! # Example
//!
//! ```ignore
//! use appctl_store_kube::KubeStore;
//! use k8s_openapi::api::apps::v1::Deployment;
//!
//! let client = kube::Client::try_default().await?;
//! let deployments = KubeStore::<Deployment>::new(client);
//! ```

mod error;
mod store;

pub use error::map_kube_error;
pub use store::KubeStore;
