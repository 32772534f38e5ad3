//! # appctl-core
//!
//! Shared types for the app controller.
//!
//! - [`App`]: the primary custom resource (`webapp.example.com/v1`, kind `App`)
//! - [`ObjectKey`]: namespace + name identity used by every store
//! - [`naming`]: the stable naming and labeling contract for managed children
//! - [`set_controller_reference`]: the ownership link consumed by cascading deletion

pub mod app;
pub mod error;
pub mod key;
pub mod naming;
pub mod owner;

pub use app::{App, AppSpec, AppStatus};
pub use error::OwnershipError;
pub use key::ObjectKey;
pub use owner::set_controller_reference;
