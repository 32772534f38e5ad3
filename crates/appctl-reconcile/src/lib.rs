//! # appctl-reconcile
//!
//! Reconciliation logic for `App` resources.
//!
//! One pass drives a single App toward its desired state:
//! - fetch the App (absence means it was deleted; nothing to do)
//! - build the desired Deployment and Service from `App.spec`
//! - converge each child: create when absent, patch the compared subset when drifted
//! - count ready pods and write `App.status.replicas` when the count changed
//!
//! Retries and scheduling belong to the caller. A pass never retries a
//! failed step and never rolls back a step that already succeeded.

mod context;
mod converge;
mod desired;
mod error;
mod reconciler;
mod status;

pub use context::{Context, DEFAULT_REQUEUE_AFTER};
pub use converge::{ConvergeOutcome, Convergent, converge};
pub use desired::{DesiredState, desired_deployment, desired_service};
pub use error::{ReconcileError, Stage};
pub use reconciler::{ReconcileOutcome, ReconcileReport, reconcile};
pub use status::{StatusOutcome, count_ready, is_pod_ready, sync_status};
