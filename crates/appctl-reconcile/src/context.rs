use std::fmt;
use std::time::Duration;

use appctl_core::App;
use appctl_store::DynStore;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Pod, Service};

/// Delay before the next periodic pass after a successful one.
pub const DEFAULT_REQUEUE_AFTER: Duration = Duration::from_secs(30);

/// Stores and settings a reconcile pass works against.
///
/// Cloning is cheap; every store is behind an `Arc`.
#[derive(Clone)]
pub struct Context {
    pub apps: DynStore<App>,
    pub deployments: DynStore<Deployment>,
    pub services: DynStore<Service>,
    pub pods: DynStore<Pod>,
    pub requeue_after: Duration,
}

impl Context {
    pub fn new(
        apps: DynStore<App>,
        deployments: DynStore<Deployment>,
        services: DynStore<Service>,
        pods: DynStore<Pod>,
    ) -> Self {
        Self {
            apps,
            deployments,
            services,
            pods,
            requeue_after: DEFAULT_REQUEUE_AFTER,
        }
    }

    /// Overrides the periodic requeue interval.
    #[must_use]
    pub fn with_requeue_after(mut self, requeue_after: Duration) -> Self {
        self.requeue_after = requeue_after;
        self
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("apps", &self.apps.backend_name())
            .field("deployments", &self.deployments.backend_name())
            .field("services", &self.services.backend_name())
            .field("pods", &self.pods.backend_name())
            .field("requeue_after", &self.requeue_after)
            .finish()
    }
}
