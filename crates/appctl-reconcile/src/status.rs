//! Status aggregation: count ready pods and record the count on the App.

use appctl_core::naming::APP_LABEL;
use appctl_core::{App, AppStatus, ObjectKey};
use appctl_store::{ListParams, ResourceStore, StoreError};
use k8s_openapi::api::core::v1::Pod;

/// Result of a status sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    /// The recorded count already matched; nothing was written.
    Unchanged { ready: i32 },
    /// The recorded count was replaced.
    Updated { previous: i32, ready: i32 },
}

impl StatusOutcome {
    pub fn ready(self) -> i32 {
        match self {
            Self::Unchanged { ready } | Self::Updated { ready, .. } => ready,
        }
    }
}

/// A pod is ready when it carries a `Ready` condition with status `True`.
pub fn is_pod_ready(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .is_some_and(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Ready" && c.status == "True")
        })
}

pub fn count_ready(pods: &[Pod]) -> i32 {
    let ready = pods.iter().filter(|pod| is_pod_ready(pod)).count();
    i32::try_from(ready).unwrap_or(i32::MAX)
}

/// Lists the App's pods and writes `status.replicas` only when the ready
/// count differs from what is recorded. Conditions are left as stored.
pub async fn sync_status(
    app_key: &ObjectKey,
    app: &App,
    apps: &dyn ResourceStore<App>,
    pods: &dyn ResourceStore<Pod>,
) -> Result<StatusOutcome, StoreError> {
    let selector = ListParams::new().with_label(APP_LABEL, app_key.name.as_str());
    let pods = pods.list(&app_key.namespace, &selector).await?;
    let ready = count_ready(&pods);
    let previous = app.recorded_replicas();

    if previous == ready {
        tracing::debug!(ready, "App status is current");
        return Ok(StatusOutcome::Unchanged { ready });
    }

    let mut updated = app.clone();
    updated.status.get_or_insert_with(AppStatus::default).replicas = ready;
    apps.update_status(&updated).await?;
    tracing::info!(previous, ready, "App status updated");
    Ok(StatusOutcome::Updated { previous, ready })
}
