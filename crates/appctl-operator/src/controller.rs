//! Controller loop: watches Apps and their children and drives reconcile passes.
//!
//! kube-runtime supplies the per-App work queue: events for an App, and for
//! any Deployment or Service it owns, are deduplicated and serialized per key
//! and run on a bounded number of workers.

use std::sync::Arc;
use std::time::Duration;

use appctl_core::{App, ObjectKey};
use appctl_reconcile::{Context, ReconcileError, ReconcileOutcome, reconcile};
use appctl_store::{CancellableStore, DynStore};
use appctl_store_kube::KubeStore;
use futures_util::StreamExt;
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Pod, Service};
use kube::runtime::controller::{self, Action, Controller};
use kube::runtime::watcher;
use kube::{Api, Client, Resource};
use tokio_util::sync::CancellationToken;

use crate::backoff::FailureBackoff;
use crate::config::ControllerSettings;

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("App {0} has no namespace")]
    MissingNamespace(String),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

/// Shared state handed to every reconcile call.
pub struct State {
    pub ctx: Context,
    pub backoff: FailureBackoff,
}

impl State {
    pub fn new(ctx: Context, settings: &ControllerSettings) -> Self {
        Self {
            ctx,
            backoff: FailureBackoff::new(settings.backoff_base(), settings.backoff_max()),
        }
    }
}

fn kube_store<K>(client: &Client, token: &CancellationToken) -> DynStore<K>
where
    K: appctl_store::StoreObject + Resource<Scope = NamespaceResourceScope>,
{
    Arc::new(CancellableStore::new(
        KubeStore::<K>::new(client.clone()),
        token.clone(),
    ))
}

/// Builds a reconcile context whose store calls fail fast once `token` is cancelled.
pub fn build_context(
    client: &Client,
    settings: &ControllerSettings,
    token: &CancellationToken,
) -> Context {
    Context::new(
        kube_store::<App>(client, token),
        kube_store::<Deployment>(client, token),
        kube_store::<Service>(client, token),
        kube_store::<Pod>(client, token),
    )
    .with_requeue_after(settings.requeue_after())
}

fn scoped_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

async fn reconcile_app(app: Arc<App>, state: Arc<State>) -> Result<Action, ControllerError> {
    let key = app.key().ok_or_else(|| {
        ControllerError::MissingNamespace(app.metadata.name.clone().unwrap_or_default())
    })?;

    let outcome = reconcile(&key, &state.ctx).await?;
    state.backoff.reset(&key);
    Ok(action_for(&outcome))
}

/// Maps a successful pass to the next scheduling decision.
pub fn action_for(outcome: &ReconcileOutcome) -> Action {
    match outcome.requeue_after() {
        Some(delay) => Action::requeue(delay),
        None => Action::await_change(),
    }
}

fn error_policy(app: Arc<App>, error: &ControllerError, state: Arc<State>) -> Action {
    let Some(key) = app.key() else {
        return Action::await_change();
    };
    retry_action(&key, error, &state.backoff)
}

/// Chooses when to retry an App after a failed pass.
pub fn retry_action(key: &ObjectKey, error: &ControllerError, backoff: &FailureBackoff) -> Action {
    let retryable = match error {
        ControllerError::Reconcile(e) => e.is_retryable(),
        ControllerError::MissingNamespace(_) => false,
    };
    if !retryable {
        tracing::debug!(app = %key, error = %error, "Not retrying failed reconcile");
        return Action::await_change();
    }
    let delay = backoff.next_delay(key);
    tracing::warn!(
        app = %key,
        error = %error,
        retry_in_ms = saturating_millis(delay),
        failures = backoff.failures(key),
        "Reconcile failed, retrying with backoff"
    );
    Action::requeue(delay)
}

fn saturating_millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

/// Runs the controller until `token` is cancelled.
pub async fn run(client: Client, settings: &ControllerSettings, token: CancellationToken) {
    let namespace = settings.namespace.as_deref();
    let state = Arc::new(State::new(build_context(&client, settings, &token), settings));

    tracing::info!(
        namespace = namespace.unwrap_or("*"),
        concurrency = settings.concurrency,
        requeue_after_secs = settings.requeue_after_secs,
        "Starting App controller"
    );

    let shutdown = token.clone();
    Controller::new(scoped_api::<App>(&client, namespace), watcher::Config::default())
        .owns(
            scoped_api::<Deployment>(&client, namespace),
            watcher::Config::default(),
        )
        .owns(
            scoped_api::<Service>(&client, namespace),
            watcher::Config::default(),
        )
        .with_config(controller::Config::default().concurrency(settings.concurrency))
        .graceful_shutdown_on(async move { shutdown.cancelled().await })
        .run(reconcile_app, error_policy, state)
        .for_each(|result| async move {
            match result {
                Ok((app, _)) => tracing::debug!(app = %app, "Reconciled"),
                Err(e) => tracing::warn!(error = %e, "Controller error"),
            }
        })
        .await;
}
