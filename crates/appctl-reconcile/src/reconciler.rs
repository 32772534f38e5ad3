//! Reconcile orchestrator.

use std::time::Duration;

use appctl_core::{ObjectKey, set_controller_reference};
use tracing::Instrument;

use crate::context::Context;
use crate::converge::{ConvergeOutcome, converge};
use crate::desired::DesiredState;
use crate::error::{ReconcileError, Stage};
use crate::status::{StatusOutcome, sync_status};

/// What a completed pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub deployment: ConvergeOutcome,
    pub service: ConvergeOutcome,
    pub status: StatusOutcome,
    /// Delay before the next periodic pass.
    pub requeue_after: Duration,
}

impl ReconcileReport {
    /// Number of store writes the pass issued.
    pub fn writes(&self) -> usize {
        usize::from(self.deployment.wrote())
            + usize::from(self.service.wrote())
            + usize::from(matches!(self.status, StatusOutcome::Updated { .. }))
    }
}

/// Outcome of a successful pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The App no longer exists. Its children are left to cascading deletion.
    Deleted,
    /// Children converged and status synced.
    Synced(ReconcileReport),
}

impl ReconcileOutcome {
    /// When to run the next periodic pass, if at all.
    pub fn requeue_after(&self) -> Option<Duration> {
        match self {
            Self::Deleted => None,
            Self::Synced(report) => Some(report.requeue_after),
        }
    }
}

/// Runs one reconcile pass for the App at `key`.
///
/// Steps run strictly in order and the first failure aborts the pass. Nothing
/// is retried here; the caller owns backoff and scheduling.
pub async fn reconcile(
    key: &ObjectKey,
    ctx: &Context,
) -> Result<ReconcileOutcome, ReconcileError> {
    let span = tracing::info_span!(
        "reconcile",
        app.namespace = %key.namespace,
        app.name = %key.name
    );
    let result = run_pass(key, ctx).instrument(span.clone()).await;
    if let Err(e) = &result {
        span.in_scope(|| match e {
            ReconcileError::Store { source, .. } => tracing::error!(
                stage = %e.stage(),
                category = %source.category(),
                error = %e,
                "Reconcile failed"
            ),
            ReconcileError::Ownership { .. } => {
                tracing::error!(stage = %e.stage(), error = %e, "Reconcile failed")
            }
        });
    }
    result
}

async fn run_pass(key: &ObjectKey, ctx: &Context) -> Result<ReconcileOutcome, ReconcileError> {
    let Some(app) = ctx
        .apps
        .get(key)
        .await
        .map_err(|e| ReconcileError::store(Stage::FetchApp, e))?
    else {
        tracing::info!("App not found, ignoring since it must have been deleted");
        return Ok(ReconcileOutcome::Deleted);
    };

    let DesiredState {
        mut deployment,
        mut service,
    } = DesiredState::for_app(key, &app.spec);

    set_controller_reference(&app, &mut deployment.metadata)
        .map_err(|e| ReconcileError::ownership(Stage::ConvergeDeployment, e))?;
    let deployment = converge(ctx.deployments.as_ref(), &deployment)
        .await
        .map_err(|e| ReconcileError::store(Stage::ConvergeDeployment, e))?;

    set_controller_reference(&app, &mut service.metadata)
        .map_err(|e| ReconcileError::ownership(Stage::ConvergeService, e))?;
    let service = converge(ctx.services.as_ref(), &service)
        .await
        .map_err(|e| ReconcileError::store(Stage::ConvergeService, e))?;

    let status = sync_status(key, &app, ctx.apps.as_ref(), ctx.pods.as_ref())
        .await
        .map_err(|e| ReconcileError::store(Stage::SyncStatus, e))?;

    tracing::debug!(%deployment, %service, ready = status.ready(), "Reconcile pass complete");
    Ok(ReconcileOutcome::Synced(ReconcileReport {
        deployment,
        service,
        status,
        requeue_after: ctx.requeue_after,
    }))
}
