//! Reconcile error types.

use std::fmt;

use appctl_core::OwnershipError;
use appctl_store::StoreError;

/// Step of a reconcile pass at which it aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    FetchApp,
    ConvergeDeployment,
    ConvergeService,
    SyncStatus,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FetchApp => write!(f, "fetch_app"),
            Self::ConvergeDeployment => write!(f, "converge_deployment"),
            Self::ConvergeService => write!(f, "converge_service"),
            Self::SyncStatus => write!(f, "sync_status"),
        }
    }
}

/// Why a reconcile pass aborted.
///
/// Writes made by earlier stages of the same pass are kept.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// A store call failed.
    #[error("{stage}: {source}")]
    Store {
        stage: Stage,
        #[source]
        source: StoreError,
    },

    /// The ownership link could not be attached to a child.
    #[error("{stage}: cannot link child to its App: {source}")]
    Ownership {
        stage: Stage,
        #[source]
        source: OwnershipError,
    },
}

impl ReconcileError {
    pub fn store(stage: Stage, source: StoreError) -> Self {
        Self::Store { stage, source }
    }

    pub fn ownership(stage: Stage, source: OwnershipError) -> Self {
        Self::Ownership { stage, source }
    }

    /// The stage the pass aborted at.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Store { stage, .. } | Self::Ownership { stage, .. } => *stage,
        }
    }

    /// Whether a later pass may succeed without outside intervention.
    ///
    /// Cancelled calls are not retried; the process is shutting down.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store { source, .. } => !source.is_cancelled(),
            Self::Ownership { .. } => true,
        }
    }
}
