use thiserror::Error;

/// Failure to link a child resource to its owning App.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OwnershipError {
    #[error("owner {kind} has no name")]
    MissingOwnerName { kind: String },

    #[error("owner {kind}/{name} has no uid; it must be persisted before it can own objects")]
    MissingOwnerUid { kind: String, name: String },

    #[error("owner {owner} is in namespace {owner_namespace}, child is in {child_namespace}")]
    CrossNamespace {
        owner: String,
        owner_namespace: String,
        child_namespace: String,
    },

    #[error("object is already controlled by {kind}/{name}")]
    AlreadyControlled { kind: String, name: String },
}

impl OwnershipError {
    pub fn missing_owner_uid(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::MissingOwnerUid {
            kind: kind.into(),
            name: name.into(),
        }
    }

    pub fn already_controlled(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::AlreadyControlled {
            kind: kind.into(),
            name: name.into(),
        }
    }
}
