//! Controller owner references.
//!
//! The ownership link is what the cluster's garbage collector follows to
//! delete children once their App is gone. This module only records it.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::Resource;

use crate::error::OwnershipError;

/// Marks `owner` as the controlling owner of the object described by `child`.
///
/// Re-attaching the same owner replaces its reference in place. A controller
/// reference to a different owner is an error; so is a namespaced owner in a
/// different namespace than the child.
pub fn set_controller_reference<O>(owner: &O, child: &mut ObjectMeta) -> Result<(), OwnershipError>
where
    O: Resource<DynamicType = ()>,
{
    let kind = O::kind(&()).into_owned();
    let meta = owner.meta();
    let name = meta
        .name
        .clone()
        .ok_or_else(|| OwnershipError::MissingOwnerName { kind: kind.clone() })?;
    let uid = meta
        .uid
        .clone()
        .ok_or_else(|| OwnershipError::missing_owner_uid(kind.clone(), name.clone()))?;

    if let Some(owner_namespace) = meta.namespace.as_deref() {
        let child_namespace = child.namespace.as_deref().unwrap_or_default();
        if child_namespace != owner_namespace {
            return Err(OwnershipError::CrossNamespace {
                owner: format!("{kind}/{name}"),
                owner_namespace: owner_namespace.to_string(),
                child_namespace: child_namespace.to_string(),
            });
        }
    }

    let reference = OwnerReference {
        api_version: O::api_version(&()).into_owned(),
        kind,
        name,
        uid,
        controller: Some(true),
        block_owner_deletion: Some(true),
    };

    let references = child.owner_references.get_or_insert_with(Vec::new);
    if let Some(existing) = references
        .iter()
        .find(|r| r.controller == Some(true) && r.uid != reference.uid)
    {
        return Err(OwnershipError::already_controlled(
            existing.kind.clone(),
            existing.name.clone(),
        ));
    }

    match references.iter_mut().find(|r| r.uid == reference.uid) {
        Some(existing) => *existing = reference,
        None => references.push(reference),
    }
    Ok(())
}
