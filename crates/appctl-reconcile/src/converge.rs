//! Convergence engine: create a child when absent, patch it when drifted.
//!
//! Drift is judged by a deliberately shallow comparison per kind, so fields
//! set by other actors (admission defaults, extra labels, cluster IPs) are
//! neither compared nor reverted.

use std::fmt;

use appctl_core::ObjectKey;
use appctl_store::{ResourceStore, StoreError, StoreObject};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Container, Service, ServicePort};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

/// A child kind with a partial-equality policy.
pub trait Convergent: StoreObject {
    /// True when the compared subset of `self` matches `desired`.
    fn converged_with(&self, desired: &Self) -> bool;

    /// Overwrites the compared subset of `self` with `desired`'s values,
    /// leaving everything else as stored.
    fn adopt(&mut self, desired: &Self);
}

/// What converging one child did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergeOutcome {
    Created,
    Updated,
    Unchanged,
}

impl ConvergeOutcome {
    /// True if the child was written.
    pub fn wrote(self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

impl fmt::Display for ConvergeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Updated => write!(f, "updated"),
            Self::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// Brings the stored child named by `desired` in line with it.
///
/// `desired` must already carry its ownership link. Updates are written
/// against the stored `resourceVersion`, so a concurrent writer surfaces as
/// `StoreError::Conflict`.
pub async fn converge<K: Convergent>(
    store: &dyn ResourceStore<K>,
    desired: &K,
) -> Result<ConvergeOutcome, StoreError> {
    let key = ObjectKey::of(desired).ok_or_else(|| {
        StoreError::invalid(format!("desired {} has no name or namespace", K::kind_name()))
    })?;
    let kind = K::kind_name();

    match store.get(&key).await? {
        None => {
            tracing::info!(kind = %kind, name = %key.name, "Creating child resource");
            store.create(desired).await?;
            Ok(ConvergeOutcome::Created)
        }
        Some(existing) if existing.converged_with(desired) => {
            tracing::debug!(kind = %kind, name = %key.name, "Child resource is up to date");
            Ok(ConvergeOutcome::Unchanged)
        }
        Some(mut existing) => {
            tracing::info!(kind = %kind, name = %key.name, "Updating drifted child resource");
            existing.adopt(desired);
            store.update(&existing).await?;
            Ok(ConvergeOutcome::Updated)
        }
    }
}

fn containers(deployment: &Deployment) -> &[Container] {
    deployment
        .spec
        .as_ref()
        .and_then(|s| s.template.spec.as_ref())
        .map(|p| p.containers.as_slice())
        .unwrap_or_default()
}

fn replicas(deployment: &Deployment) -> Option<i32> {
    deployment.spec.as_ref().and_then(|s| s.replicas)
}

fn container_port_count(container: &Container) -> usize {
    container.ports.as_ref().map_or(0, Vec::len)
}

impl Convergent for Deployment {
    /// Replica count, container count, and the first container's image and
    /// first port.
    fn converged_with(&self, desired: &Self) -> bool {
        if replicas(self) != replicas(desired) {
            return false;
        }
        let (have, want) = (containers(self), containers(desired));
        if have.len() != want.len() {
            return false;
        }
        let (Some(have), Some(want)) = (have.first(), want.first()) else {
            return true;
        };
        if have.image != want.image || container_port_count(have) != container_port_count(want) {
            return false;
        }
        let first_port = |c: &Container| {
            c.ports
                .as_ref()
                .and_then(|p| p.first())
                .map(|p| p.container_port)
        };
        first_port(have) == first_port(want)
    }

    fn adopt(&mut self, desired: &Self) {
        let Some(want) = desired.spec.as_ref() else {
            return;
        };
        if self.spec.is_none() {
            self.spec = Some(want.clone());
            return;
        }
        let Some(spec) = self.spec.as_mut() else {
            return;
        };
        spec.replicas = want.replicas;

        let want_containers = want
            .template
            .spec
            .as_ref()
            .map(|p| p.containers.clone())
            .unwrap_or_default();
        let pod = spec.template.spec.get_or_insert_with(Default::default);
        if pod.containers.len() != want_containers.len() {
            pod.containers = want_containers;
            return;
        }
        let (Some(have), Some(want)) = (pod.containers.first_mut(), want_containers.first()) else {
            return;
        };
        have.image = want.image.clone();
        let want_ports = want.ports.clone().unwrap_or_default();
        let have_ports = have.ports.get_or_insert_with(Vec::new);
        if have_ports.len() != want_ports.len() {
            *have_ports = want_ports;
        } else if let (Some(have_port), Some(want_port)) =
            (have_ports.first_mut(), want_ports.first())
        {
            have_port.container_port = want_port.container_port;
        }
    }
}

fn service_ports(service: &Service) -> &[ServicePort] {
    service
        .spec
        .as_ref()
        .and_then(|s| s.ports.as_deref())
        .unwrap_or_default()
}

fn service_type(service: &Service) -> Option<&str> {
    service.spec.as_ref().and_then(|s| s.type_.as_deref())
}

/// Numeric value of a target port. Named ports that are not numeric count as 0.
fn target_port_value(port: &ServicePort) -> i32 {
    match &port.target_port {
        Some(IntOrString::Int(value)) => *value,
        Some(IntOrString::String(value)) => value.parse().unwrap_or(0),
        None => 0,
    }
}

impl Convergent for Service {
    /// Service type, port count, and the first port's number, target port
    /// value and protocol.
    fn converged_with(&self, desired: &Self) -> bool {
        if service_type(self) != service_type(desired) {
            return false;
        }
        let (have, want) = (service_ports(self), service_ports(desired));
        if have.len() != want.len() {
            return false;
        }
        match (have.first(), want.first()) {
            (Some(have), Some(want)) => {
                have.port == want.port
                    && target_port_value(have) == target_port_value(want)
                    && have.protocol == want.protocol
            }
            _ => true,
        }
    }

    fn adopt(&mut self, desired: &Self) {
        let Some(want) = desired.spec.as_ref() else {
            return;
        };
        if self.spec.is_none() {
            self.spec = Some(want.clone());
            return;
        }
        let Some(spec) = self.spec.as_mut() else {
            return;
        };
        spec.type_ = want.type_.clone();

        let want_ports = want.ports.clone().unwrap_or_default();
        let have_ports = spec.ports.get_or_insert_with(Vec::new);
        if have_ports.len() != want_ports.len() {
            *have_ports = want_ports;
        } else if let (Some(have), Some(want)) = (have_ports.first_mut(), want_ports.first()) {
            have.port = want.port;
            have.target_port = want.target_port.clone();
            have.protocol = want.protocol.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desired::{desired_deployment, desired_service};
    use appctl_core::AppSpec;
    use std::collections::BTreeMap;

    fn spec(image: &str, replicas: i32, port: i32) -> AppSpec {
        AppSpec {
            image: image.to_string(),
            replicas,
            port,
        }
    }

    fn key() -> ObjectKey {
        ObjectKey::new("default", "web")
    }

    #[test]
    fn test_deployment_equal_to_itself() {
        let d = desired_deployment(&key(), &spec("nginx:1.0", 3, 8080));
        assert!(d.converged_with(&d));
    }

    #[test]
    fn test_deployment_detects_compared_fields() {
        let want = desired_deployment(&key(), &spec("nginx:1.0", 3, 8080));
        for other in [
            spec("nginx:1.1", 3, 8080),
            spec("nginx:1.0", 5, 8080),
            spec("nginx:1.0", 3, 9090),
        ] {
            let have = desired_deployment(&key(), &other);
            assert!(!have.converged_with(&want), "{other:?} should differ");
        }
    }

    #[test]
    fn test_deployment_ignores_fields_outside_policy() {
        let want = desired_deployment(&key(), &spec("nginx:1.0", 3, 8080));
        let mut have = want.clone();
        have.metadata
            .labels
            .get_or_insert_with(BTreeMap::new)
            .insert("team".to_string(), "payments".to_string());
        let container = &mut have.spec.as_mut().unwrap().template.spec.as_mut().unwrap().containers[0];
        container.image_pull_policy = Some("Always".to_string());
        container.args = Some(vec!["--verbose".to_string()]);
        assert!(have.converged_with(&want));
    }

    #[test]
    fn test_deployment_adopt_keeps_foreign_fields() {
        let want = desired_deployment(&key(), &spec("nginx:1.0", 3, 8080));
        let mut have = desired_deployment(&key(), &spec("nginx:0.9", 5, 80));
        have.spec.as_mut().unwrap().template.spec.as_mut().unwrap().containers[0].image_pull_policy =
            Some("Always".to_string());

        have.adopt(&want);
        assert!(have.converged_with(&want));
        let container = &have.spec.unwrap().template.spec.unwrap().containers[0];
        assert_eq!(container.image_pull_policy.as_deref(), Some("Always"));
    }

    #[test]
    fn test_deployment_adopt_replaces_mismatched_container_list() {
        let want = desired_deployment(&key(), &spec("nginx:1.0", 3, 8080));
        let mut have = want.clone();
        let pod = have.spec.as_mut().unwrap().template.spec.as_mut().unwrap();
        pod.containers.push(Container {
            name: "sidecar".to_string(),
            ..Default::default()
        });
        assert!(!have.converged_with(&want));

        have.adopt(&want);
        assert!(have.converged_with(&want));
    }

    #[test]
    fn test_service_target_port_compared_by_value() {
        let want = desired_service(&key(), &spec("nginx:1.0", 1, 8080));
        let mut have = want.clone();
        have.spec.as_mut().unwrap().ports.as_mut().unwrap()[0].target_port =
            Some(IntOrString::String("8080".to_string()));
        assert!(have.converged_with(&want));

        have.spec.as_mut().unwrap().ports.as_mut().unwrap()[0].target_port =
            Some(IntOrString::String("http".to_string()));
        assert!(!have.converged_with(&want));
    }

    #[test]
    fn test_service_ignores_cluster_ip_and_selector() {
        let want = desired_service(&key(), &spec("nginx:1.0", 1, 8080));
        let mut have = want.clone();
        let spec = have.spec.as_mut().unwrap();
        spec.cluster_ip = Some("10.0.0.12".to_string());
        spec.selector = None;
        assert!(have.converged_with(&want));
    }

    #[test]
    fn test_service_adopt_restores_type_and_port() {
        let want = desired_service(&key(), &spec("nginx:1.0", 1, 8080));
        let mut have = desired_service(&key(), &spec("nginx:1.0", 1, 80));
        let spec = have.spec.as_mut().unwrap();
        spec.type_ = Some("NodePort".to_string());
        spec.cluster_ip = Some("10.0.0.12".to_string());
        assert!(!have.converged_with(&want));

        have.adopt(&want);
        assert!(have.converged_with(&want));
        assert_eq!(have.spec.unwrap().cluster_ip.as_deref(), Some("10.0.0.12"));
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(ConvergeOutcome::Created.to_string(), "created");
        assert!(ConvergeOutcome::Updated.wrote());
        assert!(!ConvergeOutcome::Unchanged.wrote());
    }
}
