//! Desired-state builder.
//!
//! Pure functions from an App's identity and spec to the child objects it
//! should own. Ownership links are attached by the caller, since they need
//! the persisted App's uid.

use appctl_core::naming::{
    CONTAINER_NAME, child_labels, deployment_name, selector_labels, service_name,
};
use appctl_core::{AppSpec, ObjectKey};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, PodSpec, PodTemplateSpec, Service, ServicePort, ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

pub(crate) const SERVICE_TYPE: &str = "ClusterIP";
pub(crate) const PROTOCOL_TCP: &str = "TCP";

/// The pair of children an App should own.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredState {
    pub deployment: Deployment,
    pub service: Service,
}

impl DesiredState {
    pub fn for_app(app: &ObjectKey, spec: &AppSpec) -> Self {
        Self {
            deployment: desired_deployment(app, spec),
            service: desired_service(app, spec),
        }
    }
}

fn child_meta(name: String, app: &ObjectKey) -> ObjectMeta {
    ObjectMeta {
        name: Some(name),
        namespace: Some(app.namespace.clone()),
        labels: Some(child_labels(&app.name)),
        ..Default::default()
    }
}

/// Deployment running `spec.replicas` copies of one container.
pub fn desired_deployment(app: &ObjectKey, spec: &AppSpec) -> Deployment {
    Deployment {
        metadata: child_meta(deployment_name(&app.name), app),
        spec: Some(DeploymentSpec {
            replicas: Some(spec.replicas),
            selector: LabelSelector {
                match_labels: Some(selector_labels(&app.name)),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(selector_labels(&app.name)),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: CONTAINER_NAME.to_string(),
                        image: Some(spec.image.clone()),
                        ports: Some(vec![ContainerPort {
                            container_port: spec.port,
                            ..Default::default()
                        }]),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Cluster-internal Service forwarding `spec.port` to the same container port.
pub fn desired_service(app: &ObjectKey, spec: &AppSpec) -> Service {
    Service {
        metadata: child_meta(service_name(&app.name), app),
        spec: Some(ServiceSpec {
            selector: Some(selector_labels(&app.name)),
            ports: Some(vec![ServicePort {
                protocol: Some(PROTOCOL_TCP.to_string()),
                port: spec.port,
                target_port: Some(IntOrString::Int(spec.port)),
                ..Default::default()
            }]),
            type_: Some(SERVICE_TYPE.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}
