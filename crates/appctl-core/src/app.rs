//! The `App` custom resource.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::key::ObjectKey;

/// Desired shape of the workload an `App` describes.
///
/// Field constraints are enforced by the CRD schema at admission time;
/// the reconciler assumes they hold.
#[derive(CustomResource, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "webapp.example.com",
    version = "v1",
    kind = "App",
    plural = "apps",
    namespaced,
    status = "AppStatus",
    derive = "PartialEq",
    printcolumn = r#"{"name":"Image","type":"string","jsonPath":".spec.image"}"#,
    printcolumn = r#"{"name":"Desired","type":"integer","jsonPath":".spec.replicas"}"#,
    printcolumn = r#"{"name":"Ready","type":"integer","jsonPath":".status.replicas"}"#
)]
pub struct AppSpec {
    /// Container image to deploy.
    #[schemars(length(min = 1))]
    pub image: String,
    /// Number of desired pods.
    #[schemars(range(min = 1))]
    pub replicas: i32,
    /// Port the application listens on.
    #[schemars(range(min = 1, max = 65535))]
    pub port: i32,
}

/// Observed state of an `App`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AppStatus {
    /// Number of pods labeled for this App that currently report ready.
    #[serde(default)]
    pub replicas: i32,
    /// Latest observations of the App's state.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl App {
    /// Identity of this App, if it carries a namespace.
    pub fn key(&self) -> Option<ObjectKey> {
        ObjectKey::of(self)
    }

    /// Ready replica count currently recorded in status. A missing status counts as zero.
    pub fn recorded_replicas(&self) -> i32 {
        self.status.as_ref().map_or(0, |s| s.replicas)
    }
}
