//! End-to-end reconcile passes against the in-memory store.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use appctl_core::{App, AppSpec, AppStatus, ObjectKey};
use appctl_reconcile::{
    ConvergeOutcome, Context, ReconcileOutcome, Stage, StatusOutcome, reconcile,
};
use appctl_store::{CancellableStore, Operation, StoreError};
use appctl_store_memory::InMemoryStore;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Pod, PodCondition, PodStatus, Service, ServicePort};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use tokio_util::sync::CancellationToken;

struct Cluster {
    apps: Arc<InMemoryStore<App>>,
    deployments: Arc<InMemoryStore<Deployment>>,
    services: Arc<InMemoryStore<Service>>,
    pods: Arc<InMemoryStore<Pod>>,
}

impl Cluster {
    fn new() -> Self {
        Self {
            apps: Arc::new(InMemoryStore::new()),
            deployments: Arc::new(InMemoryStore::new()),
            services: Arc::new(InMemoryStore::new()),
            pods: Arc::new(InMemoryStore::new()),
        }
    }

    fn context(&self) -> Context {
        Context::new(
            self.apps.clone(),
            self.deployments.clone(),
            self.services.clone(),
            self.pods.clone(),
        )
    }

    fn writes(&self) -> usize {
        self.apps.write_count()
            + self.deployments.write_count()
            + self.services.write_count()
            + self.pods.write_count()
    }

    fn seed_app(&self, name: &str, image: &str, replicas: i32, port: i32) -> ObjectKey {
        let mut app = App::new(
            name,
            AppSpec {
                image: image.to_string(),
                replicas,
                port,
            },
        );
        app.metadata.namespace = Some("default".to_string());
        self.apps.seed(&app).unwrap();
        ObjectKey::new("default", name)
    }

    fn set_recorded_replicas(&self, key: &ObjectKey, replicas: i32) {
        let mut app = self.apps.snapshot(key).unwrap();
        app.status = Some(AppStatus {
            replicas,
            ..Default::default()
        });
        self.apps.apply_external(&app).unwrap();
    }

    fn seed_pod(&self, name: &str, app: &str, ready: bool) {
        let pod = Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("default".to_string()),
                labels: Some(BTreeMap::from([("app".to_string(), app.to_string())])),
                ..Default::default()
            },
            status: Some(PodStatus {
                conditions: Some(vec![PodCondition {
                    type_: "Ready".to_string(),
                    status: if ready { "True" } else { "False" }.to_string(),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        };
        self.pods.seed(&pod).unwrap();
    }

    fn deployment(&self, app: &str) -> Deployment {
        self.deployments
            .snapshot(&ObjectKey::new("default", format!("{app}-deployment")))
            .unwrap()
    }

    fn service(&self, app: &str) -> Service {
        self.services
            .snapshot(&ObjectKey::new("default", format!("{app}-service")))
            .unwrap()
    }
}

fn synced(outcome: ReconcileOutcome) -> appctl_reconcile::ReconcileReport {
    match outcome {
        ReconcileOutcome::Synced(report) => report,
        ReconcileOutcome::Deleted => panic!("expected a synced pass"),
    }
}

#[tokio::test]
async fn test_first_pass_creates_converged_children() {
    let cluster = Cluster::new();
    let key = cluster.seed_app("web", "nginx:1.0", 3, 8080);

    let report = synced(reconcile(&key, &cluster.context()).await.unwrap());
    assert_eq!(report.deployment, ConvergeOutcome::Created);
    assert_eq!(report.service, ConvergeOutcome::Created);
    assert_eq!(report.status, StatusOutcome::Unchanged { ready: 0 });
    assert_eq!(report.requeue_after, Duration::from_secs(30));

    let deployment = cluster.deployment("web");
    let spec = deployment.spec.as_ref().unwrap();
    assert_eq!(spec.replicas, Some(3));
    let container = &spec.template.spec.as_ref().unwrap().containers[0];
    assert_eq!(container.image.as_deref(), Some("nginx:1.0"));
    assert_eq!(container.ports.as_ref().unwrap()[0].container_port, 8080);

    let service = cluster.service("web");
    let port = &service.spec.as_ref().unwrap().ports.as_ref().unwrap()[0];
    assert_eq!(port.port, 8080);
    assert_eq!(port.target_port, Some(IntOrString::Int(8080)));
    assert_eq!(port.protocol.as_deref(), Some("TCP"));
}

#[tokio::test]
async fn test_children_carry_ownership_link_and_labels() {
    let cluster = Cluster::new();
    let key = cluster.seed_app("web", "nginx:1.0", 1, 80);
    reconcile(&key, &cluster.context()).await.unwrap();

    let app_uid = cluster.apps.snapshot(&key).unwrap().metadata.uid.unwrap();
    let deployment = cluster.deployment("web");
    let service = cluster.service("web");
    for meta in [&deployment.metadata, &service.metadata] {
        let refs = meta.owner_references.as_ref().unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].uid, app_uid);
        assert_eq!(refs[0].kind, "App");
        assert_eq!(refs[0].controller, Some(true));

        let labels = meta.labels.as_ref().unwrap();
        assert_eq!(labels["app"], "web");
        assert_eq!(labels["controller"], "app-controller");
    }
}

#[tokio::test]
async fn test_second_pass_writes_nothing() {
    let cluster = Cluster::new();
    let key = cluster.seed_app("web", "nginx:1.0", 3, 8080);
    cluster.seed_pod("web-1", "web", true);
    let ctx = cluster.context();

    let first = synced(reconcile(&key, &ctx).await.unwrap());
    let after_first = cluster.writes();
    assert_eq!(after_first, 3);
    assert_eq!(first.writes(), 3);

    let second = synced(reconcile(&key, &ctx).await.unwrap());
    assert_eq!(cluster.writes(), after_first);
    assert_eq!(second.writes(), 0);
    assert_eq!(second.deployment, ConvergeOutcome::Unchanged);
    assert_eq!(second.service, ConvergeOutcome::Unchanged);
}

#[tokio::test]
async fn test_drift_is_corrected_without_reverting_foreign_fields() {
    let cluster = Cluster::new();
    let key = cluster.seed_app("web", "nginx:1.0", 3, 8080);
    let ctx = cluster.context();
    reconcile(&key, &ctx).await.unwrap();

    let mut drifted = cluster.deployment("web");
    drifted.spec.as_mut().unwrap().replicas = Some(5);
    drifted
        .metadata
        .labels
        .get_or_insert_with(BTreeMap::new)
        .insert("team".to_string(), "payments".to_string());
    cluster.deployments.apply_external(&drifted).unwrap();

    let report = synced(reconcile(&key, &ctx).await.unwrap());
    assert_eq!(report.deployment, ConvergeOutcome::Updated);
    assert_eq!(report.service, ConvergeOutcome::Unchanged);

    let restored = cluster.deployment("web");
    assert_eq!(restored.spec.as_ref().unwrap().replicas, Some(3));
    assert_eq!(restored.metadata.labels.unwrap()["team"], "payments");
}

#[tokio::test]
async fn test_spec_change_rolls_out_to_children() {
    let cluster = Cluster::new();
    let key = cluster.seed_app("web", "nginx:1.0", 1, 80);
    let ctx = cluster.context();
    reconcile(&key, &ctx).await.unwrap();

    let mut app = cluster.apps.snapshot(&key).unwrap();
    app.spec.image = "nginx:1.1".to_string();
    app.spec.port = 8443;
    cluster.apps.apply_external(&app).unwrap();

    let report = synced(reconcile(&key, &ctx).await.unwrap());
    assert_eq!(report.deployment, ConvergeOutcome::Updated);
    assert_eq!(report.service, ConvergeOutcome::Updated);

    let deployment = cluster.deployment("web");
    let container = &deployment.spec.unwrap().template.spec.unwrap().containers[0];
    assert_eq!(container.image.as_deref(), Some("nginx:1.1"));
    assert_eq!(container.ports.as_ref().unwrap()[0].container_port, 8443);
    let service = cluster.service("web");
    assert_eq!(service.spec.unwrap().ports.unwrap()[0].port, 8443);
}

#[tokio::test]
async fn test_foreign_service_port_is_removed() {
    let cluster = Cluster::new();
    let key = cluster.seed_app("web", "nginx:1.0", 2, 8080);
    let ctx = cluster.context();
    reconcile(&key, &ctx).await.unwrap();

    let mut service = cluster.service("web");
    service
        .spec
        .as_mut()
        .unwrap()
        .ports
        .get_or_insert_with(Vec::new)
        .push(ServicePort {
            name: Some("metrics".to_string()),
            port: 9090,
            target_port: Some(IntOrString::Int(9090)),
            protocol: Some("TCP".to_string()),
            ..Default::default()
        });
    cluster.services.apply_external(&service).unwrap();

    let report = synced(reconcile(&key, &ctx).await.unwrap());
    assert_eq!(report.service, ConvergeOutcome::Updated);
    assert_eq!(report.deployment, ConvergeOutcome::Unchanged);

    let ports = cluster.service("web").spec.unwrap().ports.unwrap();
    assert_eq!(ports.len(), 1);
    assert_eq!(ports[0].port, 8080);
    assert_eq!(ports[0].target_port, Some(IntOrString::Int(8080)));
    assert_eq!(ports[0].protocol.as_deref(), Some("TCP"));

    let again = synced(reconcile(&key, &ctx).await.unwrap());
    assert_eq!(again.writes(), 0);
}

#[tokio::test]
async fn test_status_write_suppressed_when_count_matches() {
    let cluster = Cluster::new();
    let key = cluster.seed_app("web", "nginx:1.0", 3, 8080);
    cluster.seed_pod("web-1", "web", true);
    cluster.seed_pod("web-2", "web", true);
    cluster.seed_pod("web-3", "web", false);
    cluster.seed_pod("api-1", "api", true);
    cluster.set_recorded_replicas(&key, 2);

    let report = synced(reconcile(&key, &cluster.context()).await.unwrap());
    assert_eq!(report.status, StatusOutcome::Unchanged { ready: 2 });
    assert_eq!(cluster.apps.write_count(), 0);
}

#[tokio::test]
async fn test_status_written_once_when_count_changes() {
    let cluster = Cluster::new();
    let key = cluster.seed_app("web", "nginx:1.0", 3, 8080);
    cluster.seed_pod("web-1", "web", true);
    cluster.seed_pod("web-2", "web", true);
    cluster.seed_pod("web-3", "web", false);
    cluster.set_recorded_replicas(&key, 1);

    let report = synced(reconcile(&key, &cluster.context()).await.unwrap());
    assert_eq!(
        report.status,
        StatusOutcome::Updated {
            previous: 1,
            ready: 2
        }
    );
    assert_eq!(cluster.apps.write_count(), 1);
    assert_eq!(cluster.apps.snapshot(&key).unwrap().recorded_replicas(), 2);
}

#[tokio::test]
async fn test_status_write_keeps_conditions() {
    let cluster = Cluster::new();
    let key = cluster.seed_app("web", "nginx:1.0", 1, 80);
    cluster.seed_pod("web-1", "web", true);

    let mut app = cluster.apps.snapshot(&key).unwrap();
    app.status = Some(AppStatus {
        replicas: 0,
        conditions: vec![
            serde_json::from_value(serde_json::json!({
                "type": "Available",
                "status": "True",
                "reason": "MinimumReplicasAvailable",
                "message": "",
                "lastTransitionTime": "2025-01-01T00:00:00Z"
            }))
            .unwrap(),
        ],
    });
    cluster.apps.apply_external(&app).unwrap();

    reconcile(&key, &cluster.context()).await.unwrap();
    let status = cluster.apps.snapshot(&key).unwrap().status.unwrap();
    assert_eq!(status.replicas, 1);
    assert_eq!(status.conditions.len(), 1);
    assert_eq!(status.conditions[0].type_, "Available");
}

#[tokio::test]
async fn test_deleted_app_is_terminal() {
    let cluster = Cluster::new();
    let key = ObjectKey::new("default", "gone");

    let outcome = reconcile(&key, &cluster.context()).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Deleted);
    assert_eq!(outcome.requeue_after(), None);
    assert_eq!(cluster.writes(), 0);
    assert!(cluster.deployments.is_empty());
    assert!(cluster.services.is_empty());
}

#[tokio::test]
async fn test_service_failure_keeps_deployment_and_skips_status() {
    let cluster = Cluster::new();
    let key = cluster.seed_app("web", "nginx:1.0", 2, 8080);
    cluster.seed_pod("web-1", "web", true);
    cluster
        .services
        .fail_next(Operation::Create, StoreError::api(500, "etcd timeout"));

    let err = reconcile(&key, &cluster.context()).await.unwrap_err();
    assert_eq!(err.stage(), Stage::ConvergeService);
    assert!(err.is_retryable());

    assert_eq!(
        cluster.deployment("web").spec.unwrap().replicas,
        Some(2)
    );
    assert!(cluster.services.is_empty());
    assert_eq!(cluster.apps.write_count(), 0);
    assert_eq!(cluster.apps.snapshot(&key).unwrap().recorded_replicas(), 0);
}

#[tokio::test]
async fn test_child_fetch_error_aborts_before_create() {
    let cluster = Cluster::new();
    let key = cluster.seed_app("web", "nginx:1.0", 1, 80);
    cluster
        .deployments
        .fail_next(Operation::Get, StoreError::connection("connection reset"));

    let err = reconcile(&key, &cluster.context()).await.unwrap_err();
    assert_eq!(err.stage(), Stage::ConvergeDeployment);
    assert_eq!(cluster.writes(), 0);
}

#[tokio::test]
async fn test_app_fetch_error_is_not_deletion() {
    let cluster = Cluster::new();
    let key = cluster.seed_app("web", "nginx:1.0", 1, 80);
    cluster
        .apps
        .fail_next(Operation::Get, StoreError::api(503, "unavailable"));

    let err = reconcile(&key, &cluster.context()).await.unwrap_err();
    assert_eq!(err.stage(), Stage::FetchApp);
    assert!(cluster.deployments.is_empty());
}

#[tokio::test]
async fn test_unpersisted_app_fails_ownership_link() {
    let cluster = Cluster::new();
    let key = cluster.seed_app("web", "nginx:1.0", 1, 80);
    let mut app = cluster.apps.snapshot(&key).unwrap();
    app.metadata.uid = None;
    cluster.apps.apply_external(&app).unwrap();

    let err = reconcile(&key, &cluster.context()).await.unwrap_err();
    assert!(matches!(
        err,
        appctl_reconcile::ReconcileError::Ownership {
            stage: Stage::ConvergeDeployment,
            ..
        }
    ));
    assert_eq!(cluster.writes(), 0);
}

#[tokio::test]
async fn test_status_conflict_surfaces_as_retryable() {
    let cluster = Cluster::new();
    let key = cluster.seed_app("web", "nginx:1.0", 1, 80);
    cluster.seed_pod("web-1", "web", true);
    cluster.apps.fail_next(
        Operation::UpdateStatus,
        StoreError::conflict("App", &key, "the object has been modified"),
    );

    let err = reconcile(&key, &cluster.context()).await.unwrap_err();
    assert_eq!(err.stage(), Stage::SyncStatus);
    assert!(err.is_retryable());
    assert_eq!(cluster.deployments.len(), 1);
    assert_eq!(cluster.services.len(), 1);
}

#[tokio::test]
async fn test_cancelled_stores_abort_the_pass() {
    let cluster = Cluster::new();
    let key = cluster.seed_app("web", "nginx:1.0", 1, 80);
    let token = CancellationToken::new();
    let ctx = Context::new(
        Arc::new(CancellableStore::new(cluster.apps.clone(), token.clone())),
        Arc::new(CancellableStore::new(cluster.deployments.clone(), token.clone())),
        Arc::new(CancellableStore::new(cluster.services.clone(), token.clone())),
        Arc::new(CancellableStore::new(cluster.pods.clone(), token.clone())),
    );
    token.cancel();

    let err = reconcile(&key, &ctx).await.unwrap_err();
    assert_eq!(err.stage(), Stage::FetchApp);
    assert!(!err.is_retryable());
    assert_eq!(cluster.writes(), 0);
}

#[tokio::test]
async fn test_requeue_interval_is_configurable() {
    let cluster = Cluster::new();
    let key = cluster.seed_app("web", "nginx:1.0", 1, 80);
    let ctx = cluster.context().with_requeue_after(Duration::from_secs(5));

    let outcome = reconcile(&key, &ctx).await.unwrap();
    assert_eq!(outcome.requeue_after(), Some(Duration::from_secs(5)));
}
