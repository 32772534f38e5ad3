//! Naming and labeling contract for managed child resources.
//!
//! Other tooling selects on these names and labels, so they are stable:
//! `<app>-deployment` and `<app>-service`, both labeled
//! `app=<app>, controller=app-controller`.

use std::collections::BTreeMap;

/// Label key carrying the owning App's name.
pub const APP_LABEL: &str = "app";
/// Label key identifying the managing controller.
pub const CONTROLLER_LABEL: &str = "controller";
/// Value of [`CONTROLLER_LABEL`] on every managed child.
pub const CONTROLLER_NAME: &str = "app-controller";
/// Name of the single container in the managed deployment.
pub const CONTAINER_NAME: &str = "app-container";

pub fn deployment_name(app: &str) -> String {
    format!("{app}-deployment")
}

pub fn service_name(app: &str) -> String {
    format!("{app}-service")
}

/// Labels used to select the App's pods (`app=<app>`).
pub fn selector_labels(app: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(APP_LABEL.to_string(), app.to_string())])
}

/// Labels stamped on managed children.
pub fn child_labels(app: &str) -> BTreeMap<String, String> {
    let mut labels = selector_labels(app);
    labels.insert(CONTROLLER_LABEL.to_string(), CONTROLLER_NAME.to_string());
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_names() {
        for name in ["web", "a", "my-app-2"] {
            assert_eq!(deployment_name(name), format!("{name}-deployment"));
            assert_eq!(service_name(name), format!("{name}-service"));
        }
    }

    #[test]
    fn test_labels() {
        let selector = selector_labels("web");
        assert_eq!(selector.len(), 1);
        assert_eq!(selector.get("app").map(String::as_str), Some("web"));

        let labels = child_labels("web");
        assert_eq!(labels.get("app").map(String::as_str), Some("web"));
        assert_eq!(
            labels.get("controller").map(String::as_str),
            Some("app-controller")
        );
    }
}
