//! Store types shared by all backends.

use std::collections::BTreeMap;
use std::fmt;

use kube::Resource;
use serde::{Serialize, de::DeserializeOwned};

/// Bound for objects a store can hold: a namespaced API object with static
/// type information that round-trips through JSON.
pub trait StoreObject:
    Resource<DynamicType = ()> + Clone + Serialize + DeserializeOwned + fmt::Debug + Send + Sync + 'static
{
    /// Kind name used in errors and logs.
    fn kind_name() -> String {
        Self::kind(&()).into_owned()
    }
}

impl<T> StoreObject for T where
    T: Resource<DynamicType = ()>
        + Clone
        + Serialize
        + DeserializeOwned
        + fmt::Debug
        + Send
        + Sync
        + 'static
{
}

/// Parameters for a list query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    /// Equality label selector; every pair must match.
    pub labels: BTreeMap<String, String>,
}

impl ListParams {
    /// Creates empty `ListParams` (matches everything).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a required `key=value` label.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Returns true if `labels` satisfies the selector.
    #[must_use]
    pub fn matches(&self, labels: Option<&BTreeMap<String, String>>) -> bool {
        self.labels.iter().all(|(key, value)| {
            labels
                .and_then(|l| l.get(key))
                .is_some_and(|actual| actual == value)
        })
    }

    /// Renders the selector in API server syntax (`a=b,c=d`).
    #[must_use]
    pub fn selector(&self) -> String {
        self.labels
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// A store operation, used for logging and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    List,
    Create,
    Update,
    UpdateStatus,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "get"),
            Self::List => write!(f, "list"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::UpdateStatus => write!(f, "update_status"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::apps::v1::Deployment;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_selector_matching() {
        let params = ListParams::new().with_label("app", "web");
        assert!(params.matches(Some(&labels(&[("app", "web")]))));
        assert!(params.matches(Some(&labels(&[("app", "web"), ("tier", "front")]))));
        assert!(!params.matches(Some(&labels(&[("app", "api")]))));
        assert!(!params.matches(None));
    }

    #[test]
    fn test_empty_selector_matches_everything() {
        let params = ListParams::new();
        assert!(params.matches(None));
        assert!(params.matches(Some(&labels(&[("x", "y")]))));
        assert_eq!(params.selector(), "");
    }

    #[test]
    fn test_selector_string_is_sorted() {
        let params = ListParams::new()
            .with_label("controller", "app-controller")
            .with_label("app", "web");
        assert_eq!(params.selector(), "app=web,controller=app-controller");
    }

    #[test]
    fn test_kind_name() {
        assert_eq!(Deployment::kind_name(), "Deployment");
    }

    #[test]
    fn test_operation_display() {
        assert_eq!(Operation::UpdateStatus.to_string(), "update_status");
        assert_eq!(Operation::Get.to_string(), "get");
    }
}
