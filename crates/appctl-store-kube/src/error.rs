//! Mapping from `kube::Error` to `StoreError`.

use appctl_core::ObjectKey;
use appctl_store::StoreError;

/// Converts a kube client error into the store taxonomy.
///
/// `kind` and `key` describe the object the call targeted and are used for
/// the not-found and conflict variants.
pub fn map_kube_error(kind: &str, key: &ObjectKey, error: kube::Error) -> StoreError {
    match error {
        kube::Error::Api(response) => match response.code {
            404 => StoreError::not_found(kind, key),
            409 if response.reason == "AlreadyExists" => StoreError::already_exists(kind, key),
            409 => StoreError::conflict(kind, key, response.message),
            code => StoreError::api(code, response.message),
        },
        kube::Error::SerdeError(e) => StoreError::Serialization(e),
        other => StoreError::connection(other.to_string()),
    }
}
