//! Entitlement (product access) records.

use serde::{Deserialize, Serialize};

/// Result of an access check for a set of products and one user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementRecord {
    /// Seconds the record may be cached for.
    #[serde(default)]
    pub ttl: u64,
    /// Products the check was made against.
    #[serde(default)]
    pub product_ids: Vec<String>,
    /// Whether the user has access to any of the products.
    #[serde(default)]
    pub entitled: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
