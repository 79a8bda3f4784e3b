//! Tenants and their enabled-module sets.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Descriptive tenant metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantDescriptor {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TenantDescriptor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            description: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A tenant record: metadata plus the ordered enabled-module map.
///
/// Only entries whose value is `true` count as enabled; absence means
/// disabled.  `enabled_version` changes on every write of the enabled map and
/// is never reused, so it can key caches derived from the set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub descriptor: TenantDescriptor,
    #[serde(default)]
    pub enabled: BTreeMap<String, bool>,
    #[serde(default, rename = "enabledVersion")]
    pub enabled_version: u64,
}

impl Tenant {
    pub fn new(descriptor: TenantDescriptor) -> Self {
        Self {
            descriptor,
            enabled: BTreeMap::new(),
            enabled_version: 0,
        }
    }

    pub fn with_enabled(mut self, enabled: BTreeMap<String, bool>) -> Self {
        self.enabled = normalize_enabled(enabled);
        self
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    /// Enabled module ids in lexical order.
    pub fn enabled_ids(&self) -> impl Iterator<Item = &str> {
        self.enabled
            .iter()
            .filter(|(_, on)| **on)
            .map(|(id, _)| id.as_str())
    }

    pub fn is_enabled(&self, module_id: &str) -> bool {
        self.enabled.get(module_id).copied().unwrap_or(false)
    }
}

/// Drop `false` entries so a stored map holds enabled ids only.
pub fn normalize_enabled(enabled: BTreeMap<String, bool>) -> BTreeMap<String, bool> {
    enabled.into_iter().filter(|(_, on)| *on).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_entries_are_dropped() {
        let map = BTreeMap::from([
            ("b-1.0.0".to_string(), true),
            ("a-1.0.0".to_string(), false),
            ("c-1.0.0".to_string(), true),
        ]);
        let tenant = Tenant::new(TenantDescriptor::new("t1")).with_enabled(map);
        assert_eq!(tenant.enabled_ids().collect::<Vec<_>>(), ["b-1.0.0", "c-1.0.0"]);
        assert!(!tenant.is_enabled("a-1.0.0"));
        assert!(!tenant.enabled.contains_key("a-1.0.0"));
    }

    #[test]
    fn tenant_json_shape() {
        let tenant: Tenant = serde_json::from_str(
            r#"{ "descriptor": { "id": "t1", "name": "Tenant one" }, "enabled": { "auth-1.0.0": true } }"#,
        )
        .unwrap();
        assert_eq!(tenant.id(), "t1");
        assert_eq!(tenant.enabled_version, 0);
        assert!(tenant.is_enabled("auth-1.0.0"));
    }
}
