//! Extension configuration registry (§4.3).
//!
//! Generic extensions carry only `{enabled}`; `to_device` additionally
//! carries a `since` token. This is a tagged sum rather than an open trait
//! hierarchy, matching the handful of concrete extensions MSC4186 defines.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The full set of extension names `enable_all_extensions` installs.
pub const ALL_EXTENSION_NAMES: [&str; 5] = ["e2ee", "to_device", "account_data", "typing", "receipts"];

/// Configuration for one enabled extension.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtensionConfig {
    /// `e2ee`, `account_data`, `typing`, `receipts`, and any extension this engine
    /// doesn't know by name but the caller still wants to enable.
    Generic { enabled: bool },
    /// `to_device`, which additionally tracks a since-token across ticks.
    ToDevice {
        enabled: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        since: Option<String>,
    },
}

impl ExtensionConfig {
    pub fn enabled(&self) -> bool {
        match self {
            Self::Generic { enabled } | Self::ToDevice { enabled, .. } => *enabled,
        }
    }
}

/// Name-keyed map of enabled extensions, iterated in insertion order so the
/// request builder and the log formatters agree on ordering (§4.8).
#[derive(Clone, Debug, Default)]
pub struct ExtensionsRegistry {
    configs: IndexMap<String, ExtensionConfig>,
}

impl ExtensionsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a config for `name`. `to_device` gets the `ToDevice` variant
    /// (its `since` is refreshed from the engine's cursor right before each
    /// request is serialized; the stored value here is just the last snapshot).
    pub fn enable(&mut self, name: impl Into<String>) {
        let name = name.into();
        let config = if name == "to_device" {
            ExtensionConfig::ToDevice { enabled: true, since: None }
        } else {
            ExtensionConfig::Generic { enabled: true }
        };
        self.configs.insert(name, config);
    }

    /// Enables exactly `{e2ee, to_device, account_data, typing, receipts}`.
    pub fn enable_all(&mut self) {
        for name in ALL_EXTENSION_NAMES {
            self.enable(name);
        }
    }

    pub fn disable(&mut self, name: &str) {
        self.configs.shift_remove(name);
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExtensionConfig)> {
        self.configs.iter().map(|(name, config)| (name.as_str(), config))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.configs.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.configs.contains_key(name)
    }

    /// Produces a copy of the registry with the `to_device` entry's `since`
    /// refreshed from the engine's current cursor-controller field — "the
    /// stored map is a projection of truth, not the truth itself" (spec §9).
    pub fn snapshot_for_request(&self, to_device_since: Option<&str>) -> IndexMap<String, ExtensionConfig> {
        let mut snapshot = self.configs.clone();
        if let Some(ExtensionConfig::ToDevice { since, .. }) = snapshot.get_mut("to_device") {
            *since = to_device_since.map(str::to_owned);
        }
        snapshot
    }

    /// Applies a response's `to_device.next_batch`, if any, advancing the
    /// stored snapshot so a caller inspecting the registry sees it too.
    pub fn observe_to_device_next_batch(&mut self, next_batch: Option<&str>) {
        if let Some(next_batch) = next_batch {
            if let Some(ExtensionConfig::ToDevice { since, .. }) = self.configs.get_mut("to_device") {
                *since = Some(next_batch.to_owned());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enable_all_installs_exactly_five_extensions() {
        let mut registry = ExtensionsRegistry::new();
        registry.enable_all();
        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, ALL_EXTENSION_NAMES);
    }

    #[test]
    fn to_device_config_carries_since() {
        let mut registry = ExtensionsRegistry::new();
        registry.enable("to_device");
        let snapshot = registry.snapshot_for_request(Some("tok_1"));
        assert_eq!(
            snapshot.get("to_device"),
            Some(&ExtensionConfig::ToDevice { enabled: true, since: Some("tok_1".into()) })
        );
    }

    #[test]
    fn generic_extension_has_no_since() {
        let mut registry = ExtensionsRegistry::new();
        registry.enable("e2ee");
        assert_eq!(registry.configs.get("e2ee"), Some(&ExtensionConfig::Generic { enabled: true }));
    }
}
