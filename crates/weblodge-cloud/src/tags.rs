//! Ownership tags
//!
//! Tags are the only record of which remote resources belong to WebLodge:
//! there is no local database, listing operations filter on them and
//! deletion refuses resources that do not carry them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tag key marking a resource as created by this tool
pub const MANAGED_BY_KEY: &str = "managed-by";

/// Value of [`MANAGED_BY_KEY`]
pub const MANAGED_BY_VALUE: &str = "weblodge";

pub const ENVIRONMENT_KEY: &str = "environment";

/// Marker set on the resource group of a deployment
pub const CONTAINS_KEY: &str = "contains";
pub const CONTAINS_WEBAPP: &str = "webapp";

/// Ordered set of resource tags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// The marker every created resource carries
    pub fn ownership() -> Self {
        Self::new().with(MANAGED_BY_KEY, MANAGED_BY_VALUE)
    }

    /// Ownership marker plus the deployment group marker
    pub fn webapp_group() -> Self {
        Self::ownership().with(CONTAINS_KEY, CONTAINS_WEBAPP)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn with_environment(self, environment: Option<&str>) -> Self {
        match environment {
            Some(env) if !env.is_empty() => self.with(ENVIRONMENT_KEY, env),
            _ => self,
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// True when every tag of `required` is present with the same value
    pub fn contains_all(&self, required: &Tags) -> bool {
        required
            .iter()
            .all(|(key, value)| self.get(key) == Some(value))
    }

    /// Overlay `other` on top of `self`
    pub fn merged(&self, other: &Tags) -> Tags {
        let mut merged = self.clone();
        for (key, value) in other.iter() {
            merged.insert(key, value);
        }
        merged
    }

    /// One `key=value` token per tag
    pub fn to_tokens(&self) -> Vec<String> {
        self.iter().map(|(k, v)| format!("{}={}", k, v)).collect()
    }

    /// Read tags from a remote `tags` object, ignoring non-string values
    pub fn from_json(value: Option<&serde_json::Value>) -> Self {
        let mut tags = Tags::new();
        if let Some(serde_json::Value::Object(map)) = value {
            for (key, value) in map {
                if let Some(value) = value.as_str() {
                    tags.insert(key.clone(), value);
                }
            }
        }
        tags
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Tags {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tags = Tags::new();
        for (key, value) in iter {
            tags.insert(key, value);
        }
        tags
    }
}
