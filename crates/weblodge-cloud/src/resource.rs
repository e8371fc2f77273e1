//! Remote-backed resources
//!
//! A resource is addressed by its name. Its remote attributes are an
//! immutable [`RemoteDescriptor`] snapshot held in a [`RemoteState`], which
//! is either unloaded, loaded once and cached, or deleted.

use crate::control_plane::ControlPlaneClient;
use crate::error::{CloudError, Result};
use crate::tags::Tags;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard};

/// Snapshot of a resource as reported by the control plane
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDescriptor {
    fields: Map<String, Value>,
}

impl RemoteDescriptor {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Build a descriptor from a `show`-style output.
    ///
    /// `null` or an empty object means the resource does not exist.
    pub fn from_output(kind: &str, name: &str, value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) if !fields.is_empty() => Ok(Self { fields }),
            Value::Null | Value::Object(_) => Err(CloudError::ResourceNotFound(format!(
                "{} '{}' does not exist",
                kind, name
            ))),
            other => Err(CloudError::UnexpectedOutput(format!(
                "expected an object describing {} '{}', got {}",
                kind, name, other
            ))),
        }
    }

    /// Split a `list`-style output into descriptors, skipping non-objects
    pub fn many(value: Value) -> Result<Vec<Self>> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => Ok(items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(fields) => Some(Self { fields }),
                    _ => None,
                })
                .collect()),
            other => Err(CloudError::UnexpectedOutput(format!(
                "expected a list, got {}",
                other
            ))),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.str_field("id")
    }

    pub fn name(&self) -> Option<&str> {
        self.str_field("name")
    }

    pub fn location(&self) -> Option<&str> {
        self.str_field("location")
    }

    pub fn tags(&self) -> Tags {
        Tags::from_json(self.fields.get("tags"))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// String at a JSON pointer such as `/sku/name`
    pub fn str_at(&self, pointer: &str) -> Option<&str> {
        self.value_at(pointer).and_then(Value::as_str)
    }

    pub fn value_at(&self, pointer: &str) -> Option<&Value> {
        let mut segments = pointer.trim_start_matches('/').split('/');
        let mut current = self.fields.get(segments.next()?)?;
        for segment in segments {
            current = match current {
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                other => other.get(segment)?,
            };
        }
        Some(current)
    }

    /// Additive merge: keys of `other` are added, existing keys are kept
    pub fn merged(&self, other: &RemoteDescriptor) -> RemoteDescriptor {
        let mut fields = self.fields.clone();
        for (key, value) in &other.fields {
            fields.entry(key.clone()).or_insert_with(|| value.clone());
        }
        RemoteDescriptor { fields }
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

/// Load state of a resource
#[derive(Debug, Clone, Default)]
pub enum Remote {
    #[default]
    Unloaded,
    Loaded(Arc<RemoteDescriptor>),
    /// Deleted by this process; the handle must not be reused
    Deleted,
}

/// Interior-mutable holder of a [`Remote`]
///
/// The lock is never held across an await point.
#[derive(Debug, Default)]
pub struct RemoteState {
    inner: Mutex<Remote>,
}

impl RemoteState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loaded(descriptor: RemoteDescriptor) -> Self {
        Self {
            inner: Mutex::new(Remote::Loaded(Arc::new(descriptor))),
        }
    }

    pub fn snapshot(&self) -> Option<Arc<RemoteDescriptor>> {
        match &*self.lock() {
            Remote::Loaded(descriptor) => Some(descriptor.clone()),
            _ => None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(&*self.lock(), Remote::Deleted)
    }

    /// Replace the snapshot wholesale
    pub fn replace(&self, descriptor: RemoteDescriptor) -> Arc<RemoteDescriptor> {
        let descriptor = Arc::new(descriptor);
        *self.lock() = Remote::Loaded(descriptor.clone());
        descriptor
    }

    /// Add the keys of `extra` to the current snapshot
    pub fn extend(&self, extra: RemoteDescriptor) -> Arc<RemoteDescriptor> {
        let mut guard = self.lock();
        let merged = match &*guard {
            Remote::Loaded(current) => current.merged(&extra),
            _ => extra,
        };
        let merged = Arc::new(merged);
        *guard = Remote::Loaded(merged.clone());
        merged
    }

    pub fn mark_deleted(&self) {
        *self.lock() = Remote::Deleted;
    }

    fn lock(&self) -> MutexGuard<'_, Remote> {
        // Poisoning cannot leave the enum half-written.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A named entity backed by a remote descriptor
#[async_trait]
pub trait Resource: Send + Sync {
    /// Human-readable kind used in errors and logs
    const KIND: &'static str;

    fn name(&self) -> &str;

    fn remote(&self) -> &RemoteState;

    fn client(&self) -> &ControlPlaneClient;

    /// Fetch the current descriptor from the control plane
    async fn fetch(&self) -> Result<RemoteDescriptor>;

    /// Fetch and cache the descriptor.
    ///
    /// Absence is reported as [`CloudError::ResourceNotFound`]; an exhausted
    /// retry budget as [`CloudError::CanLoadResource`].
    async fn load(&self) -> Result<Arc<RemoteDescriptor>> {
        if self.remote().is_deleted() {
            return Err(CloudError::ResourceNotFound(format!(
                "{} '{}' was deleted",
                Self::KIND,
                self.name()
            )));
        }

        match self.fetch().await {
            Ok(descriptor) => Ok(self.remote().replace(descriptor)),
            Err(CloudError::ControlPlane { message, .. }) => Err(CloudError::CanLoadResource {
                kind: Self::KIND,
                name: self.name().to_string(),
                reason: message,
            }),
            Err(e) => Err(e),
        }
    }

    /// Cached descriptor, loaded on first access
    async fn descriptor(&self) -> Result<Arc<RemoteDescriptor>> {
        match self.remote().snapshot() {
            Some(descriptor) => Ok(descriptor),
            None => self.load().await,
        }
    }

    /// True when the resource can be loaded; never fails
    async fn exists(&self) -> bool {
        if self.remote().is_deleted() {
            return false;
        }
        match self.load().await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("{} '{}' treated as absent: {}", Self::KIND, self.name(), e);
                false
            }
        }
    }

    async fn id(&self) -> Result<String> {
        let descriptor = self.descriptor().await?;
        descriptor
            .id()
            .map(str::to_string)
            .ok_or_else(|| self.missing("id"))
    }

    async fn location(&self) -> Result<String> {
        let descriptor = self.descriptor().await?;
        descriptor
            .location()
            .map(str::to_string)
            .ok_or_else(|| self.missing("location"))
    }

    async fn tags(&self) -> Result<Tags> {
        Ok(self.descriptor().await?.tags())
    }

    async fn is_owned_by(&self, ownership: &Tags) -> Result<bool> {
        Ok(self.tags().await?.contains_all(ownership))
    }

    fn missing(&self, attribute: &str) -> CloudError {
        CloudError::MissingAttribute {
            kind: Self::KIND,
            name: self.name().to_string(),
            attribute: attribute.to_string(),
        }
    }
}

/// A resource kind whose instances can be enumerated
#[async_trait]
pub trait Listable: Resource + Sized {
    /// Every remote instance of this kind, owned or not
    async fn list(client: &ControlPlaneClient) -> Result<Vec<RemoteDescriptor>>;

    /// Build a loaded handle from a listed descriptor
    fn from_remote(client: &ControlPlaneClient, descriptor: RemoteDescriptor) -> Option<Self>;
}

/// Owned instances of `R`, constructed lazily
pub struct OwnedResources<R> {
    client: ControlPlaneClient,
    ownership: Tags,
    remaining: std::vec::IntoIter<RemoteDescriptor>,
    _kind: PhantomData<fn() -> R>,
}

impl<R: Listable> Iterator for OwnedResources<R> {
    type Item = R;

    fn next(&mut self) -> Option<R> {
        for descriptor in self.remaining.by_ref() {
            if !descriptor.tags().contains_all(&self.ownership) {
                continue;
            }
            if let Some(resource) = R::from_remote(&self.client, descriptor) {
                return Some(resource);
            }
        }
        None
    }
}

/// List every instance of `R` carrying all of `ownership`
pub async fn all<R: Listable>(client: &ControlPlaneClient, ownership: &Tags) -> Result<OwnedResources<R>> {
    let descriptors = R::list(client).await?;
    tracing::debug!("Listed {} {}(s)", descriptors.len(), R::KIND);
    Ok(OwnedResources {
        client: client.clone(),
        ownership: ownership.clone(),
        remaining: descriptors.into_iter(),
        _kind: PhantomData,
    })
}

/// Compare-friendly location: `North Europe` and `northeurope` are equal
pub fn normalize_location(location: &str) -> String {
    location
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}
