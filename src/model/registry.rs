use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identity of a resource provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceProviderId(String);

impl ResourceProviderId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceProviderId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ResourceProviderId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A resource provider record held by the [`Registry`].
///
/// Only the `id` is interpreted by the registrar. The `type` and `name`
/// fields are the provider's self-description and are carried through
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceProvider {
    pub id: ResourceProviderId,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ResourceProvider {
    /// Creates a record carrying only an identity.
    pub fn new(id: impl Into<ResourceProviderId>) -> Self {
        Self {
            id: id.into(),
            kind: None,
            name: None,
        }
    }

    pub fn with_info(mut self, kind: impl Into<String>, name: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self.name = Some(name.into());
        self
    }
}

/// The persisted aggregate: every admitted resource provider, in admission order.
///
/// No two records share an identity. The registrar only ever changes a
/// `Registry` through the operations in [`crate::operation`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    #[serde(default)]
    pub resource_providers: Vec<ResourceProvider>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position of the record with the given identity, if admitted.
    pub fn position(&self, id: &ResourceProviderId) -> Option<usize> {
        self.resource_providers.iter().position(|provider| &provider.id == id)
    }

    pub fn contains(&self, id: &ResourceProviderId) -> bool {
        self.position(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.resource_providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resource_providers.is_empty()
    }

    /// Identities in admission order.
    pub fn ids(&self) -> impl Iterator<Item = &ResourceProviderId> {
        self.resource_providers.iter().map(|provider| &provider.id)
    }
}
