//! Concrete registry mutations.
//!
//! Both operations scan the provider list linearly; provider counts are
//! cluster-scale, not request-scale.

use crate::framework::OperationError;
use crate::model::{Registry, ResourceProvider, ResourceProviderId};

/// Adds a resource provider to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmitResourceProvider {
    pub provider: ResourceProvider,
}

impl AdmitResourceProvider {
    pub fn new(id: impl Into<ResourceProviderId>) -> Self {
        Self {
            provider: ResourceProvider::new(id),
        }
    }

    /// Admits a record that carries provider info alongside its identity.
    pub fn with_provider(provider: ResourceProvider) -> Self {
        Self { provider }
    }

    /// # Errors
    /// [`OperationError::AlreadyAdmitted`] if the identity is already present.
    pub fn perform(&self, registry: &mut Registry) -> Result<bool, OperationError> {
        if registry.contains(&self.provider.id) {
            return Err(OperationError::AlreadyAdmitted(self.provider.id.clone()));
        }

        registry.resource_providers.push(self.provider.clone());
        Ok(true)
    }
}

/// Removes a resource provider from the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveResourceProvider {
    pub id: ResourceProviderId,
}

impl RemoveResourceProvider {
    pub fn new(id: impl Into<ResourceProviderId>) -> Self {
        Self { id: id.into() }
    }

    /// # Errors
    /// [`OperationError::UnknownResourceProvider`] if the identity is absent.
    pub fn perform(&self, registry: &mut Registry) -> Result<bool, OperationError> {
        let position = registry
            .position(&self.id)
            .ok_or_else(|| OperationError::UnknownResourceProvider(self.id.clone()))?;

        registry.resource_providers.remove(position);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admit_rejects_duplicate_without_mutating() {
        let mut registry = Registry::new();
        assert_eq!(AdmitResourceProvider::new("pv1").perform(&mut registry), Ok(true));

        let before = registry.clone();
        let result = AdmitResourceProvider::new("pv1").perform(&mut registry);
        assert_eq!(result, Err(OperationError::AlreadyAdmitted("pv1".into())));
        assert_eq!(registry, before);
    }

    #[test]
    fn test_remove_keeps_order_of_remaining_providers() {
        let mut registry = Registry::new();
        for id in ["a", "b", "c"] {
            AdmitResourceProvider::new(id).perform(&mut registry).unwrap();
        }

        assert_eq!(RemoveResourceProvider::new("b").perform(&mut registry), Ok(true));
        let ids: Vec<&str> = registry.ids().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_remove_unknown_is_rejected() {
        let mut registry = Registry::new();
        AdmitResourceProvider::new("a").perform(&mut registry).unwrap();

        let result = RemoveResourceProvider::new("z").perform(&mut registry);
        assert_eq!(result, Err(OperationError::UnknownResourceProvider("z".into())));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_admit_keeps_provider_info() {
        let mut registry = Registry::new();
        let provider = ResourceProvider::new("rp").with_info("org.example.lvm", "vg0");
        AdmitResourceProvider::with_provider(provider.clone())
            .perform(&mut registry)
            .unwrap();
        assert_eq!(registry.resource_providers, vec![provider]);
    }
}
