//! Binding of capabilities to their concrete implementations.
//!
//! A capability is identified by its Rust type, usually a trait object such
//! as `dyn DocumentStore`. `main` builds one registry at startup, registers
//! the backends selected by configuration, and hands it to whatever needs to
//! assemble services. Tests build their own registry per case.
//!
//! ```ignore
//! let registry = Registry::new();
//! registry.register::<dyn DocumentStore>(Arc::new(MemoryDocumentStore::new()));
//! let store = registry.resolve::<dyn DocumentStore>()?;
//! ```

use std::any::{Any, TypeId, type_name};
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::RegistryError;

struct Binding {
    capability: &'static str,
    implementation: Box<dyn Any + Send + Sync>,
}

/// Capability registry.
#[derive(Default)]
pub struct Registry {
    bindings: DashMap<TypeId, Binding>,
}

impl Registry {
    /// An empty registry with no bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `implementation` to capability `C`, replacing any prior binding.
    pub fn register<C>(&self, implementation: Arc<C>)
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.bindings.insert(
            TypeId::of::<C>(),
            Binding {
                capability: type_name::<C>(),
                implementation: Box::new(implementation),
            },
        );
    }

    /// The implementation currently bound to capability `C`.
    pub fn resolve<C>(&self) -> Result<Arc<C>, RegistryError>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.bindings
            .get(&TypeId::of::<C>())
            .and_then(|binding| binding.implementation.downcast_ref::<Arc<C>>().cloned())
            .ok_or(RegistryError::UnboundCapability {
                capability: type_name::<C>(),
            })
    }

    /// Whether capability `C` currently has a binding.
    pub fn is_bound<C>(&self) -> bool
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.bindings.contains_key(&TypeId::of::<C>())
    }

    /// Names of all bound capabilities, sorted.
    pub fn bound_capabilities(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self
            .bindings
            .iter()
            .map(|binding| binding.value().capability)
            .collect();
        names.sort_unstable();
        names
    }

    /// Drop every binding.
    #[allow(dead_code)]
    pub fn reset(&self) {
        self.bindings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;
    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    struct Dogcow;
    impl Greeter for Dogcow {
        fn greet(&self) -> String {
            "moof".to_string()
        }
    }

    trait Counter: Send + Sync {}

    #[test]
    fn test_resolve_returns_registered_implementation() {
        let registry = Registry::new();
        let english: Arc<dyn Greeter> = Arc::new(English);
        registry.register::<dyn Greeter>(english.clone());

        let resolved = registry.resolve::<dyn Greeter>().unwrap();
        assert!(Arc::ptr_eq(&resolved, &english));
        assert_eq!(resolved.greet(), "hello");
    }

    #[test]
    fn test_register_replaces_binding() {
        let registry = Registry::new();
        registry.register::<dyn Greeter>(Arc::new(English));
        registry.register::<dyn Greeter>(Arc::new(Dogcow));

        assert_eq!(registry.resolve::<dyn Greeter>().unwrap().greet(), "moof");
        assert_eq!(registry.bound_capabilities().len(), 1);
    }

    #[test]
    fn test_unbound_capability_fails() {
        let registry = Registry::new();
        registry.register::<dyn Greeter>(Arc::new(English));

        let err = registry.resolve::<dyn Counter>().err().unwrap();
        assert!(matches!(err, RegistryError::UnboundCapability { capability } if capability.contains("Counter")));
        assert!(!registry.is_bound::<dyn Counter>());
    }

    #[test]
    fn test_reset_clears_bindings() {
        let registry = Registry::new();
        registry.register::<dyn Greeter>(Arc::new(English));
        assert!(registry.is_bound::<dyn Greeter>());

        registry.reset();
        assert!(registry.resolve::<dyn Greeter>().is_err());

        // Idempotent
        registry.reset();
        assert!(registry.bound_capabilities().is_empty());
    }

    #[test]
    fn test_registries_are_isolated() {
        let first = Registry::new();
        let second = Registry::new();
        first.register::<dyn Greeter>(Arc::new(English));

        assert!(first.is_bound::<dyn Greeter>());
        assert!(!second.is_bound::<dyn Greeter>());
    }

    #[test]
    fn test_concrete_types_are_capabilities_too() {
        let registry = Registry::new();
        registry.register(Arc::new(English));

        assert_eq!(registry.resolve::<English>().unwrap().greet(), "hello");
        assert!(!registry.is_bound::<dyn Greeter>());
    }
}
