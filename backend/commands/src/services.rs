//! Minimal service container.
//!
//! Services are registered by type with a factory and a [`Lifetime`]. The
//! root [`ServiceProvider`] owns the singleton cache; every
//! [`ServiceProvider::create_scope`] call yields a provider with its own
//! scoped cache that shares the root's singletons.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{anyhow, bail, Result};
use once_cell::sync::OnceCell;

/// Type-erased service instance.
pub type ServiceRef = Arc<dyn Any + Send + Sync>;

type ServiceFactory = Arc<dyn Fn(&ServiceProvider) -> Result<ServiceRef> + Send + Sync>;

/// Instance-lifetime policy shared by services and command handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifetime {
    /// New instance on every resolution.
    #[default]
    Transient,
    /// One instance per request scope.
    Scoped,
    /// One instance for the lifetime of the process.
    Singleton,
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifetime::Transient => write!(f, "transient"),
            Lifetime::Scoped => write!(f, "scoped"),
            Lifetime::Singleton => write!(f, "singleton"),
        }
    }
}

#[derive(Clone)]
struct Registration {
    type_name: &'static str,
    lifetime: Lifetime,
    factory: ServiceFactory,
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct ServiceCollection {
    registrations: HashMap<TypeId, Registration>,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_singleton<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Any + Send + Sync,
        F: Fn(&ServiceProvider) -> Result<T> + Send + Sync + 'static,
    {
        self.add::<T, F>(Lifetime::Singleton, factory)
    }

    pub fn add_scoped<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Any + Send + Sync,
        F: Fn(&ServiceProvider) -> Result<T> + Send + Sync + 'static,
    {
        self.add::<T, F>(Lifetime::Scoped, factory)
    }

    pub fn add_transient<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Any + Send + Sync,
        F: Fn(&ServiceProvider) -> Result<T> + Send + Sync + 'static,
    {
        self.add::<T, F>(Lifetime::Transient, factory)
    }

    /// Register an already constructed singleton.
    pub fn add_instance<T: Any + Send + Sync>(&mut self, instance: Arc<T>) -> &mut Self {
        let factory: ServiceFactory = Arc::new(move |_| Ok(instance.clone() as ServiceRef));
        self.registrations.insert(
            TypeId::of::<T>(),
            Registration {
                type_name: std::any::type_name::<T>(),
                lifetime: Lifetime::Singleton,
                factory,
            },
        );
        self
    }

    fn add<T, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        T: Any + Send + Sync,
        F: Fn(&ServiceProvider) -> Result<T> + Send + Sync + 'static,
    {
        let factory: ServiceFactory =
            Arc::new(move |provider| factory(provider).map(|s| Arc::new(s) as ServiceRef));
        self.registrations.insert(
            TypeId::of::<T>(),
            Registration {
                type_name: std::any::type_name::<T>(),
                lifetime,
                factory,
            },
        );
        self
    }

    pub fn contains<T: Any>(&self) -> bool {
        self.registrations.contains_key(&TypeId::of::<T>())
    }

    pub fn build(self) -> ServiceProvider {
        ServiceProvider {
            registrations: Arc::new(self.registrations),
            singletons: Arc::new(InstanceCache::default()),
            scoped: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Per-type once-cells; concurrent first resolutions of the same type block
/// on the cell instead of constructing twice.
#[derive(Default)]
struct InstanceCache {
    cells: Mutex<HashMap<TypeId, Arc<OnceCell<ServiceRef>>>>,
}

impl InstanceCache {
    fn get_or_init(&self, id: TypeId, init: impl FnOnce() -> Result<ServiceRef>) -> Result<ServiceRef> {
        let cell = {
            let mut cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
            cells.entry(id).or_default().clone()
        };
        cell.get_or_try_init(init).cloned()
    }
}

#[derive(Clone)]
pub struct ServiceProvider {
    registrations: Arc<HashMap<TypeId, Registration>>,
    singletons: Arc<InstanceCache>,
    scoped: Option<Arc<InstanceCache>>,
}

impl ServiceProvider {
    /// An empty provider; every lookup misses.
    pub fn empty() -> Self {
        ServiceCollection::new().build()
    }

    /// New provider sharing this provider's singletons with a fresh scoped cache.
    pub fn create_scope(&self) -> ServiceProvider {
        ServiceProvider {
            registrations: self.registrations.clone(),
            singletons: self.singletons.clone(),
            scoped: Some(Arc::new(InstanceCache::default())),
        }
    }

    /// Resolve a service by type id. `Ok(None)` means nothing is registered.
    pub fn resolve(&self, id: TypeId) -> Result<Option<ServiceRef>> {
        let Some(registration) = self.registrations.get(&id) else {
            return Ok(None);
        };

        let instance = match registration.lifetime {
            Lifetime::Transient => (registration.factory)(self)?,
            Lifetime::Singleton => {
                let root = self.root();
                self.singletons
                    .get_or_init(id, || (registration.factory)(&root))?
            }
            Lifetime::Scoped => {
                let Some(scoped) = &self.scoped else {
                    bail!(
                        "scoped service {} cannot be resolved from the root provider",
                        registration.type_name
                    );
                };
                scoped.get_or_init(id, || (registration.factory)(self))?
            }
        };
        Ok(Some(instance))
    }

    pub fn try_get<T: Any + Send + Sync>(&self) -> Result<Option<Arc<T>>> {
        match self.resolve(TypeId::of::<T>())? {
            Some(instance) => instance
                .downcast::<T>()
                .map(Some)
                .map_err(|_| anyhow!("service registered as {} has another type", std::any::type_name::<T>())),
            None => Ok(None),
        }
    }

    /// Resolve `T`, treating construction failures as absence.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.try_get::<T>().ok().flatten()
    }

    pub fn require<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
        self.try_get::<T>()?
            .ok_or_else(|| anyhow!("no service registered for {}", std::any::type_name::<T>()))
    }

    fn root(&self) -> ServiceProvider {
        ServiceProvider {
            registrations: self.registrations.clone(),
            singletons: self.singletons.clone(),
            scoped: None,
        }
    }
}

impl fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("services", &self.registrations.len())
            .field("scope", &self.scoped.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(usize);

    #[test]
    fn transient_builds_every_time() {
        let built = Arc::new(AtomicUsize::new(0));
        let mut services = ServiceCollection::new();
        let b = built.clone();
        services.add_transient(move |_| Ok(Counter(b.fetch_add(1, Ordering::SeqCst))));
        let provider = services.build();

        let a = provider.require::<Counter>().unwrap();
        let b = provider.require::<Counter>().unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn singleton_is_shared_across_scopes() {
        let mut services = ServiceCollection::new();
        services.add_singleton(|_| Ok(Counter(0)));
        let provider = services.build();

        let a = provider.require::<Counter>().unwrap();
        let b = provider.create_scope().require::<Counter>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn scoped_is_per_scope_and_rejected_at_root() {
        let mut services = ServiceCollection::new();
        services.add_scoped(|_| Ok(Counter(0)));
        let provider = services.build();

        let scope = provider.create_scope();
        let a = scope.require::<Counter>().unwrap();
        let b = scope.require::<Counter>().unwrap();
        let c = provider.create_scope().require::<Counter>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert!(provider.try_get::<Counter>().is_err());
    }

    #[test]
    fn factories_can_resolve_dependencies() {
        struct Greeter(Arc<String>);

        let mut services = ServiceCollection::new();
        services.add_instance(Arc::new("hello".to_string()));
        services.add_transient(|sp| Ok(Greeter(sp.require::<String>()?)));
        let provider = services.build();

        assert_eq!(provider.require::<Greeter>().unwrap().0.as_str(), "hello");
        assert!(provider.get::<Counter>().is_none());
    }
}
