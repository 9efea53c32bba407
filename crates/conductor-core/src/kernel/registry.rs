use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A registered capability, type-erased for storage.
struct CapabilityEntry {
    type_name: &'static str,
    // Always an `Arc<T>` for the `T` the entry is keyed by
    instance: Box<dyn Any + Send + Sync>,
}

//--------------------------------------------------
// CapabilityRegistry (Internal, wrapped by SharedCapabilityRegistry)
//--------------------------------------------------

/// Mapping from a capability type tag to its single provider.
///
/// The key is the `TypeId` of the capability type, which is usually a trait
/// object such as `dyn WindowStateManager`, so providers and consumers only
/// share the trait and never each other's concrete types.
#[derive(Default)]
pub struct CapabilityRegistry {
    instances: HashMap<TypeId, CapabilityEntry>,
}

impl fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("capabilities", &self.registered_names())
            .finish()
    }
}

impl CapabilityRegistry {
    /// Create a new empty capability registry
    pub fn new() -> Self {
        Self {
            instances: HashMap::new(),
        }
    }

    /// Register `instance` as the provider of capability `T`.
    ///
    /// Last writer wins: a previous provider is replaced and handed back.
    pub fn put<T>(&mut self, instance: Arc<T>) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let entry = CapabilityEntry {
            type_name: type_name::<T>(),
            instance: Box::new(instance),
        };
        let previous = self.instances.insert(TypeId::of::<T>(), entry)?;
        log::debug!("Capability {} replaced by a new provider", type_name::<T>());
        previous
            .instance
            .downcast::<Arc<T>>()
            .ok()
            .map(|boxed| *boxed)
    }

    /// Look up the provider of capability `T`. Absence is a normal outcome.
    pub fn get<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.instances
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.instance.downcast_ref::<Arc<T>>())
            .cloned()
    }

    /// Check whether capability `T` has a provider.
    pub fn contains<T>(&self) -> bool
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.instances.contains_key(&TypeId::of::<T>())
    }

    /// Remove the provider of capability `T`.
    pub fn remove<T>(&mut self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.instances
            .remove(&TypeId::of::<T>())
            .and_then(|entry| entry.instance.downcast::<Arc<T>>().ok())
            .map(|boxed| *boxed)
    }

    /// Type names of all registered capabilities, sorted.
    pub fn registered_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.instances.values().map(|e| e.type_name).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Clear all instances.
    pub fn clear(&mut self) {
        self.instances.clear();
    }
}

//--------------------------------------------------
// SharedCapabilityRegistry (Public API)
//--------------------------------------------------

/// Cloneable handle to the registry owned by one orchestrator.
///
/// Every clone refers to the same table. All access happens from the control
/// loop, so the lock is never contended; it exists so the handle can be
/// stored inside services that are `Send + Sync`.
#[derive(Clone, Default)]
pub struct SharedCapabilityRegistry {
    registry: Arc<RwLock<CapabilityRegistry>>,
}

impl fmt::Debug for SharedCapabilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedCapabilityRegistry")
            .field("capabilities", &self.read().registered_names())
            .finish()
    }
}

impl SharedCapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // A panicking service must not take the registry down with it.
    fn read(&self) -> RwLockReadGuard<'_, CapabilityRegistry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CapabilityRegistry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn put<T>(&self, instance: Arc<T>) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.write().put(instance)
    }

    pub fn get<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.read().get::<T>()
    }

    pub fn contains<T>(&self) -> bool
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.read().contains::<T>()
    }

    pub fn remove<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.write().remove::<T>()
    }

    pub fn registered_names(&self) -> Vec<&'static str> {
        self.read().registered_names()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
