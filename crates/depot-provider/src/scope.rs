use std::{
    any::Any,
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use depot_config::ConfigSnapshot;

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

/// What a provider factory sees while it builds an instance.
pub trait ResolutionContext {
    fn configuration(&self) -> &ConfigSnapshot;

    /// The unit of work that owns scoped instances.
    fn scope(&self) -> &Scope;
}

/// Identifies a scoped instance: the capability and the provider that built it.
pub(crate) type InstanceKey = (&'static str, &'static str);

/// Cache of scoped instances for one unit of work, keyed by capability and
/// provider name.
///
/// Dropping the scope drops every instance it created.
pub struct Scope {
    id: u64,
    instances: Mutex<HashMap<InstanceKey, Box<dyn Any + Send + Sync>>>,
}

impl Scope {
    pub fn new() -> Self {
        Self {
            id: NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed),
            instances: Mutex::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    fn instances(&self) -> MutexGuard<'_, HashMap<InstanceKey, Box<dyn Any + Send + Sync>>> {
        // factories never run under this lock
        self.instances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of instances resolved in this scope so far.
    pub fn len(&self) -> usize {
        self.instances().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn get<T>(&self, key: InstanceKey) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.instances()
            .get(&key)
            .and_then(|instance| instance.downcast_ref::<Arc<T>>())
            .cloned()
    }

    /// Stores `instance` unless another one was stored first, and returns
    /// whichever instance the scope now holds.
    pub(crate) fn get_or_insert<T>(&self, key: InstanceKey, instance: Arc<T>) -> Arc<T>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.instances()
            .entry(key)
            .or_insert_with(|| Box::new(instance.clone()) as Box<dyn Any + Send + Sync>)
            .downcast_ref::<Arc<T>>()
            .cloned()
            .unwrap_or(instance)
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id)
            .field("instances", &self.len())
            .finish()
    }
}
