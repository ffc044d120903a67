//! Lifetime-aware store of command handler instances, keyed by remote command id.
//!
//! The cache holds one [`HandlerDescriptor`] per registered command id. How an
//! instance is produced depends on the descriptor's lifetime:
//!
//! - transient: a fresh instance per lookup, released when the request scope ends
//! - scoped: one instance per [`HandlerScope`], released when the scope ends
//! - singleton: one instance per process, guarded by a single mutex and
//!   released only by [`CommandHandlerCache::dispose`]

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use parley_core::Snowflake;
use tracing::{debug, trace};

use crate::declaration::{HandlerDeclaration, HandlerFactory};
use crate::error::CommandError;
use crate::handler::InteractionCommandHandler;
use crate::services::{Lifetime, ServiceProvider};

pub type HandlerRef = Arc<dyn InteractionCommandHandler>;

/// How to create the handler for one registered command.
#[derive(Clone)]
pub struct HandlerDescriptor {
    type_name: &'static str,
    lifetime: Lifetime,
    factory: HandlerFactory,
}

impl HandlerDescriptor {
    pub fn new(type_name: &'static str, lifetime: Lifetime, factory: HandlerFactory) -> Self {
        Self {
            type_name,
            lifetime,
            factory,
        }
    }

    pub fn from_declaration(declaration: &HandlerDeclaration) -> Self {
        Self::new(
            declaration.type_name(),
            declaration.resolved_lifetime(),
            declaration.factory().clone(),
        )
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    fn create(&self, services: &ServiceProvider) -> Result<HandlerRef, CommandError> {
        trace!(handler = self.type_name, lifetime = %self.lifetime, "Creating command handler instance");
        (self.factory)(services).map_err(|e| CommandError::HandlerConstruction {
            handler: self.type_name,
            message: format!("{e:#}"),
        })
    }
}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("type_name", &self.type_name)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Process-wide cache
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct CommandHandlerCache {
    descriptors: RwLock<HashMap<Snowflake, Arc<HandlerDescriptor>>>,
    singletons: Mutex<HashMap<Snowflake, HandlerRef>>,
    disposed: AtomicBool,
}

impl CommandHandlerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a remote command id to a descriptor. Replaces any previous mapping.
    pub fn add_descriptor(&self, command_id: Snowflake, descriptor: Arc<HandlerDescriptor>) {
        debug!(command_id, handler = descriptor.type_name(), lifetime = %descriptor.lifetime(), "Caching command handler descriptor");
        let previous = self
            .descriptors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(command_id, descriptor);
        if previous.is_some() {
            self.release_singleton(command_id);
        }
    }

    pub fn descriptor(&self, command_id: Snowflake) -> Option<Arc<HandlerDescriptor>> {
        self.descriptors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&command_id)
            .cloned()
    }

    pub fn remove_descriptor(&self, command_id: Snowflake) -> bool {
        let removed = self
            .descriptors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&command_id)
            .is_some();
        if removed {
            self.release_singleton(command_id);
        }
        removed
    }

    /// Drop every descriptor and release every singleton instance.
    pub fn clear(&self) {
        self.descriptors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.release_all_singletons();
    }

    pub fn len(&self) -> usize {
        self.descriptors.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Open a request scope resolving handlers with `services`.
    pub fn scope(self: &Arc<Self>, services: ServiceProvider) -> HandlerScope {
        HandlerScope {
            cache: self.clone(),
            services,
            scoped: HashMap::new(),
            transients: Vec::new(),
            disposed: false,
        }
    }

    /// Release all singletons and forget all descriptors. Idempotent.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!("Disposing command handler cache");
        self.clear();
    }

    fn singleton(
        &self,
        command_id: Snowflake,
        descriptor: &HandlerDescriptor,
        services: &ServiceProvider,
    ) -> Result<HandlerRef, CommandError> {
        let mut singletons = self.singletons.lock().unwrap_or_else(PoisonError::into_inner);
        // dispose() drains under this lock after raising the flag
        if self.is_disposed() {
            return Err(CommandError::Disposed);
        }
        if let Some(existing) = singletons.get(&command_id) {
            return Ok(existing.clone());
        }
        let handler = descriptor.create(services)?;
        singletons.insert(command_id, handler.clone());
        Ok(handler)
    }

    fn release_singleton(&self, command_id: Snowflake) {
        let removed = self
            .singletons
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&command_id);
        if let Some(handler) = removed {
            handler.release();
        }
    }

    fn release_all_singletons(&self) {
        let drained: Vec<HandlerRef> = self
            .singletons
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, h)| h)
            .collect();
        for handler in drained {
            handler.release();
        }
    }
}

impl fmt::Debug for CommandHandlerCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandHandlerCache")
            .field("descriptors", &self.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Request scope
// ---------------------------------------------------------------------------

/// Handler resolution for one request. Owned by a single task, so the scoped
/// tier needs no locking. Dropping the scope releases its scoped and
/// transient instances.
pub struct HandlerScope {
    cache: Arc<CommandHandlerCache>,
    services: ServiceProvider,
    scoped: HashMap<Snowflake, HandlerRef>,
    transients: Vec<HandlerRef>,
    disposed: bool,
}

impl HandlerScope {
    /// Resolve the handler registered for `command_id`.
    ///
    /// `Ok(None)` means no command with that id was registered.
    pub fn get(&mut self, command_id: Snowflake) -> Result<Option<HandlerRef>, CommandError> {
        if self.disposed || self.cache.is_disposed() {
            return Err(CommandError::Disposed);
        }
        let Some(descriptor) = self.cache.descriptor(command_id) else {
            return Ok(None);
        };

        let handler = match descriptor.lifetime() {
            Lifetime::Transient => {
                let handler = descriptor.create(&self.services)?;
                self.transients.push(handler.clone());
                handler
            }
            Lifetime::Scoped => match self.scoped.get(&command_id) {
                Some(existing) => existing.clone(),
                None => {
                    let handler = descriptor.create(&self.services)?;
                    self.scoped.insert(command_id, handler.clone());
                    handler
                }
            },
            Lifetime::Singleton => self.cache.singleton(command_id, &descriptor, &self.services)?,
        };
        Ok(Some(handler))
    }

    pub fn services(&self) -> &ServiceProvider {
        &self.services
    }

    /// Release scoped and transient instances. Idempotent.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        for (_, handler) in self.scoped.drain() {
            handler.release();
        }
        for handler in self.transients.drain(..) {
            handler.release();
        }
    }
}

impl Drop for HandlerScope {
    fn drop(&mut self) {
        self.dispose();
    }
}
