//! Store registry: at most one live instance per store type.
//!
//! The registry is an explicit object handed to whoever needs stores, rather
//! than process-wide state. It owns the dispatcher the stores register with
//! and the configuration stores may read while initializing.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use super::action::ActionType;
use super::dispatcher::{Dispatcher, RegistrationError};
use super::store::{Store, StoreHandle};
use crate::config::Config;

/// Errors that can occur when obtaining a store instance.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// `get_instance` for a store was reached again while that store was
    /// still initializing.
    #[error("Store '{store}' requested itself while initializing")]
    RecursiveInitialization { store: &'static str },

    #[error("Store '{store}' binds action '{action_type}' more than once")]
    DuplicateBinding {
        store: &'static str,
        action_type: ActionType,
    },

    #[error("Display name '{store}' is already used by another store type")]
    DuplicateDisplayName { store: &'static str },

    #[error("Failed to register handlers for store '{store}': {source}")]
    Registration {
        store: &'static str,
        #[source]
        source: RegistrationError,
    },

    #[error("Failed to initialize store '{store}': {source:#}")]
    Initialization {
        store: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

enum Slot {
    Initializing { name: &'static str },
    Ready {
        name: &'static str,
        instance: Rc<dyn Any>,
    },
}

impl Slot {
    fn name(&self) -> &'static str {
        match self {
            Slot::Initializing { name } | Slot::Ready { name, .. } => *name,
        }
    }
}

/// Lazily creates and caches store instances.
pub struct StoreRegistry {
    dispatcher: Dispatcher,
    config: Config,
    slots: RefCell<HashMap<TypeId, Slot>>,
}

impl Default for StoreRegistry {
    fn default() -> Self {
        Self::new(Dispatcher::new(), Config::default())
    }
}

impl fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreRegistry")
            .field("stores", &self.store_names())
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

impl StoreRegistry {
    pub fn new(dispatcher: Dispatcher, config: Config) -> Self {
        Self {
            dispatcher,
            config,
            slots: RefCell::new(HashMap::new()),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The single instance of store `S`, created on first access.
    ///
    /// Creation asks `S` for its initial state, validates its action table
    /// and registers its handlers with the dispatcher. A failed creation
    /// leaves nothing behind, so a later call tries again.
    ///
    /// # Errors
    /// - [`RegistryError::RecursiveInitialization`] if `S` is reached again
    ///   from its own `initial_state`.
    /// - [`RegistryError::DuplicateDisplayName`], [`RegistryError::DuplicateBinding`]
    ///   for an invalid store definition.
    /// - [`RegistryError::Registration`] if handlers can't be registered
    ///   right now (first access from inside a dispatch).
    /// - [`RegistryError::Initialization`] if `initial_state` fails.
    pub fn get_instance<S: Store>(&self) -> Result<StoreHandle<S>, RegistryError> {
        let type_id = TypeId::of::<S>();

        {
            let slots = self.slots.borrow();
            match slots.get(&type_id) {
                Some(Slot::Ready { instance, .. }) => {
                    return Ok(downcast::<S>(instance));
                }
                Some(Slot::Initializing { name }) => {
                    tracing::error!(store = *name, "Recursive store initialization");
                    return Err(RegistryError::RecursiveInitialization { store: *name });
                }
                None => {}
            }

            if slots.values().any(|slot| slot.name() == S::DISPLAY_NAME) {
                return Err(RegistryError::DuplicateDisplayName {
                    store: S::DISPLAY_NAME,
                });
            }
        }

        self.slots.borrow_mut().insert(
            type_id,
            Slot::Initializing {
                name: S::DISPLAY_NAME,
            },
        );

        match self.create::<S>() {
            Ok(handle) => {
                let instance: Rc<dyn Any> = Rc::new(handle.clone());
                self.slots.borrow_mut().insert(
                    type_id,
                    Slot::Ready {
                        name: S::DISPLAY_NAME,
                        instance,
                    },
                );
                tracing::info!(
                    store = S::DISPLAY_NAME,
                    handlers = handle.dispatch_tokens().len(),
                    "Store initialized"
                );
                Ok(handle)
            }
            Err(err) => {
                self.slots.borrow_mut().remove(&type_id);
                tracing::error!(store = S::DISPLAY_NAME, error = %err, "Store initialization failed");
                Err(err)
            }
        }
    }

    fn create<S: Store>(&self) -> Result<StoreHandle<S>, RegistryError> {
        // No borrow of `slots` may be held here: initial_state can reach
        // back into the registry for other stores.
        let state = S::initial_state(self).map_err(|source| match source.downcast::<RegistryError>() {
            Ok(nested) => nested,
            Err(source) => RegistryError::Initialization {
                store: S::DISPLAY_NAME,
                source,
            },
        })?;

        let bindings = S::actions()
            .into_validated()
            .map_err(|action_type| RegistryError::DuplicateBinding {
                store: S::DISPLAY_NAME,
                action_type,
            })?;

        let handle = StoreHandle::<S>::new(state);
        handle
            .attach(&self.dispatcher, bindings)
            .map_err(|source| RegistryError::Registration {
                store: S::DISPLAY_NAME,
                source,
            })?;
        Ok(handle)
    }

    /// Whether `S` has a live instance.
    pub fn is_initialized<S: Store>(&self) -> bool {
        matches!(
            self.slots.borrow().get(&TypeId::of::<S>()),
            Some(Slot::Ready { .. })
        )
    }

    /// Display names of the live stores, sorted.
    pub fn store_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self
            .slots
            .borrow()
            .values()
            .filter(|slot| matches!(slot, Slot::Ready { .. }))
            .map(Slot::name)
            .collect();
        names.sort_unstable();
        names
    }
}

fn downcast<S: Store>(instance: &Rc<dyn Any>) -> StoreHandle<S> {
    match instance.downcast_ref::<StoreHandle<S>>() {
        Some(handle) => handle.clone(),
        // Slots are keyed by TypeId::of::<S>(), so the stored value is always
        // a StoreHandle<S>.
        None => unreachable!("store slot holds a foreign type"),
    }
}
