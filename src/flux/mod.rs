//! Flux primitives: actions, dispatcher, stores and view binding.
//!
//! # Architecture
//!
//! ```text
//! Action ──→ Dispatcher ──→ Store handlers ──→ State ──→ change event
//!    ↑                                                        │
//!    │                                                        ↓
//! action creator ←── View ←── props ←────────────────── Binder
//! ```
//!
//! - **Action**: immutable message naming an intent
//! - **Dispatcher**: delivers each action to every handler registered for its
//!   type, synchronously and in registration order
//! - **Store**: owns a slice of state; only its own handlers change it
//! - **StoreRegistry**: one instance per store type, created on first access
//! - **Binder**: recomputes a view's props whenever a bound store changes

mod action;
mod binder;
mod dispatcher;
mod registry;
mod store;

pub use action::{Action, ActionType};
pub use binder::{Binder, BoundView, View};
pub use dispatcher::{
    DispatchError, DispatchToken, Dispatcher, HandlerExecutionError, HandlerFailure, HandlerFn,
    RegistrationError,
};
pub use registry::{RegistryError, StoreRegistry};
pub use store::{
    ActionTable, ChangeSource, Handler, ListenerId, Reduction, Store, StoreEvent, StoreHandle,
};
