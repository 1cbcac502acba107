//! Central synchronous broker routing actions to registered handlers.
//!
//! The dispatcher is single-threaded: a dispatch runs every handler to
//! completion before returning. Instead of locks, an in-flight marker guards
//! the handler table so that ordering can't be disturbed mid-round.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use super::action::{Action, ActionType};

/// Callback invoked for every action of the type it was registered for.
pub type HandlerFn = dyn Fn(&Action) -> anyhow::Result<()>;

/// Identifies one registration; hand it back to [`Dispatcher::unregister`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DispatchToken(u64);

impl fmt::Display for DispatchToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ID_{}", self.0)
    }
}

/// Errors returned by [`Dispatcher::dispatch`].
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A handler tried to dispatch while a round was still running.
    #[error("Cannot dispatch '{action_type}' in the middle of dispatching '{in_flight}'")]
    Reentrant {
        action_type: ActionType,
        in_flight: ActionType,
    },

    /// One or more handlers failed; every other handler still ran.
    #[error(transparent)]
    HandlerExecution(#[from] HandlerExecutionError),
}

/// Errors returned by [`Dispatcher::register`] and [`Dispatcher::unregister`].
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("Cannot {operation} a handler while '{in_flight}' is being dispatched")]
    ConcurrentMutation {
        operation: &'static str,
        in_flight: ActionType,
    },
}

/// A single handler failure collected during a dispatch round.
#[derive(Debug)]
pub struct HandlerFailure {
    /// Display name of the store (or other owner) that registered the handler.
    pub owner: String,
    pub token: DispatchToken,
    /// The error the handler returned, untouched.
    pub error: anyhow::Error,
}

/// Aggregated failures of one dispatch round.
#[derive(Debug)]
pub struct HandlerExecutionError {
    pub action_type: ActionType,
    /// Number of handlers that were invoked in the round.
    pub handled: usize,
    pub failures: Vec<HandlerFailure>,
}

impl HandlerExecutionError {
    /// Owners of the failed handlers, in the order they ran.
    pub fn owners(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.owner.as_str()).collect()
    }
}

impl fmt::Display for HandlerExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} handler(s) failed while dispatching '{}'",
            self.failures.len(),
            self.handled,
            self.action_type
        )?;
        for failure in &self.failures {
            write!(f, "; {}: {:#}", failure.owner, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for HandlerExecutionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.failures.first().map(|failure| {
            let source: &(dyn std::error::Error + 'static) = &*failure.error;
            source
        })
    }
}

#[derive(Clone)]
struct Registration {
    token: DispatchToken,
    owner: Rc<str>,
    handler: Rc<HandlerFn>,
}

#[derive(Default)]
struct DispatcherInner {
    /// action type -> handlers in registration order
    handlers: RefCell<HashMap<ActionType, Vec<Registration>>>,
    in_flight: RefCell<Option<ActionType>>,
    next_token: Cell<u64>,
}

/// Handle to a dispatcher. Clones share the same handler table.
#[derive(Clone, Default)]
pub struct Dispatcher {
    inner: Rc<DispatcherInner>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registered_types", &self.registered_types())
            .field("in_flight", &*self.inner.in_flight.borrow())
            .finish()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `action_type`.
    ///
    /// Handlers for the same type are notified in registration order.
    ///
    /// # Errors
    /// Fails with [`RegistrationError::ConcurrentMutation`] when called from
    /// inside a running dispatch.
    pub fn register<F>(
        &self,
        action_type: impl Into<ActionType>,
        owner: &str,
        handler: F,
    ) -> Result<DispatchToken, RegistrationError>
    where
        F: Fn(&Action) -> anyhow::Result<()> + 'static,
    {
        let action_type = action_type.into();
        self.ensure_idle("register")?;

        let token = DispatchToken(self.inner.next_token.get());
        self.inner.next_token.set(token.0 + 1);

        let mut handlers = self.inner.handlers.borrow_mut();
        let slot = handlers.entry(action_type.clone()).or_default();
        slot.push(Registration {
            token,
            owner: Rc::from(owner),
            handler: Rc::new(handler),
        });

        tracing::debug!(
            action_type = %action_type,
            owner = %owner,
            token = %token,
            position = slot.len(),
            "Registered action handler"
        );
        Ok(token)
    }

    /// Remove a registration. Returns `false` if the token is unknown.
    ///
    /// # Errors
    /// Fails with [`RegistrationError::ConcurrentMutation`] when called from
    /// inside a running dispatch.
    pub fn unregister(&self, token: DispatchToken) -> Result<bool, RegistrationError> {
        self.ensure_idle("unregister")?;

        let mut handlers = self.inner.handlers.borrow_mut();
        let mut removed = None;
        for (action_type, slot) in handlers.iter_mut() {
            if let Some(index) = slot.iter().position(|r| r.token == token) {
                let registration = slot.remove(index);
                removed = Some((action_type.clone(), registration.owner));
                break;
            }
        }

        let Some((action_type, owner)) = removed else {
            return Ok(false);
        };

        if handlers.get(&action_type).is_some_and(Vec::is_empty) {
            handlers.remove(&action_type);
        }

        tracing::debug!(
            action_type = %action_type,
            owner = %owner,
            token = %token,
            "Unregistered action handler"
        );
        Ok(true)
    }

    /// Deliver `action` to every handler registered for its type.
    ///
    /// Handlers run synchronously in registration order. A failing handler
    /// does not stop the round; failures are collected and returned together
    /// once every handler has run. An action with no handlers is a no-op.
    ///
    /// # Errors
    /// - [`DispatchError::Reentrant`] if a dispatch is already running. The
    ///   running round is unaffected.
    /// - [`DispatchError::HandlerExecution`] if any handler failed.
    pub fn dispatch(&self, action: &Action) -> Result<(), DispatchError> {
        let action_type = action.action_type();

        if let Some(in_flight) = self.in_flight() {
            tracing::warn!(
                action_type = %action_type,
                in_flight = %in_flight,
                "Rejected re-entrant dispatch"
            );
            return Err(DispatchError::Reentrant {
                action_type: action_type.clone(),
                in_flight,
            });
        }

        // Snapshot so handlers never observe the table borrowed.
        let registrations: Vec<Registration> = self
            .inner
            .handlers
            .borrow()
            .get(action_type)
            .cloned()
            .unwrap_or_default();

        if registrations.is_empty() {
            tracing::trace!(action_type = %action_type, "No handlers registered, nothing to do");
            return Ok(());
        }

        tracing::debug!(
            action_type = %action_type,
            handlers = registrations.len(),
            "Dispatching action"
        );

        *self.inner.in_flight.borrow_mut() = Some(action_type.clone());
        let guard = scopeguard::guard(&self.inner.in_flight, |in_flight| {
            in_flight.replace(None);
        });

        let mut failures = Vec::new();
        for registration in &registrations {
            tracing::trace!(
                owner = %registration.owner,
                token = %registration.token,
                "Delivering action"
            );
            if let Err(error) = (registration.handler)(action) {
                tracing::error!(
                    action_type = %action_type,
                    owner = %registration.owner,
                    token = %registration.token,
                    error = %format!("{error:#}"),
                    "Handler failed, continuing with remaining handlers"
                );
                failures.push(HandlerFailure {
                    owner: registration.owner.to_string(),
                    token: registration.token,
                    error,
                });
            }
        }
        drop(guard);

        if failures.is_empty() {
            return Ok(());
        }

        Err(HandlerExecutionError {
            action_type: action_type.clone(),
            handled: registrations.len(),
            failures,
        }
        .into())
    }

    /// Whether a dispatch round is currently running.
    pub fn is_dispatching(&self) -> bool {
        self.inner.in_flight.borrow().is_some()
    }

    /// Number of handlers registered for `action_type`.
    pub fn handler_count(&self, action_type: &ActionType) -> usize {
        self.inner
            .handlers
            .borrow()
            .get(action_type)
            .map_or(0, Vec::len)
    }

    /// Action types with at least one handler, sorted.
    pub fn registered_types(&self) -> Vec<ActionType> {
        let mut types: Vec<ActionType> = self.inner.handlers.borrow().keys().cloned().collect();
        types.sort();
        types
    }

    fn in_flight(&self) -> Option<ActionType> {
        self.inner.in_flight.borrow().clone()
    }

    fn ensure_idle(&self, operation: &'static str) -> Result<(), RegistrationError> {
        match self.in_flight() {
            Some(in_flight) => {
                tracing::warn!(
                    operation = operation,
                    in_flight = %in_flight,
                    "Rejected handler table mutation during dispatch"
                );
                Err(RegistrationError::ConcurrentMutation {
                    operation,
                    in_flight,
                })
            }
            None => Ok(()),
        }
    }
}
