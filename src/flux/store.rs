//! Stores: single-instance holders of a slice of application state.
//!
//! A store is described by a type implementing [`Store`]: a display name, the
//! state it holds, the closed set of change events it emits and a declarative
//! table of action handlers. The live instance is a [`StoreHandle`], created
//! by the [`StoreRegistry`](super::StoreRegistry).

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::action::{Action, ActionType};
use super::dispatcher::{DispatchToken, Dispatcher, RegistrationError};
use super::registry::StoreRegistry;

/// Closed set of change events a store can emit.
///
/// Implemented by a fieldless enum listing every variant in `ALL`.
pub trait StoreEvent: Copy + Eq + fmt::Debug + 'static {
    /// Every event kind, used when subscribing to all changes of a store.
    const ALL: &'static [Self];

    fn name(&self) -> &'static str;
}

/// Result of a handler: either nothing changed, or a new state plus the
/// event to emit once it is in place.
pub enum Reduction<S: Store> {
    Unchanged,
    Changed { state: S::State, event: S::Event },
}

impl<S: Store> Reduction<S> {
    pub fn changed(state: S::State, event: S::Event) -> Self {
        Reduction::Changed { state, event }
    }
}

/// A pure transition: (state, action) -> reduction.
pub type Handler<S> = fn(&<S as Store>::State, &Action) -> anyhow::Result<Reduction<S>>;

/// Declarative `action type -> handler` table built when a store is created.
///
/// Each action type may be bound at most once; duplicates are reported when
/// the registry initializes the store.
pub struct ActionTable<S: Store> {
    entries: Vec<(ActionType, Handler<S>)>,
}

impl<S: Store> Default for ActionTable<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Store> ActionTable<S> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn bind(mut self, action_type: impl Into<ActionType>, handler: Handler<S>) -> Self {
        self.entries.push((action_type.into(), handler));
        self
    }

    /// Returns the entries, or the first action type bound twice.
    pub(crate) fn into_validated(self) -> Result<Vec<(ActionType, Handler<S>)>, ActionType> {
        for (index, (action_type, _)) in self.entries.iter().enumerate() {
            if self.entries[..index].iter().any(|(seen, _)| seen == action_type) {
                return Err(action_type.clone());
            }
        }
        Ok(self.entries)
    }
}

/// Behaviour of a concrete store type.
///
/// ```
/// use flux_store::flux::{Action, ActionTable, Reduction, Store, StoreEvent, StoreRegistry};
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// enum CounterEvent { Change }
///
/// impl StoreEvent for CounterEvent {
///     const ALL: &'static [Self] = &[CounterEvent::Change];
///     fn name(&self) -> &'static str { "change" }
/// }
///
/// struct CounterStore;
///
/// impl CounterStore {
///     fn increment(count: &u32, _: &Action) -> anyhow::Result<Reduction<Self>> {
///         Ok(Reduction::changed(count + 1, CounterEvent::Change))
///     }
/// }
///
/// impl Store for CounterStore {
///     const DISPLAY_NAME: &'static str = "CounterStore";
///     type State = u32;
///     type Event = CounterEvent;
///
///     fn initial_state(_: &StoreRegistry) -> anyhow::Result<u32> { Ok(0) }
///
///     fn actions() -> ActionTable<Self> {
///         ActionTable::new().bind("increment", Self::increment)
///     }
/// }
///
/// let registry = StoreRegistry::default();
/// let counter = registry.get_instance::<CounterStore>().unwrap();
/// registry.dispatcher().dispatch(&Action::new("increment")).unwrap();
/// assert_eq!(counter.get_state(), 1);
/// ```
pub trait Store: Sized + 'static {
    /// Unique name of the store type.
    const DISPLAY_NAME: &'static str;

    type State: Clone + fmt::Debug + 'static;

    type Event: StoreEvent;

    /// State of a freshly created instance. Called once, on first access.
    fn initial_state(registry: &StoreRegistry) -> anyhow::Result<Self::State>;

    /// Handlers to register with the dispatcher.
    fn actions() -> ActionTable<Self>;
}

/// Identifies a change listener on one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Listener<E> {
    id: ListenerId,
    event: E,
    active: Rc<Cell<bool>>,
    callback: Rc<dyn Fn()>,
}

struct StoreInner<S: Store> {
    state: RefCell<S::State>,
    listeners: RefCell<Vec<Listener<S::Event>>>,
    next_listener: Cell<u64>,
    tokens: RefCell<Vec<DispatchToken>>,
}

/// The live instance of store `S`. Clones refer to the same instance.
pub struct StoreHandle<S: Store> {
    inner: Rc<StoreInner<S>>,
}

impl<S: Store> Clone for StoreHandle<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S: Store> fmt::Debug for StoreHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreHandle")
            .field("display_name", &S::DISPLAY_NAME)
            .field("state", &*self.inner.state.borrow())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl<S: Store> StoreHandle<S> {
    pub(crate) fn new(state: S::State) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                state: RefCell::new(state),
                listeners: RefCell::new(Vec::new()),
                next_listener: Cell::new(0),
                tokens: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Register every binding with the dispatcher.
    ///
    /// On failure, registrations made so far are rolled back.
    pub(crate) fn attach(
        &self,
        dispatcher: &Dispatcher,
        bindings: Vec<(ActionType, Handler<S>)>,
    ) -> Result<(), RegistrationError> {
        for (action_type, handler) in bindings {
            let weak = Rc::downgrade(&self.inner);
            let registered = dispatcher.register(action_type, S::DISPLAY_NAME, move |action| {
                match weak.upgrade() {
                    Some(inner) => StoreHandle { inner }.apply(handler, action),
                    None => Ok(()),
                }
            });

            match registered {
                Ok(token) => self.inner.tokens.borrow_mut().push(token),
                Err(err) => {
                    self.detach(dispatcher);
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// Unregister every handler this store registered. Best effort: tokens
    /// that can't be removed right now are logged and dropped.
    pub(crate) fn detach(&self, dispatcher: &Dispatcher) {
        let tokens = std::mem::take(&mut *self.inner.tokens.borrow_mut());
        for token in tokens {
            if let Err(err) = dispatcher.unregister(token) {
                tracing::warn!(store = S::DISPLAY_NAME, token = %token, error = %err, "Failed to unregister handler");
            }
        }
    }

    fn apply(&self, handler: Handler<S>, action: &Action) -> anyhow::Result<()> {
        let reduction = {
            let state = self.inner.state.borrow();
            handler(&*state, action)?
        };

        match reduction {
            Reduction::Unchanged => {
                tracing::trace!(
                    store = S::DISPLAY_NAME,
                    action_type = %action.action_type(),
                    "Action left state unchanged"
                );
            }
            Reduction::Changed { state, event } => {
                *self.inner.state.borrow_mut() = state;
                tracing::debug!(
                    store = S::DISPLAY_NAME,
                    action_type = %action.action_type(),
                    event = event.name(),
                    "State changed"
                );
                self.emit_change(event);
            }
        }
        Ok(())
    }

    pub fn display_name(&self) -> &'static str {
        S::DISPLAY_NAME
    }

    /// Copy of the current state.
    pub fn get_state(&self) -> S::State {
        self.inner.state.borrow().clone()
    }

    /// Read the current state without cloning it.
    pub fn with_state<R>(&self, f: impl FnOnce(&S::State) -> R) -> R {
        f(&*self.inner.state.borrow())
    }

    /// Call `callback` every time `event` is emitted.
    pub fn listen(&self, event: S::Event, callback: impl Fn() + 'static) -> ListenerId {
        self.listen_rc(event, Rc::new(callback))
    }

    fn listen_rc(&self, event: S::Event, callback: Rc<dyn Fn()>) -> ListenerId {
        debug_assert!(S::Event::ALL.contains(&event));
        let id = ListenerId(self.inner.next_listener.get());
        self.inner.next_listener.set(id.0 + 1);
        self.inner.listeners.borrow_mut().push(Listener {
            id,
            event,
            active: Rc::new(Cell::new(true)),
            callback,
        });
        id
    }

    /// Remove a listener. It won't be called again, even by an emission
    /// that is already running. Returns `false` for an unknown id.
    pub fn unlisten(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.borrow_mut();
        match listeners.iter().position(|l| l.id == id) {
            Some(index) => {
                let listener = listeners.remove(index);
                listener.active.set(false);
                true
            }
            None => false,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Synchronously notify every listener of `event`. Listeners get no
    /// payload and re-read the state themselves.
    pub fn emit_change(&self, event: S::Event) {
        let targets: Vec<(Rc<Cell<bool>>, Rc<dyn Fn()>)> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .filter(|l| l.event == event)
            .map(|l| (Rc::clone(&l.active), Rc::clone(&l.callback)))
            .collect();

        tracing::trace!(
            store = S::DISPLAY_NAME,
            event = event.name(),
            listeners = targets.len(),
            "Emitting change"
        );

        for (active, callback) in targets {
            if active.get() {
                callback();
            }
        }
    }

    /// Tokens of the handlers this store registered, in binding order.
    pub fn dispatch_tokens(&self) -> Vec<DispatchToken> {
        self.inner.tokens.borrow().clone()
    }

    /// Whether both handles refer to the same instance.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }
}

/// Object-safe view of a store used by the binder to subscribe to stores of
/// different types.
pub trait ChangeSource {
    fn source_name(&self) -> &'static str;

    /// Listen to every event kind; returns one id per event kind.
    fn subscribe(&self, callback: Rc<dyn Fn()>) -> Vec<ListenerId>;

    fn unsubscribe(&self, ids: &[ListenerId]);

    /// Owned handle to the same store.
    fn to_source(&self) -> Rc<dyn ChangeSource>;
}

impl<S: Store> ChangeSource for StoreHandle<S> {
    fn source_name(&self) -> &'static str {
        S::DISPLAY_NAME
    }

    fn subscribe(&self, callback: Rc<dyn Fn()>) -> Vec<ListenerId> {
        S::Event::ALL
            .iter()
            .map(|event| self.listen_rc(*event, Rc::clone(&callback)))
            .collect()
    }

    fn unsubscribe(&self, ids: &[ListenerId]) {
        for id in ids {
            self.unlisten(*id);
        }
    }

    fn to_source(&self) -> Rc<dyn ChangeSource> {
        Rc::new(self.clone())
    }
}
