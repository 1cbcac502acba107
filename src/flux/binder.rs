//! Binder: connects store change notifications to a view's props.
//!
//! A bound view recomputes its props every time one of its stores changes,
//! pushes them into the view and schedules a re-render. Unbinding (or
//! dropping the [`BoundView`]) removes every subscription.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::store::{ChangeSource, ListenerId};
use crate::render::{Element, MountPoint, RenderQueue, Renderable};

/// A view driven by props derived from stores.
pub trait View: 'static {
    type Props: 'static;

    /// Replace the current props.
    fn receive_props(&mut self, props: Self::Props);

    /// Describe the view for the rendering collaborator.
    fn render(&self) -> Element;
}

type Subscription = (Rc<dyn ChangeSource>, Vec<ListenerId>);

struct BoundCell<V: View> {
    view: RefCell<V>,
    /// Props computed while the view was borrowed, delivered on release.
    deferred: RefCell<Option<V::Props>>,
    compute_props: Box<dyn Fn() -> V::Props>,
    mount: MountPoint,
    bound: Cell<bool>,
    updates: Cell<u64>,
    subscriptions: RefCell<Vec<Subscription>>,
    queue: RenderQueue,
}

impl<V: View> BoundCell<V> {
    fn refresh(self: &Rc<Self>) {
        if !self.bound.get() {
            return;
        }

        let props = (self.compute_props)();
        match self.view.try_borrow_mut() {
            Ok(mut view) => {
                view.receive_props(props);
                self.updates.set(self.updates.get() + 1);
            }
            Err(_) => {
                tracing::trace!(mount = %self.mount, "View in use, props deferred");
                *self.deferred.borrow_mut() = Some(props);
            }
        }

        let weak: Weak<Self> = Rc::downgrade(self);
        let target: Weak<dyn Renderable> = weak;
        self.queue.schedule(target);
    }

    /// Deliver props held back by [`refresh`](Self::refresh), if the view is
    /// free now.
    fn apply_deferred(&self) {
        let Ok(mut view) = self.view.try_borrow_mut() else {
            return;
        };
        if let Some(props) = self.deferred.borrow_mut().take() {
            view.receive_props(props);
            self.updates.set(self.updates.get() + 1);
        }
    }

    fn unbind(&self) {
        if !self.bound.replace(false) {
            return;
        }
        self.deferred.borrow_mut().take();

        let subscriptions = std::mem::take(&mut *self.subscriptions.borrow_mut());
        for (source, ids) in &subscriptions {
            source.unsubscribe(ids);
        }
        tracing::debug!(
            mount = %self.mount,
            stores = subscriptions.len(),
            "View unbound"
        );
    }
}

impl<V: View> Renderable for BoundCell<V> {
    fn mount_point(&self) -> MountPoint {
        self.mount.clone()
    }

    fn render_tree(&self) -> Option<Element> {
        if !self.bound.get() {
            return None;
        }
        self.apply_deferred();
        Some(self.view.borrow().render())
    }
}

/// Creates bound views that schedule their renders on one queue.
#[derive(Debug, Clone, Default)]
pub struct Binder {
    queue: RenderQueue,
}

impl Binder {
    pub fn new(queue: RenderQueue) -> Self {
        Self { queue }
    }

    pub fn queue(&self) -> &RenderQueue {
        &self.queue
    }

    /// Subscribe `view` to every change of every store in `stores`.
    ///
    /// Props are computed and pushed once immediately, and a first render is
    /// scheduled.
    pub fn bind<V, F>(
        &self,
        view: V,
        mount: impl Into<MountPoint>,
        stores: &[&dyn ChangeSource],
        compute_props: F,
    ) -> BoundView<V>
    where
        V: View,
        F: Fn() -> V::Props + 'static,
    {
        let cell = Rc::new(BoundCell {
            view: RefCell::new(view),
            deferred: RefCell::new(None),
            compute_props: Box::new(compute_props),
            mount: mount.into(),
            bound: Cell::new(true),
            updates: Cell::new(0),
            subscriptions: RefCell::new(Vec::with_capacity(stores.len())),
            queue: self.queue.clone(),
        });

        let weak = Rc::downgrade(&cell);
        let on_change: Rc<dyn Fn()> = Rc::new(move || {
            if let Some(cell) = weak.upgrade() {
                cell.refresh();
            }
        });

        for store in stores {
            let ids = store.subscribe(Rc::clone(&on_change));
            if ids.is_empty() {
                tracing::warn!(
                    store = store.source_name(),
                    "Store declares no change events, view will never update from it"
                );
            }
            cell.subscriptions.borrow_mut().push((store.to_source(), ids));
        }

        tracing::debug!(
            mount = %cell.mount,
            stores = ?stores.iter().map(|s| s.source_name()).collect::<Vec<_>>(),
            "View bound"
        );

        cell.refresh();
        BoundView { cell }
    }
}

/// A view subscribed to its stores. Dropping it unbinds.
pub struct BoundView<V: View> {
    cell: Rc<BoundCell<V>>,
}

impl<V: View> fmt::Debug for BoundView<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundView")
            .field("mount", &self.cell.mount)
            .field("bound", &self.cell.bound.get())
            .field("updates", &self.cell.updates.get())
            .finish()
    }
}

impl<V: View> BoundView<V> {
    /// Unsubscribe from every store. The view gets no further props and is
    /// skipped by pending renders. Calling it again does nothing.
    pub fn unbind(&self) {
        self.cell.unbind();
    }

    pub fn is_bound(&self) -> bool {
        self.cell.bound.get()
    }

    pub fn mount_point(&self) -> &MountPoint {
        &self.cell.mount
    }

    /// Number of times props were pushed into the view, including the
    /// initial push at bind time.
    pub fn props_updates(&self) -> u64 {
        self.cell.updates.get()
    }

    /// Read the view. Store changes triggered from inside `f` (an action
    /// creator run on a button press, say) reach the view once `f` returns.
    pub fn with_view<R>(&self, f: impl FnOnce(&V) -> R) -> R {
        let result = f(&*self.cell.view.borrow());
        self.cell.apply_deferred();
        result
    }
}

impl<V: View> Drop for BoundView<V> {
    fn drop(&mut self) {
        self.cell.unbind();
    }
}
