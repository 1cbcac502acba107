//! Demo wiring: a list store, its action creators and a view bound to it.

mod actions;
mod store;
mod view;

pub use actions::{DemoActions, ADD};
pub use store::{DemoEvent, DemoStore};
pub use view::{items_view_for, nested_tree, ItemsProps, ItemsView};
