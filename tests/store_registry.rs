mod common;

use common::registry_with_items;
use flux_store::demo::{DemoActions, DemoEvent, DemoStore, ADD};
use flux_store::flux::{
    Action, ActionTable, Reduction, RegistryError, Store, StoreEvent, StoreHandle, StoreRegistry,
};
use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopEvent {
    Change,
}

impl StoreEvent for LoopEvent {
    const ALL: &'static [Self] = &[LoopEvent::Change];

    fn name(&self) -> &'static str {
        "change"
    }
}

/// Asks the registry for itself while initializing.
struct SelfReferencing;

impl Store for SelfReferencing {
    const DISPLAY_NAME: &'static str = "SelfReferencing";
    type State = ();
    type Event = LoopEvent;

    fn initial_state(registry: &StoreRegistry) -> anyhow::Result<()> {
        registry.get_instance::<SelfReferencing>()?;
        Ok(())
    }

    fn actions() -> ActionTable<Self> {
        ActionTable::new()
    }
}

/// Derives its starting total from the demo store.
struct TotalStore;

impl TotalStore {
    fn add_one(total: &i64, _: &Action) -> anyhow::Result<Reduction<Self>> {
        Ok(Reduction::changed(total + 1, LoopEvent::Change))
    }
}

impl Store for TotalStore {
    const DISPLAY_NAME: &'static str = "TotalStore";
    type State = i64;
    type Event = LoopEvent;

    fn initial_state(registry: &StoreRegistry) -> anyhow::Result<i64> {
        let demo = registry.get_instance::<DemoStore>()?;
        Ok(demo.with_state(|items| items.iter().sum()))
    }

    fn actions() -> ActionTable<Self> {
        ActionTable::new().bind(ADD, Self::add_one)
    }
}

#[test]
fn test_get_instance_returns_identical_instance() {
    let registry = registry_with_items(vec![1, 2, 3]);
    let first = registry.get_instance::<DemoStore>().unwrap();
    let second = registry.get_instance::<DemoStore>().unwrap();

    assert!(StoreHandle::ptr_eq(&first, &second));
    assert_eq!(registry.dispatcher().handler_count(&ADD), 1);
}

#[test]
fn test_store_created_lazily() {
    let registry = registry_with_items(vec![1, 2, 3]);
    assert!(!registry.is_initialized::<DemoStore>());
    assert!(registry.store_names().is_empty());

    let store = registry.get_instance::<DemoStore>().unwrap();

    assert!(registry.is_initialized::<DemoStore>());
    assert_eq!(registry.store_names(), vec!["DemoStore"]);
    assert_eq!(store.display_name(), "DemoStore");
}

#[test]
fn test_recursive_initialization_fails() {
    let registry = StoreRegistry::default();
    let err = registry.get_instance::<SelfReferencing>().unwrap_err();

    assert!(matches!(
        err,
        RegistryError::RecursiveInitialization {
            store: "SelfReferencing"
        }
    ));
    assert!(!registry.is_initialized::<SelfReferencing>());
}

#[test]
fn test_store_may_depend_on_another_store() {
    let registry = registry_with_items(vec![1, 2, 3]);
    let total = registry.get_instance::<TotalStore>().unwrap();

    assert_eq!(total.get_state(), 6);
    assert_eq!(registry.store_names(), vec!["DemoStore", "TotalStore"]);

    // DemoStore was created first, so its handler runs first.
    let demo = registry.get_instance::<DemoStore>().unwrap();
    registry.dispatcher().dispatch(&Action::new(ADD)).unwrap();
    assert_eq!(demo.get_state(), vec![1, 2, 3, 4]);
    assert_eq!(total.get_state(), 7);
}

#[test]
fn test_state_reflects_every_dispatch_in_order() {
    let registry = registry_with_items(vec![1, 2, 3]);
    let store = registry.get_instance::<DemoStore>().unwrap();
    let actions = DemoActions::new(registry.dispatcher().clone());

    let mut snapshots = Vec::new();
    for _ in 0..3 {
        actions.add().unwrap();
        snapshots.push(store.get_state());
    }

    assert_eq!(
        snapshots,
        vec![
            vec![1, 2, 3, 4],
            vec![1, 2, 3, 4, 5],
            vec![1, 2, 3, 4, 5, 6],
        ]
    );
}

#[test]
fn test_get_state_is_a_copy() {
    let registry = registry_with_items(vec![1, 2, 3]);
    let store = registry.get_instance::<DemoStore>().unwrap();

    let mut snapshot = store.get_state();
    snapshot.clear();

    assert_eq!(store.get_state(), vec![1, 2, 3]);
}

#[test]
fn test_change_event_emitted_after_state_update() {
    let registry = registry_with_items(vec![]);
    let store = registry.get_instance::<DemoStore>().unwrap();
    let seen_len = Rc::new(Cell::new(0));

    let s = store.clone();
    let seen = seen_len.clone();
    store.listen(DemoEvent::Change, move || seen.set(s.with_state(Vec::len)));

    registry.dispatcher().dispatch(&Action::new(ADD)).unwrap();
    registry.dispatcher().dispatch(&Action::new(ADD)).unwrap();

    assert_eq!(seen_len.get(), 2);
    assert_eq!(store.get_state(), vec![1, 2]);
}
