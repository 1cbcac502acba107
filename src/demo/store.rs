use crate::flux::{Action, ActionTable, Reduction, Store, StoreEvent, StoreRegistry};

use super::actions::ADD;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoEvent {
    Change,
}

impl StoreEvent for DemoEvent {
    const ALL: &'static [Self] = &[DemoEvent::Change];

    fn name(&self) -> &'static str {
        match self {
            DemoEvent::Change => "change",
        }
    }
}

/// Growing list of numbers. Every `add` appends `len + 1`.
pub struct DemoStore;

impl DemoStore {
    fn handle_add(items: &Vec<i64>, _: &Action) -> anyhow::Result<Reduction<Self>> {
        let mut next = items.clone();
        next.push(items.len() as i64 + 1);
        Ok(Reduction::changed(next, DemoEvent::Change))
    }
}

impl Store for DemoStore {
    const DISPLAY_NAME: &'static str = "DemoStore";
    type State = Vec<i64>;
    type Event = DemoEvent;

    fn initial_state(registry: &StoreRegistry) -> anyhow::Result<Self::State> {
        Ok(registry.config().demo.initial_items.clone())
    }

    fn actions() -> ActionTable<Self> {
        ActionTable::new().bind(ADD, Self::handle_add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_appends_length_plus_one() {
        let reduction = DemoStore::handle_add(&vec![1, 2, 3], &Action::new(ADD)).unwrap();
        match reduction {
            Reduction::Changed { state, event } => {
                assert_eq!(state, vec![1, 2, 3, 4]);
                assert_eq!(event, DemoEvent::Change);
            }
            Reduction::Unchanged => panic!("expected Changed"),
        }
    }

    #[test]
    fn test_add_on_empty_list_starts_at_one() {
        let Reduction::Changed { state, .. } = DemoStore::handle_add(&Vec::new(), &Action::new(ADD)).unwrap() else {
            panic!("expected Changed");
        };
        assert_eq!(state, vec![1]);
    }
}
