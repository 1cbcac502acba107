use crate::flux::{Action, ActionType, DispatchError, Dispatcher};

pub const ADD: ActionType = ActionType::from_static("add");

/// Action creators for the demo. Each builds an action and dispatches it to
/// every registered store.
#[derive(Debug, Clone)]
pub struct DemoActions {
    dispatcher: Dispatcher,
}

impl DemoActions {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn add(&self) -> Result<(), DispatchError> {
        self.dispatcher.dispatch(&Action::new(ADD))
    }
}
