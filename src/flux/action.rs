//! Actions: immutable, named messages describing an intent.

use std::borrow::Cow;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name of an action, used as the routing key in the dispatcher.
///
/// Action types are usually declared as constants next to the action creators:
///
/// ```
/// use flux_store::flux::ActionType;
///
/// pub const ADD: ActionType = ActionType::from_static("add");
/// assert_eq!(ADD.as_str(), "add");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionType(Cow<'static, str>);

impl ActionType {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for ActionType {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl From<String> for ActionType {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

/// A dispatched message.
///
/// Fields are private: once built, an action cannot be changed. Handlers only
/// ever see it by shared reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "actionType")]
    action_type: ActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<Value>,
}

impl Action {
    /// Action without payload.
    pub fn new(action_type: impl Into<ActionType>) -> Self {
        Self {
            action_type: action_type.into(),
            payload: None,
        }
    }

    /// Action carrying an arbitrary JSON payload.
    pub fn with_payload(action_type: impl Into<ActionType>, payload: Value) -> Self {
        Self {
            action_type: action_type.into(),
            payload: Some(payload),
        }
    }

    pub fn action_type(&self) -> &ActionType {
        &self.action_type
    }

    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    /// Deserialize the payload into a typed value.
    ///
    /// A missing payload is treated as JSON `null`, so `Option<T>` targets
    /// decode to `None`.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match &self.payload {
            Some(value) => T::deserialize(value),
            None => T::deserialize(&Value::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ADD: ActionType = ActionType::from_static("add");

    #[test]
    fn test_static_and_owned_types_compare_equal() {
        assert_eq!(ADD, ActionType::from("add".to_string()));
        assert_eq!(ADD.to_string(), "add");
    }

    #[test]
    fn test_new_action_has_no_payload() {
        let action = Action::new(ADD);
        assert_eq!(action.action_type(), &ADD);
        assert!(action.payload().is_none());
        assert_eq!(action.payload_as::<Option<u32>>().unwrap(), None);
    }

    #[test]
    fn test_payload_as_typed_value() {
        let action = Action::with_payload("set", json!({"value": 7}));

        #[derive(Deserialize)]
        struct Set {
            value: u32,
        }

        let set: Set = action.payload_as().unwrap();
        assert_eq!(set.value, 7);
        assert!(action.payload_as::<String>().is_err());
    }

    #[test]
    fn test_serializes_with_action_type_key() {
        let json = serde_json::to_value(Action::new(ADD)).unwrap();
        assert_eq!(json, json!({"actionType": "add"}));

        let parsed: Action = serde_json::from_value(json!({"actionType": "add", "payload": 1})).unwrap();
        assert_eq!(parsed.payload(), Some(&json!(1)));
    }
}
