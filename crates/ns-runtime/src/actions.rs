use ns_core::{NarrativeError, NsValue};
use serde_json::{Map, Value};

use crate::state::GameStateManager;

/// A validated state mutation. Descriptors are objects with a `type` field
/// (camelCase, snake_case also accepted) plus per-kind fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetVariable { key: String, value: NsValue },
    AddToVariable { key: String, amount: f64 },
    SetFlag { flag: String },
    ClearFlag { flag: String },
    AddToList { list: String, value: NsValue },
    SetList { list: String, values: Vec<NsValue> },
    AddTime { minutes: f64 },
}

impl Action {
    pub fn from_descriptor(descriptor: &Value) -> Result<Self, NarrativeError> {
        let object = descriptor.as_object().ok_or_else(|| {
            NarrativeError::action(
                descriptor.to_string(),
                "Action descriptor must be an object.",
            )
        })?;
        let kind = object
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                NarrativeError::action(descriptor.to_string(), "Action is missing its \"type\".")
            })?;

        let action = match kind {
            "setVariable" | "set_variable" => Self::SetVariable {
                key: required_str(object, descriptor, &["key", "variable"])?,
                value: required_value(object, descriptor, &["value"])?,
            },
            "addToVariable" | "add_to_variable" => Self::AddToVariable {
                key: required_str(object, descriptor, &["key", "variable"])?,
                amount: required_number(object, descriptor, &["value", "amount"])?,
            },
            "setFlag" | "set_flag" => Self::SetFlag {
                flag: required_str(object, descriptor, &["flag", "key"])?,
            },
            "clearFlag" | "clear_flag" => Self::ClearFlag {
                flag: required_str(object, descriptor, &["flag", "key"])?,
            },
            "addToList" | "add_to_list" => Self::AddToList {
                list: required_str(object, descriptor, &["list", "key"])?,
                value: required_value(object, descriptor, &["value", "item"])?,
            },
            "setList" | "set_list" => {
                let list = required_str(object, descriptor, &["list", "key"])?;
                let values = match required_value(object, descriptor, &["values", "value"])? {
                    NsValue::Array(values) => values,
                    other => {
                        return Err(NarrativeError::action(
                            descriptor.to_string(),
                            format!("setList expects a list value, got {}.", other.type_name()),
                        ))
                    }
                };
                Self::SetList { list, values }
            }
            "addTime" | "add_time" => Self::AddTime {
                minutes: required_number(object, descriptor, &["minutes", "value"])?,
            },
            other => {
                return Err(NarrativeError::action(
                    descriptor.to_string(),
                    format!("Unknown action type \"{}\".", other),
                ))
            }
        };
        Ok(action)
    }

    pub fn apply(&self, state: &mut GameStateManager) {
        match self {
            Self::SetVariable { key, value } => state.set_variable(key, value.clone()),
            Self::AddToVariable { key, amount } => {
                state.add_to_variable(key, *amount);
            }
            Self::SetFlag { flag } => state.set_story_flag(flag),
            Self::ClearFlag { flag } => state.clear_story_flag(flag),
            Self::AddToList { list, value } => state.add_to_list(list, value.clone()),
            Self::SetList { list, values } => state.set_list(list, values.clone()),
            Self::AddTime { minutes } => {
                state.add_time(*minutes);
            }
        }
    }
}

/// Validates every descriptor before applying any, so a bad entry leaves the
/// state untouched.
pub fn apply_actions(
    descriptors: &[Value],
    state: &mut GameStateManager,
) -> Result<(), NarrativeError> {
    let actions = descriptors
        .iter()
        .map(Action::from_descriptor)
        .collect::<Result<Vec<_>, _>>()?;
    for action in &actions {
        action.apply(state);
    }
    Ok(())
}

fn field<'a>(object: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .find_map(|name| object.get(*name))
        .filter(|value| !value.is_null())
}

fn required_str(
    object: &Map<String, Value>,
    descriptor: &Value,
    names: &[&str],
) -> Result<String, NarrativeError> {
    match field(object, names) {
        Some(Value::String(value)) if !value.is_empty() => Ok(value.clone()),
        _ => Err(NarrativeError::action(
            descriptor.to_string(),
            format!("Action requires a non-empty string \"{}\".", names[0]),
        )),
    }
}

fn required_value(
    object: &Map<String, Value>,
    descriptor: &Value,
    names: &[&str],
) -> Result<NsValue, NarrativeError> {
    field(object, names)
        .and_then(NsValue::from_json)
        .ok_or_else(|| {
            NarrativeError::action(
                descriptor.to_string(),
                format!("Action requires a \"{}\" value.", names[0]),
            )
        })
}

fn required_number(
    object: &Map<String, Value>,
    descriptor: &Value,
    names: &[&str],
) -> Result<f64, NarrativeError> {
    field(object, names)
        .and_then(Value::as_f64)
        .ok_or_else(|| {
            NarrativeError::action(
                descriptor.to_string(),
                format!("Action requires a numeric \"{}\".", names[0]),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_descriptor_accepts_camel_and_snake_case_kinds() {
        assert_eq!(
            Action::from_descriptor(&json!({ "type": "setFlag", "flag": "met" })).expect("camel"),
            Action::SetFlag {
                flag: "met".to_string()
            }
        );
        assert_eq!(
            Action::from_descriptor(&json!({ "type": "add_time", "minutes": 15 })).expect("snake"),
            Action::AddTime { minutes: 15.0 }
        );
    }

    #[test]
    fn from_descriptor_rejects_unknown_and_malformed_descriptors() {
        for descriptor in [
            json!({ "type": "teleport", "to": "moon" }),
            json!({ "flag": "no-type" }),
            json!("setFlag"),
            json!({ "type": "setVariable", "key": "hp" }),
            json!({ "type": "addToVariable", "key": "hp", "value": "lots" }),
            json!({ "type": "setList", "list": "bag", "values": 3 }),
            json!({ "type": "setFlag", "flag": "" }),
        ] {
            let error = Action::from_descriptor(&descriptor).expect_err("should reject");
            assert_eq!(error.code(), "ACTION_VALIDATION_ERROR", "{}", descriptor);
        }
    }

    #[test]
    fn apply_actions_mutates_state_in_order() {
        let mut state = GameStateManager::new();
        apply_actions(
            &[
                json!({ "type": "setVariable", "key": "gold", "value": 10 }),
                json!({ "type": "addToVariable", "key": "gold", "value": -3 }),
                json!({ "type": "addToVariable", "key": "player.level", "value": 2 }),
                json!({ "type": "setFlag", "flag": "a" }),
                json!({ "type": "setFlag", "flag": "b" }),
                json!({ "type": "clearFlag", "flag": "a" }),
                json!({ "type": "setList", "list": "bag", "values": ["rope"] }),
                json!({ "type": "addToList", "list": "bag", "value": "lamp" }),
                json!({ "type": "addTime", "minutes": 30 }),
            ],
            &mut state,
        )
        .expect("actions should apply");

        assert_eq!(state.get_variable("gold"), Some(NsValue::Number(7.0)));
        assert!(!state.has_story_flag("a"));
        assert!(state.has_story_flag("b"));
        assert_eq!(
            state.get_list("bag"),
            vec![NsValue::from("rope"), NsValue::from("lamp")]
        );
        assert_eq!(state.get_current_time(), 30.0);
        let player = state.get_variable("player").expect("player map");
        assert_eq!(
            player.as_map().and_then(|map| map.get("level")),
            Some(&NsValue::Number(2.0))
        );
    }

    #[test]
    fn apply_actions_leaves_state_untouched_when_any_descriptor_is_invalid() {
        let mut state = GameStateManager::new();
        let error = apply_actions(
            &[
                json!({ "type": "setFlag", "flag": "first" }),
                json!({ "type": "explode" }),
            ],
            &mut state,
        )
        .expect_err("unknown kind");
        assert_eq!(error.code(), "ACTION_VALIDATION_ERROR");
        assert!(!state.has_story_flag("first"));
    }
}
