use std::collections::BTreeMap;

use ns_core::NsValue;
use rhai::{Array, Dynamic, EvalAltResult, ImmutableString, Map, Position, FLOAT, INT};

pub(crate) const LOOKUP_SYMBOL: &str = "ns_lookup";

pub(crate) fn rhai_function_symbol(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    out
}

/// Helpers live under a private prefix so names like `and`, `not` or `eq`
/// never collide with Rhai keywords or builtins.
pub(crate) fn helper_symbol(name: &str) -> String {
    format!("ns_helper_{}", rhai_function_symbol(name))
}

pub(crate) fn runtime_error(message: impl Into<String>) -> Box<EvalAltResult> {
    Box::new(EvalAltResult::ErrorRuntime(
        Dynamic::from(message.into()),
        Position::NONE,
    ))
}

pub(crate) fn value_to_dynamic(value: Option<&NsValue>) -> Dynamic {
    let Some(value) = value else {
        return Dynamic::UNIT;
    };
    match value {
        NsValue::Bool(value) => Dynamic::from_bool(*value),
        NsValue::Number(value) => Dynamic::from_float(*value as FLOAT),
        NsValue::String(value) => Dynamic::from(value.clone()),
        NsValue::Array(values) => Dynamic::from_array(
            values
                .iter()
                .map(|value| value_to_dynamic(Some(value)))
                .collect::<Array>(),
        ),
        NsValue::Map(values) => {
            let mut map = Map::new();
            for (key, value) in values {
                map.insert(key.clone().into(), value_to_dynamic(Some(value)));
            }
            Dynamic::from_map(map)
        }
    }
}

/// Unit is the evaluator's "absent" value and maps to `None`.
pub(crate) fn dynamic_to_value(value: Dynamic) -> Result<Option<NsValue>, String> {
    if value.is_unit() {
        return Ok(None);
    }
    if value.is::<bool>() {
        return Ok(Some(NsValue::Bool(value.cast::<bool>())));
    }
    if value.is::<INT>() {
        return Ok(Some(NsValue::Number(value.cast::<INT>() as f64)));
    }
    if value.is::<FLOAT>() {
        return Ok(Some(NsValue::Number(value.cast::<FLOAT>())));
    }
    if value.is::<ImmutableString>() {
        return Ok(Some(NsValue::String(
            value.cast::<ImmutableString>().to_string(),
        )));
    }
    if value.is::<char>() {
        return Ok(Some(NsValue::String(value.cast::<char>().to_string())));
    }
    if value.is::<Array>() {
        let array = value.cast::<Array>();
        let mut out = Vec::with_capacity(array.len());
        for item in array {
            if let Some(item) = dynamic_to_value(item)? {
                out.push(item);
            }
        }
        return Ok(Some(NsValue::Array(out)));
    }
    if value.is::<Map>() {
        let map = value.cast::<Map>();
        let mut out = BTreeMap::new();
        for (key, value) in map {
            if let Some(value) = dynamic_to_value(value)? {
                out.insert(key.to_string(), value);
            }
        }
        return Ok(Some(NsValue::Map(out)));
    }

    Err(format!("Unsupported value type \"{}\".", value.type_name()))
}

pub(crate) fn string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}
