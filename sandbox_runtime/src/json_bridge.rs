//! Conversion between `serde_json::Value` (the wire format used everywhere
//! outside the sandbox) and Starlark's own `Value` (used only for the
//! duration of a single `function` node's call). Nothing that crosses this
//! boundary is allowed to carry a Starlark-specific type back out.

use serde_json::{Map, Number, Value as JsonValue};
use starlark::collections::SmallMap;
use starlark::values::dict::Dict;
use starlark::values::list::ListRef;
use starlark::values::{Heap, Value};

pub fn json_to_value<'v>(heap: &'v Heap, json: &JsonValue) -> Value<'v> {
    match json {
        JsonValue::Null => Value::new_none(),
        JsonValue::Bool(b) => Value::new_bool(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                heap.alloc(i)
            } else {
                heap.alloc(n.as_f64().unwrap_or(0.0))
            }
        }
        JsonValue::String(s) => heap.alloc(s.as_str()),
        JsonValue::Array(items) => {
            let values: Vec<Value<'v>> = items.iter().map(|v| json_to_value(heap, v)).collect();
            heap.alloc(values)
        }
        JsonValue::Object(map) => {
            let mut entries = SmallMap::with_capacity(map.len());
            for (k, v) in map {
                let key = heap.alloc_str(k).to_value();
                let hashed = key.get_hashed().expect("string values are hashable");
                entries.insert_hashed(hashed, json_to_value(heap, v));
            }
            heap.alloc(Dict::new(entries))
        }
    }
}

/// Converts a node's input-port values into Starlark call kwargs, preserving
/// port names.
pub fn ports_to_kwargs<'v>(
    heap: &'v Heap,
    ports: &Map<String, JsonValue>,
) -> Vec<(&'v str, Value<'v>)> {
    ports
        .iter()
        .map(|(k, v)| (heap.alloc_str(k).as_str(), json_to_value(heap, v)))
        .collect()
}

pub fn value_to_json(value: Value<'_>) -> Result<JsonValue, String> {
    if value.is_none() {
        return Ok(JsonValue::Null);
    }
    if let Some(b) = value.unpack_bool() {
        return Ok(JsonValue::Bool(b));
    }
    if let Some(i) = value.unpack_i32() {
        return Ok(JsonValue::Number(Number::from(i)));
    }
    if let Some(s) = value.unpack_str() {
        return Ok(JsonValue::String(s.to_owned()));
    }
    if let Some(list) = ListRef::from_value(value) {
        let items = list
            .iter()
            .map(value_to_json)
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(JsonValue::Array(items));
    }
    if let Some(dict) = Dict::from_value(value) {
        let mut map = Map::with_capacity(dict.len());
        for (k, v) in dict.iter() {
            let key = k
                .unpack_str()
                .ok_or_else(|| "dict keys returned from a function must be strings".to_string())?;
            map.insert(key.to_owned(), value_to_json(v)?);
        }
        return Ok(JsonValue::Object(map));
    }
    if let Some(f) = value.unpack_f64() {
        // `Number::from_f64` rejects NaN/Infinity; represent them as
        // strings rather than silently collapsing to `null`, so a caller
        // can still distinguish "no value" from "not a finite number".
        return Ok(Number::from_f64(f).map(JsonValue::Number).unwrap_or_else(|| JsonValue::String(f.to_string())));
    }
    Err(format!(
        "value of type `{}` cannot cross back out of the sandbox",
        value.get_type()
    ))
}
