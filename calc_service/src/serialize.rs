use serde_json::{Map, Value as JsonValue};

/// Converts every JSON number into its string form, recursively, leaving
/// booleans, null, strings, arrays, and objects as-is. The wire format for
/// `Calculate`/`Sweep` responses never carries a native JSON number, so a
/// `NaN` or `Infinity` produced mid-calculation (which JSON itself cannot
/// represent) already became a string earlier in the pipeline and survives
/// transport unchanged (see `spec.md` §4.2 step 5).
pub fn stringify_numbers(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::Number(n) => JsonValue::String(n.to_string()),
        JsonValue::Array(items) => JsonValue::Array(items.into_iter().map(stringify_numbers).collect()),
        JsonValue::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k, stringify_numbers(v));
            }
            JsonValue::Object(out)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_become_strings_recursively() {
        let input = json!({"a": 1, "b": [2, 3.5, null, true], "c": "text"});
        let out = stringify_numbers(input);
        assert_eq!(out, json!({"a": "1", "b": ["2", "3.5", null, true], "c": "text"}));
    }
}
