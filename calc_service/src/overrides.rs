use std::collections::BTreeMap;

use serde_json::Value as JsonValue;
use sheet_model::{NodeId, NodeVariant, Sheet};

/// Resolves a caller-supplied `{label-or-id: value}` map to `NodeId`-keyed
/// overrides. A key that matches an `input` node's label wins over a key
/// that happens to also parse as that node's id (see `SPEC_FULL.md`'s
/// documented resolution of this Open Question).
///
/// If the caller supplied no overrides at all, every `input` node's own
/// configured default value is used instead, so a sheet with no caller
/// input still calculates something sensible on a bare `Calculate` call.
pub fn resolve_overrides(sheet: &Sheet, inputs: &BTreeMap<String, JsonValue>) -> BTreeMap<NodeId, JsonValue> {
    if inputs.is_empty() {
        return sheet
            .input_nodes()
            .filter_map(|n| n.data.value().cloned().map(|v| (n.id, v)))
            .collect();
    }

    let by_label: BTreeMap<&str, NodeId> = sheet
        .input_nodes()
        .map(|n| (n.label.as_str(), n.id))
        .collect();
    let by_id: BTreeMap<String, NodeId> = sheet
        .input_nodes()
        .map(|n| (n.id.to_string(), n.id))
        .collect();

    let mut resolved = BTreeMap::new();
    for (key, value) in inputs {
        let node_id = by_label.get(key.as_str()).copied().or_else(|| by_id.get(key).copied());
        if let Some(node_id) = node_id {
            resolved.insert(node_id, value.clone());
        } else {
            log::warn!("input override \"{key}\" does not match any input node by label or id");
        }
    }
    resolved
}

/// Extends a resolved override map with the caller's overrides for any other
/// variant the Code Generator also accepts overrides for (`constant` nodes).
/// Unlike `input` nodes, a `constant` node is never back-filled with its own
/// default when no overrides are supplied: its data-bag value already *is*
/// that default, and `sandbox_runtime` falls back to it directly.
pub fn resolve_constant_overrides(
    sheet: &Sheet,
    inputs: &BTreeMap<String, JsonValue>,
) -> BTreeMap<NodeId, JsonValue> {
    let by_label: BTreeMap<&str, NodeId> = sheet
        .nodes_of(NodeVariant::Constant)
        .map(|n| (n.label.as_str(), n.id))
        .collect();
    let by_id: BTreeMap<String, NodeId> = sheet
        .nodes_of(NodeVariant::Constant)
        .map(|n| (n.id.to_string(), n.id))
        .collect();

    let mut resolved = BTreeMap::new();
    for (key, value) in inputs {
        let node_id = by_label.get(key.as_str()).copied().or_else(|| by_id.get(key).copied());
        if let Some(node_id) = node_id {
            resolved.insert(node_id, value.clone());
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sheet_model::{Node, NodeData, SheetId};

    fn input_node(label: &str, default: Option<JsonValue>) -> Node {
        let mut data = NodeData::default();
        if let Some(v) = default {
            data.0.insert("value".into(), v);
        }
        Node {
            id: NodeId::random(),
            variant: NodeVariant::Input,
            label: label.to_string(),
            input_ports: vec![],
            output_ports: vec!["value".to_string()],
            data,
        }
    }

    fn sheet_with(nodes: Vec<Node>) -> Sheet {
        Sheet {
            id: SheetId::random(),
            name: "Test".into(),
            nodes,
            connections: vec![],
            default_version_id: None,
        }
    }

    #[test]
    fn label_takes_precedence_over_id_lookup() {
        let a = input_node("Flow Rate", Some(json!(1)));
        let a_id = a.id;
        let sheet = sheet_with(vec![a]);

        let mut inputs = BTreeMap::new();
        inputs.insert("Flow Rate".to_string(), json!(99));
        let resolved = resolve_overrides(&sheet, &inputs);
        assert_eq!(resolved.get(&a_id), Some(&json!(99)));
    }

    #[test]
    fn empty_overrides_fall_back_to_node_defaults() {
        let a = input_node("Flow Rate", Some(json!(5)));
        let a_id = a.id;
        let sheet = sheet_with(vec![a]);

        let resolved = resolve_overrides(&sheet, &BTreeMap::new());
        assert_eq!(resolved.get(&a_id), Some(&json!(5)));
    }

    #[test]
    fn unmatched_key_is_dropped() {
        let a = input_node("Flow Rate", Some(json!(1)));
        let sheet = sheet_with(vec![a]);

        let mut inputs = BTreeMap::new();
        inputs.insert("Nonexistent".to_string(), json!(1));
        let resolved = resolve_overrides(&sheet, &inputs);
        assert!(resolved.is_empty());
    }
}
