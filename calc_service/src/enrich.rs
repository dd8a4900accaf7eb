use std::collections::BTreeMap;

use sandbox_runtime::{CompiledUnit, NodeKind};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use sheet_model::{NodeId, NodeResult};

use crate::serialize::stringify_numbers;

/// The per-node entry of a `Calculate` response: enough to render a node's
/// inputs, outputs, and validity in the sheet editor without re-deriving any
/// of it client-side. See `spec.md` §4.2/§7.
#[derive(Clone, Debug, Serialize)]
pub struct EnrichedNode {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub label: String,
    pub inputs: Map<String, JsonValue>,
    pub outputs: Map<String, JsonValue>,
    pub is_computable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_dependency_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes: Option<BTreeMap<NodeId, EnrichedNode>>,
}

/// Walks a `CompiledUnit`'s registry against the `NodeResult` tree
/// `sandbox_runtime` produced for it, assembling one `EnrichedNode` per
/// entry (recursing into nested sheets along the way).
pub fn enrich(unit: &CompiledUnit, results: &BTreeMap<NodeId, NodeResult>) -> BTreeMap<NodeId, EnrichedNode> {
    let mut inputs_by_target: BTreeMap<NodeId, Map<String, JsonValue>> = BTreeMap::new();
    for conn in &unit.connections {
        let Some(source) = results.get(&conn.source_id) else {
            continue;
        };
        if let Some(value) = source.port(Some(&conn.source_port)) {
            inputs_by_target
                .entry(conn.target_id)
                .or_default()
                .insert(conn.target_port.clone(), value.clone());
        }
    }

    let mut out = BTreeMap::new();
    for entry in &unit.entries {
        let kind_name = match &entry.kind {
            NodeKind::Constant { .. } => "constant",
            NodeKind::Input { .. } => "input",
            NodeKind::Function { .. } => "function",
            NodeKind::Sheet { .. } => "sheet",
            NodeKind::Lut { .. } => "lut",
            NodeKind::Output => "output",
            NodeKind::Comment => "comment",
        };

        let Some(result) = results.get(&entry.node_id) else {
            continue;
        };

        let is_leaf = matches!(entry.kind, NodeKind::Constant { .. } | NodeKind::Input { .. });
        let inputs = if is_leaf {
            Map::new()
        } else {
            inputs_by_target.get(&entry.node_id).cloned().unwrap_or_default()
        };

        let outputs = match &result.value {
            Some(JsonValue::Object(map)) if !is_leaf => map.clone(),
            Some(v) => {
                let mut m = Map::new();
                m.insert("value".to_string(), v.clone());
                m
            }
            None => Map::new(),
        };

        let is_dependency_error = result.internal_error.as_deref() == Some("Dependency failed")
            || (!result.is_computable && result.error.is_none() && result.internal_error.is_some());

        let nested = match (&entry.kind, &result.nodes) {
            (NodeKind::Sheet { nested, .. }, Some(nested_results)) => Some(enrich(nested, nested_results)),
            _ => None,
        };

        out.insert(
            entry.node_id,
            EnrichedNode {
                kind: kind_name,
                label: entry.label.clone(),
                inputs: stringify_map(inputs),
                outputs: stringify_map(outputs),
                is_computable: result.is_computable,
                error: result.error.clone(),
                is_dependency_error,
                nodes: nested,
            },
        );
    }
    out
}

/// Applies [`stringify_numbers`] across a port map's values, so every
/// numeric value reaches the wire as a string (`spec.md` §4.2 step 5).
fn stringify_map(map: Map<String, JsonValue>) -> Map<String, JsonValue> {
    match stringify_numbers(JsonValue::Object(map)) {
        JsonValue::Object(m) => m,
        _ => unreachable!("stringify_numbers preserves the Object variant"),
    }
}
