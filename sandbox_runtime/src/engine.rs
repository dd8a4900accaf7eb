use std::collections::BTreeMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use serde_json::{Map, Value as JsonValue};
use sheet_model::{NodeId, NodeResult, PortKey};
use starlark::environment::{Globals, GlobalsBuilder, Module};
use starlark::eval::Evaluator;
use starlark::syntax::{AstModule, Dialect};
use starlark::values::FrozenModule;

use crate::error::SandboxError;
use crate::globals::sandbox_globals;
use crate::json_bridge::{json_to_value, value_to_json};
use crate::registry::{CompiledUnit, NodeKind, RegistryEntry};

/// The outcome of running one `CompiledUnit`: the per-node result tree (for
/// nesting inside a parent Sheet node's own `NodeResult::nodes`), the value
/// of this unit's own output ports (for a Sheet node's parent to consume),
/// and the public-outputs map contributed by this unit and everything nested
/// inside it.
#[derive(serde::Serialize, serde::Deserialize)]
pub struct UnitOutcome {
    pub nodes: BTreeMap<NodeId, NodeResult>,
    pub ports: BTreeMap<PortKey, NodeResult>,
    pub public_outputs: BTreeMap<String, NodeResult>,
    /// Diagnostics raised when two public-output labels collided; the later
    /// one (in topological order) wins, per the documented resolution of
    /// that Open Question.
    pub collisions: Vec<String>,
}

/// Parses `unit.script` and runs every node in `unit.entries` in topological
/// order, applying `overrides` (already resolved from label to `NodeId` by
/// the caller) to `constant`/`input` nodes. Called only for the root sheet of
/// a `Calculate`/`Sweep` request; a nested `sheet` node runs its target
/// through `run_unit_nested` instead, so an `input` node's stored default
/// back-fills a missing override only at the root (`spec.md` §4.5 step 1).
pub fn run_unit(
    unit: &CompiledUnit,
    overrides: &BTreeMap<NodeId, JsonValue>,
) -> Result<UnitOutcome, SandboxError> {
    run_unit_any(unit, overrides, true)
}

/// Runs a nested sheet's compiled unit: like `run_unit`, but an `input` node
/// with no caller-supplied override hard-fails instead of falling back to
/// its stored default (`spec.md` §4.5 step 1, "no fallback" for nested use).
fn run_unit_nested(
    unit: &CompiledUnit,
    overrides: &BTreeMap<NodeId, JsonValue>,
) -> Result<UnitOutcome, SandboxError> {
    run_unit_any(unit, overrides, false)
}

fn run_unit_any(
    unit: &CompiledUnit,
    overrides: &BTreeMap<NodeId, JsonValue>,
    is_root: bool,
) -> Result<UnitOutcome, SandboxError> {
    let globals = build_globals();
    let module = Module::new();

    {
        let ast = AstModule::parse("sheet.star", unit.script.clone(), &Dialect::Standard)
            .map_err(|e| SandboxError::Parse(e.to_string()))?;
        let mut eval = Evaluator::new(&module);
        eval.eval_module(ast, &globals)
            .map_err(|e| SandboxError::Parse(e.to_string()))?;
    }
    let frozen = module
        .freeze()
        .map_err(|e| SandboxError::Globals(e.to_string()))?;

    run_unit_frozen(unit, overrides, &globals, &frozen, is_root)
}

fn build_globals() -> Globals {
    GlobalsBuilder::standard().with(sandbox_globals).build()
}

/// Parses a single generated `def` block in isolation, so `codegen` can
/// parse-check each `function` node's body independently at compile time: a
/// syntax error in one node must become that node's own runtime failure, not
/// a parse failure for the whole joined script (`spec.md` §4.1/§4.4/§7).
pub fn check_def_syntax(def_source: &str) -> Result<(), String> {
    AstModule::parse("node.star", def_source.to_string(), &Dialect::Standard)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

fn run_unit_frozen(
    unit: &CompiledUnit,
    overrides: &BTreeMap<NodeId, JsonValue>,
    globals: &Globals,
    frozen: &FrozenModule,
    is_root: bool,
) -> Result<UnitOutcome, SandboxError> {
    let order = topological_order(unit)?;

    let mut results: BTreeMap<NodeId, NodeResult> = BTreeMap::new();
    let mut by_label: BTreeMap<&str, &RegistryEntry> = BTreeMap::new();
    for entry in &unit.entries {
        by_label.insert(entry.label.as_str(), entry);
    }

    let mut public_outputs: BTreeMap<String, NodeResult> = BTreeMap::new();
    let mut collisions = Vec::new();
    let mut unit_ports: BTreeMap<PortKey, NodeResult> = BTreeMap::new();

    for node_id in order {
        let entry = unit
            .entries
            .iter()
            .find(|e| e.node_id == node_id)
            .expect("toposort only yields known node ids");

        if matches!(entry.kind, NodeKind::Comment) {
            continue;
        }

        let inputs = gather_inputs(unit, &results, node_id);
        let has_upstream = !matches!(entry.kind, NodeKind::Constant { .. } | NodeKind::Input { .. });
        let blocked = if has_upstream {
            dependency_failure(unit, &results, node_id)
        } else {
            None
        };

        let result = if let Some(cause) = blocked {
            let visible = if matches!(entry.kind, NodeKind::Output) {
                Some("Dependency failed".to_string())
            } else {
                None
            };
            NodeResult::hard_fail(visible, cause)
        } else {
        match &entry.kind {
            NodeKind::Constant { value, min, max, options } => {
                let raw = overrides.get(&node_id).cloned().unwrap_or_else(|| value.clone());
                validate_scalar(raw, *min, *max, options)
            }
            NodeKind::Input { default, min, max, options } => {
                let fallback = if is_root { default.clone() } else { None };
                match overrides.get(&node_id).cloned().or(fallback) {
                    Some(raw) => validate_scalar(raw, *min, *max, options),
                    None => NodeResult::hard_fail(
                        Some("no value supplied for input".to_string()),
                        "missing required input",
                    ),
                }
            }
            NodeKind::Function {
                starlark_name,
                input_ports,
                ..
            } => evaluate_function(globals, frozen, starlark_name, input_ports, &inputs),
            NodeKind::Sheet {
                nested,
                input_map,
                output_map,
            } => evaluate_sheet(nested, input_map, output_map, &inputs, &mut public_outputs, &mut collisions),
            NodeKind::Lut { rows, key_port, output_ports } => {
                evaluate_lut(rows, key_port, output_ports, &inputs)
            }
            NodeKind::Output => evaluate_output(&inputs),
            NodeKind::Comment => unreachable!(),
        }
        };

        if matches!(entry.kind, NodeKind::Output) {
            unit_ports.insert(entry.label.clone(), result.clone());
        }
        if matches!(entry.kind, NodeKind::Constant { .. } | NodeKind::Output) {
            insert_public_output(&mut public_outputs, &mut collisions, entry.label.clone(), result.clone());
        }

        results.insert(node_id, result);
    }

    Ok(UnitOutcome {
        nodes: results,
        ports: unit_ports,
        public_outputs,
        collisions,
    })
}

fn topological_order(unit: &CompiledUnit) -> Result<Vec<NodeId>, SandboxError> {
    let mut graph: DiGraphMap<NodeId, ()> = DiGraphMap::new();
    for entry in &unit.entries {
        graph.add_node(entry.node_id);
    }
    for conn in &unit.connections {
        graph.add_edge(conn.source_id, conn.target_id, ());
    }
    toposort(&graph, None).map_err(|cycle| {
        SandboxError::Cycle(format!("sheet contains a cycle at node {}", cycle.node_id()))
    })
}

/// Collects, for `node_id`, a port->value map built from whatever its
/// upstream connections have already produced. A hard-failed upstream
/// dependency is *not* represented here: callers must check it separately
/// via `dependency_failure`.
fn gather_inputs(
    unit: &CompiledUnit,
    results: &BTreeMap<NodeId, NodeResult>,
    node_id: NodeId,
) -> Map<String, JsonValue> {
    let mut inputs = Map::new();
    for conn in unit.connections.iter().filter(|c| c.target_id == node_id) {
        if let Some(source) = results.get(&conn.source_id) {
            if let Some(value) = source.port(Some(&conn.source_port)) {
                inputs.insert(conn.target_port.clone(), value.clone());
            }
        }
    }
    inputs
}

fn dependency_failure(
    unit: &CompiledUnit,
    results: &BTreeMap<NodeId, NodeResult>,
    node_id: NodeId,
) -> Option<String> {
    unit.connections
        .iter()
        .filter(|c| c.target_id == node_id)
        .find_map(|c| results.get(&c.source_id).filter(|r| !r.is_computable))
        .map(|r| r.cascade_cause())
}

fn validate_scalar(
    value: JsonValue,
    min: Option<f64>,
    max: Option<f64>,
    options: &[String],
) -> NodeResult {
    if !options.is_empty() {
        if let Some(s) = value.as_str() {
            if !options.iter().any(|o| o == s) {
                return NodeResult::soft_fail(
                    value,
                    format!("\"{s}\" is not one of the allowed options: [{}]", options.join(", ")),
                );
            }
        }
        return NodeResult::success(value);
    }
    if let Some(n) = value.as_f64() {
        if let Some(min) = min {
            if n < min {
                return NodeResult::soft_fail(value, format!("{n} is below the minimum of {min}"));
            }
        }
        if let Some(max) = max {
            if n > max {
                return NodeResult::soft_fail(value, format!("{n} is above the maximum of {max}"));
            }
        }
    }
    NodeResult::success(value)
}

fn evaluate_function(
    globals: &Globals,
    frozen: &FrozenModule,
    starlark_name: &str,
    input_ports: &[PortKey],
    inputs: &Map<String, JsonValue>,
) -> NodeResult {
    let func = match frozen.get(starlark_name) {
        Ok(f) => f,
        Err(e) => {
            return NodeResult::hard_fail(None, format!("function body not found: {e}"));
        }
    };

    let module = Module::new();
    let mut eval = Evaluator::new(&module);
    let heap = module.heap();
    let func_value = func.owned_value(&module);

    let args: Vec<(&str, starlark::values::Value)> = input_ports
        .iter()
        .map(|port| {
            let value = inputs
                .get(port)
                .map(|v| json_to_value(heap, v))
                .unwrap_or_else(starlark::values::Value::new_none);
            (port.as_str(), value)
        })
        .collect();

    let _ = globals;
    match eval.eval_function(func_value, &[], &args) {
        Ok(result) => match value_to_json(result) {
            Ok(json) => NodeResult::success(json),
            Err(e) => NodeResult::hard_fail(None, e),
        },
        Err(e) => NodeResult::hard_fail(None, e.to_string()),
    }
}

fn evaluate_sheet(
    nested: &CompiledUnit,
    input_map: &[(PortKey, NodeId)],
    output_map: &[(PortKey, NodeId)],
    inputs: &Map<String, JsonValue>,
    parent_public_outputs: &mut BTreeMap<String, NodeResult>,
    parent_collisions: &mut Vec<String>,
) -> NodeResult {
    let mut nested_overrides = BTreeMap::new();
    for (port, node_id) in input_map {
        if let Some(value) = inputs.get(port) {
            nested_overrides.insert(*node_id, value.clone());
        }
    }

    match run_unit_nested(nested, &nested_overrides) {
        Ok(outcome) => {
            for (label, result) in outcome.public_outputs {
                insert_public_output(parent_public_outputs, parent_collisions, label, result);
            }
            parent_collisions.extend(outcome.collisions);

            let mut value = Map::new();
            for (port, node_id) in output_map {
                if let Some(result) = outcome.nodes.get(node_id) {
                    if let Some(v) = result.value.clone() {
                        value.insert(port.clone(), v);
                    }
                }
            }
            let any_hard_fail = output_map
                .iter()
                .filter_map(|(_, node_id)| outcome.nodes.get(node_id))
                .any(|r| !r.is_computable);

            let mut result = if any_hard_fail {
                NodeResult::hard_fail(None, "nested sheet contains a failing output")
            } else {
                NodeResult::success(JsonValue::Object(value))
            };
            result = result.with_nested(outcome.nodes);
            result
        }
        Err(e) => NodeResult::hard_fail(None, e.to_string()),
    }
}

fn evaluate_lut(
    rows: &[sheet_model::LutRow],
    key_port: &str,
    output_ports: &[PortKey],
    inputs: &Map<String, JsonValue>,
) -> NodeResult {
    let Some(key) = inputs.get(key_port) else {
        return NodeResult::hard_fail(None, "no key supplied to lookup table");
    };

    match rows.iter().find(|row| &row.key == key) {
        Some(row) => {
            let mut out = Map::new();
            for port in output_ports {
                if let Some(v) = row.values.get(port) {
                    out.insert(port.clone(), v.clone());
                }
            }
            NodeResult::success(JsonValue::Object(out))
        }
        None => NodeResult::hard_fail(None, format!("no lookup table row matches key {key}")),
    }
}

/// An Output node always has a single input port named `value` by
/// convention; the Code Generator wires every connection into it under
/// that name regardless of the upstream node's own port naming.
fn evaluate_output(inputs: &Map<String, JsonValue>) -> NodeResult {
    match inputs.get("value") {
        Some(v) => NodeResult::success(v.clone()),
        None => NodeResult::hard_fail(Some("Dependency failed".to_string()), "no upstream value"),
    }
}

fn insert_public_output(
    map: &mut BTreeMap<String, NodeResult>,
    collisions: &mut Vec<String>,
    label: String,
    result: NodeResult,
) {
    if map.contains_key(&label) {
        collisions.push(format!("label \"{label}\" is used by more than one public output; the later one wins"));
    }
    map.insert(label, result);
}
