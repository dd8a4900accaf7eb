//! Executes a compiled Starlark script against its node registry: the
//! restricted evaluator named in `spec.md` §4.1. Runs inside `worker_process`,
//! never directly inside the calling service.

mod engine;
mod error;
mod globals;
mod json_bridge;
mod registry;

pub use engine::{check_def_syntax, run_unit, UnitOutcome};
pub use error::SandboxError;
pub use registry::{CompiledUnit, NodeKind, RegistryEntry};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sheet_model::{Connection, NodeId, NodeResult};
    use std::collections::BTreeMap;

    fn unit_with_single_function() -> (CompiledUnit, NodeId, NodeId, NodeId) {
        let constant_id = NodeId::random();
        let function_id = NodeId::random();
        let output_id = NodeId::random();

        let unit = CompiledUnit {
            script: "def node_fn(x):\n    return x * 2\n".to_string(),
            entries: vec![
                RegistryEntry {
                    node_id: constant_id,
                    label: "A".to_string(),
                    kind: NodeKind::Constant {
                        value: json!(21),
                        min: None,
                        max: None,
                        options: vec![],
                    },
                },
                RegistryEntry {
                    node_id: function_id,
                    label: "Double".to_string(),
                    kind: NodeKind::Function {
                        starlark_name: "node_fn".to_string(),
                        input_ports: vec!["x".to_string()],
                        output_ports: vec!["value".to_string()],
                    },
                },
                RegistryEntry {
                    node_id: output_id,
                    label: "Result".to_string(),
                    kind: NodeKind::Output,
                },
            ],
            connections: vec![
                Connection {
                    source_id: constant_id,
                    source_port: "value".to_string(),
                    target_id: function_id,
                    target_port: "x".to_string(),
                },
                Connection {
                    source_id: function_id,
                    source_port: "value".to_string(),
                    target_id: output_id,
                    target_port: "value".to_string(),
                },
            ],
        };
        (unit, constant_id, function_id, output_id)
    }

    #[test]
    fn runs_constant_through_function_to_output() {
        let (unit, _constant_id, _function_id, output_id) = unit_with_single_function();
        let outcome = run_unit(&unit, &BTreeMap::new()).expect("unit should run");

        let output_result = outcome.nodes.get(&output_id).unwrap();
        assert_eq!(output_result.value, Some(json!(42)));
        assert!(output_result.is_computable);
        assert_eq!(outcome.public_outputs.get("Result").unwrap().value, Some(json!(42)));
    }

    #[test]
    fn override_replaces_constant_value() {
        let (unit, constant_id, _function_id, output_id) = unit_with_single_function();
        let mut overrides = BTreeMap::new();
        overrides.insert(constant_id, json!(10));

        let outcome = run_unit(&unit, &overrides).expect("unit should run");
        assert_eq!(outcome.nodes.get(&output_id).unwrap().value, Some(json!(20)));
    }

    #[test]
    fn cycle_is_reported_as_an_error() {
        let a = NodeId::random();
        let b = NodeId::random();
        let unit = CompiledUnit {
            script: String::new(),
            entries: vec![
                RegistryEntry {
                    node_id: a,
                    label: "A".into(),
                    kind: NodeKind::Output,
                },
                RegistryEntry {
                    node_id: b,
                    label: "B".into(),
                    kind: NodeKind::Output,
                },
            ],
            connections: vec![
                Connection {
                    source_id: a,
                    source_port: "value".into(),
                    target_id: b,
                    target_port: "value".into(),
                },
                Connection {
                    source_id: b,
                    source_port: "value".into(),
                    target_id: a,
                    target_port: "value".into(),
                },
            ],
        };

        assert!(run_unit(&unit, &BTreeMap::new()).is_err());
    }

    #[test]
    fn soft_fail_keeps_the_value_visible_downstream() {
        let constant_id = NodeId::random();
        let output_id = NodeId::random();
        let unit = CompiledUnit {
            script: String::new(),
            entries: vec![
                RegistryEntry {
                    node_id: constant_id,
                    label: "A".into(),
                    kind: NodeKind::Constant {
                        value: json!(150),
                        min: Some(0.0),
                        max: Some(100.0),
                        options: vec![],
                    },
                },
                RegistryEntry {
                    node_id: output_id,
                    label: "Result".into(),
                    kind: NodeKind::Output,
                },
            ],
            connections: vec![Connection {
                source_id: constant_id,
                source_port: "value".into(),
                target_id: output_id,
                target_port: "value".into(),
            }],
        };

        let outcome = run_unit(&unit, &BTreeMap::new()).expect("unit should run");

        let constant_result = outcome.nodes.get(&constant_id).unwrap();
        assert!(constant_result.is_computable, "a range violation is a soft fail, not a hard one");
        assert_eq!(constant_result.value, Some(json!(150)));
        assert!(constant_result.error.is_some());

        let output_result = outcome.nodes.get(&output_id).unwrap();
        assert!(output_result.is_computable, "soft-fail values still flow downstream");
        assert_eq!(output_result.value, Some(json!(150)));
    }

    #[test]
    fn hard_failure_cascades_and_only_surfaces_on_output() {
        let input_id = NodeId::random();
        let function_id = NodeId::random();
        let output_id = NodeId::random();
        let unit = CompiledUnit {
            script: "def node_fn(x):\n    return x * 2\n".to_string(),
            entries: vec![
                RegistryEntry {
                    node_id: input_id,
                    label: "In".into(),
                    kind: NodeKind::Input {
                        default: None,
                        min: None,
                        max: None,
                        options: vec![],
                    },
                },
                RegistryEntry {
                    node_id: function_id,
                    label: "Double".into(),
                    kind: NodeKind::Function {
                        starlark_name: "node_fn".to_string(),
                        input_ports: vec!["x".to_string()],
                        output_ports: vec!["value".to_string()],
                    },
                },
                RegistryEntry {
                    node_id: output_id,
                    label: "Result".into(),
                    kind: NodeKind::Output,
                },
            ],
            connections: vec![
                Connection {
                    source_id: input_id,
                    source_port: "value".into(),
                    target_id: function_id,
                    target_port: "x".into(),
                },
                Connection {
                    source_id: function_id,
                    source_port: "value".into(),
                    target_id: output_id,
                    target_port: "value".into(),
                },
            ],
        };

        let outcome = run_unit(&unit, &BTreeMap::new()).expect("unit should run");

        let input_result = outcome.nodes.get(&input_id).unwrap();
        assert!(!input_result.is_computable);
        assert_eq!(input_result.error.as_deref(), Some("no value supplied for input"));

        let function_result = outcome.nodes.get(&function_id).unwrap();
        assert!(!function_result.is_computable);
        assert_ne!(
            function_result.error.as_deref(),
            Some("Dependency failed"),
            "\"Dependency failed\" is reserved for output nodes, not every downstream node"
        );

        let output_result = outcome.nodes.get(&output_id).unwrap();
        assert!(!output_result.is_computable);
        assert_eq!(output_result.error.as_deref(), Some("Dependency failed"));
    }

    #[test]
    fn missing_input_is_a_hard_failure() {
        let id = NodeId::random();
        let unit = CompiledUnit {
            script: String::new(),
            entries: vec![RegistryEntry {
                node_id: id,
                label: "In".into(),
                kind: NodeKind::Input {
                    default: None,
                    min: None,
                    max: None,
                    options: vec![],
                },
            }],
            connections: vec![],
        };
        let outcome = run_unit(&unit, &BTreeMap::new()).unwrap();
        let result: &NodeResult = outcome.nodes.get(&id).unwrap();
        assert!(!result.is_computable);
    }
}
