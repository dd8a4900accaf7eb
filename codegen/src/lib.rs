//! Compiles a Sheet tree into the `CompiledUnit`s `sandbox_runtime` executes,
//! and separately renders the same tree as a human-readable script for the
//! `EmitScript` operation. See `spec.md` §4.3/§4.4.

mod compile;
mod emit;
mod error;
mod identifier;

pub use compile::Compiler;
pub use emit::emit_script;
pub use error::CodegenError;

#[cfg(test)]
mod tests {
    use super::*;
    use sandbox_runtime::NodeKind;
    use serde_json::json;
    use sheet_model::testing::InMemoryRepository;
    use sheet_model::{Connection, Node, NodeData, NodeVariant, Sheet, SheetId, SheetRef};

    fn node(variant: NodeVariant, label: &str, data: NodeData) -> Node {
        Node {
            id: sheet_model::NodeId::random(),
            variant,
            label: label.to_string(),
            input_ports: match variant {
                NodeVariant::Function => vec!["x".to_string()],
                NodeVariant::Output => vec!["value".to_string()],
                _ => vec![],
            },
            output_ports: match variant {
                NodeVariant::Function | NodeVariant::Constant | NodeVariant::Input => {
                    vec!["value".to_string()]
                }
                _ => vec![],
            },
            data,
        }
    }

    fn simple_sheet() -> Sheet {
        let mut constant_data = NodeData::default();
        constant_data.0.insert("value".into(), json!(21));
        let constant = node(NodeVariant::Constant, "A", constant_data);

        let mut function_data = NodeData::default();
        function_data.0.insert("code".into(), json!("value = x * 2"));
        let function = node(NodeVariant::Function, "Double It", function_data);

        let output = node(NodeVariant::Output, "Result", NodeData::default());

        Sheet {
            id: SheetId::random(),
            name: "Simple".to_string(),
            connections: vec![
                Connection {
                    source_id: constant.id,
                    source_port: "value".to_string(),
                    target_id: function.id,
                    target_port: "x".to_string(),
                },
                Connection {
                    source_id: function.id,
                    source_port: "value".to_string(),
                    target_id: output.id,
                    target_port: "value".to_string(),
                },
            ],
            nodes: vec![constant, function, output],
            default_version_id: None,
        }
    }

    #[tokio::test]
    async fn compiles_function_node_into_a_def() {
        let sheet = simple_sheet();
        let sheet_id = sheet.id;
        let repo = InMemoryRepository::new().with_sheet(sheet);

        let mut compiler = Compiler::new(&repo);
        let unit = compiler.compile(SheetRef::root(sheet_id)).await.unwrap();

        assert!(unit.script.contains("def node_Double_It"));
        let function_entries: Vec<_> = unit
            .entries
            .iter()
            .filter(|e| matches!(e.kind, NodeKind::Function { .. }))
            .collect();
        assert_eq!(function_entries.len(), 1);
    }

    #[tokio::test]
    async fn emits_readable_script_with_node_id_markers() {
        let sheet = simple_sheet();
        let sheet_id = sheet.id;
        let repo = InMemoryRepository::new().with_sheet(sheet);

        let script = emit_script(&repo, SheetRef::root(sheet_id)).await.unwrap();
        assert!(script.contains("# NODE_ID:"));
        assert!(script.contains("constant A"));
        assert!(script.contains("output Result"));
    }

    #[tokio::test]
    async fn recompiling_the_same_sheet_is_idempotent() {
        let sheet = simple_sheet();
        let sheet_id = sheet.id;
        let repo = InMemoryRepository::new().with_sheet(sheet);

        let mut first_compiler = Compiler::new(&repo);
        let first = first_compiler.compile(SheetRef::root(sheet_id)).await.unwrap();

        let mut second_compiler = Compiler::new(&repo);
        let second = second_compiler.compile(SheetRef::root(sheet_id)).await.unwrap();

        assert_eq!(first.script, second.script);
        assert_eq!(first.entries.len(), second.entries.len());
        for (a, b) in first.entries.iter().zip(second.entries.iter()) {
            assert_eq!(a.node_id, b.node_id);
            assert_eq!(a.label, b.label);
        }

        let first_emitted = emit_script(&repo, SheetRef::root(sheet_id)).await.unwrap();
        let second_emitted = emit_script(&repo, SheetRef::root(sheet_id)).await.unwrap();
        assert_eq!(first_emitted, second_emitted);
    }

    #[tokio::test]
    async fn nested_sheet_cycle_is_rejected() {
        let mut sheet_a = simple_sheet();
        let sheet_a_id = sheet_a.id;

        let mut sheet_node_data = NodeData::default();
        sheet_node_data.0.insert("sheetId".into(), json!(sheet_a_id.to_string()));
        let sheet_node = node(NodeVariant::Sheet, "Recurse", sheet_node_data);
        sheet_a.nodes.push(sheet_node);

        let repo = InMemoryRepository::new().with_sheet(sheet_a);
        let mut compiler = Compiler::new(&repo);
        let result = compiler.compile(SheetRef::root(sheet_a_id)).await;
        assert!(result.is_err());
    }
}
