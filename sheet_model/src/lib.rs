//! Core data model for the calculation engine: Sheet, Node, Connection,
//! Sheet Version, NodeResult, and the `GraphRepository` collaborator
//! interface. See `spec.md` §3 and `SPEC_FULL.md` §3.

mod connection;
mod ids;
mod node;
mod repository;
mod result;
mod sheet;

pub use connection::Connection;
pub use ids::{NodeId, SheetId, SheetRef, VersionId};
pub use node::{LutRow, Node, NodeData, NodeVariant, PortKey};
pub use repository::{GraphRepository, RepositoryError};
pub use result::NodeResult;
pub use sheet::Sheet;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(id: NodeId, variant: NodeVariant, label: &str) -> Node {
        Node {
            id,
            variant,
            label: label.to_string(),
            input_ports: vec![],
            output_ports: vec![],
            data: NodeData::default(),
        }
    }

    #[test]
    fn node_data_reads_recognized_fields() {
        let mut data = NodeData::default();
        data.0.insert("value".into(), json!(42));
        data.0.insert("min".into(), json!(0));
        data.0.insert("max".into(), json!(100));
        assert_eq!(data.value(), Some(&json!(42)));
        assert_eq!(data.min(), Some(0.0));
        assert_eq!(data.max(), Some(100.0));
        assert!(!data.is_option_type());
    }

    #[test]
    fn node_data_options() {
        let mut data = NodeData::default();
        data.0.insert("dataType".into(), json!("option"));
        data.0.insert("options".into(), json!(["A", "B"]));
        assert!(data.is_option_type());
        assert_eq!(data.options(), vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn sheet_looks_up_nodes_and_connections() {
        let a = NodeId::random();
        let b = NodeId::random();
        let sheet = Sheet {
            id: SheetId::random(),
            name: "Test".into(),
            nodes: vec![
                node(a, NodeVariant::Constant, "A"),
                node(b, NodeVariant::Output, "B"),
            ],
            connections: vec![Connection {
                source_id: a,
                source_port: "value".into(),
                target_id: b,
                target_port: "value".into(),
            }],
            default_version_id: None,
        };

        assert!(sheet.node(a).is_some());
        assert_eq!(sheet.connections_to(b).count(), 1);
        assert_eq!(sheet.nodes_of(NodeVariant::Constant).count(), 1);
    }

    #[test]
    fn node_result_cascade_cause_prefers_internal() {
        let r = NodeResult::hard_fail(None, "division by zero");
        assert_eq!(r.cascade_cause(), "division by zero");
        assert!(!r.is_computable);
        assert!(r.value.is_none());
    }

    #[test]
    fn node_result_soft_fail_keeps_value_and_computable() {
        let r = NodeResult::soft_fail(json!("C"), "not in allowed options: [A, B]");
        assert!(r.is_computable);
        assert_eq!(r.value, Some(json!("C")));
        assert!(r.error.as_ref().unwrap().contains("not in allowed options"));
    }
}
