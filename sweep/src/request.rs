use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use sheet_model::NodeId;

/// `Sweep` request envelope. See `spec.md` §6.
#[derive(Clone, Debug, Deserialize)]
pub struct SweepRequest {
    pub input_node_id: NodeId,
    pub start_value: Option<f64>,
    pub end_value: Option<f64>,
    pub increment: Option<f64>,
    #[serde(default)]
    pub manual_values: Option<Vec<JsonValue>>,

    #[serde(default)]
    pub secondary_input_id: Option<NodeId>,
    #[serde(default)]
    pub secondary_start_value: Option<f64>,
    #[serde(default)]
    pub secondary_end_value: Option<f64>,
    #[serde(default)]
    pub secondary_increment: Option<f64>,
    #[serde(default)]
    pub secondary_manual_values: Option<Vec<JsonValue>>,

    pub output_node_ids: Vec<NodeId>,
    #[serde(default)]
    pub input_overrides: BTreeMap<NodeId, String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SweepHeader {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Default, Serialize)]
pub struct SweepResponse {
    pub headers: Vec<SweepHeader>,
    pub results: Vec<Vec<JsonValue>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<Map<String, JsonValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SweepResponse {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            headers: Vec::new(),
            results: Vec::new(),
            metadata: Vec::new(),
            error: Some(message.into()),
        }
    }
}
