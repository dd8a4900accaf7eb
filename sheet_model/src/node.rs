use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::ids::{NodeId, SheetId, VersionId};

/// The variant tag of a Node. See `spec.md` §3 for the per-variant recognized
/// data-bag fields.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeVariant {
    Constant,
    Input,
    Function,
    Sheet,
    Lut,
    Output,
    Comment,
}

impl NodeVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeVariant::Constant => "constant",
            NodeVariant::Input => "input",
            NodeVariant::Function => "function",
            NodeVariant::Sheet => "sheet",
            NodeVariant::Lut => "lut",
            NodeVariant::Output => "output",
            NodeVariant::Comment => "comment",
        }
    }
}

/// One row of a `lut` node's rows list: `{key, values: {port -> value}}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LutRow {
    pub key: JsonValue,
    pub values: serde_json::Map<String, JsonValue>,
}

/// The free-form data bag carried by a Node. Storage is deliberately untyped
/// (a JSON object) because recognized fields vary by `NodeVariant` and the
/// engine must tolerate extra/missing fields rather than reject them at the
/// model layer; each accessor below does the per-variant extraction that
/// `spec.md` §3's table describes.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeData(pub serde_json::Map<String, JsonValue>);

impl NodeData {
    pub fn value(&self) -> Option<&JsonValue> {
        self.0.get("value")
    }

    pub fn min(&self) -> Option<f64> {
        self.0.get("min").and_then(JsonValue::as_f64)
    }

    pub fn max(&self) -> Option<f64> {
        self.0.get("max").and_then(JsonValue::as_f64)
    }

    pub fn is_option_type(&self) -> bool {
        self.0.get("dataType").and_then(JsonValue::as_str) == Some("option")
    }

    pub fn options(&self) -> Vec<String> {
        self.0
            .get("options")
            .and_then(JsonValue::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_owned))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn code(&self) -> &str {
        self.0.get("code").and_then(JsonValue::as_str).unwrap_or("")
    }

    pub fn sheet_id(&self) -> Option<SheetId> {
        self.0
            .get("sheetId")
            .and_then(JsonValue::as_str)
            .and_then(|s| s.parse().ok())
    }

    pub fn version_id(&self) -> Option<VersionId> {
        self.0
            .get("versionId")
            .and_then(JsonValue::as_str)
            .and_then(|s| s.parse().ok())
    }

    pub fn lut_rows(&self) -> Vec<LutRow> {
        self.0
            .get("lut")
            .and_then(|lut| lut.get("rows"))
            .cloned()
            .and_then(|rows| serde_json::from_value(rows).ok())
            .unwrap_or_default()
    }
}

/// An ordered input or output port declared on a Node, keyed by a string.
pub type PortKey = String;

/// A vertex in a Sheet. See `spec.md` §3.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub variant: NodeVariant,
    pub label: String,
    pub input_ports: Vec<PortKey>,
    pub output_ports: Vec<PortKey>,
    #[serde(default)]
    pub data: NodeData,
}

impl Node {
    pub fn is_comment(&self) -> bool {
        matches!(self.variant, NodeVariant::Comment)
    }
}
