//! The node registry: a flat, explicit table pairing each node with the
//! metadata the runtime needs to dispatch it, emitted by the Code Generator
//! alongside the Starlark script it describes. This replaces the reflective
//! "inspect tagged methods on a generated class" discovery of the original
//! implementation — Starlark has no classes, so the metadata lives beside the
//! methods instead of being recovered from them (see `SPEC_FULL.md` §9).

use serde::{Deserialize, Serialize};
use sheet_model::{LutRow, NodeId, PortKey};
use serde_json::Value as JsonValue;

/// A script plus the registry describing how to drive it, for exactly one
/// Sheet Version (the root sheet, or a nested sub-sheet compiled as part of
/// the same unit).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompiledUnit {
    /// The emitted Starlark source. Holds only `def` statements, one per
    /// `function` node; every other variant is handled as a Rust-side
    /// intrinsic and contributes no code here.
    pub script: String,
    pub entries: Vec<RegistryEntry>,
    /// Connections scoped to this unit only (never crosses into a nested
    /// sheet's own `CompiledUnit`).
    pub connections: Vec<sheet_model::Connection>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub node_id: NodeId,
    pub label: String,
    pub kind: NodeKind,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum NodeKind {
    Constant {
        value: JsonValue,
        min: Option<f64>,
        max: Option<f64>,
        options: Vec<String>,
    },
    Input {
        default: Option<JsonValue>,
        min: Option<f64>,
        max: Option<f64>,
        options: Vec<String>,
    },
    Function {
        /// Name of the `def` in `CompiledUnit::script` this entry calls.
        starlark_name: String,
        input_ports: Vec<PortKey>,
        output_ports: Vec<PortKey>,
    },
    Sheet {
        nested: Box<CompiledUnit>,
        /// Maps this node's own input port to the nested Input node it feeds.
        input_map: Vec<(PortKey, NodeId)>,
        /// Maps the nested Output node to this node's own output port.
        output_map: Vec<(PortKey, NodeId)>,
    },
    Lut {
        rows: Vec<LutRow>,
        key_port: PortKey,
        output_ports: Vec<PortKey>,
    },
    Output,
    /// Comment nodes are carried through the registry only so codegen's
    /// emitted `# NODE_ID:` markers line up one-to-one with the source
    /// sheet; the runtime skips them entirely.
    Comment,
}
