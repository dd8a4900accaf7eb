use serde::{Deserialize, Serialize};

use crate::connection::Connection;
use crate::ids::{NodeId, SheetId, VersionId};
use crate::node::{Node, NodeVariant};

/// A graph definition: nodes plus connections. See `spec.md` §3.
///
/// Invariant: every Connection's source and target id refer to Nodes in this
/// same Sheet. Callers that construct a `Sheet` from an external source (a
/// `GraphRepository` implementation) are responsible for upholding this; the
/// Code Generator treats a dangling connection as "no such source" rather
/// than panicking (see `codegen`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Sheet {
    pub id: SheetId,
    pub name: String,
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub default_version_id: Option<VersionId>,
}

impl Sheet {
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn nodes_of(&self, variant: NodeVariant) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.variant == variant)
    }

    pub fn input_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes_of(NodeVariant::Input)
    }

    /// All connections whose target is `target`, keyed implicitly by
    /// `target_port` (callers needing a map should build one via
    /// `connections_by_target`).
    pub fn connections_to(&self, target: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections.iter().filter(move |c| c.target_id == target)
    }

    pub fn sheet_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes_of(NodeVariant::Sheet)
    }
}
