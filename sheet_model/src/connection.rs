use serde::{Deserialize, Serialize};

use crate::ids::NodeId;
use crate::node::PortKey;

/// A directed edge between a source node's output port and a target node's
/// input port. See `spec.md` §3.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Connection {
    pub source_id: NodeId,
    pub source_port: PortKey,
    pub target_id: NodeId,
    pub target_port: PortKey,
}
