use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::ids::NodeId;

/// Produced by execution. See `spec.md` §3.
///
/// Invariant: if `is_computable == false` then `value == None`, unless the
/// failure is a *soft* validation failure, in which case the offending value
/// is still carried so it can flow downstream (see `spec.md` §4.1 "soft
/// fail").
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NodeResult {
    pub value: Option<JsonValue>,
    pub is_computable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes: Option<BTreeMap<NodeId, NodeResult>>,
}

impl NodeResult {
    pub fn success(value: JsonValue) -> Self {
        Self {
            value: Some(value),
            is_computable: true,
            error: None,
            internal_error: None,
            nodes: None,
        }
    }

    /// A soft-fail result: the value still flows, but a warning is attached.
    pub fn soft_fail(value: JsonValue, message: impl Into<String>) -> Self {
        Self {
            value: Some(value),
            is_computable: true,
            error: Some(message.into()),
            internal_error: None,
            nodes: None,
        }
    }

    /// A hard-fail result. `visible_error` is `Some` only when this node is
    /// an output node (or the failure originated in this node directly);
    /// otherwise the failure is suppressed here and only the
    /// `internal_error` carries the cause for downstream cascades.
    pub fn hard_fail(visible_error: Option<String>, internal_error: impl Into<String>) -> Self {
        Self {
            value: None,
            is_computable: false,
            error: visible_error,
            internal_error: Some(internal_error.into()),
            nodes: None,
        }
    }

    pub fn with_nested(mut self, nodes: BTreeMap<NodeId, NodeResult>) -> Self {
        self.nodes = Some(nodes);
        self
    }

    /// The cause to report to a downstream dependent: prefers the internal
    /// (possibly-suppressed) message over the publicly visible one.
    pub fn cascade_cause(&self) -> String {
        self.internal_error
            .clone()
            .or_else(|| self.error.clone())
            .unwrap_or_else(|| "Dependency failed".to_string())
    }

    /// Extract a named port from a multi-output value (function/sheet/lut
    /// results). Falls back to the bare value for single-output nodes where
    /// the caller passes no port or the value isn't a map.
    pub fn port(&self, port: Option<&str>) -> Option<&JsonValue> {
        match (&self.value, port) {
            (Some(JsonValue::Object(map)), Some(p)) => map.get(p),
            (other, _) => other.as_ref(),
        }
    }
}
