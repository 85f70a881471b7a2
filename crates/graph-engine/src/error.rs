//! Error types for the graph engine

use thiserror::Error;

use crate::types::{ConnectorKind, NodeId};

/// Result type alias using GraphError
pub type Result<T> = std::result::Result<T, GraphError>;

/// Reason a connection was rejected
///
/// Singularity violations on single-slot ports are not listed here: they
/// trigger replacement of the prior connection, never an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    /// An endpoint references a node that does not exist
    #[error("node '{0}' does not exist")]
    UnknownNode(NodeId),

    /// An endpoint references a port the node does not expose
    #[error("node '{node_id}' has no port '{port}'")]
    UnknownPort { node_id: NodeId, port: String },

    /// Source and target ports carry different kinds
    #[error("kind mismatch: {from_kind} output cannot feed {to_kind} input")]
    KindMismatch {
        from_kind: ConnectorKind,
        to_kind: ConnectorKind,
    },

    /// Source and target are the same node
    #[error("a node cannot connect to itself")]
    SelfLoop,

    /// Target slot index is beyond the currently exposed slots
    #[error("slot {slot} on port '{port}' is out of range ({exposed} exposed)")]
    SlotOutOfRange {
        port: String,
        slot: u32,
        exposed: u32,
    },
}

/// Errors that can occur in the graph engine
#[derive(Debug, Error)]
pub enum GraphError {
    /// Node type key is not present in the registry
    #[error("unknown node type '{0}'")]
    UnknownNodeType(String),

    /// A referenced node instance does not exist
    #[error("node '{0}' not found")]
    NodeNotFound(NodeId),

    /// A referenced multi-input port does not exist on the node
    #[error("node '{node_id}' has no multi-input port '{port}'")]
    UnknownPort { node_id: NodeId, port: String },

    /// A connection violated a structural invariant
    #[error("invalid connection: {0}")]
    InvalidConnection(#[from] ConnectionError),

    /// All slots of a multi-input port are already exposed
    #[error("port '{port}' on node '{node_id}' already exposes all {max} slots")]
    SlotLimitReached {
        node_id: NodeId,
        port: String,
        max: u32,
    },

    /// The workflow contains a dependency cycle
    #[error("workflow contains a cycle involving nodes: {}", nodes.join(", "))]
    CyclicGraph { nodes: Vec<NodeId> },

    /// A settings patch could not be applied
    #[error("settings error: {0}")]
    Settings(String),

    /// Node execution failed
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// The run was cancelled cooperatively
    #[error("run cancelled")]
    Cancelled,

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GraphError {
    /// Create an execution failure with a message
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::ExecutionFailed(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cyclic_graph_lists_nodes() {
        let err = GraphError::CyclicGraph {
            nodes: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "workflow contains a cycle involving nodes: a, b"
        );
    }

    #[test]
    fn test_connection_error_display() {
        let err = GraphError::InvalidConnection(ConnectionError::KindMismatch {
            from_kind: ConnectorKind::Text,
            to_kind: ConnectorKind::Image,
        });
        assert!(err.to_string().contains("kind mismatch"));
    }

    #[test]
    fn test_connection_error_has_no_nested_source() {
        use std::error::Error;
        let err = ConnectionError::KindMismatch {
            from_kind: ConnectorKind::Text,
            to_kind: ConnectorKind::Image,
        };
        assert!(err.source().is_none());
    }
}
