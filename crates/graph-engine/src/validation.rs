//! Workflow validation
//!
//! Mutation-time checks keep an in-memory workflow consistent, but imported
//! JSON arrives from outside those guarantees. [`validate_workflow`] checks
//! a whole graph against a registry and reports every problem found rather
//! than stopping at the first, so a UI can surface all of them at once.

use std::collections::{HashMap, HashSet};

use crate::graph::Workflow;
use crate::registry::NodeTypeRegistry;
use crate::scheduler::execution_order;

/// A single problem found while validating a workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// A node references a type key the registry does not know
    UnknownNodeType { node_id: String, type_key: String },
    /// Two nodes share the same id
    DuplicateNodeId { node_id: String },
    /// A node's settings shape does not match what its type declares
    SettingsMismatch {
        node_id: String,
        type_key: String,
        settings_type: String,
    },
    /// A connection endpoint references a missing node
    DanglingNode { node_id: String },
    /// A connection endpoint references a missing port
    DanglingPort { node_id: String, port: String },
    /// A connection links ports of different kinds
    KindMismatch {
        source_node: String,
        source_port: String,
        target_node: String,
        target_port: String,
    },
    /// A connection connects a node to itself
    SelfLoop { node_id: String },
    /// A connection targets a slot beyond the port's capacity
    SlotOutOfRange {
        node_id: String,
        port: String,
        slot: u32,
        max: u32,
    },
    /// Two connections occupy the same input slot
    DuplicateSlot {
        node_id: String,
        port: String,
        slot: u32,
    },
    /// The graph contains a dependency cycle
    Cycle { nodes: Vec<String> },
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownNodeType { node_id, type_key } => {
                write!(f, "node '{node_id}' has unknown type '{type_key}'")
            }
            Self::DuplicateNodeId { node_id } => {
                write!(f, "duplicate node id '{node_id}'")
            }
            Self::SettingsMismatch {
                node_id,
                type_key,
                settings_type,
            } => write!(
                f,
                "node '{node_id}' of type '{type_key}' carries '{settings_type}' settings"
            ),
            Self::DanglingNode { node_id } => {
                write!(f, "connection references missing node '{node_id}'")
            }
            Self::DanglingPort { node_id, port } => {
                write!(f, "connection references missing port '{port}' on node '{node_id}'")
            }
            Self::KindMismatch {
                source_node,
                source_port,
                target_node,
                target_port,
            } => write!(
                f,
                "kind mismatch: {source_node}.{source_port} cannot feed {target_node}.{target_port}"
            ),
            Self::SelfLoop { node_id } => {
                write!(f, "node '{node_id}' connects to itself")
            }
            Self::SlotOutOfRange {
                node_id,
                port,
                slot,
                max,
            } => write!(
                f,
                "slot {slot} on {node_id}.{port} exceeds the port's {max}-slot capacity"
            ),
            Self::DuplicateSlot { node_id, port, slot } => {
                write!(f, "slot {slot} on {node_id}.{port} is occupied twice")
            }
            Self::Cycle { nodes } => {
                write!(f, "cycle involving nodes: {}", nodes.join(", "))
            }
        }
    }
}

/// Validate a workflow against a registry, collecting every issue found
///
/// An empty result means the graph is structurally sound and safe to run.
pub fn validate_workflow(workflow: &Workflow, registry: &NodeTypeRegistry) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    let mut seen_ids = HashSet::new();
    for node in &workflow.nodes {
        if !seen_ids.insert(node.id.as_str()) {
            issues.push(ValidationIssue::DuplicateNodeId {
                node_id: node.id.clone(),
            });
        }
        match registry.get(&node.type_key) {
            None => issues.push(ValidationIssue::UnknownNodeType {
                node_id: node.id.clone(),
                type_key: node.type_key.clone(),
            }),
            // Type keys are registry-defined, so the settings shape is
            // compared against what the definition declares, not the tag
            Some(definition) => {
                if node.settings.type_key() != definition.default_settings.type_key() {
                    issues.push(ValidationIssue::SettingsMismatch {
                        node_id: node.id.clone(),
                        type_key: node.type_key.clone(),
                        settings_type: node.settings.type_key().to_string(),
                    });
                }
            }
        }
    }

    let mut occupied: HashMap<(&str, &str, u32), usize> = HashMap::new();
    for connection in &workflow.connections {
        let source_node = workflow.node(&connection.source.node_id);
        let target_node = workflow.node(&connection.target.node_id);

        if source_node.is_none() {
            issues.push(ValidationIssue::DanglingNode {
                node_id: connection.source.node_id.clone(),
            });
        }
        if target_node.is_none() {
            issues.push(ValidationIssue::DanglingNode {
                node_id: connection.target.node_id.clone(),
            });
        }

        // Output port lookup honors the source's current fan-out
        let source_kind = source_node.and_then(|_| {
            workflow
                .visible_output_ports(registry, &connection.source.node_id)
                .ok()
                .and_then(|ports| {
                    ports
                        .into_iter()
                        .find(|p| p.name == connection.source.port)
                        .map(|p| p.kind)
                })
        });
        if source_node.is_some() && source_kind.is_none() {
            issues.push(ValidationIssue::DanglingPort {
                node_id: connection.source.node_id.clone(),
                port: connection.source.port.clone(),
            });
        }

        let target_input = target_node
            .and_then(|n| registry.get(&n.type_key))
            .and_then(|d| d.input(&connection.target.port).cloned());
        if target_node.is_some()
            && target_node
                .map(|n| registry.has_type(&n.type_key))
                .unwrap_or(false)
            && target_input.is_none()
        {
            issues.push(ValidationIssue::DanglingPort {
                node_id: connection.target.node_id.clone(),
                port: connection.target.port.clone(),
            });
        }

        if let (Some(source_kind), Some(input)) = (source_kind, &target_input) {
            if !source_kind.is_compatible_with(&input.kind) {
                issues.push(ValidationIssue::KindMismatch {
                    source_node: connection.source.node_id.clone(),
                    source_port: connection.source.port.clone(),
                    target_node: connection.target.node_id.clone(),
                    target_port: connection.target.port.clone(),
                });
            }
            if connection.target.slot >= input.capacity() {
                issues.push(ValidationIssue::SlotOutOfRange {
                    node_id: connection.target.node_id.clone(),
                    port: connection.target.port.clone(),
                    slot: connection.target.slot,
                    max: input.capacity(),
                });
            }
        }

        if connection.source.node_id == connection.target.node_id {
            issues.push(ValidationIssue::SelfLoop {
                node_id: connection.source.node_id.clone(),
            });
        }

        let key = (
            connection.target.node_id.as_str(),
            connection.target.port.as_str(),
            connection.target.slot,
        );
        let count = occupied.entry(key).or_insert(0);
        *count += 1;
        if *count == 2 {
            issues.push(ValidationIssue::DuplicateSlot {
                node_id: connection.target.node_id.clone(),
                port: connection.target.port.clone(),
                slot: connection.target.slot,
            });
        }
    }

    if let Err(crate::error::GraphError::CyclicGraph { nodes }) = execution_order(workflow) {
        issues.push(ValidationIssue::Cycle { nodes });
    }

    issues
}
