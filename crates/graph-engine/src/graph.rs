//! Runtime workflow graph
//!
//! The workflow owns the authoritative set of node instances and
//! connections and enforces every structural invariant at mutation time:
//! endpoint existence, kind equality, no self-loops, single-slot
//! replacement, and multi-input slot bounds with progressive slot
//! exposure. Operations are all-or-nothing; a rejected mutation never
//! corrupts existing state.
//!
//! The workflow (nodes + connections) is also the unit of persistence:
//! it serializes to JSON and re-imports to a structurally identical graph
//! (same ids, settings, connections, exposed-slot counts). Runtime fields
//! (status, outputs) are not persisted.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ConnectionError, GraphError, Result};
use crate::registry::NodeTypeRegistry;
use crate::settings::NodeSettings;
use crate::types::{ConnectorDefinition, MediaItem, NodeId, NodeStatus, PortRef, SlotRef};

/// A typed edge from one node's output port to another node's input slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub source: PortRef,
    pub target: SlotRef,
    pub kind: crate::types::ConnectorKind,
}

/// A configured node instance placed in a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInstance {
    /// Unique identifier within the workflow
    pub id: NodeId,
    /// Type key referencing the node type registry
    pub type_key: String,
    /// Canvas position; opaque to the engine
    pub position: (f64, f64),
    /// Per-instance settings, shape fixed by `type_key`
    pub settings: NodeSettings,
    /// Currently visible slot count per multi-input port
    pub exposed_slots: HashMap<String, u32>,
    /// Insertion-order index; drives deterministic scheduling
    pub creation_index: u64,
    /// Execution status for the current run (not persisted)
    #[serde(default, skip_serializing)]
    pub status: NodeStatus,
    /// Media produced in the current run (not persisted)
    #[serde(default, skip_serializing)]
    pub outputs: Vec<MediaItem>,
    /// Error message when status is Failed (not persisted)
    #[serde(default, skip_serializing)]
    pub error: Option<String>,
}

/// A complete workflow graph — the unit of persistence and execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: String,
    pub name: String,
    pub nodes: Vec<NodeInstance>,
    pub connections: Vec<Connection>,
}

impl Workflow {
    /// Create a new empty workflow
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            nodes: Vec::new(),
            connections: Vec::new(),
        }
    }

    /// Find a node by id
    pub fn node(&self, id: &str) -> Option<&NodeInstance> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Find a node by id (mutable)
    pub fn node_mut(&mut self, id: &str) -> Option<&mut NodeInstance> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    fn next_creation_index(&self) -> u64 {
        self.nodes
            .iter()
            .map(|n| n.creation_index)
            .max()
            .map_or(0, |m| m + 1)
    }

    /// Add a node instance of the given type
    ///
    /// Settings are deep-copied from the type's defaults, never shared
    /// between instances. Multi-input ports start with one exposed slot.
    /// Returns the new node's id.
    pub fn add_node(
        &mut self,
        registry: &NodeTypeRegistry,
        type_key: &str,
        position: (f64, f64),
    ) -> Result<NodeId> {
        let definition = registry
            .get(type_key)
            .ok_or_else(|| GraphError::UnknownNodeType(type_key.to_string()))?;

        let creation_index = self.next_creation_index();
        let mut id = format!("{}-{}", type_key, creation_index + 1);
        // Imported graphs may carry foreign ids; bump until unique
        let mut bump = creation_index + 1;
        while self.node(&id).is_some() {
            bump += 1;
            id = format!("{}-{}", type_key, bump);
        }

        let exposed_slots = definition
            .inputs
            .iter()
            .filter(|p| p.is_multi())
            .map(|p| (p.name.clone(), 1))
            .collect();

        self.nodes.push(NodeInstance {
            id: id.clone(),
            type_key: type_key.to_string(),
            position,
            settings: definition.default_settings.clone(),
            exposed_slots,
            creation_index,
            status: NodeStatus::Idle,
            outputs: Vec::new(),
            error: None,
        });
        Ok(id)
    }

    /// Delete a node and every connection touching it
    ///
    /// Deleting a node that does not exist is a no-op.
    pub fn delete_node(&mut self, node_id: &str) {
        self.nodes.retain(|n| n.id != node_id);
        self.connections
            .retain(|c| c.source.node_id != node_id && c.target.node_id != node_id);
    }

    /// The output ports a node currently exposes
    ///
    /// Fixed ports come from the type definition; fan-out ports are expanded
    /// from the template using the instance's current settings (clamped to
    /// `[1, max]`), independent of any connections.
    pub fn visible_output_ports(
        &self,
        registry: &NodeTypeRegistry,
        node_id: &str,
    ) -> Result<Vec<ConnectorDefinition>> {
        let node = self
            .node(node_id)
            .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))?;
        let definition = registry
            .get(&node.type_key)
            .ok_or_else(|| GraphError::UnknownNodeType(node.type_key.clone()))?;

        let mut ports = definition.outputs.clone();
        if let Some(fan) = &definition.fan_out {
            let count = node
                .settings
                .fan_out_count()
                .unwrap_or(1)
                .clamp(1, fan.max);
            for i in 1..=count {
                ports.push(ConnectorDefinition::single(
                    format!("{}-{}", fan.template.name, i),
                    fan.template.kind,
                ));
            }
        }
        Ok(ports)
    }

    /// The number of slots currently exposed on a multi-input port
    /// (1 for single-slot ports)
    pub fn exposed_slot_count(&self, node_id: &str, port: &str) -> u32 {
        self.node(node_id)
            .and_then(|n| n.exposed_slots.get(port).copied())
            .unwrap_or(1)
    }

    /// Connect an output port to an input slot
    ///
    /// Invariants are checked in order: endpoint existence, kind equality,
    /// self-loop, slot bounds. A connection to an occupied single-slot port
    /// (or occupied multi-input slot) silently replaces the prior
    /// connection. Filling the last exposed slot of a multi-input port
    /// reveals the next slot, capped at the port's maximum.
    pub fn add_connection(
        &mut self,
        registry: &NodeTypeRegistry,
        source: PortRef,
        target: SlotRef,
    ) -> Result<Connection> {
        // Endpoint existence: source node and output port
        if self.node(&source.node_id).is_none() {
            return Err(ConnectionError::UnknownNode(source.node_id.clone()).into());
        }
        let source_ports = self.visible_output_ports(registry, &source.node_id)?;
        let source_kind = source_ports
            .iter()
            .find(|p| p.name == source.port)
            .map(|p| p.kind)
            .ok_or_else(|| ConnectionError::UnknownPort {
                node_id: source.node_id.clone(),
                port: source.port.clone(),
            })?;

        // Endpoint existence: target node and input port
        let target_node = self
            .node(&target.node_id)
            .ok_or_else(|| ConnectionError::UnknownNode(target.node_id.clone()))?;
        let definition = registry
            .get(&target_node.type_key)
            .ok_or_else(|| GraphError::UnknownNodeType(target_node.type_key.clone()))?;
        let input = definition
            .input(&target.port)
            .ok_or_else(|| ConnectionError::UnknownPort {
                node_id: target.node_id.clone(),
                port: target.port.clone(),
            })?;

        // Kind equality
        if !source_kind.is_compatible_with(&input.kind) {
            return Err(ConnectionError::KindMismatch {
                from_kind: source_kind,
                to_kind: input.kind,
            }
            .into());
        }

        // No self-loops
        if source.node_id == target.node_id {
            return Err(ConnectionError::SelfLoop.into());
        }

        let capacity = input.capacity();
        let is_multi = input.is_multi();
        let exposed = if is_multi {
            target_node.exposed_slots.get(&target.port).copied().unwrap_or(1)
        } else {
            1
        };

        // A slot beyond the port's maximum can never be exposed
        if target.slot >= capacity {
            return Err(GraphError::SlotLimitReached {
                node_id: target.node_id.clone(),
                port: target.port.clone(),
                max: capacity,
            });
        }
        // Within capacity but not yet revealed
        if target.slot >= exposed {
            return Err(ConnectionError::SlotOutOfRange {
                port: target.port.clone(),
                slot: target.slot,
                exposed,
            }
            .into());
        }

        // Replacement: at most one connection per input slot
        self.connections
            .retain(|c| c.target != target);

        let connection = Connection {
            source,
            target: target.clone(),
            kind: source_kind,
        };
        self.connections.push(connection.clone());

        // Filling the last exposed slot reveals the next one
        if is_multi && target.slot == exposed - 1 && exposed < capacity {
            if let Some(node) = self.node_mut(&target.node_id) {
                node.exposed_slots.insert(target.port.clone(), exposed + 1);
            }
        }

        Ok(connection)
    }

    /// Remove a connection if present; no-op otherwise
    pub fn delete_connection(&mut self, source: &PortRef, target: &SlotRef) {
        self.connections
            .retain(|c| !(&c.source == source && &c.target == target));
    }

    /// Manually reveal one more slot on a multi-input port
    pub fn expose_more_slots(
        &mut self,
        registry: &NodeTypeRegistry,
        node_id: &str,
        port: &str,
    ) -> Result<u32> {
        let node = self
            .node(node_id)
            .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))?;
        let definition = registry
            .get(&node.type_key)
            .ok_or_else(|| GraphError::UnknownNodeType(node.type_key.clone()))?;
        let input = definition
            .input(port)
            .filter(|p| p.is_multi())
            .ok_or_else(|| GraphError::UnknownPort {
                node_id: node_id.to_string(),
                port: port.to_string(),
            })?;

        let max = input.capacity();
        let exposed = node.exposed_slots.get(port).copied().unwrap_or(1);
        if exposed >= max {
            return Err(GraphError::SlotLimitReached {
                node_id: node_id.to_string(),
                port: port.to_string(),
                max,
            });
        }

        let node = self
            .node_mut(node_id)
            .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))?;
        node.exposed_slots.insert(port.to_string(), exposed + 1);
        Ok(exposed + 1)
    }

    /// Shallow-merge a partial settings object into a node's settings
    ///
    /// If the merge shrinks a fan-out port family, connections sourced from
    /// ports that no longer exist are pruned.
    pub fn update_settings(
        &mut self,
        registry: &NodeTypeRegistry,
        node_id: &str,
        patch: &serde_json::Value,
    ) -> Result<()> {
        let node = self
            .node_mut(node_id)
            .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))?;
        node.settings.merge_patch(patch)?;

        let visible: std::collections::HashSet<String> = self
            .visible_output_ports(registry, node_id)?
            .into_iter()
            .map(|p| p.name)
            .collect();
        self.connections
            .retain(|c| c.source.node_id != node_id || visible.contains(&c.source.port));
        Ok(())
    }

    /// Ids of the nodes feeding an input port, ordered by slot index
    pub fn upstream(&self, node_id: &str, port: &str) -> Vec<NodeId> {
        let mut feeding: Vec<&Connection> = self
            .connections
            .iter()
            .filter(|c| c.target.node_id == node_id && c.target.port == port)
            .collect();
        feeding.sort_by_key(|c| c.target.slot);
        feeding.iter().map(|c| c.source.node_id.clone()).collect()
    }

    /// Ids of the nodes one hop downstream of a node's outputs
    pub fn downstream(&self, node_id: &str) -> Vec<NodeId> {
        let mut seen = std::collections::HashSet::new();
        self.connections
            .iter()
            .filter(|c| c.source.node_id == node_id)
            .map(|c| c.target.node_id.clone())
            .filter(|id| seen.insert(id.clone()))
            .collect()
    }

    /// Reset all runtime state (status, outputs, errors) to idle
    pub fn reset_runtime(&mut self) {
        for node in &mut self.nodes {
            node.status = NodeStatus::Idle;
            node.outputs.clear();
            node.error = None;
        }
    }

    /// Export the workflow as JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Import a workflow from JSON, resetting runtime state
    pub fn from_json(json: &str) -> Result<Self> {
        let mut workflow: Workflow = serde_json::from_str(json)?;
        workflow.reset_runtime();
        Ok(workflow)
    }
}
