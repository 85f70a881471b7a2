//! Workflow scheduler
//!
//! Runs a workflow by computing a deterministic topological order (Kahn's
//! algorithm, ties broken by node creation order), then executing nodes
//! sequentially. A node runs only after every upstream producer completed;
//! failures do not abort the run but block the failed node's dependents,
//! leaving independent branches to finish normally.
//!
//! Cancellation is cooperative: the [`CancelFlag`] is checked before each
//! node starts, and long-running executors are expected to check it between
//! backend polls.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{GraphError, Result};
use crate::events::{EventSink, RunEvent};
use crate::extensions::ExecutorExtensions;
use crate::graph::Workflow;
use crate::registry::NodeTypeRegistry;
use crate::types::{MediaItem, NodeId, NodeStatus};

/// Shared cooperative cancellation flag
///
/// Cloning shares the underlying flag; setting it from any clone stops the
/// run at the next check point.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    inner: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.inner.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.inner.load(Ordering::SeqCst)
    }
}

/// Input media resolved for one node, keyed by input port name
///
/// Each port maps to the items feeding it in slot order. Single-slot ports
/// carry at most one item; unconnected ports map to an empty list.
#[derive(Debug, Clone, Default)]
pub struct ResolvedInputs {
    ports: HashMap<String, Vec<MediaItem>>,
}

impl ResolvedInputs {
    /// Insert the items for a port (mainly for tests)
    pub fn insert(&mut self, port: impl Into<String>, items: Vec<MediaItem>) {
        self.ports.insert(port.into(), items);
    }

    /// All items feeding a port, in slot order
    pub fn port(&self, name: &str) -> &[MediaItem] {
        self.ports.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// The first item feeding a port, if any
    pub fn first(&self, name: &str) -> Option<&MediaItem> {
        self.port(name).first()
    }

    /// The first item feeding a port as text, if it is a text item
    pub fn first_text(&self, name: &str) -> Option<&str> {
        self.first(name).and_then(|item| item.as_text())
    }

    /// Whether a port has no items
    pub fn is_empty(&self, name: &str) -> bool {
        self.port(name).is_empty()
    }
}

/// Per-run context handed to node executors
pub struct RunContext<'a> {
    /// Unique id of this run
    pub run_id: &'a str,
    /// Host-injected collaborators (backend client, enhancer, tracker)
    pub extensions: &'a ExecutorExtensions,
    /// Sink for progress events
    pub events: &'a dyn EventSink,
    /// Cooperative cancellation flag
    pub cancel: &'a CancelFlag,
}

/// Outcome of a workflow run, grouping node ids by final status
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub run_id: String,
    pub completed: Vec<NodeId>,
    pub failed: Vec<NodeId>,
    pub blocked: Vec<NodeId>,
    pub cancelled: Vec<NodeId>,
}

impl RunSummary {
    /// Whether every node in the run completed successfully
    pub fn is_fully_completed(&self) -> bool {
        self.failed.is_empty() && self.blocked.is_empty() && self.cancelled.is_empty()
    }
}

/// Compute the execution order for a workflow
///
/// Kahn's algorithm over the connection graph. When several nodes are ready
/// the one created earliest runs first, so the order is stable across runs
/// of the same graph. Returns [`GraphError::CyclicGraph`] naming the nodes
/// on a cycle if no topological order exists.
pub fn execution_order(workflow: &Workflow) -> Result<Vec<NodeId>> {
    // Multiple connections between the same pair count as one edge
    let mut edges: HashSet<(&str, &str)> = HashSet::new();
    for c in &workflow.connections {
        edges.insert((c.source.node_id.as_str(), c.target.node_id.as_str()));
    }

    let mut indegree: HashMap<&str, usize> =
        workflow.nodes.iter().map(|n| (n.id.as_str(), 0)).collect();
    for (_, target) in &edges {
        if let Some(count) = indegree.get_mut(target) {
            *count += 1;
        }
    }

    let mut remaining: Vec<_> = workflow.nodes.iter().collect();
    remaining.sort_by_key(|n| n.creation_index);

    let mut order = Vec::with_capacity(remaining.len());
    while !remaining.is_empty() {
        // Earliest-created ready node first
        let position = remaining
            .iter()
            .position(|n| indegree.get(n.id.as_str()).copied() == Some(0));
        let Some(position) = position else {
            return Err(GraphError::CyclicGraph {
                nodes: remaining.iter().map(|n| n.id.clone()).collect(),
            });
        };
        let node = remaining.remove(position);
        for (source, target) in &edges {
            if *source == node.id {
                if let Some(count) = indegree.get_mut(target) {
                    *count = count.saturating_sub(1);
                }
            }
        }
        indegree.remove(node.id.as_str());
        order.push(node.id.clone());
    }
    Ok(order)
}

/// Resolve the input media for one node from its upstream producers
///
/// Items are gathered per input port in slot order. A connection sourced
/// from a fan-out port `name-i` carries exactly the producer's i-th output;
/// a fixed output port carries all of the producer's outputs.
pub fn resolve_inputs(
    workflow: &Workflow,
    registry: &NodeTypeRegistry,
    node_id: &str,
) -> Result<ResolvedInputs> {
    let node = workflow
        .node(node_id)
        .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))?;
    let definition = registry
        .get(&node.type_key)
        .ok_or_else(|| GraphError::UnknownNodeType(node.type_key.clone()))?;

    let mut resolved = ResolvedInputs::default();
    for input in &definition.inputs {
        let mut feeding: Vec<_> = workflow
            .connections
            .iter()
            .filter(|c| c.target.node_id == node_id && c.target.port == input.name)
            .collect();
        feeding.sort_by_key(|c| c.target.slot);

        let mut items = Vec::new();
        for connection in feeding {
            let source = workflow
                .node(&connection.source.node_id)
                .ok_or_else(|| GraphError::NodeNotFound(connection.source.node_id.clone()))?;
            let source_def = registry
                .get(&source.type_key)
                .ok_or_else(|| GraphError::UnknownNodeType(source.type_key.clone()))?;

            let fan_index = source_def.fan_out.as_ref().and_then(|fan| {
                connection
                    .source
                    .port
                    .strip_prefix(&format!("{}-", fan.template.name))
                    .and_then(|rest| rest.parse::<usize>().ok())
                    .filter(|i| *i >= 1)
            });
            match fan_index {
                Some(i) => {
                    if let Some(item) = source.outputs.get(i - 1) {
                        items.push(item.clone());
                    }
                }
                None => items.extend(source.outputs.iter().cloned()),
            }
        }
        resolved.ports.insert(input.name.clone(), items);
    }
    Ok(resolved)
}

fn emit(events: &dyn EventSink, event: RunEvent) {
    if let Err(e) = events.send(event) {
        log::warn!("event sink rejected event: {}", e);
    }
}

/// Run a workflow to completion
///
/// Validates acyclicity up front (no node runs on a cyclic graph), resets
/// runtime state, then executes nodes in [`execution_order`]. Per-node
/// failures are isolated: the failing node is marked `Failed`, its
/// dependents `Blocked`, and the rest of the graph keeps running. The
/// returned summary groups node ids by final status.
pub async fn run_workflow(
    workflow: &mut Workflow,
    registry: &NodeTypeRegistry,
    extensions: &ExecutorExtensions,
    events: &dyn EventSink,
    cancel: &CancelFlag,
) -> Result<RunSummary> {
    let order = execution_order(workflow)?;
    workflow.reset_runtime();

    let run_id = uuid::Uuid::new_v4().to_string();
    let mut summary = RunSummary {
        run_id: run_id.clone(),
        ..Default::default()
    };

    emit(
        events,
        RunEvent::RunStarted {
            workflow_id: workflow.id.clone(),
            run_id: run_id.clone(),
        },
    );
    log::info!(
        "run {} started: {} nodes in workflow '{}'",
        run_id,
        order.len(),
        workflow.id
    );

    for node_id in order {
        if cancel.is_cancelled() {
            if let Some(node) = workflow.node_mut(&node_id) {
                node.status = NodeStatus::Cancelled;
            }
            summary.cancelled.push(node_id.clone());
            emit(
                events,
                RunEvent::NodeCancelled {
                    node_id,
                    run_id: run_id.clone(),
                },
            );
            continue;
        }

        // Block if any upstream producer did not complete
        let blocked_on = workflow
            .connections
            .iter()
            .filter(|c| c.target.node_id == node_id)
            .find(|c| {
                workflow
                    .node(&c.source.node_id)
                    .map(|n| n.status != NodeStatus::Completed)
                    .unwrap_or(true)
            })
            .map(|c| c.source.node_id.clone());
        if let Some(blocked_on) = blocked_on {
            if let Some(node) = workflow.node_mut(&node_id) {
                node.status = NodeStatus::Blocked;
            }
            summary.blocked.push(node_id.clone());
            emit(
                events,
                RunEvent::NodeBlocked {
                    node_id,
                    run_id: run_id.clone(),
                    blocked_on,
                },
            );
            continue;
        }

        // Resolution failures (imported graph naming a type the registry
        // lost, for instance) fail the node, not the run
        let inputs = match resolve_inputs(workflow, registry, &node_id) {
            Ok(inputs) => inputs,
            Err(e) => {
                let message = e.to_string();
                log::warn!("node {} failed to resolve inputs: {}", node_id, message);
                if let Some(node) = workflow.node_mut(&node_id) {
                    node.status = NodeStatus::Failed;
                    node.error = Some(message.clone());
                }
                summary.failed.push(node_id.clone());
                emit(
                    events,
                    RunEvent::NodeFailed {
                        node_id,
                        run_id: run_id.clone(),
                        error: message,
                    },
                );
                continue;
            }
        };
        let snapshot = match workflow.node(&node_id) {
            Some(node) => node.clone(),
            None => continue,
        };
        let executor = registry.get_executor(&snapshot.type_key);

        if let Some(node) = workflow.node_mut(&node_id) {
            node.status = NodeStatus::Running;
        }
        emit(
            events,
            RunEvent::NodeStarted {
                node_id: node_id.clone(),
                run_id: run_id.clone(),
            },
        );

        let result = match executor {
            Some(executor) => {
                let ctx = RunContext {
                    run_id: &run_id,
                    extensions,
                    events,
                    cancel,
                };
                executor.execute(&snapshot, &inputs, &ctx).await
            }
            None => Err(GraphError::failed(format!(
                "no executor registered for node type '{}'",
                snapshot.type_key
            ))),
        };

        match result {
            Ok(outputs) => {
                let output_count = outputs.len();
                if let Some(node) = workflow.node_mut(&node_id) {
                    node.status = NodeStatus::Completed;
                    node.outputs = outputs;
                }
                summary.completed.push(node_id.clone());
                emit(
                    events,
                    RunEvent::NodeCompleted {
                        node_id,
                        run_id: run_id.clone(),
                        output_count,
                    },
                );
            }
            Err(GraphError::Cancelled) => {
                if let Some(node) = workflow.node_mut(&node_id) {
                    node.status = NodeStatus::Cancelled;
                }
                summary.cancelled.push(node_id.clone());
                emit(
                    events,
                    RunEvent::NodeCancelled {
                        node_id,
                        run_id: run_id.clone(),
                    },
                );
            }
            Err(e) => {
                let message = e.to_string();
                log::warn!("node {} failed: {}", node_id, message);
                if let Some(node) = workflow.node_mut(&node_id) {
                    node.status = NodeStatus::Failed;
                    node.error = Some(message.clone());
                }
                summary.failed.push(node_id.clone());
                emit(
                    events,
                    RunEvent::NodeFailed {
                        node_id,
                        run_id: run_id.clone(),
                        error: message,
                    },
                );
            }
        }
    }

    emit(
        events,
        RunEvent::RunCompleted {
            workflow_id: workflow.id.clone(),
            run_id: run_id.clone(),
        },
    );
    log::info!(
        "run {} finished: {} completed, {} failed, {} blocked, {} cancelled",
        run_id,
        summary.completed.len(),
        summary.failed.len(),
        summary.blocked.len(),
        summary.cancelled.len()
    );
    Ok(summary)
}
