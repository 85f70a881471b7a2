//! Typed node-graph engine for media generation workflows
//!
//! This crate provides the core abstractions for building and running
//! node-based media workflows:
//!
//! - **Types** ([`types`]): connector kinds, port definitions, node status,
//!   and the media items that flow between nodes
//! - **Settings** ([`settings`]): per-node-type settings shapes and the
//!   partial-update merge contract
//! - **Graph** ([`graph`]): the workflow model with invariant-checked
//!   mutations and JSON persistence
//! - **Registry** ([`registry`]): the node type catalog with link-time
//!   registration and executor attachment
//! - **Scheduler** ([`scheduler`]): deterministic topological execution
//!   with partial-failure isolation and cooperative cancellation
//! - **Validation** ([`validation`]): collect-all checking for imported
//!   workflows
//! - **Extensions** ([`extensions`]): typed dependency injection into node
//!   executors
//! - **Events** ([`events`]): run progress reporting
//!
//! Node adapters live in separate crates and register themselves via
//! `inventory`; see [`registry::DefinitionFn`].

pub mod error;
pub mod events;
pub mod extensions;
pub mod graph;
pub mod registry;
pub mod scheduler;
pub mod settings;
pub mod types;
pub mod validation;

pub use error::{ConnectionError, GraphError, Result};
pub use events::{EventError, EventSink, NullEventSink, RunEvent, VecEventSink};
pub use extensions::{extension_keys, ExecutorExtensions};
pub use graph::{Connection, NodeInstance, Workflow};
pub use registry::{
    DefinitionFn, FanOut, NodeCategory, NodeExecutor, NodeExecutorFactory, NodeTypeDefinition,
    NodeTypeRegistry, SharedExecutorFactory,
};
pub use scheduler::{
    execution_order, resolve_inputs, run_workflow, CancelFlag, ResolvedInputs, RunContext,
    RunSummary,
};
pub use settings::{
    AspectRatio, ImageEditSettings, ImageGenerationSettings, ModelChoice, NodeSettings,
    VideoGenerationSettings,
};
pub use types::{
    ConnectorDefinition, ConnectorKind, MediaItem, NodeId, NodeStatus, PortRef, SlotRef,
};
pub use validation::{validate_workflow, ValidationIssue};
