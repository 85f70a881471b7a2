//! Node type registry
//!
//! The registry is the static catalog of node kinds: each entry declares a
//! type's ports, default settings, supported models, and (optionally) the
//! executor that runs instances of it. It is loaded once at process start
//! and never mutated by running workflows.
//!
//! Node type definitions are collected at link time via `inventory`, the
//! same pattern node adapter crates use to self-register:
//!
//! ```ignore
//! inventory::submit!(graph_engine::DefinitionFn(ImageGenerationNode::definition));
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::graph::NodeInstance;
use crate::scheduler::{ResolvedInputs, RunContext};
use crate::settings::NodeSettings;
use crate::types::{ConnectorDefinition, MediaItem};

/// Category of a node type, used for palette grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    /// Source nodes (text, image, video inputs)
    Input,
    /// Generation nodes (image, video)
    Generation,
    /// Edit nodes (instruction-driven image editing)
    Edit,
}

/// Dynamic output port family
///
/// For node kinds whose output cardinality is a setting (e.g. number of
/// images), the visible output ports are `{template.name}-1` through
/// `{template.name}-N` where N comes from the instance's settings, clamped
/// to `[1, max]`. The port list is recomputed whenever settings change,
/// independent of connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOut {
    /// Template connector; its name is the port-name prefix
    pub template: ConnectorDefinition,
    /// Hard cap on the fan-out count
    pub max: u32,
}

/// Definition of a node type — the immutable template for instances
#[derive(Debug, Clone)]
pub struct NodeTypeDefinition {
    /// Unique type key (e.g. "image-generation")
    pub type_key: String,
    /// Human-readable label
    pub label: String,
    /// Category for palette grouping
    pub category: NodeCategory,
    /// Input port definitions
    pub inputs: Vec<ConnectorDefinition>,
    /// Fixed output port definitions
    pub outputs: Vec<ConnectorDefinition>,
    /// Dynamic output family, if output cardinality is a setting
    pub fan_out: Option<FanOut>,
    /// Settings every new instance starts from
    pub default_settings: NodeSettings,
    /// Models instances of this type may use (empty for input kinds)
    pub supported_models: Vec<String>,
}

impl NodeTypeDefinition {
    /// Find an input port by name
    pub fn input(&self, name: &str) -> Option<&ConnectorDefinition> {
        self.inputs.iter().find(|p| p.name == name)
    }
}

/// Per-node-type executor
///
/// Each implementation handles exactly one node type, translating
/// (settings + resolved inputs) into produced media items.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    /// Execute a node instance with its resolved inputs
    async fn execute(
        &self,
        node: &NodeInstance,
        inputs: &ResolvedInputs,
        ctx: &RunContext<'_>,
    ) -> Result<Vec<MediaItem>>;
}

/// Factory for creating or returning a shared NodeExecutor
pub trait NodeExecutorFactory: Send + Sync {
    fn create_executor(&self) -> Arc<dyn NodeExecutor>;
}

/// Factory that returns a shared executor instance
pub struct SharedExecutorFactory {
    executor: Arc<dyn NodeExecutor>,
}

impl SharedExecutorFactory {
    pub fn new(executor: Arc<dyn NodeExecutor>) -> Self {
        Self { executor }
    }
}

impl NodeExecutorFactory for SharedExecutorFactory {
    fn create_executor(&self) -> Arc<dyn NodeExecutor> {
        self.executor.clone()
    }
}

/// Link-time registration of a node type definition
pub struct DefinitionFn(pub fn() -> NodeTypeDefinition);

inventory::collect!(DefinitionFn);

/// A registration entry combining a definition with an optional executor factory
struct RegistryEntry {
    definition: NodeTypeDefinition,
    factory: Option<Arc<dyn NodeExecutorFactory>>,
}

/// Registry of node types with their definitions and executors
pub struct NodeTypeRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl NodeTypeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Create a registry pre-populated with all link-time definitions
    ///
    /// Executors are attached separately (definitions collected via
    /// `inventory` carry metadata only).
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for def_fn in inventory::iter::<DefinitionFn> {
            registry.register_definition((def_fn.0)());
        }
        registry
    }

    /// Register a node type with a definition and an executor factory
    pub fn register(
        &mut self,
        definition: NodeTypeDefinition,
        factory: Arc<dyn NodeExecutorFactory>,
    ) {
        self.entries.insert(
            definition.type_key.clone(),
            RegistryEntry {
                definition,
                factory: Some(factory),
            },
        );
    }

    /// Register a node type with a definition only (no executor)
    pub fn register_definition(&mut self, definition: NodeTypeDefinition) {
        self.entries.insert(
            definition.type_key.clone(),
            RegistryEntry {
                definition,
                factory: None,
            },
        );
    }

    /// Attach an executor to an already-registered node type
    ///
    /// Returns false if the type is not registered.
    pub fn attach_executor(
        &mut self,
        type_key: &str,
        factory: Arc<dyn NodeExecutorFactory>,
    ) -> bool {
        match self.entries.get_mut(type_key) {
            Some(entry) => {
                entry.factory = Some(factory);
                true
            }
            None => false,
        }
    }

    /// Get the definition for a node type
    pub fn get(&self, type_key: &str) -> Option<&NodeTypeDefinition> {
        self.entries.get(type_key).map(|e| &e.definition)
    }

    /// Check if a node type is registered
    pub fn has_type(&self, type_key: &str) -> bool {
        self.entries.contains_key(type_key)
    }

    /// Get all registered definitions
    pub fn all_definitions(&self) -> Vec<&NodeTypeDefinition> {
        self.entries.values().map(|e| &e.definition).collect()
    }

    /// Get definitions grouped by category
    pub fn definitions_by_category(&self) -> HashMap<NodeCategory, Vec<&NodeTypeDefinition>> {
        let mut grouped: HashMap<NodeCategory, Vec<&NodeTypeDefinition>> = HashMap::new();
        for entry in self.entries.values() {
            grouped
                .entry(entry.definition.category)
                .or_default()
                .push(&entry.definition);
        }
        grouped
    }

    /// Get the executor for a node type
    pub fn get_executor(&self, type_key: &str) -> Option<Arc<dyn NodeExecutor>> {
        self.entries
            .get(type_key)
            .and_then(|e| e.factory.as_ref())
            .map(|f| f.create_executor())
    }

    /// List all registered node type keys
    pub fn type_keys(&self) -> Vec<&str> {
        self.entries.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for NodeTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConnectorKind;

    fn text_input_def() -> NodeTypeDefinition {
        NodeTypeDefinition {
            type_key: "input-text".to_string(),
            label: "Text".to_string(),
            category: NodeCategory::Input,
            inputs: vec![],
            outputs: vec![ConnectorDefinition::single("text", ConnectorKind::Text)],
            fan_out: None,
            default_settings: NodeSettings::InputText {
                text: String::new(),
            },
            supported_models: vec![],
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = NodeTypeRegistry::new();
        registry.register_definition(text_input_def());

        assert!(registry.has_type("input-text"));
        assert!(!registry.has_type("unknown"));
        assert_eq!(registry.get("input-text").unwrap().label, "Text");
    }

    #[test]
    fn test_no_executor_for_definition_only() {
        let mut registry = NodeTypeRegistry::new();
        registry.register_definition(text_input_def());

        assert!(registry.get_executor("input-text").is_none());
    }

    #[test]
    fn test_definitions_by_category() {
        let mut registry = NodeTypeRegistry::new();
        registry.register_definition(text_input_def());

        let grouped = registry.definitions_by_category();
        assert_eq!(grouped.get(&NodeCategory::Input).unwrap().len(), 1);
        assert!(grouped.get(&NodeCategory::Generation).is_none());
    }

    #[test]
    fn test_attach_executor_unknown_type() {
        struct Noop;

        #[async_trait]
        impl NodeExecutor for Noop {
            async fn execute(
                &self,
                _node: &NodeInstance,
                _inputs: &ResolvedInputs,
                _ctx: &RunContext<'_>,
            ) -> Result<Vec<MediaItem>> {
                Ok(vec![])
            }
        }

        let mut registry = NodeTypeRegistry::new();
        let factory = Arc::new(SharedExecutorFactory::new(Arc::new(Noop)));
        assert!(!registry.attach_executor("missing", factory.clone()));

        registry.register_definition(text_input_def());
        assert!(registry.attach_executor("input-text", factory));
        assert!(registry.get_executor("input-text").is_some());
    }

    #[test]
    fn test_definition_input_lookup() {
        let def = NodeTypeDefinition {
            inputs: vec![
                ConnectorDefinition::single("prompt", ConnectorKind::Text),
                ConnectorDefinition::multi("reference", ConnectorKind::Image, 6),
            ],
            ..text_input_def()
        };
        assert!(def.input("prompt").is_some());
        assert!(def.input("reference").unwrap().is_multi());
        assert!(def.input("missing").is_none());
    }
}
