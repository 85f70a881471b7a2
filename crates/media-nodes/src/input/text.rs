//! Text input node

use async_trait::async_trait;
use graph_engine::{
    ConnectorDefinition, ConnectorKind, DefinitionFn, GraphError, MediaItem, NodeCategory,
    NodeExecutor, NodeInstance, NodeSettings, NodeTypeDefinition, ResolvedInputs, Result,
    RunContext,
};

/// Output port carrying the configured text
pub const PORT_TEXT: &str = "text";

/// Provides a fixed text value, typically a prompt for generation nodes
pub struct TextInputNode;

impl TextInputNode {
    pub fn definition() -> NodeTypeDefinition {
        NodeTypeDefinition {
            type_key: "input-text".to_string(),
            label: "Text".to_string(),
            category: NodeCategory::Input,
            inputs: vec![],
            outputs: vec![ConnectorDefinition::single(PORT_TEXT, ConnectorKind::Text)],
            fan_out: None,
            default_settings: NodeSettings::InputText {
                text: String::new(),
            },
            supported_models: vec![],
        }
    }
}

inventory::submit!(DefinitionFn(TextInputNode::definition));

#[async_trait]
impl NodeExecutor for TextInputNode {
    async fn execute(
        &self,
        node: &NodeInstance,
        _inputs: &ResolvedInputs,
        _ctx: &RunContext<'_>,
    ) -> Result<Vec<MediaItem>> {
        match &node.settings {
            NodeSettings::InputText { text } if !text.trim().is_empty() => {
                Ok(vec![MediaItem::text(text.clone())])
            }
            NodeSettings::InputText { .. } => Err(GraphError::failed("text input is empty")),
            other => Err(GraphError::failed(format!(
                "unexpected settings '{}' on a text input node",
                other.type_key()
            ))),
        }
    }
}
