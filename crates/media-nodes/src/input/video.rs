//! Video input node

use async_trait::async_trait;
use graph_engine::{
    ConnectorDefinition, ConnectorKind, DefinitionFn, GraphError, MediaItem, NodeCategory,
    NodeExecutor, NodeInstance, NodeSettings, NodeTypeDefinition, ResolvedInputs, Result,
    RunContext,
};

/// Output port carrying the video clip
pub const PORT_VIDEO: &str = "video";

pub struct VideoInputNode;

impl VideoInputNode {
    pub fn definition() -> NodeTypeDefinition {
        NodeTypeDefinition {
            type_key: "input-video".to_string(),
            label: "Video".to_string(),
            category: NodeCategory::Input,
            inputs: vec![],
            outputs: vec![ConnectorDefinition::single(PORT_VIDEO, ConnectorKind::Video)],
            fan_out: None,
            default_settings: NodeSettings::InputVideo { url: None },
            supported_models: vec![],
        }
    }
}

inventory::submit!(DefinitionFn(VideoInputNode::definition));

#[async_trait]
impl NodeExecutor for VideoInputNode {
    async fn execute(
        &self,
        node: &NodeInstance,
        _inputs: &ResolvedInputs,
        _ctx: &RunContext<'_>,
    ) -> Result<Vec<MediaItem>> {
        match &node.settings {
            NodeSettings::InputVideo { url: Some(url) } => Ok(vec![MediaItem::video(url.clone())]),
            NodeSettings::InputVideo { url: None } => {
                Err(GraphError::failed("no video selected"))
            }
            other => Err(GraphError::failed(format!(
                "unexpected settings '{}' on a video input node",
                other.type_key()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graph_engine::{CancelFlag, ExecutorExtensions, NullEventSink};

    #[tokio::test]
    async fn test_emits_configured_video() {
        let node = NodeInstance {
            id: "input-video-1".to_string(),
            type_key: "input-video".to_string(),
            position: (0.0, 0.0),
            settings: NodeSettings::InputVideo {
                url: Some("https://cdn/clip.mp4".to_string()),
            },
            exposed_slots: Default::default(),
            creation_index: 0,
            status: Default::default(),
            outputs: vec![],
            error: None,
        };
        let extensions = ExecutorExtensions::new();
        let cancel = CancelFlag::new();
        let ctx = RunContext {
            run_id: "run-1",
            extensions: &extensions,
            events: &NullEventSink,
            cancel: &cancel,
        };
        let outputs = VideoInputNode
            .execute(&node, &ResolvedInputs::default(), &ctx)
            .await
            .unwrap();
        assert_eq!(outputs, vec![MediaItem::video("https://cdn/clip.mp4")]);
    }
}
