//! Image input node
//!
//! Supplies a reference image to downstream generation nodes. Images
//! already uploaded to the backend carry a reference id; a local file path
//! is materialized through the media upload collaborator at run time so
//! the id exists before any generation request needs it.

use async_trait::async_trait;
use graph_engine::{
    ConnectorDefinition, ConnectorKind, DefinitionFn, GraphError, MediaItem, NodeCategory,
    NodeExecutor, NodeInstance, NodeSettings, NodeTypeDefinition, ResolvedInputs, Result,
    RunContext,
};

use crate::setup::upload_from;

/// Output port carrying the reference image
pub const PORT_IMAGE: &str = "image";

pub struct ImageInputNode;

impl ImageInputNode {
    pub fn definition() -> NodeTypeDefinition {
        NodeTypeDefinition {
            type_key: "input-image".to_string(),
            label: "Image".to_string(),
            category: NodeCategory::Input,
            inputs: vec![],
            outputs: vec![ConnectorDefinition::single(PORT_IMAGE, ConnectorKind::Image)],
            fan_out: None,
            default_settings: NodeSettings::InputImage {
                reference_id: None,
                url: None,
            },
            supported_models: vec![],
        }
    }
}

inventory::submit!(DefinitionFn(ImageInputNode::definition));

#[async_trait]
impl NodeExecutor for ImageInputNode {
    async fn execute(
        &self,
        node: &NodeInstance,
        _inputs: &ResolvedInputs,
        ctx: &RunContext<'_>,
    ) -> Result<Vec<MediaItem>> {
        let (reference_id, url) = match &node.settings {
            NodeSettings::InputImage { reference_id, url } => (reference_id.clone(), url.clone()),
            other => {
                return Err(GraphError::failed(format!(
                    "unexpected settings '{}' on an image input node",
                    other.type_key()
                )))
            }
        };
        let Some(url) = url else {
            return Err(GraphError::failed("no image selected"));
        };

        if let Some(reference_id) = reference_id {
            return Ok(vec![MediaItem::image_with_reference(reference_id, url)]);
        }

        // Local file without a backend id yet: materialize it now
        if let Some(upload) = upload_from(ctx) {
            if let Ok(bytes) = std::fs::read(&url) {
                let filename = std::path::Path::new(&url)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "image".to_string());
                let reference_id = upload
                    .upload(&bytes, &filename)
                    .await
                    .map_err(|e| GraphError::failed(e.to_string()))?;
                return Ok(vec![MediaItem::image_with_reference(reference_id, url)]);
            }
        }

        Ok(vec![MediaItem::image(url)])
    }
}
