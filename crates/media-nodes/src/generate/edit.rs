//! Image edit node
//!
//! Instruction-driven editing of an existing image. Always runs on the
//! dedicated edit model; the source image rides along as a context
//! reference.

use async_trait::async_trait;
use generation::{GenerationRequest, GuidanceSpec, EDIT_MODEL};
use graph_engine::{
    ConnectorDefinition, ConnectorKind, DefinitionFn, FanOut, GraphError, MediaItem, NodeCategory,
    NodeExecutor, NodeInstance, NodeSettings, NodeTypeDefinition, ResolvedInputs, Result,
    RunContext,
};

use super::{into_image_items, map_generation_error, reference_ids};
use crate::setup::runner_from;

/// The image to edit (required)
pub const PORT_SOURCE: &str = "image";
/// Edit instruction; overrides the settings instruction when connected
pub const PORT_PROMPT: &str = "prompt";
/// Fan-out output family prefix (`image-1` .. `image-N`)
pub const PORT_IMAGE: &str = "image";
pub const MAX_IMAGES: u32 = 4;

pub struct ImageEditNode;

impl ImageEditNode {
    pub fn definition() -> NodeTypeDefinition {
        NodeTypeDefinition {
            type_key: "image-edit".to_string(),
            label: "Image Edit".to_string(),
            category: NodeCategory::Edit,
            inputs: vec![
                ConnectorDefinition::single(PORT_SOURCE, ConnectorKind::Image),
                ConnectorDefinition::single(PORT_PROMPT, ConnectorKind::Text),
            ],
            outputs: vec![],
            fan_out: Some(FanOut {
                template: ConnectorDefinition::single(PORT_IMAGE, ConnectorKind::Image),
                max: MAX_IMAGES,
            }),
            default_settings: NodeSettings::ImageEdit(Default::default()),
            supported_models: vec![EDIT_MODEL.to_string()],
        }
    }
}

inventory::submit!(DefinitionFn(ImageEditNode::definition));

#[async_trait]
impl NodeExecutor for ImageEditNode {
    async fn execute(
        &self,
        node: &NodeInstance,
        inputs: &ResolvedInputs,
        ctx: &RunContext<'_>,
    ) -> Result<Vec<MediaItem>> {
        let settings = match &node.settings {
            NodeSettings::ImageEdit(s) => s.clone(),
            other => {
                return Err(GraphError::failed(format!(
                    "unexpected settings '{}' on an image edit node",
                    other.type_key()
                )))
            }
        };

        let source = reference_ids(inputs.port(PORT_SOURCE))?;
        if source.is_empty() {
            return Err(GraphError::failed("no source image connected"));
        }

        let instruction = inputs
            .first_text(PORT_PROMPT)
            .map(str::to_string)
            .unwrap_or_else(|| settings.instruction.clone());
        if instruction.trim().is_empty() {
            return Err(GraphError::failed("no edit instruction provided"));
        }

        let runner = runner_from(ctx)?;
        let job_id = runner.tracker().start(
            Some(node.id.clone()),
            instruction.clone(),
            EDIT_MODEL,
            generation::JobStatus::Loading,
        );

        let request = GenerationRequest::new(instruction, EDIT_MODEL)
            .with_outputs(settings.num_images)
            .with_seed(settings.seed)
            .with_guidance(Some(GuidanceSpec::ContextImages(source)));

        let cancelled = || ctx.cancel.is_cancelled();
        let media = runner
            .run_to_completion(&job_id, &request, &cancelled)
            .await
            .map_err(map_generation_error)?;
        Ok(into_image_items(media))
    }
}
