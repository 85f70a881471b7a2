//! Video generation node
//!
//! Prompt-to-video with an optional start-frame reference image. Auto
//! model selection does not apply to video; `auto` resolves to the fixed
//! video model.

use async_trait::async_trait;
use generation::{GenerationRequest, GuidanceSpec, VIDEO_MODEL};
use graph_engine::{
    ConnectorDefinition, ConnectorKind, DefinitionFn, FanOut, GraphError, MediaItem, ModelChoice,
    NodeCategory, NodeExecutor, NodeInstance, NodeSettings, NodeTypeDefinition, ResolvedInputs,
    Result, RunContext,
};

use super::{into_video_items, map_generation_error, reference_ids};
use crate::setup::runner_from;

/// Prompt input; overrides the settings prompt when connected
pub const PORT_PROMPT: &str = "prompt";
/// Optional start-frame reference image
pub const PORT_START_FRAME: &str = "start-frame";
/// Fan-out output family prefix (`video-1` .. `video-N`)
pub const PORT_VIDEO: &str = "video";
pub const MAX_VIDEOS: u32 = 4;

pub struct VideoGenerationNode;

impl VideoGenerationNode {
    pub fn definition() -> NodeTypeDefinition {
        NodeTypeDefinition {
            type_key: "video-generation".to_string(),
            label: "Video Generation".to_string(),
            category: NodeCategory::Generation,
            inputs: vec![
                ConnectorDefinition::single(PORT_PROMPT, ConnectorKind::Text),
                ConnectorDefinition::single(PORT_START_FRAME, ConnectorKind::Image),
            ],
            outputs: vec![],
            fan_out: Some(FanOut {
                template: ConnectorDefinition::single(PORT_VIDEO, ConnectorKind::Video),
                max: MAX_VIDEOS,
            }),
            default_settings: NodeSettings::VideoGeneration(Default::default()),
            supported_models: vec![VIDEO_MODEL.to_string()],
        }
    }
}

inventory::submit!(DefinitionFn(VideoGenerationNode::definition));

#[async_trait]
impl NodeExecutor for VideoGenerationNode {
    async fn execute(
        &self,
        node: &NodeInstance,
        inputs: &ResolvedInputs,
        ctx: &RunContext<'_>,
    ) -> Result<Vec<MediaItem>> {
        let settings = match &node.settings {
            NodeSettings::VideoGeneration(s) => s.clone(),
            other => {
                return Err(GraphError::failed(format!(
                    "unexpected settings '{}' on a video generation node",
                    other.type_key()
                )))
            }
        };

        let prompt = inputs
            .first_text(PORT_PROMPT)
            .map(str::to_string)
            .unwrap_or_else(|| settings.prompt.clone());
        if prompt.trim().is_empty() {
            return Err(GraphError::failed("no prompt provided"));
        }

        let start_frame = reference_ids(inputs.port(PORT_START_FRAME))?;
        let model = match &settings.model {
            ModelChoice::Auto => VIDEO_MODEL.to_string(),
            ModelChoice::Named(name) => name.clone(),
        };

        let runner = runner_from(ctx)?;
        let job_id = runner.tracker().start(
            Some(node.id.clone()),
            prompt.clone(),
            String::from(settings.model.clone()),
            generation::JobStatus::Loading,
        );

        let (width, height) = settings.aspect_ratio.dimensions();
        let guidance = (!start_frame.is_empty()).then(|| GuidanceSpec::ContextImages(start_frame));
        let request = GenerationRequest::new(prompt, model)
            .with_outputs(settings.num_videos)
            .with_dimensions(width, height)
            .with_seed(settings.seed)
            .with_guidance(guidance);

        let cancelled = || ctx.cancel.is_cancelled();
        let media = runner
            .run_to_completion(&job_id, &request, &cancelled)
            .await
            .map_err(map_generation_error)?;
        Ok(into_video_items(media))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::setup_extensions;
    use generation::{
        BackendJobStatus, GeneratedMedia, GenerationBackend, GenerationRunner, JobHandle,
        JobTracker,
    };
    use graph_engine::{CancelFlag, NullEventSink, VideoGenerationSettings};
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct OneShotBackend {
        submitted: Mutex<Vec<GenerationRequest>>,
    }

    #[async_trait]
    impl GenerationBackend for OneShotBackend {
        async fn submit(&self, request: &GenerationRequest) -> generation::Result<JobHandle> {
            self.submitted.lock().push(request.clone());
            Ok(JobHandle::new("backend-1"))
        }

        async fn poll(&self, _handle: &JobHandle) -> generation::Result<BackendJobStatus> {
            Ok(BackendJobStatus::Complete(vec![GeneratedMedia::new(
                "https://cdn/clip.mp4",
            )]))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_frame_rides_as_context_guidance() {
        let backend = Arc::new(OneShotBackend {
            submitted: Mutex::new(Vec::new()),
        });
        let tracker = Arc::new(JobTracker::new());
        let runner = Arc::new(GenerationRunner::new(backend.clone(), tracker));
        let extensions = setup_extensions(runner, None);
        let cancel = CancelFlag::new();
        let ctx = RunContext {
            run_id: "run-1",
            extensions: &extensions,
            events: &NullEventSink,
            cancel: &cancel,
        };

        let node = NodeInstance {
            id: "video-generation-1".to_string(),
            type_key: "video-generation".to_string(),
            position: (0.0, 0.0),
            settings: NodeSettings::VideoGeneration(VideoGenerationSettings {
                prompt: "a sunrise timelapse".to_string(),
                ..Default::default()
            }),
            exposed_slots: Default::default(),
            creation_index: 0,
            status: Default::default(),
            outputs: vec![],
            error: None,
        };
        let mut inputs = ResolvedInputs::default();
        inputs.insert(
            PORT_START_FRAME,
            vec![MediaItem::image_with_reference("ref-1", "https://cdn/a.png")],
        );

        let outputs = VideoGenerationNode
            .execute(&node, &inputs, &ctx)
            .await
            .unwrap();
        assert_eq!(outputs, vec![MediaItem::video("https://cdn/clip.mp4")]);

        let request = backend.submitted.lock().last().cloned().unwrap();
        assert_eq!(request.model_id, VIDEO_MODEL);
        // Wide is the video default ratio
        assert_eq!((request.width, request.height), (1536, 864));
        assert_eq!(
            request.guidance,
            Some(GuidanceSpec::ContextImages(vec!["ref-1".to_string()]))
        );
    }
}
