//! Image generation node
//!
//! The central adapter: resolves the prompt (connected text beats the
//! settings fallback), optionally enhances it, resolves the model (auto
//! selection from enhancement tags and reference count), attaches
//! reference-image guidance, and drives the submit/poll cycle. Output
//! cardinality follows the `numImages` setting as a fan-out port family.

use async_trait::async_trait;
use generation::{
    build_guidance, select_model, validate_selection, Enhancement, GenerationRequest,
    CONTEXT_MODEL, DEFAULT_MODEL, EDIT_MODEL, LONG_TEXT_MODEL,
};
use graph_engine::{
    ConnectorDefinition, ConnectorKind, DefinitionFn, FanOut, GraphError, MediaItem, ModelChoice,
    NodeCategory, NodeExecutor, NodeInstance, NodeSettings, NodeTypeDefinition, ResolvedInputs,
    Result, RunContext,
};

use super::{into_image_items, map_generation_error, reference_ids};
use crate::setup::runner_from;

/// Prompt input; overrides the settings prompt when connected
pub const PORT_PROMPT: &str = "prompt";
/// Reference image slot family
pub const PORT_REFERENCE: &str = "reference";
/// Fan-out output family prefix (`image-1` .. `image-N`)
pub const PORT_IMAGE: &str = "image";
/// Maximum reference images per node
pub const MAX_REFERENCES: u32 = 6;
/// Maximum output fan-out
pub const MAX_IMAGES: u32 = 4;

pub struct ImageGenerationNode;

impl ImageGenerationNode {
    pub fn definition() -> NodeTypeDefinition {
        NodeTypeDefinition {
            type_key: "image-generation".to_string(),
            label: "Image Generation".to_string(),
            category: NodeCategory::Generation,
            inputs: vec![
                ConnectorDefinition::single(PORT_PROMPT, ConnectorKind::Text),
                ConnectorDefinition::multi(PORT_REFERENCE, ConnectorKind::Image, MAX_REFERENCES),
            ],
            outputs: vec![],
            fan_out: Some(FanOut {
                template: ConnectorDefinition::single(PORT_IMAGE, ConnectorKind::Image),
                max: MAX_IMAGES,
            }),
            default_settings: NodeSettings::ImageGeneration(Default::default()),
            supported_models: vec![
                DEFAULT_MODEL.to_string(),
                "chroma-cinema".to_string(),
                "chroma-vintage".to_string(),
                LONG_TEXT_MODEL.to_string(),
                CONTEXT_MODEL.to_string(),
                EDIT_MODEL.to_string(),
            ],
        }
    }
}

inventory::submit!(DefinitionFn(ImageGenerationNode::definition));

#[async_trait]
impl NodeExecutor for ImageGenerationNode {
    async fn execute(
        &self,
        node: &NodeInstance,
        inputs: &ResolvedInputs,
        ctx: &RunContext<'_>,
    ) -> Result<Vec<MediaItem>> {
        let settings = match &node.settings {
            NodeSettings::ImageGeneration(s) => s.clone(),
            other => {
                return Err(GraphError::failed(format!(
                    "unexpected settings '{}' on an image generation node",
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

        let references = reference_ids(inputs.port(PORT_REFERENCE))?;
        let runner = runner_from(ctx)?;

        let needs_enhancement = settings.enhance_prompt || settings.model.is_auto();
        let initial_status = if needs_enhancement {
            generation::JobStatus::Enhancing
        } else {
            generation::JobStatus::Loading
        };
        let job_id = runner.tracker().start(
            Some(node.id.clone()),
            prompt.clone(),
            String::from(settings.model.clone()),
            initial_status,
        );

        let enhancement = if needs_enhancement {
            runner.enhance_or_original(&prompt).await
        } else {
            Enhancement::passthrough(prompt.clone())
        };

        let (model, recommended_guidance) = match &settings.model {
            ModelChoice::Auto => {
                let selection = select_model(
                    &enhancement.recommendation_tags,
                    references.len() as u32,
                    Some(&prompt),
                );
                let model = validate_selection(
                    &selection.model,
                    &Self::definition().supported_models,
                );
                (model, selection.guidance)
            }
            ModelChoice::Named(name) => (name.clone(), None),
        };

        let (width, height) = settings.aspect_ratio.dimensions();
        let request_model = model.clone();
        let request = GenerationRequest::new(enhancement.enhanced_prompt, model)
            .with_outputs(settings.num_images)
            .with_dimensions(width, height)
            .with_seed(settings.seed)
            .with_style_preset(settings.style_preset.clone())
            .with_alchemy(settings.alchemy)
            .with_guidance(build_guidance(
                &request_model,
                &references,
                recommended_guidance,
            ));

        let cancelled = || ctx.cancel.is_cancelled();
        let media = runner
            .run_to_completion(&job_id, &request, &cancelled)
            .await
            .map_err(map_generation_error)?;
        Ok(into_image_items(media))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::setup_extensions;
    use generation::{
        BackendJobStatus, GeneratedMedia, GenerationBackend, GenerationRunner, JobHandle,
        JobStatus, JobTracker,
    };
    use graph_engine::{CancelFlag, ImageGenerationSettings, NullEventSink};
    use parking_lot::Mutex;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Arc;

    struct ScriptedBackend {
        statuses: Mutex<VecDeque<BackendJobStatus>>,
        submitted: Mutex<Vec<GenerationRequest>>,
    }

    impl ScriptedBackend {
        fn completing(count: usize) -> Arc<Self> {
            let media = (0..count)
                .map(|i| GeneratedMedia::with_reference(format!("out-{i}"), format!("https://cdn/{i}.png")))
                .collect();
            Arc::new(Self {
                statuses: Mutex::new(vec![BackendJobStatus::Complete(media)].into()),
                submitted: Mutex::new(Vec::new()),
            })
        }

        fn last_request(&self) -> GenerationRequest {
            self.submitted.lock().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl GenerationBackend for ScriptedBackend {
        async fn submit(&self, request: &GenerationRequest) -> generation::Result<JobHandle> {
            self.submitted.lock().push(request.clone());
            Ok(JobHandle::new("backend-1"))
        }

        async fn poll(&self, _handle: &JobHandle) -> generation::Result<BackendJobStatus> {
            Ok(self
                .statuses
                .lock()
                .pop_front()
                .unwrap_or(BackendJobStatus::Pending))
        }
    }

    fn node(settings: ImageGenerationSettings) -> NodeInstance {
        NodeInstance {
            id: "image-generation-1".to_string(),
            type_key: "image-generation".to_string(),
            position: (0.0, 0.0),
            settings: NodeSettings::ImageGeneration(settings),
            exposed_slots: HashMap::from([(PORT_REFERENCE.to_string(), 1)]),
            creation_index: 1,
            status: Default::default(),
            outputs: vec![],
            error: None,
        }
    }

    async fn run(
        backend: Arc<ScriptedBackend>,
        node: &NodeInstance,
        inputs: &ResolvedInputs,
    ) -> (Result<Vec<MediaItem>>, Arc<JobTracker>) {
        let tracker = Arc::new(JobTracker::new());
        let runner = Arc::new(GenerationRunner::new(backend, tracker.clone()));
        let extensions = setup_extensions(runner, None);
        let cancel = CancelFlag::new();
        let ctx = RunContext {
            run_id: "run-1",
            extensions: &extensions,
            events: &NullEventSink,
            cancel: &cancel,
        };
        (ImageGenerationNode.execute(node, inputs, &ctx).await, tracker)
    }

    #[tokio::test(start_paused = true)]
    async fn test_connected_prompt_beats_settings_prompt() {
        let backend = ScriptedBackend::completing(2);
        let node = node(ImageGenerationSettings {
            prompt: "settings prompt".to_string(),
            num_images: 2,
            ..Default::default()
        });
        let mut inputs = ResolvedInputs::default();
        inputs.insert(PORT_PROMPT, vec![MediaItem::text("a cat")]);

        let (result, tracker) = run(backend.clone(), &node, &inputs).await;
        let outputs = result.unwrap();
        assert_eq!(outputs.len(), 2);

        let request = backend.last_request();
        assert_eq!(request.prompt, "a cat");
        assert_eq!(request.num_outputs, 2);
        assert_eq!(request.model_id, DEFAULT_MODEL);
        assert_eq!((request.width, request.height), (1024, 1024));

        let jobs = tracker.all();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].status, JobStatus::Completed);
        assert_eq!(jobs[0].node_id.as_deref(), Some("image-generation-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reference_images_route_to_context_model() {
        let backend = ScriptedBackend::completing(1);
        let node = node(ImageGenerationSettings {
            prompt: "blend these".to_string(),
            ..Default::default()
        });
        let mut inputs = ResolvedInputs::default();
        inputs.insert(
            PORT_REFERENCE,
            vec![
                MediaItem::image_with_reference("ref-1", "https://cdn/a.png"),
                MediaItem::image_with_reference("ref-2", "https://cdn/b.png"),
            ],
        );

        let (result, _) = run(backend.clone(), &node, &inputs).await;
        result.unwrap();

        let request = backend.last_request();
        assert_eq!(request.model_id, CONTEXT_MODEL);
        assert_eq!(
            request.guidance,
            Some(generation::GuidanceSpec::ContextImages(vec![
                "ref-1".to_string(),
                "ref-2".to_string()
            ]))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unuploaded_reference_fails() {
        let backend = ScriptedBackend::completing(1);
        let node = node(ImageGenerationSettings {
            prompt: "blend".to_string(),
            ..Default::default()
        });
        let mut inputs = ResolvedInputs::default();
        inputs.insert(PORT_REFERENCE, vec![MediaItem::image("https://cdn/a.png")]);

        let (result, _) = run(backend, &node, &inputs).await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("has not been uploaded"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_prompt_fails_before_submit() {
        let backend = ScriptedBackend::completing(1);
        let node = node(ImageGenerationSettings::default());

        let (result, tracker) = run(backend.clone(), &node, &ResolvedInputs::default()).await;
        assert!(result.is_err());
        assert!(backend.submitted.lock().is_empty());
        assert!(tracker.all().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_named_model_skips_selection() {
        let backend = ScriptedBackend::completing(1);
        let node = node(ImageGenerationSettings {
            prompt: "a cat".to_string(),
            model: ModelChoice::Named("chroma-cinema".to_string()),
            alchemy: true,
            ..Default::default()
        });

        let (result, tracker) = run(backend.clone(), &node, &ResolvedInputs::default()).await;
        result.unwrap();

        let request = backend.last_request();
        assert_eq!(request.model_id, "chroma-cinema");
        assert_eq!(request.contrast, Some(generation::MIN_ALCHEMY_CONTRAST));
        // Named model without enhancement starts directly at loading
        assert_eq!(tracker.all()[0].requested_model, "chroma-cinema");
    }
}
