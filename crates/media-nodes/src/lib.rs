//! Built-in workflow node adapters for media generation
//!
//! Each node type lives in its own module, declares its definition, and
//! registers it at link time via `inventory`. Hosts build a registry with
//! [`graph_engine::NodeTypeRegistry::with_builtins`], attach the executors
//! with [`setup::register_builtin_executors`], and inject the generation
//! collaborators with [`setup::setup_extensions`].
//!
//! Built-in node types:
//!
//! | type key           | category   | adapter                       |
//! |--------------------|------------|-------------------------------|
//! | `input-text`       | input      | [`input::TextInputNode`]      |
//! | `input-image`      | input      | [`input::ImageInputNode`]     |
//! | `input-video`      | input      | [`input::VideoInputNode`]     |
//! | `image-generation` | generation | [`generate::ImageGenerationNode`] |
//! | `video-generation` | generation | [`generate::VideoGenerationNode`] |
//! | `image-edit`       | edit       | [`generate::ImageEditNode`]   |

pub mod generate;
pub mod input;
pub mod setup;

pub use generate::{ImageEditNode, ImageGenerationNode, VideoGenerationNode};
pub use input::{ImageInputNode, TextInputNode, VideoInputNode};
pub use setup::{register_builtin_executors, setup_extensions};

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use generation::{
        BackendJobStatus, GeneratedMedia, GenerationBackend, GenerationRequest, GenerationRunner,
        JobHandle, JobTracker,
    };
    use graph_engine::{
        run_workflow, CancelFlag, NodeStatus, NodeTypeRegistry, NullEventSink, PortRef, SlotRef,
        Workflow,
    };
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Fails any request whose prompt contains "fail"; completes the rest
    /// with `num_outputs` images.
    struct PromptKeyedBackend {
        submitted: Mutex<Vec<GenerationRequest>>,
    }

    impl PromptKeyedBackend {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                submitted: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl GenerationBackend for PromptKeyedBackend {
        async fn submit(&self, request: &GenerationRequest) -> generation::Result<JobHandle> {
            self.submitted.lock().push(request.clone());
            Ok(JobHandle::new(request.prompt.clone()))
        }

        async fn poll(&self, handle: &JobHandle) -> generation::Result<BackendJobStatus> {
            if handle.0.contains("fail") {
                return Ok(BackendJobStatus::Failed("simulated outage".to_string()));
            }
            let request = self
                .submitted
                .lock()
                .iter()
                .find(|r| r.prompt == handle.0)
                .cloned();
            let count = request.map(|r| r.num_outputs).unwrap_or(1);
            let media = (0..count)
                .map(|i| GeneratedMedia::new(format!("https://cdn/{}/{}.png", handle.0.len(), i)))
                .collect();
            Ok(BackendJobStatus::Complete(media))
        }
    }

    fn builtin_registry() -> NodeTypeRegistry {
        let mut registry = NodeTypeRegistry::with_builtins();
        register_builtin_executors(&mut registry);
        registry
    }

    #[test]
    fn test_all_builtin_types_are_registered() {
        let registry = builtin_registry();
        for type_key in [
            "input-text",
            "input-image",
            "input-video",
            "image-generation",
            "video-generation",
            "image-edit",
        ] {
            assert!(registry.has_type(type_key), "missing type: {type_key}");
            assert!(
                registry.get_executor(type_key).is_some(),
                "missing executor: {type_key}"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_text_to_image_workflow_produces_two_images() {
        let registry = builtin_registry();
        let backend = PromptKeyedBackend::new();
        let runner = Arc::new(GenerationRunner::new(
            backend.clone(),
            Arc::new(JobTracker::new()),
        ));
        let extensions = setup_extensions(runner, None);

        let mut wf = Workflow::new("wf-a", "Text to image");
        let text = wf.add_node(&registry, "input-text", (0.0, 0.0)).unwrap();
        wf.update_settings(&registry, &text, &serde_json::json!({"text": "a cat"}))
            .unwrap();
        let gen = wf
            .add_node(&registry, "image-generation", (200.0, 0.0))
            .unwrap();
        wf.update_settings(&registry, &gen, &serde_json::json!({"numImages": 2}))
            .unwrap();
        wf.add_connection(
            &registry,
            PortRef::new(&text, "text"),
            SlotRef::single(&gen, "prompt"),
        )
        .unwrap();

        let summary = run_workflow(
            &mut wf,
            &registry,
            &extensions,
            &NullEventSink,
            &CancelFlag::new(),
        )
        .await
        .unwrap();

        assert!(summary.is_fully_completed());
        assert_eq!(wf.node(&gen).unwrap().outputs.len(), 2);
        // The text node's output fed the prompt
        assert_eq!(backend.submitted.lock()[0].prompt, "a cat");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_chain_blocks_only_its_dependents() {
        let registry = builtin_registry();
        let backend = PromptKeyedBackend::new();
        let runner = Arc::new(GenerationRunner::new(
            backend,
            Arc::new(JobTracker::new()),
        ));
        let extensions = setup_extensions(runner, None);

        let mut wf = Workflow::new("wf-b", "Two chains");
        // Chain 1: text -> generation -> edit, generation fails
        let bad_text = wf.add_node(&registry, "input-text", (0.0, 0.0)).unwrap();
        wf.update_settings(&registry, &bad_text, &serde_json::json!({"text": "fail here"}))
            .unwrap();
        let bad_gen = wf
            .add_node(&registry, "image-generation", (200.0, 0.0))
            .unwrap();
        let downstream = wf.add_node(&registry, "image-edit", (400.0, 0.0)).unwrap();
        wf.update_settings(
            &registry,
            &downstream,
            &serde_json::json!({"instruction": "sharpen"}),
        )
        .unwrap();
        wf.add_connection(
            &registry,
            PortRef::new(&bad_text, "text"),
            SlotRef::single(&bad_gen, "prompt"),
        )
        .unwrap();
        wf.add_connection(
            &registry,
            PortRef::new(&bad_gen, "image-1"),
            SlotRef::single(&downstream, "image"),
        )
        .unwrap();

        // Chain 2: independent text -> generation
        let ok_text = wf.add_node(&registry, "input-text", (0.0, 200.0)).unwrap();
        wf.update_settings(&registry, &ok_text, &serde_json::json!({"text": "a dog"}))
            .unwrap();
        let ok_gen = wf
            .add_node(&registry, "image-generation", (200.0, 200.0))
            .unwrap();
        wf.add_connection(
            &registry,
            PortRef::new(&ok_text, "text"),
            SlotRef::single(&ok_gen, "prompt"),
        )
        .unwrap();

        let summary = run_workflow(
            &mut wf,
            &registry,
            &extensions,
            &NullEventSink,
            &CancelFlag::new(),
        )
        .await
        .unwrap();

        assert_eq!(wf.node(&bad_gen).unwrap().status, NodeStatus::Failed);
        assert_eq!(wf.node(&downstream).unwrap().status, NodeStatus::Blocked);
        assert_eq!(wf.node(&ok_gen).unwrap().status, NodeStatus::Completed);
        assert!(summary.completed.contains(&ok_gen));
        assert_eq!(summary.failed, vec![bad_gen]);
    }
}
