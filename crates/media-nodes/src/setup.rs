//! Host wiring for the built-in node adapters
//!
//! Hosts construct the generation collaborators once, bundle them into an
//! [`ExecutorExtensions`] map with [`setup_extensions`], and attach the
//! executors to a registry with [`register_builtin_executors`]. Node
//! adapters pull the collaborators back out through the helpers here.

use std::sync::Arc;

use generation::{GenerationRunner, MediaUpload};
use graph_engine::{
    ExecutorExtensions, NodeTypeRegistry, Result, RunContext, SharedExecutorFactory,
};

use crate::generate::{ImageEditNode, ImageGenerationNode, VideoGenerationNode};
use crate::input::{ImageInputNode, TextInputNode, VideoInputNode};

pub use graph_engine::extension_keys;

/// Bundle the generation collaborators into an extension map
pub fn setup_extensions(
    runner: Arc<GenerationRunner>,
    upload: Option<Arc<dyn MediaUpload>>,
) -> ExecutorExtensions {
    let mut extensions = ExecutorExtensions::new();
    extensions.set(extension_keys::GENERATION_RUNNER, runner);
    if let Some(upload) = upload {
        extensions.set(extension_keys::MEDIA_UPLOAD, upload);
    }
    extensions
}

/// Attach executors for every built-in node type
///
/// Definitions are collected at link time; this pairs them with their
/// executors. Types absent from the registry are skipped.
pub fn register_builtin_executors(registry: &mut NodeTypeRegistry) {
    let pairs: [(&str, Arc<dyn graph_engine::NodeExecutor>); 6] = [
        ("input-text", Arc::new(TextInputNode)),
        ("input-image", Arc::new(ImageInputNode)),
        ("input-video", Arc::new(VideoInputNode)),
        ("image-generation", Arc::new(ImageGenerationNode)),
        ("video-generation", Arc::new(VideoGenerationNode)),
        ("image-edit", Arc::new(ImageEditNode)),
    ];
    for (type_key, executor) in pairs {
        if !registry.attach_executor(type_key, Arc::new(SharedExecutorFactory::new(executor))) {
            log::warn!("node type '{}' is not registered; executor skipped", type_key);
        }
    }
}

/// Fetch the generation runner from the run context
pub(crate) fn runner_from(ctx: &RunContext<'_>) -> Result<Arc<GenerationRunner>> {
    ctx.extensions
        .require::<Arc<GenerationRunner>>(extension_keys::GENERATION_RUNNER)
        .cloned()
}

/// Fetch the media upload collaborator, if the host provided one
pub(crate) fn upload_from(ctx: &RunContext<'_>) -> Option<Arc<dyn MediaUpload>> {
    ctx.extensions
        .get::<Arc<dyn MediaUpload>>(extension_keys::MEDIA_UPLOAD)
        .cloned()
}
