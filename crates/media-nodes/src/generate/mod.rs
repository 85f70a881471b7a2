//! Generation node adapters
//!
//! These nodes translate (settings + resolved inputs) into a backend
//! request, drive it through the shared [`generation::GenerationRunner`],
//! and translate the produced media back into graph items.

mod edit;
mod image;
mod video;

pub use edit::ImageEditNode;
pub use image::ImageGenerationNode;
pub use video::VideoGenerationNode;

use generation::{GeneratedMedia, GenerationError};
use graph_engine::{GraphError, MediaItem, Result};

/// Backend reference ids of the images feeding a port
///
/// Every item must be an image that has already been materialized into a
/// backend id; anything else is a hard execution error.
pub(crate) fn reference_ids(items: &[MediaItem]) -> Result<Vec<String>> {
    items
        .iter()
        .map(|item| match item {
            MediaItem::Image {
                reference_id: Some(id),
                ..
            } => Ok(id.clone()),
            MediaItem::Image {
                reference_id: None,
                url,
            } => Err(GraphError::failed(format!(
                "reference image '{}' has not been uploaded to the backend",
                url
            ))),
            other => Err(GraphError::failed(format!(
                "expected an image input, got {}",
                other.kind()
            ))),
        })
        .collect()
}

pub(crate) fn into_image_items(media: Vec<GeneratedMedia>) -> Vec<MediaItem> {
    media
        .into_iter()
        .map(|m| match m.reference_id {
            Some(id) => MediaItem::image_with_reference(id, m.url),
            None => MediaItem::image(m.url),
        })
        .collect()
}

pub(crate) fn into_video_items(media: Vec<GeneratedMedia>) -> Vec<MediaItem> {
    media.into_iter().map(|m| MediaItem::video(m.url)).collect()
}

/// Map a runner error onto the graph error taxonomy
///
/// Cancellation keeps its identity so the scheduler marks the node
/// cancelled rather than failed.
pub(crate) fn map_generation_error(e: GenerationError) -> GraphError {
    match e {
        GenerationError::Cancelled => GraphError::Cancelled,
        other => GraphError::failed(other.to_string()),
    }
}
