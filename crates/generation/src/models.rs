//! Static model capability table
//!
//! The table drives the auto-model selector's elimination algorithm. It is
//! compiled in and never mutated; per-node model availability is declared
//! separately by the node type registry.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::request::GuidanceKind;

/// General default model; the fallback for every soft-failure path
pub const DEFAULT_MODEL: &str = "chroma-xl";
/// Model with the strongest rendered-text capability
pub const LONG_TEXT_MODEL: &str = "chroma-typeset";
/// Model that accepts raw context reference images
pub const CONTEXT_MODEL: &str = "chroma-context";
/// Dedicated instruction-driven image-edit model
pub const EDIT_MODEL: &str = "chroma-edit";
/// Default model for video generation nodes
pub const VIDEO_MODEL: &str = "chroma-motion";

/// One row of the capability table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCapability {
    pub name: &'static str,
    /// Tie-break priority; lower wins
    pub rank: u8,
    /// Can render legible text inside images
    pub can_handle_text: bool,
    /// Accepts instruction-driven edits of an existing image
    pub can_handle_image_edit: bool,
    pub max_reference_images: u32,
    pub supported_guidance_kinds: &'static [GuidanceKind],
    /// Takes a numeric controlnet weight alongside the named strength level
    pub accepts_weight: bool,
}

impl ModelCapability {
    /// Whether this model supports a guidance kind
    pub fn supports(&self, kind: GuidanceKind) -> bool {
        self.supported_guidance_kinds.contains(&kind)
    }
}

/// The full capability table, ordered by rank
pub static MODEL_CAPABILITIES: &[ModelCapability] = &[
    ModelCapability {
        name: DEFAULT_MODEL,
        rank: 1,
        can_handle_text: true,
        can_handle_image_edit: false,
        max_reference_images: 4,
        supported_guidance_kinds: &[GuidanceKind::Style, GuidanceKind::Content],
        accepts_weight: false,
    },
    ModelCapability {
        name: "chroma-cinema",
        rank: 2,
        can_handle_text: false,
        can_handle_image_edit: false,
        max_reference_images: 4,
        supported_guidance_kinds: &[
            GuidanceKind::Style,
            GuidanceKind::Content,
            GuidanceKind::Character,
        ],
        accepts_weight: true,
    },
    // Style-only by design; recommendations for other kinds fall back
    ModelCapability {
        name: "chroma-vintage",
        rank: 3,
        can_handle_text: false,
        can_handle_image_edit: false,
        max_reference_images: 4,
        supported_guidance_kinds: &[GuidanceKind::Style],
        accepts_weight: true,
    },
    ModelCapability {
        name: LONG_TEXT_MODEL,
        rank: 4,
        can_handle_text: true,
        can_handle_image_edit: false,
        max_reference_images: 0,
        supported_guidance_kinds: &[],
        accepts_weight: false,
    },
    ModelCapability {
        name: CONTEXT_MODEL,
        rank: 5,
        can_handle_text: false,
        can_handle_image_edit: false,
        max_reference_images: 8,
        supported_guidance_kinds: &[GuidanceKind::Context],
        accepts_weight: false,
    },
    ModelCapability {
        name: EDIT_MODEL,
        rank: 6,
        can_handle_text: false,
        can_handle_image_edit: true,
        max_reference_images: 8,
        supported_guidance_kinds: &[GuidanceKind::Context],
        accepts_weight: false,
    },
];

static BY_NAME: Lazy<HashMap<&'static str, &'static ModelCapability>> = Lazy::new(|| {
    MODEL_CAPABILITIES
        .iter()
        .map(|cap| (cap.name, cap))
        .collect()
});

/// Look up a model's capabilities by name
pub fn capability(name: &str) -> Option<&'static ModelCapability> {
    BY_NAME.get(name).copied()
}
