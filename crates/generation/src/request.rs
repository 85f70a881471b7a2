//! Generation request construction
//!
//! [`GenerationRequest`] is the single shape the core hands to the backend
//! collaborator, whatever node kind produced it. Requests are assembled
//! with a builder so node adapters only state what differs from the
//! defaults.

use serde::{Deserialize, Serialize};

/// Semantic role a reference image plays in generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GuidanceKind {
    /// Raw context images interpreted freely by the model
    Context,
    /// Transfer the reference's visual style
    Style,
    /// Reproduce the reference's subject matter
    Content,
    /// Preserve a character's identity across generations
    Character,
}

impl std::fmt::Display for GuidanceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Context => write!(f, "CONTEXT"),
            Self::Style => write!(f, "STYLE"),
            Self::Content => write!(f, "CONTENT"),
            Self::Character => write!(f, "CHARACTER"),
        }
    }
}

/// Named guidance strength level
///
/// Some model families only accept a named level; others additionally take
/// a numeric weight (see [`ControlnetRef::weight`]).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrengthLevel {
    Low,
    #[default]
    Mid,
    High,
}

impl StrengthLevel {
    /// Numeric controlnet weight equivalent for families that take one
    pub fn weight(&self) -> f32 {
        match self {
            Self::Low => 0.5,
            Self::Mid => 0.75,
            Self::High => 1.0,
        }
    }
}

/// One reference image attached with an explicit guidance role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlnetRef {
    /// Backend reference id obtained from media upload
    pub image_id: String,
    pub kind: GuidanceKind,
    pub strength: StrengthLevel,
    /// Numeric weight; omitted for families that only accept a named level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f32>,
}

/// Reference-image guidance attached to a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GuidanceSpec {
    /// A plain list of context image ids (context-capable model families)
    ContextImages(Vec<String>),
    /// Controlnet-style descriptors with explicit roles
    Controlnets(Vec<ControlnetRef>),
}

/// Minimum contrast enforced when the alchemy quality mode is on
pub const MIN_ALCHEMY_CONTRAST: f32 = 2.5;

/// A fully-resolved request to the generation backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub prompt: String,
    /// Concrete model identifier; auto selection is resolved before this
    /// struct is built
    pub model_id: String,
    pub num_outputs: u32,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_preset: Option<String>,
    /// Quality mode; when set, `contrast` is floored at
    /// [`MIN_ALCHEMY_CONTRAST`]
    #[serde(default)]
    pub alchemy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contrast: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance: Option<GuidanceSpec>,
}

impl GenerationRequest {
    /// Create a request with one output and square default dimensions
    pub fn new(prompt: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model_id: model_id.into(),
            num_outputs: 1,
            width: 1024,
            height: 1024,
            seed: None,
            style_preset: None,
            alchemy: false,
            contrast: None,
            guidance: None,
        }
    }

    pub fn with_outputs(mut self, num_outputs: u32) -> Self {
        self.num_outputs = num_outputs.max(1);
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_style_preset(mut self, preset: Option<String>) -> Self {
        self.style_preset = preset;
        self
    }

    /// Enable the alchemy quality mode, flooring the contrast value
    pub fn with_alchemy(mut self, alchemy: bool) -> Self {
        self.alchemy = alchemy;
        if alchemy {
            let contrast = self.contrast.unwrap_or(0.0);
            self.contrast = Some(contrast.max(MIN_ALCHEMY_CONTRAST));
        }
        self
    }

    pub fn with_guidance(mut self, guidance: Option<GuidanceSpec>) -> Self {
        self.guidance = guidance;
        self
    }
}
