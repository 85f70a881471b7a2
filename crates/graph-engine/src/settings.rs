//! Per-node-type settings
//!
//! Every node instance owns a settings record whose shape is fixed by its
//! type key. The shapes are a tagged union selected by the same key the
//! registry uses, so settings edits are field-checked at compile time while
//! the graph stays polymorphic over node kinds.
//!
//! Settings edits from the UI arrive as partial JSON objects; see
//! [`NodeSettings::merge_patch`] for the shallow-merge contract.

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};

/// Model selection on a generation node
///
/// Serialized as a plain string; the sentinel `"auto"` (case-insensitive)
/// selects automatic model selection, anything else names a model directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ModelChoice {
    /// Let the auto-model selector pick based on the enhanced prompt
    Auto,
    /// A concrete model name
    Named(String),
}

impl From<String> for ModelChoice {
    fn from(value: String) -> Self {
        if value.eq_ignore_ascii_case("auto") {
            Self::Auto
        } else {
            Self::Named(value)
        }
    }
}

impl From<ModelChoice> for String {
    fn from(value: ModelChoice) -> Self {
        match value {
            ModelChoice::Auto => "auto".to_string(),
            ModelChoice::Named(name) => name,
        }
    }
}

impl ModelChoice {
    /// Whether automatic selection is requested
    pub fn is_auto(&self) -> bool {
        matches!(self, Self::Auto)
    }
}

/// Output aspect ratio, mapped to concrete pixel dimensions at request time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "16:9")]
    Wide,
    #[serde(rename = "9:16")]
    Tall,
    #[serde(rename = "4:3")]
    Classic,
    #[serde(rename = "3:4")]
    ClassicPortrait,
    #[serde(rename = "3:2")]
    Photo,
    #[serde(rename = "2:3")]
    PhotoPortrait,
}

impl AspectRatio {
    /// Pixel dimensions (width, height) for this ratio
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::Square => (1024, 1024),
            Self::Wide => (1536, 864),
            Self::Tall => (864, 1536),
            Self::Classic => (1152, 864),
            Self::ClassicPortrait => (864, 1152),
            Self::Photo => (1248, 832),
            Self::PhotoPortrait => (832, 1248),
        }
    }
}

/// Settings for an `image-generation` node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageGenerationSettings {
    /// Fallback prompt when the Prompt input port is unconnected
    pub prompt: String,
    /// Model to use, or `auto` for automatic selection
    pub model: ModelChoice,
    /// Number of images to produce; drives output port fan-out
    pub num_images: u32,
    pub aspect_ratio: AspectRatio,
    pub seed: Option<u64>,
    pub style_preset: Option<String>,
    /// Quality mode; forces a minimum contrast on capable model families
    pub alchemy: bool,
    /// Run the prompt through the enhancer before submitting
    pub enhance_prompt: bool,
}

impl Default for ImageGenerationSettings {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            model: ModelChoice::Auto,
            num_images: 1,
            aspect_ratio: AspectRatio::Square,
            seed: None,
            style_preset: None,
            alchemy: false,
            enhance_prompt: false,
        }
    }
}

/// Settings for a `video-generation` node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoGenerationSettings {
    pub prompt: String,
    pub model: ModelChoice,
    /// Number of clips to produce; drives output port fan-out
    pub num_videos: u32,
    pub aspect_ratio: AspectRatio,
    pub seed: Option<u64>,
}

impl Default for VideoGenerationSettings {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            model: ModelChoice::Auto,
            num_videos: 1,
            aspect_ratio: AspectRatio::Wide,
            seed: None,
        }
    }
}

/// Settings for an `image-edit` node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageEditSettings {
    /// Edit instruction when the Prompt input port is unconnected
    pub instruction: String,
    pub num_images: u32,
    pub seed: Option<u64>,
}

impl Default for ImageEditSettings {
    fn default() -> Self {
        Self {
            instruction: String::new(),
            num_images: 1,
            seed: None,
        }
    }
}

/// Per-instance settings, tagged by settings shape
///
/// The tag names one of the built-in shapes; custom node types pick
/// whichever shape fits via their definition's `default_settings`.
/// [`NodeSettings::merge_patch`] rejects patches that attempt to change it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeSettings {
    #[serde(rename = "input-text", rename_all = "camelCase")]
    InputText { text: String },

    #[serde(rename = "input-image", rename_all = "camelCase")]
    InputImage {
        /// Backend reference id, once the image has been uploaded
        reference_id: Option<String>,
        url: Option<String>,
    },

    #[serde(rename = "input-video", rename_all = "camelCase")]
    InputVideo { url: Option<String> },

    #[serde(rename = "image-generation")]
    ImageGeneration(ImageGenerationSettings),

    #[serde(rename = "video-generation")]
    VideoGeneration(VideoGenerationSettings),

    #[serde(rename = "image-edit")]
    ImageEdit(ImageEditSettings),
}

impl NodeSettings {
    /// The node type key this settings shape belongs to
    pub fn type_key(&self) -> &'static str {
        match self {
            Self::InputText { .. } => "input-text",
            Self::InputImage { .. } => "input-image",
            Self::InputVideo { .. } => "input-video",
            Self::ImageGeneration(_) => "image-generation",
            Self::VideoGeneration(_) => "video-generation",
            Self::ImageEdit(_) => "image-edit",
        }
    }

    /// Output fan-out count for node kinds whose output cardinality is a
    /// setting; `None` for fixed-output kinds.
    pub fn fan_out_count(&self) -> Option<u32> {
        match self {
            Self::ImageGeneration(s) => Some(s.num_images),
            Self::VideoGeneration(s) => Some(s.num_videos),
            Self::ImageEdit(s) => Some(s.num_images),
            _ => None,
        }
    }

    /// Shallow-merge a partial settings object into this record
    ///
    /// Top-level keys of `patch` replace the corresponding fields; keys the
    /// shape does not declare are rejected, as is any attempt to change the
    /// `type` tag. The record is untouched on error.
    pub fn merge_patch(&mut self, patch: &serde_json::Value) -> Result<()> {
        let patch_obj = patch
            .as_object()
            .ok_or_else(|| GraphError::Settings("settings patch must be an object".to_string()))?;

        if let Some(tag) = patch_obj.get("type").and_then(|t| t.as_str()) {
            if tag != self.type_key() {
                return Err(GraphError::Settings(format!(
                    "cannot change settings type from '{}' to '{}'",
                    self.type_key(),
                    tag
                )));
            }
        }

        let mut merged = serde_json::to_value(&*self)?;
        let merged_obj = merged
            .as_object_mut()
            .ok_or_else(|| GraphError::Settings("settings did not serialize to an object".to_string()))?;

        for (key, value) in patch_obj {
            if key == "type" {
                continue;
            }
            if !merged_obj.contains_key(key) {
                return Err(GraphError::Settings(format!(
                    "'{}' settings have no field '{}'",
                    self.type_key(),
                    key
                )));
            }
            merged_obj.insert(key.clone(), value.clone());
        }

        *self = serde_json::from_value(merged)
            .map_err(|e| GraphError::Settings(format!("invalid settings patch: {}", e)))?;
        Ok(())
    }
}
