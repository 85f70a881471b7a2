//! Auto-model selector
//!
//! A pure rule engine mapping (recommendation tags, reference image count,
//! original prompt) to a concrete model plus an optional guidance
//! recommendation. The elimination order is fixed and load-bearing:
//! image-edit markers win over everything, reference images win over text
//! needs, and only then do text complexity and guidance preferences narrow
//! the capability table.
//!
//! Tags are matched by substring against a fixed vocabulary the prompt
//! enhancer emits in upper case (`IMAGE EDIT`, `NEEDS TEXT LONG`,
//! `NEEDS TEXT SHORT`, `NEEDS TEXT`, `STYLE REF`, `CONTENT REF`,
//! `CHARACTER REF`). Any separator between markers is tolerated.

use crate::models::{
    capability, ModelCapability, CONTEXT_MODEL, DEFAULT_MODEL, EDIT_MODEL, LONG_TEXT_MODEL,
    MODEL_CAPABILITIES,
};
use crate::request::GuidanceKind;

/// Marker for instruction-driven edits of an existing image
pub const TAG_IMAGE_EDIT: &str = "IMAGE EDIT";
/// Marker for long rendered text (sentences, paragraphs)
pub const TAG_NEEDS_TEXT_LONG: &str = "NEEDS TEXT LONG";
/// Marker for short rendered text (a word or two)
pub const TAG_NEEDS_TEXT_SHORT: &str = "NEEDS TEXT SHORT";
/// Marker for rendered text of unspecified complexity
pub const TAG_NEEDS_TEXT: &str = "NEEDS TEXT";
pub const TAG_STYLE_REF: &str = "STYLE REF";
pub const TAG_CONTENT_REF: &str = "CONTENT REF";
pub const TAG_CHARACTER_REF: &str = "CHARACTER REF";

/// Result of automatic model selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub model: String,
    /// Guidance recommendation for attached reference images, if any
    pub guidance: Option<GuidanceKind>,
}

impl ModelSelection {
    fn new(model: &str, guidance: Option<GuidanceKind>) -> Self {
        Self {
            model: model.to_string(),
            guidance,
        }
    }
}

/// Rendered-text complexity inferred from tags and the original prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextComplexity {
    Short,
    Long,
}

/// Guidance kinds requested by the tags, in vocabulary order
fn preferred_guidance(tags: &str) -> Vec<GuidanceKind> {
    let mut kinds = Vec::new();
    if tags.contains(TAG_STYLE_REF) {
        kinds.push(GuidanceKind::Style);
    }
    if tags.contains(TAG_CONTENT_REF) {
        kinds.push(GuidanceKind::Content);
    }
    if tags.contains(TAG_CHARACTER_REF) {
        kinds.push(GuidanceKind::Character);
    }
    kinds
}

/// The first preferred kind the model actually supports
fn guidance_for_model(model: &str, preferred: &[GuidanceKind]) -> Option<GuidanceKind> {
    let caps = capability(model)?;
    preferred.iter().copied().find(|k| caps.supports(*k))
}

/// Word count of the first double-quoted substring, if any
fn quoted_word_count(prompt: &str) -> Option<usize> {
    let mut parts = prompt.split('"');
    parts.next()?;
    let quoted = parts.next()?;
    Some(quoted.split_whitespace().count())
}

fn classify_text_complexity(tags: &str, original_prompt: Option<&str>) -> TextComplexity {
    // Explicit markers take precedence
    if tags.contains(TAG_NEEDS_TEXT_LONG) {
        return TextComplexity::Long;
    }
    if tags.contains(TAG_NEEDS_TEXT_SHORT) {
        return TextComplexity::Short;
    }

    if let Some(prompt) = original_prompt {
        if let Some(words) = quoted_word_count(prompt) {
            return if words <= 2 {
                TextComplexity::Short
            } else {
                TextComplexity::Long
            };
        }
        let lowered = prompt.to_lowercase();
        if ["paragraph", "sentence", "story"]
            .iter()
            .any(|kw| lowered.contains(kw))
        {
            return TextComplexity::Long;
        }
    }
    TextComplexity::Short
}

/// Select a model from recommendation tags and contextual signals
///
/// Precedence, in order:
/// 1. An image-edit marker routes to the edit model unconditionally.
/// 2. Any reference image routes to the context-capable model.
/// 3. Rendered-text needs route by complexity (long/short).
/// 4. Otherwise the capability table is filtered by preferred guidance
///    kinds (kept unfiltered if that would empty it) and the lowest-rank
///    candidate wins.
pub fn select_model(
    tags: &str,
    reference_image_count: u32,
    original_prompt: Option<&str>,
) -> ModelSelection {
    if tags.contains(TAG_IMAGE_EDIT) {
        let guidance = (reference_image_count > 0).then_some(GuidanceKind::Context);
        return ModelSelection::new(EDIT_MODEL, guidance);
    }

    if reference_image_count > 0 {
        return ModelSelection::new(CONTEXT_MODEL, Some(GuidanceKind::Context));
    }

    let preferred = preferred_guidance(tags);

    if tags.contains(TAG_NEEDS_TEXT) {
        let model = match classify_text_complexity(tags, original_prompt) {
            TextComplexity::Long => LONG_TEXT_MODEL,
            TextComplexity::Short => DEFAULT_MODEL,
        };
        return ModelSelection::new(model, guidance_for_model(model, &preferred));
    }

    let mut candidates: Vec<&ModelCapability> = MODEL_CAPABILITIES.iter().collect();
    if !preferred.is_empty() {
        let filtered: Vec<_> = candidates
            .iter()
            .copied()
            .filter(|c| preferred.iter().any(|k| c.supports(*k)))
            .collect();
        // Never eliminate down to nothing
        if !filtered.is_empty() {
            candidates = filtered;
        }
    }

    match candidates.iter().min_by_key(|c| c.rank) {
        Some(winner) => ModelSelection::new(winner.name, None),
        None => ModelSelection::new(DEFAULT_MODEL, None),
    }
}

/// Check a selected model against a node type's declared model list
///
/// Selection never hard-fails: an unknown model is substituted with the
/// general default and reported as a warning.
pub fn validate_selection(model: &str, supported_models: &[String]) -> String {
    if supported_models.iter().any(|m| m == model) {
        model.to_string()
    } else {
        log::warn!(
            "selected model '{}' is not in the node type's model list; substituting '{}'",
            model,
            DEFAULT_MODEL
        );
        DEFAULT_MODEL.to_string()
    }
}
