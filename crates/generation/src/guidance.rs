//! Reference-image guidance resolution
//!
//! Given a target model and the reference images attached to a node, this
//! module decides how those images ride along on the request: context-only
//! model families take a plain id list, everything else gets
//! controlnet-style descriptors with an explicit guidance kind.

use crate::models::capability;
use crate::request::{ControlnetRef, GuidanceKind, GuidanceSpec, StrengthLevel};

/// Fallback preference when no recommendation applies
const KIND_PREFERENCE: [GuidanceKind; 3] = [
    GuidanceKind::Style,
    GuidanceKind::Content,
    GuidanceKind::Character,
];

/// Resolve the guidance kind to use for a model's reference images
///
/// A recommended kind (from the auto-model selector) is preferred when the
/// model supports it; otherwise the model's first supported kind in
/// STYLE → CONTENT → CHARACTER order is used. Returns `None` for models
/// with no guidance support at all.
pub fn resolve_guidance_kind(model: &str, recommended: Option<GuidanceKind>) -> Option<GuidanceKind> {
    let caps = capability(model)?;
    if let Some(kind) = recommended {
        if caps.supports(kind) {
            return Some(kind);
        }
    }
    KIND_PREFERENCE.into_iter().find(|k| caps.supports(*k))
}

/// Build the guidance payload for a request from uploaded reference ids
///
/// Context guidance becomes a plain id list; any other kind becomes
/// controlnet descriptors. Families that take a numeric weight get the
/// strength level's equivalent alongside it; the rest carry the named
/// level only. Returns `None` when there are no references or the model
/// supports no guidance.
pub fn build_guidance(
    model: &str,
    reference_ids: &[String],
    recommended: Option<GuidanceKind>,
) -> Option<GuidanceSpec> {
    if reference_ids.is_empty() {
        return None;
    }
    let caps = capability(model)?;
    let kind = resolve_guidance_kind(model, recommended)?;
    if kind == GuidanceKind::Context {
        return Some(GuidanceSpec::ContextImages(reference_ids.to_vec()));
    }
    let strength = StrengthLevel::Mid;
    let weight = caps.accepts_weight.then_some(strength.weight());
    let controlnets = reference_ids
        .iter()
        .map(|id| ControlnetRef {
            image_id: id.clone(),
            kind,
            strength,
            weight,
        })
        .collect();
    Some(GuidanceSpec::Controlnets(controlnets))
}
