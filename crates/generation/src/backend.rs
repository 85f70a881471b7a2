//! Collaborator interfaces
//!
//! The core drives generation through three narrow traits: the generation
//! backend (submit/poll), the prompt enhancer, and media upload. Hosts
//! implement them against a real provider; tests script them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::request::GenerationRequest;

/// Opaque handle to a submitted backend job
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle(pub String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

/// One media item produced by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedMedia {
    /// Backend reference id, when the provider exposes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    pub url: String,
}

impl GeneratedMedia {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            reference_id: None,
            url: url.into(),
        }
    }

    pub fn with_reference(reference_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            reference_id: Some(reference_id.into()),
            url: url.into(),
        }
    }
}

/// Status of a submitted backend job, as reported by polling
#[derive(Debug, Clone, PartialEq)]
pub enum BackendJobStatus {
    /// Queued, not yet started
    Pending,
    /// Generation in progress
    Processing,
    /// Finished; carries the produced media
    Complete(Vec<GeneratedMedia>),
    /// Failed with a provider error message
    Failed(String),
}

impl BackendJobStatus {
    /// Whether this status ends the poll loop
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete(_) | Self::Failed(_))
    }
}

/// The generation provider, reduced to submit-then-poll
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Submit a generation request, returning a pollable handle
    async fn submit(&self, request: &GenerationRequest) -> Result<JobHandle>;

    /// Poll a previously submitted job
    async fn poll(&self, handle: &JobHandle) -> Result<BackendJobStatus>;
}

/// Result of a prompt enhancement call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enhancement {
    pub enhanced_prompt: String,
    /// Marker string consumed by the auto-model selector
    pub recommendation_tags: String,
}

impl Enhancement {
    /// An enhancement that leaves the prompt untouched and carries no tags
    ///
    /// Used as the fallback when the enhancer is absent or fails.
    pub fn passthrough(prompt: impl Into<String>) -> Self {
        Self {
            enhanced_prompt: prompt.into(),
            recommendation_tags: String::new(),
        }
    }
}

/// The prompt enhancement collaborator
#[async_trait]
pub trait PromptEnhancer: Send + Sync {
    /// Rewrite a prompt and emit model recommendation tags
    async fn enhance(&self, prompt: &str) -> Result<Enhancement>;
}

/// The media upload collaborator
///
/// Reference images must be materialized into backend-recognized ids
/// before they can be attached to a request.
#[async_trait]
pub trait MediaUpload: Send + Sync {
    /// Upload a file, returning its backend reference id
    async fn upload(&self, bytes: &[u8], filename: &str) -> Result<String>;
}
