//! Generation backend interfaces, job tracking, and auto model selection
//!
//! This crate is the media-generation half of the engine, independent of
//! any graph structure:
//!
//! - **Backend** ([`backend`]): the narrow collaborator traits the core
//!   drives (generation submit/poll, prompt enhancement, media upload)
//! - **Request** ([`request`]): the request shape handed to the backend,
//!   including reference-image guidance descriptors
//! - **Models** ([`models`]): the static model capability table
//! - **Selector** ([`selector`]): the auto-model elimination rule engine
//! - **Guidance** ([`guidance`]): guidance-kind resolution per model
//! - **Job** ([`job`]): job records and the session history tracker
//! - **Runner** ([`runner`]): the enhance/submit/poll state machine
//!
//! Workflow node adapters build on this crate; standalone prompt-to-media
//! generation uses [`runner::GenerationRunner::run_standalone`] directly.

pub mod backend;
pub mod error;
pub mod guidance;
pub mod job;
pub mod models;
pub mod request;
pub mod runner;
pub mod selector;

pub use backend::{
    BackendJobStatus, Enhancement, GeneratedMedia, GenerationBackend, JobHandle, MediaUpload,
    PromptEnhancer,
};
pub use error::{GenerationError, Result};
pub use guidance::{build_guidance, resolve_guidance_kind};
pub use job::{GenerationJob, JobStatus, JobTracker};
pub use models::{
    capability, ModelCapability, CONTEXT_MODEL, DEFAULT_MODEL, EDIT_MODEL, LONG_TEXT_MODEL,
    MODEL_CAPABILITIES, VIDEO_MODEL,
};
pub use request::{
    ControlnetRef, GenerationRequest, GuidanceKind, GuidanceSpec, StrengthLevel,
    MIN_ALCHEMY_CONTRAST,
};
pub use runner::{GenerationRunner, PollConfig, StandaloneParams};
pub use selector::{select_model, validate_selection, ModelSelection};
