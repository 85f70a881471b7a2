//! Runtime collaborator injection for node executors
//!
//! Node adapters need live services that cannot be serialized with the
//! workflow: the generation runner driving enhance/submit/poll, a media
//! upload client, a job tracker. Hosts bundle them into an
//! [`ExecutorExtensions`] map under the key conventions in
//! [`extension_keys`], and the scheduler threads the map into every
//! executor through [`RunContext`](crate::scheduler::RunContext).
//!
//! # Example
//!
//! ```ignore
//! use graph_engine::{extension_keys, ExecutorExtensions};
//! use std::sync::Arc;
//!
//! let mut ext = ExecutorExtensions::new();
//! ext.set(extension_keys::GENERATION_RUNNER, runner.clone());
//!
//! // In a NodeExecutor:
//! let runner = ctx
//!     .extensions
//!     .require::<Arc<GenerationRunner>>(extension_keys::GENERATION_RUNNER)?;
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{GraphError, Result};

/// Well-known extension keys used by the built-in node adapters
pub mod extension_keys {
    /// `Arc<GenerationRunner>` driving enhance/submit/poll
    pub const GENERATION_RUNNER: &str = "generation_runner";
    /// `Arc<dyn MediaUpload>` for materializing local reference images
    pub const MEDIA_UPLOAD: &str = "media_upload";
}

/// Keyed map of host-provided collaborators, stored type-erased
///
/// Entries are reference-counted internally so the map itself stays cheap
/// to share behind a `RunContext` for the lifetime of a run. Settings hold
/// everything serializable; this holds everything that is not.
#[derive(Default)]
pub struct ExecutorExtensions {
    entries: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl ExecutorExtensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collaborator under a key, replacing any previous value
    pub fn set<T: Send + Sync + 'static>(&mut self, key: &str, value: T) {
        self.entries.insert(key.to_string(), Arc::new(value));
    }

    /// Look up a collaborator by key and concrete type
    ///
    /// Returns `None` when the key is absent or holds a different type.
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<&T> {
        self.entries.get(key).and_then(|entry| entry.downcast_ref())
    }

    /// Look up a collaborator the executor cannot run without
    ///
    /// A missing or wrongly-typed entry becomes an execution failure
    /// naming the key, so a misconfigured host surfaces as a node error
    /// instead of a panic.
    pub fn require<T: Send + Sync + 'static>(&self, key: &str) -> Result<&T> {
        self.get(key)
            .ok_or_else(|| GraphError::failed(format!("extension '{key}' is not configured")))
    }

    /// Whether any collaborator is registered under a key
    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Uploader: Send + Sync {
        fn upload(&self, filename: &str) -> String;
    }

    impl std::fmt::Debug for dyn Uploader {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("dyn Uploader")
        }
    }

    struct FixedUploader;

    impl Uploader for FixedUploader {
        fn upload(&self, _filename: &str) -> String {
            "ref-9".to_string()
        }
    }

    struct StubTracker {
        label: &'static str,
    }

    #[test]
    fn test_trait_object_collaborator_round_trips() {
        let mut ext = ExecutorExtensions::new();
        let uploader: Arc<dyn Uploader> = Arc::new(FixedUploader);
        ext.set(extension_keys::MEDIA_UPLOAD, uploader);

        let retrieved = ext
            .get::<Arc<dyn Uploader>>(extension_keys::MEDIA_UPLOAD)
            .unwrap();
        assert_eq!(retrieved.upload("cat.png"), "ref-9");
        assert!(ext.has(extension_keys::MEDIA_UPLOAD));
    }

    #[test]
    fn test_require_names_the_missing_key() {
        let ext = ExecutorExtensions::new();
        let err = ext
            .require::<Arc<dyn Uploader>>(extension_keys::GENERATION_RUNNER)
            .unwrap_err();
        assert!(err.to_string().contains("generation_runner"));
    }

    #[test]
    fn test_wrong_type_is_treated_as_missing() {
        let mut ext = ExecutorExtensions::new();
        ext.set(extension_keys::GENERATION_RUNNER, "not a runner".to_string());

        assert!(ext.has(extension_keys::GENERATION_RUNNER));
        assert!(ext
            .get::<Arc<dyn Uploader>>(extension_keys::GENERATION_RUNNER)
            .is_none());
        assert!(ext
            .require::<Arc<dyn Uploader>>(extension_keys::GENERATION_RUNNER)
            .is_err());
    }

    #[test]
    fn test_replacement_keeps_the_latest_collaborator() {
        let mut ext = ExecutorExtensions::new();
        ext.set("tracker", Arc::new(StubTracker { label: "first" }));
        ext.set("tracker", Arc::new(StubTracker { label: "second" }));

        let tracker = ext.get::<Arc<StubTracker>>("tracker").unwrap();
        assert_eq!(tracker.label, "second");
    }
}
