//! Generation job runner
//!
//! Drives the per-job state machine: optional enhancement, then submit to
//! the backend, then a fixed-interval poll loop until the backend reports
//! a terminal status. Enhancement failure is non-fatal; the original
//! prompt is used and auto selection degrades to the default model.
//!
//! The poll loop suspends only at the enhancer call, the submit call, and
//! each poll. It checks for cooperative cancellation before every poll and
//! gives up after a bounded number of attempts so a silent backend cannot
//! hold a job in `loading` forever.

use std::sync::Arc;
use std::time::Duration;

use crate::backend::{
    BackendJobStatus, Enhancement, GeneratedMedia, GenerationBackend, PromptEnhancer,
};
use crate::error::{GenerationError, Result};
use crate::job::{JobStatus, JobTracker};
use crate::request::GenerationRequest;
use crate::selector::select_model;

/// Poll loop timing
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay between consecutive polls
    pub interval: Duration,
    /// Attempts before the job is failed as timed out (400 at the default
    /// interval is roughly twenty minutes)
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            max_attempts: 400,
        }
    }
}

/// Parameters for a standalone (non-graph) generation
///
/// `model` of `None` requests auto selection, which implies enhancement.
#[derive(Debug, Clone)]
pub struct StandaloneParams {
    pub prompt: String,
    pub model: Option<String>,
    pub num_outputs: u32,
    pub width: u32,
    pub height: u32,
    pub seed: Option<u64>,
    pub style_preset: Option<String>,
    pub alchemy: bool,
    pub enhance: bool,
}

impl StandaloneParams {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: None,
            num_outputs: 1,
            width: 1024,
            height: 1024,
            seed: None,
            style_preset: None,
            alchemy: false,
            enhance: false,
        }
    }
}

/// Runs generation jobs against the backend, recording them in the tracker
pub struct GenerationRunner {
    backend: Arc<dyn GenerationBackend>,
    enhancer: Option<Arc<dyn PromptEnhancer>>,
    tracker: Arc<JobTracker>,
    poll: PollConfig,
}

impl std::fmt::Debug for GenerationRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationRunner")
            .field("enhancer", &self.enhancer.is_some())
            .field("poll", &self.poll)
            .finish_non_exhaustive()
    }
}

impl GenerationRunner {
    pub fn new(backend: Arc<dyn GenerationBackend>, tracker: Arc<JobTracker>) -> Self {
        Self {
            backend,
            enhancer: None,
            tracker,
            poll: PollConfig::default(),
        }
    }

    pub fn with_enhancer(mut self, enhancer: Arc<dyn PromptEnhancer>) -> Self {
        self.enhancer = Some(enhancer);
        self
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn tracker(&self) -> &Arc<JobTracker> {
        &self.tracker
    }

    /// Enhance a prompt, falling back to the original on any failure
    ///
    /// The fallback carries no recommendation tags, so auto selection
    /// degrades to the default model.
    pub async fn enhance_or_original(&self, prompt: &str) -> Enhancement {
        match &self.enhancer {
            Some(enhancer) => match enhancer.enhance(prompt).await {
                Ok(enhancement) => enhancement,
                Err(e) => {
                    log::warn!("prompt enhancement failed, using original prompt: {}", e);
                    Enhancement::passthrough(prompt)
                }
            },
            None => Enhancement::passthrough(prompt),
        }
    }

    /// Submit a request and poll it to a terminal status
    ///
    /// The job record is moved to `loading` on entry and ends `completed`
    /// or `error`. A completion with zero media is treated as a backend
    /// failure.
    pub async fn run_to_completion(
        &self,
        job_id: &str,
        request: &GenerationRequest,
        cancelled: &(dyn Fn() -> bool + Send + Sync),
    ) -> Result<Vec<GeneratedMedia>> {
        self.tracker.set_status(job_id, JobStatus::Loading);
        self.tracker
            .set_resolved_model(job_id, request.model_id.clone());

        let handle = match self.backend.submit(request).await {
            Ok(handle) => handle,
            Err(e) => {
                self.tracker.fail(job_id, e.to_string());
                return Err(e);
            }
        };
        log::debug!("job {} submitted as backend job {}", job_id, handle.0);

        for attempt in 0..self.poll.max_attempts {
            if cancelled() {
                self.tracker.fail(job_id, "cancelled");
                return Err(GenerationError::Cancelled);
            }
            let status = match self.backend.poll(&handle).await {
                Ok(status) => status,
                Err(e) => {
                    self.tracker.fail(job_id, e.to_string());
                    return Err(e);
                }
            };
            match status {
                BackendJobStatus::Pending | BackendJobStatus::Processing => {
                    log::trace!("job {} still running (attempt {})", job_id, attempt + 1);
                    tokio::time::sleep(self.poll.interval).await;
                }
                BackendJobStatus::Complete(media) => {
                    if media.is_empty() {
                        let err = GenerationError::EmptyResult;
                        self.tracker.fail(job_id, err.to_string());
                        return Err(err);
                    }
                    self.tracker.complete(job_id, media.clone());
                    return Ok(media);
                }
                BackendJobStatus::Failed(message) => {
                    self.tracker.fail(job_id, message.clone());
                    return Err(GenerationError::Backend(message));
                }
            }
        }

        let err = GenerationError::Timeout {
            attempts: self.poll.max_attempts,
        };
        self.tracker.fail(job_id, err.to_string());
        Err(err)
    }

    /// Run a standalone prompt-to-media generation outside any workflow
    ///
    /// Returns the job id alongside the produced media; the job stays in
    /// the tracker's history either way.
    pub async fn run_standalone(
        &self,
        params: StandaloneParams,
    ) -> Result<(String, Vec<GeneratedMedia>)> {
        let auto = params.model.is_none();
        let needs_enhancement = params.enhance || auto;
        let requested = params.model.clone().unwrap_or_else(|| "auto".to_string());
        let initial = if needs_enhancement {
            JobStatus::Enhancing
        } else {
            JobStatus::Loading
        };
        let job_id = self
            .tracker
            .start(None, params.prompt.clone(), requested, initial);

        let (prompt, tags) = if needs_enhancement {
            let enhancement = self.enhance_or_original(&params.prompt).await;
            (enhancement.enhanced_prompt, enhancement.recommendation_tags)
        } else {
            (params.prompt.clone(), String::new())
        };

        let model = match params.model {
            Some(model) => model,
            None => select_model(&tags, 0, Some(&params.prompt)).model,
        };

        let request = GenerationRequest::new(prompt, model)
            .with_outputs(params.num_outputs)
            .with_dimensions(params.width, params.height)
            .with_seed(params.seed)
            .with_style_preset(params.style_preset)
            .with_alchemy(params.alchemy);

        let media = self.run_to_completion(&job_id, &request, &|| false).await?;
        Ok((job_id, media))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DEFAULT_MODEL, LONG_TEXT_MODEL};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    struct ScriptedBackend {
        statuses: Mutex<VecDeque<BackendJobStatus>>,
        submitted: Mutex<Vec<GenerationRequest>>,
    }

    impl ScriptedBackend {
        fn new(statuses: Vec<BackendJobStatus>) -> Arc<Self> {
            Arc::new(Self {
                statuses: Mutex::new(statuses.into()),
                submitted: Mutex::new(Vec::new()),
            })
        }

        fn last_request(&self) -> GenerationRequest {
            self.submitted.lock().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl GenerationBackend for ScriptedBackend {
        async fn submit(&self, request: &GenerationRequest) -> Result<crate::backend::JobHandle> {
            self.submitted.lock().push(request.clone());
            Ok(crate::backend::JobHandle::new("backend-1"))
        }

        async fn poll(&self, _handle: &crate::backend::JobHandle) -> Result<BackendJobStatus> {
            Ok(self
                .statuses
                .lock()
                .pop_front()
                .unwrap_or(BackendJobStatus::Pending))
        }
    }

    struct TaggingEnhancer {
        tags: &'static str,
    }

    #[async_trait]
    impl PromptEnhancer for TaggingEnhancer {
        async fn enhance(&self, prompt: &str) -> Result<Enhancement> {
            Ok(Enhancement {
                enhanced_prompt: format!("{prompt}, highly detailed"),
                recommendation_tags: self.tags.to_string(),
            })
        }
    }

    struct BrokenEnhancer;

    #[async_trait]
    impl PromptEnhancer for BrokenEnhancer {
        async fn enhance(&self, _prompt: &str) -> Result<Enhancement> {
            Err(GenerationError::Enhancement("model overloaded".to_string()))
        }
    }

    fn media(url: &str) -> GeneratedMedia {
        GeneratedMedia::new(url)
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_complete() {
        let backend = ScriptedBackend::new(vec![
            BackendJobStatus::Pending,
            BackendJobStatus::Processing,
            BackendJobStatus::Complete(vec![media("https://cdn/1.png")]),
        ]);
        let tracker = Arc::new(JobTracker::new());
        let runner = GenerationRunner::new(backend, tracker.clone());

        let job_id = tracker.start(None, "a cat", "chroma-xl", JobStatus::Loading);
        let request = GenerationRequest::new("a cat", "chroma-xl");
        let result = runner
            .run_to_completion(&job_id, &request, &|| false)
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        let job = tracker.get(&job_id).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.resolved_model.as_deref(), Some("chroma-xl"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backend_failure_fails_the_job() {
        let backend = ScriptedBackend::new(vec![
            BackendJobStatus::Processing,
            BackendJobStatus::Failed("quota exceeded".to_string()),
        ]);
        let tracker = Arc::new(JobTracker::new());
        let runner = GenerationRunner::new(backend, tracker.clone());

        let job_id = tracker.start(None, "a cat", "chroma-xl", JobStatus::Loading);
        let request = GenerationRequest::new("a cat", "chroma-xl");
        let err = runner
            .run_to_completion(&job_id, &request, &|| false)
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::Backend(_)));
        let job = tracker.get(&job_id).unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert!(job.error.as_deref().unwrap().contains("quota"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_completion_is_a_failure() {
        let backend = ScriptedBackend::new(vec![BackendJobStatus::Complete(vec![])]);
        let tracker = Arc::new(JobTracker::new());
        let runner = GenerationRunner::new(backend, tracker.clone());

        let job_id = tracker.start(None, "a cat", "chroma-xl", JobStatus::Loading);
        let request = GenerationRequest::new("a cat", "chroma-xl");
        let err = runner
            .run_to_completion(&job_id, &request, &|| false)
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::EmptyResult));
        assert_eq!(tracker.get(&job_id).unwrap().status, JobStatus::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_attempt_limit() {
        let backend = ScriptedBackend::new(vec![]);
        let tracker = Arc::new(JobTracker::new());
        let runner = GenerationRunner::new(backend, tracker.clone()).with_poll_config(PollConfig {
            interval: Duration::from_secs(3),
            max_attempts: 5,
        });

        let job_id = tracker.start(None, "a cat", "chroma-xl", JobStatus::Loading);
        let request = GenerationRequest::new("a cat", "chroma-xl");
        let err = runner
            .run_to_completion(&job_id, &request, &|| false)
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::Timeout { attempts: 5 }));
        assert_eq!(tracker.get(&job_id).unwrap().status, JobStatus::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_checked_before_polling() {
        let backend = ScriptedBackend::new(vec![BackendJobStatus::Complete(vec![media("x")])]);
        let tracker = Arc::new(JobTracker::new());
        let runner = GenerationRunner::new(backend, tracker.clone());

        let job_id = tracker.start(None, "a cat", "chroma-xl", JobStatus::Loading);
        let request = GenerationRequest::new("a cat", "chroma-xl");
        let err = runner
            .run_to_completion(&job_id, &request, &|| true)
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::Cancelled));
        let job = tracker.get(&job_id).unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.error.as_deref(), Some("cancelled"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_standalone_auto_uses_enhancer_tags() {
        let backend = ScriptedBackend::new(vec![BackendJobStatus::Complete(vec![media("x")])]);
        let tracker = Arc::new(JobTracker::new());
        let runner = GenerationRunner::new(backend.clone(), tracker.clone())
            .with_enhancer(Arc::new(TaggingEnhancer {
                tags: "NEEDS TEXT LONG",
            }));

        let (job_id, media) = runner
            .run_standalone(StandaloneParams::new("a novel cover"))
            .await
            .unwrap();

        assert_eq!(media.len(), 1);
        let request = backend.last_request();
        assert_eq!(request.model_id, LONG_TEXT_MODEL);
        assert!(request.prompt.contains("highly detailed"));
        let job = tracker.get(&job_id).unwrap();
        assert_eq!(job.requested_model, "auto");
        assert_eq!(job.resolved_model.as_deref(), Some(LONG_TEXT_MODEL));
    }

    #[tokio::test(start_paused = true)]
    async fn test_standalone_enhancement_failure_falls_back() {
        let backend = ScriptedBackend::new(vec![BackendJobStatus::Complete(vec![media("x")])]);
        let tracker = Arc::new(JobTracker::new());
        let runner = GenerationRunner::new(backend.clone(), tracker.clone())
            .with_enhancer(Arc::new(BrokenEnhancer));

        let (job_id, _) = runner
            .run_standalone(StandaloneParams::new("a cat"))
            .await
            .unwrap();

        // Original prompt, default model, job still completes
        let request = backend.last_request();
        assert_eq!(request.prompt, "a cat");
        assert_eq!(request.model_id, DEFAULT_MODEL);
        assert_eq!(tracker.get(&job_id).unwrap().status, JobStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_standalone_named_model_skips_selection() {
        let backend = ScriptedBackend::new(vec![BackendJobStatus::Complete(vec![media("x")])]);
        let tracker = Arc::new(JobTracker::new());
        let runner = GenerationRunner::new(backend.clone(), tracker.clone());

        let mut params = StandaloneParams::new("a cat");
        params.model = Some("chroma-cinema".to_string());
        params.num_outputs = 2;
        let (job_id, _) = runner.run_standalone(params).await.unwrap();

        let request = backend.last_request();
        assert_eq!(request.model_id, "chroma-cinema");
        assert_eq!(request.num_outputs, 2);
        // No enhancement requested and model named: job starts at loading
        assert_eq!(
            tracker.get(&job_id).unwrap().requested_model,
            "chroma-cinema"
        );
    }
}
