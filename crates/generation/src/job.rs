//! Generation job records and the shared history tracker
//!
//! Every generation (graph-driven or standalone) is tracked as a
//! [`GenerationJob`] moving through `enhancing → loading → completed |
//! error`. Jobs live in an append-only history list for the session;
//! completed jobs stay as generation history, error jobs can be dismissed.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::backend::GeneratedMedia;

/// Lifecycle status of a generation job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting on the prompt enhancer
    Enhancing,
    /// Submitted to the backend; polling for completion
    Loading,
    /// Finished with media
    Completed,
    /// Failed; the error message is recorded on the job
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

/// One unit of asynchronous generation work, tracked to a terminal status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationJob {
    pub id: String,
    /// Originating workflow node, absent for standalone jobs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    pub prompt: String,
    /// Model as requested ("auto" or a concrete name)
    pub requested_model: String,
    /// Model actually used; differs from the request under auto selection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_model: Option<String>,
    pub status: JobStatus,
    #[serde(default)]
    pub outputs: Vec<GeneratedMedia>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Append-only, thread-safe job history keyed by job id
///
/// Concurrent standalone jobs insert and update independently; the
/// tracker is the only state they share.
#[derive(Default)]
pub struct JobTracker {
    jobs: Mutex<Vec<GenerationJob>>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new job and return its id
    pub fn start(
        &self,
        node_id: Option<String>,
        prompt: impl Into<String>,
        requested_model: impl Into<String>,
        initial_status: JobStatus,
    ) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        self.jobs.lock().push(GenerationJob {
            id: id.clone(),
            node_id,
            prompt: prompt.into(),
            requested_model: requested_model.into(),
            resolved_model: None,
            status: initial_status,
            outputs: Vec::new(),
            error: None,
            created_at: now,
            updated_at: now,
        });
        id
    }

    fn update(&self, id: &str, f: impl FnOnce(&mut GenerationJob)) {
        let mut jobs = self.jobs.lock();
        if let Some(job) = jobs.iter_mut().find(|j| j.id == id) {
            f(job);
            job.updated_at = Utc::now();
        } else {
            log::warn!("update for unknown job id {}", id);
        }
    }

    pub fn set_status(&self, id: &str, status: JobStatus) {
        self.update(id, |job| job.status = status);
    }

    /// Record the model the job actually ran with
    pub fn set_resolved_model(&self, id: &str, model: impl Into<String>) {
        let model = model.into();
        self.update(id, |job| job.resolved_model = Some(model));
    }

    pub fn complete(&self, id: &str, outputs: Vec<GeneratedMedia>) {
        self.update(id, |job| {
            job.status = JobStatus::Completed;
            job.outputs = outputs;
        });
    }

    pub fn fail(&self, id: &str, error: impl Into<String>) {
        let error = error.into();
        self.update(id, |job| {
            job.status = JobStatus::Error;
            job.error = Some(error);
        });
    }

    /// Snapshot of one job
    pub fn get(&self, id: &str) -> Option<GenerationJob> {
        self.jobs.lock().iter().find(|j| j.id == id).cloned()
    }

    /// Snapshot of the whole history, oldest first
    pub fn all(&self) -> Vec<GenerationJob> {
        self.jobs.lock().clone()
    }

    /// Dismiss an error job from history
    ///
    /// Only error jobs are dismissible; completed jobs persist as session
    /// history. Returns whether a job was removed.
    pub fn dismiss(&self, id: &str) -> bool {
        let mut jobs = self.jobs.lock();
        let before = jobs.len();
        jobs.retain(|j| !(j.id == id && j.status == JobStatus::Error));
        jobs.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_lifecycle() {
        let tracker = JobTracker::new();
        let id = tracker.start(None, "a cat", "auto", JobStatus::Enhancing);

        tracker.set_status(&id, JobStatus::Loading);
        tracker.set_resolved_model(&id, "chroma-xl");
        tracker.complete(&id, vec![GeneratedMedia::new("https://cdn/img.png")]);

        let job = tracker.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.resolved_model.as_deref(), Some("chroma-xl"));
        assert_eq!(job.outputs.len(), 1);
        assert!(job.updated_at >= job.created_at);
    }

    #[test]
    fn test_only_error_jobs_are_dismissible() {
        let tracker = JobTracker::new();
        let ok = tracker.start(None, "a", "chroma-xl", JobStatus::Loading);
        let bad = tracker.start(None, "b", "chroma-xl", JobStatus::Loading);
        tracker.complete(&ok, vec![]);
        tracker.fail(&bad, "backend down");

        assert!(!tracker.dismiss(&ok));
        assert!(tracker.dismiss(&bad));
        assert!(!tracker.dismiss(&bad));
        assert_eq!(tracker.all().len(), 1);
    }

    #[test]
    fn test_history_preserves_insertion_order() {
        let tracker = JobTracker::new();
        let first = tracker.start(None, "one", "auto", JobStatus::Loading);
        let second = tracker.start(Some("node-3".to_string()), "two", "auto", JobStatus::Loading);

        let all = tracker.all();
        assert_eq!(all[0].id, first);
        assert_eq!(all[1].id, second);
        assert_eq!(all[1].node_id.as_deref(), Some("node-3"));
    }

    #[test]
    fn test_unknown_job_update_is_ignored() {
        let tracker = JobTracker::new();
        tracker.fail("missing", "nope");
        assert!(tracker.all().is_empty());
    }
}
