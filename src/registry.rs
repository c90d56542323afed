//! In-memory job registry.
//!
//! Holds every submitted image as an [`ImageJob`] in submission order, along
//! with its lifecycle state, progress and the renditions produced so far.
//!
//! ## Lifecycle
//!
//! ```text
//! idle ──start──▶ processing ──┬─▶ complete         (≥1 rendition succeeded)
//!  ▲                           ├─▶ error            (all failed, or plan error)
//!  │                           └─▶ nothing_planned  (zero widths selected)
//!  └──────────── requeue ◀─────────── any state except processing
//! ```
//!
//! All transitions go through methods here; the orchestrator calls them, the
//! front end only reads. Every mutating method that targets a job by id is a
//! no-op returning `false` (or `None`) when the job is gone, which is how
//! updates for a job removed mid-flight are dropped.
//!
//! [`SharedRegistry`] wraps the registry for one writer and many readers. The
//! lock is only ever held for a single update, never across a codec call.

use crate::execute::{RenditionFailure, RenditionResult};
use crate::source::SourceImage;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no job with id {0}")]
    NotFound(JobId),
    #[error("job {0} is processing and cannot be requeued")]
    Busy(JobId),
}

/// Unique, session-stable job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Idle,
    Processing,
    Complete,
    Error,
    NothingPlanned,
}

impl JobState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Processing => "processing",
            Self::Complete => "complete",
            Self::Error => "error",
            Self::NothingPlanned => "nothing planned",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One source image's full optimization task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageJob {
    pub id: JobId,
    pub source: SourceImage,
    pub state: JobState,
    /// 0–100, non-decreasing while processing.
    pub progress: u8,
    /// Successful renditions, at most one per encoded width.
    pub renditions: Vec<RenditionResult>,
    pub failures: Vec<RenditionFailure>,
    /// Set when the job failed before any rendition was attempted.
    pub error: Option<String>,
}

impl ImageJob {
    fn new(id: JobId, source: SourceImage) -> Self {
        Self {
            id,
            source,
            state: JobState::Idle,
            progress: 0,
            renditions: Vec::new(),
            failures: Vec::new(),
            error: None,
        }
    }

    fn reset(&mut self) {
        self.state = JobState::Idle;
        self.progress = 0;
        self.renditions.clear();
        self.failures.clear();
        self.error = None;
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    jobs: Vec<ImageJob>,
    next_id: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `source` as a new idle job.
    pub fn add(&mut self, source: SourceImage) -> JobId {
        let id = JobId(self.next_id);
        self.next_id += 1;
        self.jobs.push(ImageJob::new(id, source));
        id
    }

    /// Remove a job in any state, returning it.
    pub fn remove(&mut self, id: JobId) -> Option<ImageJob> {
        let pos = self.jobs.iter().position(|j| j.id == id)?;
        Some(self.jobs.remove(pos))
    }

    /// Remove the rendition encoded at `width` from a job, leaving everything else untouched.
    pub fn remove_rendition(&mut self, id: JobId, width: u32) -> Option<RenditionResult> {
        let job = self.get_mut(id)?;
        let pos = job.renditions.iter().position(|r| r.width == width)?;
        Some(job.renditions.remove(pos))
    }

    pub fn clear(&mut self) {
        self.jobs.clear();
    }

    /// Put a finished job back to idle so the next batch picks it up again.
    pub fn requeue(&mut self, id: JobId) -> Result<(), RegistryError> {
        let job = self.get_mut(id).ok_or(RegistryError::NotFound(id))?;
        if job.state == JobState::Processing {
            return Err(RegistryError::Busy(id));
        }
        job.reset();
        Ok(())
    }

    pub fn get(&self, id: JobId) -> Option<&ImageJob> {
        self.jobs.iter().find(|j| j.id == id)
    }

    fn get_mut(&mut self, id: JobId) -> Option<&mut ImageJob> {
        self.jobs.iter_mut().find(|j| j.id == id)
    }

    pub fn jobs(&self) -> &[ImageJob] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Ids of idle jobs, in submission order.
    pub fn idle_ids(&self) -> Vec<JobId> {
        self.jobs
            .iter()
            .filter(|j| j.state == JobState::Idle)
            .map(|j| j.id)
            .collect()
    }

    // ------------------------------------------------------------------
    // Lifecycle transitions (orchestrator only)
    // ------------------------------------------------------------------

    /// Move an idle job to processing with progress 0.
    ///
    /// Returns the source handle, or `None` if the job is gone or not idle.
    pub fn start(&mut self, id: JobId) -> Option<SourceImage> {
        let job = self.get_mut(id)?;
        if job.state != JobState::Idle {
            return None;
        }
        job.state = JobState::Processing;
        job.progress = 0;
        Some(job.source.clone())
    }

    /// Attach a result. A result at an already-present width replaces it in place.
    pub fn attach_result(&mut self, id: JobId, result: RenditionResult) -> bool {
        let Some(job) = self.get_mut(id) else {
            return false;
        };
        match job.renditions.iter_mut().find(|r| r.width == result.width) {
            Some(existing) => *existing = result,
            None => job.renditions.push(result),
        }
        true
    }

    pub fn record_failure(&mut self, id: JobId, failure: RenditionFailure) -> bool {
        let Some(job) = self.get_mut(id) else {
            return false;
        };
        job.failures.push(failure);
        true
    }

    /// Raise progress while processing. Lower values are ignored.
    pub fn set_progress(&mut self, id: JobId, percent: u8) -> bool {
        let Some(job) = self.get_mut(id) else {
            return false;
        };
        if job.state == JobState::Processing {
            job.progress = job.progress.max(percent.min(100));
        }
        true
    }

    /// Settle a processing job from its recorded results.
    ///
    /// `planned == 0` → nothing planned; any success → complete at 100;
    /// otherwise error at 0. Returns the final state.
    pub fn finish(&mut self, id: JobId, planned: usize) -> Option<JobState> {
        let job = self.get_mut(id)?;
        let (state, progress) = if planned == 0 {
            (JobState::NothingPlanned, 0)
        } else if job.renditions.is_empty() {
            (JobState::Error, 0)
        } else {
            (JobState::Complete, 100)
        };
        job.state = state;
        job.progress = progress;
        Some(state)
    }

    /// Fail a job before any rendition was attempted.
    pub fn fail(&mut self, id: JobId, message: impl Into<String>) -> bool {
        let Some(job) = self.get_mut(id) else {
            return false;
        };
        job.state = JobState::Error;
        job.progress = 0;
        job.error = Some(message.into());
        true
    }
}

/// Registry shared between the orchestrator and readers.
///
/// Cloning shares the same registry.
#[derive(Debug, Clone, Default)]
pub struct SharedRegistry {
    inner: Arc<RwLock<Registry>>,
}

impl SharedRegistry {
    pub fn new(registry: Registry) -> Self {
        Self {
            inner: Arc::new(RwLock::new(registry)),
        }
    }

    /// Run `f` under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&Registry) -> R) -> R {
        f(&self.inner.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Run `f` under the write lock.
    pub fn write<R>(&self, f: impl FnOnce(&mut Registry) -> R) -> R {
        f(&mut self.inner.write().unwrap_or_else(PoisonError::into_inner))
    }

    /// Cloned view of every job at this instant.
    pub fn snapshot(&self) -> Vec<ImageJob> {
        self.read(|r| r.jobs().to_vec())
    }

    pub fn get(&self, id: JobId) -> Option<ImageJob> {
        self.read(|r| r.get(id).cloned())
    }
}
