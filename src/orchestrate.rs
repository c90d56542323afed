//! Batch orchestration.
//!
//! Runs every idle job in the registry through plan → execute, updating the
//! registry after each rendition and reporting progress on an optional
//! channel. Jobs are independent: a failure in one never stops the next.
//!
//! ## Per-job flow
//!
//! ```text
//! start (processing, 0%)
//!   → snapshot settings          (taken now, not at submission)
//!   → plan                       (PlanError → error)
//!   → for each spec, ascending:
//!        execute → attach result | record failure
//!        progress = round(done / planned × 100)
//!   → finish: complete | error | nothing_planned
//! ```
//!
//! The registry lock is taken for each individual update and released before
//! the codec runs, so readers (and the user removing a job) are never blocked
//! behind an encode. A job removed mid-flight finishes its current codec call;
//! the result is discarded and the rest of its renditions are skipped.
//!
//! ## Parallelism
//!
//! [`run_batch`] handles jobs one after another. [`run_batch_parallel`]
//! spreads jobs over the rayon global pool; renditions within a job always
//! stay sequential.

use crate::execute::{RenditionFailure, execute};
use crate::imaging::ImageCodec;
use crate::plan::plan;
use crate::registry::{JobId, JobState, SharedRegistry};
use crate::settings::SettingsHandle;
use rayon::prelude::*;
use std::sync::mpsc::Sender;

/// Progress reported while a batch runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    BatchStarted {
        jobs: usize,
    },
    JobStarted {
        id: JobId,
        name: String,
        planned: usize,
    },
    RenditionFinished {
        id: JobId,
        requested_width: u32,
        outcome: RenditionOutcome,
        progress: u8,
    },
    JobFinished {
        id: JobId,
        name: String,
        state: JobState,
        renditions: usize,
        failures: usize,
        error: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenditionOutcome {
    Encoded {
        width: u32,
        height: u32,
        byte_size: usize,
    },
    Failed(String),
}

/// Counts of how each selected job ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub complete: usize,
    pub failed: usize,
    pub nothing_planned: usize,
    /// Jobs removed from the registry before they could finish.
    pub dropped: usize,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.complete + self.failed + self.nothing_planned + self.dropped
    }

    fn record(&mut self, outcome: Option<JobState>) {
        match outcome {
            Some(JobState::Complete) => self.complete += 1,
            Some(JobState::NothingPlanned) => self.nothing_planned += 1,
            Some(_) => self.failed += 1,
            None => self.dropped += 1,
        }
    }
}

/// Percentage of `done` out of `total`, rounded. Zero when there is nothing to do.
///
/// # Examples
/// ```
/// # use isolay::orchestrate::calculate_progress;
/// assert_eq!(calculate_progress(1, 3), 33);
/// assert_eq!(calculate_progress(2, 3), 67);
/// assert_eq!(calculate_progress(0, 0), 0);
/// ```
pub fn calculate_progress(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (done.min(total) as f64 / total as f64 * 100.0).round();
    pct as u8
}

fn send(events: Option<&Sender<BatchEvent>>, event: BatchEvent) {
    if let Some(tx) = events {
        // A dropped receiver only means nobody is watching
        let _ = tx.send(event);
    }
}

/// Process every idle job, one after another, in submission order.
pub fn run_batch(
    registry: &SharedRegistry,
    settings: &SettingsHandle,
    codec: &impl ImageCodec,
    events: Option<Sender<BatchEvent>>,
) -> BatchSummary {
    let ids = registry.read(|r| r.idle_ids());
    tracing::info!(jobs = ids.len(), "starting batch");
    send(events.as_ref(), BatchEvent::BatchStarted { jobs: ids.len() });

    let mut summary = BatchSummary::default();
    for id in ids {
        summary.record(process_job(registry, settings, codec, id, events.as_ref()));
    }
    tracing::info!(?summary, "batch finished");
    summary
}

/// Like [`run_batch`], but dispatches jobs to the rayon global pool.
///
/// Size the pool with `rayon::ThreadPoolBuilder::build_global` beforehand.
pub fn run_batch_parallel(
    registry: &SharedRegistry,
    settings: &SettingsHandle,
    codec: &impl ImageCodec,
    events: Option<Sender<BatchEvent>>,
) -> BatchSummary {
    let ids = registry.read(|r| r.idle_ids());
    tracing::info!(
        jobs = ids.len(),
        threads = rayon::current_num_threads(),
        "starting parallel batch"
    );
    send(events.as_ref(), BatchEvent::BatchStarted { jobs: ids.len() });

    let outcomes: Vec<Option<JobState>> = ids
        .par_iter()
        .map_with(events, |events, &id| {
            process_job(registry, settings, codec, id, events.as_ref())
        })
        .collect();

    let mut summary = BatchSummary::default();
    for outcome in outcomes {
        summary.record(outcome);
    }
    tracing::info!(?summary, "batch finished");
    summary
}

/// Run one job to completion. `None` means the job left the registry first.
fn process_job(
    registry: &SharedRegistry,
    settings: &SettingsHandle,
    codec: &impl ImageCodec,
    id: JobId,
    events: Option<&Sender<BatchEvent>>,
) -> Option<JobState> {
    let Some(source) = registry.write(|r| r.start(id)) else {
        tracing::debug!(job = %id, "job no longer idle, skipping");
        return None;
    };
    let name = source.name().to_string();
    let settings = settings.snapshot();

    let specs = match plan(&settings, &source) {
        Ok(specs) => specs,
        Err(e) => {
            tracing::warn!(job = %id, name = %name, error = %e, "planning failed");
            let message = e.to_string();
            let alive = registry.write(|r| r.fail(id, message.clone()));
            if !alive {
                return None;
            }
            send(
                events,
                BatchEvent::JobFinished {
                    id,
                    name,
                    state: JobState::Error,
                    renditions: 0,
                    failures: 0,
                    error: Some(message),
                },
            );
            return Some(JobState::Error);
        }
    };

    let planned = specs.len();
    tracing::info!(job = %id, name = %name, planned, format = %settings.format, "processing job");
    send(
        events,
        BatchEvent::JobStarted {
            id,
            name: name.clone(),
            planned,
        },
    );

    for (done, spec) in specs.iter().enumerate() {
        let (alive, outcome) = match execute(codec, &source, spec) {
            Ok(result) => {
                let outcome = RenditionOutcome::Encoded {
                    width: result.width,
                    height: result.height,
                    byte_size: result.byte_size(),
                };
                (registry.write(|r| r.attach_result(id, result)), outcome)
            }
            Err(error) => {
                tracing::warn!(
                    job = %id,
                    width = spec.requested_width,
                    error = %error,
                    "rendition failed"
                );
                let outcome = RenditionOutcome::Failed(error.to_string());
                let failure = RenditionFailure {
                    requested_width: spec.requested_width,
                    error,
                };
                (registry.write(|r| r.record_failure(id, failure)), outcome)
            }
        };
        if !alive {
            tracing::debug!(job = %id, "job removed mid-flight, dropping results");
            return None;
        }

        let progress = calculate_progress(done + 1, planned);
        registry.write(|r| r.set_progress(id, progress));
        send(
            events,
            BatchEvent::RenditionFinished {
                id,
                requested_width: spec.requested_width,
                outcome,
                progress,
            },
        );
    }

    let (state, renditions, failures) = registry.write(|r| {
        let state = r.finish(id, planned)?;
        let job = r.get(id)?;
        Some((state, job.renditions.len(), job.failures.len()))
    })?;

    tracing::info!(job = %id, name = %name, %state, renditions, failures, "job finished");
    send(
        events,
        BatchEvent::JobFinished {
            id,
            name,
            state,
            renditions,
            failures,
            error: None,
        },
    );
    Some(state)
}
