#![forbid(unsafe_code)]

//! Debounced, generation-gated render pipeline.
//!
//! `submit` never blocks and never invokes the engine directly: it queues the source
//! with a deadline one debounce window in the future, so a burst of edits collapses
//! into a single engine invocation carrying the final text. Each submit bumps a
//! monotonic generation counter; a completion whose generation is no longer current is
//! dropped without touching state, which makes results reflect the most recently
//! requested source regardless of completion order.
//!
//! The pipeline is executor-free in the usual headless style: time enters as explicit
//! [`Instant`] values and the engine call happens in whatever driver loop the embedder
//! runs (see [`crate::session::Session`]), so completion-order interleavings are
//! directly testable.

use selkie_core::{Classifier, Diagnostic, EngineFailure, VectorOutput};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Quiescence window between the last edit and the engine invocation.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderPhase {
    Idle,
    Pending,
    Succeeded,
    Failed,
}

/// Snapshot of the pipeline's observable state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderState {
    pub phase: RenderPhase,
    pub generation: u64,
    pub diagnostic: Option<Diagnostic>,
    pub output: Option<VectorOutput>,
}

/// One due render attempt, handed to the driver. The ticket carries the generation it
/// was issued under; completing a ticket from a superseded generation is a no-op.
#[derive(Debug, Clone)]
pub struct RenderTicket {
    generation: u64,
    source: String,
}

impl RenderTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

/// What [`RenderPipeline::complete`] did with a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied(RenderPhase),
    Stale,
}

#[derive(Debug)]
struct Queued {
    source: String,
    due: Instant,
}

pub struct RenderPipeline {
    debounce: Duration,
    classifier: Classifier,
    generation: u64,
    queued: Option<Queued>,
    phase: RenderPhase,
    output: Option<VectorOutput>,
    diagnostic: Option<Diagnostic>,
}

impl Default for RenderPipeline {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl RenderPipeline {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            classifier: Classifier::new(),
            generation: 0,
            queued: None,
            phase: RenderPhase::Idle,
            output: None,
            diagnostic: None,
        }
    }

    pub fn set_debounce(&mut self, debounce: Duration) {
        self.debounce = debounce;
    }

    /// Registers a new render attempt and returns immediately. Any queued attempt is
    /// superseded; the debounce window restarts from `now`.
    pub fn submit(&mut self, source: String, now: Instant) {
        self.generation += 1;
        self.queued = Some(Queued {
            source,
            due: now + self.debounce,
        });
        self.phase = RenderPhase::Pending;
    }

    /// When the queued attempt becomes due, for driver scheduling.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.queued.as_ref().map(|q| q.due)
    }

    /// Hands out the queued attempt once its debounce window has quiesced. At most one
    /// ticket exists per submitted generation.
    pub fn take_due(&mut self, now: Instant) -> Option<RenderTicket> {
        if self.queued.as_ref().is_some_and(|q| q.due <= now) {
            let queued = self.queued.take()?;
            Some(RenderTicket {
                generation: self.generation,
                source: queued.source,
            })
        } else {
            None
        }
    }

    /// Applies an engine result. Stale tickets (superseded by a later `submit`) are
    /// dropped unconditionally, even on success. A current failure keeps the previous
    /// output untouched so the embedder can keep showing the last good render.
    pub fn complete(
        &mut self,
        ticket: &RenderTicket,
        result: Result<VectorOutput, EngineFailure>,
    ) -> Completion {
        if ticket.generation != self.generation {
            tracing::debug!(
                ticket = ticket.generation,
                current = self.generation,
                "dropping stale render completion"
            );
            return Completion::Stale;
        }

        match result {
            Ok(output) => {
                self.output = Some(output);
                self.diagnostic = None;
                self.phase = RenderPhase::Succeeded;
            }
            Err(failure) => {
                self.diagnostic = Some(self.classifier.classify(&failure, &ticket.source));
                self.phase = RenderPhase::Failed;
            }
        }
        Completion::Applied(self.phase)
    }

    pub fn phase(&self) -> RenderPhase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        self.diagnostic.as_ref()
    }

    pub fn output(&self) -> Option<&VectorOutput> {
        self.output.as_ref()
    }

    /// The cached output, but only when it corresponds to the current generation's
    /// source; a pending or failed current attempt makes the cache stale for export.
    pub fn exportable_output(&self) -> Option<&VectorOutput> {
        if self.phase == RenderPhase::Succeeded {
            self.output.as_ref()
        } else {
            None
        }
    }

    /// Drops the stored diagnostic without touching phase or output. Used after an
    /// auto-fix is applied so a stale error is not shown while the re-render is
    /// pending.
    pub fn clear_diagnostic(&mut self) {
        self.diagnostic = None;
    }

    pub fn state(&self) -> RenderState {
        RenderState {
            phase: self.phase,
            generation: self.generation,
            diagnostic: self.diagnostic.clone(),
            output: self.output.clone(),
        }
    }
}
