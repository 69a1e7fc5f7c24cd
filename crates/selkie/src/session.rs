#![forbid(unsafe_code)]

//! The presentation boundary: one object a UI talks to.
//!
//! A [`Session`] owns the render pipeline, the auto-fixer, the export pipeline and
//! the rasterizer, and wires them to a concrete [`DiagramEngine`]. All work happens
//! on the caller's single timeline: `submit` queues, [`Session::pump_sync`] drives due
//! renders through the engine, and observers are notified synchronously on state
//! transitions so a UI can react without polling.

use crate::export::{ExportArtifact, ExportConfig, ExportError, ExportPipeline, Rasterizer};
use crate::pipeline::{Completion, RenderPhase, RenderPipeline, RenderState};
use selkie_core::{AutoFixer, Diagnostic, DiagramEngine, FixResult};
use std::time::{Duration, Instant};

/// A state transition a UI may want to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum StateEvent {
    Phase(RenderPhase),
    Diagnostic(Option<Diagnostic>),
}

/// Cancellation handle returned by [`Session::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn FnMut(&StateEvent)>;

pub struct Session<E: DiagramEngine> {
    engine: E,
    pipeline: RenderPipeline,
    fixer: AutoFixer,
    exporter: ExportPipeline,
    rasterizer: Box<dyn Rasterizer>,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
}

impl<E: DiagramEngine> Session<E> {
    /// A session with the built-in resvg rasterizer.
    #[cfg(feature = "raster")]
    pub fn new(engine: E) -> Self {
        Self::with_rasterizer(engine, Box::new(crate::raster::ResvgRasterizer::new()))
    }

    pub fn with_rasterizer(engine: E, rasterizer: Box<dyn Rasterizer>) -> Self {
        Self {
            engine,
            pipeline: RenderPipeline::default(),
            fixer: AutoFixer::new(),
            exporter: ExportPipeline::new(),
            rasterizer,
            observers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.pipeline.set_debounce(debounce);
        self
    }

    pub fn with_fixer(mut self, fixer: AutoFixer) -> Self {
        self.fixer = fixer;
        self
    }

    /// Registers a new render attempt (wall clock). Non-blocking.
    pub fn submit(&mut self, source: impl Into<String>) {
        self.submit_at(source, Instant::now());
    }

    /// Like [`Session::submit`] with an injectable clock, for deterministic drivers
    /// and tests.
    pub fn submit_at(&mut self, source: impl Into<String>, now: Instant) {
        let before = self.pipeline.phase();
        self.pipeline.submit(source.into(), now);
        if before != self.pipeline.phase() {
            self.emit(StateEvent::Phase(self.pipeline.phase()));
        }
    }

    /// When the driver should call [`Session::pump_sync`] next.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pipeline.next_deadline()
    }

    /// Runs the queued render attempt if its debounce window has quiesced, applying
    /// the engine's result. Returns true when an attempt ran.
    pub fn pump_sync(&mut self, now: Instant) -> bool {
        let Some(ticket) = self.pipeline.take_due(now) else {
            return false;
        };

        let before_phase = self.pipeline.phase();
        let before_diag = self.pipeline.diagnostic().cloned();

        let result = self.engine.render(ticket.source());
        if let Completion::Applied(_) = self.pipeline.complete(&ticket, result) {
            let phase = self.pipeline.phase();
            if phase != before_phase {
                self.emit(StateEvent::Phase(phase));
            }
            let diag = self.pipeline.diagnostic().cloned();
            if diag != before_diag {
                self.emit(StateEvent::Diagnostic(diag));
            }
        }
        true
    }

    pub async fn pump(&mut self, now: Instant) -> bool {
        self.pump_sync(now)
    }

    pub fn current_state(&self) -> RenderState {
        self.pipeline.state()
    }

    pub fn clear_diagnostic(&mut self) {
        if self.pipeline.diagnostic().is_some() {
            self.pipeline.clear_diagnostic();
            self.emit(StateEvent::Diagnostic(None));
        }
    }

    /// Runs the auto-fixer over `source`. When the text changed, the stored
    /// diagnostic is cleared so the UI does not keep showing a stale error while the
    /// caller resubmits the fixed source.
    pub fn fix(&mut self, source: &str) -> FixResult {
        let result = self.fixer.fix(source);
        if result.has_changes {
            self.clear_diagnostic();
        }
        result
    }

    /// Exports the last successful render as a PNG. Fails fast with
    /// [`ExportError::NotReady`] while a render is pending or after a failure, i.e.
    /// whenever the cached output does not correspond to the current source.
    pub fn export_image_sync(
        &mut self,
        config: &ExportConfig,
    ) -> Result<ExportArtifact, ExportError> {
        let output = self
            .pipeline
            .exportable_output()
            .ok_or(ExportError::NotReady)?;
        let job = self.exporter.begin(output, config)?;
        let result = self.rasterizer.rasterize(
            job.svg(),
            job.width_px(),
            job.height_px(),
            job.background(),
        );
        self.exporter.finish(job, result)
    }

    pub async fn export_image(
        &mut self,
        config: &ExportConfig,
    ) -> Result<ExportArtifact, ExportError> {
        self.export_image_sync(config)
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&StateEvent) + 'static) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Returns true when the subscription existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sub, _)| *sub != id);
        self.observers.len() != before
    }

    fn emit(&mut self, event: StateEvent) {
        for (_, observer) in &mut self.observers {
            observer(&event);
        }
    }
}
