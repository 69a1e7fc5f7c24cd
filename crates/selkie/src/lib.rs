#![forbid(unsafe_code)]

//! `selkie` is a headless live-editing pipeline for textual diagram sources: debounced
//! rendering with stale-result cancellation, structured syntax diagnostics, automatic
//! repair of common malformed input, and PNG export at arbitrary scale.
//!
//! The diagram rendering engine itself is a collaborator behind the
//! [`DiagramEngine`] trait; anything that turns source text into SVG with intrinsic
//! dimensions plugs in. See [`session::Session`] for the surface a UI talks to.
//!
//! # Features
//!
//! - `raster` (default): pure-Rust SVG rasterization for the export pipeline via
//!   `resvg`/`tiny-skia`

pub mod export;
pub mod pipeline;
pub mod prefs;
pub mod session;

#[cfg(feature = "raster")]
pub mod raster;

pub use selkie_core::{
    AutoFixer, Classifier, Diagnostic, DiagnosticKind, DiagramEngine, EngineFailure, FixResult,
    FixRule, VectorOutput,
};

pub use export::{
    Background, ExportArtifact, ExportConfig, ExportError, ExportJob, ExportPipeline, PNG_MIME,
    RasterError, Rasterizer, Rgb,
};
pub use pipeline::{
    Completion, DEFAULT_DEBOUNCE, RenderPhase, RenderPipeline, RenderState, RenderTicket,
};
pub use prefs::{
    EXPORT_SCALE_KEY, EXPORT_TRANSPARENT_KEY, JsonFilePreferenceStore, MemoryPreferenceStore,
    PreferenceStore,
};
pub use session::{Session, StateEvent, SubscriptionId};

#[cfg(feature = "raster")]
pub use raster::ResvgRasterizer;
