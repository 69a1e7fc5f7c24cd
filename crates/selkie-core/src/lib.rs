#![forbid(unsafe_code)]

//! Core model for a live diagram editing pipeline (headless).
//!
//! Design goals:
//! - the external rendering engine stays behind a small trait boundary
//!   ([`DiagramEngine`]); this crate never parses the diagram grammar itself
//! - deterministic, testable outputs: classification and auto-fix are pure
//!   functions of their inputs
//! - no executor, no I/O

pub mod autofix;
pub mod diagnostic;
pub mod engine;
mod scan;

pub use autofix::{AutoFixer, FixResult, FixRule};
pub use diagnostic::{Classifier, Diagnostic, DiagnosticKind};
pub use engine::{DiagramEngine, EngineFailure, VectorOutput};
