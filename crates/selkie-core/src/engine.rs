#![forbid(unsafe_code)]

//! Boundary to the external diagram rendering engine.
//!
//! The engine is a collaborator, not part of this workspace: anything that can turn
//! diagram source text into SVG markup with intrinsic dimensions qualifies. Tests use
//! scripted fakes.

use serde::{Deserialize, Serialize};

/// Vector markup produced by a successful render, plus its intrinsic size in source
/// units.
///
/// Replaced atomically on every successful render; a failed render never clears a
/// previously cached value (the UI keeps showing the last good diagram).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorOutput {
    pub svg: String,
    pub width: f32,
    pub height: f32,
}

/// Failure report from the rendering engine.
///
/// `line`/`column` are 1-based when present. Engines that only report positions inside
/// the message text can leave them `None`; the classifier parses positions out of the
/// message best-effort.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct EngineFailure {
    pub message: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl EngineFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
            column: None,
        }
    }

    pub fn at(message: impl Into<String>, line: u32, column: Option<u32>) -> Self {
        Self {
            message: message.into(),
            line: Some(line),
            column,
        }
    }
}

/// The external rendering engine: diagram source text in, vector markup out.
///
/// Rendering is treated as an opaque, possibly slow operation; callers decide how to
/// schedule it. Implementations must not retain the source.
pub trait DiagramEngine {
    fn render(&self, source: &str) -> Result<VectorOutput, EngineFailure>;
}

impl<T: DiagramEngine + ?Sized> DiagramEngine for &T {
    fn render(&self, source: &str) -> Result<VectorOutput, EngineFailure> {
        (**self).render(source)
    }
}
