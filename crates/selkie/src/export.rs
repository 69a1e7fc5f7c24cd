#![forbid(unsafe_code)]

//! PNG export of the last successful render.
//!
//! The pipeline itself only enforces the export preconditions and the dimension law;
//! actual pixel work happens behind the [`Rasterizer`] trait so the facility stays
//! swappable (and fakeable in tests). `begin` acquires the single in-flight slot and
//! `finish` always releases it, so a failed rasterization never wedges the pipeline.

use crate::prefs::{EXPORT_SCALE_KEY, EXPORT_TRANSPARENT_KEY, PreferenceStore};
use selkie_core::VectorOutput;
use serde::{Deserialize, Serialize};

pub const PNG_MIME: &str = "image/png";

/// Per-call export settings. Not persisted here; see [`ExportConfig::load`] /
/// [`ExportConfig::save`] for the preference-store round trip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportConfig {
    pub scale: f32,
    pub transparent_background: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            scale: 3.0,
            transparent_background: false,
        }
    }
}

impl ExportConfig {
    /// Reads the last-used settings from the store; absent or garbled values fall
    /// back to the defaults.
    pub fn load(store: &dyn PreferenceStore) -> Self {
        let default = Self::default();
        let scale = store
            .get(EXPORT_SCALE_KEY)
            .and_then(|v| v.parse::<f32>().ok())
            .filter(|s| s.is_finite() && *s > 0.0)
            .unwrap_or(default.scale);
        let transparent_background = store
            .get(EXPORT_TRANSPARENT_KEY)
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(default.transparent_background);
        Self {
            scale,
            transparent_background,
        }
    }

    pub fn save(&self, store: &mut dyn PreferenceStore) {
        store.set(EXPORT_SCALE_KEY, &self.scale.to_string());
        store.set(
            EXPORT_TRANSPARENT_KEY,
            &self.transparent_background.to_string(),
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(255, 255, 255);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Background {
    Transparent,
    Opaque(Rgb),
}

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("failed to parse SVG")]
    SvgParse,
    #[error("failed to allocate pixmap for raster rendering")]
    PixmapAlloc,
    #[error("failed to encode PNG")]
    PngEncode,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("no finished render is available to export")]
    NotReady,
    #[error("an export is already in progress")]
    AlreadyInProgress,
    #[error("export scale must be finite and positive")]
    InvalidScale,
    #[error("rasterization failed: {0}")]
    Rasterization(#[from] RasterError),
}

/// The finished export: PNG bytes plus their pixel dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub mime_type: &'static str,
}

/// The host rasterization facility: vector markup in, encoded PNG out.
pub trait Rasterizer {
    fn rasterize(
        &self,
        svg: &str,
        width_px: u32,
        height_px: u32,
        background: Background,
    ) -> Result<Vec<u8>, RasterError>;
}

/// One admitted export: the serialized vector output plus its resolved pixel geometry
/// and background. Consumed by [`ExportPipeline::finish`], so a job cannot be finished
/// twice.
#[derive(Debug)]
pub struct ExportJob {
    svg: String,
    width_px: u32,
    height_px: u32,
    background: Background,
}

impl ExportJob {
    pub fn svg(&self) -> &str {
        &self.svg
    }

    pub fn width_px(&self) -> u32 {
        self.width_px
    }

    pub fn height_px(&self) -> u32 {
        self.height_px
    }

    pub fn background(&self) -> Background {
        self.background
    }
}

pub struct ExportPipeline {
    in_flight: bool,
    opaque_fill: Rgb,
}

impl Default for ExportPipeline {
    fn default() -> Self {
        Self {
            in_flight: false,
            opaque_fill: Rgb::WHITE,
        }
    }
}

impl ExportPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// The fill used when `transparent_background` is false.
    pub fn with_opaque_fill(mut self, fill: Rgb) -> Self {
        self.opaque_fill = fill;
        self
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Admits one export against `output`. Rejects immediately (with no side effect)
    /// while another job is unfinished, or when the scale is unusable. Pixel
    /// dimensions are `round(intrinsic × scale)` exactly, floored at one pixel.
    pub fn begin(
        &mut self,
        output: &VectorOutput,
        config: &ExportConfig,
    ) -> Result<ExportJob, ExportError> {
        if self.in_flight {
            return Err(ExportError::AlreadyInProgress);
        }
        if !config.scale.is_finite() || config.scale <= 0.0 {
            return Err(ExportError::InvalidScale);
        }

        let width_px = (output.width * config.scale).round().max(1.0) as u32;
        let height_px = (output.height * config.scale).round().max(1.0) as u32;
        let background = if config.transparent_background {
            Background::Transparent
        } else {
            Background::Opaque(self.opaque_fill)
        };

        self.in_flight = true;
        Ok(ExportJob {
            svg: output.svg.clone(),
            width_px,
            height_px,
            background,
        })
    }

    /// Releases the in-flight slot and wraps the rasterizer's result. Failure is
    /// recoverable: the pipeline is immediately ready for a retry.
    pub fn finish(
        &mut self,
        job: ExportJob,
        result: Result<Vec<u8>, RasterError>,
    ) -> Result<ExportArtifact, ExportError> {
        self.in_flight = false;
        match result {
            Ok(bytes) => Ok(ExportArtifact {
                bytes,
                width: job.width_px,
                height: job.height_px,
                mime_type: PNG_MIME,
            }),
            Err(err) => {
                tracing::warn!(error = %err, "export rasterization failed");
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(width: f32, height: f32) -> VectorOutput {
        VectorOutput {
            svg: "<svg/>".into(),
            width,
            height,
        }
    }

    #[test]
    fn dimension_law_rounds_exactly() {
        let mut p = ExportPipeline::new();
        let cfg = ExportConfig {
            scale: 3.0,
            transparent_background: true,
        };
        let job = p.begin(&output(400.0, 300.0), &cfg).unwrap();
        assert_eq!((job.width_px(), job.height_px()), (1200, 900));
        p.finish(job, Ok(vec![])).unwrap();

        let cfg = ExportConfig {
            scale: 1.5,
            transparent_background: false,
        };
        // 100.3 * 1.5 = 150.45 -> 150; 33.7 * 1.5 = 50.55 -> 51 (round, not ceil).
        let job = p.begin(&output(100.3, 33.7), &cfg).unwrap();
        assert_eq!((job.width_px(), job.height_px()), (150, 51));
    }

    #[test]
    fn second_begin_while_in_flight_is_rejected_without_side_effect() {
        let mut p = ExportPipeline::new();
        let cfg = ExportConfig::default();
        let first = p.begin(&output(10.0, 10.0), &cfg).unwrap();

        assert!(matches!(
            p.begin(&output(10.0, 10.0), &cfg),
            Err(ExportError::AlreadyInProgress)
        ));

        // The first job's eventual result is unaffected by the rejected call.
        let artifact = p.finish(first, Ok(vec![1, 2, 3])).unwrap();
        assert_eq!(artifact.bytes, vec![1, 2, 3]);
        assert_eq!(artifact.mime_type, PNG_MIME);
    }

    #[test]
    fn failed_rasterization_releases_the_slot() {
        let mut p = ExportPipeline::new();
        let cfg = ExportConfig::default();
        let job = p.begin(&output(10.0, 10.0), &cfg).unwrap();
        let err = p.finish(job, Err(RasterError::SvgParse)).unwrap_err();
        assert!(matches!(err, ExportError::Rasterization(_)));
        assert!(!p.in_flight());

        // Retry succeeds once the precondition is met again.
        assert!(p.begin(&output(10.0, 10.0), &cfg).is_ok());
    }

    #[test]
    fn unusable_scale_is_rejected() {
        let mut p = ExportPipeline::new();
        let out = output(10.0, 10.0);
        for scale in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let cfg = ExportConfig {
                scale,
                transparent_background: false,
            };
            assert!(matches!(
                p.begin(&out, &cfg),
                Err(ExportError::InvalidScale)
            ));
        }
        assert!(!p.in_flight());
    }

    #[test]
    fn config_round_trips_through_a_store() {
        use crate::prefs::MemoryPreferenceStore;

        let mut store = MemoryPreferenceStore::default();
        assert_eq!(ExportConfig::load(&store), ExportConfig::default());

        let cfg = ExportConfig {
            scale: 2.0,
            transparent_background: true,
        };
        cfg.save(&mut store);
        assert_eq!(ExportConfig::load(&store), cfg);

        store.set(EXPORT_SCALE_KEY, "garbage");
        assert_eq!(ExportConfig::load(&store).scale, 3.0);
    }
}
