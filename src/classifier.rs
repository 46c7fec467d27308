//! Airway event classification
//!
//! This module classifies one framed airflow window per breath cycle as
//! obstructive or central from the spectral shape of the flow signal:
//! - Obstructive events show oscillatory, turbulent flow with energy in
//!   the 0.5-2.0 Hz range.
//! - Central events show minimal respiratory effort, with what little
//!   energy remains concentrated below 0.5 Hz.
//!
//! Classification is stateless and deterministic: identical windows yield
//! identical results.

use crate::error::EngineError;
use crate::spectrum::PowerSpectrum;
use crate::types::{AirwayEvent, BandMetrics, ClassificationResult, FlowWindow};
use serde::{Deserialize, Serialize};

/// Classifier configuration.
///
/// Band edges and thresholds are named fields so the classifier stays
/// testable against synthetic signals with known ground truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Breath-hold / minimal-effort band (Hz), half-open [low, high)
    pub low_band_hz: (f64, f64),
    /// Oscillatory / obstructive band (Hz), half-open [low, high)
    pub mid_band_hz: (f64, f64),
    /// Low/mid energy ratio above which the event is central
    pub ratio_threshold: f64,
    /// Absolute band-power sum below which breathing is quiet (central)
    pub power_threshold: f64,
    /// Division guard for degenerate spectra
    pub epsilon: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            low_band_hz: (0.0, 0.5),
            mid_band_hz: (0.5, 2.0),
            ratio_threshold: 1.0,
            power_threshold: 0.1,
            epsilon: 1e-9,
        }
    }
}

/// Confidence reported on the quiet-breathing path
const QUIET_CONFIDENCE: f64 = 0.9;

/// Floor for ratio-based confidence so borderline calls are never zero
const MIN_CONFIDENCE: f64 = 0.2;

/// Spectral airway event classifier. Stateless across calls.
#[derive(Debug, Clone, Default)]
pub struct AirwayClassifier {
    config: ClassifierConfig,
}

impl AirwayClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify one flow window.
    ///
    /// Fails with an invalid-input error on an empty window or a zero
    /// sample rate; the caller must not advance controller state on that
    /// path. Numerically degenerate signals (all-zero flow) never fail
    /// and resolve deterministically to central.
    pub fn classify(&self, window: &FlowWindow) -> Result<ClassificationResult, EngineError> {
        if window.samples.is_empty() {
            return Err(EngineError::EmptyWindow);
        }
        if window.sample_rate_hz == 0 {
            return Err(EngineError::InvalidSampleRate(window.sample_rate_hz));
        }

        let cfg = &self.config;
        let spectrum = PowerSpectrum::compute(&window.samples, window.sample_rate_hz);

        let low = spectrum.band_energy(cfg.low_band_hz.0, cfg.low_band_hz.1);
        let mid = spectrum.band_energy(cfg.mid_band_hz.0, cfg.mid_band_hz.1);
        let ratio = (low + cfg.epsilon) / (mid + cfg.epsilon);

        let metrics = BandMetrics {
            ratio,
            low_band_energy: low,
            mid_band_energy: mid,
            threshold: cfg.ratio_threshold,
        };

        let total_power = low + mid;
        let (event, confidence, reasoning) = if total_power < cfg.power_threshold {
            (
                AirwayEvent::Central,
                QUIET_CONFIDENCE,
                format!(
                    "total band power {total_power:.3e} below quiet threshold {:.3e}",
                    cfg.power_threshold
                ),
            )
        } else if ratio > cfg.ratio_threshold {
            (
                AirwayEvent::Central,
                ratio_confidence(ratio, cfg.ratio_threshold),
                format!(
                    "low/mid energy ratio {ratio:.3} above threshold {:.3}",
                    cfg.ratio_threshold
                ),
            )
        } else if mid < 0.5 * low {
            (
                AirwayEvent::Central,
                ratio_confidence(ratio, cfg.ratio_threshold),
                format!("mid-band energy {mid:.3e} below half of low-band {low:.3e}"),
            )
        } else {
            (
                AirwayEvent::Obstructive,
                ratio_confidence(ratio, cfg.ratio_threshold),
                format!(
                    "mid-band energy dominant, low/mid ratio {ratio:.3} at or below {:.3}",
                    cfg.ratio_threshold
                ),
            )
        };

        Ok(ClassificationResult {
            event,
            confidence,
            reasoning,
            metrics,
        })
    }
}

/// Confidence grows with log-distance of the ratio from the decision
/// boundary, floored so borderline calls are never reported as zero.
fn ratio_confidence(ratio: f64, threshold: f64) -> f64 {
    (ratio / threshold).log10().abs().clamp(MIN_CONFIDENCE, 1.0)
}
