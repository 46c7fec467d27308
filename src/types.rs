//! Core types for the Synheart Titra engine
//!
//! This module defines the data structures that flow through each breath
//! cycle: the framed airflow window, the classification result, the
//! controller's pressure command and state snapshot, and the therapy
//! record payload emitted for downstream consumers.

use serde::{Deserialize, Serialize};

/// Discrete airway event label for a single breath window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AirwayEvent {
    /// Airway narrowing producing oscillatory, turbulent flow
    Obstructive,
    /// Absence of respiratory effort, near-zero low-energy flow
    Central,
    /// Unremarkable breathing reported by an external scorer
    Clear,
}

impl AirwayEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            AirwayEvent::Obstructive => "obstructive",
            AirwayEvent::Central => "central",
            AirwayEvent::Clear => "clear",
        }
    }
}

/// One framed airflow segment, consumed once per breath cycle.
///
/// Samples are signed flow-rate values; the window must be non-empty and
/// the sample rate positive before classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowWindow {
    /// Airflow samples (signed, flow-rate units)
    pub samples: Vec<f64>,
    /// Sampling frequency (Hz)
    pub sample_rate_hz: u32,
}

impl FlowWindow {
    pub fn new(samples: Vec<f64>, sample_rate_hz: u32) -> Self {
        Self {
            samples,
            sample_rate_hz,
        }
    }

    /// Window duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate_hz == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate_hz as f64
    }
}

/// Diagnostic band-energy metrics attached to every classification
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandMetrics {
    /// Low-band / mid-band energy ratio (epsilon-guarded)
    pub ratio: f64,
    /// Mean spectral power in the low band
    pub low_band_energy: f64,
    /// Mean spectral power in the mid band
    pub mid_band_energy: f64,
    /// Ratio threshold the decision was made against
    pub threshold: f64,
}

/// Result of classifying one flow window. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Event label
    pub event: AirwayEvent,
    /// Confidence in the label (0-1)
    pub confidence: f64,
    /// Human-readable account of the decision path
    pub reasoning: String,
    /// Band-energy diagnostics
    pub metrics: BandMetrics,
}

/// Alarm raised by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alarm {
    /// Sustained circuit/mask leak above the configured threshold
    LeakHigh,
}

impl Alarm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Alarm::LeakHigh => "leak_high",
        }
    }
}

/// The (IPAP, EPAP) pair returned by each controller update.
///
/// A read-only snapshot of the delivered pressures at that instant,
/// handed to the actuator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PressureCommand {
    /// Inspiratory positive airway pressure (cmH2O)
    pub ipap: f64,
    /// Expiratory positive airway pressure (cmH2O)
    pub epap: f64,
}

/// Queryable snapshot of the controller state after an update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerSnapshot {
    /// Current IPAP (cmH2O)
    pub ipap: f64,
    /// Current EPAP (cmH2O)
    pub epap: f64,
    /// Consecutive non-obstructive breaths since the last obstruction
    pub clear_counter: u32,
    /// Consecutive breaths with leak above threshold
    pub leak_counter: u32,
    /// Active alarm, if any
    pub alarm: Option<Alarm>,
}

/// Everything the engine produced for a single breath cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreathOutcome {
    /// Zero-based breath index within the session
    pub breath_index: u64,
    /// Classifier output for this window
    pub classification: ClassificationResult,
    /// Pressure pair commanded for the next breath
    pub command: PressureCommand,
    /// Controller state after the update
    pub state: ControllerSnapshot,
}

/// Record producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Record provenance information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordProvenance {
    pub session_id: String,
    pub breath_index: u64,
    pub computed_at_utc: String,
}

/// Versioned per-breath therapy record for logging/display consumers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TherapyRecord {
    pub record_version: String,
    pub producer: RecordProducer,
    pub provenance: RecordProvenance,
    pub event: AirwayEvent,
    pub confidence: f64,
    pub reasoning: String,
    pub metrics: BandMetrics,
    pub command: PressureCommand,
    pub state: ControllerSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_event_labels() {
        assert_eq!(AirwayEvent::Obstructive.as_str(), "obstructive");
        assert_eq!(AirwayEvent::Central.as_str(), "central");
        assert_eq!(
            serde_json::to_string(&AirwayEvent::Obstructive).unwrap(),
            "\"obstructive\""
        );
    }

    #[test]
    fn test_alarm_serialization() {
        assert_eq!(Alarm::LeakHigh.as_str(), "leak_high");
        assert_eq!(
            serde_json::to_string(&Some(Alarm::LeakHigh)).unwrap(),
            "\"leak_high\""
        );
        let none: Option<Alarm> = None;
        assert_eq!(serde_json::to_string(&none).unwrap(), "null");
    }

    #[test]
    fn test_flow_window_duration() {
        let window = FlowWindow::new(vec![0.0; 250], 25);
        assert!((window.duration_secs() - 10.0).abs() < 1e-12);

        let degenerate = FlowWindow::new(vec![0.0; 10], 0);
        assert_eq!(degenerate.duration_secs(), 0.0);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let snapshot = ControllerSnapshot {
            ipap: 6.0,
            epap: 5.0,
            clear_counter: 3,
            leak_counter: 0,
            alarm: None,
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        let loaded: ControllerSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snapshot, loaded);
    }
}
