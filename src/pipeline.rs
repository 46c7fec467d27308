//! Per-breath pipeline orchestration
//!
//! This module provides the public per-breath API for Synheart Titra:
//! classify one flow window, feed the event and the current leak reading
//! to the controller, and hand back everything that happened.

use crate::classifier::{AirwayClassifier, ClassifierConfig};
use crate::controller::{BilevelController, TitrationConfig};
use crate::error::EngineError;
use crate::record::RecordEncoder;
use crate::types::{BreathOutcome, ControllerSnapshot, FlowWindow, PressureCommand};

/// Stateful per-session processor pairing one classifier with one
/// controller.
///
/// Breath windows must be fed strictly in breath order; the controller
/// has no means to reorder out-of-sequence events. The driving loop is
/// expected to complete one `process_breath` call before starting the
/// next.
pub struct TitraProcessor {
    classifier: AirwayClassifier,
    controller: BilevelController,
    encoder: RecordEncoder,
    breath_index: u64,
}

impl Default for TitraProcessor {
    fn default() -> Self {
        Self {
            classifier: AirwayClassifier::new(),
            controller: BilevelController::default(),
            encoder: RecordEncoder::new(),
            breath_index: 0,
        }
    }
}

impl TitraProcessor {
    /// Create a processor with default classifier and titration settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a processor with explicit configuration.
    pub fn with_config(
        classifier: ClassifierConfig,
        titration: TitrationConfig,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            classifier: AirwayClassifier::with_config(classifier),
            controller: BilevelController::new(titration)?,
            encoder: RecordEncoder::new(),
            breath_index: 0,
        })
    }

    /// Run one breath cycle: classify the window, then titrate.
    ///
    /// On an invalid window the error is returned before the controller
    /// is touched: that breath's pipeline halts and the previous
    /// pressures persist, so the system holds the last known-good
    /// command rather than guessing.
    pub fn process_breath(
        &mut self,
        window: &FlowWindow,
        leak_lpm: Option<f64>,
    ) -> Result<BreathOutcome, EngineError> {
        let classification = self.classifier.classify(window)?;
        let command = self.controller.update(classification.event, leak_lpm);

        let outcome = BreathOutcome {
            breath_index: self.breath_index,
            classification,
            command,
            state: self.controller.snapshot(),
        };
        self.breath_index += 1;
        Ok(outcome)
    }

    /// Run one breath cycle and return the encoded therapy record JSON.
    ///
    /// Convenience wrapper over `process_breath` for callers that only
    /// forward records to a logging/display consumer.
    pub fn process_breath_record(
        &mut self,
        window: &FlowWindow,
        leak_lpm: Option<f64>,
    ) -> Result<String, EngineError> {
        let outcome = self.process_breath(window, leak_lpm)?;
        self.encoder.encode_to_json(&outcome)
    }

    /// Session id stamped on every record from this processor.
    pub fn session_id(&self) -> &str {
        self.encoder.session_id()
    }

    /// Pressures currently held, without advancing the breath cycle.
    pub fn pressures(&self) -> PressureCommand {
        self.controller.pressures()
    }

    /// Snapshot of the controller state.
    pub fn snapshot(&self) -> ControllerSnapshot {
        self.controller.snapshot()
    }

    /// Number of breaths processed so far.
    pub fn breaths_processed(&self) -> u64 {
        self.breath_index
    }

    /// Checkpoint the controller state to JSON.
    pub fn save_state(&self) -> Result<String, EngineError> {
        self.controller.to_json()
    }

    /// Restore controller state from a JSON checkpoint.
    pub fn load_state(&mut self, json: &str) -> Result<(), EngineError> {
        self.controller = BilevelController::from_json(json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AirwayEvent;
    use pretty_assertions::assert_eq;
    use std::f64::consts::PI;

    fn obstructive_window() -> FlowWindow {
        let samples = (0..250)
            .map(|i| 0.5 * (2.0 * PI * 1.0 * i as f64 / 25.0).sin())
            .collect();
        FlowWindow::new(samples, 25)
    }

    fn quiet_window() -> FlowWindow {
        let samples = (0..250)
            .map(|i| 0.002 * (2.0 * PI * 0.3 * i as f64 / 25.0).sin())
            .collect();
        FlowWindow::new(samples, 25)
    }

    #[test]
    fn test_obstructive_windows_ramp_pressure() {
        let mut processor = TitraProcessor::new();
        let window = obstructive_window();

        let first = processor.process_breath(&window, Some(0.0)).unwrap();
        assert_eq!(first.classification.event, AirwayEvent::Obstructive);
        assert_eq!(first.command.epap, 5.5);
        assert_eq!(first.breath_index, 0);

        let second = processor.process_breath(&window, Some(0.0)).unwrap();
        assert_eq!(second.command.epap, 6.0);
        assert_eq!(second.breath_index, 1);
        assert_eq!(processor.breaths_processed(), 2);
    }

    #[test]
    fn test_quiet_windows_leave_pressure_at_baseline() {
        let mut processor = TitraProcessor::new();
        let window = quiet_window();

        for _ in 0..5 {
            let outcome = processor.process_breath(&window, Some(0.0)).unwrap();
            assert_eq!(outcome.classification.event, AirwayEvent::Central);
            assert_eq!(outcome.command.epap, 5.0);
        }
        assert_eq!(processor.snapshot().clear_counter, 5);
    }

    #[test]
    fn test_invalid_window_halts_breath_without_touching_state() {
        let mut processor = TitraProcessor::new();
        processor
            .process_breath(&obstructive_window(), Some(0.0))
            .unwrap();
        let before = processor.snapshot();

        let empty = FlowWindow::new(vec![], 25);
        assert!(processor.process_breath(&empty, Some(0.0)).is_err());

        // Previous pressures and counters persist; breath index unchanged
        assert_eq!(processor.snapshot(), before);
        assert_eq!(processor.breaths_processed(), 1);
    }

    #[test]
    fn test_leak_reading_reaches_controller() {
        let mut processor = TitraProcessor::new();
        let window = obstructive_window();
        let initial = processor.pressures();

        for breath in 1..=14u32 {
            let outcome = processor.process_breath(&window, Some(55.0)).unwrap();
            assert_eq!(outcome.command, initial);
            assert_eq!(outcome.state.leak_counter, breath);
        }
        let outcome = processor.process_breath(&window, Some(55.0)).unwrap();
        assert!(outcome.state.alarm.is_some());
        assert!(outcome.command.ipap < initial.ipap);
    }

    #[test]
    fn test_breath_record_emission() {
        let mut processor = TitraProcessor::new();
        let json = processor
            .process_breath_record(&obstructive_window(), Some(0.0))
            .unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["event"], "obstructive");
        assert_eq!(parsed["provenance"]["breath_index"], 0);
        assert_eq!(
            parsed["provenance"]["session_id"],
            processor.session_id()
        );
        assert_eq!(parsed["command"]["epap"], 5.5);
    }

    #[test]
    fn test_state_checkpoint_round_trip() {
        let mut processor = TitraProcessor::new();
        let window = obstructive_window();
        for _ in 0..3 {
            processor.process_breath(&window, Some(0.0)).unwrap();
        }

        let saved = processor.save_state().unwrap();
        let mut restored = TitraProcessor::new();
        restored.load_state(&saved).unwrap();

        assert_eq!(restored.snapshot(), processor.snapshot());
    }
}
