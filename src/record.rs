//! Therapy record encoding
//!
//! This module wraps per-breath outcomes in versioned, provenance-stamped
//! records for the downstream logging/display collaborator. The record is
//! the engine's observability surface; nothing here feeds back into
//! titration.

use crate::error::EngineError;
use crate::types::{BreathOutcome, RecordProducer, RecordProvenance, TherapyRecord};
use crate::{PRODUCER_NAME, TITRA_VERSION};
use chrono::Utc;
use uuid::Uuid;

/// Current therapy record schema version
pub const RECORD_VERSION: &str = "1.0.0";

/// Encoder for producing therapy records.
///
/// Holds a stable instance id and session id for the lifetime of the
/// session so every record from one therapy run is attributable.
pub struct RecordEncoder {
    instance_id: String,
    session_id: String,
}

impl Default for RecordEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordEncoder {
    /// Create an encoder with fresh instance and session ids.
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
            session_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with explicit ids (e.g. restored sessions).
    pub fn with_ids(instance_id: String, session_id: String) -> Self {
        Self {
            instance_id,
            session_id,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Encode one breath outcome into a therapy record.
    pub fn encode(&self, outcome: &BreathOutcome) -> TherapyRecord {
        let producer = RecordProducer {
            name: PRODUCER_NAME.to_string(),
            version: TITRA_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        };

        let provenance = RecordProvenance {
            session_id: self.session_id.clone(),
            breath_index: outcome.breath_index,
            computed_at_utc: Utc::now().to_rfc3339(),
        };

        TherapyRecord {
            record_version: RECORD_VERSION.to_string(),
            producer,
            provenance,
            event: outcome.classification.event,
            confidence: outcome.classification.confidence,
            reasoning: outcome.classification.reasoning.clone(),
            metrics: outcome.classification.metrics,
            command: outcome.command,
            state: outcome.state.clone(),
        }
    }

    /// Encode to a JSON string.
    pub fn encode_to_json(&self, outcome: &BreathOutcome) -> Result<String, EngineError> {
        let record = self.encode(outcome);
        Ok(serde_json::to_string_pretty(&record)?)
    }
}
