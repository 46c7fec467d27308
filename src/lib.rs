//! Synheart Titra - On-device titration engine for adaptive bi-level
//! respiratory support
//!
//! Titra closes the loop between an airflow signal source and a bi-level
//! pressure actuator: each breath window is classified from its spectral
//! shape (obstructive vs. central), and the event drives an adaptive
//! IPAP/EPAP titration controller with leak precedence, safety clamps,
//! and per-breath rate limiting.
//!
//! ## Modules
//!
//! - **Classifier**: stateless spectral airway event classification
//! - **Controller**: adaptive bi-level pressure titration with leak
//!   handling and decay
//! - **Pipeline**: per-breath classify-then-titrate orchestration
//! - **Record**: versioned therapy records for downstream consumers

pub mod classifier;
pub mod controller;
pub mod error;
pub mod pipeline;
pub mod record;
pub mod spectrum;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use classifier::{AirwayClassifier, ClassifierConfig};
pub use controller::{BilevelController, TitrationConfig};
pub use error::EngineError;
pub use pipeline::TitraProcessor;
pub use record::{RecordEncoder, RECORD_VERSION};
pub use types::{
    AirwayEvent, Alarm, BandMetrics, BreathOutcome, ClassificationResult, ControllerSnapshot,
    FlowWindow, PressureCommand, TherapyRecord,
};

/// Titra version embedded in all therapy records
pub const TITRA_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for therapy records
pub const PRODUCER_NAME: &str = "synheart-titra";
