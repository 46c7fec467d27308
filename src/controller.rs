//! Adaptive bi-level pressure titration
//!
//! This module owns the only long-lived mutable state in the engine: the
//! current IPAP/EPAP pair plus the counters and alarm that govern it. One
//! controller exists per therapy session and is mutated exactly once per
//! breath cycle by `update`; no other component writes this state.
//!
//! Safety behavior enforced on every update:
//! - leak handling takes precedence over event-based titration
//! - pressures stay inside `[min_epap, max_ipap]` with a fixed
//!   IPAP-EPAP separation
//! - no pressure moves more than `max_delta_per_breath` per cycle

use crate::error::EngineError;
use crate::types::{AirwayEvent, Alarm, ControllerSnapshot, PressureCommand};
use serde::{Deserialize, Serialize};

/// Titration configuration, fixed at construction.
///
/// Unspecified fields deserialize to their defaults, so partial configs
/// (FFI callers, checkpoints from older versions) stay loadable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TitrationConfig {
    /// Starting EPAP (cmH2O)
    pub baseline_epap: f64,
    /// Fixed IPAP-EPAP separation (cmH2O)
    pub delta: f64,
    /// Absolute IPAP ceiling (cmH2O)
    pub max_ipap: f64,
    /// Absolute EPAP floor (cmH2O)
    pub min_epap: f64,
    /// EPAP increase on an obstructive breath (cmH2O)
    pub incr_step: f64,
    /// EPAP decrease on sustained clear breathing or leak mitigation (cmH2O)
    pub decr_step: f64,
    /// Hard per-cycle limit on pressure change (cmH2O)
    pub max_delta_per_breath: f64,
    /// Consecutive clear breaths required before pressure decay
    pub decay_breaths: u32,
    /// Leak rate above which leak is excessive (L/min)
    pub leak_threshold: f64,
    /// Consecutive excessive-leak breaths required before intervening
    pub leak_breaths: u32,
}

impl Default for TitrationConfig {
    fn default() -> Self {
        Self {
            baseline_epap: 5.0,
            delta: 1.0,
            max_ipap: 20.0,
            min_epap: 4.0,
            incr_step: 0.5,
            decr_step: 0.5,
            max_delta_per_breath: 2.0,
            decay_breaths: 10,
            leak_threshold: 40.0,
            leak_breaths: 15,
        }
    }
}

impl TitrationConfig {
    /// Reject contradictory bounds before a session starts.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.delta.is_finite() || self.delta <= 0.0 {
            return Err(EngineError::InvalidConfiguration(format!(
                "delta must be positive, got {}",
                self.delta
            )));
        }
        if self.min_epap + self.delta > self.max_ipap {
            return Err(EngineError::InvalidConfiguration(format!(
                "min_epap {} + delta {} exceeds max_ipap {}",
                self.min_epap, self.delta, self.max_ipap
            )));
        }
        if self.baseline_epap < self.min_epap || self.baseline_epap + self.delta > self.max_ipap {
            return Err(EngineError::InvalidConfiguration(format!(
                "baseline_epap {} outside [{}, {}]",
                self.baseline_epap,
                self.min_epap,
                self.max_ipap - self.delta
            )));
        }
        if self.incr_step < 0.0 || self.decr_step < 0.0 {
            return Err(EngineError::InvalidConfiguration(
                "titration steps must be non-negative".to_string(),
            ));
        }
        if !self.max_delta_per_breath.is_finite() || self.max_delta_per_breath <= 0.0 {
            return Err(EngineError::InvalidConfiguration(format!(
                "max_delta_per_breath must be positive, got {}",
                self.max_delta_per_breath
            )));
        }
        Ok(())
    }
}

/// Adaptive bi-level controller. Sole owner of the session pressure state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BilevelController {
    config: TitrationConfig,
    /// Current IPAP (cmH2O); invariant: epap + delta == ipap <= max_ipap
    ipap: f64,
    /// Current EPAP (cmH2O); invariant: min_epap <= epap
    epap: f64,
    /// Consecutive non-obstructive breaths since the last obstruction
    clear_counter: u32,
    /// Consecutive breaths with leak above threshold
    leak_counter: u32,
    alarm: Option<Alarm>,
}

impl Default for BilevelController {
    fn default() -> Self {
        // Default configuration is internally consistent
        let config = TitrationConfig::default();
        Self {
            ipap: config.baseline_epap + config.delta,
            epap: config.baseline_epap,
            config,
            clear_counter: 0,
            leak_counter: 0,
            alarm: None,
        }
    }
}

impl BilevelController {
    /// Create a controller for a new therapy session.
    pub fn new(config: TitrationConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            ipap: config.baseline_epap + config.delta,
            epap: config.baseline_epap,
            config,
            clear_counter: 0,
            leak_counter: 0,
            alarm: None,
        })
    }

    /// Advance the controller by one breath cycle.
    ///
    /// `leak_lpm` is the instantaneous circuit leak in L/min; an absent
    /// reading is treated as 0. Leak handling takes precedence: while
    /// leak is excessive no event-based titration happens this cycle.
    pub fn update(&mut self, event: AirwayEvent, leak_lpm: Option<f64>) -> PressureCommand {
        let cfg = self.config;
        let leak = leak_lpm.unwrap_or(0.0);
        let entry_ipap = self.ipap;

        if leak > cfg.leak_threshold {
            self.leak_counter += 1;

            if self.leak_counter >= cfg.leak_breaths {
                // Sustained leak: back pressure off to reduce escape flow
                let floor = cfg.min_epap + cfg.delta;
                let mut target = (self.ipap - cfg.decr_step).max(floor);
                let change = target - entry_ipap;
                if change.abs() > cfg.max_delta_per_breath {
                    target = entry_ipap + cfg.max_delta_per_breath.copysign(change);
                }
                self.ipap = target;
                self.epap = target - cfg.delta;
                self.alarm = Some(Alarm::LeakHigh);
            } else {
                // Elevated but not yet sustained: freeze pressures
                self.alarm = None;
            }
            return self.command();
        }

        self.leak_counter = 0;
        self.alarm = None;

        match event {
            AirwayEvent::Obstructive => {
                self.epap += cfg.incr_step;
                self.ipap = self.epap + cfg.delta;
                self.clear_counter = 0;
            }
            _ => {
                self.clear_counter += 1;
                if self.clear_counter >= cfg.decay_breaths {
                    // Counter is not reset here; decay continues each
                    // clear breath until the floor.
                    self.epap -= cfg.decr_step;
                    self.ipap = self.epap + cfg.delta;
                }
            }
        }

        self.epap = self.epap.clamp(cfg.min_epap, cfg.max_ipap - cfg.delta);
        self.ipap = self.epap + cfg.delta;

        let change = self.ipap - entry_ipap;
        if change.abs() > cfg.max_delta_per_breath {
            self.ipap = entry_ipap + cfg.max_delta_per_breath.copysign(change);
            self.epap = self.ipap - cfg.delta;
        }

        self.command()
    }

    fn command(&self) -> PressureCommand {
        PressureCommand {
            ipap: self.ipap,
            epap: self.epap,
        }
    }

    /// Current pressures without advancing the breath cycle.
    pub fn pressures(&self) -> PressureCommand {
        self.command()
    }

    pub fn ipap(&self) -> f64 {
        self.ipap
    }

    pub fn epap(&self) -> f64 {
        self.epap
    }

    pub fn alarm(&self) -> Option<Alarm> {
        self.alarm
    }

    pub fn config(&self) -> &TitrationConfig {
        &self.config
    }

    /// Queryable snapshot of the full controller state.
    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            ipap: self.ipap,
            epap: self.epap,
            clear_counter: self.clear_counter,
            leak_counter: self.leak_counter,
            alarm: self.alarm,
        }
    }

    /// Restore a checkpointed controller from JSON.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let controller: Self = serde_json::from_str(json)?;
        controller.config.validate()?;
        Ok(controller)
    }

    /// Serialize the controller state to JSON.
    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string(self)?)
    }
}
