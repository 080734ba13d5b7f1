//! Application messages exchanged between the controller and the GUI.
//!
//! The controller periodically sends [`ControllerStatus`]; the GUI sends
//! [`GuiStatus`] carrying the operator's requested parameters. Both are
//! fixed-schema records serialized with postcard, and both have a
//! compile-time worst-case encoded size used to size the link buffers.

use postcard::experimental::max_size::MaxSize;
use serde::{Deserialize, Serialize};

/// Ventilation mode selected by the operator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, MaxSize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VentMode {
    /// Ventilation stopped.
    #[default]
    Off,
    /// Pressure-controlled, time-triggered breaths.
    PressureControl,
    /// Pressure-controlled, patient-triggered breaths.
    PressureAssist,
    /// High flow nasal cannula.
    HighFlowNasalCannula,
}

/// Ventilation parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, MaxSize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VentParams {
    pub mode: VentMode,
    pub peep_cm_h2o: u32,
    pub pip_cm_h2o: u32,
    pub breaths_per_min: u32,
    pub inspiratory_expiratory_ratio: f32,
    /// Fraction of inspired oxygen, 0.21-1.0.
    pub fio2: f32,
}

/// Latest sensor readings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, MaxSize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorReadings {
    pub patient_pressure_cm_h2o: f32,
    pub volume_ml: f32,
    pub flow_ml_per_min: f32,
    pub fio2: f32,
    /// Incremented at the start of every breath.
    pub breath_id: u32,
}

/// Status report sent by the controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, MaxSize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControllerStatus {
    pub uptime_ms: u32,
    /// Parameters the controller is currently running with.
    pub active_params: VentParams,
    pub sensor_readings: SensorReadings,
    pub fan_setpoint_cm_h2o: f32,
    /// Blower power, 0.0-1.0.
    pub fan_power: f32,
    /// Bitfield of active alarms.
    pub alarm_flags: u32,
}

/// Status report sent by the GUI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, MaxSize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GuiStatus {
    pub uptime_ms: u32,
    /// Parameters the operator asked for.
    pub desired_params: VentParams,
    /// Bitfield of alarms the operator acknowledged.
    pub acked_alarms: u32,
}

/// Worst-case postcard size of a [`ControllerStatus`].
pub const CONTROLLER_STATUS_MAX_SIZE: usize = ControllerStatus::POSTCARD_MAX_SIZE;

/// Worst-case postcard size of a [`GuiStatus`].
pub const GUI_STATUS_MAX_SIZE: usize = GuiStatus::POSTCARD_MAX_SIZE;
