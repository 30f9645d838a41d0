//! `climate-fan`: fan state machine with timestamped history.
//!
//! Every transition is appended to the fan history; the newest entry is the
//! current state. A manual toggle stamps an override marker that keeps
//! automatic control away for `fan_override_duration_seconds`. The hardware
//! sync runs in the background after the state is recorded and never rolls
//! it back.

pub mod actuator;
pub mod controller;
pub mod error;

pub use actuator::{actuator_from_config, FanActuator, FileActuator, LogActuator};
pub use controller::{FanController, OverrideWindow};
pub use error::{FanError, Result};
