//! Vehicle system driver module.
//!
//! Drives a set of thrusters through a forward-dynamics model, with
//! per-thruster control-mode switching.

mod driver;
pub mod dynamics;
pub mod interfaces;
pub mod mode;
pub mod models;
mod sensor;

pub use driver::VehicleSystemDriver;
pub use dynamics::{CancelToken, DynamicsEvaluator};
pub use interfaces::InterfaceTable;
pub use mode::{ModeBank, SwitchDecision, SwitchKey, ThrusterModeMachine, ThrusterRequest};
pub use models::{FirstOrderDynamics, IdentityDynamics};
pub use sensor::{SensorPoller, SimulatedSensor};
