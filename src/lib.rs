//! cartpole-sim - closed-loop cart-pole simulation testbed
//!
//! A nonlinear cart-pole plant, a noisy sensor layer and a weighted-sum PID
//! controller, wired into one feedback loop.
//!
//! # Architecture
//!
//! - [`CartPole`]: equations of motion integrated with explicit Euler, with
//!   optional process noise on the acceleration
//! - [`CartPoleMeasurement`]: accelerometer-style (dead-reckoned, biased) and
//!   statemeter-style (direct, i.i.d. noise) observations
//! - [`PidController`]: maps a measured `(angle, position)` to a cart force
//! - [`ClosedLoop`]: reference driver stepping plant → sensor → controller
//!
//! Each component owns its configuration and random source; nothing is
//! shared between instances. All three implement [`Block`], so a caller can
//! also wire them by hand.
//!
//! # Example
//!
//! ```rust,ignore
//! use cartpole_sim::prelude::*;
//!
//! let config = SimulationConfig::default()
//!     .with_controller(PidConfig::new(60.0, 0.0, 5.0).with_weights(-1.0, -0.1))
//!     .with_dt(0.01)
//!     .with_initial_state(0.05, 0.0);
//!
//! let mut sim = ClosedLoop::new(config)?;
//! let trajectory = sim.run(1000)?;
//! println!("max |θ| = {}", trajectory.max_abs_angle());
//! ```

pub mod block;
pub mod blocks;
pub mod config;
pub mod error;
pub mod simulation;
pub mod utils;

pub use block::{Block, StepResult};
pub use blocks::*;
pub use config::{
    CartPoleParams, MeasurementConfig, NoiseConfig, NoiseScaling, PidConfig, SensorKind,
    SimulationConfig,
};
pub use error::{Result, SimError};
pub use simulation::{ClosedLoop, StepRecord, Trajectory};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::block::{Block, StepResult};
    pub use crate::blocks::*;
    pub use crate::config::*;
    pub use crate::error::SimError;
    pub use crate::simulation::{ClosedLoop, StepRecord, Trajectory};
}
