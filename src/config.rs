//! Configuration types
//!
//! Every component is built from an immutable configuration object. The types
//! derive serde traits so an outer driver can load them from whatever format
//! it prefers; missing fields fall back to the defaults below.

use serde::{Deserialize, Serialize};

use crate::error::{check_timestep, Result, SimError};
use crate::utils::constants::{
    GRAVITY, MASS_CART, MASS_POLE, MEASUREMENT_STD, PID_TIMESTEP, POLE_HALF_LENGTH, PROCESS_STD,
    SIM_TIMESTEP,
};

fn check_positive(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SimError::InvalidParameter {
            name,
            value,
            reason: "must be positive and finite",
        })
    }
}

fn check_finite_param(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SimError::InvalidParameter {
            name,
            value,
            reason: "must be finite",
        })
    }
}

/// Physical constants of the cart-pole plant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartPoleParams {
    /// Gravitational acceleration
    pub gravity: f64,
    /// Cart mass
    pub mass_cart: f64,
    /// Pole mass
    pub mass_pole: f64,
    /// Pole half-length (pivot to centre of mass)
    pub length: f64,
}

impl Default for CartPoleParams {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            mass_cart: MASS_CART,
            mass_pole: MASS_POLE,
            length: POLE_HALF_LENGTH,
        }
    }
}

impl CartPoleParams {
    /// Combined cart and pole mass
    pub fn total_mass(&self) -> f64 {
        self.mass_cart + self.mass_pole
    }

    /// Pole mass times half-length
    pub fn pole_mass_length(&self) -> f64 {
        self.mass_pole * self.length
    }

    pub fn with_gravity(mut self, gravity: f64) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_masses(mut self, mass_cart: f64, mass_pole: f64) -> Self {
        self.mass_cart = mass_cart;
        self.mass_pole = mass_pole;
        self
    }

    pub fn with_length(mut self, length: f64) -> Self {
        self.length = length;
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_finite_param("gravity", self.gravity)?;
        check_positive("mass_cart", self.mass_cart)?;
        check_positive("mass_pole", self.mass_pole)?;
        check_positive("length", self.length)?;
        Ok(())
    }
}

/// How the unit-normal sample is scaled before the mean is added
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NoiseScaling {
    /// Multiply by `std²`; sample variance is `std⁴`
    #[default]
    Variance,
    /// Multiply by `std`; sample variance is `std²`
    StdDev,
}

/// Gaussian noise parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    pub mean: f64,
    pub std: f64,
    pub scaling: NoiseScaling,
    /// Fixed seed for reproducible runs; entropy-seeded when `None`
    pub seed: Option<u64>,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self::disabled()
    }
}

impl NoiseConfig {
    pub fn new(mean: f64, std: f64) -> Self {
        Self {
            mean,
            std,
            scaling: NoiseScaling::Variance,
            seed: None,
        }
    }

    /// Zero mean, zero spread
    pub fn disabled() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_scaling(mut self, scaling: NoiseScaling) -> Self {
        self.scaling = scaling;
        self
    }

    /// Factor applied to a unit-normal draw
    pub fn scale(&self) -> f64 {
        match self.scaling {
            NoiseScaling::Variance => self.std * self.std,
            NoiseScaling::StdDev => self.std,
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_finite_param("noise.mean", self.mean)?;
        if !(self.std.is_finite() && self.std >= 0.0) {
            return Err(SimError::InvalidParameter {
                name: "noise.std",
                value: self.std,
                reason: "must be non-negative and finite",
            });
        }
        Ok(())
    }
}

/// Sensor noise and drift
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasurementConfig {
    pub noise: NoiseConfig,
    /// Constant offset added to every accelerometer position output
    pub bias: f64,
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            noise: NoiseConfig::new(0.0, MEASUREMENT_STD),
            bias: 0.0,
        }
    }
}

impl MeasurementConfig {
    /// Noise-free, bias-free sensor
    pub fn ideal() -> Self {
        Self {
            noise: NoiseConfig::disabled(),
            bias: 0.0,
        }
    }

    pub fn with_noise(mut self, noise: NoiseConfig) -> Self {
        self.noise = noise;
        self
    }

    pub fn with_bias(mut self, bias: f64) -> Self {
        self.bias = bias;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.noise.validate()?;
        check_finite_param("bias", self.bias)
    }
}

/// PID gains, error weights and setpoints
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PidConfig {
    /// Proportional gain
    pub kp: f64,
    /// Integral gain
    pub ki: f64,
    /// Derivative gain
    pub kd: f64,
    pub angle_setpoint: f64,
    pub position_setpoint: f64,
    /// Weight of the angle error in the total error (`a`)
    pub angle_weight: f64,
    /// Weight of the position error in the total error (`b`)
    pub position_weight: f64,
    /// Control period
    pub dt: f64,
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            kp: 0.0,
            ki: 0.0,
            kd: 0.0,
            angle_setpoint: 0.0,
            position_setpoint: 0.0,
            angle_weight: 1.0,
            position_weight: 1.0,
            dt: PID_TIMESTEP,
        }
    }
}

impl PidConfig {
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            ..Default::default()
        }
    }

    pub fn with_setpoints(mut self, angle: f64, position: f64) -> Self {
        self.angle_setpoint = angle;
        self.position_setpoint = position;
        self
    }

    pub fn with_weights(mut self, angle: f64, position: f64) -> Self {
        self.angle_weight = angle;
        self.position_weight = position;
        self
    }

    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_timestep(self.dt)?;
        check_finite_param("kp", self.kp)?;
        check_finite_param("ki", self.ki)?;
        check_finite_param("kd", self.kd)?;
        check_finite_param("angle_setpoint", self.angle_setpoint)?;
        check_finite_param("position_setpoint", self.position_setpoint)?;
        check_finite_param("angle_weight", self.angle_weight)?;
        check_finite_param("position_weight", self.position_weight)?;
        Ok(())
    }
}

/// Which sensor feeds the controller in a closed loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SensorKind {
    /// Direct noisy observation of `(θ, x)`
    #[default]
    Statemeter,
    /// Dead-reckoned `(θ, x)` from noisy accelerations
    Accelerometer,
}

/// Complete closed-loop setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Plant integration step; must equal `controller.dt`
    pub dt: f64,
    pub plant: CartPoleParams,
    pub process_noise: NoiseConfig,
    pub measurement: MeasurementConfig,
    pub sensor: SensorKind,
    pub controller: PidConfig,
    /// Initial `(θ, x)`
    pub initial_state: [f64; 2],
    /// Initial `(dθ, dx)`
    pub initial_velocity: [f64; 2],
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dt: SIM_TIMESTEP,
            plant: CartPoleParams::default(),
            process_noise: NoiseConfig::new(0.0, PROCESS_STD),
            measurement: MeasurementConfig::default(),
            sensor: SensorKind::default(),
            controller: PidConfig::default().with_dt(SIM_TIMESTEP),
            initial_state: [0.0; 2],
            initial_velocity: [0.0; 2],
        }
    }
}

impl SimulationConfig {
    /// Set the shared plant and controller timestep
    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self.controller.dt = dt;
        self
    }

    pub fn with_controller(mut self, controller: PidConfig) -> Self {
        self.controller = controller;
        self
    }

    pub fn with_sensor(mut self, sensor: SensorKind) -> Self {
        self.sensor = sensor;
        self
    }

    pub fn with_measurement(mut self, measurement: MeasurementConfig) -> Self {
        self.measurement = measurement;
        self
    }

    pub fn with_process_noise(mut self, noise: NoiseConfig) -> Self {
        self.process_noise = noise;
        self
    }

    pub fn with_initial_state(mut self, angle: f64, position: f64) -> Self {
        self.initial_state = [angle, position];
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_timestep(self.dt)?;
        self.plant.validate()?;
        self.process_noise.validate()?;
        self.measurement.validate()?;
        self.controller.validate()?;
        if self.dt != self.controller.dt {
            return Err(SimError::TimestepMismatch {
                plant: self.dt,
                controller: self.controller.dt,
            });
        }
        for (name, value) in [
            ("initial_angle", self.initial_state[0]),
            ("initial_position", self.initial_state[1]),
            ("initial_angular_velocity", self.initial_velocity[0]),
            ("initial_velocity", self.initial_velocity[1]),
        ] {
            check_finite_param(name, value)?;
        }
        Ok(())
    }
}
