//! Physical constants and configuration defaults

/// Gravitational acceleration (m/s²)
pub const GRAVITY: f64 = 9.81;

/// Default cart mass (kg)
pub const MASS_CART: f64 = 1.0;

/// Default pole mass (kg)
pub const MASS_POLE: f64 = 0.1;

/// Default pole half-length (m)
pub const POLE_HALF_LENGTH: f64 = 0.5;

/// Moment-of-inertia factor of a uniform rod pivoted at one end
pub const ROD_INERTIA_FACTOR: f64 = 4.0 / 3.0;

/// Default plant integration timestep
pub const SIM_TIMESTEP: f64 = 0.01;

/// Default controller timestep
pub const PID_TIMESTEP: f64 = 1.0;

/// Default measurement noise standard deviation
pub const MEASUREMENT_STD: f64 = 0.01;

/// Default process noise standard deviation (noise-free plant)
pub const PROCESS_STD: f64 = 0.0;
