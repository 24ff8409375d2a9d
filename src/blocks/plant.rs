//! Nonlinear cart-pole plant

use log::debug;
use nalgebra::{Matrix3x2, Vector2};

use super::noise::WhiteNoise;
use crate::block::{Block, StepResult};
use crate::config::{CartPoleParams, NoiseConfig};
use crate::error::{check_finite, check_timestep, Result, SimError};
use crate::utils::constants::ROD_INERTIA_FACTOR;

/// One integrated plant step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlantStep {
    /// `(θ, x)` after the step
    pub state: Vector2<f64>,
    /// `(dθ, dx)` after the step
    pub velocity: Vector2<f64>,
    /// `(ddθ, ddx)` used for the step, process noise included
    pub acceleration: Vector2<f64>,
}

impl PlantStep {
    /// Row-stacked `[state; velocity; acceleration]`
    pub fn stacked(&self) -> Matrix3x2<f64> {
        Matrix3x2::from_rows(&[
            self.state.transpose(),
            self.velocity.transpose(),
            self.acceleration.transpose(),
        ])
    }
}

/// Cart with an inverted pole, driven by a horizontal force on the cart
///
/// The pole is a uniform rod of half-length `l` hinged on the cart; `θ = 0`
/// is upright. The equations of motion are integrated with explicit Euler,
/// updating velocity first and then position from the new velocity. The
/// scheme is first order and drifts in energy over long horizons.
///
/// Process noise is added to the acceleration before integration.
///
/// # Block ports
///
/// - input 0: control force `u`
/// - outputs: `θ`, `x`, `dθ`, `dx`
///
/// # Example
///
/// ```ignore
/// let mut plant = CartPole::new(CartPoleParams::default(), NoiseConfig::disabled())?;
/// let next = plant.motion_model(&Vector2::new(0.1, 0.0), &Vector2::zeros(), 0.0, 0.01)?;
/// ```
#[derive(Debug, Clone)]
pub struct CartPole {
    params: CartPoleParams,
    total_mass: f64,
    pole_mass_length: f64,
    noise: WhiteNoise,

    // I/O
    input: f64,
    outputs: [f64; 4],

    // State
    state: Vector2<f64>,
    velocity: Vector2<f64>,
    acceleration: Vector2<f64>,

    // Initial conditions
    initial_state: Vector2<f64>,
    initial_velocity: Vector2<f64>,
}

impl CartPole {
    pub fn new(params: CartPoleParams, process_noise: NoiseConfig) -> Result<Self> {
        params.validate()?;
        let noise = WhiteNoise::new(process_noise)?;

        debug!(
            "cart-pole plant: g={} m_c={} m_p={} l={} process noise mean={} std={}",
            params.gravity,
            params.mass_cart,
            params.mass_pole,
            params.length,
            process_noise.mean,
            process_noise.std
        );

        Ok(Self {
            params,
            total_mass: params.total_mass(),
            pole_mass_length: params.pole_mass_length(),
            noise,
            input: 0.0,
            outputs: [0.0; 4],
            state: Vector2::zeros(),
            velocity: Vector2::zeros(),
            acceleration: Vector2::zeros(),
            initial_state: Vector2::zeros(),
            initial_velocity: Vector2::zeros(),
        })
    }

    /// Plant without process noise
    pub fn noise_free(params: CartPoleParams) -> Result<Self> {
        Self::new(params, NoiseConfig::disabled())
    }

    /// Set the initial conditions used by the block interface
    pub fn with_initial(mut self, state: Vector2<f64>, velocity: Vector2<f64>) -> Self {
        self.initial_state = state;
        self.initial_velocity = velocity;
        self.set_state(state, velocity);
        self
    }

    pub fn params(&self) -> &CartPoleParams {
        &self.params
    }

    pub fn state(&self) -> &Vector2<f64> {
        &self.state
    }

    pub fn velocity(&self) -> &Vector2<f64> {
        &self.velocity
    }

    /// Acceleration of the most recent step
    pub fn acceleration(&self) -> &Vector2<f64> {
        &self.acceleration
    }

    /// Overwrite the held state (use with caution)
    pub fn set_state(&mut self, state: Vector2<f64>, velocity: Vector2<f64>) {
        self.state = state;
        self.velocity = velocity;
        self.refresh_outputs();
    }

    /// Commit a step computed by [`motion_model`](Self::motion_model) as the held state
    pub fn apply(&mut self, step: &PlantStep) {
        self.acceleration = step.acceleration;
        self.set_state(step.state, step.velocity);
    }

    /// Angular and linear acceleration `(ddθ, ddx)` for angle `theta`,
    /// angular velocity `dtheta` and cart force `u`
    pub fn dynamics(&self, theta: f64, dtheta: f64, u: f64) -> Result<Vector2<f64>> {
        let (sin_theta, cos_theta) = theta.sin_cos();
        let m_p = self.params.mass_pole;
        let l = self.params.length;

        let temp = (u + self.pole_mass_length * dtheta * dtheta * sin_theta) / self.total_mass;

        let denominator = l * (ROD_INERTIA_FACTOR - m_p * cos_theta * cos_theta / self.total_mass);
        if denominator <= 0.0 {
            return Err(SimError::InvalidParameter {
                name: "mass_pole",
                value: m_p,
                reason: "mass ratio makes the pole inertia term non-positive",
            });
        }

        let ddtheta = check_finite(
            (self.params.gravity * sin_theta - cos_theta * temp) / denominator,
            "angular acceleration",
        )?;
        let ddx = check_finite(
            temp - self.pole_mass_length * ddtheta * cos_theta / self.total_mass,
            "cart acceleration",
        )?;

        Ok(Vector2::new(ddtheta, ddx))
    }

    /// Advance `(state, velocity)` by one Euler step of length `dt` under force `u`
    ///
    /// The held block state is not touched; see [`Block::step`] for that.
    pub fn motion_model(
        &mut self,
        state: &Vector2<f64>,
        velocity: &Vector2<f64>,
        u: f64,
        dt: f64,
    ) -> Result<PlantStep> {
        check_timestep(dt)?;

        let process_noise = Vector2::new(self.noise.sample(), self.noise.sample());
        let acceleration = self.dynamics(state[0], velocity[0], u)? + process_noise;
        let velocity = velocity + dt * acceleration;
        let state = state + dt * velocity;

        if !(state.iter().all(|v| v.is_finite()) && velocity.iter().all(|v| v.is_finite())) {
            return Err(SimError::NonFinite {
                quantity: "plant state",
            });
        }

        Ok(PlantStep {
            state,
            velocity,
            acceleration,
        })
    }

    fn refresh_outputs(&mut self) {
        self.outputs = [
            self.state[0],
            self.state[1],
            self.velocity[0],
            self.velocity[1],
        ];
    }
}

impl Block for CartPole {
    const NUM_INPUTS: usize = 1;
    const NUM_OUTPUTS: usize = 4;
    const IS_DYNAMIC: bool = true;

    #[inline]
    fn inputs(&self) -> &[f64] {
        std::slice::from_ref(&self.input)
    }

    #[inline]
    fn inputs_mut(&mut self) -> &mut [f64] {
        std::slice::from_mut(&mut self.input)
    }

    #[inline]
    fn outputs(&self) -> &[f64] {
        &self.outputs
    }

    fn update(&mut self, _t: f64) -> Result<()> {
        self.refresh_outputs();
        Ok(())
    }

    fn step(&mut self, _t: f64, dt: f64) -> Result<StepResult> {
        let (state, velocity) = (self.state, self.velocity);
        let next = self.motion_model(&state, &velocity, self.input, dt)?;
        self.apply(&next);

        Ok(StepResult { dt })
    }

    fn reset(&mut self) {
        self.input = 0.0;
        self.acceleration = Vector2::zeros();
        self.set_state(self.initial_state, self.initial_velocity);
    }
}
