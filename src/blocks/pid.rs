//! PID controller for the cart-pole

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::block::{Block, StepResult};
use crate::config::PidConfig;
use crate::error::{check_finite, check_same_len, Result, SimError};

/// Error history carried between control cycles
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PidState {
    /// Total error of the previous cycle
    pub prev_error: f64,
    /// Running sum of `total_error · dt`, never clamped
    pub integral_error: f64,
}

/// Result of one control evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidOutput {
    /// Control force
    pub u: f64,
    /// Weighted angle and position error
    pub total_error: f64,
    /// Integral error including this cycle
    pub integral_error: f64,
}

impl PidOutput {
    /// Error history to carry into the next cycle
    pub fn next_state(&self) -> PidState {
        PidState {
            prev_error: self.total_error,
            integral_error: self.integral_error,
        }
    }
}

/// Weighted-sum PID controller
///
/// # Control Law
///
/// ```text
/// e     = a·(θ_ref − θ) + b·(x_ref − x)
/// E'    = E + e·dt
/// de/dt = (e − e_prev) / dt
/// u     = P·e + I·E + D·de/dt
/// ```
///
/// The integral term of `u` uses the accumulator as it stood before this
/// cycle, so integral action lags the proportional term by one period.
///
/// # Block ports
///
/// - inputs: measured `θ`, `x`
/// - output: `u`
///
/// `update` evaluates the law against the owned [`PidState`]; `step` commits
/// the new error history.
///
/// # Example
///
/// ```ignore
/// let mut pid = PidController::new(PidConfig::new(10.0, 0.5, 1.0).with_dt(0.01))?;
/// let out = pid.control(&[angle, position])?;
/// plant_input = out.u;
/// ```
#[derive(Debug, Clone)]
pub struct PidController {
    config: PidConfig,
    state: PidState,
    initial: PidState,

    // I/O
    inputs: [f64; 2],
    output: f64,

    // Evaluated by update(), committed by step()
    pending: Option<PidOutput>,
}

impl PidController {
    pub fn new(config: PidConfig) -> Result<Self> {
        config.validate()?;

        debug!(
            "pid: P={} I={} D={} a={} b={} setpoints=({}, {}) dt={}",
            config.kp,
            config.ki,
            config.kd,
            config.angle_weight,
            config.position_weight,
            config.angle_setpoint,
            config.position_setpoint,
            config.dt
        );

        Ok(Self {
            config,
            state: PidState::default(),
            initial: PidState::default(),
            inputs: [0.0; 2],
            output: 0.0,
            pending: None,
        })
    }

    /// Start from a non-zero error history
    pub fn with_initial_state(mut self, state: PidState) -> Self {
        self.state = state;
        self.initial = state;
        self
    }

    pub fn config(&self) -> &PidConfig {
        &self.config
    }

    /// Current error history
    pub fn state(&self) -> &PidState {
        &self.state
    }

    pub fn set_state(&mut self, state: PidState) {
        self.state = state;
    }

    /// Restore the initial error history
    pub fn reset_state(&mut self) {
        self.state = self.initial;
        self.pending = None;
    }

    /// Weighted error for a measured `(angle, position)`
    pub fn total_error(&self, measure: &[f64]) -> Result<f64> {
        check_same_len(2, measure.len())?;
        let c = &self.config;
        check_finite(
            c.angle_weight * (c.angle_setpoint - measure[0])
                + c.position_weight * (c.position_setpoint - measure[1]),
            "total error",
        )
    }

    /// Evaluate the control law against caller-supplied error history
    ///
    /// `prev_error` and `integral_error` drive the derivative and the
    /// returned integral, but the integral term of `u` reads the
    /// controller's own accumulator. Callers threading history themselves
    /// keep the two in step with [`set_state`](Self::set_state), or use
    /// [`control`](Self::control) instead.
    pub fn pid(&self, measure: &[f64], prev_error: f64, integral_error: f64) -> Result<PidOutput> {
        let c = &self.config;
        let total_error = self.total_error(measure)?;

        let integral_error = check_finite(integral_error + total_error * c.dt, "integral error")?;
        let derivative = (total_error - prev_error) / c.dt;

        let u = c.kp * total_error + c.ki * self.state.integral_error + c.kd * derivative;
        let u = check_finite(u, "control input")?;

        Ok(PidOutput {
            u,
            total_error,
            integral_error,
        })
    }

    /// Evaluate the control law and advance the owned error history
    pub fn control(&mut self, measure: &[f64]) -> Result<PidOutput> {
        let out = self.pid(measure, self.state.prev_error, self.state.integral_error)?;
        self.state = out.next_state();

        trace!(
            "pid: measure=({}, {}) e={} E={} u={}",
            measure[0],
            measure[1],
            out.total_error,
            out.integral_error,
            out.u
        );

        Ok(out)
    }
}

impl Block for PidController {
    const NUM_INPUTS: usize = 2;
    const NUM_OUTPUTS: usize = 1;
    const IS_DYNAMIC: bool = true;

    #[inline]
    fn inputs(&self) -> &[f64] {
        &self.inputs
    }

    #[inline]
    fn inputs_mut(&mut self) -> &mut [f64] {
        &mut self.inputs
    }

    #[inline]
    fn outputs(&self) -> &[f64] {
        std::slice::from_ref(&self.output)
    }

    fn update(&mut self, _t: f64) -> Result<()> {
        let out = self.pid(&self.inputs, self.state.prev_error, self.state.integral_error)?;
        self.output = out.u;
        self.pending = Some(out);
        Ok(())
    }

    fn step(&mut self, _t: f64, dt: f64) -> Result<StepResult> {
        if dt != self.config.dt {
            return Err(SimError::TimestepMismatch {
                plant: dt,
                controller: self.config.dt,
            });
        }
        if let Some(out) = self.pending.take() {
            self.state = out.next_state();
        }
        Ok(StepResult { dt })
    }

    fn reset(&mut self) {
        self.inputs = [0.0; 2];
        self.output = 0.0;
        self.reset_state();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn angle_only(kp: f64, ki: f64, kd: f64, dt: f64) -> PidController {
        let config = PidConfig::new(kp, ki, kd)
            .with_weights(1.0, 0.0)
            .with_dt(dt);
        PidController::new(config).unwrap()
    }

    #[test]
    fn test_zero_error_fixed_point() {
        let config = PidConfig::new(3.0, 2.0, 1.0)
            .with_setpoints(0.05, 1.5)
            .with_dt(0.1);
        let pid = PidController::new(config).unwrap();

        let out = pid.pid(&[0.05, 1.5], 0.0, 0.0).unwrap();
        assert_eq!(out.total_error, 0.0);
        assert_eq!(out.integral_error, 0.0);
        assert_eq!(out.u, 0.0);
    }

    #[test]
    fn test_proportional_step_response() {
        let pid = angle_only(1.0, 0.0, 0.0, 1.0);
        let out = pid.pid(&[0.1, 0.0], 0.0, 0.0).unwrap();

        assert_relative_eq!(out.total_error, -0.1);
        assert_relative_eq!(out.u, -0.1);
        assert_relative_eq!(out.integral_error, -0.1);
    }

    #[test]
    fn test_weighted_error() {
        let config = PidConfig::new(1.0, 0.0, 0.0)
            .with_weights(2.0, 0.5)
            .with_setpoints(0.0, 1.0);
        let pid = PidController::new(config).unwrap();

        // 2·(0 − 0.1) + 0.5·(1 − 0.4) = −0.2 + 0.3
        assert_relative_eq!(pid.total_error(&[0.1, 0.4]).unwrap(), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_integral_term_reads_own_accumulator() {
        let pid = angle_only(0.0, 1.0, 0.0, 1.0);

        // Passed-in history feeds the returned integral only
        let out = pid.pid(&[0.1, 0.0], 0.0, 5.0).unwrap();
        assert_relative_eq!(out.integral_error, 4.9);
        assert_eq!(out.u, 0.0);

        let pid = pid.with_initial_state(PidState {
            prev_error: 0.0,
            integral_error: 2.0,
        });
        let out = pid.pid(&[0.1, 0.0], 0.0, 5.0).unwrap();
        assert_relative_eq!(out.u, 2.0);
    }

    #[test]
    fn test_control_threads_history() {
        let mut pid = angle_only(0.0, 1.0, 0.0, 1.0);

        assert_relative_eq!(pid.control(&[0.1, 0.0]).unwrap().u, 0.0);
        assert_relative_eq!(pid.control(&[0.1, 0.0]).unwrap().u, -0.1, epsilon = 1e-12);
        assert_relative_eq!(pid.control(&[0.1, 0.0]).unwrap().u, -0.2, epsilon = 1e-12);
        assert_relative_eq!(pid.state().integral_error, -0.3, epsilon = 1e-12);
        assert_relative_eq!(pid.state().prev_error, -0.1);
    }

    #[test]
    fn test_integral_grows_without_bound() {
        let mut pid = angle_only(0.0, 0.0, 0.0, 0.1);
        for _ in 0..10_000 {
            pid.control(&[1.0, 0.0]).unwrap();
        }
        assert_relative_eq!(pid.state().integral_error, -1000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_derivative_term() {
        let mut pid = angle_only(0.0, 0.0, 1.0, 0.5);

        let first = pid.control(&[0.1, 0.0]).unwrap();
        assert_relative_eq!(first.u, -0.2, epsilon = 1e-12);

        let second = pid.control(&[0.1, 0.0]).unwrap();
        assert_relative_eq!(second.u, 0.0);
    }

    #[test]
    fn test_measure_must_have_two_channels() {
        let pid = angle_only(1.0, 0.0, 0.0, 1.0);
        assert_eq!(
            pid.pid(&[0.1, 0.0, 0.3], 0.0, 0.0),
            Err(SimError::DimensionMismatch {
                expected: 2,
                found: 3
            })
        );
        assert!(pid.pid(&[0.1], 0.0, 0.0).is_err());
    }

    #[test]
    fn test_non_finite_measure() {
        let mut pid = angle_only(1.0, 0.0, 0.0, 1.0);
        assert!(matches!(
            pid.control(&[f64::NAN, 0.0]),
            Err(SimError::NonFinite { .. })
        ));
        assert_eq!(*pid.state(), PidState::default());
    }

    #[test]
    fn test_zero_dt_rejected_at_construction() {
        let config = PidConfig::new(1.0, 0.0, 0.0).with_dt(0.0);
        assert_eq!(
            PidController::new(config).unwrap_err(),
            SimError::InvalidTimestep(0.0)
        );
    }

    #[test]
    fn test_block_update_then_step() {
        let mut pid = angle_only(1.0, 0.0, 0.0, 0.01);
        pid.set_input(0, 0.1);
        pid.set_input(1, 0.0);

        pid.update(0.0).unwrap();
        assert_relative_eq!(pid.get_output(0), -0.1);
        assert_eq!(*pid.state(), PidState::default());

        pid.step(0.0, 0.01).unwrap();
        assert_relative_eq!(pid.state().prev_error, -0.1);
        assert_relative_eq!(pid.state().integral_error, -0.001, epsilon = 1e-15);

        assert!(matches!(
            pid.step(0.0, 0.02),
            Err(SimError::TimestepMismatch { .. })
        ));

        pid.reset();
        assert_eq!(*pid.state(), PidState::default());
        assert_eq!(pid.get_output(0), 0.0);
    }

    #[test]
    fn test_external_threading_matches_owned_state() {
        let measures = [[0.1, 0.0], [0.2, 0.0], [-0.05, 0.0], [0.3, 0.0], [0.0, 0.0]];
        let mut threaded = angle_only(1.0, 0.5, 0.1, 0.1);
        let mut owned = angle_only(1.0, 0.5, 0.1, 0.1);
        let mut unsynced = angle_only(1.0, 0.5, 0.1, 0.1);
        let mut local = PidState::default();

        for (k, m) in measures.iter().enumerate() {
            let s = *threaded.state();
            let a = threaded.pid(m, s.prev_error, s.integral_error).unwrap();
            threaded.set_state(a.next_state());

            let b = owned.control(m).unwrap();
            assert_eq!(a, b, "step {}", k);
            assert_eq!(threaded.state(), owned.state());

            // History threaded by hand without `set_state`: integral term of `u` stays at zero
            let c = unsynced
                .pid(m, local.prev_error, local.integral_error)
                .unwrap();
            local = c.next_state();
            assert_eq!(c.integral_error, b.integral_error);
            if k == 0 {
                assert_eq!(c.u, b.u);
            } else {
                assert_ne!(c.u, b.u, "step {}", k);
            }
        }
    }
}
