//! Sensor models producing noisy observations of the plant

use log::debug;
use nalgebra::{DMatrix, DVector};

use super::noise::WhiteNoise;
use crate::block::Block;
use crate::config::MeasurementConfig;
use crate::error::{check_same_len, check_timestep, Result};

/// Output of the accelerometer model
#[derive(Debug, Clone, PartialEq)]
pub struct AccelerometerReading {
    /// Dead-reckoned position, bias included
    pub position: DVector<f64>,
    /// Velocity integrated from the noisy acceleration
    pub velocity: DVector<f64>,
    /// Noisy acceleration
    pub acceleration: DVector<f64>,
}

impl AccelerometerReading {
    /// Row-stacked `[position; velocity; acceleration]`, shape `3 × n`
    pub fn stacked(&self) -> DMatrix<f64> {
        DMatrix::from_fn(3, self.position.len(), |row, col| match row {
            0 => self.position[col],
            1 => self.velocity[col],
            _ => self.acceleration[col],
        })
    }
}

/// Noisy sensor for the cart-pole
///
/// Two observation styles share one noise source:
///
/// - [`accelerometer`](Self::accelerometer): strap-down style. Noise is added
///   to the true acceleration, which is then integrated into velocity and
///   position, and the position picks up a constant bias. Errors accumulate
///   like real dead reckoning.
/// - [`statemeter`](Self::statemeter): direct observation of a state vector
///   with i.i.d. noise and no bias.
///
/// # Block ports
///
/// Statemeter style: inputs `θ`, `x`; outputs the noisy `θ`, `x`.
#[derive(Debug, Clone)]
pub struct CartPoleMeasurement {
    config: MeasurementConfig,
    noise: WhiteNoise,

    // I/O
    inputs: [f64; 2],
    outputs: [f64; 2],
}

impl CartPoleMeasurement {
    pub fn new(config: MeasurementConfig) -> Result<Self> {
        config.validate()?;
        let noise = WhiteNoise::new(config.noise)?;

        debug!(
            "measurement: noise mean={} std={} ({:?} scaling), bias={}",
            config.noise.mean, config.noise.std, config.noise.scaling, config.bias
        );

        Ok(Self {
            config,
            noise,
            inputs: [0.0; 2],
            outputs: [0.0; 2],
        })
    }

    /// Sensor without noise or bias
    pub fn ideal() -> Self {
        Self {
            config: MeasurementConfig::ideal(),
            noise: WhiteNoise::disabled(),
            inputs: [0.0; 2],
            outputs: [0.0; 2],
        }
    }

    pub fn config(&self) -> &MeasurementConfig {
        &self.config
    }

    /// Noise source, for draws of arbitrary shape
    pub fn noise_mut(&mut self) -> &mut WhiteNoise {
        &mut self.noise
    }

    /// Simulate an accelerometer reading from true quantities
    ///
    /// All three vectors must have the same length.
    pub fn accelerometer(
        &mut self,
        acceleration: &DVector<f64>,
        velocity: &DVector<f64>,
        position: &DVector<f64>,
        dt: f64,
    ) -> Result<AccelerometerReading> {
        check_timestep(dt)?;
        check_same_len(acceleration.len(), velocity.len())?;
        check_same_len(acceleration.len(), position.len())?;

        let acceleration = acceleration + self.noise.sample_vector(acceleration.len());
        let velocity = velocity + &acceleration * dt;
        let position = (position + &velocity * dt).add_scalar(self.config.bias);

        Ok(AccelerometerReading {
            position,
            velocity,
            acceleration,
        })
    }

    /// Single-channel accelerometer reading
    pub fn accelerometer_scalar(
        &mut self,
        acceleration: f64,
        velocity: f64,
        position: f64,
        dt: f64,
    ) -> Result<AccelerometerReading> {
        self.accelerometer(
            &DVector::from_element(1, acceleration),
            &DVector::from_element(1, velocity),
            &DVector::from_element(1, position),
            dt,
        )
    }

    /// Add i.i.d. noise to every element of `state`
    pub fn statemeter(&mut self, state: &DVector<f64>) -> DVector<f64> {
        state + self.noise.sample_vector(state.len())
    }
}

impl Block for CartPoleMeasurement {
    const NUM_INPUTS: usize = 2;
    const NUM_OUTPUTS: usize = 2;

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
        &self.outputs
    }

    fn update(&mut self, _t: f64) -> Result<()> {
        for (output, input) in self.outputs.iter_mut().zip(self.inputs) {
            *output = input + self.noise.sample();
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.inputs = [0.0; 2];
        self.outputs = [0.0; 2];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NoiseConfig;
    use crate::error::SimError;
    use approx::assert_relative_eq;

    fn biased(bias: f64) -> CartPoleMeasurement {
        CartPoleMeasurement::new(MeasurementConfig::ideal().with_bias(bias)).unwrap()
    }

    #[test]
    fn test_noise_mut_draws_any_rank() {
        let noise = NoiseConfig::new(2.0, 0.0).with_seed(3);
        let mut sensor =
            CartPoleMeasurement::new(MeasurementConfig::ideal().with_noise(noise)).unwrap();

        assert_eq!(sensor.noise_mut().sample(), 2.0);

        let v = sensor.noise_mut().sample_vector(4);
        assert_eq!(v.len(), 4);
        assert!(v.iter().all(|&x| x == 2.0));

        let m = sensor.noise_mut().sample_matrix(3, 2);
        assert_eq!(m.shape(), (3, 2));
        assert!(m.iter().all(|&x| x == 2.0));
    }

    #[test]
    fn test_accelerometer_integrates_twice() {
        let mut sensor = CartPoleMeasurement::ideal();
        let reading = sensor.accelerometer_scalar(1.0, 0.0, 0.0, 0.5).unwrap();

        assert_relative_eq!(reading.acceleration[0], 1.0);
        assert_relative_eq!(reading.velocity[0], 0.5);
        assert_relative_eq!(reading.position[0], 0.25);

        let stacked = reading.stacked();
        assert_eq!(stacked.shape(), (3, 1));
        assert_relative_eq!(stacked[(0, 0)], 0.25);
        assert_relative_eq!(stacked[(2, 0)], 1.0);
    }

    #[test]
    fn test_accelerometer_bias_is_additive() {
        let mut sensor = biased(0.01);

        // True state reset to zero each call: every reading is the bias alone
        for _ in 0..5 {
            let reading = sensor.accelerometer_scalar(0.0, 0.0, 0.0, 1.0).unwrap();
            assert_relative_eq!(reading.position[0], 0.01);
            assert_relative_eq!(reading.velocity[0], 0.0);
            assert_relative_eq!(reading.acceleration[0], 0.0);
        }
    }

    #[test]
    fn test_accelerometer_bias_drifts_when_fed_back() {
        let mut sensor = biased(0.01);
        let zero = DVector::from_element(1, 0.0);
        let mut position = zero.clone();

        for k in 1..=10 {
            let reading = sensor.accelerometer(&zero, &zero, &position, 1.0).unwrap();
            position = reading.position;
            assert_relative_eq!(position[0], 0.01 * k as f64, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_accelerometer_vector_channels() {
        let mut sensor = biased(0.1);
        let reading = sensor
            .accelerometer(
                &DVector::from_vec(vec![1.0, -2.0]),
                &DVector::from_vec(vec![0.5, 0.0]),
                &DVector::from_vec(vec![0.0, 3.0]),
                0.1,
            )
            .unwrap();

        assert_relative_eq!(reading.velocity[0], 0.6, epsilon = 1e-12);
        assert_relative_eq!(reading.velocity[1], -0.2, epsilon = 1e-12);
        assert_relative_eq!(reading.position[0], 0.06 + 0.1, epsilon = 1e-12);
        assert_relative_eq!(reading.position[1], 3.0 - 0.02 + 0.1, epsilon = 1e-12);
        assert_eq!(reading.stacked().shape(), (3, 2));
    }

    #[test]
    fn test_accelerometer_dimension_mismatch() {
        let mut sensor = CartPoleMeasurement::ideal();
        let err = sensor
            .accelerometer(
                &DVector::zeros(2),
                &DVector::zeros(3),
                &DVector::zeros(2),
                0.1,
            )
            .unwrap_err();
        assert_eq!(
            err,
            SimError::DimensionMismatch {
                expected: 2,
                found: 3
            }
        );

        assert!(sensor
            .accelerometer(&DVector::zeros(2), &DVector::zeros(2), &DVector::zeros(1), 0.1)
            .is_err());
    }

    #[test]
    fn test_accelerometer_rejects_bad_timestep() {
        let mut sensor = CartPoleMeasurement::ideal();
        assert_eq!(
            sensor.accelerometer_scalar(0.0, 0.0, 0.0, -1.0),
            Err(SimError::InvalidTimestep(-1.0))
        );
    }

    #[test]
    fn test_statemeter_preserves_shape() {
        let noise = NoiseConfig::new(0.0, 0.5).with_seed(1);
        let config = MeasurementConfig::default().with_noise(noise);
        let mut sensor = CartPoleMeasurement::new(config).unwrap();

        for n in [0, 1, 2, 7] {
            let state = DVector::from_element(n, 1.0);
            assert_eq!(sensor.statemeter(&state).len(), n);
        }

        let state = DVector::from_vec(vec![0.1, -0.3]);
        assert_ne!(sensor.statemeter(&state), state);
    }

    #[test]
    fn test_statemeter_ignores_bias() {
        let mut sensor = biased(5.0);
        let state = DVector::from_vec(vec![0.1, -0.3, 2.0]);
        assert_eq!(sensor.statemeter(&state), state);
    }

    #[test]
    fn test_zero_noise_is_deterministic() {
        let mut sensor = CartPoleMeasurement::ideal();
        let a = sensor.accelerometer_scalar(0.3, -0.1, 2.0, 0.01).unwrap();
        let b = sensor.accelerometer_scalar(0.3, -0.1, 2.0, 0.01).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_block_update() {
        let mut sensor = CartPoleMeasurement::ideal();
        sensor.set_input(0, 0.2);
        sensor.set_input(1, -1.0);
        sensor.update(0.0).unwrap();

        assert_eq!(sensor.outputs(), &[0.2, -1.0]);

        sensor.reset();
        assert_eq!(sensor.outputs(), &[0.0, 0.0]);
    }
}
