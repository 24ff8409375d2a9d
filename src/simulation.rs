//! Closed-loop driver: plant → sensor → controller → plant

use log::{debug, trace};
use nalgebra::{DVector, Vector2};

use crate::block::Block;
use crate::blocks::{CartPole, CartPoleMeasurement, PidController, PlantStep};
use crate::config::{SensorKind, SimulationConfig};
use crate::error::Result;

/// Everything observed during one loop iteration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepRecord {
    /// Time at the end of the step
    pub time: f64,
    /// True `(θ, x)`
    pub state: Vector2<f64>,
    /// True `(dθ, dx)`
    pub velocity: Vector2<f64>,
    /// Acceleration applied during the step
    pub acceleration: Vector2<f64>,
    /// Sensor output `(θ̂, x̂)` fed to the controller
    pub measurement: Vector2<f64>,
    /// Control force computed from the measurement, applied next step
    pub control: f64,
    /// Weighted controller error
    pub total_error: f64,
}

/// Recorded loop history
#[derive(Debug, Clone, Default)]
pub struct Trajectory {
    records: Vec<StepRecord>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&StepRecord> {
        self.records.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StepRecord> {
        self.records.iter()
    }

    pub fn times(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.time).collect()
    }

    pub fn angles(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.state[0]).collect()
    }

    pub fn positions(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.state[1]).collect()
    }

    pub fn controls(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.control).collect()
    }

    /// Largest absolute pole angle seen
    pub fn max_abs_angle(&self) -> f64 {
        self.records
            .iter()
            .map(|r| r.state[0].abs())
            .fold(0.0, f64::max)
    }

    /// Largest absolute cart position seen
    pub fn max_abs_position(&self) -> f64 {
        self.records
            .iter()
            .map(|r| r.state[1].abs())
            .fold(0.0, f64::max)
    }
}

/// Reference closed loop around one cart-pole
///
/// Each [`step`](Self::step):
///
/// 1. advances the plant with the control from the previous step,
/// 2. observes `(θ, x)` through the configured sensor,
/// 3. runs the controller on the observation to produce the next control.
///
/// With [`SensorKind::Accelerometer`] the loop dead-reckons: the sensor is
/// fed the true acceleration together with its own previous velocity and
/// position estimates, so noise and bias accumulate into the measurement.
///
/// Instances share nothing; independent loops may run on separate threads.
///
/// # Example
///
/// ```ignore
/// let config = SimulationConfig::default()
///     .with_controller(PidConfig::new(60.0, 0.0, 5.0).with_weights(-1.0, -0.1).with_dt(0.01))
///     .with_initial_state(0.05, 0.0);
/// let mut sim = ClosedLoop::new(config)?;
/// let trajectory = sim.run(1000)?;
/// ```
#[derive(Debug, Clone)]
pub struct ClosedLoop {
    config: SimulationConfig,
    plant: CartPole,
    sensor: CartPoleMeasurement,
    controller: PidController,
    time: f64,
    control: f64,

    // Accelerometer dead-reckoning estimates
    est_velocity: DVector<f64>,
    est_position: DVector<f64>,
}

impl ClosedLoop {
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;

        let initial_state = Vector2::from(config.initial_state);
        let initial_velocity = Vector2::from(config.initial_velocity);

        let plant = CartPole::new(config.plant, config.process_noise)?
            .with_initial(initial_state, initial_velocity);
        let sensor = CartPoleMeasurement::new(config.measurement)?;
        let controller = PidController::new(config.controller)?;

        debug!(
            "closed loop: dt={} sensor={:?} initial state=({}, {})",
            config.dt, config.sensor, initial_state[0], initial_state[1]
        );

        Ok(Self {
            est_velocity: DVector::from_column_slice(initial_velocity.as_slice()),
            est_position: DVector::from_column_slice(initial_state.as_slice()),
            config,
            plant,
            sensor,
            controller,
            time: 0.0,
            control: 0.0,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Control force to be applied on the next step
    pub fn control(&self) -> f64 {
        self.control
    }

    pub fn plant(&self) -> &CartPole {
        &self.plant
    }

    pub fn controller(&self) -> &PidController {
        &self.controller
    }

    /// Run one plant → sensor → controller iteration
    ///
    /// Plant state, estimates, control and time are committed only once every
    /// stage has succeeded; on error the loop is left as it was.
    pub fn step(&mut self) -> Result<StepRecord> {
        let dt = self.config.dt;
        let t = self.time;

        let (state, velocity) = (*self.plant.state(), *self.plant.velocity());
        let next = self.plant.motion_model(&state, &velocity, self.control, dt)?;

        let (measurement, estimates) = self.observe(&next, dt)?;

        self.controller.set_input(0, measurement[0]);
        self.controller.set_input(1, measurement[1]);
        self.controller.update(t + dt)?;
        self.controller.step(t + dt, dt)?;

        self.plant.set_input(0, self.control);
        self.plant.apply(&next);
        if let Some((velocity, position)) = estimates {
            self.est_velocity = velocity;
            self.est_position = position;
        }
        self.control = self.controller.get_output(0);
        self.time += dt;

        let record = StepRecord {
            time: self.time,
            state: next.state,
            velocity: next.velocity,
            acceleration: next.acceleration,
            measurement,
            control: self.control,
            total_error: self.controller.state().prev_error,
        };

        trace!(
            "t={:.4} θ={:.6} x={:.6} θ̂={:.6} x̂={:.6} u={:.6}",
            record.time,
            record.state[0],
            record.state[1],
            measurement[0],
            measurement[1],
            record.control
        );

        Ok(record)
    }

    /// Run `steps` iterations and collect the history
    pub fn run(&mut self, steps: usize) -> Result<Trajectory> {
        debug!("closed loop: running {} steps from t={}", steps, self.time);

        let mut records = Vec::with_capacity(steps);
        for _ in 0..steps {
            records.push(self.step()?);
        }
        Ok(Trajectory { records })
    }

    /// Restore initial conditions; noise generators keep their state
    pub fn reset(&mut self) {
        self.plant.reset();
        self.sensor.reset();
        self.controller.reset();
        self.time = 0.0;
        self.control = 0.0;
        self.est_velocity = DVector::from_column_slice(&self.config.initial_velocity);
        self.est_position = DVector::from_column_slice(&self.config.initial_state);
    }

    /// Measure `(θ, x)` after `next`; the accelerometer also returns its new
    /// velocity and position estimates, which the caller commits
    fn observe(
        &mut self,
        next: &PlantStep,
        dt: f64,
    ) -> Result<(Vector2<f64>, Option<(DVector<f64>, DVector<f64>)>)> {
        match self.config.sensor {
            SensorKind::Statemeter => {
                self.sensor.set_input(0, next.state[0]);
                self.sensor.set_input(1, next.state[1]);
                self.sensor.update(self.time + dt)?;
                let measurement =
                    Vector2::new(self.sensor.get_output(0), self.sensor.get_output(1));
                Ok((measurement, None))
            }
            SensorKind::Accelerometer => {
                let acceleration = DVector::from_column_slice(next.acceleration.as_slice());
                let reading = self.sensor.accelerometer(
                    &acceleration,
                    &self.est_velocity,
                    &self.est_position,
                    dt,
                )?;
                let measurement = Vector2::new(reading.position[0], reading.position[1]);
                Ok((measurement, Some((reading.velocity, reading.position))))
            }
        }
    }
}
