//! Simulation components: plant, sensor, controller and their noise source

mod measurement;
mod noise;
mod pid;
mod plant;

pub use measurement::{AccelerometerReading, CartPoleMeasurement};
pub use noise::WhiteNoise;
pub use pid::{PidController, PidOutput, PidState};
pub use plant::{CartPole, PlantStep};
