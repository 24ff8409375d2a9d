//! Block interface shared by the plant, sensor and controller
//!
//! Port counts are fixed at compile time via associated constants. A driver
//! wires blocks together by copying outputs into inputs, then calls `update`
//! (algebraic evaluation) and `step` (advance internal state by `dt`).

use crate::error::Result;

/// Result of advancing a dynamic block
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepResult {
    /// Time advanced by the step
    pub dt: f64,
}

/// Core block trait - all port counts known at compile time
pub trait Block {
    /// Number of input ports
    const NUM_INPUTS: usize;

    /// Number of output ports
    const NUM_OUTPUTS: usize;

    /// Returns true if this block carries state across steps
    const IS_DYNAMIC: bool = false;

    /// Access inputs as slice
    fn inputs(&self) -> &[f64];

    /// Mutable access to inputs
    fn inputs_mut(&mut self) -> &mut [f64];

    /// Access outputs as slice
    fn outputs(&self) -> &[f64];

    /// Evaluate outputs from the current inputs
    fn update(&mut self, t: f64) -> Result<()>;

    /// Advance internal state by `dt`
    ///
    /// Only meaningful for blocks with `IS_DYNAMIC = true`.
    fn step(&mut self, _t: f64, dt: f64) -> Result<StepResult> {
        Ok(StepResult { dt })
    }

    /// Reset to initial conditions
    fn reset(&mut self);

    #[inline]
    fn get_input(&self, port: usize) -> f64 {
        self.inputs()[port]
    }

    #[inline]
    fn set_input(&mut self, port: usize, value: f64) {
        self.inputs_mut()[port] = value;
    }

    #[inline]
    fn get_output(&self, port: usize) -> f64 {
        self.outputs()[port]
    }

    #[inline]
    fn is_dynamic(&self) -> bool {
        Self::IS_DYNAMIC
    }
}
