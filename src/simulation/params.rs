//! Numerical and physical parameters for the simulation
//!
//! `Parameters` holds runtime settings:
//! - spring stiffness and damping (`k_linear`, `c_linear`),
//! - per-node mass and engine thrust,
//! - frame step and sub-steps per frame

use super::states::NVec2;
use crate::error::{SimError, SimResult};

#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    pub k_linear: f32, // spring stiffness
    pub c_linear: f32, // relative-velocity damping
    pub mass: f32, // mass of every node, > 0
    pub thrust: f32, // engine force magnitude
    pub shear_springs: bool, // also connect diagonal neighbours
    pub dt: f32, // frame step
    pub steps: usize, // sub-steps per frame
    pub axes: EngineAxes,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            k_linear: 100.0,
            c_linear: 1.0,
            mass: 1.0,
            thrust: 4.0,
            shear_springs: true,
            dt: 0.1,
            steps: 5,
            axes: EngineAxes::default(),
        }
    }
}

impl Parameters {
    pub fn validate(&self) -> SimResult<()> {
        if !(self.mass.is_finite() && self.mass > 0.0) {
            return Err(SimError::config(format!("mass must be positive, got {}", self.mass)));
        }
        for (name, v) in [("k_linear", self.k_linear), ("c_linear", self.c_linear), ("thrust", self.thrust)] {
            if !(v.is_finite() && v >= 0.0) {
                return Err(SimError::config(format!("{} must be finite and >= 0, got {}", name, v)));
            }
        }
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(SimError::config(format!("dt must be positive, got {}", self.dt)));
        }
        if self.steps == 0 {
            return Err(SimError::config("steps must be at least 1"));
        }
        self.axes.validate()
    }
}

/// Thrust directions in the body's rest frame (image coordinates, y down)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineAxes {
    pub thrust: NVec2,
    pub left: NVec2,
    pub right: NVec2,
}

impl Default for EngineAxes {
    fn default() -> Self {
        Self {
            thrust: NVec2::new(0.0, -1.0),
            left: NVec2::new(-1.0, 0.0),
            right: NVec2::new(1.0, 0.0),
        }
    }
}

impl EngineAxes {
    fn validate(&self) -> SimResult<()> {
        for (name, axis) in [("thrust", self.thrust), ("left", self.left), ("right", self.right)] {
            let n = axis.norm();
            if !(n.is_finite() && n > 0.0) {
                return Err(SimError::config(format!("{} axis must be a non-zero vector", name)));
            }
        }
        Ok(())
    }
}
