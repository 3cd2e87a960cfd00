//! Configuration types for loading simulation scenarios from YAML.
//!
//! This module defines a thin, `serde`-deserializable representation of a
//! scenario. A scenario consists of:
//!
//! - [`EngineConfig`]     – integrator, node lattice and compute backend
//! - [`ParametersConfig`] – spring, mass and thrust constants plus time step
//! - [`MarkerConfig`]     – reserved colours that mark engine pixels
//! - [`AxesConfig`]       – rest-frame thrust direction per engine
//! - [`SimConfig`]        – top-level wrapper used to load a scenario from YAML
//!
//! Every field has a default, so an empty document is a valid scenario.
//!
//! # YAML format
//!
//! ```yaml
//! engine:
//!   integrator: "rk4"       # or "euler"
//!   lattice: "pixel"        # or "corner"
//!   backend: "parallel"     # or "serial"
//!
//! parameters:
//!   k_linear: 100.0         # spring stiffness
//!   c_linear: 1.0           # relative-velocity damping
//!   mass: 1.0               # per-node mass
//!   thrust: 4.0             # engine force
//!   shear_springs: true     # diagonal springs
//!   dt: 0.1                 # frame step
//!   steps: 5                # sub-steps per frame
//!
//! markers:
//!   - { rgb: [255, 0, 0], role: thrust }
//!   - { rgb: [255, 0, 1], role: right }
//!   - { rgb: [255, 0, 2], role: left }
//!
//! axes:
//!   thrust: [0.0, -1.0]
//!   left: [-1.0, 0.0]
//!   right: [1.0, 0.0]
//! ```

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;

use crate::error::{SimError, SimResult};
use crate::simulation::classifier::{Lattice, MarkerTable, NodeRole};
use crate::simulation::compute::Backend;
use crate::simulation::integrator::IntegratorKind;
use crate::simulation::params::{EngineAxes, Parameters};
use crate::simulation::states::NVec2;

/// High-level engine configuration
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub integrator: IntegratorKind, // time integrator advancing the state
    pub lattice: Lattice, // one node per pixel, or per pixel corner
    pub backend: Backend, // how each compute pass is executed
}

/// Physical constants and time stepping
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ParametersConfig {
    pub k_linear: f32,
    pub c_linear: f32,
    pub mass: f32,
    pub thrust: f32,
    pub shear_springs: bool,
    pub dt: f32,
    pub steps: usize,
}

impl Default for ParametersConfig {
    fn default() -> Self {
        let p = Parameters::default();
        Self {
            k_linear: p.k_linear,
            c_linear: p.c_linear,
            mass: p.mass,
            thrust: p.thrust,
            shear_springs: p.shear_springs,
            dt: p.dt,
            steps: p.steps,
        }
    }
}

/// One reserved marker colour
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct MarkerConfig {
    pub rgb: [u8; 3],
    pub role: NodeRole,
}

/// Engine axes as plain pairs
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AxesConfig {
    pub thrust: [f32; 2],
    pub left: [f32; 2],
    pub right: [f32; 2],
}

impl Default for AxesConfig {
    fn default() -> Self {
        let a = EngineAxes::default();
        Self {
            thrust: [a.thrust.x, a.thrust.y],
            left: [a.left.x, a.left.y],
            right: [a.right.x, a.right.y],
        }
    }
}

/// Top-level scenario configuration loaded from YAML
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    pub engine: EngineConfig,
    pub parameters: ParametersConfig,
    pub markers: Option<Vec<MarkerConfig>>, // `None` keeps the built-in red markers
    pub axes: AxesConfig,
}

impl SimConfig {
    pub fn from_yaml_str(text: &str) -> SimResult<Self> {
        // serde_yaml reads an empty document as unit, not as an empty map
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let mut text = String::new();
        File::open(path)
            .and_then(|f| BufReader::new(f).read_to_string(&mut text))
            .map_err(|e| SimError::io(path, e))?;
        Self::from_yaml_str(&text)
    }

    /// Runtime parameters; fails on non-physical values
    pub fn parameters(&self) -> SimResult<Parameters> {
        let p = &self.parameters;
        let params = Parameters {
            k_linear: p.k_linear,
            c_linear: p.c_linear,
            mass: p.mass,
            thrust: p.thrust,
            shear_springs: p.shear_springs,
            dt: p.dt,
            steps: p.steps,
            axes: EngineAxes {
                thrust: NVec2::from(self.axes.thrust),
                left: NVec2::from(self.axes.left),
                right: NVec2::from(self.axes.right),
            },
        };
        params.validate()?;
        Ok(params)
    }

    pub fn marker_table(&self) -> SimResult<MarkerTable> {
        match &self.markers {
            None => Ok(MarkerTable::default()),
            Some(list) => list
                .iter()
                .try_fold(MarkerTable::empty(), |table, m| table.with(m.rgb, m.role)),
        }
    }

    pub fn validate(&self) -> SimResult<()> {
        self.parameters()?;
        self.marker_table()?;
        Ok(())
    }
}
