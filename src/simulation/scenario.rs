//! Build a fully-initialized simulation scenario from configuration
//!
//! Takes a `SimConfig` (YAML-facing) plus the decoded sprite and produces the
//! runtime bundle:
//! - numerical parameters (`Parameters`)
//! - the soft body (`SoftBody`) with its node field, buffers and programs
//!
//! The scenario is inserted into Bevy as a `Resource` by the viewer and is
//! driven directly by the headless runner.

use bevy::prelude::Resource;
use log::info;

use crate::configuration::config::SimConfig;
use crate::error::SimResult;
use crate::simulation::body::SoftBody;
use crate::simulation::image::RgbaImage;
use crate::simulation::params::Parameters;

#[derive(Resource)]
pub struct Scenario {
    pub parameters: Parameters,
    pub body: SoftBody,
    pub frame: u64,
}

impl Scenario {
    pub fn build_scenario(cfg: &SimConfig, image: &RgbaImage) -> SimResult<Self> {
        let parameters = cfg.parameters()?;
        let markers = cfg.marker_table()?;

        info!(
            "building scenario from {}x{} sprite ({} opaque pixels)",
            image.width,
            image.height,
            image.opaque_count()
        );

        let body = SoftBody::from_image(
            image,
            &markers,
            cfg.engine.lattice,
            &parameters,
            cfg.engine.integrator,
            cfg.engine.backend,
        )?;

        Ok(Self {
            parameters,
            body,
            frame: 0,
        })
    }

    /// Advance one rendered frame: `steps` sub-steps covering `dt`
    pub fn step_frame(&mut self) -> SimResult<()> {
        self.body.update(self.parameters.dt, self.parameters.steps)?;
        self.frame += 1;
        Ok(())
    }
}
