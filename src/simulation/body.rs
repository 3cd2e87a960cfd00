//! The simulated sprite
//!
//! `SoftBody` owns the immutable node field, the ping-pong workspace, the
//! compute programs and the engine latch. Callers drive it a frame at a time
//! with `update` and only ever see `state[tick]` through `current`.

use log::{debug, info, trace};

use super::classifier::{classify, Lattice, MarkerTable, NodeField, NodeRole};
use super::compute::{Backend, ComputePrograms, PassLog};
use super::engine::EngineState;
use super::forces::ForceSet;
use super::image::RgbaImage;
use super::integrator::{substep, IntegratorKind, Workspace};
use super::params::Parameters;
use super::states::{NVec2, NodeState, StateBuffer};
use crate::error::{SimError, SimResult};

/// Mean position and velocity over the occupied nodes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    pub position: NVec2,
    pub velocity: NVec2,
}

pub struct SoftBody {
    field: NodeField,
    workspace: Workspace,
    programs: ComputePrograms,
    integrator: IntegratorKind,
    engines: EngineState,
    time: f32,
}

impl SoftBody {
    /// Seed every node at its base position with zero velocity
    pub fn new(field: NodeField, params: &Parameters, integrator: IntegratorKind, backend: Backend) -> SimResult<Self> {
        params.validate()?;

        let mut workspace = Workspace::new(field.width(), field.height());
        workspace.store.seed_identity(&field.base);
        let programs = ComputePrograms::new(ForceSet::from_parameters(params), backend);

        info!(
            "soft body: {}x{} lattice, {} occupied nodes ({} thrust, {} left, {} right), {:?}",
            field.width(),
            field.height(),
            field.occupied_count(),
            field.count(NodeRole::Thrust),
            field.count(NodeRole::Left),
            field.count(NodeRole::Right),
            integrator
        );

        Ok(Self {
            field,
            workspace,
            programs,
            integrator,
            engines: EngineState::default(),
            time: 0.0,
        })
    }

    pub fn from_image(
        image: &RgbaImage,
        markers: &MarkerTable,
        lattice: Lattice,
        params: &Parameters,
        integrator: IntegratorKind,
        backend: Backend,
    ) -> SimResult<Self> {
        let field = classify(image, markers, lattice);
        Self::new(field, params, integrator, backend)
    }

    /// Run `steps` sub-steps of `dt_frame / steps` each
    pub fn update(&mut self, dt_frame: f32, steps: usize) -> SimResult<()> {
        if steps == 0 {
            return Err(SimError::config("steps per frame must be at least 1"));
        }
        if !(dt_frame.is_finite() && dt_frame >= 0.0) {
            return Err(SimError::config(format!("frame step must be finite and >= 0, got {}", dt_frame)));
        }

        let dt = dt_frame / steps as f32;
        for _ in 0..steps {
            self.substep(dt)?;
        }
        trace!("frame done: t = {:.4}, tick = {}", self.time, self.tick());
        Ok(())
    }

    /// One atomic sub-step; `current` changes only after it returns
    pub fn substep(&mut self, dt: f32) -> SimResult<()> {
        substep(
            self.integrator,
            &mut self.programs,
            &self.field,
            &mut self.workspace,
            self.engines,
            self.time,
            dt,
        )?;
        self.time += dt;
        Ok(())
    }

    /// Read-only view of `state[tick]`
    pub fn current(&self) -> &StateBuffer {
        self.workspace.store.current()
    }

    pub fn tick(&self) -> usize {
        self.workspace.store.tick()
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn field(&self) -> &NodeField {
        &self.field
    }

    pub fn integrator(&self) -> IntegratorKind {
        self.integrator
    }

    pub fn engines(&self) -> EngineState {
        self.engines
    }

    pub fn engines_mut(&mut self) -> &mut EngineState {
        &mut self.engines
    }

    /// Overwrite one node before a run (e.g. an initial stretch or kick)
    pub fn set_node_state(&mut self, col: usize, row: usize, state: NodeState) -> SimResult<()> {
        if col >= self.field.width() || row >= self.field.height() {
            return Err(SimError::config(format!(
                "node ({}, {}) outside {}x{} lattice",
                col,
                row,
                self.field.width(),
                self.field.height()
            )));
        }
        let index = self.field.roles.index(col, row);
        self.workspace.store.seed(index, state);
        Ok(())
    }

    pub fn node_state(&self, col: usize, row: usize) -> Option<&NodeState> {
        self.current().get(col as isize, row as isize)
    }

    /// Centroid and mean velocity of the occupied nodes
    pub fn centroid(&self) -> Motion {
        let mut position = NVec2::zeros();
        let mut velocity = NVec2::zeros();
        let mut n = 0usize;

        for (s, role) in self.current().iter().zip(self.field.roles.iter()) {
            if role.is_occupied() {
                position += s.position;
                velocity += s.velocity;
                n += 1;
            }
        }

        if n > 0 {
            position /= n as f32;
            velocity /= n as f32;
        }
        Motion { position, velocity }
    }

    /// All occupied nodes hold finite values
    pub fn is_finite(&self) -> bool {
        self.current()
            .iter()
            .zip(self.field.roles.iter())
            .all(|(s, r)| !r.is_occupied() || s.is_finite())
    }

    pub fn pass_log(&self) -> &PassLog {
        self.programs.log()
    }

    /// Start/stop recording issued passes
    pub fn record_passes(&mut self, enabled: bool) {
        debug!("pass logging {}", if enabled { "on" } else { "off" });
        self.programs.log_mut().set_enabled(enabled);
        self.programs.log_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::states::Grid;
    use approx::assert_relative_eq;

    fn square(n: usize) -> SoftBody {
        let field = NodeField::from_roles(Grid::new(n, n, NodeRole::Structural));
        SoftBody::new(field, &Parameters::default(), IntegratorKind::Rk4, Backend::Serial).unwrap()
    }

    #[test]
    fn update_rejects_zero_steps() {
        let mut body = square(2);
        assert!(body.update(0.1, 0).is_err());
        assert!(body.update(f32::NAN, 5).is_err());
    }

    #[test]
    fn update_advances_time_by_frame() {
        let mut body = square(2);
        body.update(0.1, 5).unwrap();
        assert_relative_eq!(body.time(), 0.1, epsilon = 1e-6);
        // odd number of flips
        assert_eq!(body.tick(), 1);
    }

    #[test]
    fn centroid_of_rest_square() {
        let body = square(3);
        let m = body.centroid();
        assert_relative_eq!(m.position.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(m.position.y, 1.0, epsilon = 1e-6);
        assert_eq!(m.velocity, NVec2::zeros());
    }

    #[test]
    fn uniform_drift_is_preserved() {
        let mut body = square(3);
        for i in 0..9 {
            let (c, r) = (i % 3, i / 3);
            body.set_node_state(c, r, NodeState {
                position: NVec2::new(c as f32, r as f32),
                velocity: NVec2::new(0.5, 0.0),
            })
            .unwrap();
        }
        body.update(1.0, 10).unwrap();
        let m = body.centroid();
        assert_relative_eq!(m.position.x, 1.5, epsilon = 1e-4);
        assert_relative_eq!(m.velocity.x, 0.5, epsilon = 1e-5);
        assert!(body.is_finite());
    }

    #[test]
    fn set_node_state_is_bounds_checked() {
        let mut body = square(2);
        assert!(body.set_node_state(2, 0, NodeState::default()).is_err());
    }
}
