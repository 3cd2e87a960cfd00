//! Compute passes over node buffers.
//!
//! A pass maps every node independently: `out[i] = rule(inputs, i)`. Inputs
//! are finalized by earlier passes and the output buffer is touched by
//! nothing else while the pass runs, so node order never matters. Buffers
//! are tagged with a `BufferId` so each pass can be checked (and logged)
//! against its read and write sets.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use log::debug;
use serde::Deserialize;

use super::classifier::NodeField;
use super::engine::EngineState;
use super::forces::ForceSet;
use super::states::{Derivative, DerivativeBuffer, Grid, NodeState, StateBuffer};
use crate::error::{SimError, SimResult};

/// Logical name of a buffer taking part in a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferId {
    State(usize),
    Trial,
    Derivative(usize),
    Field,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kernel {
    Derive,
    Apply,
    Combine,
    Euler,
}

/// One issued pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pass {
    pub kernel: Kernel,
    pub reads: Vec<BufferId>,
    pub write: BufferId,
}

impl Pass {
    /// Fails when the write target is also read
    pub fn new(kernel: Kernel, reads: &[BufferId], write: BufferId) -> SimResult<Self> {
        if reads.contains(&write) {
            return Err(SimError::Aliasing { kernel, buffer: write });
        }
        Ok(Self {
            kernel,
            reads: reads.to_vec(),
            write,
        })
    }

    pub fn is_disjoint(&self) -> bool {
        !self.reads.contains(&self.write)
    }
}

/// Record of issued passes, off unless enabled
#[derive(Debug, Default, Clone)]
pub struct PassLog {
    enabled: bool,
    passes: Vec<Pass>,
}

impl PassLog {
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    pub fn clear(&mut self) {
        self.passes.clear();
    }

    fn record(&mut self, pass: Pass) {
        if self.enabled {
            debug!("pass {:?}: {:?} -> {:?}", pass.kernel, pass.reads, pass.write);
            self.passes.push(pass);
        }
    }
}

/// How a pass is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum Backend {
    #[serde(rename = "serial")]
    Serial,
    /// rayon work-stealing loop; falls back to serial without the `parallel` feature
    #[default]
    #[serde(rename = "parallel")]
    Parallel,
}

impl Backend {
    /// `out[i] = rule(i)` for every node
    pub fn dispatch<T, F>(&self, out: &mut [T], rule: F)
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        match self {
            Backend::Serial => {
                for (i, o) in out.iter_mut().enumerate() {
                    *o = rule(i);
                }
            }
            Backend::Parallel => {
                #[cfg(feature = "parallel")]
                {
                    out.par_iter_mut().enumerate().for_each(|(i, o)| *o = rule(i));
                }

                #[cfg(not(feature = "parallel"))]
                {
                    for (i, o) in out.iter_mut().enumerate() {
                        *o = rule(i);
                    }
                }
            }
        }
    }
}

/// A read-only buffer argument
pub type Input<'a, T> = (BufferId, &'a Grid<T>);
/// The single written buffer of a pass
pub type Output<'a, T> = (BufferId, &'a mut Grid<T>);

/// The program set: force model plus executor, built once per body and
/// handed to the integrator by reference
pub struct ComputePrograms {
    forces: ForceSet,
    backend: Backend,
    log: PassLog,
}

impl ComputePrograms {
    pub fn new(forces: ForceSet, backend: Backend) -> Self {
        debug!("compute programs ready ({:?} backend)", backend);
        Self {
            forces,
            backend,
            log: PassLog::default(),
        }
    }

    pub fn forces(&self) -> &ForceSet {
        &self.forces
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn log(&self) -> &PassLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut PassLog {
        &mut self.log
    }

    fn issue<T>(&mut self, kernel: Kernel, reads: &[(BufferId, (usize, usize))], write: &Output<'_, T>) -> SimResult<()> {
        let shape = write.1.shape();
        for (_, s) in reads {
            if *s != shape {
                return Err(SimError::DimensionMismatch {
                    expected: shape,
                    actual: *s,
                });
            }
        }
        let ids: Vec<BufferId> = reads.iter().map(|(id, _)| *id).collect();
        let pass = Pass::new(kernel, &ids, write.0)?;
        self.log.record(pass);
        Ok(())
    }

    /// k = f(t, state)
    pub fn derive(
        &mut self,
        t: f32,
        field: &NodeField,
        engines: EngineState,
        input: Input<'_, NodeState>,
        out: Output<'_, Derivative>,
    ) -> SimResult<()> {
        self.issue(
            Kernel::Derive,
            &[(input.0, input.1.shape()), (BufferId::Field, field.roles.shape())],
            &out,
        )?;
        let (state, forces) = (input.1, &self.forces);
        self.backend
            .dispatch(out.1.as_mut_slice(), |i| forces.evaluate(t, field, state, engines, i));
        Ok(())
    }

    /// trial = base + h * k
    pub fn apply(
        &mut self,
        base: Input<'_, NodeState>,
        k: Input<'_, Derivative>,
        h: f32,
        out: Output<'_, NodeState>,
    ) -> SimResult<()> {
        self.issue(Kernel::Apply, &[(base.0, base.1.shape()), (k.0, k.1.shape())], &out)?;
        let (base, k) = (base.1, k.1);
        self.backend.dispatch(out.1.as_mut_slice(), |i| {
            let (s, d) = (base.at(i), k.at(i));
            NodeState {
                position: s.position + h * d.d_position,
                velocity: s.velocity + h * d.d_velocity,
            }
        });
        Ok(())
    }

    /// next = base + dt/6 * (k1 + 2 k2 + 2 k3 + k4)
    pub fn combine(
        &mut self,
        base: Input<'_, NodeState>,
        ks: [Input<'_, Derivative>; 4],
        dt: f32,
        out: Output<'_, NodeState>,
    ) -> SimResult<()> {
        self.issue(
            Kernel::Combine,
            &[
                (base.0, base.1.shape()),
                (ks[0].0, ks[0].1.shape()),
                (ks[1].0, ks[1].1.shape()),
                (ks[2].0, ks[2].1.shape()),
                (ks[3].0, ks[3].1.shape()),
            ],
            &out,
        )?;
        let base = base.1;
        let [k1, k2, k3, k4] = [ks[0].1, ks[1].1, ks[2].1, ks[3].1];
        let w = dt / 6.0;
        self.backend.dispatch(out.1.as_mut_slice(), |i| {
            let (a, b, c, d) = (k1.at(i), k2.at(i), k3.at(i), k4.at(i));
            let s = base.at(i);
            NodeState {
                position: s.position + (a.d_position + b.d_position * 2.0 + c.d_position * 2.0 + d.d_position) * w,
                velocity: s.velocity + (a.d_velocity + b.d_velocity * 2.0 + c.d_velocity * 2.0 + d.d_velocity) * w,
            }
        });
        Ok(())
    }

    /// Semi-implicit Euler: v' = v + dt a, x' = x + dt v'
    pub fn euler(
        &mut self,
        base: Input<'_, NodeState>,
        k: Input<'_, Derivative>,
        dt: f32,
        out: Output<'_, NodeState>,
    ) -> SimResult<()> {
        self.issue(Kernel::Euler, &[(base.0, base.1.shape()), (k.0, k.1.shape())], &out)?;
        let (base, k) = (base.1, k.1);
        self.backend.dispatch(out.1.as_mut_slice(), |i| {
            let (s, d) = (base.at(i), k.at(i));
            let velocity = s.velocity + dt * d.d_velocity;
            NodeState {
                position: s.position + dt * velocity,
                velocity,
            }
        });
        Ok(())
    }
}

impl Drop for ComputePrograms {
    fn drop(&mut self) {
        debug!("releasing compute programs ({} passes logged)", self.log.passes.len());
    }
}

/// Allocate the four stage buffers for a `width x height` lattice
pub fn stage_buffers(width: usize, height: usize) -> [DerivativeBuffer; 4] {
    let blank = Grid::new(width, height, Derivative::zero());
    [blank.clone(), blank.clone(), blank.clone(), blank]
}

/// Allocate a scratch state buffer
pub fn trial_buffer(width: usize, height: usize) -> StateBuffer {
    Grid::new(width, height, NodeState::default())
}
