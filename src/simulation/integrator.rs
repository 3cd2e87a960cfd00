//! Fixed-step time integrators for the node lattice
//!
//! Provides the classical RK4 sub-step (the reference mode) and a
//! single-evaluation semi-implicit Euler sub-step, both issued as compute
//! passes over the `Workspace` buffers. Each sub-step reads `state[tick]`,
//! writes `state[!tick]` and then flips `tick`.

use serde::Deserialize;

use super::classifier::NodeField;
use super::compute::{stage_buffers, trial_buffer, BufferId, ComputePrograms};
use super::engine::EngineState;
use super::states::{DerivativeBuffer, StateBuffer, StateStore};
use crate::error::SimResult;

/// Which integrator advances the body
/// `integrator: "rk4"` or `integrator: "euler"`
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntegratorKind {
    #[default]
    #[serde(rename = "rk4")] // Classical 4th-order Runge-Kutta, four derivative passes per sub-step
    Rk4,

    #[serde(rename = "euler")] // Semi-implicit Euler, one derivative pass per sub-step; lower fidelity
    Euler,
}

/// Stage offsets c_i of the RK4 tableau
const RK4_C: [f32; 4] = [0.0, 0.5, 0.5, 1.0];

/// Every buffer a sub-step touches, allocated once
#[derive(Debug, Clone)]
pub struct Workspace {
    pub store: StateStore,
    pub trial: StateBuffer,
    pub k: [DerivativeBuffer; 4],
}

impl Workspace {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            store: StateStore::new(width, height),
            trial: trial_buffer(width, height),
            k: stage_buffers(width, height),
        }
    }
}

/// Advance by one sub-step of the chosen kind
pub fn substep(
    kind: IntegratorKind,
    programs: &mut ComputePrograms,
    field: &NodeField,
    ws: &mut Workspace,
    engines: EngineState,
    t: f32,
    dt: f32,
) -> SimResult<()> {
    match kind {
        IntegratorKind::Rk4 => rk4_substep(programs, field, ws, engines, t, dt),
        IntegratorKind::Euler => euler_substep(programs, field, ws, engines, t, dt),
    }
}

/// One RK4 sub-step
///
/// k_i = f(t + c_i dt, trial_i), trial_{i+1} = state + (dt/2 | dt) k_i,
/// next = state + dt/6 (k1 + 2 k2 + 2 k3 + k4). The trial buffer only ever
/// feeds the next derivative pass; it never becomes the authoritative state.
pub fn rk4_substep(
    programs: &mut ComputePrograms,
    field: &NodeField,
    ws: &mut Workspace,
    engines: EngineState,
    t: f32,
    dt: f32,
) -> SimResult<()> {
    let cur = BufferId::State(ws.store.tick());
    let nxt = BufferId::State(ws.store.next_index());

    let Workspace { store, trial, k } = ws;
    let [k1, k2, k3, k4] = k;
    let (current, next) = store.split();

    // Stage 1 reads the authoritative state directly
    programs.derive(t + RK4_C[0] * dt, field, engines, (cur, current), (BufferId::Derivative(0), &mut *k1))?;
    programs.apply((cur, current), (BufferId::Derivative(0), &*k1), RK4_C[1] * dt, (BufferId::Trial, &mut *trial))?;

    programs.derive(t + RK4_C[1] * dt, field, engines, (BufferId::Trial, &*trial), (BufferId::Derivative(1), &mut *k2))?;
    programs.apply((cur, current), (BufferId::Derivative(1), &*k2), RK4_C[2] * dt, (BufferId::Trial, &mut *trial))?;

    programs.derive(t + RK4_C[2] * dt, field, engines, (BufferId::Trial, &*trial), (BufferId::Derivative(2), &mut *k3))?;
    programs.apply((cur, current), (BufferId::Derivative(2), &*k3), RK4_C[3] * dt, (BufferId::Trial, &mut *trial))?;

    programs.derive(t + RK4_C[3] * dt, field, engines, (BufferId::Trial, &*trial), (BufferId::Derivative(3), &mut *k4))?;

    programs.combine(
        (cur, current),
        [
            (BufferId::Derivative(0), &*k1),
            (BufferId::Derivative(1), &*k2),
            (BufferId::Derivative(2), &*k3),
            (BufferId::Derivative(3), &*k4),
        ],
        dt,
        (nxt, next),
    )?;

    store.flip();
    Ok(())
}

/// One semi-implicit Euler sub-step: v += dt a, x += dt v
pub fn euler_substep(
    programs: &mut ComputePrograms,
    field: &NodeField,
    ws: &mut Workspace,
    engines: EngineState,
    t: f32,
    dt: f32,
) -> SimResult<()> {
    let cur = BufferId::State(ws.store.tick());
    let nxt = BufferId::State(ws.store.next_index());

    let Workspace { store, k, .. } = ws;
    let (current, next) = store.split();

    programs.derive(t, field, engines, (cur, current), (BufferId::Derivative(0), &mut k[0]))?;
    programs.euler((cur, current), (BufferId::Derivative(0), &k[0]), dt, (nxt, next))?;

    store.flip();
    Ok(())
}
