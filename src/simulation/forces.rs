//! Force contributors for the node lattice
//!
//! Each term sees one node plus read-only access to the stage input buffer
//! and returns the force it adds. `ForceSet` sums the terms and turns the
//! total into a `Derivative`; it never touches the buffer it is writing.

use super::classifier::{NodeField, NodeRole};
use super::engine::EngineState;
use super::params::{EngineAxes, Parameters};
use super::states::{Derivative, NVec2, NodeState, StateBuffer};

static AXIAL: [(isize, isize); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
static DIAGONAL: [(isize, isize); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

/// Lengths below this are treated as coincident nodes
const MIN_LENGTH: f32 = 1.0e-6;

/// Everything a force term may read for one node
pub struct NodeContext<'a> {
    pub index: usize,
    pub role: NodeRole,
    pub node: &'a NodeState,
    pub field: &'a NodeField,
    pub state: &'a StateBuffer,
    pub engines: EngineState,
}

/// An occupied neighbour of the node being evaluated
pub struct Neighbor<'a> {
    pub rest: NVec2, // base offset from the node
    pub state: &'a NodeState,
}

impl<'a> NodeContext<'a> {
    /// Occupied 4-neighbours, plus diagonals when `diagonal` is set.
    /// Empty nodes are skipped before their state is read.
    pub fn neighbors(&self, diagonal: bool) -> impl Iterator<Item = Neighbor<'a>> + '_ {
        let (col, row) = self.field.roles.coords(self.index);
        let base = *self.field.base.at(self.index);
        let offsets = if diagonal { &DIAGONAL[..] } else { &DIAGONAL[..0] };

        AXIAL.iter().chain(offsets.iter()).filter_map(move |&(dx, dy)| {
            let (c, r) = (col as isize + dx, row as isize + dy);
            let role = self.field.roles.get(c, r)?;
            if !role.is_occupied() {
                return None;
            }
            let index = self.field.roles.index(c as usize, r as usize);
            Some(Neighbor {
                rest: *self.field.base.at(index) - base,
                state: self.state.at(index),
            })
        })
    }

    /// Rotation of the node's neighbourhood away from its rest pose, as a
    /// unit `(cos, sin)` pair. Identity for isolated nodes.
    pub fn orientation(&self) -> NVec2 {
        let mut acc = NVec2::zeros();
        for n in self.neighbors(true) {
            let now = n.state.position - self.node.position;
            let scale = n.rest.norm() * now.norm();
            if scale < MIN_LENGTH {
                continue;
            }
            acc.x += n.rest.dot(&now) / scale;
            acc.y += (n.rest.x * now.y - n.rest.y * now.x) / scale;
        }
        let len = acc.norm();
        if len < MIN_LENGTH {
            NVec2::new(1.0, 0.0)
        } else {
            acc / len
        }
    }
}

/// Trait for force sources acting on one node.
/// `None` means the term does not apply and is skipped entirely.
pub trait NodeForce {
    fn force(&self, t: f32, ctx: &NodeContext) -> Option<NVec2>;
}

/// Collection of force terms (springs, engines, ...)
/// Contributions are summed and divided by the node mass
pub struct ForceSet {
    mass: f32,
    terms: Vec<Box<dyn NodeForce + Send + Sync>>,
}

impl ForceSet {
    /// Create an empty force set; `mass` must be positive
    pub fn new(mass: f32) -> Self {
        Self {
            mass,
            terms: Vec::new(),
        }
    }

    /// Add a force term
    pub fn with<T>(mut self, term: T) -> Self
    where
        T: NodeForce + Send + Sync + 'static,
    {
        self.terms.push(Box::new(term));
        self
    }

    /// Springs plus engines, as configured by `params`
    pub fn from_parameters(params: &Parameters) -> Self {
        ForceSet::new(params.mass)
            .with(SpringNetwork {
                k_linear: params.k_linear,
                c_linear: params.c_linear,
                shear: params.shear_springs,
            })
            .with(EngineThrust {
                thrust: params.thrust,
                axes: params.axes,
            })
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Derivative of node `index` at time `t`, reading only `state`
    pub fn evaluate(
        &self,
        t: f32,
        field: &NodeField,
        state: &StateBuffer,
        engines: EngineState,
        index: usize,
    ) -> Derivative {
        let role = field.role(index);
        if !role.is_occupied() {
            return Derivative::zero();
        }

        let node = state.at(index);
        let ctx = NodeContext {
            index,
            role,
            node,
            field,
            state,
            engines,
        };

        let mut force = NVec2::zeros();
        for term in &self.terms {
            if let Some(f) = term.force(t, &ctx) {
                force += f;
            }
        }

        Derivative {
            d_position: node.velocity,
            d_velocity: force / self.mass,
        }
    }
}

/// Hookean springs to every occupied neighbour, with relative-velocity damping.
/// Rest length is the neighbour's base distance, so it is never zero.
pub struct SpringNetwork {
    pub k_linear: f32,
    pub c_linear: f32,
    pub shear: bool, // include diagonal springs
}

impl NodeForce for SpringNetwork {
    fn force(&self, _t: f32, ctx: &NodeContext) -> Option<NVec2> {
        let mut f = NVec2::zeros();
        for n in ctx.neighbors(self.shear) {
            let d = n.state.position - ctx.node.position;
            let len = d.norm();
            if len > MIN_LENGTH {
                // stretched springs pull toward the neighbour
                f += self.k_linear * (len - n.rest.norm()) * (d / len);
            }
            f += self.c_linear * (n.state.velocity - ctx.node.velocity);
        }
        Some(f)
    }
}

/// Constant thrust at engine nodes whose engine is on, along the engine's
/// axis rotated into the node's current orientation
pub struct EngineThrust {
    pub thrust: f32,
    pub axes: EngineAxes,
}

impl EngineThrust {
    fn axis(&self, role: NodeRole) -> Option<NVec2> {
        match role {
            NodeRole::Thrust => Some(self.axes.thrust),
            NodeRole::Left => Some(self.axes.left),
            NodeRole::Right => Some(self.axes.right),
            NodeRole::Empty | NodeRole::Structural => None,
        }
    }
}

impl NodeForce for EngineThrust {
    fn force(&self, _t: f32, ctx: &NodeContext) -> Option<NVec2> {
        if !ctx.engines.fires(ctx.role) {
            return None;
        }
        let axis = self.axis(ctx.role)?.normalize();
        let rot = ctx.orientation();
        let dir = NVec2::new(rot.x * axis.x - rot.y * axis.y, rot.y * axis.x + rot.x * axis.y);
        Some(self.thrust * dir)
    }
}
