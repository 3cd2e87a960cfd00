//! Turn sprite pixels into node roles.
//!
//! A node is occupied when at least one pixel it touches is opaque. Engine
//! roles come from an exact RGB match against a `MarkerTable`; once a node
//! is an engine it stays one, whatever its other pixels look like.

use serde::Deserialize;

use super::image::RgbaImage;
use super::states::{Grid, NVec2};
use crate::error::{SimError, SimResult};

/// What a node does in the force model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    #[default]
    Empty,
    Structural,
    Thrust,
    Left,
    Right,
}

impl NodeRole {
    pub fn is_occupied(self) -> bool {
        self != NodeRole::Empty
    }

    pub fn is_engine(self) -> bool {
        matches!(self, NodeRole::Thrust | NodeRole::Left | NodeRole::Right)
    }
}

/// Reserved marker colours, checked in insertion order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerTable {
    entries: Vec<([u8; 3], NodeRole)>,
}

impl MarkerTable {
    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    /// Register a colour for an engine role
    pub fn with(mut self, rgb: [u8; 3], role: NodeRole) -> SimResult<Self> {
        if !role.is_engine() {
            return Err(SimError::config(format!(
                "marker {:?} must map to an engine role, not {:?}",
                rgb, role
            )));
        }
        if self.entries.iter().any(|(c, _)| *c == rgb) {
            return Err(SimError::config(format!("marker {:?} registered twice", rgb)));
        }
        self.entries.push((rgb, role));
        Ok(self)
    }

    pub fn lookup(&self, rgb: [u8; 3]) -> Option<NodeRole> {
        self.entries.iter().find(|(c, _)| *c == rgb).map(|(_, r)| *r)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MarkerTable {
    /// Pure red variants told apart by the blue byte
    fn default() -> Self {
        Self {
            entries: vec![
                ([255, 0, 0], NodeRole::Thrust),
                ([255, 0, 1], NodeRole::Right),
                ([255, 0, 2], NodeRole::Left),
            ],
        }
    }
}

/// Node placement relative to pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum Lattice {
    /// One node per pixel centre, `W x H`
    #[default]
    #[serde(rename = "pixel")]
    Pixel,
    /// One node per pixel corner, `(W+1) x (H+1)`
    #[serde(rename = "corner")]
    Corner,
}

impl Lattice {
    pub fn node_shape(self, width: usize, height: usize) -> (usize, usize) {
        match self {
            Lattice::Pixel => (width, height),
            Lattice::Corner => (width + 1, height + 1),
        }
    }

    /// Pixels touched by node `(col, row)`, in scan order, clipped to the image
    fn touched_pixels(self, col: usize, row: usize, width: usize, height: usize) -> Vec<(usize, usize)> {
        match self {
            Lattice::Pixel => vec![(col, row)],
            Lattice::Corner => {
                let mut out = Vec::with_capacity(4);
                for y in row.saturating_sub(1)..=row {
                    for x in col.saturating_sub(1)..=col {
                        if x < width && y < height {
                            out.push((x, y));
                        }
                    }
                }
                out
            }
        }
    }
}

/// Immutable per-node data computed once from the sprite
#[derive(Debug, Clone, PartialEq)]
pub struct NodeField {
    pub roles: Grid<NodeRole>,
    pub base: Grid<NVec2>,
    pub colors: Grid<[u8; 3]>,
}

impl NodeField {
    pub fn width(&self) -> usize {
        self.roles.width()
    }

    pub fn height(&self) -> usize {
        self.roles.height()
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn role(&self, index: usize) -> NodeRole {
        *self.roles.at(index)
    }

    pub fn occupied_count(&self) -> usize {
        self.roles.iter().filter(|r| r.is_occupied()).count()
    }

    pub fn count(&self, role: NodeRole) -> usize {
        self.roles.iter().filter(|r| **r == role).count()
    }

    /// Build a field directly from roles, with identity base positions
    pub fn from_roles(roles: Grid<NodeRole>) -> Self {
        let (width, height) = roles.shape();
        let base = identity_positions(width, height);
        let colors = Grid::new(width, height, [255, 255, 255]);
        Self { roles, base, colors }
    }
}

fn identity_positions(width: usize, height: usize) -> Grid<NVec2> {
    let mut base = Grid::new(width, height, NVec2::zeros());
    for i in 0..base.len() {
        let (col, row) = base.coords(i);
        *base.at_mut(i) = NVec2::new(col as f32, row as f32);
    }
    base
}

/// Classify every node of the lattice; a pure function of its inputs
pub fn classify(image: &RgbaImage, markers: &MarkerTable, lattice: Lattice) -> NodeField {
    let (width, height) = lattice.node_shape(image.width, image.height);
    let mut roles = Grid::new(width, height, NodeRole::Empty);
    let mut colors = Grid::new(width, height, [0u8; 3]);

    for row in 0..height {
        for col in 0..width {
            let idx = roles.index(col, row);
            let mut role = NodeRole::Empty;
            let mut color = [0u8; 3];

            for (x, y) in lattice.touched_pixels(col, row, image.width, image.height) {
                if !image.is_opaque(x, y) {
                    continue;
                }
                let [r, g, b, _] = image.pixel(x, y);
                let rgb = [r, g, b];

                match markers.lookup(rgb) {
                    Some(engine) if !role.is_engine() => {
                        role = engine;
                        color = rgb;
                    }
                    _ if role == NodeRole::Empty => {
                        role = NodeRole::Structural;
                        color = rgb;
                    }
                    _ => {}
                }
            }

            *roles.at_mut(idx) = role;
            *colors.at_mut(idx) = color;
        }
    }

    NodeField {
        roles,
        base: identity_positions(width, height),
        colors,
    }
}
