//! Core state types for the node lattice.
//!
//! Defines the grid container and the per-node buffers the passes read and
//! write:
//! - `NodeState` / `StateBuffer`  position + velocity of every node
//! - `Derivative` / `DerivativeBuffer`  one RK4 stage result per node
//! - `StateStore`  the ping-pong pair selected by `tick`
//!
//! Roles and base positions are immutable and live in `NodeField`, not here.

use nalgebra::Vector2;

use crate::error::{SimError, SimResult};

pub type NVec2 = Vector2<f32>;

/// Dense `width x height` storage, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T: Clone> Grid<T> {
    pub fn new(width: usize, height: usize, fill: T) -> Self {
        Self {
            width,
            height,
            cells: vec![fill; width * height],
        }
    }
}

impl<T> Grid<T> {
    pub fn from_vec(width: usize, height: usize, cells: Vec<T>) -> SimResult<Self> {
        if cells.len() != width * height {
            return Err(SimError::DimensionMismatch {
                expected: (width, height),
                actual: (cells.len(), 1),
            });
        }
        Ok(Self { width, height, cells })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn index(&self, col: usize, row: usize) -> usize {
        row * self.width + col
    }

    pub fn coords(&self, index: usize) -> (usize, usize) {
        (index % self.width, index / self.width)
    }

    /// Bounds-checked lookup with signed coordinates
    pub fn get(&self, col: isize, row: isize) -> Option<&T> {
        if col < 0 || row < 0 || col as usize >= self.width || row as usize >= self.height {
            return None;
        }
        self.cells.get(row as usize * self.width + col as usize)
    }

    pub fn at(&self, index: usize) -> &T {
        &self.cells[index]
    }

    pub fn at_mut(&mut self, index: usize) -> &mut T {
        &mut self.cells[index]
    }

    pub fn as_slice(&self) -> &[T] {
        &self.cells
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.cells
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.cells.iter()
    }
}

/// Mutable per-node state
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NodeState {
    pub position: NVec2,
    pub velocity: NVec2,
}

impl NodeState {
    pub fn at_rest(position: NVec2) -> Self {
        Self {
            position,
            velocity: NVec2::zeros(),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.position.iter().chain(self.velocity.iter()).all(|c| c.is_finite())
    }
}

/// Time derivative of one node's state
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Derivative {
    pub d_position: NVec2, // = velocity
    pub d_velocity: NVec2, // = acceleration
}

impl Derivative {
    pub fn zero() -> Self {
        Self::default()
    }
}

pub type StateBuffer = Grid<NodeState>;
pub type DerivativeBuffer = Grid<Derivative>;

/// The two authoritative state buffers
///
/// Only `split` hands out a writable buffer, and it always returns the slot
/// that is *not* current, so a pass can never read and write the same one.
#[derive(Debug, Clone)]
pub struct StateStore {
    slots: [StateBuffer; 2],
    tick: bool,
}

impl StateStore {
    pub fn new(width: usize, height: usize) -> Self {
        let blank = Grid::new(width, height, NodeState::default());
        Self {
            slots: [blank.clone(), blank],
            tick: false,
        }
    }

    /// Slot index of the current buffer
    pub fn tick(&self) -> usize {
        self.tick as usize
    }

    pub fn next_index(&self) -> usize {
        (!self.tick) as usize
    }

    pub fn current(&self) -> &StateBuffer {
        &self.slots[self.tick()]
    }

    /// `(current, next)`
    pub fn split(&mut self) -> (&StateBuffer, &mut StateBuffer) {
        let (a, b) = self.slots.split_at_mut(1);
        if self.tick {
            (&b[0], &mut a[0])
        } else {
            (&a[0], &mut b[0])
        }
    }

    pub fn flip(&mut self) {
        self.tick = !self.tick;
    }

    /// Overwrite one node of the current buffer; only used to seed a run
    pub fn seed(&mut self, index: usize, state: NodeState) {
        let tick = self.tick();
        *self.slots[tick].at_mut(index) = state;
    }

    /// Position = base position, velocity = 0, in both slots
    pub fn seed_identity(&mut self, base: &Grid<NVec2>) {
        for slot in self.slots.iter_mut() {
            for (s, p) in slot.as_mut_slice().iter_mut().zip(base.iter()) {
                *s = NodeState::at_rest(*p);
            }
        }
    }
}
