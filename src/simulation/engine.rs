//! Engine input latch
//!
//! Three on/off flags written by input handling between frames and read by
//! the thrust term. Only the latest state matters; nothing is queued.

use serde::Deserialize;

use super::classifier::NodeRole;

/// Named controls delivered by the input source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineControl {
    Thrust,
    Left,
    Right,
}

impl EngineControl {
    /// Engine control that drives nodes of `role`, if any
    pub fn for_role(role: NodeRole) -> Option<Self> {
        match role {
            NodeRole::Thrust => Some(EngineControl::Thrust),
            NodeRole::Left => Some(EngineControl::Left),
            NodeRole::Right => Some(EngineControl::Right),
            NodeRole::Empty | NodeRole::Structural => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineState {
    pub thrust_on: bool,
    pub left_on: bool,
    pub right_on: bool,
}

impl EngineState {
    pub fn set(&mut self, control: EngineControl, on: bool) {
        match control {
            EngineControl::Thrust => self.thrust_on = on,
            EngineControl::Left => self.left_on = on,
            EngineControl::Right => self.right_on = on,
        }
    }

    pub fn press(&mut self, control: EngineControl) {
        self.set(control, true);
    }

    pub fn release(&mut self, control: EngineControl) {
        self.set(control, false);
    }

    pub fn is_on(&self, control: EngineControl) -> bool {
        match control {
            EngineControl::Thrust => self.thrust_on,
            EngineControl::Left => self.left_on,
            EngineControl::Right => self.right_on,
        }
    }

    /// Whether the engine driving `role` is firing
    pub fn fires(&self, role: NodeRole) -> bool {
        EngineControl::for_role(role).is_some_and(|c| self.is_on(c))
    }

    pub fn any_on(&self) -> bool {
        self.thrust_on || self.left_on || self.right_on
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_and_release_latch_latest_state() {
        let mut engines = EngineState::default();
        engines.press(EngineControl::Left);
        engines.press(EngineControl::Left);
        assert!(engines.left_on);
        assert!(engines.fires(NodeRole::Left));
        assert!(!engines.fires(NodeRole::Right));

        engines.release(EngineControl::Left);
        assert!(!engines.any_on());
    }

    #[test]
    fn structural_nodes_never_fire() {
        let engines = EngineState {
            thrust_on: true,
            left_on: true,
            right_on: true,
        };
        assert!(!engines.fires(NodeRole::Structural));
        assert!(!engines.fires(NodeRole::Empty));
    }
}
