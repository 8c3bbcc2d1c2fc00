//! Input surface.
//!
//! Key-down events map 1:1 onto four movement commands. Each command queues
//! one constant-magnitude force for the owned body, consumed by the next
//! simulation step. Held keys are not repeated.

use peerball_sim::{Label, StepForce, Vec2};

/// Logical movement command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Up,
    Down,
    Left,
    Right,
}

impl Command {
    /// Map a key name to a command. Anything outside the four directions
    /// yields `None`.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "ArrowUp" | "w" => Some(Self::Up),
            "ArrowDown" | "s" => Some(Self::Down),
            "ArrowLeft" | "a" => Some(Self::Left),
            "ArrowRight" | "d" => Some(Self::Right),
            _ => None,
        }
    }

    /// Unit direction in field coordinates (y grows downward).
    pub fn direction(self) -> Vec2 {
        match self {
            Self::Up => [0.0, -1.0],
            Self::Down => [0.0, 1.0],
            Self::Left => [-1.0, 0.0],
            Self::Right => [1.0, 0.0],
        }
    }

    pub fn force(self, magnitude: f64) -> Vec2 {
        let [x, y] = self.direction();
        [x * magnitude, y * magnitude]
    }
}

/// Commands captured since the last step.
#[derive(Debug, Clone, Default)]
pub struct InputQueue {
    pending: Vec<Command>,
}

impl InputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: Command) {
        self.pending.push(command);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drain queued commands as forces on `label`, in arrival order.
    pub fn drain_forces(&mut self, label: Label, magnitude: f64) -> Vec<StepForce> {
        self.pending
            .drain(..)
            .map(|command| StepForce {
                label,
                force: command.force(magnitude),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrow_keys_map_to_commands() {
        assert_eq!(Command::from_key("ArrowUp"), Some(Command::Up));
        assert_eq!(Command::from_key("ArrowDown"), Some(Command::Down));
        assert_eq!(Command::from_key("ArrowLeft"), Some(Command::Left));
        assert_eq!(Command::from_key("ArrowRight"), Some(Command::Right));
    }

    #[test]
    fn test_wasd_aliases() {
        assert_eq!(Command::from_key("w"), Some(Command::Up));
        assert_eq!(Command::from_key("a"), Some(Command::Left));
        assert_eq!(Command::from_key("s"), Some(Command::Down));
        assert_eq!(Command::from_key("d"), Some(Command::Right));
    }

    #[test]
    fn test_other_keys_ignored() {
        for key in ["Space", "Enter", "ArrowUpLeft", "W", ""] {
            assert_eq!(Command::from_key(key), None, "key {key:?}");
        }
    }

    #[test]
    fn test_force_has_constant_magnitude() {
        for command in [Command::Up, Command::Down, Command::Left, Command::Right] {
            let [x, y] = command.force(0.05);
            assert!(((x * x + y * y).sqrt() - 0.05).abs() < 1e-12);
        }
        assert_eq!(Command::Up.force(2.0), [0.0, -2.0]);
    }

    #[test]
    fn test_drain_forces_empties_queue() {
        let mut queue = InputQueue::new();
        queue.push(Command::Right);
        queue.push(Command::Down);
        assert_eq!(queue.len(), 2);

        let forces = queue.drain_forces(Label::Player2, 10.0);
        assert_eq!(
            forces,
            vec![
                StepForce {
                    label: Label::Player2,
                    force: [10.0, 0.0]
                },
                StepForce {
                    label: Label::Player2,
                    force: [0.0, 10.0]
                },
            ]
        );
        assert!(queue.is_empty());
        assert!(queue.drain_forces(Label::Player2, 10.0).is_empty());
    }
}
