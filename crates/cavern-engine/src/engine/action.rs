use serde::{Deserialize, Serialize};

use crate::InvalidActionError;

/// Vertical move of the player for one step.
///
/// Serialized as its integer label: `-1` (up), `0` (stay), `1` (down).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Action {
    Up,
    #[default]
    Stay,
    Down,
}

impl Action {
    pub const ALL: [Self; 3] = [Self::Up, Self::Stay, Self::Down];

    /// Row offset applied by this action.
    #[must_use]
    pub const fn step(self) -> i32 {
        match self {
            Self::Up => -1,
            Self::Stay => 0,
            Self::Down => 1,
        }
    }

    /// Label of an arbitrary step: its sign.
    #[must_use]
    pub const fn from_step(step: i32) -> Self {
        match step.signum() {
            -1 => Self::Up,
            0 => Self::Stay,
            _ => Self::Down,
        }
    }

    /// Training target value of this action.
    #[must_use]
    pub fn label(self) -> f64 {
        f64::from(self.step())
    }
}

impl TryFrom<i32> for Action {
    type Error = InvalidActionError;

    fn try_from(label: i32) -> Result<Self, Self::Error> {
        match label {
            -1 => Ok(Self::Up),
            0 => Ok(Self::Stay),
            1 => Ok(Self::Down),
            _ => Err(InvalidActionError { label }),
        }
    }
}

impl From<Action> for i32 {
    fn from(action: Action) -> Self {
        action.step()
    }
}
