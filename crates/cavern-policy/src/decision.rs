//! Mapping of the raw network output to an [`Action`].
//!
//! The output unit is a tanh, so the raw value lies in `[-1, 1]`. It is first
//! normalised to `v = (raw + 1) / 2` and then cut once:
//!
//! | `v` | action |
//! |-----|--------|
//! | `> 0.33` | [`Action::Up`] |
//! | `<= 0.33` | [`Action::Down`] |
//!
//! The rule never yields [`Action::Stay`]. Recorded `Stay` samples still train
//! the network towards an output of `0`, which normalises to `0.5` and therefore
//! decides `Up`.

use cavern_engine::Action;

/// Normalised output above which the pilot climbs.
pub const DECIDE_CUTOFF: f64 = 0.33;

/// Maps a raw output in `[-1, 1]` to `[0, 1]`.
#[inline]
#[must_use]
pub fn normalize(raw: f64) -> f64 {
    (raw + 1.0) / 2.0
}

#[must_use]
pub fn action_from_output(raw: f64) -> Action {
    if normalize(raw) > DECIDE_CUTOFF {
        Action::Up
    } else {
        Action::Down
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_output_climbs() {
        assert!((normalize(0.0) - 0.5).abs() < f64::EPSILON);
        assert_eq!(action_from_output(0.0), Action::Up);
    }

    #[test]
    fn test_single_cutoff() {
        assert_eq!(action_from_output(1.0), Action::Up);
        assert_eq!(action_from_output(-0.3), Action::Up);
        assert_eq!(action_from_output(-0.4), Action::Down);
        assert_eq!(action_from_output(-1.0), Action::Down);
    }

    #[test]
    fn test_never_stays() {
        for i in -100..=100 {
            let raw = f64::from(i) / 100.0;
            assert_ne!(action_from_output(raw), Action::Stay);
        }
    }
}
