//! Compile cycle stage machine
//!
//! `Idle -> Reserved -> Executing -> Publishing -> Idle`, plus
//! `Reserved -> Idle` for a ticket that was admitted but never executed.
//! The machine has no terminal state; every stage has a way back to `Idle`.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// Where the single compile cycle currently is
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum CycleStage {
    /// No cycle admitted
    #[default]
    Idle,
    /// Admitted by `try_begin_compile`, not yet running
    Reserved,
    /// Running on the build executor
    Executing,
    /// Writing the snapshot
    Publishing,
}

impl CycleStage {
    /// Every stage, in cycle order
    pub const ALL: [Self; 4] = [Self::Idle, Self::Reserved, Self::Executing, Self::Publishing];

    /// Returns true if transition from `self` to `next` is valid
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Reserved)
                | (Self::Reserved, Self::Executing | Self::Idle)
                | (Self::Executing, Self::Publishing)
                | (Self::Publishing, Self::Idle)
        )
    }

    /// Returns all valid next stages from the current stage
    #[must_use]
    pub fn valid_next_states(self) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|next| self.can_transition_to(*next))
            .collect()
    }

    /// Whether a cycle holds the engine (anything but `Idle`)
    #[must_use]
    pub const fn is_busy(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_all_lists_every_variant_once() {
        let from_iter: Vec<_> = CycleStage::iter().collect();
        assert_eq!(from_iter, CycleStage::ALL.to_vec());
    }

    #[test]
    fn test_transition_consistency() {
        for from in CycleStage::ALL {
            let valid = from.valid_next_states();
            for to in CycleStage::ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    valid.contains(&to),
                    "Inconsistency for {from:?} -> {to:?}"
                );
            }
        }
    }

    #[test]
    fn test_every_stage_can_leave() {
        for stage in CycleStage::ALL {
            assert!(
                !stage.valid_next_states().is_empty(),
                "{stage:?} must have a next stage"
            );
        }
    }

    #[test]
    fn test_only_idle_admits() {
        for stage in CycleStage::ALL {
            assert_eq!(
                stage.can_transition_to(CycleStage::Reserved),
                stage == CycleStage::Idle
            );
        }
    }

    #[test]
    fn test_happy_path_returns_to_idle() {
        let path = [
            CycleStage::Idle,
            CycleStage::Reserved,
            CycleStage::Executing,
            CycleStage::Publishing,
            CycleStage::Idle,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{pair:?}");
        }
    }

    #[test]
    fn test_display_is_snake_case() {
        assert_eq!(CycleStage::Publishing.to_string(), "publishing");
    }
}
