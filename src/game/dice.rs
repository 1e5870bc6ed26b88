//! Randomness used by the match engine, behind a trait so scenarios can be
//! scripted.

use super::bonus::{self, Bonus, BonusPolicy};
use rand::Rng;

/// Source of every random decision a match makes.
pub trait Dice: Send + Sync {
    /// Biased die deciding whether a turn gets a bonus task.
    fn bonus_roll(&self) -> bool;

    /// Uniform index in `0..len`. `len` is never zero.
    fn index(&self, len: usize) -> usize;

    /// Index of the bonus drawn from the remaining catalog.
    fn pick_bonus(&self, policy: BonusPolicy, catalog: &[Bonus]) -> Option<usize>;
}

/// Dice backed by the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadDice;

impl Dice for ThreadDice {
    fn bonus_roll(&self) -> bool {
        rand::thread_rng().gen_range(0..10) + 1 < 7
    }

    fn index(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len.max(1))
    }

    fn pick_bonus(&self, policy: BonusPolicy, catalog: &[Bonus]) -> Option<usize> {
        bonus::pick(policy, catalog, &mut rand::thread_rng())
    }
}

#[cfg(test)]
pub use scripted::ScriptedDice;

#[cfg(test)]
mod scripted {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Dice replaying queued outcomes, falling back to "no bonus" and
    /// index zero once a queue runs dry.
    #[derive(Debug, Default)]
    pub struct ScriptedDice {
        rolls: Mutex<VecDeque<bool>>,
        indices: Mutex<VecDeque<usize>>,
        bonuses: Mutex<VecDeque<usize>>,
    }

    impl ScriptedDice {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_roll(&self, award: bool) -> &Self {
            self.rolls.lock().push_back(award);
            self
        }

        pub fn push_index(&self, index: usize) -> &Self {
            self.indices.lock().push_back(index);
            self
        }

        pub fn push_bonus(&self, index: usize) -> &Self {
            self.bonuses.lock().push_back(index);
            self
        }
    }

    impl Dice for ScriptedDice {
        fn bonus_roll(&self) -> bool {
            self.rolls.lock().pop_front().unwrap_or(false)
        }

        fn index(&self, len: usize) -> usize {
            self.indices.lock().pop_front().unwrap_or(0) % len.max(1)
        }

        fn pick_bonus(&self, _policy: BonusPolicy, catalog: &[Bonus]) -> Option<usize> {
            if catalog.is_empty() {
                return None;
            }
            Some(self.bonuses.lock().pop_front().unwrap_or(0) % catalog.len())
        }
    }
}
