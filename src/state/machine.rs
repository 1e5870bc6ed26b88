//! Ordered stage machine used by the match builder.
//!
//! ## State Machine
//!
//! ```text
//! categories ─► rounds_num ─► round_secs ─► letters ─► bonus_tasks ─► vote ─► done
//!     ◄───────────────────────── prev / next ──────────────────────────────────►
//! ```
//!
//! The machine is a cursor over a fixed list of tags. `next` at the last tag
//! and `prev` at the first are no-ops, so button handlers never need bounds
//! checks of their own.

/// Cursor over an ordered, non-empty list of stage tags.
#[derive(Debug, Clone)]
pub struct StageMachine<S: 'static> {
    stages: &'static [S],
    idx: usize,
}

impl<S: Copy + PartialEq + 'static> StageMachine<S> {
    /// Start at the first stage. `stages` must not be empty.
    pub fn new(stages: &'static [S]) -> Self {
        debug_assert!(!stages.is_empty(), "stage list must not be empty");
        Self { stages, idx: 0 }
    }

    /// Current stage.
    #[inline]
    pub fn curr(&self) -> S {
        self.stages[self.idx]
    }

    /// Advance one stage; no-op at the last stage.
    pub fn next(&mut self) -> S {
        if !self.is_max() {
            self.idx += 1;
        }
        self.curr()
    }

    /// Step back one stage; no-op at the first stage.
    pub fn prev(&mut self) -> S {
        if !self.is_min() {
            self.idx -= 1;
        }
        self.curr()
    }

    #[inline]
    pub fn is_min(&self) -> bool {
        self.idx == 0
    }

    #[inline]
    pub fn is_max(&self) -> bool {
        self.idx + 1 >= self.stages.len()
    }

    /// Jump to `tag`. Returns `false` (and stays put) if the tag is unknown.
    pub fn seek(&mut self, tag: S) -> bool {
        match self.stages.iter().position(|s| *s == tag) {
            Some(idx) => {
                self.idx = idx;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Step {
        A,
        B,
        C,
        Z,
    }

    const STEPS: [Step; 3] = [Step::A, Step::B, Step::C];

    #[test]
    fn starts_at_first_stage() {
        let m = StageMachine::new(&STEPS);
        assert_eq!(m.curr(), Step::A);
        assert!(m.is_min());
        assert!(!m.is_max());
    }

    #[test]
    fn next_is_noop_at_max() {
        let mut m = StageMachine::new(&STEPS);
        assert_eq!(m.next(), Step::B);
        assert_eq!(m.next(), Step::C);
        assert!(m.is_max());
        assert_eq!(m.next(), Step::C);
    }

    #[test]
    fn prev_is_noop_at_min() {
        let mut m = StageMachine::new(&STEPS);
        assert_eq!(m.prev(), Step::A);
        m.next();
        assert_eq!(m.prev(), Step::A);
    }

    #[test]
    fn seek_jumps_to_known_tags_only() {
        let mut m = StageMachine::new(&STEPS);
        assert!(m.seek(Step::C));
        assert_eq!(m.curr(), Step::C);
        assert!(!m.seek(Step::Z));
        assert_eq!(m.curr(), Step::C);
    }

    #[test]
    fn single_stage_is_min_and_max() {
        static ONLY: [Step; 1] = [Step::A];
        let m = StageMachine::new(&ONLY);
        assert!(m.is_min() && m.is_max());
    }
}
