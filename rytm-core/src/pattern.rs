//! Euclidean pattern generator and step cursor.
//!
//! Hits are spread over `steps` slots with a Bresenham-style bucket, rotated
//! by `offset`, and the cycle is lengthened by `padding` slots that never
//! fire. The classification array is fixed-size and rebuilt whenever an
//! attribute changes.

use rytm_types::{PatternState, StepKind, MAX_PATTERN_LEN};

#[derive(Debug, Clone)]
pub struct PatternGenerator {
    steps: u8,
    hits: u8,
    offset: u8,
    padding: u8,
    /// Slot most recently returned by `next_step`.
    current_step: u8,
    slots: [StepKind; MAX_PATTERN_LEN],
}

impl Default for PatternGenerator {
    fn default() -> Self {
        Self::new(PatternState::default())
    }
}

impl PatternGenerator {
    pub fn new(state: PatternState) -> Self {
        let mut pattern = Self {
            steps: 0,
            hits: 0,
            offset: 0,
            padding: 0,
            current_step: 0,
            slots: [StepKind::Pad; MAX_PATTERN_LEN],
        };
        pattern.init(state);
        pattern
    }

    /// Replace all attributes, clamping each into range, and park the cursor.
    pub fn init(&mut self, state: PatternState) {
        let max = MAX_PATTERN_LEN as u8;
        self.steps = state.steps.min(max);
        self.hits = state.hits.min(self.steps);
        self.padding = if self.steps == 0 {
            0
        } else {
            state.padding.min(max - self.steps)
        };
        self.offset = state.offset.min(self.last_slot());
        self.rebuild();
        self.reset();
    }

    pub fn state(&self) -> PatternState {
        PatternState::new(self.steps, self.hits, self.offset, self.padding)
    }

    pub fn steps(&self) -> u8 {
        self.steps
    }

    pub fn hits(&self) -> u8 {
        self.hits
    }

    pub fn offset(&self) -> u8 {
        self.offset
    }

    pub fn padding(&self) -> u8 {
        self.padding
    }

    pub fn current_step(&self) -> u8 {
        self.current_step
    }

    pub fn is_muted(&self) -> bool {
        self.steps == 0
    }

    pub fn cycle_len(&self) -> usize {
        self.steps as usize + self.padding as usize
    }

    /// Classification of slot `i`. Slots past the cycle read as padding.
    pub fn step(&self, i: usize) -> StepKind {
        self.slots.get(i).copied().unwrap_or(StepKind::Pad)
    }

    /// The classified cycle, `steps + padding` slots long.
    pub fn slots(&self) -> &[StepKind] {
        &self.slots[..self.cycle_len()]
    }

    /// Advance the cursor one slot (wrapping) and classify the new slot.
    ///
    /// A muted pattern neither advances nor fires.
    pub fn next_step(&mut self) -> StepKind {
        if self.is_muted() {
            return StepKind::Rest;
        }
        self.current_step = if self.current_step >= self.last_slot() {
            0
        } else {
            self.current_step + 1
        };
        self.slots[self.current_step as usize]
    }

    /// Park the cursor on the last slot so the next pulse plays slot 0.
    pub fn reset(&mut self) {
        self.current_step = self.last_slot();
    }

    pub fn change_steps(&mut self, delta: i8) {
        let max = MAX_PATTERN_LEN as u8;
        if delta > 0 && self.steps < max {
            self.steps += 1;
            self.padding = self.padding.min(max - self.steps);
        } else if delta < 0 && self.steps > 1 {
            self.steps -= 1;
            self.hits = self.hits.min(self.steps);
            self.offset = self.offset.min(self.last_slot());
        } else if delta < 0 && self.steps == 1 {
            self.steps = 0;
            self.hits = 0;
            self.offset = 0;
            self.padding = 0;
        } else {
            return;
        }
        self.refresh();
    }

    pub fn change_hits(&mut self, delta: i8) {
        self.hits = (self.hits as i16 + delta as i16).clamp(0, self.steps as i16) as u8;
        self.refresh();
    }

    pub fn change_offset(&mut self, delta: i8) {
        self.offset = (self.offset as i16 + delta as i16).clamp(0, self.last_slot() as i16) as u8;
        self.refresh();
    }

    pub fn change_padding(&mut self, delta: i8) {
        if delta > 0 && self.steps > 0 && self.cycle_len() < MAX_PATTERN_LEN {
            self.padding += 1;
        } else if delta < 0 && self.padding > 0 {
            self.padding -= 1;
            self.offset = self.offset.min(self.last_slot());
        } else {
            return;
        }
        self.refresh();
    }

    fn last_slot(&self) -> u8 {
        (self.cycle_len() as u8).saturating_sub(1)
    }

    fn refresh(&mut self) {
        self.rebuild();
        self.current_step = self.current_step.min(self.last_slot());
    }

    fn rebuild(&mut self) {
        self.slots = [StepKind::Pad; MAX_PATTERN_LEN];
        if self.steps == 0 {
            return;
        }

        let len = self.cycle_len();
        let steps = self.steps as usize;
        let hits = self.hits as usize;
        let offset = self.offset as usize;

        self.slots[offset] = if hits > 0 { StepKind::Hit } else { StepKind::Rest };
        let mut bucket = 0;
        for i in 1..steps {
            bucket += hits;
            let slot = (i + offset) % len;
            if bucket >= steps {
                bucket -= steps;
                self.slots[slot] = StepKind::Hit;
            } else {
                self.slots[slot] = StepKind::Rest;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use StepKind::{Hit as H, Pad as P, Rest as R};

    fn count(pattern: &PatternGenerator, kind: StepKind) -> usize {
        pattern.slots().iter().filter(|&&k| k == kind).count()
    }

    #[test]
    fn three_of_eight() {
        let p = PatternGenerator::new(PatternState::new(8, 3, 0, 0));
        assert_eq!(p.slots(), &[H, R, R, H, R, R, H, R]);
    }

    #[test]
    fn hit_count_matches_for_every_combination() {
        for steps in 1..=MAX_PATTERN_LEN as u8 {
            for hits in 0..=steps {
                for offset in 0..steps {
                    let p = PatternGenerator::new(PatternState::new(steps, hits, offset, 0));
                    let in_steps = p.slots()[..steps as usize]
                        .iter()
                        .filter(|k| k.is_hit())
                        .count();
                    assert_eq!(in_steps, hits as usize, "steps={steps} hits={hits} offset={offset}");
                }
            }
        }
    }

    #[test]
    fn padding_slots_never_fire() {
        let p = PatternGenerator::new(PatternState::new(5, 2, 0, 3));
        assert_eq!(p.slots(), &[H, R, R, H, R, P, P, P]);
        assert_eq!(count(&p, H), 2);
        assert_eq!(count(&p, P), 3);
    }

    #[test]
    fn offset_rotates_within_cycle() {
        let p = PatternGenerator::new(PatternState::new(4, 1, 2, 2));
        assert_eq!(p.slots(), &[P, P, H, R, R, R]);
        assert_eq!(count(&p, H), 1);
        assert_eq!(count(&p, P), 2);
    }

    #[test]
    fn init_clamps_out_of_range_values() {
        let p = PatternGenerator::new(PatternState::new(40, 50, 90, 20));
        let s = p.state();
        assert_eq!(s.steps, 32);
        assert_eq!(s.hits, 32);
        assert_eq!(s.padding, 0);
        assert_eq!(s.offset, 31);

        let p = PatternGenerator::new(PatternState::new(20, 5, 40, 30));
        assert_eq!(p.padding(), 12);
        assert_eq!(p.offset(), 31);
    }

    #[test]
    fn first_step_after_init_is_slot_zero() {
        let mut p = PatternGenerator::new(PatternState::new(8, 3, 0, 0));
        assert_eq!(p.next_step(), H);
        assert_eq!(p.current_step(), 0);
        assert_eq!(p.next_step(), R);
    }

    #[test]
    fn full_cycle_returns_to_start() {
        let mut p = PatternGenerator::new(PatternState::new(7, 3, 2, 4));
        p.next_step();
        let start = p.current_step();
        let seen: Vec<_> = (0..p.cycle_len()).map(|_| p.next_step()).collect();
        assert_eq!(p.current_step(), start);
        assert_eq!(seen.len(), 11);
        let again: Vec<_> = (0..p.cycle_len()).map(|_| p.next_step()).collect();
        assert_eq!(seen, again);
    }

    #[test]
    fn muted_pattern_never_advances() {
        let mut p = PatternGenerator::new(PatternState::new(0, 3, 2, 4));
        assert!(p.is_muted());
        assert_eq!(p.state(), PatternState::new(0, 0, 0, 0));
        for _ in 0..10 {
            assert_eq!(p.next_step(), R);
            assert_eq!(p.current_step(), 0);
        }
    }

    #[test]
    fn reset_replays_from_slot_zero() {
        let mut p = PatternGenerator::new(PatternState::new(8, 3, 0, 0));
        p.next_step();
        p.next_step();
        p.next_step();
        p.reset();
        assert_eq!(p.next_step(), H);
        assert_eq!(p.current_step(), 0);
    }

    #[test]
    fn decreasing_steps_to_zero_mutes() {
        let mut p = PatternGenerator::new(PatternState::new(1, 1, 0, 3));
        p.change_steps(-1);
        assert_eq!(p.state(), PatternState::new(0, 0, 0, 0));
        assert!(p.is_muted());
        p.change_steps(-1);
        assert!(p.is_muted());
        p.change_steps(1);
        assert_eq!(p.state(), PatternState::new(1, 0, 0, 0));
        assert_eq!(p.slots(), &[R]);
    }

    #[test]
    fn increasing_steps_shrinks_padding() {
        let mut p = PatternGenerator::new(PatternState::new(30, 4, 0, 2));
        p.change_steps(1);
        assert_eq!(p.steps(), 31);
        assert_eq!(p.padding(), 1);
        p.change_steps(1);
        p.change_steps(1);
        assert_eq!(p.steps(), 32);
        assert_eq!(p.padding(), 0);
    }

    #[test]
    fn decreasing_steps_clamps_hits_and_offset() {
        let mut p = PatternGenerator::new(PatternState::new(4, 4, 3, 0));
        p.change_steps(-1);
        assert_eq!(p.state(), PatternState::new(3, 3, 2, 0));
    }

    #[test]
    fn hits_clamp_to_steps() {
        let mut p = PatternGenerator::new(PatternState::new(4, 3, 0, 0));
        p.change_hits(1);
        p.change_hits(1);
        assert_eq!(p.hits(), 4);
        for _ in 0..6 {
            p.change_hits(-1);
        }
        assert_eq!(p.hits(), 0);
        assert_eq!(count(&p, H), 0);
    }

    #[test]
    fn offset_clamps_to_cycle() {
        let mut p = PatternGenerator::new(PatternState::new(4, 1, 0, 1));
        for _ in 0..10 {
            p.change_offset(1);
        }
        assert_eq!(p.offset(), 4);
        p.change_offset(-1);
        assert_eq!(p.offset(), 3);
    }

    #[test]
    fn padding_respects_max_len_and_mute() {
        let mut p = PatternGenerator::new(PatternState::new(31, 1, 0, 0));
        p.change_padding(1);
        p.change_padding(1);
        assert_eq!(p.padding(), 1);

        let mut p = PatternGenerator::new(PatternState::new(4, 1, 4, 1));
        p.change_padding(-1);
        assert_eq!(p.padding(), 0);
        assert_eq!(p.offset(), 3);

        let mut muted = PatternGenerator::new(PatternState::new(0, 0, 0, 0));
        muted.change_padding(1);
        assert_eq!(muted.padding(), 0);
    }

    #[test]
    fn cursor_stays_in_range_after_shrinking() {
        let mut p = PatternGenerator::new(PatternState::new(8, 3, 0, 0));
        for _ in 0..7 {
            p.next_step();
        }
        assert_eq!(p.current_step(), 6);
        p.change_steps(-1);
        p.change_steps(-1);
        p.change_steps(-1);
        assert!(p.current_step() < p.cycle_len() as u8);
    }
}
