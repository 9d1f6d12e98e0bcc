//! Per-channel probabilistic trigger logic.

use rand::Rng;

use rytm_types::{ChannelConfig, StepKind, TriggerMode, PROB_SCALE};

use crate::io::{DigitalOutput, InputEdge};

/// Decides whether a channel fires and drives its output line.
#[derive(Debug, Clone)]
pub struct ChannelTrigger<O> {
    mode: TriggerMode,
    probability: u8,
    output: O,
    /// Longest time a Trigger-mode pulse stays high. Zero disables the cap.
    width_us: u64,
    release_at: Option<u64>,
}

impl<O: DigitalOutput> ChannelTrigger<O> {
    pub fn new(output: O, config: ChannelConfig, width_us: u64) -> Self {
        Self {
            mode: config.mode,
            probability: config.probability.min(PROB_SCALE),
            output,
            width_us,
            release_at: None,
        }
    }

    /// React to one source edge on a step of class `step`.
    ///
    /// Returns true when a roll succeeded and the output was driven. Rest and
    /// pad steps draw no roll, so `rng` is untouched for them.
    pub fn evaluate<R: Rng>(
        &mut self,
        step: StepKind,
        edge: InputEdge,
        rng: &mut R,
        now_us: u64,
    ) -> bool {
        match edge {
            InputEdge::Rising if step.is_hit() => {
                let roll: u8 = rng.gen_range(0..PROB_SCALE);
                if roll >= self.probability {
                    return false;
                }
                self.fire(now_us);
                true
            }
            InputEdge::Falling => {
                self.release();
                false
            }
            _ => false,
        }
    }

    /// End a Trigger-mode pulse once its width has elapsed.
    pub fn tick(&mut self, now_us: u64) {
        if let Some(at) = self.release_at {
            if now_us >= at {
                self.output.set_low();
                self.release_at = None;
            }
        }
    }

    fn fire(&mut self, now_us: u64) {
        match self.mode {
            TriggerMode::Trigger => {
                self.output.set_high();
                self.release_at = (self.width_us > 0).then(|| now_us + self.width_us);
            }
            TriggerMode::Gate => self.output.set_high(),
            TriggerMode::Flip => self.output.toggle(),
        }
    }

    fn release(&mut self) {
        match self.mode {
            TriggerMode::Trigger | TriggerMode::Gate => {
                self.output.set_low();
                self.release_at = None;
            }
            TriggerMode::Flip => {}
        }
    }

    pub fn inc_prob(&mut self) {
        self.probability = (self.probability + 1).min(PROB_SCALE);
    }

    pub fn dec_prob(&mut self) {
        self.probability = self.probability.saturating_sub(1);
    }

    /// Set probability from a fraction of one. Out-of-range and NaN inputs clamp.
    pub fn set_prob(&mut self, fraction: f32) {
        let scaled = (fraction * PROB_SCALE as f32).round();
        self.probability = if scaled.is_nan() {
            0
        } else {
            scaled.clamp(0.0, PROB_SCALE as f32) as u8
        };
    }

    pub fn set_probability(&mut self, probability: u8) {
        self.probability = probability.min(PROB_SCALE);
    }

    pub fn probability(&self) -> u8 {
        self.probability
    }

    pub fn mode(&self) -> TriggerMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: TriggerMode) {
        if mode != self.mode {
            self.release_at = None;
        }
        self.mode = mode;
    }

    pub fn config(&self) -> ChannelConfig {
        ChannelConfig::new(self.mode, self.probability)
    }

    pub fn is_high(&self) -> bool {
        self.output.is_high()
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }
}
