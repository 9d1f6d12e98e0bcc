//! Top-level owner of every channel.
//!
//! All per-channel state lives in fixed arrays here and is passed by
//! reference into each component. The host loop calls [`Engine::poll`] every
//! cycle and [`Engine::on_clock_input`] whenever it samples the clock jack.

use rytm_types::{
    ClockMod, DeviceState, PatternState, StepKind, TriggerMode, CHANNEL_COUNT,
};

use crate::clock::{ChannelEdges, ClockEngine, Stutter};
use crate::config::Config;
use crate::io::{DigitalOutput, EdgeDetector, InputEdge};
use crate::pattern::PatternGenerator;
use crate::seed::{EntropySource, SeedSequencer, WallClock};
use crate::trigger::ChannelTrigger;

/// Timing knobs that are not part of the persisted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub latency_us: u32,
    pub trigger_width_us: u64,
    pub stutter_repeats: u8,
    pub stutter_factor: u8,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            latency_us: 50,
            trigger_width_us: 10_000,
            stutter_repeats: 4,
            stutter_factor: 4,
        }
    }
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        Self {
            latency_us: config.latency_compensation_us(),
            trigger_width_us: config.trigger_width_us(),
            stutter_repeats: config.stutter_repeats(),
            stutter_factor: config.stutter_factor(),
        }
    }
}

pub struct Engine<O, E: EntropySource = WallClock> {
    patterns: [PatternGenerator; CHANNEL_COUNT],
    triggers: [ChannelTrigger<O>; CHANNEL_COUNT],
    seeds: [SeedSequencer<E>; CHANNEL_COUNT],
    stutters: [Stutter; CHANNEL_COUNT],
    clock: ClockEngine,
    clock_input: EdgeDetector,
    output_mode: TriggerMode,
    selected: u8,
    /// Time of the latest poll or clock input sample.
    now_us: u64,
}

impl<O: DigitalOutput> Engine<O, WallClock> {
    pub fn new(state: &DeviceState, outputs: [O; CHANNEL_COUNT], settings: EngineSettings) -> Self {
        Self::with_entropy(state, outputs, WallClock, settings)
    }
}

impl<O: DigitalOutput, E: EntropySource + Clone> Engine<O, E> {
    pub fn with_entropy(
        state: &DeviceState,
        outputs: [O; CHANNEL_COUNT],
        entropy: E,
        settings: EngineSettings,
    ) -> Self {
        let mut ch = 0;
        let triggers = outputs.map(|output| {
            let trigger = ChannelTrigger::new(output, state.channels[ch], settings.trigger_width_us);
            ch += 1;
            trigger
        });
        let seeds = std::array::from_fn(|i| SeedSequencer::new(entropy.clone(), i as u64));

        Self {
            patterns: state.patterns.map(PatternGenerator::new),
            triggers,
            seeds,
            stutters: [Stutter::new(settings.stutter_factor, settings.stutter_repeats); CHANNEL_COUNT],
            clock: ClockEngine::new(
                state.clock_source,
                state.resolution,
                state.tempo,
                state.clock_mods,
                settings.latency_us,
            ),
            clock_input: EdgeDetector::new(),
            output_mode: state.output_mode,
            selected: state.selected_channel.min(CHANNEL_COUNT as u8 - 1),
            now_us: 0,
        }
    }
}

impl<O: DigitalOutput, E: EntropySource> Engine<O, E> {
    /// Route one source edge through a channel: advance the pattern, bind the
    /// roll to the next seed and let the trigger decide.
    pub fn on_channel_edge(&mut self, channel: usize, edge: InputEdge, now_us: u64) -> bool {
        match edge {
            InputEdge::Rising => {
                self.stutters[channel].process_clock(now_us);
                let step = self.patterns[channel].next_step();
                let seeds = &mut self.seeds[channel];
                seeds.next_seed();
                seeds.reseed();
                self.triggers[channel].evaluate(step, edge, seeds.rng(), now_us)
            }
            InputEdge::Falling => {
                let pattern = &self.patterns[channel];
                let step = pattern.step(pattern.current_step() as usize);
                self.triggers[channel].evaluate(step, edge, self.seeds[channel].rng(), now_us)
            }
            InputEdge::Unchanged => false,
        }
    }

    fn apply_edges(&mut self, edges: ChannelEdges, now_us: u64) {
        for (channel, edge) in edges.into_iter().enumerate() {
            self.on_channel_edge(channel, edge, now_us);
        }
    }

    /// Play one internal base tick.
    pub fn on_base_tick(&mut self, now_us: u64) {
        let edges = self.clock.advance_internal();
        self.apply_edges(edges, now_us);
    }

    /// Feed a sampled level of the clock input jack.
    pub fn on_clock_input(&mut self, level: bool, now_us: u64) -> InputEdge {
        self.now_us = now_us;
        let edge = self.clock_input.process(level);
        if !self.clock.source().is_internal() {
            self.clock.on_external_edge(edge, now_us);
        }
        edge
    }

    /// One pass of the cooperative loop. Returns base ticks played.
    pub fn poll(&mut self, now_us: u64) -> u32 {
        self.now_us = now_us;
        let mut played = 0;
        if self.clock.source().is_internal() {
            played = self.clock.take_internal_ticks();
            for _ in 0..played {
                self.on_base_tick(now_us);
            }
        } else {
            let edges = self.clock.tick(now_us);
            self.apply_edges(edges, now_us);
        }
        for trigger in self.triggers.iter_mut() {
            trigger.tick(now_us);
        }
        for channel in 0..CHANNEL_COUNT {
            let edge = self.stutters[channel].tick(now_us);
            self.drive_burst(channel, edge);
        }
        played
    }

    /// Fire a ratchet burst on `channel`, timed from its recent pulse rate.
    ///
    /// Burst pulses bypass the pattern and the probability roll. Returns false
    /// until the channel has pulsed twice.
    pub fn stutter(&mut self, channel: usize, now_us: u64) -> bool {
        let edge = self.stutters[channel].start(now_us);
        self.drive_burst(channel, edge);
        edge == InputEdge::Rising
    }

    fn drive_burst(&mut self, channel: usize, edge: InputEdge) {
        let output = self.triggers[channel].output_mut();
        match edge {
            InputEdge::Rising => output.set_high(),
            InputEdge::Falling => output.set_low(),
            InputEdge::Unchanged => {}
        }
    }

    /// Time of the latest poll or clock input sample.
    pub fn now_us(&self) -> u64 {
        self.now_us
    }

    pub fn stutter_state(&self, channel: usize) -> &Stutter {
        &self.stutters[channel]
    }

    /// Park every pattern on its last slot and restart the base clock phase.
    pub fn reset(&mut self) {
        for pattern in self.patterns.iter_mut() {
            pattern.reset();
        }
        self.clock.reset();
    }

    pub fn pattern(&self, channel: usize) -> &PatternGenerator {
        &self.patterns[channel]
    }

    pub fn pattern_mut(&mut self, channel: usize) -> &mut PatternGenerator {
        &mut self.patterns[channel]
    }

    pub fn trigger(&self, channel: usize) -> &ChannelTrigger<O> {
        &self.triggers[channel]
    }

    pub fn trigger_mut(&mut self, channel: usize) -> &mut ChannelTrigger<O> {
        &mut self.triggers[channel]
    }

    pub fn seeds(&self, channel: usize) -> &SeedSequencer<E> {
        &self.seeds[channel]
    }

    pub fn seeds_mut(&mut self, channel: usize) -> &mut SeedSequencer<E> {
        &mut self.seeds[channel]
    }

    pub fn clock(&self) -> &ClockEngine {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut ClockEngine {
        &mut self.clock
    }

    pub fn output_mode(&self) -> TriggerMode {
        self.output_mode
    }

    /// Rotate the device-wide mode and apply it to every channel.
    pub fn cycle_output_mode(&mut self, delta: i8) {
        self.output_mode = self.output_mode.cycle(delta);
        for trigger in self.triggers.iter_mut() {
            trigger.set_mode(self.output_mode);
        }
    }

    pub fn selected_channel(&self) -> usize {
        self.selected as usize
    }

    pub fn select_channel(&mut self, delta: i8) {
        let n = CHANNEL_COUNT as i16;
        self.selected = (self.selected as i16 + delta as i16).rem_euclid(n) as u8;
    }

    pub fn levels(&self) -> [bool; CHANNEL_COUNT] {
        std::array::from_fn(|i| self.triggers[i].is_high())
    }

    pub fn patterns(&self) -> [PatternState; CHANNEL_COUNT] {
        std::array::from_fn(|i| self.patterns[i].state())
    }

    /// Replace every pattern, leaving triggers and clock untouched.
    pub fn apply_patterns(&mut self, patterns: &[PatternState; CHANNEL_COUNT]) {
        for (generator, state) in self.patterns.iter_mut().zip(patterns.iter()) {
            generator.init(*state);
        }
    }

    /// Snapshot of everything that persists.
    pub fn device_state(&self) -> DeviceState {
        DeviceState {
            patterns: self.patterns(),
            channels: std::array::from_fn(|i| self.triggers[i].config()),
            clock_mods: self.clock.clock_mods(),
            output_mode: self.output_mode,
            selected_channel: self.selected,
            tempo: self.clock.tempo(),
            clock_source: self.clock.source(),
            resolution: self.clock.resolution(),
        }
    }

    /// Adopt a restored state. Runtime state (cursors aside) is kept.
    pub fn apply(&mut self, state: &DeviceState) {
        self.apply_patterns(&state.patterns);
        for (trigger, config) in self.triggers.iter_mut().zip(state.channels.iter()) {
            trigger.set_mode(config.mode);
            trigger.set_probability(config.probability);
        }
        for (channel, modifier) in state.clock_mods.iter().enumerate() {
            self.clock.set_clock_mod(channel, *modifier);
        }
        self.output_mode = state.output_mode;
        self.selected = state.selected_channel.min(CHANNEL_COUNT as u8 - 1);
        self.clock.set_tempo(state.tempo);
        self.clock.set_resolution(state.resolution);
        self.clock.set_source(state.clock_source);
    }

    /// Render a channel's cycle as text, marking the cursor with brackets.
    pub fn describe(&self, channel: usize) -> String {
        let pattern = &self.patterns[channel];
        let cursor = pattern.current_step() as usize;
        let body: String = pattern
            .slots()
            .iter()
            .enumerate()
            .map(|(i, kind)| {
                let glyph = kind.glyph();
                if i == cursor {
                    format!("[{}]", glyph)
                } else {
                    glyph.to_string()
                }
            })
            .collect();
        let modifier: ClockMod = self.clock.clock_mod(channel);
        let trigger = &self.triggers[channel];
        format!(
            "{} {:>4} {:>3}% {:<4} {}",
            channel + 1,
            modifier.name(),
            trigger.probability(),
            trigger.mode().name(),
            if body.is_empty() { StepKind::Rest.glyph().to_string() } else { body }
        )
    }
}
