#![allow(dead_code)]

use rytm_core::engine::{Engine, EngineSettings};
use rytm_core::io::LatchedOutput;
use rytm_core::seed::EntropySource;
use rytm_types::{DeviceState, PatternState, CHANNEL_COUNT};

/// Entropy that counts up from a fixed start, so runs are reproducible.
#[derive(Debug, Clone)]
pub struct Counter(pub u64);

impl EntropySource for Counter {
    fn entropy(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(1);
        self.0
    }
}

pub type TestEngine = Engine<LatchedOutput, Counter>;

pub fn make_engine(state: &DeviceState) -> TestEngine {
    Engine::with_entropy(
        state,
        [LatchedOutput::new(); CHANNEL_COUNT],
        Counter(1000),
        EngineSettings::default(),
    )
}

pub fn state_with_pattern(channel: usize, pattern: PatternState) -> DeviceState {
    let mut state = DeviceState::default();
    state.patterns[channel] = pattern;
    state
}

/// Count low-to-high transitions of one channel while `step` runs `n` times.
pub fn count_rises(engine: &mut TestEngine, channel: usize, n: usize, mut step: impl FnMut(&mut TestEngine, usize)) -> usize {
    let mut last = engine.levels()[channel];
    let mut rises = 0;
    for i in 0..n {
        step(engine, i);
        let level = engine.levels()[channel];
        if level && !last {
            rises += 1;
        }
        last = level;
    }
    rises
}
