//! Single entry point for front-end commands.

use rytm_types::{Command, PatternParam, CHANNEL_COUNT};

use crate::engine::Engine;
use crate::error::Result;
use crate::io::DigitalOutput;
use crate::persistence::{NvStorage, PersistentStateStore};
use crate::seed::EntropySource;

/// What a dispatched command changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchResult {
    /// Configuration differs from what was last saved or loaded.
    pub dirty: bool,
    /// A load found no valid snapshot and wrote defaults.
    pub first_boot: bool,
}

impl DispatchResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn dirty() -> Self {
        Self {
            dirty: true,
            ..Self::default()
        }
    }
}

fn clamp_channel(channel: usize) -> usize {
    channel.min(CHANNEL_COUNT - 1)
}

/// Apply `cmd` to the engine, touching storage only for storage commands.
pub fn dispatch<O, E, S>(
    cmd: &Command,
    engine: &mut Engine<O, E>,
    store: &mut PersistentStateStore<S>,
) -> Result<DispatchResult>
where
    O: DigitalOutput,
    E: EntropySource,
    S: NvStorage,
{
    if cmd.is_storage() {
        log::info!(target: "dispatch", "{:?}", cmd);
    } else {
        log::debug!(target: "dispatch", "{:?}", cmd);
    }

    let result = match *cmd {
        Command::ChangePattern {
            channel,
            param,
            delta,
        } => {
            let pattern = engine.pattern_mut(clamp_channel(channel));
            match param {
                PatternParam::Steps => pattern.change_steps(delta),
                PatternParam::Hits => pattern.change_hits(delta),
                PatternParam::Offset => pattern.change_offset(delta),
                PatternParam::Padding => pattern.change_padding(delta),
            }
            DispatchResult::dirty()
        }
        Command::ChangeProbability { channel, delta } => {
            let trigger = engine.trigger_mut(clamp_channel(channel));
            for _ in 0..delta.unsigned_abs() {
                if delta > 0 {
                    trigger.inc_prob();
                } else {
                    trigger.dec_prob();
                }
            }
            DispatchResult::dirty()
        }
        Command::SetProbability { channel, fraction } => {
            engine.trigger_mut(clamp_channel(channel)).set_prob(fraction);
            DispatchResult::dirty()
        }
        Command::SetMode { channel, mode } => {
            engine.trigger_mut(clamp_channel(channel)).set_mode(mode);
            DispatchResult::dirty()
        }
        Command::CycleOutputMode(delta) => {
            engine.cycle_output_mode(delta);
            DispatchResult::dirty()
        }
        Command::ChangeClockMod { channel, delta } => {
            engine.clock_mut().change_clock_mod(clamp_channel(channel), delta);
            DispatchResult::dirty()
        }
        Command::ChangeTempo(delta) => {
            engine.clock_mut().change_tempo(delta);
            DispatchResult::dirty()
        }
        Command::SetClockSource(source) => {
            engine.clock_mut().set_source(source);
            DispatchResult::dirty()
        }
        Command::CycleResolution(delta) => {
            let clock = engine.clock_mut();
            let resolution = clock.resolution().cycle(delta);
            clock.set_resolution(resolution);
            DispatchResult::dirty()
        }
        Command::SelectChannel(delta) => {
            engine.select_channel(delta);
            DispatchResult::dirty()
        }
        Command::PrevSeed { channel } => {
            if !engine.seeds_mut(clamp_channel(channel)).prev_seed() {
                log::debug!(target: "dispatch", "channel {} at oldest seed", channel);
            }
            DispatchResult::none()
        }
        Command::NextSeed { channel } => {
            engine.seeds_mut(clamp_channel(channel)).next_seed();
            DispatchResult::none()
        }
        Command::Stutter { channel } => {
            let channel = clamp_channel(channel);
            let now_us = engine.now_us();
            if !engine.stutter(channel, now_us) {
                log::debug!(target: "dispatch", "channel {} has no pulse rate yet", channel);
            }
            DispatchResult::none()
        }
        Command::Reset => {
            engine.reset();
            DispatchResult::none()
        }
        Command::SaveChanges => {
            store.save_changes(&engine.device_state())?;
            DispatchResult::none()
        }
        Command::LoadState => {
            let outcome = store.load()?;
            engine.apply(&outcome.state);
            DispatchResult {
                dirty: false,
                first_boot: outcome.first_boot,
            }
        }
        Command::SavePreset(bank) => {
            store.save_preset(bank, &engine.patterns())?;
            DispatchResult::none()
        }
        Command::LoadPreset(bank) => {
            let patterns = store.load_preset(bank)?;
            engine.apply_patterns(&patterns);
            DispatchResult::dirty()
        }
    };
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineSettings;
    use crate::io::LatchedOutput;
    use crate::persistence::MemoryEeprom;
    use crate::seed::WallClock;
    use rytm_types::{ClockMod, ClockResolution, DeviceState, TriggerMode};

    fn setup() -> (Engine<LatchedOutput, WallClock>, PersistentStateStore<MemoryEeprom>) {
        let mut store = PersistentStateStore::new(MemoryEeprom::new(), DeviceState::default());
        let state = store.load().unwrap().state;
        let engine = Engine::new(&state, [LatchedOutput::new(); CHANNEL_COUNT], EngineSettings::default());
        (engine, store)
    }

    #[test]
    fn out_of_range_channel_is_clamped() {
        let (mut engine, mut store) = setup();
        let cmd = Command::ChangePattern {
            channel: 99,
            param: PatternParam::Hits,
            delta: 1,
        };
        let result = dispatch(&cmd, &mut engine, &mut store).unwrap();
        assert!(result.dirty);
        assert_eq!(engine.pattern(CHANNEL_COUNT - 1).hits(), 5);
        assert_eq!(engine.pattern(0).hits(), 4);
    }

    #[test]
    fn probability_steps_clamp() {
        let (mut engine, mut store) = setup();
        let down = Command::ChangeProbability {
            channel: 1,
            delta: -120,
        };
        dispatch(&down, &mut engine, &mut store).unwrap();
        assert_eq!(engine.trigger(1).probability(), 0);
        let up = Command::ChangeProbability { channel: 1, delta: 7 };
        dispatch(&up, &mut engine, &mut store).unwrap();
        assert_eq!(engine.trigger(1).probability(), 7);
    }

    #[test]
    fn clock_commands_reach_clock() {
        let (mut engine, mut store) = setup();
        for cmd in [
            Command::ChangeClockMod { channel: 2, delta: -1 },
            Command::ChangeTempo(-100),
            Command::CycleResolution(1),
        ] {
            dispatch(&cmd, &mut engine, &mut store).unwrap();
        }
        assert_eq!(engine.clock().clock_mod(2), ClockMod::Mult2);
        assert_eq!(engine.clock().tempo(), rytm_types::MIN_TEMPO);
        assert_eq!(engine.clock().resolution(), ClockResolution::Ppqn4);
    }

    #[test]
    fn save_and_load_state() {
        let (mut engine, mut store) = setup();
        dispatch(&Command::CycleOutputMode(2), &mut engine, &mut store).unwrap();
        dispatch(&Command::SaveChanges, &mut engine, &mut store).unwrap();
        dispatch(&Command::CycleOutputMode(1), &mut engine, &mut store).unwrap();
        assert_eq!(engine.output_mode(), TriggerMode::Trigger);

        let result = dispatch(&Command::LoadState, &mut engine, &mut store).unwrap();
        assert!(!result.first_boot);
        assert_eq!(engine.output_mode(), TriggerMode::Flip);
        assert_eq!(engine.trigger(0).mode(), TriggerMode::Flip);
    }

    #[test]
    fn stutter_uses_last_poll_time() {
        let (mut engine, mut store) = setup();
        let cmd = Command::Stutter { channel: 40 };
        dispatch(&cmd, &mut engine, &mut store).unwrap();
        assert!(!engine.stutter_state(CHANNEL_COUNT - 1).is_active());

        let last = CHANNEL_COUNT - 1;
        engine.on_channel_edge(last, crate::io::InputEdge::Rising, 0);
        engine.on_channel_edge(last, crate::io::InputEdge::Rising, 40_000);
        engine.poll(50_000);
        let result = dispatch(&cmd, &mut engine, &mut store).unwrap();
        assert!(!result.dirty);
        assert!(engine.stutter_state(last).is_active());
        assert!(engine.levels()[last]);
    }

    #[test]
    fn presets_round_trip_through_engine() {
        let (mut engine, mut store) = setup();
        let widen = Command::ChangePattern {
            channel: 0,
            param: PatternParam::Padding,
            delta: 1,
        };
        dispatch(&widen, &mut engine, &mut store).unwrap();
        let saved = engine.patterns();
        dispatch(&Command::SavePreset(1), &mut engine, &mut store).unwrap();

        dispatch(&Command::LoadPreset(0), &mut engine, &mut store).unwrap();
        assert_eq!(engine.pattern(0).padding(), 0);
        dispatch(&Command::LoadPreset(1), &mut engine, &mut store).unwrap();
        assert_eq!(engine.patterns(), saved);
    }
}
