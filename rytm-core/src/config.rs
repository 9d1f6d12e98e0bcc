use std::path::PathBuf;

use serde::Deserialize;

use rytm_types::{
    ChannelConfig, ClockMod, ClockResolution, ClockSource, DeviceState, PatternState,
    TriggerMode, CHANNEL_COUNT, DEFAULT_PATTERN,
};

use crate::persistence::layout::required_capacity;
use crate::persistence::storage::DEFAULT_CAPACITY;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    defaults: DefaultsConfig,
    #[serde(default)]
    clock: ClockConfig,
    #[serde(default)]
    output: OutputConfig,
    #[serde(default)]
    stutter: StutterConfig,
    #[serde(default)]
    storage: StorageConfig,
}

#[derive(Deserialize, Default)]
struct DefaultsConfig {
    tempo: Option<u8>,
    pattern: Option<[u8; 4]>,
    probability: Option<u8>,
    mode: Option<String>,
    clock_mod: Option<String>,
    clock_source: Option<String>,
    resolution: Option<u8>,
}

#[derive(Deserialize, Default)]
struct ClockConfig {
    latency_compensation_us: Option<u32>,
}

#[derive(Deserialize, Default)]
struct OutputConfig {
    trigger_width_ms: Option<u32>,
}

#[derive(Deserialize, Default)]
struct StutterConfig {
    repeats: Option<u8>,
    factor: Option<u8>,
}

#[derive(Deserialize, Default)]
struct StorageConfig {
    eeprom_path: Option<PathBuf>,
    capacity: Option<usize>,
}

pub struct Config {
    defaults: DefaultsConfig,
    clock: ClockConfig,
    output: OutputConfig,
    stutter: StutterConfig,
    storage: StorageConfig,
}

impl Config {
    pub fn load() -> Self {
        let user = user_config_path()
            .filter(|path| path.exists())
            .and_then(|path| match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                    Ok(user) => Some(user),
                    Err(e) => {
                        log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e);
                        None
                    }
                },
                Err(e) => {
                    log::warn!(target: "config", "could not read config {}: {}", path.display(), e);
                    None
                }
            });
        Self::layered(user)
    }

    /// Embedded defaults overridden by `contents`. Malformed input is ignored.
    pub fn from_toml(contents: &str) -> Self {
        match toml::from_str::<ConfigFile>(contents) {
            Ok(user) => Self::layered(Some(user)),
            Err(e) => {
                log::warn!(target: "config", "ignoring malformed config: {}", e);
                Self::layered(None)
            }
        }
    }

    fn layered(user: Option<ConfigFile>) -> Self {
        let mut base: ConfigFile = toml::from_str(DEFAULT_CONFIG).unwrap_or_else(|e| {
            log::error!(target: "config", "embedded config.toml is invalid: {}", e);
            ConfigFile::default()
        });
        if let Some(user) = user {
            merge_defaults(&mut base.defaults, user.defaults);
            if user.clock.latency_compensation_us.is_some() {
                base.clock.latency_compensation_us = user.clock.latency_compensation_us;
            }
            if user.output.trigger_width_ms.is_some() {
                base.output.trigger_width_ms = user.output.trigger_width_ms;
            }
            if user.stutter.repeats.is_some() {
                base.stutter.repeats = user.stutter.repeats;
            }
            if user.stutter.factor.is_some() {
                base.stutter.factor = user.stutter.factor;
            }
            merge_storage(&mut base.storage, user.storage);
        }
        Config {
            defaults: base.defaults,
            clock: base.clock,
            output: base.output,
            stutter: base.stutter,
            storage: base.storage,
        }
    }

    /// Device state written on first boot.
    pub fn defaults(&self) -> DeviceState {
        let fallback = DeviceState::default();
        let d = &self.defaults;

        let pattern = d
            .pattern
            .map(|[steps, hits, offset, padding]| PatternState::new(steps, hits, offset, padding))
            .unwrap_or(DEFAULT_PATTERN);
        let mode = d
            .mode
            .as_deref()
            .and_then(parse_mode)
            .unwrap_or(fallback.output_mode);
        let probability = d.probability.unwrap_or(fallback.channels[0].probability);
        let clock_mod = d
            .clock_mod
            .as_deref()
            .and_then(parse_clock_mod)
            .unwrap_or_default();

        DeviceState {
            patterns: [pattern; CHANNEL_COUNT],
            channels: [ChannelConfig::new(mode, probability); CHANNEL_COUNT],
            clock_mods: [clock_mod; CHANNEL_COUNT],
            output_mode: mode,
            selected_channel: 0,
            tempo: d.tempo.unwrap_or(fallback.tempo),
            clock_source: d
                .clock_source
                .as_deref()
                .and_then(parse_clock_source)
                .unwrap_or(fallback.clock_source),
            resolution: d
                .resolution
                .and_then(parse_resolution)
                .unwrap_or(fallback.resolution),
        }
    }

    pub fn latency_compensation_us(&self) -> u32 {
        self.clock.latency_compensation_us.unwrap_or(50)
    }

    /// Trigger-mode pulse cap in microseconds. Zero disables the cap.
    pub fn trigger_width_us(&self) -> u64 {
        self.output.trigger_width_ms.unwrap_or(10) as u64 * 1000
    }

    pub fn stutter_repeats(&self) -> u8 {
        self.stutter.repeats.unwrap_or(4)
    }

    /// Burst pulses per measured source pulse, at least one.
    pub fn stutter_factor(&self) -> u8 {
        self.stutter.factor.unwrap_or(4).max(1)
    }

    /// EEPROM image location, falling back to the user data dir.
    pub fn eeprom_path(&self) -> PathBuf {
        self.storage.eeprom_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("rytm")
                .join("eeprom.bin")
        })
    }

    /// Image size, never smaller than the snapshot plus every bank.
    pub fn eeprom_capacity(&self) -> usize {
        self.storage
            .capacity
            .unwrap_or(DEFAULT_CAPACITY)
            .max(required_capacity())
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("rytm").join("config.toml"))
}

fn merge_defaults(base: &mut DefaultsConfig, user: DefaultsConfig) {
    if user.tempo.is_some() {
        base.tempo = user.tempo;
    }
    if user.pattern.is_some() {
        base.pattern = user.pattern;
    }
    if user.probability.is_some() {
        base.probability = user.probability;
    }
    if user.mode.is_some() {
        base.mode = user.mode;
    }
    if user.clock_mod.is_some() {
        base.clock_mod = user.clock_mod;
    }
    if user.clock_source.is_some() {
        base.clock_source = user.clock_source;
    }
    if user.resolution.is_some() {
        base.resolution = user.resolution;
    }
}

fn merge_storage(base: &mut StorageConfig, user: StorageConfig) {
    if user.eeprom_path.is_some() {
        base.eeprom_path = user.eeprom_path;
    }
    if user.capacity.is_some() {
        base.capacity = user.capacity;
    }
}

fn parse_mode(s: &str) -> Option<TriggerMode> {
    TriggerMode::ALL
        .into_iter()
        .find(|m| m.name().eq_ignore_ascii_case(s) || format!("{:?}", m).eq_ignore_ascii_case(s))
}

fn parse_clock_mod(s: &str) -> Option<ClockMod> {
    let s = s.trim().to_ascii_lowercase().replace('÷', "/").replace('×', "x");
    ClockMod::ALL.into_iter().find(|m| m.name() == s)
}

fn parse_clock_source(s: &str) -> Option<ClockSource> {
    match s.to_ascii_lowercase().as_str() {
        "internal" | "int" => Some(ClockSource::Internal),
        "external" | "ext" => Some(ClockSource::External),
        _ => None,
    }
}

fn parse_resolution(ppqn: u8) -> Option<ClockResolution> {
    ClockResolution::ALL
        .into_iter()
        .find(|r| r.ppqn() == ppqn as u32)
}
