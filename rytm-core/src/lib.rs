//! # rytm-core
//!
//! Behavior of a six-channel Euclidean trigger module: pattern generation,
//! clocking, replayable probability rolls, output decisions and versioned
//! non-volatile state. Independent of any board, display or input decoding.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rytm_core::config::Config;
//! use rytm_core::dispatch::dispatch;
//! use rytm_core::engine::{Engine, EngineSettings};
//! use rytm_core::io::LatchedOutput;
//! use rytm_core::persistence::{FileEeprom, PersistentStateStore};
//!
//! // 1. Defaults and timing from config
//! let config = Config::load();
//! let eeprom = FileEeprom::open(config.eeprom_path(), config.eeprom_capacity())?;
//! let mut store = PersistentStateStore::new(eeprom, config.defaults());
//!
//! // 2. Restore (or seed) the snapshot and build the engine
//! let state = store.load()?.state;
//! let mut engine = Engine::new(&state, [LatchedOutput::new(); 6], EngineSettings::from(&config));
//! engine.clock_mut().start_timer();
//!
//! // 3. Every loop pass: sample the clock jack, poll, dispatch user commands
//! engine.on_clock_input(clock_level, now_us);
//! engine.poll(now_us);
//! dispatch(&command, &mut engine, &mut store)?;
//! ```
//!
//! ## Module Overview
//!
//! - [`pattern`] — `PatternGenerator`, Euclidean classification and step cursor
//! - [`clock`] — `ClockEngine`, internal timer thread and external sync
//! - [`seed`] — `SeedSequencer`, the rewindable seed ring
//! - [`trigger`] — `ChannelTrigger`, probability roll and Trigger/Gate/Flip modes
//! - [`persistence`] — storage backends, snapshot layout, `PersistentStateStore`
//! - [`engine`] — `Engine`, owner of all per-channel arrays
//! - [`dispatch`] — `dispatch()`, the single entry point for commands
//! - [`config`] — TOML configuration (embedded defaults + user override)

pub mod clock;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod io;
pub mod pattern;
pub mod persistence;
pub mod seed;
pub mod trigger;

pub use error::StoreError;
