mod console;

use std::fs::File;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use rytm_core::config::Config;
use rytm_core::dispatch::dispatch;
use rytm_core::engine::{Engine, EngineSettings};
use rytm_core::io::LatchedOutput;
use rytm_core::persistence::{FileEeprom, NvStorage, PersistentStateStore};
use rytm_core::seed::EntropySource;
use rytm_types::{ClockSource, CHANNEL_COUNT};

use console::ConsoleInput;

fn init_logging(verbose: bool) {
    use simplelog::*;

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };

    let log_path = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rytm")
        .join("rytm-sim.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = match File::create(&log_path)
        .or_else(|_| File::create(std::env::temp_dir().join("rytm-sim.log")))
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("logging disabled: {}", e);
            return;
        }
    };

    if let Err(e) = WriteLogger::init(log_level, simplelog::Config::default(), log_file) {
        eprintln!("logging disabled: {}", e);
        return;
    }

    log::info!("rytm-sim starting (log level: {:?})", log_level);
}

/// Square wave standing in for a patched clock cable.
struct ExternalPulse {
    period_us: u64,
    width_us: u64,
}

impl ExternalPulse {
    fn new(bpm: u32, ppqn: u32) -> Option<Self> {
        let period_us = 60_000_000u64.checked_div(bpm as u64 * ppqn as u64)?;
        (period_us > 0).then(|| Self {
            period_us,
            width_us: (period_us / 2).min(5_000),
        })
    }

    fn level(&self, now_us: u64) -> bool {
        now_us % self.period_us < self.width_us
    }
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn render_levels(levels: [bool; CHANNEL_COUNT]) -> String {
    levels
        .iter()
        .map(|&high| if high { '#' } else { '.' })
        .collect()
}

fn show<O, E, S>(engine: &Engine<O, E>, store: &PersistentStateStore<S>)
where
    O: rytm_core::io::DigitalOutput,
    E: EntropySource,
    S: NvStorage,
{
    let clock = engine.clock();
    match clock.source() {
        ClockSource::Internal => println!("clock: internal {} bpm", clock.tempo()),
        ClockSource::External => match clock.external_bpm() {
            Some(bpm) => println!("clock: external {} bpm @ {} ppqn", bpm, clock.resolution().ppqn()),
            None => println!("clock: external (waiting) @ {} ppqn", clock.resolution().ppqn()),
        },
    }
    println!(
        "mode: {}  selected: {}  storage: {} bytes",
        engine.output_mode().name(),
        engine.selected_channel() + 1,
        store.storage().capacity()
    );
    let stutter = engine.stutter_state(engine.selected_channel());
    println!(
        "stutter: {} pulses, {} per source pulse ({} us half-period)",
        stutter.repeats(),
        stutter.factor(),
        stutter.duty_us()
    );
    for ch in 0..CHANNEL_COUNT {
        println!("  {}", engine.describe(ch));
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
    init_logging(verbose);

    let seconds: u64 = arg_value(&args, "--seconds")
        .and_then(|s| s.parse().ok())
        .unwrap_or(8);
    let external_bpm: Option<u32> = arg_value(&args, "--external").and_then(|s| s.parse().ok());

    let config = Config::load();
    let eeprom_path = arg_value(&args, "--eeprom")
        .map(PathBuf::from)
        .unwrap_or_else(|| config.eeprom_path());
    let eeprom = FileEeprom::open(&eeprom_path, config.eeprom_capacity())?;
    let mut store = PersistentStateStore::new(eeprom, config.defaults());

    let boot = store.load()?;
    if boot.first_boot {
        println!("first boot: wrote defaults to {}", eeprom_path.display());
    }

    let mut engine = Engine::new(
        &boot.state,
        [LatchedOutput::new(); CHANNEL_COUNT],
        EngineSettings::from(&config),
    );
    if external_bpm.is_some() {
        engine.clock_mut().set_source(ClockSource::External);
    }
    engine.clock_mut().start_timer();
    show(&engine, &store);

    let lines = console::spawn_reader();
    let start = Instant::now();
    let stop_at = start + Duration::from_secs(seconds);
    let mut last_levels = engine.levels();

    'run: while Instant::now() < stop_at {
        engine.clock().wait(Duration::from_millis(1));
        let now_us = start.elapsed().as_micros() as u64;

        if let Some(pulse) = external_bpm
            .and_then(|bpm| ExternalPulse::new(bpm, engine.clock().resolution().ppqn()))
        {
            engine.on_clock_input(pulse.level(now_us), now_us);
        }
        engine.poll(now_us);

        while let Ok(line) = lines.try_recv() {
            match console::parse(&line) {
                Some(ConsoleInput::Quit) => break 'run,
                Some(ConsoleInput::Show) => show(&engine, &store),
                Some(ConsoleInput::Command(cmd)) => match dispatch(&cmd, &mut engine, &mut store) {
                    Ok(result) if result.first_boot => println!("no valid snapshot, defaults restored"),
                    Ok(_) => {}
                    Err(e) => {
                        log::error!(target: "sim", "{:?} failed: {}", cmd, e);
                        eprintln!("{:?} failed: {}", cmd, e);
                    }
                },
                None => eprintln!("unrecognized: {}", line.trim()),
            }
        }

        let levels = engine.levels();
        if levels != last_levels {
            println!("{:>9.3} {}", now_us as f64 / 1e6, render_levels(levels));
            last_levels = levels;
        }
    }

    engine.clock_mut().stop_timer();
    log::info!("rytm-sim stopped");
    Ok(())
}
