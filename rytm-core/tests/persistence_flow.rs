mod common;

use rytm_core::dispatch::dispatch;
use rytm_core::persistence::{FileEeprom, PersistentStateStore, SAVE_SLOT_COUNT};
use rytm_types::{Command, DeviceState, PatternParam, TriggerMode, DEFAULT_PATTERN};

use common::make_engine;

fn open(path: &std::path::Path) -> PersistentStateStore<FileEeprom> {
    let eeprom = FileEeprom::open(path, 1024).unwrap();
    PersistentStateStore::new(eeprom, DeviceState::default())
}

#[test]
fn edits_survive_power_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("eeprom.bin");

    let edited = {
        let mut store = open(&path);
        let boot = store.load().unwrap();
        assert!(boot.first_boot);
        let mut engine = make_engine(&boot.state);

        for cmd in [
            Command::ChangePattern { channel: 2, param: PatternParam::Steps, delta: -1 },
            Command::ChangePattern { channel: 2, param: PatternParam::Offset, delta: 1 },
            Command::SetMode { channel: 4, mode: TriggerMode::Gate },
            Command::SetProbability { channel: 4, fraction: 0.25 },
            Command::ChangeTempo(-10),
            Command::SelectChannel(3),
            Command::SaveChanges,
        ] {
            dispatch(&cmd, &mut engine, &mut store).unwrap();
        }
        engine.device_state()
    };

    let mut store = open(&path);
    let boot = store.load().unwrap();
    assert!(!boot.first_boot);
    assert_eq!(boot.state, edited);
    assert_eq!(boot.state.patterns[2].steps, 15);
    assert_eq!(boot.state.channels[4].probability, 25);
    assert_eq!(boot.state.tempo, 120);
    assert_eq!(boot.state.selected_channel, 3);
}

#[test]
fn unsaved_edits_are_lost() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("eeprom.bin");
    {
        let mut store = open(&path);
        let state = store.load().unwrap().state;
        let mut engine = make_engine(&state);
        let cmd = Command::ChangePattern { channel: 0, param: PatternParam::Hits, delta: 1 };
        dispatch(&cmd, &mut engine, &mut store).unwrap();
    }
    let mut store = open(&path);
    assert_eq!(store.load().unwrap().state.patterns[0], DEFAULT_PATTERN);
}

#[test]
fn first_boot_seeds_every_preset() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open(&dir.path().join("eeprom.bin"));
    store.load().unwrap();
    let mut engine = make_engine(&DeviceState::default());
    let cmd = Command::ChangePattern { channel: 1, param: PatternParam::Hits, delta: -2 };
    dispatch(&cmd, &mut engine, &mut store).unwrap();

    for bank in 0..SAVE_SLOT_COUNT {
        dispatch(&Command::LoadPreset(bank), &mut engine, &mut store).unwrap();
        assert_eq!(engine.patterns(), [DEFAULT_PATTERN; 6]);
    }
}
