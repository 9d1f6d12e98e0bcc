//! Line-oriented command console on stdin.
//!
//! ```text
//! steps|hits|offset|padding <ch> <+|->    prob <ch> <delta>|=<fraction>
//! mode <ch> trig|gate|flip                outmode <delta>
//! mod <ch> <delta>    tempo <delta>       clock int|ext    res <delta>
//! select <delta>      seed <ch> prev|next stutter <ch>    reset
//! save | load | preset save|load <bank> | show | quit
//! ```
//!
//! Channels are numbered from 1 as printed on the panel.

use std::io::BufRead;
use std::thread;

use crossbeam_channel::{Receiver, Sender};

use rytm_types::{ClockSource, Command, PatternParam, TriggerMode};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConsoleInput {
    Command(Command),
    Show,
    Quit,
}

/// Read stdin lines on a helper thread. The receiver disconnects on EOF.
pub fn spawn_reader() -> Receiver<String> {
    let (tx, rx) = crossbeam_channel::bounded::<String>(16);
    let spawned = thread::Builder::new()
        .name("rytm-console".into())
        .spawn(move || read_lines(tx));
    if let Err(e) = spawned {
        log::warn!(target: "console", "console disabled: {}", e);
    }
    rx
}

fn read_lines(tx: Sender<String>) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        if tx.send(line).is_err() {
            break;
        }
    }
}

pub fn parse(line: &str) -> Option<ConsoleInput> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let cmd = match words.as_slice() {
        ["quit" | "q"] => return Some(ConsoleInput::Quit),
        ["show"] => return Some(ConsoleInput::Show),
        [param @ ("steps" | "hits" | "offset" | "padding"), ch, delta] => Command::ChangePattern {
            channel: channel(ch)?,
            param: match *param {
                "steps" => PatternParam::Steps,
                "hits" => PatternParam::Hits,
                "offset" => PatternParam::Offset,
                _ => PatternParam::Padding,
            },
            delta: sign(delta)?,
        },
        ["prob", ch, value] => match value.strip_prefix('=') {
            Some(fraction) => Command::SetProbability {
                channel: channel(ch)?,
                fraction: fraction.parse().ok()?,
            },
            None => Command::ChangeProbability {
                channel: channel(ch)?,
                delta: value.parse().ok()?,
            },
        },
        ["mode", ch, mode] => Command::SetMode {
            channel: channel(ch)?,
            mode: TriggerMode::ALL
                .into_iter()
                .find(|m| m.name().eq_ignore_ascii_case(mode))?,
        },
        ["outmode", delta] => Command::CycleOutputMode(delta.parse().ok()?),
        ["mod", ch, delta] => Command::ChangeClockMod {
            channel: channel(ch)?,
            delta: delta.parse().ok()?,
        },
        ["tempo", delta] => Command::ChangeTempo(delta.parse().ok()?),
        ["clock", "int"] => Command::SetClockSource(ClockSource::Internal),
        ["clock", "ext"] => Command::SetClockSource(ClockSource::External),
        ["res", delta] => Command::CycleResolution(delta.parse().ok()?),
        ["select", delta] => Command::SelectChannel(delta.parse().ok()?),
        ["seed", ch, "prev"] => Command::PrevSeed { channel: channel(ch)? },
        ["seed", ch, "next"] => Command::NextSeed { channel: channel(ch)? },
        ["stutter", ch] => Command::Stutter { channel: channel(ch)? },
        ["reset"] => Command::Reset,
        ["save"] => Command::SaveChanges,
        ["load"] => Command::LoadState,
        ["preset", "save", bank] => Command::SavePreset(bank.parse().ok()?),
        ["preset", "load", bank] => Command::LoadPreset(bank.parse().ok()?),
        _ => return None,
    };
    Some(ConsoleInput::Command(cmd))
}

fn channel(word: &str) -> Option<usize> {
    word.parse::<usize>().ok()?.checked_sub(1)
}

fn sign(word: &str) -> Option<i8> {
    match word {
        "+" | "+1" | "1" => Some(1),
        "-" | "-1" => Some(-1),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pattern_edits() {
        assert_eq!(
            parse("hits 2 +"),
            Some(ConsoleInput::Command(Command::ChangePattern {
                channel: 1,
                param: PatternParam::Hits,
                delta: 1,
            }))
        );
        assert_eq!(parse("steps 0 -"), None);
        assert_eq!(parse("offset 1 5"), None);
    }

    #[test]
    fn parses_probability_forms() {
        assert_eq!(
            parse("prob 1 =0.5"),
            Some(ConsoleInput::Command(Command::SetProbability {
                channel: 0,
                fraction: 0.5,
            }))
        );
        assert_eq!(
            parse("prob 6 -10"),
            Some(ConsoleInput::Command(Command::ChangeProbability {
                channel: 5,
                delta: -10,
            }))
        );
    }

    #[test]
    fn parses_storage_and_misc() {
        assert_eq!(
            parse("preset load 3"),
            Some(ConsoleInput::Command(Command::LoadPreset(3)))
        );
        assert_eq!(
            parse("mode 3 flip"),
            Some(ConsoleInput::Command(Command::SetMode {
                channel: 2,
                mode: TriggerMode::Flip,
            }))
        );
        assert_eq!(
            parse("stutter 4"),
            Some(ConsoleInput::Command(Command::Stutter { channel: 3 }))
        );
        assert_eq!(parse("  quit "), Some(ConsoleInput::Quit));
        assert_eq!(parse("dance"), None);
        assert_eq!(parse(""), None);
    }
}
