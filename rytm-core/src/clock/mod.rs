//! Tempo and channel clocking.
//!
//! Internal source: a timer thread produces base ticks at 24 PPQN and each
//! channel pulses every `ClockMod::ticks()` base ticks. Every channel counts
//! whole base ticks from the same reset, so divisions stay phase-locked no
//! matter how long the clock runs. A new modifier is adopted at the channel's
//! next pulse boundary, never in the middle of a pulse.
//!
//! External source: each rising edge on the clock input measures the input
//! period. When the derived tempo changes (or a modifier changed) every
//! channel's square wave is retuned, and `tick` toggles them cooperatively.
//!
//! [`Stutter`] reuses the same deadline polling for on-demand ratchet bursts.

mod stutter;
mod synced;
mod timer;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use rytm_types::{
    ClockFactor, ClockMod, ClockResolution, ClockSource, BASE_PPQN, CHANNEL_COUNT, MAX_TEMPO,
    MIN_TEMPO,
};

use crate::io::InputEdge;

pub use stutter::Stutter;
pub use synced::SyncedDivider;
pub use timer::{ClockEvent, ClockShared, InternalTimer};

const MICROS_PER_MINUTE: u64 = 60_000_000;

/// Per-channel edges produced by one clock step.
pub type ChannelEdges = [InputEdge; CHANNEL_COUNT];

const NO_EDGES: ChannelEdges = [InputEdge::Unchanged; CHANNEL_COUNT];

/// Base tick period for `tempo`, minus processing latency.
///
/// `None` when the result would not be a positive period.
pub fn internal_period_us(tempo: u8, latency_us: u32) -> Option<u32> {
    if tempo == 0 {
        return None;
    }
    let raw = MICROS_PER_MINUTE / (tempo as u64 * BASE_PPQN as u64);
    raw.checked_sub(latency_us as u64)
        .filter(|&p| p > 0)
        .map(|p| p as u32)
}

/// Half-period of a channel square wave for one quarter note of `beat_us`.
pub fn duty_us(beat_us: u64, modifier: ClockMod) -> u64 {
    match modifier.factor() {
        ClockFactor::Divide(n) => beat_us * n as u64 / 2,
        ClockFactor::Multiply(n) => beat_us / n as u64 / 2,
    }
}

pub struct ClockEngine {
    source: ClockSource,
    resolution: ClockResolution,
    tempo: u8,
    latency_us: u32,
    /// Selected modifiers, as persisted.
    mods: [ClockMod; CHANNEL_COUNT],
    /// Modifiers the internal clock is currently counting.
    active: [ClockMod; CHANNEL_COUNT],
    /// Base ticks into each channel's current pulse.
    phase: [u32; CHANNEL_COUNT],

    shared: Arc<ClockShared>,
    wake_tx: Sender<ClockEvent>,
    wake_rx: Receiver<ClockEvent>,
    timer: Option<InternalTimer>,
    timer_wanted: bool,
    /// Counter value already consumed by `take_internal_ticks`.
    seen_ticks: u32,
    /// Base ticks played since the last reset.
    position: u64,

    synced: [SyncedDivider; CHANNEL_COUNT],
    last_edge_us: Option<u64>,
    external_bpm: Option<u32>,
    /// Modifiers changed since the last retune.
    retune_pending: bool,
}

impl ClockEngine {
    pub fn new(
        source: ClockSource,
        resolution: ClockResolution,
        tempo: u8,
        mods: [ClockMod; CHANNEL_COUNT],
        latency_us: u32,
    ) -> Self {
        let tempo = tempo.clamp(MIN_TEMPO, MAX_TEMPO);
        let period = internal_period_us(tempo, latency_us).unwrap_or(0);
        let (wake_tx, wake_rx) = timer::wake_channel();
        Self {
            source,
            resolution,
            tempo,
            latency_us,
            mods,
            active: mods,
            phase: [0; CHANNEL_COUNT],
            shared: Arc::new(ClockShared::new(period)),
            wake_tx,
            wake_rx,
            timer: None,
            timer_wanted: false,
            seen_ticks: 0,
            position: 0,
            synced: [SyncedDivider::default(); CHANNEL_COUNT],
            last_edge_us: None,
            external_bpm: None,
            retune_pending: false,
        }
    }

    pub fn source(&self) -> ClockSource {
        self.source
    }

    pub fn set_source(&mut self, source: ClockSource) {
        if source == self.source {
            return;
        }
        log::debug!(target: "clock", "source {:?} -> {:?}", self.source, source);
        self.source = source;
        match source {
            ClockSource::Internal => {
                self.synced.iter_mut().for_each(SyncedDivider::stop);
                if self.timer_wanted {
                    self.spawn_timer();
                }
            }
            ClockSource::External => {
                self.timer = None;
                self.last_edge_us = None;
                self.external_bpm = None;
            }
        }
    }

    pub fn resolution(&self) -> ClockResolution {
        self.resolution
    }

    pub fn set_resolution(&mut self, resolution: ClockResolution) {
        self.resolution = resolution;
        self.external_bpm = None;
        self.retune_pending = true;
    }

    pub fn tempo(&self) -> u8 {
        self.tempo
    }

    /// Tempo derived from the external clock, once one has been measured.
    pub fn external_bpm(&self) -> Option<u32> {
        self.external_bpm
    }

    pub fn set_tempo(&mut self, tempo: u8) {
        self.tempo = tempo.clamp(MIN_TEMPO, MAX_TEMPO);
        match internal_period_us(self.tempo, self.latency_us) {
            Some(period) => self.shared.period_us.store(period, Ordering::Relaxed),
            None => {
                log::warn!(target: "clock", "tempo {} gives no usable period, keeping last", self.tempo)
            }
        }
    }

    pub fn change_tempo(&mut self, delta: i16) {
        let tempo = (self.tempo as i16 + delta).clamp(MIN_TEMPO as i16, MAX_TEMPO as i16);
        self.set_tempo(tempo as u8);
    }

    /// Current base tick period in microseconds.
    pub fn period_us(&self) -> u32 {
        self.shared.period_us.load(Ordering::Relaxed)
    }

    pub fn clock_mod(&self, channel: usize) -> ClockMod {
        self.mods[channel]
    }

    pub fn clock_mods(&self) -> [ClockMod; CHANNEL_COUNT] {
        self.mods
    }

    /// Takes effect on the channel's next pulse (internal) or the next retune
    /// (external). A pulse already high still falls on its old schedule.
    pub fn set_clock_mod(&mut self, channel: usize, modifier: ClockMod) {
        self.mods[channel] = modifier;
        self.retune_pending = true;
    }

    pub fn change_clock_mod(&mut self, channel: usize, delta: i8) {
        let modifier = self.mods[channel].cycle(delta);
        self.set_clock_mod(channel, modifier);
    }

    /// Run the internal timer thread whenever the source is internal.
    pub fn start_timer(&mut self) {
        self.timer_wanted = true;
        if self.source.is_internal() && self.timer.is_none() {
            self.spawn_timer();
        }
    }

    pub fn stop_timer(&mut self) {
        self.timer_wanted = false;
        self.timer = None;
    }

    pub fn timer_running(&self) -> bool {
        self.timer.as_ref().is_some_and(InternalTimer::is_running)
    }

    fn spawn_timer(&mut self) {
        self.seen_ticks = self.shared.ticks.load(Ordering::Acquire);
        match InternalTimer::spawn(Arc::clone(&self.shared), self.wake_tx.clone()) {
            Ok(timer) => self.timer = Some(timer),
            Err(e) => log::warn!(target: "clock", "could not start internal timer: {}", e),
        }
    }

    /// Block until the timer posts a tick or `timeout` passes.
    pub fn wait(&self, timeout: Duration) -> bool {
        self.wake_rx.recv_timeout(timeout).is_ok()
    }

    /// Base ticks the timer produced since the last call.
    pub fn take_internal_ticks(&mut self) -> u32 {
        let now = self.shared.ticks.load(Ordering::Acquire);
        let elapsed = now.wrapping_sub(self.seen_ticks);
        self.seen_ticks = now;
        elapsed
    }

    /// Play one base tick and report each channel's edge.
    pub fn advance_internal(&mut self) -> ChannelEdges {
        self.position += 1;
        let mut edges = NO_EDGES;
        for ch in 0..CHANNEL_COUNT {
            if self.phase[ch] == 0 {
                self.active[ch] = self.mods[ch];
            }
            let ticks = self.active[ch].ticks();
            let phase = self.phase[ch];
            edges[ch] = if phase == 0 {
                InputEdge::Rising
            } else if phase == ticks / 2 {
                InputEdge::Falling
            } else {
                InputEdge::Unchanged
            };
            self.phase[ch] = (phase + 1) % ticks;
        }
        edges
    }

    /// Modifier the internal clock is counting for `channel` right now.
    pub fn active_clock_mod(&self, channel: usize) -> ClockMod {
        self.active[channel]
    }

    /// Base ticks played since the last reset.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Measure an edge on the external clock input.
    ///
    /// The measured pulse period is scaled to a quarter note (`period × ppqn`)
    /// before the modifier is applied, so ×n and ÷n mean the same musical
    /// ratio here as they do on the internal clock.
    pub fn on_external_edge(&mut self, edge: InputEdge, now_us: u64) {
        if edge != InputEdge::Rising {
            return;
        }
        let last = self.last_edge_us.replace(now_us);
        let Some(period) = last.and_then(|last| now_us.checked_sub(last)).filter(|&p| p > 0) else {
            return;
        };

        let ppqn = self.resolution.ppqn() as u64;
        let bpm = MICROS_PER_MINUTE / (period * ppqn);
        if bpm == 0 {
            return;
        }
        let bpm = bpm as u32;
        if self.external_bpm == Some(bpm) && !self.retune_pending {
            return;
        }

        log::debug!(target: "clock", "external clock {} bpm (period {} us)", bpm, period);
        self.external_bpm = Some(bpm);
        self.retune_pending = false;
        let beat = period * ppqn;
        for (divider, modifier) in self.synced.iter_mut().zip(self.mods.iter()) {
            divider.retune(duty_us(beat, *modifier), now_us);
        }
    }

    /// Toggle every synced channel whose deadline has passed.
    pub fn tick(&mut self, now_us: u64) -> ChannelEdges {
        if self.source.is_internal() {
            return NO_EDGES;
        }
        let mut edges = NO_EDGES;
        for (edge, divider) in edges.iter_mut().zip(self.synced.iter_mut()) {
            *edge = divider.tick(now_us);
        }
        edges
    }

    pub fn synced(&self, channel: usize) -> &SyncedDivider {
        &self.synced[channel]
    }

    /// Restart every channel phase from the downbeat.
    pub fn reset(&mut self) {
        self.position = 0;
        self.phase = [0; CHANNEL_COUNT];
        self.active = self.mods;
        self.seen_ticks = self.shared.ticks.load(Ordering::Acquire);
        while self.wake_rx.try_recv().is_ok() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(source: ClockSource) -> ClockEngine {
        ClockEngine::new(
            source,
            ClockResolution::Ppqn24,
            120,
            [ClockMod::Mult1; CHANNEL_COUNT],
            50,
        )
    }

    #[test]
    fn internal_period_applies_latency() {
        assert_eq!(internal_period_us(120, 0), Some(20_833));
        assert_eq!(internal_period_us(120, 50), Some(20_783));
        assert_eq!(internal_period_us(0, 0), None);
        assert_eq!(internal_period_us(240, 20_000), None);
    }

    #[test]
    fn tempo_clamps_and_updates_period() {
        let mut clock = engine(ClockSource::Internal);
        clock.set_tempo(10);
        assert_eq!(clock.tempo(), MIN_TEMPO);
        clock.change_tempo(1000);
        assert_eq!(clock.tempo(), MAX_TEMPO);
        assert_eq!(clock.period_us(), internal_period_us(MAX_TEMPO, 50).unwrap());
    }

    #[test]
    fn divisions_stay_phase_locked() {
        let mut clock = engine(ClockSource::Internal);
        clock.set_clock_mod(0, ClockMod::Mult8);
        clock.set_clock_mod(1, ClockMod::Div6);
        clock.set_clock_mod(2, ClockMod::Div128);

        let mut rising = [0usize; CHANNEL_COUNT];
        let ticks = 3072 * 3;
        for _ in 0..ticks {
            for (count, edge) in rising.iter_mut().zip(clock.advance_internal()) {
                if edge == InputEdge::Rising {
                    *count += 1;
                }
            }
        }
        assert_eq!(rising[0], ticks / 3);
        assert_eq!(rising[1], ticks / 144);
        assert_eq!(rising[2], 3);
        assert_eq!(rising[3], ticks / 24);
    }

    #[test]
    fn falling_edge_at_half_period() {
        let mut clock = engine(ClockSource::Internal);
        let edges: Vec<_> = (0..24).map(|_| clock.advance_internal()[0]).collect();
        assert_eq!(edges[0], InputEdge::Rising);
        assert_eq!(edges[12], InputEdge::Falling);
        assert_eq!(
            edges.iter().filter(|&&e| e != InputEdge::Unchanged).count(),
            2
        );
    }

    #[test]
    fn modifier_change_waits_for_next_pulse() {
        let mut clock = engine(ClockSource::Internal);
        clock.set_clock_mod(0, ClockMod::Div2);
        assert_eq!(clock.advance_internal()[0], InputEdge::Rising);

        // Mid-pulse switch to a much slower rate.
        clock.set_clock_mod(0, ClockMod::Div128);
        assert_eq!(clock.active_clock_mod(0), ClockMod::Div2);

        let mut edges = Vec::new();
        for tick in 1..3000u32 {
            let edge = clock.advance_internal()[0];
            if edge != InputEdge::Unchanged {
                edges.push((tick, edge));
            }
        }
        let slow = ClockMod::Div128.ticks();
        assert_eq!(
            &edges[..3],
            &[
                (24, InputEdge::Falling),
                (48, InputEdge::Rising),
                (48 + slow / 2, InputEdge::Falling),
            ]
        );
        assert_eq!(clock.active_clock_mod(0), ClockMod::Div128);
    }

    #[test]
    fn reset_adopts_pending_modifier() {
        let mut clock = engine(ClockSource::Internal);
        for _ in 0..5 {
            clock.advance_internal();
        }
        clock.set_clock_mod(1, ClockMod::Mult8);
        clock.reset();
        assert_eq!(clock.active_clock_mod(1), ClockMod::Mult8);
        let edges: Vec<_> = (0..3).map(|_| clock.advance_internal()[1]).collect();
        assert_eq!(edges, [InputEdge::Rising, InputEdge::Falling, InputEdge::Unchanged]);
    }

    #[test]
    fn external_edges_derive_bpm_and_duty() {
        let mut clock = engine(ClockSource::External);
        clock.set_resolution(ClockResolution::Ppqn4);
        clock.set_clock_mod(1, ClockMod::Div2);
        clock.set_clock_mod(2, ClockMod::Mult2);

        clock.on_external_edge(InputEdge::Rising, 1_000_000);
        assert_eq!(clock.external_bpm(), None);

        // 125 ms per pulse at 4 PPQN = 120 bpm.
        clock.on_external_edge(InputEdge::Rising, 1_125_000);
        assert_eq!(clock.external_bpm(), Some(120));
        assert_eq!(clock.synced(0).duty_us(), 250_000);
        assert_eq!(clock.synced(1).duty_us(), 500_000);
        assert_eq!(clock.synced(2).duty_us(), 125_000);
        assert_eq!(clock.synced(0).deadline_us(), 1_375_000);
    }

    #[test]
    fn zero_period_is_ignored() {
        let mut clock = engine(ClockSource::External);
        clock.on_external_edge(InputEdge::Rising, 500);
        clock.on_external_edge(InputEdge::Rising, 500);
        assert_eq!(clock.external_bpm(), None);
        assert_eq!(clock.synced(0).duty_us(), 0);
        assert_eq!(clock.tick(10_000_000), NO_EDGES);
    }

    #[test]
    fn unchanged_bpm_keeps_schedule() {
        let mut clock = engine(ClockSource::External);
        clock.on_external_edge(InputEdge::Rising, 0);
        clock.on_external_edge(InputEdge::Rising, 20_000);
        let deadline = clock.synced(0).deadline_us();
        clock.on_external_edge(InputEdge::Rising, 40_000);
        assert_eq!(clock.synced(0).deadline_us(), deadline);

        // A modifier change forces the next measurement to retune.
        clock.change_clock_mod(0, 1);
        clock.on_external_edge(InputEdge::Rising, 60_000);
        assert_eq!(clock.synced(0).duty_us(), 480_000);
        assert_eq!(clock.synced(0).deadline_us(), 540_000);
    }

    #[test]
    fn external_tick_toggles_channels() {
        let mut clock = engine(ClockSource::External);
        clock.on_external_edge(InputEdge::Rising, 0);
        clock.on_external_edge(InputEdge::Rising, 20_000);
        let beat = 20_000 * 24;
        let rise = 20_000 + beat / 2;
        assert_eq!(clock.tick(rise - 1)[0], InputEdge::Unchanged);
        assert_eq!(clock.tick(rise)[0], InputEdge::Rising);
        assert_eq!(clock.tick(rise + beat / 2)[0], InputEdge::Falling);
    }

    #[test]
    fn internal_source_never_toggles_synced() {
        let mut clock = engine(ClockSource::Internal);
        clock.on_external_edge(InputEdge::Rising, 0);
        clock.on_external_edge(InputEdge::Rising, 20_000);
        assert_eq!(clock.tick(10_000_000), NO_EDGES);
    }

    #[test]
    fn timer_produces_ticks() {
        let mut clock = engine(ClockSource::Internal);
        clock.set_tempo(MAX_TEMPO);
        clock.start_timer();
        assert!(clock.timer_running());
        let mut woke = false;
        for _ in 0..50 {
            if clock.wait(Duration::from_millis(100)) {
                woke = true;
                break;
            }
        }
        assert!(woke);
        assert!(clock.take_internal_ticks() >= 1);

        clock.set_source(ClockSource::External);
        assert!(!clock.timer_running());
        clock.stop_timer();
    }
}
