//! Free-running base clock thread.
//!
//! The timer thread and the control loop share exactly three words:
//! a tick counter, the tick period and a running flag. Each is a single
//! atomic, so neither side ever observes a half-written schedule. The thread
//! also posts a wake-up on a bounded channel; wake-ups are hints only, the
//! loop always derives how many ticks elapsed from the counter.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError};

/// Wake-up queue depth. A full queue drops wake-ups, never ticks.
const WAKE_QUEUE_CAPACITY: usize = 64;

/// Longest single sleep, so a stop request is noticed promptly.
const MAX_SLEEP: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    /// Counter value after the tick.
    Tick(u32),
}

/// Fields shared between the timer thread and the control loop.
#[derive(Debug, Default)]
pub struct ClockShared {
    pub ticks: AtomicU32,
    /// Base tick period in microseconds. Zero stalls the timer.
    pub period_us: AtomicU32,
    pub running: AtomicBool,
}

impl ClockShared {
    pub fn new(period_us: u32) -> Self {
        Self {
            ticks: AtomicU32::new(0),
            period_us: AtomicU32::new(period_us),
            running: AtomicBool::new(false),
        }
    }
}

pub fn wake_channel() -> (Sender<ClockEvent>, Receiver<ClockEvent>) {
    crossbeam_channel::bounded(WAKE_QUEUE_CAPACITY)
}

/// Handle to a running timer thread. Dropping it stops and joins the thread.
pub struct InternalTimer {
    shared: Arc<ClockShared>,
    handle: Option<JoinHandle<()>>,
}

impl InternalTimer {
    pub fn spawn(shared: Arc<ClockShared>, wake: Sender<ClockEvent>) -> std::io::Result<Self> {
        shared.running.store(true, Ordering::Release);
        let thread_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("rytm-clock".into())
            .spawn(move || timer_loop(thread_shared, wake));
        match handle {
            Ok(handle) => {
                log::debug!(target: "clock::timer", "internal timer started");
                Ok(Self {
                    shared,
                    handle: Some(handle),
                })
            }
            Err(e) => {
                shared.running.store(false, Ordering::Release);
                Err(e)
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }
}

impl Drop for InternalTimer {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        log::debug!(target: "clock::timer", "internal timer stopped");
    }
}

fn timer_loop(shared: Arc<ClockShared>, wake: Sender<ClockEvent>) {
    let mut next = Instant::now();
    let mut stalled = true;
    while shared.running.load(Ordering::Acquire) {
        let period = shared.period_us.load(Ordering::Relaxed);
        if period == 0 {
            stalled = true;
            thread::sleep(MAX_SLEEP);
            continue;
        }
        let period = Duration::from_micros(period as u64);
        let now = Instant::now();
        if stalled {
            next = now + period;
            stalled = false;
        }
        if now < next {
            thread::sleep((next - now).min(MAX_SLEEP));
            continue;
        }

        let n = shared.ticks.fetch_add(1, Ordering::AcqRel).wrapping_add(1);
        match wake.try_send(ClockEvent::Tick(n)) {
            Ok(()) | Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Disconnected(_)) => break,
        }

        next += period;
        // Too far behind to catch up: restart the schedule from now.
        if now.saturating_duration_since(next) > MAX_SLEEP * 5 {
            next = now + period;
        }
    }
}
