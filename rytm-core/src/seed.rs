//! Seed history for replayable randomness.
//!
//! Every probability roll on a channel is drawn from an RNG that was reseeded
//! from one 16-bit seed held in a small ring. Walking the read cursor back and
//! forth replays old decisions bit for bit; stepping past the newest seed (the
//! frontier) mints a fresh, unpredictable one and commits it to the ring.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Capacity of the seed ring.
pub const SEED_BUFFER_LEN: usize = 8;

/// Source of unpredictable values used when minting at the frontier.
pub trait EntropySource {
    fn entropy(&mut self) -> u64;
}

/// Wall-clock microseconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct WallClock;

impl EntropySource for WallClock {
    fn entropy(&mut self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct SeedSequencer<E: EntropySource = WallClock> {
    buffer: [u16; SEED_BUFFER_LEN],
    read_index: usize,
    /// Slot the next minted seed is written to.
    write_index: usize,
    length: usize,
    rng: StdRng,
    entropy: E,
    stream: u64,
}

impl<E: EntropySource> SeedSequencer<E> {
    /// Create a sequencer holding one freshly minted seed.
    ///
    /// `stream` decorrelates sequencers created from the same entropy reading.
    pub fn new(mut entropy: E, stream: u64) -> Self {
        let rng = StdRng::seed_from_u64(mix(entropy.entropy(), stream));
        let mut seq = Self {
            buffer: [0; SEED_BUFFER_LEN],
            read_index: 0,
            write_index: 0,
            length: 0,
            rng,
            entropy,
            stream,
        };
        seq.new_random_seed();
        seq
    }

    /// Draw a seed from the current source, commit it at the write slot and
    /// reseed from it. The read cursor moves onto the new seed.
    pub fn new_random_seed(&mut self) {
        let seed: u16 = self.rng.gen();
        self.buffer[self.write_index] = seed;
        self.read_index = self.write_index;
        self.write_index = (self.write_index + 1) % SEED_BUFFER_LEN;
        if self.length < SEED_BUFFER_LEN {
            self.length += 1;
        }
        self.reseed();
    }

    /// Step forward through history, minting a new seed at the frontier.
    pub fn next_seed(&mut self) {
        if self.read_index == self.newest_index() {
            let fresh = mix(self.entropy.entropy(), self.stream);
            self.rng = StdRng::seed_from_u64(fresh);
            self.new_random_seed();
        } else {
            self.read_index = (self.read_index + 1) % SEED_BUFFER_LEN;
        }
    }

    /// Step back through history. Returns false at the oldest retained seed.
    pub fn prev_seed(&mut self) -> bool {
        if self.read_index == self.oldest_index() {
            return false;
        }
        self.read_index = (self.read_index + SEED_BUFFER_LEN - 1) % SEED_BUFFER_LEN;
        true
    }

    pub fn seed(&self) -> u16 {
        self.buffer[self.read_index]
    }

    /// Reseed the RNG from the seed under the cursor.
    pub fn reseed(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed() as u64);
    }

    /// RNG for rolls bound to the current history position.
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub fn read_index(&self) -> usize {
        self.read_index
    }

    pub fn write_index(&self) -> usize {
        self.write_index
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Whether the cursor sits on the most recently minted seed.
    pub fn at_frontier(&self) -> bool {
        self.read_index == self.newest_index()
    }

    fn newest_index(&self) -> usize {
        (self.write_index + SEED_BUFFER_LEN - 1) % SEED_BUFFER_LEN
    }

    fn oldest_index(&self) -> usize {
        (self.write_index + SEED_BUFFER_LEN - self.length) % SEED_BUFFER_LEN
    }
}

fn mix(entropy: u64, stream: u64) -> u64 {
    entropy ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15)
}
