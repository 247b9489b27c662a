//! Reusable N-party rendezvous barrier.
//!
//! Every worker calls [`Rendezvous::reach`] after its setup phase so the timed
//! phase starts for all of them at effectively the same instant.
//!
//! There is no timeout. If fewer than `parties` callers ever arrive, the ones
//! that did arrive block forever. A party that knows it will never reach the
//! barrier (a worker whose setup failed) must call [`Rendezvous::abandon`]
//! instead so its peers are still released.

use parking_lot::{Condvar, Mutex};

/// A synchronization point shared by a fixed number of parties.
///
/// Workers depend on this trait rather than on [`Barrier`] so they can be
/// driven by a fake in unit tests without spawning threads.
pub trait Rendezvous: Sync {
    /// Block until all parties of the current cycle have arrived.
    ///
    /// Returns `true` for exactly one caller per cycle: the one whose arrival
    /// released the others.
    fn reach(&self) -> bool;

    /// Count as arrived for the current cycle without waiting.
    fn abandon(&self);
}

#[derive(Debug)]
struct State {
    remaining: usize,
    // Bumped on every release. Waiters compare against the value they saw on
    // arrival, so a caller of the next cycle can never be confused with one
    // still draining out of the previous cycle.
    generation: u64,
}

/// Counting barrier with a generation guard.
#[derive(Debug)]
pub struct Barrier {
    parties: usize,
    state: Mutex<State>,
    released: Condvar,
}

impl Barrier {
    /// Create a barrier for `parties` callers. Zero is treated as one.
    pub fn new(parties: usize) -> Self {
        let parties = parties.max(1);
        Self {
            parties,
            state: Mutex::new(State {
                remaining: parties,
                generation: 0,
            }),
            released: Condvar::new(),
        }
    }

    pub fn parties(&self) -> usize {
        self.parties
    }

    /// Number of completed rendezvous cycles.
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Parties still expected in the current cycle.
    pub fn remaining(&self) -> usize {
        self.state.lock().remaining
    }

    // Caller holds the lock. Returns true if this arrival completed the cycle.
    fn arrive(&self, state: &mut State) -> bool {
        state.remaining -= 1;
        if state.remaining > 0 {
            return false;
        }
        state.remaining = self.parties;
        state.generation = state.generation.wrapping_add(1);
        self.released.notify_all();
        true
    }
}

impl Rendezvous for Barrier {
    fn reach(&self) -> bool {
        let mut state = self.state.lock();
        let generation = state.generation;
        if self.arrive(&mut state) {
            return true;
        }
        // Spurious wakeups loop back here; only a generation change releases.
        while state.generation == generation {
            self.released.wait(&mut state);
        }
        false
    }

    fn abandon(&self) {
        let mut state = self.state.lock();
        self.arrive(&mut state);
    }
}
