/*!
 * Keyed Park/Notify with Sharded Architecture
 *
 * Condition-variable-backed suspension keyed by an arbitrary value
 * (here: parent PIDs waiting on child exits).
 *
 * # Design: Generation Counter Per Slot
 *
 * A bare condvar loses a notification that lands between a caller's
 * condition check and its park. Each slot therefore carries an event
 * generation guarded by the slot mutex: `prepare` snapshots the
 * generation, the caller re-checks its condition, and `park` sleeps only
 * while the generation still matches the snapshot. A wake in the window
 * bumps the generation and the park returns without sleeping.
 *
 * Slots are a fixed sharded array rather than a per-key map:
 * - Zero allocations after initialization
 * - Stable memory addresses (required for condvar)
 * - O(1) lookup via simple hash modulo
 *
 * Trade-off: multiple keys may share a slot (spurious wakeups), so
 * callers must re-check their wait condition after every park.
 */

use crate::core::limits::PARK_SLOTS;
use parking_lot::{Condvar, Mutex};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

const SLOT_MASK: usize = PARK_SLOTS - 1;

/// Result of a wake operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeResult {
    /// Successfully woke N waiters (N >= 1)
    Woken(usize),
    /// No waiters were waiting
    NoWaiters,
}

impl WakeResult {
    /// Check if any waiters were woken
    #[inline(always)]
    pub fn is_woken(&self) -> bool {
        matches!(self, WakeResult::Woken(_))
    }

    /// Get number of woken waiters (0 if none)
    #[inline(always)]
    pub fn count(&self) -> usize {
        match self {
            WakeResult::Woken(n) => *n,
            WakeResult::NoWaiters => 0,
        }
    }
}

/// Snapshot of a slot's event generation, taken before checking the wait
/// condition. Parking with a stale token returns immediately.
#[derive(Debug, Clone, Copy)]
#[must_use = "a token only closes the wakeup race if it is parked on"]
pub struct WaitToken(u64);

/// A single park slot with its event generation
#[repr(C, align(64))] // Cache-line aligned to prevent false sharing
struct ParkSlot {
    generation: Mutex<u64>,
    condvar: Condvar,
    waiters: AtomicUsize,
}

impl ParkSlot {
    const fn new() -> Self {
        Self {
            generation: Mutex::new(0),
            condvar: Condvar::new(),
            waiters: AtomicUsize::new(0),
        }
    }
}

/// Keyed park/notify queue with fixed sharded slots
///
/// # Type Parameters
///
/// - `K`: Key type (e.g., Pid for per-parent exit events)
pub struct ParkQueue<K>
where
    K: Eq + Hash + Copy + Send + Sync + 'static,
{
    /// Fixed array of slots (never resizes, stable addresses)
    slots: Box<[ParkSlot; PARK_SLOTS]>,
    _phantom: PhantomData<K>,
}

impl<K> ParkQueue<K>
where
    K: Eq + Hash + Copy + Send + Sync + 'static,
{
    /// Create a new park queue
    pub fn new() -> Self {
        Self {
            slots: Box::new([const { ParkSlot::new() }; PARK_SLOTS]),
            _phantom: PhantomData,
        }
    }

    /// Hash key to slot index
    #[inline]
    fn slot(&self, key: K) -> &ParkSlot {
        let mut hasher = ahash::AHasher::default();
        key.hash(&mut hasher);
        &self.slots[(hasher.finish() as usize) & SLOT_MASK]
    }

    /// Snapshot the event generation for `key`
    ///
    /// Call before checking the wait condition; pass the token to `park`.
    #[inline]
    pub fn prepare(&self, key: K) -> WaitToken {
        WaitToken(*self.slot(key).generation.lock())
    }

    /// Park the calling thread until an event for `key` fires
    ///
    /// Returns immediately if the generation has moved past the token,
    /// so a wake between `prepare` and `park` is never lost. May also
    /// return on events for other keys sharing the slot; callers re-check
    /// their condition and park again.
    pub fn park(&self, key: K, token: WaitToken) {
        let slot = self.slot(key);
        slot.waiters.fetch_add(1, Ordering::Relaxed);

        let mut generation = slot.generation.lock();
        while *generation == token.0 {
            slot.condvar.wait(&mut generation);
        }
        drop(generation);

        slot.waiters.fetch_sub(1, Ordering::Relaxed);
    }

    /// Park with a timeout
    ///
    /// Returns `true` if an event fired, `false` if the timeout elapsed
    /// with the generation unchanged.
    pub fn park_timeout(&self, key: K, token: WaitToken, timeout: Duration) -> bool {
        let slot = self.slot(key);
        let deadline = Instant::now() + timeout;
        slot.waiters.fetch_add(1, Ordering::Relaxed);

        let mut generation = slot.generation.lock();
        let mut signaled = true;
        while *generation == token.0 {
            if slot.condvar.wait_until(&mut generation, deadline).timed_out() {
                signaled = *generation != token.0;
                break;
            }
        }
        drop(generation);

        slot.waiters.fetch_sub(1, Ordering::Relaxed);
        signaled
    }

    /// Fire an event for `key`, waking all waiters on its slot
    ///
    /// The generation is bumped under the slot mutex, so any waiter that
    /// has already snapshotted a token observes the event even if it has
    /// not parked yet.
    pub fn wake_all(&self, key: K) -> WakeResult {
        let slot = self.slot(key);
        {
            let mut generation = slot.generation.lock();
            *generation = generation.wrapping_add(1);
        }

        let count = slot.waiters.load(Ordering::Relaxed);
        if count == 0 {
            return WakeResult::NoWaiters;
        }
        slot.condvar.notify_all();
        WakeResult::Woken(count)
    }

    /// Get approximate count of waiters for a key (for diagnostics)
    #[inline]
    pub fn waiter_count(&self, key: K) -> usize {
        self.slot(key).waiters.load(Ordering::Relaxed)
    }
}

impl<K> Default for ParkQueue<K>
where
    K: Eq + Hash + Copy + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
