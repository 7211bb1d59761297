//! Definition of the tail buffer and its long-poll read protocol.

use crate::gate::Gate;
use crate::window::Window;
use parking_lot::RwLock;
use std::cmp::min;
use std::mem;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Different types of error that can happen when constructing a [`Tail`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Tail capacity must be > 0")]
    ZeroCapacity,
}

/// One batch of items returned by [`Tail::read`].
///
/// `next_offset` is the offset to pass to the next read to continue from
/// where this batch ended. Callers that chain reads should compare it to the
/// offset they asked for:
///
/// * `next_offset == offset` with empty items means the read was cancelled
///   before anything arrived.
/// * `skipped > 0` means the requested offset had already aged out of
///   retention and the batch starts `skipped` items later than requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk<T> {
    /// Items served, in append order.
    pub items: Vec<T>,

    /// Offset of the item one past the last one served.
    pub next_offset: u64,

    /// Number of requested items that were dropped from retention before
    /// this read could serve them.
    pub skipped: u64,
}

impl<T> Chunk<T> {
    fn empty(offset: u64) -> Self {
        Self {
            items: Vec::new(),
            next_offset: offset,
            skipped: 0,
        }
    }
}

/// Shared mutable state of a [`Tail`], guarded by one lock.
///
/// The gate and waiter count live under the same lock as the windows and the
/// cursor so that observing the cursor and registering interest in the gate
/// is one atomic step with respect to a concurrent append.
#[derive(Debug)]
struct State<T> {
    /// Total number of items ever appended. Never decreases.
    next: u64,

    /// Window receiving writes, covers offsets [s0, next).
    current: Window<T>,

    /// Retired window, covers offsets [s0 - capacity, s0). Never written.
    previous: Window<T>,

    /// Readers registered against the live gate since it was last fired.
    waiters: usize,

    /// Live gate. Replaced with a fresh one each time it is fired.
    gate: Gate,
}

/// A bounded, in-memory, append-only sequence built for tailing.
///
/// Writers [`append`](Tail::append) items and never block. Readers
/// [`read`](Tail::read) from a logical offset; when no items exist at that
/// offset yet the read parks until a write lands or the caller's
/// cancellation token fires.
///
/// Retention is bounded: the buffer keeps the two most recent fixed size
/// windows of items, at most `2 * capacity` in total. Readers that fall
/// behind retention are skipped forward to the oldest retained offset and
/// told how much they missed, writers are never slowed down by readers.
///
/// All methods take `&self`; share a `Tail` between tasks with an
/// [`Arc`](std::sync::Arc).
#[derive(Debug)]
pub struct Tail<T> {
    capacity: usize,
    state: RwLock<State<T>>,
}

impl<T> Tail<T> {
    /// Create a new tail buffer.
    ///
    /// Note that this variant panics when the capacity is invalid. For a
    /// non-panicking alternative, use [`Tail::try_with_capacity`].
    ///
    /// # Panics
    ///
    /// * Panics if capacity == 0.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of items each retention window can hold.
    pub fn with_capacity(capacity: usize) -> Self {
        match Self::try_with_capacity(capacity) {
            Ok(tail) => tail,
            Err(e) => panic!("Error constructing tail buffer: {e}"),
        }
    }

    /// Create a new tail buffer.
    ///
    /// Returns a [`ConfigError`] if capacity == 0.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of items each retention window can hold.
    pub fn try_with_capacity(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }

        Ok(Self {
            capacity,
            state: RwLock::new(State {
                next: 0,
                current: Window::new(capacity),
                previous: Window::new(capacity),
                waiters: 0,
                gate: Gate::new(),
            }),
        })
    }

    /// Number of items each retention window can hold.
    ///
    /// At most twice this many items are retrievable at any point.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total number of items ever appended.
    #[inline]
    pub fn cursor(&self) -> u64 {
        self.state.read().next
    }

    /// Append an item to the tail.
    ///
    /// Rotates the retention windows when the current one is full: the
    /// current window becomes the previous one and items older than the
    /// previous window become unretrievable. Wakes all parked readers.
    ///
    /// Never blocks and never fails.
    ///
    /// # Arguments
    ///
    /// * `value` - Item to append.
    pub fn append(&self, value: T) {
        let retired = {
            let mut state = self.state.write();

            if state.next % self.capacity as u64 == 0 {
                // Current window is full (or this is the very first write).
                // The retired window is moved, not copied, and is never
                // written again.
                debug_assert!(state.next == 0 || state.current.len() == state.current.capacity());
                let fresh = Window::new(self.capacity);
                state.previous = mem::replace(&mut state.current, fresh);
                trace!(cursor = state.next, "rotated retention windows");
            }

            state.current.push(value);
            state.next += 1;

            // Arm the gate only when someone registered since the last fire,
            // so idle writes pay no wakeup cost.
            if state.waiters > 0 {
                state.waiters = 0;
                Some(mem::replace(&mut state.gate, Gate::new()))
            } else {
                None
            }
        };

        // Fired after the item is in place and outside the lock, so a woken
        // reader never resumes into a lock this writer still holds.
        if let Some(gate) = retired {
            gate.fire();
        }
    }
}

impl<T: Clone> Tail<T> {
    /// Read items starting at a logical offset.
    ///
    /// Returns up to `limit` items from `offset` onward; `limit == 0` means
    /// everything available from `offset` up to the write cursor. A single
    /// call serves from at most one retention window, chain `next_offset`
    /// into the next call to keep draining.
    ///
    /// If `offset` is at or past the write cursor the call parks until an
    /// append lands or `cancel` fires. On cancellation the returned chunk is
    /// empty and `next_offset` equals the requested offset.
    ///
    /// If `offset` has aged out of retention the read is skipped forward to
    /// the oldest retained item and the chunk's `skipped` field reports how
    /// many items were lost.
    ///
    /// # Arguments
    ///
    /// * `cancel` - Token that aborts a parked read.
    /// * `offset` - Logical offset of the first item wanted.
    /// * `limit` - Maximum number of items to return, 0 for no limit.
    pub async fn read(&self, cancel: &CancellationToken, offset: u64, limit: u64) -> Chunk<T> {
        loop {
            // Fast path: serve under the shared lock.
            {
                let state = self.state.read();
                if offset < state.next {
                    return self.serve(&state, offset, limit);
                }
            }

            // Nothing to serve yet. Re-check the cursor and register
            // interest in the live gate in one critical section, so an
            // append cannot slip between the check and the registration.
            let gate = {
                let mut state = self.state.write();
                if offset < state.next {
                    return self.serve(&state, offset, limit);
                }

                state.waiters += 1;
                state.gate.handle()
            };

            tokio::select! {
                _ = gate.fired() => {
                    // Edge-triggered wake: re-snapshot, never trust the wake
                    // to mean this reader's offset is ready.
                }
                _ = cancel.cancelled() => return Chunk::empty(offset),
            }
        }
    }

    /// Serve one chunk from the snapshot in `state`.
    ///
    /// # Invariants
    ///
    /// * offset < state.next
    fn serve(&self, state: &State<T>, mut offset: u64, limit: u64) -> Chunk<T> {
        let capacity = self.capacity as u64;

        // Start of the current window. state.next > 0 here.
        let s0 = ((state.next - 1) / capacity) * capacity;

        if offset >= s0 {
            // Offset falls in the current window.
            let start = offset - s0;
            let filled = state.current.len() as u64;

            // Saturating: a limit near u64::MAX must clamp to the window
            // end, not wrap past the requested offset.
            let (end, next_offset) = if limit == 0 {
                (filled, state.next)
            } else {
                (
                    min(start.saturating_add(limit), filled),
                    min(offset.saturating_add(limit), state.next),
                )
            };

            return Chunk {
                items: state.current[start as usize..end as usize].to_vec(),
                next_offset,
                skipped: 0,
            };
        }

        // Oldest retained offset. s0 is a positive multiple of capacity
        // here, since offset < s0 and offsets are unsigned.
        let oldest = s0 - capacity;

        // Offset has aged out of retention: skip forward to the oldest
        // retained item and report the gap instead of hiding it.
        let mut skipped = 0;
        if offset < oldest {
            skipped = oldest - offset;
            debug!(requested = offset, oldest, skipped, "reader fell behind retention");
            offset = oldest;
        }

        // Offset falls in the previous window, which covers [oldest, s0)
        // and is full whenever it is reachable.
        let start = offset - oldest;
        let filled = state.previous.len() as u64;

        let (end, next_offset) = if limit == 0 {
            (filled, s0)
        } else {
            (
                min(start.saturating_add(limit), filled),
                min(offset.saturating_add(limit), s0),
            )
        };

        Chunk {
            items: state.previous[start as usize..end as usize].to_vec(),
            next_offset,
            skipped,
        }
    }
}
