//! The per-interface, priority-ordered, deadline-aware transmit queue.

use crate::frame::CanFrame;
use crate::pool::{Handle, Pool};
use crate::qos::Qos;
use crate::time::MonotonicTime;

/// A queued-but-not-yet-sent outbound frame.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TxEntry {
    /// The frame to transmit.
    pub frame: CanFrame,
    /// Deadline after which the entry is dropped rather than sent.
    pub deadline: MonotonicTime,
    /// Admission-control class, used only to decide eviction order.
    pub qos: Qos,
}

impl TxEntry {
    fn is_expired(&self, now: MonotonicTime) -> bool {
        now > self.deadline
    }

    /// QoS-aware "higher than" used only for eviction candidate search: higher
    /// QoS wins outright; ties broken by pure CAN arbitration priority.
    fn qos_higher_than(&self, other: &TxEntry) -> bool {
        if self.qos != other.qos {
            self.qos > other.qos
        } else {
            self.frame.priority_higher_than(&other.frame)
        }
    }
}

/// A bounded, priority-ordered queue of pending outbound frames for one CAN
/// interface.
///
/// Entries live in a shared [`Pool`] (so memory pressure is pooled across all
/// of an `IoManager`'s interfaces); `TxQueue` itself holds only the ordering
/// (a vector of pool [`Handle`]s, front = highest priority) plus its own
/// rejection counter. The pool is threaded through as a parameter on every call
/// rather than stored as a field, since it's shared with sibling queues owned
/// by the same `IoManager`; the current time is passed in the same way rather
/// than read from a stored clock handle.
pub struct TxQueue<const N: usize> {
    order: heapless::Vec<Handle, N>,
    rejected_frames_cnt: u32,
}

impl<const N: usize> TxQueue<N> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        TxQueue {
            order: heapless::Vec::new(),
            rejected_frames_cnt: 0,
        }
    }

    /// True if the queue holds no entries.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Number of frames dropped so far: admission-rejected, evicted, or found
    /// expired at `peek` time. Monotonically non-decreasing.
    pub fn num_rejected_frames(&self) -> u32 {
        self.rejected_frames_cnt
    }

    /// Current number of live entries.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    fn reject(&mut self) {
        self.rejected_frames_cnt += 1;
    }

    /// Attempts to enqueue `frame`. In short: reject if `tx_deadline` has
    /// already passed as of `now`, otherwise allocate a pool slot, evicting
    /// this queue's own lowest-QoS-priority entry once if the pool is full
    /// and a strictly lower entry exists, else reject and count the drop.
    pub fn push(
        &mut self,
        pool: &mut Pool<TxEntry, N>,
        now: MonotonicTime,
        frame: CanFrame,
        tx_deadline: MonotonicTime,
        qos: Qos,
    ) {
        if now > tx_deadline {
            log::debug!("tx queue: rejecting already-expired frame on push");
            self.reject();
            return;
        }
        let entry = TxEntry {
            frame,
            deadline: tx_deadline,
            qos,
        };
        match pool.allocate(entry) {
            Ok(handle) => self.insert_sorted(pool, handle),
            Err(entry) => self.push_after_eviction(pool, entry),
        }
    }

    fn push_after_eviction(&mut self, pool: &mut Pool<TxEntry, N>, entry: TxEntry) {
        let candidate = self.find_eviction_candidate(pool, &entry);
        let Some(pos) = candidate else {
            log::debug!("tx queue: pool exhausted, no eviction candidate, rejecting");
            self.reject();
            return;
        };
        let evicted = self.order.remove(pos);
        pool.deallocate(evicted);
        log::debug!("tx queue: evicted a lower-priority entry to admit a new frame");
        self.reject();
        match pool.allocate(entry) {
            Ok(handle) => self.insert_sorted(pool, handle),
            Err(_entry) => {
                // Pool is shared with sibling queues; another queue could have
                // raced the freed slot (single-threaded core, so in practice
                // this only happens if the pool had zero total capacity).
                self.reject();
            }
        }
    }

    /// Finds this queue's own lowest-priority entry (under the QoS-aware
    /// comparator) among those strictly lower than `candidate`, if any.
    fn find_eviction_candidate(&self, pool: &Pool<TxEntry, N>, candidate: &TxEntry) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, &handle) in self.order.iter().enumerate() {
            let entry = pool.get(handle);
            if !candidate.qos_higher_than(entry) {
                continue;
            }
            best = match best {
                None => Some(i),
                Some(best_i) => {
                    let best_entry = pool.get(self.order[best_i]);
                    if best_entry.qos_higher_than(entry) {
                        Some(i)
                    } else {
                        Some(best_i)
                    }
                }
            };
        }
        best
    }

    fn insert_sorted(&mut self, pool: &Pool<TxEntry, N>, handle: Handle) {
        let new_frame = pool.get(handle).frame;
        let pos = self
            .order
            .iter()
            .position(|&h| new_frame.priority_higher_than(&pool.get(h).frame))
            .unwrap_or(self.order.len());
        // Unwrap is safe: the pool (capacity N) just handed us a slot, so this
        // queue can hold at most N handles at once.
        self.order.insert(pos, handle).ok().unwrap();
    }

    /// Returns a handle to the highest-priority live entry, or `None` if empty.
    ///
    /// Side effect: sweeps and destroys every expired entry at the front of
    /// the queue first, counting each as a rejection.
    pub fn peek(&mut self, pool: &mut Pool<TxEntry, N>, now: MonotonicTime) -> Option<Handle> {
        while let Some(&front) = self.order.first() {
            if pool.get(front).is_expired(now) {
                self.order.remove(0);
                pool.deallocate(front);
                log::debug!("tx queue: dropping expired frame at peek");
                self.reject();
            } else {
                return Some(front);
            }
        }
        None
    }

    /// Unlinks and destroys `handle`, which must have been obtained from
    /// [`peek`](TxQueue::peek) on this same queue.
    ///
    /// # Panics
    ///
    /// Panics if `handle` is not a member of this queue — removing an entry
    /// that isn't there is a programmer error, not an expected condition.
    pub fn remove(&mut self, pool: &mut Pool<TxEntry, N>, handle: Handle) {
        let pos = self
            .order
            .iter()
            .position(|&h| h == handle)
            .expect("remove: handle is not a member of this queue");
        self.order.remove(pos);
        pool.deallocate(handle);
    }

    /// True iff the queue is non-empty and its front entry's frame is not
    /// lower-priority than `frame` under pure CAN arbitration (QoS ignored,
    /// no expiry sweep).
    pub fn top_priority_higher_or_equal(&self, pool: &Pool<TxEntry, N>, frame: &CanFrame) -> bool {
        match self.order.first() {
            Some(&front) => !frame.priority_higher_than(&pool.get(front).frame),
            None => false,
        }
    }

    /// Unlinks and destroys every entry. Called from `IoManager`'s `Drop` impl
    /// so no pool slot outlives the queue that was holding it.
    pub fn clear(&mut self, pool: &mut Pool<TxEntry, N>) {
        while let Some(handle) = self.order.pop() {
            pool.deallocate(handle);
        }
    }
}

impl<const N: usize> Default for TxQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}
