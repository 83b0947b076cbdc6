//! Multi-interface send/receive multiplexing on top of per-interface [`TxQueue`]s.

use crate::driver::{CanDriver, DriverError};
use crate::frame::{CanFrame, CanRxFrame};
use crate::pool::Pool;
use crate::qos::Qos;
use crate::queue::{TxEntry, TxQueue};
use crate::time::{Clock, MonotonicTime};

/// Upper bound on the number of redundant CAN interfaces one [`IoManager`] can drive.
pub const MAX_IFACES: usize = 3;

/// A snapshot of one interface's transmit queue state, for monitoring.
///
/// Read-only and side-effect-free: unlike [`TxQueue::peek`], fetching this
/// does not sweep expired entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QueueDiagnostics {
    /// Number of entries currently queued.
    pub depth: usize,
    /// Total frames this interface's queue has dropped so far.
    pub rejected_frames_cnt: u32,
}

fn relevant_mask(iface_mask: u8, num_ifaces: usize) -> u8 {
    let all = if num_ifaces >= 8 {
        0xFF
    } else {
        (1u8 << num_ifaces) - 1
    };
    iface_mask & all
}

/// Owns a shared entry pool and one [`TxQueue`] per CAN interface, and
/// multiplexes frame sends/receives across them against a borrowed
/// [`CanDriver`] and [`Clock`].
///
/// `N` is the shared pool's total capacity, the same const generic used by
/// every [`TxQueue`] it owns (the pool is shared, not partitioned per
/// interface).
pub struct IoManager<'a, D: CanDriver, const N: usize> {
    driver: &'a mut D,
    clock: &'a dyn Clock,
    pool: Pool<TxEntry, N>,
    queues: [TxQueue<N>; MAX_IFACES],
    num_ifaces: usize,
}

impl<'a, D: CanDriver, const N: usize> IoManager<'a, D, N> {
    /// Builds a manager driving `driver`'s interfaces.
    ///
    /// # Panics
    ///
    /// Panics if `driver.num_ifaces() > MAX_IFACES`: a driver exposing more
    /// redundant interfaces than this crate supports is a configuration
    /// error, not a runtime condition to recover from.
    pub fn new(driver: &'a mut D, clock: &'a dyn Clock) -> Self {
        let num_ifaces = driver.num_ifaces();
        assert!(
            num_ifaces <= MAX_IFACES,
            "driver exposes {num_ifaces} interfaces, exceeding MAX_IFACES ({MAX_IFACES})"
        );
        IoManager {
            driver,
            clock,
            pool: Pool::new(),
            queues: core::array::from_fn(|_| TxQueue::new()),
            num_ifaces,
        }
    }

    /// Number of interfaces this manager drives, `1..=MAX_IFACES`.
    pub fn num_ifaces(&self) -> usize {
        self.num_ifaces
    }

    /// Cumulative driver-reported error count for `iface`.
    ///
    /// # Panics
    ///
    /// Panics if `iface >= num_ifaces()`.
    pub fn num_errors(&self, iface: usize) -> u64 {
        assert!(iface < self.num_ifaces, "iface index out of range");
        self.driver.num_errors(iface)
    }

    /// Current queue depth and rejection count for `iface`, without mutating
    /// any state (no expiry sweep).
    ///
    /// # Panics
    ///
    /// Panics if `iface >= num_ifaces()`.
    pub fn queue_diagnostics(&self, iface: usize) -> QueueDiagnostics {
        assert!(iface < self.num_ifaces, "iface index out of range");
        QueueDiagnostics {
            depth: self.queues[iface].len(),
            rejected_frames_cnt: self.queues[iface].num_rejected_frames(),
        }
    }

    /// Sends `frame` on every interface selected by `iface_mask`, directly if
    /// the driver is immediately ready and not preempted by a higher-priority
    /// queued frame, otherwise enqueuing it once `blocking_deadline` is reached.
    ///
    /// Returns the number of interfaces the frame was handed directly to the
    /// driver on (0 if all selected interfaces ended up enqueued, timed out, or
    /// the mask selected no interfaces), or a negative driver error code.
    pub fn send(
        &mut self,
        frame: CanFrame,
        tx_deadline: MonotonicTime,
        blocking_deadline: MonotonicTime,
        iface_mask: u8,
        qos: Qos,
    ) -> i32 {
        if self.clock.monotonic() > tx_deadline {
            log::debug!("io manager: rejecting send with already-expired tx_deadline");
            return 0;
        }

        let IoManager {
            driver,
            clock,
            pool,
            queues,
            num_ifaces,
        } = self;
        let num_ifaces = *num_ifaces;
        let want = relevant_mask(iface_mask, num_ifaces);

        let mut handled: u8 = 0;
        let mut direct_sends: i32 = 0;

        'outer: loop {
            let unhandled = want & !handled;
            if unhandled == 0 {
                break;
            }
            let select_deadline = if tx_deadline < blocking_deadline {
                tx_deadline
            } else {
                blocking_deadline
            };
            if clock.monotonic() > select_deadline {
                break;
            }

            let mut read_mask = 0u8;
            let mut write_mask = unhandled;
            let sel = driver.select(&mut read_mask, &mut write_mask, select_deadline);
            if sel < 0 {
                return sel;
            }
            if sel == 0 {
                break;
            }

            for i in 0..num_ifaces {
                let bit = 1u8 << i;
                if unhandled & bit == 0 || write_mask & bit == 0 {
                    continue;
                }
                let queue = &mut queues[i];
                let accept_directly =
                    queue.is_empty() || !queue.top_priority_higher_or_equal(pool, &frame);
                if accept_directly {
                    match driver.send(i, &frame, tx_deadline) {
                        Ok(()) => {
                            handled |= bit;
                            direct_sends += 1;
                        }
                        Err(nb::Error::WouldBlock) => {}
                        Err(nb::Error::Other(e)) => return e.code(),
                    }
                } else {
                    let code = drain_one(*driver, pool, queue, i, clock.monotonic());
                    if code < 0 {
                        return code;
                    }
                }
                if unhandled & !handled == 0 {
                    continue 'outer;
                }
            }
        }

        let now = clock.monotonic();
        for i in 0..num_ifaces {
            let bit = 1u8 << i;
            if want & bit != 0 && handled & bit == 0 {
                queues[i].push(pool, now, frame, tx_deadline, qos);
            }
        }

        direct_sends
    }

    /// Waits up to `blocking_deadline` for a frame on any interface.
    ///
    /// On success, writes the received frame into `rx_frame_out` and returns
    /// `1`. Returns `0` on timeout (leaving `rx_frame_out` untouched), or a
    /// negative driver error code.
    pub fn receive(
        &mut self,
        rx_frame_out: &mut Option<CanRxFrame>,
        blocking_deadline: MonotonicTime,
    ) -> i32 {
        let IoManager {
            driver,
            clock,
            num_ifaces,
            ..
        } = self;
        let num_ifaces = *num_ifaces;
        let all_ifaces = relevant_mask(0xFF, num_ifaces);

        loop {
            if clock.monotonic() > blocking_deadline {
                return 0;
            }
            let mut read_mask = all_ifaces;
            let mut write_mask = 0u8;
            let sel = driver.select(&mut read_mask, &mut write_mask, blocking_deadline);
            if sel < 0 {
                return sel;
            }
            if sel == 0 {
                return 0;
            }
            for i in 0..num_ifaces {
                let bit = 1u8 << i;
                if read_mask & bit == 0 {
                    continue;
                }
                match driver.receive(i) {
                    Ok(rx) => {
                        *rx_frame_out = Some(rx);
                        return 1;
                    }
                    Err(nb::Error::WouldBlock) => continue,
                    Err(nb::Error::Other(e)) => return e.code(),
                }
            }
        }
    }
}

/// Hands `queue`'s top entry to the driver on `iface`. Returns 1 on acceptance
/// (the entry is removed), 0 if the queue was empty or the driver is still
/// busy (the entry stays queued), or a negative driver error code (the entry
/// is removed — a frame the driver rejected outright is lost, not retried).
fn drain_one<D: CanDriver, const N: usize>(
    driver: &mut D,
    pool: &mut Pool<TxEntry, N>,
    queue: &mut TxQueue<N>,
    iface: usize,
    now: MonotonicTime,
) -> i32 {
    let Some(handle) = queue.peek(pool, now) else {
        return 0;
    };
    let entry = *pool.get(handle);
    match driver.send(iface, &entry.frame, entry.deadline) {
        Ok(()) => {
            queue.remove(pool, handle);
            1
        }
        Err(nb::Error::WouldBlock) => 0,
        Err(nb::Error::Other(e)) => {
            queue.remove(pool, handle);
            e.code()
        }
    }
}

impl<'a, D: CanDriver, const N: usize> Drop for IoManager<'a, D, N> {
    fn drop(&mut self) {
        let IoManager {
            pool,
            queues,
            num_ifaces,
            ..
        } = self;
        for queue in queues[..*num_ifaces].iter_mut() {
            queue.clear(pool);
        }
    }
}
