//! The trait boundary between this crate and a concrete CAN controller.

use crate::frame::{CanFrame, CanRxFrame};
use crate::time::MonotonicTime;

/// Something a [`CanDriver`] error can be converted to a numeric status code
/// for, so that [`crate::manager::IoManager::send`]/`receive` can report a
/// single `i32` result regardless of the concrete driver in use.
///
/// Codes must be negative; zero and positive values are reserved for the
/// manager's own outcomes (rejected/timed out/enqueued/frame count).
pub trait DriverError {
    /// A negative error code identifying this condition.
    fn code(&self) -> i32;
}

/// A non-blocking CAN controller with up to [`crate::manager::MAX_IFACES`]
/// interfaces, multiplexed by a single `select` call.
///
/// Mirrors the shape of a `select(2)`-style readiness poll: the caller passes
/// in which interfaces it's interested in reading/writing, and `select` fills
/// the same masks in with which interfaces actually became ready, blocking at
/// most until `blocking_deadline`.
pub trait CanDriver {
    /// The error type returned by [`send`](CanDriver::send)/[`receive`](CanDriver::receive).
    type Error: DriverError;

    /// Number of interfaces this driver exposes, `1..=MAX_IFACES`.
    fn num_ifaces(&self) -> usize;

    /// Blocks until at least one requested interface is ready, or `blocking_deadline`
    /// elapses, whichever comes first. On entry, `read_mask`/`write_mask` bit `i` means
    /// "interface `i` is of interest for reading/writing"; on return, the same bit means
    /// "interface `i` is ready". Returns the number of ready interfaces (which may be
    /// zero, on timeout), or a negative value on driver-level error.
    fn select(
        &mut self,
        read_mask: &mut u8,
        write_mask: &mut u8,
        blocking_deadline: MonotonicTime,
    ) -> i32;

    /// Attempts to transmit `frame` on interface `iface` without blocking. `tx_deadline`
    /// is passed through so a driver that maintains its own hardware mailbox queue can
    /// drop the frame itself if it can't meet the deadline.
    fn send(
        &mut self,
        iface: usize,
        frame: &CanFrame,
        tx_deadline: MonotonicTime,
    ) -> nb::Result<(), Self::Error>;

    /// Attempts to receive a frame from interface `iface` without blocking.
    fn receive(&mut self, iface: usize) -> nb::Result<CanRxFrame, Self::Error>;

    /// Cumulative hardware/driver error count for interface `iface`, for
    /// diagnostics only.
    fn num_errors(&self, iface: usize) -> u64;
}
