//! Monotonic and wall-clock time types used for deadlines and frame timestamps.
//!
//! Ticks are 64-bit microseconds so arithmetic does not practically wrap over
//! an embedded node's service life, however long it runs between resets.

/// Monotonic clock reading, used for all deadlines. Never decreases.
pub type MonotonicTime = fugit::Instant<u64, 1, 1_000_000>;

/// Wall-clock reading. May jump forward or backward if the clock is adjusted;
/// never used for deadline comparisons, only attached to received frames.
pub type UtcTime = fugit::Instant<u64, 1, 1_000_000>;

/// A duration between two [`MonotonicTime`] or [`UtcTime`] values.
pub type Duration = fugit::Duration<u64, 1, 1_000_000>;

/// Source of monotonic and wall-clock time, consumed by [`crate::manager::IoManager`]
/// and [`crate::queue::TxQueue`].
///
/// Implementations must guarantee `monotonic()` is non-decreasing and callable
/// from the single control-loop thread without reentrancy hazards.
pub trait Clock {
    /// Returns the current monotonic time.
    fn monotonic(&self) -> MonotonicTime;

    /// Returns the current wall-clock time. May return a default/zero value if
    /// no wall-clock source is available.
    fn utc(&self) -> UtcTime;
}
