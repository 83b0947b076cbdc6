//! A CAN-bus transmit-queue and multi-interface I/O core for redundant,
//! priority-arbitrated embedded nodes.
//!
//! The crate owns three things, bottom-up: a [`CanFrame`] value type carrying
//! the CAN arbitration ordering (`frame`), a bounded priority queue with
//! QoS-aware eviction and deadline expiry (`queue`), and an [`IoManager`] that
//! multiplexes sends and receives across up to [`MAX_IFACES`] redundant
//! interfaces against a caller-supplied [`CanDriver`] and [`Clock`].
//!
//! Runs `no_std` by default; the `std` facilities pulled in under `#[cfg(test)]`
//! (e.g. `simplelog`) are test-only.
#![cfg_attr(not(test), no_std)]

pub mod driver;
pub mod frame;
pub mod manager;
pub mod pool;
pub mod qos;
pub mod queue;
pub mod time;

pub use driver::{CanDriver, DriverError};
pub use frame::{CanFrame, CanRxFrame, MAX_DATA_LEN};
pub use manager::{IoManager, QueueDiagnostics, MAX_IFACES};
pub use pool::{Handle, Pool};
pub use qos::Qos;
pub use queue::{TxEntry, TxQueue};
pub use time::{Clock, Duration, MonotonicTime, UtcTime};
