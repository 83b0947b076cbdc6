//! The CAN frame value type and its arbitration-priority ordering.

use core::cmp::Ordering;
use embedded_can::{ExtendedId, Frame as EmbeddedFrame, Id, StandardId};

use crate::time::{MonotonicTime, UtcTime};

/// Maximum CAN payload length in bytes (classic CAN, no FD long frames).
pub const MAX_DATA_LEN: usize = 8;

/// An outbound or inbound CAN frame: an arbitration identifier, optional
/// remote/error flags, and 0-8 bytes of payload.
///
/// `CanFrame` is a plain value type; [`priority_higher_than`](CanFrame::priority_higher_than)
/// is a pure function of its fields and is the only thing that determines bus
/// arbitration order between two frames.
#[derive(Clone, Copy, Debug)]
pub struct CanFrame {
    id: Id,
    is_remote: bool,
    is_error: bool,
    len: u8,
    data: [u8; MAX_DATA_LEN],
}

impl CanFrame {
    /// Creates a new data frame with a standard (11-bit) or extended (29-bit) ID.
    ///
    /// Returns `None` if `data` is longer than [`MAX_DATA_LEN`].
    pub fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        if data.len() > MAX_DATA_LEN {
            return None;
        }
        let mut buf = [0u8; MAX_DATA_LEN];
        buf[..data.len()].copy_from_slice(data);
        Some(CanFrame {
            id: id.into(),
            is_remote: false,
            is_error: false,
            len: data.len() as u8,
            data: buf,
        })
    }

    /// Creates a new remote (RTR) frame requesting `dlc` bytes.
    pub fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        if dlc > MAX_DATA_LEN {
            return None;
        }
        Some(CanFrame {
            id: id.into(),
            is_remote: true,
            is_error: false,
            len: dlc as u8,
            data: [0u8; MAX_DATA_LEN],
        })
    }

    /// Marks this frame as an error frame. Error frames are never scheduled for
    /// transmission by [`crate::queue::TxQueue`]; this flag exists so received
    /// frames can carry the condition through to the application.
    pub fn with_error_flag(mut self, is_error: bool) -> Self {
        self.is_error = is_error;
        self
    }

    /// The frame's arbitration identifier.
    pub fn id(&self) -> Id {
        self.id
    }

    /// True if this frame uses a 29-bit extended identifier.
    pub fn is_extended(&self) -> bool {
        matches!(self.id, Id::Extended(_))
    }

    /// True if this is a remote (RTR) frame.
    pub fn is_remote_frame(&self) -> bool {
        self.is_remote
    }

    /// True if this frame represents a bus error condition.
    pub fn is_error_frame(&self) -> bool {
        self.is_error
    }

    /// Data length code: the number of valid bytes in [`data`](CanFrame::data).
    pub fn dlc(&self) -> usize {
        self.len as usize
    }

    /// The frame's payload, `dlc()` bytes long.
    pub fn data(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    /// The 11-bit "base" identifier used for the first phase of arbitration:
    /// the full ID for standard frames, or the top 11 bits of the 29-bit ID
    /// for extended frames (which occupy the same arbitration field on the bus).
    fn base_id(&self) -> u32 {
        match self.id {
            Id::Standard(id) => u32::from(id.as_raw()),
            Id::Extended(id) => id.as_raw() >> 18,
        }
    }

    fn raw_id(&self) -> u32 {
        match self.id {
            Id::Standard(id) => u32::from(id.as_raw()),
            Id::Extended(id) => id.as_raw(),
        }
    }

    /// Implements CAN bus arbitration precedence: returns true iff `self` would
    /// win simultaneous bus access against `other`.
    ///
    /// Strict weak ordering: irreflexive, asymmetric, transitive. Standard
    /// frames dominate extended frames with the same 11-bit base ID; data
    /// frames dominate remote frames at equal ID; otherwise the numerically
    /// smaller identifier wins.
    pub fn priority_higher_than(&self, other: &CanFrame) -> bool {
        match self.base_id().cmp(&other.base_id()) {
            Ordering::Less => return true,
            Ordering::Greater => return false,
            Ordering::Equal => {}
        }
        if self.is_extended() != other.is_extended() {
            // Standard (false) dominates extended (true) at an equal base ID.
            return !self.is_extended();
        }
        if self.is_extended() {
            match self.raw_id().cmp(&other.raw_id()) {
                Ordering::Less => return true,
                Ordering::Greater => return false,
                Ordering::Equal => {}
            }
        }
        if self.is_remote != other.is_remote {
            // Data frames (false) dominate remote frames (true) at an equal ID.
            return !self.is_remote;
        }
        false
    }
}

impl PartialEq for CanFrame {
    fn eq(&self, other: &Self) -> bool {
        self.raw_id() == other.raw_id()
            && self.is_extended() == other.is_extended()
            && self.is_remote == other.is_remote
            && self.data() == other.data()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for CanFrame {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "CanFrame(id={=u32:#x}, ext={}, rtr={}, err={}, data={=[u8]:#04x})",
            self.raw_id(),
            self.is_extended(),
            self.is_remote,
            self.is_error,
            self.data(),
        );
    }
}

impl EmbeddedFrame for CanFrame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        CanFrame::new(id, data)
    }

    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        CanFrame::new_remote(id, dlc)
    }

    fn is_extended(&self) -> bool {
        CanFrame::is_extended(self)
    }

    fn is_remote_frame(&self) -> bool {
        CanFrame::is_remote_frame(self)
    }

    fn id(&self) -> Id {
        CanFrame::id(self)
    }

    fn dlc(&self) -> usize {
        CanFrame::dlc(self)
    }

    fn data(&self) -> &[u8] {
        CanFrame::data(self)
    }
}

/// A frame received on one of the manager's interfaces, tagged with the
/// timestamps and interface index it arrived with.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CanRxFrame {
    /// The received frame.
    pub frame: CanFrame,
    /// Monotonic timestamp of reception.
    pub ts_mono: MonotonicTime,
    /// Wall-clock timestamp of reception, may be a default value if unavailable.
    pub ts_utc: UtcTime,
    /// Index of the interface the frame was received on, `< IoManager::num_ifaces()`.
    pub iface_index: u8,
}

pub(crate) fn std_id(raw: u16) -> Id {
    Id::Standard(StandardId::new(raw).expect("id out of 11-bit range"))
}

pub(crate) fn ext_id(raw: u32) -> Id {
    Id::Extended(ExtendedId::new(raw).expect("id out of 29-bit range"))
}
