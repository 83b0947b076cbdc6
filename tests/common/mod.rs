//! A minimal in-memory `CanDriver`/`Clock` pair for exercising `IoManager`
//! without real hardware.

use canio::{CanDriver, CanFrame, CanRxFrame, Clock, Duration, DriverError, MonotonicTime, UtcTime};
use std::cell::Cell;
use std::collections::VecDeque;

pub struct MockClock {
    now: Cell<MonotonicTime>,
}

impl MockClock {
    pub fn new() -> Self {
        MockClock {
            now: Cell::new(MonotonicTime::from_ticks(0)),
        }
    }

    pub fn advance(&self, d: Duration) {
        self.now.set(self.now.get() + d);
    }

    pub fn set(&self, t: MonotonicTime) {
        if t > self.now.get() {
            self.now.set(t);
        }
    }
}

impl Clock for MockClock {
    fn monotonic(&self) -> MonotonicTime {
        self.now.get()
    }

    fn utc(&self) -> UtcTime {
        self.now.get()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct MockError(pub i32);

impl DriverError for MockError {
    fn code(&self) -> i32 {
        self.0
    }
}

/// A driver whose readiness and pending-receive state tests set up explicitly.
///
/// Time only advances when [`select`](CanDriver::select) finds nothing ready:
/// it jumps straight to `blocking_deadline`, standing in for a real driver
/// blocking until that point.
pub struct MockDriver<'a> {
    clock: &'a MockClock,
    num_ifaces: usize,
    write_ready: [bool; 3],
    rx_queue: [VecDeque<CanFrame>; 3],
    errors: [u64; 3],
    pub sent: Vec<(usize, CanFrame)>,
}

impl<'a> MockDriver<'a> {
    pub fn new(clock: &'a MockClock, num_ifaces: usize) -> Self {
        MockDriver {
            clock,
            num_ifaces,
            write_ready: [false; 3],
            rx_queue: [VecDeque::new(), VecDeque::new(), VecDeque::new()],
            errors: [0; 3],
            sent: Vec::new(),
        }
    }

    pub fn set_write_ready(&mut self, iface: usize, ready: bool) {
        self.write_ready[iface] = ready;
    }

    pub fn push_rx(&mut self, iface: usize, frame: CanFrame) {
        self.rx_queue[iface].push_back(frame);
    }

    pub fn bump_errors(&mut self, iface: usize) {
        self.errors[iface] += 1;
    }
}

impl<'a> CanDriver for MockDriver<'a> {
    type Error = MockError;

    fn num_ifaces(&self) -> usize {
        self.num_ifaces
    }

    fn select(
        &mut self,
        read_mask: &mut u8,
        write_mask: &mut u8,
        blocking_deadline: MonotonicTime,
    ) -> i32 {
        let mut ready_read = 0u8;
        let mut ready_write = 0u8;
        for i in 0..self.num_ifaces {
            let bit = 1u8 << i;
            if *read_mask & bit != 0 && !self.rx_queue[i].is_empty() {
                ready_read |= bit;
            }
            if *write_mask & bit != 0 && self.write_ready[i] {
                ready_write |= bit;
            }
        }
        *read_mask = ready_read;
        *write_mask = ready_write;
        let count = (ready_read | ready_write).count_ones() as i32;
        if count == 0 {
            self.clock.set(blocking_deadline);
        }
        count
    }

    fn send(
        &mut self,
        iface: usize,
        frame: &CanFrame,
        _tx_deadline: MonotonicTime,
    ) -> nb::Result<(), Self::Error> {
        if self.write_ready[iface] {
            self.sent.push((iface, *frame));
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }

    fn receive(&mut self, iface: usize) -> nb::Result<CanRxFrame, Self::Error> {
        match self.rx_queue[iface].pop_front() {
            Some(frame) => Ok(CanRxFrame {
                frame,
                ts_mono: self.clock.monotonic(),
                ts_utc: self.clock.utc(),
                iface_index: iface as u8,
            }),
            None => Err(nb::Error::WouldBlock),
        }
    }

    fn num_errors(&self, iface: usize) -> u64 {
        self.errors[iface]
    }
}

pub fn std_frame(id: u16) -> CanFrame {
    use embedded_can::{Id, StandardId};
    CanFrame::new(Id::Standard(StandardId::new(id).unwrap()), &[0xAA]).unwrap()
}
