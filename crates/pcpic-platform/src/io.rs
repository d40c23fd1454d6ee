//! Port-mapped I/O dispatch.

use std::collections::HashMap;

use tracing::trace;

/// A device that answers guest `IN`/`OUT` instructions on one or more ports.
pub trait PortIoDevice {
    fn read(&mut self, port: u16, size: u8) -> u32;
    fn write(&mut self, port: u16, size: u8, value: u32);

    /// Returns the device to its power-on state.
    fn reset(&mut self) {}
}

/// Value an undriven bus floats to for an access of `size` bytes.
pub(crate) fn open_bus(size: u8) -> u32 {
    match size {
        1 => 0xFF,
        2 => 0xFFFF,
        _ => 0xFFFF_FFFF,
    }
}

/// Exact-port dispatch table.
///
/// Devices that own several ports (like the PIC pair) share their state behind
/// `Rc<RefCell<_>>` and register one handle per port.
#[derive(Default)]
pub struct IoPortBus {
    devices: HashMap<u16, Box<dyn PortIoDevice>>,
}

impl IoPortBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, port: u16, device: Box<dyn PortIoDevice>) {
        self.devices.insert(port, device);
    }

    /// Removes the handler for `port`, returning it if one was mapped.
    pub fn unregister(&mut self, port: u16) -> Option<Box<dyn PortIoDevice>> {
        self.devices.remove(&port)
    }

    /// Registers one handler per port for `start..start + len` (wrapping), built by `make`.
    pub fn register_shared_range<F>(&mut self, start: u16, len: u16, mut make: F)
    where
        F: FnMut(u16) -> Box<dyn PortIoDevice>,
    {
        for offset in 0..len {
            let port = start.wrapping_add(offset);
            self.register(port, make(port));
        }
    }

    pub fn unregister_range(&mut self, start: u16, len: u16) {
        for offset in 0..len {
            self.unregister(start.wrapping_add(offset));
        }
    }

    pub fn is_mapped(&self, port: u16) -> bool {
        self.devices.contains_key(&port)
    }

    pub fn read(&mut self, port: u16, size: u8) -> u32 {
        match size {
            0 => 0,
            1 | 2 | 4 => match self.devices.get_mut(&port) {
                Some(dev) => dev.read(port, size),
                None => {
                    trace!(port, size, "read from unmapped port");
                    open_bus(size)
                }
            },
            // Not an x86 access width: float high without reaching any device.
            _ => 0xFFFF_FFFF,
        }
    }

    pub fn write(&mut self, port: u16, size: u8, value: u32) {
        if !matches!(size, 1 | 2 | 4) {
            return;
        }
        match self.devices.get_mut(&port) {
            Some(dev) => dev.write(port, size, value),
            None => trace!(port, size, value, "write to unmapped port"),
        }
    }

    pub fn read_u8(&mut self, port: u16) -> u8 {
        self.read(port, 1) as u8
    }

    pub fn write_u8(&mut self, port: u16, value: u8) {
        self.write(port, 1, u32::from(value));
    }

    /// Resets every mapped handler. Shared devices see one call per registered port.
    pub fn reset(&mut self) {
        for dev in self.devices.values_mut() {
            dev.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    struct Latch {
        value: Rc<RefCell<u32>>,
        accesses: Rc<Cell<u32>>,
    }

    impl PortIoDevice for Latch {
        fn read(&mut self, _port: u16, _size: u8) -> u32 {
            self.accesses.set(self.accesses.get() + 1);
            *self.value.borrow()
        }

        fn write(&mut self, _port: u16, _size: u8, value: u32) {
            self.accesses.set(self.accesses.get() + 1);
            *self.value.borrow_mut() = value;
        }

        fn reset(&mut self) {
            *self.value.borrow_mut() = 0;
        }
    }

    fn latch() -> (Latch, Rc<RefCell<u32>>, Rc<Cell<u32>>) {
        let value = Rc::new(RefCell::new(0));
        let accesses = Rc::new(Cell::new(0));
        (
            Latch {
                value: value.clone(),
                accesses: accesses.clone(),
            },
            value,
            accesses,
        )
    }

    #[test]
    fn unmapped_ports_float_high() {
        let mut bus = IoPortBus::new();
        assert_eq!(bus.read(0x80, 1), 0xFF);
        assert_eq!(bus.read(0x80, 2), 0xFFFF);
        assert_eq!(bus.read(0x80, 4), 0xFFFF_FFFF);
        bus.write_u8(0x80, 0x12);
        assert_eq!(bus.read_u8(0x80), 0xFF);
    }

    #[test]
    fn invalid_sizes_never_reach_devices() {
        let (dev, value, accesses) = latch();
        let mut bus = IoPortBus::new();
        bus.register(0x1234, Box::new(dev));

        assert_eq!(bus.read(0x1234, 0), 0);
        assert_eq!(bus.read(0x1234, 3), 0xFFFF_FFFF);
        bus.write(0x1234, 0, 1);
        bus.write(0x1234, 3, 1);
        assert_eq!(accesses.get(), 0);
        assert_eq!(*value.borrow(), 0);

        bus.write(0x1234, 4, 0xDEAD_BEEF);
        assert_eq!(bus.read(0x1234, 4), 0xDEAD_BEEF);
        assert_eq!(accesses.get(), 2);
    }

    #[test]
    fn shared_range_registers_every_port_and_unmaps_cleanly() {
        let value = Rc::new(RefCell::new(0));
        let accesses = Rc::new(Cell::new(0));
        let mut bus = IoPortBus::new();
        bus.register_shared_range(0xFFFE, 4, |_| {
            Box::new(Latch {
                value: value.clone(),
                accesses: accesses.clone(),
            })
        });
        for port in [0xFFFE, 0xFFFF, 0x0000, 0x0001] {
            assert!(bus.is_mapped(port));
        }

        bus.write_u8(0x0001, 0x42);
        assert_eq!(bus.read_u8(0xFFFE), 0x42);

        bus.unregister_range(0xFFFE, 4);
        assert!(!bus.is_mapped(0x0000));
        assert_eq!(bus.read_u8(0xFFFE), 0xFF);
    }

    #[test]
    fn reset_fans_out() {
        let (dev, value, _) = latch();
        let mut bus = IoPortBus::new();
        bus.register(0x70, Box::new(dev));
        bus.write_u8(0x70, 9);

        bus.reset();
        assert_eq!(*value.borrow(), 0);
        assert!(bus.unregister(0x70).is_some());
        assert!(bus.unregister(0x70).is_none());
    }
}
