//! Bus wiring for the cascaded 8259A pair.
//!
//! The register model lives in `pcpic-interrupts`; this module exposes it as byte-wide
//! [`PortIoDevice`]s on an [`IoPortBus`] and turns the model's fatal programming error into a
//! platform fault.

use std::cell::RefCell;
use std::rc::Rc;

use pcpic_interrupts::{DualPic8259, IrqLine};
use tracing::{error, warn};

use crate::fault::PlatformFaultSink;
use crate::io::{open_bus, IoPortBus, PortIoDevice};
use crate::reset::ResetKind;

pub type SharedPic8259 = Rc<RefCell<DualPic8259>>;

/// I/O-port view of a shared [`DualPic8259`], one instance per decoded port.
///
/// The PIC registers are 8 bits wide. Wider accesses are not split into byte accesses: reads
/// float high and writes are dropped.
///
/// The pair's output line is driven while the PIC is mutably borrowed, so an [`IrqLine`]
/// connected to it must not borrow the same `SharedPic8259`.
pub struct Pic8259Port {
    pic: SharedPic8259,
    port: u16,
    faults: Option<Box<dyn PlatformFaultSink>>,
}

impl Pic8259Port {
    pub fn new(pic: SharedPic8259, port: u16) -> Self {
        Self {
            pic,
            port,
            faults: None,
        }
    }

    /// Like [`Self::new`], reporting fatal programming errors to `sink`.
    pub fn with_fault_sink(
        pic: SharedPic8259,
        port: u16,
        sink: impl PlatformFaultSink + 'static,
    ) -> Self {
        Self {
            pic,
            port,
            faults: Some(Box::new(sink)),
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl PortIoDevice for Pic8259Port {
    fn read(&mut self, port: u16, size: u8) -> u32 {
        debug_assert_eq!(port, self.port);
        if size != 1 {
            warn!(port, size, "unsupported PIC read width");
            return open_bus(size);
        }
        u32::from(self.pic.borrow_mut().port_read_u8(port))
    }

    fn write(&mut self, port: u16, size: u8, value: u32) {
        debug_assert_eq!(port, self.port);
        if size != 1 {
            warn!(port, size, value, "unsupported PIC write width");
            return;
        }

        let res = self.pic.borrow_mut().port_write_u8(port, value as u8);
        if let Err(err) = res {
            error!(port, %err, "fatal PIC programming error");
            if let Some(sink) = self.faults.as_mut() {
                sink.report_fault(err);
            }
        }
    }

    fn reset(&mut self) {
        self.pic.borrow_mut().cold_reset();
    }
}

/// Registers every port the PIC's configuration decodes on `bus`.
pub fn register_pic8259(bus: &mut IoPortBus, pic: SharedPic8259) {
    let ports = pic.borrow().config().ports();
    for port in ports {
        bus.register(port, Box::new(Pic8259Port::new(pic.clone(), port)));
    }
}

/// Like [`register_pic8259`], with each port reporting fatal errors to a clone of `sink`.
pub fn register_pic8259_with_fault_sink<S>(bus: &mut IoPortBus, pic: SharedPic8259, sink: S)
where
    S: PlatformFaultSink + Clone + 'static,
{
    let ports = pic.borrow().config().ports();
    for port in ports {
        bus.register(
            port,
            Box::new(Pic8259Port::with_fault_sink(pic.clone(), port, sink.clone())),
        );
    }
}

/// Applies a platform reset request to the pair.
pub fn apply_reset(pic: &mut DualPic8259, kind: ResetKind) {
    match kind {
        ResetKind::Device => pic.reset(),
        ResetKind::Cold => pic.cold_reset(),
    }
}

/// One ISA request line of a shared PIC, for device models that drive an [`IrqLine`].
#[derive(Clone)]
pub struct PicIrqLine {
    pic: SharedPic8259,
    irq: u8,
}

impl PicIrqLine {
    pub fn new(pic: SharedPic8259, irq: u8) -> Self {
        Self { pic, irq }
    }

    pub fn irq(&self) -> u8 {
        self.irq
    }
}

impl IrqLine for PicIrqLine {
    fn set_level(&self, level: bool) {
        self.pic.borrow_mut().set_irq(self.irq, level);
    }
}
