//! Interrupt line plumbing between the PIC pair, device models and the CPU.

use std::cell::Cell;
use std::rc::Rc;

/// A single level-sensitive interrupt signal.
pub trait IrqLine {
    fn set_level(&self, level: bool);
}

/// An output that is not connected to anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIrq;

impl IrqLine for NoIrq {
    fn set_level(&self, _level: bool) {}
}

impl IrqLine for Cell<bool> {
    fn set_level(&self, level: bool) {
        self.set(level);
    }
}

impl<T: IrqLine + ?Sized> IrqLine for Rc<T> {
    fn set_level(&self, level: bool) {
        (**self).set_level(level);
    }
}

impl<T: IrqLine + ?Sized> IrqLine for Box<T> {
    fn set_level(&self, level: bool) {
        (**self).set_level(level);
    }
}

/// A sink that accepts level changes for a legacy PIC IRQ input (0-15).
pub trait PicIrqLevelSink {
    fn set_irq_level(&mut self, irq: u8, level: bool);
}
