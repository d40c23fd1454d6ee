//! CPU-facing side of the interrupt controller.

use pcpic_interrupts::DualPic8259;

use crate::pic8259::SharedPic8259;

/// What the CPU core needs from an external interrupt controller.
pub trait InterruptController {
    /// Whether the controller is asserting INTR.
    fn output(&self) -> bool;

    /// Runs the interrupt-acknowledge cycle and returns the vector to deliver.
    fn resolve_vector(&mut self) -> u8;

    /// Acknowledges and returns the next vector if INTR is asserted.
    ///
    /// Callers are responsible for checking `IF` before polling.
    fn poll_interrupt(&mut self) -> Option<u8> {
        if self.output() {
            Some(self.resolve_vector())
        } else {
            None
        }
    }
}

impl InterruptController for DualPic8259 {
    fn output(&self) -> bool {
        DualPic8259::output(self)
    }

    fn resolve_vector(&mut self) -> u8 {
        DualPic8259::resolve_vector(self)
    }
}

impl InterruptController for SharedPic8259 {
    fn output(&self) -> bool {
        self.borrow().output()
    }

    fn resolve_vector(&mut self) -> u8 {
        self.borrow_mut().resolve_vector()
    }
}
