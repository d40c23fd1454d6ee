use std::cell::Cell;
use std::rc::Rc;

use pcpic_interrupts::PicError;

/// Sink for fatal device misconfiguration detected inside an I/O handler.
///
/// Port devices cannot fail a guest access, so they report here and the platform loop
/// decides how to stop the machine.
pub trait PlatformFaultSink {
    fn report_fault(&mut self, err: PicError);
}

impl<F> PlatformFaultSink for F
where
    F: FnMut(PicError),
{
    fn report_fault(&mut self, err: PicError) {
        self(err);
    }
}

/// Cloneable latch that keeps the first reported fault until the platform takes it.
#[derive(Debug, Clone, Default)]
pub struct FaultLatch {
    first: Rc<Cell<Option<PicError>>>,
}

impl FaultLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn peek(&self) -> Option<PicError> {
        self.first.get()
    }

    pub fn take(&self) -> Option<PicError> {
        self.first.take()
    }

    pub fn is_faulted(&self) -> bool {
        self.peek().is_some()
    }
}

impl PlatformFaultSink for FaultLatch {
    fn report_fault(&mut self, err: PicError) {
        if self.first.get().is_none() {
            self.first.set(Some(err));
        }
    }
}
