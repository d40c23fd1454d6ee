use std::cell::Cell;
use std::rc::Rc;

/// Reset request kind delivered to chipset devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetKind {
    /// Device reset (RST#): registers cleared, programmed trigger modes kept.
    Device,
    /// Power-on reset: everything cleared, including trigger modes.
    Cold,
}

/// Platform-level sink for reset requests.
///
/// Device models report resets here instead of resetting siblings from inside an I/O handler,
/// which would re-borrow shared device state mid-dispatch.
pub trait PlatformResetSink {
    fn request_reset(&mut self, kind: ResetKind);
}

impl<F> PlatformResetSink for F
where
    F: FnMut(ResetKind),
{
    fn request_reset(&mut self, kind: ResetKind) {
        self(kind);
    }
}

/// Cloneable single-slot latch bridging reset requests into the platform loop.
///
/// A pending [`ResetKind::Cold`] is never downgraded by a later [`ResetKind::Device`].
#[derive(Debug, Clone, Default)]
pub struct ResetLatch {
    pending: Rc<Cell<Option<ResetKind>>>,
}

impl ResetLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn peek(&self) -> Option<ResetKind> {
        self.pending.get()
    }

    pub fn take(&self) -> Option<ResetKind> {
        self.pending.take()
    }

    pub fn clear(&self) {
        self.pending.set(None);
    }
}

impl PlatformResetSink for ResetLatch {
    fn request_reset(&mut self, kind: ResetKind) {
        let next = match self.pending.get() {
            Some(ResetKind::Cold) => ResetKind::Cold,
            _ => kind,
        };
        self.pending.set(Some(next));
    }
}
