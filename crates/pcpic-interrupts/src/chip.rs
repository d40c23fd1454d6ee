use std::fmt;

use tracing::trace;

/// Request line on the primary that the secondary's output is wired to.
pub(crate) const CASCADE_IRQ: u8 = 2;

/// Line reported when an acknowledge or poll finds nothing to service.
pub(crate) const SPURIOUS_IRQ: u8 = 7;

/// Sentinel returned by [`Pic::priority`] for an empty mask.
const NO_PRIORITY: u8 = 8;

/// Which of the two cascaded chips a [`Pic`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChipPosition {
    /// Master, drives the CPU's INTR input.
    Primary,
    /// Slave, drives the primary's IRQ2.
    Secondary,
}

impl ChipPosition {
    pub const fn index(self) -> usize {
        match self {
            Self::Primary => 0,
            Self::Secondary => 1,
        }
    }

    /// Splits a global line number (0-15) into the chip that owns it and its local line.
    pub const fn for_global_irq(irq: u8) -> (Self, u8) {
        let pos = if irq >> 3 == 0 {
            Self::Primary
        } else {
            Self::Secondary
        };
        (pos, irq & 7)
    }
}

impl fmt::Display for ChipPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        })
    }
}

/// Register file of one 8259A.
///
/// All 8-bit registers are bitmaps over the chip's lines 0-7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChipState {
    /// Level seen on each line at the last request, for edge detection.
    pub last_irr: u8,
    pub irr: u8,
    pub imr: u8,
    pub isr: u8,
    /// The line with the lowest priority is `priority_add - 1` (mod 8).
    pub priority_add: u8,
    pub irq_base: u8,
    /// Command port reads return ISR when set, IRR otherwise.
    pub read_reg_select: bool,
    pub poll: bool,
    pub special_mask: bool,
    /// 0 when operational, 1-3 while waiting for ICW2-ICW4.
    pub init_state: u8,
    pub auto_eoi: bool,
    pub rotate_on_auto_eoi: bool,
    pub special_fully_nested_mode: bool,
    pub init4: bool,
    pub single_mode: bool,
    pub elcr: u8,
}

/// One 8259A chip: its registers plus the fixed wiring facts the pair gives it.
#[derive(Debug, Clone)]
pub(crate) struct Pic {
    pub(crate) position: ChipPosition,
    /// Lines that may be switched to level-triggered through the ELCR.
    pub(crate) elcr_mask: u8,
    pub(crate) regs: ChipState,
    /// Current level of the INT output.
    int_out: bool,
    /// Set whenever the output was recomputed and not yet propagated by the pair.
    int_out_updated: bool,
}

impl Pic {
    pub(crate) fn new(position: ChipPosition, elcr_mask: u8) -> Self {
        Self {
            position,
            elcr_mask,
            regs: ChipState::default(),
            int_out: false,
            int_out_updated: false,
        }
    }

    pub(crate) fn int_out(&self) -> bool {
        self.int_out
    }

    /// Returns the distance from the highest-priority line to the first line set in `mask`,
    /// or 8 if `mask` is empty.
    pub(crate) fn priority(&self, mask: u8) -> u8 {
        if mask == 0 {
            return NO_PRIORITY;
        }
        let mut priority = 0;
        while mask & (1 << ((priority + self.regs.priority_add) & 7)) == 0 {
            priority += 1;
        }
        priority
    }

    /// Returns the line this chip wants serviced, if any.
    pub(crate) fn pending_irq(&self) -> Option<u8> {
        let r = &self.regs;
        let priority = self.priority(r.irr & !r.imr);
        if priority == NO_PRIORITY {
            return None;
        }

        let mut in_service = r.isr;
        if r.special_mask {
            in_service &= !r.imr;
        }
        // In special fully nested mode a second secondary interrupt must be able to nest on
        // top of the cascade line that is already in service.
        if r.special_fully_nested_mode && self.position == ChipPosition::Primary {
            in_service &= !(1 << CASCADE_IRQ);
        }
        let cur_priority = self.priority(in_service);

        (priority < cur_priority).then_some((priority + r.priority_add) & 7)
    }

    /// Recomputes the INT output. Must run after anything that can change arbitration.
    pub(crate) fn update_irq(&mut self) {
        self.int_out = self.pending_irq().is_some();
        self.int_out_updated = true;
        trace!(
            chip = %self.position,
            level = self.int_out,
            irr = self.regs.irr,
            imr = self.regs.imr,
            isr = self.regs.isr,
            priority_add = self.regs.priority_add,
            "pic output recomputed"
        );
    }

    /// Consumes the pending output update, returning the level to forward downstream.
    pub(crate) fn take_int_out_update(&mut self) -> Option<bool> {
        std::mem::take(&mut self.int_out_updated).then_some(self.int_out)
    }

    /// Drives local request line `irq` (0-7) to `level`.
    pub(crate) fn set_irq(&mut self, irq: u8, level: bool) {
        let mask = 1u8 << (irq & 7);
        let r = &mut self.regs;
        if r.elcr & mask != 0 {
            // Level triggered: IRR follows the line.
            if level {
                r.irr |= mask;
                r.last_irr |= mask;
            } else {
                r.irr &= !mask;
                r.last_irr &= !mask;
            }
        } else if level {
            // Edge triggered: latch on the rising edge only, keep IRR until acknowledged.
            if r.last_irr & mask == 0 {
                r.irr |= mask;
            }
            r.last_irr |= mask;
        } else {
            r.last_irr &= !mask;
        }
        self.update_irq();
    }

    /// INTA cycle for local line `irq`.
    pub(crate) fn intack(&mut self, irq: u8) {
        let mask = 1u8 << (irq & 7);
        let r = &mut self.regs;
        if r.auto_eoi {
            if r.rotate_on_auto_eoi {
                r.priority_add = (irq + 1) & 7;
            }
        } else {
            r.isr |= mask;
        }
        // Level-triggered requests stay pending until the device drops the line.
        if r.elcr & mask == 0 {
            r.irr &= !mask;
        }
        self.update_irq();
    }

    /// Device reset: everything but the ELCR returns to zero.
    pub(crate) fn init_reset(&mut self) {
        self.regs = ChipState {
            elcr: self.regs.elcr,
            ..ChipState::default()
        };
        self.update_irq();
    }

    /// Power-on reset: like [`Self::init_reset`] but also clears the ELCR.
    pub(crate) fn cold_reset(&mut self) {
        self.init_reset();
        self.regs.elcr = 0;
    }

    pub(crate) fn write_elcr(&mut self, value: u8) {
        self.regs.elcr = value & self.elcr_mask;
    }
}
