//! The master/slave 8259A pair.

use std::fmt;

use tracing::{debug, trace};

use crate::chip::{ChipPosition, ChipState, Pic, CASCADE_IRQ, SPURIOUS_IRQ};
use crate::config::PicConfig;
use crate::error::PicError;
use crate::irq::{IrqLine, NoIrq, PicIrqLevelSink};
use crate::ports::PicPort;
use crate::stats::IrqStats;

pub const MASTER_CMD: u16 = 0x20;
pub const MASTER_DATA: u16 = 0x21;
pub const SLAVE_CMD: u16 = 0xA0;
pub const SLAVE_DATA: u16 = 0xA1;
pub const MASTER_ELCR: u16 = 0x4D0;
pub const SLAVE_ELCR: u16 = 0x4D1;

/// Two cascaded 8259A chips with the secondary's INT output wired to the primary's IRQ2.
///
/// Every mutation recomputes both chip outputs; the primary's output is forwarded to the
/// connected [`IrqLine`] whenever its level changes.
pub struct DualPic8259 {
    config: PicConfig,
    pics: [Pic; 2],
    int_out: Box<dyn IrqLine>,
    /// Last level forwarded to `int_out`.
    int_out_level: bool,
    stats: IrqStats,
}

impl DualPic8259 {
    pub fn new() -> Self {
        Self::with_config(PicConfig::default())
    }

    pub fn with_config(config: PicConfig) -> Self {
        Self {
            config,
            pics: [
                Pic::new(ChipPosition::Primary, config.primary_elcr_mask),
                Pic::new(ChipPosition::Secondary, config.secondary_elcr_mask),
            ],
            int_out: Box::new(NoIrq),
            int_out_level: false,
            stats: IrqStats::new(config.irq_stats),
        }
    }

    pub fn config(&self) -> &PicConfig {
        &self.config
    }

    /// Connects the primary's output (the CPU's INTR input) and drives it to the current level.
    pub fn connect_output(&mut self, line: impl IrqLine + 'static) {
        self.int_out = Box::new(line);
        self.int_out.set_level(self.int_out_level);
    }

    fn pic(&self, chip: ChipPosition) -> &Pic {
        &self.pics[chip.index()]
    }

    fn pic_mut(&mut self, chip: ChipPosition) -> &mut Pic {
        &mut self.pics[chip.index()]
    }

    /// Copy of one chip's register file.
    pub fn chip_state(&self, chip: ChipPosition) -> ChipState {
        self.pic(chip).regs
    }

    /// Replaces a chip's registers verbatim; call [`Self::sync_restored_outputs`] afterwards.
    pub(crate) fn load_chip_state(&mut self, chip: ChipPosition, state: ChipState) {
        let pic = self.pic_mut(chip);
        pic.regs = ChipState {
            elcr: state.elcr & pic.elcr_mask,
            ..state
        };
    }

    /// Recomputes outputs after a restore without feeding the secondary back into the
    /// primary's IRQ2, which already holds the restored cascade request.
    pub(crate) fn sync_restored_outputs(&mut self) {
        let [primary, secondary] = &mut self.pics;
        secondary.update_irq();
        let _ = secondary.take_int_out_update();
        primary.update_irq();
        self.sync_outputs();
    }

    /// Propagates recomputed outputs: secondary into the primary's IRQ2, primary to the CPU.
    pub(crate) fn sync_outputs(&mut self) {
        let [primary, secondary] = &mut self.pics;
        if let Some(level) = secondary.take_int_out_update() {
            primary.set_irq(CASCADE_IRQ, level);
        }
        if let Some(level) = primary.take_int_out_update() {
            if level != self.int_out_level {
                trace!(level, "pic output changed");
                self.int_out_level = level;
                self.int_out.set_level(level);
            }
        }
    }

    /// Drives global request line `irq` (0-15). Lines past 15 are ignored.
    pub fn set_irq(&mut self, irq: u8, level: bool) {
        if irq >= 16 {
            return;
        }
        self.stats.record(irq, level);
        let (chip, line) = ChipPosition::for_global_irq(irq);
        trace!(irq, level, "pic set irq");
        self.pic_mut(chip).set_irq(line, level);
        self.sync_outputs();
    }

    pub fn raise_irq(&mut self, irq: u8) {
        self.set_irq(irq, true);
    }

    pub fn lower_irq(&mut self, irq: u8) {
        self.set_irq(irq, false);
    }

    /// Whether the primary is currently requesting service from the CPU.
    pub fn output(&self) -> bool {
        self.pic(ChipPosition::Primary).pending_irq().is_some()
    }

    /// The vector [`Self::resolve_vector`] would return right now, without acknowledging.
    pub fn get_pending_vector(&self) -> Option<u8> {
        let primary = self.pic(ChipPosition::Primary);
        let secondary = self.pic(ChipPosition::Secondary);
        match primary.pending_irq()? {
            CASCADE_IRQ => {
                let irq = secondary.pending_irq().unwrap_or(SPURIOUS_IRQ);
                Some(secondary.regs.irq_base.wrapping_add(irq))
            }
            irq => Some(primary.regs.irq_base.wrapping_add(irq)),
        }
    }

    /// Runs the INTA sequence and returns the vector to deliver.
    ///
    /// With nothing pending this yields the spurious vector (base + 7) of whichever chip came
    /// up empty; spurious lines are not marked in service.
    pub fn resolve_vector(&mut self) -> u8 {
        let [primary, secondary] = &mut self.pics;

        let vector = match primary.pending_irq() {
            Some(CASCADE_IRQ) => {
                let irq2 = match secondary.pending_irq() {
                    Some(irq2) => {
                        secondary.intack(irq2);
                        irq2
                    }
                    None => SPURIOUS_IRQ,
                };
                primary.intack(CASCADE_IRQ);
                debug!(irq = 8 + irq2, "pic interrupt");
                secondary.regs.irq_base.wrapping_add(irq2)
            }
            Some(irq) => {
                primary.intack(irq);
                debug!(irq, "pic interrupt");
                primary.regs.irq_base.wrapping_add(irq)
            }
            None => {
                debug!("spurious pic interrupt");
                primary.regs.irq_base.wrapping_add(SPURIOUS_IRQ)
            }
        };

        self.sync_outputs();
        vector
    }

    /// Poll-mode read: retires the highest-priority request of `chip` and returns its line,
    /// or 7 without side effects if there is none.
    fn poll_read(&mut self, chip: ChipPosition) -> u8 {
        let Some(irq) = self.pic(chip).pending_irq() else {
            return SPURIOUS_IRQ;
        };

        // A secondary poll retires the primary's cascade bookkeeping right away.
        if chip == ChipPosition::Secondary {
            let primary = &mut self.pic_mut(ChipPosition::Primary).regs;
            primary.isr &= !(1 << CASCADE_IRQ);
            primary.irr &= !(1 << CASCADE_IRQ);
        }

        let pic = self.pic_mut(chip);
        pic.regs.irr &= !(1 << irq);
        pic.regs.isr &= !(1 << irq);
        // The primary's output stays as-is after it polls its own cascade line; the
        // secondary poll that follows updates it.
        if chip == ChipPosition::Secondary || irq != CASCADE_IRQ {
            pic.update_irq();
        }
        irq
    }

    /// Interrupt acknowledge as seen through a memory-mapped INTACK register: global line
    /// number (0-15), with the primary left selecting ISR for the next status read.
    pub fn intack_read(&mut self) -> u8 {
        let mut irq = self.poll_read(ChipPosition::Primary);
        if irq == CASCADE_IRQ {
            irq = self.poll_read(ChipPosition::Secondary) + 8;
        }
        self.pic_mut(ChipPosition::Primary).regs.read_reg_select = true;
        self.sync_outputs();
        irq
    }

    pub fn port_read_u8(&mut self, port: u16) -> u8 {
        let Some(decoded) = PicPort::decode(&self.config, port) else {
            return 0xFF;
        };

        let value = match decoded {
            PicPort::Command(chip) => {
                if self.pic(chip).regs.poll {
                    let irq = self.poll_read(chip);
                    self.pic_mut(chip).regs.poll = false;
                    self.sync_outputs();
                    irq
                } else {
                    self.pic(chip).read_status()
                }
            }
            PicPort::Data(chip) => self.pic(chip).read_data(),
            PicPort::Elcr(chip) => self.pic(chip).regs.elcr,
        };
        debug!(port, value, "pic read");
        value
    }

    /// Routes a guest byte write. Ports outside the configured layout are ignored.
    ///
    /// The only error is the unsupported level-triggered ICW1, which the platform must treat
    /// as fatal. The write has still been applied when it is returned.
    pub fn port_write_u8(&mut self, port: u16, value: u8) -> Result<(), PicError> {
        let Some(decoded) = PicPort::decode(&self.config, port) else {
            return Ok(());
        };

        let res = match decoded {
            PicPort::Command(chip) => self.pic_mut(chip).write_command(value),
            PicPort::Data(chip) => {
                self.pic_mut(chip).write_data(value);
                Ok(())
            }
            PicPort::Elcr(chip) => {
                debug!(%chip, value, "elcr write");
                self.pic_mut(chip).write_elcr(value);
                Ok(())
            }
        };
        self.sync_outputs();
        res
    }

    /// Device reset. The ELCRs keep their programmed trigger modes.
    pub fn reset(&mut self) {
        for pic in &mut self.pics {
            pic.init_reset();
        }
        self.sync_outputs();
    }

    /// Power-on reset, also returning every line to edge-triggered.
    pub fn cold_reset(&mut self) {
        for pic in &mut self.pics {
            pic.cold_reset();
        }
        self.sync_outputs();
    }

    pub fn irq_stats(&self) -> &IrqStats {
        &self.stats
    }

    pub fn set_irq_stats_enabled(&mut self, enabled: bool) {
        self.stats.set_enabled(enabled);
    }

    pub fn clear_irq_stats(&mut self) {
        self.stats.clear_counts();
    }

    pub fn format_irq_stats(&self) -> String {
        self.stats.to_string()
    }
}

impl Default for DualPic8259 {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DualPic8259 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DualPic8259")
            .field("config", &self.config)
            .field("primary", &self.pics[0].regs)
            .field("secondary", &self.pics[1].regs)
            .field("int_out_level", &self.int_out_level)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for DualPic8259 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, pic) in self.pics.iter().enumerate() {
            let r = &pic.regs;
            writeln!(
                f,
                "pic{i}: irr={:02x} imr={:02x} isr={:02x} hprio={} irq_base={:02x} rr_sel={} elcr={:02x} fnm={}",
                r.irr,
                r.imr,
                r.isr,
                r.priority_add,
                r.irq_base,
                u8::from(r.read_reg_select),
                r.elcr,
                u8::from(r.special_fully_nested_mode),
            )?;
        }
        Ok(())
    }
}

impl PicIrqLevelSink for DualPic8259 {
    fn set_irq_level(&mut self, irq: u8, level: bool) {
        self.set_irq(irq, level);
    }
}
