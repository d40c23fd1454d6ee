//! ICW/OCW decoding for a single chip.

use tracing::{debug, error};

use crate::chip::Pic;
use crate::error::PicError;

const ICW1_INIT: u8 = 0x10;
const ICW1_LTIM: u8 = 0x08;
const ICW1_SNGL: u8 = 0x02;
const ICW1_IC4: u8 = 0x01;

const OCW3_SELECT: u8 = 0x08;
const OCW3_POLL: u8 = 0x04;
const OCW3_RR: u8 = 0x02;
const OCW3_RIS: u8 = 0x01;
const OCW3_ESMM: u8 = 0x40;
const OCW3_SMM: u8 = 0x20;

const ICW4_SFNM: u8 = 0x10;
const ICW4_AEOI: u8 = 0x02;

/// OCW2 commands, selected by bits 7:5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ocw2 {
    /// Rotate in automatic EOI mode: clear (0b000) or set (0b100).
    SetRotateOnAutoEoi(bool),
    /// Non-specific EOI, optionally rotating the cleared line to lowest priority.
    NonSpecificEoi { rotate: bool },
    SpecificEoi,
    SetPriority,
    RotateOnSpecificEoi,
    NoOp,
}

impl Ocw2 {
    fn decode(value: u8) -> Self {
        match value >> 5 {
            0 => Self::SetRotateOnAutoEoi(false),
            4 => Self::SetRotateOnAutoEoi(true),
            1 => Self::NonSpecificEoi { rotate: false },
            5 => Self::NonSpecificEoi { rotate: true },
            3 => Self::SpecificEoi,
            6 => Self::SetPriority,
            7 => Self::RotateOnSpecificEoi,
            _ => Self::NoOp,
        }
    }
}

impl Pic {
    /// Write to the command port (A0 = 0).
    ///
    /// A level-triggered ICW1 is still applied before the error is returned, so the chip is
    /// left waiting for ICW2 like real hardware.
    pub(crate) fn write_command(&mut self, value: u8) -> Result<(), PicError> {
        debug!(chip = %self.position, value, "pic command write");

        if value & ICW1_INIT != 0 {
            self.init_reset();
            let r = &mut self.regs;
            r.init_state = 1;
            r.init4 = value & ICW1_IC4 != 0;
            r.single_mode = value & ICW1_SNGL != 0;
            if value & ICW1_LTIM != 0 {
                error!(chip = %self.position, value, "level sensitive irq not supported");
                return Err(PicError::LevelTriggeredInit {
                    chip: self.position,
                    value,
                });
            }
        } else if value & OCW3_SELECT != 0 {
            let r = &mut self.regs;
            if value & OCW3_POLL != 0 {
                r.poll = true;
            }
            if value & OCW3_RR != 0 {
                r.read_reg_select = value & OCW3_RIS != 0;
            }
            if value & OCW3_ESMM != 0 {
                r.special_mask = value & OCW3_SMM != 0;
            }
        } else {
            self.write_ocw2(value);
        }
        Ok(())
    }

    fn write_ocw2(&mut self, value: u8) {
        match Ocw2::decode(value) {
            Ocw2::SetRotateOnAutoEoi(rotate) => self.regs.rotate_on_auto_eoi = rotate,
            Ocw2::NonSpecificEoi { rotate } => {
                let priority = self.priority(self.regs.isr);
                if priority != 8 {
                    let irq = (priority + self.regs.priority_add) & 7;
                    self.regs.isr &= !(1 << irq);
                    if rotate {
                        self.regs.priority_add = (irq + 1) & 7;
                    }
                    self.update_irq();
                }
            }
            Ocw2::SpecificEoi => {
                self.regs.isr &= !(1 << (value & 7));
                self.update_irq();
            }
            Ocw2::SetPriority => {
                self.regs.priority_add = value.wrapping_add(1) & 7;
                self.update_irq();
            }
            Ocw2::RotateOnSpecificEoi => {
                let irq = value & 7;
                self.regs.isr &= !(1 << irq);
                self.regs.priority_add = (irq + 1) & 7;
                self.update_irq();
            }
            Ocw2::NoOp => {}
        }
    }

    /// Write to the data port (A0 = 1): IMR when operational, ICW2-ICW4 during init.
    pub(crate) fn write_data(&mut self, value: u8) {
        debug!(chip = %self.position, value, init_state = self.regs.init_state, "pic data write");

        let r = &mut self.regs;
        match r.init_state {
            0 => {
                r.imr = value;
                self.update_irq();
            }
            1 => {
                r.irq_base = value & 0xF8;
                r.init_state = match (r.single_mode, r.init4) {
                    (true, true) => 3,
                    (true, false) => 0,
                    (false, _) => 2,
                };
            }
            2 => {
                // ICW3 only describes the cascade wiring, which is fixed here.
                r.init_state = if r.init4 { 3 } else { 0 };
            }
            3 => {
                r.special_fully_nested_mode = value & ICW4_SFNM != 0;
                r.auto_eoi = value & ICW4_AEOI != 0;
                r.init_state = 0;
            }
            _ => {}
        }
    }

    pub(crate) fn read_data(&self) -> u8 {
        self.regs.imr
    }

    /// Command port read outside poll mode.
    pub(crate) fn read_status(&self) -> u8 {
        if self.regs.read_reg_select {
            self.regs.isr
        } else {
            self.regs.irr
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::{ChipPosition, ChipState};

    fn pic() -> Pic {
        Pic::new(ChipPosition::Primary, 0xF8)
    }

    fn init(p: &mut Pic, icw1: u8, data: &[u8]) {
        p.write_command(icw1).unwrap();
        for &d in data {
            p.write_data(d);
        }
    }

    #[test]
    fn full_init_sequence_walks_every_state() {
        let mut p = pic();
        p.write_command(0x11).unwrap();
        assert_eq!(p.regs.init_state, 1);
        assert!(p.regs.init4);
        assert!(!p.regs.single_mode);

        p.write_data(0x27);
        assert_eq!(p.regs.irq_base, 0x20, "low three bits are ignored");
        assert_eq!(p.regs.init_state, 2);

        p.write_data(0x04);
        assert_eq!(p.regs.init_state, 3);

        p.write_data(0x12);
        assert_eq!(p.regs.init_state, 0);
        assert!(p.regs.special_fully_nested_mode);
        assert!(p.regs.auto_eoi);

        p.write_data(0xFB);
        assert_eq!(p.regs.imr, 0xFB);
    }

    #[test]
    fn single_mode_skips_icw3() {
        let mut p = pic();
        init(&mut p, 0x13, &[0x08]);
        assert_eq!(p.regs.init_state, 3);
        p.write_data(0x02);
        assert_eq!(p.regs.init_state, 0);
        assert!(p.regs.auto_eoi);

        let mut p = pic();
        init(&mut p, 0x12, &[0x08]);
        assert_eq!(p.regs.init_state, 0);

        let mut p = pic();
        init(&mut p, 0x10, &[0x08, 0x04]);
        assert_eq!(p.regs.init_state, 0);
    }

    #[test]
    fn icw1_restarts_an_in_progress_sequence() {
        let mut p = pic();
        init(&mut p, 0x11, &[0x20, 0x04]);
        assert_eq!(p.regs.init_state, 3);

        p.write_command(0x11).unwrap();
        assert_eq!(p.regs.init_state, 1);
        assert_eq!(p.regs.irq_base, 0);
    }

    #[test]
    fn icw1_resets_everything_but_elcr() {
        let mut p = pic();
        p.write_elcr(0x80);
        init(&mut p, 0x11, &[0x20, 0x04, 0x01]);
        p.write_data(0xAA);
        p.set_irq(4, true);

        p.write_command(0x11).unwrap();
        assert_eq!(
            p.regs,
            ChipState {
                elcr: 0x80,
                init_state: 1,
                init4: true,
                ..ChipState::default()
            }
        );
    }

    #[test]
    fn level_triggered_icw1_is_fatal_but_applied() {
        let mut p = pic();
        assert_eq!(
            p.write_command(0x19),
            Err(PicError::LevelTriggeredInit {
                chip: ChipPosition::Primary,
                value: 0x19
            })
        );
        assert_eq!(p.regs.init_state, 1);
    }

    #[test]
    fn ocw3_toggles_are_independent() {
        let mut p = pic();
        p.write_command(0x0B).unwrap();
        assert!(p.regs.read_reg_select);
        assert!(!p.regs.poll);
        assert!(!p.regs.special_mask);

        // Poll + special mask without touching the register select.
        p.write_command(0x6C).unwrap();
        assert!(p.regs.read_reg_select);
        assert!(p.regs.poll);
        assert!(p.regs.special_mask);

        p.write_command(0x4A).unwrap();
        assert!(!p.regs.read_reg_select);
        assert!(!p.regs.special_mask);
    }

    #[test]
    fn non_specific_eoi_clears_highest_priority_in_service() {
        let mut p = pic();
        p.regs.isr = 0b0010_1000;
        p.write_command(0x20).unwrap();
        assert_eq!(p.regs.isr, 0b0010_0000);
        assert_eq!(p.regs.priority_add, 0);

        p.write_command(0xA0).unwrap();
        assert_eq!(p.regs.isr, 0);
        assert_eq!(p.regs.priority_add, 6);

        // Nothing in service: no rotation.
        p.write_command(0xA0).unwrap();
        assert_eq!(p.regs.priority_add, 6);
    }

    #[test]
    fn specific_eoi_and_rotation_commands() {
        let mut p = pic();
        p.regs.isr = 0xFF;
        p.write_command(0x63).unwrap();
        assert_eq!(p.regs.isr, 0xF7);
        assert_eq!(p.regs.priority_add, 0);

        p.write_command(0xE5).unwrap();
        assert_eq!(p.regs.isr, 0xD7);
        assert_eq!(p.regs.priority_add, 6);

        p.write_command(0xC2).unwrap();
        assert_eq!(p.regs.isr, 0xD7);
        assert_eq!(p.regs.priority_add, 3);

        p.write_command(0xC7).unwrap();
        assert_eq!(p.regs.priority_add, 0);
    }

    #[test]
    fn rotate_on_auto_eoi_flag_and_no_op() {
        let mut p = pic();
        p.write_command(0x80).unwrap();
        assert!(p.regs.rotate_on_auto_eoi);
        p.write_command(0x00).unwrap();
        assert!(!p.regs.rotate_on_auto_eoi);

        let before = p.regs;
        p.write_command(0x40).unwrap();
        assert_eq!(p.regs, before);
    }

    #[test]
    fn status_read_follows_register_select() {
        let mut p = pic();
        p.regs.irr = 0x12;
        p.regs.isr = 0x40;
        assert_eq!(p.read_status(), 0x12);
        p.write_command(0x0B).unwrap();
        assert_eq!(p.read_status(), 0x40);
        p.write_command(0x0A).unwrap();
        assert_eq!(p.read_status(), 0x12);
    }
}
