use crate::pic8259::{MASTER_CMD, MASTER_ELCR, SLAVE_CMD, SLAVE_ELCR};

/// ELCR bits the PIIX chipsets let software set on the primary: IRQ0-2 are always edge.
pub const PRIMARY_ELCR_MASK: u8 = 0xF8;
/// ELCR bits settable on the secondary: IRQ8 and IRQ13 are always edge.
pub const SECONDARY_ELCR_MASK: u8 = 0xDE;

/// Wiring of a [`crate::DualPic8259`] into the machine.
///
/// The defaults describe a PC/AT with a PIIX-style ELCR pair at 0x4D0/0x4D1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PicConfig {
    /// Primary command port; the data port follows at `+1`.
    pub primary_base: u16,
    /// Secondary command port; the data port follows at `+1`.
    pub secondary_base: u16,
    /// `None` leaves the primary ELCR undecoded.
    pub primary_elcr_port: Option<u16>,
    pub secondary_elcr_port: Option<u16>,
    pub primary_elcr_mask: u8,
    pub secondary_elcr_mask: u8,
    /// Whether per-line assertion counters start enabled.
    pub irq_stats: bool,
}

impl Default for PicConfig {
    fn default() -> Self {
        Self {
            primary_base: MASTER_CMD,
            secondary_base: SLAVE_CMD,
            primary_elcr_port: Some(MASTER_ELCR),
            secondary_elcr_port: Some(SLAVE_ELCR),
            primary_elcr_mask: PRIMARY_ELCR_MASK,
            secondary_elcr_mask: SECONDARY_ELCR_MASK,
            irq_stats: false,
        }
    }
}
