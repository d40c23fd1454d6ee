use pcpic_io_snapshot::io::state::codec::{Decoder, Encoder};
use pcpic_io_snapshot::io::state::{
    IoSnapshot, SnapshotError, SnapshotReader, SnapshotResult, SnapshotVersion, SnapshotWriter,
};

use crate::chip::{ChipPosition, ChipState};
use crate::pic8259::DualPic8259;

const TAG_PRIMARY: u16 = 1;
const TAG_SECONDARY: u16 = 2;
const TAG_IRQ_STATS_ENABLED: u16 = 3;

fn encode_chip(s: &ChipState) -> Vec<u8> {
    Encoder::new()
        .u8(s.last_irr)
        .u8(s.irr)
        .u8(s.imr)
        .u8(s.isr)
        .u8(s.priority_add)
        .u8(s.irq_base)
        .bool(s.read_reg_select)
        .bool(s.poll)
        .bool(s.special_mask)
        .u8(s.init_state)
        .bool(s.auto_eoi)
        .bool(s.rotate_on_auto_eoi)
        .bool(s.special_fully_nested_mode)
        .bool(s.init4)
        .bool(s.single_mode)
        .u8(s.elcr)
        .finish()
}

fn decode_chip(bytes: &[u8]) -> SnapshotResult<ChipState> {
    let mut d = Decoder::new(bytes);
    let s = ChipState {
        last_irr: d.u8()?,
        irr: d.u8()?,
        imr: d.u8()?,
        isr: d.u8()?,
        priority_add: d.u8()?,
        irq_base: d.u8()?,
        read_reg_select: d.bool()?,
        poll: d.bool()?,
        special_mask: d.bool()?,
        init_state: d.u8()?,
        auto_eoi: d.bool()?,
        rotate_on_auto_eoi: d.bool()?,
        special_fully_nested_mode: d.bool()?,
        init4: d.bool()?,
        single_mode: d.bool()?,
        elcr: d.u8()?,
    };
    d.finish()?;

    if s.priority_add > 7 {
        return Err(SnapshotError::InvalidFieldEncoding("priority_add"));
    }
    if s.init_state > 3 {
        return Err(SnapshotError::InvalidFieldEncoding("init_state"));
    }
    Ok(s)
}

impl IoSnapshot for DualPic8259 {
    const DEVICE_ID: [u8; 4] = *b"PIC2";
    const DEVICE_VERSION: SnapshotVersion = SnapshotVersion::new(1, 0);

    fn save_state(&self) -> Vec<u8> {
        let mut w = SnapshotWriter::new(Self::DEVICE_ID, Self::DEVICE_VERSION);
        w.field_bytes(
            TAG_PRIMARY,
            encode_chip(&self.chip_state(ChipPosition::Primary)),
        );
        w.field_bytes(
            TAG_SECONDARY,
            encode_chip(&self.chip_state(ChipPosition::Secondary)),
        );
        w.field_bool(TAG_IRQ_STATS_ENABLED, self.irq_stats().is_enabled());
        w.finish()
    }

    fn load_state(&mut self, bytes: &[u8]) -> SnapshotResult<()> {
        let r = SnapshotReader::parse(bytes, Self::DEVICE_ID)?;
        r.ensure_device_major(Self::DEVICE_VERSION.major)?;

        // Decode everything before touching live state so a bad snapshot leaves us untouched.
        let primary = r
            .bytes(TAG_PRIMARY)
            .map(decode_chip)
            .transpose()?
            .unwrap_or_default();
        let secondary = r
            .bytes(TAG_SECONDARY)
            .map(decode_chip)
            .transpose()?
            .unwrap_or_default();
        let stats_enabled = r.bool(TAG_IRQ_STATS_ENABLED)?;

        self.load_chip_state(ChipPosition::Secondary, secondary);
        self.load_chip_state(ChipPosition::Primary, primary);
        if let Some(enabled) = stats_enabled {
            self.set_irq_stats_enabled(enabled);
        }
        self.sync_restored_outputs();
        Ok(())
    }
}
