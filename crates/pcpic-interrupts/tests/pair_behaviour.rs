use std::cell::Cell;
use std::rc::Rc;

use pcpic_interrupts::{
    ChipPosition, DualPic8259, PicConfig, PicIrqLevelSink, MASTER_CMD, MASTER_DATA, MASTER_ELCR,
    SLAVE_CMD, SLAVE_DATA,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn program(pic: &mut DualPic8259, master_icw4: u8, slave_icw4: u8) {
    for (cmd, data, base, icw3, icw4) in [
        (MASTER_CMD, MASTER_DATA, 0x08, 0x04, master_icw4),
        (SLAVE_CMD, SLAVE_DATA, 0x70, 0x02, slave_icw4),
    ] {
        pic.port_write_u8(cmd, 0x11).unwrap();
        pic.port_write_u8(data, base).unwrap();
        pic.port_write_u8(data, icw3).unwrap();
        pic.port_write_u8(data, icw4).unwrap();
    }
}

#[test]
fn edge_line_stays_latched_after_deassert() {
    init_tracing();
    let mut pic = DualPic8259::new();
    program(&mut pic, 0x01, 0x01);

    pic.set_irq_level(5, true);
    pic.set_irq_level(5, false);
    assert_eq!(pic.chip_state(ChipPosition::Primary).irr, 1 << 5);

    assert_eq!(pic.resolve_vector(), 0x08 + 5);
    assert_eq!(pic.chip_state(ChipPosition::Primary).irr, 0);
}

#[test]
fn level_line_tracks_the_device() {
    init_tracing();
    let mut pic = DualPic8259::new();
    program(&mut pic, 0x01, 0x01);
    pic.port_write_u8(MASTER_ELCR, 1 << 5).unwrap();

    pic.set_irq_level(5, true);
    assert_eq!(pic.chip_state(ChipPosition::Primary).irr, 1 << 5);
    pic.set_irq_level(5, false);
    assert_eq!(pic.chip_state(ChipPosition::Primary).irr, 0);
    assert!(!pic.output());
}

#[test]
fn secondary_line_resolves_through_cascade() {
    init_tracing();
    let mut pic = DualPic8259::new();
    program(&mut pic, 0x01, 0x01);

    pic.raise_irq(10);
    assert_eq!(pic.resolve_vector(), 0x70 + 2);
    assert_eq!(pic.chip_state(ChipPosition::Primary).isr & (1 << 2), 1 << 2);
    assert_eq!(pic.chip_state(ChipPosition::Secondary).isr & (1 << 2), 1 << 2);
}

#[test]
fn auto_eoi_with_rotation_from_icw4() {
    init_tracing();
    let mut pic = DualPic8259::new();
    program(&mut pic, 0x03, 0x01);
    // OCW2: set rotate in automatic EOI mode.
    pic.port_write_u8(MASTER_CMD, 0x80).unwrap();

    pic.raise_irq(3);
    assert_eq!(pic.resolve_vector(), 0x08 + 3);

    let primary = pic.chip_state(ChipPosition::Primary);
    assert_eq!(primary.isr, 0);
    assert_eq!(primary.priority_add, 4);
}

#[test]
fn cpu_line_follows_arbitration() {
    init_tracing();
    let cpu = Rc::new(Cell::new(false));
    let mut pic = DualPic8259::new();
    pic.connect_output(cpu.clone());
    program(&mut pic, 0x01, 0x01);

    pic.raise_irq(1);
    assert!(cpu.get());
    assert_eq!(pic.resolve_vector(), 0x09);
    assert!(!cpu.get());

    // A lower priority request stays hidden behind IRQ1 until EOI.
    pic.raise_irq(6);
    assert!(!cpu.get());
    pic.port_write_u8(MASTER_CMD, 0x61).unwrap();
    assert!(cpu.get());
}

#[test]
fn alternate_port_layout() {
    let cfg = PicConfig {
        primary_base: 0x120,
        secondary_base: 0x1A0,
        primary_elcr_port: None,
        secondary_elcr_port: None,
        ..PicConfig::default()
    };
    let mut pic = DualPic8259::with_config(cfg);
    pic.port_write_u8(0x121, 0xF0).unwrap();
    assert_eq!(pic.port_read_u8(0x121), 0xF0);
    assert_eq!(pic.port_read_u8(MASTER_DATA), 0xFF);
    pic.port_write_u8(MASTER_ELCR, 0xFF).unwrap();
    assert_eq!(pic.chip_state(ChipPosition::Primary).elcr, 0);
}

#[test]
fn specific_rotation_makes_next_line_highest() {
    let mut pic = DualPic8259::new();
    program(&mut pic, 0x01, 0x01);

    // Set priority: IRQ4 lowest, so IRQ5 is highest.
    pic.port_write_u8(MASTER_CMD, 0xC4).unwrap();
    pic.raise_irq(0);
    pic.raise_irq(5);
    assert_eq!(pic.resolve_vector(), 0x08 + 5);
    pic.port_write_u8(MASTER_CMD, 0x20).unwrap();
    assert_eq!(pic.resolve_vector(), 0x08);
}
