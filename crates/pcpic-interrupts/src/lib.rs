#![forbid(unsafe_code)]

//! Cascaded Intel 8259A programmable interrupt controllers as wired in PC/AT compatibles.
//!
//! [`DualPic8259`] owns both chips. Device models drive its request lines, guest port I/O is
//! forwarded to [`DualPic8259::port_read_u8`] / [`DualPic8259::port_write_u8`], and the
//! CPU-facing path calls [`DualPic8259::resolve_vector`] whenever the output line is asserted.

mod chip;
mod config;
mod error;
pub mod irq;
pub mod pic8259;
mod ports;
mod protocol;
mod snapshot;
mod stats;

pub use chip::{ChipPosition, ChipState};
pub use config::PicConfig;
pub use error::PicError;
pub use irq::{IrqLine, NoIrq, PicIrqLevelSink};
pub use pic8259::{
    DualPic8259, MASTER_CMD, MASTER_DATA, MASTER_ELCR, SLAVE_CMD, SLAVE_DATA, SLAVE_ELCR,
};
pub use ports::PicPort;
pub use stats::IrqStats;
