#![forbid(unsafe_code)]

//! Machine-side wiring for the cascaded PIC pair: the port I/O bus it sits on, the latches
//! device code reports resets and fatal faults through, and the CPU-facing controller seam.

pub mod fault;
pub mod interrupts;
pub mod io;
pub mod pic8259;
pub mod reset;
