use thiserror::Error;

use crate::chip::ChipPosition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PicError {
    /// ICW1 with LTIM set. PC chipsets select trigger mode per line through the ELCR instead,
    /// and the controller cannot emulate a globally level-triggered chip.
    #[error("{chip} PIC: level sensitive irq not supported (ICW1={value:#04x})")]
    LevelTriggeredInit { chip: ChipPosition, value: u8 },
}
