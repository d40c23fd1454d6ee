use crate::chip::ChipPosition;
use crate::config::PicConfig;

/// A register window of one chip, as decoded from an absolute I/O port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PicPort {
    Command(ChipPosition),
    Data(ChipPosition),
    Elcr(ChipPosition),
}

impl PicPort {
    pub fn decode(config: &PicConfig, port: u16) -> Option<Self> {
        use ChipPosition::{Primary, Secondary};

        let windows = [
            (config.primary_base, Primary),
            (config.secondary_base, Secondary),
        ];
        for (base, chip) in windows {
            match port.wrapping_sub(base) {
                0 => return Some(Self::Command(chip)),
                1 => return Some(Self::Data(chip)),
                _ => {}
            }
        }

        if config.primary_elcr_port == Some(port) {
            return Some(Self::Elcr(Primary));
        }
        if config.secondary_elcr_port == Some(port) {
            return Some(Self::Elcr(Secondary));
        }
        None
    }

    pub fn chip(self) -> ChipPosition {
        match self {
            Self::Command(chip) | Self::Data(chip) | Self::Elcr(chip) => chip,
        }
    }
}

impl PicConfig {
    /// Every port this configuration decodes.
    pub fn ports(&self) -> Vec<u16> {
        let mut ports = vec![
            self.primary_base,
            self.primary_base.wrapping_add(1),
            self.secondary_base,
            self.secondary_base.wrapping_add(1),
        ];
        ports.extend(self.primary_elcr_port);
        ports.extend(self.secondary_elcr_port);
        ports
    }
}
