use std::fmt;

const NUM_IRQS: usize = 16;

/// Per-line assertion counters for the sixteen ISA IRQs.
///
/// Line levels are always tracked so that enabling the counters mid-run only counts real
/// rising edges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IrqStats {
    enabled: bool,
    levels: u16,
    counts: [u64; NUM_IRQS],
}

impl IrqStats {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub(crate) fn record(&mut self, irq: u8, level: bool) {
        let bit = 1u16 << (irq & 0xF);
        let was_high = self.levels & bit != 0;
        if level {
            self.levels |= bit;
        } else {
            self.levels &= !bit;
        }
        if self.enabled && level && !was_high {
            self.counts[usize::from(irq & 0xF)] += 1;
        }
    }

    pub fn count(&self, irq: u8) -> u64 {
        self.counts.get(usize::from(irq)).copied().unwrap_or(0)
    }

    pub fn counts(&self) -> &[u64; NUM_IRQS] {
        &self.counts
    }

    pub fn clear_counts(&mut self) {
        self.counts = [0; NUM_IRQS];
    }
}

impl fmt::Display for IrqStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.enabled {
            return writeln!(f, "irq statistics disabled");
        }
        writeln!(f, "IRQ statistics:")?;
        for (irq, count) in self.counts.iter().enumerate() {
            if *count > 0 {
                writeln!(f, "{irq:2}: {count}")?;
            }
        }
        Ok(())
    }
}
