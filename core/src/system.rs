// Simulated system metrics
//
// cpu and ram are the two volatile fields rewritten on every push tick.

use rand::Rng;
use std::ops::Range;

use crate::snapshot::SystemSummary;

pub const CPU_RANGE: Range<u32> = 10..40;
pub const RAM_RANGE: Range<u32> = 40..60;

/// One reading of the volatile system fields
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SystemSample {
    pub cpu: u32,
    pub ram: u32,
}

impl SystemSample {
    pub fn apply(self, system: &mut SystemSummary) {
        system.cpu = self.cpu;
        system.ram = self.ram;
    }
}

/// Source of cpu/ram readings for push ticks
pub trait VolatileMetrics: Send + Sync {
    fn sample(&self) -> SystemSample;
}

/// Uniform random readings in half-open ranges
#[derive(Clone, Debug)]
pub struct RandomMetrics {
    cpu: Range<u32>,
    ram: Range<u32>,
}

impl RandomMetrics {
    pub fn new() -> Self {
        Self {
            cpu: CPU_RANGE,
            ram: RAM_RANGE,
        }
    }
}

impl Default for RandomMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl VolatileMetrics for RandomMetrics {
    fn sample(&self) -> SystemSample {
        let mut rng = rand::thread_rng();
        SystemSample {
            cpu: rng.gen_range(self.cpu.clone()),
            ram: rng.gen_range(self.ram.clone()),
        }
    }
}
