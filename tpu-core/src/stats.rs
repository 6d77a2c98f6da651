//! Cycle/utilization counters and the derived performance metrics

use std::fmt;
use std::fmt::{Display, Formatter};

/// Fixed model clock used to convert cycle counts into wall time.
pub const MODEL_CLOCK_HZ: f64 = 500.0 * 1e6;

/// One 16x16x16 pass, counting each multiply-accumulate as 2 ops.
pub const OPS_PER_MMC: u64 = 16 * 16 * 16 * 2;

/// Monotonic counters sampled by the tick loop. Utilization counters are
/// sampled from the busy flags before components advance each cycle.
#[derive(Debug, Clone, Default)]
pub struct PerformanceStats {
    pub total_cycles: u64,
    pub instruction_count: u64,
    pub stall_cycles: u64,
    pub host_busy_cycles: u64,
    pub ub_busy_cycles: u64,
    pub acc_busy_cycles: u64,
    pub mxu_busy_cycles: u64,
    pub mmc_count: u64,
}

impl PerformanceStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cpi(&self) -> f64 {
        self.total_cycles as f64 / self.instruction_count as f64
    }

    pub fn stall_percent(&self) -> f64 {
        self.percent_of_total(self.stall_cycles)
    }

    pub fn percent_of_total(&self, cycles: u64) -> f64 {
        cycles as f64 / self.total_cycles as f64 * 100.0
    }

    pub fn total_macs(&self) -> u64 {
        self.mmc_count * (OPS_PER_MMC / 2)
    }

    pub fn simulated_seconds(&self) -> f64 {
        self.total_cycles as f64 / MODEL_CLOCK_HZ
    }

    pub fn effective_gops(&self) -> f64 {
        (self.mmc_count * OPS_PER_MMC) as f64 / self.simulated_seconds() / 1e9
    }
}

impl Display for PerformanceStats {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- PERFORMANCE REPORT ---")?;

        if self.total_cycles == 0 || self.instruction_count == 0 {
            writeln!(f, "No operations performed.")?;
            return write!(f, "--- END OF REPORT ---");
        }

        writeln!(f, "Core Metrics:")?;
        writeln!(f, "  Total Cycles:       {}", self.total_cycles)?;
        writeln!(f, "  Instructions Exec:  {}", self.instruction_count)?;
        writeln!(f, "  Cycles Per Instr (CPI): {:.2}", self.cpi())?;

        writeln!(f, "\nStall Analysis:")?;
        writeln!(
            f,
            "  Controller Stall Cycles: {} ({:.2} % of total)",
            self.stall_cycles,
            self.stall_percent()
        )?;

        writeln!(f, "\nComponent Utilization:")?;
        for (label, cycles) in [
            ("Host Memory Bus", self.host_busy_cycles),
            ("Unified Buffer (UB)", self.ub_busy_cycles),
            ("Accumulator (ACC)", self.acc_busy_cycles),
            ("Matrix Unit (MXU)", self.mxu_busy_cycles),
        ] {
            writeln!(f, "  {label}: {cycles} cycles ({:.2} %)", self.percent_of_total(cycles))?;
        }

        writeln!(f, "\nPerformance (Assuming {} MHz Clock):", MODEL_CLOCK_HZ / 1e6)?;
        writeln!(f, "  Total Operations (MACs): {}", self.total_macs())?;
        writeln!(f, "  Total Time:          {:.2} us", self.simulated_seconds() * 1e6)?;
        writeln!(f, "  Effective GOPS:      {:.2}", self.effective_gops())?;
        write!(f, "--- END OF REPORT ---")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_stats() -> PerformanceStats {
        PerformanceStats {
            total_cycles: 1000,
            instruction_count: 50,
            stall_cycles: 250,
            host_busy_cycles: 400,
            ub_busy_cycles: 100,
            acc_busy_cycles: 50,
            mxu_busy_cycles: 320,
            mmc_count: 10,
        }
    }

    #[test]
    fn derived_metrics() {
        let stats = sample_stats();

        assert!((stats.cpi() - 20.0).abs() < 1e-9);
        assert!((stats.stall_percent() - 25.0).abs() < 1e-9);
        assert!((stats.percent_of_total(stats.mxu_busy_cycles) - 32.0).abs() < 1e-9);
        assert_eq!(stats.total_macs(), 10 * 4096);

        // 1000 cycles at 500 MHz = 2 microseconds
        assert!((stats.simulated_seconds() - 2e-6).abs() < 1e-15);

        // 10 * 8192 ops in 2 us = 40.96 GOPS
        assert!((stats.effective_gops() - 40.96).abs() < 1e-9);
    }

    #[test]
    fn report_includes_every_counter() {
        let report = sample_stats().to_string();

        assert!(report.contains("Total Cycles:       1000"));
        assert!(report.contains("Instructions Exec:  50"));
        assert!(report.contains("CPI): 20.00"));
        assert!(report.contains("Stall Cycles: 250 (25.00 % of total)"));
        assert!(report.contains("Matrix Unit (MXU): 320 cycles (32.00 %)"));
        assert!(report.contains("Total Operations (MACs): 40960"));
        assert!(report.contains("Effective GOPS:      40.96"));
    }

    #[test]
    fn empty_run_report() {
        let report = PerformanceStats::new().to_string();
        assert!(report.contains("No operations performed."));
    }
}
