//! Execution-frequency profiling.
//!
//! When profiling is enabled, the harness samples the program counter before
//! every step into a [`Heatmap`], stopping once the configured cycle budget
//! is spent. The heatmap feeds [`report::write_profile`].
//!
//! [`report::write_profile`]: crate::report::write_profile

use super::mem::MEM_SIZE;

/// Per-address execution counters.
pub struct Heatmap {
    counts: Box<[u32; MEM_SIZE]>,
}

impl Heatmap {
    /// Creates a heatmap with all counters at zero.
    pub fn new() -> Self {
        Self {
            counts: vec![0u32; MEM_SIZE]
                .into_boxed_slice()
                .try_into()
                .unwrap_or_else(|_| unreachable!("vec should have had {MEM_SIZE} elements")),
        }
    }

    /// Counts one visit of the program counter at `addr`.
    pub fn record(&mut self, addr: u16) {
        self.counts[usize::from(addr)] += 1;
    }

    /// The number of recorded visits at `addr`.
    pub fn count(&self, addr: u16) -> u32 {
        self.counts[usize::from(addr)]
    }
}

impl Default for Heatmap {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Heatmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let nonzero = self.counts.iter().filter(|&&c| c != 0).count();
        f.debug_struct("Heatmap")
            .field("nonzero_addresses", &nonzero)
            .finish_non_exhaustive()
    }
}

/// Program-counter sampler with a cycle budget.
///
/// Attached to the harness by [`Harness::enable_profiling`]; one budget unit
/// is spent per executed step.
///
/// [`Harness::enable_profiling`]: super::Harness::enable_profiling
#[derive(Debug)]
pub struct Profiler {
    heatmap: Heatmap,
    budget: u64,
}

impl Profiler {
    /// Creates a profiler with a fresh heatmap and the given cycle budget.
    pub fn new(budget: u64) -> Self {
        Self { heatmap: Heatmap::new(), budget }
    }

    /// The heatmap accumulated so far.
    pub fn heatmap(&self) -> &Heatmap {
        &self.heatmap
    }

    /// The number of budget units left to spend.
    pub fn remaining(&self) -> u64 {
        self.budget
    }

    /// Accounts for one step about to execute at `pc`.
    ///
    /// Returns `false` without recording anything if the budget is already
    /// exhausted; otherwise spends one unit and records the visit.
    pub(crate) fn begin_step(&mut self, pc: u16) -> bool {
        if self.budget == 0 {
            return false;
        }
        self.budget -= 1;
        self.heatmap.record(pc);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{Heatmap, Profiler};

    #[test]
    fn test_heatmap_counts() {
        let mut hm = Heatmap::new();
        hm.record(0x0100);
        hm.record(0x0100);
        hm.record(0xFFFF);
        assert_eq!(hm.count(0x0100), 2);
        assert_eq!(hm.count(0xFFFF), 1);
        assert_eq!(hm.count(0x0000), 0);
    }

    #[test]
    fn test_budget_spent_per_step() {
        let mut prof = Profiler::new(2);
        assert!(prof.begin_step(0x10));
        assert!(prof.begin_step(0x11));
        assert_eq!(prof.remaining(), 0);

        // Exhausted: nothing further is recorded.
        assert!(!prof.begin_step(0x12));
        assert_eq!(prof.heatmap().count(0x10), 1);
        assert_eq!(prof.heatmap().count(0x11), 1);
        assert_eq!(prof.heatmap().count(0x12), 0);
    }

    #[test]
    fn test_zero_budget_records_nothing() {
        let mut prof = Profiler::new(0);
        assert!(!prof.begin_step(0x10));
        assert_eq!(prof.heatmap().count(0x10), 0);
    }
}
