use sysinfo::System;

const GIB: u64 = 1024 * 1024 * 1024;

/// Machines at or below this many logical CPUs are treated as constrained
pub const CONSTRAINED_CPU_COUNT: usize = 2;
/// Less available memory than this is treated as constrained
pub const CONSTRAINED_MEMORY_BYTES: u64 = 2 * GIB;

/// Snapshot of the resources available to a detection session.
///
/// On constrained machines the sampling rate is capped so the detector is
/// not starved by frames it can never catch up on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutionBudget {
    pub cpu_count: usize,
    pub available_memory: u64,
}

impl ExecutionBudget {
    /// Read CPU and memory of the current machine
    pub fn detect() -> Self {
        let mut system = System::new();
        system.refresh_memory();
        system.refresh_cpu();

        let cpu_count = match system.cpus().len() {
            0 => std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
            n => n,
        };
        let budget = Self {
            cpu_count,
            available_memory: system.available_memory(),
        };

        tracing::debug!(
            "Execution budget: {} CPUs, {:.1} GiB available{}",
            budget.cpu_count,
            budget.available_memory as f64 / GIB as f64,
            if budget.is_constrained() { " (constrained)" } else { "" }
        );
        budget
    }

    /// A budget that never caps the rate
    pub fn unconstrained() -> Self {
        Self {
            cpu_count: usize::MAX,
            available_memory: u64::MAX,
        }
    }

    pub fn is_constrained(&self) -> bool {
        self.cpu_count <= CONSTRAINED_CPU_COUNT || self.available_memory < CONSTRAINED_MEMORY_BYTES
    }

    /// Sampling rate to actually use for a requested rate
    pub fn effective_fps(&self, requested: f64, constrained_cap: f64) -> f64 {
        if self.is_constrained() && constrained_cap > 0.0 && requested > constrained_cap {
            tracing::info!(
                "Constrained environment: sampling at {:.1} fps instead of {:.1}",
                constrained_cap,
                requested
            );
            constrained_cap
        } else {
            requested
        }
    }
}
