//! Hardware telemetry sampling: CPU and memory via `sysinfo`, GPU via
//! shelling out to `nvidia-smi` (absent on non-NVIDIA systems, in which case
//! GPU usage reads zero).

use std::process::Command;
use sysinfo::{CpuRefreshKind, RefreshKind, System};
use tracing::debug;

pub struct Sample {
    pub cpu_percent: i64,
    pub mem_percent: i64,
    pub gpu_percent: i64,
}

pub struct MetricsProbe {
    system: System,
}

impl MetricsProbe {
    pub fn new() -> Self {
        let system = System::new_with_specifics(RefreshKind::new().with_cpu(CpuRefreshKind::everything()));
        Self { system }
    }

    /// Refresh and sample current CPU/mem/GPU usage, rounded to whole
    /// percent points to match the wire format's integer fields.
    pub fn sample(&mut self) -> Sample {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();

        let cpu_percent = self.system.global_cpu_info().cpu_usage().round() as i64;
        let mem_percent = if self.system.total_memory() == 0 {
            0
        } else {
            ((self.system.used_memory() as f64 / self.system.total_memory() as f64) * 100.0).round() as i64
        };
        let gpu_percent = gpu_usage().unwrap_or(0);

        Sample { cpu_percent, mem_percent, gpu_percent }
    }
}

fn gpu_usage() -> Option<i64> {
    let output = Command::new("nvidia-smi")
        .args(["--query-gpu=utilization.gpu", "--format=csv,noheader,nounits"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout);
    match text.trim().parse::<f64>() {
        Ok(value) => Some(value.round() as i64),
        Err(err) => {
            debug!(error = %err, "could not parse nvidia-smi output");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_produces_bounded_percentages() {
        let mut probe = MetricsProbe::new();
        let sample = probe.sample();
        assert!(sample.cpu_percent >= 0);
        assert!(sample.mem_percent >= 0 && sample.mem_percent <= 100);
    }
}
