//! Host Profile Detector (spec §4.G).
//!
//! Tiering thresholds are taken verbatim from
//! `original_source/src/utils/system_detector.py::assess_capabilities`,
//! which spec.md names but does not quantify.

use serde::{Deserialize, Serialize};
use sysinfo::System;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PerformanceTier {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LlmSize {
    Tiny,
    Small,
    Medium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SttSize {
    Base,
    Small,
    Medium,
}

/// The optimization block consumed by engines in §4.A.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizationBlock {
    pub thread_count: usize,
    pub gpu_layer_count: u32,
    pub lock_memory: bool,
}

/// Detected host characteristics plus the derived recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostProfile {
    pub os: String,
    pub arch: String,
    pub total_ram_mb: u64,
    pub available_ram_mb: u64,
    pub logical_cpu_count: usize,
    pub has_gpu: bool,
    pub is_single_board_computer: bool,
    pub performance_tier: PerformanceTier,
    pub llm_size: LlmSize,
    pub stt_size: SttSize,
    pub max_context_tokens: u32,
    pub can_run_local_llm: bool,
    pub can_run_local_tts: bool,
    pub optimization: OptimizationBlock,
}

impl HostProfile {
    /// Detect the current host and derive the full recommendation block.
    pub fn detect() -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();

        let total_ram_mb = sys.total_memory() / (1024 * 1024);
        let available_ram_mb = sys.available_memory() / (1024 * 1024);
        let logical_cpu_count = sys.cpus().len().max(1);
        let has_gpu = detect_gpu();
        let is_single_board_computer = is_single_board_computer();

        Self::assess(
            std::env::consts::OS.to_string(),
            std::env::consts::ARCH.to_string(),
            total_ram_mb,
            available_ram_mb,
            logical_cpu_count,
            has_gpu,
            is_single_board_computer,
        )
    }

    /// Pure function over the detected inputs, so the tiering rule is
    /// independently unit-testable without touching the real host.
    pub fn assess(
        os: String,
        arch: String,
        total_ram_mb: u64,
        available_ram_mb: u64,
        logical_cpu_count: usize,
        has_gpu: bool,
        is_single_board_computer: bool,
    ) -> Self {
        let total_ram_gb = total_ram_mb as f64 / 1024.0;

        let (performance_tier, llm_size, max_context_tokens) = if is_single_board_computer {
            if total_ram_gb >= 8.0 {
                (PerformanceTier::Medium, LlmSize::Small, 4096)
            } else {
                (PerformanceTier::Low, LlmSize::Tiny, 2048)
            }
        } else if total_ram_gb >= 16.0 && has_gpu {
            (PerformanceTier::High, LlmSize::Medium, 8192)
        } else if total_ram_gb >= 8.0 {
            (PerformanceTier::Medium, LlmSize::Small, 4096)
        } else {
            (PerformanceTier::Low, LlmSize::Tiny, 2048)
        };

        let stt_size = match llm_size {
            LlmSize::Tiny => SttSize::Base,
            LlmSize::Small => SttSize::Small,
            LlmSize::Medium => SttSize::Medium,
        };

        let can_run_local_llm = available_ram_mb >= 2 * 1024;
        let can_run_local_tts = available_ram_mb >= 4 * 1024;

        let optimization = OptimizationBlock {
            thread_count: logical_cpu_count,
            gpu_layer_count: if has_gpu { 32 } else { 0 },
            lock_memory: is_single_board_computer,
        };

        Self {
            os,
            arch,
            total_ram_mb,
            available_ram_mb,
            logical_cpu_count,
            has_gpu,
            is_single_board_computer,
            performance_tier,
            llm_size,
            stt_size,
            max_context_tokens,
            can_run_local_llm,
            can_run_local_tts,
            optimization,
        }
    }
}

/// Best-effort GPU probe via `nvidia-smi`, consistent with the original's
/// subprocess fallback. CUDA/ROCm/Metal presence collapses to a single
/// boolean since the core doesn't branch further on vendor.
fn detect_gpu() -> bool {
    std::process::Command::new("nvidia-smi")
        .arg("-L")
        .output()
        .map(|out| out.status.success() && !out.stdout.is_empty())
        .unwrap_or(false)
}

/// Checks `/proc/cpuinfo` for "raspberry pi"/"bcm", falling back to the
/// build target architecture starting with "arm"/"aarch64".
fn is_single_board_computer() -> bool {
    if let Ok(cpuinfo) = std::fs::read_to_string("/proc/cpuinfo") {
        let lower = cpuinfo.to_lowercase();
        if lower.contains("raspberry pi") || lower.contains("bcm") {
            return true;
        }
    }
    let arch = std::env::consts::ARCH;
    arch.starts_with("arm") || arch.starts_with("aarch64")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sbc_with_plenty_ram_is_medium() {
        let profile = HostProfile::assess("linux".into(), "aarch64".into(), 8192, 6000, 4, false, true);
        assert_eq!(profile.performance_tier, PerformanceTier::Medium);
        assert_eq!(profile.llm_size, LlmSize::Small);
        assert_eq!(profile.max_context_tokens, 4096);
    }

    #[test]
    fn sbc_with_little_ram_is_low() {
        let profile = HostProfile::assess("linux".into(), "arm".into(), 2048, 1000, 4, false, true);
        assert_eq!(profile.performance_tier, PerformanceTier::Low);
        assert_eq!(profile.llm_size, LlmSize::Tiny);
        assert!(!profile.can_run_local_llm);
    }

    #[test]
    fn desktop_with_gpu_and_lots_of_ram_is_high() {
        let profile = HostProfile::assess("linux".into(), "x86_64".into(), 32768, 20000, 16, true, false);
        assert_eq!(profile.performance_tier, PerformanceTier::High);
        assert_eq!(profile.llm_size, LlmSize::Medium);
        assert_eq!(profile.max_context_tokens, 8192);
    }

    #[test]
    fn desktop_without_gpu_mid_ram_is_medium() {
        let profile = HostProfile::assess("linux".into(), "x86_64".into(), 8192, 5000, 8, false, false);
        assert_eq!(profile.performance_tier, PerformanceTier::Medium);
    }

    #[test]
    fn desktop_low_ram_is_low() {
        let profile = HostProfile::assess("linux".into(), "x86_64".into(), 4096, 1500, 4, false, false);
        assert_eq!(profile.performance_tier, PerformanceTier::Low);
        assert!(!profile.can_run_local_tts);
    }
}
