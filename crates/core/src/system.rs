// crates/core/src/system.rs
//! Hardware/OS probe backing the suite installer's hardware adaptation.

use std::process::Stdio;

use regex_lite::Regex;
use serde::Serialize;
use sysinfo::System;
use tokio::process::Command;

/// Point-in-time hardware and OS report.
#[derive(Debug, Clone, Serialize)]
pub struct SystemReport {
    pub os: String,
    pub arch: String,
    pub gpu: String,
    pub cuda: Option<String>,
    pub recommendation: String,
}

impl SystemReport {
    /// The arch check keeps Intel Macs out.
    pub fn is_apple_silicon(&self) -> bool {
        (self.os.contains("macOS") || self.os.contains("Darwin")) && self.arch == "aarch64"
    }

    pub fn is_windows(&self) -> bool {
        self.os.contains("Windows")
    }
}

/// Extract `CUDA Version: 12.4` from `nvidia-smi` banner output.
fn parse_cuda_version(output: &str) -> Option<String> {
    let re = Regex::new(r"CUDA Version:\s*(\d+\.\d+)").expect("valid CUDA regex");
    re.captures(output)
        .map(|caps| caps[1].to_string())
}

async fn probe_nvidia() -> Option<String> {
    let output = Command::new("nvidia-smi")
        .stdin(Stdio::null())
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    parse_cuda_version(&String::from_utf8_lossy(&output.stdout))
}

fn build_recommendation(report_os: &str, gpu: &str, cuda: &Option<String>) -> String {
    let mut parts = Vec::new();
    if let Some(version) = cuda {
        parts.push(format!(
            "NVIDIA GPU detected (CUDA {version}); GPU-accelerated builds recommended."
        ));
    } else if gpu.contains("Apple Silicon") {
        parts.push("Apple Silicon detected; MPS (Metal) builds recommended.".to_string());
    } else {
        parts.push("No discrete GPU detected; CPU builds or lightweight models recommended.".to_string());
    }
    if report_os.contains("Windows") {
        parts.push("On Windows, consider WSL2 for large training jobs.".to_string());
    }
    parts.join(" ")
}

/// Detect OS, architecture, GPU and CUDA availability.
pub async fn probe() -> SystemReport {
    let os = System::long_os_version().unwrap_or_else(|| std::env::consts::OS.to_string());
    let arch = std::env::consts::ARCH.to_string();

    let cuda = probe_nvidia().await;
    let gpu = if cuda.is_some() {
        "NVIDIA (discrete)".to_string()
    } else if cfg!(all(target_os = "macos", target_arch = "aarch64")) {
        "Apple Silicon (Metal)".to_string()
    } else {
        "Integrated / Unknown".to_string()
    };

    let recommendation = build_recommendation(&os, &gpu, &cuda);
    SystemReport {
        os,
        arch,
        gpu,
        cuda,
        recommendation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cuda_version_from_banner() {
        let banner = "| NVIDIA-SMI 550.54  Driver Version: 550.54  CUDA Version: 12.4     |";
        assert_eq!(parse_cuda_version(banner), Some("12.4".to_string()));
    }

    #[test]
    fn no_cuda_in_unrelated_output() {
        assert_eq!(parse_cuda_version("command not found"), None);
    }

    #[test]
    fn recommendation_prefers_cuda() {
        let rec = build_recommendation("Linux 6.1", "NVIDIA (discrete)", &Some("12.4".into()));
        assert!(rec.contains("CUDA 12.4"));
    }

    #[test]
    fn recommendation_mentions_wsl_on_windows() {
        let rec = build_recommendation("Windows 11", "Integrated / Unknown", &None);
        assert!(rec.contains("WSL2"));
    }
}
