// crates/core/src/tools/python.rs
//! pip and conda mirror/proxy configuration.

use crate::command::{run_streamed, run_tolerant};
use crate::console::Console;
use crate::error::ToolError;

pub const PIP_MIRRORS: &[(&str, &str)] = &[
    ("tsinghua", "https://pypi.tuna.tsinghua.edu.cn/simple"),
    ("aliyun", "https://mirrors.aliyun.com/pypi/simple/"),
];

/// Default pip mirror index used across the env-creation helpers.
pub const DEFAULT_PIP_MIRROR: &str = "https://pypi.tuna.tsinghua.edu.cn/simple";

pub fn pip_mirror_url(source: &str) -> &'static str {
    PIP_MIRRORS
        .iter()
        .find(|(name, _)| *name == source)
        .map(|(_, url)| *url)
        .unwrap_or(DEFAULT_PIP_MIRROR)
}

/// Point pip at a mirror index, clearing any proxy first.
pub async fn set_pip_mirror(source: &str, console: &dyn Console) -> Result<(), ToolError> {
    let url = pip_mirror_url(source);
    console.info(&format!("switching pip to mirror mode ({source})..."));
    run_tolerant("pip", &["config", "unset", "global.proxy"], console).await;
    run_streamed("pip", &["config", "set", "global.index-url", url], console).await?;
    console.success("pip mirror mode configured");
    Ok(())
}

/// Point pip at the official index through the local proxy.
pub async fn set_pip_proxy(port: u16, console: &dyn Console) -> Result<(), ToolError> {
    console.info("switching pip to proxy mode (official index + proxy)...");
    run_tolerant("pip", &["config", "unset", "global.index-url"], console).await;
    let proxy = format!("http://127.0.0.1:{port}");
    run_streamed("pip", &["config", "set", "global.proxy", &proxy], console).await?;
    console.success(&format!("pip proxy mode configured (port {port})"));
    Ok(())
}

/// Restore pip defaults.
pub async fn unset_pip_config(console: &dyn Console) {
    console.info("restoring pip defaults...");
    run_tolerant("pip", &["config", "unset", "global.index-url"], console).await;
    run_tolerant("pip", &["config", "unset", "global.proxy"], console).await;
    console.success("pip restored to defaults");
}

const CONDA_MIRROR_CHANNELS: &[&str] = &[
    "https://mirrors.tuna.tsinghua.edu.cn/anaconda/pkgs/free/",
    "https://mirrors.tuna.tsinghua.edu.cn/anaconda/pkgs/main/",
    "https://mirrors.tuna.tsinghua.edu.cn/anaconda/cloud/conda-forge/",
];

/// Point conda at the TUNA mirror channels.
pub async fn set_conda_mirror(console: &dyn Console) -> Result<(), ToolError> {
    console.info("switching conda to mirror mode (TUNA channels)...");
    run_tolerant("conda", &["config", "--set", "show_channel_urls", "yes"], console).await;
    run_tolerant("conda", &["config", "--remove-key", "channels"], console).await;
    run_tolerant("conda", &["config", "--remove-key", "proxy_servers"], console).await;
    for channel in CONDA_MIRROR_CHANNELS {
        run_streamed("conda", &["config", "--add", "channels", channel], console).await?;
    }
    console.success("conda mirror mode configured");
    Ok(())
}

/// Point conda at the default channels through the local proxy.
pub async fn set_conda_proxy(port: u16, console: &dyn Console) -> Result<(), ToolError> {
    console.info("switching conda to proxy mode (official channels + proxy)...");
    run_tolerant("conda", &["config", "--remove-key", "channels"], console).await;
    run_tolerant("conda", &["config", "--add", "channels", "defaults"], console).await;
    let proxy = format!("http://127.0.0.1:{port}");
    run_streamed(
        "conda",
        &["config", "--set", "proxy_servers.http", &proxy],
        console,
    )
    .await?;
    run_streamed(
        "conda",
        &["config", "--set", "proxy_servers.https", &proxy],
        console,
    )
    .await?;
    console.success(&format!("conda proxy mode configured (port {port})"));
    Ok(())
}

/// Restore conda defaults.
pub async fn unset_conda_config(console: &dyn Console) {
    console.info("restoring conda defaults...");
    run_tolerant("conda", &["config", "--remove-key", "channels"], console).await;
    run_tolerant("conda", &["config", "--remove-key", "proxy_servers"], console).await;
    run_tolerant("conda", &["config", "--add", "channels", "defaults"], console).await;
    console.success("conda restored to defaults");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_mirror_sources_resolve() {
        assert!(pip_mirror_url("tsinghua").contains("tuna"));
        assert!(pip_mirror_url("aliyun").contains("aliyun"));
    }

    #[test]
    fn unknown_source_falls_back_to_default() {
        assert_eq!(pip_mirror_url("nope"), DEFAULT_PIP_MIRROR);
    }
}
