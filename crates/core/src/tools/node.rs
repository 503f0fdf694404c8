// crates/core/src/tools/node.rs
//! npm/yarn/pnpm registry and proxy configuration.
//!
//! Each package manager is configured independently and silently skipped
//! when not installed, so a pnpm-less machine still gets its npm config.

use crate::command::{is_installed, run_streamed, run_tolerant};
use crate::console::Console;
use crate::error::ToolError;

const NODE_TOOLS: &[&str] = &["npm", "yarn", "pnpm"];

pub const NODE_MIRRORS: &[(&str, &str)] = &[
    ("taobao", "https://registry.npmmirror.com"),
    ("tencent", "https://mirrors.cloud.tencent.com/npm/"),
];

pub fn node_mirror_url(source: &str) -> &'static str {
    NODE_MIRRORS
        .iter()
        .find(|(name, _)| *name == source)
        .map(|(_, url)| *url)
        .unwrap_or(NODE_MIRRORS[0].1)
}

/// Set the registry mirror for every installed node package manager.
pub async fn set_node_mirror(source: &str, console: &dyn Console) -> Result<(), ToolError> {
    let url = node_mirror_url(source);
    console.info(&format!("switching node package managers to mirror ({source})..."));
    let mut configured = 0;
    for tool in NODE_TOOLS {
        if !is_installed(tool).await {
            continue;
        }
        run_streamed(tool, &["config", "set", "registry", url], console).await?;
        console.success(&format!("{tool} registry set: {url}"));
        configured += 1;
    }
    if configured == 0 {
        console.warning("no node package manager found, nothing configured");
    }
    Ok(())
}

/// Route every installed node package manager through the local proxy.
pub async fn set_node_proxy(port: u16, console: &dyn Console) -> Result<(), ToolError> {
    let proxy = format!("http://127.0.0.1:{port}");
    console.info(&format!("configuring node proxy: {proxy}..."));
    for tool in NODE_TOOLS {
        if !is_installed(tool).await {
            continue;
        }
        run_streamed(tool, &["config", "set", "proxy", &proxy], console).await?;
        run_streamed(tool, &["config", "set", "https-proxy", &proxy], console).await?;
    }
    console.success("node proxy configured");
    Ok(())
}

/// Restore npm/yarn/pnpm defaults.
pub async fn unset_node_config(console: &dyn Console) {
    console.info("restoring node package manager defaults...");
    for tool in NODE_TOOLS {
        if !is_installed(tool).await {
            continue;
        }
        for key in ["registry", "proxy", "https-proxy"] {
            run_tolerant(tool, &["config", "delete", key], console).await;
        }
    }
    console.success("node package managers restored to defaults");
}
