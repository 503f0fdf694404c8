// crates/core/src/tools/go.rs
//! GOPROXY configuration.

use crate::command::{is_installed, run_streamed, run_tolerant};
use crate::console::Console;
use crate::error::ToolError;

pub const GO_PROXIES: &[(&str, &str)] = &[
    ("goproxy.cn", "https://goproxy.cn,direct"),
    ("aliyun", "https://mirrors.aliyun.com/goproxy/,direct"),
];

pub fn go_proxy_url(source: &str) -> &'static str {
    GO_PROXIES
        .iter()
        .find(|(name, _)| *name == source)
        .map(|(_, url)| *url)
        .unwrap_or(GO_PROXIES[0].1)
}

/// Set GOPROXY; a missing go toolchain is a skip, not a failure.
pub async fn set_go_proxy(source: &str, console: &dyn Console) -> Result<(), ToolError> {
    let url = go_proxy_url(source);
    console.info(&format!("configuring GOPROXY as {url}..."));
    if !is_installed("go").await {
        console.warning("go toolchain not found, skipping");
        return Ok(());
    }
    run_streamed("go", &["env", "-w", &format!("GOPROXY={url}")], console).await?;
    console.success("GOPROXY configured");
    Ok(())
}

/// Restore the default GOPROXY.
pub async fn unset_go_proxy(console: &dyn Console) {
    console.info("restoring go defaults...");
    if is_installed("go").await {
        run_tolerant("go", &["env", "-u", "GOPROXY"], console).await;
        console.success("go restored to defaults");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_sources_resolve_with_fallback() {
        assert!(go_proxy_url("goproxy.cn").starts_with("https://goproxy.cn"));
        assert!(go_proxy_url("aliyun").contains("aliyun"));
        assert_eq!(go_proxy_url("unknown"), GO_PROXIES[0].1);
    }
}
