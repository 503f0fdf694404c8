// crates/core/src/tools/git.rs
//! Git smart proxy: only github.com traffic goes through the local proxy.

use crate::command::{run_streamed, run_tolerant};
use crate::console::Console;
use crate::error::ToolError;

const GITHUB_PROXY_KEY: &str = "http.https://github.com.proxy";

/// Route github.com (and only github.com) through the local proxy,
/// clearing any blanket proxy first.
pub async fn set_git_proxy(port: u16, console: &dyn Console) -> Result<(), ToolError> {
    console.info(&format!(
        "configuring git smart proxy (GitHub via localhost:{port})..."
    ));
    run_tolerant("git", &["config", "--global", "--unset", "http.proxy"], console).await;
    run_tolerant("git", &["config", "--global", "--unset", "https.proxy"], console).await;
    let proxy = format!("http://127.0.0.1:{port}");
    run_streamed(
        "git",
        &["config", "--global", GITHUB_PROXY_KEY, &proxy],
        console,
    )
    .await?;
    console.success(&format!("git configured: only github.com uses port {port}"));
    Ok(())
}

/// Remove every proxy entry this tool may have written.
pub async fn unset_git_proxy(console: &dyn Console) {
    console.info("clearing git proxy configuration...");
    run_tolerant("git", &["config", "--global", "--unset", "http.proxy"], console).await;
    run_tolerant("git", &["config", "--global", "--unset", "https.proxy"], console).await;
    run_tolerant("git", &["config", "--global", "--unset", GITHUB_PROXY_KEY], console).await;
    console.success("git proxy cleared");
}
