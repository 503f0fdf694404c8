// crates/core/src/tools/hosts.rs
//! GitHub hosts refresh: splice the GitHub520 block into the system hosts
//! file and flush the DNS cache.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::command::run_tolerant;
use crate::console::Console;
use crate::error::ToolError;
use crate::outcome::Outcome;

const HOSTS_URL: &str = "https://raw.githubusercontent.com/521xueweihan/GitHub520/main/hosts";
const START_MARKER: &str = "# Start GitHub520 Host";
const END_MARKER: &str = "# End GitHub520 Host";
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

pub fn hosts_path() -> PathBuf {
    if cfg!(target_os = "windows") {
        PathBuf::from(r"C:\Windows\System32\drivers\etc\hosts")
    } else {
        PathBuf::from("/etc/hosts")
    }
}

/// Replace the managed block between the markers, or append one.
pub fn splice_hosts_block(current: &str, fresh_block: &str) -> String {
    let block = format!("\n{START_MARKER}\n{fresh_block}\n{END_MARKER}\n");
    match (current.find(START_MARKER), current.rfind(END_MARKER)) {
        (Some(start), Some(end)) if end >= start => {
            let after = &current[end + END_MARKER.len()..];
            format!("{}{}{}", &current[..start], block.trim_start_matches('\n'), after)
        }
        _ => format!("{current}{block}"),
    }
}

async fn fetch_remote_hosts() -> Result<String, ToolError> {
    let client = reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(|e| ToolError::Network(e.to_string()))?;
    let response = client
        .get(HOSTS_URL)
        .send()
        .await
        .map_err(|e| ToolError::Network(e.to_string()))?;
    response
        .error_for_status()
        .map_err(|e| ToolError::Network(e.to_string()))?
        .text()
        .await
        .map_err(|e| ToolError::Network(e.to_string()))
}

async fn flush_dns(console: &dyn Console) {
    if cfg!(target_os = "windows") {
        run_tolerant("ipconfig", &["/flushdns"], console).await;
    } else if cfg!(target_os = "macos") {
        run_tolerant("killall", &["-HUP", "mDNSResponder"], console).await;
    }
    // Linux resolvers vary too much to flush generically.
}

async fn update_at(path: &Path, console: &dyn Console) -> Result<Outcome, ToolError> {
    console.info(&format!("fetching latest GitHub hosts: {HOSTS_URL}"));
    let fresh = fetch_remote_hosts().await?;

    let current = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ToolError::io(path, e))?;

    if current.contains(START_MARKER) {
        console.info("existing GitHub hosts block found, updating...");
    } else {
        console.info("no previous block found, appending...");
    }
    let updated = splice_hosts_block(&current, fresh.trim_end());

    tokio::fs::write(path, updated)
        .await
        .map_err(|e| ToolError::io(path, e))?;

    console.success("GitHub hosts updated");
    flush_dns(console).await;
    Ok(Outcome::message("GitHub hosts updated"))
}

/// Refresh the managed GitHub block in the system hosts file.
/// Surfaces `PermissionDenied` when not running elevated.
pub async fn update_github_hosts(console: &dyn Console) -> Result<Outcome, ToolError> {
    update_at(&hosts_path(), console).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_block_when_absent() {
        let spliced = splice_hosts_block("127.0.0.1 localhost\n", "1.2.3.4 github.com");
        assert!(spliced.starts_with("127.0.0.1 localhost\n"));
        assert!(spliced.contains(START_MARKER));
        assert!(spliced.contains("1.2.3.4 github.com"));
        assert!(spliced.trim_end().ends_with(END_MARKER));
    }

    #[test]
    fn replaces_existing_block_in_place() {
        let original = format!(
            "127.0.0.1 localhost\n{START_MARKER}\n9.9.9.9 github.com\n{END_MARKER}\n# tail\n"
        );
        let spliced = splice_hosts_block(&original, "1.2.3.4 github.com");
        assert!(!spliced.contains("9.9.9.9"));
        assert!(spliced.contains("1.2.3.4 github.com"));
        assert!(spliced.contains("# tail"));
        // Still exactly one managed block.
        assert_eq!(spliced.matches(START_MARKER).count(), 1);
    }
}
