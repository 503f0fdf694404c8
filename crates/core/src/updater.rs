// crates/core/src/updater.rs
//! Best-effort update check against GitHub releases.
//!
//! Never fails the caller: any network or parse problem yields `None` and
//! the dashboard simply shows no update banner.

use std::time::Duration;

use serde::{Deserialize, Serialize};

const CHECK_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Deserialize)]
struct ReleaseResponse {
    tag_name: Option<String>,
    html_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateInfo {
    pub repo: String,
    pub local_version: String,
    pub latest_tag: String,
    pub url: String,
    pub available: bool,
}

/// Repo slug from the environment (`NETBOOST_REPO` or `GITHUB_REPO`),
/// validated to look like `owner/name`.
pub fn repo_slug() -> Option<String> {
    for var in ["NETBOOST_REPO", "GITHUB_REPO"] {
        if let Ok(value) = std::env::var(var) {
            let value = value.trim().to_string();
            if value.contains('/') && !value.contains(' ') {
                return Some(value);
            }
        }
    }
    None
}

/// Parse `v1.2.3`-style tags into comparable number tuples. Trailing
/// qualifiers (`-rc1`) are ignored; non-version tags yield `None`.
pub fn parse_version(tag: &str) -> Option<Vec<u64>> {
    let tag = tag.trim().trim_start_matches('v');
    let numeric: String = tag
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if numeric.is_empty() {
        return None;
    }
    let parts: Result<Vec<u64>, _> = numeric
        .trim_end_matches('.')
        .split('.')
        .map(str::parse)
        .collect();
    parts.ok().filter(|p| !p.is_empty() && p.len() <= 4)
}

/// Compare with zero-padding so `1.2` == `1.2.0`.
pub fn is_remote_newer(local: &str, remote_tag: &str) -> bool {
    let (Some(lv), Some(rv)) = (parse_version(local), parse_version(remote_tag)) else {
        return false;
    };
    let len = lv.len().max(rv.len());
    let pad = |v: &[u64]| {
        let mut out = v.to_vec();
        out.resize(len, 0);
        out
    };
    pad(&rv) > pad(&lv)
}

async fn fetch_latest(repo: &str) -> Option<ReleaseResponse> {
    let url = format!("https://api.github.com/repos/{repo}/releases/latest");
    let client = reqwest::Client::builder()
        .timeout(CHECK_TIMEOUT)
        .user_agent("netboost")
        .build()
        .ok()?;
    let response = client.get(&url).send().await.ok()?;
    response.error_for_status().ok()?.json().await.ok()
}

/// Check whether a newer release exists. `None` when the repo is unknown,
/// the network is down, or the tag is unparsable.
pub async fn check_for_updates(local_version: &str) -> Option<UpdateInfo> {
    let repo = repo_slug()?;
    let latest = fetch_latest(&repo).await?;
    let tag = latest.tag_name?;
    if tag.is_empty() {
        return None;
    }
    let available = is_remote_newer(local_version, &tag);
    Some(UpdateInfo {
        url: latest
            .html_url
            .unwrap_or_else(|| format!("https://github.com/{repo}/releases/latest")),
        repo,
        local_version: local_version.to_string(),
        latest_tag: tag,
        available,
    })
}
