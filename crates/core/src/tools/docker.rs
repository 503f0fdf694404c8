// crates/core/src/tools/docker.rs
//! Docker registry-mirror configuration via daemon.json.

use std::path::PathBuf;

use serde_json::{json, Value};

use crate::console::Console;
use crate::error::ToolError;

/// Public registry mirrors written into `registry-mirrors`.
pub const DOCKER_MIRRORS: &[&str] = &[
    "https://docker.m.daocloud.io",
    "https://huecker.io",
    "https://mirror.ccs.tencentyun.com",
];

/// Platform-specific daemon.json location. `None` on platforms where the
/// Docker daemon config lives outside the filesystem we manage (macOS
/// Docker Desktop manages its own VM config).
pub fn docker_config_path() -> Option<PathBuf> {
    if cfg!(target_os = "windows") {
        dirs::home_dir().map(|home| home.join(".docker").join("daemon.json"))
    } else if cfg!(target_os = "linux") {
        Some(PathBuf::from("/etc/docker/daemon.json"))
    } else {
        None
    }
}

/// Merge `registry-mirrors` into an existing daemon.json value, keeping
/// unrelated keys.
pub fn merge_mirrors(existing: Value) -> Value {
    let mut config = match existing {
        Value::Object(map) => Value::Object(map),
        _ => json!({}),
    };
    config["registry-mirrors"] = json!(DOCKER_MIRRORS);
    config
}

/// Write the registry mirrors into daemon.json.
///
/// On Linux this needs root; without write access the merged config is
/// printed so the user can apply it with sudo instead of failing the job.
pub async fn set_docker_mirror(console: &dyn Console) -> Result<(), ToolError> {
    let Some(path) = docker_config_path() else {
        console.warning("unsupported platform for docker daemon.json management");
        return Ok(());
    };

    console.info("configuring docker registry mirrors...");

    let existing = match tokio::fs::read_to_string(&path).await {
        Ok(text) => serde_json::from_str(&text).unwrap_or_else(|_| json!({})),
        Err(_) => json!({}),
    };
    let merged = merge_mirrors(existing);
    let rendered = serde_json::to_string_pretty(&merged).expect("daemon.json serializes");

    if let Some(parent) = path.parent() {
        let _ = tokio::fs::create_dir_all(parent).await;
    }

    match tokio::fs::write(&path, &rendered).await {
        Ok(()) => {
            console.success(&format!("docker mirror config updated: {}", path.display()));
            console.info("restart the docker daemon for the change to take effect");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            console.warning(&format!(
                "writing {} needs elevated privileges; apply this manually:",
                path.display()
            ));
            for line in rendered.lines() {
                console.info(line);
            }
            Ok(())
        }
        Err(e) => Err(ToolError::io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_preserves_unrelated_keys() {
        let merged = merge_mirrors(json!({"log-driver": "json-file"}));
        assert_eq!(merged["log-driver"], "json-file");
        assert_eq!(merged["registry-mirrors"].as_array().unwrap().len(), DOCKER_MIRRORS.len());
    }

    #[test]
    fn merge_recovers_from_corrupt_config() {
        let merged = merge_mirrors(Value::String("not an object".into()));
        assert!(merged["registry-mirrors"].is_array());
    }
}
