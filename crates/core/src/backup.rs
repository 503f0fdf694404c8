// crates/core/src/backup.rs
//! Timestamped backups of tool configs before we mutate them.

use std::path::PathBuf;

use crate::console::Console;
use crate::error::ToolError;

/// Directory the backups land in.
pub fn backup_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".netboost")
        .join("backups")
}

fn pip_config_path() -> Option<PathBuf> {
    let home = dirs::home_dir()?;
    let candidates = if cfg!(target_os = "windows") {
        vec![
            home.join("pip").join("pip.ini"),
            home.join("AppData").join("Roaming").join("pip").join("pip.ini"),
        ]
    } else {
        vec![
            home.join(".config").join("pip").join("pip.conf"),
            home.join(".pip").join("pip.conf"),
        ]
    };
    candidates.into_iter().find(|p| p.exists())
}

/// Configs worth saving before a mutation. Only existing files are listed.
fn backup_candidates() -> Vec<(&'static str, PathBuf)> {
    let mut candidates = Vec::new();
    if let Some(home) = dirs::home_dir() {
        let gitconfig = home.join(".gitconfig");
        if gitconfig.exists() {
            candidates.push(("gitconfig", gitconfig));
        }
        let condarc = home.join(".condarc");
        if condarc.exists() {
            candidates.push(("condarc", condarc));
        }
    }
    if let Some(pip) = pip_config_path() {
        candidates.push(("pip_conf", pip));
    }
    candidates
}

/// Copy every present tool config into the backup directory with a
/// timestamp suffix. Returns the created backup paths.
pub async fn backup_all(console: &dyn Console) -> Result<Vec<PathBuf>, ToolError> {
    let dir = backup_dir();
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| ToolError::io(&dir, e))?;

    console.info("backing up current configuration...");
    let timestamp = chrono::Utc::now().timestamp();
    let mut created = Vec::new();

    for (name, source) in backup_candidates() {
        let target = dir.join(format!("{name}_{timestamp}.bak"));
        match tokio::fs::copy(&source, &target).await {
            Ok(_) => {
                console.success(&format!("backed up {name} to {}", target.display()));
                created.push(target);
            }
            Err(e) => {
                // A single unreadable config should not block the change.
                console.warning(&format!("could not back up {name}: {e}"));
            }
        }
    }

    if created.is_empty() {
        console.info("no existing configs found to back up");
    } else {
        console.success("backup complete");
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_dir_is_home_scoped() {
        let dir = backup_dir();
        assert!(dir.ends_with(PathBuf::from(".netboost").join("backups")));
    }
}
