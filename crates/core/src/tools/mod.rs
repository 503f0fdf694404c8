// crates/core/src/tools/mod.rs
//! Mirror/proxy mutators for the supported tools.
//!
//! Each function shells out to the tool's own CLI (or edits its config
//! file) and narrates what it did through the console sink. They hold no
//! state and never decide job status — failures surface as `ToolError`.

pub mod docker;
pub mod git;
pub mod go;
pub mod hosts;
pub mod node;
pub mod python;

use crate::console::Console;
use crate::error::ToolError;
use crate::outcome::Outcome;

/// Apply a `(module, mode)` pair the dashboard selected.
///
/// `mode` is `"mirror"` or `"proxy"`; `port` is the local proxy port used
/// by proxy-mode configs. Unknown combinations are parameter errors.
pub async fn apply_config(
    module: &str,
    mode: &str,
    port: u16,
    console: &dyn Console,
) -> Result<Outcome, ToolError> {
    match (module, mode) {
        ("python", "mirror") => {
            python::set_pip_mirror("tsinghua", console).await?;
            python::set_conda_mirror(console).await?;
        }
        ("python", "proxy") => {
            python::set_pip_proxy(port, console).await?;
            python::set_conda_proxy(port, console).await?;
        }
        ("node", "mirror") => node::set_node_mirror("taobao", console).await?,
        ("node", "proxy") => node::set_node_proxy(port, console).await?,
        // Git only has the GitHub smart-proxy mode.
        ("git", "proxy") => git::set_git_proxy(port, console).await?,
        // Go's proxy is effectively its mirror.
        ("go", "mirror") => go::set_go_proxy("goproxy.cn", console).await?,
        ("docker", "mirror") => docker::set_docker_mirror(console).await?,
        _ => {
            return Err(ToolError::invalid_params(format!(
                "no {mode} mode for module {module}"
            )))
        }
    }
    Ok(Outcome::message(format!("{module} configured ({mode})")))
}
