// crates/core/src/templates.rs
//! Named multi-tool presets: one click configures a whole workflow.

use serde::Serialize;

use crate::cancel::CancelToken;
use crate::console::Console;
use crate::error::ToolError;
use crate::outcome::Outcome;
use crate::tools;

/// One `(module, mode)` step of a template.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateStep {
    pub module: &'static str,
    pub mode: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Template {
    pub key: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub steps: Vec<TemplateStep>,
}

fn step(module: &'static str, mode: &'static str) -> TemplateStep {
    let label = match (module, mode) {
        ("python", "mirror") => "Python: pip/conda mirror mode (TUNA)",
        ("python", "proxy") => "Python: pip/conda proxy mode (official + local proxy)",
        ("node", "mirror") => "Node: npm/yarn/pnpm mirror mode (npmmirror)",
        ("node", "proxy") => "Node: npm/yarn/pnpm proxy mode (local proxy)",
        ("git", _) => "Git: GitHub-only smart proxy",
        ("go", _) => "Go: GOPROXY acceleration",
        ("docker", _) => "Docker: registry mirrors (daemon.json)",
        _ => "custom step",
    };
    TemplateStep { module, mode, label }
}

/// The template catalog, sorted by key.
pub fn catalog() -> Vec<Template> {
    vec![
        Template {
            key: "deep_learning",
            label: "Deep Learning",
            description: "Python/Conda + Docker + GitHub acceleration (mirror-leaning)",
            steps: vec![
                step("python", "mirror"),
                step("docker", "mirror"),
                step("git", "proxy"),
                step("go", "mirror"),
            ],
        },
        Template {
            key: "web_dev",
            label: "Web Dev",
            description: "Node + Python + GitHub acceleration (mirror-leaning)",
            steps: vec![
                step("node", "mirror"),
                step("python", "mirror"),
                step("git", "proxy"),
                step("go", "mirror"),
            ],
        },
    ]
}

/// Apply a template: run its steps in order, checking the cancellation
/// token between steps and reporting per-step progress.
pub async fn apply(
    key: &str,
    port: u16,
    console: &dyn Console,
    cancel: &CancelToken,
) -> Result<Outcome, ToolError> {
    let template = catalog()
        .into_iter()
        .find(|t| t.key == key)
        .ok_or_else(|| ToolError::invalid_params(format!("unknown template: {key}")))?;

    let total = template.steps.len();
    for (i, step) in template.steps.iter().enumerate() {
        cancel.checkpoint()?;
        console.info(&format!("[{}/{}] {}", i + 1, total, step.label));
        tools::apply_config(step.module, step.mode, port, console).await?;
        // 10..=90 across the steps; the runner owns 0/100.
        let value = 10 + (80 * (i + 1) / total) as u8;
        console.progress(value, Some(step.label));
    }

    Ok(Outcome::message(format!(
        "template {} applied ({total} steps)",
        template.label
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_stable() {
        let templates = catalog();
        let keys: Vec<_> = templates.iter().map(|t| t.key).collect();
        assert_eq!(keys, vec!["deep_learning", "web_dev"]);
        assert!(templates.iter().all(|t| !t.steps.is_empty()));
    }

    #[test]
    fn steps_have_descriptive_labels() {
        for template in catalog() {
            for step in &template.steps {
                assert!(step.label.contains(':'), "label missing: {}", step.module);
            }
        }
    }

    #[tokio::test]
    async fn unknown_template_is_invalid_params() {
        use crate::console::NullConsole;
        let err = apply("nope", 7890, &NullConsole, &CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams(_)));
    }

    #[tokio::test]
    async fn cancelled_before_first_step() {
        use crate::console::NullConsole;
        let token = CancelToken::new();
        token.cancel();
        let err = apply("web_dev", 7890, &NullConsole, &token)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Cancelled));
    }
}
