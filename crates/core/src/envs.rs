// crates/core/src/envs.rs
//! Project environment management: analysis, venv/conda creation, and the
//! curated package-suite installer with hardware adaptation.
//!
//! Everything long-running here is a sequence of external commands; the
//! cancellation token is checked between steps, never mid-command.

use std::path::Path;

use serde::Serialize;
use serde_json::json;

use crate::cancel::CancelToken;
use crate::command::{is_installed, run_streamed};
use crate::console::Console;
use crate::error::ToolError;
use crate::outcome::Outcome;
use crate::system::SystemReport;
use crate::tools::python::DEFAULT_PIP_MIRROR;

fn python_bin() -> &'static str {
    if cfg!(target_os = "windows") {
        "python"
    } else {
        "python3"
    }
}

fn venv_bin_dir() -> &'static str {
    if cfg!(target_os = "windows") {
        "Scripts"
    } else {
        "bin"
    }
}

// ---------------------------------------------------------------------------
// Project analysis
// ---------------------------------------------------------------------------

/// Dependency files recognized in a project directory.
const DEP_FILES: &[(&str, &str)] = &[
    ("requirements.txt", "requirements.txt (Python)"),
    ("environment.yml", "environment.yml (Conda)"),
    ("package.json", "package.json (Node.js)"),
    ("Pipfile", "Pipfile (Pipenv)"),
    ("pyproject.toml", "pyproject.toml (Poetry/Flit)"),
];

#[derive(Debug, Clone, Serialize)]
pub struct ProjectAnalysis {
    pub path: String,
    pub name: String,
    pub deps: Vec<String>,
    pub has_conda: bool,
    pub recommendation: String,
}

/// Inspect a project directory for dependency manifests and recommend an
/// environment strategy.
pub async fn analyze_project(path: &Path) -> Result<ProjectAnalysis, ToolError> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| ToolError::io(path, e))?;
    if !meta.is_dir() {
        return Err(ToolError::invalid_params(format!(
            "{} is not a directory",
            path.display()
        )));
    }

    let mut deps = Vec::new();
    let mut found = Vec::new();
    for (file, label) in DEP_FILES {
        if tokio::fs::try_exists(path.join(file)).await.unwrap_or(false) {
            deps.push(label.to_string());
            found.push(*file);
        }
    }

    let has_conda = is_installed("conda").await;
    let recommendation = if found.contains(&"environment.yml") {
        "Conda Environment"
    } else if found.contains(&"requirements.txt") {
        if has_conda {
            "Conda or Venv"
        } else {
            "Venv (Virtualenv)"
        }
    } else {
        "System Python"
    };

    Ok(ProjectAnalysis {
        path: path.display().to_string(),
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        deps,
        has_conda,
        recommendation: recommendation.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Environment creation
// ---------------------------------------------------------------------------

/// Create `.venv` in the project and install requirements.txt through the
/// mirror. Steps: create venv, install deps; the token is checked between
/// them.
pub async fn create_venv_and_install(
    path: &Path,
    console: &dyn Console,
    cancel: &CancelToken,
) -> Result<Outcome, ToolError> {
    let venv_path = path.join(".venv");

    console.progress(20, Some("creating environment"));
    if tokio::fs::try_exists(&venv_path).await.unwrap_or(false) {
        console.info(&format!("virtualenv already exists: {}", venv_path.display()));
    } else {
        console.info(&format!("creating virtualenv: {} ...", venv_path.display()));
        run_streamed(
            python_bin(),
            &["-m", "venv", &venv_path.to_string_lossy()],
            console,
        )
        .await?;
    }

    cancel.checkpoint()?;

    let pip = venv_path.join(venv_bin_dir()).join("pip");
    let req_file = path.join("requirements.txt");
    let activate = venv_path.join(venv_bin_dir()).join("activate");

    let message = if tokio::fs::try_exists(&req_file).await.unwrap_or(false) {
        console.progress(50, Some("installing dependencies"));
        console.info("installing dependencies (requirements.txt)...");
        run_streamed(
            &pip.to_string_lossy(),
            &[
                "install",
                "-r",
                &req_file.to_string_lossy(),
                "-i",
                DEFAULT_PIP_MIRROR,
            ],
            console,
        )
        .await?;
        console.progress(90, None);
        format!(
            "environment created, dependencies installed. Activate with: {}",
            activate.display()
        )
    } else {
        "environment created, but no requirements.txt was found".to_string()
    };

    Ok(Outcome::with_data(
        message,
        json!({
            "env_name": ".venv",
            "env_path": venv_path.to_string_lossy(),
            "kind": "venv",
        }),
    ))
}

/// Create a conda environment for the project (from environment.yml when
/// present) and install pip requirements into it.
pub async fn create_conda_and_install(
    path: &Path,
    console: &dyn Console,
    cancel: &CancelToken,
) -> Result<Outcome, ToolError> {
    if !is_installed("conda").await {
        return Err(ToolError::MissingBinary {
            tool: "conda".to_string(),
        });
    }

    let env_name = format!(
        "{}_env",
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string())
    );
    let yml_file = path.join("environment.yml");

    console.progress(20, Some("creating environment"));
    if tokio::fs::try_exists(&yml_file).await.unwrap_or(false) {
        console.info(&format!(
            "creating conda env {env_name} from environment.yml ..."
        ));
        run_streamed(
            "conda",
            &[
                "env",
                "create",
                "-f",
                &yml_file.to_string_lossy(),
                "--name",
                &env_name,
            ],
            console,
        )
        .await?;
    } else {
        console.info(&format!("creating generic conda env {env_name} ..."));
        run_streamed(
            "conda",
            &["create", "-n", &env_name, "python=3.10", "-y"],
            console,
        )
        .await?;

        cancel.checkpoint()?;

        let req_file = path.join("requirements.txt");
        if tokio::fs::try_exists(&req_file).await.unwrap_or(false) {
            console.progress(50, Some("installing dependencies"));
            console.info("installing pip dependencies into the env...");
            // `conda run` so the env's own pip does the install.
            run_streamed(
                "conda",
                &[
                    "run",
                    "-n",
                    &env_name,
                    "pip",
                    "install",
                    "-r",
                    &req_file.to_string_lossy(),
                    "-i",
                    DEFAULT_PIP_MIRROR,
                ],
                console,
            )
            .await?;
        }
    }
    console.progress(90, None);

    Ok(Outcome::with_data(
        format!("conda environment {env_name} created"),
        json!({
            "env_name": env_name,
            "env_path": path.to_string_lossy(),
            "kind": "conda",
        }),
    ))
}

// ---------------------------------------------------------------------------
// Suite catalog
// ---------------------------------------------------------------------------

/// A curated package suite, already adapted to the current hardware.
#[derive(Debug, Clone, Serialize)]
pub struct Suite {
    pub key: String,
    pub desc: String,
    pub pip: Vec<String>,
    pub conda: Vec<String>,
}

fn strs(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

const BASE_DL: &[&str] = &[
    "numpy",
    "pandas",
    "matplotlib",
    "scikit-learn",
    "jupyterlab",
    "tqdm",
    "seaborn",
    "h5py",
    "pillow",
    "opencv-python",
];

/// Build the suite catalog, adapted for `report`'s hardware:
/// Apple Silicon swaps tensorflow for the macos/metal builds, Windows
/// swaps gunicorn for waitress.
pub fn suite_catalog(report: &SystemReport) -> Vec<Suite> {
    let dl_extras = [
        "tensorboard",
        "gradio",
        "transformers",
        "datasets",
        "accelerate",
        "torchmetrics",
        "optuna",
        "onnx",
        "pytorch-lightning",
    ];
    let mut dl_torch = strs(BASE_DL);
    dl_torch.extend(strs(&dl_extras));

    let mut dl_tf = strs(BASE_DL);
    dl_tf.extend(strs(&["tensorflow", "tensorboard", "keras", "tensorflow-datasets"]));
    if report.is_apple_silicon() {
        dl_tf.retain(|p| p != "tensorflow");
        dl_tf.extend(strs(&["tensorflow-macos", "tensorflow-metal"]));
    }

    let mut web_dev = strs(&[
        "fastapi",
        "uvicorn",
        "django",
        "flask",
        "requests",
        "pydantic",
        "sqlalchemy",
        "python-dotenv",
        "redis",
        "celery",
        "httpx",
        "beautifulsoup4",
        "gunicorn",
        "jinja2",
        "marshmallow",
        "alembic",
        "websockets",
    ]);
    if report.is_windows() {
        web_dev.retain(|p| p != "gunicorn");
        web_dev.push("waitress".to_string());
    }

    let data_science = strs(&[
        "numpy",
        "pandas",
        "scipy",
        "matplotlib",
        "seaborn",
        "scikit-learn",
        "statsmodels",
        "openpyxl",
        "jupyterlab",
        "plotly",
        "sympy",
        "networkx",
        "bokeh",
        "lxml",
        "xlrd",
        "fsspec",
        "dask",
    ]);

    let app_dev_pip = strs(&[
        "PyQt6",
        "kivy",
        "buildozer",
        "pyinstaller",
        "cx_Freeze",
        "pyside6",
        "briefcase",
    ]);
    // buildozer/cx_Freeze install better via pip even inside conda.
    let app_dev_conda = strs(&["pyqt", "kivy", "pyside6"]);

    let spider_pip = strs(&[
        "requests",
        "scrapy",
        "beautifulsoup4",
        "selenium",
        "playwright",
        "lxml",
        "parsel",
        "pyquery",
        "aiohttp",
    ]);
    let mut spider_conda = spider_pip.clone();
    spider_conda.retain(|p| p != "playwright");

    vec![
        Suite {
            key: "dl_torch".into(),
            desc: "PyTorch deep learning stack".into(),
            pip: dl_torch.clone(),
            conda: dl_torch,
        },
        Suite {
            key: "dl_tf".into(),
            desc: "TensorFlow deep learning stack".into(),
            pip: dl_tf.clone(),
            conda: dl_tf,
        },
        Suite {
            key: "web_dev".into(),
            desc: "Python web development (full stack)".into(),
            pip: web_dev.clone(),
            conda: web_dev,
        },
        Suite {
            key: "data_science".into(),
            desc: "Data science and analytics".into(),
            pip: data_science.clone(),
            conda: data_science,
        },
        Suite {
            key: "app_dev".into(),
            desc: "Desktop/mobile app development".into(),
            pip: app_dev_pip,
            conda: app_dev_conda,
        },
        Suite {
            key: "spider".into(),
            desc: "Web scraping and data collection".into(),
            pip: spider_pip,
            conda: spider_conda,
        },
    ]
}

fn find_suite<'a>(catalog: &'a [Suite], key: &str) -> Option<&'a Suite> {
    catalog.iter().find(|s| s.key == key)
}

// ---------------------------------------------------------------------------
// PyTorch hardware plan
// ---------------------------------------------------------------------------

const TORCH_PKGS: &[&str] = &["torch", "torchvision", "torchaudio"];

/// Which PyTorch build to install for the detected hardware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorchPlan {
    /// Extra pip index URL; `None` means the default index works (Mac).
    pub pip_index: Option<&'static str>,
    /// Arguments after `conda install -y` for the conda path.
    pub conda_spec: &'static str,
    pub label: &'static str,
}

/// Map CUDA version / platform to the right PyTorch wheel index.
pub fn torch_plan(report: &SystemReport) -> TorchPlan {
    if let Some(cuda) = report.cuda.as_deref().and_then(|v| v.parse::<f32>().ok()) {
        if cuda >= 12.0 {
            return TorchPlan {
                pip_index: Some("https://download.pytorch.org/whl/cu121"),
                conda_spec: "pytorch torchvision torchaudio pytorch-cuda=12.1 -c pytorch -c nvidia",
                label: "PyTorch CUDA 12.1",
            };
        }
        if cuda >= 11.0 {
            return TorchPlan {
                pip_index: Some("https://download.pytorch.org/whl/cu118"),
                conda_spec: "pytorch torchvision torchaudio pytorch-cuda=11.8 -c pytorch -c nvidia",
                label: "PyTorch CUDA 11.8",
            };
        }
        // CUDA too old for current wheels.
        return TorchPlan {
            pip_index: Some("https://download.pytorch.org/whl/cpu"),
            conda_spec: "pytorch torchvision torchaudio cpuonly -c pytorch",
            label: "PyTorch CPU (CUDA too old)",
        };
    }
    if report.is_apple_silicon() {
        return TorchPlan {
            pip_index: None,
            conda_spec: "pytorch torchvision torchaudio -c pytorch",
            label: "PyTorch (Apple Silicon / Metal)",
        };
    }
    TorchPlan {
        pip_index: Some("https://download.pytorch.org/whl/cpu"),
        conda_spec: "pytorch torchvision torchaudio cpuonly -c pytorch",
        label: "PyTorch CPU",
    }
}

// ---------------------------------------------------------------------------
// Suite installation
// ---------------------------------------------------------------------------

/// Where a suite install lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallTarget {
    PipCurrent,
    CondaCurrent,
    CondaNew,
}

impl InstallTarget {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pip_current" => Some(Self::PipCurrent),
            "conda_current" => Some(Self::CondaCurrent),
            "conda_new" => Some(Self::CondaNew),
            _ => None,
        }
    }
}

fn owned_refs(items: &[String]) -> Vec<&str> {
    items.iter().map(String::as_str).collect()
}

async fn pip_install(packages: &[String], index: Option<&str>, console: &dyn Console) -> Result<(), ToolError> {
    if packages.is_empty() {
        return Ok(());
    }
    let mut args = vec!["-m", "pip", "install"];
    args.extend(owned_refs(packages));
    match index {
        Some(url) => args.extend(["--index-url", url]),
        None => args.extend(["-i", DEFAULT_PIP_MIRROR]),
    }
    run_streamed(python_bin(), &args, console).await
}

/// Install a suite into the chosen target. Multi-step: each external
/// command is preceded by a cancellation checkpoint.
pub async fn install_suite(
    suite_key: &str,
    target: InstallTarget,
    env_name: Option<String>,
    custom_packages: Option<Vec<String>>,
    report: &SystemReport,
    console: &dyn Console,
    cancel: &CancelToken,
) -> Result<Outcome, ToolError> {
    console.info(&format!(
        "detected system: {} / {} / {} (CUDA: {})",
        report.os,
        report.arch,
        report.gpu,
        report.cuda.as_deref().unwrap_or("N/A")
    ));

    let catalog = suite_catalog(report);
    let suite = find_suite(&catalog, suite_key)
        .ok_or_else(|| ToolError::invalid_params(format!("unknown suite: {suite_key}")))?;

    let (mut pip_pkgs, mut conda_pkgs) = match custom_packages {
        Some(custom) => (custom.clone(), custom),
        None => (suite.pip.clone(), suite.conda.clone()),
    };

    // PyTorch carries its own index/channel per hardware; strip generic
    // entries so they are not double-installed from the wrong index.
    let wants_torch = suite_key == "dl_torch";
    let plan = torch_plan(report);
    if wants_torch {
        pip_pkgs.retain(|p| !TORCH_PKGS.contains(&p.as_str()));
        conda_pkgs.retain(|p| !TORCH_PKGS.contains(&p.as_str()));
        console.info(&format!(">>> {}", plan.label));
    }

    match target {
        InstallTarget::CondaNew => {
            if !is_installed("conda").await {
                return Err(ToolError::MissingBinary {
                    tool: "conda".to_string(),
                });
            }
            let env_name = env_name.unwrap_or_else(|| format!("env_{suite_key}"));
            console.progress(20, Some("creating environment"));
            console.info(&format!("creating new conda env: {env_name} ..."));
            run_streamed(
                "conda",
                &["create", "-n", &env_name, "python=3.10", "-y"],
                console,
            )
            .await?;

            cancel.checkpoint()?;

            if wants_torch {
                console.progress(40, Some("installing PyTorch"));
                console.info("installing PyTorch (conda)...");
                let mut args = vec!["install", "-n", env_name.as_str(), "-y"];
                args.extend(plan.conda_spec.split_whitespace());
                run_streamed("conda", &args, console).await?;

                cancel.checkpoint()?;

                console.progress(70, Some("installing dependencies"));
                console.info("installing remaining dependencies (pip)...");
                let mut args = vec!["run", "-n", env_name.as_str(), "pip", "install"];
                args.extend(owned_refs(&conda_pkgs));
                args.extend(["-i", DEFAULT_PIP_MIRROR]);
                run_streamed("conda", &args, console).await?;
            } else {
                console.progress(50, Some("installing packages"));
                console.info("installing conda packages...");
                let mut args = vec!["install", "-n", env_name.as_str(), "-y"];
                args.extend(owned_refs(&conda_pkgs));
                args.extend(["-c", "conda-forge"]);
                run_streamed("conda", &args, console).await?;
            }
            console.progress(90, None);

            Ok(Outcome::with_data(
                format!("environment {env_name} created and provisioned"),
                json!({
                    "env_name": env_name,
                    "kind": "conda",
                    "suite": suite_key,
                }),
            ))
        }

        InstallTarget::CondaCurrent => {
            if !is_installed("conda").await {
                return Err(ToolError::MissingBinary {
                    tool: "conda".to_string(),
                });
            }
            if wants_torch {
                console.progress(30, Some("installing PyTorch"));
                console.info("installing PyTorch into the current conda env...");
                let mut args = vec!["install", "-y"];
                args.extend(plan.conda_spec.split_whitespace());
                run_streamed("conda", &args, console).await?;

                cancel.checkpoint()?;

                console.progress(70, Some("installing dependencies"));
                pip_install(&conda_pkgs, None, console).await?;
            } else {
                console.progress(50, Some("installing packages"));
                console.info("installing into the current conda env...");
                let mut args = vec!["install", "-y"];
                args.extend(owned_refs(&conda_pkgs));
                args.extend(["-c", "conda-forge"]);
                run_streamed("conda", &args, console).await?;
            }
            console.progress(90, None);
            Ok(Outcome::message("current conda environment provisioned"))
        }

        InstallTarget::PipCurrent => {
            console.info(&format!("installing with pip ({} packages)...", pip_pkgs.len()));
            if wants_torch {
                console.progress(30, Some("installing dependencies"));
                pip_install(&pip_pkgs, None, console).await?;

                cancel.checkpoint()?;

                console.progress(70, Some("installing PyTorch"));
                console.info(&format!(
                    "installing PyTorch ({})...",
                    plan.pip_index.unwrap_or("default index")
                ));
                pip_install(&strs(TORCH_PKGS), plan.pip_index, console).await?;
            } else {
                console.progress(50, Some("installing packages"));
                pip_install(&pip_pkgs, None, console).await?;
            }
            console.progress(90, None);
            Ok(Outcome::message("pip install finished"))
        }
    }
}

// ---------------------------------------------------------------------------
// Quick installs
// ---------------------------------------------------------------------------

/// One-click installs for common starting points.
pub async fn quick_install(pkg: &str, console: &dyn Console) -> Result<Outcome, ToolError> {
    match pkg {
        "pytorch" => {
            console.info("installing PyTorch (CPU build, good for learning)...");
            pip_install(&strs(TORCH_PKGS), None, console).await?;
            Ok(Outcome::message("PyTorch installed"))
        }
        "tensorflow" => {
            console.info("installing TensorFlow...");
            pip_install(&strs(&["tensorflow"]), None, console).await?;
            Ok(Outcome::message("TensorFlow installed"))
        }
        "react" => {
            console.info("scaffolding a React project (vite)...");
            run_streamed(
                "npm",
                &["create", "vite@latest", "my-react-app", "--", "--template", "react"],
                console,
            )
            .await?;
            Ok(Outcome::message(
                "React template created in ./my-react-app",
            ))
        }
        "vue" => {
            console.info("scaffolding a Vue project (vite)...");
            run_streamed(
                "npm",
                &["create", "vite@latest", "my-vue-app", "--", "--template", "vue"],
                console,
            )
            .await?;
            Ok(Outcome::message("Vue template created in ./my-vue-app"))
        }
        other => Err(ToolError::invalid_params(format!(
            "unknown quick-install package: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::NullConsole;
    use pretty_assertions::assert_eq;

    fn report(os: &str, arch: &str, cuda: Option<&str>) -> SystemReport {
        SystemReport {
            os: os.to_string(),
            arch: arch.to_string(),
            gpu: String::new(),
            cuda: cuda.map(|s| s.to_string()),
            recommendation: String::new(),
        }
    }

    #[tokio::test]
    async fn analyze_detects_manifests() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("requirements.txt"), "requests\n").unwrap();
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();

        let analysis = analyze_project(dir.path()).await.unwrap();
        assert_eq!(analysis.deps.len(), 2);
        assert!(analysis.deps[0].contains("requirements.txt"));
        assert!(analysis
            .recommendation
            .contains(if analysis.has_conda { "Conda" } else { "Venv" }));
    }

    #[tokio::test]
    async fn analyze_missing_path_is_not_found() {
        let err = analyze_project(Path::new("/definitely/not/here"))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound { .. }));
    }

    #[test]
    fn catalog_has_all_suites() {
        let catalog = suite_catalog(&report("Linux 6.1", "x86_64", None));
        let keys: Vec<_> = catalog.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(
            keys,
            vec!["dl_torch", "dl_tf", "web_dev", "data_science", "app_dev", "spider"]
        );
    }

    #[test]
    fn apple_silicon_swaps_tensorflow() {
        let catalog = suite_catalog(&report("macOS 15.1", "aarch64", None));
        let tf = catalog.iter().find(|s| s.key == "dl_tf").unwrap();
        assert!(!tf.pip.iter().any(|p| p == "tensorflow"));
        assert!(tf.pip.iter().any(|p| p == "tensorflow-macos"));
        assert!(tf.pip.iter().any(|p| p == "tensorflow-metal"));
    }

    #[test]
    fn windows_swaps_gunicorn_for_waitress() {
        let catalog = suite_catalog(&report("Windows 11", "x86_64", None));
        let web = catalog.iter().find(|s| s.key == "web_dev").unwrap();
        assert!(!web.pip.iter().any(|p| p == "gunicorn"));
        assert!(web.pip.iter().any(|p| p == "waitress"));
    }

    #[test]
    fn torch_plan_picks_index_by_cuda() {
        assert_eq!(
            torch_plan(&report("Linux", "x86_64", Some("12.4"))).pip_index,
            Some("https://download.pytorch.org/whl/cu121")
        );
        assert_eq!(
            torch_plan(&report("Linux", "x86_64", Some("11.8"))).pip_index,
            Some("https://download.pytorch.org/whl/cu118")
        );
        assert_eq!(
            torch_plan(&report("Linux", "x86_64", Some("10.2"))).pip_index,
            Some("https://download.pytorch.org/whl/cpu")
        );
        assert_eq!(torch_plan(&report("macOS 15", "aarch64", None)).pip_index, None);
        assert_eq!(
            torch_plan(&report("Linux", "x86_64", None)).pip_index,
            Some("https://download.pytorch.org/whl/cpu")
        );
    }

    #[test]
    fn install_target_parses() {
        assert_eq!(InstallTarget::parse("pip_current"), Some(InstallTarget::PipCurrent));
        assert_eq!(InstallTarget::parse("conda_new"), Some(InstallTarget::CondaNew));
        assert_eq!(InstallTarget::parse("venv"), None);
    }

    #[tokio::test]
    async fn unknown_suite_is_invalid_params() {
        let sys = report("Linux", "x86_64", None);
        let err = install_suite(
            "nope",
            InstallTarget::PipCurrent,
            None,
            None,
            &sys,
            &NullConsole,
            &CancelToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams(_)));
    }

    #[tokio::test]
    async fn unknown_quick_install_is_invalid_params() {
        let err = quick_install("emacs", &NullConsole).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams(_)));
    }
}
