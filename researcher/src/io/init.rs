//! Initialization helpers for `.researcher/` scaffolding.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use super::config::{ResearchConfig, write_config};

/// All canonical paths within `.researcher/` for a project root.
#[derive(Debug, Clone)]
pub struct ResearcherPaths {
    pub root: PathBuf,
    pub researcher_dir: PathBuf,
    pub config_path: PathBuf,
    pub documents_path: PathBuf,
    pub gitignore_path: PathBuf,
    pub env_example_path: PathBuf,
}

impl ResearcherPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let researcher_dir = root.join(".researcher");
        Self {
            root: root.clone(),
            researcher_dir: researcher_dir.clone(),
            config_path: researcher_dir.join("config.toml"),
            documents_path: researcher_dir.join("documents.json"),
            gitignore_path: researcher_dir.join(".gitignore"),
            env_example_path: researcher_dir.join("env.example"),
        }
    }
}

/// Create `.researcher/` scaffolding in `root`.
///
/// Fails if `.researcher/` already exists unless `force` is set. The
/// document store is never touched.
pub fn init_workspace(root: &Path, force: bool) -> Result<ResearcherPaths> {
    let paths = ResearcherPaths::new(root);
    if paths.researcher_dir.exists() && !paths.researcher_dir.is_dir() {
        return Err(anyhow!(
            "researcher init: .researcher exists but is not a directory"
        ));
    }
    if paths.researcher_dir.exists() && !force {
        return Err(anyhow!(
            "researcher init: .researcher already exists (use --force to overwrite)"
        ));
    }

    fs::create_dir_all(&paths.researcher_dir).with_context(|| {
        format!("create directory {}", paths.researcher_dir.display())
    })?;
    write_config(&paths.config_path, &ResearchConfig::default())?;
    write_file(&paths.gitignore_path, RESEARCHER_GITIGNORE)?;
    write_file(&paths.env_example_path, ENV_EXAMPLE)?;

    Ok(paths)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("write file {}", path.display()))
}

const RESEARCHER_GITIGNORE: &str = "documents.json\n";
const ENV_EXAMPLE: &str = "# Copy to .env in the project root.\nGEMINI_API_KEY=\nTAVILY_API_KEY=\n";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::config::load_config;

    /// Verifies init writes a loadable default config plus helper files.
    #[test]
    fn init_creates_expected_layout() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = init_workspace(temp.path(), false).expect("init");

        assert!(paths.researcher_dir.is_dir());
        assert!(paths.config_path.is_file());
        assert!(paths.gitignore_path.is_file());
        assert!(paths.env_example_path.is_file());
        assert!(!paths.documents_path.exists());

        let cfg = load_config(&paths.config_path).expect("load");
        assert_eq!(cfg, ResearchConfig::default());
    }

    /// Verifies init refuses to overwrite without `--force`.
    #[test]
    fn init_without_force_refuses_existing_dir() {
        let temp = tempfile::tempdir().expect("tempdir");
        init_workspace(temp.path(), false).expect("init");
        let err = init_workspace(temp.path(), false).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    /// Verifies `--force` restores the default config but keeps ingested documents.
    #[test]
    fn init_with_force_rewrites_config_only() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = init_workspace(temp.path(), false).expect("init");
        fs::write(&paths.config_path, "[planner]\nmax_steps = 2\n").expect("write custom");
        fs::write(&paths.documents_path, "{}").expect("write documents");

        init_workspace(temp.path(), true).expect("re-init");

        let cfg = load_config(&paths.config_path).expect("load");
        assert_eq!(cfg.planner.max_steps, 5);
        assert_eq!(fs::read_to_string(&paths.documents_path).expect("read"), "{}");
    }
}
