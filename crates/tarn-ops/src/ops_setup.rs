//! Shared input loading for the operations: root requirements, the package
//! index, the installed registry and the global config.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use tarn_core::config::GlobalConfig;
use tarn_core::index::StaticIndex;
use tarn_core::installed::StaticRegistry;
use tarn_core::requirement::InstallRequirement;
use tarn_core::requirements_file::RequirementsFile;
use tarn_util::errors::TarnError;
use tracing::debug;

/// Where an operation reads its inputs from. Paths left unset fall back to
/// the `[index]` section of the global config.
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    /// Requirement specifiers given on the command line.
    pub specs: Vec<String>,
    /// `-r` files.
    pub requirements: Vec<PathBuf>,
    /// `-c` files.
    pub constraints: Vec<PathBuf>,
    pub index: Option<PathBuf>,
    pub installed: Option<PathBuf>,
    /// Explicit config file instead of `~/.tarn/config.toml`.
    pub config: Option<PathBuf>,
}

impl Inputs {
    pub fn load_config(&self) -> miette::Result<GlobalConfig> {
        match &self.config {
            Some(path) => {
                if !path.is_file() {
                    return Err(TarnError::Config {
                        message: format!("Config file {} does not exist", path.display()),
                    }
                    .into());
                }
                GlobalConfig::load_from(path)
            }
            None => GlobalConfig::load(),
        }
    }

    /// Every user requirement and constraint, in the order given: command
    /// line specifiers first, then requirements files, then constraints files.
    pub fn root_requirements(&self) -> Result<Vec<InstallRequirement>, TarnError> {
        let mut roots: Vec<InstallRequirement> = Vec::new();
        for spec in &self.specs {
            roots.push(InstallRequirement::parse(spec)?.with_user_supplied(true));
        }
        let mut files = RequirementsFile::default();
        for path in &self.requirements {
            files.extend(RequirementsFile::parse(path)?);
        }
        for path in &self.constraints {
            files.extend(RequirementsFile::parse_constraints(path)?);
        }
        roots.extend(files.requirements);
        roots.extend(files.constraints);
        debug!("loaded {} root requirement(s)", roots.len());
        Ok(roots)
    }

    pub fn open_index(&self, config: &GlobalConfig) -> Result<Rc<StaticIndex>, TarnError> {
        let path = self
            .index
            .clone()
            .or_else(|| config.index.path.as_ref().map(PathBuf::from))
            .ok_or_else(|| TarnError::Config {
                message: "No package index given: pass --index or set `path` under [index] in the config"
                    .to_string(),
            })?;
        let index = StaticIndex::from_path(&path)?;
        debug!("index {} lists {} artifact(s)", path.display(), index.len());
        Ok(Rc::new(index))
    }

    /// The installed registry, or `None` when neither the command line nor
    /// the config names one.
    pub fn open_registry(&self, config: &GlobalConfig) -> Result<Option<Rc<StaticRegistry>>, TarnError> {
        let path = self
            .installed
            .clone()
            .or_else(|| config.index.installed.as_ref().map(PathBuf::from));
        path.map(|p| open_registry_at(&p).map(Rc::new)).transpose()
    }
}

fn open_registry_at(path: &Path) -> Result<StaticRegistry, TarnError> {
    let registry = StaticRegistry::from_path(path)?;
    debug!("{} lists {} installed package(s)", path.display(), registry.len());
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn roots_keep_command_line_first() {
        let tmp = TempDir::new().unwrap();
        let reqs = tmp.path().join("requirements.txt");
        let cons = tmp.path().join("constraints.txt");
        fs::write(&reqs, "web>=1\n# comment\n").unwrap();
        fs::write(&cons, "core<2\n").unwrap();

        let inputs = Inputs {
            specs: vec!["app".to_string()],
            requirements: vec![reqs],
            constraints: vec![cons],
            ..Inputs::default()
        };
        let roots = inputs.root_requirements().unwrap();
        let shown: Vec<String> = roots.iter().map(ToString::to_string).collect();
        assert_eq!(shown, vec!["app", "web>=1", "core<2"]);
        assert!(roots[0].user_supplied && roots[1].user_supplied);
        assert!(roots[2].constraint);
    }

    #[test]
    fn missing_index_is_a_config_error() {
        let err = Inputs::default().open_index(&GlobalConfig::default()).unwrap_err();
        assert!(matches!(err, TarnError::Config { .. }));
    }

    #[test]
    fn registry_falls_back_to_config() {
        let tmp = TempDir::new().unwrap();
        let installed = tmp.path().join("installed.toml");
        fs::write(&installed, "[[package]]\nname = \"core\"\nversion = \"1.0\"\n").unwrap();

        let mut config = GlobalConfig::default();
        assert!(Inputs::default().open_registry(&config).unwrap().is_none());
        config.index.installed = Some(installed.display().to_string());
        let registry = Inputs::default().open_registry(&config).unwrap().unwrap();
        assert_eq!(registry.len(), 1);
    }
}
