use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use directories_next::ProjectDirs;

pub const ENV_CONFIG_DIR: &str = "FEEDBROT_CONFIG_DIR";
pub const CONFIG_FILE_NAME: &str = "feedbrot.toml";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "feedbrot";
const APPLICATION: &str = "feedbrot";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        if let Some(config_dir) = env_override(ENV_CONFIG_DIR) {
            return Ok(Self { config_dir });
        }
        let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
            .ok_or_else(|| anyhow!("failed to determine user directories"))?;
        Ok(Self {
            config_dir: project_dirs.config_dir().to_path_buf(),
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}

#[cfg(test)]
impl AppPaths {
    pub fn from_raw(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_file_lives_in_config_dir() {
        let paths = AppPaths::from_raw(PathBuf::from("/tmp/feedbrot-config"));
        assert_eq!(paths.config_dir(), Path::new("/tmp/feedbrot-config"));
        assert_eq!(
            paths.config_file(),
            PathBuf::from("/tmp/feedbrot-config/feedbrot.toml")
        );
    }
}
