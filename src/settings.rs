use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

const DEFAULT_CONFIG_NAME: &str = "story_harvest";
const ENV_PREFIX: &str = "HARVEST";

/// Runtime settings: built-in defaults, then an optional TOML file, then
/// `HARVEST_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database_path: PathBuf,
    /// Keyword tables; the built-in copy when unset.
    #[serde(default)]
    pub taxonomy_path: Option<PathBuf>,
    /// Extraction selectors and word lists; the built-in copy when unset.
    #[serde(default)]
    pub rules_path: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub batch_size: usize,
}

impl Settings {
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("database_path", "data/stories.sqlite")?
            .set_default("output_dir", "exports")?
            .set_default("batch_size", 500_i64)?;
        builder = match file {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_NAME).required(false)),
        };
        let settings: Settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("Failed to load configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;
        anyhow::ensure!(settings.batch_size > 0, "batch_size must be at least 1");
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_toml(name: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("story_harvest_{}_{}.toml", name, std::process::id()));
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn file_overrides_defaults() {
        let path = temp_toml(
            "override",
            "database_path = \"/tmp/other.sqlite\"\nbatch_size = 25\ntaxonomy_path = \"my_tables.json\"\n",
        );
        let s = Settings::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(s.database_path, PathBuf::from("/tmp/other.sqlite"));
        assert_eq!(s.batch_size, 25);
        assert_eq!(s.taxonomy_path, Some(PathBuf::from("my_tables.json")));
        assert_eq!(s.rules_path, None);
        assert_eq!(s.output_dir, PathBuf::from("exports"));
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let path = temp_toml("zero", "batch_size = 0\n");
        let err = Settings::load(Some(&path));
        std::fs::remove_file(&path).ok();
        assert!(err.is_err());
    }

    #[test]
    fn explicit_file_must_exist() {
        assert!(Settings::load(Some(Path::new("no/such/story_harvest.toml"))).is_err());
    }
}
