use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use dexhelper_core::{ConfigError, DataError, DataLoader, HelperConfig, ReferenceData};

pub const MONSTERS_FILE: &str = "monsters.json";
pub const DEX_FILE: &str = "dex.json";
pub const CATCH_RATES_FILE: &str = "catch_rates.json";
pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Reads the reference documents from a data directory.
#[derive(Debug, Clone)]
pub struct DirLoader {
    root: PathBuf,
    top_k: Option<usize>,
}

impl DirLoader {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            top_k: None,
        }
    }

    /// Override the configured ranking length.
    #[must_use]
    pub const fn with_top_k(mut self, top_k: Option<usize>) -> Self {
        self.top_k = top_k;
        self
    }

    fn read(&self, name: &str) -> Result<String, LoadError> {
        let path = self.root.join(name);
        fs::read_to_string(&path).map_err(|source| LoadError::Io { path, source })
    }
}

impl DataLoader for DirLoader {
    type Error = LoadError;

    fn load_reference_data(&self) -> Result<ReferenceData, Self::Error> {
        let monsters = self.read(MONSTERS_FILE)?;
        let dex = self.read(DEX_FILE)?;
        let rates = self.read(CATCH_RATES_FILE)?;
        Ok(ReferenceData::from_json(&monsters, &dex, &rates)?)
    }

    fn load_config(&self) -> Result<HelperConfig, Self::Error> {
        let path = self.root.join(CONFIG_FILE);
        let mut config = if path.exists() {
            HelperConfig::from_json(&self.read(CONFIG_FILE)?)?
        } else {
            log::info!("no {CONFIG_FILE} in {}; using built-in tuning", self.root.display());
            HelperConfig::default_config()
        };
        if let Some(top_k) = self.top_k {
            config.strategy.top_k = top_k;
            config.validate()?;
        }
        Ok(config)
    }
}
