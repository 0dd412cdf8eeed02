//! Content shipped inside the crate.
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::DataLoader;
use crate::data::{Catalog, DEFAULT_CATALOG_DATA};
use crate::rules::DEFAULT_RULES_DATA;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no embedded configuration named '{0}'")]
    UnknownConfig(String),
    #[error("embedded data is malformed: {0}")]
    Parse(#[from] serde_json::Error),
}

/// [`DataLoader`] serving the embedded catalog and rule set.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedData;

impl DataLoader for EmbeddedData {
    type Error = LoadError;

    fn load_catalog(&self) -> Result<Catalog, Self::Error> {
        let catalog = Catalog::from_json(DEFAULT_CATALOG_DATA)?;
        for problem in catalog.dangling_references() {
            log::warn!("catalog reference points nowhere: {problem}");
        }
        Ok(catalog)
    }

    fn load_config<T>(&self, config_name: &str) -> Result<T, Self::Error>
    where
        T: DeserializeOwned,
    {
        let raw = match config_name {
            "rules" => DEFAULT_RULES_DATA,
            "catalog" => DEFAULT_CATALOG_DATA,
            other => return Err(LoadError::UnknownConfig(other.to_string())),
        };
        Ok(serde_json::from_str(raw)?)
    }
}
