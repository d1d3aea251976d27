use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::{ConvertError, Result};

/// Identity of the converting server, stamped onto the audit variable and
/// into written templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerInfo {
    pub version: String,
    pub server_id: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        ServerInfo {
            version: env!("CARGO_PKG_VERSION").to_string(),
            server_id: "local".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosettaConfig {
    /// Root of the per-transaction output directories.
    pub download_dir: PathBuf,
    /// Also write the NcML description next to the netCDF file.
    pub write_ncml: bool,
    /// Embed data values in the NcML `<values>` elements.
    pub ncml_values: bool,
    pub server: ServerInfo,
}

impl Default for RosettaConfig {
    fn default() -> Self {
        RosettaConfig {
            download_dir: PathBuf::from("downloads"),
            write_ncml: true,
            ncml_values: false,
            server: ServerInfo::default(),
        }
    }
}

impl RosettaConfig {
    /// Read a JSON config file; missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| ConvertError::io(path, e))?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn transaction_dir(&self, transaction_id: &str) -> PathBuf {
        self.download_dir.join(transaction_id)
    }
}
