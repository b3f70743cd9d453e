use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Result, UploadError};
use crate::source::Platform;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub endpoints: EndpointConfig,
    #[serde(default)]
    pub platform: Platform,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EndpointConfig {
    /// Base of the account API, hosts `uploadavatar`.
    pub base_url: String,
    /// Base of the mobile API, hosts `uploadImagev2`.
    pub mobile_base_url: String,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| UploadError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| UploadError::Config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        check_base_url("base_url", &self.endpoints.base_url)?;
        check_base_url("mobile_base_url", &self.endpoints.mobile_base_url)?;
        Ok(())
    }
}

fn check_base_url(name: &str, value: &str) -> Result<()> {
    let url = Url::parse(value)
        .map_err(|e| UploadError::Config(format!("Invalid {} '{}': {}", name, value, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(UploadError::Config(format!(
            "Invalid {} '{}': unsupported scheme '{}'",
            name, value, other
        ))),
    }
}
