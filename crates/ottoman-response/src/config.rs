use serde::{Deserialize, Serialize};

use crate::error::{ResponseError, ResponseResult};

/// Materializer settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterializerConfig {
    /// Keep the verbatim body text on raw document reads.
    pub keep_raw_document_body: bool,
    /// Largest document body buffered for the id/rev scan plus full read.
    pub max_buffered_body: usize,
}

impl Default for MaterializerConfig {
    fn default() -> Self {
        Self {
            keep_raw_document_body: true,
            max_buffered_body: 64 * 1024 * 1024,
        }
    }
}

impl MaterializerConfig {
    /// Parse from TOML. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> ResponseResult<Self> {
        let config: Self = toml::from_str(source).map_err(|e| ResponseError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ResponseResult<()> {
        if self.max_buffered_body == 0 {
            return Err(ResponseError::Config("max_buffered_body must be positive".into()));
        }
        Ok(())
    }
}
