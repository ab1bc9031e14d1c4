use serde::{Deserialize, Serialize};

use crate::error::{CodecError, CodecResult};

/// Wire naming configuration for the codec.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Reserved wire name of the document identifier.
    pub id_field: String,
    /// Reserved wire name of the document revision.
    pub rev_field: String,
    /// Discriminator field written ahead of every entity's members.
    pub doc_type_field: String,
    /// When `false`, member names are written as declared.
    pub camel_case: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            id_field: "_id".into(),
            rev_field: "_rev".into(),
            doc_type_field: "$doctype".into(),
            camel_case: true,
        }
    }
}

impl CodecConfig {
    /// Parse from TOML. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> CodecResult<Self> {
        let config: Self = toml::from_str(source).map_err(|e| CodecError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CodecResult<()> {
        if self.id_field.is_empty() || self.rev_field.is_empty() {
            return Err(CodecError::Config("id and rev field names must not be empty".into()));
        }
        if self.id_field == self.rev_field {
            return Err(CodecError::Config(format!(
                "id and rev share the wire name {}",
                self.id_field
            )));
        }
        Ok(())
    }
}
