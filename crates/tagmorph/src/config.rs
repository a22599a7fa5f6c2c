use serde::Deserialize;

use crate::error::{DecodeError, DecodeErrorKind};

fn default_clause_delimiter() -> char {
    ';'
}

fn default_argument_delimiter() -> char {
    ','
}

fn default_negation_marker() -> char {
    '!'
}

fn default_true() -> bool {
    true
}

/// Grammar and lookup settings shared by every field of a schema.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DecoderConfig {
    #[serde(default = "default_clause_delimiter")]
    pub clause_delimiter: char,
    #[serde(default = "default_argument_delimiter")]
    pub argument_delimiter: char,
    #[serde(default = "default_negation_marker")]
    pub negation_marker: char,
    #[serde(default = "default_true")]
    pub fold_case: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            clause_delimiter: default_clause_delimiter(),
            argument_delimiter: default_argument_delimiter(),
            negation_marker: default_negation_marker(),
            fold_case: true,
        }
    }
}

impl DecoderConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, DecodeError> {
        let config: DecoderConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DecodeError> {
        let markers = [
            ("clause_delimiter", self.clause_delimiter),
            ("argument_delimiter", self.argument_delimiter),
            ("negation_marker", self.negation_marker),
        ];
        for (name, c) in markers {
            if !c.is_ascii() || c.is_ascii_whitespace() || c.is_ascii_alphanumeric() || c == '"' {
                return Err(DecodeError::new(
                    DecodeErrorKind::InvalidConfig,
                    format!("{} must be ASCII punctuation other than '\"', got {:?}", name, c),
                ));
            }
        }
        if self.clause_delimiter == self.argument_delimiter {
            return Err(DecodeError::new(
                DecodeErrorKind::InvalidConfig,
                "clause_delimiter and argument_delimiter must differ",
            ));
        }
        if self.negation_marker == self.clause_delimiter
            || self.negation_marker == self.argument_delimiter
        {
            return Err(DecodeError::new(
                DecodeErrorKind::InvalidConfig,
                "negation_marker must differ from both delimiters",
            ));
        }
        Ok(())
    }

    /// Key used for document lookup.
    pub(crate) fn fold_key(&self, key: &str) -> String {
        if self.fold_case {
            key.to_lowercase()
        } else {
            key.to_string()
        }
    }
}
