//! Error types for the targeted-id core library.
//!
//! Every variant of [`ConfigError`] is a construction-time failure: a bad
//! configuration aborts module initialization before the first request is
//! processed. The per-request pipeline itself never fails -- missing
//! attributes degrade to empty fields and filter rejections are ordinary
//! control flow.

use thiserror::Error;

/// Errors from configuration loading, merging, and compilation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// The configured digest name is not in the supported set.
    #[error("value '{value}': unsupported hash algorithm: {algorithm}")]
    UnsupportedHashAlgorithm {
        value: String,
        algorithm: String,
    },

    /// A filter or transform pattern failed to compile.
    #[error("value '{value}': invalid pattern '{pattern}': {detail}")]
    InvalidPattern {
        value: String,
        pattern: String,
        detail: String,
    },

    /// A name in `fields` is not one of salt/user_id/target_id/source_id.
    #[error("value '{value}': unknown field name: {field}")]
    UnknownField {
        value: String,
        field: String,
    },

    /// An attribute path is empty or more than two levels deep.
    #[error("value '{value}': invalid attribute path '{path}': {detail}")]
    InvalidPath {
        value: String,
        path: String,
        detail: String,
    },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = ConfigError::UnsupportedHashAlgorithm {
            value: "default".into(),
            algorithm: "crc32".into(),
        };
        assert_eq!(
            err.to_string(),
            "value 'default': unsupported hash algorithm: crc32"
        );

        let err = ConfigError::UnknownField {
            value: "edugain".into(),
            field: "realm".into(),
        };
        assert!(err.to_string().contains("unknown field name: realm"));

        let err = ConfigError::FileNotFound("/etc/targetedid/config.toml".into());
        assert!(err.to_string().contains("/etc/targetedid/config.toml"));
    }
}
