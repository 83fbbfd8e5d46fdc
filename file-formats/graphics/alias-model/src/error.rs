use std::io;
use thiserror::Error;

/// Error types for alias model loading
///
/// Every variant produced by a loader names the model it was loading so the
/// caller can report which file is broken. A load either returns a complete
/// model or one of these errors, never a partially built model.
#[derive(Error, Debug)]
pub enum AliasError {
    /// I/O error while reading model data
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Unknown or wrong file identifier
    #[error("Invalid magic number: expected '{expected}', got '{actual}'")]
    InvalidMagic { expected: String, actual: String },

    /// The identifier matched but the version is not supported
    #[error("{model} has wrong version number ({version} should be {expected})")]
    UnsupportedVersion {
        model: String,
        version: i64,
        expected: String,
    },

    /// A lump or record lies outside the file buffer
    #[error("{model}: {what} at offset {offset} with size {size} exceeds file length {len}")]
    OutOfBounds {
        model: String,
        what: &'static str,
        offset: usize,
        size: usize,
        len: usize,
    },

    /// A header count is outside its allowed range
    #[error("{model} has an invalid {field} ({value} exceeds {min} - {max})")]
    InvalidCount {
        model: String,
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    /// An index refers outside the table it points into
    #[error("{model} has an invalid {field} reference {value} (must be below {max})")]
    InvalidReference {
        model: String,
        field: &'static str,
        value: i64,
        max: i64,
    },

    /// Vertex arrays needed by other data in the file are absent
    #[error("{model} is missing {what}")]
    MissingData { model: String, what: &'static str },

    /// Structural inconsistency between parts of the file
    #[error("{model}: {reason}")]
    Validation { model: String, reason: String },
}

impl AliasError {
    /// Name of the model the error refers to, if any
    pub fn model(&self) -> Option<&str> {
        match self {
            Self::Io(_) | Self::InvalidMagic { .. } => None,
            Self::UnsupportedVersion { model, .. }
            | Self::OutOfBounds { model, .. }
            | Self::InvalidCount { model, .. }
            | Self::InvalidReference { model, .. }
            | Self::MissingData { model, .. }
            | Self::Validation { model, .. } => Some(model),
        }
    }
}

/// Result type using AliasError
pub type Result<T> = std::result::Result<T, AliasError>;

/// Failure of a tag query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TagError {
    /// The index is outside the bone or tag table
    #[error("tag index out of range")]
    OutOfRange,

    /// The model carries neither bones nor tags
    #[error("model has no tag data")]
    NoTagData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AliasError::InvalidCount {
            model: "progs/player.mdl".into(),
            field: "numverts",
            value: 70000,
            min: 0,
            max: 65536,
        };
        assert_eq!(
            err.to_string(),
            "progs/player.mdl has an invalid numverts (70000 exceeds 0 - 65536)"
        );
        assert_eq!(err.model(), Some("progs/player.mdl"));

        let err = AliasError::InvalidMagic {
            expected: "IDP3".into(),
            actual: "RIFF".into(),
        };
        assert!(err.to_string().contains("RIFF"));
        assert_eq!(err.model(), None);
    }

    #[test]
    fn test_tag_error_display() {
        assert_eq!(TagError::OutOfRange.to_string(), "tag index out of range");
        assert_eq!(TagError::NoTagData.to_string(), "model has no tag data");
    }
}
