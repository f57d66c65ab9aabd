//! Stream identity for archive requests.
//!
//! Callers address a stream by exactly one of two identifiers: a short
//! pattern-constrained name, or the full resource name (ARN) the archive
//! service assigned at creation. The exactly-one rule is enforced at
//! construction so downstream code never re-checks it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Maximum length of a stream name.
pub const MAX_STREAM_NAME_LEN: usize = 256;

/// Maximum length of a stream ARN.
pub const MAX_STREAM_ARN_LEN: usize = 1024;

/// Errors raised while resolving or validating stream identity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    #[error("Either a stream name or a stream ARN must be provided")]
    MissingIdentifier,

    #[error("Stream name and stream ARN are mutually exclusive")]
    AmbiguousIdentifier,

    #[error("Invalid stream name: {reason}")]
    InvalidName { reason: String },

    #[error("Invalid stream ARN: {reason}")]
    InvalidArn { reason: String },
}

/// Reference to an archived stream, by name or by ARN.
///
/// Immutable once constructed; both constructors validate their input so a
/// `StreamRef` in hand is always well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamRef {
    /// Short identifier, chars `[A-Za-z0-9_.-]`, length 1-256
    Name(String),
    /// Full resource name, `arn:`-prefixed, length <= 1024
    Arn(String),
}

impl StreamRef {
    /// Resolves the caller-supplied identifier pair into a single reference.
    ///
    /// # Errors
    ///
    /// - `StreamError::MissingIdentifier` - Neither name nor ARN given
    /// - `StreamError::AmbiguousIdentifier` - Both name and ARN given
    /// - `StreamError::InvalidName` / `StreamError::InvalidArn` - Malformed identifier
    pub fn resolve(name: Option<&str>, arn: Option<&str>) -> Result<Self, StreamError> {
        match (name, arn) {
            (Some(_), Some(_)) => Err(StreamError::AmbiguousIdentifier),
            (None, None) => Err(StreamError::MissingIdentifier),
            (Some(name), None) => Self::from_name(name),
            (None, Some(arn)) => Self::from_arn(arn),
        }
    }

    /// Creates a reference from a stream name.
    ///
    /// # Errors
    ///
    /// - `StreamError::InvalidName` - Empty, too long, or outside `[A-Za-z0-9_.-]`
    pub fn from_name(name: &str) -> Result<Self, StreamError> {
        if name.is_empty() {
            return Err(StreamError::InvalidName {
                reason: "name is empty".to_string(),
            });
        }
        if name.len() > MAX_STREAM_NAME_LEN {
            return Err(StreamError::InvalidName {
                reason: format!("name exceeds {MAX_STREAM_NAME_LEN} characters"),
            });
        }
        if let Some(bad) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')))
        {
            return Err(StreamError::InvalidName {
                reason: format!("character {bad:?} is not allowed"),
            });
        }
        Ok(StreamRef::Name(name.to_string()))
    }

    /// Creates a reference from a stream ARN.
    ///
    /// # Errors
    ///
    /// - `StreamError::InvalidArn` - Missing `arn:` prefix, too long, or no resource part
    pub fn from_arn(arn: &str) -> Result<Self, StreamError> {
        if !arn.starts_with("arn:") {
            return Err(StreamError::InvalidArn {
                reason: "missing arn: prefix".to_string(),
            });
        }
        if arn.len() > MAX_STREAM_ARN_LEN {
            return Err(StreamError::InvalidArn {
                reason: format!("ARN exceeds {MAX_STREAM_ARN_LEN} characters"),
            });
        }
        if arn.trim_end_matches('/').len() == "arn:".len() {
            return Err(StreamError::InvalidArn {
                reason: "ARN has no resource part".to_string(),
            });
        }
        Ok(StreamRef::Arn(arn.to_string()))
    }

    /// Returns the identifier string without its variant.
    pub fn as_str(&self) -> &str {
        match self {
            StreamRef::Name(name) => name,
            StreamRef::Arn(arn) => arn,
        }
    }

    /// Best-effort short name for display and simulated lookup.
    ///
    /// For name references this is the name itself; for ARNs it is the
    /// final `/`-delimited segment. Authoritative ARN resolution belongs to
    /// the transport layer.
    pub fn short_name(&self) -> &str {
        match self {
            StreamRef::Name(name) => name,
            StreamRef::Arn(arn) => arn.rsplit('/').next().unwrap_or(arn),
        }
    }
}

impl fmt::Display for StreamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_requires_exactly_one_identifier() {
        assert_eq!(
            StreamRef::resolve(None, None),
            Err(StreamError::MissingIdentifier)
        );
        assert_eq!(
            StreamRef::resolve(Some("cam-1"), Some("arn:video:stream/cam-1")),
            Err(StreamError::AmbiguousIdentifier)
        );
        assert_eq!(
            StreamRef::resolve(Some("cam-1"), None),
            Ok(StreamRef::Name("cam-1".to_string()))
        );
    }

    #[test]
    fn test_name_character_validation() {
        assert!(StreamRef::from_name("front_door.cam-2").is_ok());
        assert!(StreamRef::from_name("").is_err());
        assert!(StreamRef::from_name("has space").is_err());
        assert!(StreamRef::from_name("emoji\u{1F600}").is_err());
        assert!(StreamRef::from_name(&"x".repeat(MAX_STREAM_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_arn_shape_validation() {
        assert!(StreamRef::from_arn("arn:video:eu-west-1:stream/cam-1/123").is_ok());
        assert!(StreamRef::from_arn("not-an-arn").is_err());
        assert!(StreamRef::from_arn("arn:").is_err());

        let long = format!("arn:{}", "x".repeat(MAX_STREAM_ARN_LEN));
        assert!(StreamRef::from_arn(&long).is_err());
    }

    #[test]
    fn test_short_name_from_arn() {
        let by_arn = StreamRef::from_arn("arn:video:eu-west-1:stream/cam-1/123").unwrap();
        assert_eq!(by_arn.short_name(), "123");

        let by_name = StreamRef::from_name("cam-1").unwrap();
        assert_eq!(by_name.short_name(), "cam-1");
    }
}
