use thiserror::Error as ThisError;

use crate::hash::HashAlgorithm;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, ThisError, PartialEq, Eq, Clone)]
pub enum Error {
    /// The requested digest algorithm was not compiled into this build.
    #[error("digest algorithm `{0}` is not available")]
    DigestUnavailable(HashAlgorithm),

    #[error("unknown digest algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("failed to deserialize: {0}")]
    FailedDeserialization(String),
}

impl From<hex::FromHexError> for Error {
    #[cfg_attr(coverage_nightly, coverage(off))]
    fn from(error: hex::FromHexError) -> Self {
        Error::FailedDeserialization(format!("{}", error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_unavailable_names_the_algorithm() {
        let error = Error::DigestUnavailable(HashAlgorithm::Blake2s);
        assert_eq!(error.to_string(), "digest algorithm `blake2s` is not available");
    }

    #[test]
    fn test_hex_errors_become_deserialization_failures() {
        let error: Error = hex::FromHexError::OddLength.into();
        assert!(matches!(error, Error::FailedDeserialization(_)));
    }
}
