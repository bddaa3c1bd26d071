use std::env::{self, VarError};

use crate::prelude::*;

/// Environment variable naming the digest algorithm, e.g. `SPLAY_LEDGER_HASH=blake3`.
pub const HASH_ALGORITHM_VAR: &str = "SPLAY_LEDGER_HASH";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Config {
    pub algorithm: HashAlgorithm,
}

impl Config {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Reads the configuration from the process environment.
    ///
    /// An unset variable selects the default (SHA-256); a set but unknown name is an error rather
    /// than a silent fallback.
    pub fn from_env() -> Result<Self> {
        match env::var(HASH_ALGORITHM_VAR) {
            Ok(value) => Self::from_value(Some(&value)),
            Err(VarError::NotPresent) => Self::from_value(None),
            Err(VarError::NotUnicode(value)) => Err(Error::UnknownAlgorithm(
                value.to_string_lossy().into_owned(),
            )),
        }
    }

    fn from_value(value: Option<&str>) -> Result<Self> {
        match value {
            None => Ok(Self::default()),
            Some(name) => Ok(Self::new(name.parse()?)),
        }
    }

    pub fn provider(&self) -> HashAlgorithm {
        self.algorithm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_sha256() {
        assert_eq!(Config::default().provider(), HashAlgorithm::Sha256);
    }

    #[test]
    fn test_unset_value_uses_default() {
        assert_eq!(Config::from_value(None), Ok(Config::default()));
    }

    #[test]
    fn test_value_selects_algorithm() {
        assert_eq!(
            Config::from_value(Some("blake3")),
            Ok(Config::new(HashAlgorithm::Blake3))
        );
    }

    // Single test owning the variable, so parallel tests never observe it half-set.
    #[test]
    fn test_from_env_reads_the_variable() {
        let saved = env::var_os(HASH_ALGORITHM_VAR);

        env::remove_var(HASH_ALGORITHM_VAR);
        let unset = Config::from_env();

        env::set_var(HASH_ALGORITHM_VAR, "blake3");
        let named = Config::from_env();

        env::set_var(HASH_ALGORITHM_VAR, "crc32");
        let unknown = Config::from_env();

        #[cfg(unix)]
        let not_unicode = {
            use std::{ffi::OsStr, os::unix::ffi::OsStrExt};

            env::set_var(HASH_ALGORITHM_VAR, OsStr::from_bytes(&[0x62, 0xff, 0x33]));
            Config::from_env()
        };

        match saved {
            Some(value) => env::set_var(HASH_ALGORITHM_VAR, value),
            None => env::remove_var(HASH_ALGORITHM_VAR),
        }

        assert_eq!(unset, Ok(Config::default()));
        assert_eq!(named, Ok(Config::new(HashAlgorithm::Blake3)));
        assert_eq!(unknown, Err(Error::UnknownAlgorithm("crc32".to_string())));
        #[cfg(unix)]
        assert_eq!(
            not_unicode,
            Err(Error::UnknownAlgorithm("b\u{fffd}3".to_string()))
        );
    }

    #[test]
    fn test_unknown_value_is_rejected() {
        assert_eq!(
            Config::from_value(Some("crc32")),
            Err(Error::UnknownAlgorithm("crc32".to_string()))
        );
    }
}
