use std::fmt::{Display, Formatter};
use std::hash::{Hash as StdHash, Hasher};
use std::str::FromStr;

use digest::Digest;
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use tracing::warn;

use crate::error::{Error, Result};

/// A 256-bit digest, rendered as 64 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Hash([u8; 32]);

impl Display for Hash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for Hash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl Arbitrary for Hash {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        any::<[u8; 32]>().prop_map(Hash::new).boxed()
    }
}

impl StdHash for Hash {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl Hash {
    /// Creates a new Hash from any type that can be converted into [u8; 32].
    pub fn new<T: Into<[u8; 32]>>(data: T) -> Self {
        Hash(data.into())
    }

    pub fn from_slice(slice: &[u8]) -> Self {
        let mut inner = [0u8; 32];
        inner.copy_from_slice(slice);
        Hash(inner)
    }

    /// Returns a zero hash (all bytes set to 0).
    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Creates a new Hash from a hexadecimal string.
    pub fn from_hex(hex: &str) -> Result<Self> {
        let bytes = hex::decode(hex)?;

        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength)?;
        }

        Ok(Self::from_slice(&bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn digest<D: Digest>(data: &[u8]) -> Self {
        let mut hasher = D::new();
        hasher.update(data);
        Hash::from_slice(&hasher.finalize())
    }

    /// Digests the concatenated hex renderings of `left` and `right`.
    ///
    /// Parents are computed over the text form of their children, not over the raw bytes, so a
    /// root can be recomputed by anyone holding only the hex digests of a tree.
    pub fn combine<D: Digest>(left: &Hash, right: &Hash) -> Self {
        let mut hasher = D::new();
        hasher.update(left.to_hex().as_bytes());
        hasher.update(right.to_hex().as_bytes());
        Hash::from_slice(&hasher.finalize())
    }
}

impl Default for Hash {
    fn default() -> Self {
        Hash::zero()
    }
}

impl From<[u8; 32]> for Hash {
    fn from(array: [u8; 32]) -> Self {
        Hash(array)
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Hash> for [u8; 32] {
    fn from(val: Hash) -> Self {
        val.0
    }
}

/// Something able to turn text into a [`Hash`].
///
/// Every digest in the crate (record contents, block identifiers and Merkle parents) goes through
/// a provider, so the algorithm is picked once by the caller instead of at each call site.
pub trait DigestProvider {
    fn hash(&self, text: &str) -> Result<Hash>;

    /// Hash of a parent node, computed over the concatenated hex of both children.
    fn combine(&self, left: &Hash, right: &Hash) -> Result<Hash> {
        self.hash(&format!("{left}{right}"))
    }
}

/// The 256-bit digest algorithms this crate knows about.
///
/// Each one is gated behind the Cargo feature of the crate implementing it; asking for an
/// algorithm whose feature is off fails with [`Error::DigestUnavailable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Blake2s,
    Blake3,
}

impl HashAlgorithm {
    pub const ALL: [HashAlgorithm; 3] = [
        HashAlgorithm::Sha256,
        HashAlgorithm::Blake2s,
        HashAlgorithm::Blake3,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Blake2s => "blake2s",
            HashAlgorithm::Blake3 => "blake3",
        }
    }

    pub fn is_available(&self) -> bool {
        match self {
            HashAlgorithm::Sha256 => cfg!(feature = "sha2"),
            HashAlgorithm::Blake2s => cfg!(feature = "blake2"),
            HashAlgorithm::Blake3 => cfg!(feature = "blake3"),
        }
    }

    /// Algorithms compiled into this build.
    pub fn available() -> Vec<HashAlgorithm> {
        Self::ALL
            .into_iter()
            .filter(HashAlgorithm::is_available)
            .collect()
    }

    fn unavailable(&self) -> Error {
        warn!(algorithm = %self, "digest algorithm not compiled in");
        Error::DigestUnavailable(*self)
    }
}

impl DigestProvider for HashAlgorithm {
    fn hash(&self, text: &str) -> Result<Hash> {
        let data = text.as_bytes();

        match self {
            #[cfg(feature = "sha2")]
            HashAlgorithm::Sha256 => Ok(Hash::digest::<sha2::Sha256>(data)),
            #[cfg(feature = "blake2")]
            HashAlgorithm::Blake2s => Ok(Hash::digest::<blake2::Blake2s256>(data)),
            #[cfg(feature = "blake3")]
            HashAlgorithm::Blake3 => Ok(Hash::digest::<blake3::Hasher>(data)),
            #[allow(unreachable_patterns)]
            unavailable => Err(unavailable.unavailable()),
        }
    }

    fn combine(&self, left: &Hash, right: &Hash) -> Result<Hash> {
        match self {
            #[cfg(feature = "sha2")]
            HashAlgorithm::Sha256 => Ok(Hash::combine::<sha2::Sha256>(left, right)),
            #[cfg(feature = "blake2")]
            HashAlgorithm::Blake2s => Ok(Hash::combine::<blake2::Blake2s256>(left, right)),
            #[cfg(feature = "blake3")]
            HashAlgorithm::Blake3 => Ok(Hash::combine::<blake3::Hasher>(left, right)),
            #[allow(unreachable_patterns)]
            unavailable => Err(unavailable.unavailable()),
        }
    }
}

impl Display for HashAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(HashAlgorithm::Sha256),
            "blake2s" | "blake2s256" => Ok(HashAlgorithm::Blake2s),
            "blake3" => Ok(HashAlgorithm::Blake3),
            _ => Err(Error::UnknownAlgorithm(name.to_string())),
        }
    }
}

impl Arbitrary for HashAlgorithm {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        proptest::sample::select(HashAlgorithm::ALL.to_vec()).boxed()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use test_strategy::proptest;

    use super::*;

    #[test]
    fn test_hex_is_64_lowercase_characters() {
        let hash = Hash::new([0xABu8; 32]);
        assert_eq!(hash.to_hex().len(), 64);
        assert_eq!(hash.to_string(), "ab".repeat(32));
    }

    #[test]
    fn test_from_hex_rejects_wrong_width() {
        assert!(matches!(
            Hash::from_hex("abcd"),
            Err(Error::FailedDeserialization(_))
        ));
        assert!(Hash::from_hex("zz").is_err());
    }

    #[cfg(feature = "sha2")]
    #[test]
    fn test_sha256_known_values() {
        let abc = HashAlgorithm::Sha256.hash("abc").unwrap();
        assert_eq!(
            abc.to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );

        let empty = HashAlgorithm::Sha256.hash("").unwrap();
        assert_eq!(
            empty.to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[proptest(fork = false)]
    fn test_combine_hashes_concatenated_hex(
        algorithm: HashAlgorithm,
        left: Hash,
        right: Hash,
    ) {
        prop_assume!(algorithm.is_available());

        let combined = algorithm.combine(&left, &right)?;

        let text = format!("{}{}", left.to_hex(), right.to_hex());

        prop_assert_eq!(combined, algorithm.hash(&text)?);
        if left != right {
            prop_assert_ne!(combined, algorithm.combine(&right, &left)?);
        }
    }

    #[test]
    fn test_combine_fails_for_unavailable_algorithms() {
        for algorithm in HashAlgorithm::ALL {
            if !algorithm.is_available() {
                assert_eq!(
                    algorithm.combine(&Hash::zero(), &Hash::zero()),
                    Err(Error::DigestUnavailable(algorithm))
                );
            }
        }
    }

    #[test]
    fn test_names_round_trip_through_from_str() {
        for algorithm in HashAlgorithm::ALL {
            assert_eq!(algorithm.name().parse::<HashAlgorithm>(), Ok(algorithm));
        }
        assert_eq!("SHA-256".parse::<HashAlgorithm>(), Ok(HashAlgorithm::Sha256));
        assert!(matches!(
            "md5".parse::<HashAlgorithm>(),
            Err(Error::UnknownAlgorithm(_))
        ));
    }

    #[proptest(fork = false)]
    fn test_unavailable_algorithms_fail(algorithm: HashAlgorithm, text: String) {
        let result = algorithm.hash(&text);

        if algorithm.is_available() {
            prop_assert!(result.is_ok());
        } else {
            prop_assert_eq!(result, Err(Error::DigestUnavailable(algorithm)));
        }
    }

    #[proptest(fork = false)]
    fn test_hash_is_deterministic(algorithm: HashAlgorithm, text: String) {
        prop_assume!(algorithm.is_available());
        prop_assert_eq!(algorithm.hash(&text)?, algorithm.hash(&text)?);
    }

    #[proptest(fork = false)]
    fn test_hex_roundtrip(hash: Hash) {
        prop_assert_eq!(Hash::from_hex(&hash.to_hex())?, hash);
    }
}
