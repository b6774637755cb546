use crate::{codec::canonical_bytes, Error};
use commonware_codec::{EncodeSize, Write};
use commonware_cryptography::{
    sha256::{Digest, Sha256},
    Hasher,
};

/// Digest of an entity's canonical bytes.
pub fn build_digest<T: Write + EncodeSize>(entity: &T) -> Digest {
    Sha256::hash(&canonical_bytes(Some(entity)))
}

/// Recompute the digest of `entity` and compare it with `expected`.
///
/// A missing expected digest never matches.
pub fn verify_digest<T: Write + EncodeSize>(
    entity: &T,
    expected: Option<&Digest>,
) -> Result<(), Error> {
    match expected {
        Some(expected) if build_digest(entity) == *expected => Ok(()),
        _ => Err(Error::DigestVerification),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::PRESENT;

    #[test]
    fn build_digest_hashes_canonical_bytes() {
        let value = 42u64;
        let mut expected = vec![PRESENT];
        expected.extend_from_slice(&42u64.to_be_bytes());
        assert_eq!(build_digest(&value), Sha256::hash(&expected));
    }

    #[test]
    fn verify_digest_detects_mismatch() {
        let digest = build_digest(&7u64);
        assert_eq!(verify_digest(&7u64, Some(&digest)), Ok(()));
        assert_eq!(
            verify_digest(&8u64, Some(&digest)),
            Err(Error::DigestVerification)
        );
        assert_eq!(verify_digest(&7u64, None), Err(Error::DigestVerification));
    }
}
