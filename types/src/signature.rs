//! Signed envelope shared by every header in the message chain.
//!
//! A [Signed] header stores the digest of its covered bytes (the header followed by the
//! declared signee), the declared signee, and an ed25519 signature over that digest.
//! Signatures are domain-separated per header kind.

use crate::{
    codec::{optional_encode_size, read_optional, write_optional, Bounded},
    hash::{build_digest, verify_digest},
    Error, NAMESPACE,
};
use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error as CodecError, Read, ReadExt, Write};
use commonware_cryptography::{
    ed25519::{PrivateKey, PublicKey, Signature},
    sha256::Digest,
    Signer, Verifier,
};
use commonware_utils::union;
use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};
use tracing::debug;

/// Controls how strictly signatures are produced and checked.
///
/// With `bypass_signature` set, signing skips the signee/key match and verification skips
/// the cryptographic signature check. Digest checks and the presence of signee and
/// signature are enforced either way.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Policy {
    #[serde(default)]
    pub bypass_signature: bool,
}

impl Policy {
    pub const fn strict() -> Self {
        Self {
            bypass_signature: false,
        }
    }

    pub const fn bypass() -> Self {
        Self {
            bypass_signature: true,
        }
    }
}

/// Business fields of one layer of the chain.
pub trait Header: Write + EncodeSize + Bounded {
    /// Name used in log events.
    const KIND: &'static str;

    /// Appended to [NAMESPACE] when signing headers of this kind.
    const SUFFIX: &'static [u8];

    /// Verify every signed structure this header embeds.
    fn verify_embedded(&self, _policy: &Policy) -> Result<(), Error> {
        Ok(())
    }
}

#[inline]
pub fn header_namespace<H: Header>() -> Vec<u8> {
    union(NAMESPACE, H::SUFFIX)
}

/// A header together with its digest, declared signee and signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signed<H> {
    pub header: H,
    pub digest: Option<Digest>,
    pub signee: Option<PublicKey>,
    pub signature: Option<Signature>,
}

/// Bytes covered by a header digest.
struct Covered<'a, H> {
    header: &'a H,
    signee: &'a Option<PublicKey>,
}

impl<H: Write> Write for Covered<'_, H> {
    fn write(&self, writer: &mut impl BufMut) {
        self.header.write(writer);
        write_optional(self.signee, writer);
    }
}

impl<H: EncodeSize> EncodeSize for Covered<'_, H> {
    fn encode_size(&self) -> usize {
        self.header.encode_size() + optional_encode_size(self.signee)
    }
}

impl<H> Signed<H> {
    /// Wrap an unsigned header with no declared signee.
    pub fn new(header: H) -> Self {
        Self {
            header,
            digest: None,
            signee: None,
            signature: None,
        }
    }

    pub fn with_signee(mut self, signee: PublicKey) -> Self {
        self.signee = Some(signee);
        self
    }
}

impl<H: Header> Signed<H> {
    fn covered(&self) -> Covered<'_, H> {
        Covered {
            header: &self.header,
            signee: &self.signee,
        }
    }

    /// Digest of the header and declared signee as they are now.
    pub fn compute_digest(&self) -> Digest {
        build_digest(&self.covered())
    }

    /// Check every signing precondition without touching any field.
    pub(crate) fn prepare(&self, key: &PrivateKey, policy: &Policy) -> Result<(), Error> {
        check_signer(H::KIND, self.signee.as_ref(), key, policy)?;
        check_bounds(H::KIND, &self.header)?;
        self.header.verify_embedded(policy)
    }

    /// Store the digest and signature. Callers must have run [Self::prepare].
    pub(crate) fn seal(&mut self, key: &PrivateKey) {
        let digest = self.compute_digest();
        self.signature = Some(key.sign(&header_namespace::<H>(), digest.as_ref()));
        self.digest = Some(digest);
    }

    /// Check digest and signature of this header only.
    pub(crate) fn verify_seal(&self, policy: &Policy) -> Result<(), Error> {
        let (Some(signee), Some(signature)) = (&self.signee, &self.signature) else {
            debug!(kind = H::KIND, "missing signee or signature");
            return Err(Error::SignatureVerification);
        };
        let digest = self.digest.as_ref().ok_or(Error::DigestVerification)?;
        verify_digest(&self.covered(), Some(digest)).map_err(|err| {
            debug!(kind = H::KIND, "header digest mismatch");
            err
        })?;
        check_signature(
            H::KIND,
            &header_namespace::<H>(),
            digest,
            signee,
            signature,
            policy,
        )
    }

    pub fn sign(&mut self, key: &PrivateKey) -> Result<(), Error> {
        self.sign_with(key, &Policy::strict())
    }

    /// Verify embedded structures, then fill in digest and signature.
    ///
    /// Nothing is written if any precondition fails.
    pub fn sign_with(&mut self, key: &PrivateKey, policy: &Policy) -> Result<(), Error> {
        self.prepare(key, policy)?;
        self.seal(key);
        Ok(())
    }

    pub fn verify(&self) -> Result<(), Error> {
        self.verify_with(&Policy::strict())
    }

    pub fn verify_with(&self, policy: &Policy) -> Result<(), Error> {
        self.header.verify_embedded(policy)?;
        self.verify_seal(policy)
    }
}

impl<H: Bounded> Bounded for Signed<H> {
    fn check_bounds(&self) -> Result<(), Error> {
        self.header.check_bounds()
    }
}

impl<H> Deref for Signed<H> {
    type Target = H;

    fn deref(&self) -> &H {
        &self.header
    }
}

impl<H> DerefMut for Signed<H> {
    fn deref_mut(&mut self) -> &mut H {
        &mut self.header
    }
}

impl<H: Write> Write for Signed<H> {
    fn write(&self, writer: &mut impl BufMut) {
        self.header.write(writer);
        write_optional(&self.digest, writer);
        write_optional(&self.signee, writer);
        write_optional(&self.signature, writer);
    }
}

impl<H: Read<Cfg = ()>> Read for Signed<H> {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, CodecError> {
        Ok(Self {
            header: H::read(reader)?,
            digest: read_optional(reader)?,
            signee: read_optional(reader)?,
            signature: read_optional(reader)?,
        })
    }
}

impl<H: EncodeSize> EncodeSize for Signed<H> {
    fn encode_size(&self) -> usize {
        self.header.encode_size()
            + optional_encode_size(&self.digest)
            + optional_encode_size(&self.signee)
            + optional_encode_size(&self.signature)
    }
}

/// The declared signee must be set and, unless bypassed, belong to `key`.
pub(crate) fn check_signer(
    kind: &'static str,
    signee: Option<&PublicKey>,
    key: &PrivateKey,
    policy: &Policy,
) -> Result<(), Error> {
    let Some(signee) = signee else {
        debug!(kind, "signee not set");
        return Err(Error::SignatureVerification);
    };
    if !policy.bypass_signature && key.public_key() != *signee {
        debug!(kind, "signing key does not match signee");
        return Err(Error::SignatureVerification);
    }
    Ok(())
}

pub(crate) fn check_bounds(kind: &'static str, value: &impl Bounded) -> Result<(), Error> {
    value.check_bounds().map_err(|err| {
        debug!(kind, %err, "encoding limit exceeded");
        err
    })
}

pub(crate) fn check_signature(
    kind: &'static str,
    namespace: &[u8],
    digest: &Digest,
    signee: &PublicKey,
    signature: &Signature,
    policy: &Policy,
) -> Result<(), Error> {
    if policy.bypass_signature {
        return Ok(());
    }
    if !signee.verify(namespace, digest.as_ref(), signature) {
        debug!(kind, "invalid signature");
        return Err(Error::SignatureVerification);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_codec::{DecodeExt, Encode};

    #[derive(Clone, Debug, PartialEq, Eq)]
    struct Note(u64);

    impl Write for Note {
        fn write(&self, writer: &mut impl BufMut) {
            self.0.write(writer);
        }
    }

    impl Read for Note {
        type Cfg = ();

        fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, CodecError> {
            Ok(Self(u64::read(reader)?))
        }
    }

    impl EncodeSize for Note {
        fn encode_size(&self) -> usize {
            self.0.encode_size()
        }
    }

    impl Bounded for Note {
        fn check_bounds(&self) -> Result<(), Error> {
            crate::codec::ensure_within("note", self.0 as usize, 100)
        }
    }

    impl Header for Note {
        const KIND: &'static str = "note";
        const SUFFIX: &'static [u8] = b"_NOTE";
    }

    #[test]
    fn sign_requires_signee() {
        let key = PrivateKey::from_seed(1);
        let mut note = Signed::new(Note(1));
        assert_eq!(note.sign(&key), Err(Error::SignatureVerification));
        assert!(note.digest.is_none());
        assert!(note.signature.is_none());

        note.signee = Some(key.public_key());
        assert_eq!(note.sign(&key), Ok(()));
        assert_eq!(note.verify(), Ok(()));
    }

    #[test]
    fn sign_rejects_foreign_key() {
        let key = PrivateKey::from_seed(1);
        let other = PrivateKey::from_seed(2);
        let mut note = Signed::new(Note(1)).with_signee(key.public_key());
        assert_eq!(note.sign(&other), Err(Error::SignatureVerification));
        assert!(note.digest.is_none());
        assert!(note.signature.is_none());
    }

    #[test]
    fn sign_rejects_over_limit_header() {
        let key = PrivateKey::from_seed(1);
        let mut note = Signed::new(Note(101)).with_signee(key.public_key());
        for policy in [Policy::strict(), Policy::bypass()] {
            assert_eq!(
                note.sign_with(&key, &policy),
                Err(Error::LimitExceeded("note"))
            );
            assert!(note.digest.is_none());
            assert!(note.signature.is_none());
        }
        note.header.0 = 100;
        assert_eq!(note.sign(&key), Ok(()));
    }

    #[test]
    fn bypass_skips_key_match_and_signature_check() {
        let key = PrivateKey::from_seed(1);
        let other = PrivateKey::from_seed(2);
        let mut note = Signed::new(Note(1)).with_signee(key.public_key());
        assert_eq!(note.sign_with(&other, &Policy::bypass()), Ok(()));
        assert_eq!(note.verify_with(&Policy::bypass()), Ok(()));
        assert_eq!(note.verify(), Err(Error::SignatureVerification));

        // digests are still enforced
        note.header.0 = 2;
        assert_eq!(
            note.verify_with(&Policy::bypass()),
            Err(Error::DigestVerification)
        );
    }

    #[test]
    fn digest_binds_signee() {
        let key = PrivateKey::from_seed(1);
        let other = PrivateKey::from_seed(2);
        let mut note = Signed::new(Note(1)).with_signee(key.public_key());
        note.sign(&key).unwrap();

        note.signee = Some(other.public_key());
        assert_eq!(note.verify(), Err(Error::DigestVerification));
    }

    #[test]
    fn rehashed_tamper_fails_signature() {
        let key = PrivateKey::from_seed(1);
        let mut note = Signed::new(Note(1)).with_signee(key.public_key());
        note.sign(&key).unwrap();

        note.header.0 = 2;
        note.digest = Some(note.compute_digest());
        assert_eq!(note.verify(), Err(Error::SignatureVerification));
    }

    #[test]
    fn namespace_separates_kinds() {
        assert_eq!(header_namespace::<Note>(), b"_SQLCHAIN_NOTE".to_vec());
    }

    #[test]
    fn signed_roundtrip() {
        let key = PrivateKey::from_seed(3);
        let mut note = Signed::new(Note(9)).with_signee(key.public_key());
        note.sign(&key).unwrap();

        let decoded = Signed::<Note>::decode(note.encode()).unwrap();
        assert_eq!(decoded, note);
        assert_eq!(decoded.verify(), Ok(()));

        let unsigned = Signed::new(Note(9));
        let decoded = Signed::<Note>::decode(unsigned.encode()).unwrap();
        assert_eq!(decoded, unsigned);
    }
}
