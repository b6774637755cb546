use crate::{
    codec::{ensure_within, optional_encode_size, read_optional, write_optional, Bounded},
    hash::build_digest,
    ids::NodeId,
    signature::{check_bounds, check_signature, check_signer, Policy},
    Error, NAMESPACE,
};
use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error as CodecError, Read, ReadExt, ReadRangeExt, Write};
use commonware_cryptography::{
    ed25519::{PrivateKey, PublicKey, Signature},
    sha256::Digest,
    Signer,
};
use commonware_utils::union;
use tracing::debug;

/// Maximum number of servers in a membership snapshot.
pub const MAX_SERVERS: usize = 1024;

pub const PEERS_SUFFIX: &[u8] = b"_PEERS";

const KIND: &str = "peers";

/// Membership snapshot for one leadership term.
///
/// The optional signature covers term, leader, servers and signee. It is only checked
/// when [Peers::verify] is called explicitly.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Peers {
    pub term: u64,
    pub leader: NodeId,
    pub servers: Vec<NodeId>,
    pub signee: Option<PublicKey>,
    pub signature: Option<Signature>,
}

/// Fields covered by the membership signature.
struct Membership<'a>(&'a Peers);

impl Write for Membership<'_> {
    fn write(&self, writer: &mut impl BufMut) {
        self.0.term.write(writer);
        self.0.leader.write(writer);
        self.0.servers.write(writer);
        write_optional(&self.0.signee, writer);
    }
}

impl EncodeSize for Membership<'_> {
    fn encode_size(&self) -> usize {
        self.0.term.encode_size()
            + self.0.leader.encode_size()
            + self.0.servers.encode_size()
            + optional_encode_size(&self.0.signee)
    }
}

impl Peers {
    pub fn new(term: u64, leader: NodeId, servers: Vec<NodeId>) -> Self {
        Self {
            term,
            leader,
            servers,
            signee: None,
            signature: None,
        }
    }

    pub fn contains(&self, node: &NodeId) -> bool {
        self.servers.contains(node)
    }

    pub fn is_leader(&self, node: &NodeId) -> bool {
        self.leader == *node
    }

    pub fn digest(&self) -> Digest {
        build_digest(&Membership(self))
    }

    pub fn sign(&mut self, key: &PrivateKey) -> Result<(), Error> {
        self.sign_with(key, &Policy::strict())
    }

    pub fn sign_with(&mut self, key: &PrivateKey, policy: &Policy) -> Result<(), Error> {
        check_signer(KIND, self.signee.as_ref(), key, policy)?;
        check_bounds(KIND, &*self)?;
        let digest = self.digest();
        self.signature = Some(key.sign(&union(NAMESPACE, PEERS_SUFFIX), digest.as_ref()));
        Ok(())
    }

    pub fn verify(&self) -> Result<(), Error> {
        self.verify_with(&Policy::strict())
    }

    pub fn verify_with(&self, policy: &Policy) -> Result<(), Error> {
        let (Some(signee), Some(signature)) = (&self.signee, &self.signature) else {
            debug!(kind = KIND, "missing signee or signature");
            return Err(Error::SignatureVerification);
        };
        check_signature(
            KIND,
            &union(NAMESPACE, PEERS_SUFFIX),
            &self.digest(),
            signee,
            signature,
            policy,
        )
    }
}

impl Bounded for Peers {
    fn check_bounds(&self) -> Result<(), Error> {
        self.leader.check_bounds()?;
        ensure_within("servers", self.servers.len(), MAX_SERVERS)?;
        self.servers.iter().try_for_each(Bounded::check_bounds)
    }
}

impl Write for Peers {
    fn write(&self, writer: &mut impl BufMut) {
        self.term.write(writer);
        self.leader.write(writer);
        self.servers.write(writer);
        write_optional(&self.signee, writer);
        write_optional(&self.signature, writer);
    }
}

impl Read for Peers {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, CodecError> {
        Ok(Self {
            term: u64::read(reader)?,
            leader: NodeId::read(reader)?,
            servers: Vec::read_range(reader, 0..=MAX_SERVERS)?,
            signee: read_optional(reader)?,
            signature: read_optional(reader)?,
        })
    }
}

impl EncodeSize for Peers {
    fn encode_size(&self) -> usize {
        Membership(self).encode_size() + optional_encode_size(&self.signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_codec::{DecodeExt, Encode};

    fn peers() -> Peers {
        Peers::new(
            1,
            NodeId::from("node3"),
            vec![NodeId::from("node3"), NodeId::from("node2")],
        )
    }

    #[test]
    fn membership_helpers() {
        let peers = peers();
        assert!(peers.contains(&NodeId::from("node2")));
        assert!(!peers.contains(&NodeId::from("node9")));
        assert!(peers.is_leader(&NodeId::from("node3")));
        assert!(!peers.is_leader(&NodeId::from("node2")));
    }

    #[test]
    fn unsigned_snapshot_fails_verification() {
        assert_eq!(peers().verify(), Err(Error::SignatureVerification));
    }

    #[test]
    fn sign_and_verify() {
        let key = PrivateKey::from_seed(7);
        let mut peers = peers();
        assert_eq!(peers.sign(&key), Err(Error::SignatureVerification));
        assert!(peers.signature.is_none());

        peers.signee = Some(key.public_key());
        peers.sign(&key).unwrap();
        assert_eq!(peers.verify(), Ok(()));

        peers.term = 2;
        assert_eq!(peers.verify(), Err(Error::SignatureVerification));
        assert_eq!(peers.verify_with(&Policy::bypass()), Ok(()));
    }

    #[test]
    fn over_limit_snapshot_is_rejected() {
        let key = PrivateKey::from_seed(7);
        let mut peers = peers();
        peers.signee = Some(key.public_key());
        peers.servers = vec![NodeId::from("node"); MAX_SERVERS + 1];

        assert_eq!(peers.sign(&key), Err(Error::LimitExceeded("servers")));
        assert!(peers.signature.is_none());
        assert!(matches!(
            Peers::decode(peers.encode()),
            Err(CodecError::InvalidLength(_))
        ));
    }

    #[test]
    fn signed_snapshot_roundtrip() {
        let key = PrivateKey::from_seed(7);
        let mut peers = peers();
        peers.signee = Some(key.public_key());
        peers.sign(&key).unwrap();

        let decoded = Peers::decode(peers.encode()).unwrap();
        assert_eq!(decoded, peers);
        assert_eq!(decoded.verify(), Ok(()));
    }
}
