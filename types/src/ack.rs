use crate::{
    codec::Bounded,
    ids::NodeId,
    response::SignedResponseHeader,
    signature::{Header, Policy, Signed},
    Error,
};
use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error as CodecError, Read, ReadExt, Write};
use commonware_cryptography::ed25519::PrivateKey;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AckHeader {
    pub response: SignedResponseHeader,
    pub node_id: NodeId,
    /// Milliseconds since the UNIX epoch.
    pub timestamp: u64,
}

impl Header for AckHeader {
    const KIND: &'static str = "ack";
    const SUFFIX: &'static [u8] = b"_ACK";

    fn verify_embedded(&self, policy: &Policy) -> Result<(), Error> {
        self.response.verify_with(policy)
    }
}

impl Bounded for AckHeader {
    fn check_bounds(&self) -> Result<(), Error> {
        self.response.check_bounds()?;
        self.node_id.check_bounds()
    }
}

impl Write for AckHeader {
    fn write(&self, writer: &mut impl BufMut) {
        self.response.write(writer);
        self.node_id.write(writer);
        self.timestamp.write(writer);
    }
}

impl Read for AckHeader {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, CodecError> {
        Ok(Self {
            response: SignedResponseHeader::read(reader)?,
            node_id: NodeId::read(reader)?,
            timestamp: u64::read(reader)?,
        })
    }
}

impl EncodeSize for AckHeader {
    fn encode_size(&self) -> usize {
        self.response.encode_size() + self.node_id.encode_size() + self.timestamp.encode_size()
    }
}

pub type SignedAckHeader = Signed<AckHeader>;

/// Acknowledgment of a response by a replicating peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ack {
    pub header: SignedAckHeader,
}

impl Ack {
    pub fn new(header: AckHeader) -> Self {
        Self {
            header: Signed::new(header),
        }
    }

    pub fn sign(&mut self, key: &PrivateKey) -> Result<(), Error> {
        self.header.sign(key)
    }

    pub fn sign_with(&mut self, key: &PrivateKey, policy: &Policy) -> Result<(), Error> {
        self.header.sign_with(key, policy)
    }

    pub fn verify(&self) -> Result<(), Error> {
        self.header.verify()
    }

    pub fn verify_with(&self, policy: &Policy) -> Result<(), Error> {
        self.header.verify_with(policy)
    }
}

impl Write for Ack {
    fn write(&self, writer: &mut impl BufMut) {
        self.header.write(writer);
    }
}

impl Read for Ack {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, CodecError> {
        Ok(Self {
            header: SignedAckHeader::read(reader)?,
        })
    }
}

impl EncodeSize for Ack {
    fn encode_size(&self) -> usize {
        self.header.encode_size()
    }
}
