use crate::{
    codec::{ensure_within, optional_encode_size, read_optional, write_optional, Bounded},
    hash::{build_digest, verify_digest},
    ids::{DatabaseId, NodeId},
    query::{Query, QueryType},
    signature::{check_bounds, Header, Policy, Signed},
    Error,
};
use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error as CodecError, Read, ReadExt, ReadRangeExt, Write};
use commonware_cryptography::{ed25519::PrivateKey, sha256::Digest};
use tracing::debug;

/// Maximum number of queries in a single request.
pub const MAX_QUERIES: usize = 4096;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestHeader {
    pub query_type: QueryType,
    pub node_id: NodeId,
    pub database_id: DatabaseId,
    pub connection_id: u64,
    pub seq_no: u64,
    /// Milliseconds since the UNIX epoch.
    pub timestamp: u64,
    /// Set from the payload when the request is signed.
    pub batch_count: u64,
    /// Set from the payload when the request is signed.
    pub queries_digest: Option<Digest>,
}

impl Header for RequestHeader {
    const KIND: &'static str = "request";
    const SUFFIX: &'static [u8] = b"_REQUEST";
}

impl Bounded for RequestHeader {
    fn check_bounds(&self) -> Result<(), Error> {
        self.node_id.check_bounds()?;
        self.database_id.check_bounds()
    }
}

impl Write for RequestHeader {
    fn write(&self, writer: &mut impl BufMut) {
        self.query_type.write(writer);
        self.node_id.write(writer);
        self.database_id.write(writer);
        self.connection_id.write(writer);
        self.seq_no.write(writer);
        self.timestamp.write(writer);
        self.batch_count.write(writer);
        write_optional(&self.queries_digest, writer);
    }
}

impl Read for RequestHeader {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, CodecError> {
        Ok(Self {
            query_type: QueryType::read(reader)?,
            node_id: NodeId::read(reader)?,
            database_id: DatabaseId::read(reader)?,
            connection_id: u64::read(reader)?,
            seq_no: u64::read(reader)?,
            timestamp: u64::read(reader)?,
            batch_count: u64::read(reader)?,
            queries_digest: read_optional(reader)?,
        })
    }
}

impl EncodeSize for RequestHeader {
    fn encode_size(&self) -> usize {
        self.query_type.encode_size()
            + self.node_id.encode_size()
            + self.database_id.encode_size()
            + self.connection_id.encode_size()
            + self.seq_no.encode_size()
            + self.timestamp.encode_size()
            + self.batch_count.encode_size()
            + optional_encode_size(&self.queries_digest)
    }
}

pub type SignedRequestHeader = Signed<RequestHeader>;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestPayload {
    pub queries: Vec<Query>,
}

impl Bounded for RequestPayload {
    fn check_bounds(&self) -> Result<(), Error> {
        ensure_within("queries", self.queries.len(), MAX_QUERIES)?;
        self.queries.iter().try_for_each(Bounded::check_bounds)
    }
}

impl Write for RequestPayload {
    fn write(&self, writer: &mut impl BufMut) {
        self.queries.write(writer);
    }
}

impl Read for RequestPayload {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, CodecError> {
        Ok(Self {
            queries: Vec::read_range(reader, 0..=MAX_QUERIES)?,
        })
    }
}

impl EncodeSize for RequestPayload {
    fn encode_size(&self) -> usize {
        self.queries.encode_size()
    }
}

/// A client query batch, as submitted to the node that executes it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub header: SignedRequestHeader,
    pub payload: RequestPayload,
}

impl Request {
    pub fn new(header: RequestHeader, payload: RequestPayload) -> Self {
        Self {
            header: Signed::new(header),
            payload,
        }
    }

    pub fn sign(&mut self, key: &PrivateKey) -> Result<(), Error> {
        self.sign_with(key, &Policy::strict())
    }

    /// Bind the payload into the header, then sign the header.
    pub fn sign_with(&mut self, key: &PrivateKey, policy: &Policy) -> Result<(), Error> {
        self.header.prepare(key, policy)?;
        check_bounds(RequestHeader::KIND, &self.payload)?;
        self.header.batch_count = self.payload.queries.len() as u64;
        self.header.queries_digest = Some(build_digest(&self.payload));
        self.header.seal(key);
        Ok(())
    }

    pub fn verify(&self) -> Result<(), Error> {
        self.verify_with(&Policy::strict())
    }

    pub fn verify_with(&self, policy: &Policy) -> Result<(), Error> {
        self.header.header.verify_embedded(policy)?;
        verify_digest(&self.payload, self.header.queries_digest.as_ref()).map_err(|err| {
            debug!(kind = RequestHeader::KIND, "queries digest mismatch");
            err
        })?;
        self.header.verify_seal(policy)
    }
}

impl Write for Request {
    fn write(&self, writer: &mut impl BufMut) {
        self.header.write(writer);
        self.payload.write(writer);
    }
}

impl Read for Request {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, CodecError> {
        Ok(Self {
            header: SignedRequestHeader::read(reader)?,
            payload: RequestPayload::read(reader)?,
        })
    }
}

impl EncodeSize for Request {
    fn encode_size(&self) -> usize {
        self.header.encode_size() + self.payload.encode_size()
    }
}
