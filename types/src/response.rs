use crate::{
    codec::{
        ensure_strings_within, ensure_within, optional_encode_size, read_optional, read_strings,
        strings_encode_size, write_optional, write_strings, Bounded, MAX_ID_LENGTH,
    },
    hash::{build_digest, verify_digest},
    ids::NodeId,
    query::Value,
    request::SignedRequestHeader,
    signature::{check_bounds, Header, Policy, Signed},
    Error,
};
use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error as CodecError, Read, ReadExt, ReadRangeExt, Write};
use commonware_cryptography::{ed25519::PrivateKey, sha256::Digest};
use tracing::debug;

/// Maximum number of columns in a response.
pub const MAX_COLUMNS: usize = 1024;

/// Maximum number of rows in a response.
pub const MAX_ROWS: usize = 1024 * 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseHeader {
    pub request: SignedRequestHeader,
    pub node_id: NodeId,
    /// Milliseconds since the UNIX epoch.
    pub timestamp: u64,
    /// Set from the payload when the response is signed.
    pub row_count: u64,
    /// Set from the payload when the response is signed.
    pub payload_digest: Option<Digest>,
}

impl ResponseHeader {
    pub fn new(request: SignedRequestHeader, node_id: NodeId, timestamp: u64) -> Self {
        Self {
            request,
            node_id,
            timestamp,
            row_count: 0,
            payload_digest: None,
        }
    }
}

impl Header for ResponseHeader {
    const KIND: &'static str = "response";
    const SUFFIX: &'static [u8] = b"_RESPONSE";

    fn verify_embedded(&self, policy: &Policy) -> Result<(), Error> {
        self.request.verify_with(policy)
    }
}

impl Bounded for ResponseHeader {
    fn check_bounds(&self) -> Result<(), Error> {
        self.request.check_bounds()?;
        self.node_id.check_bounds()
    }
}

impl Write for ResponseHeader {
    fn write(&self, writer: &mut impl BufMut) {
        self.request.write(writer);
        self.node_id.write(writer);
        self.timestamp.write(writer);
        self.row_count.write(writer);
        write_optional(&self.payload_digest, writer);
    }
}

impl Read for ResponseHeader {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, CodecError> {
        Ok(Self {
            request: SignedRequestHeader::read(reader)?,
            node_id: NodeId::read(reader)?,
            timestamp: u64::read(reader)?,
            row_count: u64::read(reader)?,
            payload_digest: read_optional(reader)?,
        })
    }
}

impl EncodeSize for ResponseHeader {
    fn encode_size(&self) -> usize {
        self.request.encode_size()
            + self.node_id.encode_size()
            + self.timestamp.encode_size()
            + self.row_count.encode_size()
            + optional_encode_size(&self.payload_digest)
    }
}

pub type SignedResponseHeader = Signed<ResponseHeader>;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseRow {
    pub values: Vec<Value>,
}

impl Bounded for ResponseRow {
    fn check_bounds(&self) -> Result<(), Error> {
        ensure_within("row values", self.values.len(), MAX_COLUMNS)?;
        self.values.iter().try_for_each(Bounded::check_bounds)
    }
}

impl Write for ResponseRow {
    fn write(&self, writer: &mut impl BufMut) {
        self.values.write(writer);
    }
}

impl Read for ResponseRow {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, CodecError> {
        Ok(Self {
            values: Vec::read_range(reader, 0..=MAX_COLUMNS)?,
        })
    }
}

impl EncodeSize for ResponseRow {
    fn encode_size(&self) -> usize {
        self.values.encode_size()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponsePayload {
    pub columns: Vec<String>,
    pub decl_types: Vec<String>,
    pub rows: Vec<ResponseRow>,
}

impl Bounded for ResponsePayload {
    fn check_bounds(&self) -> Result<(), Error> {
        ensure_strings_within("columns", &self.columns, MAX_COLUMNS, MAX_ID_LENGTH)?;
        ensure_strings_within("decl_types", &self.decl_types, MAX_COLUMNS, MAX_ID_LENGTH)?;
        ensure_within("rows", self.rows.len(), MAX_ROWS)?;
        self.rows.iter().try_for_each(Bounded::check_bounds)
    }
}

impl Write for ResponsePayload {
    fn write(&self, writer: &mut impl BufMut) {
        write_strings(&self.columns, writer);
        write_strings(&self.decl_types, writer);
        self.rows.write(writer);
    }
}

impl Read for ResponsePayload {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, CodecError> {
        Ok(Self {
            columns: read_strings(reader, MAX_COLUMNS, MAX_ID_LENGTH)?,
            decl_types: read_strings(reader, MAX_COLUMNS, MAX_ID_LENGTH)?,
            rows: Vec::read_range(reader, 0..=MAX_ROWS)?,
        })
    }
}

impl EncodeSize for ResponsePayload {
    fn encode_size(&self) -> usize {
        strings_encode_size(&self.columns)
            + strings_encode_size(&self.decl_types)
            + self.rows.encode_size()
    }
}

/// Result of executing a request, signed by the node that executed it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub header: SignedResponseHeader,
    pub payload: ResponsePayload,
}

impl Response {
    pub fn new(header: ResponseHeader, payload: ResponsePayload) -> Self {
        Self {
            header: Signed::new(header),
            payload,
        }
    }

    pub fn sign(&mut self, key: &PrivateKey) -> Result<(), Error> {
        self.sign_with(key, &Policy::strict())
    }

    /// Verify the embedded request, bind the payload, then sign the header.
    pub fn sign_with(&mut self, key: &PrivateKey, policy: &Policy) -> Result<(), Error> {
        self.header.prepare(key, policy)?;
        check_bounds(ResponseHeader::KIND, &self.payload)?;
        self.header.row_count = self.payload.rows.len() as u64;
        self.header.payload_digest = Some(build_digest(&self.payload));
        self.header.seal(key);
        Ok(())
    }

    pub fn verify(&self) -> Result<(), Error> {
        self.verify_with(&Policy::strict())
    }

    pub fn verify_with(&self, policy: &Policy) -> Result<(), Error> {
        self.header.header.verify_embedded(policy)?;
        verify_digest(&self.payload, self.header.payload_digest.as_ref()).map_err(|err| {
            debug!(kind = ResponseHeader::KIND, "payload digest mismatch");
            err
        })?;
        self.header.verify_seal(policy)
    }
}

impl Write for Response {
    fn write(&self, writer: &mut impl BufMut) {
        self.header.write(writer);
        self.payload.write(writer);
    }
}

impl Read for Response {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, CodecError> {
        Ok(Self {
            header: SignedResponseHeader::read(reader)?,
            payload: ResponsePayload::read(reader)?,
        })
    }
}

impl EncodeSize for Response {
    fn encode_size(&self) -> usize {
        self.header.encode_size() + self.payload.encode_size()
    }
}
