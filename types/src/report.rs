//! Failure reports: a peer's signed claim that a response was not acknowledged, and the
//! coordinator's signed aggregation of such claims.

use crate::{
    codec::{ensure_within, Bounded},
    ids::NodeId,
    peers::Peers,
    response::SignedResponseHeader,
    signature::{Header, Policy, Signed},
    Error,
};
use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error as CodecError, Read, ReadExt, ReadRangeExt, Write};
use commonware_cryptography::ed25519::PrivateKey;

/// Maximum number of reports in one aggregate.
pub const MAX_REPORTS: usize = 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoAckReportHeader {
    pub node_id: NodeId,
    /// Milliseconds since the UNIX epoch.
    pub timestamp: u64,
    pub response: SignedResponseHeader,
}

impl Header for NoAckReportHeader {
    const KIND: &'static str = "no_ack_report";
    const SUFFIX: &'static [u8] = b"_NO_ACK_REPORT";

    fn verify_embedded(&self, policy: &Policy) -> Result<(), Error> {
        self.response.verify_with(policy)
    }
}

impl Bounded for NoAckReportHeader {
    fn check_bounds(&self) -> Result<(), Error> {
        self.node_id.check_bounds()?;
        self.response.check_bounds()
    }
}

impl Write for NoAckReportHeader {
    fn write(&self, writer: &mut impl BufMut) {
        self.node_id.write(writer);
        self.timestamp.write(writer);
        self.response.write(writer);
    }
}

impl Read for NoAckReportHeader {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, CodecError> {
        Ok(Self {
            node_id: NodeId::read(reader)?,
            timestamp: u64::read(reader)?,
            response: SignedResponseHeader::read(reader)?,
        })
    }
}

impl EncodeSize for NoAckReportHeader {
    fn encode_size(&self) -> usize {
        self.node_id.encode_size() + self.timestamp.encode_size() + self.response.encode_size()
    }
}

pub type SignedNoAckReportHeader = Signed<NoAckReportHeader>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoAckReport {
    pub header: SignedNoAckReportHeader,
}

impl NoAckReport {
    pub fn new(header: NoAckReportHeader) -> Self {
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

impl Write for NoAckReport {
    fn write(&self, writer: &mut impl BufMut) {
        self.header.write(writer);
    }
}

impl Read for NoAckReport {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, CodecError> {
        Ok(Self {
            header: SignedNoAckReportHeader::read(reader)?,
        })
    }
}

impl EncodeSize for NoAckReport {
    fn encode_size(&self) -> usize {
        self.header.encode_size()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AggregatedNoAckReportHeader {
    pub node_id: NodeId,
    /// Milliseconds since the UNIX epoch.
    pub timestamp: u64,
    pub reports: Vec<SignedNoAckReportHeader>,
    /// Membership the aggregation belongs to. Not verified as part of the chain.
    pub peers: Peers,
}

impl Header for AggregatedNoAckReportHeader {
    const KIND: &'static str = "aggregated_no_ack_report";
    const SUFFIX: &'static [u8] = b"_AGGREGATED_NO_ACK_REPORT";

    fn verify_embedded(&self, policy: &Policy) -> Result<(), Error> {
        for report in &self.reports {
            report.verify_with(policy)?;
        }
        Ok(())
    }
}

impl Bounded for AggregatedNoAckReportHeader {
    fn check_bounds(&self) -> Result<(), Error> {
        self.node_id.check_bounds()?;
        ensure_within("reports", self.reports.len(), MAX_REPORTS)?;
        self.reports.iter().try_for_each(Bounded::check_bounds)?;
        self.peers.check_bounds()
    }
}

impl Write for AggregatedNoAckReportHeader {
    fn write(&self, writer: &mut impl BufMut) {
        self.node_id.write(writer);
        self.timestamp.write(writer);
        self.reports.write(writer);
        self.peers.write(writer);
    }
}

impl Read for AggregatedNoAckReportHeader {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, CodecError> {
        Ok(Self {
            node_id: NodeId::read(reader)?,
            timestamp: u64::read(reader)?,
            reports: Vec::read_range(reader, 0..=MAX_REPORTS)?,
            peers: Peers::read(reader)?,
        })
    }
}

impl EncodeSize for AggregatedNoAckReportHeader {
    fn encode_size(&self) -> usize {
        self.node_id.encode_size()
            + self.timestamp.encode_size()
            + self.reports.encode_size()
            + self.peers.encode_size()
    }
}

pub type SignedAggregatedNoAckReportHeader = Signed<AggregatedNoAckReportHeader>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AggregatedNoAckReport {
    pub header: SignedAggregatedNoAckReportHeader,
}

impl AggregatedNoAckReport {
    pub fn new(header: AggregatedNoAckReportHeader) -> Self {
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

    /// Verify every embedded report back to the original requests, then this header.
    ///
    /// The embedded [Peers] signature is not checked; see [Self::verify_peers].
    pub fn verify(&self) -> Result<(), Error> {
        self.header.verify()
    }

    pub fn verify_with(&self, policy: &Policy) -> Result<(), Error> {
        self.header.verify_with(policy)
    }

    pub fn verify_peers(&self, policy: &Policy) -> Result<(), Error> {
        self.header.peers.verify_with(policy)
    }
}

impl Write for AggregatedNoAckReport {
    fn write(&self, writer: &mut impl BufMut) {
        self.header.write(writer);
    }
}

impl Read for AggregatedNoAckReport {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, CodecError> {
        Ok(Self {
            header: SignedAggregatedNoAckReportHeader::read(reader)?,
        })
    }
}

impl EncodeSize for AggregatedNoAckReport {
    fn encode_size(&self) -> usize {
        self.header.encode_size()
    }
}
