//! Message-integrity layer of a replicated SQL chain.
//!
//! A client query travels through five nested message kinds, each embedding the signed
//! header of the previous one:
//!
//! ```text
//! Request -> Response -> Ack
//!                     -> NoAckReport -> AggregatedNoAckReport
//! ```
//!
//! Signing a layer first verifies everything it embeds, and verifying a layer recursively
//! verifies the whole provenance back to the original request. Every entity has a single
//! canonical encoding (see [codec]) used both on the wire and as hashing input.

pub mod ack;
pub mod codec;
mod error;
pub mod hash;
pub mod ids;
pub mod peers;
pub mod query;
pub mod report;
pub mod request;
pub mod response;
pub mod signature;

pub use ack::{Ack, AckHeader, SignedAckHeader};
pub use error::Error;
pub use ids::{DatabaseId, NodeId};
pub use peers::Peers;
pub use query::{NamedArg, Query, QueryType, Value};
pub use report::{
    AggregatedNoAckReport, AggregatedNoAckReportHeader, NoAckReport, NoAckReportHeader,
    SignedAggregatedNoAckReportHeader, SignedNoAckReportHeader,
};
pub use request::{Request, RequestHeader, RequestPayload, SignedRequestHeader};
pub use response::{Response, ResponseHeader, ResponsePayload, ResponseRow, SignedResponseHeader};
pub use signature::{Header, Policy, Signed};

/// Namespace prefix for every signature produced by this crate.
pub const NAMESPACE: &[u8] = b"_SQLCHAIN";
